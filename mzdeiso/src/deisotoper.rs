//! The greedy isotopic train deisotoping algorithm
use mzpeaks::prelude::*;
use mzpeaks::MZPeakSetType;
use tracing::{debug, trace};

use crate::charge::{neutral_mass, ChargeRangeIter};
use crate::error::DeisotopingError;
use crate::intensity_model::IntensityModel;
use crate::isotopic_train::IsotopicTrain;
use crate::params::DeisotopingParams;
use crate::peaks::WorkingPeakSet;
use crate::solution::DeisotopedPeak;

/// Collapses isotopic envelopes in centroided peak lists into single, charge
/// annotated peaks.
///
/// Start peaks are visited in ascending m/z order. For each peak not yet part of
/// a train, charge states are tried from highest to lowest and the first one that
/// yields at least `min_isotopes` peaks claims them. Peaks no train claims are
/// passed through or dropped according to [`DeisotopingParams::keep_only_deisotoped`].
///
/// A [`Deisotoper`] holds no per-spectrum state, so one instance may be shared
/// across threads.
#[derive(Debug, Clone)]
pub struct Deisotoper {
    params: DeisotopingParams,
    intensity_model: IntensityModel,
}

impl Deisotoper {
    /// Create a [`Deisotoper`] after validating `params`
    pub fn new(params: DeisotopingParams) -> Result<Self, DeisotopingError> {
        params.validate()?;
        Ok(Self {
            intensity_model: params.intensity_model(),
            params,
        })
    }

    pub fn params(&self) -> &DeisotopingParams {
        &self.params
    }

    /// Deisotope `peaks`, which must be sorted by strictly ascending m/z.
    pub fn deisotope<C: CentroidLike>(
        &self,
        peaks: &[C],
    ) -> Result<MZPeakSetType<DeisotopedPeak>, DeisotopingError> {
        self.deisotope_with_precursor(peaks, None)
    }

    /// As [`Deisotoper::deisotope`], additionally skipping any charge state that
    /// would make a train heavier than `precursor_mass`, the neutral mass of the
    /// ion the spectrum was fragmented from.
    ///
    /// `precursor_mass` is ignored unless [`DeisotopingParams::use_precursor_mass`]
    /// is set.
    #[tracing::instrument(level = "debug", skip_all)]
    pub fn deisotope_with_precursor<C: CentroidLike>(
        &self,
        peaks: &[C],
        precursor_mass: Option<f64>,
    ) -> Result<MZPeakSetType<DeisotopedPeak>, DeisotopingError> {
        let mut working = WorkingPeakSet::new(peaks)?;
        if working.is_empty() {
            return Ok(MZPeakSetType::new(Vec::new()));
        }
        let precursor_mass = precursor_mass.filter(|_| self.params.use_precursor_mass);

        let trains = self.find_trains(&mut working, precursor_mass);
        debug!(
            "Found {} isotopic trains claiming {} of {} peaks",
            trains.len(),
            working.claimed_count(),
            working.len()
        );

        let mut result: Vec<DeisotopedPeak> = trains
            .iter()
            .map(|train| self.make_solution(train, peaks))
            .collect();

        if !self.params.keep_only_deisotoped {
            result.extend(
                working
                    .unclaimed()
                    .map(|i| self.make_unclaimed(i, &peaks[i])),
            );
        }

        Ok(MZPeakSetType::new(result))
    }

    fn find_trains<C: CentroidLike>(
        &self,
        working: &mut WorkingPeakSet<'_, C>,
        precursor_mass: Option<f64>,
    ) -> Vec<IsotopicTrain> {
        let mut trains = Vec::new();
        for start in 0..working.len() {
            if working.is_claimed(start) {
                continue;
            }
            let start_mz = working[start].mz();
            let tolerance = self.params.tolerance_at(start_mz);
            for charge in ChargeRangeIter::from(self.params.charge_range) {
                if let Some(limit) = precursor_mass {
                    if neutral_mass(start_mz, charge) > limit + tolerance * charge as f64 {
                        continue;
                    }
                }
                let train = IsotopicTrain::extend_from(
                    working,
                    start,
                    charge,
                    tolerance,
                    self.params.max_isotopes,
                    self.intensity_model,
                );
                if train.len() >= self.params.min_isotopes {
                    trace!(
                        "Accepted {} peaks from {:0.4} at charge {}",
                        train.len(),
                        start_mz,
                        charge
                    );
                    working.claim_all(&train.members);
                    trains.push(train);
                    break;
                }
            }
        }
        trains
    }

    fn make_solution<C: CentroidLike>(&self, train: &IsotopicTrain, peaks: &[C]) -> DeisotopedPeak {
        let members = train.members.iter().map(|i| *i as u32).collect();
        let isotope_count = self
            .params
            .annotate_iso_peak_count
            .then_some(train.len() as u32);
        // A lone peak has no spacing to support its charge
        if train.len() < 2 {
            let peak = &peaks[train.start()];
            return DeisotopedPeak::new(
                peak.mz(),
                peak.intensity(),
                None,
                isotope_count,
                0,
                members,
                true,
            );
        }
        let mz = train.monoisotopic_mz(peaks, self.params.make_single_charged);
        let intensity = if self.params.add_up_intensity {
            train.total_intensity(peaks)
        } else {
            peaks[train.start()].intensity()
        };
        DeisotopedPeak::new(
            mz,
            intensity,
            self.params.annotate_charge.then_some(train.charge),
            isotope_count,
            0,
            members,
            true,
        )
    }

    fn make_unclaimed<C: CentroidLike>(&self, index: usize, peak: &C) -> DeisotopedPeak {
        DeisotopedPeak::new(
            peak.mz(),
            peak.intensity(),
            None,
            self.params.annotate_iso_peak_count.then_some(1),
            0,
            vec![index as u32],
            false,
        )
    }
}

#[cfg(test)]
mod test {
    use std::collections::HashSet;

    use mzpeaks::{CentroidPeak, Tolerance};

    use super::*;
    use crate::charge::PROTON;

    fn scenario_peaks() -> Vec<CentroidPeak> {
        vec![
            CentroidPeak::new(500.0, 100.0, 0),
            CentroidPeak::new(500.5, 60.0, 1),
            CentroidPeak::new(501.0, 20.0, 2),
        ]
    }

    fn scenario_params() -> DeisotopingParams {
        DeisotopingParams::builder()
            .error_tolerance(Tolerance::Da(0.01))
            .charge_range((1, 2))
            .isotope_range(2, 10)
            .make_single_charged(false)
            .build()
            .unwrap()
    }

    /// Build a train of `n` peaks at `charge` starting at `mz`, decreasing in intensity
    fn train(mz: f64, charge: i32, n: usize, intensity: f32) -> Vec<CentroidPeak> {
        let step = PROTON / charge as f64;
        (0..n)
            .map(|i| CentroidPeak::new(mz + step * i as f64, intensity / (i + 1) as f32, 0))
            .collect()
    }

    fn sorted(mut peaks: Vec<CentroidPeak>) -> Vec<CentroidPeak> {
        peaks.sort_by(|a, b| a.mz.total_cmp(&b.mz));
        peaks
            .into_iter()
            .enumerate()
            .map(|(i, p)| CentroidPeak::new(p.mz, p.intensity, i as u32))
            .collect()
    }

    #[test_log::test]
    fn test_charge_2_scenario() {
        let peaks = scenario_peaks();
        let engine = Deisotoper::new(scenario_params()).unwrap();
        let result = engine.deisotope(&peaks).unwrap();
        assert_eq!(result.len(), 1);
        let peak = &result[0];
        assert_eq!(peak.mz, 500.0);
        assert_eq!(peak.intensity, 100.0);
        assert_eq!(peak.charge, Some(2));
        assert_eq!(peak.members, vec![0, 1, 2]);

        let mut params = scenario_params();
        params.add_up_intensity = true;
        params.annotate_iso_peak_count = true;
        let result = Deisotoper::new(params).unwrap().deisotope(&peaks).unwrap();
        assert_eq!(result.len(), 1);
        assert!((result[0].intensity - 180.0).abs() < 1e-3);
        assert_eq!(result[0].isotope_count, Some(3));
    }

    #[test_log::test]
    fn test_charge_3_only() {
        let peaks = scenario_peaks();
        let mut params = scenario_params();
        params.charge_range = (3, 3);
        let result = Deisotoper::new(params).unwrap().deisotope(&peaks).unwrap();
        assert_eq!(result.len(), 3);
        for (p, q) in result.iter().zip(peaks.iter()) {
            assert_eq!(p.mz, q.mz);
            assert_eq!(p.intensity, q.intensity);
            assert_eq!(p.charge, None);
        }

        params.keep_only_deisotoped = true;
        let result = Deisotoper::new(params).unwrap().deisotope(&peaks).unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn test_empty() {
        let peaks: Vec<CentroidPeak> = Vec::new();
        let result = Deisotoper::new(DeisotopingParams::default())
            .unwrap()
            .deisotope(&peaks)
            .unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn test_tolerance_boundary() {
        let tol = 0.01;
        let start = 400.0;
        let expected = start + PROTON / 2.0;
        let params = DeisotopingParams::builder()
            .error_tolerance(Tolerance::Da(tol))
            .charge_range((2, 2))
            .build()
            .unwrap();
        let engine = Deisotoper::new(params).unwrap();

        let peaks = vec![
            CentroidPeak::new(start, 100.0, 0),
            CentroidPeak::new(expected + tol, 50.0, 1),
        ];
        let result = engine.deisotope(&peaks).unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].charge, Some(2));

        let peaks = vec![
            CentroidPeak::new(start, 100.0, 0),
            CentroidPeak::new(expected - tol, 50.0, 1),
        ];
        let result = engine.deisotope(&peaks).unwrap();
        assert_eq!(result.len(), 1);

        let peaks = vec![
            CentroidPeak::new(start, 100.0, 0),
            CentroidPeak::new(expected + tol + 1e-6, 50.0, 1),
        ];
        let result = engine.deisotope(&peaks).unwrap();
        assert_eq!(result.len(), 2);
        assert!(result.iter().all(|p| p.charge.is_none()));
    }

    #[test]
    fn test_ppm_tolerance() {
        let start = 1000.0;
        let offset = 0.004;
        let peaks = vec![
            CentroidPeak::new(start, 100.0, 0),
            CentroidPeak::new(start + PROTON + offset, 50.0, 1),
        ];
        let strict = DeisotopingParams::builder()
            .error_tolerance(Tolerance::PPM(3.0))
            .charge_range((1, 1))
            .build()
            .unwrap();
        let result = Deisotoper::new(strict).unwrap().deisotope(&peaks).unwrap();
        assert_eq!(result.len(), 2);

        let loose = DeisotopingParams::builder()
            .error_tolerance(Tolerance::PPM(5.0))
            .charge_range((1, 1))
            .build()
            .unwrap();
        let result = Deisotoper::new(loose).unwrap().deisotope(&peaks).unwrap();
        assert_eq!(result.len(), 1);
    }

    #[test]
    fn test_single_charged_conversion() {
        let peaks = train(700.0, 3, 4, 1000.0);
        let params = DeisotopingParams::builder()
            .charge_range((1, 4))
            .build()
            .unwrap();
        let result = Deisotoper::new(params).unwrap().deisotope(&peaks).unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].charge, Some(3));
        let expected = 700.0 * 3.0 - 2.0 * PROTON;
        assert!((result[0].mz - expected).abs() < 1e-9);
    }

    #[test]
    fn test_decreasing_model() {
        let step = PROTON;
        let peaks = vec![
            CentroidPeak::new(600.0, 50.0, 0),
            CentroidPeak::new(600.0 + step, 100.0, 1),
            CentroidPeak::new(600.0 + 2.0 * step, 40.0, 2),
        ];
        let params = DeisotopingParams::builder()
            .charge_range((1, 1))
            .make_single_charged(false)
            .build()
            .unwrap();
        let result = Deisotoper::new(params).unwrap().deisotope(&peaks).unwrap();
        assert_eq!(result.len(), 2);
        assert_eq!(result[0].mz, 600.0);
        assert_eq!(result[0].charge, None);
        assert_eq!(result[1].charge, Some(1));
        assert_eq!(result[1].members, vec![1, 2]);

        let params = DeisotopingParams::builder()
            .charge_range((1, 1))
            .make_single_charged(false)
            .start_intensity_check(2)
            .build()
            .unwrap();
        let result = Deisotoper::new(params).unwrap().deisotope(&peaks).unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].members, vec![0, 1, 2]);

        let params = DeisotopingParams::builder()
            .charge_range((1, 1))
            .make_single_charged(false)
            .use_decreasing_model(false)
            .build()
            .unwrap();
        let result = Deisotoper::new(params).unwrap().deisotope(&peaks).unwrap();
        assert_eq!(result.len(), 1);
    }

    #[test]
    fn test_max_isotopes() {
        let peaks = train(800.0, 1, 6, 600.0);
        let params = DeisotopingParams::builder()
            .charge_range((1, 1))
            .isotope_range(2, 3)
            .make_single_charged(false)
            .build()
            .unwrap();
        let result = Deisotoper::new(params).unwrap().deisotope(&peaks).unwrap();
        assert_eq!(result.len(), 2);
        assert_eq!(result[0].members, vec![0, 1, 2]);
        assert_eq!(result[1].members, vec![3, 4, 5]);
    }

    #[test]
    fn test_overlapping_envelopes() {
        let mut peaks = train(500.0, 2, 4, 1000.0);
        peaks.extend(train(500.2, 1, 3, 300.0));
        peaks.push(CentroidPeak::new(900.0, 5.0, 0));
        let peaks = sorted(peaks);
        let params = DeisotopingParams::builder()
            .charge_range((1, 3))
            .make_single_charged(false)
            .build()
            .unwrap();
        let result = Deisotoper::new(params).unwrap().deisotope(&peaks).unwrap();
        let charges: Vec<_> = result.iter().map(|p| (p.mz, p.charge)).collect();
        assert_eq!(
            charges,
            vec![(500.0, Some(2)), (500.2, Some(1)), (900.0, None)]
        );
    }

    #[test]
    fn test_conservation_and_reduction() {
        let mut peaks = train(450.0, 2, 5, 800.0);
        peaks.extend(train(455.3, 3, 4, 400.0));
        peaks.extend(train(470.1, 1, 3, 200.0));
        peaks.push(CentroidPeak::new(480.77, 15.0, 0));
        peaks.push(CentroidPeak::new(492.31, 9.0, 0));
        let peaks = sorted(peaks);
        let engine = Deisotoper::new(DeisotopingParams::default()).unwrap();
        let result = engine.deisotope(&peaks).unwrap();

        assert!(result.len() < peaks.len());
        let mut seen = HashSet::new();
        for p in result.iter() {
            for m in p.members.iter() {
                assert!(seen.insert(*m), "peak {m} was claimed twice");
            }
        }
        assert_eq!(seen.len(), peaks.len());
        assert_eq!(result.iter().filter(|p| p.charge.is_some()).count(), 3);

        let no_trains = vec![
            CentroidPeak::new(100.0, 5.0, 0),
            CentroidPeak::new(133.3, 5.0, 1),
            CentroidPeak::new(170.9, 5.0, 2),
        ];
        let result = engine.deisotope(&no_trains).unwrap();
        assert_eq!(result.len(), no_trains.len());
    }

    #[test]
    fn test_idempotent() {
        let mut peaks = train(450.0, 2, 5, 800.0);
        peaks.extend(train(455.3, 3, 4, 400.0));
        peaks.push(CentroidPeak::new(480.77, 15.0, 0));
        let peaks = sorted(peaks);
        let first = Deisotoper::new(DeisotopingParams::default())
            .unwrap()
            .deisotope(&peaks)
            .unwrap();
        assert_eq!(first.len(), 3);

        let params = DeisotopingParams::builder()
            .isotope_range(1, 10)
            .build()
            .unwrap();
        let engine = Deisotoper::new(params).unwrap();
        let second = engine.deisotope(first.as_slice()).unwrap();
        assert_eq!(first.len(), second.len());
        for (a, b) in first.iter().zip(second.iter()) {
            assert_eq!(a.mz, b.mz);
            assert_eq!(a.intensity, b.intensity);
            assert_eq!(b.charge, None);
            assert_eq!(b.members.len(), 1);
            assert!(b.is_deisotoped());
        }

        let third = engine.deisotope(second.as_slice()).unwrap();
        for (a, b) in second.iter().zip(third.iter()) {
            assert_eq!(a.mz, b.mz);
            assert_eq!(a.intensity, b.intensity);
            assert_eq!(a.charge, b.charge);
        }
    }

    #[test]
    fn test_single_peak_train_keeps_its_mz() {
        let peaks = vec![CentroidPeak::new(480.77, 15.0, 0)];
        let params = DeisotopingParams::builder()
            .isotope_range(1, 10)
            .annotate_iso_peak_count(true)
            .keep_only_deisotoped(true)
            .build()
            .unwrap();
        let result = Deisotoper::new(params).unwrap().deisotope(&peaks).unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].mz, 480.77);
        assert_eq!(result[0].charge, None);
        assert_eq!(result[0].isotope_count, Some(1));
        assert!(result[0].is_deisotoped());
    }

    #[test]
    fn test_deisotoped_flag_without_charge_annotation() {
        let peaks = scenario_peaks();
        let mut params = scenario_params();
        params.annotate_charge = false;
        let result = Deisotoper::new(params).unwrap().deisotope(&peaks).unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].charge, None);
        assert!(result[0].is_deisotoped());

        params.charge_range = (3, 3);
        let result = Deisotoper::new(params).unwrap().deisotope(&peaks).unwrap();
        assert!(result.iter().all(|p| !p.is_deisotoped()));
    }

    #[test]
    fn test_precursor_mass_limit() {
        let peaks = train(700.0, 3, 4, 1000.0);
        let params = DeisotopingParams::builder()
            .charge_range((1, 4))
            .make_single_charged(false)
            .build()
            .unwrap();
        let engine = Deisotoper::new(params).unwrap();
        let light_precursor = neutral_mass(700.0, 2) + 1.0;
        let result = engine
            .deisotope_with_precursor(&peaks, Some(light_precursor))
            .unwrap();
        assert!(result.iter().all(|p| p.charge != Some(3)));

        let heavy_precursor = neutral_mass(700.0, 3) + 1.0;
        let result = engine
            .deisotope_with_precursor(&peaks, Some(heavy_precursor))
            .unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].charge, Some(3));

        // The tolerance is widened by the charge on the neutral mass scale
        let close_precursor = neutral_mass(700.0, 3) - 0.02;
        let result = engine
            .deisotope_with_precursor(&peaks, Some(close_precursor))
            .unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].charge, Some(3));
        let far_precursor = neutral_mass(700.0, 3) - 0.04;
        let result = engine
            .deisotope_with_precursor(&peaks, Some(far_precursor))
            .unwrap();
        assert!(result.iter().all(|p| p.charge != Some(3)));

        let mut params = *engine.params();
        params.use_precursor_mass = false;
        let result = Deisotoper::new(params)
            .unwrap()
            .deisotope_with_precursor(&peaks, Some(light_precursor))
            .unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].charge, Some(3));
    }

    #[test]
    fn test_invalid_input() {
        let peaks = vec![
            CentroidPeak::new(500.5, 60.0, 0),
            CentroidPeak::new(500.0, 100.0, 1),
        ];
        let engine = Deisotoper::new(DeisotopingParams::default()).unwrap();
        assert!(matches!(
            engine.deisotope(&peaks),
            Err(DeisotopingError::UnsortedPeaks { .. })
        ));

        let mut params = DeisotopingParams::default();
        params.charge_range = (0, 2);
        assert!(matches!(
            Deisotoper::new(params),
            Err(DeisotopingError::InvalidParameters(_))
        ));
    }

    #[test]
    fn test_parallel_determinism() {
        use rayon::prelude::*;

        let spectra: Vec<Vec<CentroidPeak>> = (0..16)
            .map(|i| {
                let offset = i as f64 * 3.7;
                let mut peaks = train(400.0 + offset, 2, 4, 500.0);
                peaks.extend(train(430.0 + offset, 1, 3, 250.0));
                sorted(peaks)
            })
            .collect();
        let engine = Deisotoper::new(DeisotopingParams::default()).unwrap();
        let serial: Vec<_> = spectra
            .iter()
            .map(|s| engine.deisotope(s).unwrap())
            .collect();
        let parallel: Vec<_> = spectra
            .par_iter()
            .map(|s| engine.deisotope(s).unwrap())
            .collect();
        for (a, b) in serial.iter().zip(parallel.iter()) {
            assert_eq!(a.len(), b.len());
            for (p, q) in a.iter().zip(b.iter()) {
                assert_eq!(p.mz, q.mz);
                assert_eq!(p.charge, q.charge);
                assert_eq!(p.members, q.members);
            }
        }
    }
}
