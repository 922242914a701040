//! Helper types for tracking which peaks of a spectrum have been claimed by an
//! isotopic train.

use std::ops::Index;

use mzpeaks::prelude::*;

use crate::error::DeisotopingError;

/// A borrowed, m/z-sorted peak list paired with a mask of claimed peaks.
///
/// Peaks are addressed by their position in the slice, not by whatever index
/// they carry themselves.
#[derive(Debug)]
pub struct WorkingPeakSet<'a, C: CentroidLike> {
    peaks: &'a [C],
    claimed: Vec<bool>,
    n_claimed: usize,
}

impl<'a, C: CentroidLike> WorkingPeakSet<'a, C> {
    /// Wrap `peaks` after checking that they are usable.
    ///
    /// # Errors
    /// Fails if any m/z is not finite, if any intensity is negative or not finite,
    /// or if the m/z values are not strictly ascending.
    pub fn new(peaks: &'a [C]) -> Result<Self, DeisotopingError> {
        check_peaks(peaks)?;
        Ok(Self {
            peaks,
            claimed: vec![false; peaks.len()],
            n_claimed: 0,
        })
    }

    pub fn len(&self) -> usize {
        self.peaks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peaks.is_empty()
    }

    pub fn as_slice(&self) -> &'a [C] {
        self.peaks
    }

    #[inline]
    pub fn is_claimed(&self, index: usize) -> bool {
        self.claimed[index]
    }

    pub fn claim(&mut self, index: usize) {
        if !self.claimed[index] {
            self.claimed[index] = true;
            self.n_claimed += 1;
        }
    }

    pub fn claim_all(&mut self, indices: &[usize]) {
        for i in indices {
            self.claim(*i);
        }
    }

    pub fn claimed_count(&self) -> usize {
        self.n_claimed
    }

    /// Iterate over the positions of peaks that have not been claimed yet
    pub fn unclaimed(&self) -> impl Iterator<Item = usize> + '_ {
        self.claimed
            .iter()
            .enumerate()
            .filter_map(|(i, c)| if *c { None } else { Some(i) })
    }

    /// Find the unclaimed peak after position `after` lying within `expected ± tolerance`,
    /// preferring the one closest to `expected` and the lower m/z on a tie.
    pub fn find_next(&self, after: usize, expected: f64, tolerance: f64) -> Option<usize> {
        let lower = expected - tolerance;
        let upper = expected + tolerance;
        let start = after + 1;
        if start >= self.peaks.len() {
            return None;
        }
        let offset = self.peaks[start..].partition_point(|p| p.mz() < lower);

        let mut best: Option<(usize, f64)> = None;
        for (i, peak) in self.peaks.iter().enumerate().skip(start + offset) {
            let mz = peak.mz();
            if mz > upper {
                break;
            }
            if self.claimed[i] {
                continue;
            }
            let err = (mz - expected).abs();
            match best {
                Some((_, best_err)) if err >= best_err => {}
                _ => best = Some((i, err)),
            }
        }
        best.map(|(i, _)| i)
    }
}

impl<'a, C: CentroidLike> Index<usize> for WorkingPeakSet<'a, C> {
    type Output = C;

    fn index(&self, index: usize) -> &Self::Output {
        &self.peaks[index]
    }
}

/// Verify that `peaks` are sorted by strictly ascending m/z and carry finite,
/// non-negative values.
pub fn check_peaks<C: CentroidLike>(peaks: &[C]) -> Result<(), DeisotopingError> {
    let mut previous_mz = f64::NEG_INFINITY;
    for (index, peak) in peaks.iter().enumerate() {
        let mz = peak.mz();
        let intensity = peak.intensity();
        if !mz.is_finite() || !intensity.is_finite() || intensity < 0.0 {
            return Err(DeisotopingError::InvalidPeak {
                index,
                mz,
                intensity,
            });
        }
        if mz == previous_mz {
            return Err(DeisotopingError::DuplicatePeakMz { index, mz });
        }
        if mz < previous_mz {
            return Err(DeisotopingError::UnsortedPeaks {
                index,
                mz,
                previous_mz,
            });
        }
        previous_mz = mz;
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use mzpeaks::CentroidPeak;

    use super::*;

    fn make_peaks() -> Vec<CentroidPeak> {
        vec![
            CentroidPeak::new(500.0, 100.0, 0),
            CentroidPeak::new(500.25, 10.0, 1),
            CentroidPeak::new(500.75, 60.0, 2),
            CentroidPeak::new(501.0, 20.0, 3),
        ]
    }

    #[test]
    fn test_find_next_nearest() {
        let peaks = make_peaks();
        let mut ws = WorkingPeakSet::new(&peaks).unwrap();
        assert_eq!(ws.find_next(0, 500.7, 0.3), Some(2));
        assert_eq!(ws.find_next(0, 500.3, 0.3), Some(1));
        ws.claim(1);
        assert_eq!(ws.find_next(0, 500.3, 0.5), Some(2));
        assert_eq!(ws.find_next(0, 500.3, 0.3), None);
        assert_eq!(ws.find_next(0, 502.0, 0.02), None);
        assert_eq!(ws.find_next(3, 501.5, 1.0), None);
        assert_eq!(ws.claimed_count(), 1);
        assert_eq!(ws.unclaimed().collect::<Vec<_>>(), vec![0, 2, 3]);
    }

    #[test]
    fn test_find_next_tie() {
        let peaks = make_peaks();
        let ws = WorkingPeakSet::new(&peaks).unwrap();
        assert_eq!(ws.find_next(0, 500.5, 0.25), Some(1));
    }

    #[test]
    fn test_only_after_end() {
        let peaks = make_peaks();
        let ws = WorkingPeakSet::new(&peaks).unwrap();
        assert_eq!(ws.find_next(2, 500.5, 0.25), None);
        assert_eq!(ws.find_next(1, 500.5, 0.25), Some(2));
    }

    #[test]
    fn test_rejects_bad_input() {
        let peaks = vec![
            CentroidPeak::new(501.0, 100.0, 0),
            CentroidPeak::new(500.0, 10.0, 1),
        ];
        assert!(matches!(
            check_peaks(&peaks),
            Err(DeisotopingError::UnsortedPeaks { index: 1, .. })
        ));

        let peaks = vec![
            CentroidPeak::new(500.0, 100.0, 0),
            CentroidPeak::new(500.0, 10.0, 1),
        ];
        assert!(matches!(
            check_peaks(&peaks),
            Err(DeisotopingError::DuplicatePeakMz { index: 1, .. })
        ));

        let peaks = vec![CentroidPeak::new(f64::NAN, 100.0, 0)];
        assert!(matches!(
            check_peaks(&peaks),
            Err(DeisotopingError::InvalidPeak { index: 0, .. })
        ));

        let peaks = vec![CentroidPeak::new(500.0, -1.0, 0)];
        assert!(matches!(
            check_peaks(&peaks),
            Err(DeisotopingError::InvalidPeak { index: 0, .. })
        ));
    }
}
