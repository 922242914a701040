//! * High level APIs for running deisotoping operations
use mzdata::prelude::*;
use mzdata::spectrum::bindata::BuildArrayMapFrom;
use mzdata::spectrum::{MultiLayerSpectrum, SignalContinuity};
use mzpeaks::{CentroidLike, CentroidPeak, MZPeakSetType};
use tracing::debug;

use crate::charge::neutral_mass;
use crate::deisotoper::Deisotoper;
use crate::error::DeisotopingError;
use crate::params::DeisotopingParams;
use crate::solution::DeisotopedPeak;

/// A single-shot deisotoping operation on the provided peak list.
///
/// # Arguments
/// - `peaks`: The centroided mass spectrum to process, sorted by ascending m/z
/// - `params`: The options controlling the search and the reported peaks
///
/// # Note
/// If you are calling this function with the same parameters on many peak lists,
/// create a [`Deisotoper`] once and call [`Deisotoper::deisotope`] instead to avoid
/// re-validating `params` every time.
pub fn deisotope_peaks<C: CentroidLike>(
    peaks: &[C],
    params: DeisotopingParams,
) -> Result<MZPeakSetType<DeisotopedPeak>, DeisotopingError> {
    Deisotoper::new(params)?.deisotope(peaks)
}

/// A single-shot deisotoping operation applied to `spectrum` in place.
///
/// See [`Deisotoper::deisotope_spectrum`].
pub fn deisotope_spectrum(
    spectrum: &mut MultiLayerSpectrum,
    params: &DeisotopingParams,
) -> Result<MZPeakSetType<DeisotopedPeak>, DeisotopingError> {
    Deisotoper::new(*params)?.deisotope_spectrum(spectrum)
}

/// The neutral mass of the first precursor ion of `spectrum`, if both its m/z and
/// charge are known.
pub fn precursor_neutral_mass(spectrum: &MultiLayerSpectrum) -> Option<f64> {
    spectrum.precursor().and_then(|prec| {
        let ion = prec.ion()?;
        ion.charge
            .filter(|z| *z != 0)
            .map(|z| neutral_mass(ion.mz, z.abs()))
    })
}

impl Deisotoper {
    /// Deisotope the centroided peaks of `spectrum` and replace its signal with the
    /// result.
    ///
    /// The precursor ion's neutral mass, when known, limits the charge states
    /// considered. Afterwards the spectrum's centroids are the deisotoped peaks, any
    /// deconvoluted peak layer is removed, and its binary arrays hold only the m/z,
    /// intensity and requested annotation arrays. All other arrays are discarded.
    ///
    /// # Errors
    /// Fails if the spectrum is not centroided or its peaks are unusable.
    pub fn deisotope_spectrum(
        &self,
        spectrum: &mut MultiLayerSpectrum,
    ) -> Result<MZPeakSetType<DeisotopedPeak>, DeisotopingError> {
        let precursor_mass = precursor_neutral_mass(spectrum);
        let peaks = spectrum.try_build_centroids()?;
        let n_before = peaks.len();
        let result = self.deisotope_with_precursor(peaks.as_slice(), precursor_mass)?;
        debug!(
            "Deisotoped {} from {} to {} peaks",
            spectrum.id(),
            n_before,
            result.len()
        );

        let centroids: Vec<CentroidPeak> = result.iter().map(CentroidPeak::from).collect();
        spectrum.peaks = Some(MZPeakSetType::new(centroids));
        spectrum.deconvoluted_peaks = None;
        spectrum.arrays = Some(DeisotopedPeak::as_arrays(result.as_slice()));
        spectrum.description_mut().signal_continuity = SignalContinuity::Centroid;
        Ok(result)
    }
}
