/*! Description of the isotopic trains found while deisotoping a spectrum */
use mzpeaks::prelude::*;

use crate::charge::{isotopic_spacing, to_singly_charged};
use crate::intensity_model::IntensityModel;
use crate::peaks::WorkingPeakSet;

/// A run of peaks hypothesised to be the isotopic envelope of one analyte at
/// one charge state, consecutive members spaced one isotopic unit apart.
#[derive(Debug, Clone)]
pub struct IsotopicTrain {
    /// The positions of the member peaks in ascending m/z order, the
    /// monoisotopic peak first
    pub members: Vec<usize>,
    /// The charge state the spacing was tested against
    pub charge: i32,
}

impl IsotopicTrain {
    #[inline]
    pub fn new(members: Vec<usize>, charge: i32) -> Self {
        Self { members, charge }
    }

    /// Grow a train from the peak at position `start`.
    ///
    /// Each step looks for the unclaimed peak nearest to the expected next isotopic
    /// m/z, within `tolerance` Da of it. Growth stops at `max_isotopes` members, at
    /// the first gap, or at the first peak rejected by `intensity_model`.
    pub fn extend_from<C: CentroidLike>(
        peaks: &WorkingPeakSet<'_, C>,
        start: usize,
        charge: i32,
        tolerance: f64,
        max_isotopes: usize,
        intensity_model: IntensityModel,
    ) -> Self {
        let spacing = isotopic_spacing(charge);
        let mut members = Vec::with_capacity(max_isotopes.min(8));
        members.push(start);
        let mut end = start;
        while members.len() < max_isotopes {
            let expected = peaks[end].mz() + spacing;
            let next = match peaks.find_next(end, expected, tolerance) {
                Some(i) => i,
                None => break,
            };
            if !intensity_model.accepts(
                members.len(),
                peaks[end].intensity(),
                peaks[next].intensity(),
            ) {
                break;
            }
            members.push(next);
            end = next;
        }
        Self::new(members, charge)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// The position of the monoisotopic peak
    #[inline]
    pub fn start(&self) -> usize {
        self.members[0]
    }

    pub fn total_intensity<C: CentroidLike>(&self, peaks: &[C]) -> f32 {
        self.members.iter().map(|i| peaks[*i].intensity()).sum()
    }

    /// The m/z of the monoisotopic peak, optionally converted to charge 1
    pub fn monoisotopic_mz<C: CentroidLike>(&self, peaks: &[C], single_charged: bool) -> f64 {
        let mz = peaks[self.start()].mz();
        if single_charged {
            to_singly_charged(mz, self.charge)
        } else {
            mz
        }
    }
}
