//! The JSON documents read and written by the command line tool
use serde::{Deserialize, Serialize};

use mzdeiso::charge::neutral_mass;
use mzdeiso::DeisotopedPeak;
use mzpeaks::CentroidPeak;

use crate::driver::MZDeisoError;

/// A centroided peak list as parallel m/z and intensity arrays
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PeakList {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub mz: Vec<f64>,
    pub intensity: Vec<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub precursor_mz: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub precursor_charge: Option<i32>,
}

impl PeakList {
    pub fn label(&self, position: usize) -> String {
        self.id
            .clone()
            .unwrap_or_else(|| format!("index={position}"))
    }

    pub fn to_peaks(&self, position: usize) -> Result<Vec<CentroidPeak>, MZDeisoError> {
        if self.mz.len() != self.intensity.len() {
            return Err(MZDeisoError::MismatchedArrays {
                id: self.label(position),
                mz: self.mz.len(),
                intensity: self.intensity.len(),
            });
        }
        Ok(self
            .mz
            .iter()
            .zip(self.intensity.iter())
            .enumerate()
            .map(|(i, (mz, intensity))| CentroidPeak::new(*mz, *intensity, i as u32))
            .collect())
    }

    pub fn precursor_neutral_mass(&self) -> Option<f64> {
        match (self.precursor_mz, self.precursor_charge) {
            (Some(mz), Some(z)) if z != 0 => Some(neutral_mass(mz, z.abs())),
            _ => None,
        }
    }
}

/// A deisotoped peak list, with annotation arrays present only when requested
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeisotopedPeakList {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub mz: Vec<f64>,
    pub intensity: Vec<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub charge: Option<Vec<i32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub isotope_count: Option<Vec<u32>>,
}

impl DeisotopedPeakList {
    pub fn from_peaks(
        id: Option<String>,
        peaks: &[DeisotopedPeak],
        annotate_charge: bool,
        annotate_iso_peak_count: bool,
    ) -> Self {
        let mz = peaks.iter().map(|p| p.mz).collect();
        let intensity = peaks.iter().map(|p| p.intensity).collect();
        let charge = annotate_charge.then(|| {
            peaks
                .iter()
                .map(|p| p.charge.unwrap_or_default())
                .collect()
        });
        let isotope_count = annotate_iso_peak_count.then(|| {
            peaks
                .iter()
                .map(|p| p.isotope_count.unwrap_or(1))
                .collect()
        });
        Self {
            id,
            mz,
            intensity,
            charge,
            isotope_count,
        }
    }
}

/// One peak list or many, written back out in the same shape it was read in
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Document<T> {
    Many(Vec<T>),
    Single(T),
}

impl<T> Document<T> {
    pub fn into_vec(self) -> Vec<T> {
        match self {
            Self::Many(items) => items,
            Self::Single(item) => vec![item],
        }
    }

    pub fn is_single(&self) -> bool {
        matches!(self, Self::Single(_))
    }
}
