//! Errors raised while configuring or running the deisotoper
use mzdata::spectrum::SpectrumConversionError;
use thiserror::Error;

/// A configuration that cannot describe a meaningful search
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParameterError {
    #[error("The minimum charge must be at least 1, got {0}")]
    MinChargeTooLow(i32),
    #[error("The minimum charge {0} exceeds the maximum charge {1}")]
    ChargeRangeInverted(i32, i32),
    #[error("The minimum number of isotopic peaks must be at least 1, got {0}")]
    MinIsotopesTooLow(usize),
    #[error("The minimum number of isotopic peaks {0} exceeds the maximum {1}")]
    IsotopeRangeInverted(usize, usize),
    #[error("The error tolerance must be a finite, non-negative value, got {0}")]
    InvalidTolerance(f64),
}

/// An error that might occur during deisotoping
#[derive(Debug, Error)]
pub enum DeisotopingError {
    #[error("Invalid deisotoping parameters: {0}")]
    InvalidParameters(
        #[source]
        #[from]
        ParameterError,
    ),
    #[error("Peaks must be sorted by ascending m/z, but peak {index} at {mz} follows {previous_mz}")]
    UnsortedPeaks {
        index: usize,
        mz: f64,
        previous_mz: f64,
    },
    #[error("Peak {index} repeats the m/z {mz} of the peak before it")]
    DuplicatePeakMz { index: usize, mz: f64 },
    #[error("Peak {index} has an invalid m/z or intensity ({mz}, {intensity})")]
    InvalidPeak {
        index: usize,
        mz: f64,
        intensity: f32,
    },
    #[error("Failed to obtain centroided peaks from the spectrum: {0}")]
    SpectrumConversion(
        #[source]
        #[from]
        SpectrumConversionError,
    ),
}
