pub mod charge;
pub mod error;
pub mod intensity_model;
pub mod isotopic_train;
pub mod params;
pub mod peaks;
pub mod solution;
pub mod api;

pub mod deisotoper;

pub use crate::api::{deisotope_peaks, deisotope_spectrum};
pub use crate::deisotoper::Deisotoper;
pub use crate::error::{DeisotopingError, ParameterError};
pub use crate::params::{DeisotopingParams, DeisotopingParamsBuilder};
pub use crate::solution::DeisotopedPeak;
