//! The configuration of a greedy deisotoping run
use mzpeaks::Tolerance;

use crate::charge::ChargeRange;
use crate::error::ParameterError;
use crate::intensity_model::IntensityModel;

/// The options controlling how isotopic trains are found and how they are
/// reported.
///
/// Build one with [`DeisotopingParams::builder`] or start from [`Default`] and
/// modify the fields directly. Every consumer calls [`DeisotopingParams::validate`]
/// before searching.
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DeisotopingParams {
    /// The allowed deviation between observed and expected isotopic spacing
    pub error_tolerance: Tolerance,
    /// The minimum to maximum charge state to consider, inclusive
    pub charge_range: ChargeRange,
    /// Drop peaks that were not assigned to any isotopic train
    pub keep_only_deisotoped: bool,
    /// The fewest peaks, the monoisotopic peak included, an accepted train may have
    pub min_isotopes: usize,
    /// The most peaks a train may be extended to
    pub max_isotopes: usize,
    /// Report the m/z of each train as though it were singly charged
    pub make_single_charged: bool,
    /// Record the charge state of each accepted train
    pub annotate_charge: bool,
    /// Record the number of peaks in each accepted train
    pub annotate_iso_peak_count: bool,
    /// Require trains to decrease in intensity after `start_intensity_check`
    pub use_decreasing_model: bool,
    /// The 1-based train position after which intensities must not increase
    pub start_intensity_check: usize,
    /// Sum the intensities of all train members instead of reporting the
    /// monoisotopic peak's intensity
    pub add_up_intensity: bool,
    /// Skip charge states whose implied neutral mass exceeds a known precursor mass
    pub use_precursor_mass: bool,
}

impl Default for DeisotopingParams {
    fn default() -> Self {
        Self {
            error_tolerance: Tolerance::Da(0.01),
            charge_range: (1, 3),
            keep_only_deisotoped: false,
            min_isotopes: 2,
            max_isotopes: 10,
            make_single_charged: true,
            annotate_charge: true,
            annotate_iso_peak_count: false,
            use_decreasing_model: true,
            start_intensity_check: 1,
            add_up_intensity: false,
            use_precursor_mass: true,
        }
    }
}

impl DeisotopingParams {
    pub fn builder() -> DeisotopingParamsBuilder {
        DeisotopingParamsBuilder::default()
    }

    pub fn validate(&self) -> Result<(), ParameterError> {
        let (min_charge, max_charge) = self.charge_range;
        if min_charge < 1 {
            return Err(ParameterError::MinChargeTooLow(min_charge));
        }
        if min_charge > max_charge {
            return Err(ParameterError::ChargeRangeInverted(min_charge, max_charge));
        }
        if self.min_isotopes < 1 {
            return Err(ParameterError::MinIsotopesTooLow(self.min_isotopes));
        }
        if self.min_isotopes > self.max_isotopes {
            return Err(ParameterError::IsotopeRangeInverted(
                self.min_isotopes,
                self.max_isotopes,
            ));
        }
        let tol = match self.error_tolerance {
            Tolerance::Da(t) | Tolerance::PPM(t) => t,
        };
        if !tol.is_finite() || tol < 0.0 {
            return Err(ParameterError::InvalidTolerance(tol));
        }
        Ok(())
    }

    pub fn min_charge(&self) -> i32 {
        self.charge_range.0
    }

    pub fn max_charge(&self) -> i32 {
        self.charge_range.1
    }

    /// The intensity heuristic these options describe
    pub fn intensity_model(&self) -> IntensityModel {
        if self.use_decreasing_model {
            IntensityModel::decreasing(self.start_intensity_check)
        } else {
            IntensityModel::Unconstrained
        }
    }

    /// The tolerance in Da to use for a train starting at `mz`
    pub fn tolerance_at(&self, mz: f64) -> f64 {
        match self.error_tolerance {
            Tolerance::Da(t) => t,
            Tolerance::PPM(t) => t * mz / 1e6,
        }
    }
}

/// Incrementally assemble a [`DeisotopingParams`], checking it on [`DeisotopingParamsBuilder::build`]
#[derive(Debug, Default, Clone)]
pub struct DeisotopingParamsBuilder {
    params: DeisotopingParams,
}

impl DeisotopingParamsBuilder {
    pub fn error_tolerance(mut self, error_tolerance: Tolerance) -> Self {
        self.params.error_tolerance = error_tolerance;
        self
    }

    pub fn charge_range(mut self, charge_range: ChargeRange) -> Self {
        self.params.charge_range = charge_range;
        self
    }

    pub fn keep_only_deisotoped(mut self, value: bool) -> Self {
        self.params.keep_only_deisotoped = value;
        self
    }

    pub fn isotope_range(mut self, min_isotopes: usize, max_isotopes: usize) -> Self {
        self.params.min_isotopes = min_isotopes;
        self.params.max_isotopes = max_isotopes;
        self
    }

    pub fn make_single_charged(mut self, value: bool) -> Self {
        self.params.make_single_charged = value;
        self
    }

    pub fn annotate_charge(mut self, value: bool) -> Self {
        self.params.annotate_charge = value;
        self
    }

    pub fn annotate_iso_peak_count(mut self, value: bool) -> Self {
        self.params.annotate_iso_peak_count = value;
        self
    }

    pub fn use_decreasing_model(mut self, value: bool) -> Self {
        self.params.use_decreasing_model = value;
        self
    }

    pub fn start_intensity_check(mut self, value: usize) -> Self {
        self.params.start_intensity_check = value;
        self
    }

    pub fn add_up_intensity(mut self, value: bool) -> Self {
        self.params.add_up_intensity = value;
        self
    }

    pub fn use_precursor_mass(mut self, value: bool) -> Self {
        self.params.use_precursor_mass = value;
        self
    }

    pub fn build(self) -> Result<DeisotopingParams, ParameterError> {
        self.params.validate()?;
        Ok(self.params)
    }
}
