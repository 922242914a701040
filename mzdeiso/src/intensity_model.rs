//! Heuristics constraining how intensity may change along an isotopic train

/// Decides whether a peak whose spacing fits an isotopic train may also join
/// it on intensity grounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum IntensityModel {
    /// Any intensity is accepted
    #[default]
    Unconstrained,
    /// From 0-based train position `start_check` onwards, a candidate may not be
    /// more intense than the peak it follows.
    Decreasing { start_check: usize },
}

impl IntensityModel {
    /// Build a [`IntensityModel::Decreasing`] from a 1-based starting position.
    ///
    /// Position 1 means the second peak must not exceed the first, position 2 means
    /// the third must not exceed the second. Zero is treated as 1.
    pub fn decreasing(start_intensity_check: usize) -> Self {
        Self::Decreasing {
            start_check: start_intensity_check.max(1),
        }
    }

    /// Test a candidate that would become the `position`-th member (0-based) of a
    /// train currently ending with a peak of intensity `previous`.
    #[inline]
    pub fn accepts(&self, position: usize, previous: f32, candidate: f32) -> bool {
        match self {
            Self::Unconstrained => true,
            Self::Decreasing { start_check } => position < *start_check || candidate <= previous,
        }
    }
}
