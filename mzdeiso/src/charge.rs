//! Charge state ranges and the order in which they are tried
use std::cmp;

use chemical_elements::PROTON as _PROTON;

/// The mass of a proton, the charge carrier assumed throughout
pub const PROTON: f64 = _PROTON;

/// A pair of minimum and maximum charge states, inclusive
pub type ChargeRange = (i32, i32);

/// The expected m/z distance between consecutive isotopic peaks at `charge`
#[inline]
pub fn isotopic_spacing(charge: i32) -> f64 {
    PROTON / charge as f64
}

/// Convert an m/z observed at `charge` to the m/z the same analyte would have
/// at charge 1.
#[inline]
pub fn to_singly_charged(mz: f64, charge: i32) -> f64 {
    let z = charge as f64;
    mz * z - (z - 1.0) * PROTON
}

/// The neutral mass implied by an m/z observed at `charge`
#[inline]
pub fn neutral_mass(mz: f64, charge: i32) -> f64 {
    (mz - PROTON) * charge as f64
}

/// Iterate over a [`ChargeRange`] from the highest charge state to the lowest.
#[derive(Debug, Clone)]
pub struct ChargeRangeIter {
    pub min: i32,
    pub max: i32,
    current: i32,
}

impl ChargeRangeIter {
    pub fn new(min: i32, max: i32) -> ChargeRangeIter {
        let low = cmp::min(min, max);
        let high = cmp::max(min, max);
        ChargeRangeIter {
            min: low,
            max: high,
            current: high,
        }
    }

    pub fn next_charge(&mut self) -> Option<i32> {
        if self.current < self.min {
            None
        } else {
            let z = self.current;
            self.current -= 1;
            Some(z)
        }
    }

    pub fn len(&self) -> usize {
        (self.current - self.min + 1).max(0) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Iterator for ChargeRangeIter {
    type Item = i32;

    fn next(&mut self) -> Option<i32> {
        self.next_charge()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.len();
        (n, Some(n))
    }
}

impl ExactSizeIterator for ChargeRangeIter {}

impl From<ChargeRange> for ChargeRangeIter {
    fn from(pair: ChargeRange) -> ChargeRangeIter {
        ChargeRangeIter::new(pair.0, pair.1)
    }
}
