use std::{error::Error, fmt::Display, num::ParseIntError, str::FromStr};

use serde::{Deserialize, Serialize};

use mzdeiso::charge::ChargeRange;

/// A charge range given on the command line as `(low)-(high)` or `(high)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArgChargeRange(pub i32, pub i32);

impl Default for ArgChargeRange {
    fn default() -> Self {
        Self(1, 3)
    }
}

#[derive(Debug)]
pub enum ChargeRangeParseError {
    MalformedStart(ParseIntError),
    MalformedEnd(ParseIntError),
}

impl Display for ChargeRangeParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChargeRangeParseError::MalformedStart(e) => {
                write!(f, "Failed to parse charge range start {e}")
            }
            ChargeRangeParseError::MalformedEnd(e) => {
                write!(f, "Failed to parse charge range end {e}")
            }
        }
    }
}

impl Error for ChargeRangeParseError {}

impl FromStr for ArgChargeRange {
    type Err = ChargeRangeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (start_s, end_s) = if let Some((a, b)) = s.split_once('-') {
            (a, b)
        } else if let Some((a, b)) = s.split_once(':') {
            (a, b)
        } else {
            ("1", s)
        };
        let start = start_s
            .trim()
            .parse()
            .map_err(ChargeRangeParseError::MalformedStart)?;
        let end = end_s
            .trim()
            .parse()
            .map_err(ChargeRangeParseError::MalformedEnd)?;
        Ok(Self(start, end))
    }
}

impl Display for ArgChargeRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.0, self.1)
    }
}

impl From<ArgChargeRange> for ChargeRange {
    fn from(value: ArgChargeRange) -> Self {
        (value.0, value.1)
    }
}
