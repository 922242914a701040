use std::iter::Sum;
use std::ops::{Add, AddAssign};

#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct ProgressRecord {
    pub spectra: usize,
    pub input_peaks: usize,
    pub output_peaks: usize,
    pub deisotoped_peaks: usize,
}

impl Add for ProgressRecord {
    type Output = ProgressRecord;

    fn add(self, rhs: Self) -> Self::Output {
        let mut dup = self;
        dup += rhs;
        dup
    }
}

impl AddAssign for ProgressRecord {
    fn add_assign(&mut self, rhs: Self) {
        self.spectra += rhs.spectra;
        self.input_peaks += rhs.input_peaks;
        self.output_peaks += rhs.output_peaks;
        self.deisotoped_peaks += rhs.deisotoped_peaks;
    }
}

impl Sum for ProgressRecord {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), |acc, x| acc + x)
    }
}
