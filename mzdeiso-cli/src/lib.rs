mod args;
mod driver;
mod peak_list;
mod progress;

pub use args::*;
pub use driver::{process_peak_lists, MZDeiso, MZDeisoError};
pub use peak_list::{DeisotopedPeakList, Document, PeakList};
pub use progress::ProgressRecord;
