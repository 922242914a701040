use std::fs;
use std::io::{self, prelude::*};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Instant;

use clap::{ArgAction, Parser};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use mzdeiso::{Deisotoper, DeisotopingError, DeisotopingParams};
use mzpeaks::prelude::*;
use mzpeaks::Tolerance;

use crate::args::ArgChargeRange;
use crate::peak_list::{DeisotopedPeakList, Document, PeakList};
use crate::progress::ProgressRecord;

pub(crate) const DEFAULT_CONFIG_FILE: &str = "mzdeiso.toml";
pub(crate) const ENV_PREFIX: &str = "MZDEISO_";

fn non_negative_float_f64(s: &str) -> Result<f64, String> {
    let value = s.parse::<f64>().map_err(|e| e.to_string())?;
    if value < 0.0 {
        Err(format!("`{s}` is less than zero"))
    } else {
        Ok(value)
    }
}

#[derive(Debug, Error)]
pub enum MZDeisoError {
    #[error("An IO error occurred: {0}")]
    IOError(
        #[source]
        #[from]
        io::Error,
    ),
    #[error("Failed to read or write a peak list document: {0}")]
    JSONError(
        #[source]
        #[from]
        serde_json::Error,
    ),
    #[error("Failed to load the configuration: {0}")]
    ConfigurationError(String),
    #[error("Failed to build the thread pool: {0}")]
    ThreadPoolError(
        #[source]
        #[from]
        rayon::ThreadPoolBuildError,
    ),
    #[error("{0}")]
    DeisotopingError(
        #[source]
        #[from]
        DeisotopingError,
    ),
    #[error("Failed to deisotope {id}: {source}")]
    PeakListError {
        id: String,
        #[source]
        source: DeisotopingError,
    },
    #[error("Peak list {id} has {mz} m/z values but {intensity} intensities")]
    MismatchedArrays {
        id: String,
        mz: usize,
        intensity: usize,
    },
}

impl From<figment::Error> for MZDeisoError {
    fn from(value: figment::Error) -> Self {
        Self::ConfigurationError(value.to_string())
    }
}

/// Greedy deisotoping and charge state annotation of centroided peak lists.
///
/// Read a JSON peak list or an array of them from a file or stream, collapse
/// each isotopic envelope into a single peak, and write the resulting peak lists
/// out as JSON.
#[derive(Parser, Debug, Deserialize, Serialize)]
#[command(author, version)]
pub struct MZDeiso {
    /// The path to read the input peak lists from, or if '-' is passed, read from STDIN
    #[arg(default_value = "-")]
    pub input_file: String,

    /// The path to write the output peak lists to, or if '-' is passed, write to STDOUT
    #[arg(short = 'o', long = "output-file", default_value = "-")]
    pub output_file: PathBuf,

    /// The path to write a log file to, in addition to STDERR
    #[arg(short = 'l', long = "log-file")]
    pub log_file: Option<PathBuf>,

    /// A TOML configuration file to read additional parameters from.
    ///
    /// Configurations are also read from `mzdeiso.toml` in the working directory.
    /// Environment variables prefixed with `MZDEISO_` will be read too. Both take
    /// precedence over command line arguments.
    #[arg(long = "config-file")]
    pub config_file: Option<PathBuf>,

    /// The number of threads to use, passing a value < 1 to use all available threads
    #[arg(
        short='t',
        long="threads",
        default_value_t=-1,
    )]
    pub threads: i32,

    /// The mass accuracy tolerance between consecutive isotopic peaks, in Da unless `--ppm` is given
    #[arg(
        short = 'e',
        long = "tolerance",
        default_value_t = 0.01,
        value_parser = non_negative_float_f64
    )]
    pub tolerance: f64,

    /// Interpret `--tolerance` in parts-per-million of the monoisotopic peak's m/z
    #[arg(long = "ppm")]
    pub tolerance_ppm: bool,

    /// The range of charge states to consider for each peak denoted (low)-(high) or (high)
    #[arg(
        short = 'z',
        long = "charge-range",
        default_value_t=ArgChargeRange(1, 3),
    )]
    pub charge_range: ArgChargeRange,

    /// The fewest peaks an isotopic envelope may have, the monoisotopic peak included
    #[arg(short = 'm', long = "min-isotopes", default_value_t = 2)]
    pub min_isotopes: usize,

    /// The most peaks an isotopic envelope may be extended to
    #[arg(short = 'M', long = "max-isotopes", default_value_t = 10)]
    pub max_isotopes: usize,

    /// Drop peaks that are not part of any isotopic envelope
    #[arg(short = 'k', long = "keep-only-deisotoped")]
    pub keep_only_deisotoped: bool,

    /// Report each envelope at the m/z it would have at charge 1
    #[arg(long = "make-single-charged", default_value_t = true, action = ArgAction::Set)]
    pub make_single_charged: bool,

    /// Write a charge array, 0 marking peaks without an envelope
    #[arg(long = "annotate-charge", default_value_t = true, action = ArgAction::Set)]
    pub annotate_charge: bool,

    /// Write the number of peaks in each envelope
    #[arg(short = 'c', long = "annotate-isotope-count")]
    pub annotate_iso_peak_count: bool,

    /// Require envelope intensities to decrease after `--start-intensity-check`
    #[arg(long = "decreasing-model", default_value_t = true, action = ArgAction::Set)]
    pub use_decreasing_model: bool,

    /// The 1-based envelope position from which intensities must decrease
    #[arg(long = "start-intensity-check", default_value_t = 1)]
    pub start_intensity_check: usize,

    /// Report the summed intensity of each envelope instead of its monoisotopic peak's
    #[arg(short = 's', long = "add-up-intensity")]
    pub add_up_intensity: bool,

    /// Use the precursor mass of each peak list, when known, to rule out charge states
    #[arg(long = "use-precursor-mass", default_value_t = true, action = ArgAction::Set)]
    pub use_precursor_mass: bool,

    /// Write indented JSON
    #[arg(long = "pretty")]
    pub pretty: bool,
}

impl MZDeiso {
    /// Layer the configuration file and environment over these arguments
    pub fn configure(self) -> Result<Self, MZDeisoError> {
        let config_file = match self.config_file.as_ref() {
            Some(path) => {
                if !path.exists() {
                    return Err(io::Error::new(
                        io::ErrorKind::NotFound,
                        format!("Configuration file {} not found", path.display()),
                    )
                    .into());
                }
                Toml::file_exact(path)
            }
            None => Toml::file(DEFAULT_CONFIG_FILE),
        };
        let config: Self = Figment::from(Serialized::defaults(self))
            .merge(config_file)
            .merge(Env::prefixed(ENV_PREFIX))
            .extract()?;
        Ok(config)
    }

    fn create_threadpool(&self) -> Result<rayon::ThreadPool, MZDeisoError> {
        let num_threads = if self.threads > 0 {
            self.threads as usize
        } else {
            thread::available_parallelism()?.into()
        };
        debug!("Using {} cores", num_threads);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .build()?;
        Ok(pool)
    }

    pub fn error_tolerance(&self) -> Tolerance {
        if self.tolerance_ppm {
            Tolerance::PPM(self.tolerance)
        } else {
            Tolerance::Da(self.tolerance)
        }
    }

    pub fn make_params(&self) -> Result<DeisotopingParams, MZDeisoError> {
        let params = DeisotopingParams::builder()
            .error_tolerance(self.error_tolerance())
            .charge_range(self.charge_range.into())
            .isotope_range(self.min_isotopes, self.max_isotopes)
            .keep_only_deisotoped(self.keep_only_deisotoped)
            .make_single_charged(self.make_single_charged)
            .annotate_charge(self.annotate_charge)
            .annotate_iso_peak_count(self.annotate_iso_peak_count)
            .use_decreasing_model(self.use_decreasing_model)
            .start_intensity_check(self.start_intensity_check)
            .add_up_intensity(self.add_up_intensity)
            .use_precursor_mass(self.use_precursor_mass)
            .build()
            .map_err(DeisotopingError::from)?;
        Ok(params)
    }

    pub fn main(&self) -> Result<(), MZDeisoError> {
        info!(
            "mzdeiso v{}",
            option_env!("CARGO_PKG_VERSION").unwrap_or("unknown")
        );
        info!("Input: {}", self.input_file);
        info!("Output: {}", self.output_file.display());
        let engine = Deisotoper::new(self.make_params()?)?;
        let document = self.read_input()?;
        let single = document.is_single();
        let peak_lists = document.into_vec();

        let start = Instant::now();
        let pool = self.create_threadpool()?;
        let (results, prog) = pool.install(|| process_peak_lists(&engine, &peak_lists))?;
        info!("Spectra: {}", prog.spectra);
        info!("Input Peaks: {}", prog.input_peaks);
        info!(
            "Output Peaks: {} ({} deisotoped)",
            prog.output_peaks, prog.deisotoped_peaks
        );
        info!("Elapsed Time: {:0.3?}", start.elapsed());

        let document = if single {
            match results.into_iter().next() {
                Some(result) => Document::Single(result),
                None => Document::Many(Vec::new()),
            }
        } else {
            Document::Many(results)
        };
        self.write_output(&document)
    }

    fn read_input(&self) -> Result<Document<PeakList>, MZDeisoError> {
        let document = if self.input_file == "-" {
            let mut buffer = String::new();
            io::stdin().lock().read_to_string(&mut buffer)?;
            serde_json::from_str(&buffer)?
        } else {
            let fh = io::BufReader::new(fs::File::open(&self.input_file)?);
            serde_json::from_reader(fh)?
        };
        Ok(document)
    }

    fn write_output(&self, document: &Document<DeisotopedPeakList>) -> Result<(), MZDeisoError> {
        if self.output_file == Path::new("-") {
            let stdout = io::stdout();
            let handle = io::BufWriter::new(stdout.lock());
            self.write_document(handle, document)
        } else {
            let handle = io::BufWriter::new(fs::File::create(&self.output_file)?);
            self.write_document(handle, document)
        }
    }

    fn write_document<W: Write>(
        &self,
        mut handle: W,
        document: &Document<DeisotopedPeakList>,
    ) -> Result<(), MZDeisoError> {
        if self.pretty {
            serde_json::to_writer_pretty(&mut handle, document)?;
        } else {
            serde_json::to_writer(&mut handle, document)?;
        }
        writeln!(handle)?;
        handle.flush()?;
        Ok(())
    }
}

/// Deisotope each peak list in parallel, preserving their order
pub fn process_peak_lists(
    engine: &Deisotoper,
    peak_lists: &[PeakList],
) -> Result<(Vec<DeisotopedPeakList>, ProgressRecord), MZDeisoError> {
    let annotate_charge = engine.params().annotate_charge;
    let annotate_iso_peak_count = engine.params().annotate_iso_peak_count;
    let solved: Vec<(DeisotopedPeakList, ProgressRecord)> = peak_lists
        .par_iter()
        .enumerate()
        .map(|(i, peak_list)| {
            let peaks = peak_list.to_peaks(i)?;
            let deisotoped = engine
                .deisotope_with_precursor(&peaks, peak_list.precursor_neutral_mass())
                .map_err(|source| MZDeisoError::PeakListError {
                    id: peak_list.label(i),
                    source,
                })?;
            let prog = ProgressRecord {
                spectra: 1,
                input_peaks: peaks.len(),
                output_peaks: deisotoped.len(),
                deisotoped_peaks: deisotoped.iter().filter(|p| p.is_deisotoped()).count(),
            };
            let output = DeisotopedPeakList::from_peaks(
                peak_list.id.clone(),
                deisotoped.as_slice(),
                annotate_charge,
                annotate_iso_peak_count,
            );
            Ok((output, prog))
        })
        .collect::<Result<_, MZDeisoError>>()?;

    let prog: ProgressRecord = solved.iter().map(|(_, p)| *p).sum();
    let results: Vec<_> = solved.into_iter().map(|(r, _)| r).collect();
    Ok((results, prog))
}
