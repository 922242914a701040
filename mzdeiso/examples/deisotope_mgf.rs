//! Deisotope every spectrum in an MGF file with [`mzdeiso::Deisotoper`] and tabulate charge states
use std::{collections::BTreeMap, env, io};

use mzdata::io::mgf::MGFReader;
use mzdata::prelude::*;
use mzdeiso::{Deisotoper, DeisotopingParams};
use mzpeaks::Tolerance;

fn main() -> io::Result<()> {
    let path = env::args()
        .nth(1)
        .unwrap_or_else(|| "test/data/spectra.mgf".to_string());
    let reader = MGFReader::open_path(path)?;

    // Product ion spectra from high resolution instruments
    let params = DeisotopingParams::builder()
        .error_tolerance(Tolerance::PPM(10.0))
        .charge_range((1, 4))
        .annotate_iso_peak_count(true)
        .build()
        .unwrap();
    let engine = Deisotoper::new(params).unwrap();

    let mut table: BTreeMap<i32, usize> = BTreeMap::new();
    let mut n_raw = 0;
    let mut n_deisotoped = 0;
    for mut spectrum in reader {
        n_raw += spectrum.peaks.as_ref().map(|p| p.len()).unwrap_or_default();
        let peaks = engine.deisotope_spectrum(&mut spectrum).unwrap();
        n_deisotoped += peaks.len();
        for peak in peaks.iter() {
            *table.entry(peak.charge.unwrap_or_default()).or_default() += 1;
        }
    }

    for (z, count) in table.iter() {
        eprintln!("{z} => {count}");
    }
    eprintln!("{n_raw} raw centroids reduced to {n_deisotoped} peaks");
    Ok(())
}
