use std::mem;

use itertools::multizip;

use mzdata::spectrum::bindata::{
    ArrayRetrievalError, ArrayType, BinaryCompressionType, BuildArrayMapFrom, BuildFromArrayMap,
    ByteArrayView,
};
use mzdata::spectrum::{BinaryArrayMap, BinaryDataArrayType, DataArray};
use mzpeaks::prelude::*;
use mzpeaks::CentroidPeak;

/// A peak in a deisotoped spectrum.
///
/// Either the representative of an isotopic train, or an input peak that no
/// train claimed, passed through unchanged.
#[derive(Debug, Default, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DeisotopedPeak {
    pub mz: f64,
    pub intensity: f32,
    /// The charge state of the train, when charges are annotated
    pub charge: Option<i32>,
    /// The number of peaks in the train, when counts are annotated
    pub isotope_count: Option<u32>,
    pub index: u32,
    /// The positions of the input peaks this peak was built from
    pub members: Vec<u32>,
    /// Whether an accepted isotopic train produced this peak
    #[cfg_attr(feature = "serde", serde(default))]
    pub deisotoped: bool,
}

impl DeisotopedPeak {
    pub fn new(
        mz: f64,
        intensity: f32,
        charge: Option<i32>,
        isotope_count: Option<u32>,
        index: u32,
        members: Vec<u32>,
        deisotoped: bool,
    ) -> Self {
        Self {
            mz,
            intensity,
            charge,
            isotope_count,
            index,
            members,
            deisotoped,
        }
    }

    /// Whether this peak came from an isotopic train rather than passing through
    /// unclaimed
    pub fn is_deisotoped(&self) -> bool {
        self.deisotoped
    }
}

mzpeaks::implement_centroidlike!(DeisotopedPeak, true);

impl From<&DeisotopedPeak> for CentroidPeak {
    fn from(value: &DeisotopedPeak) -> Self {
        CentroidPeak::new(value.mz, value.intensity, value.index)
    }
}

pub(crate) const ISOTOPIC_PEAK_COUNT_ARRAY_NAME: &str = "isotopic peak count array";

fn isotopic_peak_count_array_type() -> ArrayType {
    ArrayType::NonStandardDataArray {
        name: Box::new(ISOTOPIC_PEAK_COUNT_ARRAY_NAME.into()),
    }
}

impl BuildFromArrayMap for DeisotopedPeak {
    fn try_from_arrays(arrays: &BinaryArrayMap) -> Result<Vec<Self>, ArrayRetrievalError> {
        let mz_array = arrays.mzs()?;

        let intensity_array = arrays.intensities()?;

        let charge_array: Vec<Option<i32>> = match arrays.charges() {
            Ok(a) => a.iter().map(|z| if *z == 0 { None } else { Some(*z) }).collect(),
            Err(ArrayRetrievalError::NotFound(_)) => vec![None; mz_array.len()],
            Err(e) => return Err(e),
        };

        let count_array: Vec<Option<u32>> = match arrays.get(&isotopic_peak_count_array_type()) {
            Some(a) => a
                .to_i32()?
                .iter()
                .map(|n| if *n <= 0 { None } else { Some(*n as u32) })
                .collect(),
            None => vec![None; mz_array.len()],
        };

        let mut peaks = Vec::with_capacity(mz_array.len());

        peaks.extend(
            multizip((
                mz_array.iter(),
                intensity_array.iter(),
                charge_array.into_iter(),
                count_array.into_iter(),
            ))
            .enumerate()
            .map(|(i, (mz, intensity, charge, count))| {
                let deisotoped = charge.is_some() || count.is_some_and(|n| n > 1);
                DeisotopedPeak::new(
                    *mz,
                    *intensity,
                    charge,
                    count,
                    i as u32,
                    Vec::new(),
                    deisotoped,
                )
            }),
        );
        Ok(peaks)
    }
}

impl BuildArrayMapFrom for DeisotopedPeak {
    fn as_arrays(source: &[Self]) -> BinaryArrayMap {
        let mut arrays = BinaryArrayMap::new();

        let mut mz_array = DataArray::from_name_type_size(
            &ArrayType::MZArray,
            BinaryDataArrayType::Float64,
            source.len() * BinaryDataArrayType::Float64.size_of(),
        );

        let mut intensity_array = DataArray::from_name_type_size(
            &ArrayType::IntensityArray,
            BinaryDataArrayType::Float32,
            source.len() * BinaryDataArrayType::Float32.size_of(),
        );

        mz_array.compression = BinaryCompressionType::Decoded;
        intensity_array.compression = BinaryCompressionType::Decoded;

        let has_charges = source.iter().any(|p| p.charge.is_some());
        let has_counts = source.iter().any(|p| p.isotope_count.is_some());

        let mut charge_array = if has_charges {
            let mut array = DataArray::from_name_type_size(
                &ArrayType::ChargeArray,
                BinaryDataArrayType::Int32,
                source.len() * BinaryDataArrayType::Int32.size_of(),
            );
            array.compression = BinaryCompressionType::Decoded;
            Some(array)
        } else {
            None
        };

        let mut count_array = if has_counts {
            let mut array = DataArray::from_name_type_size(
                &isotopic_peak_count_array_type(),
                BinaryDataArrayType::Int32,
                source.len() * BinaryDataArrayType::Int32.size_of(),
            );
            array.compression = BinaryCompressionType::Decoded;
            Some(array)
        } else {
            None
        };

        for p in source.iter() {
            let raw_bytes: [u8; mem::size_of::<f64>()] = p.mz.to_le_bytes();
            mz_array.data.extend(raw_bytes);

            let raw_bytes: [u8; mem::size_of::<f32>()] = p.intensity.to_le_bytes();
            intensity_array.data.extend(raw_bytes);

            if let Some(array) = charge_array.as_mut() {
                let raw_bytes: [u8; mem::size_of::<i32>()] =
                    p.charge.unwrap_or_default().to_le_bytes();
                array.data.extend(raw_bytes);
            }

            if let Some(array) = count_array.as_mut() {
                let raw_bytes: [u8; mem::size_of::<i32>()] =
                    (p.isotope_count.unwrap_or_default() as i32).to_le_bytes();
                array.data.extend(raw_bytes);
            }
        }

        arrays.add(mz_array);
        arrays.add(intensity_array);
        if let Some(array) = charge_array {
            arrays.add(array);
        }
        if let Some(array) = count_array {
            arrays.add(array);
        }
        arrays
    }
}
