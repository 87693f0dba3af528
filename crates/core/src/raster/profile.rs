//! Raster profile: georeferencing and encoding metadata

use crate::crs::CRS;
use crate::raster::{Bounds, GeoTransform};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Pixel sample type of a raster band
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    U8,
    U16,
    U32,
    I8,
    I16,
    I32,
    F32,
    F64,
}

impl DataType {
    /// Map TIFF SampleFormat + BitsPerSample to a data type
    pub fn from_tiff(sample_format: u16, bits: u16) -> Option<Self> {
        match (sample_format, bits) {
            (1, 8) => Some(Self::U8),
            (1, 16) => Some(Self::U16),
            (1, 32) => Some(Self::U32),
            (2, 8) => Some(Self::I8),
            (2, 16) => Some(Self::I16),
            (2, 32) => Some(Self::I32),
            (3, 32) => Some(Self::F32),
            (3, 64) => Some(Self::F64),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::U8 => "uint8",
            Self::U16 => "uint16",
            Self::U32 => "uint32",
            Self::I8 => "int8",
            Self::I16 => "int16",
            Self::I32 => "int32",
            Self::F32 => "float32",
            Self::F64 => "float64",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// TIFF compression scheme
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Compression {
    None,
    Lzw,
    Deflate,
    /// Any other TIFF compression code (read-only)
    Other(u16),
}

impl Compression {
    pub fn from_tiff(code: u16) -> Self {
        match code {
            1 => Self::None,
            5 => Self::Lzw,
            8 | 32946 => Self::Deflate,
            other => Self::Other(other),
        }
    }
}

/// Georeferencing and encoding metadata of a raster.
///
/// Copied from a source file, adjusted with the `with_*` builders, and then
/// handed to the writer by reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RasterProfile {
    pub width: usize,
    pub height: usize,
    pub crs: Option<CRS>,
    pub transform: GeoTransform,
    pub band_count: usize,
    pub dtype: DataType,
    pub nodata: Option<f64>,
    pub compression: Compression,
}

impl RasterProfile {
    /// Profile for an in-memory raster with default georeferencing
    pub fn new(width: usize, height: usize, band_count: usize, dtype: DataType) -> Self {
        Self {
            width,
            height,
            crs: None,
            transform: GeoTransform::default(),
            band_count,
            dtype,
            nodata: None,
            compression: Compression::None,
        }
    }

    pub fn with_band_count(mut self, band_count: usize) -> Self {
        self.band_count = band_count;
        self
    }

    pub fn with_dtype(mut self, dtype: DataType) -> Self {
        self.dtype = dtype;
        self
    }

    pub fn with_compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }

    pub fn with_transform(mut self, transform: GeoTransform) -> Self {
        self.transform = transform;
        self
    }

    pub fn with_crs(mut self, crs: Option<CRS>) -> Self {
        self.crs = crs;
        self
    }

    pub fn with_nodata(mut self, nodata: Option<f64>) -> Self {
        self.nodata = nodata;
        self
    }

    /// Dimensions as (rows, cols)
    pub fn shape(&self) -> (usize, usize) {
        (self.height, self.width)
    }

    /// Geographic extent of the pixel grid
    pub fn bounds(&self) -> Bounds {
        self.transform.bounds(self.width, self.height)
    }

    /// Whether `other` describes the same georeferenced pixel grid
    pub fn same_grid(&self, other: &RasterProfile) -> bool {
        self.width == other.width
            && self.height == other.height
            && self.transform == other.transform
            && self.crs == other.crs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dtype_from_tiff() {
        assert_eq!(DataType::from_tiff(1, 16), Some(DataType::U16));
        assert_eq!(DataType::from_tiff(3, 32), Some(DataType::F32));
        assert_eq!(DataType::from_tiff(3, 16), None);
    }

    #[test]
    fn test_builders_keep_grid() {
        let source = RasterProfile::new(40, 30, 6, DataType::U16)
            .with_transform(GeoTransform::new(100.0, 200.0, 30.0, -30.0))
            .with_crs(Some(CRS::from_epsg(32748, false)));

        let output = source
            .clone()
            .with_band_count(1)
            .with_dtype(DataType::F32)
            .with_compression(Compression::Lzw);

        assert!(output.same_grid(&source));
        assert_eq!(output.band_count, 1);
        assert_eq!(output.shape(), (30, 40));
    }
}
