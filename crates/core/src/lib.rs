//! # bandcalc Core
//!
//! Core types and I/O for the bandcalc spectral band-algebra engine.
//!
//! This crate provides:
//! - `RasterProfile`: georeferencing and encoding metadata of a raster
//! - `BandArray` / `ComputationResult`: pixel arrays flowing through a run
//! - `GeoTransform` and `CRS`: georeferencing carried verbatim from source to output
//! - `Dataset` and `write_geotiff`: native GeoTIFF reading and writing
//! - Percentile stretch helpers shared by previews and composites

pub mod crs;
pub mod error;
pub mod io;
pub mod raster;

pub use crs::CRS;
pub use error::{Error, Result};
pub use raster::{BandArray, Bounds, ComputationResult, DataType, GeoTransform, RasterProfile};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::crs::CRS;
    pub use crate::error::{Error, Result};
    pub use crate::io::{write_geotiff, BandSource, Dataset, GeoTiffOptions, MemoryDataset};
    pub use crate::raster::{
        BandArray, Bounds, ComputationResult, Compression, DataType, GeoTransform, RasterProfile,
    };
}
