//! Error types for bandcalc

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for bandcalc operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Input file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Band index {index} out of range (file has {count} bands)")]
    BandIndexOutOfRange { index: usize, count: usize },

    #[error("Band '{0}' index not provided")]
    MissingRole(String),

    #[error("Unknown algorithm: {0}")]
    UnknownAlgorithm(String),

    #[error("Formula evaluation failed: {0}")]
    Formula(String),

    #[error("calculation produced no data")]
    EmptyResult,

    #[error("R, G, and B must be different bands")]
    DuplicateBands,

    #[error("Failed to write output: {0}")]
    Write(String),

    #[error("Failed to create preview: {0}")]
    Preview(String),

    #[error("Cannot read raster metadata: {0}")]
    Metadata(String),

    #[error("TIFF error: {0}")]
    Tiff(String),

    #[error("Invalid raster dimensions: {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },

    #[error("Unsupported data type: {0}")]
    UnsupportedDataType(String),

    #[error("{0}")]
    Other(String),
}

impl From<tiff::TiffError> for Error {
    fn from(e: tiff::TiffError) -> Self {
        Error::Tiff(e.to_string())
    }
}

impl From<ndarray::ShapeError> for Error {
    fn from(e: ndarray::ShapeError) -> Self {
        Error::Other(e.to_string())
    }
}

/// Result type alias for bandcalc operations
pub type Result<T> = std::result::Result<T, Error>;
