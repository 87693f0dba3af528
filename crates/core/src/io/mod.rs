//! I/O operations for reading and writing georeferenced rasters

mod memory;
pub mod metadata;
mod native;

pub use memory::MemoryDataset;
pub use native::{write_geotiff, Dataset, GeoTiffOptions};

use crate::error::{Error, Result};
use crate::raster::BandArray;

/// A multiband raster whose bands can be materialized one at a time.
///
/// Band indices are 1-based, as in GeoTIFF tooling.
pub trait BandSource {
    /// Number of physical bands
    fn band_count(&self) -> usize;

    /// Grid dimensions as (rows, cols)
    fn shape(&self) -> (usize, usize);

    /// Read one band as floating point. Fails with
    /// [`Error::BandIndexOutOfRange`] unless `1 <= index <= band_count`.
    fn read_band(&mut self, index: usize) -> Result<BandArray>;
}

/// Validate a 1-based band index against a band count
pub fn check_band_index(index: usize, count: usize) -> Result<()> {
    if index == 0 || index > count {
        return Err(Error::BandIndexOutOfRange { index, count });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_band_index_bounds() {
        assert!(check_band_index(1, 6).is_ok());
        assert!(check_band_index(6, 6).is_ok());
        assert!(check_band_index(0, 6).is_err());

        let err = check_band_index(7, 6).unwrap_err();
        assert!(matches!(err, Error::BandIndexOutOfRange { index: 7, count: 6 }));
        assert!(err.to_string().contains("6 bands"));
    }
}
