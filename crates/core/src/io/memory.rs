//! In-memory band source

use super::{check_band_index, BandSource};
use crate::error::{Error, Result};
use crate::raster::BandArray;

/// Bands held in memory, with a counter of physical reads.
///
/// Useful for driving the formula engine without a file on disk.
#[derive(Debug, Clone)]
pub struct MemoryDataset {
    bands: Vec<BandArray>,
    reads: usize,
}

impl MemoryDataset {
    /// All bands must share one shape
    pub fn new(bands: Vec<BandArray>) -> Result<Self> {
        if let Some(first) = bands.first() {
            let shape = first.dim();
            if let Some(bad) = bands.iter().find(|b| b.dim() != shape) {
                return Err(Error::InvalidDimensions {
                    width: bad.ncols(),
                    height: bad.nrows(),
                });
            }
        }
        Ok(Self { bands, reads: 0 })
    }

    /// Number of successful `read_band` calls so far
    pub fn reads(&self) -> usize {
        self.reads
    }
}

impl BandSource for MemoryDataset {
    fn band_count(&self) -> usize {
        self.bands.len()
    }

    fn shape(&self) -> (usize, usize) {
        self.bands.first().map(|b| b.dim()).unwrap_or((0, 0))
    }

    fn read_band(&mut self, index: usize) -> Result<BandArray> {
        check_band_index(index, self.bands.len())?;
        self.reads += 1;
        Ok(self.bands[index - 1].clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    #[test]
    fn test_reads_counted() {
        let mut ds = MemoryDataset::new(vec![
            Array2::from_elem((2, 2), 1.0),
            Array2::from_elem((2, 2), 2.0),
        ])
        .unwrap();
        assert_eq!(ds.read_band(2).unwrap()[[0, 0]], 2.0);
        assert!(ds.read_band(3).is_err());
        assert_eq!(ds.reads(), 1);
    }

    #[test]
    fn test_shape_mismatch() {
        let r = MemoryDataset::new(vec![Array2::zeros((2, 2)), Array2::zeros((2, 3))]);
        assert!(r.is_err());
    }
}
