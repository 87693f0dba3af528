//! Band arrays and computation results

use crate::error::{Error, Result};
use ndarray::{stack, Array2, Array3, ArrayView2, Axis};

/// One physical band materialized as a 2-D `(rows, cols)` array
pub type BandArray = Array2<f32>;

/// Output of a formula: one or more channels, channel-first.
///
/// Construction replaces NaN and ±Infinity with 0.0, so every value held by
/// a `ComputationResult` is finite.
#[derive(Debug, Clone, PartialEq)]
pub struct ComputationResult {
    data: Array3<f32>,
}

impl ComputationResult {
    /// Build from a channel-first array, sanitizing non-finite values
    pub fn new(mut data: Array3<f32>) -> Result<Self> {
        if data.is_empty() {
            return Err(Error::EmptyResult);
        }
        sanitize(&mut data);
        Ok(Self { data })
    }

    /// Stack equally shaped channels into a result
    pub fn from_channels(channels: Vec<BandArray>) -> Result<Self> {
        if channels.is_empty() {
            return Err(Error::EmptyResult);
        }
        let views: Vec<ArrayView2<'_, f32>> = channels.iter().map(|c| c.view()).collect();
        let data = stack(Axis(0), &views)?;
        Self::new(data)
    }

    /// Single-channel result
    pub fn single(band: BandArray) -> Result<Self> {
        Self::new(band.insert_axis(Axis(0)))
    }

    /// Number of output bands implied by the result
    pub fn band_count(&self) -> usize {
        self.data.len_of(Axis(0))
    }

    /// Grid dimensions as (rows, cols)
    pub fn shape(&self) -> (usize, usize) {
        let (_, rows, cols) = self.data.dim();
        (rows, cols)
    }

    /// View of one channel (0-based)
    pub fn channel(&self, index: usize) -> ArrayView2<'_, f32> {
        self.data.index_axis(Axis(0), index)
    }

    pub fn data(&self) -> &Array3<f32> {
        &self.data
    }

    pub fn into_array(self) -> Array3<f32> {
        self.data
    }
}

/// Replace NaN, +Inf and -Inf with 0.0 in place
pub fn sanitize(data: &mut Array3<f32>) {
    data.mapv_inplace(|v| if v.is_finite() { v } else { 0.0 });
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_non_finite_replaced() {
        let band = array![[f32::NAN, f32::INFINITY], [f32::NEG_INFINITY, 0.25]];
        let result = ComputationResult::single(band).unwrap();
        assert_eq!(result.channel(0), array![[0.0, 0.0], [0.0, 0.25]]);
        assert!(result.data().iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_from_channels_stacks_channel_first() {
        let r = Array2::from_elem((2, 3), 1.0f32);
        let g = Array2::from_elem((2, 3), 2.0f32);
        let b = Array2::from_elem((2, 3), 3.0f32);
        let result = ComputationResult::from_channels(vec![r, g, b]).unwrap();
        assert_eq!(result.band_count(), 3);
        assert_eq!(result.shape(), (2, 3));
        assert_eq!(result.channel(2)[[1, 2]], 3.0);
    }

    #[test]
    fn test_empty_is_error() {
        assert!(matches!(
            ComputationResult::from_channels(Vec::new()),
            Err(Error::EmptyResult)
        ));
        assert!(matches!(
            ComputationResult::single(Array2::zeros((0, 0))),
            Err(Error::EmptyResult)
        ));
    }

    #[test]
    fn test_mismatched_channels_rejected() {
        let a = Array2::<f32>::zeros((2, 2));
        let b = Array2::<f32>::zeros((3, 2));
        assert!(ComputationResult::from_channels(vec![a, b]).is_err());
    }
}
