//! Band-to-pixel rendering using color schemes.
//!
//! Both renderers return a row-major byte buffer; [`crate::preview`] wraps it
//! into an image and handles resizing and encoding.

use crate::scheme::{lookup_table, ColorScheme, Rgb};
use bandcalc_core::raster::StretchRange;
use bandcalc_core::{Error, Result};
use ndarray::ArrayView2;

/// Parameters for single-band colormap rendering.
#[derive(Debug, Clone)]
pub struct ColormapParams {
    /// Color scheme applied to the stretched gray levels.
    pub scheme: ColorScheme,
    /// Pixels equal to this value are treated like non-finite ones.
    pub nodata: Option<f64>,
    /// Color for invalid pixels (RGBA). Default: fully transparent.
    pub nodata_color: [u8; 4],
}

impl ColormapParams {
    pub fn new(scheme: ColorScheme) -> Self {
        Self {
            scheme,
            nodata: None,
            nodata_color: [0, 0, 0, 0],
        }
    }

    pub fn with_nodata(mut self, nodata: Option<f64>) -> Self {
        self.nodata = nodata;
        self
    }

    /// Finite and not the nodata value
    pub fn is_valid(&self, value: f32) -> bool {
        value.is_finite() && self.nodata.map_or(true, |nd| f64::from(value) != nd)
    }
}

impl Default for ColormapParams {
    fn default() -> Self {
        Self::new(ColorScheme::default())
    }
}

/// Render one band to RGBA.
///
/// The 2–98 percentile range of the valid pixels is stretched onto the 256
/// gray levels, which index the color scheme. Valid pixels are opaque; invalid
/// ones get `params.nodata_color`. Fails with [`Error::Preview`] when the band
/// has no valid pixel.
pub fn band_to_rgba(band: ArrayView2<'_, f32>, params: &ColormapParams) -> Result<Vec<u8>> {
    let range = StretchRange::from_values(band.iter().copied().filter(|&v| params.is_valid(v)))
        .ok_or_else(|| Error::Preview("Image contains no valid data".into()))?;
    let lut = lookup_table(params.scheme);

    let mut rgba = Vec::with_capacity(band.len() * 4);
    for &v in band.iter() {
        if params.is_valid(v) {
            let Rgb { r, g, b } = lut[range.to_byte(v) as usize];
            rgba.extend_from_slice(&[r, g, b, 255]);
        } else {
            rgba.extend_from_slice(&params.nodata_color);
        }
    }
    Ok(rgba)
}

/// Render three bands to RGB, stretching each channel independently.
///
/// No validity mask is applied; non-finite values map to 0 and a channel with
/// no finite value is black.
pub fn channels_to_rgb(channels: [ArrayView2<'_, f32>; 3]) -> Result<Vec<u8>> {
    let shape = channels[0].dim();
    if let Some(bad) = channels.iter().find(|c| c.dim() != shape) {
        return Err(Error::InvalidDimensions {
            width: bad.ncols(),
            height: bad.nrows(),
        });
    }

    let ranges: Vec<StretchRange> = channels
        .iter()
        .map(|c| StretchRange::from_values(c.iter().copied()).unwrap_or(StretchRange::Flat))
        .collect();

    let (rows, cols) = shape;
    let mut rgb = Vec::with_capacity(rows * cols * 3);
    for r in 0..rows {
        for c in 0..cols {
            for (channel, range) in channels.iter().zip(&ranges) {
                let v = channel[[r, c]];
                rgb.push(if v.is_finite() { range.to_byte(v) } else { 0 });
            }
        }
    }
    Ok(rgb)
}
