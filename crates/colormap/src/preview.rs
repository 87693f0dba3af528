//! PNG previews of computed rasters.
//!
//! One band renders through a color scheme with an alpha mask and is resized
//! with nearest-neighbour sampling so the mask edge stays crisp. Three or more
//! bands render as stretched RGB without alpha and are resized smoothly.

use std::path::Path;

use bandcalc_core::io::{BandSource, Dataset};
use bandcalc_core::{BandArray, ComputationResult, Error, Result};
use image::imageops::{self, FilterType};
use image::{ImageFormat, RgbImage, RgbaImage};
use ndarray::ArrayView2;
use tracing::debug;

use crate::render::{band_to_rgba, channels_to_rgb, ColormapParams};
use crate::scheme::ColorScheme;

/// Default cap on the longer preview side, in pixels
pub const DEFAULT_MAX_SIZE: u32 = 1024;

/// Preview rendering options
#[derive(Debug, Clone)]
pub struct PreviewOptions {
    /// Longer side of the preview is capped at this many pixels
    pub max_size: u32,
    /// Color scheme for single-band previews
    pub scheme: ColorScheme,
    /// Extra invalid value for single-band previews
    pub nodata: Option<f64>,
}

impl Default for PreviewOptions {
    fn default() -> Self {
        Self {
            max_size: DEFAULT_MAX_SIZE,
            scheme: ColorScheme::Jet,
            nodata: None,
        }
    }
}

impl PreviewOptions {
    pub fn with_max_size(mut self, max_size: u32) -> Self {
        self.max_size = max_size;
        self
    }

    pub fn with_scheme(mut self, scheme: ColorScheme) -> Self {
        self.scheme = scheme;
        self
    }

    pub fn with_nodata(mut self, nodata: Option<f64>) -> Self {
        self.nodata = nodata;
        self
    }
}

/// A rendered preview
#[derive(Debug, Clone)]
pub enum PreviewImage {
    /// Colormapped single band with validity alpha
    Rgba(RgbaImage),
    /// Stretched three-channel composite
    Rgb(RgbImage),
}

impl PreviewImage {
    pub fn dimensions(&self) -> (u32, u32) {
        match self {
            Self::Rgba(img) => img.dimensions(),
            Self::Rgb(img) => img.dimensions(),
        }
    }

    pub fn has_alpha(&self) -> bool {
        matches!(self, Self::Rgba(_))
    }

    /// Encode as PNG
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let saved = match self {
            Self::Rgba(img) => img.save_with_format(path, ImageFormat::Png),
            Self::Rgb(img) => img.save_with_format(path, ImageFormat::Png),
        };
        saved.map_err(|e| Error::Preview(format!("{}: {}", path.display(), e)))
    }
}

/// Output `(width, height)` for a `cols` x `rows` grid.
///
/// When the longer side exceeds `max_size` it becomes `max_size` and the
/// shorter side scales by the same factor, truncated and never below 1 pixel.
pub fn preview_dimensions(cols: usize, rows: usize, max_size: u32) -> (u32, u32) {
    let longer = cols.max(rows);
    if longer <= max_size as usize {
        return (cols as u32, rows as u32);
    }
    let scale = max_size as f64 / longer as f64;
    let shorter = |side: usize| ((side as f64 * scale) as u32).max(1);
    if cols >= rows {
        (max_size, shorter(rows))
    } else {
        (shorter(cols), max_size)
    }
}

/// Render bands to a preview: one band colormapped, three or more as RGB
/// from the first three. Two bands render the first one only.
pub fn render_bands(
    bands: &[ArrayView2<'_, f32>],
    options: &PreviewOptions,
) -> Result<PreviewImage> {
    let first = bands
        .first()
        .ok_or_else(|| Error::Preview("No band to render".into()))?;
    if options.max_size == 0 {
        return Err(Error::Preview("Preview size must be at least 1 pixel".into()));
    }
    let (rows, cols) = first.dim();
    if rows == 0 || cols == 0 {
        return Err(Error::Preview(format!("Empty raster ({}x{})", cols, rows)));
    }
    let (w, h) = preview_dimensions(cols, rows, options.max_size);
    let too_large = || Error::Preview(format!("Raster too large for a preview: {}x{}", cols, rows));

    if bands.len() >= 3 {
        let buf = channels_to_rgb([bands[0], bands[1], bands[2]])?;
        let img = RgbImage::from_raw(cols as u32, rows as u32, buf)
            .ok_or_else(too_large)?;
        let img = if (w, h) == img.dimensions() {
            img
        } else {
            imageops::resize(&img, w, h, FilterType::Triangle)
        };
        debug!("RGB preview {}x{}", w, h);
        Ok(PreviewImage::Rgb(img))
    } else {
        let params = ColormapParams::new(options.scheme).with_nodata(options.nodata);
        let buf = band_to_rgba(*first, &params)?;
        let img = RgbaImage::from_raw(cols as u32, rows as u32, buf)
            .ok_or_else(too_large)?;
        let img = if (w, h) == img.dimensions() {
            img
        } else {
            imageops::resize(&img, w, h, FilterType::Nearest)
        };
        debug!("{} preview {}x{}", options.scheme, w, h);
        Ok(PreviewImage::Rgba(img))
    }
}

/// Render a computation result
pub fn render_preview(
    result: &ComputationResult,
    options: &PreviewOptions,
) -> Result<PreviewImage> {
    let views: Vec<ArrayView2<'_, f32>> =
        (0..result.band_count()).map(|i| result.channel(i)).collect();
    render_bands(&views, options)
}

/// Render the preview of a GeoTIFF on disk and save it as PNG.
///
/// Reads at most three bands. The raster's own nodata value is used when
/// `options` carries none.
pub fn preview_from_raster<P, Q>(tif: P, png: Q, options: &PreviewOptions) -> Result<PreviewImage>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    let mut ds = Dataset::open(tif.as_ref())?;
    let count = if ds.band_count() >= 3 { 3 } else { 1 };
    let bands = (1..=count)
        .map(|i| ds.read_band(i))
        .collect::<Result<Vec<BandArray>>>()?;

    let mut options = options.clone();
    if options.nodata.is_none() {
        options.nodata = ds.profile().nodata;
    }

    let views: Vec<ArrayView2<'_, f32>> = bands.iter().map(|b| b.view()).collect();
    let image = render_bands(&views, &options)?;
    image.save(png)?;
    Ok(image)
}
