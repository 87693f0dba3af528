//! # bandcalc Colormap
//!
//! Color schemes and PNG preview rendering for bandcalc.
//!
//! Single-band results are percentile-stretched onto 256 gray levels, colored
//! through a [`ColorScheme`] (Jet by default) and given an alpha channel that
//! hides invalid pixels. Three-band results are stretched per channel into an
//! RGB image.
//!
//! ## Usage
//!
//! ```ignore
//! use bandcalc_colormap::{render_preview, PreviewOptions};
//!
//! let preview = render_preview(&result, &PreviewOptions::default())?;
//! preview.save("ndvi_preview.png")?;
//! ```

mod preview;
mod render;
mod scheme;

pub use preview::{
    preview_dimensions, preview_from_raster, render_bands, render_preview, PreviewImage,
    PreviewOptions, DEFAULT_MAX_SIZE,
};
pub use render::{band_to_rgba, channels_to_rgb, ColormapParams};
pub use scheme::{evaluate, lookup_table, ColorScheme, ColorStop, Rgb};
