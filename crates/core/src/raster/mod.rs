//! Raster data structures and operations

mod geotransform;
mod profile;
mod result;
pub mod stretch;

pub use geotransform::{Bounds, GeoTransform};
pub use profile::{Compression, DataType, RasterProfile};
pub use result::{sanitize, BandArray, ComputationResult};
pub use stretch::StretchRange;
