//! RGB composite from three physical bands

use std::fmt;
use std::str::FromStr;

use bandcalc_core::io::BandSource;
use bandcalc_core::raster::StretchRange;
use bandcalc_core::{BandArray, ComputationResult, DataType, Error, Result};
use tracing::debug;

use super::formula::load_bands;

/// How composite channels are scaled before writing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompositeMode {
    /// Source values, written in the source data type
    #[default]
    Raw,
    /// Per-channel 2–98 percentile stretch to 0..1, float32
    Stretch,
    /// Per-channel 2–98 percentile stretch to 0..255, 8-bit
    Display,
}

impl CompositeMode {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Raw => "raw",
            Self::Stretch => "stretch",
            Self::Display => "display",
        }
    }

    /// Data type of the written composite
    pub fn output_dtype(&self, source: DataType) -> DataType {
        match self {
            Self::Raw => source,
            Self::Stretch => DataType::F32,
            Self::Display => DataType::U8,
        }
    }
}

impl fmt::Display for CompositeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CompositeMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "raw" => Ok(Self::Raw),
            "stretch" => Ok(Self::Stretch),
            "display" => Ok(Self::Display),
            _ => Err(Error::Other(format!(
                "Unknown composite mode '{}' (expected raw, stretch or display)",
                s
            ))),
        }
    }
}

/// Build an RGB composite from bands `[r, g, b]` (1-based).
///
/// The three indices must be distinct; this is checked before bounds and
/// before any pixel is read.
pub fn composite<S: BandSource>(
    source: &mut S,
    bands: [usize; 3],
    mode: CompositeMode,
) -> Result<ComputationResult> {
    let [r, g, b] = bands;
    if r == g || g == b || r == b {
        return Err(Error::DuplicateBands);
    }

    debug!("composite {:?} in {} mode", bands, mode);
    let channels = load_bands(source, &bands)?;
    let channels = match mode {
        CompositeMode::Raw => channels,
        CompositeMode::Stretch => channels
            .into_iter()
            .map(|c| stretch_channel(c, |range, v| range.normalize(v)))
            .collect(),
        CompositeMode::Display => channels
            .into_iter()
            .map(|c| stretch_channel(c, |range, v| f32::from(range.to_byte(v))))
            .collect(),
    };
    ComputationResult::from_channels(channels)
}

fn stretch_channel(mut channel: BandArray, f: impl Fn(&StretchRange, f32) -> f32) -> BandArray {
    let range = StretchRange::from_values(channel.iter().copied()).unwrap_or(StretchRange::Flat);
    channel.mapv_inplace(|v| if v.is_finite() { f(&range, v) } else { 0.0 });
    channel
}
