//! Color schemes and multi-stop interpolation engine.

use std::fmt;
use std::str::FromStr;

use bandcalc_core::Error;

/// RGB color as (r, g, b) with values in 0..=255.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

/// A color stop: position in [0, 1] mapped to an RGB color.
#[derive(Debug, Clone, Copy)]
pub struct ColorStop {
    pub t: f64,
    pub color: Rgb,
}

impl ColorStop {
    pub const fn new(t: f64, r: u8, g: u8, b: u8) -> Self {
        Self {
            t,
            color: Rgb::new(r, g, b),
        }
    }
}

/// Available color schemes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ColorScheme {
    /// Dark blue -> Cyan -> Yellow -> Dark red (default preview ramp)
    #[default]
    Jet,
    /// Black -> White
    Grayscale,
    /// Brown -> Yellow -> Green (vegetation indices)
    Ndvi,
    /// White -> Cyan -> Blue (water indices)
    Water,
    /// Blue -> White -> Red (signed differences)
    Divergent,
}

impl ColorScheme {
    pub const ALL: &[ColorScheme] = &[
        Self::Jet,
        Self::Grayscale,
        Self::Ndvi,
        Self::Water,
        Self::Divergent,
    ];

    /// Identifier accepted on the command line
    pub fn name(&self) -> &'static str {
        match self {
            Self::Jet => "jet",
            Self::Grayscale => "grayscale",
            Self::Ndvi => "ndvi",
            Self::Water => "water",
            Self::Divergent => "divergent",
        }
    }
}

impl fmt::Display for ColorScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ColorScheme {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        let wanted = s.trim();
        if wanted.eq_ignore_ascii_case("gray") {
            return Ok(Self::Grayscale);
        }
        Self::ALL
            .iter()
            .copied()
            .find(|scheme| scheme.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| Error::Other(format!("Unknown color scheme '{}'", s)))
    }
}

// ─── Color stop definitions ────────────────────────────────────────────

const JET_STOPS: &[ColorStop] = &[
    ColorStop::new(0.000, 0, 0, 128),
    ColorStop::new(0.125, 0, 0, 255),
    ColorStop::new(0.375, 0, 255, 255),
    ColorStop::new(0.625, 255, 255, 0),
    ColorStop::new(0.875, 255, 0, 0),
    ColorStop::new(1.000, 128, 0, 0),
];

/// ColorBrewer RdBu, reversed so low values are blue
const DIVERGENT_STOPS: &[ColorStop] = &[
    ColorStop::new(0.00, 33, 102, 172),
    ColorStop::new(0.25, 103, 169, 207),
    ColorStop::new(0.50, 247, 247, 247),
    ColorStop::new(0.75, 239, 138, 98),
    ColorStop::new(1.00, 178, 24, 43),
];

/// ColorBrewer RdYlGn
const NDVI_STOPS: &[ColorStop] = &[
    ColorStop::new(0.00, 165, 0, 38),
    ColorStop::new(0.25, 244, 109, 67),
    ColorStop::new(0.50, 254, 224, 139),
    ColorStop::new(0.75, 166, 217, 106),
    ColorStop::new(1.00, 0, 104, 55),
];

/// ColorBrewer Blues
const WATER_STOPS: &[ColorStop] = &[
    ColorStop::new(0.00, 247, 251, 255),
    ColorStop::new(0.25, 198, 219, 239),
    ColorStop::new(0.50, 107, 174, 214),
    ColorStop::new(0.75, 33, 113, 181),
    ColorStop::new(1.00, 8, 48, 107),
];

// ─── Interpolation ─────────────────────────────────────────────────────

impl Rgb {
    /// Linear mix towards `other`; `w` = 0 gives `self`
    fn mix(self, other: Rgb, w: f64) -> Rgb {
        let channel =
            |a: u8, b: u8| (f64::from(a) + (f64::from(b) - f64::from(a)) * w).round() as u8;
        Rgb::new(
            channel(self.r, other.r),
            channel(self.g, other.g),
            channel(self.b, other.b),
        )
    }
}

/// Piecewise-linear ramp through `stops`, sorted by position
fn ramp(stops: &[ColorStop], t: f64) -> Rgb {
    let (Some(first), Some(last)) = (stops.first(), stops.last()) else {
        return Rgb::new(0, 0, 0);
    };
    if t <= first.t {
        return first.color;
    }
    stops
        .windows(2)
        .find(|pair| t <= pair[1].t)
        .map(|pair| {
            let (lo, hi) = (pair[0], pair[1]);
            lo.color.mix(hi.color, (t - lo.t) / (hi.t - lo.t))
        })
        .unwrap_or(last.color)
}

/// Evaluate a color scheme at normalized position `t` ∈ [0, 1].
///
/// Values outside the unit interval clamp to the end colors.
pub fn evaluate(scheme: ColorScheme, t: f64) -> Rgb {
    match scheme {
        ColorScheme::Jet => ramp(JET_STOPS, t),
        ColorScheme::Grayscale => {
            let v = (t.clamp(0.0, 1.0) * 255.0).round() as u8;
            Rgb::new(v, v, v)
        }
        ColorScheme::Ndvi => ramp(NDVI_STOPS, t),
        ColorScheme::Water => ramp(WATER_STOPS, t),
        ColorScheme::Divergent => ramp(DIVERGENT_STOPS, t),
    }
}

/// 256-entry lookup table for 8-bit gray levels
pub fn lookup_table(scheme: ColorScheme) -> [Rgb; 256] {
    let mut lut = [Rgb::new(0, 0, 0); 256];
    for (level, entry) in lut.iter_mut().enumerate() {
        *entry = evaluate(scheme, level as f64 / 255.0);
    }
    lut
}
