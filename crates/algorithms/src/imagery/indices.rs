//! Spectral vegetation, water and urban indices
//!
//! A closed registry of named indices. Each entry declares the band roles
//! it needs and a pure function over those bands, in declaration order.
//! Ratio indices add [`EPSILON`] to denominators that can reach zero.

use std::fmt;
use std::str::FromStr;

use bandcalc_core::io::BandSource;
use bandcalc_core::{BandArray, ComputationResult, Error, Result};
use ndarray::Zip;
use tracing::debug;

use super::formula::load_bands;
use super::roles::{BandRole, BandRoleMap};

/// Stabilizing constant added to ratio denominators
pub const EPSILON: f32 = 1e-6;

/// SAVI soil brightness correction factor
pub const SAVI_L: f32 = 0.5;

/// Enumeration of supported spectral indices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpectralIndex {
    /// Normalized Difference Vegetation Index
    NDVI,
    /// Normalized Difference Turbidity Index
    NDTI,
    /// Normalized Difference Built-up Index
    NDBI,
    /// Normalized Green-Red Difference Index
    NGRDI,
    /// Ratio Vegetation Index
    RVI,
    /// Soil Adjusted Vegetation Index
    SAVI,
    /// Enhanced Vegetation Index
    EVI,
    /// Green Normalized Difference Vegetation Index
    GNDVI,
    /// Atmospherically Resistant Vegetation Index
    ARVI,
    /// Modified Soil Adjusted Vegetation Index (MSAVI2)
    MSAVI,
    /// Green Chlorophyll Index
    CLGREEN,
    /// Normalized Difference Water Index (McFeeters)
    NDWI,
    /// Transformed Vegetation Index
    TVI,
    /// True Color Image (red, green, blue stacked)
    TCI,
}

impl SpectralIndex {
    pub const ALL: [SpectralIndex; 14] = [
        Self::NDVI,
        Self::NDTI,
        Self::NDBI,
        Self::NGRDI,
        Self::RVI,
        Self::SAVI,
        Self::EVI,
        Self::GNDVI,
        Self::ARVI,
        Self::MSAVI,
        Self::CLGREEN,
        Self::NDWI,
        Self::TVI,
        Self::TCI,
    ];

    /// Identifier used on the command line and in output names
    pub fn name(&self) -> &'static str {
        match self {
            Self::NDVI => "NDVI",
            Self::NDTI => "NDTI",
            Self::NDBI => "NDBI",
            Self::NGRDI => "NGRDI",
            Self::RVI => "RVI",
            Self::SAVI => "SAVI",
            Self::EVI => "EVI",
            Self::GNDVI => "GNDVI",
            Self::ARVI => "ARVI",
            Self::MSAVI => "MSAVI",
            Self::CLGREEN => "CLGREEN",
            Self::NDWI => "NDWI",
            Self::TVI => "TVI",
            Self::TCI => "TCI",
        }
    }

    /// Registry entry for this index
    pub fn definition(&self) -> Result<&'static IndexDefinition> {
        REGISTRY
            .iter()
            .find(|def| def.index == *self)
            .ok_or_else(|| Error::UnknownAlgorithm(self.name().to_string()))
    }

    /// Number of output bands the index produces
    pub fn output_bands(&self) -> usize {
        match self {
            Self::TCI => 3,
            _ => 1,
        }
    }
}

impl fmt::Display for SpectralIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SpectralIndex {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|idx| idx.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| Error::UnknownAlgorithm(s.to_string()))
    }
}

/// Pure computation over the role bands, in the order of `roles`
pub type IndexFn = fn(&[BandArray]) -> Vec<BandArray>;

/// A registry entry: required roles and the arithmetic over them
#[derive(Debug)]
pub struct IndexDefinition {
    pub index: SpectralIndex,
    pub roles: &'static [BandRole],
    pub compute: IndexFn,
}

use BandRole::{Blue, Green, Nir, Red, Swir};

const REGISTRY: &[IndexDefinition] = &[
    IndexDefinition { index: SpectralIndex::NDVI, roles: &[Nir, Red], compute: ndvi },
    IndexDefinition { index: SpectralIndex::NDTI, roles: &[Red, Green], compute: ndti },
    IndexDefinition { index: SpectralIndex::NDBI, roles: &[Swir, Nir], compute: ndbi },
    IndexDefinition { index: SpectralIndex::NGRDI, roles: &[Green, Red], compute: ngrdi },
    IndexDefinition { index: SpectralIndex::RVI, roles: &[Nir, Red], compute: rvi },
    IndexDefinition { index: SpectralIndex::SAVI, roles: &[Nir, Red], compute: savi },
    IndexDefinition { index: SpectralIndex::EVI, roles: &[Nir, Red, Blue], compute: evi },
    IndexDefinition { index: SpectralIndex::GNDVI, roles: &[Nir, Green], compute: gndvi },
    IndexDefinition { index: SpectralIndex::ARVI, roles: &[Nir, Red, Blue], compute: arvi },
    IndexDefinition { index: SpectralIndex::MSAVI, roles: &[Nir, Red], compute: msavi },
    IndexDefinition { index: SpectralIndex::CLGREEN, roles: &[Nir, Green], compute: clgreen },
    IndexDefinition { index: SpectralIndex::NDWI, roles: &[Green, Nir], compute: ndwi },
    IndexDefinition { index: SpectralIndex::TVI, roles: &[Nir, Red], compute: tvi },
    IndexDefinition { index: SpectralIndex::TCI, roles: &[Red, Green, Blue], compute: tci },
];

// ---------------------------------------------------------------------------
// Elementwise helpers
// ---------------------------------------------------------------------------

fn map2(a: &BandArray, b: &BandArray, f: impl Fn(f32, f32) -> f32) -> BandArray {
    Zip::from(a).and(b).map_collect(|&x, &y| f(x, y))
}

fn map3(
    a: &BandArray,
    b: &BandArray,
    c: &BandArray,
    f: impl Fn(f32, f32, f32) -> f32,
) -> BandArray {
    Zip::from(a).and(b).and(c).map_collect(|&x, &y, &z| f(x, y, z))
}

/// `(a - b) / (a + b + ε)`
fn normalized_difference(a: &BandArray, b: &BandArray) -> BandArray {
    map2(a, b, |a, b| (a - b) / (a + b + EPSILON))
}

// ---------------------------------------------------------------------------
// Index bodies
// ---------------------------------------------------------------------------

/// `NDVI = (NIR - Red) / (NIR + Red + ε)`
fn ndvi(b: &[BandArray]) -> Vec<BandArray> {
    vec![normalized_difference(&b[0], &b[1])]
}

/// `NDTI = (Red - Green) / (Red + Green + ε)`
fn ndti(b: &[BandArray]) -> Vec<BandArray> {
    vec![normalized_difference(&b[0], &b[1])]
}

/// `NDBI = (SWIR - NIR) / (SWIR + NIR + ε)`
fn ndbi(b: &[BandArray]) -> Vec<BandArray> {
    vec![normalized_difference(&b[0], &b[1])]
}

/// `NGRDI = (Green - Red) / (Green + Red + ε)`
fn ngrdi(b: &[BandArray]) -> Vec<BandArray> {
    vec![normalized_difference(&b[0], &b[1])]
}

/// `RVI = NIR / (Red + ε)`
fn rvi(b: &[BandArray]) -> Vec<BandArray> {
    vec![map2(&b[0], &b[1], |nir, red| nir / (red + EPSILON))]
}

/// `SAVI = ((NIR - Red) / (NIR + Red + L)) * (1 + L)`
fn savi(b: &[BandArray]) -> Vec<BandArray> {
    vec![map2(&b[0], &b[1], |nir, red| {
        ((nir - red) / (nir + red + SAVI_L)) * (1.0 + SAVI_L)
    })]
}

/// `EVI = 2.5 * (NIR - Red) / (NIR + 6 * Red - 7.5 * Blue + 1 + ε)`
fn evi(b: &[BandArray]) -> Vec<BandArray> {
    vec![map3(&b[0], &b[1], &b[2], |nir, red, blue| {
        2.5 * ((nir - red) / (nir + 6.0 * red - 7.5 * blue + 1.0 + EPSILON))
    })]
}

/// `GNDVI = (NIR - Green) / (NIR + Green + ε)`
fn gndvi(b: &[BandArray]) -> Vec<BandArray> {
    vec![normalized_difference(&b[0], &b[1])]
}

/// `ARVI = (NIR - (2 * Red - Blue)) / (NIR + (2 * Red - Blue) + ε)`
fn arvi(b: &[BandArray]) -> Vec<BandArray> {
    vec![map3(&b[0], &b[1], &b[2], |nir, red, blue| {
        let rb = 2.0 * red - blue;
        (nir - rb) / (nir + rb + EPSILON)
    })]
}

/// MSAVI2: `(2 * NIR + 1 - sqrt((2 * NIR + 1)^2 - 8 * (NIR - Red))) / 2`
///
/// A negative radicand yields NaN, which the result sanitization turns into 0.
fn msavi(b: &[BandArray]) -> Vec<BandArray> {
    vec![map2(&b[0], &b[1], |nir, red| {
        let t = 2.0 * nir + 1.0;
        (t - (t * t - 8.0 * (nir - red)).sqrt()) / 2.0
    })]
}

/// `CLgreen = NIR / (Green + ε) - 1`
fn clgreen(b: &[BandArray]) -> Vec<BandArray> {
    vec![map2(&b[0], &b[1], |nir, green| nir / (green + EPSILON) - 1.0)]
}

/// `NDWI = (Green - NIR) / (Green + NIR + ε)`
fn ndwi(b: &[BandArray]) -> Vec<BandArray> {
    vec![normalized_difference(&b[0], &b[1])]
}

/// `TVI = sqrt(max(NDVI, 0)) + 0.5`
fn tvi(b: &[BandArray]) -> Vec<BandArray> {
    vec![map2(&b[0], &b[1], |nir, red| {
        let ndvi = (nir - red) / (nir + red + EPSILON);
        ndvi.max(0.0).sqrt() + 0.5
    })]
}

/// Red, green and blue as three output bands
fn tci(b: &[BandArray]) -> Vec<BandArray> {
    b[..3].to_vec()
}

// ---------------------------------------------------------------------------
// Evaluation
// ---------------------------------------------------------------------------

/// Evaluate a named index over a band source.
///
/// Every required role is resolved before anything is read, so a missing
/// role or an out-of-range band index fails without touching pixel data.
pub fn evaluate_index<S: BandSource>(
    index: SpectralIndex,
    roles: &BandRoleMap,
    source: &mut S,
) -> Result<ComputationResult> {
    let def = index.definition()?;
    let band_indices = def
        .roles
        .iter()
        .map(|&role| roles.require(role))
        .collect::<Result<Vec<usize>>>()?;

    debug!("{}: roles {:?} -> bands {:?}", index, def.roles, band_indices);
    let bands = load_bands(source, &band_indices)?;
    ComputationResult::from_channels((def.compute)(&bands))
}
