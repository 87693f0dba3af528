//! Coordinate Reference System handling
//!
//! GeoTIFF stores its CRS as a GeoKey directory plus two parameter tags.
//! The directory is kept verbatim so that a raster written from a copied
//! profile carries exactly the CRS it was read with.

use serde::{Deserialize, Serialize};
use std::fmt;

/// GeoKey identifiers used when building or inspecting a directory
pub mod geokeys {
    pub const GT_MODEL_TYPE: u16 = 1024;
    pub const GT_RASTER_TYPE: u16 = 1025;
    pub const GEOGRAPHIC_TYPE: u16 = 2048;
    pub const PROJECTED_CS_TYPE: u16 = 3072;

    pub const MODEL_TYPE_PROJECTED: u16 = 1;
    pub const MODEL_TYPE_GEOGRAPHIC: u16 = 2;
    pub const RASTER_PIXEL_IS_AREA: u16 = 1;
}

/// Raw GeoTIFF CRS payload (tags 34735, 34736, 34737)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct GeoKeyDirectory {
    /// GeoKeyDirectoryTag: header of four shorts followed by 4-short entries
    pub keys: Vec<u16>,
    /// GeoDoubleParamsTag
    pub doubles: Vec<f64>,
    /// GeoAsciiParamsTag
    pub ascii: String,
}

impl GeoKeyDirectory {
    /// Minimal directory referencing an EPSG code
    pub fn from_epsg(code: u16, geographic: bool) -> Self {
        use geokeys::*;
        let (model, cs_key) = if geographic {
            (MODEL_TYPE_GEOGRAPHIC, GEOGRAPHIC_TYPE)
        } else {
            (MODEL_TYPE_PROJECTED, PROJECTED_CS_TYPE)
        };
        Self {
            keys: vec![
                1, 1, 0, 3, // version 1.1.0, 3 keys
                GT_MODEL_TYPE, 0, 1, model,
                GT_RASTER_TYPE, 0, 1, RASTER_PIXEL_IS_AREA,
                cs_key, 0, 1, code,
            ],
            doubles: Vec::new(),
            ascii: String::new(),
        }
    }

    /// Value of an inline (tag location 0) key
    pub fn short_value(&self, key_id: u16) -> Option<u16> {
        if self.keys.len() < 4 {
            return None;
        }
        let count = self.keys[3] as usize;
        self.keys[4..]
            .chunks_exact(4)
            .take(count)
            .find(|entry| entry[0] == key_id && entry[1] == 0)
            .map(|entry| entry[3])
    }
}

/// Coordinate Reference System representation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CRS {
    /// EPSG code if the directory names one
    epsg: Option<u32>,
    /// Directory as stored in the source file
    geokeys: GeoKeyDirectory,
}

impl CRS {
    /// Create a CRS from an EPSG code
    pub fn from_epsg(code: u16, geographic: bool) -> Self {
        Self {
            epsg: Some(code as u32),
            geokeys: GeoKeyDirectory::from_epsg(code, geographic),
        }
    }

    /// Interpret a GeoKey directory read from a file.
    ///
    /// Returns `None` when the directory is too short to hold a header.
    pub fn from_geokeys(geokeys: GeoKeyDirectory) -> Option<Self> {
        use geokeys::*;
        if geokeys.keys.len() < 4 {
            return None;
        }
        let epsg = geokeys
            .short_value(PROJECTED_CS_TYPE)
            .or_else(|| geokeys.short_value(GEOGRAPHIC_TYPE))
            // 32767 is the GeoTIFF "user-defined" marker
            .filter(|&code| code > 0 && code != 32767)
            .map(u32::from);
        Some(Self { epsg, geokeys })
    }

    /// Get EPSG code if known
    pub fn epsg(&self) -> Option<u32> {
        self.epsg
    }

    /// The GeoKey payload to write back
    pub fn geokeys(&self) -> &GeoKeyDirectory {
        &self.geokeys
    }

    /// Get a string identifier for this CRS
    pub fn identifier(&self) -> String {
        if let Some(code) = self.epsg {
            return format!("EPSG:{}", code);
        }
        let citation = self.geokeys.ascii.trim_end_matches(['|', '\0']);
        if !citation.is_empty() {
            return citation.to_string();
        }
        "Unknown".to_string()
    }
}

impl fmt::Display for CRS {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.identifier())
    }
}
