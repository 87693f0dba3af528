//! Band role mapping
//!
//! Resolves semantic band roles (red, green, blue, NIR, SWIR) to 1-based
//! physical band indices. Resolution is an ordered rule chain:
//!
//! 1. Platform rules matched on the file name, in [`PLATFORM_RULES`] order.
//!    A rule may carry stack variants that replace its default table.
//! 2. Keyword matching on the embedded band descriptions.
//! 3. The generic default ordering (1=red, 2=green, 3=blue, 4=nir, 5=swir).

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use bandcalc_core::{Error, Result};
use serde::Serialize;
use tracing::debug;

/// Semantic role of a spectral band
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BandRole {
    Red,
    Green,
    Blue,
    Nir,
    Swir,
}

impl BandRole {
    pub const ALL: [BandRole; 5] = [Self::Red, Self::Green, Self::Blue, Self::Nir, Self::Swir];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Red => "red",
            Self::Green => "green",
            Self::Blue => "blue",
            Self::Nir => "nir",
            Self::Swir => "swir",
        }
    }
}

impl fmt::Display for BandRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for BandRole {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|role| role.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| Error::Other(format!("Unknown band role: {}", s)))
    }
}

/// Role → 1-based band index. Partial maps are valid.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct BandRoleMap(BTreeMap<BandRole, usize>);

impl BandRoleMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs(pairs: &[(BandRole, usize)]) -> Self {
        Self(pairs.iter().copied().collect())
    }

    pub fn insert(&mut self, role: BandRole, index: usize) {
        self.0.insert(role, index);
    }

    pub fn get(&self, role: BandRole) -> Option<usize> {
        self.0.get(&role).copied()
    }

    /// Index of a role the caller cannot do without
    pub fn require(&self, role: BandRole) -> Result<usize> {
        self.get(role)
            .ok_or_else(|| Error::MissingRole(role.name().to_string()))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (BandRole, usize)> + '_ {
        self.0.iter().map(|(role, index)| (*role, *index))
    }
}

impl fmt::Display for BandRoleMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (role, index)) in self.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}: {}", role, index)?;
        }
        f.write_str("}")
    }
}

/// A non-standard band stack of a platform, recognized by a file name token
#[derive(Debug)]
pub struct StackVariant {
    pub token: &'static str,
    pub label: &'static str,
    pub table: &'static [(BandRole, usize)],
}

/// A sensor family recognized by file name tokens
#[derive(Debug)]
pub struct PlatformRule {
    pub label: &'static str,
    /// Lowercase tokens; any one of them selects the rule
    pub tokens: &'static [&'static str],
    pub table: &'static [(BandRole, usize)],
    pub variants: &'static [StackVariant],
}

use BandRole::{Blue, Green, Nir, Red, Swir};

/// Platform rules in priority order. The first rule with a matching token wins.
pub const PLATFORM_RULES: &[PlatformRule] = &[
    PlatformRule {
        label: "Landsat 8/9",
        tokens: &["lc08", "lc09", "landsat"],
        // B1 coastal, B2 blue, B3 green, B4 red, B5 nir, B6 swir1, B7 swir2
        table: &[(Red, 4), (Green, 3), (Blue, 2), (Nir, 5), (Swir, 6)],
        variants: &[StackVariant {
            token: "b2-b7",
            label: "Landsat 8/9 (B2-B7 stack)",
            table: &[(Red, 3), (Green, 2), (Blue, 1), (Nir, 4), (Swir, 5)],
        }],
    },
    PlatformRule {
        label: "Landsat 7",
        tokens: &["le07"],
        table: &[(Red, 3), (Green, 2), (Blue, 1), (Nir, 4), (Swir, 5)],
        variants: &[],
    },
    PlatformRule {
        label: "Sentinel-2",
        tokens: &["s2", "sentinel"],
        // B1..B12 stack: blue=B2, green=B3, red=B4, nir=B8, swir=B11
        table: &[(Red, 4), (Green, 3), (Blue, 2), (Nir, 8), (Swir, 11)],
        variants: &[],
    },
];

/// Label used when roles come from band descriptions
pub const DESCRIPTIONS_LABEL: &str = "Band Descriptions";
/// Label used for the generic default ordering
pub const DEFAULT_LABEL: &str = "Generic (Default Mapping)";

const DEFAULT_TABLE: &[(BandRole, usize)] =
    &[(Red, 1), (Green, 2), (Blue, 3), (Nir, 4), (Swir, 5)];

/// Keywords per role, checked in this order. The infrared roles come first
/// because "near infrared" contains "red".
const DESCRIPTION_KEYWORDS: &[(BandRole, &[&str])] = &[
    (Nir, &["nir", "near infrared", "near-infrared"]),
    (Swir, &["swir", "shortwave infrared", "short-wave infrared"]),
    (Red, &["red"]),
    (Green, &["green"]),
    (Blue, &["blue"]),
];

/// Outcome of role resolution
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoleResolution {
    pub map: BandRoleMap,
    /// Which resolution path produced the map
    pub label: String,
    /// True when the generic default ordering was used
    pub fallback: bool,
}

/// Match the file name against the platform rules
pub fn match_platform(file_name: &str) -> Option<(&'static str, BandRoleMap)> {
    let name = file_name.to_lowercase();
    let rule = PLATFORM_RULES
        .iter()
        .find(|rule| rule.tokens.iter().any(|t| name.contains(t)))?;

    match rule.variants.iter().find(|v| name.contains(v.token)) {
        Some(variant) => Some((variant.label, BandRoleMap::from_pairs(variant.table))),
        None => Some((rule.label, BandRoleMap::from_pairs(rule.table))),
    }
}

/// Assign roles from band descriptions (1-based, in description order).
/// The first band matching a role keeps it.
pub fn roles_from_descriptions(descriptions: &[Option<String>]) -> BandRoleMap {
    let mut map = BandRoleMap::new();
    for (i, desc) in descriptions.iter().enumerate() {
        let Some(desc) = desc else { continue };
        let desc = desc.to_lowercase();
        let role = DESCRIPTION_KEYWORDS
            .iter()
            .find(|(_, words)| words.iter().any(|w| desc.contains(w)))
            .map(|(role, _)| *role);
        if let Some(role) = role {
            if map.get(role).is_none() {
                map.insert(role, i + 1);
            }
        }
    }
    map
}

/// Resolve the role map for a source file.
///
/// `descriptions` is only called when no platform rule matches; a failure
/// there is treated as "no descriptions".
pub fn resolve_roles<F>(file_name: &str, descriptions: F) -> RoleResolution
where
    F: FnOnce() -> Result<Vec<Option<String>>>,
{
    if let Some((label, map)) = match_platform(file_name) {
        debug!("Platform rule '{}' matched {}", label, file_name);
        return RoleResolution {
            map,
            label: label.to_string(),
            fallback: false,
        };
    }

    match descriptions() {
        Ok(desc) => {
            let map = roles_from_descriptions(&desc);
            if !map.is_empty() {
                return RoleResolution {
                    map,
                    label: DESCRIPTIONS_LABEL.to_string(),
                    fallback: false,
                };
            }
        }
        Err(e) => debug!("Band descriptions unavailable: {}", e),
    }

    RoleResolution {
        map: BandRoleMap::from_pairs(DEFAULT_TABLE),
        label: DEFAULT_LABEL.to_string(),
        fallback: true,
    }
}
