//! Spectral band algebra
//!
//! - Band roles: map red/green/blue/nir/swir onto physical band indices
//! - Spectral indices: closed registry of named formulas (NDVI, EVI, TCI, ...)
//! - Expressions: sandboxed per-pixel algebra over `b1..bN`
//! - Composite: RGB stack of three bands, raw or percentile-stretched

mod composite;
mod expression;
mod formula;
mod indices;
mod roles;

pub use composite::{composite, CompositeMode};
pub use expression::{Expression, Function};
pub use formula::{evaluate, evaluate_expression, load_bands, FormulaSelector};
pub use indices::{evaluate_index, IndexDefinition, IndexFn, SpectralIndex, EPSILON, SAVI_L};
pub use roles::{
    match_platform, resolve_roles, roles_from_descriptions, BandRole, BandRoleMap, PlatformRule,
    RoleResolution, StackVariant, DEFAULT_LABEL, DESCRIPTIONS_LABEL, PLATFORM_RULES,
};
