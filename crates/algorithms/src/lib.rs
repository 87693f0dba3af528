//! # bandcalc Algorithms
//!
//! The band-algebra engine of bandcalc.
//!
//! ## Modules
//!
//! - **imagery**: band role mapping, named spectral indices, band expressions
//!   and RGB composites

pub mod imagery;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::imagery::{
        composite, evaluate, resolve_roles, BandRole, BandRoleMap, CompositeMode, Expression,
        FormulaSelector, RoleResolution, SpectralIndex,
    };
    pub use bandcalc_core::prelude::*;
}
