//! Formula dispatch: named index or band expression

use std::fmt;

use bandcalc_core::io::{check_band_index, BandSource};
use bandcalc_core::{BandArray, ComputationResult, Error, Result};
use tracing::debug;

use super::expression::Expression;
use super::indices::{evaluate_index, SpectralIndex};
use super::roles::BandRoleMap;

/// What a run computes
#[derive(Debug, Clone, PartialEq)]
pub enum FormulaSelector {
    /// A registry entry, driven by the band role map
    Index(SpectralIndex),
    /// Free band algebra over `b1..bN`
    Expression(String),
}

impl FormulaSelector {
    /// Parse an index identifier (case-insensitive)
    pub fn index(name: &str) -> Result<Self> {
        name.parse().map(Self::Index)
    }

    /// Index name or expression text, as reported in the run result
    pub fn identifier(&self) -> &str {
        match self {
            Self::Index(idx) => idx.name(),
            Self::Expression(src) => src,
        }
    }

    pub fn is_index(&self) -> bool {
        matches!(self, Self::Index(_))
    }
}

impl fmt::Display for FormulaSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.identifier())
    }
}

/// Evaluate `selector` against `source`.
///
/// `roles` is only consulted for named indices. The returned result is already
/// sanitized (no NaN or infinities).
pub fn evaluate<S: BandSource>(
    selector: &FormulaSelector,
    roles: &BandRoleMap,
    source: &mut S,
) -> Result<ComputationResult> {
    match selector {
        FormulaSelector::Index(index) => evaluate_index(*index, roles, source),
        FormulaSelector::Expression(src) => evaluate_expression(src, source),
    }
}

/// Parse and evaluate a band expression over `source`.
///
/// An expression that references no band produces no array and fails with
/// [`Error::EmptyResult`].
pub fn evaluate_expression<S: BandSource>(src: &str, source: &mut S) -> Result<ComputationResult> {
    let expr = Expression::parse(src, source.band_count())?;
    if expr.bands().is_empty() {
        return Err(Error::EmptyResult);
    }

    debug!("expression '{}' reads bands {:?}", expr, expr.bands());
    let bands = load_bands(source, expr.bands())?;
    ComputationResult::single(expr.evaluate(&bands)?)
}

/// Read the given 1-based bands in order.
///
/// All indices are validated before the first read; a band requested twice is
/// read once and cloned.
pub fn load_bands<S: BandSource>(source: &mut S, indices: &[usize]) -> Result<Vec<BandArray>> {
    let count = source.band_count();
    for &index in indices {
        check_band_index(index, count)?;
    }

    let mut loaded: Vec<BandArray> = Vec::with_capacity(indices.len());
    for (pos, &index) in indices.iter().enumerate() {
        let band = match indices[..pos].iter().position(|&prev| prev == index) {
            Some(earlier) => loaded[earlier].clone(),
            None => source.read_band(index)?,
        };
        loaded.push(band);
    }
    Ok(loaded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imagery::indices::EPSILON;
    use crate::imagery::roles::BandRole;
    use approx::assert_relative_eq;
    use bandcalc_core::io::MemoryDataset;
    use ndarray::{array, Array2};

    fn dn_source() -> MemoryDataset {
        let bands = (1..=5)
            .map(|b| Array2::from_shape_fn((3, 4), |(r, c)| (b * 100 + r * 37 + c * 11) as f32))
            .collect();
        MemoryDataset::new(bands).unwrap()
    }

    /// Reflectance-scale red (b4) and nir (b5); the second row has nir = -red
    fn reflectance_source() -> MemoryDataset {
        let red = array![[0.10f32, 0.05, 0.31], [-0.2, 0.15, -0.07]];
        let nir = array![[0.30f32, 0.42, 0.33], [0.2, -0.15, 0.07]];
        let filler = Array2::from_elem((2, 3), 0.5f32);
        MemoryDataset::new(vec![filler.clone(), filler.clone(), filler, red, nir]).unwrap()
    }

    #[test]
    fn test_expression_matches_ndvi() {
        let roles = BandRoleMap::from_pairs(&[(BandRole::Red, 4), (BandRole::Nir, 5)]);
        for make in [dn_source, reflectance_source] {
            let ndvi = evaluate(&FormulaSelector::Index(SpectralIndex::NDVI), &roles, &mut make())
                .unwrap();
            let expr = evaluate(
                &FormulaSelector::Expression("(b5-b4)/(b5+b4)".into()),
                &roles,
                &mut make(),
            )
            .unwrap();
            assert_eq!(ndvi.data(), expr.data());
        }
    }

    #[test]
    fn test_opposite_nir_and_red_divide_by_epsilon() {
        let result = evaluate_expression("(b5-b4)/(b5+b4)", &mut reflectance_source()).unwrap();
        assert_eq!(result.channel(0)[[1, 0]], 0.4f32 / EPSILON);
        assert_relative_eq!(result.channel(0)[[0, 0]], 0.5, epsilon = 1e-5);
    }

    #[test]
    fn test_expression_result_sanitized() {
        let mut src = MemoryDataset::new(vec![Array2::zeros((2, 2))]).unwrap();
        let result = evaluate_expression("log(b1) + sqrt(b1 - 1)", &mut src).unwrap();
        assert!(result.data().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_constant_expression_is_empty() {
        let mut src = dn_source();
        let err = evaluate_expression("1 + 2", &mut src).unwrap_err();
        assert!(matches!(err, Error::EmptyResult));
        assert_eq!(src.reads(), 0);
    }

    #[test]
    fn test_expression_error_before_reads() {
        let mut src = dn_source();
        let err = evaluate_expression("b1 + b9", &mut src).unwrap_err();
        assert!(err.to_string().contains("b9"));
        assert_eq!(src.reads(), 0);
    }

    #[test]
    fn test_load_bands_dedupes_reads() {
        let mut src = dn_source();
        let bands = load_bands(&mut src, &[3, 1, 3]).unwrap();
        assert_eq!(bands.len(), 3);
        assert_eq!(bands[0], bands[2]);
        assert_eq!(src.reads(), 2);
    }

    #[test]
    fn test_load_bands_validates_first() {
        let mut src = dn_source();
        let err = load_bands(&mut src, &[1, 6]).unwrap_err();
        assert!(matches!(err, Error::BandIndexOutOfRange { index: 6, count: 5 }));
        assert_eq!(src.reads(), 0);
    }

    #[test]
    fn test_selector_identifier() {
        assert_eq!(FormulaSelector::index("evi").unwrap().identifier(), "EVI");
        assert_eq!(FormulaSelector::Expression("b1*2".into()).identifier(), "b1*2");
        assert!(FormulaSelector::index("nope").is_err());
    }
}
