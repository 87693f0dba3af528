//! Percentile contrast stretch
//!
//! Shared by the preview renderer and the stretched composite output.

/// Lower percentile of the display stretch
pub const LOW_PERCENTILE: f64 = 2.0;
/// Upper percentile of the display stretch
pub const HIGH_PERCENTILE: f64 = 98.0;
/// Spans at or below this are treated as degenerate
pub const MIN_SPAN: f64 = 1e-9;

/// Linear interpolation percentile of an ascending slice (`q` in 0..=100).
///
/// Matches the default "linear" method of common array libraries:
/// rank `q/100 * (n-1)` interpolated between its neighbours.
pub fn percentile(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let rank = (q.clamp(0.0, 100.0) / 100.0) * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f64;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

/// Value range mapped onto the display range
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StretchRange {
    /// `low` maps to 0, `high` to the top of the range
    Linear { low: f64, high: f64 },
    /// No usable span: every value maps to 0
    Flat,
}

impl StretchRange {
    /// 2–98 percentile range of the finite values, falling back to min/max
    /// and then to [`StretchRange::Flat`] when the span is degenerate.
    ///
    /// Returns `None` when there is no finite value at all.
    pub fn from_values<I>(values: I) -> Option<Self>
    where
        I: IntoIterator<Item = f32>,
    {
        let mut sorted: Vec<f64> = values
            .into_iter()
            .filter(|v| v.is_finite())
            .map(f64::from)
            .collect();
        if sorted.is_empty() {
            return None;
        }
        sorted.sort_by(f64::total_cmp);

        let low = percentile(&sorted, LOW_PERCENTILE)?;
        let high = percentile(&sorted, HIGH_PERCENTILE)?;
        if high - low > MIN_SPAN {
            return Some(Self::Linear { low, high });
        }

        let min = sorted[0];
        let max = sorted[sorted.len() - 1];
        if max - min > MIN_SPAN {
            return Some(Self::Linear {
                low: min,
                high: max,
            });
        }

        Some(Self::Flat)
    }

    /// Map a value into [0, 1], clipping outliers
    pub fn normalize(&self, value: f32) -> f32 {
        match *self {
            Self::Linear { low, high } => {
                (((value as f64) - low) / (high - low)).clamp(0.0, 1.0) as f32
            }
            Self::Flat => 0.0,
        }
    }

    /// Map a value into 0..=255
    pub fn to_byte(&self, value: f32) -> u8 {
        // truncation, as an 8-bit cast of the clipped value would do
        (self.normalize(value) * 255.0) as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_percentile_interpolates() {
        let sorted: Vec<f64> = (0..=100).map(f64::from).collect();
        assert_relative_eq!(percentile(&sorted, 2.0).unwrap(), 2.0);
        assert_relative_eq!(percentile(&sorted, 98.0).unwrap(), 98.0);

        let short = [1.0, 2.0, 3.0, 4.0];
        // rank 0.06 between 1 and 2
        assert_relative_eq!(percentile(&short, 2.0).unwrap(), 1.06, epsilon = 1e-12);
        assert!(percentile(&[], 50.0).is_none());
    }

    #[test]
    fn test_outliers_clipped() {
        let mut values: Vec<f32> = (0..100).map(|v| v as f32).collect();
        values.push(1.0e6);
        let range = StretchRange::from_values(values).unwrap();
        assert_eq!(range.to_byte(1.0e6), 255);
        assert_eq!(range.to_byte(-5.0), 0);
    }

    #[test]
    fn test_constant_values_are_flat() {
        let range = StretchRange::from_values(vec![0.42f32; 64]).unwrap();
        assert_eq!(range, StretchRange::Flat);
        assert_eq!(range.to_byte(0.42), 0);
    }

    #[test]
    fn test_minmax_fallback() {
        // 98% of values identical: percentile span collapses, min/max does not
        let mut values = vec![5.0f32; 200];
        values[0] = 0.0;
        values[199] = 10.0;
        let range = StretchRange::from_values(values).unwrap();
        assert_eq!(range, StretchRange::Linear { low: 0.0, high: 10.0 });
        assert_relative_eq!(range.normalize(5.0), 0.5);
    }

    #[test]
    fn test_no_finite_values() {
        assert!(StretchRange::from_values(vec![f32::NAN, f32::INFINITY]).is_none());
    }
}
