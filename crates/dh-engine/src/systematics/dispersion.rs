//! Dispersion-based estimators: sideband region and purity binning.
//!
//! Both model a binning-choice sensitivity: refit the same term in several
//! sub-samples (invariant-mass sidebands, or purity-weight grids) and take
//! the spread of the results as the systematic. Only defined for channels
//! with a neutral-pion final state.

use crate::systematics::ASYM_EPSILON;

/// Unbiased sample standard deviation (`N-1` denominator).
/// `None` for fewer than two values.
pub fn sample_std(values: &[f64]) -> Option<f64> {
    let n = values.len();
    if n < 2 {
        return None;
    }
    let mean = values.iter().sum::<f64>() / n as f64;
    let var = values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / (n - 1) as f64;
    Some(var.sqrt())
}

/// Relative error `sigma / |A|` from a set of sub-sample fit values.
///
/// Fewer than two values cannot constrain a spread and contribute 0 with a
/// warning; an asymmetry consistent with zero also contributes 0.
pub fn relative_error(values: &[f64], asym: f64, source: &str) -> f64 {
    let Some(sigma) = sample_std(values) else {
        log::warn!("{source}: {} sub-sample value(s), need at least 2; contributing 0", values.len());
        return 0.0;
    };
    if asym.abs() < ASYM_EPSILON {
        return 0.0;
    }
    sigma / asym.abs()
}
