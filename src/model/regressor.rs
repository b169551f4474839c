//! Regressor trait defining the tabular regression seam.

use crate::error::Result;

/// Common interface for tabular regression backends.
///
/// The growth model treats the regressor as a supplied capability: any
/// boosted-tree or comparable implementation satisfies the contract. The
/// trait is object-safe and can be used with `Box<dyn Regressor>`.
pub trait Regressor {
    /// Fit the regressor on feature rows and scalar targets.
    fn fit(&mut self, x: &[Vec<f64>], y: &[f64]) -> Result<()>;

    /// Predict the scalar output for a single feature row.
    fn predict_row(&self, row: &[f64]) -> Result<f64>;

    /// Per-feature importance weights, in input-column order.
    ///
    /// `None` until fitted, or when the backend does not expose
    /// importances.
    fn feature_importance(&self) -> Option<&[f64]>;

    /// Backend display name.
    fn name(&self) -> &str;

    /// Check if the regressor has been fitted.
    fn is_fitted(&self) -> bool;
}
