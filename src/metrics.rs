//! Regression metrics.
//!
//! RMSLE is the metric models are compared on:
//!
//! ```text
//! RMSLE = sqrt(mean((ln(1 + pred) - ln(1 + actual))^2))
//! ```
//!
//! It is computed on original-scale prices, never on log-transformed targets.

use crate::error::{PipelineError, Result};

/// Metrics for evaluating regression models.
pub struct Metrics;

impl Metrics {
    fn check(y_true: &[f64], y_pred: &[f64]) -> Result<()> {
        if y_true.len() != y_pred.len() {
            return Err(PipelineError::InvalidData(format!(
                "{} true values but {} predictions",
                y_true.len(),
                y_pred.len()
            )));
        }
        if y_true.is_empty() {
            return Err(PipelineError::InvalidData(
                "cannot compute a metric on zero rows".to_string(),
            ));
        }
        if y_true.iter().chain(y_pred).any(|v| !v.is_finite()) {
            return Err(PipelineError::InvalidData(
                "metric inputs contain non-finite values".to_string(),
            ));
        }
        Ok(())
    }

    /// Root mean squared log error.
    ///
    /// # Errors
    /// [`PipelineError::InvalidData`] on length mismatch, empty input,
    /// non-finite values or values `<= -1`.
    pub fn rmsle(y_true: &[f64], y_pred: &[f64]) -> Result<f64> {
        Self::check(y_true, y_pred)?;
        if y_true.iter().chain(y_pred).any(|v| *v <= -1.0) {
            return Err(PipelineError::InvalidData(
                "RMSLE is undefined for values <= -1".to_string(),
            ));
        }
        let sum_sq: f64 = y_true
            .iter()
            .zip(y_pred)
            .map(|(&t, &p)| (p.ln_1p() - t.ln_1p()).powi(2))
            .sum();
        Ok((sum_sq / y_true.len() as f64).sqrt())
    }

    /// Root mean squared error.
    pub fn rmse(y_true: &[f64], y_pred: &[f64]) -> Result<f64> {
        Self::check(y_true, y_pred)?;
        let sum_sq: f64 = y_true.iter().zip(y_pred).map(|(&t, &p)| (t - p).powi(2)).sum();
        Ok((sum_sq / y_true.len() as f64).sqrt())
    }

    /// Mean absolute error.
    pub fn mae(y_true: &[f64], y_pred: &[f64]) -> Result<f64> {
        Self::check(y_true, y_pred)?;
        let sum_abs: f64 = y_true.iter().zip(y_pred).map(|(&t, &p)| (t - p).abs()).sum();
        Ok(sum_abs / y_true.len() as f64)
    }

    /// Weighted absolute percentage error: `Σ|t - p| / Σ|t|`.
    pub fn wape(y_true: &[f64], y_pred: &[f64]) -> Result<f64> {
        Self::check(y_true, y_pred)?;
        let total: f64 = y_true.iter().map(|t| t.abs()).sum();
        if total == 0.0 {
            return Err(PipelineError::InvalidData(
                "WAPE is undefined when all true values are zero".to_string(),
            ));
        }
        let sum_abs: f64 = y_true.iter().zip(y_pred).map(|(&t, &p)| (t - p).abs()).sum();
        Ok(sum_abs / total)
    }
}
