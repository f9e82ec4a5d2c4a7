//! Standard Scaler (Z-score normalization).
//!
//! The standard score of a sample `x` is calculated as:
//! ```text
//! z = (x - u) / s
//! ```
//! where `u` is the mean of the training samples and `s` their population
//! standard deviation. Constant columns get `s = 1`.

use crate::error::{PipelineError, Result};
use crate::preprocessing::traits::{FittedTransformer, Transformer};
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

/// StandardScaler transformer (unfitted).
#[derive(Clone, Debug)]
pub struct StandardScaler {
    with_mean: bool,
    with_std: bool,
    names: Option<Vec<String>>,
}

impl Default for StandardScaler {
    fn default() -> Self {
        Self::new()
    }
}

impl StandardScaler {
    pub fn new() -> Self {
        Self {
            with_mean: true,
            with_std: true,
            names: None,
        }
    }

    /// Set whether to center data by mean.
    pub fn with_mean(mut self, with_mean: bool) -> Self {
        self.with_mean = with_mean;
        self
    }

    /// Set whether to scale data to unit variance.
    pub fn with_std(mut self, with_std: bool) -> Self {
        self.with_std = with_std;
        self
    }

    /// Column names reported by the fitted scaler (defaults to `x0`, `x1`, ...).
    pub fn with_names(mut self, names: Vec<String>) -> Self {
        self.names = Some(names);
        self
    }
}

impl Transformer for StandardScaler {
    type Input = Array2<f64>;
    type Output = Array2<f64>;
    type Fitted = FittedStandardScaler;

    fn fit(&self, data: &Array2<f64>, _target: Option<&[f64]>) -> Result<FittedStandardScaler> {
        let (rows, cols) = data.dim();
        if rows == 0 {
            return Err(PipelineError::fit(
                "standard scaler",
                "cannot fit on empty data",
            ));
        }
        if data.iter().any(|v| !v.is_finite()) {
            return Err(PipelineError::fit(
                "standard scaler",
                "input contains NaN or infinite values",
            ));
        }

        let names = match &self.names {
            Some(names) if names.len() == cols => names.clone(),
            Some(names) => {
                return Err(PipelineError::fit(
                    "standard scaler",
                    format!("{} names given for {} columns", names.len(), cols),
                ))
            }
            None => (0..cols).map(|i| format!("x{}", i)).collect(),
        };

        let mean = if self.with_mean {
            data.mean_axis(Axis(0))
                .unwrap_or_else(|| Array1::zeros(cols))
        } else {
            Array1::zeros(cols)
        };
        let std = if self.with_std {
            data.std_axis(Axis(0), 0.0)
                .mapv(|s| if s == 0.0 { 1.0 } else { s })
        } else {
            Array1::ones(cols)
        };

        Ok(FittedStandardScaler { mean, std, names })
    }
}

/// Fitted StandardScaler ready for inference.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FittedStandardScaler {
    mean: Array1<f64>,
    std: Array1<f64>,
    names: Vec<String>,
}

impl FittedStandardScaler {
    /// Mean of each column.
    pub fn mean(&self) -> &Array1<f64> {
        &self.mean
    }

    /// Standard deviation of each column (1 for constant columns).
    pub fn std(&self) -> &Array1<f64> {
        &self.std
    }

    /// Undo the scaling.
    pub fn inverse_transform(&self, data: &Array2<f64>) -> Result<Array2<f64>> {
        self.check_width(data)?;
        Ok(data * &self.std + &self.mean)
    }

    fn check_width(&self, data: &Array2<f64>) -> Result<()> {
        if data.ncols() != self.mean.len() {
            return Err(PipelineError::TransformMismatch(format!(
                "standard scaler expects {} columns, got {}",
                self.mean.len(),
                data.ncols()
            )));
        }
        Ok(())
    }
}

impl FittedTransformer for FittedStandardScaler {
    type Input = Array2<f64>;
    type Output = Array2<f64>;

    fn transform(&self, data: &Array2<f64>) -> Result<Array2<f64>> {
        self.check_width(data)?;
        Ok((data - &self.mean) / &self.std)
    }

    fn n_features_in(&self) -> usize {
        self.mean.len()
    }

    fn n_features_out(&self) -> usize {
        self.mean.len()
    }

    fn feature_names(&self) -> Vec<String> {
        self.names.clone()
    }
}
