//! L2-regularised linear regression.
//!
//! Inputs are standardised with a [`StandardScaler`] fitted on the training
//! matrix and replayed at predict time. The penalised normal equations are
//! solved in closed form by Cholesky, in primal form
//! `(XᵀX + αI) w = Xᵀy` when there are at least as many rows as features and
//! in dual form `w = Xᵀ (XXᵀ + αI)⁻¹ y` otherwise.

use super::{check_training_data, FittedRegressor, Regressor};
use crate::config::RidgeParams;
use crate::error::{PipelineError, Result};
use crate::preprocessing::scaler::{FittedStandardScaler, StandardScaler};
use crate::preprocessing::traits::{FittedTransformer, Transformer};
use nalgebra::{DMatrix, DVector};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use tracing::debug;

const COMPONENT: &str = "estimator[ridge]";

#[derive(Clone, Debug)]
pub struct RidgeRegressor {
    params: RidgeParams,
}

impl RidgeRegressor {
    pub fn new(params: RidgeParams) -> Self {
        Self { params }
    }
}

fn solve_spd(mut a: DMatrix<f64>, alpha: f64, b: DVector<f64>) -> Result<DVector<f64>> {
    for i in 0..a.nrows() {
        a[(i, i)] += alpha;
    }
    let cholesky = a.cholesky().ok_or_else(|| {
        PipelineError::fit(
            COMPONENT,
            format!("penalised normal equations are singular (alpha = {})", alpha),
        )
    })?;
    Ok(cholesky.solve(&b))
}

impl Regressor for RidgeRegressor {
    type Fitted = FittedRidge;

    fn fit(&self, x: &Array2<f64>, y: &Array1<f64>, _categorical: &[usize]) -> Result<FittedRidge> {
        check_training_data(COMPONENT, x, y)?;
        let scaler = StandardScaler::new()
            .with_mean(self.params.fit_intercept)
            .fit(x, None)
            .map_err(|e| PipelineError::fit(COMPONENT, e.to_string()))?;
        let xs = scaler.transform(x)?;

        let (intercept, yc) = if self.params.fit_intercept {
            let mean = y.mean().unwrap_or(0.0);
            (mean, y - mean)
        } else {
            (0.0, y.clone())
        };

        let (n, p) = xs.dim();
        let coef = if p == 0 {
            Array1::zeros(0)
        } else {
            let xm = DMatrix::from_fn(n, p, |i, j| xs[[i, j]]);
            let yv = DVector::from_iterator(n, yc.iter().copied());
            let w = if p <= n {
                solve_spd(xm.transpose() * &xm, self.params.alpha, xm.transpose() * yv)?
            } else {
                let dual = solve_spd(&xm * xm.transpose(), self.params.alpha, yv)?;
                xm.transpose() * dual
            };
            Array1::from_iter(w.iter().copied())
        };

        debug!(
            rows = n,
            features = p,
            alpha = self.params.alpha,
            dual = p > n,
            "fitted ridge"
        );

        Ok(FittedRidge {
            scaler,
            coef,
            intercept,
        })
    }
}

/// Fitted ridge model; coefficients live in the standardised space.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FittedRidge {
    scaler: FittedStandardScaler,
    coef: Array1<f64>,
    intercept: f64,
}

impl FittedRidge {
    pub fn coefficients(&self) -> &Array1<f64> {
        &self.coef
    }

    pub fn intercept(&self) -> f64 {
        self.intercept
    }

    pub fn scaler(&self) -> &FittedStandardScaler {
        &self.scaler
    }
}

impl FittedRegressor for FittedRidge {
    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        self.check_width(x)?;
        if self.coef.is_empty() {
            return Ok(Array1::from_elem(x.nrows(), self.intercept));
        }
        let xs = self.scaler.transform(x)?;
        Ok(xs.dot(&self.coef) + self.intercept)
    }

    fn n_features(&self) -> usize {
        self.coef.len()
    }
}
