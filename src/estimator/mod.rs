//! Estimator adapter.
//!
//! [`Estimator`] wraps every supported regression algorithm behind one
//! `fit(x, y, categorical)` / `predict(x)` contract. The categorical column
//! list comes from the feature layout; the boosted trees split on those
//! columns natively, the linear and constant estimators ignore it.
//!
//! Hyperparameters are taken from [`EstimatorConfig`] unchanged. The
//! estimators work on whatever scale `y` is given in.

use crate::config::{EstimatorConfig, EstimatorKind};
use crate::error::{PipelineError, Result};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

pub mod gbdt;
pub mod median;
pub mod ridge;

pub use gbdt::{FittedGradientBoosting, GradientBoostingRegressor, Node, Tree};
pub use median::{FittedMedian, MedianRegressor};
pub use ridge::{FittedRidge, RidgeRegressor};

/// Unfitted regression algorithm.
pub trait Regressor {
    type Fitted: FittedRegressor;

    /// Fit on `x` (rows × features) and `y`.
    ///
    /// # Errors
    /// [`PipelineError::Fit`] on empty, mismatched or non-finite input, or
    /// when the algorithm cannot solve the problem.
    fn fit(&self, x: &Array2<f64>, y: &Array1<f64>, categorical: &[usize]) -> Result<Self::Fitted>;
}

/// Fitted regression algorithm. `predict` never mutates learned state.
pub trait FittedRegressor {
    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>>;

    /// Number of feature columns seen at fit time.
    fn n_features(&self) -> usize;

    fn check_width(&self, x: &Array2<f64>) -> Result<()> {
        if x.ncols() != self.n_features() {
            return Err(PipelineError::TransformMismatch(format!(
                "estimator was fitted on {} features, got {}",
                self.n_features(),
                x.ncols()
            )));
        }
        Ok(())
    }
}

/// Shared input validation for every estimator.
pub(crate) fn check_training_data(component: &str, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
    if x.nrows() == 0 {
        return Err(PipelineError::fit(component, "cannot fit on zero rows"));
    }
    if x.nrows() != y.len() {
        return Err(PipelineError::fit(
            component,
            format!("{} feature rows but {} targets", x.nrows(), y.len()),
        ));
    }
    if x.iter().any(|v| !v.is_finite()) {
        return Err(PipelineError::fit(component, "feature matrix contains non-finite values"));
    }
    if y.iter().any(|v| !v.is_finite()) {
        return Err(PipelineError::fit(component, "target contains non-finite values"));
    }
    Ok(())
}

/// Estimator selected by configuration.
#[derive(Clone, Debug)]
pub enum Estimator {
    Ridge(RidgeRegressor),
    GradientBoosting(GradientBoostingRegressor),
    Median(MedianRegressor),
}

impl Estimator {
    /// Resolve the configured estimator; `seed` drives row subsampling.
    pub fn from_config(config: &EstimatorConfig, seed: u64) -> Self {
        match config.kind {
            EstimatorKind::Ridge => Estimator::Ridge(RidgeRegressor::new(config.ridge.clone())),
            EstimatorKind::GradientBoosting => Estimator::GradientBoosting(
                GradientBoostingRegressor::new(config.boosting.clone(), seed),
            ),
            EstimatorKind::Median => Estimator::Median(MedianRegressor),
        }
    }

    pub fn kind(&self) -> EstimatorKind {
        match self {
            Estimator::Ridge(_) => EstimatorKind::Ridge,
            Estimator::GradientBoosting(_) => EstimatorKind::GradientBoosting,
            Estimator::Median(_) => EstimatorKind::Median,
        }
    }

    pub fn fit(
        &self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        categorical: &[usize],
    ) -> Result<FittedEstimator> {
        match self {
            Estimator::Ridge(e) => e.fit(x, y, categorical).map(FittedEstimator::Ridge),
            Estimator::GradientBoosting(e) => {
                e.fit(x, y, categorical).map(FittedEstimator::GradientBoosting)
            }
            Estimator::Median(e) => e.fit(x, y, categorical).map(FittedEstimator::Median),
        }
    }
}

/// Fitted counterpart of [`Estimator`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum FittedEstimator {
    Ridge(FittedRidge),
    GradientBoosting(FittedGradientBoosting),
    Median(FittedMedian),
}

impl FittedEstimator {
    pub fn kind(&self) -> EstimatorKind {
        match self {
            FittedEstimator::Ridge(_) => EstimatorKind::Ridge,
            FittedEstimator::GradientBoosting(_) => EstimatorKind::GradientBoosting,
            FittedEstimator::Median(_) => EstimatorKind::Median,
        }
    }
}

impl FittedRegressor for FittedEstimator {
    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        match self {
            FittedEstimator::Ridge(e) => e.predict(x),
            FittedEstimator::GradientBoosting(e) => e.predict(x),
            FittedEstimator::Median(e) => e.predict(x),
        }
    }

    fn n_features(&self) -> usize {
        match self {
            FittedEstimator::Ridge(e) => e.n_features(),
            FittedEstimator::GradientBoosting(e) => e.n_features(),
            FittedEstimator::Median(e) => e.n_features(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BoostingParams;
    use ndarray::array;

    #[test]
    fn test_from_config_resolves_kind() {
        for config in [
            EstimatorConfig::ridge(1.0),
            EstimatorConfig::gradient_boosting(BoostingParams::default()),
            EstimatorConfig::median(),
        ] {
            assert_eq!(Estimator::from_config(&config, 0).kind(), config.kind);
        }
    }

    #[test]
    fn test_fit_rejects_length_mismatch() {
        let x = array![[1.0], [2.0]];
        let y = array![1.0];
        let est = Estimator::from_config(&EstimatorConfig::ridge(1.0), 0);
        assert!(matches!(est.fit(&x, &y, &[]), Err(PipelineError::Fit { .. })));
    }

    #[test]
    fn test_fit_rejects_non_finite() {
        let x = array![[1.0], [f64::NAN]];
        let y = array![1.0, 2.0];
        let est = Estimator::from_config(&EstimatorConfig::median(), 0);
        assert!(est.fit(&x, &y, &[]).is_err());
    }

    #[test]
    fn test_predict_checks_width() {
        let x = array![[1.0, 2.0], [2.0, 1.0], [3.0, 0.0]];
        let y = array![1.0, 2.0, 3.0];
        for config in [
            EstimatorConfig::ridge(1.0),
            EstimatorConfig::gradient_boosting(BoostingParams::default()),
            EstimatorConfig::median(),
        ] {
            let fitted = Estimator::from_config(&config, 0).fit(&x, &y, &[]).unwrap();
            assert_eq!(fitted.kind(), config.kind);
            assert!(matches!(
                fitted.predict(&array![[1.0]]),
                Err(PipelineError::TransformMismatch(_))
            ));
        }
    }
}
