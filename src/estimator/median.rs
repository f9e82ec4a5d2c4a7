//! Constant median baseline.

use super::{check_training_data, FittedRegressor, Regressor};
use crate::error::Result;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default)]
pub struct MedianRegressor;

impl Regressor for MedianRegressor {
    type Fitted = FittedMedian;

    fn fit(&self, x: &Array2<f64>, y: &Array1<f64>, _categorical: &[usize]) -> Result<FittedMedian> {
        check_training_data("estimator[c-median]", x, y)?;
        let mut sorted = y.to_vec();
        sorted.sort_by(f64::total_cmp);
        let mid = sorted.len() / 2;
        let median = if sorted.len() % 2 == 0 {
            (sorted[mid - 1] + sorted[mid]) / 2.0
        } else {
            sorted[mid]
        };
        Ok(FittedMedian {
            median,
            n_features: x.ncols(),
        })
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FittedMedian {
    median: f64,
    n_features: usize,
}

impl FittedMedian {
    pub fn median(&self) -> f64 {
        self.median
    }
}

impl FittedRegressor for FittedMedian {
    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        self.check_width(x)?;
        Ok(Array1::from_elem(x.nrows(), self.median))
    }

    fn n_features(&self) -> usize {
        self.n_features
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_median_odd_and_even() {
        let x = array![[0.0], [0.0], [0.0]];
        let fitted = MedianRegressor.fit(&x, &array![3.0, 1.0, 2.0], &[]).unwrap();
        assert_eq!(fitted.median(), 2.0);

        let x = array![[0.0], [0.0], [0.0], [0.0]];
        let fitted = MedianRegressor.fit(&x, &array![4.0, 1.0, 3.0, 2.0], &[]).unwrap();
        assert_eq!(fitted.median(), 2.5);
        assert_eq!(fitted.predict(&x).unwrap().to_vec(), vec![2.5; 4]);
    }
}
