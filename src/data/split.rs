//! Seeded train / eval / test splitting.

use super::Dataset;
use crate::error::{PipelineError, Result};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// Fractions of the dataset assigned to each split. The test split takes the remainder.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SplitRatios {
    pub train: f64,
    pub eval: f64,
}

impl Default for SplitRatios {
    fn default() -> Self {
        Self {
            train: 0.7,
            eval: 0.15,
        }
    }
}

impl SplitRatios {
    pub fn new(train: f64, eval: f64) -> Self {
        Self { train, eval }
    }

    fn validate(&self) -> Result<()> {
        let valid = self.train > 0.0
            && self.eval >= 0.0
            && self.train.is_finite()
            && self.eval.is_finite()
            && self.train + self.eval <= 1.0 + 1e-12;
        if !valid {
            return Err(PipelineError::Configuration(format!(
                "split ratios must satisfy train > 0, eval >= 0, train + eval <= 1 (got {} / {})",
                self.train, self.eval
            )));
        }
        Ok(())
    }
}

/// Disjoint train / eval / test partitions of one dataset.
#[derive(Clone, Debug, Default)]
pub struct Splits {
    pub train: Dataset,
    pub eval: Dataset,
    pub test: Dataset,
}

/// Shuffle `dataset` with a seeded ChaCha8 generator and cut it by `ratios`.
///
/// The same `(dataset, ratios, seed)` always yields the same partitions.
pub fn train_eval_test_split(dataset: &Dataset, ratios: SplitRatios, seed: u64) -> Result<Splits> {
    ratios.validate()?;

    let n = dataset.len();
    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let n_train = (((n as f64) * ratios.train).round() as usize).min(n);
    let n_eval = (((n as f64) * ratios.eval).round() as usize).min(n - n_train);

    Ok(Splits {
        train: dataset.select(&indices[..n_train]),
        eval: dataset.select(&indices[n_train..n_train + n_eval]),
        test: dataset.select(&indices[n_train + n_eval..]),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::synthetic;

    #[test]
    fn test_split_sizes() {
        let dataset = synthetic::generate(100, 1);
        let splits = train_eval_test_split(&dataset, SplitRatios::new(0.6, 0.2), 42).unwrap();
        assert_eq!(splits.train.len(), 60);
        assert_eq!(splits.eval.len(), 20);
        assert_eq!(splits.test.len(), 20);
    }

    #[test]
    fn test_split_is_deterministic_per_seed() {
        let dataset = synthetic::generate(50, 1);
        let a = train_eval_test_split(&dataset, SplitRatios::default(), 7).unwrap();
        let b = train_eval_test_split(&dataset, SplitRatios::default(), 7).unwrap();
        let c = train_eval_test_split(&dataset, SplitRatios::default(), 8).unwrap();
        assert_eq!(a.train.prices, b.train.prices);
        assert_ne!(a.train.prices, c.train.prices);
    }

    #[test]
    fn test_split_partitions_every_row_once() {
        let dataset = synthetic::generate(37, 3);
        let splits = train_eval_test_split(&dataset, SplitRatios::new(0.5, 0.3), 0).unwrap();
        let mut all: Vec<f64> = splits
            .train
            .prices
            .iter()
            .chain(&splits.eval.prices)
            .chain(&splits.test.prices)
            .copied()
            .collect();
        let mut expected = dataset.prices.clone();
        all.sort_by(|a, b| a.total_cmp(b));
        expected.sort_by(|a, b| a.total_cmp(b));
        assert_eq!(all, expected);
    }

    #[test]
    fn test_split_rejects_bad_ratios() {
        let dataset = synthetic::generate(10, 1);
        let result = train_eval_test_split(&dataset, SplitRatios::new(0.9, 0.3), 0);
        assert!(matches!(result, Err(PipelineError::Configuration(_))));
    }
}
