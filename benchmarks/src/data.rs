use resale_pricer::data::{read_csv, synthetic, train_eval_test_split, SplitRatios, Splits};
use resale_pricer::{Dataset, Listing, Result};
use std::path::Path;

/// Train/eval/test splits the benches and sweeps run against.
///
/// Built either from a CSV export of listings or from the deterministic
/// synthetic generator, then split with a fixed seed so every run sees the
/// same rows.
///
/// # Example
///
/// ```
/// use benchmarks::data::Workload;
///
/// let workload = Workload::synthetic(200, 7).unwrap();
/// assert_eq!(workload.splits.train.len(), 140);
/// ```
#[derive(Debug, Clone)]
pub struct Workload {
    pub splits: Splits,
    pub source: String,
}

impl Workload {
    /// Synthetic listings split 70/15/15.
    pub fn synthetic(n: usize, seed: u64) -> Result<Self> {
        Self::from_dataset(synthetic::generate(n, seed), seed, format!("synthetic(n={})", n))
    }

    /// Listings read from a CSV export, split 70/15/15.
    pub fn from_csv<P: AsRef<Path>>(path: P, seed: u64) -> Result<Self> {
        let source = path.as_ref().display().to_string();
        Self::from_dataset(read_csv(path)?, seed, source)
    }

    /// CSV export when `path` is given, synthetic listings otherwise.
    pub fn load(path: Option<&str>, n: usize, seed: u64) -> Result<Self> {
        match path {
            Some(path) => Self::from_csv(path, seed),
            None => Self::synthetic(n, seed),
        }
    }

    fn from_dataset(dataset: Dataset, seed: u64, source: String) -> Result<Self> {
        let splits = train_eval_test_split(&dataset, SplitRatios::default(), seed)?;
        Ok(Self { splits, source })
    }

    /// First eval listing, for single-row latency measurements.
    pub fn single_row(&self) -> Option<&Listing> {
        self.splits.eval.listings.first()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_synthetic_workload_is_deterministic() {
        let a = Workload::synthetic(100, 3).unwrap();
        let b = Workload::synthetic(100, 3).unwrap();
        assert_eq!(a.splits.eval.prices, b.splits.eval.prices);
        assert_eq!(
            a.splits.train.len() + a.splits.eval.len() + a.splits.test.len(),
            100
        );
        assert!(a.single_row().is_some());
    }

    #[test]
    fn test_missing_csv_is_an_error() {
        assert!(Workload::load(Some("does/not/exist.csv"), 10, 0).is_err());
    }
}
