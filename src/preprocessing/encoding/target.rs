//! Target encoding for high-cardinality categorical features.
//!
//! Each category is replaced by a blend of its mean target and the global
//! prior. The blend weight is a sigmoid of the category count:
//!
//! ```text
//! w = 1 / (1 + exp(-(count - min_samples_leaf) / smoothing))
//! encoded = prior * (1 - w) + mean * w
//! ```
//!
//! Categories seen only once encode to the prior, and so do categories
//! unseen at fit time.

use super::{check_fit_input, check_transform_input};
use crate::data::Column;
use crate::error::{PipelineError, Result};
use crate::preprocessing::traits::{FittedTransformer, Transformer};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Clone, Debug)]
pub struct TargetEncoder {
    columns: Vec<Column>,
    smoothing: f64,
    min_samples_leaf: usize,
}

impl TargetEncoder {
    pub fn new(columns: Vec<Column>) -> Self {
        Self {
            columns,
            smoothing: 10.0,
            min_samples_leaf: 20,
        }
    }

    pub fn with_smoothing(mut self, smoothing: f64) -> Self {
        self.smoothing = smoothing;
        self
    }

    pub fn with_min_samples_leaf(mut self, min_samples_leaf: usize) -> Self {
        self.min_samples_leaf = min_samples_leaf;
        self
    }
}

impl Transformer for TargetEncoder {
    type Input = [Vec<String>];
    type Output = Array2<f64>;
    type Fitted = FittedTargetEncoder;

    fn fit(&self, data: &[Vec<String>], target: Option<&[f64]>) -> Result<FittedTargetEncoder> {
        let rows = check_fit_input("target encoder", &self.columns, data)?;
        let target = target.ok_or_else(|| {
            PipelineError::fit("target encoder", "target values are required for target encoding")
        })?;
        if target.len() != rows {
            return Err(PipelineError::fit(
                "target encoder",
                format!("{} target values for {} rows", target.len(), rows),
            ));
        }
        if target.iter().any(|y| !y.is_finite()) {
            return Err(PipelineError::fit("target encoder", "target contains non-finite values"));
        }

        let prior = target.iter().sum::<f64>() / rows as f64;
        let mut mappings = Vec::with_capacity(self.columns.len());
        for values in data {
            let mut stats: BTreeMap<&str, (f64, usize)> = BTreeMap::new();
            for (value, y) in values.iter().zip(target) {
                let entry = stats.entry(value.as_str()).or_insert((0.0, 0));
                entry.0 += y;
                entry.1 += 1;
            }
            let mapping = stats
                .into_iter()
                .map(|(category, (sum, count))| {
                    (category.to_string(), self.blend(prior, sum / count as f64, count))
                })
                .collect::<BTreeMap<String, f64>>();
            mappings.push(mapping);
        }

        Ok(FittedTargetEncoder {
            columns: self.columns.clone(),
            prior,
            mappings,
        })
    }
}

impl TargetEncoder {
    fn blend(&self, prior: f64, mean: f64, count: usize) -> f64 {
        if count <= 1 {
            return prior;
        }
        let shift = (count as f64 - self.min_samples_leaf as f64) / self.smoothing;
        let weight = 1.0 / (1.0 + (-shift).exp());
        prior * (1.0 - weight) + mean * weight
    }
}

/// Fitted TargetEncoder ready for inference.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FittedTargetEncoder {
    columns: Vec<Column>,
    prior: f64,
    mappings: Vec<BTreeMap<String, f64>>,
}

impl FittedTargetEncoder {
    /// Global mean of the training target; the fallback for unseen categories.
    pub fn prior(&self) -> f64 {
        self.prior
    }

    /// Encoded value for one category of the column at `col`; `None` if
    /// there is no such column.
    pub fn encode(&self, col: usize, value: &str) -> Option<f64> {
        self.mappings
            .get(col)
            .map(|m| m.get(value).copied().unwrap_or(self.prior))
    }
}

impl FittedTransformer for FittedTargetEncoder {
    type Input = [Vec<String>];
    type Output = Array2<f64>;

    fn transform(&self, data: &[Vec<String>]) -> Result<Array2<f64>> {
        let rows = check_transform_input("target encoder", &self.columns, data)?;
        let mut out = Array2::zeros((rows, self.columns.len()));
        for (col, values) in data.iter().enumerate() {
            for (row, value) in values.iter().enumerate() {
                out[[row, col]] = self.encode(col, value).unwrap_or(self.prior);
            }
        }
        Ok(out)
    }

    fn n_features_in(&self) -> usize {
        self.columns.len()
    }

    fn n_features_out(&self) -> usize {
        self.columns.len()
    }

    fn feature_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.to_string()).collect()
    }
}
