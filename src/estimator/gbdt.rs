//! Gradient-boosted regression trees with squared loss.
//!
//! Each round fits a depth-limited tree to the residuals `y - F(x)` of the
//! current ensemble, optionally on a seeded row subsample, and adds it with
//! the configured learning rate. Leaf values are `Σr / (n + λ)`, and a split
//! is scored by the reduction of `-(Σr)² / (n + λ)`.
//!
//! Columns declared categorical hold non-negative integer codes. They are
//! split on category subsets: categories are ordered by mean residual and
//! the best prefix of that order goes left. Any code not in the left subset,
//! including codes never seen at fit time, goes right.

use super::{check_training_data, FittedRegressor, Regressor};
use crate::config::BoostingParams;
use crate::error::{PipelineError, Result};
use ndarray::{Array1, Array2, ArrayView1};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

const COMPONENT: &str = "estimator[gboost]";
const MIN_GAIN: f64 = 1e-12;

/// Tree node; children are indices into the tree's node arena.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Node {
    Leaf {
        value: f64,
    },
    Numeric {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Categorical {
        feature: usize,
        /// Sorted codes routed left.
        left_categories: Vec<u32>,
        left: usize,
        right: usize,
    },
}

fn goes_left_categorical(value: f64, left_categories: &[u32]) -> bool {
    value >= 0.0
        && value.fract() == 0.0
        && value <= u32::MAX as f64
        && left_categories.binary_search(&(value as u32)).is_ok()
}

/// One regression tree, root at index 0.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn n_leaves(&self) -> usize {
        self.nodes.iter().filter(|n| matches!(n, Node::Leaf { .. })).count()
    }

    pub fn predict_row(&self, row: ArrayView1<f64>) -> f64 {
        let mut index = 0;
        loop {
            match &self.nodes[index] {
                Node::Leaf { value } => return *value,
                Node::Numeric {
                    feature,
                    threshold,
                    left,
                    right,
                } => index = if row[*feature] <= *threshold { *left } else { *right },
                Node::Categorical {
                    feature,
                    left_categories,
                    left,
                    right,
                } => {
                    index = if goes_left_categorical(row[*feature], left_categories) {
                        *left
                    } else {
                        *right
                    }
                }
            }
        }
    }
}

enum SplitRule {
    Numeric { threshold: f64 },
    Categorical { left_categories: Vec<u32> },
}

struct Split {
    feature: usize,
    gain: f64,
    rule: SplitRule,
}

struct TreeBuilder<'a> {
    x: &'a Array2<f64>,
    residuals: &'a [f64],
    is_categorical: &'a [bool],
    params: &'a BoostingParams,
    nodes: Vec<Node>,
}

impl<'a> TreeBuilder<'a> {
    fn score(&self, sum: f64, count: usize) -> f64 {
        sum * sum / (count as f64 + self.params.l2_regularization)
    }

    fn build(mut self, rows: Vec<usize>) -> Tree {
        self.grow(rows, 0);
        Tree { nodes: self.nodes }
    }

    fn grow(&mut self, rows: Vec<usize>, depth: usize) -> usize {
        let sum: f64 = rows.iter().map(|&r| self.residuals[r]).sum();
        let count = rows.len();
        let index = self.nodes.len();
        self.nodes.push(Node::Leaf {
            value: sum / (count as f64 + self.params.l2_regularization),
        });

        if depth >= self.params.max_depth || count < 2 * self.params.min_samples_leaf {
            return index;
        }
        let Some(split) = self.best_split(&rows, sum) else {
            return index;
        };

        let (left_rows, right_rows): (Vec<usize>, Vec<usize>) =
            rows.into_iter().partition(|&r| {
                let value = self.x[[r, split.feature]];
                match &split.rule {
                    SplitRule::Numeric { threshold } => value <= *threshold,
                    SplitRule::Categorical { left_categories } => {
                        goes_left_categorical(value, left_categories)
                    }
                }
            });
        let left = self.grow(left_rows, depth + 1);
        let right = self.grow(right_rows, depth + 1);
        self.nodes[index] = match split.rule {
            SplitRule::Numeric { threshold } => Node::Numeric {
                feature: split.feature,
                threshold,
                left,
                right,
            },
            SplitRule::Categorical { left_categories } => Node::Categorical {
                feature: split.feature,
                left_categories,
                left,
                right,
            },
        };
        index
    }

    fn best_split(&self, rows: &[usize], sum: f64) -> Option<Split> {
        let parent = self.score(sum, rows.len());
        let mut best: Option<Split> = None;
        for feature in 0..self.x.ncols() {
            let candidate = if self.is_categorical[feature] {
                self.categorical_split(feature, rows, sum, parent)
            } else {
                self.numeric_split(feature, rows, sum, parent)
            };
            if let Some(c) = candidate {
                if c.gain > MIN_GAIN && best.as_ref().map_or(true, |b| c.gain > b.gain) {
                    best = Some(c);
                }
            }
        }
        best
    }

    fn numeric_split(&self, feature: usize, rows: &[usize], sum: f64, parent: f64) -> Option<Split> {
        let min_leaf = self.params.min_samples_leaf;
        let mut order = rows.to_vec();
        order.sort_by(|&a, &b| self.x[[a, feature]].total_cmp(&self.x[[b, feature]]));

        let n = order.len();
        let mut left_sum = 0.0;
        let mut best: Option<(f64, f64)> = None;
        for k in 0..n - 1 {
            left_sum += self.residuals[order[k]];
            let left_count = k + 1;
            let value = self.x[[order[k], feature]];
            let next = self.x[[order[k + 1], feature]];
            if value == next || left_count < min_leaf || n - left_count < min_leaf {
                continue;
            }
            let gain = self.score(left_sum, left_count) + self.score(sum - left_sum, n - left_count)
                - parent;
            if best.map_or(true, |(g, _)| gain > g) {
                let mid = value + (next - value) / 2.0;
                let threshold = if mid < next { mid } else { value };
                best = Some((gain, threshold));
            }
        }
        best.map(|(gain, threshold)| Split {
            feature,
            gain,
            rule: SplitRule::Numeric { threshold },
        })
    }

    fn categorical_split(
        &self,
        feature: usize,
        rows: &[usize],
        sum: f64,
        parent: f64,
    ) -> Option<Split> {
        let min_leaf = self.params.min_samples_leaf;
        let mut groups: BTreeMap<u32, (f64, usize)> = BTreeMap::new();
        for &r in rows {
            let entry = groups.entry(self.x[[r, feature]] as u32).or_insert((0.0, 0));
            entry.0 += self.residuals[r];
            entry.1 += 1;
        }
        if groups.len() < 2 {
            return None;
        }
        let mut ordered: Vec<(u32, f64, usize)> =
            groups.into_iter().map(|(code, (s, c))| (code, s, c)).collect();
        ordered.sort_by(|a, b| {
            (a.1 / a.2 as f64)
                .total_cmp(&(b.1 / b.2 as f64))
                .then(a.0.cmp(&b.0))
        });

        let n = rows.len();
        let mut left_sum = 0.0;
        let mut left_count = 0;
        let mut best: Option<(f64, usize)> = None;
        for k in 0..ordered.len() - 1 {
            left_sum += ordered[k].1;
            left_count += ordered[k].2;
            if left_count < min_leaf || n - left_count < min_leaf {
                continue;
            }
            let gain = self.score(left_sum, left_count) + self.score(sum - left_sum, n - left_count)
                - parent;
            if best.map_or(true, |(g, _)| gain > g) {
                best = Some((gain, k + 1));
            }
        }
        best.map(|(gain, prefix)| {
            let mut left_categories: Vec<u32> = ordered[..prefix].iter().map(|c| c.0).collect();
            left_categories.sort_unstable();
            Split {
                feature,
                gain,
                rule: SplitRule::Categorical { left_categories },
            }
        })
    }
}

#[derive(Clone, Debug)]
pub struct GradientBoostingRegressor {
    params: BoostingParams,
    seed: u64,
}

impl GradientBoostingRegressor {
    pub fn new(params: BoostingParams, seed: u64) -> Self {
        Self { params, seed }
    }
}

impl Regressor for GradientBoostingRegressor {
    type Fitted = FittedGradientBoosting;

    fn fit(
        &self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        categorical: &[usize],
    ) -> Result<FittedGradientBoosting> {
        check_training_data(COMPONENT, x, y)?;
        let (n, p) = x.dim();

        let mut is_categorical = vec![false; p];
        for &c in categorical {
            if c >= p {
                return Err(PipelineError::fit(
                    COMPONENT,
                    format!("categorical column {} is out of range for {} features", c, p),
                ));
            }
            if x.column(c).iter().any(|v| *v < 0.0 || v.fract() != 0.0 || *v > u32::MAX as f64) {
                return Err(PipelineError::fit(
                    COMPONENT,
                    format!("categorical column {} must hold non-negative integer codes", c),
                ));
            }
            is_categorical[c] = true;
        }

        let init = y.mean().unwrap_or(0.0);
        let mut predictions = vec![init; n];
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let sample_size = ((n as f64 * self.params.subsample).round() as usize).clamp(1, n);
        let mut trees = Vec::with_capacity(self.params.n_estimators);

        for _ in 0..self.params.n_estimators {
            let residuals: Vec<f64> = y.iter().zip(&predictions).map(|(t, p)| t - p).collect();
            let rows: Vec<usize> = if sample_size < n {
                let mut all: Vec<usize> = (0..n).collect();
                all.shuffle(&mut rng);
                all.truncate(sample_size);
                all.sort_unstable();
                all
            } else {
                (0..n).collect()
            };

            let tree = TreeBuilder {
                x,
                residuals: &residuals,
                is_categorical: &is_categorical,
                params: &self.params,
                nodes: Vec::new(),
            }
            .build(rows);
            for (i, prediction) in predictions.iter_mut().enumerate() {
                *prediction += self.params.learning_rate * tree.predict_row(x.row(i));
            }
            trees.push(tree);
        }

        debug!(
            rows = n,
            features = p,
            categorical = categorical.len(),
            trees = trees.len(),
            "fitted gradient boosting"
        );

        Ok(FittedGradientBoosting {
            init,
            learning_rate: self.params.learning_rate,
            trees,
            n_features: p,
            categorical: categorical.to_vec(),
        })
    }
}

/// Fitted tree ensemble.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FittedGradientBoosting {
    init: f64,
    learning_rate: f64,
    trees: Vec<Tree>,
    n_features: usize,
    categorical: Vec<usize>,
}

impl FittedGradientBoosting {
    pub fn trees(&self) -> &[Tree] {
        &self.trees
    }

    /// Starting prediction: the training target mean.
    pub fn init(&self) -> f64 {
        self.init
    }

    pub fn categorical(&self) -> &[usize] {
        &self.categorical
    }
}

impl FittedRegressor for FittedGradientBoosting {
    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        self.check_width(x)?;
        Ok(x
            .rows()
            .into_iter()
            .map(|row| {
                self.init
                    + self.learning_rate
                        * self.trees.iter().map(|t| t.predict_row(row)).sum::<f64>()
            })
            .collect())
    }

    fn n_features(&self) -> usize {
        self.n_features
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serialization::SerializableParams;
    use ndarray::array;

    fn params(n_estimators: usize, learning_rate: f64, max_depth: usize) -> BoostingParams {
        BoostingParams {
            n_estimators,
            learning_rate,
            max_depth,
            ..BoostingParams::default()
        }
    }

    #[test]
    fn test_fits_step_function() {
        let x = Array2::from_shape_fn((20, 1), |(i, _)| i as f64);
        let y = x.column(0).mapv(|v| if v < 10.0 { 0.0 } else { 5.0 });
        let fitted = GradientBoostingRegressor::new(BoostingParams::default(), 0)
            .fit(&x, &y, &[])
            .unwrap();
        let pred = fitted.predict(&x).unwrap();
        for (p, t) in pred.iter().zip(y.iter()) {
            assert!((p - t).abs() < 1e-2, "{p} vs {t}");
        }
        match &fitted.trees()[0].nodes()[0] {
            Node::Numeric { threshold, .. } => assert_eq!(*threshold, 9.5),
            other => panic!("unexpected root {other:?}"),
        }
    }

    #[test]
    fn test_categorical_subset_split() {
        // codes 0 and 2 are cheap, 1 and 3 expensive
        let codes = [0.0, 1.0, 2.0, 3.0, 0.0, 1.0, 2.0, 3.0];
        let x = Array2::from_shape_fn((8, 1), |(i, _)| codes[i]);
        let y = x.column(0).mapv(|c| if c as u32 % 2 == 0 { 1.0 } else { 5.0 });
        let fitted = GradientBoostingRegressor::new(params(30, 0.5, 1), 0)
            .fit(&x, &y, &[0])
            .unwrap();
        match &fitted.trees()[0].nodes()[0] {
            Node::Categorical {
                left_categories, ..
            } => assert_eq!(left_categories, &vec![0, 2]),
            other => panic!("unexpected root {other:?}"),
        }
        let pred = fitted.predict(&array![[2.0], [3.0]]).unwrap();
        assert!((pred[0] - 1.0).abs() < 1e-3);
        assert!((pred[1] - 5.0).abs() < 1e-3);
    }

    #[test]
    fn test_unseen_category_goes_right() {
        let codes = [0.0, 1.0, 0.0, 1.0];
        let x = Array2::from_shape_fn((4, 1), |(i, _)| codes[i]);
        let y = array![1.0, 5.0, 1.0, 5.0];
        let fitted = GradientBoostingRegressor::new(params(10, 0.5, 1), 0)
            .fit(&x, &y, &[0])
            .unwrap();
        let pred = fitted.predict(&array![[1.0], [2.0], [7.0]]).unwrap();
        assert_eq!(pred[1], pred[0]);
        assert_eq!(pred[2], pred[0]);
        assert!(pred.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_rejects_non_integer_categorical_codes() {
        let x = array![[0.5], [1.0]];
        let y = array![1.0, 2.0];
        let result = GradientBoostingRegressor::new(BoostingParams::default(), 0).fit(&x, &y, &[0]);
        assert!(matches!(result, Err(PipelineError::Fit { .. })));
        let result = GradientBoostingRegressor::new(BoostingParams::default(), 0).fit(&x, &y, &[3]);
        assert!(result.is_err());
    }

    #[test]
    fn test_min_samples_leaf_limits_splits() {
        let x = Array2::from_shape_fn((4, 1), |(i, _)| i as f64);
        let y = array![0.0, 0.0, 0.0, 10.0];
        let p = BoostingParams {
            n_estimators: 1,
            max_depth: 5,
            min_samples_leaf: 2,
            ..BoostingParams::default()
        };
        let fitted = GradientBoostingRegressor::new(p, 0).fit(&x, &y, &[]).unwrap();
        assert_eq!(fitted.trees()[0].n_leaves(), 2);
    }

    #[test]
    fn test_subsample_is_seeded() {
        let x = Array2::from_shape_fn((30, 2), |(i, j)| ((i * 7 + j * 3) % 11) as f64);
        let y = x.column(0).mapv(|v| v * 0.5) + x.column(1);
        let p = BoostingParams {
            subsample: 0.5,
            ..BoostingParams::default()
        };
        let a = GradientBoostingRegressor::new(p.clone(), 7).fit(&x, &y, &[]).unwrap();
        let b = GradientBoostingRegressor::new(p.clone(), 7).fit(&x, &y, &[]).unwrap();
        let c = GradientBoostingRegressor::new(p, 8).fit(&x, &y, &[]).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_fitted_round_trip() {
        let x = array![[0.0, 1.0], [1.0, 0.0], [2.0, 1.0], [3.0, 0.0]];
        let y = array![1.0, 2.0, 3.0, 4.0];
        let fitted = GradientBoostingRegressor::new(params(5, 0.3, 2), 0)
            .fit(&x, &y, &[1])
            .unwrap();
        let bytes = fitted.to_bytes().unwrap();
        let restored = FittedGradientBoosting::from_bytes(&bytes).unwrap();
        assert_eq!(restored.predict(&x).unwrap(), fitted.predict(&x).unwrap());
    }
}
