//! Linear dimensionality reduction of vectorized text.
//!
//! Both reducers project onto the leading right singular vectors of the
//! training matrix `X` (centred for PCA, raw for truncated SVD). Only the top
//! `n_components` directions are computed, with a seeded randomized range
//! finder that works on the sparse rows directly: the sketch `XΩ` is refined
//! by a few power iterations and the small projected matrix is decomposed
//! with nalgebra. PCA centring is applied implicitly, so `X` is never
//! densified. Each component is sign-normalised so its largest-magnitude
//! loading is positive.
//!
//! The output width is always `n_components`. When the training matrix has
//! lower rank, the missing components are zero columns.

use super::vectorizer::SparseRows;
use crate::config::{ReducerConfig, ReducerKind};
use crate::error::{PipelineError, Result};
use crate::preprocessing::traits::{FittedTransformer, Transformer};
use nalgebra::{DMatrix, DVector};
use ndarray::{Array1, Array2};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Relative squared-singular-value cutoff below which a direction counts as null.
const RANK_TOLERANCE: f64 = 1e-10;
/// Extra sketch columns beyond `n_components`.
const OVERSAMPLING: usize = 10;
const POWER_ITERATIONS: usize = 4;
const SKETCH_SEED: u64 = 0x5eed;

#[derive(Clone, Debug)]
pub struct Reducer {
    config: ReducerConfig,
    label: String,
}

impl Reducer {
    pub fn new(config: ReducerConfig, label: impl Into<String>) -> Self {
        Self {
            config,
            label: label.into(),
        }
    }

    fn component(&self) -> String {
        format!("text reducer[{}]", self.label)
    }
}

/// `X` with an optional implicit column shift `X - 1μᵀ`.
struct Operator<'a> {
    data: &'a SparseRows,
    mean: Option<&'a DVector<f64>>,
}

impl Operator<'_> {
    /// `(X - 1μᵀ) M` for a dense `d x l` matrix `M`.
    fn times(&self, m: &DMatrix<f64>) -> DMatrix<f64> {
        let l = m.ncols();
        let mut out = DMatrix::zeros(self.data.n_rows(), l);
        for i in 0..self.data.n_rows() {
            for &(j, v) in self.data.row(i) {
                for c in 0..l {
                    out[(i, c)] += v * m[(j, c)];
                }
            }
        }
        if let Some(mean) = self.mean {
            let shift = m.tr_mul(mean);
            for i in 0..out.nrows() {
                for c in 0..l {
                    out[(i, c)] -= shift[c];
                }
            }
        }
        out
    }

    /// `(X - 1μᵀ)ᵀ M` for a dense `n x l` matrix `M`.
    fn transpose_times(&self, m: &DMatrix<f64>) -> DMatrix<f64> {
        let l = m.ncols();
        let mut out = DMatrix::zeros(self.data.n_cols(), l);
        for i in 0..self.data.n_rows() {
            for &(j, v) in self.data.row(i) {
                for c in 0..l {
                    out[(j, c)] += v * m[(i, c)];
                }
            }
        }
        if let Some(mean) = self.mean {
            for c in 0..l {
                let total = m.column(c).sum();
                for j in 0..out.nrows() {
                    out[(j, c)] -= mean[j] * total;
                }
            }
        }
        out
    }
}

fn column_means(data: &SparseRows) -> DVector<f64> {
    let mut mean = DVector::zeros(data.n_cols());
    for i in 0..data.n_rows() {
        for &(j, v) in data.row(i) {
            mean[j] += v;
        }
    }
    mean / data.n_rows() as f64
}

fn orthonormal(m: DMatrix<f64>) -> DMatrix<f64> {
    m.qr().q()
}

/// Top right singular pairs `(σ², v)` of the operator, largest first.
fn top_right_singular(op: &Operator<'_>, width: usize) -> Vec<(f64, Vec<f64>)> {
    let (n, d) = (op.data.n_rows(), op.data.n_cols());
    let l = width.min(n).min(d);
    let mut rng = ChaCha8Rng::seed_from_u64(SKETCH_SEED);
    let omega = DMatrix::from_fn(d, l, |_, _| rng.gen_range(-1.0..1.0));

    let mut q = orthonormal(op.times(&omega));
    for _ in 0..POWER_ITERATIONS {
        let z = orthonormal(op.transpose_times(&q));
        q = orthonormal(op.times(&z));
    }

    // Bᵀ = XᵀQ; its left singular vectors are the right singular vectors of X.
    let bt = op.transpose_times(&q);
    let svd = bt.svd(true, false);
    let Some(u) = svd.u else {
        return Vec::new();
    };
    let mut pairs: Vec<(f64, Vec<f64>)> = svd
        .singular_values
        .iter()
        .enumerate()
        .map(|(k, &s)| (s * s, u.column(k).iter().copied().collect()))
        .collect();
    pairs.sort_by(|a, b| b.0.total_cmp(&a.0));
    pairs
}

fn normalise_sign(v: &mut [f64]) {
    let pivot = v
        .iter()
        .copied()
        .fold(0.0f64, |best, x| if x.abs() > best.abs() { x } else { best });
    if pivot < 0.0 {
        for x in v.iter_mut() {
            *x = -*x;
        }
    }
}

impl Transformer for Reducer {
    type Input = SparseRows;
    type Output = Array2<f64>;
    type Fitted = FittedReducer;

    fn fit(&self, data: &SparseRows, _target: Option<&[f64]>) -> Result<FittedReducer> {
        let (n, d) = (data.n_rows(), data.n_cols());
        if n == 0 || d == 0 {
            return Err(PipelineError::fit(
                self.component(),
                format!("cannot reduce a {}x{} matrix", n, d),
            ));
        }

        let mean = match self.config.kind {
            ReducerKind::Pca => Some(column_means(data)),
            ReducerKind::TruncatedSvd => None,
        };
        let op = Operator {
            data,
            mean: mean.as_ref(),
        };
        let pairs = top_right_singular(&op, self.config.n_components + OVERSAMPLING);

        let largest = pairs.first().map(|p| p.0).unwrap_or(0.0).max(0.0);
        let cutoff = largest * RANK_TOLERANCE;
        let rank = pairs.iter().filter(|(value, _)| *value > cutoff && *value > 0.0).count();
        let kept = rank.min(self.config.n_components);
        if kept < self.config.n_components {
            warn!(
                reducer = %self.label,
                requested = self.config.n_components,
                rank,
                "training matrix rank is below n_components; padding with zero components"
            );
        }

        let mut components = Array2::zeros((self.config.n_components, d));
        let mut explained_variance = vec![0.0; self.config.n_components];
        let denom = (n.max(2) - 1) as f64;
        for (k, (value, mut vector)) in pairs.into_iter().take(kept).enumerate() {
            normalise_sign(&mut vector);
            for (j, x) in vector.into_iter().enumerate() {
                components[[k, j]] = x;
            }
            explained_variance[k] = value / denom;
        }

        debug!(
            reducer = %self.label,
            kind = %self.config.kind,
            rank,
            n_components = self.config.n_components,
            "fitted text reducer"
        );

        Ok(FittedReducer {
            kind: self.config.kind,
            label: self.label.clone(),
            mean: mean.map(|m| Array1::from_iter(m.iter().copied())),
            components,
            explained_variance,
        })
    }
}

/// Fitted projection.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FittedReducer {
    kind: ReducerKind,
    label: String,
    mean: Option<Array1<f64>>,
    /// One component per row, `n_components x n_features`.
    components: Array2<f64>,
    explained_variance: Vec<f64>,
}

impl FittedReducer {
    pub fn components(&self) -> &Array2<f64> {
        &self.components
    }

    /// Variance captured by each component; zero for padding components.
    pub fn explained_variance(&self) -> &[f64] {
        &self.explained_variance
    }
}

impl FittedTransformer for FittedReducer {
    type Input = SparseRows;
    type Output = Array2<f64>;

    fn transform(&self, data: &SparseRows) -> Result<Array2<f64>> {
        if data.n_cols() != self.components.ncols() {
            return Err(PipelineError::TransformMismatch(format!(
                "reducer '{}' expects {} input columns, got {}",
                self.label,
                self.components.ncols(),
                data.n_cols()
            )));
        }
        let k = self.components.nrows();
        let shift = match &self.mean {
            Some(mean) => self.components.dot(mean),
            None => Array1::zeros(k),
        };
        let mut out = Array2::zeros((data.n_rows(), k));
        for i in 0..data.n_rows() {
            for c in 0..k {
                let dot: f64 = data.row(i).iter().map(|&(j, v)| v * self.components[[c, j]]).sum();
                out[[i, c]] = dot - shift[c];
            }
        }
        Ok(out)
    }

    fn n_features_in(&self) -> usize {
        self.components.ncols()
    }

    fn n_features_out(&self) -> usize {
        self.components.nrows()
    }

    fn feature_names(&self) -> Vec<String> {
        let prefix = match self.kind {
            ReducerKind::Pca => "pca",
            ReducerKind::TruncatedSvd => "svd",
        };
        (0..self.components.nrows())
            .map(|k| format!("{}_{}_{}", self.label, prefix, k))
            .collect()
    }
}
