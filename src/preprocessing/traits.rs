//! Core traits for preprocessing transformers.
//!
//! This module defines the two central traits:
//! - [`Transformer`]: Used during fitting; holds hyperparameters and learns from data.
//! - [`FittedTransformer`]: After fitting; read-only, ready for inference and serialization.

use crate::error::Result;
use crate::serialization::SerializableParams;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;

/// Trait for unfitted transformers with hyperparameters.
///
/// `fit` receives the training target as well; supervised encoders (target
/// encoding) require it, every other transformer ignores it.
///
/// # Example
/// ```rust
/// use ndarray::array;
/// use resale_pricer::preprocessing::{FittedTransformer, StandardScaler, Transformer};
///
/// let data = array![[1.0, 10.0], [3.0, 30.0]];
/// let fitted = StandardScaler::new().fit(&data, None).unwrap();
/// let scaled = fitted.transform(&data).unwrap();
/// assert!((scaled[[0, 0]] + 1.0).abs() < 1e-12);
/// ```
pub trait Transformer: Clone {
    /// Input data type for fitting and transformation.
    type Input: ?Sized;
    /// Output data type after transformation.
    type Output;
    /// The fitted transformer type ready for inference.
    type Fitted: FittedTransformer<Input = Self::Input, Output = Self::Output>;

    /// Learn parameters from the training data.
    ///
    /// # Errors
    /// [`crate::PipelineError::Fit`] if the data is empty or degenerate for
    /// this transformer, or if a required target is missing.
    fn fit(&self, data: &Self::Input, target: Option<&[f64]>) -> Result<Self::Fitted>;

    /// Fit the transformer and transform the same data in one step.
    fn fit_transform(&self, data: &Self::Input, target: Option<&[f64]>) -> Result<Self::Output> {
        let fitted = self.fit(data, target)?;
        fitted.transform(data)
    }
}

/// Trait for fitted transformers ready for inference.
///
/// Fitted transformers are plain data: `transform` never mutates learned
/// parameters, and the whole value round-trips through bincode.
pub trait FittedTransformer: Clone + Serialize + DeserializeOwned {
    /// Input data type for transformation.
    type Input: ?Sized;
    /// Output data type after transformation.
    type Output;

    /// Transform data using learned parameters.
    ///
    /// # Errors
    /// [`crate::PipelineError::TransformMismatch`] if the input does not
    /// have the shape seen at fit time.
    fn transform(&self, data: &Self::Input) -> Result<Self::Output>;

    /// Number of input columns seen during fit.
    fn n_features_in(&self) -> usize;

    /// Number of output columns produced by `transform`.
    fn n_features_out(&self) -> usize;

    /// Output column names, in output order.
    fn feature_names(&self) -> Vec<String>;

    /// Save the fitted transformer to a file.
    fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let bytes = self.to_bytes()?;
        std::fs::write(path, bytes)?;
        Ok(())
    }

    /// Load a fitted transformer from a file.
    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self>
    where
        Self: Sized,
    {
        let bytes = std::fs::read(path)?;
        Ok(Self::from_bytes(&bytes)?)
    }
}
