//! Model orchestrator.
//!
//! A [`Model`] composes the tabular transformer, the text feature extractor,
//! the feature union and the estimator into one unit with the lifecycle
//! `unfit → fit → {predict, evaluate, save}`. `load` restores a fitted model
//! directly.
//!
//! The model owns the target transform: prices are mapped with
//! [`TargetTransform::forward`] before the estimator sees them and
//! predictions are mapped back (and clamped at zero) before they are
//! returned. Callers always work with original-scale prices.
//!
//! # Example
//!
//! ```rust
//! use resale_pricer::data::synthetic;
//! use resale_pricer::{Model, PipelineConfig};
//!
//! let data = synthetic::generate(60, 3);
//! let mut model = Model::new(PipelineConfig::new("doc-model")).unwrap();
//! model.fit(&data.listings, &data.prices).unwrap();
//!
//! let bytes = model.to_bytes().unwrap();
//! let restored = Model::from_bytes(&bytes).unwrap();
//! assert_eq!(
//!     restored.predict(&data.listings).unwrap(),
//!     model.predict(&data.listings).unwrap()
//! );
//! ```

use crate::config::{EstimatorFamily, PipelineConfig, TargetTransform};
use crate::data::Listing;
use crate::error::{PipelineError, Result};
use crate::estimator::{Estimator, FittedEstimator, FittedRegressor};
use crate::metrics::Metrics;
use crate::preprocessing::tabular::{FittedTabularTransformer, TabularTransformer};
use crate::preprocessing::traits::{FittedTransformer, Transformer};
use crate::serialization::{ArtifactHeader, SerializableParams};
use crate::text::{FittedTextFeatureExtractor, TextFeatureExtractor};
use crate::union::{FeatureBlock, FeatureLayout, FeatureUnion};
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Error metrics of one evaluation, on original-scale prices.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub rmsle: f64,
    pub wape: f64,
    pub n_rows: usize,
}

/// Everything learned by one `fit` call, plus the configuration that produced it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FittedPipeline {
    config: PipelineConfig,
    tabular: Option<FittedTabularTransformer>,
    text: Option<FittedTextFeatureExtractor>,
    layout: FeatureLayout,
    estimator: FittedEstimator,
}

impl FittedPipeline {
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn tabular(&self) -> Option<&FittedTabularTransformer> {
        self.tabular.as_ref()
    }

    pub fn text(&self) -> Option<&FittedTextFeatureExtractor> {
        self.text.as_ref()
    }

    pub fn layout(&self) -> &FeatureLayout {
        &self.layout
    }

    pub fn estimator(&self) -> &FittedEstimator {
        &self.estimator
    }

    /// Replay the fitted transform chain on a batch.
    pub fn features(&self, rows: &[Listing]) -> Result<FeatureBlock> {
        let tabular = self.tabular.as_ref().map(|t| t.transform(rows)).transpose()?;
        let text = self.text.as_ref().map(|t| t.transform(rows)).transpose()?;
        self.layout.transform(tabular, text)
    }

    fn predict(&self, rows: &[Listing]) -> Result<Vec<f64>> {
        let features = self.features(rows)?;
        let raw = self.estimator.predict(&features.values)?;
        let transform = self.config.target_transform();
        Ok(raw.iter().map(|v| transform.inverse(*v).max(0.0)).collect())
    }
}

/// On-disk form of a fitted model.
#[derive(Serialize, Deserialize)]
struct Artifact {
    header: ArtifactHeader,
    state: FittedPipeline,
}

/// Byte storage for model artifacts.
pub trait ArtifactStore {
    fn put(&self, key: &str, bytes: &[u8]) -> Result<()>;
    fn get(&self, key: &str) -> Result<Vec<u8>>;
}

/// [`ArtifactStore`] backed by a local directory.
#[derive(Clone, Debug)]
pub struct LocalStore {
    root: PathBuf,
}

impl LocalStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn path(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }
}

impl ArtifactStore for LocalStore {
    fn put(&self, key: &str, bytes: &[u8]) -> Result<()> {
        std::fs::create_dir_all(&self.root)?;
        std::fs::write(self.path(key), bytes)?;
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Vec<u8>> {
        Ok(std::fs::read(self.path(key))?)
    }
}

/// Failures while fitting surface as `Fit`; configuration errors pass through.
fn fit_failure(component: &str, err: PipelineError) -> PipelineError {
    match err {
        PipelineError::Fit { .. } | PipelineError::Configuration(_) => err,
        other => PipelineError::fit(component, other.to_string()),
    }
}

/// Resale price model.
#[derive(Clone, Debug)]
pub struct Model {
    config: PipelineConfig,
    family: EstimatorFamily,
    state: Option<FittedPipeline>,
}

impl Model {
    /// Create an unfitted model.
    ///
    /// # Errors
    /// [`PipelineError::Configuration`] if the configuration is invalid.
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        let family = config.family();
        Ok(Self {
            config,
            family,
            state: None,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn family(&self) -> EstimatorFamily {
        self.family
    }

    pub fn is_fitted(&self) -> bool {
        self.state.is_some()
    }

    pub fn fitted_state(&self) -> Option<&FittedPipeline> {
        self.state.as_ref()
    }

    fn state(&self, operation: &str) -> Result<&FittedPipeline> {
        self.state
            .as_ref()
            .ok_or_else(|| PipelineError::NotFitted(operation.to_string()))
    }

    /// Fit every enabled branch and the estimator on `rows` and their prices.
    ///
    /// Any previous fitted state is replaced only if the whole fit succeeds.
    ///
    /// # Errors
    /// - [`PipelineError::Configuration`] before any data is touched.
    /// - [`PipelineError::InvalidData`] for mismatched lengths or invalid prices.
    /// - [`PipelineError::Fit`] when a sub-component cannot be fit.
    pub fn fit(&mut self, rows: &[Listing], prices: &[f64]) -> Result<()> {
        self.config.validate()?;
        if rows.len() != prices.len() {
            return Err(PipelineError::InvalidData(format!(
                "{} listings but {} prices",
                rows.len(),
                prices.len()
            )));
        }
        if let Some(bad) = prices.iter().find(|p| !(p.is_finite() && **p >= 0.0)) {
            return Err(PipelineError::InvalidData(format!(
                "prices must be finite and non-negative (got {})",
                bad
            )));
        }

        info!(
            model = %self.config.model_name(),
            rows = rows.len(),
            estimator = %self.config.estimator().kind,
            tabular = self.config.use_tabular(),
            text = self.config.use_text(),
            "fitting model"
        );

        let transform = self.config.target_transform();
        let y: Vec<f64> = prices.iter().map(|p| transform.forward(*p)).collect();

        let mut tabular_block = None;
        let tabular = if self.config.use_tabular() {
            let fitted = TabularTransformer::new(self.config.tabular(), self.family)
                .fit(rows, Some(y.as_slice()))?;
            tabular_block = Some(fitted.transform(rows).map_err(|e| fit_failure("tabular", e))?);
            Some(fitted)
        } else {
            None
        };

        let mut text_block = None;
        let text = if self.config.use_text() {
            let fitted = TextFeatureExtractor::new(self.config.text()).fit(rows, None)?;
            text_block = Some(fitted.transform(rows).map_err(|e| fit_failure("text", e))?);
            Some(fitted)
        } else {
            None
        };

        let (layout, features) =
            FeatureUnion::fit(tabular_block, text_block).map_err(|e| fit_failure("feature union", e))?;
        debug!(
            width = layout.width(),
            categorical = layout.categorical().len(),
            "joined feature blocks"
        );

        let estimator = Estimator::from_config(self.config.estimator(), self.config.seed()).fit(
            &features.values,
            &Array1::from(y),
            layout.categorical(),
        )?;

        self.state = Some(FittedPipeline {
            config: self.config.clone(),
            tabular,
            text,
            layout,
            estimator,
        });
        info!(
            model = %self.config.model_name(),
            features = features.width(),
            "model fitted"
        );
        Ok(())
    }

    /// Predict prices for `rows`, in input order.
    ///
    /// # Errors
    /// [`PipelineError::NotFitted`] before `fit`/`load`,
    /// [`PipelineError::TransformMismatch`] if a row lacks a field the
    /// fitted pipeline reads.
    pub fn predict(&self, rows: &[Listing]) -> Result<Vec<f64>> {
        self.state("predict")?.predict(rows)
    }

    /// RMSLE and WAPE of predictions against original-scale `prices`.
    pub fn evaluate(&self, rows: &[Listing], prices: &[f64]) -> Result<Evaluation> {
        let state = self.state("evaluate")?;
        if rows.len() != prices.len() {
            return Err(PipelineError::InvalidData(format!(
                "{} listings but {} prices",
                rows.len(),
                prices.len()
            )));
        }
        let predictions = state.predict(rows)?;
        let evaluation = Evaluation {
            rmsle: Metrics::rmsle(prices, &predictions)?,
            wape: Metrics::wape(prices, &predictions)?,
            n_rows: rows.len(),
        };
        debug!(
            rows = evaluation.n_rows,
            rmsle = evaluation.rmsle,
            wape = evaluation.wape,
            "evaluated model"
        );
        Ok(evaluation)
    }

    /// Column names of the fitted feature matrix.
    pub fn feature_names(&self) -> Result<&[String]> {
        Ok(self.state("feature_names")?.layout.names())
    }

    /// Artifact file name derived from the model name.
    pub fn artifact_name(&self) -> String {
        format!("{}.bin", self.config.model_name())
    }

    /// Serialize the fitted state with its artifact header.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let artifact = Artifact {
            header: ArtifactHeader::current(),
            state: self.state("save")?.clone(),
        };
        Ok(artifact.to_bytes()?)
    }

    /// Restore a fitted model from artifact bytes.
    ///
    /// # Errors
    /// [`PipelineError::Serialization`] if the bytes are not a compatible artifact.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let header: ArtifactHeader = bincode::deserialize(bytes)?;
        header.check_compatible()?;
        let artifact = Artifact::from_bytes(bytes)?;
        let config = artifact.state.config.clone();
        Ok(Self {
            family: config.family(),
            config,
            state: Some(artifact.state),
        })
    }

    /// Write `{dir}/{model_name}.bin` and return its path.
    pub fn save<P: AsRef<Path>>(&self, dir: P) -> Result<PathBuf> {
        let store = LocalStore::new(dir.as_ref());
        let key = self.save_to(&store)?;
        Ok(store.path(&key))
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let model = Self::from_bytes(&std::fs::read(path)?)?;
        info!(path = %path.display(), model = %model.config.model_name(), "loaded model");
        Ok(model)
    }

    /// Store the artifact under [`Model::artifact_name`] and return the key.
    pub fn save_to(&self, store: &dyn ArtifactStore) -> Result<String> {
        let bytes = self.to_bytes()?;
        let key = self.artifact_name();
        store.put(&key, &bytes)?;
        info!(key = %key, bytes = bytes.len(), "saved model artifact");
        Ok(key)
    }

    pub fn load_from(store: &dyn ArtifactStore, key: &str) -> Result<Self> {
        Self::from_bytes(&store.get(key)?)
    }

    /// Target transform applied during fit.
    pub fn target_transform(&self) -> TargetTransform {
        self.config.target_transform()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BoostingParams, EstimatorConfig, ReducerConfig, ReducerKind, TextConfig};
    use crate::data::synthetic;
    use std::cell::RefCell;
    use std::collections::HashMap;

    #[derive(Default)]
    struct MemoryStore {
        blobs: RefCell<HashMap<String, Vec<u8>>>,
    }

    impl ArtifactStore for MemoryStore {
        fn put(&self, key: &str, bytes: &[u8]) -> Result<()> {
            self.blobs.borrow_mut().insert(key.to_string(), bytes.to_vec());
            Ok(())
        }

        fn get(&self, key: &str) -> Result<Vec<u8>> {
            self.blobs
                .borrow()
                .get(key)
                .cloned()
                .ok_or_else(|| PipelineError::Io(format!("no artifact '{}'", key)))
        }
    }

    fn text_config() -> PipelineConfig {
        PipelineConfig::new("text-model")
            .with_text(true)
            .with_text_config(
                TextConfig::default().with_reducer(Some(ReducerConfig::new(ReducerKind::Pca, 8))),
            )
    }

    #[test]
    fn test_unfitted_operations_fail() {
        let model = Model::new(PipelineConfig::default()).unwrap();
        let data = synthetic::generate(3, 0);
        assert!(matches!(model.predict(&data.listings), Err(PipelineError::NotFitted(_))));
        assert!(matches!(
            model.evaluate(&data.listings, &data.prices),
            Err(PipelineError::NotFitted(_))
        ));
        assert!(matches!(model.to_bytes(), Err(PipelineError::NotFitted(_))));
        assert!(model.feature_names().is_err());
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let config = PipelineConfig::default().with_tabular(false);
        assert!(matches!(Model::new(config), Err(PipelineError::Configuration(_))));
    }

    #[test]
    fn test_fit_predict_text_and_tabular() {
        let data = synthetic::generate(80, 2);
        let mut model = Model::new(text_config()).unwrap();
        model.fit(&data.listings, &data.prices).unwrap();
        let predictions = model.predict(&data.listings).unwrap();
        assert_eq!(predictions.len(), 80);
        assert!(predictions.iter().all(|p| p.is_finite() && *p >= 0.0));

        let names = model.feature_names().unwrap();
        assert_eq!(names[0], "n_photos");
        assert!(names.contains(&"text_pca_0".to_string()));
        assert!(names.contains(&"is_hashtags_missing".to_string()));
    }

    #[test]
    fn test_tree_family_declares_categorical_columns() {
        let data = synthetic::generate(60, 5);
        let config = PipelineConfig::new("gboost")
            .with_estimator(EstimatorConfig::gradient_boosting(BoostingParams::default()));
        let mut model = Model::new(config).unwrap();
        model.fit(&data.listings, &data.prices).unwrap();

        let state = model.fitted_state().unwrap();
        assert_eq!(state.layout().categorical().len(), 4);
        match state.estimator() {
            FittedEstimator::GradientBoosting(e) => {
                assert_eq!(e.categorical(), state.layout().categorical())
            }
            other => panic!("unexpected estimator {:?}", other.kind()),
        }
        assert_eq!(state.estimator().n_features(), state.layout().width());
    }

    #[test]
    fn test_failed_fit_keeps_previous_state() {
        let data = synthetic::generate(40, 1);
        let mut model = Model::new(PipelineConfig::default()).unwrap();
        model.fit(&data.listings, &data.prices).unwrap();
        let before = model.predict(&data.listings).unwrap();

        assert!(model.fit(&[], &[]).is_err());
        assert!(model.is_fitted());
        assert_eq!(model.predict(&data.listings).unwrap(), before);
    }

    #[test]
    fn test_fit_rejects_bad_prices() {
        let data = synthetic::generate(5, 1);
        let mut model = Model::new(PipelineConfig::default()).unwrap();
        let mut prices = data.prices.clone();
        prices[0] = f64::NAN;
        assert!(matches!(
            model.fit(&data.listings, &prices),
            Err(PipelineError::InvalidData(_))
        ));
        assert!(matches!(
            model.fit(&data.listings, &data.prices[1..]),
            Err(PipelineError::InvalidData(_))
        ));
    }

    #[test]
    fn test_save_and_load_directory() {
        let data = synthetic::generate(50, 7);
        let mut model = Model::new(text_config()).unwrap();
        model.fit(&data.listings, &data.prices).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = model.save(dir.path()).unwrap();
        assert_eq!(path, dir.path().join("text-model.bin"));

        let loaded = Model::load(&path).unwrap();
        assert_eq!(loaded.config(), model.config());
        assert_eq!(
            loaded.predict(&data.listings).unwrap(),
            model.predict(&data.listings).unwrap()
        );
    }

    #[test]
    fn test_store_round_trip() {
        let data = synthetic::generate(30, 3);
        let mut model = Model::new(PipelineConfig::new("stored")).unwrap();
        model.fit(&data.listings, &data.prices).unwrap();

        let store = MemoryStore::default();
        let key = model.save_to(&store).unwrap();
        assert_eq!(key, "stored.bin");
        let loaded = Model::load_from(&store, &key).unwrap();
        assert_eq!(loaded.fitted_state(), model.fitted_state());
    }

    #[test]
    fn test_from_bytes_rejects_garbage() {
        assert!(matches!(
            Model::from_bytes(b"definitely not a model"),
            Err(PipelineError::Serialization(_))
        ));
    }

    #[test]
    fn test_identity_target_transform() {
        let data = synthetic::generate(40, 4);
        let config = PipelineConfig::new("identity").with_target_transform(TargetTransform::Identity);
        let mut model = Model::new(config).unwrap();
        model.fit(&data.listings, &data.prices).unwrap();
        let evaluation = model.evaluate(&data.listings, &data.prices).unwrap();
        assert!(evaluation.rmsle.is_finite());
        assert_eq!(evaluation.n_rows, 40);
    }
}
