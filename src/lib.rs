//! # resale-pricer
//!
//! Feature-extraction and training pipeline for secondhand fashion resale
//! price prediction, with strict separation between fitting and inference.
//!
//! ## Core Design Principles
//!
//! - **Fit/Transform Separation**: every component comes as an unfitted type
//!   holding hyperparameters and a fitted type holding learned parameters.
//!   Fitted types never mutate during `transform`/`predict`.
//! - **Train/Inference Parity**: the exact chain fitted on the training batch
//!   is replayed on any later batch, including a single listing.
//! - **Configuration First**: a [`PipelineConfig`] is validated before any
//!   data is touched; names of estimators, vectorizers and reducers are a
//!   closed registry.
//! - **Versioned Artifacts**: a fitted [`Model`] persists as one bincode blob
//!   with a format header.
//!
//! ## Quick Start
//!
//! ```rust
//! use resale_pricer::data::synthetic;
//! use resale_pricer::{EstimatorConfig, Model, PipelineConfig};
//!
//! let train = synthetic::generate(80, 1);
//! let config = PipelineConfig::new("quickstart").with_estimator(EstimatorConfig::ridge(1.0));
//!
//! let mut model = Model::new(config).unwrap();
//! model.fit(&train.listings, &train.prices).unwrap();
//!
//! let predictions = model.predict(&train.listings[..1]).unwrap();
//! assert!(predictions[0] >= 0.0);
//! ```
//!
//! ## Module Structure
//!
//! - `data`: listing records, CSV loading, seeded splits, synthetic data
//! - `config`: pipeline configuration and name registries
//! - `preprocessing`: tabular encoders and the tabular transformer
//! - `text`: text cleaning, vectorization, reduction and the feature extractor
//! - `union`: column-wise join of the tabular and text blocks
//! - `estimator`: ridge, gradient boosting and median estimators
//! - `model`: the fit/predict/evaluate/save/load orchestrator
//! - `metrics`: RMSLE and friends
//! - `experiment`: single-run experiment driver and tracking sinks
//! - `serialization`: bincode codec and artifact header

pub mod config;
pub mod data;
pub mod error;
pub mod estimator;
pub mod experiment;
pub mod metrics;
pub mod model;
pub mod preprocessing;
pub mod serialization;
pub mod text;
pub mod union;

pub use config::{
    BoostingParams, EstimatorConfig, EstimatorFamily, EstimatorKind, PipelineConfig,
    ReducerConfig, ReducerKind, RidgeParams, TabularConfig, TargetTransform, TextConfig, TextMode,
    VectorizerConfig, VectorizerKind,
};
pub use data::{Column, Dataset, Listing, TextField};
pub use error::{PipelineError, Result};
pub use experiment::{
    ExperimentOutcome, ExperimentRunner, JsonLinesSink, MemorySink, RunOptions, RunRecord,
    TrackingSink,
};
pub use model::{ArtifactStore, Evaluation, FittedPipeline, LocalStore, Model};
