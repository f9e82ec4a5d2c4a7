//! Pipeline configuration.
//!
//! A [`PipelineConfig`] is the complete set of choices that defines one
//! trainable pipeline variant: which branches are enabled, which tabular
//! column goes to which encoder, how text is vectorized and reduced, and
//! which estimator (with which hyperparameters) sits at the end.
//!
//! Component names form closed registries ([`EstimatorKind`],
//! [`VectorizerKind`], [`ReducerKind`]) that are parsed eagerly: an unknown
//! name is a [`PipelineError::Configuration`] at parse time, never deep
//! inside `fit`.
//!
//! # Example
//!
//! ```rust
//! use resale_pricer::config::{EstimatorConfig, PipelineConfig};
//!
//! let config = PipelineConfig::new("ridge-text")
//!     .with_estimator(EstimatorConfig::ridge(2.0))
//!     .with_text(true);
//! assert!(config.validate().is_ok());
//!
//! let flat = config.to_flat();
//! assert_eq!(flat["estimator.ridge.alpha"], serde_json::json!(2.0));
//! ```

use crate::data::{Column, TextField};
use crate::error::{PipelineError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

macro_rules! named_registry {
    ($ty:ident, $what:literal, { $($variant:ident => $name:literal $(| $alias:literal)*),+ $(,)? }) => {
        impl $ty {
            /// Every registered variant.
            pub const ALL: &'static [$ty] = &[$($ty::$variant),+];

            /// Canonical registry name.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($ty::$variant => $name),+
                }
            }
        }

        impl FromStr for $ty {
            type Err = PipelineError;

            fn from_str(s: &str) -> Result<Self> {
                match s {
                    $($name $(| $alias)* => Ok($ty::$variant),)+
                    other => Err(PipelineError::Configuration(format!(
                        "unknown {} '{}'; expected one of: {}",
                        $what,
                        other,
                        [$($name),+].join(", ")
                    ))),
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl Serialize for $ty {
            fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
                let name = String::deserialize(deserializer)?;
                name.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

/// Regression algorithm at the end of the pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EstimatorKind {
    Ridge,
    GradientBoosting,
    /// Constant median baseline.
    Median,
}

named_registry!(EstimatorKind, "estimator", {
    Ridge => "ridge",
    GradientBoosting => "gboost",
    Median => "c-median",
});

/// How an estimator consumes high-cardinality categorical columns.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EstimatorFamily {
    /// Purely numeric input; categories must be target-encoded.
    Linear,
    /// Native categorical splits on label-coded columns.
    Tree,
}

impl EstimatorKind {
    pub fn family(&self) -> EstimatorFamily {
        match self {
            EstimatorKind::GradientBoosting => EstimatorFamily::Tree,
            EstimatorKind::Ridge | EstimatorKind::Median => EstimatorFamily::Linear,
        }
    }
}

/// Text vectorizer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum VectorizerKind {
    Count,
    Tfidf,
}

named_registry!(VectorizerKind, "vectorizer", {
    Count => "count",
    Tfidf => "tfidf",
});

/// Dimensionality reducer applied after vectorization.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ReducerKind {
    Pca,
    TruncatedSvd,
}

named_registry!(ReducerKind, "reducer", {
    Pca => "pca",
    TruncatedSvd => "tsvd" | "svd",
});

/// Transform applied to prices before the estimator sees them.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetTransform {
    /// Fit on `ln(1 + price)`, invert with `exp(y) - 1`.
    #[default]
    Log1p,
    Identity,
}

impl TargetTransform {
    pub fn forward(&self, price: f64) -> f64 {
        match self {
            TargetTransform::Log1p => price.ln_1p(),
            TargetTransform::Identity => price,
        }
    }

    pub fn inverse(&self, value: f64) -> f64 {
        match self {
            TargetTransform::Log1p => value.exp_m1(),
            TargetTransform::Identity => value,
        }
    }
}

/// Ridge hyperparameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RidgeParams {
    /// L2 penalty strength.
    pub alpha: f64,
    pub fit_intercept: bool,
}

impl Default for RidgeParams {
    fn default() -> Self {
        Self {
            alpha: 1.0,
            fit_intercept: true,
        }
    }
}

/// Gradient-boosted tree hyperparameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BoostingParams {
    pub n_estimators: usize,
    pub learning_rate: f64,
    pub max_depth: usize,
    pub min_samples_leaf: usize,
    /// L2 penalty on leaf values.
    pub l2_regularization: f64,
    /// Fraction of rows sampled (without replacement) per tree.
    pub subsample: f64,
}

impl Default for BoostingParams {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            learning_rate: 0.1,
            max_depth: 3,
            min_samples_leaf: 1,
            l2_regularization: 0.0,
            subsample: 1.0,
        }
    }
}

/// Estimator choice plus the hyperparameters of every registered kind.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EstimatorConfig {
    pub kind: EstimatorKind,
    pub ridge: RidgeParams,
    pub boosting: BoostingParams,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            kind: EstimatorKind::Ridge,
            ridge: RidgeParams::default(),
            boosting: BoostingParams::default(),
        }
    }
}

impl EstimatorConfig {
    pub fn ridge(alpha: f64) -> Self {
        Self {
            kind: EstimatorKind::Ridge,
            ridge: RidgeParams {
                alpha,
                ..RidgeParams::default()
            },
            ..Self::default()
        }
    }

    pub fn gradient_boosting(params: BoostingParams) -> Self {
        Self {
            kind: EstimatorKind::GradientBoosting,
            boosting: params,
            ..Self::default()
        }
    }

    pub fn median() -> Self {
        Self {
            kind: EstimatorKind::Median,
            ..Self::default()
        }
    }

    fn validate(&self) -> Result<()> {
        match self.kind {
            EstimatorKind::Ridge => {
                let alpha = self.ridge.alpha;
                if !(alpha.is_finite() && alpha >= 0.0) {
                    return Err(invalid("estimator.ridge.alpha", "must be finite and >= 0", alpha));
                }
            }
            EstimatorKind::GradientBoosting => {
                let p = &self.boosting;
                if p.n_estimators == 0 {
                    return Err(invalid("estimator.boosting.n_estimators", "must be >= 1", 0));
                }
                if !(p.learning_rate.is_finite() && p.learning_rate > 0.0) {
                    return Err(invalid(
                        "estimator.boosting.learning_rate",
                        "must be > 0",
                        p.learning_rate,
                    ));
                }
                if p.max_depth == 0 {
                    return Err(invalid("estimator.boosting.max_depth", "must be >= 1", 0));
                }
                if p.min_samples_leaf == 0 {
                    return Err(invalid("estimator.boosting.min_samples_leaf", "must be >= 1", 0));
                }
                if !(p.l2_regularization.is_finite() && p.l2_regularization >= 0.0) {
                    return Err(invalid(
                        "estimator.boosting.l2_regularization",
                        "must be >= 0",
                        p.l2_regularization,
                    ));
                }
                if !(p.subsample > 0.0 && p.subsample <= 1.0) {
                    return Err(invalid(
                        "estimator.boosting.subsample",
                        "must be in (0, 1]",
                        p.subsample,
                    ));
                }
            }
            EstimatorKind::Median => {}
        }
        Ok(())
    }
}

/// Assignment of tabular columns to encoders.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TabularConfig {
    /// Standard-scaled numeric columns.
    pub numeric: Vec<Column>,
    /// One-hot encoded low-cardinality columns.
    pub one_hot: Vec<Column>,
    /// Rank-encoded columns.
    pub ordinal: Vec<Column>,
    /// Target-encoded (linear family) or label-coded (tree family) columns.
    pub high_cardinality: Vec<Column>,
    /// Replace size labels with their relative position in the size chart.
    pub normalize_size: bool,
    /// Sigmoid slope of target-encoding shrinkage.
    pub target_smoothing: f64,
    /// Category count at which target encoding weighs the category mean and the prior equally.
    pub target_min_samples_leaf: usize,
}

impl Default for TabularConfig {
    fn default() -> Self {
        Self {
            numeric: vec![Column::NPhotos],
            one_hot: vec![Column::Department, Column::Category],
            ordinal: vec![Column::Condition],
            high_cardinality: vec![Column::Designer, Column::Subcategory, Column::Size, Column::Color],
            normalize_size: false,
            target_smoothing: 10.0,
            target_min_samples_leaf: 20,
        }
    }
}

impl TabularConfig {
    pub fn with_numeric(mut self, columns: Vec<Column>) -> Self {
        self.numeric = columns;
        self
    }

    pub fn with_one_hot(mut self, columns: Vec<Column>) -> Self {
        self.one_hot = columns;
        self
    }

    pub fn with_ordinal(mut self, columns: Vec<Column>) -> Self {
        self.ordinal = columns;
        self
    }

    pub fn with_high_cardinality(mut self, columns: Vec<Column>) -> Self {
        self.high_cardinality = columns;
        self
    }

    pub fn with_normalize_size(mut self, normalize: bool) -> Self {
        self.normalize_size = normalize;
        self
    }

    /// Every column in use, in encoder order (numeric, one-hot, ordinal, high-cardinality).
    pub fn columns(&self) -> Vec<Column> {
        self.assignments().map(|(_, c)| c).collect()
    }

    fn assignments(&self) -> impl Iterator<Item = (&'static str, Column)> + '_ {
        let lists: [(&'static str, &Vec<Column>); 4] = [
            ("numeric", &self.numeric),
            ("one_hot", &self.one_hot),
            ("ordinal", &self.ordinal),
            ("high_cardinality", &self.high_cardinality),
        ];
        lists
            .into_iter()
            .flat_map(|(encoder, cols)| cols.iter().map(move |c| (encoder, *c)))
    }

    fn validate(&self) -> Result<()> {
        let mut seen: BTreeMap<Column, &'static str> = BTreeMap::new();
        for (encoder, column) in self.assignments() {
            if let Some(previous) = seen.insert(column, encoder) {
                return Err(PipelineError::Configuration(format!(
                    "column '{}' is assigned to both the {} and {} encoders",
                    column, previous, encoder
                )));
            }
            let numeric_list = encoder == "numeric";
            if numeric_list != column.is_numeric() {
                return Err(PipelineError::Configuration(format!(
                    "column '{}' cannot be used by the {} encoder",
                    column, encoder
                )));
            }
        }
        if seen.is_empty() {
            return Err(PipelineError::Configuration(
                "tabular branch is enabled but no tabular columns are declared".to_string(),
            ));
        }
        if !(self.target_smoothing.is_finite() && self.target_smoothing > 0.0) {
            return Err(invalid("tabular.target_smoothing", "must be > 0", self.target_smoothing));
        }
        Ok(())
    }
}

/// Vectorizer choice and parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VectorizerConfig {
    pub kind: VectorizerKind,
    /// Inclusive word n-gram range.
    pub ngram_range: (usize, usize),
    /// Minimum number of documents a term must appear in.
    pub min_df: usize,
    /// Maximum fraction of documents a term may appear in.
    pub max_df: f64,
    pub max_features: Option<usize>,
}

impl Default for VectorizerConfig {
    fn default() -> Self {
        Self {
            kind: VectorizerKind::Tfidf,
            ngram_range: (1, 2),
            min_df: 1,
            max_df: 1.0,
            max_features: None,
        }
    }
}

impl VectorizerConfig {
    pub fn new(kind: VectorizerKind) -> Self {
        Self {
            kind,
            ..Self::default()
        }
    }

    pub fn with_ngram_range(mut self, lo: usize, hi: usize) -> Self {
        self.ngram_range = (lo, hi);
        self
    }

    pub fn with_min_df(mut self, min_df: usize) -> Self {
        self.min_df = min_df;
        self
    }

    pub fn with_max_df(mut self, max_df: f64) -> Self {
        self.max_df = max_df;
        self
    }

    pub fn with_max_features(mut self, max_features: Option<usize>) -> Self {
        self.max_features = max_features;
        self
    }
}

/// Reducer choice and output width.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReducerConfig {
    pub kind: ReducerKind,
    pub n_components: usize,
}

impl Default for ReducerConfig {
    fn default() -> Self {
        Self {
            kind: ReducerKind::Pca,
            n_components: 100,
        }
    }
}

impl ReducerConfig {
    pub fn new(kind: ReducerKind, n_components: usize) -> Self {
        Self { kind, n_components }
    }
}

/// Whether text fields share one vectorizer or get one each.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextMode {
    /// Fields are concatenated into one document before vectorization.
    #[default]
    Joint,
    /// Each field is vectorized (and reduced) on its own.
    Independent,
}

/// Text branch configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TextConfig {
    pub fields: Vec<TextField>,
    pub mode: TextMode,
    pub vectorizer: VectorizerConfig,
    pub reducer: Option<ReducerConfig>,
    /// Add length / word-count / average-word-length features per field.
    pub use_stats: bool,
    /// Add a flag for listings without hashtags.
    pub use_missing_hashtags: bool,
}

impl Default for TextConfig {
    fn default() -> Self {
        Self {
            fields: TextField::ALL.to_vec(),
            mode: TextMode::Joint,
            vectorizer: VectorizerConfig::default(),
            reducer: Some(ReducerConfig::default()),
            use_stats: true,
            use_missing_hashtags: true,
        }
    }
}

impl TextConfig {
    pub fn with_fields(mut self, fields: Vec<TextField>) -> Self {
        self.fields = fields;
        self
    }

    pub fn with_mode(mut self, mode: TextMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_vectorizer(mut self, vectorizer: VectorizerConfig) -> Self {
        self.vectorizer = vectorizer;
        self
    }

    pub fn with_reducer(mut self, reducer: Option<ReducerConfig>) -> Self {
        self.reducer = reducer;
        self
    }

    pub fn with_stats(mut self, use_stats: bool) -> Self {
        self.use_stats = use_stats;
        self
    }

    pub fn with_missing_hashtags(mut self, flag: bool) -> Self {
        self.use_missing_hashtags = flag;
        self
    }

    fn validate(&self) -> Result<()> {
        if self.fields.is_empty() {
            return Err(PipelineError::Configuration(
                "text branch is enabled but no text fields are declared".to_string(),
            ));
        }
        let mut seen = Vec::with_capacity(self.fields.len());
        for field in &self.fields {
            if seen.contains(field) {
                return Err(PipelineError::Configuration(format!(
                    "text field '{}' is declared twice",
                    field
                )));
            }
            seen.push(*field);
        }
        let (lo, hi) = self.vectorizer.ngram_range;
        if lo == 0 || lo > hi {
            return Err(PipelineError::Configuration(format!(
                "text.vectorizer.ngram_range must satisfy 1 <= lo <= hi (got ({}, {}))",
                lo, hi
            )));
        }
        if self.vectorizer.min_df == 0 {
            return Err(invalid("text.vectorizer.min_df", "must be >= 1", 0));
        }
        let max_df = self.vectorizer.max_df;
        if !(max_df > 0.0 && max_df <= 1.0) {
            return Err(invalid("text.vectorizer.max_df", "must be in (0, 1]", max_df));
        }
        if self.vectorizer.max_features == Some(0) {
            return Err(invalid("text.vectorizer.max_features", "must be >= 1", 0));
        }
        if let Some(reducer) = &self.reducer {
            if reducer.n_components == 0 {
                return Err(invalid("text.reducer.n_components", "must be >= 1", 0));
            }
        }
        Ok(())
    }
}

/// Complete, immutable description of one pipeline variant.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    model_name: String,
    seed: u64,
    estimator: EstimatorConfig,
    use_tabular: bool,
    use_text: bool,
    target_transform: TargetTransform,
    tabular: TabularConfig,
    text: TextConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            model_name: "model".to_string(),
            seed: 42,
            estimator: EstimatorConfig::default(),
            use_tabular: true,
            use_text: false,
            target_transform: TargetTransform::Log1p,
            tabular: TabularConfig::default(),
            text: TextConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Default configuration under the given model name.
    pub fn new(model_name: impl Into<String>) -> Self {
        Self {
            model_name: model_name.into(),
            ..Self::default()
        }
    }

    pub fn with_model_name(mut self, name: impl Into<String>) -> Self {
        self.model_name = name.into();
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_estimator(mut self, estimator: EstimatorConfig) -> Self {
        self.estimator = estimator;
        self
    }

    pub fn with_tabular(mut self, enabled: bool) -> Self {
        self.use_tabular = enabled;
        self
    }

    pub fn with_text(mut self, enabled: bool) -> Self {
        self.use_text = enabled;
        self
    }

    pub fn with_target_transform(mut self, transform: TargetTransform) -> Self {
        self.target_transform = transform;
        self
    }

    pub fn with_tabular_config(mut self, tabular: TabularConfig) -> Self {
        self.tabular = tabular;
        self
    }

    pub fn with_text_config(mut self, text: TextConfig) -> Self {
        self.text = text;
        self
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn estimator(&self) -> &EstimatorConfig {
        &self.estimator
    }

    pub fn use_tabular(&self) -> bool {
        self.use_tabular
    }

    pub fn use_text(&self) -> bool {
        self.use_text
    }

    pub fn target_transform(&self) -> TargetTransform {
        self.target_transform
    }

    pub fn tabular(&self) -> &TabularConfig {
        &self.tabular
    }

    pub fn text(&self) -> &TextConfig {
        &self.text
    }

    /// Estimator family that decides high-cardinality column handling.
    pub fn family(&self) -> EstimatorFamily {
        self.estimator.kind.family()
    }

    /// Check every configuration invariant.
    ///
    /// Sub-configurations of disabled branches are not checked.
    ///
    /// # Errors
    /// [`PipelineError::Configuration`] naming the offending key or column.
    pub fn validate(&self) -> Result<()> {
        let name_ok = !self.model_name.trim().is_empty()
            && !self.model_name.contains(['/', '\\'])
            && self.model_name != "."
            && self.model_name != "..";
        if !name_ok {
            return Err(PipelineError::Configuration(format!(
                "model_name '{}' is not a valid artifact name",
                self.model_name
            )));
        }
        if !self.use_tabular && !self.use_text {
            return Err(PipelineError::Configuration(
                "at least one of use_tabular or use_text must be enabled".to_string(),
            ));
        }
        if self.use_tabular {
            self.tabular.validate()?;
        }
        if self.use_text {
            self.text.validate()?;
        }
        self.estimator.validate()
    }

    /// Flatten into dotted keys (`estimator.boosting.learning_rate`).
    pub fn to_flat(&self) -> BTreeMap<String, Value> {
        let mut out = BTreeMap::new();
        // Serializing plain config data into a Value cannot fail.
        if let Ok(value) = serde_json::to_value(self) {
            flatten_into("", &value, &mut out);
        }
        out
    }

    /// Build a validated configuration from dotted keys laid over the defaults.
    pub fn from_flat(flat: &BTreeMap<String, Value>) -> Result<Self> {
        Self::default().with_overrides(flat)
    }

    /// Copy of this configuration with dotted-key overrides applied, validated.
    pub fn with_overrides(&self, overrides: &BTreeMap<String, Value>) -> Result<Self> {
        let mut root = serde_json::to_value(self)?;
        for (key, value) in overrides {
            insert_dotted(&mut root, key, value.clone())?;
        }
        let config: PipelineConfig = serde_json::from_value(root).map_err(rejected)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate a JSON configuration.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: PipelineConfig = serde_json::from_str(json).map_err(rejected)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON configuration file.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// A configuration document that does not parse is a configuration error.
fn rejected(err: serde_json::Error) -> PipelineError {
    PipelineError::Configuration(err.to_string())
}

fn invalid(key: &str, rule: &str, got: impl fmt::Display) -> PipelineError {
    PipelineError::Configuration(format!("{} {} (got {})", key, rule, got))
}

fn flatten_into(prefix: &str, value: &Value, out: &mut BTreeMap<String, Value>) {
    match value {
        Value::Object(map) if !map.is_empty() => {
            for (key, child) in map {
                let path = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{}.{}", prefix, key)
                };
                flatten_into(&path, child, out);
            }
        }
        other => {
            out.insert(prefix.to_string(), other.clone());
        }
    }
}

fn insert_dotted(root: &mut Value, key: &str, value: Value) -> Result<()> {
    let parts: Vec<&str> = key.split('.').collect();
    if parts.iter().any(|p| p.is_empty()) {
        return Err(PipelineError::Configuration(format!(
            "invalid configuration key '{}'",
            key
        )));
    }

    let mut current = root;
    for (i, part) in parts.iter().enumerate() {
        if !current.is_object() {
            *current = Value::Object(Map::new());
        }
        let map = match current {
            Value::Object(map) => map,
            _ => {
                return Err(PipelineError::Configuration(format!(
                    "configuration key '{}' does not address an object",
                    key
                )))
            }
        };
        if i + 1 == parts.len() {
            map.insert(part.to_string(), value);
            return Ok(());
        }
        current = map.entry(part.to_string()).or_insert(Value::Null);
    }
    Ok(())
}
