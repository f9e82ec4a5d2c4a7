//! Tabular transformer.
//!
//! Routes each declared tabular column to its encoder and joins the encoded
//! blocks in a fixed order: numeric, one-hot, ordinal, high-cardinality.
//! High-cardinality handling depends on the estimator family: the linear
//! family gets target-encoded magnitudes, the tree family gets label codes
//! flagged as categorical so the estimator can split on category subsets.

use crate::config::{EstimatorFamily, TabularConfig};
use crate::data::{Column, Listing};
use crate::error::{PipelineError, Result};
use crate::preprocessing::encoding::{
    FittedLabelEncoder, FittedOneHotEncoder, FittedOrdinalEncoder, FittedTargetEncoder,
    LabelEncoder, OneHotEncoder, OrdinalEncoder, TargetEncoder,
};
use crate::preprocessing::scaler::{FittedStandardScaler, StandardScaler};
use crate::preprocessing::size::SizeNormalizer;
use crate::preprocessing::traits::{FittedTransformer, Transformer};
use crate::union::FeatureBlock;
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Unfitted encoder for one group of columns.
#[derive(Clone, Debug)]
pub enum TabularStep {
    Numeric(StandardScaler),
    OneHot(OneHotEncoder),
    Ordinal(OrdinalEncoder),
    Target(TargetEncoder),
    Label(LabelEncoder),
}

/// Fitted encoder for one group of columns.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum FittedTabularStep {
    Numeric(FittedStandardScaler),
    OneHot(FittedOneHotEncoder),
    Ordinal(FittedOrdinalEncoder),
    Target(FittedTargetEncoder),
    Label(FittedLabelEncoder),
}

impl FittedTabularStep {
    fn step_name(&self) -> &'static str {
        match self {
            FittedTabularStep::Numeric(_) => "standard scaler",
            FittedTabularStep::OneHot(_) => "one-hot encoder",
            FittedTabularStep::Ordinal(_) => "ordinal encoder",
            FittedTabularStep::Target(_) => "target encoder",
            FittedTabularStep::Label(_) => "label encoder",
        }
    }

    fn n_features_out(&self) -> usize {
        match self {
            FittedTabularStep::Numeric(t) => t.n_features_out(),
            FittedTabularStep::OneHot(t) => t.n_features_out(),
            FittedTabularStep::Ordinal(t) => t.n_features_out(),
            FittedTabularStep::Target(t) => t.n_features_out(),
            FittedTabularStep::Label(t) => t.n_features_out(),
        }
    }

    fn feature_names(&self) -> Vec<String> {
        match self {
            FittedTabularStep::Numeric(t) => t.feature_names(),
            FittedTabularStep::OneHot(t) => t.feature_names(),
            FittedTabularStep::Ordinal(t) => t.feature_names(),
            FittedTabularStep::Target(t) => t.feature_names(),
            FittedTabularStep::Label(t) => t.feature_names(),
        }
    }

    fn is_categorical(&self) -> bool {
        matches!(self, FittedTabularStep::Label(_))
    }

    fn transform(&self, input: &StepInput) -> Result<Array2<f64>> {
        match (self, input) {
            (FittedTabularStep::Numeric(t), StepInput::Numeric(x)) => t.transform(x),
            (FittedTabularStep::OneHot(t), StepInput::Categorical(x)) => t.transform(x),
            (FittedTabularStep::Ordinal(t), StepInput::Categorical(x)) => t.transform(x),
            (FittedTabularStep::Target(t), StepInput::Categorical(x)) => t.transform(x),
            (FittedTabularStep::Label(t), StepInput::Categorical(x)) => t.transform(x),
            (step, _) => Err(PipelineError::TransformMismatch(format!(
                "{} received input of the wrong kind",
                step.step_name()
            ))),
        }
    }
}

enum StepInput {
    Numeric(Array2<f64>),
    Categorical(Vec<Vec<String>>),
}

/// Fit a tabular step from an unfitted step.
fn fit_step(
    step: &TabularStep,
    input: &StepInput,
    target: Option<&[f64]>,
) -> Result<FittedTabularStep> {
    match (step, input) {
        (TabularStep::Numeric(t), StepInput::Numeric(x)) => {
            t.fit(x, target).map(FittedTabularStep::Numeric)
        }
        (TabularStep::OneHot(t), StepInput::Categorical(x)) => {
            t.fit(x, target).map(FittedTabularStep::OneHot)
        }
        (TabularStep::Ordinal(t), StepInput::Categorical(x)) => {
            t.fit(x, target).map(FittedTabularStep::Ordinal)
        }
        (TabularStep::Target(t), StepInput::Categorical(x)) => {
            t.fit(x, target).map(FittedTabularStep::Target)
        }
        (TabularStep::Label(t), StepInput::Categorical(x)) => {
            t.fit(x, target).map(FittedTabularStep::Label)
        }
        _ => Err(PipelineError::fit("tabular", "step received input of the wrong kind")),
    }
}

/// Tabular branch of the pipeline (unfitted).
#[derive(Clone, Debug)]
pub struct TabularTransformer {
    steps: Vec<(Vec<Column>, TabularStep)>,
    size: SizeNormalizer,
}

impl TabularTransformer {
    /// Build the encoder plan for `config`, branching once on `family`.
    pub fn new(config: &TabularConfig, family: EstimatorFamily) -> Self {
        let mut steps = Vec::new();
        if !config.numeric.is_empty() {
            let names = config.numeric.iter().map(|c| c.to_string()).collect();
            steps.push((
                config.numeric.clone(),
                TabularStep::Numeric(StandardScaler::new().with_names(names)),
            ));
        }
        if !config.one_hot.is_empty() {
            steps.push((
                config.one_hot.clone(),
                TabularStep::OneHot(OneHotEncoder::new(config.one_hot.clone())),
            ));
        }
        if !config.ordinal.is_empty() {
            steps.push((
                config.ordinal.clone(),
                TabularStep::Ordinal(OrdinalEncoder::new(config.ordinal.clone())),
            ));
        }
        if !config.high_cardinality.is_empty() {
            let columns = config.high_cardinality.clone();
            let step = match family {
                EstimatorFamily::Linear => TabularStep::Target(
                    TargetEncoder::new(columns.clone())
                        .with_smoothing(config.target_smoothing)
                        .with_min_samples_leaf(config.target_min_samples_leaf),
                ),
                EstimatorFamily::Tree => TabularStep::Label(LabelEncoder::new(columns.clone())),
            };
            steps.push((columns, step));
        }
        Self {
            steps,
            size: SizeNormalizer::new(config.normalize_size),
        }
    }
}

impl Transformer for TabularTransformer {
    type Input = [Listing];
    type Output = FeatureBlock;
    type Fitted = FittedTabularTransformer;

    fn fit(&self, rows: &[Listing], target: Option<&[f64]>) -> Result<FittedTabularTransformer> {
        if rows.is_empty() {
            return Err(PipelineError::fit("tabular", "cannot fit on an empty batch"));
        }
        if self.steps.is_empty() {
            return Err(PipelineError::fit("tabular", "no tabular columns declared"));
        }

        let mut steps = Vec::with_capacity(self.steps.len());
        for (columns, step) in &self.steps {
            let input = extract(rows, columns, step_is_numeric(step), &self.size)
                .map_err(|e| PipelineError::fit("tabular", e.to_string()))?;
            let fitted = fit_step(step, &input, target).map_err(|e| match e {
                PipelineError::Fit { component, detail } => PipelineError::fit(
                    format!("tabular {}", component),
                    detail,
                ),
                other => other,
            })?;
            steps.push((columns.clone(), fitted));
        }

        let fitted = FittedTabularTransformer {
            steps,
            size: self.size,
        };
        debug!(
            columns = fitted.n_features_in(),
            width = fitted.n_features_out(),
            "fitted tabular transformer"
        );
        Ok(fitted)
    }
}

fn step_is_numeric(step: &TabularStep) -> bool {
    matches!(step, TabularStep::Numeric(_))
}

/// Fitted tabular branch.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FittedTabularTransformer {
    steps: Vec<(Vec<Column>, FittedTabularStep)>,
    size: SizeNormalizer,
}

impl FittedTabularTransformer {
    /// Step names with the columns each one encodes.
    pub fn step_names(&self) -> Vec<(&'static str, &[Column])> {
        self.steps
            .iter()
            .map(|(columns, step)| (step.step_name(), columns.as_slice()))
            .collect()
    }

    /// Indices of output columns holding category codes.
    pub fn categorical(&self) -> Vec<usize> {
        let mut out = Vec::new();
        let mut offset = 0;
        for (_, step) in &self.steps {
            let width = step.n_features_out();
            if step.is_categorical() {
                out.extend(offset..offset + width);
            }
            offset += width;
        }
        out
    }
}

impl FittedTransformer for FittedTabularTransformer {
    type Input = [Listing];
    type Output = FeatureBlock;

    fn transform(&self, rows: &[Listing]) -> Result<FeatureBlock> {
        let mut blocks = Vec::with_capacity(self.steps.len());
        for (columns, step) in &self.steps {
            let numeric = matches!(step, FittedTabularStep::Numeric(_));
            let input = extract(rows, columns, numeric, &self.size)?;
            blocks.push(step.transform(&input)?);
        }
        let views: Vec<_> = blocks.iter().map(|b| b.view()).collect();
        let values = ndarray::concatenate(ndarray::Axis(1), &views)
            .map_err(|e| PipelineError::TransformMismatch(e.to_string()))?;
        Ok(FeatureBlock::new(values, self.feature_names()).with_categorical(self.categorical()))
    }

    fn n_features_in(&self) -> usize {
        self.steps.iter().map(|(columns, _)| columns.len()).sum()
    }

    fn n_features_out(&self) -> usize {
        self.steps.iter().map(|(_, step)| step.n_features_out()).sum()
    }

    fn feature_names(&self) -> Vec<String> {
        self.steps
            .iter()
            .flat_map(|(_, step)| step.feature_names())
            .collect()
    }
}

fn at_row(row: usize, err: PipelineError) -> PipelineError {
    match err {
        PipelineError::TransformMismatch(msg) => {
            PipelineError::TransformMismatch(format!("row {}: {}", row, msg))
        }
        other => other,
    }
}

/// Pull the step's columns out of the rows, applying size normalisation.
fn extract(
    rows: &[Listing],
    columns: &[Column],
    numeric: bool,
    size: &SizeNormalizer,
) -> Result<StepInput> {
    if numeric {
        let mut values = Array2::zeros((rows.len(), columns.len()));
        for (i, row) in rows.iter().enumerate() {
            for (j, column) in columns.iter().enumerate() {
                values[[i, j]] = row.numeric(*column).map_err(|e| at_row(i, e))?;
            }
        }
        return Ok(StepInput::Numeric(values));
    }

    let mut data = Vec::with_capacity(columns.len());
    for column in columns {
        let mut values = Vec::with_capacity(rows.len());
        for (i, row) in rows.iter().enumerate() {
            let value = row.categorical(*column).map_err(|e| at_row(i, e))?;
            let value = if *column == Column::Size {
                let category = row.categorical(Column::Category).map_err(|e| at_row(i, e))?;
                size.apply(value, category)
            } else {
                value.to_string()
            };
            values.push(value);
        }
        data.push(values);
    }
    Ok(StepInput::Categorical(data))
}
