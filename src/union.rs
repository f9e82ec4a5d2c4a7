//! Column-wise union of the tabular and text feature blocks.

use crate::error::{PipelineError, Result};
use ndarray::{concatenate, Array2, Axis};
use serde::{Deserialize, Serialize};

/// Named numeric block, one row per listing.
#[derive(Clone, Debug, PartialEq)]
pub struct FeatureBlock {
    pub values: Array2<f64>,
    pub names: Vec<String>,
    /// Indices of columns that hold category codes rather than magnitudes.
    pub categorical: Vec<usize>,
}

impl FeatureBlock {
    pub fn new(values: Array2<f64>, names: Vec<String>) -> Self {
        Self {
            values,
            names,
            categorical: Vec::new(),
        }
    }

    pub fn with_categorical(mut self, categorical: Vec<usize>) -> Self {
        self.categorical = categorical;
        self
    }

    pub fn n_rows(&self) -> usize {
        self.values.nrows()
    }

    pub fn width(&self) -> usize {
        self.values.ncols()
    }

    /// Concatenate blocks column-wise. Categorical indices are shifted by the
    /// width of the blocks before them.
    pub fn hstack(blocks: Vec<FeatureBlock>) -> Result<FeatureBlock> {
        let rows = blocks.first().map(FeatureBlock::n_rows).unwrap_or(0);
        if let Some(bad) = blocks.iter().find(|b| b.n_rows() != rows) {
            return Err(PipelineError::TransformMismatch(format!(
                "cannot join feature blocks with {} and {} rows",
                rows,
                bad.n_rows()
            )));
        }

        let mut names = Vec::new();
        let mut categorical = Vec::new();
        let mut views = Vec::with_capacity(blocks.len());
        let mut offset = 0;
        for block in &blocks {
            names.extend(block.names.iter().cloned());
            categorical.extend(block.categorical.iter().map(|c| c + offset));
            offset += block.width();
            views.push(block.values.view());
        }
        let values = if views.is_empty() {
            Array2::zeros((0, 0))
        } else {
            concatenate(Axis(1), &views)
                .map_err(|e| PipelineError::TransformMismatch(e.to_string()))?
        };
        Ok(FeatureBlock {
            values,
            names,
            categorical,
        })
    }
}

/// Column layout of the union recorded at fit time.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FeatureLayout {
    names: Vec<String>,
    categorical: Vec<usize>,
    tabular_width: Option<usize>,
    text_width: Option<usize>,
}

impl FeatureLayout {
    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn categorical(&self) -> &[usize] {
        &self.categorical
    }

    pub fn width(&self) -> usize {
        self.names.len()
    }

    /// Join blocks for inference, checking them against the fitted layout.
    pub fn transform(
        &self,
        tabular: Option<FeatureBlock>,
        text: Option<FeatureBlock>,
    ) -> Result<FeatureBlock> {
        check_branch("tabular", self.tabular_width, tabular.as_ref())?;
        check_branch("text", self.text_width, text.as_ref())?;
        let joined = FeatureUnion::join(tabular, text)?;
        if joined.names != self.names {
            return Err(PipelineError::TransformMismatch(
                "feature names differ from the fitted layout".to_string(),
            ));
        }
        Ok(joined)
    }
}

fn check_branch(branch: &str, expected: Option<usize>, got: Option<&FeatureBlock>) -> Result<()> {
    match (expected, got) {
        (Some(w), Some(block)) if block.width() == w => Ok(()),
        (None, None) => Ok(()),
        (Some(w), Some(block)) => Err(PipelineError::TransformMismatch(format!(
            "{} block has {} columns, fitted layout has {}",
            branch,
            block.width(),
            w
        ))),
        (Some(_), None) => Err(PipelineError::TransformMismatch(format!(
            "{} block is missing",
            branch
        ))),
        (None, Some(_)) => Err(PipelineError::TransformMismatch(format!(
            "{} block was not part of the fitted layout",
            branch
        ))),
    }
}

/// Joins the tabular and text blocks; tabular columns come first.
pub struct FeatureUnion;

impl FeatureUnion {
    /// Join the fit-time blocks and record their layout.
    pub fn fit(
        tabular: Option<FeatureBlock>,
        text: Option<FeatureBlock>,
    ) -> Result<(FeatureLayout, FeatureBlock)> {
        let tabular_width = tabular.as_ref().map(FeatureBlock::width);
        let text_width = text.as_ref().map(FeatureBlock::width);
        let joined = Self::join(tabular, text)?;
        let layout = FeatureLayout {
            names: joined.names.clone(),
            categorical: joined.categorical.clone(),
            tabular_width,
            text_width,
        };
        Ok((layout, joined))
    }

    /// A single enabled block passes through unchanged.
    ///
    /// # Errors
    /// [`PipelineError::TransformMismatch`] if the row counts differ,
    /// [`PipelineError::Configuration`] if both blocks are absent.
    pub fn join(tabular: Option<FeatureBlock>, text: Option<FeatureBlock>) -> Result<FeatureBlock> {
        match (tabular, text) {
            (Some(tab), Some(txt)) => {
                if tab.n_rows() != txt.n_rows() {
                    return Err(PipelineError::TransformMismatch(format!(
                        "tabular block has {} rows but text block has {}",
                        tab.n_rows(),
                        txt.n_rows()
                    )));
                }
                FeatureBlock::hstack(vec![tab, txt])
            }
            (Some(block), None) | (None, Some(block)) => Ok(block),
            (None, None) => Err(PipelineError::Configuration(
                "feature union needs at least one enabled branch".to_string(),
            )),
        }
    }
}
