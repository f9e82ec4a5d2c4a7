//! Categorical feature encoding transformers.
//!
//! Every encoder consumes column-major string data (`&[Vec<String>]`, one
//! `Vec` per declared column, all of equal length) and produces a dense
//! `Array2<f64>`. None of them raises on a category unseen at fit time;
//! each has a defined fallback instead.
//!
//! # Available Encoders
//!
//! ## OneHotEncoder
//! One binary column per (column, category) pair. Unseen → all-zero block.
//!
//! ## OrdinalEncoder
//! Explicit rank per category. `condition` uses the fixed grade order
//! [`CONDITION_GRADES`]; other columns rank categories in sorted order.
//! Unseen → [`UNKNOWN_ORDINAL`].
//!
//! ## TargetEncoder
//! Smoothed mean target per category. Unseen → global prior.
//!
//! ## LabelEncoder
//! Sorted integer codes for native categorical splits. Unseen → reserved
//! code `n_categories`.

mod label;
mod one_hot;
mod ordinal;
mod target;

pub use label::{FittedLabelEncoder, LabelEncoder};
pub use one_hot::{FittedOneHotEncoder, OneHotEncoder};
pub use ordinal::{FittedOrdinalEncoder, OrdinalEncoder, CONDITION_GRADES, UNKNOWN_ORDINAL};
pub use target::{FittedTargetEncoder, TargetEncoder};

use crate::data::Column;
use crate::error::{PipelineError, Result};

/// Check the shape of column-major input and return its row count.
pub(crate) fn check_fit_input(
    component: &str,
    columns: &[Column],
    data: &[Vec<String>],
) -> Result<usize> {
    if data.len() != columns.len() {
        return Err(PipelineError::fit(
            component,
            format!("expected {} columns, got {}", columns.len(), data.len()),
        ));
    }
    let rows = data.first().map(Vec::len).unwrap_or(0);
    if rows == 0 {
        return Err(PipelineError::fit(component, "cannot fit on empty data"));
    }
    if let Some(i) = data.iter().position(|col| col.len() != rows) {
        return Err(PipelineError::fit(
            component,
            format!("column '{}' has {} rows, expected {}", columns[i], data[i].len(), rows),
        ));
    }
    Ok(rows)
}

/// Transform-time counterpart of [`check_fit_input`]; empty batches are allowed.
pub(crate) fn check_transform_input(
    component: &str,
    columns: &[Column],
    data: &[Vec<String>],
) -> Result<usize> {
    if data.len() != columns.len() {
        return Err(PipelineError::TransformMismatch(format!(
            "{} expects {} columns, got {}",
            component,
            columns.len(),
            data.len()
        )));
    }
    let rows = data.first().map(Vec::len).unwrap_or(0);
    if data.iter().any(|col| col.len() != rows) {
        return Err(PipelineError::TransformMismatch(format!(
            "{} received columns of unequal length",
            component
        )));
    }
    Ok(rows)
}

/// Sorted unique values of one column.
pub(crate) fn sorted_categories(values: &[String]) -> Vec<String> {
    let mut categories: Vec<String> = values.to_vec();
    categories.sort();
    categories.dedup();
    categories
}
