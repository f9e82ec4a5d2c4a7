//! Label encoding for native categorical splits.
//!
//! Maps each category to its index in the sorted category list. Categories
//! unseen at fit time map to the reserved code `n_categories`, which no
//! training row carries.

use super::{check_fit_input, check_transform_input, sorted_categories};
use crate::data::Column;
use crate::error::Result;
use crate::preprocessing::traits::{FittedTransformer, Transformer};
use ndarray::Array2;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug)]
pub struct LabelEncoder {
    columns: Vec<Column>,
}

impl LabelEncoder {
    pub fn new(columns: Vec<Column>) -> Self {
        Self { columns }
    }
}

impl Transformer for LabelEncoder {
    type Input = [Vec<String>];
    type Output = Array2<f64>;
    type Fitted = FittedLabelEncoder;

    fn fit(&self, data: &[Vec<String>], _target: Option<&[f64]>) -> Result<FittedLabelEncoder> {
        check_fit_input("label encoder", &self.columns, data)?;
        Ok(FittedLabelEncoder {
            columns: self.columns.clone(),
            classes: data.iter().map(|col| sorted_categories(col)).collect(),
        })
    }
}

/// Fitted LabelEncoder ready for inference.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FittedLabelEncoder {
    columns: Vec<Column>,
    classes: Vec<Vec<String>>,
}

impl FittedLabelEncoder {
    /// Sorted classes per column.
    pub fn classes(&self) -> &[Vec<String>] {
        &self.classes
    }

    /// Code reserved for categories unseen at fit time.
    pub fn unknown_code(&self, col: usize) -> usize {
        self.classes[col].len()
    }

    pub fn code(&self, col: usize, value: &str) -> usize {
        let classes = &self.classes[col];
        classes
            .binary_search_by(|c| c.as_str().cmp(value))
            .unwrap_or(classes.len())
    }
}

impl FittedTransformer for FittedLabelEncoder {
    type Input = [Vec<String>];
    type Output = Array2<f64>;

    fn transform(&self, data: &[Vec<String>]) -> Result<Array2<f64>> {
        let rows = check_transform_input("label encoder", &self.columns, data)?;
        let mut out = Array2::zeros((rows, self.columns.len()));
        for (col, values) in data.iter().enumerate() {
            for (row, value) in values.iter().enumerate() {
                out[[row, col]] = self.code(col, value) as f64;
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

#[cfg(test)]
mod tests {
    use super::*;

    fn col(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_label_encoder_basic() {
        let data = vec![col(&["Prada", "Acne", "Gucci", "Acne"])];
        let fitted = LabelEncoder::new(vec![Column::Designer]).fit(&data, None).unwrap();
        assert_eq!(fitted.classes()[0], col(&["Acne", "Gucci", "Prada"]));
        let out = fitted.transform(&data).unwrap();
        assert_eq!(out.column(0).to_vec(), vec![2.0, 0.0, 1.0, 0.0]);
    }

    #[test]
    fn test_label_encoder_unseen_gets_reserved_code() {
        let data = vec![col(&["a", "b"])];
        let fitted = LabelEncoder::new(vec![Column::Color]).fit(&data, None).unwrap();
        assert_eq!(fitted.unknown_code(0), 2);
        let out = fitted.transform(&[col(&["zzz", "0"])]).unwrap();
        assert_eq!(out.column(0).to_vec(), vec![2.0, 2.0]);
    }

    #[test]
    fn test_label_encoder_empty_data() {
        assert!(LabelEncoder::new(vec![Column::Color]).fit(&[Vec::new()], None).is_err());
    }

    #[test]
    fn test_label_encoder_serialization() {
        let data = vec![col(&["x", "y"])];
        let fitted = LabelEncoder::new(vec![Column::Color]).fit(&data, None).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("label.bin");
        fitted.save_to_file(&path).unwrap();
        assert_eq!(FittedLabelEncoder::load_from_file(&path).unwrap(), fitted);
    }
}
