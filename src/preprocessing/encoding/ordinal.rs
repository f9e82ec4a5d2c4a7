//! Ordinal (rank) encoding for categorical features.

use super::{check_fit_input, check_transform_input, sorted_categories};
use crate::data::Column;
use crate::error::Result;
use crate::preprocessing::traits::{FittedTransformer, Transformer};
use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// Condition grades from worst to best; the rank of a grade is its index.
pub const CONDITION_GRADES: [&str; 4] = ["Worn", "Used", "Gently Used", "New"];

/// Code emitted for a value outside the known order. It ranks below every
/// known grade, so an unrecognised condition reads as worse than `Worn`.
pub const UNKNOWN_ORDINAL: f64 = -1.0;

/// Ordinal encoder.
///
/// The `condition` column always uses the fixed [`CONDITION_GRADES`] order;
/// its ranks are never learned from data. Any other column is ranked by the
/// sorted order of the categories seen at fit time.
#[derive(Clone, Debug)]
pub struct OrdinalEncoder {
    columns: Vec<Column>,
}

impl OrdinalEncoder {
    pub fn new(columns: Vec<Column>) -> Self {
        Self { columns }
    }
}

impl Transformer for OrdinalEncoder {
    type Input = [Vec<String>];
    type Output = Array2<f64>;
    type Fitted = FittedOrdinalEncoder;

    fn fit(&self, data: &[Vec<String>], _target: Option<&[f64]>) -> Result<FittedOrdinalEncoder> {
        check_fit_input("ordinal encoder", &self.columns, data)?;
        let levels = self
            .columns
            .iter()
            .zip(data)
            .map(|(column, values)| match column {
                Column::Condition => CONDITION_GRADES.iter().map(|g| g.to_string()).collect(),
                _ => sorted_categories(values),
            })
            .collect();
        Ok(FittedOrdinalEncoder {
            columns: self.columns.clone(),
            levels,
        })
    }
}

/// Fitted OrdinalEncoder ready for inference.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FittedOrdinalEncoder {
    columns: Vec<Column>,
    /// Levels per column; the rank of a level is its index.
    levels: Vec<Vec<String>>,
}

impl FittedOrdinalEncoder {
    pub fn levels(&self) -> &[Vec<String>] {
        &self.levels
    }

    fn rank(&self, col: usize, value: &str) -> f64 {
        self.levels[col]
            .iter()
            .position(|level| level == value)
            .map(|r| r as f64)
            .unwrap_or(UNKNOWN_ORDINAL)
    }
}

impl FittedTransformer for FittedOrdinalEncoder {
    type Input = [Vec<String>];
    type Output = Array2<f64>;

    fn transform(&self, data: &[Vec<String>]) -> Result<Array2<f64>> {
        let rows = check_transform_input("ordinal encoder", &self.columns, data)?;
        let mut out = Array2::zeros((rows, self.columns.len()));
        for (col, values) in data.iter().enumerate() {
            for (row, value) in values.iter().enumerate() {
                out[[row, col]] = self.rank(col, value);
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
    fn test_condition_uses_fixed_grade_order() {
        // training data only contains two grades, order still fixed
        let data = vec![col(&["New", "Used"])];
        let fitted = OrdinalEncoder::new(vec![Column::Condition]).fit(&data, None).unwrap();
        let out = fitted
            .transform(&[col(&["Worn", "Used", "Gently Used", "New"])])
            .unwrap();
        assert_eq!(out.column(0).to_vec(), vec![0.0, 1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_unknown_grade_maps_to_unknown_bucket() {
        let data = vec![col(&["New"])];
        let fitted = OrdinalEncoder::new(vec![Column::Condition]).fit(&data, None).unwrap();
        let out = fitted.transform(&[col(&["Like New"])]).unwrap();
        assert_eq!(out[[0, 0]], UNKNOWN_ORDINAL);
    }

    #[test]
    fn test_other_columns_rank_sorted_categories() {
        let data = vec![col(&["M", "L", "S"])];
        let fitted = OrdinalEncoder::new(vec![Column::Size]).fit(&data, None).unwrap();
        assert_eq!(fitted.levels()[0], col(&["L", "M", "S"]));
        let out = fitted.transform(&data).unwrap();
        assert_eq!(out.column(0).to_vec(), vec![1.0, 0.0, 2.0]);
    }

    #[test]
    fn test_ordinal_feature_names() {
        let data = vec![col(&["New"]), col(&["M"])];
        let fitted = OrdinalEncoder::new(vec![Column::Condition, Column::Size])
            .fit(&data, None)
            .unwrap();
        assert_eq!(fitted.feature_names(), vec!["condition", "size"]);
        assert_eq!(fitted.n_features_out(), 2);
    }

    #[test]
    fn test_ordinal_encoder_empty_data() {
        let result = OrdinalEncoder::new(vec![Column::Condition]).fit(&[Vec::new()], None);
        assert!(result.is_err());
    }
}
