//! One-hot encoding for categorical features.

use super::{check_fit_input, check_transform_input, sorted_categories};
use crate::data::Column;
use crate::error::Result;
use crate::preprocessing::traits::{FittedTransformer, Transformer};
use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// One-hot encoder for low-cardinality categorical columns.
///
/// Learns the sorted set of categories per column. Output columns are named
/// `"{column}_{category}"`; a category unseen at fit time produces an
/// all-zero block for its column.
///
/// # Example
/// ```rust
/// use resale_pricer::data::Column;
/// use resale_pricer::preprocessing::{FittedTransformer, OneHotEncoder, Transformer};
///
/// let data = vec![vec!["menswear".to_string(), "womenswear".to_string()]];
/// let fitted = OneHotEncoder::new(vec![Column::Department]).fit(&data, None).unwrap();
/// assert_eq!(fitted.feature_names(), vec!["department_menswear", "department_womenswear"]);
/// ```
#[derive(Clone, Debug)]
pub struct OneHotEncoder {
    columns: Vec<Column>,
}

impl OneHotEncoder {
    pub fn new(columns: Vec<Column>) -> Self {
        Self { columns }
    }
}

impl Transformer for OneHotEncoder {
    type Input = [Vec<String>];
    type Output = Array2<f64>;
    type Fitted = FittedOneHotEncoder;

    fn fit(&self, data: &[Vec<String>], _target: Option<&[f64]>) -> Result<FittedOneHotEncoder> {
        check_fit_input("one-hot encoder", &self.columns, data)?;
        let categories: Vec<Vec<String>> = data.iter().map(|col| sorted_categories(col)).collect();
        Ok(FittedOneHotEncoder {
            columns: self.columns.clone(),
            categories,
        })
    }
}

/// Fitted OneHotEncoder ready for inference.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FittedOneHotEncoder {
    columns: Vec<Column>,
    /// Sorted categories per input column.
    categories: Vec<Vec<String>>,
}

impl FittedOneHotEncoder {
    /// Categories learned for each column.
    pub fn categories(&self) -> &[Vec<String>] {
        &self.categories
    }
}

impl FittedTransformer for FittedOneHotEncoder {
    type Input = [Vec<String>];
    type Output = Array2<f64>;

    fn transform(&self, data: &[Vec<String>]) -> Result<Array2<f64>> {
        let rows = check_transform_input("one-hot encoder", &self.columns, data)?;
        let mut out = Array2::zeros((rows, self.n_features_out()));

        let mut offset = 0;
        for (values, cats) in data.iter().zip(&self.categories) {
            for (row, value) in values.iter().enumerate() {
                if let Ok(idx) = cats.binary_search(value) {
                    out[[row, offset + idx]] = 1.0;
                }
            }
            offset += cats.len();
        }
        Ok(out)
    }

    fn n_features_in(&self) -> usize {
        self.columns.len()
    }

    fn n_features_out(&self) -> usize {
        self.categories.iter().map(Vec::len).sum()
    }

    fn feature_names(&self) -> Vec<String> {
        self.columns
            .iter()
            .zip(&self.categories)
            .flat_map(|(column, cats)| cats.iter().map(move |c| format!("{}_{}", column, c)))
            .collect()
    }
}
