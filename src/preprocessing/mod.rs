//! Tabular preprocessing: encoders, scaling and size normalisation.
//!
//! Every transformer comes as an unfitted/fitted pair. The unfitted type holds
//! hyperparameters and implements [`Transformer`]; `fit` returns the fitted
//! type, which implements [`FittedTransformer`] and is pure data that can be
//! saved and loaded with bincode.
//!
//! # Example
//!
//! ```rust
//! use resale_pricer::data::Column;
//! use resale_pricer::preprocessing::{FittedTransformer, OneHotEncoder, Transformer};
//!
//! let data = vec![vec!["tops".to_string(), "footwear".to_string()]];
//! let fitted = OneHotEncoder::new(vec![Column::Category]).fit(&data, None).unwrap();
//! assert_eq!(fitted.feature_names(), vec!["category_footwear", "category_tops"]);
//! ```

pub mod encoding;
pub mod scaler;
pub mod size;
pub mod tabular;
pub mod traits;

pub use encoding::{
    FittedLabelEncoder, FittedOneHotEncoder, FittedOrdinalEncoder, FittedTargetEncoder,
    LabelEncoder, OneHotEncoder, OrdinalEncoder, TargetEncoder, CONDITION_GRADES, UNKNOWN_ORDINAL,
};
pub use scaler::{FittedStandardScaler, StandardScaler};
pub use size::SizeNormalizer;
pub use tabular::{FittedTabularStep, FittedTabularTransformer, TabularStep, TabularTransformer};
pub use traits::{FittedTransformer, Transformer};
