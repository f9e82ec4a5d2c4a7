//! Text branch: cleaning, vectorization, reduction and feature extraction.
//!
//! # Example
//!
//! ```rust
//! use resale_pricer::config::{ReducerConfig, ReducerKind, TextConfig};
//! use resale_pricer::data::{Listing, TextField};
//! use resale_pricer::preprocessing::{FittedTransformer, Transformer};
//! use resale_pricer::text::TextFeatureExtractor;
//!
//! let rows: Vec<Listing> = ["black wool coat", "red leather bag", "black leather boots"]
//!     .iter()
//!     .map(|t| Listing::default().with_text(TextField::ItemName, *t).clean())
//!     .collect();
//!
//! let config = TextConfig::default()
//!     .with_reducer(Some(ReducerConfig::new(ReducerKind::TruncatedSvd, 2)));
//! let fitted = TextFeatureExtractor::new(&config).fit(&rows, None).unwrap();
//! let block = fitted.transform(&rows[..1]).unwrap();
//! assert_eq!(block.width(), fitted.n_features_out());
//! ```

pub mod cleaner;
pub mod extractor;
pub mod reducer;
pub mod vectorizer;

pub use cleaner::{lemmatize, TextCleaner};
pub use extractor::{FittedTextBranch, FittedTextFeatureExtractor, TextBranch, TextFeatureExtractor};
pub use reducer::{FittedReducer, Reducer};
pub use vectorizer::{FittedTextVectorizer, SparseRows, TextVectorizer};
