//! Text feature extractor.
//!
//! Turns the configured text fields of each listing into a fixed-width
//! numeric block. Fields are either vectorized jointly (one document per
//! listing) or independently (one vectorizer and reducer per field); both
//! modes are a list of [`TextBranch`]es and share the same code.

use super::cleaner::TextCleaner;
use super::reducer::{FittedReducer, Reducer};
use super::vectorizer::{FittedTextVectorizer, TextVectorizer};
use crate::config::{TextConfig, TextMode};
use crate::data::{Listing, TextField, MISSING_PLACEHOLDER};
use crate::error::{PipelineError, Result};
use crate::preprocessing::traits::{FittedTransformer, Transformer};
use crate::union::FeatureBlock;
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use tracing::debug;

const STATS_PER_FIELD: usize = 3;

/// One vectorizer (+ optional reducer) over one document per listing.
#[derive(Clone, Debug)]
pub struct TextBranch {
    label: String,
    fields: Vec<TextField>,
    vectorizer: TextVectorizer,
    reducer: Option<Reducer>,
}

impl TextBranch {
    fn fit(&self, rows: &[Listing], cleaner: &TextCleaner) -> Result<FittedTextBranch> {
        let documents = documents(rows, &self.fields, cleaner)
            .map_err(|e| PipelineError::fit(format!("text[{}]", self.label), e.to_string()))?;
        let vectorizer = self.vectorizer.fit(&documents, None)?;
        let reducer = match &self.reducer {
            Some(reducer) => {
                let sparse = vectorizer.transform(&documents)?;
                Some(reducer.fit(&sparse, None)?)
            }
            None => None,
        };
        Ok(FittedTextBranch {
            label: self.label.clone(),
            fields: self.fields.clone(),
            vectorizer,
            reducer,
        })
    }
}

/// Fitted [`TextBranch`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FittedTextBranch {
    label: String,
    fields: Vec<TextField>,
    vectorizer: FittedTextVectorizer,
    reducer: Option<FittedReducer>,
}

impl FittedTextBranch {
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn vectorizer(&self) -> &FittedTextVectorizer {
        &self.vectorizer
    }

    pub fn reducer(&self) -> Option<&FittedReducer> {
        self.reducer.as_ref()
    }

    fn width(&self) -> usize {
        match &self.reducer {
            Some(r) => r.n_features_out(),
            None => self.vectorizer.n_features_out(),
        }
    }

    fn feature_names(&self) -> Vec<String> {
        match &self.reducer {
            Some(r) => r.feature_names(),
            None => self.vectorizer.feature_names(),
        }
    }

    fn transform(&self, rows: &[Listing], cleaner: &TextCleaner) -> Result<FeatureBlock> {
        let documents = documents(rows, &self.fields, cleaner)?;
        let sparse = self.vectorizer.transform(&documents)?;
        let values = match &self.reducer {
            Some(r) => r.transform(&sparse)?,
            None => sparse.to_dense(),
        };
        Ok(FeatureBlock::new(values, self.feature_names()))
    }
}

/// Cleaned documents, one per listing; joint branches concatenate fields.
fn documents(rows: &[Listing], fields: &[TextField], cleaner: &TextCleaner) -> Result<Vec<String>> {
    rows.iter()
        .enumerate()
        .map(|(i, row)| {
            let mut parts = Vec::with_capacity(fields.len());
            for field in fields {
                let text = row.text(*field).map_err(|e| at_row(i, e))?;
                parts.push(cleaner.clean(text));
            }
            Ok(parts.join(" "))
        })
        .collect()
}

fn at_row(row: usize, err: PipelineError) -> PipelineError {
    match err {
        PipelineError::TransformMismatch(msg) => {
            PipelineError::TransformMismatch(format!("row {}: {}", row, msg))
        }
        other => other,
    }
}

fn is_missing(text: &str) -> bool {
    let text = text.trim();
    text.is_empty() || text == MISSING_PLACEHOLDER
}

/// Length, word count and mean word length of raw text; zeros when missing.
///
/// Mean word length is total length over word count, so separators count
/// towards it.
fn text_stats(text: &str) -> [f64; STATS_PER_FIELD] {
    if is_missing(text) {
        return [0.0; STATS_PER_FIELD];
    }
    let length = text.chars().count() as f64;
    let words = text.split_whitespace().count() as f64;
    [length, words, length / words]
}

/// Unfitted text feature extractor.
#[derive(Clone, Debug)]
pub struct TextFeatureExtractor {
    fields: Vec<TextField>,
    branches: Vec<TextBranch>,
    use_stats: bool,
    use_missing_hashtags: bool,
}

impl TextFeatureExtractor {
    pub fn new(config: &TextConfig) -> Self {
        let branch = |label: String, fields: Vec<TextField>| TextBranch {
            vectorizer: TextVectorizer::new(config.vectorizer.clone(), label.clone()),
            reducer: config.reducer.clone().map(|r| Reducer::new(r, label.clone())),
            label,
            fields,
        };
        let branches = match config.mode {
            TextMode::Joint => vec![branch("text".to_string(), config.fields.clone())],
            TextMode::Independent => config
                .fields
                .iter()
                .map(|f| branch(f.to_string(), vec![*f]))
                .collect(),
        };
        Self {
            fields: config.fields.clone(),
            branches,
            use_stats: config.use_stats,
            use_missing_hashtags: config.use_missing_hashtags,
        }
    }
}

impl Transformer for TextFeatureExtractor {
    type Input = [Listing];
    type Output = FeatureBlock;
    type Fitted = FittedTextFeatureExtractor;

    fn fit(&self, rows: &[Listing], _target: Option<&[f64]>) -> Result<FittedTextFeatureExtractor> {
        if rows.is_empty() {
            return Err(PipelineError::fit("text", "cannot fit on an empty batch"));
        }
        let cleaner = TextCleaner::new();
        let branches = self
            .branches
            .iter()
            .map(|b| b.fit(rows, &cleaner))
            .collect::<Result<Vec<_>>>()?;

        let fitted = FittedTextFeatureExtractor {
            fields: self.fields.clone(),
            branches,
            use_stats: self.use_stats,
            use_missing_hashtags: self.use_missing_hashtags,
        };
        debug!(
            branches = fitted.branches.len(),
            width = fitted.n_features_out(),
            "fitted text feature extractor"
        );
        Ok(fitted)
    }
}

/// Fitted text feature extractor.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FittedTextFeatureExtractor {
    fields: Vec<TextField>,
    branches: Vec<FittedTextBranch>,
    use_stats: bool,
    use_missing_hashtags: bool,
}

impl FittedTextFeatureExtractor {
    pub fn branches(&self) -> &[FittedTextBranch] {
        &self.branches
    }

    fn stats_block(&self, rows: &[Listing]) -> Result<FeatureBlock> {
        let mut values = Array2::zeros((rows.len(), self.fields.len() * STATS_PER_FIELD));
        for (i, row) in rows.iter().enumerate() {
            for (f, field) in self.fields.iter().enumerate() {
                let text = row.text(*field).map_err(|e| at_row(i, e))?;
                for (k, v) in text_stats(text).into_iter().enumerate() {
                    values[[i, f * STATS_PER_FIELD + k]] = v;
                }
            }
        }
        Ok(FeatureBlock::new(values, self.stats_names()))
    }

    fn stats_names(&self) -> Vec<String> {
        self.fields
            .iter()
            .flat_map(|f| {
                ["length", "num_words", "avg_word_length"]
                    .into_iter()
                    .map(move |s| format!("{}_{}", f, s))
            })
            .collect()
    }

    fn hashtags_flag(&self, rows: &[Listing]) -> Result<FeatureBlock> {
        let mut values = Array2::zeros((rows.len(), 1));
        for (i, row) in rows.iter().enumerate() {
            let text = row.text(TextField::Hashtags).map_err(|e| at_row(i, e))?;
            values[[i, 0]] = if is_missing(text) { 1.0 } else { 0.0 };
        }
        Ok(FeatureBlock::new(values, vec!["is_hashtags_missing".to_string()]))
    }
}

impl FittedTransformer for FittedTextFeatureExtractor {
    type Input = [Listing];
    type Output = FeatureBlock;

    fn transform(&self, rows: &[Listing]) -> Result<FeatureBlock> {
        let cleaner = TextCleaner::new();
        let mut blocks = self
            .branches
            .iter()
            .map(|b| b.transform(rows, &cleaner))
            .collect::<Result<Vec<_>>>()?;
        if self.use_stats {
            blocks.push(self.stats_block(rows)?);
        }
        if self.use_missing_hashtags {
            blocks.push(self.hashtags_flag(rows)?);
        }
        FeatureBlock::hstack(blocks)
    }

    fn n_features_in(&self) -> usize {
        self.fields.len()
    }

    fn n_features_out(&self) -> usize {
        let branches: usize = self.branches.iter().map(FittedTextBranch::width).sum();
        let stats = if self.use_stats { self.fields.len() * STATS_PER_FIELD } else { 0 };
        branches + stats + usize::from(self.use_missing_hashtags)
    }

    fn feature_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .branches
            .iter()
            .flat_map(FittedTextBranch::feature_names)
            .collect();
        if self.use_stats {
            names.extend(self.stats_names());
        }
        if self.use_missing_hashtags {
            names.push("is_hashtags_missing".to_string());
        }
        names
    }
}
