//! Bag-of-n-grams vectorization with optional tf-idf weighting.
//!
//! Documents are expected to be cleaned already (see
//! [`TextCleaner`](super::TextCleaner)); tokens are split on whitespace and
//! word n-grams are joined with a single space.
//!
//! The tf-idf variant uses the smoothed inverse document frequency
//!
//! ```text
//! idf(t) = ln((1 + n) / (1 + df(t))) + 1
//! ```
//!
//! and L2-normalises every row. Terms unseen at fit time are ignored.

use crate::config::{VectorizerConfig, VectorizerKind};
use crate::error::{PipelineError, Result};
use crate::preprocessing::traits::{FittedTransformer, Transformer};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Row-major sparse matrix; each row holds `(column, value)` pairs sorted by column.
#[derive(Clone, Debug, PartialEq)]
pub struct SparseRows {
    n_cols: usize,
    rows: Vec<Vec<(usize, f64)>>,
}

impl SparseRows {
    pub fn new(n_cols: usize, rows: Vec<Vec<(usize, f64)>>) -> Self {
        Self { n_cols, rows }
    }

    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn n_cols(&self) -> usize {
        self.n_cols
    }

    pub fn row(&self, i: usize) -> &[(usize, f64)] {
        &self.rows[i]
    }

    /// Number of stored entries.
    pub fn nnz(&self) -> usize {
        self.rows.iter().map(Vec::len).sum()
    }

    pub fn to_dense(&self) -> Array2<f64> {
        let mut out = Array2::zeros((self.rows.len(), self.n_cols));
        for (i, row) in self.rows.iter().enumerate() {
            for &(j, v) in row {
                out[[i, j]] = v;
            }
        }
        out
    }
}

fn ngrams(document: &str, (lo, hi): (usize, usize)) -> Vec<String> {
    let tokens: Vec<&str> = document.split_whitespace().collect();
    let mut out = Vec::new();
    for n in lo..=hi {
        if n > tokens.len() {
            break;
        }
        out.extend(tokens.windows(n).map(|w| w.join(" ")));
    }
    out
}

/// Unfitted text vectorizer.
#[derive(Clone, Debug)]
pub struct TextVectorizer {
    config: VectorizerConfig,
    label: String,
}

impl TextVectorizer {
    /// `label` names the vectorized field in errors and feature names.
    pub fn new(config: VectorizerConfig, label: impl Into<String>) -> Self {
        Self {
            config,
            label: label.into(),
        }
    }

    fn component(&self) -> String {
        format!("text vectorizer[{}]", self.label)
    }
}

impl Transformer for TextVectorizer {
    type Input = [String];
    type Output = SparseRows;
    type Fitted = FittedTextVectorizer;

    fn fit(&self, documents: &[String], _target: Option<&[f64]>) -> Result<FittedTextVectorizer> {
        if documents.is_empty() {
            return Err(PipelineError::fit(self.component(), "no documents to fit on"));
        }
        let n_docs = documents.len();

        // term -> (document frequency, corpus frequency)
        let mut stats: BTreeMap<String, (usize, usize)> = BTreeMap::new();
        for document in documents {
            let mut counts: BTreeMap<String, usize> = BTreeMap::new();
            for gram in ngrams(document, self.config.ngram_range) {
                *counts.entry(gram).or_insert(0) += 1;
            }
            for (term, count) in counts {
                let entry = stats.entry(term).or_insert((0, 0));
                entry.0 += 1;
                entry.1 += count;
            }
        }

        let max_doc_count = self.config.max_df * n_docs as f64;
        let mut kept: Vec<(String, usize, usize)> = stats
            .into_iter()
            .filter(|(_, (df, _))| *df >= self.config.min_df && *df as f64 <= max_doc_count)
            .map(|(term, (df, tf))| (term, df, tf))
            .collect();

        if let Some(limit) = self.config.max_features {
            if kept.len() > limit {
                kept.sort_by(|a, b| b.2.cmp(&a.2).then_with(|| a.0.cmp(&b.0)));
                kept.truncate(limit);
                kept.sort_by(|a, b| a.0.cmp(&b.0));
            }
        }

        if kept.is_empty() {
            return Err(PipelineError::fit(
                self.component(),
                format!(
                    "empty vocabulary after document-frequency filtering \
                     (min_df={}, max_df={}, documents={})",
                    self.config.min_df, self.config.max_df, n_docs
                ),
            ));
        }

        let idf = match self.config.kind {
            VectorizerKind::Tfidf => Some(
                kept.iter()
                    .map(|(_, df, _)| ((1.0 + n_docs as f64) / (1.0 + *df as f64)).ln() + 1.0)
                    .collect(),
            ),
            VectorizerKind::Count => None,
        };
        let vocabulary = kept
            .into_iter()
            .enumerate()
            .map(|(i, (term, _, _))| (term, i))
            .collect::<BTreeMap<_, _>>();

        debug!(
            field = %self.label,
            kind = %self.config.kind,
            vocabulary = vocabulary.len(),
            documents = n_docs,
            "fitted text vectorizer"
        );

        Ok(FittedTextVectorizer {
            label: self.label.clone(),
            ngram_range: self.config.ngram_range,
            vocabulary,
            idf,
        })
    }
}

/// Fitted vectorizer: vocabulary plus idf weights for tf-idf.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FittedTextVectorizer {
    label: String,
    ngram_range: (usize, usize),
    vocabulary: BTreeMap<String, usize>,
    idf: Option<Vec<f64>>,
}

impl FittedTextVectorizer {
    /// Term to column index; columns follow lexicographic term order.
    pub fn vocabulary(&self) -> &BTreeMap<String, usize> {
        &self.vocabulary
    }

    pub fn idf(&self) -> Option<&[f64]> {
        self.idf.as_deref()
    }

    fn vectorize(&self, document: &str) -> Vec<(usize, f64)> {
        let mut counts: BTreeMap<usize, f64> = BTreeMap::new();
        for gram in ngrams(document, self.ngram_range) {
            if let Some(&j) = self.vocabulary.get(&gram) {
                *counts.entry(j).or_insert(0.0) += 1.0;
            }
        }
        let mut row: Vec<(usize, f64)> = counts.into_iter().collect();
        if let Some(idf) = &self.idf {
            for (j, v) in row.iter_mut() {
                *v *= idf[*j];
            }
            let norm = row.iter().map(|(_, v)| v * v).sum::<f64>().sqrt();
            if norm > 0.0 {
                for (_, v) in row.iter_mut() {
                    *v /= norm;
                }
            }
        }
        row
    }
}

impl FittedTransformer for FittedTextVectorizer {
    type Input = [String];
    type Output = SparseRows;

    fn transform(&self, documents: &[String]) -> Result<SparseRows> {
        let rows = documents.iter().map(|d| self.vectorize(d)).collect();
        Ok(SparseRows::new(self.vocabulary.len(), rows))
    }

    fn n_features_in(&self) -> usize {
        1
    }

    fn n_features_out(&self) -> usize {
        self.vocabulary.len()
    }

    fn feature_names(&self) -> Vec<String> {
        self.vocabulary
            .keys()
            .map(|term| format!("{}_{}", self.label, term.replace(' ', "_")))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn docs(texts: &[&str]) -> Vec<String> {
        texts.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_ngrams_range() {
        assert_eq!(ngrams("a b c", (1, 2)), vec!["a", "b", "c", "a b", "b c"]);
        assert_eq!(ngrams("a", (2, 3)), Vec::<String>::new());
    }

    #[test]
    fn test_count_vectorizer_sorted_vocabulary() {
        let corpus = docs(&["red coat", "black coat coat"]);
        let fitted = TextVectorizer::new(VectorizerConfig::new(VectorizerKind::Count), "text")
            .fit(&corpus, None)
            .unwrap();
        let terms: Vec<&str> = fitted.vocabulary().keys().map(String::as_str).collect();
        assert_eq!(terms, vec!["black", "coat", "red"]);
        let dense = fitted.transform(&corpus).unwrap().to_dense();
        assert_eq!(dense.row(1).to_vec(), vec![1.0, 2.0, 0.0]);
    }

    #[test]
    fn test_tfidf_matches_smoothed_formula() {
        let corpus = docs(&["red coat", "black coat"]);
        let fitted = TextVectorizer::new(VectorizerConfig::default().with_ngram_range(1, 1), "text")
            .fit(&corpus, None)
            .unwrap();
        let idf = fitted.idf().unwrap();
        // coat appears in both documents, red and black in one
        assert_abs_diff_eq!(idf[1], 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(idf[2], (3.0f64 / 2.0).ln() + 1.0, epsilon = 1e-12);

        let dense = fitted.transform(&corpus).unwrap().to_dense();
        let norm: f64 = dense.row(0).iter().map(|v| v * v).sum::<f64>().sqrt();
        assert_abs_diff_eq!(norm, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_min_df_filters_rare_terms() {
        let corpus = docs(&["coat red", "coat blue", "coat red"]);
        let config = VectorizerConfig::new(VectorizerKind::Count)
            .with_ngram_range(1, 1)
            .with_min_df(2);
        let fitted = TextVectorizer::new(config, "text").fit(&corpus, None).unwrap();
        assert_eq!(fitted.n_features_out(), 2);
        assert!(!fitted.vocabulary().contains_key("blue"));
    }

    #[test]
    fn test_max_features_keeps_most_frequent() {
        let corpus = docs(&["a a a b b c", "c d"]);
        let config = VectorizerConfig::new(VectorizerKind::Count)
            .with_ngram_range(1, 1)
            .with_max_features(Some(2));
        let fitted = TextVectorizer::new(config, "text").fit(&corpus, None).unwrap();
        let terms: Vec<&str> = fitted.vocabulary().keys().map(String::as_str).collect();
        assert_eq!(terms, vec!["a", "b"]);
    }

    #[test]
    fn test_empty_vocabulary_names_field() {
        let corpus = docs(&["one", "two"]);
        let config = VectorizerConfig::default().with_min_df(5);
        let err = TextVectorizer::new(config, "description").fit(&corpus, None).unwrap_err();
        match err {
            PipelineError::Fit { component, detail } => {
                assert_eq!(component, "text vectorizer[description]");
                assert!(detail.contains("empty vocabulary"));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_unseen_terms_ignored() {
        let corpus = docs(&["red coat"]);
        let fitted = TextVectorizer::new(VectorizerConfig::default(), "text")
            .fit(&corpus, None)
            .unwrap();
        let out = fitted.transform(&docs(&["green hat"])).unwrap();
        assert_eq!(out.n_rows(), 1);
        assert_eq!(out.nnz(), 0);
    }

    #[test]
    fn test_feature_names_join_ngrams() {
        let corpus = docs(&["red coat"]);
        let fitted = TextVectorizer::new(VectorizerConfig::default(), "item_name")
            .fit(&corpus, None)
            .unwrap();
        assert_eq!(
            fitted.feature_names(),
            vec!["item_name_coat", "item_name_red", "item_name_red_coat"]
        );
    }
}
