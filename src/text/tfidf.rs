//! TF-IDF feature extraction.
//!
//! Epistemic foundation:
//! - K_i: Tokens are runs of two or more word characters, lower-cased
//! - K_i: idf = ln((1 + n) / (1 + df)) + 1 (smoothed, never zero)
//! - K_i: Every non-empty output row has unit L2 norm
//! - B_i: Document-frequency pruning may leave nothing → Result

use super::sparse::SparseMatrix;
use super::stop_words::is_stop_word;
use crate::models::{InferlabError, Result, SentimentConfig};
use regex::Regex;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::LazyLock;
use tracing::debug;

static TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\w\w+\b").expect("token pattern is valid"));

/// Split lower-cased `text` into tokens.
pub fn tokenize(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    TOKEN
        .find_iter(&lowered)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Bag-of-words vectorizer with TF-IDF weighting.
#[derive(Debug, Clone)]
pub struct TfidfVectorizer {
    sublinear_tf: bool,
    min_df: f64,
    max_df: f64,
    stop_words: bool,
    vocabulary: Vec<String>,
    index: HashMap<String, usize>,
    idf: Vec<f64>,
}

impl Default for TfidfVectorizer {
    fn default() -> Self {
        Self::new()
    }
}

impl TfidfVectorizer {
    /// Raw term frequencies, every term kept, no stop words.
    pub fn new() -> Self {
        Self {
            sublinear_tf: false,
            min_df: 0.0,
            max_df: 1.0,
            stop_words: false,
            vocabulary: Vec::new(),
            index: HashMap::new(),
            idf: Vec::new(),
        }
    }

    /// Vectorizer described by the `[sentiment]` config section.
    pub fn from_config(config: &SentimentConfig) -> Self {
        Self::new()
            .sublinear_tf(config.sublinear_tf)
            .min_df(config.min_df)
            .max_df(config.max_df)
            .stop_words(config.stop_words)
    }

    pub fn sublinear_tf(mut self, enabled: bool) -> Self {
        self.sublinear_tf = enabled;
        self
    }

    /// Drop terms found in fewer than this proportion of documents.
    pub fn min_df(mut self, proportion: f64) -> Self {
        self.min_df = proportion;
        self
    }

    /// Drop terms found in more than this proportion of documents.
    pub fn max_df(mut self, proportion: f64) -> Self {
        self.max_df = proportion;
        self
    }

    pub fn stop_words(mut self, enabled: bool) -> Self {
        self.stop_words = enabled;
        self
    }

    /// Learned vocabulary, alphabetically sorted. Column `i` is term `i`.
    pub fn vocabulary(&self) -> &[String] {
        &self.vocabulary
    }

    /// Inverse document frequency per column.
    pub fn idf(&self) -> &[f64] {
        &self.idf
    }

    fn terms(&self, text: &str) -> Vec<String> {
        let mut tokens = tokenize(text);
        if self.stop_words {
            tokens.retain(|t| !is_stop_word(t));
        }
        tokens
    }

    /// Learn vocabulary and idf from `documents`.
    pub fn fit(&mut self, documents: &[&str]) -> Result<()> {
        if documents.is_empty() {
            return Err(InferlabError::InvalidInput(
                "cannot fit a vectorizer on zero documents".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.min_df) || !(0.0..=1.0).contains(&self.max_df) {
            return Err(InferlabError::InvalidInput(
                "min_df and max_df must be proportions in [0, 1]".to_string(),
            ));
        }

        let mut document_frequency: BTreeMap<String, usize> = BTreeMap::new();
        for doc in documents {
            let unique: HashSet<String> = self.terms(doc).into_iter().collect();
            for term in unique {
                *document_frequency.entry(term).or_insert(0) += 1;
            }
        }

        let n = documents.len() as f64;
        let low = self.min_df * n;
        let high = self.max_df * n;
        if high < low {
            return Err(InferlabError::InvalidInput(
                "max_df corresponds to fewer documents than min_df".to_string(),
            ));
        }
        let total_terms = document_frequency.len();
        document_frequency.retain(|_, df| (*df as f64) >= low && (*df as f64) <= high);
        if document_frequency.is_empty() {
            return Err(InferlabError::InvalidInput(
                "after pruning, no terms remain; try a lower min_df or a higher max_df"
                    .to_string(),
            ));
        }

        // BTreeMap iteration is already alphabetical.
        self.vocabulary = document_frequency.keys().cloned().collect();
        self.idf = document_frequency
            .values()
            .map(|&df| ((1.0 + n) / (1.0 + df as f64)).ln() + 1.0)
            .collect();
        self.index = self
            .vocabulary
            .iter()
            .enumerate()
            .map(|(i, t)| (t.clone(), i))
            .collect();

        debug!(
            documents = documents.len(),
            seen = total_terms,
            kept = self.vocabulary.len(),
            "Fitted TF-IDF vocabulary"
        );
        Ok(())
    }

    /// Weight `documents` against the learned vocabulary.
    pub fn transform(&self, documents: &[&str]) -> Result<SparseMatrix> {
        if self.vocabulary.is_empty() {
            return Err(InferlabError::InvalidInput(
                "vectorizer is not fitted".to_string(),
            ));
        }
        let mut matrix = SparseMatrix::new(self.vocabulary.len());
        for doc in documents {
            let mut counts: HashMap<usize, f64> = HashMap::new();
            for term in self.terms(doc) {
                if let Some(&column) = self.index.get(&term) {
                    *counts.entry(column).or_insert(0.0) += 1.0;
                }
            }
            let mut row: Vec<(usize, f64)> = counts
                .into_iter()
                .map(|(column, tf)| {
                    let tf = if self.sublinear_tf { 1.0 + tf.ln() } else { tf };
                    (column, tf * self.idf[column])
                })
                .collect();
            let norm = row.iter().map(|(_, v)| v * v).sum::<f64>().sqrt();
            if norm > 0.0 {
                for (_, v) in &mut row {
                    *v /= norm;
                }
            }
            matrix.push_row(row)?;
        }
        Ok(matrix)
    }

    /// `fit` followed by `transform` on the same documents.
    pub fn fit_transform(&mut self, documents: &[&str]) -> Result<SparseMatrix> {
        self.fit(documents)?;
        self.transform(documents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize() {
        assert_eq!(
            tokenize("A Great, great film! (x) it's"),
            vec!["great", "great", "film", "it"]
        );
    }

    #[test]
    fn test_vocabulary_sorted_and_stop_words_removed() {
        let mut v = TfidfVectorizer::new().stop_words(true);
        v.fit(&["the zebra and the apple", "mango the"]).unwrap();
        assert_eq!(v.vocabulary(), &["apple", "mango", "zebra"]);
    }

    #[test]
    fn test_smooth_idf() {
        let mut v = TfidfVectorizer::new();
        v.fit(&["aa bb", "aa"]).unwrap();
        // aa: df = 2, bb: df = 1, n = 2
        assert!((v.idf()[0] - 1.0).abs() < 1e-12);
        assert!((v.idf()[1] - ((3.0f64 / 2.0).ln() + 1.0)).abs() < 1e-12);
    }

    #[test]
    fn test_min_df_prunes_rare_terms() {
        let mut v = TfidfVectorizer::new().min_df(0.5);
        v.fit(&["common rare", "common", "common other", "common"]).unwrap();
        assert_eq!(v.vocabulary(), &["common"]);

        let mut strict = TfidfVectorizer::new().min_df(1.0);
        assert!(strict.fit(&["aa", "bb"]).is_err());
    }

    #[test]
    fn test_rows_have_unit_norm() {
        let mut v = TfidfVectorizer::new().sublinear_tf(true);
        let x = v
            .fit_transform(&["good good good film", "bad film", "zz"])
            .unwrap();
        for row in x.rows() {
            let norm: f64 = row.iter().map(|(_, v)| v * v).sum::<f64>().sqrt();
            assert!((norm - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_sublinear_tf_weights() {
        let mut v = TfidfVectorizer::new().sublinear_tf(true);
        v.fit(&["aa bb"]).unwrap();
        let x = v.transform(&["aa aa aa bb"]).unwrap();
        // Both idf are 1; tf becomes 1 + ln 3 and 1.
        let a = 1.0 + 3.0f64.ln();
        let norm = (a * a + 1.0).sqrt();
        assert!((x.row(0)[0].1 - a / norm).abs() < 1e-12);
        assert!((x.row(0)[1].1 - 1.0 / norm).abs() < 1e-12);
    }

    #[test]
    fn test_unknown_terms_give_empty_row() {
        let mut v = TfidfVectorizer::new();
        v.fit(&["aa"]).unwrap();
        let x = v.transform(&["zz"]).unwrap();
        assert!(x.row(0).is_empty());
        assert!(TfidfVectorizer::new().transform(&["aa"]).is_err());
    }
}
