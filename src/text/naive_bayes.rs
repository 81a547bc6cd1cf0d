//! Naive Bayes classifiers over sparse feature rows.
//!
//! Epistemic foundation:
//! - K_i: Classes are the sorted distinct training labels
//! - K_i: Probabilities are computed in log space and normalized with log-sum-exp
//! - B_i: Callers may predict before fitting → Result

use super::sparse::SparseMatrix;
use crate::models::{InferlabError, Result};
use tracing::warn;

const MIN_ALPHA: f64 = 1e-10;

/// A probabilistic classifier over sparse rows.
pub trait Classifier {
    /// Short display name.
    fn name(&self) -> &'static str;

    /// Learn from rows `x` labelled `y`.
    fn fit(&mut self, x: &SparseMatrix, y: &[usize]) -> Result<()>;

    /// Sorted class labels seen during `fit`.
    fn classes(&self) -> &[usize];

    /// Unnormalized log P(c) + log P(x | c), one row per sample.
    fn joint_log_likelihood(&self, x: &SparseMatrix) -> Result<Vec<Vec<f64>>>;

    /// Log posterior per class.
    fn predict_log_proba(&self, x: &SparseMatrix) -> Result<Vec<Vec<f64>>> {
        let mut jll = self.joint_log_likelihood(x)?;
        for row in &mut jll {
            let norm = log_sum_exp(row);
            for v in row.iter_mut() {
                *v -= norm;
            }
        }
        Ok(jll)
    }

    /// Posterior per class.
    fn predict_proba(&self, x: &SparseMatrix) -> Result<Vec<Vec<f64>>> {
        let mut log_proba = self.predict_log_proba(x)?;
        for row in &mut log_proba {
            for v in row.iter_mut() {
                *v = v.exp();
            }
        }
        Ok(log_proba)
    }

    /// Most probable class per sample; ties go to the smaller label.
    fn predict(&self, x: &SparseMatrix) -> Result<Vec<usize>> {
        let classes = self.classes();
        let jll = self.joint_log_likelihood(x)?;
        Ok(jll
            .iter()
            .map(|row| {
                let best = row
                    .iter()
                    .enumerate()
                    .fold(0, |best, (i, &v)| if v > row[best] { i } else { best });
                classes[best]
            })
            .collect())
    }
}

fn log_sum_exp(values: &[f64]) -> f64 {
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if max.is_infinite() {
        return max;
    }
    max + values.iter().map(|v| (v - max).exp()).sum::<f64>().ln()
}

fn effective_alpha(alpha: f64) -> f64 {
    if alpha < MIN_ALPHA {
        warn!(alpha, clipped = MIN_ALPHA, "alpha too small, clipping");
        MIN_ALPHA
    } else {
        alpha
    }
}

/// Parameters shared by both Naive Bayes variants.
#[derive(Debug, Clone, Default)]
struct Fitted {
    classes: Vec<usize>,
    class_count: Vec<f64>,
    class_log_prior: Vec<f64>,
    /// `feature_count[class][feature]`
    feature_count: Vec<Vec<f64>>,
    n_features: usize,
}

impl Fitted {
    /// Accumulate class and per-feature counts; `value` maps a stored entry to its count.
    fn count(x: &SparseMatrix, y: &[usize], value: impl Fn(f64) -> f64) -> Result<Self> {
        if x.n_rows() != y.len() {
            return Err(InferlabError::InvalidInput(format!(
                "{} rows but {} labels",
                x.n_rows(),
                y.len()
            )));
        }
        if y.is_empty() {
            return Err(InferlabError::InvalidInput(
                "cannot fit on zero samples".to_string(),
            ));
        }
        let mut classes = y.to_vec();
        classes.sort_unstable();
        classes.dedup();

        let n_features = x.n_cols();
        let mut class_count = vec![0.0; classes.len()];
        let mut feature_count = vec![vec![0.0; n_features]; classes.len()];
        for (row, label) in x.rows().zip(y) {
            let k = classes.binary_search(label).map_err(|_| {
                InferlabError::Internal(format!("label {label} missing from classes"))
            })?;
            class_count[k] += 1.0;
            for &(c, v) in row {
                feature_count[k][c] += value(v);
            }
        }
        let total: f64 = class_count.iter().sum();
        let class_log_prior = class_count.iter().map(|c| c.ln() - total.ln()).collect();
        Ok(Self {
            classes,
            class_count,
            class_log_prior,
            feature_count,
            n_features,
        })
    }

    fn check(&self, name: &str, x: &SparseMatrix) -> Result<()> {
        if self.classes.is_empty() {
            return Err(InferlabError::InvalidInput(format!("{name} is not fitted")));
        }
        if x.n_cols() != self.n_features {
            return Err(InferlabError::InvalidInput(format!(
                "{name} was fitted on {} features, got {}",
                self.n_features,
                x.n_cols()
            )));
        }
        Ok(())
    }
}

/// Multinomial Naive Bayes for count-like features (tf, tf-idf).
#[derive(Debug, Clone)]
pub struct MultinomialNb {
    alpha: f64,
    fitted: Fitted,
    /// `feature_log_prob[class][feature]`
    feature_log_prob: Vec<Vec<f64>>,
}

impl MultinomialNb {
    pub fn new(alpha: f64) -> Self {
        Self {
            alpha,
            fitted: Fitted::default(),
            feature_log_prob: Vec::new(),
        }
    }

    /// Smoothed log P(feature | class).
    pub fn feature_log_prob(&self) -> &[Vec<f64>] {
        &self.feature_log_prob
    }
}

impl Default for MultinomialNb {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl Classifier for MultinomialNb {
    fn name(&self) -> &'static str {
        "MultinomialNB"
    }

    fn fit(&mut self, x: &SparseMatrix, y: &[usize]) -> Result<()> {
        if x.rows().flatten().any(|&(_, v)| v < 0.0) {
            return Err(InferlabError::InvalidInput(
                "negative values passed to MultinomialNB".to_string(),
            ));
        }
        let fitted = Fitted::count(x, y, |v| v)?;
        let alpha = effective_alpha(self.alpha);
        self.feature_log_prob = fitted
            .feature_count
            .iter()
            .map(|counts| {
                let total: f64 = counts.iter().map(|c| c + alpha).sum();
                counts.iter().map(|c| (c + alpha).ln() - total.ln()).collect()
            })
            .collect();
        self.fitted = fitted;
        Ok(())
    }

    fn classes(&self) -> &[usize] {
        &self.fitted.classes
    }

    fn joint_log_likelihood(&self, x: &SparseMatrix) -> Result<Vec<Vec<f64>>> {
        self.fitted.check(self.name(), x)?;
        Ok(x.rows()
            .map(|row| {
                self.feature_log_prob
                    .iter()
                    .zip(&self.fitted.class_log_prior)
                    .map(|(log_prob, prior)| {
                        prior + row.iter().map(|&(c, v)| v * log_prob[c]).sum::<f64>()
                    })
                    .collect()
            })
            .collect())
    }
}

/// Bernoulli Naive Bayes: features are binarized presence indicators.
#[derive(Debug, Clone)]
pub struct BernoulliNb {
    alpha: f64,
    binarize: f64,
    fitted: Fitted,
    /// log P(feature present | class) - log P(feature absent | class)
    presence_delta: Vec<Vec<f64>>,
    /// log P(c) + Σ log P(feature absent | c)
    absent_base: Vec<f64>,
}

impl BernoulliNb {
    /// `binarize`: values strictly above the threshold count as present.
    pub fn new(alpha: f64, binarize: f64) -> Self {
        Self {
            alpha,
            binarize,
            fitted: Fitted::default(),
            presence_delta: Vec::new(),
            absent_base: Vec::new(),
        }
    }
}

impl Default for BernoulliNb {
    fn default() -> Self {
        Self::new(1.0, 0.0)
    }
}

impl Classifier for BernoulliNb {
    fn name(&self) -> &'static str {
        "BernoulliNB"
    }

    fn fit(&mut self, x: &SparseMatrix, y: &[usize]) -> Result<()> {
        let threshold = self.binarize;
        let fitted = Fitted::count(x, y, |v| if v > threshold { 1.0 } else { 0.0 })?;
        let alpha = effective_alpha(self.alpha);

        let mut presence_delta = Vec::with_capacity(fitted.classes.len());
        let mut absent_base = Vec::with_capacity(fitted.classes.len());
        for (k, counts) in fitted.feature_count.iter().enumerate() {
            let denom = (fitted.class_count[k] + 2.0 * alpha).ln();
            let mut delta = Vec::with_capacity(counts.len());
            let mut base = fitted.class_log_prior[k];
            for c in counts {
                let log_present = (c + alpha).ln() - denom;
                let log_absent = (-log_present.exp()).ln_1p();
                delta.push(log_present - log_absent);
                base += log_absent;
            }
            presence_delta.push(delta);
            absent_base.push(base);
        }
        self.presence_delta = presence_delta;
        self.absent_base = absent_base;
        self.fitted = fitted;
        Ok(())
    }

    fn classes(&self) -> &[usize] {
        &self.fitted.classes
    }

    fn joint_log_likelihood(&self, x: &SparseMatrix) -> Result<Vec<Vec<f64>>> {
        self.fitted.check(self.name(), x)?;
        let threshold = self.binarize;
        Ok(x.rows()
            .map(|row| {
                self.presence_delta
                    .iter()
                    .zip(&self.absent_base)
                    .map(|(delta, base)| {
                        base + row
                            .iter()
                            .filter(|&&(_, v)| v > threshold)
                            .map(|&(c, _)| delta[c])
                            .sum::<f64>()
                    })
                    .collect()
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Columns: 0 = "good", 1 = "bad", 2 = "film".
    fn toy() -> (SparseMatrix, Vec<usize>) {
        let mut x = SparseMatrix::new(3);
        x.push_row(vec![(0, 2.0), (2, 1.0)]).unwrap();
        x.push_row(vec![(0, 1.0)]).unwrap();
        x.push_row(vec![(1, 2.0), (2, 1.0)]).unwrap();
        x.push_row(vec![(1, 1.0)]).unwrap();
        (x, vec![1, 1, 0, 0])
    }

    #[test]
    fn test_multinomial_feature_log_prob() {
        let (x, y) = toy();
        let mut nb = MultinomialNb::new(1.0);
        nb.fit(&x, &y).unwrap();
        assert_eq!(nb.classes(), &[0, 1]);
        // class 1 counts: good 3, bad 0, film 1 → (4, 1, 2) / 7
        let p: Vec<f64> = nb.feature_log_prob()[1].iter().map(|v| v.exp()).collect();
        assert!((p[0] - 4.0 / 7.0).abs() < 1e-12);
        assert!((p[1] - 1.0 / 7.0).abs() < 1e-12);
    }

    #[test]
    fn test_both_variants_learn_separable_toy() {
        let (x, y) = toy();
        let mut test = SparseMatrix::new(3);
        test.push_row(vec![(0, 1.0), (2, 1.0)]).unwrap();
        test.push_row(vec![(1, 3.0)]).unwrap();

        let mut classifiers: Vec<Box<dyn Classifier>> =
            vec![Box::new(MultinomialNb::default()), Box::new(BernoulliNb::default())];
        for nb in &mut classifiers {
            nb.fit(&x, &y).unwrap();
            assert_eq!(nb.predict(&test).unwrap(), vec![1, 0], "{}", nb.name());
            for row in nb.predict_proba(&test).unwrap() {
                assert!((row.iter().sum::<f64>() - 1.0).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn test_bernoulli_matches_hand_computation() {
        let (x, y) = toy();
        let mut nb = BernoulliNb::default();
        nb.fit(&x, &y).unwrap();
        let mut empty = SparseMatrix::new(3);
        empty.push_row(vec![]).unwrap();
        let jll = nb.joint_log_likelihood(&empty).unwrap();
        // class 1: P(good) = 3/4, P(bad) = 1/4, P(film) = 2/4; all absent
        let expected = 0.5f64.ln() + (0.25f64).ln() + (0.75f64).ln() + (0.5f64).ln();
        assert!((jll[0][1] - expected).abs() < 1e-12);
    }

    #[test]
    fn test_unfitted_and_mismatched() {
        let (x, y) = toy();
        assert!(MultinomialNb::default().predict(&x).is_err());
        let mut nb = BernoulliNb::default();
        assert!(nb.fit(&x, &y[..2]).is_err());
        nb.fit(&x, &y).unwrap();
        let mut wide = SparseMatrix::new(5);
        wide.push_row(vec![]).unwrap();
        assert!(nb.predict(&wide).is_err());
    }

    #[test]
    fn test_log_sum_exp() {
        let v = [1000.0, 1000.0];
        assert!((log_sum_exp(&v) - (1000.0 + 2.0f64.ln())).abs() < 1e-9);
    }
}
