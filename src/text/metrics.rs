//! Classification metrics for label vectors and score vectors.
//!
//! Binary scores treat label 1 as positive. Ratios with a zero denominator
//! are reported as 0 (with a warning), like the usual toolkits do.

use super::validation::POSITIVE_LABEL;
use crate::models::{InferlabError, Result};
use serde::Serialize;
use std::collections::BTreeSet;
use tracing::warn;

/// Averaging mode for multi-label summaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Average {
    /// Pool all decisions before computing the ratio.
    Micro,
    /// Unweighted mean of the per-class ratios.
    Macro,
}

/// Precision, recall and F1 for one averaging mode.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PrfSupport {
    pub precision: f64,
    pub recall: f64,
    pub fscore: f64,
    /// Only reported per class; averaged results carry `None`.
    pub support: Option<usize>,
}

fn check_lengths<T>(y_true: &[usize], other: &[T]) -> Result<()> {
    if y_true.len() != other.len() {
        return Err(InferlabError::InvalidInput(format!(
            "{} true labels but {} predictions",
            y_true.len(),
            other.len()
        )));
    }
    if y_true.is_empty() {
        return Err(InferlabError::InvalidInput("no samples to score".to_string()));
    }
    Ok(())
}

fn ratio(numerator: f64, denominator: f64, what: &str) -> f64 {
    if denominator == 0.0 {
        warn!(metric = what, "Ill-defined ratio, reporting 0");
        0.0
    } else {
        numerator / denominator
    }
}

fn f_beta(precision: f64, recall: f64) -> f64 {
    if precision + recall == 0.0 {
        0.0
    } else {
        2.0 * precision * recall / (precision + recall)
    }
}

/// (true positives, predicted positives, actual positives) for `label`.
fn counts(y_true: &[usize], y_pred: &[usize], label: usize) -> (f64, f64, f64) {
    let mut tp = 0.0;
    let mut predicted = 0.0;
    let mut actual = 0.0;
    for (&t, &p) in y_true.iter().zip(y_pred) {
        if p == label {
            predicted += 1.0;
            if t == label {
                tp += 1.0;
            }
        }
        if t == label {
            actual += 1.0;
        }
    }
    (tp, predicted, actual)
}

/// Fraction of exact matches.
pub fn accuracy_score(y_true: &[usize], y_pred: &[usize]) -> Result<f64> {
    check_lengths(y_true, y_pred)?;
    let correct = y_true.iter().zip(y_pred).filter(|(t, p)| t == p).count();
    Ok(correct as f64 / y_true.len() as f64)
}

pub fn precision_score(y_true: &[usize], y_pred: &[usize]) -> Result<f64> {
    check_lengths(y_true, y_pred)?;
    let (tp, predicted, _) = counts(y_true, y_pred, POSITIVE_LABEL);
    Ok(ratio(tp, predicted, "precision"))
}

pub fn recall_score(y_true: &[usize], y_pred: &[usize]) -> Result<f64> {
    check_lengths(y_true, y_pred)?;
    let (tp, _, actual) = counts(y_true, y_pred, POSITIVE_LABEL);
    Ok(ratio(tp, actual, "recall"))
}

pub fn f1_score(y_true: &[usize], y_pred: &[usize]) -> Result<f64> {
    Ok(f_beta(precision_score(y_true, y_pred)?, recall_score(y_true, y_pred)?))
}

/// Area under the precision-recall step curve.
///
/// AP = Σ (R_n - R_{n-1}) P_n over distinct score thresholds, highest first.
pub fn average_precision_score(y_true: &[usize], y_score: &[f64]) -> Result<f64> {
    check_lengths(y_true, y_score)?;
    let positives = y_true.iter().filter(|&&t| t == POSITIVE_LABEL).count() as f64;
    if positives == 0.0 {
        return Err(InferlabError::UndefinedMetric(
            "average precision needs at least one positive sample".to_string(),
        ));
    }
    let mut order: Vec<usize> = (0..y_score.len()).collect();
    order.sort_by(|&a, &b| y_score[b].total_cmp(&y_score[a]));

    let mut tp = 0.0;
    let mut seen = 0.0;
    let mut previous_recall = 0.0;
    let mut ap = 0.0;
    let mut i = 0;
    while i < order.len() {
        let threshold = y_score[order[i]];
        while i < order.len() && y_score[order[i]] == threshold {
            if y_true[order[i]] == POSITIVE_LABEL {
                tp += 1.0;
            }
            seen += 1.0;
            i += 1;
        }
        let recall = tp / positives;
        ap += (recall - previous_recall) * (tp / seen);
        previous_recall = recall;
    }
    Ok(ap)
}

/// Rank-based ROC AUC (Mann-Whitney U); tied scores share their mean rank.
///
/// For a binary target micro and macro averaging coincide, so no mode is taken.
pub fn roc_auc_score(y_true: &[usize], y_score: &[f64]) -> Result<f64> {
    check_lengths(y_true, y_score)?;
    let distinct: BTreeSet<usize> = y_true.iter().copied().collect();
    if distinct.len() != 2 || !distinct.contains(&POSITIVE_LABEL) {
        return Err(InferlabError::UndefinedMetric(format!(
            "ROC AUC needs exactly two classes including {POSITIVE_LABEL}, got {distinct:?}"
        )));
    }

    let mut order: Vec<usize> = (0..y_score.len()).collect();
    order.sort_by(|&a, &b| y_score[a].total_cmp(&y_score[b]));
    let mut ranks = vec![0.0; order.len()];
    let mut i = 0;
    while i < order.len() {
        let mut j = i;
        while j + 1 < order.len() && y_score[order[j + 1]] == y_score[order[i]] {
            j += 1;
        }
        // 1-based ranks i+1..=j+1 averaged
        let mean_rank = (i + j) as f64 / 2.0 + 1.0;
        for &k in &order[i..=j] {
            ranks[k] = mean_rank;
        }
        i = j + 1;
    }

    let positives = y_true.iter().filter(|&&t| t == POSITIVE_LABEL).count() as f64;
    let negatives = y_true.len() as f64 - positives;
    let rank_sum: f64 = ranks
        .iter()
        .zip(y_true)
        .filter(|&(_, &t)| t == POSITIVE_LABEL)
        .map(|(r, _)| r)
        .sum();
    Ok((rank_sum - positives * (positives + 1.0) / 2.0) / (positives * negatives))
}

/// Agreement between two labelings corrected for chance.
pub fn cohen_kappa_score(y_a: &[usize], y_b: &[usize]) -> Result<f64> {
    check_lengths(y_a, y_b)?;
    let labels: Vec<usize> = y_a.iter().chain(y_b).copied().collect::<BTreeSet<_>>().into_iter().collect();
    let n = y_a.len() as f64;
    let observed = y_a.iter().zip(y_b).filter(|(a, b)| a == b).count() as f64 / n;
    let expected: f64 = labels
        .iter()
        .map(|label| {
            let a = y_a.iter().filter(|&&v| v == *label).count() as f64;
            let b = y_b.iter().filter(|&&v| v == *label).count() as f64;
            a * b
        })
        .sum::<f64>()
        / (n * n);
    if expected == 1.0 {
        return Err(InferlabError::UndefinedMetric(
            "kappa is undefined when both raters use a single label".to_string(),
        ));
    }
    Ok((observed - expected) / (1.0 - expected))
}

/// Precision, recall and F1 over every label present in either vector.
pub fn precision_recall_fscore_support(
    y_true: &[usize],
    y_pred: &[usize],
    average: Average,
) -> Result<PrfSupport> {
    check_lengths(y_true, y_pred)?;
    let labels: BTreeSet<usize> = y_true.iter().chain(y_pred).copied().collect();
    let per_label: Vec<(f64, f64, f64)> = labels
        .iter()
        .map(|&label| counts(y_true, y_pred, label))
        .collect();

    let (precision, recall, fscore) = match average {
        Average::Micro => {
            let tp: f64 = per_label.iter().map(|c| c.0).sum();
            let predicted: f64 = per_label.iter().map(|c| c.1).sum();
            let actual: f64 = per_label.iter().map(|c| c.2).sum();
            let p = ratio(tp, predicted, "precision");
            let r = ratio(tp, actual, "recall");
            (p, r, f_beta(p, r))
        }
        Average::Macro => {
            let k = per_label.len() as f64;
            let mut sums = (0.0, 0.0, 0.0);
            for &(tp, predicted, actual) in &per_label {
                let p = ratio(tp, predicted, "precision");
                let r = ratio(tp, actual, "recall");
                sums.0 += p;
                sums.1 += r;
                sums.2 += f_beta(p, r);
            }
            (sums.0 / k, sums.1 / k, sums.2 / k)
        }
    };
    Ok(PrfSupport {
        precision,
        recall,
        fscore,
        support: None,
    })
}
