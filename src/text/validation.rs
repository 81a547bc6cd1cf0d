//! Cross-validation: fold assignment, per-fold scoring, out-of-fold predictions.
//!
//! Epistemic foundation:
//! - K_i: The test sets of a fold strategy partition the samples
//! - K_i: Stratified folds are deterministic (no shuffling)
//! - B_i: Too few members of a class for the fold count → Result

use super::metrics::{accuracy_score, average_precision_score, f1_score, precision_score, recall_score};
use super::naive_bayes::Classifier;
use super::sparse::SparseMatrix;
use crate::models::{InferlabError, Result};
use indicatif::ProgressBar;
use serde::Serialize;
use std::collections::BTreeSet;
use std::time::Instant;
use tracing::{debug, warn};

/// Positive class for binary scores.
pub const POSITIVE_LABEL: usize = 1;

/// One train/test split, as sample indices in ascending order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Split {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// How samples are assigned to folds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FoldStrategy {
    /// Class-balanced contiguous folds.
    Stratified { folds: usize },
    /// One fold id per sample, e.g. the folds encoded in corpus file names.
    Predefined(Vec<usize>),
}

impl FoldStrategy {
    /// Train/test splits for labels `y`.
    pub fn split(&self, y: &[usize]) -> Result<Vec<Split>> {
        match self {
            Self::Stratified { folds } => stratified_k_fold(y, *folds),
            Self::Predefined(fold_ids) => {
                if fold_ids.len() != y.len() {
                    return Err(InferlabError::InvalidInput(format!(
                        "{} fold ids for {} samples",
                        fold_ids.len(),
                        y.len()
                    )));
                }
                predefined_split(fold_ids)
            }
        }
    }
}

fn splits_from_test_folds(test_folds: &[usize], n_splits: usize) -> Vec<Split> {
    (0..n_splits)
        .map(|fold| {
            let (test, train): (Vec<usize>, Vec<usize>) =
                (0..test_folds.len()).partition(|&i| test_folds[i] == fold);
            Split { train, test }
        })
        .collect()
}

/// Stratified k-fold without shuffling.
///
/// Sorted labels are dealt round-robin into the folds to decide how many
/// members of each class every fold gets; each class then fills folds
/// 0, 1, 2, ... with its samples in data order.
pub fn stratified_k_fold(y: &[usize], n_splits: usize) -> Result<Vec<Split>> {
    if n_splits < 2 {
        return Err(InferlabError::InvalidInput(format!(
            "need at least 2 folds, got {n_splits}"
        )));
    }
    if n_splits > y.len() {
        return Err(InferlabError::InvalidInput(format!(
            "cannot split {} samples into {n_splits} folds",
            y.len()
        )));
    }

    // Classes encoded by order of first appearance.
    let mut classes: Vec<usize> = Vec::new();
    let encoded: Vec<usize> = y
        .iter()
        .map(|label| match classes.iter().position(|c| c == label) {
            Some(k) => k,
            None => {
                classes.push(*label);
                classes.len() - 1
            }
        })
        .collect();
    let n_classes = classes.len();
    let mut class_counts = vec![0usize; n_classes];
    for &k in &encoded {
        class_counts[k] += 1;
    }
    if class_counts.iter().all(|&c| n_splits > c) {
        return Err(InferlabError::InvalidInput(format!(
            "{n_splits} folds is more than the members of every class"
        )));
    }
    if let Some(&least) = class_counts.iter().min()
        && least < n_splits
    {
        warn!(least, folds = n_splits, "Least populated class has fewer members than folds");
    }

    let mut order = encoded.clone();
    order.sort_unstable();
    let mut allocation = vec![vec![0usize; n_classes]; n_splits];
    for (i, &k) in order.iter().enumerate() {
        allocation[i % n_splits][k] += 1;
    }

    let mut test_folds = vec![0usize; y.len()];
    for k in 0..n_classes {
        let folds_for_class = (0..n_splits).flat_map(|f| std::iter::repeat_n(f, allocation[f][k]));
        let members = encoded.iter().enumerate().filter(|&(_, &c)| c == k).map(|(i, _)| i);
        for (sample, fold) in members.zip(folds_for_class) {
            test_folds[sample] = fold;
        }
    }
    Ok(splits_from_test_folds(&test_folds, n_splits))
}

/// One split per distinct fold id, in ascending id order.
pub fn predefined_split(fold_ids: &[usize]) -> Result<Vec<Split>> {
    let distinct: Vec<usize> = fold_ids.iter().copied().collect::<BTreeSet<_>>().into_iter().collect();
    if distinct.len() < 2 {
        return Err(InferlabError::InvalidInput(
            "predefined folds need at least 2 distinct fold ids".to_string(),
        ));
    }
    let dense: Vec<usize> = fold_ids
        .iter()
        .map(|id| distinct.partition_point(|d| d < id))
        .collect();
    Ok(splits_from_test_folds(&dense, distinct.len()))
}

/// Scores of one fold.
#[derive(Debug, Clone, Serialize)]
pub struct FoldScores {
    pub fit_time: f64,
    pub score_time: f64,
    pub test_accuracy: f64,
    pub test_average_precision: f64,
    pub test_precision: f64,
    pub test_recall: f64,
    pub test_f1: f64,
}

/// Scores of every fold, in fold order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CrossValidation {
    pub folds: Vec<FoldScores>,
}

impl CrossValidation {
    /// Mean of one score across folds.
    pub fn mean(&self, score: impl Fn(&FoldScores) -> f64) -> f64 {
        if self.folds.is_empty() {
            return 0.0;
        }
        self.folds.iter().map(score).sum::<f64>() / self.folds.len() as f64
    }
}

fn positive_column<C: Classifier>(estimator: &C) -> Result<usize> {
    estimator
        .classes()
        .iter()
        .position(|&c| c == POSITIVE_LABEL)
        .ok_or_else(|| {
            InferlabError::UndefinedMetric(format!(
                "training fold has no samples of class {POSITIVE_LABEL}"
            ))
        })
}

/// Fit a fresh clone of `estimator` on every split and score its test set.
pub fn cross_validate<C: Classifier + Clone>(
    estimator: &C,
    x: &SparseMatrix,
    y: &[usize],
    splits: &[Split],
    pb: &ProgressBar,
) -> Result<CrossValidation> {
    if x.n_rows() != y.len() {
        return Err(InferlabError::InvalidInput(format!(
            "{} rows but {} labels",
            x.n_rows(),
            y.len()
        )));
    }
    let mut result = CrossValidation::default();
    for (i, split) in splits.iter().enumerate() {
        let mut model = estimator.clone();
        let y_train: Vec<usize> = split.train.iter().map(|&s| y[s]).collect();
        let y_test: Vec<usize> = split.test.iter().map(|&s| y[s]).collect();
        let x_train = x.select_rows(&split.train);
        let x_test = x.select_rows(&split.test);

        let started = Instant::now();
        model.fit(&x_train, &y_train)?;
        let fit_time = started.elapsed().as_secs_f64();

        let started = Instant::now();
        let predicted = model.predict(&x_test)?;
        let proba = model.predict_proba(&x_test)?;
        let column = positive_column(&model)?;
        let positive_scores: Vec<f64> = proba.iter().map(|row| row[column]).collect();
        let test_accuracy = accuracy_score(&y_test, &predicted)?;
        let test_average_precision = average_precision_score(&y_test, &positive_scores)?;
        let test_precision = precision_score(&y_test, &predicted)?;
        let test_recall = recall_score(&y_test, &predicted)?;
        let test_f1 = f1_score(&y_test, &predicted)?;
        let scores = FoldScores {
            fit_time,
            score_time: started.elapsed().as_secs_f64(),
            test_accuracy,
            test_average_precision,
            test_precision,
            test_recall,
            test_f1,
        };
        debug!(
            fold = i,
            train = split.train.len(),
            test = split.test.len(),
            accuracy = scores.test_accuracy,
            "Scored fold"
        );
        result.folds.push(scores);
        pb.inc(1);
    }
    Ok(result)
}

/// Out-of-fold prediction for every sample.
///
/// K_i: Requires the splits' test sets to cover every sample exactly once.
pub fn cross_val_predict<C: Classifier + Clone>(
    estimator: &C,
    x: &SparseMatrix,
    y: &[usize],
    splits: &[Split],
    pb: &ProgressBar,
) -> Result<Vec<usize>> {
    let mut predictions: Vec<Option<usize>> = vec![None; y.len()];
    for split in splits {
        let mut model = estimator.clone();
        let y_train: Vec<usize> = split.train.iter().map(|&s| y[s]).collect();
        model.fit(&x.select_rows(&split.train), &y_train)?;
        let predicted = model.predict(&x.select_rows(&split.test))?;
        for (&sample, label) in split.test.iter().zip(predicted) {
            if predictions[sample].replace(label).is_some() {
                return Err(InferlabError::InvalidInput(format!(
                    "sample {sample} is in more than one test set"
                )));
            }
        }
        pb.inc(1);
    }
    predictions
        .into_iter()
        .enumerate()
        .map(|(i, p)| {
            p.ok_or_else(|| InferlabError::InvalidInput(format!("sample {i} is in no test set")))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::naive_bayes::MultinomialNb;

    #[test]
    fn test_stratified_folds_partition_and_balance() {
        let y = vec![1, 1, 1, 1, 1, 1, 0, 0, 0, 0, 0, 0];
        let splits = stratified_k_fold(&y, 3).unwrap();
        assert_eq!(splits.len(), 3);
        let mut seen: Vec<usize> = splits.iter().flat_map(|s| s.test.clone()).collect();
        seen.sort_unstable();
        assert_eq!(seen, (0..12).collect::<Vec<_>>());
        for split in &splits {
            let positives = split.test.iter().filter(|&&i| y[i] == 1).count();
            assert_eq!(positives, 2);
            assert_eq!(split.test.len(), 4);
            assert_eq!(split.train.len() + split.test.len(), 12);
        }
        // Contiguous in data order per class.
        assert_eq!(splits[0].test, vec![0, 1, 6, 7]);
    }

    #[test]
    fn test_stratified_uneven_allocation() {
        // 3 of class 7, 2 of class 3: sorted encoded order is 0,0,0,1,1
        let y = vec![7, 3, 7, 3, 7];
        let splits = stratified_k_fold(&y, 2).unwrap();
        // fold 0 gets order[0], order[2], order[4] → two of class 7, one of class 3
        assert_eq!(splits[0].test, vec![0, 1, 2]);
        assert_eq!(splits[1].test, vec![3, 4]);
    }

    #[test]
    fn test_stratified_rejects_bad_fold_counts() {
        assert!(stratified_k_fold(&[0, 1, 0, 1], 1).is_err());
        assert!(stratified_k_fold(&[0, 1, 0, 1], 5).is_err());
        assert!(stratified_k_fold(&[0, 1, 0, 1, 0], 4).is_err());
    }

    #[test]
    fn test_predefined_split() {
        let splits = predefined_split(&[3, 1, 3, 2]).unwrap();
        assert_eq!(splits.len(), 3);
        assert_eq!(splits[0].test, vec![1]);
        assert_eq!(splits[2].test, vec![0, 2]);
        assert_eq!(splits[2].train, vec![1, 3]);
        assert!(predefined_split(&[1, 1]).is_err());
        assert!(FoldStrategy::Predefined(vec![1, 2]).split(&[0]).is_err());
    }

    fn separable() -> (SparseMatrix, Vec<usize>) {
        let mut x = SparseMatrix::new(2);
        let mut y = Vec::new();
        for i in 0..10 {
            let label = i % 2;
            x.push_row(vec![(label, 1.0)]).unwrap();
            y.push(label);
        }
        (x, y)
    }

    #[test]
    fn test_cross_validate_perfect_on_separable_data() {
        let (x, y) = separable();
        let splits = stratified_k_fold(&y, 5).unwrap();
        let cv = cross_validate(&MultinomialNb::default(), &x, &y, &splits, &ProgressBar::hidden())
            .unwrap();
        assert_eq!(cv.folds.len(), 5);
        assert!((cv.mean(|f| f.test_accuracy) - 1.0).abs() < 1e-12);
        assert!((cv.mean(|f| f.test_average_precision) - 1.0).abs() < 1e-12);
        assert!((cv.mean(|f| f.test_f1) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_cross_val_predict_covers_every_sample() {
        let (x, y) = separable();
        let splits = stratified_k_fold(&y, 5).unwrap();
        let predicted =
            cross_val_predict(&MultinomialNb::default(), &x, &y, &splits, &ProgressBar::hidden())
                .unwrap();
        assert_eq!(predicted, y);
    }
}
