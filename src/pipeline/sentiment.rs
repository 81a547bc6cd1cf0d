//! Sentiment classification pipeline.
//!
//! Pipeline flow:
//! Corpus → TF-IDF → for each classifier: cross-validated scores,
//! out-of-fold predictions → metrics

use super::progress_bar;
use crate::models::{ClassifierReport, Config, InferlabError, Result, SentimentReport};
use crate::text::metrics::{
    accuracy_score, cohen_kappa_score, precision_recall_fscore_support, roc_auc_score,
};
use crate::text::{
    Average, BernoulliNb, Classifier, Corpus, FoldStrategy, MultinomialNb, Polarity,
    SparseMatrix, Split, TfidfVectorizer, cross_val_predict, cross_validate,
};
use indicatif::ProgressBar;
use std::path::PathBuf;
use std::time::Instant;
use tracing::info;

/// Naive Bayes sentiment classification over a polarity corpus.
pub struct SentimentPipeline {
    config: Config,
}

impl SentimentPipeline {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Corpus root after `${VAR}` expansion.
    pub fn corpus_path(&self) -> PathBuf {
        self.config.sentiment.corpus_path()
    }

    /// Load the corpus and run the full evaluation.
    pub fn run(&self) -> Result<SentimentReport> {
        let root = self.corpus_path();
        info!(corpus = %root.display(), "Starting sentiment pipeline");
        let corpus = Corpus::load(&root)?;
        self.run_on(&corpus, &root.display().to_string())
    }

    /// Evaluate both classifiers on an already-loaded corpus.
    pub fn run_on(&self, corpus: &Corpus, label: &str) -> Result<SentimentReport> {
        let start = Instant::now();
        let settings = &self.config.sentiment;
        if corpus.is_empty() {
            return Err(InferlabError::InvalidInput(format!(
                "corpus {label} holds no documents"
            )));
        }

        let mut vectorizer = TfidfVectorizer::from_config(settings);
        let x = vectorizer.fit_transform(&corpus.texts())?;
        let y = corpus.labels();
        info!(
            documents = x.n_rows(),
            terms = x.n_cols(),
            "Vectorized corpus"
        );

        let (strategy, folds) = if settings.use_corpus_folds {
            let ids = corpus.folds();
            let mut distinct = ids.clone();
            distinct.sort_unstable();
            distinct.dedup();
            let description = format!("{} folds from file names", distinct.len());
            (FoldStrategy::Predefined(ids), description)
        } else {
            (
                FoldStrategy::Stratified {
                    folds: settings.folds,
                },
                format!("{}-fold stratified", settings.folds),
            )
        };
        let splits = strategy.split(&y)?;

        let alpha = settings.alpha;
        // two passes (scores, predictions) per fold per classifier
        let pb = progress_bar((splits.len() * 4) as u64, "folds");
        let classifiers = vec![
            evaluate("Bernoulli", &BernoulliNb::new(alpha, 0.0), &x, &y, &splits, &pb)?,
            evaluate("Multinomial", &MultinomialNb::new(alpha), &x, &y, &splits, &pb)?,
        ];
        pb.finish_and_clear();

        info!(
            runtime_secs = start.elapsed().as_secs_f64(),
            "Sentiment pipeline complete"
        );
        Ok(SentimentReport {
            generated_at: chrono::Utc::now(),
            corpus: label.to_string(),
            documents: corpus.len(),
            positive: corpus.count(Polarity::Pos),
            negative: corpus.count(Polarity::Neg),
            vocabulary_size: vectorizer.vocabulary().len(),
            folds,
            classifiers,
            output: self.config.output.clone(),
        })
    }
}

fn evaluate<C: Classifier + Clone>(
    name: &str,
    estimator: &C,
    x: &SparseMatrix,
    y: &[usize],
    splits: &[Split],
    pb: &ProgressBar,
) -> Result<ClassifierReport> {
    pb.set_message(name.to_string());
    let cross_validation = cross_validate(estimator, x, y, splits, pb)?;
    let predicted = cross_val_predict(estimator, x, y, splits, pb)?;
    let scores: Vec<f64> = predicted.iter().map(|&p| p as f64).collect();

    // Binary target: both averaging modes reduce to the same curve.
    let roc_auc = roc_auc_score(y, &scores)?;
    let report = ClassifierReport {
        name: name.to_string(),
        cross_validation,
        roc_auc_micro: roc_auc,
        roc_auc_macro: roc_auc,
        accuracy: accuracy_score(y, &predicted)?,
        cohen_kappa: cohen_kappa_score(y, &predicted)?,
        prf_micro: precision_recall_fscore_support(y, &predicted, Average::Micro)?,
        prf_macro: precision_recall_fscore_support(y, &predicted, Average::Macro)?,
    };
    info!(
        classifier = name,
        accuracy = report.accuracy,
        roc_auc,
        "Evaluated classifier"
    );
    Ok(report)
}
