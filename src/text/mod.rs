//! Text classification: corpus loading, TF-IDF, Naive Bayes, validation, metrics.
//!
//! Provides:
//! - `Corpus`: labelled polarity reviews with their file-name folds
//! - `TfidfVectorizer`: sparse TF-IDF rows over a pruned vocabulary
//! - `MultinomialNb`, `BernoulliNb`: `Classifier` implementations
//! - `cross_validate`, `cross_val_predict`: stratified or predefined folds
//! - `metrics`: accuracy, precision/recall/F1, AP, ROC AUC, kappa

mod corpus;
pub mod metrics;
mod naive_bayes;
mod sparse;
mod stop_words;
mod tfidf;
mod validation;

pub use corpus::*;
pub use metrics::{Average, PrfSupport};
pub use naive_bayes::*;
pub use sparse::*;
pub use stop_words::is_stop_word;
pub use tfidf::*;
pub use validation::*;
