//! inferlab - classic probabilistic-inference, text-classification and
//! constraint-satisfaction demonstrations.
//!
//! ## Architecture
//!
//! - **bayes**: discrete Bayesian networks (factors, CPDs, variable
//!   elimination, sampling, parameter estimation)
//! - **text**: polarity corpus, TF-IDF, Naive Bayes, cross-validation, metrics
//! - **csp**: finite-domain constraint problems and the Waltz drawing
//!
//! ## Pipelines
//!
//! - **Alarm**: Exact queries → Rejection samples → Re-learned network
//! - **Musicianship**: Exact queries → Weighted samples → Re-learned network
//! - **Sentiment**: Corpus → TF-IDF → Cross-validated Naive Bayes → Metrics
//! - **Waltz**: Drawing → Filtering → Every consistent labeling
//!
//! ## Epistemic Design
//!
//! - K_i (Knowledge): Compile-time enforced invariants (types, enums)
//! - B_i (Beliefs): Runtime fallible operations (Result, Option)
//! - I^R (Resolvable): User-configurable parameters
//! - I^B (Bounded): Data-dependent failures (impossible evidence, sampling budget)

pub mod bayes;
pub mod csp;
pub mod models;
pub mod pipeline;
pub mod text;

// Re-exports for convenience
pub use bayes::{BayesianNetwork, DiscreteFactor, TabularCpd, VariableElimination};
pub use csp::Problem;
pub use models::{Config, InferlabError, Result};
pub use pipeline::{AlarmPipeline, MusicianshipPipeline, SentimentPipeline, WaltzPipeline};
pub use text::{Corpus, TfidfVectorizer};
