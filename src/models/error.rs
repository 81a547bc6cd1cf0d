//! Error types for inferlab.
//!
//! Epistemic taxonomy:
//! - B_i falsified: Expected failures (bad query, unknown variable, missing corpus)
//! - I^B materialized: Data-dependent failures (impossible evidence, sampling budget)
//! - K_i violated: Internal invariant violations (bugs)

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for inferlab.
#[derive(Debug, Error)]
pub enum InferlabError {
    // ═══════════════════════════════════════════════════════════════════
    // B_i FALSIFIED — Belief proven wrong (expected failures)
    // ═══════════════════════════════════════════════════════════════════

    #[error("Configuration error: {0}")]
    Config(#[from] super::ConfigError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Unknown variable: {0}")]
    UnknownVariable(String),

    #[error("State {state} out of range for variable {variable} (cardinality {cardinality})")]
    UnknownState {
        variable: String,
        state: usize,
        cardinality: usize,
    },

    #[error("Invalid CPD for {variable}: {reason}")]
    InvalidCpd { variable: String, reason: String },

    #[error("Invalid model: {0}")]
    InvalidModel(String),

    #[error("Graph contains a cycle through {0}")]
    Cycle(String),

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Unexpected corpus file name: {0}")]
    CorpusFileName(PathBuf),

    // ═══════════════════════════════════════════════════════════════════
    // I^B MATERIALIZED — Bounded ignorance became known-bad
    // ═══════════════════════════════════════════════════════════════════

    #[error("Evidence has zero probability under the model")]
    ImpossibleEvidence,

    #[error("Rejection sampling gave up after {draws} draws ({accepted} accepted)")]
    SamplingExhausted { draws: u64, accepted: usize },

    #[error("Metric undefined: {0}")]
    UndefinedMetric(String),

    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // ═══════════════════════════════════════════════════════════════════
    // K_i VIOLATED — Invariant broken (bug, should not happen)
    // ═══════════════════════════════════════════════════════════════════

    #[error("Internal error: {0}")]
    Internal(String),
}

impl InferlabError {
    /// Create an IO error with context.
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a CPD validation error.
    pub fn cpd(variable: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidCpd {
            variable: variable.into(),
            reason: reason.into(),
        }
    }

    /// Whether the failure stems from the data rather than the caller.
    ///
    /// Data failures can go away with another seed or a bigger budget.
    pub fn is_data_dependent(&self) -> bool {
        matches!(
            self,
            Self::ImpossibleEvidence | Self::SamplingExhausted { .. } | Self::UndefinedMetric(_)
        )
    }
}

/// Result type alias for inferlab.
pub type Result<T> = std::result::Result<T, InferlabError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_keeps_context() {
        let err = InferlabError::io(
            "reading corpus",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        assert_eq!(err.to_string(), "IO error: reading corpus");
        assert!(!err.is_data_dependent());
    }

    #[test]
    fn test_data_dependent_errors() {
        assert!(InferlabError::ImpossibleEvidence.is_data_dependent());
        assert!(
            InferlabError::SamplingExhausted {
                draws: 10,
                accepted: 0
            }
            .is_data_dependent()
        );
        assert!(!InferlabError::UnknownVariable("X".into()).is_data_dependent());
    }
}
