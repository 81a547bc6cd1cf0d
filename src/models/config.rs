//! Configuration models for inferlab.
//!
//! All I^R (resolvable ignorance) is parameterized here.
//! Every field has a default that reproduces the classic demonstrations,
//! so a config file is optional.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

/// Top-level configuration for inferlab.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Sampling settings (Bayesian-network demos)
    #[serde(default)]
    pub sampling: SamplingConfig,

    /// Parameter estimation settings
    #[serde(default)]
    pub estimation: EstimationConfig,

    /// Sentiment classifier settings
    #[serde(default)]
    pub sentiment: SentimentConfig,

    /// Waltz line-labeling settings
    #[serde(default)]
    pub waltz: WaltzConfig,

    /// Output settings
    #[serde(default)]
    pub output: OutputConfig,
}

/// Sampling configuration.
///
/// B_i: Results are only reproducible when the seed is fixed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SamplingConfig {
    /// RNG seed
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Number of rejection samples printed as a preview
    #[serde(default = "default_preview_samples")]
    pub preview_samples: usize,

    /// Number of rejection samples used to re-learn the alarm network
    #[serde(default = "default_rejection_size")]
    pub rejection_size: usize,

    /// Number of likelihood-weighted samples used to re-learn the musicianship network
    #[serde(default = "default_weighted_size")]
    pub weighted_size: usize,

    /// Upper bound on forward draws per rejection-sampling call
    #[serde(default = "default_max_rejection_draws")]
    pub max_rejection_draws: u64,
}

fn default_seed() -> u64 {
    42
}

fn default_preview_samples() -> usize {
    20
}

fn default_rejection_size() -> usize {
    5000
}

fn default_weighted_size() -> usize {
    2000
}

fn default_max_rejection_draws() -> u64 {
    10_000_000
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            seed: default_seed(),
            preview_samples: default_preview_samples(),
            rejection_size: default_rejection_size(),
            weighted_size: default_weighted_size(),
            max_rejection_draws: default_max_rejection_draws(),
        }
    }
}

/// Prior used by the Bayesian parameter estimator.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PriorKind {
    /// Bayesian Dirichlet equivalent uniform (default)
    #[default]
    Bdeu,
    /// One pseudo-count per cell
    K2,
    /// No prior: maximum likelihood
    None,
}

/// Parameter estimation configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EstimationConfig {
    /// Prior for re-learning CPDs from samples
    #[serde(default)]
    pub prior: PriorKind,

    /// Equivalent sample size for the BDeu prior
    #[serde(default = "default_equivalent_sample_size")]
    pub equivalent_sample_size: f64,
}

fn default_equivalent_sample_size() -> f64 {
    5.0
}

impl Default for EstimationConfig {
    fn default() -> Self {
        Self {
            prior: PriorKind::default(),
            equivalent_sample_size: default_equivalent_sample_size(),
        }
    }
}

/// Sentiment classifier configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SentimentConfig {
    /// Corpus root containing `pos/` and `neg/` (supports ${VAR} expansion)
    #[serde(default = "default_corpus_dir")]
    pub corpus_dir: String,

    /// Number of stratified folds
    #[serde(default = "default_folds")]
    pub folds: usize,

    /// Use the folds encoded in the corpus file names instead of stratified folds
    #[serde(default)]
    pub use_corpus_folds: bool,

    /// Minimum document frequency, as a proportion of documents
    #[serde(default = "default_min_df")]
    pub min_df: f64,

    /// Maximum document frequency, as a proportion of documents
    #[serde(default = "default_max_df")]
    pub max_df: f64,

    /// Replace tf with 1 + ln(tf)
    #[serde(default = "default_true")]
    pub sublinear_tf: bool,

    /// Drop English stop words
    #[serde(default = "default_true")]
    pub stop_words: bool,

    /// Additive smoothing for both Naive Bayes variants
    #[serde(default = "default_alpha")]
    pub alpha: f64,
}

fn default_corpus_dir() -> String {
    "txt_sentoken".to_string()
}

fn default_folds() -> usize {
    10
}

fn default_min_df() -> f64 {
    0.3
}

fn default_max_df() -> f64 {
    1.0
}

fn default_alpha() -> f64 {
    1.0
}

fn default_true() -> bool {
    true
}

impl Default for SentimentConfig {
    fn default() -> Self {
        Self {
            corpus_dir: default_corpus_dir(),
            folds: default_folds(),
            use_corpus_folds: false,
            min_df: default_min_df(),
            max_df: default_max_df(),
            sublinear_tf: true,
            stop_words: true,
            alpha: default_alpha(),
        }
    }
}

impl SentimentConfig {
    /// Corpus directory with ${VAR} placeholders expanded.
    pub fn corpus_path(&self) -> PathBuf {
        PathBuf::from(expand_env_vars(&self.corpus_dir))
    }
}

/// Waltz line-labeling configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaltzConfig {
    /// Run Waltz filtering (arc consistency) before search
    #[serde(default = "default_true")]
    pub filter: bool,
}

impl Default for WaltzConfig {
    fn default() -> Self {
        Self { filter: true }
    }
}

/// Output configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Rows shown from the head and tail of large sample tables
    #[serde(default = "default_preview_rows")]
    pub preview_rows: usize,

    /// Decimal places for probabilities
    #[serde(default = "default_precision")]
    pub precision: usize,
}

fn default_preview_rows() -> usize {
    5
}

fn default_precision() -> usize {
    4
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            preview_rows: default_preview_rows(),
            precision: default_precision(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    ///
    /// B_i(file exists) → Result
    /// B_i(file is valid TOML) → Result
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.to_owned(),
            source: e,
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_owned(),
            source: e,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a file when given, otherwise use the built-in defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    /// Check value ranges that serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let s = &self.sentiment;
        if !(0.0..=1.0).contains(&s.min_df) {
            return Err(ConfigError::invalid("sentiment.min_df", "must be within [0, 1]"));
        }
        if !(0.0..=1.0).contains(&s.max_df) || s.max_df < s.min_df {
            return Err(ConfigError::invalid(
                "sentiment.max_df",
                "must be within [min_df, 1]",
            ));
        }
        if s.folds < 2 {
            return Err(ConfigError::invalid("sentiment.folds", "must be at least 2"));
        }
        if s.alpha < 0.0 {
            return Err(ConfigError::invalid("sentiment.alpha", "must not be negative"));
        }
        if self.estimation.equivalent_sample_size <= 0.0 {
            return Err(ConfigError::invalid(
                "estimation.equivalent_sample_size",
                "must be positive",
            ));
        }
        let sampling = &self.sampling;
        if sampling.rejection_size == 0 || sampling.weighted_size == 0 {
            return Err(ConfigError::invalid("sampling", "sample sizes must be positive"));
        }
        if sampling.max_rejection_draws == 0 {
            return Err(ConfigError::invalid(
                "sampling.max_rejection_draws",
                "must be positive",
            ));
        }
        Ok(())
    }
}

/// Expand environment variables in a string.
///
/// Supports ${VAR_NAME} syntax.
/// If the variable is not set, the placeholder is left unchanged.
pub fn expand_env_vars(s: &str) -> String {
    static PLACEHOLDER: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").expect("placeholder pattern is valid"));

    let mut result = s.to_string();
    for cap in PLACEHOLDER.captures_iter(s) {
        let var_name = &cap[1];
        if let Ok(value) = std::env::var(var_name) {
            result = result.replace(&cap[0], &value);
        }
    }

    result
}

/// Configuration errors.
///
/// Epistemic origin:
/// - B_i falsified: File not found, parse error
/// - I^R unresolved: Value outside its meaningful range
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

impl ConfigError {
    fn invalid(field: &str, reason: &str) -> Self {
        Self::InvalidValue {
            field: field.to_string(),
            reason: reason.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_match_classic_demos() {
        let config = Config::default();
        assert_eq!(config.sampling.rejection_size, 5000);
        assert_eq!(config.sampling.weighted_size, 2000);
        assert_eq!(config.sentiment.folds, 10);
        assert!((config.sentiment.min_df - 0.3).abs() < f64::EPSILON);
        assert!(config.sentiment.sublinear_tf);
        assert_eq!(config.estimation.prior, PriorKind::Bdeu);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("inferlab.toml");
        std::fs::write(&path, "[sampling]\nseed = 7\n\n[estimation]\nprior = \"k2\"\n").unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.sampling.seed, 7);
        assert_eq!(config.sampling.preview_samples, 20);
        assert_eq!(config.estimation.prior, PriorKind::K2);
        assert_eq!(config.sentiment.corpus_dir, "txt_sentoken");
    }

    #[test]
    fn test_out_of_range_values_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "[sentiment]\nmin_df = 1.5\n").unwrap();

        let err = Config::from_file(&path).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref field, .. } if field == "sentiment.min_df"));
    }

    #[test]
    fn test_missing_file() {
        let err = Config::load(Some(Path::new("/nonexistent/inferlab.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::FileRead { .. }));
    }

    #[test]
    fn test_expand_env_vars_leaves_unknown_placeholders() {
        assert_eq!(
            expand_env_vars("${INFERLAB_SURELY_UNSET_VAR}/pos"),
            "${INFERLAB_SURELY_UNSET_VAR}/pos"
        );
        assert_eq!(expand_env_vars("plain/path"), "plain/path");
    }

    #[test]
    fn test_expand_env_vars_substitutes_set_variables() {
        if let Ok(path) = std::env::var("PATH") {
            assert_eq!(expand_env_vars("${PATH}/txt_sentoken"), format!("{path}/txt_sentoken"));
        }
    }
}
