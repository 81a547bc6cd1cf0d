//! Report types returned by the pipelines.
//!
//! K_i: A report is plain data. `Display` renders the human-readable
//! output and `serde` renders the `--json` output from the same values.

use super::OutputConfig;
use crate::bayes::{Dataset, DiscreteFactor, Prediction, TabularCpd};
use crate::csp::waltz::Label;
use crate::text::{CrossValidation, FoldScores, PrfSupport};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

const RULE: &str = "--------------------";

/// A titled inference result.
#[derive(Debug, Clone, Serialize)]
pub struct QueryOutcome {
    /// What was asked, e.g. "P(Burglary | JohnCalls=True, MaryCalls=True)"
    pub title: String,

    /// Resulting factor (normalized unless the title says otherwise)
    pub factor: DiscreteFactor,
}

/// A titled sample table.
#[derive(Debug, Clone, Serialize)]
pub struct SampleTable {
    pub title: String,
    pub data: Dataset,
}

/// A network re-learned from samples.
#[derive(Debug, Clone, Serialize)]
pub struct FittedModel {
    /// Estimator description
    pub estimator: String,

    /// Number of samples the CPDs were learned from
    pub samples: usize,

    /// Learned CPDs, in node order
    pub cpds: Vec<TabularCpd>,

    /// Queries repeated on the learned model
    pub queries: Vec<QueryOutcome>,
}

fn write_query(f: &mut fmt::Formatter<'_>, query: &QueryOutcome, precision: usize) -> fmt::Result {
    writeln!(f, "{RULE}")?;
    writeln!(f, " {}", query.title)?;
    writeln!(f, "{RULE}")?;
    writeln!(f, "{:.precision$}", query.factor)
}

fn write_banner(f: &mut fmt::Formatter<'_>, title: &str) -> fmt::Result {
    writeln!(f, "------------------------")?;
    writeln!(f, " {title}")?;
    writeln!(f, "------------------------")
}

fn write_fitted(f: &mut fmt::Formatter<'_>, fitted: &FittedModel, precision: usize) -> fmt::Result {
    writeln!(
        f,
        "Learned with {} from {} samples",
        fitted.estimator, fitted.samples
    )?;
    for cpd in &fitted.cpds {
        writeln!(f, "CPD of {}:", cpd.variable().name)?;
        writeln!(f, "{cpd:.precision$}")?;
    }
    Ok(())
}

/// Output of the burglary-alarm demonstration.
#[derive(Debug, Clone, Serialize)]
pub struct AlarmReport {
    pub generated_at: DateTime<Utc>,
    pub seed: u64,

    /// Parents of the Alarm node
    pub alarm_parents: Vec<String>,

    /// The hand-specified CPDs
    pub cpds: Vec<TabularCpd>,

    /// Exact queries on the hand-specified network
    pub exact: Vec<QueryOutcome>,

    /// The Burglary query without normalization
    pub unnormalized: QueryOutcome,

    /// Small rejection-sampling previews
    pub samples: Vec<SampleTable>,

    /// Network re-learned from rejection samples
    pub fitted: FittedModel,

    /// Posterior of the unobserved node for every sampled row
    pub prediction: Prediction,

    #[serde(skip)]
    pub output: OutputConfig,
}

impl fmt::Display for AlarmReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let precision = self.output.precision;
        for parent in &self.alarm_parents {
            writeln!(f, "{parent}")?;
        }
        for cpd in &self.cpds {
            writeln!(f, "{cpd:.precision$}")?;
        }

        write_banner(f, "EXACT INFERENCE")?;
        for query in &self.exact {
            write_query(f, query, precision)?;
        }
        write_query(f, &self.unnormalized, precision)?;

        for table in &self.samples {
            writeln!(f, "{RULE}")?;
            writeln!(f, " {}", table.title)?;
            writeln!(f, "{RULE}")?;
            writeln!(f, "{}", table.data.render(None))?;
        }

        write_banner(f, "APPROXIMATE INFERENCE")?;
        write_fitted(f, &self.fitted, precision)?;
        for query in &self.fitted.queries {
            write_query(f, query, precision)?;
        }

        writeln!(f, "{RULE}")?;
        writeln!(f, " Predicted probabilities from the sampled evidence")?;
        writeln!(f, "{RULE}")?;
        write!(
            f,
            "{}",
            self.prediction
                .render(Some(self.output.preview_rows), precision)
        )
    }
}

/// Output of the musicianship demonstration.
#[derive(Debug, Clone, Serialize)]
pub struct MusicianshipReport {
    pub generated_at: DateTime<Utc>,
    pub seed: u64,

    /// Letter given full evidence, not normalized
    pub unnormalized: QueryOutcome,

    /// Normalized queries on the hand-specified network
    pub exact: Vec<QueryOutcome>,

    /// Network re-learned from likelihood-weighted samples
    pub fitted: FittedModel,

    #[serde(skip)]
    pub output: OutputConfig,
}

impl fmt::Display for MusicianshipReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let precision = self.output.precision;
        write_banner(f, "EXACT INFERENCE")?;
        write_query(f, &self.unnormalized, precision)?;
        for query in &self.exact {
            write_query(f, query, precision)?;
        }
        write_fitted(f, &self.fitted, precision)?;
        write_banner(f, "APPROXIMATE INFERENCE")?;
        for query in &self.fitted.queries {
            write_query(f, query, precision)?;
        }
        Ok(())
    }
}

/// Evaluation of one classifier.
#[derive(Debug, Clone, Serialize)]
pub struct ClassifierReport {
    pub name: String,

    /// Per-fold training-time scores
    pub cross_validation: CrossValidation,

    /// Scores of the out-of-fold predictions
    pub roc_auc_micro: f64,
    pub roc_auc_macro: f64,
    pub accuracy: f64,
    pub cohen_kappa: f64,
    pub prf_micro: PrfSupport,
    pub prf_macro: PrfSupport,
}

fn format_prf(prf: &PrfSupport, precision: usize) -> String {
    let support = prf
        .support
        .map(|s| s.to_string())
        .unwrap_or_else(|| "None".to_string());
    format!(
        "({:.precision$}, {:.precision$}, {:.precision$}, {support})",
        prf.precision, prf.recall, prf.fscore
    )
}

fn format_scores(
    cv: &CrossValidation,
    score: impl Fn(&FoldScores) -> f64,
    precision: usize,
) -> String {
    let values: Vec<String> = cv
        .folds
        .iter()
        .map(|fold| format!("{:.precision$}", score(fold)))
        .collect();
    format!(
        "[{}] mean {:.precision$}",
        values.join(", "),
        cv.mean(score)
    )
}

impl ClassifierReport {
    fn render(&self, f: &mut fmt::Formatter<'_>, precision: usize) -> fmt::Result {
        writeln!(f, "---------------------------")?;
        writeln!(f, "  Algorithm: {}", self.name)?;
        writeln!(f, "---------------------------")?;
        writeln!(f, "Training scores")?;
        let cv = &self.cross_validation;
        let rows: [(&str, fn(&FoldScores) -> f64); 7] = [
            ("fit_time", |s| s.fit_time),
            ("score_time", |s| s.score_time),
            ("test_accuracy", |s| s.test_accuracy),
            ("test_average_precision", |s| s.test_average_precision),
            ("test_precision", |s| s.test_precision),
            ("test_recall", |s| s.test_recall),
            ("test_f1", |s| s.test_f1),
        ];
        for (label, score) in rows {
            writeln!(f, "{label}: {}", format_scores(cv, score, precision))?;
        }
        writeln!(f, "---------------")?;
        let lines = [
            ("Test roc auc score micro", format!("{:.precision$}", self.roc_auc_micro)),
            ("Test roc auc score macro", format!("{:.precision$}", self.roc_auc_macro)),
            ("Test accuracy score", format!("{:.precision$}", self.accuracy)),
            ("Test cohen_kappa_score score", format!("{:.precision$}", self.cohen_kappa)),
            ("Test precision_recall_fscore score micro", format_prf(&self.prf_micro, precision)),
            ("Test precision_recall_fscore score macro", format_prf(&self.prf_macro, precision)),
        ];
        for (i, (title, value)) in lines.iter().enumerate() {
            writeln!(f, "{title}")?;
            writeln!(f, "{value}")?;
            if i + 1 < lines.len() {
                writeln!(f, "------------")?;
            }
        }
        writeln!(f, "{}", "-".repeat(86))
    }
}

/// Output of the sentiment demonstration.
#[derive(Debug, Clone, Serialize)]
pub struct SentimentReport {
    pub generated_at: DateTime<Utc>,

    /// Corpus root that was read
    pub corpus: String,
    pub documents: usize,
    pub positive: usize,
    pub negative: usize,

    /// Terms kept by the vectorizer
    pub vocabulary_size: usize,

    /// Description of the fold strategy
    pub folds: String,

    /// Bernoulli first, then Multinomial
    pub classifiers: Vec<ClassifierReport>,

    #[serde(skip)]
    pub output: OutputConfig,
}

impl fmt::Display for SentimentReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Corpus {}: {} documents ({} pos, {} neg), {} terms, {}",
            self.corpus,
            self.documents,
            self.positive,
            self.negative,
            self.vocabulary_size,
            self.folds
        )?;
        for classifier in &self.classifiers {
            classifier.render(f, self.output.precision)?;
        }
        Ok(())
    }
}

/// Output of the Waltz demonstration.
#[derive(Debug, Clone, Serialize)]
pub struct WaltzReport {
    pub generated_at: DateTime<Utc>,

    /// Whether Waltz filtering ran before search
    pub filtered: bool,

    /// Domain values removed by filtering
    pub pruned: usize,

    /// Labelings in edge order E1..E15
    pub labelings: Vec<Vec<Label>>,
}

impl fmt::Display for WaltzReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for labeling in &self.labelings {
            let codes: Vec<String> = labeling.iter().map(|l| l.code().to_string()).collect();
            let letters: Vec<String> = labeling.iter().map(Label::to_string).collect();
            writeln!(f, "[{}]  {}", codes.join(", "), letters.join(" "))?;
            writeln!(f)?;
        }
        write!(
            f,
            "{} labelings ({} values pruned by filtering)",
            self.labelings.len(),
            self.pruned
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::csp::waltz::Label::{A, M, P};

    #[test]
    fn test_waltz_report_prints_codes_and_letters() {
        let report = WaltzReport {
            generated_at: Utc::now(),
            filtered: true,
            pruned: 3,
            labelings: vec![vec![A, M, P]],
        };
        let text = report.to_string();
        assert!(text.starts_with("[0, 2, 3]  A M P\n\n"));
        assert!(text.ends_with("1 labelings (3 values pruned by filtering)"));

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["labelings"][0][1], "M");
    }

    #[test]
    fn test_prf_formats_missing_support_as_none() {
        let prf = PrfSupport {
            precision: 0.5,
            recall: 0.25,
            fscore: 1.0 / 3.0,
            support: None,
        };
        assert_eq!(format_prf(&prf, 2), "(0.50, 0.25, 0.33, None)");
    }
}
