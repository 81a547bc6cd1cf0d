//! Burglary-alarm demonstration.
//!
//! Pipeline flow:
//! Hand-specified network → exact queries → rejection samples →
//! re-learned network → same queries → per-row predictions

use super::{describe_query, exact_query};
use crate::bayes::networks::{self, ALARM_EDGES, ALARM_NODES};
use crate::bayes::{
    BayesianModelSampling, Estimator, SimpleInference, TabularCpd, VariableElimination,
};
use crate::models::{AlarmReport, Config, FittedModel, QueryOutcome, Result, SampleTable};
use std::time::Instant;
use tracing::{debug, info};

const TRUE: usize = 0;
const FALSE: usize = 1;

/// P(JohnCalls | every other variable observed)
const JOHN_EVIDENCE: [(&str, usize); 4] = [
    ("Burglary", FALSE),
    ("Earthquake", FALSE),
    ("Alarm", TRUE),
    ("MaryCalls", TRUE),
];

/// Both neighbours called.
const CALLS_EVIDENCE: [(&str, usize); 2] = [("JohnCalls", TRUE), ("MaryCalls", TRUE)];

/// Columns handed to `predict_probability`; MaryCalls is left out.
const PREDICT_COLUMNS: [&str; 4] = ["Burglary", "Earthquake", "Alarm", "JohnCalls"];

/// Inference and learning on the burglary-alarm network.
pub struct AlarmPipeline {
    config: Config,
}

impl AlarmPipeline {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Run the demonstration.
    pub fn run(&self) -> Result<AlarmReport> {
        let start = Instant::now();
        let sampling = &self.config.sampling;
        info!(seed = sampling.seed, samples = sampling.rejection_size, "Starting alarm pipeline");

        let network = networks::alarm()?;
        network.check_model()?;
        let alarm_parents: Vec<String> = network
            .parents("Alarm")
            .into_iter()
            .map(String::from)
            .collect();
        let cpds: Vec<TabularCpd> = network.cpds().into_iter().cloned().collect();

        let infer = VariableElimination::new(&network)?;
        let elimination_order: &[&str] = &["Alarm", "Earthquake"];
        let exact = vec![
            exact_query(&network, &infer, "JohnCalls", &JOHN_EVIDENCE, None)?,
            exact_query(&network, &infer, "Burglary", &CALLS_EVIDENCE, None)?,
            exact_query(&network, &infer, "Burglary", &CALLS_EVIDENCE, Some(elimination_order))?,
        ];
        let unnormalized = QueryOutcome {
            title: format!(
                "{} not normalized",
                describe_query(&network, "Burglary", &CALLS_EVIDENCE)?
            ),
            factor: SimpleInference::new(&network)?.query(&["Burglary"], &CALLS_EVIDENCE)?,
        };
        debug!("Exact queries done");

        let mut sampler = BayesianModelSampling::new(&network, sampling.seed)?
            .with_max_rejection_draws(sampling.max_rejection_draws);
        let preview = sampling.preview_samples;
        let samples = vec![
            SampleTable {
                title: format!("{preview} rejection samples"),
                data: sampler.rejection_sample(&[], preview)?,
            },
            SampleTable {
                title: format!("{preview} rejection samples with JohnCalls=True, MaryCalls=True"),
                data: sampler.rejection_sample(&CALLS_EVIDENCE, preview)?,
            },
        ];

        let data = sampler.rejection_sample(&[], sampling.rejection_size)?;
        info!(rows = data.len(), "Drew rejection samples");

        let estimator = Estimator::from_config(&self.config.estimation);
        let mut learned = networks::structure(&ALARM_NODES, &ALARM_EDGES)?;
        learned.fit(&data, &estimator)?;
        learned.check_model()?;
        let learned_infer = VariableElimination::new(&learned)?;
        let fitted = FittedModel {
            estimator: estimator.to_string(),
            samples: data.len(),
            cpds: learned.cpds().into_iter().cloned().collect(),
            queries: vec![
                exact_query(&learned, &learned_infer, "JohnCalls", &JOHN_EVIDENCE, None)?,
                exact_query(&learned, &learned_infer, "Burglary", &CALLS_EVIDENCE, None)?,
            ],
        };

        let prediction = network.predict_probability(&data.select(&PREDICT_COLUMNS)?)?;

        info!(
            runtime_secs = start.elapsed().as_secs_f64(),
            estimator = %estimator,
            "Alarm pipeline complete"
        );
        Ok(AlarmReport {
            generated_at: chrono::Utc::now(),
            seed: sampling.seed,
            alarm_parents,
            cpds,
            exact,
            unnormalized,
            samples,
            fitted,
            prediction,
            output: self.config.output.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_config() -> Config {
        let mut config = Config::default();
        config.sampling.rejection_size = 400;
        config.sampling.preview_samples = 5;
        config
    }

    #[test]
    fn test_run_produces_every_section() {
        let report = AlarmPipeline::new(small_config()).run().unwrap();
        assert_eq!(report.alarm_parents, vec!["Burglary", "Earthquake"]);
        assert_eq!(report.cpds.len(), 5);
        assert_eq!(report.exact.len(), 3);
        assert_eq!(report.samples[1].data.len(), 5);
        assert_eq!(report.fitted.samples, 400);
        assert_eq!(report.prediction.rows.len(), 400);
        assert_eq!(report.prediction.columns, vec!["MaryCalls_0", "MaryCalls_1"]);
    }

    #[test]
    fn test_exact_burglary_posterior() {
        let report = AlarmPipeline::new(small_config()).run().unwrap();
        let heuristic = &report.exact[1].factor;
        let explicit = &report.exact[2].factor;
        assert!((heuristic.values()[0] - 0.093894).abs() < 1e-6);
        for (a, b) in heuristic.values().iter().zip(explicit.values()) {
            assert!((a - b).abs() < 1e-12);
        }
        // Un-normalized values sum to P(j, m).
        let p_evidence = report.unnormalized.factor.sum();
        let normalized = report.unnormalized.factor.values()[0] / p_evidence;
        assert!((normalized - heuristic.values()[0]).abs() < 1e-9);
    }

    #[test]
    fn test_evidence_samples_respect_evidence() {
        let report = AlarmPipeline::new(small_config()).run().unwrap();
        let data = &report.samples[1].data;
        let john = data.column_index("JohnCalls").unwrap();
        let mary = data.column_index("MaryCalls").unwrap();
        assert!(data.rows().iter().all(|r| r[john] == TRUE && r[mary] == TRUE));
    }

    #[test]
    fn test_same_seed_same_report() {
        let a = AlarmPipeline::new(small_config()).run().unwrap();
        let b = AlarmPipeline::new(small_config()).run().unwrap();
        assert_eq!(a.prediction, b.prediction);
        assert_eq!(a.fitted.cpds, b.fitted.cpds);
    }
}
