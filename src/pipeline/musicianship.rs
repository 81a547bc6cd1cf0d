//! Musicianship demonstration: exact queries, likelihood weighting, re-learning.

use super::{describe_query, exact_query};
use crate::bayes::networks::{self, MUSICIANSHIP_EDGES, MUSICIANSHIP_NODES};
use crate::bayes::{
    BayesianModelSampling, BayesianNetwork, Estimator, SimpleInference, VariableElimination,
};
use crate::models::{Config, FittedModel, MusicianshipReport, QueryOutcome, Result};
use std::time::Instant;
use tracing::info;

/// Easy course, strong musician, two stars, high exam.
const FULL_EVIDENCE: [(&str, usize); 4] = [
    ("Difficulty", 0),
    ("Musicianship", 1),
    ("Rating", 1),
    ("Exam", 1),
];

const WEAK_MUSICIAN: [(&str, usize); 1] = [("Musicianship", 0)];

/// Inference and learning on the musicianship network.
pub struct MusicianshipPipeline {
    config: Config,
}

/// The three normalized Letter queries.
fn letter_queries(network: &BayesianNetwork) -> Result<Vec<QueryOutcome>> {
    let infer = VariableElimination::new(network)?;
    Ok(vec![
        exact_query(network, &infer, "Letter", &FULL_EVIDENCE, None)?,
        exact_query(network, &infer, "Letter", &[], None)?,
        exact_query(network, &infer, "Letter", &WEAK_MUSICIAN, None)?,
    ])
}

impl MusicianshipPipeline {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Run the demonstration.
    pub fn run(&self) -> Result<MusicianshipReport> {
        let start = Instant::now();
        let sampling = &self.config.sampling;
        info!(seed = sampling.seed, samples = sampling.weighted_size, "Starting musicianship pipeline");

        let network = networks::musicianship()?;
        network.check_model()?;

        let unnormalized = QueryOutcome {
            title: format!(
                "{} not normalized",
                describe_query(&network, "Letter", &FULL_EVIDENCE)?
            ),
            factor: SimpleInference::new(&network)?.query(&["Letter"], &FULL_EVIDENCE)?,
        };
        let exact = letter_queries(&network)?;

        let data = BayesianModelSampling::new(&network, sampling.seed)?
            .likelihood_weighted_sample(&[], sampling.weighted_size)?;
        info!(rows = data.len(), "Drew likelihood-weighted samples");

        let estimator = Estimator::from_config(&self.config.estimation);
        let mut learned = networks::structure(&MUSICIANSHIP_NODES, &MUSICIANSHIP_EDGES)?;
        learned.fit(&data, &estimator)?;
        learned.check_model()?;
        let fitted = FittedModel {
            estimator: estimator.to_string(),
            samples: data.len(),
            cpds: learned.cpds().into_iter().cloned().collect(),
            queries: letter_queries(&learned)?,
        };

        info!(
            runtime_secs = start.elapsed().as_secs_f64(),
            "Musicianship pipeline complete"
        );
        Ok(MusicianshipReport {
            generated_at: chrono::Utc::now(),
            seed: sampling.seed,
            unnormalized,
            exact,
            fitted,
            output: self.config.output.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run() -> MusicianshipReport {
        let mut config = Config::default();
        config.sampling.weighted_size = 3000;
        MusicianshipPipeline::new(config).run().unwrap()
    }

    #[test]
    fn test_exact_letter_marginal() {
        let report = run();
        // P(Letter=Weak) = Σ_r P(r) P(Weak | r) over the hand-specified CPDs
        let p_rating = [
            0.6 * 0.7 * 0.3 + 0.6 * 0.3 * 0.05 + 0.4 * 0.7 * 0.9 + 0.4 * 0.3 * 0.5,
            0.6 * 0.7 * 0.4 + 0.6 * 0.3 * 0.25 + 0.4 * 0.7 * 0.08 + 0.4 * 0.3 * 0.3,
            0.6 * 0.7 * 0.3 + 0.6 * 0.3 * 0.7 + 0.4 * 0.7 * 0.02 + 0.4 * 0.3 * 0.2,
        ];
        let weak = p_rating[0] * 0.1 + p_rating[1] * 0.4 + p_rating[2] * 0.99;
        assert!((report.exact[1].factor.values()[0] - weak).abs() < 1e-12);
        assert_eq!(report.exact[1].title, "P(Letter)");
    }

    #[test]
    fn test_unnormalized_query_equals_joint() {
        let report = run();
        // Evidence pins Rating, so Letter follows P(Letter | Rating=**) scaled by P(e).
        let p_evidence = 0.6 * 0.3 * 0.25 * 0.8;
        let values = report.unnormalized.factor.values();
        assert!((values[0] - p_evidence * 0.4).abs() < 1e-12);
        assert!((values[1] - p_evidence * 0.6).abs() < 1e-12);
        assert!((report.exact[0].factor.values()[0] - 0.4).abs() < 1e-12);
    }

    #[test]
    fn test_learned_model_is_close_to_source() {
        let report = run();
        assert_eq!(report.fitted.cpds.len(), 5);
        let exact = report.exact[1].factor.values()[0];
        let learned = report.fitted.queries[1].factor.values()[0];
        assert!((exact - learned).abs() < 0.05, "{exact} vs {learned}");
    }
}
