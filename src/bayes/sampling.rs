//! Approximate inference by sampling from a Bayesian network.
//!
//! Epistemic foundation:
//! - K_i: Ancestral order guarantees parents are sampled before children
//! - K_i: Rejection samples always agree with the evidence
//! - I^B: Rare evidence makes rejection sampling slow → bounded by a draw budget

use super::dataset::Dataset;
use super::factor::DiscreteFactor;
use super::network::BayesianNetwork;
use crate::models::{InferlabError, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info};

/// Default upper bound on forward draws for one rejection-sampling call.
pub const DEFAULT_MAX_REJECTION_DRAWS: u64 = 10_000_000;

/// Seeded sampler over a checked network.
pub struct BayesianModelSampling<'a> {
    network: &'a BayesianNetwork,
    /// Node indices (into network.nodes()) in ancestral order
    order: Vec<usize>,
    rng: StdRng,
    max_rejection_draws: u64,
}

impl<'a> BayesianModelSampling<'a> {
    /// Create a sampler seeded with `seed`; fails if the model does not check.
    pub fn new(network: &'a BayesianNetwork, seed: u64) -> Result<Self> {
        network.check_model()?;
        let order = network
            .topological_order()?
            .into_iter()
            .filter_map(|n| network.node_index(n))
            .collect();
        Ok(Self {
            network,
            order,
            rng: StdRng::seed_from_u64(seed),
            max_rejection_draws: DEFAULT_MAX_REJECTION_DRAWS,
        })
    }

    /// Override the rejection-sampling draw budget.
    pub fn with_max_rejection_draws(mut self, draws: u64) -> Self {
        self.max_rejection_draws = draws.max(1);
        self
    }

    fn empty_dataset(&self, weighted: bool) -> Result<Dataset> {
        let columns = self
            .network
            .nodes()
            .into_iter()
            .map(|n| self.network.variable(n).cloned())
            .collect::<Result<Vec<_>>>()?;
        Ok(if weighted {
            Dataset::weighted(columns)
        } else {
            Dataset::new(columns)
        })
    }

    /// Map named evidence to node indices, validating states.
    fn resolve_evidence(&self, evidence: &[(&str, usize)]) -> Result<Vec<Option<usize>>> {
        let mut fixed = vec![None; self.network.len()];
        for (name, state) in evidence {
            let index = self
                .network
                .node_index(name)
                .ok_or_else(|| InferlabError::UnknownVariable(name.to_string()))?;
            self.network.variable(name)?.check_state(*state)?;
            fixed[index] = Some(*state);
        }
        Ok(fixed)
    }

    fn sample_state(&mut self, distribution: &[f64]) -> usize {
        let u: f64 = self.rng.random();
        let mut cumulative = 0.0;
        for (state, p) in distribution.iter().enumerate() {
            cumulative += p;
            if u < cumulative {
                return state;
            }
        }
        // rounding can leave the total a hair under one
        distribution.len().saturating_sub(1)
    }

    /// One ancestral pass; fixed nodes are clamped and contribute their likelihood.
    fn draw(&mut self, fixed: &[Option<usize>]) -> Result<(Vec<usize>, f64)> {
        let network = self.network;
        let nodes = network.nodes();
        let mut assignment = vec![0; nodes.len()];
        let mut weight = 1.0;
        for step in 0..self.order.len() {
            let index = self.order[step];
            let cpd = network
                .cpd(nodes[index])
                .ok_or_else(|| InferlabError::Internal(format!("no CPD for {}", nodes[index])))?;
            let parent_states = cpd
                .evidence()
                .iter()
                .map(|e| {
                    network
                        .node_index(&e.name)
                        .map(|p| assignment[p])
                        .ok_or_else(|| InferlabError::UnknownVariable(e.name.clone()))
                })
                .collect::<Result<Vec<_>>>()?;

            assignment[index] = match fixed[index] {
                Some(state) => {
                    weight *= cpd.probability(state, &parent_states);
                    state
                }
                None => {
                    let distribution = cpd.distribution(&parent_states);
                    self.sample_state(&distribution)
                }
            };
        }
        Ok((assignment, weight))
    }

    /// Plain ancestral sampling without evidence.
    pub fn forward_sample(&mut self, size: usize) -> Result<Dataset> {
        let mut data = self.empty_dataset(false)?;
        let free = vec![None; self.network.len()];
        for _ in 0..size {
            let (row, _) = self.draw(&free)?;
            data.push(row)?;
        }
        Ok(data)
    }

    /// Forward samples that agree with `evidence`, the rest discarded.
    ///
    /// B_i(P(evidence) > 0) → Result
    /// I^B(acceptance rate) → bounded by the draw budget
    pub fn rejection_sample(&mut self, evidence: &[(&str, usize)], size: usize) -> Result<Dataset> {
        let fixed = self.resolve_evidence(evidence)?;
        if evidence.is_empty() {
            return self.forward_sample(size);
        }

        let p_evidence = DiscreteFactor::product_all(&self.network.factors()?)?
            .reduce(evidence)?
            .sum();
        if p_evidence <= 0.0 {
            return Err(InferlabError::ImpossibleEvidence);
        }
        debug!(p_evidence, size, "Rejection sampling");

        let free = vec![None; fixed.len()];
        let mut data = self.empty_dataset(false)?;
        let mut draws: u64 = 0;
        while data.len() < size {
            if draws >= self.max_rejection_draws {
                return Err(InferlabError::SamplingExhausted {
                    draws,
                    accepted: data.len(),
                });
            }
            draws += 1;
            let (row, _) = self.draw(&free)?;
            let consistent = row
                .iter()
                .zip(&fixed)
                .all(|(s, f)| f.is_none_or(|e| e == *s));
            if consistent {
                data.push(row)?;
            }
        }
        info!(
            accepted = size,
            draws,
            acceptance = format!("{:.4}", size as f64 / draws.max(1) as f64),
            "Rejection sampling done"
        );
        Ok(data)
    }

    /// Samples with evidence clamped, each weighted by the evidence likelihood.
    pub fn likelihood_weighted_sample(
        &mut self,
        evidence: &[(&str, usize)],
        size: usize,
    ) -> Result<Dataset> {
        let fixed = self.resolve_evidence(evidence)?;
        let mut data = self.empty_dataset(true)?;
        for _ in 0..size {
            let (row, weight) = self.draw(&fixed)?;
            data.push_weighted(row, weight)?;
        }
        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bayes::networks;

    #[test]
    fn test_same_seed_same_samples() {
        let net = networks::alarm().unwrap();
        let a = BayesianModelSampling::new(&net, 7).unwrap().forward_sample(50).unwrap();
        let b = BayesianModelSampling::new(&net, 7).unwrap().forward_sample(50).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 50);
        assert_eq!(a.columns().len(), 5);
    }

    #[test]
    fn test_rejection_samples_respect_evidence() {
        let net = networks::alarm().unwrap();
        let mut sampler = BayesianModelSampling::new(&net, 1).unwrap();
        let data = sampler
            .rejection_sample(&[("JohnCalls", 0), ("MaryCalls", 0)], 20)
            .unwrap();
        assert_eq!(data.len(), 20);
        let j = data.column_index("JohnCalls").unwrap();
        let m = data.column_index("MaryCalls").unwrap();
        assert!(data.rows().iter().all(|r| r[j] == 0 && r[m] == 0));
    }

    #[test]
    fn test_rejection_budget_exhausted() {
        let net = networks::alarm().unwrap();
        let mut sampler = BayesianModelSampling::new(&net, 1)
            .unwrap()
            .with_max_rejection_draws(5);
        // P(Burglary=T, Earthquake=T) = 2e-6
        let err = sampler
            .rejection_sample(&[("Burglary", 0), ("Earthquake", 0)], 10)
            .unwrap_err();
        assert!(matches!(err, InferlabError::SamplingExhausted { draws: 5, .. }));
    }

    #[test]
    fn test_rejection_with_impossible_evidence() {
        let mut net = networks::musicianship().unwrap();
        // every rating yields Letter=0
        let letter = net.variable("Letter").unwrap().clone();
        let rating = net.variable("Rating").unwrap().clone();
        net.add_cpds([crate::bayes::TabularCpd::new(
            letter,
            vec![vec![1.0, 1.0, 1.0], vec![0.0, 0.0, 0.0]],
            vec![rating],
        )
        .unwrap()])
            .unwrap();
        let mut sampler = BayesianModelSampling::new(&net, 1).unwrap();
        let err = sampler.rejection_sample(&[("Letter", 1)], 1).unwrap_err();
        assert!(matches!(err, InferlabError::ImpossibleEvidence));
        assert!(err.is_data_dependent());
    }

    #[test]
    fn test_unknown_evidence_rejected() {
        let net = networks::alarm().unwrap();
        let mut sampler = BayesianModelSampling::new(&net, 1).unwrap();
        assert!(sampler.rejection_sample(&[("Ghost", 0)], 1).is_err());
        assert!(sampler.likelihood_weighted_sample(&[("Alarm", 5)], 1).is_err());
    }

    #[test]
    fn test_likelihood_weights_are_evidence_probabilities() {
        let net = networks::musicianship().unwrap();
        let mut sampler = BayesianModelSampling::new(&net, 3).unwrap();
        let data = sampler
            .likelihood_weighted_sample(&[("Musicianship", 1), ("Exam", 1)], 30)
            .unwrap();
        let music = data.column_index("Musicianship").unwrap();
        let exam = data.column_index("Exam").unwrap();
        for (i, row) in data.rows().iter().enumerate() {
            assert_eq!(row[music], 1);
            assert_eq!(row[exam], 1);
            // P(Musicianship=Strong) * P(Exam=High | Strong) = 0.3 * 0.8
            assert!((data.weight(i) - 0.24).abs() < 1e-12);
        }
    }

    #[test]
    fn test_unweighted_likelihood_sampling_without_evidence() {
        let net = networks::musicianship().unwrap();
        let mut sampler = BayesianModelSampling::new(&net, 3).unwrap();
        let data = sampler.likelihood_weighted_sample(&[], 10).unwrap();
        assert!(data.weights().unwrap().iter().all(|w| *w == 1.0));
    }

    #[test]
    fn test_forward_frequencies_approach_marginals() {
        let net = networks::musicianship().unwrap();
        let mut sampler = BayesianModelSampling::new(&net, 11).unwrap();
        let data = sampler.forward_sample(20_000).unwrap();
        let d = data.column_index("Difficulty").unwrap();
        let low = data.rows().iter().filter(|r| r[d] == 0).count() as f64 / data.len() as f64;
        assert!((low - 0.6).abs() < 0.02, "P(Difficulty=Low) estimate {low}");
    }
}
