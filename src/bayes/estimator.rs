//! Parameter estimation: learning CPDs from (possibly weighted) samples.

use super::cpd::TabularCpd;
use super::dataset::Dataset;
use super::factor::Variable;
use crate::models::{EstimationConfig, InferlabError, PriorKind, Result};
use serde::Serialize;
use std::fmt;

/// Dirichlet prior for Bayesian estimation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum Prior {
    /// Bayesian Dirichlet equivalent uniform: the equivalent sample size is
    /// spread evenly over every cell of the CPD.
    BDeu { equivalent_sample_size: f64 },
    /// One pseudo-count per cell.
    K2,
}

/// How CPDs are learned from data.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum Estimator {
    /// Relative frequencies; unseen parent configurations become uniform.
    MaximumLikelihood,
    /// Posterior mean under a Dirichlet prior.
    Bayesian(Prior),
}

impl Default for Estimator {
    fn default() -> Self {
        Self::Bayesian(Prior::BDeu {
            equivalent_sample_size: 5.0,
        })
    }
}

impl fmt::Display for Estimator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MaximumLikelihood => write!(f, "maximum likelihood"),
            Self::Bayesian(Prior::BDeu {
                equivalent_sample_size,
            }) => write!(f, "Bayesian (BDeu, ess={equivalent_sample_size})"),
            Self::Bayesian(Prior::K2) => write!(f, "Bayesian (K2)"),
        }
    }
}

impl Estimator {
    /// Estimator described by the `[estimation]` config section.
    pub fn from_config(config: &EstimationConfig) -> Self {
        match config.prior {
            PriorKind::Bdeu => Self::Bayesian(Prior::BDeu {
                equivalent_sample_size: config.equivalent_sample_size,
            }),
            PriorKind::K2 => Self::Bayesian(Prior::K2),
            PriorKind::None => Self::MaximumLikelihood,
        }
    }

    /// Learn P(node | parents) from `data`.
    pub fn estimate_cpd(&self, data: &Dataset, node: &str, parents: &[&str]) -> Result<TabularCpd> {
        let (variable, evidence, counts) = state_counts(data, node, parents)?;
        let columns = counts.first().map(Vec::len).unwrap_or(0);
        let pseudo = match self {
            Self::MaximumLikelihood => 0.0,
            Self::Bayesian(Prior::K2) => 1.0,
            Self::Bayesian(Prior::BDeu {
                equivalent_sample_size,
            }) => equivalent_sample_size / (variable.cardinality() * columns) as f64,
        };

        let card = variable.cardinality();
        let mut values = vec![vec![0.0; columns]; card];
        for column in 0..columns {
            let total: f64 = counts.iter().map(|row| row[column] + pseudo).sum();
            for state in 0..card {
                values[state][column] = if total > 0.0 {
                    (counts[state][column] + pseudo) / total
                } else {
                    1.0 / card as f64
                };
            }
        }
        TabularCpd::new(variable, values, evidence)
    }
}

/// Weighted counts of each node state per parent configuration.
///
/// Returns the node variable, the parent variables and `counts[state][column]`.
pub fn state_counts(
    data: &Dataset,
    node: &str,
    parents: &[&str],
) -> Result<(Variable, Vec<Variable>, Vec<Vec<f64>>)> {
    let column_of = |name: &str| -> Result<usize> {
        data.column_index(name)
            .ok_or_else(|| InferlabError::UnknownVariable(name.to_string()))
    };
    let node_index = column_of(node)?;
    let parent_indices = parents
        .iter()
        .map(|p| column_of(*p))
        .collect::<Result<Vec<_>>>()?;

    let variable = data.columns()[node_index].clone();
    let evidence: Vec<Variable> = parent_indices
        .iter()
        .map(|&i| data.columns()[i].clone())
        .collect();
    let columns: usize = evidence.iter().map(Variable::cardinality).product();

    let mut counts = vec![vec![0.0; columns]; variable.cardinality()];
    for (i, row) in data.rows().iter().enumerate() {
        let column = parent_indices
            .iter()
            .zip(&evidence)
            .fold(0, |acc, (&p, e)| acc * e.cardinality() + row[p]);
        counts[row[node_index]][column] += data.weight(i);
    }
    Ok((variable, evidence, counts))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tiny() -> Dataset {
        let mut data = Dataset::new(vec![
            Variable::new("A", &["0", "1"]),
            Variable::new("B", &["0", "1"]),
        ]);
        for row in [[0, 0], [0, 0], [0, 1], [1, 1]] {
            data.push(row.to_vec()).unwrap();
        }
        data
    }

    #[test]
    fn test_state_counts_by_parent_configuration() {
        let (_, evidence, counts) = state_counts(&tiny(), "B", &["A"]).unwrap();
        assert_eq!(evidence[0].name, "A");
        assert_eq!(counts, vec![vec![2.0, 0.0], vec![1.0, 1.0]]);
    }

    #[test]
    fn test_maximum_likelihood() {
        let cpd = Estimator::MaximumLikelihood
            .estimate_cpd(&tiny(), "B", &["A"])
            .unwrap();
        assert!((cpd.probability(0, &[0]) - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(cpd.probability(1, &[1]), 1.0);
    }

    #[test]
    fn test_unseen_configuration_is_uniform() {
        let mut data = Dataset::new(vec![
            Variable::new("A", &["0", "1"]),
            Variable::new("B", &["0", "1", "2"]),
        ]);
        data.push(vec![0, 2]).unwrap();
        let cpd = Estimator::MaximumLikelihood
            .estimate_cpd(&data, "B", &["A"])
            .unwrap();
        assert_eq!(cpd.distribution(&[1]), vec![1.0 / 3.0; 3]);
    }

    #[test]
    fn test_bdeu_pseudo_counts() {
        let estimator = Estimator::Bayesian(Prior::BDeu {
            equivalent_sample_size: 4.0,
        });
        let cpd = estimator.estimate_cpd(&tiny(), "B", &["A"]).unwrap();
        // pseudo = 4 / (2 states * 2 columns) = 1
        assert!((cpd.probability(0, &[0]) - 3.0 / 5.0).abs() < 1e-12);
        assert!((cpd.probability(0, &[1]) - 1.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_k2_on_root() {
        let cpd = Estimator::Bayesian(Prior::K2)
            .estimate_cpd(&tiny(), "A", &[])
            .unwrap();
        // (3 + 1) / (4 + 2)
        assert!((cpd.probability(0, &[]) - 4.0 / 6.0).abs() < 1e-12);
    }

    #[test]
    fn test_weights_scale_counts() {
        let mut data = Dataset::weighted(vec![Variable::new("A", &["0", "1"])]);
        data.push_weighted(vec![0], 3.0).unwrap();
        data.push_weighted(vec![1], 1.0).unwrap();
        let cpd = Estimator::MaximumLikelihood.estimate_cpd(&data, "A", &[]).unwrap();
        assert!((cpd.probability(0, &[]) - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_unknown_column() {
        assert!(Estimator::default().estimate_cpd(&tiny(), "C", &[]).is_err());
    }

    #[test]
    fn test_from_config() {
        let config = EstimationConfig {
            prior: PriorKind::None,
            equivalent_sample_size: 5.0,
        };
        assert_eq!(Estimator::from_config(&config), Estimator::MaximumLikelihood);
        assert_eq!(Estimator::from_config(&EstimationConfig::default()), Estimator::default());
    }
}
