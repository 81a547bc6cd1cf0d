//! Exact inference over a checked Bayesian network.
//!
//! Epistemic foundation:
//! - K_i: Both engines operate on the CPD factors of a model that passed check_model()
//! - B_i: Evidence may have zero probability → ImpossibleEvidence when normalizing
//! - I^R: Elimination order is caller-resolvable; a min-weight heuristic fills the rest

use super::factor::DiscreteFactor;
use super::network::BayesianNetwork;
use crate::models::{InferlabError, Result};
use tracing::debug;

/// Reject unknown variables, out-of-range states and query/evidence overlap.
fn validate_query(
    network: &BayesianNetwork,
    variables: &[&str],
    evidence: &[(&str, usize)],
) -> Result<()> {
    if variables.is_empty() {
        return Err(InferlabError::InvalidQuery("no query variables".into()));
    }
    for (i, name) in variables.iter().enumerate() {
        network.variable(name)?;
        if variables[..i].contains(name) {
            return Err(InferlabError::InvalidQuery(format!("{name} queried twice")));
        }
        if evidence.iter().any(|(e, _)| e == name) {
            return Err(InferlabError::InvalidQuery(format!(
                "{name} is both queried and observed"
            )));
        }
    }
    for (i, (name, state)) in evidence.iter().enumerate() {
        network.variable(name)?.check_state(*state)?;
        if evidence[..i].iter().any(|(other, s)| other == name && s != state) {
            return Err(InferlabError::InvalidQuery(format!(
                "conflicting evidence for {name}"
            )));
        }
    }
    Ok(())
}

/// Variable elimination: normalized posterior marginals.
pub struct VariableElimination<'a> {
    network: &'a BayesianNetwork,
    factors: Vec<DiscreteFactor>,
}

impl<'a> VariableElimination<'a> {
    /// Prepare inference; fails if the model does not check.
    pub fn new(network: &'a BayesianNetwork) -> Result<Self> {
        network.check_model()?;
        Ok(Self {
            network,
            factors: network.factors()?,
        })
    }

    /// Posterior marginal of each query variable given evidence.
    ///
    /// Returns one normalized factor per query variable, in query order.
    pub fn query(
        &self,
        variables: &[&str],
        evidence: &[(&str, usize)],
        elimination_order: Option<&[&str]>,
    ) -> Result<Vec<DiscreteFactor>> {
        validate_query(self.network, variables, evidence)?;
        variables
            .iter()
            .map(|v| self.query_joint(&[*v], evidence, elimination_order))
            .collect()
    }

    /// Normalized joint posterior over all query variables.
    pub fn query_joint(
        &self,
        variables: &[&str],
        evidence: &[(&str, usize)],
        elimination_order: Option<&[&str]>,
    ) -> Result<DiscreteFactor> {
        validate_query(self.network, variables, evidence)?;

        let mut factors = self
            .factors
            .iter()
            .map(|f| f.reduce(evidence))
            .collect::<Result<Vec<_>>>()?;

        let hidden: Vec<&str> = self
            .network
            .nodes()
            .into_iter()
            .filter(|n| !variables.contains(n) && !evidence.iter().any(|(e, _)| e == n))
            .collect();
        let order = self.elimination_order(&factors, &hidden, elimination_order)?;
        debug!(query = ?variables, order = ?order, "Eliminating");

        for var in &order {
            let (touching, rest): (Vec<_>, Vec<_>) =
                factors.into_iter().partition(|f| f.contains(var));
            factors = rest;
            if touching.is_empty() {
                continue;
            }
            let product = DiscreteFactor::product_all(&touching)?;
            factors.push(product.marginalize(&[var.as_str()]));
        }

        DiscreteFactor::product_all(&factors)?.normalize()
    }

    /// Resolve the elimination order for `hidden` variables.
    ///
    /// An explicit order may list only hidden variables; hidden variables it
    /// leaves out are appended by the min-weight heuristic.
    fn elimination_order(
        &self,
        factors: &[DiscreteFactor],
        hidden: &[&str],
        explicit: Option<&[&str]>,
    ) -> Result<Vec<String>> {
        let mut order: Vec<String> = Vec::with_capacity(hidden.len());
        if let Some(explicit) = explicit {
            for name in explicit {
                if !self.network.has_node(name) {
                    return Err(InferlabError::UnknownVariable(name.to_string()));
                }
                if !hidden.contains(name) {
                    return Err(InferlabError::InvalidQuery(format!(
                        "elimination order names {name}, which is queried or observed"
                    )));
                }
                if !order.iter().any(|o| o == name) {
                    order.push(name.to_string());
                }
            }
        }

        // simulate eliminating the explicit prefix, then pick greedily
        let mut scopes: Vec<Vec<(String, usize)>> = factors
            .iter()
            .map(|f| {
                f.variables()
                    .iter()
                    .map(|v| (v.name.clone(), v.cardinality()))
                    .collect()
            })
            .collect();
        for name in &order {
            eliminate_scope(&mut scopes, name);
        }
        let mut remaining: Vec<&str> = hidden
            .iter()
            .copied()
            .filter(|h| !order.iter().any(|o| o == h))
            .collect();
        while !remaining.is_empty() {
            let (best, _) = remaining
                .iter()
                .enumerate()
                .map(|(i, name)| (i, elimination_weight(&scopes, name)))
                .min_by_key(|(_, w)| *w)
                .unwrap_or((0, 0));
            let name = remaining.remove(best);
            eliminate_scope(&mut scopes, name);
            order.push(name.to_string());
        }
        Ok(order)
    }
}

/// Size of the factor created by eliminating `name`.
fn elimination_weight(scopes: &[Vec<(String, usize)>], name: &str) -> usize {
    let mut merged: Vec<(&str, usize)> = Vec::new();
    for scope in scopes.iter().filter(|s| s.iter().any(|(n, _)| n == name)) {
        for (n, card) in scope {
            if n != name && !merged.iter().any(|(m, _)| *m == n.as_str()) {
                merged.push((n.as_str(), *card));
            }
        }
    }
    merged.iter().map(|(_, c)| c).product()
}

fn eliminate_scope(scopes: &mut Vec<Vec<(String, usize)>>, name: &str) {
    let (touching, mut rest): (Vec<_>, Vec<_>) = std::mem::take(scopes)
        .into_iter()
        .partition(|s| s.iter().any(|(n, _)| n == name));
    let mut merged: Vec<(String, usize)> = Vec::new();
    for (n, card) in touching.into_iter().flatten() {
        if n != name && !merged.iter().any(|(m, _)| *m == n) {
            merged.push((n, card));
        }
    }
    rest.push(merged);
    *scopes = rest;
}

/// Un-normalized inference: the joint of query variables and evidence.
///
/// K_i: Result sums to P(evidence), not to one.
pub struct SimpleInference<'a> {
    network: &'a BayesianNetwork,
    factors: Vec<DiscreteFactor>,
}

impl<'a> SimpleInference<'a> {
    /// Prepare inference; fails if the model does not check.
    pub fn new(network: &'a BayesianNetwork) -> Result<Self> {
        network.check_model()?;
        Ok(Self {
            network,
            factors: network.factors()?,
        })
    }

    /// Multiply every factor, reduce by evidence, sum out the rest.
    pub fn query(&self, variables: &[&str], evidence: &[(&str, usize)]) -> Result<DiscreteFactor> {
        validate_query(self.network, variables, evidence)?;
        let joint = DiscreteFactor::product_all(&self.factors)?;
        let reduced = joint.reduce(evidence)?;
        let others: Vec<&str> = self
            .network
            .nodes()
            .into_iter()
            .filter(|n| !variables.contains(n))
            .collect();
        Ok(reduced.marginalize(&others))
    }
}
