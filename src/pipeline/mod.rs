//! Pipeline module - one pipeline per demonstration.
//!
//! Every pipeline follows the same shape: `new(config)` then `run()`,
//! which builds its inputs, logs milestones and returns a report.

mod alarm;
mod musicianship;
mod sentiment;
mod waltz;

pub use alarm::*;
pub use musicianship::*;
pub use sentiment::*;
pub use waltz::*;

use crate::bayes::{BayesianNetwork, DiscreteFactor, VariableElimination};
use crate::models::{QueryOutcome, Result};
use indicatif::{ProgressBar, ProgressStyle};

/// "P(Letter | Difficulty=Low, Musicianship=Strong)" style title.
pub(crate) fn describe_query(
    network: &BayesianNetwork,
    variable: &str,
    evidence: &[(&str, usize)],
) -> Result<String> {
    if evidence.is_empty() {
        return Ok(format!("P({variable})"));
    }
    let given = evidence
        .iter()
        .map(|(name, state)| {
            let v = network.variable(name)?;
            let label = v.states.get(*state).cloned().unwrap_or_else(|| state.to_string());
            Ok(format!("{name}={label}"))
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(format!("P({variable} | {})", given.join(", ")))
}

/// Normalized posterior of `variable`, wrapped with its title.
pub(crate) fn exact_query(
    network: &BayesianNetwork,
    infer: &VariableElimination<'_>,
    variable: &str,
    evidence: &[(&str, usize)],
    elimination_order: Option<&[&str]>,
) -> Result<QueryOutcome> {
    let factor: DiscreteFactor = infer.query_joint(&[variable], evidence, elimination_order)?;
    let mut title = describe_query(network, variable, evidence)?;
    if let Some(order) = elimination_order {
        title.push_str(&format!(" eliminating [{}]", order.join(", ")));
    }
    Ok(QueryOutcome { title, factor })
}

/// Progress bar in the crate's house style.
pub(crate) fn progress_bar(len: u64, unit: &str) -> ProgressBar {
    let pb = ProgressBar::new(len);
    let template = format!("[{{elapsed_precise}}] {{bar:40.cyan/blue}} {{pos}}/{{len}} {unit} {{msg}}");
    pb.set_style(
        ProgressStyle::default_bar()
            .template(&template)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("##-"),
    );
    pb
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bayes::networks;

    #[test]
    fn test_describe_query_uses_state_names() {
        let net = networks::musicianship().unwrap();
        assert_eq!(describe_query(&net, "Letter", &[]).unwrap(), "P(Letter)");
        assert_eq!(
            describe_query(&net, "Letter", &[("Musicianship", 0), ("Rating", 2)]).unwrap(),
            "P(Letter | Musicianship=Weak, Rating=***)"
        );
        assert!(describe_query(&net, "Letter", &[("Nope", 0)]).is_err());
    }
}
