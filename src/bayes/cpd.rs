//! Tabular conditional probability distributions.
//!
//! K_i: A CPD table has one row per state of the variable and one column per
//! joint assignment of the evidence, first evidence variable most significant.
//! K_i: Columns are distributions (entries in [0, 1], summing to one).

use super::factor::{DiscreteFactor, Variable};
use crate::models::{InferlabError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Column sums may deviate from one by at most this much.
pub const COLUMN_SUM_TOLERANCE: f64 = 0.01;

/// P(variable | evidence) as an explicit table.
///
/// Deserialization goes through [`TabularCpd::new`], so a loaded table is
/// validated like a hand-built one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawCpd")]
pub struct TabularCpd {
    variable: Variable,
    evidence: Vec<Variable>,
    /// values[state][column]
    values: Vec<Vec<f64>>,
}

/// Unchecked wire form of [`TabularCpd`].
#[derive(Deserialize)]
struct RawCpd {
    variable: Variable,
    #[serde(default)]
    evidence: Vec<Variable>,
    values: Vec<Vec<f64>>,
}

impl TryFrom<RawCpd> for TabularCpd {
    type Error = InferlabError;

    fn try_from(raw: RawCpd) -> Result<Self> {
        Self::new(raw.variable, raw.values, raw.evidence)
    }
}

impl TabularCpd {
    /// Build and validate a CPD.
    ///
    /// B_i(table shape matches cardinalities) → Result
    /// B_i(every column is a distribution) → Result
    pub fn new(variable: Variable, values: Vec<Vec<f64>>, evidence: Vec<Variable>) -> Result<Self> {
        let cpd = Self {
            variable,
            evidence,
            values,
        };
        cpd.validate()?;
        Ok(cpd)
    }

    /// A CPD without evidence.
    pub fn root(variable: Variable, probabilities: &[f64]) -> Result<Self> {
        let values = probabilities.iter().map(|p| vec![*p]).collect();
        Self::new(variable, values, Vec::new())
    }

    fn validate(&self) -> Result<()> {
        let name = &self.variable.name;
        if self.variable.cardinality() == 0 {
            return Err(InferlabError::cpd(name, "variable has no states"));
        }
        if self.values.len() != self.variable.cardinality() {
            return Err(InferlabError::cpd(
                name,
                format!(
                    "expected {} rows, got {}",
                    self.variable.cardinality(),
                    self.values.len()
                ),
            ));
        }
        let columns = self.columns();
        for (state, row) in self.values.iter().enumerate() {
            if row.len() != columns {
                return Err(InferlabError::cpd(
                    name,
                    format!("row {state} has {} columns, expected {columns}", row.len()),
                ));
            }
            if let Some(bad) = row.iter().find(|p| !(0.0..=1.0).contains(*p)) {
                return Err(InferlabError::cpd(
                    name,
                    format!("probability {bad} outside [0, 1]"),
                ));
            }
        }
        for column in 0..columns {
            let sum: f64 = self.values.iter().map(|row| row[column]).sum();
            if (sum - 1.0).abs() > COLUMN_SUM_TOLERANCE {
                return Err(InferlabError::cpd(
                    name,
                    format!("column {column} sums to {sum}, expected 1"),
                ));
            }
        }
        if self.evidence.iter().any(|e| e.name == *name) {
            return Err(InferlabError::cpd(name, "variable lists itself as evidence"));
        }
        for (i, e) in self.evidence.iter().enumerate() {
            if self.evidence[..i].iter().any(|other| other.name == e.name) {
                return Err(InferlabError::cpd(
                    name,
                    format!("evidence {} listed twice", e.name),
                ));
            }
        }
        Ok(())
    }

    /// The variable this CPD is defined for.
    pub fn variable(&self) -> &Variable {
        &self.variable
    }

    /// Evidence (parent) variables in column order.
    pub fn evidence(&self) -> &[Variable] {
        &self.evidence
    }

    /// Number of evidence configurations (table columns).
    pub fn columns(&self) -> usize {
        self.evidence.iter().map(Variable::cardinality).product()
    }

    /// The table, one row per state.
    pub fn values(&self) -> &[Vec<f64>] {
        &self.values
    }

    /// Column index for a full evidence assignment given in evidence order.
    pub fn column_index(&self, evidence_states: &[usize]) -> usize {
        self.evidence
            .iter()
            .zip(evidence_states)
            .fold(0, |acc, (e, s)| acc * e.cardinality() + s)
    }

    /// P(variable = state | evidence = evidence_states).
    pub fn probability(&self, state: usize, evidence_states: &[usize]) -> f64 {
        self.values[state][self.column_index(evidence_states)]
    }

    /// The conditional distribution for one evidence configuration.
    pub fn distribution(&self, evidence_states: &[usize]) -> Vec<f64> {
        let column = self.column_index(evidence_states);
        self.values.iter().map(|row| row[column]).collect()
    }

    /// View as a factor over `[variable, evidence...]`.
    pub fn to_factor(&self) -> Result<DiscreteFactor> {
        let mut variables = vec![self.variable.clone()];
        variables.extend(self.evidence.iter().cloned());
        let values = self.values.iter().flatten().copied().collect();
        DiscreteFactor::new(variables, values)
    }
}

impl fmt::Display for TabularCpd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let precision = f.precision().unwrap_or(4);
        let columns = self.columns();
        let mut rows: Vec<Vec<String>> = Vec::new();

        // one header row per evidence variable
        for (i, e) in self.evidence.iter().enumerate() {
            let inner: usize = self.evidence[i + 1..]
                .iter()
                .map(Variable::cardinality)
                .product();
            let mut row = vec![e.name.clone()];
            for column in 0..columns {
                let state = (column / inner) % e.cardinality();
                row.push(e.state_label(state));
            }
            rows.push(row);
        }

        for (state, values) in self.values.iter().enumerate() {
            let mut row = vec![self.variable.state_label(state)];
            row.extend(values.iter().map(|p| format!("{p:.precision$}")));
            rows.push(row);
        }
        write!(f, "{}", super::table::render_plain(&rows))
    }
}
