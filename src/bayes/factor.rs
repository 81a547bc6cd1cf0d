//! Discrete factors and the factor algebra used by inference.
//!
//! K_i: Values are stored row-major, first variable most significant.
//! K_i: Every operation returns a new factor; factors are immutable values.

use crate::models::{InferlabError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A named discrete random variable with ordered state names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variable {
    /// Variable name
    pub name: String,
    /// State names; index 0 is the first state
    pub states: Vec<String>,
}

impl Variable {
    /// Create a variable from its name and state names.
    pub fn new(name: impl Into<String>, states: &[&str]) -> Self {
        Self {
            name: name.into(),
            states: states.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Create a variable whose states are named `0..cardinality`.
    pub fn with_cardinality(name: impl Into<String>, cardinality: usize) -> Self {
        Self {
            name: name.into(),
            states: (0..cardinality).map(|i| i.to_string()).collect(),
        }
    }

    /// Number of states.
    pub fn cardinality(&self) -> usize {
        self.states.len()
    }

    /// Human-readable label for a state, e.g. `Alarm(True)`.
    pub fn state_label(&self, state: usize) -> String {
        match self.states.get(state) {
            Some(name) => format!("{}({})", self.name, name),
            None => format!("{}_{}", self.name, state),
        }
    }

    /// Fail unless `state` indexes one of this variable's states.
    pub fn check_state(&self, state: usize) -> Result<()> {
        if state < self.cardinality() {
            Ok(())
        } else {
            Err(InferlabError::UnknownState {
                variable: self.name.clone(),
                state,
                cardinality: self.cardinality(),
            })
        }
    }
}

/// A non-negative function over the joint states of its variables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawFactor")]
pub struct DiscreteFactor {
    variables: Vec<Variable>,
    values: Vec<f64>,
}

#[derive(Deserialize)]
struct RawFactor {
    variables: Vec<Variable>,
    values: Vec<f64>,
}

impl TryFrom<RawFactor> for DiscreteFactor {
    type Error = InferlabError;

    fn try_from(raw: RawFactor) -> Result<Self> {
        Self::new(raw.variables, raw.values)
    }
}

impl DiscreteFactor {
    /// Create a factor, checking that `values` covers every joint state.
    pub fn new(variables: Vec<Variable>, values: Vec<f64>) -> Result<Self> {
        let expected: usize = variables.iter().map(Variable::cardinality).product();
        if values.len() != expected {
            return Err(InferlabError::InvalidInput(format!(
                "factor over {:?} needs {} values, got {}",
                variables.iter().map(|v| v.name.as_str()).collect::<Vec<_>>(),
                expected,
                values.len()
            )));
        }
        for (i, v) in variables.iter().enumerate() {
            if variables[..i].iter().any(|w| w.name == v.name) {
                return Err(InferlabError::InvalidInput(format!(
                    "variable {} appears twice in factor",
                    v.name
                )));
            }
        }
        Ok(Self { variables, values })
    }

    /// The multiplicative identity: no variables, single value 1.
    pub fn unit() -> Self {
        Self {
            variables: Vec::new(),
            values: vec![1.0],
        }
    }

    /// Variables in storage order.
    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    /// Raw values in row-major order.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Names of the variables in scope.
    pub fn scope(&self) -> Vec<&str> {
        self.variables.iter().map(|v| v.name.as_str()).collect()
    }

    /// Whether `name` is in scope.
    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.variables.iter().position(|v| v.name == name)
    }

    fn strides(&self) -> Vec<usize> {
        let mut strides = vec![1; self.variables.len()];
        for i in (0..self.variables.len().saturating_sub(1)).rev() {
            strides[i] = strides[i + 1] * self.variables[i + 1].cardinality();
        }
        strides
    }

    fn assignment_of(&self, mut index: usize) -> Vec<usize> {
        let mut assignment = vec![0; self.variables.len()];
        for (i, v) in self.variables.iter().enumerate().rev() {
            let card = v.cardinality();
            assignment[i] = index % card;
            index /= card;
        }
        assignment
    }

    /// Sum of all values.
    pub fn sum(&self) -> f64 {
        self.values.iter().sum()
    }

    /// Value at a full assignment given by name.
    pub fn value(&self, assignment: &[(&str, usize)]) -> Result<f64> {
        let strides = self.strides();
        let mut index = 0;
        for (i, v) in self.variables.iter().enumerate() {
            let (_, state) = assignment
                .iter()
                .find(|(name, _)| *name == v.name)
                .ok_or_else(|| {
                    InferlabError::InvalidQuery(format!("assignment is missing {}", v.name))
                })?;
            v.check_state(*state)?;
            index += state * strides[i];
        }
        Ok(self.values[index])
    }

    /// Pointwise product over the union of both scopes.
    ///
    /// Shared variables must agree on cardinality.
    pub fn product(&self, other: &Self) -> Result<Self> {
        let mut variables = self.variables.clone();
        for v in &other.variables {
            match self.position(&v.name) {
                Some(i) if self.variables[i].cardinality() != v.cardinality() => {
                    return Err(InferlabError::InvalidInput(format!(
                        "cardinality mismatch for {} in factor product",
                        v.name
                    )));
                }
                Some(_) => {}
                None => variables.push(v.clone()),
            }
        }

        let self_strides = self.strides();
        let other_strides = other.strides();
        let other_map: Vec<usize> = other
            .variables
            .iter()
            .map(|v| variables.iter().position(|w| w.name == v.name).unwrap_or(0))
            .collect();

        let mut result = Self {
            values: Vec::new(),
            variables,
        };
        let len: usize = result.variables.iter().map(Variable::cardinality).product();
        let mut values = Vec::with_capacity(len);
        for index in 0..len {
            let assignment = result.assignment_of(index);
            let a: usize = (0..self.variables.len())
                .map(|i| assignment[i] * self_strides[i])
                .sum();
            let b: usize = other_map
                .iter()
                .enumerate()
                .map(|(j, &pos)| assignment[pos] * other_strides[j])
                .sum();
            values.push(self.values[a] * other.values[b]);
        }
        result.values = values;
        Ok(result)
    }

    /// Fix evidence variables and drop them from scope.
    ///
    /// Evidence on variables outside the scope is ignored.
    pub fn reduce(&self, evidence: &[(&str, usize)]) -> Result<Self> {
        let mut fixed: Vec<Option<usize>> = vec![None; self.variables.len()];
        for (name, state) in evidence {
            if let Some(i) = self.position(name) {
                self.variables[i].check_state(*state)?;
                fixed[i] = Some(*state);
            }
        }
        if fixed.iter().all(Option::is_none) {
            return Ok(self.clone());
        }

        let variables: Vec<Variable> = self
            .variables
            .iter()
            .zip(&fixed)
            .filter(|(_, f)| f.is_none())
            .map(|(v, _)| v.clone())
            .collect();
        let values = self
            .values
            .iter()
            .enumerate()
            .filter(|(index, _)| {
                self.assignment_of(*index)
                    .iter()
                    .zip(&fixed)
                    .all(|(state, f)| f.is_none_or(|s| s == *state))
            })
            .map(|(_, v)| *v)
            .collect();
        Ok(Self { variables, values })
    }

    /// Sum out the named variables.
    ///
    /// Names outside the scope are ignored.
    pub fn marginalize(&self, names: &[&str]) -> Self {
        let keep: Vec<bool> = self
            .variables
            .iter()
            .map(|v| !names.contains(&v.name.as_str()))
            .collect();
        if keep.iter().all(|k| *k) {
            return self.clone();
        }

        let mut result = Self {
            variables: self
                .variables
                .iter()
                .zip(&keep)
                .filter(|(_, k)| **k)
                .map(|(v, _)| v.clone())
                .collect(),
            values: Vec::new(),
        };
        let len: usize = result.variables.iter().map(Variable::cardinality).product();
        let strides = result.strides();
        let mut values = vec![0.0; len];
        for (index, value) in self.values.iter().enumerate() {
            let assignment = self.assignment_of(index);
            let target: usize = assignment
                .iter()
                .zip(&keep)
                .filter(|(_, k)| **k)
                .map(|(s, _)| *s)
                .zip(&strides)
                .map(|(s, stride)| s * stride)
                .sum();
            values[target] += value;
        }
        result.values = values;
        result
    }

    /// Scale values to sum to one.
    ///
    /// B_i(total mass > 0) → Result; zero mass means impossible evidence.
    pub fn normalize(&self) -> Result<Self> {
        let total = self.sum();
        if total <= 0.0 || !total.is_finite() {
            return Err(InferlabError::ImpossibleEvidence);
        }
        Ok(Self {
            variables: self.variables.clone(),
            values: self.values.iter().map(|v| v / total).collect(),
        })
    }

    /// Product of a non-empty list of factors.
    pub fn product_all<'a>(factors: impl IntoIterator<Item = &'a Self>) -> Result<Self> {
        factors
            .into_iter()
            .try_fold(Self::unit(), |acc, f| acc.product(f))
    }
}

impl fmt::Display for DiscreteFactor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let precision = f.precision().unwrap_or(4);
        let mut header: Vec<String> = self.variables.iter().map(|v| v.name.clone()).collect();
        header.push(format!("phi({})", self.scope().join(",")));

        let rows: Vec<Vec<String>> = self
            .values
            .iter()
            .enumerate()
            .map(|(index, value)| {
                let mut row: Vec<String> = self
                    .assignment_of(index)
                    .iter()
                    .zip(&self.variables)
                    .map(|(s, v)| v.state_label(*s))
                    .collect();
                row.push(format!("{value:.precision$}"));
                row
            })
            .collect();
        write!(f, "{}", super::table::render_grid(&header, &rows))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ab() -> DiscreteFactor {
        DiscreteFactor::new(
            vec![
                Variable::new("A", &["a0", "a1"]),
                Variable::new("B", &["b0", "b1", "b2"]),
            ],
            vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0],
        )
        .unwrap()
    }

    fn bc() -> DiscreteFactor {
        DiscreteFactor::new(
            vec![
                Variable::new("B", &["b0", "b1", "b2"]),
                Variable::new("C", &["c0", "c1"]),
            ],
            vec![0.5, 0.5, 0.1, 0.9, 1.0, 0.0],
        )
        .unwrap()
    }

    #[test]
    fn test_new_rejects_wrong_length() {
        let err = DiscreteFactor::new(vec![Variable::with_cardinality("A", 2)], vec![1.0]);
        assert!(err.is_err());

        let json = r#"{"variables": [{"name": "A", "states": ["0", "1"]}], "values": [1.0]}"#;
        assert!(serde_json::from_str::<DiscreteFactor>(json).is_err());
    }

    #[test]
    fn test_value_lookup_is_row_major() {
        let f = ab();
        assert_eq!(f.value(&[("A", 0), ("B", 2)]).unwrap(), 3.0);
        assert_eq!(f.value(&[("B", 0), ("A", 1)]).unwrap(), 4.0);
    }

    #[test]
    fn test_product_multiplies_matching_states() {
        let p = ab().product(&bc()).unwrap();
        assert_eq!(p.scope(), vec!["A", "B", "C"]);
        assert_eq!(p.values().len(), 12);
        // A=1, B=1, C=1 → 5.0 * 0.9
        assert!((p.value(&[("A", 1), ("B", 1), ("C", 1)]).unwrap() - 4.5).abs() < 1e-12);
        // A=0, B=2, C=1 → 3.0 * 0.0
        assert_eq!(p.value(&[("A", 0), ("B", 2), ("C", 1)]).unwrap(), 0.0);
    }

    #[test]
    fn test_product_with_unit_is_identity() {
        assert_eq!(DiscreteFactor::unit().product(&ab()).unwrap().values(), ab().values());
    }

    #[test]
    fn test_reduce_drops_fixed_variables() {
        let r = ab().reduce(&[("B", 1), ("Z", 0)]).unwrap();
        assert_eq!(r.scope(), vec!["A"]);
        assert_eq!(r.values(), &[2.0, 5.0]);
    }

    #[test]
    fn test_reduce_rejects_out_of_range_state() {
        assert!(matches!(
            ab().reduce(&[("B", 3)]),
            Err(InferlabError::UnknownState { .. })
        ));
    }

    #[test]
    fn test_marginalize_sums_out() {
        let m = ab().marginalize(&["A"]);
        assert_eq!(m.scope(), vec!["B"]);
        assert_eq!(m.values(), &[5.0, 7.0, 9.0]);

        let all = ab().marginalize(&["A", "B"]);
        assert!(all.scope().is_empty());
        assert_eq!(all.values(), &[21.0]);
    }

    #[test]
    fn test_normalize() {
        let n = ab().marginalize(&["B"]).normalize().unwrap();
        assert!((n.values()[0] - 6.0 / 21.0).abs() < 1e-12);
        assert!((n.sum() - 1.0).abs() < 1e-12);

        let zero = DiscreteFactor::new(vec![Variable::with_cardinality("A", 2)], vec![0.0, 0.0])
            .unwrap();
        assert!(matches!(zero.normalize(), Err(InferlabError::ImpossibleEvidence)));
    }

    #[test]
    fn test_display_lists_every_state() {
        let text = ab().marginalize(&["B"]).to_string();
        assert!(text.contains("A(a0)"));
        assert!(text.contains("phi(A)"));
        assert!(text.contains("6.0000"));
    }
}
