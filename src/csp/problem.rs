//! Finite-domain constraint problems and their solver.
//!
//! Epistemic foundation:
//! - K_i: Every constraint scope names declared variables (checked on insert)
//! - K_i: A reported solution satisfies every constraint
//! - B_i: Callers may name unknown variables or redeclare one → Result

use crate::models::{InferlabError, Result};
use std::collections::VecDeque;
use std::fmt;
use tracing::debug;

/// A relation over the values of its scope, in scope order.
pub trait Constraint<V> {
    /// Whether a complete assignment of the scope satisfies the relation.
    fn satisfied(&self, values: &[&V]) -> bool;

    /// Name used in logs.
    fn name(&self) -> &str {
        "constraint"
    }
}

/// Constraint backed by an arbitrary predicate.
pub struct FunctionConstraint<V> {
    name: String,
    predicate: Box<dyn Fn(&[&V]) -> bool>,
}

impl<V> FunctionConstraint<V> {
    pub fn new(name: impl Into<String>, predicate: impl Fn(&[&V]) -> bool + 'static) -> Self {
        Self {
            name: name.into(),
            predicate: Box::new(predicate),
        }
    }
}

impl<V> Constraint<V> for FunctionConstraint<V> {
    fn satisfied(&self, values: &[&V]) -> bool {
        (self.predicate)(values)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl<V> fmt::Debug for FunctionConstraint<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionConstraint")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// A complete assignment, in variable declaration order.
#[derive(Debug, Clone, PartialEq)]
pub struct Solution<V> {
    names: Vec<String>,
    values: Vec<V>,
}

impl<V> Solution<V> {
    /// Value assigned to `name`.
    pub fn get(&self, name: &str) -> Option<&V> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|i| &self.values[i])
    }

    /// Values in declaration order.
    pub fn values(&self) -> &[V] {
        &self.values
    }

    pub fn into_values(self) -> Vec<V> {
        self.values
    }
}

struct Scoped<V> {
    constraint: Box<dyn Constraint<V>>,
    scope: Vec<usize>,
}

/// Variables with finite domains plus constraints over them.
pub struct Problem<V> {
    names: Vec<String>,
    domains: Vec<Vec<V>>,
    constraints: Vec<Scoped<V>>,
}

impl<V> Default for Problem<V> {
    fn default() -> Self {
        Self {
            names: Vec::new(),
            domains: Vec::new(),
            constraints: Vec::new(),
        }
    }
}

impl<V: Clone + PartialEq> Problem<V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a variable. Names are unique; domains are non-empty.
    pub fn add_variable(&mut self, name: &str, domain: Vec<V>) -> Result<()> {
        if self.index(name).is_some() {
            return Err(InferlabError::InvalidInput(format!(
                "variable {name} declared twice"
            )));
        }
        if domain.is_empty() {
            return Err(InferlabError::InvalidInput(format!(
                "variable {name} has an empty domain"
            )));
        }
        self.names.push(name.to_string());
        self.domains.push(domain);
        Ok(())
    }

    /// Declare several variables sharing one domain.
    pub fn add_variables(&mut self, names: &[&str], domain: &[V]) -> Result<()> {
        for name in names {
            self.add_variable(name, domain.to_vec())?;
        }
        Ok(())
    }

    /// Constrain the variables in `scope` (values reach the constraint in this order).
    pub fn add_constraint(
        &mut self,
        constraint: impl Constraint<V> + 'static,
        scope: &[&str],
    ) -> Result<()> {
        let scope = scope
            .iter()
            .map(|name| {
                self.index(name)
                    .ok_or_else(|| InferlabError::UnknownVariable(name.to_string()))
            })
            .collect::<Result<Vec<_>>>()?;
        self.constraints.push(Scoped {
            constraint: Box::new(constraint),
            scope,
        });
        Ok(())
    }

    fn index(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    /// Declared variable names.
    pub fn variables(&self) -> &[String] {
        &self.names
    }

    /// Current domain of `name`.
    pub fn domain(&self, name: &str) -> Option<&[V]> {
        self.index(name).map(|i| self.domains[i].as_slice())
    }

    /// Every solution, in search order.
    pub fn get_solutions(&self) -> Vec<Solution<V>> {
        let mut out = Vec::new();
        self.solve(None, &mut out);
        out
    }

    /// The first solution found, if any.
    pub fn get_solution(&self) -> Option<Solution<V>> {
        let mut out = Vec::new();
        self.solve(Some(1), &mut out);
        out.pop()
    }

    fn solve(&self, limit: Option<usize>, out: &mut Vec<Solution<V>>) {
        if self.domains.iter().any(Vec::is_empty) {
            return;
        }
        let mut degree = vec![0usize; self.names.len()];
        for c in &self.constraints {
            for &v in &c.scope {
                degree[v] += 1;
            }
        }
        let mut assignment: Vec<Option<V>> = vec![None; self.names.len()];
        let mut nodes = 0usize;
        self.backtrack(
            self.domains.clone(),
            &mut assignment,
            &degree,
            limit,
            out,
            &mut nodes,
        );
        debug!(solutions = out.len(), nodes, "Search finished");
    }

    /// Returns false once `limit` solutions have been collected.
    fn backtrack(
        &self,
        domains: Vec<Vec<V>>,
        assignment: &mut Vec<Option<V>>,
        degree: &[usize],
        limit: Option<usize>,
        out: &mut Vec<Solution<V>>,
        nodes: &mut usize,
    ) -> bool {
        // Most constraints, then smallest domain, then declaration order.
        let next = (0..self.names.len())
            .filter(|&v| assignment[v].is_none())
            .min_by_key(|&v| (std::cmp::Reverse(degree[v]), domains[v].len(), v));
        let Some(var) = next else {
            let values = assignment.iter().flatten().cloned().collect();
            out.push(Solution {
                names: self.names.clone(),
                values,
            });
            return limit.is_none_or(|l| out.len() < l);
        };

        for value in &domains[var] {
            *nodes += 1;
            assignment[var] = Some(value.clone());
            if let Some(pruned) = self.forward_check(var, &domains, assignment)
                && !self.backtrack(pruned, assignment, degree, limit, out, nodes)
            {
                assignment[var] = None;
                return false;
            }
        }
        assignment[var] = None;
        true
    }

    /// Check constraints touching `var`; prune the last open variable of each.
    ///
    /// Returns `None` when the assignment fails or a domain empties.
    fn forward_check(
        &self,
        var: usize,
        domains: &[Vec<V>],
        assignment: &[Option<V>],
    ) -> Option<Vec<Vec<V>>> {
        let mut domains = domains.to_vec();
        domains[var] = vec![assignment[var].clone()?];
        for c in self.constraints.iter().filter(|c| c.scope.contains(&var)) {
            let open: Vec<usize> = c
                .scope
                .iter()
                .copied()
                .filter(|&v| assignment[v].is_none())
                .collect();
            match open.as_slice() {
                [] => {
                    let values: Vec<&V> = c.scope.iter().filter_map(|&v| assignment[v].as_ref()).collect();
                    if !c.constraint.satisfied(&values) {
                        return None;
                    }
                }
                [only] => {
                    let only = *only;
                    let kept: Vec<V> = domains[only]
                        .iter()
                        .filter(|candidate| {
                            let values: Vec<&V> = c
                                .scope
                                .iter()
                                .map(|&v| {
                                    if v == only {
                                        Some(*candidate)
                                    } else {
                                        assignment[v].as_ref()
                                    }
                                })
                                .collect::<Option<Vec<_>>>()
                                .unwrap_or_default();
                            values.len() == c.scope.len() && c.constraint.satisfied(&values)
                        })
                        .cloned()
                        .collect();
                    if kept.is_empty() {
                        return None;
                    }
                    domains[only] = kept;
                }
                _ => {}
            }
        }
        Some(domains)
    }

    /// Generalized arc consistency over the current domains (Waltz filtering).
    ///
    /// Removes every value with no supporting tuple in some constraint and
    /// returns how many values were removed. Solutions are never lost.
    pub fn filter_domains(&mut self) -> usize {
        let mut queue: VecDeque<usize> = (0..self.constraints.len()).collect();
        let mut queued = vec![true; self.constraints.len()];
        let mut removed = 0usize;

        while let Some(ci) = queue.pop_front() {
            queued[ci] = false;
            let scope = self.constraints[ci].scope.clone();
            for (position, &var) in scope.iter().enumerate() {
                let before = self.domains[var].len();
                let supported: Vec<V> = self.domains[var]
                    .iter()
                    .filter(|value| self.has_support(ci, position, value))
                    .cloned()
                    .collect();
                if supported.len() == before {
                    continue;
                }
                removed += before - supported.len();
                debug!(
                    variable = %self.names[var],
                    constraint = self.constraints[ci].constraint.name(),
                    pruned = before - supported.len(),
                    "Pruned domain"
                );
                self.domains[var] = supported;
                for (other, c) in self.constraints.iter().enumerate() {
                    if other != ci && !queued[other] && c.scope.contains(&var) {
                        queued[other] = true;
                        queue.push_back(other);
                    }
                }
            }
        }
        removed
    }

    /// Whether some tuple of the other scope variables' domains satisfies
    /// constraint `ci` with `value` at `position`.
    fn has_support(&self, ci: usize, position: usize, value: &V) -> bool {
        let scoped = &self.constraints[ci];
        let choices: Vec<&[V]> = scoped
            .scope
            .iter()
            .enumerate()
            .map(|(i, &v)| {
                if i == position {
                    std::slice::from_ref(value)
                } else {
                    self.domains[v].as_slice()
                }
            })
            .collect();
        if choices.iter().any(|c| c.is_empty()) {
            return false;
        }

        // Odometer over the cartesian product.
        let mut cursor = vec![0usize; choices.len()];
        loop {
            let tuple: Vec<&V> = cursor.iter().zip(&choices).map(|(&i, c)| &c[i]).collect();
            if scoped.constraint.satisfied(&tuple) {
                return true;
            }
            let mut digit = choices.len();
            loop {
                if digit == 0 {
                    return false;
                }
                digit -= 1;
                cursor[digit] += 1;
                if cursor[digit] < choices[digit].len() {
                    break;
                }
                cursor[digit] = 0;
            }
        }
    }
}
