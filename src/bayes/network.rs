//! Discrete Bayesian network model.
//!
//! Epistemic foundation:
//! - K_i: The graph is a DAG; adding an edge that closes a cycle fails
//! - K_i: A checked model has exactly one consistent CPD per node
//! - B_i: CPDs are attached after construction → check_model() before inference

use super::cpd::TabularCpd;
use super::dataset::Dataset;
use super::estimator::Estimator;
use super::factor::{DiscreteFactor, Variable};
use super::inference::VariableElimination;
use crate::models::{InferlabError, Result};
use petgraph::Direction;
use petgraph::algo::{has_path_connecting, toposort};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use std::collections::HashMap;
use serde::Serialize;
use tracing::debug;

/// A directed acyclic graph of discrete variables with tabular CPDs.
///
/// Node indices follow first-seen order and are never removed, so they double
/// as column positions for samples.
#[derive(Debug, Clone, Default)]
pub struct BayesianNetwork {
    graph: DiGraph<String, ()>,
    index: HashMap<String, NodeIndex>,
    cpds: Vec<TabularCpd>,
}

impl BayesianNetwork {
    /// Build the graph from `(parent, child)` edges.
    pub fn new(edges: &[(&str, &str)]) -> Result<Self> {
        let mut network = Self::default();
        for (parent, child) in edges {
            network.add_edge(parent, child)?;
        }
        Ok(network)
    }

    /// Add an isolated node (no-op if present).
    pub fn add_node(&mut self, name: &str) {
        self.ensure_node(name);
    }

    fn ensure_node(&mut self, name: &str) -> NodeIndex {
        if let Some(&ix) = self.index.get(name) {
            return ix;
        }
        let ix = self.graph.add_node(name.to_string());
        self.index.insert(name.to_string(), ix);
        ix
    }

    /// Add a directed edge, rejecting self-loops and cycles.
    pub fn add_edge(&mut self, parent: &str, child: &str) -> Result<()> {
        if parent == child {
            return Err(InferlabError::Cycle(parent.to_string()));
        }
        if let (Some(&p), Some(&c)) = (self.index.get(parent), self.index.get(child)) {
            if self.graph.contains_edge(p, c) {
                return Ok(());
            }
            // child already reaches parent: the new edge would close a loop
            if has_path_connecting(&self.graph, c, p, None) {
                return Err(InferlabError::Cycle(format!("{parent} -> {child}")));
            }
        }
        let p = self.ensure_node(parent);
        let c = self.ensure_node(child);
        self.graph.add_edge(p, c, ());
        Ok(())
    }

    /// Whether `name` is a node.
    pub fn has_node(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Position of `name` in [`nodes`](Self::nodes).
    pub fn node_index(&self, name: &str) -> Option<usize> {
        self.index.get(name).map(|ix| ix.index())
    }

    /// Nodes in first-seen order.
    pub fn nodes(&self) -> Vec<&str> {
        self.graph
            .node_indices()
            .map(|ix| self.graph[ix].as_str())
            .collect()
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    /// Whether the graph has no nodes.
    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Edges as `(parent, child)` in insertion order.
    pub fn edges(&self) -> Vec<(&str, &str)> {
        self.graph
            .edge_references()
            .map(|e| (self.graph[e.source()].as_str(), self.graph[e.target()].as_str()))
            .collect()
    }

    fn neighbors(&self, node: &str, direction: Direction) -> Vec<&str> {
        let Some(&ix) = self.index.get(node) else {
            return Vec::new();
        };
        // petgraph lists neighbors newest edge first
        let mut found: Vec<&str> = self
            .graph
            .neighbors_directed(ix, direction)
            .map(|n| self.graph[n].as_str())
            .collect();
        found.reverse();
        found
    }

    /// Parents of `node` in edge insertion order.
    pub fn parents(&self, node: &str) -> Vec<&str> {
        self.neighbors(node, Direction::Incoming)
    }

    /// Children of `node` in edge insertion order.
    pub fn children(&self, node: &str) -> Vec<&str> {
        self.neighbors(node, Direction::Outgoing)
    }

    /// A network with the same graph and no CPDs.
    pub fn structure(&self) -> Self {
        Self {
            graph: self.graph.clone(),
            index: self.index.clone(),
            cpds: Vec::new(),
        }
    }

    /// Attach CPDs, replacing any existing CPD for the same variable.
    pub fn add_cpds(&mut self, cpds: impl IntoIterator<Item = TabularCpd>) -> Result<()> {
        for cpd in cpds {
            let name = cpd.variable().name.clone();
            if !self.has_node(&name) {
                return Err(InferlabError::InvalidModel(format!(
                    "CPD defined for {name}, which is not in the graph"
                )));
            }
            if let Some(existing) = self.cpds.iter_mut().find(|c| c.variable().name == name) {
                debug!(variable = %name, "Replacing CPD");
                *existing = cpd;
            } else {
                self.cpds.push(cpd);
            }
        }
        Ok(())
    }

    /// CPD for `node`, if attached.
    pub fn cpd(&self, node: &str) -> Option<&TabularCpd> {
        self.cpds.iter().find(|c| c.variable().name == node)
    }

    /// CPDs in node order.
    pub fn cpds(&self) -> Vec<&TabularCpd> {
        self.nodes().into_iter().filter_map(|n| self.cpd(n)).collect()
    }

    /// Variable (with states) for `node`, taken from its CPD.
    pub fn variable(&self, node: &str) -> Result<&Variable> {
        self.cpd(node)
            .map(TabularCpd::variable)
            .ok_or_else(|| InferlabError::UnknownVariable(node.to_string()))
    }

    /// Validate CPD coverage, parent sets and cardinalities.
    ///
    /// B_i(model is consistent) → Result
    pub fn check_model(&self) -> Result<()> {
        for node in self.nodes() {
            let cpd = self
                .cpd(node)
                .ok_or_else(|| InferlabError::InvalidModel(format!("no CPD for {node}")))?;

            let mut parents: Vec<&str> = self.parents(node);
            let mut evidence: Vec<&str> = cpd.evidence().iter().map(|e| e.name.as_str()).collect();
            parents.sort_unstable();
            evidence.sort_unstable();
            if parents != evidence {
                return Err(InferlabError::InvalidModel(format!(
                    "CPD of {node} conditions on {evidence:?} but its parents are {parents:?}"
                )));
            }

            for e in cpd.evidence() {
                let parent = self.variable(&e.name)?;
                if parent.cardinality() != e.cardinality() {
                    return Err(InferlabError::InvalidModel(format!(
                        "{node} expects {} states for {}, its CPD has {}",
                        e.cardinality(),
                        e.name,
                        parent.cardinality()
                    )));
                }
            }
        }
        debug!(
            nodes = self.graph.node_count(),
            edges = self.graph.edge_count(),
            "Model checked"
        );
        Ok(())
    }

    /// Nodes ordered so every parent precedes its children.
    pub fn topological_order(&self) -> Result<Vec<&str>> {
        let order = toposort(&self.graph, None).map_err(|cycle| {
            InferlabError::Internal(format!(
                "graph has a cycle through {}",
                self.graph[cycle.node_id()]
            ))
        })?;
        Ok(order.into_iter().map(|ix| self.graph[ix].as_str()).collect())
    }

    /// Every CPD viewed as a factor.
    pub fn factors(&self) -> Result<Vec<DiscreteFactor>> {
        self.cpds().into_iter().map(TabularCpd::to_factor).collect()
    }

    /// Learn every CPD from data with the given estimator.
    ///
    /// The dataset must have a column for every node.
    pub fn fit(&mut self, data: &Dataset, estimator: &Estimator) -> Result<()> {
        if data.is_empty() {
            return Err(InferlabError::InvalidInput("cannot fit on an empty dataset".into()));
        }
        let mut learned = Vec::with_capacity(self.len());
        for node in self.nodes() {
            let mut parents = self.parents(node);
            parents.sort_unstable();
            learned.push(estimator.estimate_cpd(data, node, &parents)?);
        }
        self.add_cpds(learned)?;
        debug!(rows = data.len(), "Fitted CPDs");
        Ok(())
    }

    /// Posterior distribution of every node missing from `data`, per row.
    ///
    /// Rows act as evidence. Identical rows share one inference call.
    pub fn predict_probability(&self, data: &Dataset) -> Result<Prediction> {
        let observed: Vec<&str> = data.columns().iter().map(|c| c.name.as_str()).collect();
        for name in &observed {
            if !self.has_node(name) {
                return Err(InferlabError::UnknownVariable(name.to_string()));
            }
        }
        let missing: Vec<&str> = self
            .nodes()
            .into_iter()
            .filter(|n| !observed.contains(n))
            .collect();
        if missing.is_empty() {
            return Err(InferlabError::InvalidQuery(
                "every variable is observed, nothing to predict".into(),
            ));
        }

        let mut columns = Vec::new();
        for name in &missing {
            let variable = self.variable(name)?;
            columns.extend((0..variable.cardinality()).map(|s| format!("{name}_{s}")));
        }

        let infer = VariableElimination::new(self)?;
        let mut cache: HashMap<&[usize], Vec<f64>> = HashMap::new();
        let mut rows = Vec::with_capacity(data.len());
        for row in data.rows() {
            if let Some(hit) = cache.get(row.as_slice()) {
                rows.push(hit.clone());
                continue;
            }
            let evidence: Vec<(&str, usize)> =
                observed.iter().copied().zip(row.iter().copied()).collect();
            let mut probabilities = Vec::with_capacity(columns.len());
            for factor in infer.query(&missing, &evidence, None)? {
                probabilities.extend_from_slice(factor.values());
            }
            cache.insert(row.as_slice(), probabilities.clone());
            rows.push(probabilities);
        }

        Ok(Prediction { columns, rows })
    }
}

/// Per-row posterior probabilities, one column per `<variable>_<state>`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prediction {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<f64>>,
}

impl Prediction {
    /// Text table, optionally truncated to head and tail.
    pub fn render(&self, preview: Option<usize>, precision: usize) -> String {
        let body: Vec<Vec<String>> = self
            .rows
            .iter()
            .map(|row| row.iter().map(|p| format!("{p:.precision$}")).collect())
            .collect();
        super::table::render_frame(&self.columns, &body, preview)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bayes::networks;

    #[test]
    fn test_cycle_rejected() {
        let err = BayesianNetwork::new(&[("A", "B"), ("B", "C"), ("C", "A")]).unwrap_err();
        assert!(matches!(err, InferlabError::Cycle(_)));
        assert!(BayesianNetwork::new(&[("A", "A")]).is_err());
    }

    #[test]
    fn test_rejected_edge_leaves_graph_unchanged() {
        let mut net = BayesianNetwork::new(&[("A", "B"), ("B", "C"), ("A", "C")]).unwrap();
        assert!(net.add_edge("C", "A").is_err());
        // duplicate edges are ignored
        net.add_edge("A", "B").unwrap();
        assert_eq!(net.edges(), vec![("A", "B"), ("B", "C"), ("A", "C")]);
        assert_eq!(net.parents("C"), vec!["B", "A"]);
        assert_eq!(net.node_index("C"), Some(2));

        net.add_edge("D", "A").unwrap();
        let order = net.topological_order().unwrap();
        let pos = |n: &str| order.iter().position(|x| *x == n).unwrap();
        assert!(pos("D") < pos("A") && pos("A") < pos("B") && pos("B") < pos("C"));
        assert_eq!(net.structure().edges().len(), 4);
    }

    #[test]
    fn test_parents_in_edge_order() {
        let net = networks::alarm().unwrap();
        assert_eq!(net.parents("Alarm"), vec!["Burglary", "Earthquake"]);
        assert_eq!(net.children("Alarm"), vec!["JohnCalls", "MaryCalls"]);
        assert!(net.parents("Burglary").is_empty());
    }

    #[test]
    fn test_topological_order() {
        let net = networks::musicianship().unwrap();
        let order = net.topological_order().unwrap();
        assert_eq!(order.len(), 5);
        let pos = |n: &str| order.iter().position(|x| *x == n).unwrap();
        for (p, c) in net.edges() {
            assert!(pos(p) < pos(c), "{p} must precede {c}");
        }
    }

    #[test]
    fn test_check_model_requires_every_cpd() {
        let net = networks::alarm().unwrap();
        assert!(net.check_model().is_ok());

        let bare = net.structure();
        assert!(matches!(bare.check_model(), Err(InferlabError::InvalidModel(_))));
    }

    #[test]
    fn test_check_model_rejects_parent_mismatch() {
        let mut net = BayesianNetwork::new(&[("A", "B")]).unwrap();
        let a = Variable::new("A", &["0", "1"]);
        let b = Variable::new("B", &["0", "1"]);
        net.add_cpds([
            TabularCpd::root(a, &[0.5, 0.5]).unwrap(),
            TabularCpd::root(b, &[0.5, 0.5]).unwrap(),
        ])
        .unwrap();
        let err = net.check_model().unwrap_err();
        assert!(err.to_string().contains("parents"));
    }

    #[test]
    fn test_check_model_rejects_cardinality_mismatch() {
        let mut net = BayesianNetwork::new(&[("A", "B")]).unwrap();
        let a = Variable::new("A", &["0", "1", "2"]);
        let a_as_seen_by_b = Variable::new("A", &["0", "1"]);
        let b = Variable::new("B", &["0", "1"]);
        net.add_cpds([
            TabularCpd::root(a, &[0.2, 0.3, 0.5]).unwrap(),
            TabularCpd::new(b, vec![vec![0.1, 0.6], vec![0.9, 0.4]], vec![a_as_seen_by_b])
                .unwrap(),
        ])
        .unwrap();
        assert!(net.check_model().is_err());
    }

    #[test]
    fn test_add_cpd_for_unknown_node_fails() {
        let mut net = BayesianNetwork::new(&[("A", "B")]).unwrap();
        let z = Variable::new("Z", &["0", "1"]);
        assert!(net.add_cpds([TabularCpd::root(z, &[0.5, 0.5]).unwrap()]).is_err());
    }

    #[test]
    fn test_predict_probability_matches_query() {
        let net = networks::alarm().unwrap();
        let mut data = Dataset::new(
            ["Burglary", "Earthquake", "Alarm", "JohnCalls"]
                .iter()
                .map(|n| net.variable(n).unwrap().clone())
                .collect(),
        );
        data.push(vec![1, 1, 0, 0]).unwrap();
        data.push(vec![1, 1, 1, 1]).unwrap();
        data.push(vec![1, 1, 0, 0]).unwrap();

        let prediction = net.predict_probability(&data).unwrap();
        assert_eq!(prediction.columns, vec!["MaryCalls_0", "MaryCalls_1"]);
        assert_eq!(prediction.rows.len(), 3);
        // MaryCalls depends only on Alarm
        assert!((prediction.rows[0][0] - 0.7).abs() < 1e-9);
        assert!((prediction.rows[1][0] - 0.1).abs() < 1e-9);
        assert_eq!(prediction.rows[0], prediction.rows[2]);
    }
}
