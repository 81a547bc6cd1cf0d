//! Waltz line labeling of a fixed drawing with fifteen edges.
//!
//! Each edge gets one of four labels and every junction restricts the
//! labels its edges may take together.

use super::problem::{FunctionConstraint, Problem};
use crate::models::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info};

/// Line label. The discriminant is the numeric code printed for a labeling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Label {
    /// Occluding, one orientation
    A = 0,
    /// Occluding, the other orientation
    R = 1,
    /// Concave
    M = 2,
    /// Convex
    P = 3,
}

impl Label {
    pub const ALL: [Label; 4] = [Label::A, Label::R, Label::M, Label::P];

    pub fn code(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::A => "A",
            Self::R => "R",
            Self::M => "M",
            Self::P => "P",
        };
        f.write_str(s)
    }
}

use Label::{A, M, P, R};

/// Two-edge corner.
pub fn l_junction(x: Label, y: Label) -> bool {
    matches!((x, y), (R, P) | (R, R) | (P, R) | (A, M) | (A, A) | (M, A))
}

/// Three edges, one angle above 180 degrees; the shaft is the middle edge.
pub fn arrow(x: Label, y: Label, z: Label) -> bool {
    matches!((x, y, z), (A, P, A) | (M, P, M) | (P, M, P))
}

/// Three edges, every angle below 180 degrees.
pub fn fork(x: Label, y: Label, z: Label) -> bool {
    matches!(
        (x, y, z),
        (A, A, M) | (M, A, A) | (A, M, A) | (P, P, P) | (M, M, M)
    )
}

/// Junction shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum JunctionKind {
    L,
    Arrow,
    Fork,
}

impl JunctionKind {
    /// Whether `labels` (in junction edge order) is a legal configuration.
    pub fn admits(self, labels: &[Label]) -> bool {
        match (self, labels) {
            (Self::L, &[x, y]) => l_junction(x, y),
            (Self::Arrow, &[x, y, z]) => arrow(x, y, z),
            (Self::Fork, &[x, y, z]) => fork(x, y, z),
            _ => false,
        }
    }
}

/// A junction and the edges meeting at it.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Junction {
    pub kind: JunctionKind,
    pub edges: &'static [&'static str],
}

/// Edge names, in output order.
pub const EDGES: [&str; 15] = [
    "E1", "E2", "E3", "E4", "E5", "E6", "E7", "E8", "E9", "E10", "E11", "E12", "E13", "E14",
    "E15",
];

/// Junctions of the drawing.
pub const JUNCTIONS: [Junction; 11] = [
    Junction { kind: JunctionKind::L, edges: &["E1", "E2"] },
    Junction { kind: JunctionKind::L, edges: &["E5", "E6"] },
    Junction { kind: JunctionKind::L, edges: &["E7", "E8"] },
    Junction { kind: JunctionKind::Fork, edges: &["E4", "E3", "E14"] },
    Junction { kind: JunctionKind::Fork, edges: &["E9", "E11", "E10"] },
    Junction { kind: JunctionKind::Fork, edges: &["E12", "E13", "E15"] },
    Junction { kind: JunctionKind::Arrow, edges: &["E8", "E9", "E1"] },
    Junction { kind: JunctionKind::Arrow, edges: &["E2", "E10", "E3"] },
    Junction { kind: JunctionKind::Arrow, edges: &["E4", "E15", "E5"] },
    Junction { kind: JunctionKind::Arrow, edges: &["E6", "E13", "E7"] },
    Junction { kind: JunctionKind::Arrow, edges: &["E12", "E14", "E11"] },
];

/// The drawing as a constraint problem over [`EDGES`].
pub fn build_problem() -> Result<Problem<Label>> {
    let mut problem = Problem::new();
    problem.add_variables(&EDGES, &Label::ALL)?;
    for junction in JUNCTIONS {
        let kind = junction.kind;
        let name = format!("{kind:?}{:?}", junction.edges);
        let constraint = FunctionConstraint::new(name, move |values: &[&Label]| {
            let labels: Vec<Label> = values.iter().map(|l| **l).collect();
            kind.admits(&labels)
        });
        problem.add_constraint(constraint, junction.edges)?;
    }
    debug!(edges = EDGES.len(), junctions = JUNCTIONS.len(), "Built Waltz problem");
    Ok(problem)
}

/// Every labeling of the drawing.
#[derive(Debug, Clone, Serialize)]
pub struct WaltzSolution {
    /// Whether domains were filtered before search
    pub filtered: bool,
    /// Values removed by filtering
    pub pruned: usize,
    /// Domain of each edge after filtering, in [`EDGES`] order
    pub domains: Vec<Vec<Label>>,
    /// Labelings in [`EDGES`] order, sorted by numeric code
    pub labelings: Vec<Vec<Label>>,
}

/// Label the drawing, optionally running Waltz filtering first.
pub fn solve(filter: bool) -> Result<WaltzSolution> {
    let mut problem = build_problem()?;
    let pruned = if filter { problem.filter_domains() } else { 0 };
    let domains: Vec<Vec<Label>> = EDGES
        .iter()
        .map(|edge| problem.domain(edge).map(<[Label]>::to_vec).unwrap_or_default())
        .collect();

    let mut labelings: Vec<Vec<Label>> = problem
        .get_solutions()
        .into_iter()
        .map(|s| s.into_values())
        .collect();
    labelings.sort();
    info!(filtered = filter, pruned, labelings = labelings.len(), "Solved Waltz drawing");
    Ok(WaltzSolution {
        filtered: filter,
        pruned,
        domains,
        labelings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn satisfies_every_junction(labeling: &[Label]) -> bool {
        JUNCTIONS.iter().all(|j| {
            let labels: Vec<Label> = j
                .edges
                .iter()
                .map(|e| labeling[EDGES.iter().position(|x| x == e).unwrap()])
                .collect();
            j.kind.admits(&labels)
        })
    }

    #[test]
    fn test_predicate_tables() {
        assert!(l_junction(R, P) && l_junction(M, A));
        assert!(!l_junction(P, P));
        assert!(arrow(P, M, P) && !arrow(P, P, P));
        assert!(fork(P, P, P) && fork(A, A, M) && !fork(M, M, A));
        assert!(!JunctionKind::L.admits(&[A, A, A]));
    }

    #[test]
    fn test_every_labeling_satisfies_the_junctions() {
        let solution = solve(false).unwrap();
        assert_eq!(solution.labelings.len(), 4);
        for labeling in &solution.labelings {
            assert!(satisfies_every_junction(labeling));
        }
        assert_eq!(
            solution.labelings[0].iter().map(|l| l.code()).collect::<Vec<_>>(),
            vec![0, 0, 0, 0, 0, 0, 0, 0, 3, 3, 3, 3, 3, 2, 3]
        );
    }

    #[test]
    fn test_filtering_keeps_every_solution() {
        let plain = solve(false).unwrap();
        let filtered = solve(true).unwrap();
        assert!(filtered.pruned > 0);
        assert_eq!(plain.labelings, filtered.labelings);
        for labeling in &plain.labelings {
            for (label, domain) in labeling.iter().zip(&filtered.domains) {
                assert!(domain.contains(label));
            }
        }
        // E9 is forced convex, E14 concave.
        assert_eq!(filtered.domains[8], vec![P]);
        assert_eq!(filtered.domains[13], vec![M]);
    }
}
