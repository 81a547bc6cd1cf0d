//! Constraint satisfaction over finite domains.
//!
//! Provides:
//! - `Problem`: variables, domains, constraints; backtracking search with
//!   forward checking and generalized arc consistency
//! - `waltz`: the line-labeling drawing and its junction predicates

mod problem;
pub mod waltz;

pub use problem::*;
