//! Core data models for inferlab.
//!
//! Epistemic mapping:
//! - K_i (Knowledge): Report types with compile-time guarantees
//! - B_i (Beliefs): Wrapped in Result/Option
//! - I^R (Resolvable): Config parameters
//! - I^B (Bounded): Data-dependent error variants

mod config;
mod error;
mod report;

pub use config::*;
pub use error::*;
pub use report::*;
