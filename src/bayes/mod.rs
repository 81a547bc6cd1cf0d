//! Discrete Bayesian networks: factors, CPDs, inference, sampling, estimation.
//!
//! Provides:
//! - `DiscreteFactor`, `TabularCpd`: the factor algebra and conditional tables
//! - `BayesianNetwork`: graph + CPDs with model checking and fitting
//! - `VariableElimination`, `SimpleInference`: exact (normalized / raw) queries
//! - `BayesianModelSampling`: forward, rejection and likelihood-weighted sampling
//! - `networks`: the alarm and musicianship example networks

mod cpd;
mod dataset;
mod estimator;
mod factor;
mod inference;
mod network;
pub mod networks;
mod sampling;
mod table;

pub use cpd::*;
pub use dataset::*;
pub use estimator::*;
pub use factor::*;
pub use inference::*;
pub use network::*;
pub use sampling::*;
