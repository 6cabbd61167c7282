//! Sampling, simulation, marginal propagation and stationary distributions
//! for small finite Markov chains given as dense transition matrices.

pub mod classify;
pub mod distribution;
pub mod error;
pub mod kernel;
pub mod linalg;
pub mod marginal;
pub mod path;
pub mod prelude;
pub mod sampler;
pub mod simulation;
pub mod stationary;
pub mod units;

/// Absolute tolerance for the sum of a probability vector or kernel row.
pub const PROBABILITY_TOLERANCE: f64 = 1e-8;
