use std::fmt::Display;

use backtrace::Backtrace as trc;
use ndarray::{Array1, Array2, ArrayView1};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::distribution::max_abs_difference;
use crate::error::{check_dimension, get_backtrace};
use crate::linalg::solve;
use crate::prelude::*;

/// Stopping rule for [`solve_stationary_dist`].
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Largest absolute component change between two iterates that counts as converged.
    pub tolerance: f64,
    pub max_iterations: usize,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            tolerance: 1e-8,
            max_iterations: 1000,
        }
    }
}

impl SolverConfig {
    pub fn new(tolerance: f64, max_iterations: usize) -> Result<Self, ErrorKind> {
        let config = Self {
            tolerance,
            max_iterations,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ErrorKind> {
        if !self.tolerance.is_finite() || self.tolerance <= 0. {
            return Err(ErrorKind::from(ArgumentError::InvalidTolerance {
                tolerance: self.tolerance,
                context: get_backtrace(),
            }));
        }
        if self.max_iterations == 0 {
            return Err(ErrorKind::from(ArgumentError::ZeroIterationLimit {
                context: get_backtrace(),
            }));
        }
        Ok(())
    }
}

/// How the iterative solve ended.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum Convergence {
    Converged { iterations: usize, error: f64 },
    Exhausted { iterations: usize, error: f64 },
}

impl Display for Convergence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Convergence::Converged { iterations, error } => {
                write!(f, "converged in {iterations} iterations (error {error:e})")
            }
            Convergence::Exhausted { iterations, error } => {
                write!(
                    f,
                    "failed to converge in {iterations} iterations (error {error:e})"
                )
            }
        }
    }
}

impl Convergence {
    pub fn is_converged(&self) -> bool {
        matches!(self, Convergence::Converged { .. })
    }

    pub fn iterations(&self) -> usize {
        match self {
            Convergence::Converged { iterations, .. }
            | Convergence::Exhausted { iterations, .. } => *iterations,
        }
    }

    pub fn error(&self) -> f64 {
        match self {
            Convergence::Converged { error, .. } | Convergence::Exhausted { error, .. } => *error,
        }
    }
}

/// Result of the iterative solve. `distribution` is the last iterate whether
/// or not the iteration converged; check [`StationaryEstimate::convergence`]
/// before treating it as stationary.
#[derive(Clone, Debug, PartialEq)]
pub struct StationaryEstimate {
    distribution: Array1<f64>,
    convergence: Convergence,
}

impl StationaryEstimate {
    pub fn distribution(&self) -> &Array1<f64> {
        &self.distribution
    }

    pub fn convergence(&self) -> Convergence {
        self.convergence
    }

    pub fn is_converged(&self) -> bool {
        self.convergence.is_converged()
    }

    pub fn iterations(&self) -> usize {
        self.convergence.iterations()
    }

    pub fn error(&self) -> f64 {
        self.convergence.error()
    }

    /// The final iterate, or [`SolveError::NonConvergence`] if the budget ran out.
    pub fn into_converged(self) -> Result<Array1<f64>, ErrorKind> {
        match self.convergence {
            Convergence::Converged { .. } => Ok(self.distribution),
            Convergence::Exhausted { iterations, error } => {
                Err(ErrorKind::from(SolveError::NonConvergence {
                    iterations,
                    error,
                    context: get_backtrace(),
                }))
            }
        }
    }
}

/// Fixed-point iteration `psi <- psi * P` starting from `initial`.
///
/// `initial` does not have to be a probability vector. Running out of
/// iterations is reported through [`Convergence::Exhausted`], not as an error.
pub fn solve_stationary_dist(
    initial: ArrayView1<f64>,
    kernel: &Kernel,
    config: &SolverConfig,
) -> Result<StationaryEstimate, ErrorKind> {
    config.validate()?;
    check_dimension(kernel.n_states(), initial.len())?;

    let mut psi = initial.to_owned();
    let mut iterations = 0;
    let mut error = f64::INFINITY;
    while iterations < config.max_iterations {
        let next = psi.dot(kernel.as_array());
        error = max_abs_difference(next.view(), psi.view());
        psi = next;
        iterations += 1;
        if error <= config.tolerance {
            let convergence = Convergence::Converged { iterations, error };
            debug!(%convergence, "stationary iteration");
            return Ok(StationaryEstimate {
                distribution: psi,
                convergence,
            });
        }
    }
    let convergence = Convergence::Exhausted { iterations, error };
    warn!(%convergence, "stationary iteration");
    Ok(StationaryEstimate {
        distribution: psi,
        convergence,
    })
}

/// Solves `psi (I - P + 1) = 1` directly, where `1` is the all-ones matrix
/// on the left and the all-ones vector on the right.
///
/// The all-ones term folds the constraint `sum(psi) = 1` into the fixed-point
/// equation, so the zero vector is not a solution. Fails with
/// [`SolveError::Singular`] when the system has no unique solution, which
/// happens for kernels with more than one recurrent class.
pub fn solve_stationary_direct(kernel: &Kernel) -> Result<Distribution, ErrorKind> {
    let n = kernel.n_states();
    let system = Array2::<f64>::eye(n) - kernel.as_array() + 1.;
    let rhs = Array1::<f64>::ones(n);
    let psi = solve(system.t(), rhs.view()).map_err(|error| {
        warn!(%error, n_states = n, "direct stationary solve");
        error
    })?;
    // Round-off can leave tiny negative entries for near-zero components.
    let psi = psi.mapv(|p| if p < 0. && p > -PROBABILITY_TOLERANCE { 0. } else { p });
    Distribution::from_weights(psi)
}

/// Whether `distribution * P` equals `distribution` within `tolerance`.
pub fn is_stationary(
    distribution: &Distribution,
    kernel: &Kernel,
    tolerance: f64,
) -> Result<bool, ErrorKind> {
    let next = kernel.apply(distribution)?;
    Ok(max_abs_difference(next.view(), distribution.view()) <= tolerance)
}

#[non_exhaustive]
#[derive(Debug, Clone, Error)]
pub enum SolveError {
    #[error("System is singular (no usable pivot in column {pivot_column})")]
    Singular { pivot_column: usize, context: trc },

    #[error("Iteration did not converge after {iterations} iterations (error {error})")]
    NonConvergence {
        iterations: usize,
        error: f64,
        context: trc,
    },
}
