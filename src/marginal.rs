//! Distribution of the state `k` steps ahead, estimated by simulation or
//! computed exactly by applying the kernel.

use ndarray::Array1;
use rand::Rng;
use tracing::debug;

use crate::error::{check_dimension, check_state, get_backtrace};
use crate::prelude::*;

/// Relative frequency of each of `n_states` states among `states`.
pub fn empirical_distribution(
    states: &[StateIndex],
    n_states: usize,
) -> Result<Distribution, ErrorKind> {
    if states.is_empty() {
        return Err(ErrorKind::from(ArgumentError::ZeroSampleCount {
            context: get_backtrace(),
        }));
    }
    let mut counts = Array1::<f64>::zeros(n_states);
    for state in states {
        check_state(*state, n_states)?;
        counts[state.to_usize()] += 1.;
    }
    Distribution::from_weights(counts)
}

/// Monte Carlo estimate of `initial * P^steps` from `n_samples` trials.
pub fn marginal_dist_mc<R: Rng + ?Sized>(
    initial: &Distribution,
    kernel: &Kernel,
    steps: usize,
    n_samples: usize,
    rng: &mut R,
) -> Result<Distribution, ErrorKind> {
    let states = terminal_states(initial, kernel, steps, n_samples, rng)?;
    let estimate = empirical_distribution(&states, kernel.n_states())?;
    debug!(steps, n_samples, %estimate, "monte carlo marginal estimate");
    Ok(estimate)
}

/// [`marginal_dist_mc`] with the trials spread over the rayon pool.
pub fn par_marginal_dist_mc(
    initial: &Distribution,
    kernel: &Kernel,
    steps: usize,
    n_samples: usize,
    seed: u64,
) -> Result<Distribution, ErrorKind> {
    let states = par_terminal_states(initial, kernel, steps, n_samples, seed)?;
    let estimate = empirical_distribution(&states, kernel.n_states())?;
    debug!(steps, n_samples, seed, %estimate, "parallel monte carlo marginal estimate");
    Ok(estimate)
}

/// `initial * P^steps`, applying the kernel `steps` times.
pub fn marginal_dist_exact(
    initial: &Distribution,
    kernel: &Kernel,
    steps: usize,
) -> Result<Distribution, ErrorKind> {
    check_dimension(kernel.n_states(), initial.len())?;
    let mut current = initial.clone();
    for _ in 0..steps {
        current = kernel.apply(&current)?;
    }
    Ok(current)
}
