use std::fmt::Display;

use hashbrown::HashMap;
use itertools::Itertools;
use ndarray::Array2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{check_dimension, check_state, get_backtrace};
use crate::prelude::*;

/// Trials handled by one worker in the parallel batch. Fixed so that the
/// output only depends on the seed, not on the number of threads.
const TRIALS_PER_CHUNK: usize = 1024;

/// A realized sequence of states, starting with the initial state.
#[derive(Clone, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SamplePath(Vec<StateIndex>);

impl Display for SamplePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.iter().join(" -> "))
    }
}

impl From<SamplePath> for Vec<StateIndex> {
    fn from(path: SamplePath) -> Self {
        path.0
    }
}

impl SamplePath {
    pub fn states(&self) -> &[StateIndex] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn first(&self) -> Option<StateIndex> {
        self.0.first().copied()
    }

    pub fn last(&self) -> Option<StateIndex> {
        self.0.last().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &StateIndex> {
        self.0.iter()
    }

    pub fn visit_counts(&self) -> HashMap<StateIndex, usize> {
        let mut counts = HashMap::new();
        for state in &self.0 {
            *counts.entry(*state).or_insert(0) += 1;
        }
        counts
    }

    /// Fraction of time spent in each of `n_states` states.
    pub fn empirical_distribution(&self, n_states: usize) -> Result<Distribution, ErrorKind> {
        empirical_distribution(&self.0, n_states)
    }

    /// `counts[i][j]` is the number of observed steps from `i` to `j`.
    pub fn transition_counts(&self, n_states: usize) -> Result<Array2<usize>, ErrorKind> {
        let mut counts = Array2::zeros((n_states, n_states));
        for state in &self.0 {
            check_state(*state, n_states)?;
        }
        for (from, to) in self.0.iter().tuple_windows() {
            counts[(from.to_usize(), to.to_usize())] += 1;
        }
        Ok(counts)
    }

    /// Maximum-likelihood kernel for the observed transitions.
    ///
    /// States that are never left along the path get a self loop.
    pub fn estimate_kernel(&self, n_states: usize) -> Result<Kernel, ErrorKind> {
        let counts = self.transition_counts(n_states)?;
        let mut matrix = Array2::zeros((n_states, n_states));
        for (state, row) in counts.rows().into_iter().enumerate() {
            let total = row.sum();
            if total == 0 {
                matrix[(state, state)] = 1.;
                continue;
            }
            for (next, count) in row.iter().enumerate() {
                matrix[(state, next)] = *count as f64 / total as f64;
            }
        }
        Kernel::new(matrix)
    }
}

fn step<R: Rng + ?Sized>(
    kernel: &Kernel,
    state: StateIndex,
    rng: &mut R,
) -> Result<StateIndex, ErrorKind> {
    draw(kernel.row(state)?, rng)
}

/// Simulates `length` states of the chain, the first of which is `initial_state`.
pub fn sample_path<R: Rng + ?Sized>(
    initial_state: StateIndex,
    kernel: &Kernel,
    length: usize,
    rng: &mut R,
) -> Result<SamplePath, ErrorKind> {
    if length == 0 {
        return Err(ErrorKind::from(ArgumentError::ZeroPathLength {
            context: get_backtrace(),
        }));
    }
    check_state(initial_state, kernel.n_states())?;
    let mut states = Vec::with_capacity(length);
    states.push(initial_state);
    let mut current = initial_state;
    for _ in 1..length {
        current = step(kernel, current, rng)?;
        states.push(current);
    }
    Ok(SamplePath(states))
}

/// One trial: draw the start from `initial`, then take `steps` transitions.
pub fn terminal_state<R: Rng + ?Sized>(
    initial: &Distribution,
    kernel: &Kernel,
    steps: usize,
    rng: &mut R,
) -> Result<StateIndex, ErrorKind> {
    check_dimension(kernel.n_states(), initial.len())?;
    let mut current = initial.sample(rng)?;
    for _ in 0..steps {
        current = step(kernel, current, rng)?;
    }
    Ok(current)
}

/// Final states of `n_samples` independent trials of `steps` transitions each.
pub fn terminal_states<R: Rng + ?Sized>(
    initial: &Distribution,
    kernel: &Kernel,
    steps: usize,
    n_samples: usize,
    rng: &mut R,
) -> Result<Vec<StateIndex>, ErrorKind> {
    check_batch(initial, kernel, n_samples)?;
    (0..n_samples)
        .map(|_| terminal_state(initial, kernel, steps, rng))
        .collect()
}

/// Like [`terminal_states`] with every trial starting in `initial_state`.
pub fn terminal_states_from<R: Rng + ?Sized>(
    initial_state: StateIndex,
    kernel: &Kernel,
    steps: usize,
    n_samples: usize,
    rng: &mut R,
) -> Result<Vec<StateIndex>, ErrorKind> {
    let initial = Distribution::point(kernel.n_states(), initial_state)?;
    terminal_states(&initial, kernel, steps, n_samples, rng)
}

/// Parallel [`terminal_states`]. Trials are grouped into fixed-size chunks,
/// each with its own generator derived from `seed`.
pub fn par_terminal_states(
    initial: &Distribution,
    kernel: &Kernel,
    steps: usize,
    n_samples: usize,
    seed: u64,
) -> Result<Vec<StateIndex>, ErrorKind> {
    check_batch(initial, kernel, n_samples)?;
    let mut seeder = StdRng::seed_from_u64(seed);
    let chunk_seeds = (0..n_samples.div_ceil(TRIALS_PER_CHUNK))
        .map(|chunk| {
            let size = TRIALS_PER_CHUNK.min(n_samples - chunk * TRIALS_PER_CHUNK);
            (seeder.gen::<u64>(), size)
        })
        .collect::<Vec<_>>();
    let chunks = chunk_seeds
        .into_par_iter()
        .map(|(chunk_seed, size)| {
            let mut rng = StdRng::seed_from_u64(chunk_seed);
            (0..size)
                .map(|_| terminal_state(initial, kernel, steps, &mut rng))
                .collect::<Result<Vec<_>, _>>()
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(chunks.into_iter().flatten().collect())
}

fn check_batch(initial: &Distribution, kernel: &Kernel, n_samples: usize) -> Result<(), ErrorKind> {
    if n_samples == 0 {
        return Err(ErrorKind::from(ArgumentError::ZeroSampleCount {
            context: get_backtrace(),
        }));
    }
    check_dimension(kernel.n_states(), initial.len())
}
