use std::fmt::Display;

use crate::error::check_dimension;
use crate::prelude::*;

#[derive(Clone, Debug, PartialEq)]
pub struct Step {
    time: Time,
    distribution: Distribution,
}

impl Step {
    pub fn new(time: Time, distribution: Distribution) -> Step {
        Step { time, distribution }
    }
    pub fn time(&self) -> Time {
        self.time
    }
    pub fn distribution(&self) -> &Distribution {
        &self.distribution
    }
    pub fn entropy(&self) -> Entropy {
        self.distribution.entropy()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct History {
    steps: Vec<Step>,
}

impl History {
    pub fn new(initial: Distribution) -> History {
        History {
            steps: vec![Step::new(Time::new(), initial)],
        }
    }
    pub fn steps(&self) -> &Vec<Step> {
        &self.steps
    }
    pub fn time(&self, time: Time) -> Option<&Step> {
        self.steps.get(time.to_usize())
    }
    pub fn first(&self) -> &Step {
        &self.steps[0]
    }
    pub fn last(&self) -> &Step {
        &self.steps[self.steps.len() - 1]
    }
    pub fn append(&mut self, step: Step) {
        self.steps.push(step);
    }
}

/// Deterministic evolution of a distribution under a kernel, keeping every
/// intermediate distribution.
#[derive(Clone, Debug, PartialEq)]
pub struct Simulation {
    kernel: Kernel,
    history: History,
}

impl Display for Simulation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Simulation:")?;
        writeln!(f, "  Time: {}", self.time())?;
        writeln!(f, "  Entropy: {}", self.entropy())?;
        writeln!(f, "  Distribution: {}", self.distribution())?;
        write!(f, "  {}", self.kernel)
    }
}

impl Iterator for Simulation {
    type Item = Distribution;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_step();
        Some(self.distribution().clone())
    }
}

impl Simulation {
    pub fn new(kernel: Kernel, initial: Distribution) -> Result<Simulation, ErrorKind> {
        check_dimension(kernel.n_states(), initial.len())?;
        Ok(Simulation {
            kernel,
            history: History::new(initial),
        })
    }

    /// Starts with all mass on `initial_state`.
    pub fn from_state(kernel: Kernel, initial_state: StateIndex) -> Result<Simulation, ErrorKind> {
        let initial = Distribution::point(kernel.n_states(), initial_state)?;
        Simulation::new(kernel, initial)
    }

    pub fn kernel(&self) -> &Kernel {
        &self.kernel
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn initial_distribution(&self) -> &Distribution {
        self.history.first().distribution()
    }

    pub fn distribution(&self) -> &Distribution {
        self.history.last().distribution()
    }

    pub fn time(&self) -> Time {
        self.history.last().time()
    }

    pub fn entropy(&self) -> Entropy {
        self.distribution().entropy()
    }

    pub fn next_step(&mut self) {
        let mut time = self.time();
        time.increment();
        let next = self.kernel.propagate(self.distribution());
        self.history.append(Step::new(time, next));
    }

    pub fn run(&mut self, steps: usize) {
        for _ in 0..steps {
            self.next_step();
        }
    }

    /// Runs the iterative stationary solver from the current distribution
    /// without advancing the simulation.
    pub fn reaches_stationarity(
        &self,
        config: &SolverConfig,
    ) -> Result<StationaryEstimate, ErrorKind> {
        solve_stationary_dist(self.distribution().view(), &self.kernel, config)
    }

    /// Whether the uniform distribution is left unchanged by one step, i.e.
    /// whether the kernel is doubly stochastic.
    pub fn uniform_distribution_is_steady(&self, tolerance: f64) -> Result<bool, ErrorKind> {
        let uniform = Distribution::uniform(self.kernel.n_states())?;
        is_stationary(&uniform, &self.kernel, tolerance)
    }
}
