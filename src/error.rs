use backtrace::Backtrace as trc;
use thiserror::Error;

use crate::prelude::*;

#[non_exhaustive]
#[derive(Debug, Clone, Error)]
pub enum ErrorKind {
    #[error("DistributionError: {0:#?}")]
    DistributionError(#[from] DistributionError),

    #[error("KernelError: {0:#?}")]
    KernelError(#[from] KernelError),

    #[error("ArgumentError: {0:#?}")]
    ArgumentError(#[from] ArgumentError),

    #[error("SolveError: {0:#?}")]
    SolveError(#[from] SolveError),
}

impl ErrorKind {
    /// The distribution handed to a call was not a probability vector.
    pub fn is_invalid_distribution(&self) -> bool {
        matches!(self, ErrorKind::DistributionError(_))
    }

    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, ErrorKind::ArgumentError(_))
    }

    pub fn is_singular(&self) -> bool {
        matches!(self, ErrorKind::SolveError(SolveError::Singular { .. }))
    }

    pub fn is_non_convergence(&self) -> bool {
        matches!(
            self,
            ErrorKind::SolveError(SolveError::NonConvergence { .. })
        )
    }
}

#[non_exhaustive]
#[derive(Debug, Clone, Error)]
pub enum ArgumentError {
    #[error("Path length must be at least 1")]
    ZeroPathLength { context: trc },

    #[error("Sample count must be at least 1")]
    ZeroSampleCount { context: trc },

    #[error("State {state:#?} is out of range for {n_states} states")]
    StateOutOfRange {
        state: StateIndex,
        n_states: usize,
        context: trc,
    },

    #[error("Dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch {
        expected: usize,
        got: usize,
        context: trc,
    },

    #[error("Tolerance must be finite and positive but is {tolerance}")]
    InvalidTolerance { tolerance: f64, context: trc },

    #[error("Iteration limit must be at least 1")]
    ZeroIterationLimit { context: trc },
}

pub(crate) fn check_dimension(expected: usize, got: usize) -> Result<(), ErrorKind> {
    if expected != got {
        return Err(ErrorKind::from(ArgumentError::DimensionMismatch {
            expected,
            got,
            context: get_backtrace(),
        }));
    }
    Ok(())
}

pub(crate) fn check_state(state: StateIndex, n_states: usize) -> Result<(), ErrorKind> {
    if state.to_usize() >= n_states {
        return Err(ErrorKind::from(ArgumentError::StateOutOfRange {
            state,
            n_states,
            context: get_backtrace(),
        }));
    }
    Ok(())
}

#[cfg(debug_assertions)]
pub(crate) fn get_backtrace() -> trc {
    trc::new()
}

#[cfg(not(debug_assertions))]
pub(crate) fn get_backtrace() -> trc {
    trc::new_unresolved()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dimension_check_reports_both_sizes() {
        assert!(check_dimension(3, 3).is_ok());
        match check_dimension(3, 2) {
            Err(ErrorKind::ArgumentError(ArgumentError::DimensionMismatch {
                expected,
                got,
                ..
            })) => {
                assert_eq!(expected, 3);
                assert_eq!(got, 2);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn state_check_rejects_out_of_range() {
        assert!(check_state(StateIndex::from(1), 2).is_ok());
        let error = check_state(StateIndex::from(2), 2).unwrap_err();
        assert!(error.is_invalid_argument());
        assert!(!error.is_singular());
    }
}
