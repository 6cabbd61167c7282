use std::fmt::Display;

use backtrace::Backtrace as trc;
use ndarray::{Array2, ArrayView1, ArrayView2};
use petgraph::Graph;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::{check_dimension, check_state, get_backtrace};
use crate::linalg::matrix_power;
use crate::prelude::*;

/// A row-stochastic transition matrix over `N` states.
///
/// Row `i` is the distribution of the next state given the current state `i`.
/// Kernels are validated once on construction and never mutated afterwards.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Vec<f64>>", into = "Vec<Vec<f64>>")]
pub struct Kernel(Array2<f64>);

impl Display for Kernel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Kernel ({} states):", self.n_states())?;
        for row in self.0.rows() {
            let entries = row.iter().map(|p| p.to_string()).collect::<Vec<_>>();
            writeln!(f, "  [{}]", entries.join(", "))?;
        }
        Ok(())
    }
}

impl TryFrom<Vec<Vec<f64>>> for Kernel {
    type Error = ErrorKind;

    fn try_from(rows: Vec<Vec<f64>>) -> Result<Self, Self::Error> {
        Kernel::from_rows(rows)
    }
}

impl From<Kernel> for Vec<Vec<f64>> {
    fn from(kernel: Kernel) -> Self {
        kernel.0.rows().into_iter().map(|row| row.to_vec()).collect()
    }
}

impl Kernel {
    pub fn new(matrix: Array2<f64>) -> Result<Self, ErrorKind> {
        let (n_rows, n_cols) = matrix.dim();
        if n_rows == 0 {
            return Err(ErrorKind::from(KernelError::Empty {
                context: get_backtrace(),
            }));
        }
        if n_rows != n_cols {
            return Err(ErrorKind::from(KernelError::NotSquare {
                rows: n_rows,
                cols: n_cols,
                context: get_backtrace(),
            }));
        }
        for (row_index, row) in matrix.rows().into_iter().enumerate() {
            for (col_index, probability) in row.iter().enumerate() {
                if !probability.is_finite() {
                    return Err(ErrorKind::from(KernelError::NonFinite {
                        row: row_index,
                        col: col_index,
                        value: *probability,
                        context: get_backtrace(),
                    }));
                }
                if *probability < 0. {
                    return Err(ErrorKind::from(KernelError::NegativeEntry {
                        row: row_index,
                        col: col_index,
                        value: *probability,
                        context: get_backtrace(),
                    }));
                }
            }
            let sum = row.sum();
            if (sum - 1.).abs() > PROBABILITY_TOLERANCE {
                return Err(ErrorKind::from(KernelError::RowSumNot1 {
                    row: row_index,
                    sum,
                    context: get_backtrace(),
                }));
            }
        }
        Ok(Self(matrix))
    }

    /// Builds a kernel from nested rows, rejecting ragged input.
    pub fn from_rows(rows: Vec<Vec<f64>>) -> Result<Self, ErrorKind> {
        let n_rows = rows.len();
        if n_rows == 0 {
            return Err(ErrorKind::from(KernelError::Empty {
                context: get_backtrace(),
            }));
        }
        if let Some(row) = rows.iter().find(|row| row.len() != n_rows) {
            return Err(ErrorKind::from(KernelError::NotSquare {
                rows: n_rows,
                cols: row.len(),
                context: get_backtrace(),
            }));
        }
        let flat = rows.into_iter().flatten().collect::<Vec<f64>>();
        let matrix = Array2::from_shape_vec((n_rows, n_rows), flat).map_err(|_| {
            ErrorKind::from(KernelError::NotSquare {
                rows: n_rows,
                cols: n_rows,
                context: get_backtrace(),
            })
        })?;
        Kernel::new(matrix)
    }

    pub fn identity(n_states: usize) -> Result<Self, ErrorKind> {
        Kernel::new(Array2::eye(n_states))
    }

    pub fn n_states(&self) -> usize {
        self.0.nrows()
    }

    pub fn as_array(&self) -> &Array2<f64> {
        &self.0
    }

    pub fn view(&self) -> ArrayView2<'_, f64> {
        self.0.view()
    }

    /// The conditional distribution of the next state given `state`.
    pub fn row(&self, state: StateIndex) -> Result<ArrayView1<'_, f64>, ErrorKind> {
        check_state(state, self.n_states())?;
        Ok(self.0.row(state.to_usize()))
    }

    pub fn transition_probability(&self, from: StateIndex, to: StateIndex) -> Option<f64> {
        self.0.get((from.to_usize(), to.to_usize())).copied()
    }

    /// `P^k`, computed by repeated squaring.
    pub fn power(&self, k: usize) -> Kernel {
        Kernel(matrix_power(self.view(), k))
    }

    /// Multiplies `distribution` by this kernel once.
    pub fn apply(&self, distribution: &Distribution) -> Result<Distribution, ErrorKind> {
        check_dimension(self.n_states(), distribution.len())?;
        Ok(self.propagate(distribution))
    }

    pub(crate) fn propagate(&self, distribution: &Distribution) -> Distribution {
        Distribution::from_propagated(distribution.as_array().dot(&self.0))
    }

    /// Transition graph with one node per state and one edge per positive entry.
    pub fn graph(&self) -> Graph<StateIndex, f64> {
        let mut graph = Graph::new();
        let nodes = (0..self.n_states())
            .map(|state| graph.add_node(StateIndex::from(state)))
            .collect::<Vec<_>>();
        for ((from, to), probability) in self.0.indexed_iter() {
            if *probability > 0. {
                graph.add_edge(nodes[from], nodes[to], *probability);
            }
        }
        graph
    }
}

#[non_exhaustive]
#[derive(Debug, Clone, Error)]
pub enum KernelError {
    #[error("Kernel is empty")]
    Empty { context: trc },

    #[error("Kernel is not square: {rows} rows, {cols} columns")]
    NotSquare {
        rows: usize,
        cols: usize,
        context: trc,
    },

    #[error("Transition probability ({row}, {col}) is negative: {value}")]
    NegativeEntry {
        row: usize,
        col: usize,
        value: f64,
        context: trc,
    },

    #[error("Transition probability ({row}, {col}) is not finite: {value}")]
    NonFinite {
        row: usize,
        col: usize,
        value: f64,
        context: trc,
    },

    #[error("Row {row} sums to {sum} instead of 1")]
    RowSumNot1 { row: usize, sum: f64, context: trc },
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;

    fn two_state() -> Kernel {
        Kernel::new(array![[0.4, 0.6], [0.2, 0.8]]).unwrap()
    }

    #[test]
    fn new_should_reject_malformed_matrices() {
        assert!(matches!(
            Kernel::new(Array2::zeros((0, 0))),
            Err(ErrorKind::KernelError(KernelError::Empty { .. }))
        ));
        assert!(matches!(
            Kernel::new(array![[0.5, 0.5, 0.], [0.5, 0.5, 0.]]),
            Err(ErrorKind::KernelError(KernelError::NotSquare { .. }))
        ));
        assert!(matches!(
            Kernel::new(array![[1.2, -0.2], [0.5, 0.5]]),
            Err(ErrorKind::KernelError(KernelError::NegativeEntry {
                row: 0,
                col: 1,
                ..
            }))
        ));
        assert!(matches!(
            Kernel::new(array![[0.5, 0.5], [0.5, 0.6]]),
            Err(ErrorKind::KernelError(KernelError::RowSumNot1 { row: 1, .. }))
        ));
    }

    #[test]
    fn from_rows_should_reject_ragged_rows() {
        assert!(matches!(
            Kernel::from_rows(vec![vec![1.], vec![0.5, 0.5]]),
            Err(ErrorKind::KernelError(KernelError::NotSquare { .. }))
        ));
        assert_eq!(
            Kernel::from_rows(vec![vec![0.4, 0.6], vec![0.2, 0.8]]).unwrap(),
            two_state()
        );
    }

    #[test]
    fn row_should_check_range() {
        let kernel = two_state();
        assert_eq!(kernel.row(StateIndex::from(1)).unwrap().to_vec(), vec![0.2, 0.8]);
        assert!(kernel.row(StateIndex::from(2)).is_err());
    }

    #[test]
    fn power_zero_is_identity() {
        let kernel = two_state();
        assert_eq!(kernel.power(0), Kernel::identity(2).unwrap());
        assert_eq!(kernel.power(1), kernel);
    }

    #[test]
    fn power_matches_repeated_product() {
        let kernel = two_state();
        let squared = kernel.as_array().dot(kernel.as_array());
        let cubed = squared.dot(kernel.as_array());
        let power = kernel.power(3);
        for (a, b) in power.as_array().iter().zip(cubed.iter()) {
            assert!((a - b).abs() < 1e-12);
        }
    }

    #[test]
    fn transition_probability_reads_entries() {
        let kernel = two_state();
        assert_eq!(
            kernel.transition_probability(StateIndex::from(1), StateIndex::from(0)),
            Some(0.2)
        );
        assert_eq!(
            kernel.transition_probability(StateIndex::from(0), StateIndex::from(2)),
            None
        );
    }

    #[test]
    fn apply_should_keep_mass_at_one_for_tolerance_edge_rows() {
        let kernel = Kernel::new(array![[0.4 + 6e-9, 0.6], [0.2 + 6e-9, 0.8]]).unwrap();
        let mut distribution = Distribution::new(array![0.7, 0.3]).unwrap();
        for _ in 0..10 {
            distribution = kernel.apply(&distribution).unwrap();
            assert!((distribution.as_array().sum() - 1.).abs() < 1e-12);
        }
    }

    #[test]
    fn graph_has_edge_per_positive_entry() {
        let kernel = Kernel::new(array![[0., 1., 0.], [0.5, 0., 0.5], [0., 0., 1.]]).unwrap();
        let graph = kernel.graph();
        assert_eq!(graph.node_count(), 3);
        assert_eq!(graph.edge_count(), 4);
    }
}
