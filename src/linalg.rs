//! Dense helpers for the small square systems used by the solvers.

use ndarray::{Array1, Array2, ArrayView1, ArrayView2};

use crate::error::get_backtrace;
use crate::prelude::*;

/// Pivots at or below `SINGULARITY_TOLERANCE * n * max|a_ij|` are treated as zero.
pub const SINGULARITY_TOLERANCE: f64 = f64::EPSILON;

/// `m^k` by repeated squaring. `m^0` is the identity.
pub(crate) fn matrix_power(m: ArrayView2<f64>, k: usize) -> Array2<f64> {
    let mut result = Array2::eye(m.nrows());
    let mut base = m.to_owned();
    let mut exponent = k;
    while exponent > 0 {
        if exponent & 1 == 1 {
            result = result.dot(&base);
        }
        exponent >>= 1;
        if exponent > 0 {
            base = base.dot(&base);
        }
    }
    result
}

/// Solves `a x = b` by Gaussian elimination with partial pivoting.
pub(crate) fn solve(a: ArrayView2<f64>, b: ArrayView1<f64>) -> Result<Array1<f64>, SolveError> {
    let n = a.nrows();
    debug_assert_eq!(a.ncols(), n);
    debug_assert_eq!(b.len(), n);

    let scale = a.iter().fold(0., |max: f64, entry| max.max(entry.abs()));
    let threshold = SINGULARITY_TOLERANCE * n as f64 * scale;

    let mut a = a.to_owned();
    let mut b = b.to_owned();

    for column in 0..n {
        let (pivot_row, pivot) = (column..n)
            .map(|row| (row, a[(row, column)].abs()))
            .fold((column, -1.), |best, candidate| {
                if candidate.1 > best.1 {
                    candidate
                } else {
                    best
                }
            });
        if pivot <= threshold {
            return Err(SolveError::Singular {
                pivot_column: column,
                context: get_backtrace(),
            });
        }
        if pivot_row != column {
            for j in 0..n {
                a.swap((column, j), (pivot_row, j));
            }
            b.swap(column, pivot_row);
        }
        for row in column + 1..n {
            let factor = a[(row, column)] / a[(column, column)];
            if factor == 0. {
                continue;
            }
            for j in column..n {
                a[(row, j)] -= factor * a[(column, j)];
            }
            b[row] -= factor * b[column];
        }
    }

    let mut x = Array1::zeros(n);
    for row in (0..n).rev() {
        let tail = (row + 1..n).map(|j| a[(row, j)] * x[j]).sum::<f64>();
        x[row] = (b[row] - tail) / a[(row, row)];
    }
    Ok(x)
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;

    #[test]
    fn solve_should_handle_row_swaps() {
        let a = array![[0., 2., 1.], [1., 1., 0.], [2., 0., 3.]];
        let b = array![5., 3., 11.];
        let x = solve(a.view(), b.view()).unwrap();
        let residual = a.dot(&x) - &b;
        assert!(residual.iter().all(|r| r.abs() < 1e-12));
    }

    #[test]
    fn solve_should_report_singular_column() {
        let a = array![[1., 2.], [2., 4.]];
        let b = array![1., 2.];
        match solve(a.view(), b.view()) {
            Err(SolveError::Singular { pivot_column, .. }) => assert_eq!(pivot_column, 1),
            other => panic!("expected singular system, got {other:?}"),
        }
    }

    #[test]
    fn solve_should_accept_small_pivots_relative_to_scale() {
        let e = 1e-13;
        let a = array![[1. + e, 1. - e], [1. - e, 1. + e]];
        let b = array![1., 1.];
        let x = solve(a.view(), b.view()).unwrap();
        assert!((x[0] - 0.5).abs() < 1e-9);
        assert!((x[1] - 0.5).abs() < 1e-9);

        let zero = Array2::<f64>::zeros((2, 2));
        assert!(solve(zero.view(), b.view()).is_err());
    }

    #[test]
    fn matrix_power_should_match_naive_product() {
        let m = array![[0.5, 0.5, 0.], [0.1, 0.6, 0.3], [0.2, 0.2, 0.6]];
        let mut naive = Array2::eye(3);
        for _ in 0..5 {
            naive = naive.dot(&m);
        }
        let fast = matrix_power(m.view(), 5);
        for (a, b) in naive.iter().zip(fast.iter()) {
            assert!((a - b).abs() < 1e-12);
        }
        assert_eq!(matrix_power(m.view(), 0), Array2::<f64>::eye(3));
    }
}
