use std::fmt::Display;

use backtrace::Backtrace as trc;
use ndarray::{Array1, ArrayView1};
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::{check_state, get_backtrace};
use crate::prelude::*;

/// A probability distribution over the states `{0, ..., N-1}`.
///
/// Entries are finite, non-negative and sum to 1 within
/// [`PROBABILITY_TOLERANCE`]. The only way to build one is through a
/// validating constructor, so every `Distribution` in circulation is valid.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f64>", into = "Vec<f64>")]
pub struct Distribution(Array1<f64>);

impl Display for Distribution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[")?;
        for (i, probability) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{probability}")?;
        }
        write!(f, "]")
    }
}

impl TryFrom<Vec<f64>> for Distribution {
    type Error = ErrorKind;

    fn try_from(probabilities: Vec<f64>) -> Result<Self, Self::Error> {
        Distribution::new(Array1::from(probabilities))
    }
}

impl From<Distribution> for Vec<f64> {
    fn from(distribution: Distribution) -> Self {
        distribution.0.to_vec()
    }
}

impl AsRef<Array1<f64>> for Distribution {
    fn as_ref(&self) -> &Array1<f64> {
        &self.0
    }
}

impl Distribution {
    pub fn new(probabilities: Array1<f64>) -> Result<Self, ErrorKind> {
        validate_probabilities(probabilities.view())?;
        Ok(Self(probabilities))
    }

    /// Normalizes non-negative weights into a distribution.
    pub fn from_weights(weights: Array1<f64>) -> Result<Self, ErrorKind> {
        if weights.is_empty() {
            return Err(ErrorKind::from(DistributionError::Empty {
                context: get_backtrace(),
            }));
        }
        check_entries(weights.view())?;
        let sum = weights.sum();
        if sum <= 0. {
            return Err(ErrorKind::from(DistributionError::SumNot1 {
                sum,
                context: get_backtrace(),
            }));
        }
        Ok(Self(weights / sum))
    }

    pub fn uniform(n_states: usize) -> Result<Self, ErrorKind> {
        if n_states == 0 {
            return Err(ErrorKind::from(DistributionError::Empty {
                context: get_backtrace(),
            }));
        }
        Ok(Self(Array1::from_elem(n_states, 1. / n_states as f64)))
    }

    /// All mass on `state`.
    pub fn point(n_states: usize, state: StateIndex) -> Result<Self, ErrorKind> {
        check_state(state, n_states)?;
        let mut probabilities = Array1::zeros(n_states);
        probabilities[state.to_usize()] = 1.;
        Ok(Self(probabilities))
    }

    /// Wraps the product of a distribution and a kernel.
    ///
    /// Kernel rows only sum to 1 within [`PROBABILITY_TOLERANCE`], so the mass
    /// drifts a little with every step; it is divided back out here.
    pub(crate) fn from_propagated(mass: Array1<f64>) -> Self {
        let sum = mass.sum();
        let probabilities = mass / sum;
        debug_assert!(validate_probabilities(probabilities.view()).is_ok());
        Self(probabilities)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn probability(&self, state: StateIndex) -> Option<f64> {
        self.0.get(state.to_usize()).copied()
    }

    pub fn as_array(&self) -> &Array1<f64> {
        &self.0
    }

    pub fn view(&self) -> ArrayView1<'_, f64> {
        self.0.view()
    }

    pub fn into_array(self) -> Array1<f64> {
        self.0
    }

    pub fn to_vec(&self) -> Vec<f64> {
        self.0.to_vec()
    }

    /// Shannon entropy in bits.
    pub fn entropy(&self) -> Entropy {
        Entropy::from(
            self.0
                .iter()
                .filter(|probability| **probability > 0.)
                .map(|probability| -probability * probability.log2())
                .sum::<f64>()
                .max(0.),
        )
    }

    /// Largest component-wise absolute difference, `None` if the dimensions differ.
    pub fn max_abs_difference(&self, other: &Distribution) -> Option<f64> {
        if self.len() != other.len() {
            return None;
        }
        Some(max_abs_difference(self.view(), other.view()))
    }

    /// Draws a single state.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<StateIndex, ErrorKind> {
        draw(self.view(), rng)
    }
}

pub(crate) fn max_abs_difference(a: ArrayView1<f64>, b: ArrayView1<f64>) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y).abs())
        .fold(0., f64::max)
}

fn check_entries(probabilities: ArrayView1<f64>) -> Result<(), DistributionError> {
    for (index, probability) in probabilities.iter().enumerate() {
        if !probability.is_finite() {
            return Err(DistributionError::NonFinite {
                index,
                value: *probability,
                context: get_backtrace(),
            });
        }
        if *probability < 0. {
            return Err(DistributionError::NegativeEntry {
                index,
                value: *probability,
                context: get_backtrace(),
            });
        }
    }
    Ok(())
}

pub(crate) fn validate_probabilities(
    probabilities: ArrayView1<f64>,
) -> Result<(), DistributionError> {
    if probabilities.is_empty() {
        return Err(DistributionError::Empty {
            context: get_backtrace(),
        });
    }
    check_entries(probabilities)?;
    let sum = probabilities.sum();
    if (sum - 1.).abs() > PROBABILITY_TOLERANCE {
        return Err(DistributionError::SumNot1 {
            sum,
            context: get_backtrace(),
        });
    }
    Ok(())
}

#[non_exhaustive]
#[derive(Debug, Clone, Error)]
pub enum DistributionError {
    #[error("Distribution is empty")]
    Empty { context: trc },

    #[error("Probability at index {index} is negative: {value}")]
    NegativeEntry {
        index: usize,
        value: f64,
        context: trc,
    },

    #[error("Probability at index {index} is not finite: {value}")]
    NonFinite {
        index: usize,
        value: f64,
        context: trc,
    },

    #[error("Probability sum is not 1 but {sum}")]
    SumNot1 { sum: f64, context: trc },
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;

    #[test]
    fn new_should_accept_valid_distribution() {
        let distribution = Distribution::new(array![0.25, 0.75]).unwrap();
        assert_eq!(distribution.len(), 2);
        assert_eq!(distribution.probability(StateIndex::from(1)), Some(0.75));
        assert_eq!(distribution.probability(StateIndex::from(2)), None);
    }

    #[test]
    fn new_should_reject_invalid_vectors() {
        assert!(matches!(
            Distribution::new(Array1::zeros(0)),
            Err(ErrorKind::DistributionError(DistributionError::Empty { .. }))
        ));
        assert!(matches!(
            Distribution::new(array![1.5, -0.5]),
            Err(ErrorKind::DistributionError(
                DistributionError::NegativeEntry { index: 1, .. }
            ))
        ));
        assert!(matches!(
            Distribution::new(array![0.5, f64::NAN]),
            Err(ErrorKind::DistributionError(
                DistributionError::NonFinite { index: 1, .. }
            ))
        ));
        assert!(matches!(
            Distribution::new(array![0.5, 0.6]),
            Err(ErrorKind::DistributionError(DistributionError::SumNot1 { .. }))
        ));
    }

    #[test]
    fn from_weights_should_normalize() {
        let distribution = Distribution::from_weights(array![1., 3.]).unwrap();
        assert_eq!(distribution.to_vec(), vec![0.25, 0.75]);
        assert!(Distribution::from_weights(array![0., 0.]).is_err());
    }

    #[test]
    fn point_and_uniform() {
        let point = Distribution::point(3, StateIndex::from(2)).unwrap();
        assert_eq!(point.to_vec(), vec![0., 0., 1.]);
        assert_eq!(point.entropy(), Entropy::from(0.));
        assert!(Distribution::point(3, StateIndex::from(3))
            .unwrap_err()
            .is_invalid_argument());

        let uniform = Distribution::uniform(4).unwrap();
        assert_eq!(uniform.entropy(), Entropy::from(2.));
        assert!(Distribution::uniform(0).is_err());
    }

    #[test]
    fn max_abs_difference_requires_same_dimension() {
        let a = Distribution::new(array![0.5, 0.5]).unwrap();
        let b = Distribution::new(array![0.25, 0.75]).unwrap();
        let c = Distribution::uniform(3).unwrap();
        assert_eq!(a.max_abs_difference(&b), Some(0.25));
        assert_eq!(a.max_abs_difference(&c), None);
    }
}
