use ndarray::ArrayView1;
use rand::Rng;

use crate::distribution::validate_probabilities;
use crate::prelude::*;

/// Draws one state from `probabilities` by walking the cumulative distribution.
///
/// A single uniform `u` in `[0, 1)` is consumed. The first state with
/// positive mass owns the closed interval `[0, p0]` and every later state `i`
/// the half-open interval `(a, a + pi]`, where `a` is the mass of the states
/// before it. States with zero mass are never returned. If rounding
/// leaves `u` above the total mass, the last state with positive probability
/// is returned.
pub fn draw<R: Rng + ?Sized>(
    probabilities: ArrayView1<f64>,
    rng: &mut R,
) -> Result<StateIndex, ErrorKind> {
    validate_probabilities(probabilities)?;
    let u: f64 = rng.gen();
    Ok(StateIndex::from(locate(probabilities, u)))
}

/// Finds the bucket containing `u`. `probabilities` must already be validated.
pub(crate) fn locate(probabilities: ArrayView1<f64>, u: f64) -> usize {
    let mut cumulative = 0.;
    let mut last_positive = 0;
    for (state, probability) in probabilities.iter().enumerate() {
        if *probability <= 0. {
            continue;
        }
        last_positive = state;
        let upper = cumulative + probability;
        // the first bucket with mass is closed at 0
        if u <= upper && (cumulative == 0. || cumulative < u) {
            return state;
        }
        cumulative = upper;
    }
    last_positive
}

#[cfg(test)]
mod tests {
    use ndarray::array;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;

    #[test]
    fn locate_should_respect_bucket_boundaries() {
        let probabilities = array![0.25, 0.5, 0.25];
        assert_eq!(locate(probabilities.view(), 0.), 0);
        assert_eq!(locate(probabilities.view(), 0.25), 0);
        assert_eq!(locate(probabilities.view(), 0.2500001), 1);
        assert_eq!(locate(probabilities.view(), 0.75), 1);
        assert_eq!(locate(probabilities.view(), 0.9), 2);
    }

    #[test]
    fn locate_should_skip_zero_mass_states() {
        let probabilities = array![0., 1., 0.];
        assert_eq!(locate(probabilities.view(), 0.), 1);
        assert_eq!(locate(probabilities.view(), 0.999), 1);

        let probabilities = array![0.5, 0.5, 0.];
        assert_eq!(locate(probabilities.view(), 1.), 1);
    }

    #[test]
    fn locate_should_fall_back_to_last_positive_state() {
        let probabilities = array![0.5, 0.5 - 1e-10, 0.];
        assert_eq!(locate(probabilities.view(), 0.9999999999), 1);
    }

    #[test]
    fn draw_should_reject_invalid_distribution() {
        let mut rng = StdRng::seed_from_u64(0);
        let error = draw(array![0.5, 0.6].view(), &mut rng).unwrap_err();
        assert!(error.is_invalid_distribution());
        let error = draw(array![1.5, -0.5].view(), &mut rng).unwrap_err();
        assert!(error.is_invalid_distribution());
    }

    #[test]
    fn draw_frequencies_should_match_probabilities() {
        let mut rng = StdRng::seed_from_u64(42);
        let probabilities = array![0.25, 0.75];
        let draws = 100_000;
        let mut counts = [0usize; 2];
        for _ in 0..draws {
            counts[draw(probabilities.view(), &mut rng).unwrap().to_usize()] += 1;
        }
        let frequencies = counts.map(|count| count as f64 / draws as f64);
        assert!((frequencies[0] - 0.25).abs() < 0.01);
        assert!((frequencies[1] - 0.75).abs() < 0.01);
    }

    #[test]
    fn draw_should_be_reproducible() {
        let probabilities = array![0.2, 0.3, 0.5];
        let run = |seed| {
            let mut rng = StdRng::seed_from_u64(seed);
            (0..20)
                .map(|_| draw(probabilities.view(), &mut rng).unwrap())
                .collect::<Vec<_>>()
        };
        assert_eq!(run(7), run(7));
    }
}
