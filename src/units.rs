use std::hash::{Hash, Hasher};

use derive_more::*;
use serde::{Deserialize, Serialize};

/// Position of a state in the implicit state space `{0, ..., N-1}`.
#[derive(
    Hash,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Clone,
    Copy,
    Default,
    Debug,
    Display,
    From,
    Into,
    Serialize,
    Deserialize,
)]
#[serde(transparent)]
pub struct StateIndex(usize);

impl StateIndex {
    pub fn new() -> Self {
        Self(0)
    }

    pub fn to_usize(self) -> usize {
        self.0
    }
}

#[derive(PartialOrd, Clone, Copy, Default, Debug, Display, Into, Add, Sub)]
pub struct Entropy(f64);

impl Hash for Entropy {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.to_bits().hash(state);
    }
}

impl PartialEq for Entropy {
    fn eq(&self, other: &Self) -> bool {
        self.0.to_bits() == other.0.to_bits()
    }
}

impl From<f64> for Entropy {
    fn from(entropy: f64) -> Self {
        debug_assert!(entropy >= 0.);
        Self(entropy)
    }
}

impl Entropy {
    pub fn new() -> Self {
        Self(0.)
    }

    pub fn to_f64(self) -> f64 {
        self.0
    }
}

#[derive(
    Hash,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Clone,
    Copy,
    Default,
    Debug,
    Display,
    From,
    Into,
    Add,
    Sub,
    AddAssign,
    SubAssign,
)]
pub struct Time(usize);

impl Time {
    pub fn new() -> Self {
        Self(0)
    }

    pub fn increment(&mut self) {
        self.0 += 1;
    }

    pub fn to_usize(self) -> usize {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entropy_gain_between_steps() {
        let before = Entropy::from(1.);
        let after = Entropy::from(1.5);
        assert_eq!((after - before).to_f64(), 0.5);
        assert_eq!(before + after, Entropy::from(2.5));
        assert!(after > before);
    }

    #[test]
    fn time_increments() {
        let mut time = Time::new();
        time.increment();
        time += Time::from(2);
        assert_eq!(time.to_usize(), 3);
        assert_eq!(StateIndex::from(4).to_usize(), 4);
    }
}
