use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Value tuple `(P, R, E1, E2, E3)` attached to every state and candidate action.
///
/// `success` is the probability of meeting the goal under optimal play,
/// `reward` the expected milestone reward, and `expected` the expected final
/// success counts of the three action kinds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 5]", into = "[f64; 5]")]
pub struct Estimate {
    pub success: f64,
    pub reward: f64,
    pub expected: [f64; 3],
}

impl Estimate {
    #[must_use]
    pub const fn new(success: f64, reward: f64, expected: [f64; 3]) -> Self {
        Self {
            success,
            reward,
            expected,
        }
    }

    /// Value of a finished stone with the given final counts.
    #[must_use]
    pub fn settled(success: f64, reward: f64, counts: [i16; 3]) -> Self {
        Self::new(success, reward, counts.map(f64::from))
    }

    /// Expectation over a success child (weight `chance`) and a failure child.
    ///
    /// `bonus` is added to the success branch reward before weighting.
    #[must_use]
    pub fn blend(chance: f64, on_success: &Self, on_failure: &Self, bonus: f64) -> Self {
        let miss = 1.0 - chance;
        let mix = |hit: f64, fail: f64| chance * hit + miss * fail;
        Self {
            success: mix(on_success.success, on_failure.success),
            reward: mix(on_success.reward + bonus, on_failure.reward),
            expected: [
                mix(on_success.expected[0], on_failure.expected[0]),
                mix(on_success.expected[1], on_failure.expected[1]),
                mix(on_success.expected[2], on_failure.expected[2]),
            ],
        }
    }

    /// Lexicographic order over `(P, R, E1, E2, E3)`.
    #[must_use]
    pub fn lexicographic_cmp(&self, other: &Self) -> Ordering {
        self.success
            .total_cmp(&other.success)
            .then_with(|| self.reward.total_cmp(&other.reward))
            .then_with(|| self.expected[0].total_cmp(&other.expected[0]))
            .then_with(|| self.expected[1].total_cmp(&other.expected[1]))
            .then_with(|| self.expected[2].total_cmp(&other.expected[2]))
    }

    #[must_use]
    pub const fn to_array(&self) -> [f64; 5] {
        [
            self.success,
            self.reward,
            self.expected[0],
            self.expected[1],
            self.expected[2],
        ]
    }

    #[must_use]
    pub const fn from_array(values: [f64; 5]) -> Self {
        let [success, reward, e1, e2, e3] = values;
        Self::new(success, reward, [e1, e2, e3])
    }

    /// Whether every component is bit-identical to `other`.
    #[must_use]
    pub fn bit_eq(&self, other: &Self) -> bool {
        self.to_array()
            .iter()
            .zip(other.to_array())
            .all(|(lhs, rhs)| lhs.to_bits() == rhs.to_bits())
    }
}

impl From<[f64; 5]> for Estimate {
    fn from(values: [f64; 5]) -> Self {
        Self::from_array(values)
    }
}

impl From<Estimate> for [f64; 5] {
    fn from(estimate: Estimate) -> Self {
        estimate.to_array()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blend_weights_both_children() {
        let hit = Estimate::settled(1.0, 0.5, [3, 1, 0]);
        let miss = Estimate::settled(0.0, 0.0, [2, 1, 1]);
        let mixed = Estimate::blend(0.75, &hit, &miss, 0.1);
        assert!((mixed.success - 0.75).abs() < 1e-12);
        assert!((mixed.reward - 0.45).abs() < 1e-12);
        assert!((mixed.expected[0] - 2.75).abs() < 1e-12);
        assert!((mixed.expected[1] - 1.0).abs() < 1e-12);
        assert!((mixed.expected[2] - 0.25).abs() < 1e-12);
    }

    #[test]
    fn ordering_falls_through_components() {
        let base = Estimate::new(0.5, 0.1, [1.0, 1.0, 1.0]);
        let more_reward = Estimate::new(0.5, 0.2, [0.0, 0.0, 0.0]);
        let more_e3 = Estimate::new(0.5, 0.1, [1.0, 1.0, 2.0]);
        assert_eq!(more_reward.lexicographic_cmp(&base), Ordering::Greater);
        assert_eq!(more_e3.lexicographic_cmp(&base), Ordering::Greater);
        assert_eq!(base.lexicographic_cmp(&base), Ordering::Equal);
    }

    #[test]
    fn serializes_as_flat_array() {
        let estimate = Estimate::new(0.1, 0.2, [0.3, 0.4, 0.5]);
        let json = serde_json::to_string(&estimate).unwrap();
        assert_eq!(json, "[0.1,0.2,0.3,0.4,0.5]");
        let back: Estimate = serde_json::from_str(&json).unwrap();
        assert!(back.bit_eq(&estimate));
    }
}
