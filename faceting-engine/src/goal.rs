//! Goal predicates and milestone reward shaping.

use serde::{Deserialize, Serialize};

use crate::config::ProblemParams;
use crate::constants::{
    NEGATIVE_MILESTONES, NINE_SEVEN_TOTAL, POSITIVE_MILESTONES, SEVEN_SEVEN_TOTAL,
};

/// Cumulative reward for `successes` on a positive kind.
#[must_use]
pub fn positive_reward(successes: i16) -> f64 {
    milestone_value(&POSITIVE_MILESTONES, successes)
}

/// Cumulative penalty for `successes` on the negative kind.
#[must_use]
pub fn negative_reward(successes: i16) -> f64 {
    milestone_value(&NEGATIVE_MILESTONES, successes)
}

/// Reward delta earned when a positive count moves from `current` to `next`.
#[must_use]
pub fn bonus_for_positive(current: i16, next: i16) -> f64 {
    positive_reward(next) - positive_reward(current)
}

/// Penalty delta incurred when the negative count moves from `current` to `next`.
#[must_use]
pub fn penalty_for_negative(current: i16, next: i16) -> f64 {
    negative_reward(next) - negative_reward(current)
}

fn milestone_value(table: &[(u8, f64)], successes: i16) -> f64 {
    table
        .iter()
        .find(|(threshold, _)| successes >= i16::from(*threshold))
        .map_or(0.0, |(_, value)| *value)
}

/// The success condition a problem is solved against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GoalRule {
    /// 9/7 in either order or 10/6 in either order; landing on 8/8 does not count.
    NineSeven,
    /// At least 14 combined with 7/7, or 6 paired with 9 or more.
    SevenSeven,
    /// Plain combined threshold for any other total.
    TotalAtLeast { total: i16 },
    /// Independent per-ability targets, met as soon as both shortfalls close.
    Individual,
}

impl GoalRule {
    #[must_use]
    pub fn for_problem(params: &ProblemParams) -> Self {
        if !params.is_total_mode() {
            return Self::Individual;
        }
        match i16::from(params.total) {
            NINE_SEVEN_TOTAL => Self::NineSeven,
            SEVEN_SEVEN_TOTAL => Self::SevenSeven,
            total => Self::TotalAtLeast { total },
        }
    }

    #[must_use]
    pub const fn is_total_mode(self) -> bool {
        !matches!(self, Self::Individual)
    }

    /// Whether a finished stone with these positive counts meets a total-mode goal.
    ///
    /// Always false for [`GoalRule::Individual`]; individual goals are checked
    /// against shortfalls instead.
    #[must_use]
    pub fn total_target_met(self, s1: i16, s2: i16) -> bool {
        match self {
            Self::NineSeven => {
                let reached = (s1 >= 9 && s2 >= 7)
                    || (s1 >= 7 && s2 >= 9)
                    || (s1 >= 10 && s2 >= 6)
                    || (s1 >= 6 && s2 >= 10);
                reached && !(s1 == 8 && s2 == 8)
            }
            Self::SevenSeven => {
                let low = s1.min(s2);
                let high = s1.max(s2);
                s1 + s2 >= 14 && (low >= 7 || (low == 6 && high >= 9))
            }
            Self::TotalAtLeast { total } => s1 + s2 >= total,
            Self::Individual => false,
        }
    }
}
