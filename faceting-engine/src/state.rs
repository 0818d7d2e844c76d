use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::config::ProblemParams;
use crate::constants::{DRIFT_BASE_CHANCE, DRIFT_MAX, DRIFT_STEP_CHANCE};

/// One of the three resource-consuming choices on a stone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    /// First goal-advancing ability (kind 1).
    First,
    /// Second goal-advancing ability (kind 2).
    Second,
    /// Failure-budget-consuming ability (kind 3).
    Negative,
}

impl Action {
    pub const ALL: [Self; 3] = [Self::First, Self::Second, Self::Negative];

    /// Numeric kind as used by configuration and the CLI (1, 2 or 3).
    #[must_use]
    pub const fn kind(self) -> u8 {
        match self {
            Self::First => 1,
            Self::Second => 2,
            Self::Negative => 3,
        }
    }

    #[must_use]
    pub const fn from_kind(kind: u8) -> Option<Self> {
        match kind {
            1 => Some(Self::First),
            2 => Some(Self::Second),
            3 => Some(Self::Negative),
            _ => None,
        }
    }

    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::First => 0,
            Self::Second => 1,
            Self::Negative => 2,
        }
    }

    #[must_use]
    pub const fn is_negative(self) -> bool {
        matches!(self, Self::Negative)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::First => write!(f, "ability 1"),
            Self::Second => write!(f, "ability 2"),
            Self::Negative => write!(f, "negative ability"),
        }
    }
}

/// A single observed `(action, outcome)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Event {
    pub action: Action,
    pub succeeded: bool,
}

impl Event {
    #[must_use]
    pub const fn new(action: Action, succeeded: bool) -> Self {
        Self { action, succeeded }
    }

    #[must_use]
    pub const fn success(action: Action) -> Self {
        Self::new(action, true)
    }

    #[must_use]
    pub const fn failure(action: Action) -> Self {
        Self::new(action, false)
    }
}

/// Drift index encoding the current success chance.
///
/// A success moves the index down and a failure moves it up, so a streak of
/// successes makes the next one less likely. Stones start at the top step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Drift(u8);

#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
#[error("drift index {0} is above {max}", max = DRIFT_MAX)]
pub struct DriftOutOfRange(pub u8);

impl Drift {
    pub const START: Self = Self(DRIFT_MAX);

    #[must_use]
    pub const fn new(index: u8) -> Option<Self> {
        if index <= DRIFT_MAX {
            Some(Self(index))
        } else {
            None
        }
    }

    #[must_use]
    pub const fn index(self) -> u8 {
        self.0
    }

    /// Success chance for this step: `0.25 + 0.10 * index`.
    #[must_use]
    pub fn success_chance(self) -> f64 {
        DRIFT_BASE_CHANCE + DRIFT_STEP_CHANCE * f64::from(self.0)
    }

    #[must_use]
    pub const fn after_success(self) -> Self {
        Self(self.0.saturating_sub(1))
    }

    #[must_use]
    pub const fn after_failure(self) -> Self {
        if self.0 >= DRIFT_MAX {
            Self(DRIFT_MAX)
        } else {
            Self(self.0 + 1)
        }
    }

    #[must_use]
    pub const fn after(self, succeeded: bool) -> Self {
        if succeeded {
            self.after_success()
        } else {
            self.after_failure()
        }
    }

    /// Fold an event sequence into a drift index, starting from [`Drift::START`].
    pub fn replay<'a>(events: impl IntoIterator<Item = &'a Event>) -> Self {
        events
            .into_iter()
            .fold(Self::START, |drift, event| drift.after(event.succeeded))
    }
}

impl Default for Drift {
    fn default() -> Self {
        Self::START
    }
}

impl TryFrom<u8> for Drift {
    type Error = DriftOutOfRange;

    fn try_from(index: u8) -> Result<Self, Self::Error> {
        Self::new(index).ok_or(DriftOutOfRange(index))
    }
}

impl From<Drift> for u8 {
    fn from(drift: Drift) -> Self {
        drift.0
    }
}

/// Flat key layout `(a, b, c, p, d, e, t, f, s1, s2)` used by cache files.
pub type StateKey = [i16; 10];

/// Complete description of one point in the faceting process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StoneState {
    /// Remaining attempts per action kind.
    pub remaining: [u8; 3],
    pub drift: Drift,
    /// Remaining successes needed per positive kind (individual mode only).
    pub shortfall: [i16; 2],
    /// Remaining combined successes needed (total mode only).
    pub total_shortfall: i16,
    /// Negative successes still tolerated before the stone fails.
    pub failure_budget: i16,
    /// Successes recorded so far on the positive kinds, capped at the budget.
    pub successes: [u8; 2],
}

impl StoneState {
    /// State of a stone nothing has been done to yet.
    #[must_use]
    pub fn initial(params: &ProblemParams) -> Self {
        Self::from_history(params, &[])
    }

    /// Derive the state from an event history by direct counting.
    #[must_use]
    pub fn from_history(params: &ProblemParams, history: &[Event]) -> Self {
        let mut used = [0_usize; 3];
        let mut wins = [0_usize; 3];
        for event in history {
            used[event.action.index()] += 1;
            if event.succeeded {
                wins[event.action.index()] += 1;
            }
        }

        let budget = usize::from(params.attempts);
        let remaining = used.map(|count| clamp_count(budget.saturating_sub(count)));
        let successes = [clamp_count(wins[0].min(budget)), clamp_count(wins[1].min(budget))];
        let failure_budget = i16::from(params.goal3) - count_to_i16(wins[2]);

        let (shortfall, total_shortfall) = if params.is_total_mode() {
            let reached = count_to_i16(wins[0]) + count_to_i16(wins[1]);
            ([0, 0], i16::from(params.total) - reached)
        } else {
            (
                [
                    i16::from(params.goal1) - count_to_i16(wins[0]),
                    i16::from(params.goal2) - count_to_i16(wins[1]),
                ],
                0,
            )
        };

        Self {
            remaining,
            drift: Drift::replay(history),
            shortfall,
            total_shortfall,
            failure_budget,
            successes,
        }
    }

    /// Child state after acting with `action` and observing `succeeded`.
    #[must_use]
    pub fn advance(&self, params: &ProblemParams, action: Action, succeeded: bool) -> Self {
        let mut next = *self;
        let idx = action.index();
        next.remaining[idx] = next.remaining[idx].saturating_sub(1);
        next.drift = self.drift.after(succeeded);
        if !succeeded {
            return next;
        }

        match action {
            Action::First | Action::Second => {
                next.successes[idx] = (next.successes[idx] + 1).min(params.attempts);
                if params.is_total_mode() {
                    next.total_shortfall -= 1;
                } else {
                    next.shortfall[idx] -= 1;
                }
            }
            Action::Negative => next.failure_budget -= 1,
        }
        next
    }

    #[must_use]
    pub const fn remaining_for(&self, action: Action) -> u8 {
        self.remaining[action.index()]
    }

    #[must_use]
    pub fn attempts_left(&self) -> u16 {
        self.remaining.iter().map(|&n| u16::from(n)).sum()
    }

    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.attempts_left() == 0
    }

    /// Negative successes taken so far (`goal3 - f`).
    #[must_use]
    pub fn negative_successes(&self, params: &ProblemParams) -> i16 {
        i16::from(params.goal3) - self.failure_budget
    }

    /// Slot the next use of `action` lands in (1-based).
    #[must_use]
    pub fn slot_for(&self, params: &ProblemParams, action: Action) -> u8 {
        params.attempts.saturating_sub(self.remaining_for(action)) + 1
    }

    #[must_use]
    pub fn key(&self) -> StateKey {
        [
            i16::from(self.remaining[0]),
            i16::from(self.remaining[1]),
            i16::from(self.remaining[2]),
            i16::from(self.drift.index()),
            self.shortfall[0],
            self.shortfall[1],
            self.total_shortfall,
            self.failure_budget,
            i16::from(self.successes[0]),
            i16::from(self.successes[1]),
        ]
    }

    /// Rebuild a state from its flat key, rejecting out-of-range fields.
    #[must_use]
    pub fn from_key(key: StateKey) -> Option<Self> {
        let [a, b, c, p, d, e, t, f, s1, s2] = key;
        Some(Self {
            remaining: [
                u8::try_from(a).ok()?,
                u8::try_from(b).ok()?,
                u8::try_from(c).ok()?,
            ],
            drift: Drift::new(u8::try_from(p).ok()?)?,
            shortfall: [d, e],
            total_shortfall: t,
            failure_budget: f,
            successes: [u8::try_from(s1).ok()?, u8::try_from(s2).ok()?],
        })
    }
}

fn clamp_count(value: usize) -> u8 {
    u8::try_from(value).unwrap_or(u8::MAX)
}

fn count_to_i16(value: usize) -> i16 {
    i16::try_from(value).unwrap_or(i16::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn total_params() -> ProblemParams {
        ProblemParams::new(10, 0, 0, 16, 10)
    }

    #[test]
    fn drift_maps_linearly_onto_success_chance() {
        let expected = [0.25, 0.35, 0.45, 0.55, 0.65, 0.75];
        for (index, want) in (0..=DRIFT_MAX).zip(expected) {
            let drift = Drift::new(index).unwrap();
            assert!((drift.success_chance() - want).abs() < 1e-12);
        }
        assert!(Drift::new(DRIFT_MAX + 1).is_none());
    }

    #[test]
    fn drift_deserialization_checks_the_range() {
        let drift: Drift = serde_json::from_str("3").unwrap();
        assert_eq!(drift.index(), 3);
        assert_eq!(serde_json::to_string(&Drift::START).unwrap(), "5");
        assert!(serde_json::from_str::<Drift>("9").is_err());
        assert_eq!(Drift::try_from(6), Err(DriftOutOfRange(6)));
    }

    #[test]
    fn drift_replay_stays_in_range() {
        let wins = vec![Event::success(Action::First); 12];
        assert_eq!(Drift::replay(&wins).index(), 0);

        let losses = vec![Event::failure(Action::Second); 12];
        assert_eq!(Drift::replay(&losses).index(), DRIFT_MAX);

        let mixed = [
            Event::success(Action::First),
            Event::success(Action::First),
            Event::failure(Action::Negative),
            Event::success(Action::Second),
        ];
        assert_eq!(Drift::replay(&mixed).index(), 3);
    }

    #[test]
    fn history_counts_feed_total_mode_state() {
        let params = total_params();
        let history = [
            Event::success(Action::First),
            Event::failure(Action::First),
            Event::success(Action::Second),
            Event::success(Action::Negative),
        ];
        let state = StoneState::from_history(&params, &history);
        assert_eq!(state.remaining, [8, 9, 9]);
        assert_eq!(state.successes, [1, 1]);
        assert_eq!(state.total_shortfall, 14);
        assert_eq!(state.shortfall, [0, 0]);
        assert_eq!(state.failure_budget, 9);
        assert_eq!(state.negative_successes(&params), 1);
        assert_eq!(state.slot_for(&params, Action::First), 3);
    }

    #[test]
    fn history_counts_feed_individual_mode_state() {
        let params = ProblemParams::new(10, 9, 7, 0, 4);
        let history = [Event::success(Action::Second), Event::success(Action::Second)];
        let state = StoneState::from_history(&params, &history);
        assert_eq!(state.shortfall, [9, 5]);
        assert_eq!(state.total_shortfall, 0);
    }

    #[test]
    fn advance_matches_direct_counting() {
        for params in [total_params(), ProblemParams::new(10, 9, 7, 0, 4)] {
            let history = [
                Event::success(Action::First),
                Event::failure(Action::Negative),
                Event::success(Action::Negative),
                Event::success(Action::Second),
                Event::failure(Action::First),
            ];
            let folded = history
                .iter()
                .fold(StoneState::initial(&params), |state, event| {
                    state.advance(&params, event.action, event.succeeded)
                });
            assert_eq!(folded, StoneState::from_history(&params, &history));
        }
    }

    #[test]
    fn key_roundtrips_and_rejects_bad_drift() {
        let state = StoneState::from_history(
            &total_params(),
            &[Event::success(Action::Negative), Event::failure(Action::First)],
        );
        assert_eq!(StoneState::from_key(state.key()), Some(state));

        let mut key = state.key();
        key[3] = 9;
        assert!(StoneState::from_key(key).is_none());
    }

    #[test]
    fn action_kinds_roundtrip() {
        for action in Action::ALL {
            assert_eq!(Action::from_kind(action.kind()), Some(action));
        }
        assert!(Action::from_kind(0).is_none());
        assert_eq!(Action::Negative.to_string(), "negative ability");
    }
}
