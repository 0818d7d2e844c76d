//! Memoized value function over [`StoneState`].
//!
//! Evaluation is a single-threaded recursive descent. Every state reached is
//! stored in an explicitly owned table, which callers may seed from a
//! persisted cache and hand back for saving once they are done.

use std::collections::HashMap;

use crate::config::ProblemParams;
use crate::constants::FAILURE_PENALTY;
use crate::estimate::Estimate;
use crate::goal::{
    GoalRule, bonus_for_positive, negative_reward, penalty_for_negative, positive_reward,
};
use crate::state::{Action, StoneState};

/// State to value mapping shared by the solver and cache stores.
pub type ValueTable = HashMap<StoneState, Estimate>;

/// Value function plus its memo table for one set of problem parameters.
#[derive(Debug, Clone)]
pub struct Solver {
    params: ProblemParams,
    rule: GoalRule,
    table: ValueTable,
    loaded: usize,
}

impl Solver {
    #[must_use]
    pub fn new(params: ProblemParams) -> Self {
        Self::with_table(params, ValueTable::new())
    }

    /// Start from a previously computed table.
    #[must_use]
    pub fn with_table(params: ProblemParams, table: ValueTable) -> Self {
        let loaded = table.len();
        Self {
            params,
            rule: GoalRule::for_problem(&params),
            table,
            loaded,
        }
    }

    #[must_use]
    pub const fn params(&self) -> &ProblemParams {
        &self.params
    }

    #[must_use]
    pub const fn rule(&self) -> GoalRule {
        self.rule
    }

    #[must_use]
    pub const fn table(&self) -> &ValueTable {
        &self.table
    }

    #[must_use]
    pub fn into_table(self) -> ValueTable {
        self.table
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.table.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Entries computed since construction.
    #[must_use]
    pub fn computed(&self) -> usize {
        self.table.len().saturating_sub(self.loaded)
    }

    /// Whether the table holds anything a persisted cache does not.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.computed() > 0
    }

    /// Optimal value of `state`, computing and memoizing it on first use.
    pub fn evaluate(&mut self, state: &StoneState) -> Estimate {
        if let Some(found) = self.table.get(state) {
            return *found;
        }
        let value = self.compute(state);
        self.table.insert(*state, value);
        value
    }

    /// One-step value of using `action` in `state`, or `None` when that kind
    /// has no attempts left.
    pub fn action_value(&mut self, action: Action, state: &StoneState) -> Option<Estimate> {
        if state.remaining_for(action) == 0 {
            return None;
        }
        let params = self.params;
        let on_success = self.evaluate(&state.advance(&params, action, true));
        let on_failure = self.evaluate(&state.advance(&params, action, false));
        let bonus = self.success_bonus(action, state);
        Some(Estimate::blend(
            state.drift.success_chance(),
            &on_success,
            &on_failure,
            bonus,
        ))
    }

    /// Value assigned to an action kind that cannot be used any more.
    #[must_use]
    pub fn exhausted_value(&self, state: &StoneState) -> Estimate {
        Estimate::settled(0.0, FAILURE_PENALTY, self.counts(state))
    }

    /// Whether `state` already satisfies the goal.
    #[must_use]
    pub fn goal_met(&self, state: &StoneState) -> bool {
        if state.failure_budget < 0 {
            return false;
        }
        if self.rule.is_total_mode() {
            let [s1, s2, _] = self.counts(state);
            state.is_exhausted() && self.rule.total_target_met(s1, s2)
        } else {
            state.shortfall[0] <= 0 && state.shortfall[1] <= 0
        }
    }

    fn compute(&mut self, state: &StoneState) -> Estimate {
        if let Some(value) = self.terminal_value(state) {
            return value;
        }
        let mut best: Option<Estimate> = None;
        for action in Action::ALL {
            let Some(candidate) = self.action_value(action, state) else {
                continue;
            };
            best = match best {
                Some(current) if candidate.lexicographic_cmp(&current).is_le() => Some(current),
                _ => Some(candidate),
            };
        }
        best.unwrap_or_else(|| self.exhausted_value(state))
    }

    fn terminal_value(&self, state: &StoneState) -> Option<Estimate> {
        let counts = self.counts(state);
        let [s1, s2, s3] = counts;

        if state.failure_budget < 0 {
            return Some(Estimate::settled(0.0, 0.0, counts));
        }

        if self.rule.is_total_mode() {
            if !state.is_exhausted() {
                return None;
            }
            return Some(if self.rule.total_target_met(s1, s2) {
                let reward = positive_reward(s1) + positive_reward(s2) + negative_reward(s3);
                Estimate::settled(1.0, reward, counts)
            } else {
                Estimate::settled(0.0, FAILURE_PENALTY, counts)
            });
        }

        if state.shortfall[0] <= 0 && state.shortfall[1] <= 0 {
            return Some(Estimate::settled(1.0, 0.0, counts));
        }
        state
            .is_exhausted()
            .then(|| Estimate::settled(0.0, FAILURE_PENALTY, counts))
    }

    /// Milestone delta earned on the success branch; rewards only shape total-mode play.
    fn success_bonus(&self, action: Action, state: &StoneState) -> f64 {
        if !self.rule.is_total_mode() {
            return 0.0;
        }
        let cap = i16::from(self.params.attempts);
        match action {
            Action::First | Action::Second => {
                let current = i16::from(state.successes[action.index()]);
                bonus_for_positive(current, (current + 1).min(cap))
            }
            Action::Negative => {
                let current = state.negative_successes(&self.params);
                penalty_for_negative(current, current + 1)
            }
        }
    }

    fn counts(&self, state: &StoneState) -> [i16; 3] {
        [
            i16::from(state.successes[0]),
            i16::from(state.successes[1]),
            state.negative_successes(&self.params),
        ]
    }
}
