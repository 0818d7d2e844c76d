use serde::Serialize;
use std::cmp::Ordering;

use crate::estimate::Estimate;
use crate::solver::Solver;
use crate::state::{Action, Event, StoneState};

/// One action's one-step estimate as seen by the policy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Candidate {
    pub action: Action,
    /// False when the kind has no attempts left; `estimate` is then the sentinel value.
    pub available: bool,
    pub estimate: Estimate,
}

/// The action to take next and the slot it lands in (1-based).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Decision {
    pub action: Action,
    pub slot: u8,
}

/// Full decision record for one history.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Recommendation {
    pub state: StoneState,
    /// Success chance of the next attempt, whichever kind is used.
    pub success_chance: f64,
    /// Optimal value of the derived state.
    pub value: Estimate,
    pub candidates: [Candidate; 3],
    /// `None` once no action can still reach the goal.
    pub decision: Option<Decision>,
}

/// Chooses the next action for an observed history.
#[derive(Debug, Clone)]
pub struct PolicyDriver {
    solver: Solver,
    preferred: Action,
}

impl PolicyDriver {
    #[must_use]
    pub const fn new(solver: Solver, preferred: Action) -> Self {
        Self { solver, preferred }
    }

    #[must_use]
    pub const fn preferred(&self) -> Action {
        self.preferred
    }

    #[must_use]
    pub const fn solver(&self) -> &Solver {
        &self.solver
    }

    #[must_use]
    pub fn into_solver(self) -> Solver {
        self.solver
    }

    /// Current state implied by `history`.
    #[must_use]
    pub fn derive_state(&self, history: &[Event]) -> StoneState {
        StoneState::from_history(self.solver.params(), history)
    }

    /// Optimal value of the state implied by `history`.
    pub fn state_value(&mut self, history: &[Event]) -> Estimate {
        let state = self.derive_state(history);
        self.solver.evaluate(&state)
    }

    /// Next action to take, or `None` when no action can still succeed.
    pub fn next_action(&mut self, history: &[Event]) -> Option<Action> {
        self.recommend(history)
            .decision
            .map(|decision| decision.action)
    }

    pub fn recommend(&mut self, history: &[Event]) -> Recommendation {
        let state = self.derive_state(history);
        let value = self.solver.evaluate(&state);
        let candidates = Action::ALL.map(|action| self.candidate(action, &state));

        let mut best = &candidates[0];
        for candidate in &candidates[1..] {
            if self.rank(candidate, best) == Ordering::Greater {
                best = candidate;
            }
        }

        let decision = (best.estimate.success > 0.0).then(|| Decision {
            action: best.action,
            slot: state.slot_for(self.solver.params(), best.action),
        });

        Recommendation {
            state,
            success_chance: state.drift.success_chance(),
            value,
            candidates,
            decision,
        }
    }

    fn candidate(&mut self, action: Action, state: &StoneState) -> Candidate {
        match self.solver.action_value(action, state) {
            Some(estimate) => Candidate {
                action,
                available: true,
                estimate,
            },
            None => Candidate {
                action,
                available: false,
                estimate: self.solver.exhausted_value(state),
            },
        }
    }

    /// Order on `(P, R, preferred)`; remaining components are ignored.
    fn rank(&self, lhs: &Candidate, rhs: &Candidate) -> Ordering {
        lhs.estimate
            .success
            .total_cmp(&rhs.estimate.success)
            .then_with(|| lhs.estimate.reward.total_cmp(&rhs.estimate.reward))
            .then_with(|| (lhs.action == self.preferred).cmp(&(rhs.action == self.preferred)))
    }
}
