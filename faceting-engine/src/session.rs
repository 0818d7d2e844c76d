//! Event loop binding a [`PolicyDriver`] to an actuator and an observer.

use log::debug;
use serde::Serialize;
use thiserror::Error;

use crate::estimate::Estimate;
use crate::policy::{Decision, PolicyDriver};
use crate::state::{Action, Event, StoneState};

/// Carries out a chosen action on the stone.
pub trait Actuator {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Use `action` in its `slot` (1-based).
    ///
    /// # Errors
    ///
    /// Returns an error if the action could not be carried out.
    fn perform(&mut self, action: Action, slot: u8) -> Result<(), Self::Error>;
}

/// Reports the outcome of the action just performed.
pub trait Observer {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Outcome of the last use of `action` in `slot`.
    ///
    /// # Errors
    ///
    /// Returns an error if the outcome could not be read.
    fn observe(&mut self, action: Action, slot: u8) -> Result<Event, Self::Error>;
}

/// A separate actuator and observer used together.
impl<A: Actuator, O> Actuator for (A, O) {
    type Error = A::Error;

    fn perform(&mut self, action: Action, slot: u8) -> Result<(), Self::Error> {
        self.0.perform(action, slot)
    }
}

impl<A, O: Observer> Observer for (A, O) {
    type Error = O::Error;

    fn observe(&mut self, action: Action, slot: u8) -> Result<Event, Self::Error> {
        self.1.observe(action, slot)
    }
}

#[derive(Debug, Error)]
pub enum SessionError<A, O> {
    #[error("actuator failed: {0}")]
    Actuator(#[source] A),
    #[error("observer failed: {0}")]
    Observer(#[source] O),
    #[error("observed an outcome for {observed} after using {expected}")]
    UnexpectedEvent { expected: Action, observed: Action },
}

/// Result of a single loop iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    Acted { decision: Decision, event: Event },
    /// No action can still reach the goal, or the stone is used up.
    Finished,
}

/// Final report of a completed session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSummary {
    pub history: Vec<Event>,
    pub final_state: StoneState,
    pub final_value: Estimate,
    pub goal_reached: bool,
    /// Actions taken by this session, excluding any resumed history.
    pub moves: usize,
}

/// Drives a stone from a (possibly pre-recorded) history until the policy stops.
#[derive(Debug, Clone)]
pub struct Session {
    driver: PolicyDriver,
    history: Vec<Event>,
    moves: usize,
}

impl Session {
    #[must_use]
    pub const fn new(driver: PolicyDriver) -> Self {
        Self::resume(driver, Vec::new())
    }

    /// Continue from events that were already observed.
    #[must_use]
    pub const fn resume(driver: PolicyDriver, history: Vec<Event>) -> Self {
        Self {
            driver,
            history,
            moves: 0,
        }
    }

    #[must_use]
    pub fn history(&self) -> &[Event] {
        &self.history
    }

    #[must_use]
    pub const fn driver(&self) -> &PolicyDriver {
        &self.driver
    }

    #[must_use]
    pub fn into_driver(self) -> PolicyDriver {
        self.driver
    }

    #[must_use]
    pub fn state(&self) -> StoneState {
        self.driver.derive_state(&self.history)
    }

    /// Ask for the next action, carry it out and record its outcome.
    ///
    /// # Errors
    ///
    /// Returns boundary failures unchanged, and
    /// [`SessionError::UnexpectedEvent`] if the observer reports a different
    /// action than the one performed.
    pub fn step<B>(&mut self, boundary: &mut B) -> Result<StepOutcome, StepError<B>>
    where
        B: Actuator + Observer,
    {
        let Some(decision) = self.driver.recommend(&self.history).decision else {
            return Ok(StepOutcome::Finished);
        };
        if let Err(err) = boundary.perform(decision.action, decision.slot) {
            return Err(SessionError::Actuator(err));
        }
        let event = match boundary.observe(decision.action, decision.slot) {
            Ok(event) => event,
            Err(err) => return Err(SessionError::Observer(err)),
        };
        if event.action != decision.action {
            return Err(SessionError::UnexpectedEvent {
                expected: decision.action,
                observed: event.action,
            });
        }

        self.history.push(event);
        self.moves += 1;
        debug!(
            "Move {}: {} in slot {} {}",
            self.history.len(),
            decision.action,
            decision.slot,
            if event.succeeded { "succeeded" } else { "failed" }
        );
        Ok(StepOutcome::Acted { decision, event })
    }

    /// Step until the policy stops and summarize the stone.
    ///
    /// # Errors
    ///
    /// Returns the first error raised by [`Session::step`].
    pub fn run<B>(&mut self, boundary: &mut B) -> Result<SessionSummary, StepError<B>>
    where
        B: Actuator + Observer,
    {
        while let StepOutcome::Acted { .. } = self.step(boundary)? {}
        Ok(self.summary())
    }

    /// Snapshot of the session so far.
    pub fn summary(&mut self) -> SessionSummary {
        let final_state = self.state();
        let final_value = self.driver.state_value(&self.history);
        SessionSummary {
            goal_reached: self.driver.solver().goal_met(&final_state),
            history: self.history.clone(),
            final_state,
            final_value,
            moves: self.moves,
        }
    }
}

/// Error type of [`Session::step`] for a given boundary.
pub type StepError<B> = SessionError<<B as Actuator>::Error, <B as Observer>::Error>;
