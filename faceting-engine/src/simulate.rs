//! Seeded stand-in for a real stone, used to exercise the event loop offline.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use std::convert::Infallible;

use crate::session::{Actuator, Observer};
use crate::state::{Action, Drift, Event};

/// Rolls outcomes with the same drifting odds the value function assumes.
#[derive(Debug, Clone)]
pub struct SimulatedStone {
    rng: ChaCha20Rng,
    drift: Drift,
    uses: [u8; 3],
}

impl SimulatedStone {
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self::resume(seed, &[])
    }

    /// A stone whose drift already reflects `history`.
    #[must_use]
    pub fn resume(seed: u64, history: &[Event]) -> Self {
        let mut uses = [0_u8; 3];
        for event in history {
            let idx = event.action.index();
            uses[idx] = uses[idx].saturating_add(1);
        }
        Self {
            rng: ChaCha20Rng::seed_from_u64(seed),
            drift: Drift::replay(history),
            uses,
        }
    }

    #[must_use]
    pub const fn drift(&self) -> Drift {
        self.drift
    }

    /// Attempts performed per action kind, resumed history included.
    #[must_use]
    pub const fn uses(&self) -> [u8; 3] {
        self.uses
    }
}

impl Actuator for SimulatedStone {
    type Error = Infallible;

    fn perform(&mut self, action: Action, _slot: u8) -> Result<(), Self::Error> {
        let idx = action.index();
        self.uses[idx] = self.uses[idx].saturating_add(1);
        Ok(())
    }
}

impl Observer for SimulatedStone {
    type Error = Infallible;

    fn observe(&mut self, action: Action, _slot: u8) -> Result<Event, Self::Error> {
        let succeeded = self.rng.gen_bool(self.drift.success_chance());
        self.drift = self.drift.after(succeeded);
        Ok(Event::new(action, succeeded))
    }
}
