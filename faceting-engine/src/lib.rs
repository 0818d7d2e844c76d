//! Faceting Decision Engine
//!
//! Exact dynamic-programming advisor for ability stone faceting. Given the
//! outcomes observed so far, the engine computes the probability of meeting a
//! goal under optimal play and recommends which ability to use next.
//! This crate holds all decision logic without any CLI or I/O front end.

pub mod cache;
pub mod config;
pub mod constants;
pub mod engraving;
pub mod estimate;
pub mod goal;
pub mod numbers;
pub mod policy;
pub mod session;
pub mod simulate;
pub mod solver;
pub mod state;

// Re-export commonly used types
pub use cache::{CacheError, CacheStore, FileCacheStore, SaveStatus};
pub use config::{ConfigError, FacetConfig, ProblemParams, StonePreset};
pub use engraving::{Detection, EngravingPolicy, EngravingSelection, SelectedEngraving};
pub use estimate::Estimate;
pub use goal::GoalRule;
pub use policy::{Candidate, Decision, PolicyDriver, Recommendation};
pub use session::{
    Actuator, Observer, Session, SessionError, SessionSummary, StepError, StepOutcome,
};
pub use simulate::SimulatedStone;
pub use solver::{Solver, ValueTable};
pub use state::{Action, Drift, DriftOutOfRange, Event, StateKey, StoneState};

use log::debug;

/// Main engine binding a validated configuration to a cache store.
pub struct FacetEngine<S>
where
    S: CacheStore,
{
    config: FacetConfig,
    store: S,
}

impl<S> FacetEngine<S>
where
    S: CacheStore,
{
    /// Create an engine for `config`, persisting tables through `store`.
    ///
    /// # Errors
    ///
    /// Returns the first configuration limit `config` violates.
    pub fn new(config: FacetConfig, store: S) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config, store })
    }

    #[must_use]
    pub const fn config(&self) -> &FacetConfig {
        &self.config
    }

    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    #[must_use]
    pub const fn problem(&self) -> ProblemParams {
        self.config.problem()
    }

    /// Build a solver, seeded from the store when caching is enabled.
    #[must_use]
    pub fn open_solver(&self) -> Solver {
        let params = self.problem();
        if !self.config.use_cache {
            return Solver::new(params);
        }
        match self.store.load(&params) {
            Some(table) => Solver::with_table(params, table),
            None => {
                debug!("Starting {params} with an empty table");
                Solver::new(params)
            }
        }
    }

    /// Policy driver for the configured problem and preferred action.
    #[must_use]
    pub fn open_driver(&self) -> PolicyDriver {
        PolicyDriver::new(self.open_solver(), self.config.preferred())
    }

    /// Event loop starting from `history`.
    #[must_use]
    pub fn open_session(&self, history: Vec<Event>) -> Session {
        Session::resume(self.open_driver(), history)
    }

    /// Persist the solver's table after a clean run.
    ///
    /// Returns `None` when caching is disabled or nothing new was computed.
    ///
    /// # Errors
    ///
    /// Returns the store's error if the table cannot be written.
    pub fn persist(&self, solver: &Solver) -> Result<Option<SaveStatus>, S::Error> {
        if !self.config.use_cache || !solver.is_dirty() {
            return Ok(None);
        }
        self.store.save(solver.params(), solver.table()).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::convert::Infallible;
    use std::rc::Rc;

    #[derive(Clone, Default)]
    struct MemoryStore {
        tables: Rc<RefCell<HashMap<ProblemParams, ValueTable>>>,
    }

    impl CacheStore for MemoryStore {
        type Error = Infallible;

        fn load(&self, params: &ProblemParams) -> Option<ValueTable> {
            self.tables.borrow().get(params).cloned()
        }

        fn save(
            &self,
            params: &ProblemParams,
            table: &ValueTable,
        ) -> Result<SaveStatus, Self::Error> {
            let mut tables = self.tables.borrow_mut();
            if tables.contains_key(params) {
                return Ok(SaveStatus::AlreadyPresent);
            }
            tables.insert(*params, table.clone());
            Ok(SaveStatus::Written {
                entries: table.len(),
            })
        }
    }

    fn small_config() -> FacetConfig {
        FacetConfig {
            attempts_budget: 3,
            total: 4,
            goal3: 2,
            ..FacetConfig::default()
        }
    }

    #[test]
    fn engine_rejects_invalid_configuration() {
        let config = FacetConfig {
            preferred_action: 9,
            ..FacetConfig::default()
        };
        assert!(matches!(
            FacetEngine::new(config, MemoryStore::default()),
            Err(ConfigError::PreferredAction(9))
        ));
    }

    #[test]
    fn engine_persists_and_reuses_tables() {
        let store = MemoryStore::default();
        let engine = FacetEngine::new(small_config(), store.clone()).unwrap();

        let mut driver = engine.open_driver();
        let value = driver.state_value(&[]);
        let solver = driver.into_solver();
        let status = engine.persist(&solver).unwrap();
        assert_eq!(
            status,
            Some(SaveStatus::Written {
                entries: solver.len()
            })
        );

        let mut reopened = engine.open_driver();
        assert_eq!(reopened.solver().len(), solver.len());
        assert!(reopened.state_value(&[]).bit_eq(&value));
        assert_eq!(engine.persist(reopened.solver()).unwrap(), None);
    }

    #[test]
    fn disabled_cache_never_touches_the_store() {
        let store = MemoryStore::default();
        let config = FacetConfig {
            use_cache: false,
            ..small_config()
        };
        let engine = FacetEngine::new(config, store.clone()).unwrap();
        let mut driver = engine.open_driver();
        driver.state_value(&[]);
        assert_eq!(engine.persist(driver.solver()).unwrap(), None);
        assert!(store.tables.borrow().is_empty());
    }

    #[test]
    fn sessions_run_against_the_simulator() {
        let engine = FacetEngine::new(small_config(), MemoryStore::default()).unwrap();
        let mut session = engine.open_session(Vec::new());
        let mut stone = SimulatedStone::new(11);
        let summary = session.run(&mut stone).unwrap();
        assert_eq!(summary.history.len(), summary.moves);
        assert!(summary.moves <= 9);
        if summary.goal_reached {
            assert!(summary.final_state.is_exhausted());
        }
    }
}
