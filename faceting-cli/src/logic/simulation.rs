use anyhow::{Context, Result};
use faceting_engine::numbers::{count_to_f64, mean, ratio};
use faceting_engine::{
    Action, Event, PolicyDriver, ProblemParams, Session, SessionSummary, SimulatedStone,
};
use serde::Serialize;

/// Upper bound on runs reserved up front; larger batches grow on demand.
const PREALLOCATED_RUNS: usize = 4096;

/// One simulated stone.
#[derive(Debug, Clone, Serialize)]
pub struct SimulationRun {
    pub seed: u64,
    pub iteration: usize,
    pub summary: SessionSummary,
}

impl SimulationRun {
    /// Successes recorded for `action` over the whole history.
    #[must_use]
    pub fn successes(&self, action: Action) -> usize {
        self.summary
            .history
            .iter()
            .filter(|event| event.action == action && event.succeeded)
            .count()
    }
}

/// Aggregate of a batch of simulated stones driven by the same policy.
#[derive(Debug, Clone, Serialize)]
pub struct BatchSummary {
    pub params: ProblemParams,
    pub runs: usize,
    pub goals_reached: usize,
    pub goal_rate: f64,
    /// Success probability the value function assigns to the starting history.
    pub predicted_rate: f64,
    /// Mean final success counts per action kind.
    pub mean_successes: [f64; 3],
    pub mean_moves: f64,
}

/// Run `iterations` seeded stones per seed, each resumed from `history`.
///
/// Iteration `i` of seed `s` uses the simulator seed `s + i`. The driver is
/// handed back so its table can be persisted.
pub fn run_batch(
    mut driver: PolicyDriver,
    history: &[Event],
    seeds: &[u64],
    iterations: usize,
) -> Result<(Vec<SimulationRun>, PolicyDriver)> {
    let mut runs = Vec::with_capacity(batch_capacity(seeds.len(), iterations));

    for &seed in seeds {
        for iteration in 0..iterations {
            let iteration_seed = seed.wrapping_add(u64::try_from(iteration).unwrap_or(u64::MAX));
            let mut stone = SimulatedStone::resume(iteration_seed, history);
            let mut session = Session::resume(driver, history.to_vec());
            let summary = session
                .run(&mut stone)
                .with_context(|| format!("simulation seed {seed} iteration {iteration}"))?;
            driver = session.into_driver();
            runs.push(SimulationRun {
                seed,
                iteration,
                summary,
            });
        }
    }

    Ok((runs, driver))
}

fn batch_capacity(seeds: usize, iterations: usize) -> usize {
    seeds.saturating_mul(iterations).min(PREALLOCATED_RUNS)
}

/// Fold simulated runs into a batch summary.
#[must_use]
pub fn summarize(
    params: ProblemParams,
    predicted_rate: f64,
    runs: &[SimulationRun],
) -> BatchSummary {
    let goals_reached = runs.iter().filter(|run| run.summary.goal_reached).count();
    let mean_for = |action: Action| {
        let counts: Vec<f64> = runs
            .iter()
            .map(|run| count_to_f64(run.successes(action)))
            .collect();
        mean(&counts)
    };
    let moves: Vec<f64> = runs
        .iter()
        .map(|run| count_to_f64(run.summary.moves))
        .collect();

    BatchSummary {
        params,
        runs: runs.len(),
        goals_reached,
        goal_rate: ratio(goals_reached, runs.len()),
        predicted_rate,
        mean_successes: Action::ALL.map(mean_for),
        mean_moves: mean(&moves),
    }
}
