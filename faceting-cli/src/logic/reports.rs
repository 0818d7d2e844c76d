use anyhow::Result;
use chrono::Utc;
use colored::Colorize;
use faceting_engine::numbers::percent_points;
use faceting_engine::{Action, Candidate, Estimate, Event, ProblemParams, Recommendation};
use serde::Serialize;
use std::io::Write;

use super::history::format_history;
use super::simulation::{BatchSummary, SimulationRun};

/// Named view of an [`Estimate`] for JSON output.
#[derive(Debug, Clone, Serialize)]
pub struct EstimateView {
    pub success: f64,
    pub reward: f64,
    pub expected_first: f64,
    pub expected_second: f64,
    pub expected_negative: f64,
}

impl From<&Estimate> for EstimateView {
    fn from(estimate: &Estimate) -> Self {
        Self {
            success: estimate.success,
            reward: estimate.reward,
            expected_first: estimate.expected[0],
            expected_second: estimate.expected[1],
            expected_negative: estimate.expected[2],
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CandidateView {
    pub action: Action,
    pub kind: u8,
    pub available: bool,
    pub estimate: EstimateView,
}

impl From<&Candidate> for CandidateView {
    fn from(candidate: &Candidate) -> Self {
        Self {
            action: candidate.action,
            kind: candidate.action.kind(),
            available: candidate.available,
            estimate: EstimateView::from(&candidate.estimate),
        }
    }
}

/// JSON document describing one piece of advice.
#[derive(Debug, Clone, Serialize)]
pub struct AdviceReport {
    pub generated_at: String,
    pub params: ProblemParams,
    pub history: String,
    pub remaining: [u8; 3],
    pub successes: [u8; 2],
    pub failure_budget: i16,
    pub success_chance: f64,
    pub value: EstimateView,
    pub candidates: Vec<CandidateView>,
    pub recommended_action: Option<u8>,
    pub slot: Option<u8>,
}

impl AdviceReport {
    #[must_use]
    pub fn new(params: ProblemParams, history: &[Event], rec: &Recommendation) -> Self {
        Self {
            generated_at: Utc::now().to_rfc3339(),
            params,
            history: format_history(history),
            remaining: rec.state.remaining,
            successes: rec.state.successes,
            failure_budget: rec.state.failure_budget,
            success_chance: rec.success_chance,
            value: EstimateView::from(&rec.value),
            candidates: rec.candidates.iter().map(CandidateView::from).collect(),
            recommended_action: rec.decision.map(|decision| decision.action.kind()),
            slot: rec.decision.map(|decision| decision.slot),
        }
    }
}

/// JSON document describing a simulation batch.
#[derive(Debug, Clone, Serialize)]
pub struct SimulationReport<'a> {
    pub generated_at: String,
    pub summary: &'a BatchSummary,
    pub runs: &'a [SimulationRun],
}

fn pct(probability: f64) -> String {
    format!("{:.2}%", probability * 100.0)
}

fn triple(values: [f64; 3]) -> String {
    format!("{:.2} / {:.2} / {:.2}", values[0], values[1], values[2])
}

pub fn generate_console_advice<W: Write>(
    out: &mut W,
    params: ProblemParams,
    history: &[Event],
    rec: &Recommendation,
) -> Result<()> {
    writeln!(out)?;
    writeln!(out, "{}", "💎 Faceting Advice".bright_cyan().bold())?;
    writeln!(out, "{}", "==================".cyan())?;
    writeln!(out, "Goal: {params}")?;
    if history.is_empty() {
        writeln!(out, "History: (fresh stone)")?;
    } else {
        writeln!(out, "History: {}", format_history(history))?;
    }
    let state = &rec.state;
    writeln!(
        out,
        "Remaining: {} / {} / {}   Successes: {} / {}   Negative budget left: {}",
        state.remaining[0],
        state.remaining[1],
        state.remaining[2],
        state.successes[0],
        state.successes[1],
        state.failure_budget
    )?;
    writeln!(out, "Next success chance: {}%", percent_points(rec.success_chance))?;
    writeln!(out, "Goal probability: {}", pct(rec.value.success).bold())?;
    writeln!(out)?;

    for candidate in &rec.candidates {
        let chosen = rec
            .decision
            .is_some_and(|decision| decision.action == candidate.action);
        let label = format!("{:<17}", candidate.action.to_string());
        let line = if candidate.available {
            format!(
                "P {:>7}  R {:.4}  E {}",
                pct(candidate.estimate.success),
                candidate.estimate.reward,
                triple(candidate.estimate.expected)
            )
        } else {
            "no attempts left".to_string()
        };
        if chosen {
            writeln!(out, "  {} {}  {}", label.green().bold(), line, "◀".green())?;
        } else {
            writeln!(out, "  {label} {line}")?;
        }
    }
    writeln!(out)?;

    match rec.decision {
        Some(decision) => writeln!(
            out,
            "➡️  Use {} (slot {})",
            decision.action.to_string().green().bold(),
            decision.slot
        )?,
        None => writeln!(out, "{}", "🛑 No action can still reach the goal".red())?,
    }
    Ok(())
}

pub fn generate_json_advice<W: Write>(out: &mut W, report: &AdviceReport) -> Result<()> {
    serde_json::to_writer_pretty(&mut *out, report)?;
    writeln!(out)?;
    Ok(())
}

pub fn generate_markdown_advice<W: Write>(out: &mut W, report: &AdviceReport) -> Result<()> {
    writeln!(out, "# Faceting Advice\n")?;
    writeln!(out, "- **Goal**: {}", report.params)?;
    let history = if report.history.is_empty() {
        "_fresh stone_"
    } else {
        report.history.as_str()
    };
    writeln!(out, "- **History**: {history}")?;
    writeln!(
        out,
        "- **Goal probability**: {}",
        pct(report.value.success)
    )?;
    match (report.recommended_action, report.slot) {
        (Some(kind), Some(slot)) => {
            writeln!(out, "- **Recommendation**: ability {kind}, slot {slot}\n")?;
        }
        _ => writeln!(out, "- **Recommendation**: stop, the goal is out of reach\n")?,
    }

    writeln!(out, "| Action | P | R | E1 | E2 | E3 |")?;
    writeln!(out, "|--------|---|---|----|----|----|")?;
    for candidate in &report.candidates {
        if !candidate.available {
            writeln!(out, "| {} | - | - | - | - | - |", candidate.action)?;
            continue;
        }
        let estimate = &candidate.estimate;
        writeln!(
            out,
            "| {} | {} | {:.4} | {:.2} | {:.2} | {:.2} |",
            candidate.action,
            pct(estimate.success),
            estimate.reward,
            estimate.expected_first,
            estimate.expected_second,
            estimate.expected_negative
        )?;
    }
    Ok(())
}

pub fn generate_console_simulation<W: Write>(out: &mut W, summary: &BatchSummary) -> Result<()> {
    writeln!(out)?;
    writeln!(out, "{}", "🎲 Simulation Summary".bright_cyan().bold())?;
    writeln!(out, "{}", "=====================".cyan())?;
    writeln!(out, "Goal: {}", summary.params)?;
    writeln!(out, "Runs: {}", summary.runs)?;
    writeln!(
        out,
        "Goals reached: {} ({})",
        summary.goals_reached.to_string().green(),
        pct(summary.goal_rate)
    )?;
    writeln!(out, "Predicted goal rate: {}", pct(summary.predicted_rate))?;
    writeln!(out, "Mean successes: {}", triple(summary.mean_successes))?;
    writeln!(out, "Mean moves: {:.2}", summary.mean_moves)?;
    Ok(())
}

pub fn generate_json_simulation<W: Write>(
    out: &mut W,
    summary: &BatchSummary,
    runs: &[SimulationRun],
) -> Result<()> {
    let report = SimulationReport {
        generated_at: Utc::now().to_rfc3339(),
        summary,
        runs,
    };
    serde_json::to_writer_pretty(&mut *out, &report)?;
    writeln!(out)?;
    Ok(())
}

pub fn generate_markdown_simulation<W: Write>(
    out: &mut W,
    summary: &BatchSummary,
    runs: &[SimulationRun],
) -> Result<()> {
    writeln!(out, "# Faceting Simulation\n")?;
    writeln!(out, "## Summary\n")?;
    writeln!(out, "- **Goal**: {}", summary.params)?;
    writeln!(out, "- **Runs**: {}", summary.runs)?;
    writeln!(
        out,
        "- **Goals reached**: {} ({})",
        summary.goals_reached,
        pct(summary.goal_rate)
    )?;
    writeln!(out, "- **Predicted goal rate**: {}", pct(summary.predicted_rate))?;
    writeln!(out, "- **Mean successes**: {}", triple(summary.mean_successes))?;
    writeln!(out, "- **Mean moves**: {:.2}\n", summary.mean_moves)?;

    writeln!(out, "## Runs\n")?;
    writeln!(out, "| Seed | Iteration | Goal | Moves | History |")?;
    writeln!(out, "|------|-----------|------|-------|---------|")?;
    for run in runs {
        writeln!(
            out,
            "| {} | {} | {} | {} | `{}` |",
            run.seed,
            run.iteration,
            if run.summary.goal_reached { "✅" } else { "❌" },
            run.summary.moves,
            format_history(&run.summary.history)
        )?;
    }
    Ok(())
}
