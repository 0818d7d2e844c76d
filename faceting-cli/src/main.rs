mod logic;
mod util;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use colored::Colorize;
use faceting_engine::{
    Action, EngravingPolicy, Event, FacetConfig, FacetEngine, FileCacheStore, PolicyDriver,
    SaveStatus, Solver, StonePreset,
};
use log::{debug, info, warn};
use std::fs::File;
use std::io::{BufWriter, Write, stdout};
use std::path::PathBuf;
use std::time::Instant;

use logic::reports::{
    AdviceReport, generate_console_advice, generate_console_simulation, generate_json_advice,
    generate_json_simulation, generate_markdown_advice, generate_markdown_simulation,
};
use logic::{parse_detections, parse_history, resolve_seed_inputs, run_batch, summarize};
use util::split_csv;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RunMode {
    /// Recommend the next action for a recorded history
    Advise,
    /// Play seeded stones against the simulator and aggregate the outcomes
    Simulate,
}

#[derive(Debug, Parser)]
#[command(name = "faceting", version)]
#[command(about = "Exact probability advisor for ability stone faceting")]
struct Args {
    /// What to do: advise on a history or simulate stones
    #[arg(long, value_enum, default_value_t = RunMode::Advise)]
    mode: RunMode,

    /// JSON configuration file; flags below override its values
    #[arg(long)]
    config: Option<PathBuf>,

    /// Goal preset (total16, total14, nine-seven, seven-nine)
    #[arg(long)]
    preset: Option<StonePreset>,

    /// Attempts per action kind
    #[arg(long)]
    attempts: Option<u8>,

    /// Required successes on ability 1 (0 with --goal2 0 selects total mode)
    #[arg(long)]
    goal1: Option<u8>,

    /// Required successes on ability 2
    #[arg(long)]
    goal2: Option<u8>,

    /// Combined goal in total mode
    #[arg(long)]
    total: Option<u8>,

    /// Negative successes tolerated before the stone fails
    #[arg(long)]
    goal3: Option<u8>,

    /// Action kind (1, 2 or 3) that wins ties
    #[arg(long)]
    preferred: Option<u8>,

    /// Neither read nor write cached value tables
    #[arg(long)]
    no_cache: bool,

    /// Directory holding cached value tables
    #[arg(long)]
    cache_dir: Option<PathBuf>,

    /// Detected engravings in screen order, e.g. "Cursed Doll:0.97,Grudge,Atk. Power Reduction";
    /// sets the preferred action and failure budget, or skips the stone
    #[arg(long)]
    engravings: Option<String>,

    /// JSON engraving policy (priorities, possible_engravings, negative_caps)
    #[arg(long)]
    engraving_policy: Option<PathBuf>,

    /// Observed events, e.g. "1+,1-,2+,3-" (s/f also accepted)
    #[arg(long, default_value = "")]
    history: String,

    /// Seeds to simulate (comma-separated)
    #[arg(long, default_value = "1337")]
    seeds: String,

    /// Simulated stones per seed
    #[arg(long, default_value_t = 10)]
    iterations: usize,

    /// Output report format
    #[arg(long, default_value = "console")]
    #[arg(value_parser = ["console", "json", "markdown"])]
    report: String,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Optional path to write the report output instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let Some(config) = screen_stone(&args, build_config(&args)?)? else {
        if args.report == "console" {
            println!(
                "{}",
                "⏭️  Engravings do not meet the selection criteria; skipping this stone".yellow()
            );
        } else {
            info!("Engravings do not meet the selection criteria; skipping this stone");
        }
        return Ok(());
    };
    let history = parse_history(&args.history).context("invalid --history")?;
    warn_on_overused_history(&config, &history);

    let store = FileCacheStore::new(config.cache_dir.clone());
    let engine = FacetEngine::new(config, store).context("invalid configuration")?;

    if args.report == "console" {
        announce_banner();
    }

    let start_time = Instant::now();
    let mut output_target = OutputTarget::new(args.output.clone())?;
    let driver = engine.open_driver();
    let driver = match args.mode {
        RunMode::Advise => run_advise(&args, driver, &history, &mut output_target)?,
        RunMode::Simulate => run_simulate(&args, driver, &history, &mut output_target)?,
    };

    if args.report == "console" {
        writeln!(&mut output_target)?;
        writeln!(&mut output_target, "🏁 Total time: {:?}", start_time.elapsed())?;
    }
    output_target.flush_inner()?;

    let solver = driver.into_solver();
    if args.verbose {
        println!(
            "🧮 {} states in table ({} computed this run)",
            solver.len(),
            solver.computed()
        );
    }
    persist_table(&engine, &solver);
    Ok(())
}

fn announce_banner() {
    println!("{}", "💎 Faceting Decision Engine".bright_cyan().bold());
    println!("{}", "================================".cyan());
}

fn build_config(args: &Args) -> Result<FacetConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            FacetConfig::from_json(&raw)
                .with_context(|| format!("failed to load {}", path.display()))?
        }
        None => FacetConfig::default(),
    };

    if let Some(preset) = args.preset {
        config = config.with_preset(preset);
    }
    if let Some(attempts) = args.attempts {
        config.attempts_budget = attempts;
    }
    if let Some(goal1) = args.goal1 {
        config.goal1 = goal1;
    }
    if let Some(goal2) = args.goal2 {
        config.goal2 = goal2;
    }
    if let Some(total) = args.total {
        config.total = total;
    }
    if let Some(goal3) = args.goal3 {
        config.goal3 = goal3;
    }
    if let Some(preferred) = args.preferred {
        config.preferred_action = preferred;
    }
    if args.no_cache {
        config.use_cache = false;
    }
    if let Some(dir) = &args.cache_dir {
        config.cache_dir.clone_from(dir);
    }

    config.validate().context("invalid configuration")?;
    Ok(config)
}

/// Apply `--engravings` to `config`; `None` means the stone should be skipped.
fn screen_stone(args: &Args, config: FacetConfig) -> Result<Option<FacetConfig>> {
    let Some(raw) = &args.engravings else {
        return Ok(Some(config));
    };
    let policy = match &args.engraving_policy {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            EngravingPolicy::from_json(&json)
                .with_context(|| format!("failed to load {}", path.display()))?
        }
        None => EngravingPolicy::default(),
    };
    let detections = parse_detections(raw).context("invalid --engravings")?;
    let planned = policy.plan(&config, &detections);
    if let Some(planned) = &planned {
        info!(
            "Engravings select {} as preferred with a failure budget of {}",
            planned.preferred(),
            planned.goal3
        );
    }
    Ok(planned)
}

fn warn_on_overused_history(config: &FacetConfig, history: &[Event]) {
    for action in Action::ALL {
        let used = history
            .iter()
            .filter(|event| event.action == action)
            .count();
        if used > usize::from(config.attempts_budget) {
            warn!(
                "History uses {action} {used} times but only {} attempts exist; extra entries only count toward drift",
                config.attempts_budget
            );
        }
    }
}

fn run_advise<W: Write>(
    args: &Args,
    mut driver: PolicyDriver,
    history: &[Event],
    out: &mut W,
) -> Result<PolicyDriver> {
    let params = *driver.solver().params();
    let rec = driver.recommend(history);
    debug!("Recommendation for {params}: {:?}", rec.decision);

    match args.report.as_str() {
        "json" => generate_json_advice(out, &AdviceReport::new(params, history, &rec))?,
        "markdown" => generate_markdown_advice(out, &AdviceReport::new(params, history, &rec))?,
        _ => generate_console_advice(out, params, history, &rec)?,
    }
    Ok(driver)
}

fn run_simulate<W: Write>(
    args: &Args,
    mut driver: PolicyDriver,
    history: &[Event],
    out: &mut W,
) -> Result<PolicyDriver> {
    let params = *driver.solver().params();
    let seeds = resolve_seed_inputs(&split_csv(&args.seeds))?;
    let predicted = driver.state_value(history).success;

    if args.report == "console" {
        println!("{}", "🎲 Running simulations".bright_yellow().bold());
        println!("{}", "-".repeat(30).yellow());
    }
    let (runs, driver) = run_batch(driver, history, &seeds, args.iterations)?;
    let summary = summarize(params, predicted, &runs);

    match args.report.as_str() {
        "json" => generate_json_simulation(out, &summary, &runs)?,
        "markdown" => generate_markdown_simulation(out, &summary, &runs)?,
        _ => generate_console_simulation(out, &summary)?,
    }
    Ok(driver)
}

fn persist_table(engine: &FacetEngine<FileCacheStore>, solver: &Solver) {
    match engine.persist(solver) {
        Ok(Some(SaveStatus::Written { entries })) => {
            info!(
                "Cached {entries} states in {}",
                engine.store().path_for(solver.params()).display()
            );
        }
        Ok(Some(SaveStatus::AlreadyPresent)) => {
            debug!("Cache already present; leaving it untouched");
        }
        Ok(None) => {}
        Err(err) => warn!("Failed to save cache: {err}"),
    }
}

enum OutputTarget {
    Stdout(BufWriter<std::io::Stdout>),
    File(BufWriter<File>),
}

impl OutputTarget {
    fn new(path: Option<PathBuf>) -> Result<Self> {
        if let Some(path) = path {
            let file = File::create(&path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            Ok(Self::File(BufWriter::new(file)))
        } else {
            Ok(Self::Stdout(BufWriter::new(stdout())))
        }
    }

    fn writer(&mut self) -> &mut dyn Write {
        match self {
            Self::Stdout(w) => w,
            Self::File(w) => w,
        }
    }

    fn flush_inner(&mut self) -> std::io::Result<()> {
        match self {
            Self::Stdout(w) => w.flush(),
            Self::File(w) => w.flush(),
        }
    }
}

impl Write for OutputTarget {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.writer().write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.flush_inner()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(label: &str) -> PathBuf {
        std::env::temp_dir().join(format!(
            "faceting-main-{label}-{}",
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                .as_nanos()
        ))
    }

    fn base_args() -> Args {
        Args {
            mode: RunMode::Advise,
            config: None,
            preset: None,
            attempts: Some(3),
            goal1: None,
            goal2: None,
            total: Some(4),
            goal3: Some(2),
            preferred: None,
            no_cache: true,
            cache_dir: None,
            engravings: None,
            engraving_policy: None,
            history: String::new(),
            seeds: "1337".to_string(),
            iterations: 2,
            report: "json".to_string(),
            verbose: false,
            output: None,
        }
    }

    fn driver_for(args: &Args) -> PolicyDriver {
        let config = build_config(args).unwrap();
        PolicyDriver::new(Solver::new(config.problem()), config.preferred())
    }

    #[test]
    fn flags_override_defaults() {
        let config = build_config(&base_args()).unwrap();
        assert_eq!(config.attempts_budget, 3);
        assert_eq!(config.total, 4);
        assert_eq!(config.goal3, 2);
        assert!(!config.use_cache);
    }

    #[test]
    fn presets_apply_before_explicit_goals() {
        let args = Args {
            attempts: None,
            total: None,
            goal3: None,
            preset: Some(StonePreset::SevenNine),
            goal1: Some(6),
            ..base_args()
        };
        let config = build_config(&args).unwrap();
        assert_eq!((config.goal1, config.goal2), (6, 9));
        assert_eq!(config.preferred(), Action::Second);
    }

    #[test]
    fn config_file_is_loaded_then_overridden() {
        let path = temp_path("config.json");
        std::fs::write(&path, r#"{"attempts_budget": 5, "total": 8, "goal3": 1}"#).unwrap();
        let args = Args {
            config: Some(path),
            attempts: None,
            total: None,
            goal3: Some(3),
            ..base_args()
        };
        let config = build_config(&args).unwrap();
        assert_eq!(config.attempts_budget, 5);
        assert_eq!(config.total, 8);
        assert_eq!(config.goal3, 3);
    }

    #[test]
    fn invalid_flags_are_rejected() {
        let args = Args {
            preferred: Some(7),
            ..base_args()
        };
        assert!(build_config(&args).is_err());
        let args = Args {
            config: Some(temp_path("missing.json")),
            ..base_args()
        };
        assert!(build_config(&args).is_err());
    }

    #[test]
    fn engravings_set_preference_and_failure_budget() {
        let args = Args {
            engravings: Some("Grudge:0.97,Cursed Doll:0.9,Atk. Power Reduction".to_string()),
            ..base_args()
        };
        let config = screen_stone(&args, build_config(&args).unwrap())
            .unwrap()
            .unwrap();
        assert_eq!(config.preferred(), Action::Second);
        assert_eq!(config.goal3, 4);
        assert_eq!(config.total, 4);

        let untouched = screen_stone(&base_args(), build_config(&base_args()).unwrap()).unwrap();
        assert_eq!(untouched, Some(build_config(&base_args()).unwrap()));
    }

    #[test]
    fn unwanted_engravings_skip_the_stone() {
        let args = Args {
            engravings: Some("Awakening,Grudge,Defense Reduction".to_string()),
            ..base_args()
        };
        assert!(screen_stone(&args, build_config(&args).unwrap()).unwrap().is_none());

        let policy = temp_path("policy.json");
        std::fs::write(&policy, r#"{"possible_engravings": ["Awakening"]}"#).unwrap();
        let args = Args {
            engraving_policy: Some(policy),
            ..args
        };
        let config = screen_stone(&args, build_config(&args).unwrap())
            .unwrap()
            .unwrap();
        assert_eq!(config.preferred(), Action::First);
        assert_eq!(config.goal3, 10);
    }

    #[test]
    fn advise_writes_json_report() {
        let args = base_args();
        let history = parse_history("1+,2-").unwrap();
        let mut buffer = Vec::new();
        let driver = run_advise(&args, driver_for(&args), &history, &mut buffer).unwrap();
        assert!(driver.solver().len() > 0);
        let parsed: serde_json::Value = serde_json::from_slice(&buffer).unwrap();
        assert_eq!(parsed["history"], "1+,2-");
    }

    #[test]
    fn simulate_writes_markdown_report() {
        let args = Args {
            mode: RunMode::Simulate,
            report: "markdown".to_string(),
            seeds: "1,2".to_string(),
            ..base_args()
        };
        let mut buffer = Vec::new();
        run_simulate(&args, driver_for(&args), &[], &mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        assert!(text.contains("# Faceting Simulation"));
        assert!(text.contains("- **Runs**: 4"));
    }

    #[test]
    fn output_target_file_writes() {
        let path = temp_path("target.txt");
        let mut target = OutputTarget::new(Some(path.clone())).unwrap();
        target.write_all(b"ok").unwrap();
        target.flush().unwrap();
        assert_eq!(std::fs::read_to_string(path).unwrap(), "ok");
    }
}
