//! Centralized probability and milestone constants for the faceting engine.
//!
//! These values define the deterministic math of the decision engine. Keeping
//! them together means the odds and reward shaping can only change through a
//! reviewed code change, never through a loaded asset.

// Drift index ---------------------------------------------------------------
/// Number of drift steps; the index lives in `0..DRIFT_STEPS`.
pub const DRIFT_STEPS: u8 = 6;
/// Highest drift index (75% success chance). Every stone starts here.
pub const DRIFT_MAX: u8 = DRIFT_STEPS - 1;
pub(crate) const DRIFT_BASE_CHANCE: f64 = 0.25;
pub(crate) const DRIFT_STEP_CHANCE: f64 = 0.1;

// Problem limits ------------------------------------------------------------
/// Largest attempts budget accepted by configuration validation.
pub const MAX_ATTEMPTS_BUDGET: u8 = 20;
/// Attempts per action kind on a relic ability stone.
pub const DEFAULT_ATTEMPTS_BUDGET: u8 = 10;
/// Default failure budget for the negative action kind.
pub const DEFAULT_FAILURE_BUDGET: u8 = 4;
/// Default combined goal ("9/7 stone").
pub const DEFAULT_TOTAL_GOAL: u8 = 16;

// Terminal values -------------------------------------------------------------
/// Reward recorded when a run ends without meeting its goal.
pub const FAILURE_PENALTY: f64 = 0.0;

// Milestone rewards -----------------------------------------------------------
/// `(threshold, cumulative reward)` pairs for the positive kinds, highest first.
pub(crate) const POSITIVE_MILESTONES: [(u8, f64); 4] =
    [(10, 0.0513), (9, 0.0449), (7, 0.0321), (6, 0.0256)];
/// `(threshold, cumulative penalty)` pairs for the negative kind, highest first.
pub(crate) const NEGATIVE_MILESTONES: [(u8, f64); 3] = [(10, -0.06), (7, -0.04), (5, -0.02)];

// Target rules ----------------------------------------------------------------
pub(crate) const NINE_SEVEN_TOTAL: i16 = 16;
pub(crate) const SEVEN_SEVEN_TOTAL: i16 = 14;

// Engraving screening -----------------------------------------------------------
/// Positive lines on a stone; detections beyond this are never selected.
pub const POSITIVE_LINES: usize = 2;
/// Negative lines on a stone.
pub const NEGATIVE_LINES: usize = 1;
/// Default engraving priority order, most wanted first.
pub const DEFAULT_ENGRAVING_PRIORITIES: [&str; 20] = [
    "Awakening",
    "Drops of Ether",
    "Precise Dagger",
    "MP Efficiency Increase",
    "Adrenaline",
    "Cursed Doll",
    "Hit Master",
    "Master's Tenacity",
    "Stabilized Status",
    "Barricade",
    "Propulsion",
    "Mass Increase",
    "Raid Captain",
    "Ambush Master",
    "Master Brawler",
    "Grudge",
    "Super Charge",
    "All-Out Attack",
    "Ether Predator",
    "Keen Blunt Weapon",
];
/// Default whitelist of positives worth faceting.
pub const DEFAULT_POSSIBLE_ENGRAVINGS: [&str; 7] = [
    "Cursed Doll",
    "Grudge",
    "Raid Captain",
    "Adrenaline",
    "MP Efficiency Increase",
    "Precise Dagger",
    "Hit Master",
];
/// Default caps for each negative engraving; the cap becomes the failure budget.
pub const DEFAULT_NEGATIVE_CAPS: [(&str, u8); 4] = [
    ("Atk. Power Reduction", 4),
    ("Atk. Speed Reduction", 10),
    ("Defense Reduction", 10),
    ("Move Speed Reduction", 10),
];

// Cache files -----------------------------------------------------------------
pub(crate) const CACHE_FORMAT_VERSION: u32 = 1;
pub(crate) const CACHE_CHECKSUM_SEED: u64 = 0x4641_4345_5400_0001;
/// Directory used when the configuration does not name one.
pub const DEFAULT_CACHE_DIR: &str = "tmp";
