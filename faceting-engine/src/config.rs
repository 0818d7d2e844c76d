//! Problem parameters and the user-facing faceting configuration.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

use crate::constants::{
    DEFAULT_ATTEMPTS_BUDGET, DEFAULT_CACHE_DIR, DEFAULT_FAILURE_BUDGET, DEFAULT_TOTAL_GOAL,
    MAX_ATTEMPTS_BUDGET,
};
use crate::state::Action;

/// The five values that define one DP problem and key its persisted cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProblemParams {
    /// Attempts available per action kind.
    pub attempts: u8,
    /// Required successes on ability 1 (0 together with `goal2` selects total mode).
    pub goal1: u8,
    /// Required successes on ability 2.
    pub goal2: u8,
    /// Combined goal used in total mode.
    pub total: u8,
    /// Negative successes tolerated before the stone fails.
    pub goal3: u8,
}

impl ProblemParams {
    #[must_use]
    pub const fn new(attempts: u8, goal1: u8, goal2: u8, total: u8, goal3: u8) -> Self {
        Self {
            attempts,
            goal1,
            goal2,
            total,
            goal3,
        }
    }

    /// Total mode holds iff both individual goals are zero.
    #[must_use]
    pub const fn is_total_mode(&self) -> bool {
        self.goal1 == 0 && self.goal2 == 0
    }

    /// File stem shared by every cache written for these parameters.
    #[must_use]
    pub fn cache_stem(&self) -> String {
        format!(
            "dp_{}_{}_{}_{}_{}",
            self.attempts, self.goal1, self.goal2, self.total, self.goal3
        )
    }
}

impl fmt::Display for ProblemParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_total_mode() {
            write!(
                f,
                "total {} over {} attempts (negative cap {})",
                self.total, self.attempts, self.goal3
            )
        } else {
            write!(
                f,
                "{}/{} over {} attempts (negative cap {})",
                self.goal1, self.goal2, self.attempts, self.goal3
            )
        }
    }
}

/// Errors raised when a configuration violates the engine's limits.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("attempts budget must be between 1 and {max} (got {value})")]
    AttemptsBudget { max: u8, value: u8 },
    #[error("{field} must not exceed the attempts budget {budget} (got {value})")]
    GoalAboveBudget {
        field: &'static str,
        budget: u8,
        value: u8,
    },
    #[error("total goal must not exceed {max} (got {value})")]
    TotalAboveReach { max: u16, value: u8 },
    #[error("negative cap must not exceed {max} (got {value})")]
    FailureBudget { max: u8, value: u8 },
    #[error("preferred action must be 1, 2 or 3 (got {0})")]
    PreferredAction(u8),
    #[error("{field} must be between {min} and {max} (got {value})")]
    EngravingLines {
        field: &'static str,
        min: usize,
        max: usize,
        value: usize,
    },
    #[error("cap for '{name}' must not exceed {max} (got {value})")]
    NegativeCap { name: String, max: u8, value: u8 },
    #[error("unknown preset '{0}'")]
    UnknownPreset(String),
    #[error("configuration is not valid JSON: {0}")]
    Parse(String),
}

/// Common stone goals, matching the prompts of the interactive faceting tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StonePreset {
    /// 9/7 on either ability (total 16, never 8/8).
    Total16,
    /// 7/7 or better (total 14).
    Total14,
    /// 9 on ability 1 and 7 on ability 2.
    NineSeven,
    /// 7 on ability 1 and 9 on ability 2.
    SevenNine,
}

impl StonePreset {
    pub const ALL: [Self; 4] = [Self::Total16, Self::Total14, Self::NineSeven, Self::SevenNine];

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Total16 => "total16",
            Self::Total14 => "total14",
            Self::NineSeven => "nine-seven",
            Self::SevenNine => "seven-nine",
        }
    }

    /// `(goal1, goal2, total)` for the preset.
    #[must_use]
    pub const fn goals(self) -> (u8, u8, u8) {
        match self {
            Self::Total16 => (0, 0, 16),
            Self::Total14 => (0, 0, 14),
            Self::NineSeven => (9, 7, 0),
            Self::SevenNine => (7, 9, 0),
        }
    }

    /// Individual presets favour the ability that still needs the higher count.
    #[must_use]
    pub const fn preferred_action(self) -> Option<Action> {
        match self {
            Self::Total16 | Self::Total14 => None,
            Self::NineSeven => Some(Action::First),
            Self::SevenNine => Some(Action::Second),
        }
    }
}

impl fmt::Display for StonePreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for StonePreset {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        match wanted.as_str() {
            "97" | "9/7" => return Ok(Self::Total16),
            "77" | "7/7" => return Ok(Self::Total14),
            _ => {}
        }
        Self::ALL
            .into_iter()
            .find(|preset| preset.label() == wanted)
            .ok_or_else(|| ConfigError::UnknownPreset(s.to_string()))
    }
}

/// Configuration surface consumed by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacetConfig {
    #[serde(default = "FacetConfig::default_attempts_budget")]
    pub attempts_budget: u8,
    #[serde(default)]
    pub goal1: u8,
    #[serde(default)]
    pub goal2: u8,
    #[serde(default = "FacetConfig::default_total")]
    pub total: u8,
    #[serde(default = "FacetConfig::default_goal3")]
    pub goal3: u8,
    #[serde(default = "FacetConfig::default_preferred_action")]
    pub preferred_action: u8,
    #[serde(default = "FacetConfig::default_use_cache")]
    pub use_cache: bool,
    #[serde(default = "FacetConfig::default_cache_dir")]
    pub cache_dir: PathBuf,
}

impl FacetConfig {
    const fn default_attempts_budget() -> u8 {
        DEFAULT_ATTEMPTS_BUDGET
    }

    const fn default_total() -> u8 {
        DEFAULT_TOTAL_GOAL
    }

    const fn default_goal3() -> u8 {
        DEFAULT_FAILURE_BUDGET
    }

    const fn default_preferred_action() -> u8 {
        1
    }

    const fn default_use_cache() -> bool {
        true
    }

    fn default_cache_dir() -> PathBuf {
        PathBuf::from(DEFAULT_CACHE_DIR)
    }

    /// Parse a JSON configuration, filling omitted fields with defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed JSON, or the first
    /// validation failure of the parsed values.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(json).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Replace the goals (and, for individual presets, the preference) with a preset.
    #[must_use]
    pub fn with_preset(mut self, preset: StonePreset) -> Self {
        let (goal1, goal2, total) = preset.goals();
        self.goal1 = goal1;
        self.goal2 = goal2;
        self.total = total;
        if let Some(action) = preset.preferred_action() {
            self.preferred_action = action.kind();
        }
        self
    }

    /// Check every field against the engine's limits.
    ///
    /// # Errors
    ///
    /// Returns the first violated limit.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.attempts_budget == 0 || self.attempts_budget > MAX_ATTEMPTS_BUDGET {
            return Err(ConfigError::AttemptsBudget {
                max: MAX_ATTEMPTS_BUDGET,
                value: self.attempts_budget,
            });
        }
        for (field, value) in [("goal1", self.goal1), ("goal2", self.goal2)] {
            if value > self.attempts_budget {
                return Err(ConfigError::GoalAboveBudget {
                    field,
                    budget: self.attempts_budget,
                    value,
                });
            }
        }
        let reach = u16::from(self.attempts_budget) * 2;
        if u16::from(self.total) > reach {
            return Err(ConfigError::TotalAboveReach {
                max: reach,
                value: self.total,
            });
        }
        if self.goal3 > MAX_ATTEMPTS_BUDGET {
            return Err(ConfigError::FailureBudget {
                max: MAX_ATTEMPTS_BUDGET,
                value: self.goal3,
            });
        }
        if Action::from_kind(self.preferred_action).is_none() {
            return Err(ConfigError::PreferredAction(self.preferred_action));
        }
        Ok(())
    }

    #[must_use]
    pub const fn problem(&self) -> ProblemParams {
        ProblemParams::new(
            self.attempts_budget,
            self.goal1,
            self.goal2,
            self.total,
            self.goal3,
        )
    }

    /// Preferred action kind, falling back to ability 1 for invalid values.
    #[must_use]
    pub fn preferred(&self) -> Action {
        Action::from_kind(self.preferred_action).unwrap_or(Action::First)
    }
}

impl Default for FacetConfig {
    fn default() -> Self {
        Self {
            attempts_budget: Self::default_attempts_budget(),
            goal1: 0,
            goal2: 0,
            total: Self::default_total(),
            goal3: Self::default_goal3(),
            preferred_action: Self::default_preferred_action(),
            use_cache: Self::default_use_cache(),
            cache_dir: Self::default_cache_dir(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_describe_a_nine_seven_relic() {
        let config = FacetConfig::default();
        assert!(config.validate().is_ok());
        let params = config.problem();
        assert!(params.is_total_mode());
        assert_eq!(params.cache_stem(), "dp_10_0_0_16_4");
    }

    #[test]
    fn partial_json_uses_defaults() {
        let config = FacetConfig::from_json(r#"{"goal3": 10, "use_cache": false}"#).unwrap();
        assert_eq!(config.goal3, 10);
        assert_eq!(config.attempts_budget, DEFAULT_ATTEMPTS_BUDGET);
        assert!(!config.use_cache);
        assert_eq!(config.cache_dir, PathBuf::from(DEFAULT_CACHE_DIR));
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        let err = FacetConfig::from_json("{not json").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn validation_rejects_out_of_range_values() {
        let mut config = FacetConfig {
            attempts_budget: 0,
            ..FacetConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::AttemptsBudget { .. })
        ));

        config.attempts_budget = 10;
        config.goal1 = 11;
        assert_eq!(
            config.validate(),
            Err(ConfigError::GoalAboveBudget {
                field: "goal1",
                budget: 10,
                value: 11
            })
        );

        config.goal1 = 0;
        config.total = 21;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::TotalAboveReach { max: 20, .. })
        ));

        config.total = 16;
        config.preferred_action = 4;
        assert_eq!(config.validate(), Err(ConfigError::PreferredAction(4)));
    }

    #[test]
    fn presets_switch_modes() {
        let config = FacetConfig::default().with_preset(StonePreset::SevenNine);
        assert!(!config.problem().is_total_mode());
        assert_eq!((config.goal1, config.goal2), (7, 9));
        assert_eq!(config.preferred(), Action::Second);

        let config = config.with_preset(StonePreset::Total14);
        assert!(config.problem().is_total_mode());
        assert_eq!(config.total, 14);
    }

    #[test]
    fn presets_parse_from_labels_and_shorthand() {
        assert_eq!("total16".parse::<StonePreset>(), Ok(StonePreset::Total16));
        assert_eq!("9/7".parse::<StonePreset>(), Ok(StonePreset::Total16));
        assert_eq!("Seven-Nine".parse::<StonePreset>(), Ok(StonePreset::SevenNine));
        assert!(matches!(
            "8/8".parse::<StonePreset>(),
            Err(ConfigError::UnknownPreset(_))
        ));
    }
}
