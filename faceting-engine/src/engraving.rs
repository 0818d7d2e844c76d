//! Stone screening from detected engravings.
//!
//! The detector lives outside the engine and reports engraving names with
//! match scores in top-to-bottom screen order. This module picks the lines
//! that count, decides whether the stone is worth faceting and turns the
//! pick into the preferred action and failure budget of a [`FacetConfig`].

use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::config::{ConfigError, FacetConfig};
use crate::constants::{
    DEFAULT_ENGRAVING_PRIORITIES, DEFAULT_NEGATIVE_CAPS, DEFAULT_POSSIBLE_ENGRAVINGS,
    MAX_ATTEMPTS_BUDGET, NEGATIVE_LINES, POSITIVE_LINES,
};
use crate::state::Action;

/// One engraving reported by the detector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub name: String,
    /// Template match score; higher is more certain.
    pub score: f64,
}

impl Detection {
    #[must_use]
    pub fn new(name: impl Into<String>, score: f64) -> Self {
        Self {
            name: name.into(),
            score,
        }
    }
}

/// A detection that made the selection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectedEngraving {
    pub name: String,
    pub score: f64,
    /// Ability line of a positive engraving, by screen order.
    pub line: Option<Action>,
    pub whitelisted: bool,
    /// Cap of a negative engraving, when one above zero is configured.
    pub cap: Option<u8>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EngravingSelection {
    /// Selected positives in priority order.
    pub prioritized: Vec<SelectedEngraving>,
    /// Selected negatives with a usable cap, tightest cap first.
    pub negatives: Vec<SelectedEngraving>,
    /// Every selected positive and negative, positives first.
    pub selected: Vec<SelectedEngraving>,
}

impl EngravingSelection {
    /// Line of the most wanted positive.
    ///
    /// Falls back to the first whitelisted positive when none is prioritized,
    /// which only happens for single-engraving whitelists.
    #[must_use]
    pub fn preferred_line(&self) -> Option<Action> {
        self.prioritized
            .first()
            .and_then(|engraving| engraving.line)
            .or_else(|| {
                self.selected
                    .iter()
                    .find(|engraving| engraving.whitelisted && engraving.line.is_some())
                    .and_then(|engraving| engraving.line)
            })
    }

    /// Failure budget implied by the negatives.
    #[must_use]
    pub fn negative_cap(&self) -> Option<u8> {
        self.negatives.first().and_then(|engraving| engraving.cap)
    }
}

/// Which stones to facet and how, based on their engravings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngravingPolicy {
    /// Positive engravings in descending order of importance.
    #[serde(default = "EngravingPolicy::default_priorities")]
    pub priorities: Vec<String>,
    /// Positives a stone may carry; any other selected positive skips it.
    #[serde(default = "EngravingPolicy::default_possible_engravings")]
    pub possible_engravings: Vec<String>,
    /// Negative engravings and the failure budget each allows.
    #[serde(default = "EngravingPolicy::default_negative_caps")]
    pub negative_caps: BTreeMap<String, u8>,
    #[serde(default = "EngravingPolicy::default_max_positive")]
    pub max_positive: usize,
    #[serde(default = "EngravingPolicy::default_max_negative")]
    pub max_negative: usize,
}

impl EngravingPolicy {
    fn default_priorities() -> Vec<String> {
        DEFAULT_ENGRAVING_PRIORITIES.map(String::from).to_vec()
    }

    fn default_possible_engravings() -> Vec<String> {
        DEFAULT_POSSIBLE_ENGRAVINGS.map(String::from).to_vec()
    }

    fn default_negative_caps() -> BTreeMap<String, u8> {
        DEFAULT_NEGATIVE_CAPS
            .into_iter()
            .map(|(name, cap)| (name.to_string(), cap))
            .collect()
    }

    const fn default_max_positive() -> usize {
        POSITIVE_LINES
    }

    const fn default_max_negative() -> usize {
        NEGATIVE_LINES
    }

    /// Parse a JSON policy, filling omitted fields with defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed JSON, or the first
    /// validation failure of the parsed values.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let policy: Self =
            serde_json::from_str(json).map_err(|err| ConfigError::Parse(err.to_string()))?;
        policy.validate()?;
        Ok(policy)
    }

    /// Check line counts and caps against what a stone can hold.
    ///
    /// # Errors
    ///
    /// Returns the first violated limit.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value, min, max) in [
            ("max_positive", self.max_positive, 1, POSITIVE_LINES),
            ("max_negative", self.max_negative, 0, NEGATIVE_LINES),
        ] {
            if !(min..=max).contains(&value) {
                return Err(ConfigError::EngravingLines {
                    field,
                    min,
                    max,
                    value,
                });
            }
        }
        if let Some((name, cap)) = self
            .negative_caps
            .iter()
            .find(|(_, cap)| **cap > MAX_ATTEMPTS_BUDGET)
        {
            return Err(ConfigError::NegativeCap {
                name: name.clone(),
                max: MAX_ATTEMPTS_BUDGET,
                value: *cap,
            });
        }
        Ok(())
    }

    fn is_whitelisted(&self, name: &str) -> bool {
        self.possible_engravings.iter().any(|possible| possible == name)
    }

    /// Pick the strongest positives and negatives and rank the positives.
    #[must_use]
    pub fn select(&self, detections: &[Detection]) -> EngravingSelection {
        let (negatives, positives): (Vec<&Detection>, Vec<&Detection>) = detections
            .iter()
            .partition(|detection| self.negative_caps.contains_key(&detection.name));

        let positives: Vec<SelectedEngraving> = strongest(positives, self.max_positive)
            .into_iter()
            .zip(Action::ALL)
            .map(|(detection, line)| SelectedEngraving {
                name: detection.name.clone(),
                score: detection.score,
                line: Some(line),
                whitelisted: self.is_whitelisted(&detection.name),
                cap: None,
            })
            .collect();
        let negatives: Vec<SelectedEngraving> = strongest(negatives, self.max_negative)
            .into_iter()
            .map(|detection| SelectedEngraving {
                name: detection.name.clone(),
                score: detection.score,
                line: None,
                whitelisted: self.is_whitelisted(&detection.name),
                cap: self
                    .negative_caps
                    .get(&detection.name)
                    .copied()
                    .filter(|cap| *cap > 0),
            })
            .collect();

        let mut prioritized = Vec::new();
        for wanted in &self.priorities {
            if prioritized.len() >= self.max_positive {
                break;
            }
            if let Some(found) = positives.iter().find(|engraving| &engraving.name == wanted) {
                prioritized.push(found.clone());
            }
        }

        let mut capped: Vec<SelectedEngraving> = Vec::new();
        for engraving in negatives.iter().filter(|engraving| engraving.cap.is_some()) {
            if !capped.iter().any(|kept| kept.name == engraving.name) {
                capped.push(engraving.clone());
            }
        }
        capped.sort_by(|lhs, rhs| lhs.cap.cmp(&rhs.cap).then_with(|| lhs.name.cmp(&rhs.name)));

        EngravingSelection {
            prioritized,
            negatives: capped,
            selected: positives.into_iter().chain(negatives).collect(),
        }
    }

    /// Whether a stone with this selection is worth faceting.
    #[must_use]
    pub fn should_cut(&self, selection: &EngravingSelection) -> bool {
        if let [single] = self.possible_engravings.as_slice()
            && selection.selected.iter().any(|engraving| &engraving.name == single)
        {
            return true;
        }
        if selection.prioritized.len() != self.max_positive
            || selection.negatives.len() != self.max_negative
        {
            return false;
        }
        selection
            .selected
            .iter()
            .all(|engraving| engraving.whitelisted || engraving.cap.is_some())
    }

    /// Configuration for faceting a stone, or `None` when it should be skipped.
    ///
    /// The top priority's line becomes the preferred action and the
    /// tightest negative cap becomes the failure budget; everything else is
    /// taken from `base`.
    #[must_use]
    pub fn plan(&self, base: &FacetConfig, detections: &[Detection]) -> Option<FacetConfig> {
        let selection = self.select(detections);
        if !self.should_cut(&selection) {
            debug!(
                "Skipping stone: {} prioritized, {} capped negatives",
                selection.prioritized.len(),
                selection.negatives.len()
            );
            return None;
        }
        let mut config = base.clone();
        if let Some(line) = selection.preferred_line() {
            config.preferred_action = line.kind();
        }
        if let Some(cap) = selection.negative_cap() {
            config.goal3 = cap;
        }
        Some(config)
    }
}

impl Default for EngravingPolicy {
    fn default() -> Self {
        Self {
            priorities: Self::default_priorities(),
            possible_engravings: Self::default_possible_engravings(),
            negative_caps: Self::default_negative_caps(),
            max_positive: Self::default_max_positive(),
            max_negative: Self::default_max_negative(),
        }
    }
}

/// The `keep` highest-scoring detections, returned in screen order.
fn strongest(candidates: Vec<&Detection>, keep: usize) -> Vec<&Detection> {
    let mut ranked: Vec<(usize, &Detection)> = candidates.into_iter().enumerate().collect();
    ranked.sort_by(|lhs, rhs| rhs.1.score.total_cmp(&lhs.1.score));
    ranked.truncate(keep);
    ranked.sort_by_key(|(order, _)| *order);
    ranked.into_iter().map(|(_, detection)| detection).collect()
}
