//! Study configuration
//!
//! Every tunable of the lifecycle lives here so the policies can be
//! adjusted without touching the state machine. Defaults reproduce the
//! production policy; JSON files and `GLOSSA_*` environment variables can
//! override them.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{StudyError, StudyResult};

/// Consecutive `Correct` outcomes after which a bookmark counts as learned
pub const CORRECTS_IN_A_ROW_FOR_LEARNED: u32 = 4;

/// Contexts at or above this many characters make poor flashcards
pub const DEFAULT_MAX_CONTEXT_CHARS: usize = 60;

const MINUTES_PER_DAY: u32 = 24 * 60;

// ============================================================================
// POLICIES
// ============================================================================

/// When a bookmark counts as learned
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MasteryPolicy {
    /// Trailing `Correct` run needed
    pub corrects_in_a_row: u32,
    /// A trailing `TooEasy` marks the bookmark learned on its own
    pub too_easy_is_learned: bool,
}

impl Default for MasteryPolicy {
    fn default() -> Self {
        Self {
            corrects_in_a_row: CORRECTS_IN_A_ROW_FOR_LEARNED,
            too_easy_is_learned: true,
        }
    }
}

/// Default fitness heuristics for unstarred bookmarks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FitnessPolicy {
    /// Context must be strictly shorter than this (in chars)
    pub max_context_chars: usize,
    /// Longer origin phrases are not studied by default
    pub max_origin_words: usize,
    /// Words ranked rarer than this are skipped; `None` disables the check
    pub max_origin_rank: Option<u32>,
}

impl Default for FitnessPolicy {
    fn default() -> Self {
        Self {
            max_context_chars: DEFAULT_MAX_CONTEXT_CHARS,
            max_origin_words: 3,
            max_origin_rank: Some(50_000),
        }
    }
}

/// Interval tiers and shortcut rules of the review scheduler
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// Minutes until the bookmark is due again, per tier. Strictly increasing.
    pub interval_tiers_minutes: Vec<u32>,
    /// `TooEasy` jumps straight to graduated
    pub too_easy_graduates: bool,
    /// Tiers skipped by `TooEasy` when it does not graduate
    pub too_easy_tier_skip: usize,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            interval_tiers_minutes: vec![
                0,
                MINUTES_PER_DAY,
                2 * MINUTES_PER_DAY,
                4 * MINUTES_PER_DAY,
                8 * MINUTES_PER_DAY,
            ],
            too_easy_graduates: true,
            too_easy_tier_skip: 2,
        }
    }
}

impl ScheduleConfig {
    /// Highest tier index
    pub fn top_tier(&self) -> usize {
        self.interval_tiers_minutes.len().saturating_sub(1)
    }

    /// Interval for a tier, clamped to the top tier
    pub fn interval_minutes(&self, tier: usize) -> u32 {
        let tier = tier.min(self.top_tier());
        self.interval_tiers_minutes.get(tier).copied().unwrap_or(0)
    }
}

// ============================================================================
// STUDY CONFIG
// ============================================================================

/// Complete configuration of the study core
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StudyConfig {
    pub mastery: MasteryPolicy,
    pub fitness: FitnessPolicy,
    pub schedule: ScheduleConfig,
    /// Longest wait for a bookmark lock before reporting a conflict
    pub lock_timeout_ms: u64,
    /// Pause before the single internal retry after a conflict
    pub conflict_backoff_ms: u64,
}

impl Default for StudyConfig {
    fn default() -> Self {
        Self {
            mastery: MasteryPolicy::default(),
            fitness: FitnessPolicy::default(),
            schedule: ScheduleConfig::default(),
            lock_timeout_ms: 2000,
            conflict_backoff_ms: 50,
        }
    }
}

impl StudyConfig {
    /// Load from a JSON file; missing keys keep their defaults
    pub fn from_json_file(path: &Path) -> StudyResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            StudyError::InvalidInput(format!("Cannot read config {}: {}", path.display(), e))
        })?;
        let config: StudyConfig = serde_json::from_str(&raw)
            .map_err(|e| StudyError::InvalidInput(format!("Invalid config JSON: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `GLOSSA_*` environment overrides on top of `self`
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(v) = env_parse("GLOSSA_CORRECTS_IN_A_ROW") {
            self.mastery.corrects_in_a_row = v;
        }
        if let Some(v) = env_parse("GLOSSA_MAX_CONTEXT_CHARS") {
            self.fitness.max_context_chars = v;
        }
        if let Some(v) = env_parse("GLOSSA_MAX_ORIGIN_WORDS") {
            self.fitness.max_origin_words = v;
        }
        if let Some(v) = env_parse::<u32>("GLOSSA_MAX_ORIGIN_RANK") {
            self.fitness.max_origin_rank = if v == 0 { None } else { Some(v) };
        }
        if let Some(v) = env_parse("GLOSSA_LOCK_TIMEOUT_MS") {
            self.lock_timeout_ms = v;
        }
        if let Some(v) = env_parse("GLOSSA_CONFLICT_BACKOFF_MS") {
            self.conflict_backoff_ms = v;
        }
        if let Ok(raw) = std::env::var("GLOSSA_INTERVAL_TIERS_MINUTES") {
            let tiers: Option<Vec<u32>> =
                raw.split(',').map(|t| t.trim().parse().ok()).collect();
            match tiers {
                Some(tiers) => self.schedule.interval_tiers_minutes = tiers,
                None => tracing::warn!(%raw, "Ignoring malformed GLOSSA_INTERVAL_TIERS_MINUTES"),
            }
        }
        self
    }

    /// Reject configurations the state machine cannot run with
    pub fn validate(&self) -> StudyResult<()> {
        if self.mastery.corrects_in_a_row == 0 {
            return Err(StudyError::InvalidInput(
                "mastery.corrects_in_a_row must be at least 1".to_string(),
            ));
        }
        let tiers = &self.schedule.interval_tiers_minutes;
        if tiers.is_empty() {
            return Err(StudyError::InvalidInput(
                "schedule.interval_tiers_minutes must not be empty".to_string(),
            ));
        }
        if tiers.windows(2).any(|w| w[0] >= w[1]) {
            return Err(StudyError::InvalidInput(format!(
                "schedule.interval_tiers_minutes must be strictly increasing: {:?}",
                tiers
            )));
        }
        if self.fitness.max_context_chars == 0 {
            return Err(StudyError::InvalidInput(
                "fitness.max_context_chars must be positive".to_string(),
            ));
        }
        // A learned bookmark must also be graduated, and the other way round
        if self.mastery.too_easy_is_learned != self.schedule.too_easy_graduates {
            return Err(StudyError::InvalidInput(
                "mastery.too_easy_is_learned and schedule.too_easy_graduates must agree".to_string(),
            ));
        }
        Ok(())
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.trim().parse().ok())
}
