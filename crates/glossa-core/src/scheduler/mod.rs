//! Review Scheduler Module
//!
//! Decides *when* a bookmark should resurface, independently of whether it
//! is learned. The scheduler owns `ScheduleState`; nothing else writes it.
//!
//! ## Phases
//! - `new`: never exercised
//! - `warming-up`: missed recently, back on the shortest interval
//! - `scheduled`: climbing the interval tiers
//! - `graduated`: streak reached the mastery threshold

mod basic_sr;

pub use basic_sr::BasicSR;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::exercise::Exercise;

// ============================================================================
// PHASE
// ============================================================================

/// State-machine state of one bookmark
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum Phase {
    #[default]
    New,
    WarmingUp,
    Scheduled,
    Graduated,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::New => "new",
            Phase::WarmingUp => "warming-up",
            Phase::Scheduled => "scheduled",
            Phase::Graduated => "graduated",
        }
    }

    /// Parse from string name
    pub fn parse_name(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "new" => Some(Phase::New),
            "warming-up" | "warming_up" => Some(Phase::WarmingUp),
            "scheduled" => Some(Phase::Scheduled),
            "graduated" => Some(Phase::Graduated),
            _ => None,
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// SCHEDULE STATE
// ============================================================================

/// Scheduler-maintained fields of one bookmark
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleState {
    pub bookmark_id: i64,
    pub phase: Phase,
    /// Consecutive `Correct` outcomes as seen by the scheduler
    pub streak: u32,
    /// Index into the configured interval tiers
    pub tier: usize,
    /// Cooldown marker: not due before this time
    pub next_due: DateTime<Utc>,
    /// Last exercise applied (at-most-once key)
    pub last_exercise_id: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl ScheduleState {
    /// Fresh state for a never-exercised bookmark
    pub fn new(bookmark_id: i64, now: DateTime<Utc>) -> Self {
        Self {
            bookmark_id,
            phase: Phase::New,
            streak: 0,
            tier: 0,
            next_due: now,
            last_exercise_id: None,
            updated_at: now,
        }
    }

    /// Back to the shortest interval, keeping the idempotency key
    pub fn restart(&mut self, now: DateTime<Utc>) {
        self.phase = Phase::WarmingUp;
        self.streak = 0;
        self.tier = 0;
        self.next_due = now;
        self.updated_at = now;
    }

    pub(crate) fn due_after(now: DateTime<Utc>, minutes: u32) -> DateTime<Utc> {
        now + Duration::minutes(i64::from(minutes))
    }
}

/// Result of applying one exercise
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduleUpdate {
    pub state: ScheduleState,
    /// False when the exercise had already been applied
    pub applied: bool,
}

/// Interval policy seam
pub trait ReviewScheduler: Send + Sync {
    /// Apply one exercise to a bookmark's state.
    ///
    /// A missing state is created in `Phase::New` first. Applying the same
    /// exercise id twice returns the state unchanged with `applied = false`.
    fn update(&self, state: Option<ScheduleState>, exercise: &Exercise) -> ScheduleUpdate;
}
