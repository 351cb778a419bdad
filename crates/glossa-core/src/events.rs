//! Lifecycle events
//!
//! The evaluators do not log. They describe what they decided as a
//! `LifecycleEvent` and hand it to whatever `EventSink` the caller injected:
//! `TracingSink` in production, `RecordingSink` in tests.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Mutex;

/// Something the lifecycle decided or noticed
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LifecycleEvent {
    /// A pipeline stage finished for a bookmark
    StageCompleted { bookmark_id: i64, stage: &'static str },
    /// Mastery threshold reached
    MasteryReached {
        bookmark_id: i64,
        learned_at: DateTime<Utc>,
        summary: String,
    },
    /// Log evaluated, bookmark not learned yet
    StillLearning { bookmark_id: i64, summary: String },
    /// Eligibility recomputed
    FitnessEvaluated {
        bookmark_id: i64,
        fit_for_study: bool,
        reason: &'static str,
    },
    /// Word statistics provider failed; fitness fell back to passing
    StatisticsUnavailable {
        bookmark_id: i64,
        term: String,
        error: String,
    },
    /// An exercise id that was already applied arrived again
    DuplicateExercise { bookmark_id: i64, exercise_id: String },
    /// Concurrent update detected, will retry once
    ConflictRetry { bookmark_id: i64, attempt: u32 },
    /// Bookmark explicitly returned to the learning pool
    Unlearned { bookmark_id: i64 },
}

impl LifecycleEvent {
    /// Bookmark the event is about
    pub fn bookmark_id(&self) -> i64 {
        match self {
            LifecycleEvent::StageCompleted { bookmark_id, .. }
            | LifecycleEvent::MasteryReached { bookmark_id, .. }
            | LifecycleEvent::StillLearning { bookmark_id, .. }
            | LifecycleEvent::FitnessEvaluated { bookmark_id, .. }
            | LifecycleEvent::StatisticsUnavailable { bookmark_id, .. }
            | LifecycleEvent::DuplicateExercise { bookmark_id, .. }
            | LifecycleEvent::ConflictRetry { bookmark_id, .. }
            | LifecycleEvent::Unlearned { bookmark_id } => *bookmark_id,
        }
    }
}

/// Receiver for lifecycle events
pub trait EventSink: Send + Sync {
    fn emit(&self, event: LifecycleEvent);
}

// ============================================================================
// SINKS
// ============================================================================

/// Forwards events to `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: LifecycleEvent) {
        match event {
            LifecycleEvent::StageCompleted { bookmark_id, stage } => {
                tracing::trace!(bookmark_id, stage, "Lifecycle stage completed");
            }
            LifecycleEvent::MasteryReached {
                bookmark_id,
                learned_at,
                summary,
            } => {
                tracing::info!(bookmark_id, %learned_at, %summary, "Bookmark learned");
            }
            LifecycleEvent::StillLearning {
                bookmark_id,
                summary,
            } => {
                tracing::debug!(bookmark_id, %summary, "Bookmark not learned yet");
            }
            LifecycleEvent::FitnessEvaluated {
                bookmark_id,
                fit_for_study,
                reason,
            } => {
                tracing::debug!(bookmark_id, fit_for_study, reason, "Fitness evaluated");
            }
            LifecycleEvent::StatisticsUnavailable {
                bookmark_id,
                term,
                error,
            } => {
                tracing::warn!(
                    bookmark_id,
                    %term,
                    %error,
                    "Word statistics unavailable, treating word as fit"
                );
            }
            LifecycleEvent::DuplicateExercise {
                bookmark_id,
                exercise_id,
            } => {
                tracing::info!(bookmark_id, %exercise_id, "Ignoring duplicate exercise report");
            }
            LifecycleEvent::ConflictRetry {
                bookmark_id,
                attempt,
            } => {
                tracing::warn!(bookmark_id, attempt, "Concurrent update on bookmark, retrying");
            }
            LifecycleEvent::Unlearned { bookmark_id } => {
                tracing::info!(bookmark_id, "Bookmark returned to learning");
            }
        }
    }
}

/// Drops every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _event: LifecycleEvent) {}
}

/// Keeps every event in memory, for assertions
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<LifecycleEvent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything recorded so far
    pub fn events(&self) -> Vec<LifecycleEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    /// Names of completed pipeline stages, in order
    pub fn stages(&self) -> Vec<&'static str> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                LifecycleEvent::StageCompleted { stage, .. } => Some(stage),
                _ => None,
            })
            .collect()
    }

    pub fn clear(&self) {
        if let Ok(mut events) = self.events.lock() {
            events.clear();
        }
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: LifecycleEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}
