//! Exercise Log
//!
//! Ordered projection of one bookmark's exercises. Order is insertion
//! order; entries are never edited or removed. Everything else in the
//! lifecycle (streaks, mastery, diagnostics) is derived from this view.

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use uuid::Uuid;

use super::{Exercise, ExerciseOutcome, ExerciseSource};

/// Append-only log of a single bookmark's exercises
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExerciseLog {
    bookmark_id: i64,
    entries: Vec<Exercise>,
}

impl ExerciseLog {
    /// Empty log for a bookmark
    pub fn new(bookmark_id: i64) -> Self {
        Self {
            bookmark_id,
            entries: Vec::new(),
        }
    }

    /// Rebuild a log from stored exercises, already in insertion order
    pub fn from_exercises(bookmark_id: i64, entries: Vec<Exercise>) -> Self {
        Self {
            bookmark_id,
            entries,
        }
    }

    /// Bookmark this log belongs to
    pub fn bookmark_id(&self) -> i64 {
        self.bookmark_id
    }

    /// Record a new attempt with a freshly generated id
    pub fn append(
        &mut self,
        outcome: ExerciseOutcome,
        source: ExerciseSource,
        solving_speed_ms: u64,
        time: DateTime<Utc>,
    ) -> Exercise {
        self.append_with_id(
            Uuid::new_v4().to_string(),
            outcome,
            source,
            solving_speed_ms,
            time,
        )
    }

    /// Record a new attempt under a caller-chosen id.
    ///
    /// Timestamps never run backwards inside a log: a time earlier than the
    /// last entry is clamped to it.
    pub fn append_with_id(
        &mut self,
        id: String,
        outcome: ExerciseOutcome,
        source: ExerciseSource,
        solving_speed_ms: u64,
        time: DateTime<Utc>,
    ) -> Exercise {
        let time = match self.last_exercise_time() {
            Some(last) if time < last => last,
            _ => time,
        };

        let exercise = Exercise {
            id,
            bookmark_id: self.bookmark_id,
            outcome,
            source,
            solving_speed_ms,
            time,
        };
        self.entries.push(exercise.clone());
        exercise
    }

    /// Number of trailing `Correct` outcomes, walking back from the newest
    pub fn consecutive_correct_tail(&self) -> usize {
        self.entries
            .iter()
            .rev()
            .take_while(|e| e.outcome.is_correct())
            .count()
    }

    /// Trailing run of `Correct` and `TooEasy` outcomes, counting only
    /// entries at position `start` or later
    pub fn success_tail_since(&self, start: usize) -> usize {
        self.entries
            .get(start..)
            .unwrap_or_default()
            .iter()
            .rev()
            .take_while(|e| {
                matches!(e.outcome, ExerciseOutcome::Correct | ExerciseOutcome::TooEasy)
            })
            .count()
    }

    /// Time of the most recent exercise
    pub fn last_exercise_time(&self) -> Option<DateTime<Utc>> {
        self.entries.last().map(|e| e.time)
    }

    /// Most recent exercise
    pub fn last(&self) -> Option<&Exercise> {
        self.entries.last()
    }

    /// The recorded exercise with this id, if any
    pub fn find(&self, exercise_id: &str) -> Option<&Exercise> {
        self.entries.iter().find(|e| e.id == exercise_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Exercise> {
        self.entries.iter()
    }

    /// Count of each outcome kind present in the log
    pub fn outcome_counts(&self) -> BTreeMap<ExerciseOutcome, usize> {
        let mut counts = BTreeMap::new();
        for entry in &self.entries {
            *counts.entry(entry.outcome).or_insert(0) += 1;
        }
        counts
    }

    /// Human-readable per-outcome counts, for operator diagnostics only
    pub fn summary(&self) -> String {
        if self.entries.is_empty() {
            return "no exercises".to_string();
        }

        let parts: Vec<String> = self
            .outcome_counts()
            .into_iter()
            .map(|(outcome, count)| format!("{}: {}", outcome.display_name(), count))
            .collect();

        format!(
            "{} ({} total, streak {})",
            parts.join(", "),
            self.entries.len(),
            self.consecutive_correct_tail()
        )
    }
}

// ============================================================================
// TESTS
// ============================================================================
