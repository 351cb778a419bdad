//! Exercise module - immutable attempt records and the per-bookmark log
//!
//! - `Exercise`: one attempt, never updated after creation
//! - `ExerciseLog`: insertion-ordered, append-only view over a bookmark's attempts
//! - Outcome / source vocabularies

mod log;
mod vocabulary;

pub use log::ExerciseLog;
pub use vocabulary::{ExerciseOutcome, ExerciseSource};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One recorded attempt at a bookmark
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Exercise {
    /// Unique identifier (UUID v4 unless the client supplied its own key)
    pub id: String,
    /// Owning bookmark
    pub bookmark_id: i64,
    /// What happened
    pub outcome: ExerciseOutcome,
    /// Which exercise modality produced it
    pub source: ExerciseSource,
    /// Time to solve in milliseconds
    pub solving_speed_ms: u64,
    /// When the attempt was recorded
    pub time: DateTime<Utc>,
}

/// Turn a raw client-reported solving speed into milliseconds.
///
/// Anything that is not a plain run of ASCII digits (negative numbers,
/// decimals, "NaN", empty strings, overflow) becomes 0.
pub fn coerce_solving_speed(raw: &str) -> u64 {
    let raw = raw.trim();
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return 0;
    }
    raw.parse().unwrap_or(0)
}
