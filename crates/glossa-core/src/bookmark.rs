//! Bookmark - a learner's saved origin → translation pair with its context
//!
//! `starred` is user-controlled. `fit_for_study`, `learned` and
//! `learned_time` are derived by the lifecycle and only ever written
//! together with the exercise that caused them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A bookmark as stored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bookmark {
    pub id: i64,
    /// Owner
    pub user_id: i64,
    /// Word or phrase as found in the text
    pub origin: String,
    pub origin_lang: String,
    pub translation: String,
    pub translation_lang: String,
    /// Sentence the origin was found in
    pub context: String,
    pub created_at: DateTime<Utc>,
    pub starred: bool,
    pub fit_for_study: bool,
    pub learned: bool,
    pub learned_time: Option<DateTime<Utc>>,
    /// Log position mastery counts from. Exercises before it were answered
    /// before the last unlearn.
    #[serde(default)]
    pub mastery_baseline: usize,
    /// Bumped on every committed mutation (compare-and-set token)
    pub version: i64,
}

impl Bookmark {
    /// Length of the context in characters (not bytes)
    pub fn context_chars(&self) -> usize {
        self.context.chars().count()
    }

    /// `learned` implies not fit for study and a learned time
    pub fn invariants_hold(&self) -> bool {
        !self.learned || (!self.fit_for_study && self.learned_time.is_some())
    }
}

/// Input for creating (or re-deriving) a bookmark
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookmarkInput {
    pub user_id: i64,
    pub origin: String,
    pub origin_lang: String,
    pub translation: String,
    pub translation_lang: String,
    pub context: String,
}

/// Whether an upsert inserted a new row or found the existing one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpsertOutcome {
    Created,
    Fetched,
}

/// Bookmark returned from an upsert, with how it was obtained
#[derive(Debug, Clone, PartialEq)]
pub struct Upserted {
    pub bookmark: Bookmark,
    pub outcome: UpsertOutcome,
}

/// Serializable bookmark summary for display surfaces
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookmarkView {
    pub id: i64,
    pub from: String,
    pub to: String,
    pub from_lang: String,
    pub to_lang: String,
    pub context: String,
    pub starred: bool,
    pub fit_for_study: bool,
    /// `YYYY-MM-DD` when learned, empty otherwise
    pub learned_datetime: String,
    /// Corpus frequency rank of the origin, when known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin_rank: Option<u32>,
    /// "today" for bookmarks created today, empty otherwise
    pub created_day: String,
    pub time: DateTime<Utc>,
    /// Scheduler phase, absent for never-exercised bookmarks
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phase: Option<String>,
    pub exercise_count: usize,
}

impl BookmarkView {
    pub fn new(
        bookmark: &Bookmark,
        origin_rank: Option<u32>,
        phase: Option<String>,
        exercise_count: usize,
        now: DateTime<Utc>,
    ) -> Self {
        let learned_datetime = match (bookmark.learned, bookmark.learned_time) {
            (true, Some(at)) => at.format("%Y-%m-%d").to_string(),
            _ => String::new(),
        };
        let created_day = if bookmark.created_at.date_naive() == now.date_naive() {
            "today".to_string()
        } else {
            String::new()
        };

        Self {
            id: bookmark.id,
            from: bookmark.origin.clone(),
            to: bookmark.translation.clone(),
            from_lang: bookmark.origin_lang.clone(),
            to_lang: bookmark.translation_lang.clone(),
            context: bookmark.context.clone(),
            starred: bookmark.starred,
            fit_for_study: bookmark.fit_for_study,
            learned_datetime,
            origin_rank,
            created_day,
            time: bookmark.created_at,
            phase,
            exercise_count,
        }
    }
}
