//! Study Set Selector
//!
//! Ranks a user's eligible bookmarks for a study session:
//!
//! 1. starred first
//! 2. lowest interval tier (most due) first
//! 3. least recently practiced first, never-practiced before everything
//! 4. bookmark id, so equal inputs always give equal output

use chrono::{DateTime, Utc};

use crate::bookmark::Bookmark;
use crate::scheduler::ScheduleState;

/// One eligible bookmark with what the ranking needs
#[derive(Debug, Clone, PartialEq)]
pub struct StudyCandidate {
    pub bookmark: Bookmark,
    pub schedule: Option<ScheduleState>,
    pub last_exercise_time: Option<DateTime<Utc>>,
}

impl StudyCandidate {
    /// Tier used for ranking; never-scheduled bookmarks count as tier 0
    pub fn tier(&self) -> usize {
        self.schedule.as_ref().map(|s| s.tier).unwrap_or(0)
    }

    fn rank_key(&self) -> (bool, usize, Option<DateTime<Utc>>, i64) {
        (
            !self.bookmark.starred,
            self.tier(),
            self.last_exercise_time,
            self.bookmark.id,
        )
    }
}

/// Deterministic ranking of study candidates
#[derive(Debug, Default, Clone, Copy)]
pub struct StudySetSelector;

impl StudySetSelector {
    /// Pick up to `count` bookmarks in presentation order.
    ///
    /// Candidates not marked fit for study are ignored.
    pub fn select(&self, mut candidates: Vec<StudyCandidate>, count: usize) -> Vec<Bookmark> {
        candidates.retain(|c| c.bookmark.fit_for_study);
        candidates.sort_by_key(|c| c.rank_key());
        candidates
            .into_iter()
            .take(count)
            .map(|c| c.bookmark)
            .collect()
    }
}

// ============================================================================
// TESTS
// ============================================================================
