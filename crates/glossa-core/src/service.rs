//! Study Service
//!
//! The facade reporting surfaces call. Validates raw requests, serializes
//! updates per bookmark, runs the lifecycle and commits the result.
//!
//! Conflicts (a held bookmark lock or a lost compare-and-set) are retried
//! once after `conflict_backoff_ms`; a second conflict is returned as
//! `StudyError::ConcurrencyConflict`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use crate::bookmark::{Bookmark, BookmarkInput, BookmarkView, Upserted};
use crate::config::StudyConfig;
use crate::error::{StudyError, StudyResult};
use crate::events::{EventSink, LifecycleEvent, TracingSink};
use crate::exercise::{coerce_solving_speed, Exercise, ExerciseLog, ExerciseOutcome, ExerciseSource};
use crate::lifecycle::{Attempt, BookmarkLifecycle, LifecycleStep};
use crate::locks::{BookmarkLocks, LockError};
use crate::scheduler::ScheduleState;
use crate::selector::StudySetSelector;
use crate::stats::{rank_signal, NoWordStatistics, RankSignal, WordStatistics};
use crate::storage::{Storage, StorageError, UserStudyStats};

/// Attempts per request, counting the first one
const MAX_ATTEMPTS: u32 = 2;

// ============================================================================
// REQUEST / RESPONSE
// ============================================================================

/// Raw exercise report as received from a client
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExerciseReport {
    pub bookmark_id: i64,
    /// Outcome name, e.g. "Correct" or "too_easy"
    pub outcome: String,
    /// Source name, e.g. "Recognize" or "multiple_choice"
    pub source: String,
    /// Milliseconds as sent by the client; anything non-numeric counts as 0
    pub solving_speed: String,
    /// Optional idempotency key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exercise_id: Option<String>,
}

/// Result of a report
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportOutcome {
    pub bookmark: Bookmark,
    pub schedule: ScheduleState,
    pub exercise: Exercise,
    /// False when the exercise id had already been recorded
    pub applied: bool,
}

// ============================================================================
// SERVICE
// ============================================================================

/// Shared entry point for every study operation
pub struct StudyService {
    storage: Arc<Storage>,
    statistics: Arc<dyn WordStatistics>,
    events: Arc<dyn EventSink>,
    lifecycle: BookmarkLifecycle,
    selector: StudySetSelector,
    locks: BookmarkLocks,
    config: StudyConfig,
}

impl StudyService {
    /// Service without word statistics, logging events through `tracing`
    pub fn new(storage: Arc<Storage>, config: StudyConfig) -> StudyResult<Self> {
        Self::from_parts(
            storage,
            Arc::new(NoWordStatistics),
            Arc::new(TracingSink),
            config,
        )
    }

    /// Service with explicit collaborators
    pub fn from_parts(
        storage: Arc<Storage>,
        statistics: Arc<dyn WordStatistics>,
        events: Arc<dyn EventSink>,
        config: StudyConfig,
    ) -> StudyResult<Self> {
        config.validate()?;
        Ok(Self {
            lifecycle: BookmarkLifecycle::new(&config, Arc::clone(&events)),
            storage,
            statistics,
            events,
            selector: StudySetSelector,
            locks: BookmarkLocks::new(),
            config,
        })
    }

    pub fn config(&self) -> &StudyConfig {
        &self.config
    }

    pub fn storage(&self) -> &Arc<Storage> {
        &self.storage
    }

    // ========================================================================
    // OPERATIONS
    // ========================================================================

    /// Create a bookmark, or fetch the existing one for the same
    /// (user, origin, context) and refresh its translation
    pub fn add_bookmark(&self, input: &BookmarkInput) -> StudyResult<Upserted> {
        for (field, value) in [
            ("origin", &input.origin),
            ("origin language", &input.origin_lang),
            ("translation", &input.translation),
            ("translation language", &input.translation_lang),
        ] {
            if value.trim().is_empty() {
                return Err(StudyError::InvalidInput(format!("{} must not be empty", field)));
            }
        }

        let (rank, stats_error) =
            rank_signal(self.statistics.as_ref(), &input.origin, &input.origin_lang);
        let upserted = self.storage.upsert_bookmark(input, Utc::now(), |bookmark| {
            self.lifecycle.evaluate_fitness(bookmark, rank)
        })?;

        if let Some(err) = stats_error {
            self.report_unavailable(&upserted.bookmark, err.to_string());
        }
        tracing::debug!(
            bookmark_id = upserted.bookmark.id,
            outcome = ?upserted.outcome,
            "Bookmark upserted"
        );
        Ok(upserted)
    }

    /// Record an exercise outcome and advance the bookmark's lifecycle
    pub fn report_outcome(&self, report: &ExerciseReport) -> StudyResult<ReportOutcome> {
        let outcome: ExerciseOutcome = report.outcome.parse().map_err(StudyError::InvalidInput)?;
        let source: ExerciseSource = report.source.parse().map_err(StudyError::InvalidInput)?;

        let attempt = Attempt {
            id: report
                .exercise_id
                .as_deref()
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .map(str::to_string),
            outcome,
            source,
            solving_speed_ms: coerce_solving_speed(&report.solving_speed),
            time: Utc::now(),
        };

        self.with_conflict_retry(report.bookmark_id, || {
            self.apply_attempt(report.bookmark_id, &attempt)
        })
    }

    fn apply_attempt(&self, bookmark_id: i64, attempt: &Attempt) -> StudyResult<ReportOutcome> {
        let snapshot = self.storage.load_lifecycle(bookmark_id)?;
        let rank = self.rank(&snapshot.bookmark);

        match self.lifecycle.advance(snapshot, attempt, rank) {
            LifecycleStep::Duplicate {
                bookmark,
                exercise,
                schedule,
            } => Ok(ReportOutcome {
                bookmark,
                schedule,
                exercise,
                applied: false,
            }),
            LifecycleStep::Apply(commit) => {
                let bookmark = self.storage.commit_lifecycle(&commit)?;
                tracing::debug!(
                    bookmark_id,
                    outcome = %commit.exercise.outcome,
                    phase = %commit.schedule.phase,
                    learned = bookmark.learned,
                    "Exercise recorded"
                );
                Ok(ReportOutcome {
                    bookmark,
                    schedule: commit.schedule,
                    exercise: commit.exercise,
                    applied: true,
                })
            }
        }
    }

    /// Star or unstar a bookmark
    pub fn set_starred(&self, bookmark_id: i64, starred: bool) -> StudyResult<Bookmark> {
        self.with_conflict_retry(bookmark_id, || {
            let bookmark = self.require_bookmark(bookmark_id)?;
            if bookmark.starred == starred {
                return Ok(bookmark);
            }
            let rank = self.rank(&bookmark);
            let updated = self.lifecycle.set_starred(bookmark, starred, rank);
            Ok(self.storage.commit_bookmark_change(&updated, None)?)
        })
    }

    /// Return a learned bookmark to the learning pool.
    ///
    /// A bookmark that is not learned is returned unchanged.
    pub fn unlearn(&self, bookmark_id: i64) -> StudyResult<Bookmark> {
        self.with_conflict_retry(bookmark_id, || {
            let snapshot = self.storage.load_lifecycle(bookmark_id)?;
            if !snapshot.bookmark.learned {
                return Ok(snapshot.bookmark);
            }
            let rank = self.rank(&snapshot.bookmark);
            let (bookmark, schedule) = self.lifecycle.unlearn(snapshot, rank, Utc::now());
            Ok(self.storage.commit_bookmark_change(&bookmark, Some(&schedule))?)
        })
    }

    /// Up to `count` bookmarks to practice next, in presentation order
    pub fn study_set(&self, user_id: i64, count: usize) -> StudyResult<Vec<Bookmark>> {
        let candidates = self.storage.study_candidates(user_id)?;
        Ok(self.selector.select(candidates, count))
    }

    /// A bookmark's exercises, oldest first
    pub fn exercise_log(&self, bookmark_id: i64) -> StudyResult<ExerciseLog> {
        self.require_bookmark(bookmark_id)?;
        Ok(self.storage.get_exercise_log(bookmark_id)?)
    }

    /// Display summary of a bookmark
    pub fn bookmark_view(&self, bookmark_id: i64) -> StudyResult<BookmarkView> {
        let snapshot = self.storage.load_lifecycle(bookmark_id)?;
        let rank = self.rank(&snapshot.bookmark);
        let phase = snapshot
            .schedule
            .as_ref()
            .map(|s| s.phase.as_str().to_string());
        Ok(BookmarkView::new(
            &snapshot.bookmark,
            rank.rank(),
            phase,
            snapshot.log.len(),
            Utc::now(),
        ))
    }

    /// Outcome counts of a user's exercises strictly inside (`from`, `to`)
    pub fn exercise_correctness(
        &self,
        user_id: i64,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> StudyResult<BTreeMap<ExerciseOutcome, i64>> {
        if from > to {
            return Err(StudyError::InvalidInput(format!(
                "window start {} is after its end {}",
                from, to
            )));
        }
        Ok(self.storage.exercise_correctness(user_id, from, to)?)
    }

    /// Aggregate counts for a user
    pub fn user_stats(&self, user_id: i64) -> StudyResult<UserStudyStats> {
        Ok(self.storage.user_stats(user_id, Utc::now())?)
    }

    // ========================================================================
    // HELPERS
    // ========================================================================

    fn require_bookmark(&self, bookmark_id: i64) -> StudyResult<Bookmark> {
        self.storage
            .get_bookmark(bookmark_id)?
            .ok_or_else(|| StudyError::NotFound(format!("bookmark {}", bookmark_id)))
    }

    /// Rank of the bookmark's origin; provider failures are reported and
    /// degrade to `Unavailable`
    fn rank(&self, bookmark: &Bookmark) -> RankSignal {
        let (rank, err) = rank_signal(
            self.statistics.as_ref(),
            &bookmark.origin,
            &bookmark.origin_lang,
        );
        if let Some(err) = err {
            self.report_unavailable(bookmark, err.to_string());
        }
        rank
    }

    fn report_unavailable(&self, bookmark: &Bookmark, reason: String) {
        let err = StudyError::DependencyUnavailable(reason);
        self.events.emit(LifecycleEvent::StatisticsUnavailable {
            bookmark_id: bookmark.id,
            term: bookmark.origin.clone(),
            error: err.to_string(),
        });
    }

    /// Run `op` holding the bookmark lock, retrying once on conflict
    fn with_conflict_retry<T>(
        &self,
        bookmark_id: i64,
        op: impl Fn() -> StudyResult<T>,
    ) -> StudyResult<T> {
        let timeout = Duration::from_millis(self.config.lock_timeout_ms);
        let mut attempt = 1;

        loop {
            let result = match self.locks.acquire(bookmark_id, timeout) {
                Ok(guard) => {
                    let result = op();
                    drop(guard);
                    result
                }
                Err(LockError::Timeout(_)) => Err(StudyError::ConcurrencyConflict { bookmark_id }),
                Err(LockError::Poisoned) => Err(StudyError::Persistence(StorageError::Init(
                    "Bookmark lock registry poisoned".into(),
                ))),
            };

            match result {
                Err(StudyError::ConcurrencyConflict { .. }) if attempt < MAX_ATTEMPTS => {
                    self.events.emit(LifecycleEvent::ConflictRetry {
                        bookmark_id,
                        attempt,
                    });
                    std::thread::sleep(Duration::from_millis(self.config.conflict_backoff_ms));
                    attempt += 1;
                }
                other => return other,
            }
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
