//! Bookmark Lifecycle
//!
//! Turns one exercise report into the next state of a bookmark. The work
//! is an explicit, ordered list of stages run over an in-memory copy:
//!
//! 1. `AppendExercise` - record the attempt in the log
//! 2. `UpdateSchedule` - let the review scheduler move the bookmark
//! 3. `EvaluateMastery` - learned?
//! 4. `EvaluateEligibility` - fit for study?
//!
//! Nothing here touches the database. The resulting `LifecycleCommit` is
//! written by `Storage::commit_lifecycle` in a single transaction.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use uuid::Uuid;

use crate::bookmark::Bookmark;
use crate::config::StudyConfig;
use crate::eligibility::{StudyEligibilityEvaluator, StudySnapshot};
use crate::events::{EventSink, LifecycleEvent};
use crate::exercise::{Exercise, ExerciseLog, ExerciseOutcome, ExerciseSource};
use crate::mastery::MasteryEvaluator;
use crate::scheduler::{BasicSR, ReviewScheduler, ScheduleState};
use crate::stats::RankSignal;

// ============================================================================
// STAGES
// ============================================================================

/// One step of the report pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    AppendExercise,
    UpdateSchedule,
    EvaluateMastery,
    EvaluateEligibility,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::AppendExercise => "append_exercise",
            Stage::UpdateSchedule => "update_schedule",
            Stage::EvaluateMastery => "evaluate_mastery",
            Stage::EvaluateEligibility => "evaluate_eligibility",
        }
    }
}

/// Stages in execution order
pub const PIPELINE: [Stage; 4] = [
    Stage::AppendExercise,
    Stage::UpdateSchedule,
    Stage::EvaluateMastery,
    Stage::EvaluateEligibility,
];

// ============================================================================
// INPUT / OUTPUT
// ============================================================================

/// Everything stored about a bookmark, read in one snapshot
#[derive(Debug, Clone, PartialEq)]
pub struct LifecycleSnapshot {
    pub bookmark: Bookmark,
    pub log: ExerciseLog,
    pub schedule: Option<ScheduleState>,
}

/// A validated exercise attempt, not yet recorded
#[derive(Debug, Clone, PartialEq)]
pub struct Attempt {
    /// Client-supplied idempotency key; a UUID is generated when absent
    pub id: Option<String>,
    pub outcome: ExerciseOutcome,
    pub source: ExerciseSource,
    pub solving_speed_ms: u64,
    pub time: DateTime<Utc>,
}

/// What one report changes, ready to be committed atomically.
///
/// `bookmark.version` is still the version that was read; the commit
/// uses it as the compare-and-set token.
#[derive(Debug, Clone, PartialEq)]
pub struct LifecycleCommit {
    pub bookmark: Bookmark,
    pub exercise: Exercise,
    pub schedule: ScheduleState,
}

/// Outcome of running the pipeline
#[derive(Debug, Clone, PartialEq)]
pub enum LifecycleStep {
    /// New state to persist
    Apply(LifecycleCommit),
    /// The attempt id is already in the log; nothing to do
    Duplicate {
        bookmark: Bookmark,
        exercise: Exercise,
        schedule: ScheduleState,
    },
}

/// Mutable copy the stages work on
struct Working {
    bookmark: Bookmark,
    log: ExerciseLog,
    schedule: Option<ScheduleState>,
    exercise: Exercise,
}

// ============================================================================
// LIFECYCLE
// ============================================================================

/// Runs the report pipeline with injected evaluators and scheduler
pub struct BookmarkLifecycle {
    mastery: MasteryEvaluator,
    eligibility: StudyEligibilityEvaluator,
    scheduler: Arc<dyn ReviewScheduler>,
    events: Arc<dyn EventSink>,
}

impl BookmarkLifecycle {
    /// Lifecycle with the `BasicSR` scheduler
    pub fn new(config: &StudyConfig, events: Arc<dyn EventSink>) -> Self {
        let scheduler = Arc::new(BasicSR::new(
            config.schedule.clone(),
            config.mastery.corrects_in_a_row,
        ));
        Self::with_scheduler(config, scheduler, events)
    }

    /// Lifecycle with a custom scheduler
    pub fn with_scheduler(
        config: &StudyConfig,
        scheduler: Arc<dyn ReviewScheduler>,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            mastery: MasteryEvaluator::new(config.mastery.clone(), Arc::clone(&events)),
            eligibility: StudyEligibilityEvaluator::new(
                config.fitness.clone(),
                Arc::clone(&events),
            ),
            scheduler,
            events,
        }
    }

    /// Apply one attempt to a snapshot
    pub fn advance(
        &self,
        snapshot: LifecycleSnapshot,
        attempt: &Attempt,
        rank: RankSignal,
    ) -> LifecycleStep {
        let LifecycleSnapshot {
            bookmark,
            log,
            schedule,
        } = snapshot;

        if let Some(id) = attempt.id.as_deref() {
            if let Some(existing) = log.find(id) {
                self.events.emit(LifecycleEvent::DuplicateExercise {
                    bookmark_id: bookmark.id,
                    exercise_id: id.to_string(),
                });
                let schedule =
                    schedule.unwrap_or_else(|| ScheduleState::new(bookmark.id, existing.time));
                return LifecycleStep::Duplicate {
                    exercise: existing.clone(),
                    bookmark,
                    schedule,
                };
            }
        }

        let exercise = Exercise {
            id: attempt
                .id
                .clone()
                .unwrap_or_else(|| Uuid::new_v4().to_string()),
            bookmark_id: bookmark.id,
            outcome: attempt.outcome,
            source: attempt.source,
            solving_speed_ms: attempt.solving_speed_ms,
            time: attempt.time,
        };
        let mut work = Working {
            bookmark,
            log,
            schedule,
            exercise,
        };

        for stage in PIPELINE {
            self.run_stage(stage, &mut work, rank);
            self.events.emit(LifecycleEvent::StageCompleted {
                bookmark_id: work.bookmark.id,
                stage: stage.as_str(),
            });
        }

        let schedule = work
            .schedule
            .unwrap_or_else(|| ScheduleState::new(work.bookmark.id, work.exercise.time));
        LifecycleStep::Apply(LifecycleCommit {
            bookmark: work.bookmark,
            exercise: work.exercise,
            schedule,
        })
    }

    fn run_stage(&self, stage: Stage, work: &mut Working, rank: RankSignal) {
        match stage {
            Stage::AppendExercise => {
                let ex = &work.exercise;
                work.exercise = work.log.append_with_id(
                    ex.id.clone(),
                    ex.outcome,
                    ex.source,
                    ex.solving_speed_ms,
                    ex.time,
                );
            }
            Stage::UpdateSchedule => {
                let update = self.scheduler.update(work.schedule.take(), &work.exercise);
                work.schedule = Some(update.state);
            }
            Stage::EvaluateMastery => {
                let mastery = self
                    .mastery
                    .evaluate_since(&work.log, work.bookmark.mastery_baseline);
                MasteryEvaluator::apply(&mut work.bookmark, mastery);
            }
            Stage::EvaluateEligibility => {
                work.bookmark.fit_for_study = self.evaluate_fitness(&work.bookmark, rank);
            }
        }
    }

    /// Eligibility of a bookmark as it stands
    pub fn evaluate_fitness(&self, bookmark: &Bookmark, rank: RankSignal) -> bool {
        self.eligibility
            .evaluate(&StudySnapshot::of(bookmark, rank))
    }

    /// Star or unstar, re-deriving eligibility
    pub fn set_starred(&self, mut bookmark: Bookmark, starred: bool, rank: RankSignal) -> Bookmark {
        bookmark.starred = starred;
        bookmark.fit_for_study = self.evaluate_fitness(&bookmark, rank);
        bookmark
    }

    /// Return a bookmark to the learning pool.
    ///
    /// Clears the learned flags, restarts the schedule at the shortest
    /// interval and re-derives eligibility. The exercise log is untouched,
    /// but mastery only counts exercises recorded from now on.
    pub fn unlearn(
        &self,
        snapshot: LifecycleSnapshot,
        rank: RankSignal,
        now: DateTime<Utc>,
    ) -> (Bookmark, ScheduleState) {
        let mut bookmark = snapshot.bookmark;
        bookmark.learned = false;
        bookmark.learned_time = None;
        bookmark.mastery_baseline = snapshot.log.len();
        bookmark.fit_for_study = self.evaluate_fitness(&bookmark, rank);

        let mut schedule = snapshot
            .schedule
            .unwrap_or_else(|| ScheduleState::new(bookmark.id, now));
        schedule.restart(now);

        self.events.emit(LifecycleEvent::Unlearned {
            bookmark_id: bookmark.id,
        });
        (bookmark, schedule)
    }
}

// ============================================================================
// TESTS
// ============================================================================
