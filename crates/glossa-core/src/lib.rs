//! # Glossa Core
//!
//! Learning lifecycle for vocabulary bookmarks. A bookmark is a word a
//! learner looked up, with its translation and the sentence it came from.
//! Every exercise on it is recorded and drives three derived decisions:
//!
//! - **Mastery**: four `Correct` outcomes in a row (or an explicit
//!   `TooEasy`) mark the bookmark learned. Learning never silently reverts.
//! - **Eligibility**: starred bookmarks are always studied; others only when
//!   they make good flashcards (short context, short origin phrase, a real
//!   translation, not an extremely rare word). Learned bookmarks never are.
//! - **Scheduling**: a streak-driven state machine (`BasicSR`) moves the
//!   bookmark through interval tiers and sets its next due time.
//!
//! Each report runs the same ordered pipeline over an in-memory copy and is
//! committed in one SQLite transaction, guarded by a compare-and-set on the
//! bookmark version. Updates on one bookmark are serialized in-process;
//! different bookmarks never wait for each other.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use glossa_core::{BookmarkInput, ExerciseReport, Storage, StudyConfig, StudyService};
//! use std::sync::Arc;
//!
//! // Create storage (uses default platform-specific location)
//! let storage = Arc::new(Storage::new(None)?);
//! let service = StudyService::new(storage, StudyConfig::default().with_env_overrides())?;
//!
//! let bookmark = service.add_bookmark(&BookmarkInput {
//!     user_id: 1,
//!     origin: "Hund".into(),
//!     origin_lang: "de".into(),
//!     translation: "dog".into(),
//!     translation_lang: "en".into(),
//!     context: "Der Hund schläft.".into(),
//! })?.bookmark;
//!
//! let outcome = service.report_outcome(&ExerciseReport {
//!     bookmark_id: bookmark.id,
//!     outcome: "Correct".into(),
//!     source: "Recognize".into(),
//!     solving_speed: "1800".into(),
//!     exercise_id: None,
//! })?;
//!
//! let next = service.study_set(1, 10)?;
//! ```
//!
//! ## Feature Flags
//!
//! - `bundled-sqlite` (default): bundled SQLite
//! - `encryption`: SQLCipher; the key is read from `GLOSSA_ENCRYPTION_KEY`

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(rustdoc::missing_crate_level_docs)]

// ============================================================================
// MODULES
// ============================================================================

pub mod bookmark;
pub mod config;
pub mod eligibility;
pub mod error;
pub mod events;
pub mod exercise;
pub mod lifecycle;
pub mod locks;
pub mod mastery;
pub mod scheduler;
pub mod selector;
pub mod service;
pub mod stats;
pub mod storage;

// ============================================================================
// PUBLIC API RE-EXPORTS
// ============================================================================

// Entities
pub use bookmark::{Bookmark, BookmarkInput, BookmarkView, UpsertOutcome, Upserted};
pub use exercise::{coerce_solving_speed, Exercise, ExerciseLog, ExerciseOutcome, ExerciseSource};

// Evaluators and scheduling
pub use eligibility::{FitnessReason, StudyEligibilityEvaluator, StudySnapshot};
pub use lifecycle::{
    Attempt, BookmarkLifecycle, LifecycleCommit, LifecycleSnapshot, LifecycleStep, Stage, PIPELINE,
};
pub use mastery::{Mastery, MasteryEvaluator};
pub use scheduler::{BasicSR, Phase, ReviewScheduler, ScheduleState, ScheduleUpdate};
pub use selector::{StudyCandidate, StudySetSelector};

// Collaborators
pub use events::{EventSink, LifecycleEvent, NullSink, RecordingSink, TracingSink};
pub use locks::{BookmarkGuard, BookmarkLocks, LockError};
pub use stats::{FrequencyList, NoWordStatistics, RankSignal, StatsError, WordStatistics};

// Service, configuration, errors
pub use config::{
    FitnessPolicy, MasteryPolicy, ScheduleConfig, StudyConfig, CORRECTS_IN_A_ROW_FOR_LEARNED,
    DEFAULT_MAX_CONTEXT_CHARS,
};
pub use error::{StudyError, StudyResult};
pub use service::{ExerciseReport, ReportOutcome, StudyService};

// Storage layer
pub use storage::{Result, Storage, StorageError, UserStudyStats};

// ============================================================================
// VERSION INFO
// ============================================================================

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// ============================================================================
// PRELUDE
// ============================================================================

/// Convenient imports for common usage
pub mod prelude {
    pub use crate::{
        Bookmark, BookmarkInput, ExerciseLog, ExerciseOutcome, ExerciseReport, ExerciseSource,
        ReportOutcome, Storage, StudyConfig, StudyError, StudyResult, StudyService,
    };
}
