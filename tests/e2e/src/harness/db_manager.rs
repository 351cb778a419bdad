//! Test Database Manager
//!
//! Provides isolated study services for testing:
//! - Temporary databases that are automatically cleaned up
//! - Pre-seeded bookmarks
//! - A recording event sink for lifecycle assertions
//! - Several services over one database, as separate processes would see it

use glossa_core::{
    Bookmark, BookmarkInput, ExerciseReport, NoWordStatistics, RecordingSink, ReportOutcome,
    Storage, StudyConfig, StudyResult, StudyService, WordStatistics,
};
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

/// Manager for test databases
///
/// Creates an isolated database and study service for each test to
/// prevent interference. Cleans up the temporary directory when dropped.
///
/// # Example
///
/// ```rust,ignore
/// let db = TestDatabaseManager::new_temp();
/// let bookmark = db.add("Hund", "dog", "Der Hund schläft.");
/// db.report(bookmark.id, "Correct");
/// // Database is automatically deleted when `db` goes out of scope
/// ```
pub struct TestDatabaseManager {
    /// The service under test
    pub service: Arc<StudyService>,
    /// Everything the lifecycle emitted
    pub events: Arc<RecordingSink>,
    /// Temporary directory (kept alive to prevent premature deletion)
    _temp_dir: Option<TempDir>,
    /// Path to the database file
    db_path: PathBuf,
    /// User the convenience methods act for
    user_id: i64,
}

impl TestDatabaseManager {
    /// Create a new test database in a temporary directory
    pub fn new_temp() -> Self {
        Self::with_config(StudyConfig::default(), Arc::new(NoWordStatistics))
    }

    /// Temporary database with custom configuration and statistics
    pub fn with_config(config: StudyConfig, statistics: Arc<dyn WordStatistics>) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let db_path = temp_dir.path().join("test_glossa.db");
        let events = Arc::new(RecordingSink::new());
        let service = Self::open_service(&db_path, config, statistics, events.clone());

        Self {
            service,
            events,
            _temp_dir: Some(temp_dir),
            db_path,
            user_id: 1,
        }
    }

    fn open_service(
        db_path: &PathBuf,
        config: StudyConfig,
        statistics: Arc<dyn WordStatistics>,
        events: Arc<RecordingSink>,
    ) -> Arc<StudyService> {
        let storage =
            Arc::new(Storage::new(Some(db_path.clone())).expect("Failed to create test storage"));
        Arc::new(
            StudyService::from_parts(storage, statistics, events, config)
                .expect("Failed to create study service"),
        )
    }

    /// A second, independent service over the same database file.
    ///
    /// It has its own connections and its own lock registry, so only the
    /// database-level compare-and-set protects against it.
    pub fn second_service(&self) -> Arc<StudyService> {
        Self::open_service(
            &self.db_path,
            self.service.config().clone(),
            Arc::new(NoWordStatistics),
            Arc::new(RecordingSink::new()),
        )
    }

    /// Get the database path
    pub fn path(&self) -> &PathBuf {
        &self.db_path
    }

    /// User the helpers act for
    pub fn user_id(&self) -> i64 {
        self.user_id
    }

    // ========================================================================
    // SEEDING METHODS
    // ========================================================================

    /// Add one bookmark for the default user
    pub fn add(&self, origin: &str, translation: &str, context: &str) -> Bookmark {
        self.service
            .add_bookmark(&BookmarkInput {
                user_id: self.user_id,
                origin: origin.to_string(),
                origin_lang: "de".to_string(),
                translation: translation.to_string(),
                translation_lang: "en".to_string(),
                context: context.to_string(),
            })
            .expect("Failed to add bookmark")
            .bookmark
    }

    /// Seed `count` short, fit bookmarks
    pub fn seed_bookmarks(&self, count: usize) -> Vec<Bookmark> {
        (0..count)
            .map(|i| {
                self.add(
                    &format!("Wort{}", i),
                    &format!("word{}", i),
                    &format!("Satz Nummer {}.", i),
                )
            })
            .collect()
    }

    // ========================================================================
    // REPORTING
    // ========================================================================

    /// Report an outcome with the default source and speed
    pub fn try_report(&self, bookmark_id: i64, outcome: &str) -> StudyResult<ReportOutcome> {
        self.service.report_outcome(&ExerciseReport {
            bookmark_id,
            outcome: outcome.to_string(),
            source: "Recognize".to_string(),
            solving_speed: "2000".to_string(),
            exercise_id: None,
        })
    }

    /// Report an outcome that must succeed
    pub fn report(&self, bookmark_id: i64, outcome: &str) -> ReportOutcome {
        self.try_report(bookmark_id, outcome)
            .expect("Failed to report outcome")
    }

    /// Report the same outcome several times
    pub fn report_many(&self, bookmark_id: i64, outcomes: &[&str]) -> Vec<ReportOutcome> {
        outcomes
            .iter()
            .map(|outcome| self.report(bookmark_id, outcome))
            .collect()
    }

    /// Current stored bookmark
    pub fn bookmark(&self, bookmark_id: i64) -> Bookmark {
        self.service
            .storage()
            .get_bookmark(bookmark_id)
            .expect("Failed to read bookmark")
            .expect("Bookmark missing")
    }
}
