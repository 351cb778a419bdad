//! SQLite Storage Implementation
//!
//! Bookmarks, their append-only exercise logs and scheduler state. Every
//! lifecycle write goes through one transaction guarded by a
//! compare-and-set on `bookmarks.version`.

use chrono::{DateTime, SecondsFormat, Utc};
use directories::ProjectDirs;
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Mutex;

use crate::bookmark::{Bookmark, BookmarkInput, UpsertOutcome, Upserted};
use crate::exercise::{Exercise, ExerciseLog, ExerciseOutcome};
use crate::lifecycle::{LifecycleCommit, LifecycleSnapshot};
use crate::scheduler::{Phase, ScheduleState};
use crate::selector::StudyCandidate;

// ============================================================================
// ERROR TYPES
// ============================================================================

/// Storage error type
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
    /// Row not found
    #[error("Not found: {0}")]
    NotFound(String),
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// Invalid timestamp
    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),
    /// Initialization error
    #[error("Initialization error: {0}")]
    Init(String),
    /// Compare-and-set on the bookmark version failed
    #[error("Bookmark {0} was modified concurrently")]
    VersionConflict(i64),
}

/// Storage result type
pub type Result<T> = std::result::Result<T, StorageError>;

/// Per-user study statistics
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStudyStats {
    pub user_id: i64,
    pub total_bookmarks: i64,
    pub starred: i64,
    pub fit_for_study: i64,
    pub learned: i64,
    pub total_exercises: i64,
    pub correct_exercises: i64,
    /// Fit bookmarks whose cooldown has passed (or that were never exercised)
    pub due_for_review: i64,
    pub last_exercise: Option<DateTime<Utc>>,
}

const BOOKMARK_COLUMNS: &str = "b.id, b.user_id, b.origin, b.origin_lang, b.translation, \
     b.translation_lang, b.context, b.created_at, b.starred, b.fit_for_study, b.learned, \
     b.learned_time, b.mastery_baseline, b.version";

const SCHEDULE_COLUMNS: &str = "s.bookmark_id AS s_bookmark_id, s.phase AS s_phase, \
     s.streak AS s_streak, s.tier AS s_tier, s.next_due AS s_next_due, \
     s.last_exercise_id AS s_last_exercise_id, s.updated_at AS s_updated_at";

/// Fixed-width UTC timestamps so text comparison in SQL orders correctly
fn timestamp(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn conversion_failure(message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        0,
        rusqlite::types::Type::Text,
        Box::new(std::io::Error::new(std::io::ErrorKind::InvalidData, message)),
    )
}

// ============================================================================
// STORAGE
// ============================================================================

/// SQLite storage
///
/// Uses separate reader/writer connections for interior mutability.
/// All methods take `&self`, making Storage `Send + Sync` so the service
/// can share it as `Arc<Storage>`.
pub struct Storage {
    writer: Mutex<Connection>,
    reader: Mutex<Connection>,
    path: PathBuf,
}

impl Storage {
    /// Apply PRAGMAs and optional encryption to a connection
    fn configure_connection(conn: &Connection) -> Result<()> {
        // Apply encryption key if SQLCipher is enabled and key is provided
        #[cfg(feature = "encryption")]
        {
            if let Ok(key) = std::env::var("GLOSSA_ENCRYPTION_KEY") {
                if !key.is_empty() {
                    conn.pragma_update(None, "key", &key)?;
                }
            }
        }

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA cache_size = -16000;
             PRAGMA temp_store = MEMORY;
             PRAGMA foreign_keys = ON;
             PRAGMA busy_timeout = 5000;
             PRAGMA journal_size_limit = 67108864;",
        )?;

        Ok(())
    }

    /// Open (or create) the database, applying pending migrations
    pub fn new(db_path: Option<PathBuf>) -> Result<Self> {
        let path = match db_path {
            Some(p) => p,
            None => {
                let proj_dirs = ProjectDirs::from("com", "glossa", "core").ok_or_else(|| {
                    StorageError::Init("Could not determine project directories".to_string())
                })?;

                let data_dir = proj_dirs.data_dir();
                std::fs::create_dir_all(data_dir)?;
                // Restrict directory permissions to owner-only on Unix
                #[cfg(unix)]
                {
                    use std::os::unix::fs::PermissionsExt;
                    let perms = std::fs::Permissions::from_mode(0o700);
                    let _ = std::fs::set_permissions(data_dir, perms);
                }
                data_dir.join("glossa.db")
            }
        };

        let writer_conn = Connection::open(&path)?;

        // Restrict database file permissions to owner-only on Unix
        #[cfg(unix)]
        if path.exists() {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o600);
            let _ = std::fs::set_permissions(&path, perms);
        }

        Self::configure_connection(&writer_conn)?;

        // Apply migrations on writer only
        let applied = super::migrations::apply_migrations(&writer_conn)?;
        if applied > 0 {
            tracing::debug!(path = %path.display(), applied, "Database migrated");
        }

        let reader_conn = Connection::open(&path)?;
        Self::configure_connection(&reader_conn)?;

        Ok(Self {
            writer: Mutex::new(writer_conn),
            reader: Mutex::new(reader_conn),
            path,
        })
    }

    /// Location of the database file
    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    // ========================================================================
    // ROW MAPPING
    // ========================================================================

    /// Parse RFC3339 timestamp
    fn parse_timestamp(value: &str, field_name: &str) -> rusqlite::Result<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(value)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| {
                conversion_failure(format!(
                    "Invalid {} timestamp '{}': {}",
                    field_name, value, e
                ))
            })
    }

    fn parse_vocabulary<T: FromStr<Err = String>>(value: &str) -> rusqlite::Result<T> {
        value.parse().map_err(conversion_failure)
    }

    /// Convert a row to Bookmark
    fn row_to_bookmark(row: &rusqlite::Row) -> rusqlite::Result<Bookmark> {
        let created_at: String = row.get("created_at")?;
        let learned_time: Option<String> = row.get("learned_time")?;
        let mastery_baseline: i64 = row.get("mastery_baseline")?;

        Ok(Bookmark {
            id: row.get("id")?,
            user_id: row.get("user_id")?,
            origin: row.get("origin")?,
            origin_lang: row.get("origin_lang")?,
            translation: row.get("translation")?,
            translation_lang: row.get("translation_lang")?,
            context: row.get("context")?,
            created_at: Self::parse_timestamp(&created_at, "created_at")?,
            starred: row.get("starred")?,
            fit_for_study: row.get("fit_for_study")?,
            learned: row.get("learned")?,
            learned_time: learned_time
                .map(|s| Self::parse_timestamp(&s, "learned_time"))
                .transpose()?,
            mastery_baseline: usize::try_from(mastery_baseline).map_err(|_| {
                conversion_failure(format!("Negative mastery_baseline {}", mastery_baseline))
            })?,
            version: row.get("version")?,
        })
    }

    /// Convert a row to Exercise
    fn row_to_exercise(row: &rusqlite::Row) -> rusqlite::Result<Exercise> {
        let outcome: String = row.get("outcome")?;
        let source: String = row.get("source")?;
        let time: String = row.get("time")?;
        let speed: i64 = row.get("solving_speed_ms")?;

        Ok(Exercise {
            id: row.get("id")?,
            bookmark_id: row.get("bookmark_id")?,
            outcome: Self::parse_vocabulary(&outcome)?,
            source: Self::parse_vocabulary(&source)?,
            solving_speed_ms: speed.max(0) as u64,
            time: Self::parse_timestamp(&time, "time")?,
        })
    }

    /// Convert the `s_*` columns of a row to ScheduleState, if present
    fn row_to_schedule(row: &rusqlite::Row) -> rusqlite::Result<Option<ScheduleState>> {
        let Some(bookmark_id) = row.get::<_, Option<i64>>("s_bookmark_id")? else {
            return Ok(None);
        };

        let phase: String = row.get("s_phase")?;
        let phase = Phase::parse_name(&phase)
            .ok_or_else(|| conversion_failure(format!("Unknown phase '{}'", phase)))?;
        let tier: i64 = row.get("s_tier")?;
        let next_due: String = row.get("s_next_due")?;
        let updated_at: String = row.get("s_updated_at")?;

        Ok(Some(ScheduleState {
            bookmark_id,
            phase,
            streak: row.get("s_streak")?,
            tier: tier.max(0) as usize,
            next_due: Self::parse_timestamp(&next_due, "next_due")?,
            last_exercise_id: row.get("s_last_exercise_id")?,
            updated_at: Self::parse_timestamp(&updated_at, "updated_at")?,
        }))
    }

    fn query_bookmark(conn: &Connection, id: i64) -> Result<Option<Bookmark>> {
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM bookmarks b WHERE b.id = ?1",
            BOOKMARK_COLUMNS
        ))?;
        Ok(stmt
            .query_row(params![id], |row| Self::row_to_bookmark(row))
            .optional()?)
    }

    fn query_exercises(conn: &Connection, bookmark_id: i64) -> Result<Vec<Exercise>> {
        let mut stmt = conn.prepare(
            "SELECT id, bookmark_id, outcome, source, solving_speed_ms, time
             FROM exercises WHERE bookmark_id = ?1 ORDER BY seq ASC",
        )?;
        let exercises = stmt
            .query_map(params![bookmark_id], |row| Self::row_to_exercise(row))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(exercises)
    }

    fn query_schedule(conn: &Connection, bookmark_id: i64) -> Result<Option<ScheduleState>> {
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM schedule_states s WHERE s.bookmark_id = ?1",
            SCHEDULE_COLUMNS
        ))?;
        Ok(stmt
            .query_row(params![bookmark_id], |row| Self::row_to_schedule(row))
            .optional()?
            .flatten())
    }

    // ========================================================================
    // BOOKMARKS
    // ========================================================================

    /// Create a bookmark or fetch the one with the same (user, origin, context).
    ///
    /// An existing bookmark whose translation differs gets the new
    /// translation and a re-derived `fit_for_study`. `decide_fit` sees the
    /// bookmark as it is about to be written.
    pub fn upsert_bookmark(
        &self,
        input: &BookmarkInput,
        now: DateTime<Utc>,
        decide_fit: impl Fn(&Bookmark) -> bool,
    ) -> Result<Upserted> {
        let mut writer = self
            .writer
            .lock()
            .map_err(|_| StorageError::Init("Writer lock poisoned".into()))?;
        // IMMEDIATE so a concurrent process cannot slip an insert between the lookup and ours
        let tx = writer.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let existing = {
            let mut stmt = tx.prepare(&format!(
                "SELECT {} FROM bookmarks b
                 WHERE b.user_id = ?1 AND b.origin = ?2 AND b.origin_lang = ?3 AND b.context = ?4",
                BOOKMARK_COLUMNS
            ))?;
            stmt.query_row(
                params![input.user_id, input.origin, input.origin_lang, input.context],
                |row| Self::row_to_bookmark(row),
            )
            .optional()?
        };

        let upserted = match existing {
            Some(mut bookmark) => {
                if bookmark.translation != input.translation
                    || bookmark.translation_lang != input.translation_lang
                {
                    bookmark.translation = input.translation.clone();
                    bookmark.translation_lang = input.translation_lang.clone();
                    bookmark.fit_for_study = decide_fit(&bookmark);
                    bookmark.version += 1;

                    tx.execute(
                        "UPDATE bookmarks SET translation = ?1, translation_lang = ?2,
                             fit_for_study = ?3, version = ?4
                         WHERE id = ?5",
                        params![
                            bookmark.translation,
                            bookmark.translation_lang,
                            bookmark.fit_for_study,
                            bookmark.version,
                            bookmark.id,
                        ],
                    )?;
                }
                Upserted {
                    bookmark,
                    outcome: UpsertOutcome::Fetched,
                }
            }
            None => {
                let mut bookmark = Bookmark {
                    id: 0,
                    user_id: input.user_id,
                    origin: input.origin.clone(),
                    origin_lang: input.origin_lang.clone(),
                    translation: input.translation.clone(),
                    translation_lang: input.translation_lang.clone(),
                    context: input.context.clone(),
                    created_at: now,
                    starred: false,
                    fit_for_study: false,
                    learned: false,
                    learned_time: None,
                    mastery_baseline: 0,
                    version: 1,
                };
                bookmark.fit_for_study = decide_fit(&bookmark);

                tx.execute(
                    "INSERT INTO bookmarks (
                        user_id, origin, origin_lang, translation, translation_lang, context,
                        created_at, starred, fit_for_study, learned, learned_time, version
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, NULL, ?11)",
                    params![
                        bookmark.user_id,
                        bookmark.origin,
                        bookmark.origin_lang,
                        bookmark.translation,
                        bookmark.translation_lang,
                        bookmark.context,
                        timestamp(&bookmark.created_at),
                        bookmark.starred,
                        bookmark.fit_for_study,
                        bookmark.learned,
                        bookmark.version,
                    ],
                )?;
                bookmark.id = tx.last_insert_rowid();

                Upserted {
                    bookmark,
                    outcome: UpsertOutcome::Created,
                }
            }
        };

        tx.commit()?;
        Ok(upserted)
    }

    /// Get a bookmark by ID
    pub fn get_bookmark(&self, id: i64) -> Result<Option<Bookmark>> {
        let reader = self
            .reader
            .lock()
            .map_err(|_| StorageError::Init("Reader lock poisoned".into()))?;
        Self::query_bookmark(&reader, id)
    }

    /// All bookmarks of a user, oldest first
    pub fn bookmarks_for_user(&self, user_id: i64) -> Result<Vec<Bookmark>> {
        let reader = self
            .reader
            .lock()
            .map_err(|_| StorageError::Init("Reader lock poisoned".into()))?;
        let mut stmt = reader.prepare(&format!(
            "SELECT {} FROM bookmarks b WHERE b.user_id = ?1 ORDER BY b.id ASC",
            BOOKMARK_COLUMNS
        ))?;
        let bookmarks = stmt
            .query_map(params![user_id], |row| Self::row_to_bookmark(row))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(bookmarks)
    }

    /// Write user-driven flag changes (starred, un-learning) with a
    /// compare-and-set on the bookmark version.
    ///
    /// `bookmark.version` must be the version that was read. Returns the
    /// bookmark with its new version.
    pub fn commit_bookmark_change(
        &self,
        bookmark: &Bookmark,
        schedule: Option<&ScheduleState>,
    ) -> Result<Bookmark> {
        let mut writer = self
            .writer
            .lock()
            .map_err(|_| StorageError::Init("Writer lock poisoned".into()))?;
        let tx = writer.transaction_with_behavior(TransactionBehavior::Immediate)?;

        Self::compare_and_set_flags(&tx, bookmark)?;
        if let Some(schedule) = schedule {
            Self::upsert_schedule(&tx, schedule)?;
        }

        tx.commit()?;

        let mut committed = bookmark.clone();
        committed.version += 1;
        Ok(committed)
    }

    fn compare_and_set_flags(conn: &Connection, bookmark: &Bookmark) -> Result<()> {
        let rows = conn.execute(
            "UPDATE bookmarks SET starred = ?1, fit_for_study = ?2, learned = ?3,
                 learned_time = ?4, mastery_baseline = ?5, version = version + 1
             WHERE id = ?6 AND version = ?7",
            params![
                bookmark.starred,
                bookmark.fit_for_study,
                bookmark.learned,
                bookmark.learned_time.as_ref().map(timestamp),
                i64::try_from(bookmark.mastery_baseline).unwrap_or(i64::MAX),
                bookmark.id,
                bookmark.version,
            ],
        )?;

        if rows == 0 {
            let exists: bool = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM bookmarks WHERE id = ?1)",
                params![bookmark.id],
                |row| row.get(0),
            )?;
            return Err(if exists {
                StorageError::VersionConflict(bookmark.id)
            } else {
                StorageError::NotFound(format!("bookmark {}", bookmark.id))
            });
        }
        Ok(())
    }

    fn upsert_schedule(conn: &Connection, schedule: &ScheduleState) -> Result<()> {
        conn.execute(
            "INSERT INTO schedule_states (
                bookmark_id, phase, streak, tier, next_due, last_exercise_id, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT(bookmark_id) DO UPDATE SET
                phase = excluded.phase,
                streak = excluded.streak,
                tier = excluded.tier,
                next_due = excluded.next_due,
                last_exercise_id = excluded.last_exercise_id,
                updated_at = excluded.updated_at",
            params![
                schedule.bookmark_id,
                schedule.phase.as_str(),
                schedule.streak,
                schedule.tier as i64,
                timestamp(&schedule.next_due),
                schedule.last_exercise_id,
                timestamp(&schedule.updated_at),
            ],
        )?;
        Ok(())
    }

    // ========================================================================
    // EXERCISES & SCHEDULE
    // ========================================================================

    /// Exercise log of a bookmark, in insertion order
    pub fn get_exercise_log(&self, bookmark_id: i64) -> Result<ExerciseLog> {
        let reader = self
            .reader
            .lock()
            .map_err(|_| StorageError::Init("Reader lock poisoned".into()))?;
        let exercises = Self::query_exercises(&reader, bookmark_id)?;
        Ok(ExerciseLog::from_exercises(bookmark_id, exercises))
    }

    /// Scheduler state of a bookmark; `None` if never exercised
    pub fn get_schedule(&self, bookmark_id: i64) -> Result<Option<ScheduleState>> {
        let reader = self
            .reader
            .lock()
            .map_err(|_| StorageError::Init("Reader lock poisoned".into()))?;
        Self::query_schedule(&reader, bookmark_id)
    }

    /// Bookmark, log and schedule read in one consistent snapshot
    pub fn load_lifecycle(&self, bookmark_id: i64) -> Result<LifecycleSnapshot> {
        let mut reader = self
            .reader
            .lock()
            .map_err(|_| StorageError::Init("Reader lock poisoned".into()))?;
        let tx = reader.transaction()?;

        let bookmark = Self::query_bookmark(&tx, bookmark_id)?
            .ok_or_else(|| StorageError::NotFound(format!("bookmark {}", bookmark_id)))?;
        let log = ExerciseLog::from_exercises(bookmark_id, Self::query_exercises(&tx, bookmark_id)?);
        let schedule = Self::query_schedule(&tx, bookmark_id)?;

        tx.commit()?;
        Ok(LifecycleSnapshot {
            bookmark,
            log,
            schedule,
        })
    }

    /// Persist one lifecycle step atomically.
    ///
    /// The bookmark flags are written only if the stored version still
    /// equals `commit.bookmark.version`; otherwise nothing is written and
    /// `VersionConflict` is returned. Returns the bookmark with its new version.
    pub fn commit_lifecycle(&self, commit: &LifecycleCommit) -> Result<Bookmark> {
        let mut writer = self
            .writer
            .lock()
            .map_err(|_| StorageError::Init("Writer lock poisoned".into()))?;
        let tx = writer.transaction_with_behavior(TransactionBehavior::Immediate)?;

        Self::compare_and_set_flags(&tx, &commit.bookmark)?;

        let exercise = &commit.exercise;
        tx.execute(
            "INSERT INTO exercises (id, bookmark_id, outcome, source, solving_speed_ms, time)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                exercise.id,
                exercise.bookmark_id,
                exercise.outcome.as_str(),
                exercise.source.as_str(),
                i64::try_from(exercise.solving_speed_ms).unwrap_or(i64::MAX),
                timestamp(&exercise.time),
            ],
        )?;

        Self::upsert_schedule(&tx, &commit.schedule)?;

        tx.commit()?;

        let mut committed = commit.bookmark.clone();
        committed.version += 1;
        Ok(committed)
    }

    // ========================================================================
    // STUDY QUERIES
    // ========================================================================

    /// A user's fit-for-study bookmarks with schedule and last practice time
    pub fn study_candidates(&self, user_id: i64) -> Result<Vec<StudyCandidate>> {
        let reader = self
            .reader
            .lock()
            .map_err(|_| StorageError::Init("Reader lock poisoned".into()))?;
        let mut stmt = reader.prepare(&format!(
            "SELECT {}, {},
                (SELECT e.time FROM exercises e WHERE e.bookmark_id = b.id
                 ORDER BY e.seq DESC LIMIT 1) AS last_exercise_time
             FROM bookmarks b
             LEFT JOIN schedule_states s ON s.bookmark_id = b.id
             WHERE b.user_id = ?1 AND b.fit_for_study = 1
             ORDER BY b.id ASC",
            BOOKMARK_COLUMNS, SCHEDULE_COLUMNS
        ))?;

        let candidates = stmt
            .query_map(params![user_id], |row| {
                let last: Option<String> = row.get("last_exercise_time")?;
                Ok(StudyCandidate {
                    bookmark: Self::row_to_bookmark(row)?,
                    schedule: Self::row_to_schedule(row)?,
                    last_exercise_time: last
                        .map(|s| Self::parse_timestamp(&s, "last_exercise_time"))
                        .transpose()?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(candidates)
    }

    /// Outcome counts of a user's exercises strictly between `from` and `to`
    pub fn exercise_correctness(
        &self,
        user_id: i64,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<BTreeMap<ExerciseOutcome, i64>> {
        let reader = self
            .reader
            .lock()
            .map_err(|_| StorageError::Init("Reader lock poisoned".into()))?;
        let mut stmt = reader.prepare(
            "SELECT e.outcome, COUNT(*) FROM exercises e
             JOIN bookmarks b ON b.id = e.bookmark_id
             WHERE b.user_id = ?1 AND e.time > ?2 AND e.time < ?3
             GROUP BY e.outcome",
        )?;

        let rows = stmt
            .query_map(params![user_id, timestamp(&from), timestamp(&to)], |row| {
                let outcome: String = row.get(0)?;
                Ok((Self::parse_vocabulary::<ExerciseOutcome>(&outcome)?, row.get(1)?))
            })?
            .collect::<rusqlite::Result<Vec<(ExerciseOutcome, i64)>>>()?;

        Ok(rows.into_iter().collect())
    }

    /// Counts over one user's bookmarks and exercises
    pub fn user_stats(&self, user_id: i64, now: DateTime<Utc>) -> Result<UserStudyStats> {
        let reader = self
            .reader
            .lock()
            .map_err(|_| StorageError::Init("Reader lock poisoned".into()))?;

        let (total_bookmarks, starred, fit_for_study, learned): (i64, i64, i64, i64) = reader
            .query_row(
                "SELECT COUNT(*),
                    COALESCE(SUM(starred), 0),
                    COALESCE(SUM(fit_for_study), 0),
                    COALESCE(SUM(learned), 0)
                 FROM bookmarks WHERE user_id = ?1",
                params![user_id],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
            )?;

        let (total_exercises, correct_exercises, last_exercise): (i64, i64, Option<String>) =
            reader.query_row(
                "SELECT COUNT(*),
                    COALESCE(SUM(CASE WHEN e.outcome = ?2 THEN 1 ELSE 0 END), 0),
                    MAX(e.time)
                 FROM exercises e JOIN bookmarks b ON b.id = e.bookmark_id
                 WHERE b.user_id = ?1",
                params![user_id, ExerciseOutcome::Correct.as_str()],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )?;

        let due_for_review: i64 = reader.query_row(
            "SELECT COUNT(*) FROM bookmarks b
             LEFT JOIN schedule_states s ON s.bookmark_id = b.id
             WHERE b.user_id = ?1 AND b.fit_for_study = 1
               AND (s.next_due IS NULL OR s.next_due <= ?2)",
            params![user_id, timestamp(&now)],
            |row| row.get(0),
        )?;

        let last_exercise = last_exercise
            .map(|s| {
                DateTime::parse_from_rfc3339(&s)
                    .map(|dt| dt.with_timezone(&Utc))
                    .map_err(|e| StorageError::InvalidTimestamp(format!("{}: {}", s, e)))
            })
            .transpose()?;

        Ok(UserStudyStats {
            user_id,
            total_bookmarks,
            starred,
            fit_for_study,
            learned,
            total_exercises,
            correct_exercises,
            due_for_review,
            last_exercise,
        })
    }

    // ========================================================================
    // MAINTENANCE
    // ========================================================================

    /// Consistent copy of the database at `path`
    pub fn backup_to(&self, path: &std::path::Path) -> Result<()> {
        let path_str = path
            .to_str()
            .ok_or_else(|| StorageError::Init("Invalid backup path encoding".to_string()))?;
        if path_str.bytes().any(|b| b < 0x20 && b != b'\t') {
            return Err(StorageError::Init(
                "Backup path contains invalid characters".to_string(),
            ));
        }
        let reader = self
            .reader
            .lock()
            .map_err(|_| StorageError::Init("Reader lock poisoned".into()))?;
        // VACUUM INTO doesn't support parameterized queries; escape single quotes
        reader.execute_batch(&format!("VACUUM INTO '{}'", path_str.replace('\'', "''")))?;
        Ok(())
    }
}

// ============================================================================
// TESTS
// ============================================================================
