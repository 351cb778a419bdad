//! Database Migrations
//!
//! Schema migration definitions for the storage layer.

/// Migration definitions
pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        description: "Initial schema: bookmarks, append-only exercises, schedule states",
        up: MIGRATION_V1_UP,
    },
    Migration {
        version: 2,
        description: "Study candidate and exercise statistics indexes",
        up: MIGRATION_V2_UP,
    },
    Migration {
        version: 3,
        description: "Mastery baseline for unlearned bookmarks, exercise delete guard",
        up: MIGRATION_V3_UP,
    },
];

/// A database migration
#[derive(Debug, Clone)]
pub struct Migration {
    /// Version number
    pub version: u32,
    /// Description
    pub description: &'static str,
    /// SQL to apply
    pub up: &'static str,
}

/// V1: Initial schema
const MIGRATION_V1_UP: &str = r#"
CREATE TABLE IF NOT EXISTS bookmarks (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER NOT NULL,
    origin TEXT NOT NULL,
    origin_lang TEXT NOT NULL,
    translation TEXT NOT NULL,
    translation_lang TEXT NOT NULL,
    context TEXT NOT NULL,
    created_at TEXT NOT NULL,

    -- User controlled
    starred INTEGER NOT NULL DEFAULT 0,

    -- Derived by the lifecycle
    fit_for_study INTEGER NOT NULL DEFAULT 0,
    learned INTEGER NOT NULL DEFAULT 0,
    learned_time TEXT,

    -- Compare-and-set token, bumped on every committed mutation
    version INTEGER NOT NULL DEFAULT 1,

    UNIQUE (user_id, origin, origin_lang, context)
);

CREATE INDEX IF NOT EXISTS idx_bookmarks_user ON bookmarks(user_id);

-- Exercise log (append-only)
CREATE TABLE IF NOT EXISTS exercises (
    seq INTEGER PRIMARY KEY AUTOINCREMENT,
    id TEXT NOT NULL UNIQUE,
    bookmark_id INTEGER NOT NULL REFERENCES bookmarks(id) ON DELETE CASCADE,
    outcome TEXT NOT NULL,
    source TEXT NOT NULL,
    solving_speed_ms INTEGER NOT NULL DEFAULT 0,
    time TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_exercises_bookmark ON exercises(bookmark_id, seq);

CREATE TRIGGER IF NOT EXISTS exercises_append_only BEFORE UPDATE ON exercises BEGIN
    SELECT RAISE(ABORT, 'exercises are append-only');
END;

-- Review scheduler state, one row per exercised bookmark
CREATE TABLE IF NOT EXISTS schedule_states (
    bookmark_id INTEGER PRIMARY KEY REFERENCES bookmarks(id) ON DELETE CASCADE,
    phase TEXT NOT NULL DEFAULT 'new',
    streak INTEGER NOT NULL DEFAULT 0,
    tier INTEGER NOT NULL DEFAULT 0,
    next_due TEXT NOT NULL,
    last_exercise_id TEXT,
    updated_at TEXT NOT NULL
);

-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL
);

INSERT OR IGNORE INTO schema_version (version, applied_at) VALUES (1, datetime('now'));
"#;

/// V2: Indexes for study-set queries and per-user outcome statistics
const MIGRATION_V2_UP: &str = r#"
CREATE INDEX IF NOT EXISTS idx_bookmarks_study ON bookmarks(user_id, fit_for_study);
CREATE INDEX IF NOT EXISTS idx_exercises_time ON exercises(time);
CREATE INDEX IF NOT EXISTS idx_schedule_next_due ON schedule_states(next_due);

UPDATE schema_version SET version = 2, applied_at = datetime('now');
"#;

/// V3: Unlearn baseline and delete protection for the exercise log.
///
/// Exercises may only disappear together with their bookmark: the cascade
/// runs after the bookmark row is gone, so the guard lets it through.
const MIGRATION_V3_UP: &str = r#"
ALTER TABLE bookmarks ADD COLUMN mastery_baseline INTEGER NOT NULL DEFAULT 0;

CREATE TRIGGER IF NOT EXISTS exercises_no_delete BEFORE DELETE ON exercises
FOR EACH ROW WHEN EXISTS (SELECT 1 FROM bookmarks WHERE id = OLD.bookmark_id)
BEGIN
    SELECT RAISE(ABORT, 'exercises are append-only');
END;

UPDATE schema_version SET version = 3, applied_at = datetime('now');
"#;

/// Get current schema version from database
pub fn get_current_version(conn: &rusqlite::Connection) -> rusqlite::Result<u32> {
    conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |row| row.get(0),
    )
    .or(Ok(0))
}

/// Apply pending migrations
pub fn apply_migrations(conn: &rusqlite::Connection) -> rusqlite::Result<u32> {
    let current_version = get_current_version(conn)?;
    let mut applied = 0;

    for migration in MIGRATIONS {
        if migration.version > current_version {
            tracing::info!(
                "Applying migration v{}: {}",
                migration.version,
                migration.description
            );

            // execute_batch handles the multi-statement SQL including triggers
            conn.execute_batch(migration.up)?;
            applied += 1;
        }
    }

    Ok(applied)
}
