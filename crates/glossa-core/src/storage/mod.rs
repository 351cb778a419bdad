//! Storage Module
//!
//! SQLite-based storage layer with:
//! - Atomic bookmark upsert on (user, origin, context)
//! - Append-only exercise log
//! - Scheduler state per bookmark
//! - Compare-and-set lifecycle commits

mod migrations;
mod sqlite;

pub use migrations::MIGRATIONS;
pub use sqlite::{Result, Storage, StorageError, UserStudyStats};
