//! Per-bookmark lock registry
//!
//! Serializes lifecycle updates on the same bookmark inside one process.
//! Updates on different bookmarks never wait for each other. Every wait is
//! bounded; running out of time is reported, never blocked on.

use std::collections::HashSet;
use std::sync::{Condvar, Mutex};
use std::time::{Duration, Instant};

/// Lock acquisition failure
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LockError {
    #[error("Timed out waiting for bookmark {0}")]
    Timeout(i64),
    #[error("Bookmark lock registry poisoned")]
    Poisoned,
}

/// Registry of bookmarks currently being updated
#[derive(Debug, Default)]
pub struct BookmarkLocks {
    held: Mutex<HashSet<i64>>,
    released: Condvar,
}

impl BookmarkLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the lock for `bookmark_id`, waiting at most `timeout`
    pub fn acquire(&self, bookmark_id: i64, timeout: Duration) -> Result<BookmarkGuard<'_>, LockError> {
        let deadline = Instant::now() + timeout;
        let mut held = self.held.lock().map_err(|_| LockError::Poisoned)?;

        while held.contains(&bookmark_id) {
            let now = Instant::now();
            if now >= deadline {
                return Err(LockError::Timeout(bookmark_id));
            }
            let (guard, _) = self
                .released
                .wait_timeout(held, deadline - now)
                .map_err(|_| LockError::Poisoned)?;
            held = guard;
        }

        held.insert(bookmark_id);
        Ok(BookmarkGuard {
            locks: self,
            bookmark_id,
        })
    }

    /// Whether some caller currently holds the lock
    pub fn is_locked(&self, bookmark_id: i64) -> bool {
        self.held
            .lock()
            .map(|held| held.contains(&bookmark_id))
            .unwrap_or(false)
    }

    fn release(&self, bookmark_id: i64) {
        match self.held.lock() {
            Ok(mut held) => {
                held.remove(&bookmark_id);
            }
            Err(poisoned) => {
                poisoned.into_inner().remove(&bookmark_id);
            }
        }
        self.released.notify_all();
    }
}

/// Releases its bookmark on drop
#[derive(Debug)]
pub struct BookmarkGuard<'a> {
    locks: &'a BookmarkLocks,
    bookmark_id: i64,
}

impl BookmarkGuard<'_> {
    pub fn bookmark_id(&self) -> i64 {
        self.bookmark_id
    }
}

impl Drop for BookmarkGuard<'_> {
    fn drop(&mut self) {
        self.locks.release(self.bookmark_id);
    }
}
