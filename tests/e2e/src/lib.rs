//! Glossa end-to-end test support
//!
//! Harness and fixtures shared by the journey tests under `tests/`.

pub mod harness;
pub mod mocks;

pub use harness::TestDatabaseManager;
pub use mocks::{TestDataFactory, UnavailableStatistics};
