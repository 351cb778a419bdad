//! Test doubles and data factories

mod fixtures;

pub use fixtures::{TestDataFactory, UnavailableStatistics};
