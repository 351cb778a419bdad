//! Test Data Factory
//!
//! Provides realistic collaborators and data for journey tests:
//! - A small frequency list with common and very rare words
//! - A word statistics provider that always fails
//! - Reports with client-supplied idempotency keys

use glossa_core::{ExerciseReport, FrequencyList, StatsError, WordStatistics};

/// Factory for creating test data
pub struct TestDataFactory;

impl TestDataFactory {
    /// German frequency list: common words plus one extremely rare word
    pub fn german_frequency_list() -> FrequencyList {
        let tsv = "\
# language\tterm\trank
de\tHund\t812
de\tKatze\t1404
de\tHaus\t160
de\tBaum\t2210
de\tQuerulant\t87000
";
        FrequencyList::parse(tsv).expect("fixture frequency list is well-formed")
    }

    /// A report carrying a client idempotency key
    pub fn keyed_report(bookmark_id: i64, outcome: &str, key: &str) -> ExerciseReport {
        ExerciseReport {
            bookmark_id,
            outcome: outcome.to_string(),
            source: "Multiple choice".to_string(),
            solving_speed: "3100".to_string(),
            exercise_id: Some(key.to_string()),
        }
    }

    /// A context of `chars` characters
    pub fn context_of(chars: usize) -> String {
        "Das ist ein langer Satz. ".chars().cycle().take(chars).collect()
    }
}

/// Statistics backend that is always down
#[derive(Debug, Default)]
pub struct UnavailableStatistics;

impl WordStatistics for UnavailableStatistics {
    fn rank(&self, _term: &str, _language: &str) -> Result<Option<u32>, StatsError> {
        Err(StatsError::Unavailable("statistics service timed out".to_string()))
    }
}
