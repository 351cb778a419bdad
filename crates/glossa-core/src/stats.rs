//! Word statistics
//!
//! Corpus frequency ranks for origin terms. The provider is an optional
//! collaborator: when it fails, fitness degrades to "fit" instead of
//! blocking study.

use std::collections::HashMap;
use std::path::Path;

/// Word statistics provider error
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum StatsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Malformed frequency list line {line}: {reason}")]
    Malformed { line: usize, reason: String },
    #[error("Statistics backend unavailable: {0}")]
    Unavailable(String),
}

/// Frequency rank lookup, 1 = most frequent
pub trait WordStatistics: Send + Sync {
    /// `Ok(None)` when the term is not in the corpus
    fn rank(&self, term: &str, language: &str) -> Result<Option<u32>, StatsError>;
}

/// What the eligibility evaluator knows about an origin's rarity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RankSignal {
    /// Corpus rank of the term
    Ranked(u32),
    /// Term not in the corpus
    Unranked,
    /// Provider failed
    Unavailable,
}

impl RankSignal {
    pub fn rank(&self) -> Option<u32> {
        match self {
            RankSignal::Ranked(rank) => Some(*rank),
            _ => None,
        }
    }
}

// ============================================================================
// PROVIDERS
// ============================================================================

/// Provider that knows no words
#[derive(Debug, Default, Clone, Copy)]
pub struct NoWordStatistics;

impl WordStatistics for NoWordStatistics {
    fn rank(&self, _term: &str, _language: &str) -> Result<Option<u32>, StatsError> {
        Ok(None)
    }
}

/// In-memory frequency list keyed by (language, lowercased term)
#[derive(Debug, Default, Clone)]
pub struct FrequencyList {
    ranks: HashMap<(String, String), u32>,
}

impl FrequencyList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace one entry
    pub fn insert(&mut self, language: &str, term: &str, rank: u32) {
        self.ranks
            .insert((language.to_lowercase(), term.to_lowercase()), rank);
    }

    pub fn len(&self) -> usize {
        self.ranks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranks.is_empty()
    }

    /// Parse `language<TAB>term<TAB>rank` lines. Blank lines and `#` comments are skipped.
    pub fn parse(contents: &str) -> Result<Self, StatsError> {
        let mut list = Self::new();
        for (idx, line) in contents.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let fields: Vec<&str> = line.split('\t').collect();
            let [language, term, rank] = fields.as_slice() else {
                return Err(StatsError::Malformed {
                    line: idx + 1,
                    reason: format!("expected 3 tab-separated fields, got {}", fields.len()),
                });
            };
            let rank: u32 = rank.trim().parse().map_err(|_| StatsError::Malformed {
                line: idx + 1,
                reason: format!("rank '{}' is not a number", rank),
            })?;
            list.insert(language.trim(), term.trim(), rank);
        }
        Ok(list)
    }

    /// Load a TSV frequency list from disk
    pub fn load(path: &Path) -> Result<Self, StatsError> {
        let contents = std::fs::read_to_string(path)?;
        let list = Self::parse(&contents)?;
        tracing::info!(path = %path.display(), entries = list.len(), "Loaded frequency list");
        Ok(list)
    }
}

impl WordStatistics for FrequencyList {
    fn rank(&self, term: &str, language: &str) -> Result<Option<u32>, StatsError> {
        Ok(self
            .ranks
            .get(&(language.to_lowercase(), term.trim().to_lowercase()))
            .copied())
    }
}

/// Ask the provider, folding failures into `RankSignal::Unavailable`.
///
/// The error is returned alongside so the caller can report it.
pub fn rank_signal(
    provider: &dyn WordStatistics,
    term: &str,
    language: &str,
) -> (RankSignal, Option<StatsError>) {
    match provider.rank(term, language) {
        Ok(Some(rank)) => (RankSignal::Ranked(rank), None),
        Ok(None) => (RankSignal::Unranked, None),
        Err(e) => (RankSignal::Unavailable, Some(e)),
    }
}
