//! Outcome and source vocabularies
//!
//! Both enums are closed: new kinds are added as new members, never as
//! free text. Parsing accepts the display name ("Too easy") as well as the
//! snake_case name ("too_easy"), case-insensitively.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

// ============================================================================
// EXERCISE OUTCOME
// ============================================================================

/// Result of one attempt at recalling a bookmark
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExerciseOutcome {
    /// Solved on the first try
    Correct,
    /// Wrong answer
    Wrong,
    /// Almost right, misspelled
    Typo,
    /// Solved after one or more retries
    Retry,
    /// Learner says the word is trivial for them
    TooEasy,
    /// Learner gave up and looked at the answer
    ShowSolution,
    /// Learner asked for a hint before answering
    AskedForHint,
}

impl ExerciseOutcome {
    /// Every member, in declaration order
    pub const ALL: [ExerciseOutcome; 7] = [
        ExerciseOutcome::Correct,
        ExerciseOutcome::Wrong,
        ExerciseOutcome::Typo,
        ExerciseOutcome::Retry,
        ExerciseOutcome::TooEasy,
        ExerciseOutcome::ShowSolution,
        ExerciseOutcome::AskedForHint,
    ];

    /// Storage / wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            ExerciseOutcome::Correct => "correct",
            ExerciseOutcome::Wrong => "wrong",
            ExerciseOutcome::Typo => "typo",
            ExerciseOutcome::Retry => "retry",
            ExerciseOutcome::TooEasy => "too_easy",
            ExerciseOutcome::ShowSolution => "show_solution",
            ExerciseOutcome::AskedForHint => "asked_for_hint",
        }
    }

    /// Name shown to learners and operators
    pub fn display_name(&self) -> &'static str {
        match self {
            ExerciseOutcome::Correct => "Correct",
            ExerciseOutcome::Wrong => "Wrong",
            ExerciseOutcome::Typo => "Typo",
            ExerciseOutcome::Retry => "Retry",
            ExerciseOutcome::TooEasy => "Too easy",
            ExerciseOutcome::ShowSolution => "Show solution",
            ExerciseOutcome::AskedForHint => "Asked for hint",
        }
    }

    /// Only `Correct` extends a streak.
    #[inline]
    pub fn is_correct(&self) -> bool {
        matches!(self, ExerciseOutcome::Correct)
    }

    /// Outcomes that send a bookmark back to the shortest interval.
    #[inline]
    pub fn is_miss(&self) -> bool {
        !matches!(self, ExerciseOutcome::Correct | ExerciseOutcome::TooEasy)
    }
}

impl std::fmt::Display for ExerciseOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

impl FromStr for ExerciseOutcome {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = normalize(s);
        ExerciseOutcome::ALL
            .into_iter()
            .find(|o| o.as_str() == normalized)
            .ok_or_else(|| format!("Unknown exercise outcome: {}", s))
    }
}

// ============================================================================
// EXERCISE SOURCE
// ============================================================================

/// Exercise modality that produced an outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExerciseSource {
    /// Pick the translation of a highlighted word in context
    Recognize,
    /// Choose among several candidate translations
    MultipleChoice,
    /// Type the translation
    Translate,
    /// Match origin/translation pairs
    Matching,
    /// Listen and pick or type the word
    Audio,
    /// Spell the origin word from its translation
    Spelling,
}

impl ExerciseSource {
    /// Every member, in declaration order
    pub const ALL: [ExerciseSource; 6] = [
        ExerciseSource::Recognize,
        ExerciseSource::MultipleChoice,
        ExerciseSource::Translate,
        ExerciseSource::Matching,
        ExerciseSource::Audio,
        ExerciseSource::Spelling,
    ];

    /// Storage / wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            ExerciseSource::Recognize => "recognize",
            ExerciseSource::MultipleChoice => "multiple_choice",
            ExerciseSource::Translate => "translate",
            ExerciseSource::Matching => "matching",
            ExerciseSource::Audio => "audio",
            ExerciseSource::Spelling => "spelling",
        }
    }
}

impl std::fmt::Display for ExerciseSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ExerciseSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = normalize(s);
        ExerciseSource::ALL
            .into_iter()
            .find(|src| src.as_str() == normalized)
            .ok_or_else(|| format!("Unknown exercise source: {}", s))
    }
}

/// "Too easy", "too-easy" and "TOO_EASY" all become "too_easy"
fn normalize(s: &str) -> String {
    s.trim()
        .chars()
        .map(|c| match c {
            ' ' | '-' => '_',
            c => c.to_ascii_lowercase(),
        })
        .collect()
}

// ============================================================================
// TESTS
// ============================================================================
