//! Study Eligibility Evaluator
//!
//! `fit_for_study = (starred || passes_default_fitness) && !learned`
//!
//! Default fitness rejects bookmarks that make poor flashcards: long
//! contexts, long origin phrases, "translations" identical to the origin,
//! and words the corpus ranks as very rare. An unknown word or an
//! unavailable statistics provider never blocks study.

use serde::Serialize;
use std::sync::Arc;

use crate::bookmark::Bookmark;
use crate::config::FitnessPolicy;
use crate::events::{EventSink, LifecycleEvent};
use crate::stats::RankSignal;

/// Everything the evaluator looks at
#[derive(Debug, Clone, PartialEq)]
pub struct StudySnapshot {
    pub bookmark_id: i64,
    pub starred: bool,
    pub learned: bool,
    pub context_chars: usize,
    pub origin: String,
    pub translation: String,
    pub rank: RankSignal,
}

impl StudySnapshot {
    pub fn of(bookmark: &Bookmark, rank: RankSignal) -> Self {
        Self {
            bookmark_id: bookmark.id,
            starred: bookmark.starred,
            learned: bookmark.learned,
            context_chars: bookmark.context_chars(),
            origin: bookmark.origin.clone(),
            translation: bookmark.translation.clone(),
            rank,
        }
    }
}

/// Why a bookmark is or is not fit for study
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FitnessReason {
    Learned,
    Starred,
    Fit,
    ContextTooLong,
    SameAsTranslation,
    OriginTooLong,
    OriginTooRare,
}

impl FitnessReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            FitnessReason::Learned => "learned",
            FitnessReason::Starred => "starred",
            FitnessReason::Fit => "fit",
            FitnessReason::ContextTooLong => "context_too_long",
            FitnessReason::SameAsTranslation => "same_as_translation",
            FitnessReason::OriginTooLong => "origin_too_long",
            FitnessReason::OriginTooRare => "origin_too_rare",
        }
    }

    pub fn is_fit(&self) -> bool {
        matches!(self, FitnessReason::Starred | FitnessReason::Fit)
    }
}

/// Pure snapshot → eligibility function with an injected event sink
pub struct StudyEligibilityEvaluator {
    policy: FitnessPolicy,
    events: Arc<dyn EventSink>,
}

impl StudyEligibilityEvaluator {
    pub fn new(policy: FitnessPolicy, events: Arc<dyn EventSink>) -> Self {
        Self { policy, events }
    }

    /// Whether the bookmark should be shown in study sessions
    pub fn evaluate(&self, snapshot: &StudySnapshot) -> bool {
        let reason = self.explain(snapshot);
        self.events.emit(LifecycleEvent::FitnessEvaluated {
            bookmark_id: snapshot.bookmark_id,
            fit_for_study: reason.is_fit(),
            reason: reason.as_str(),
        });
        reason.is_fit()
    }

    /// The deciding rule, without emitting anything
    pub fn explain(&self, snapshot: &StudySnapshot) -> FitnessReason {
        if snapshot.learned {
            return FitnessReason::Learned;
        }
        if snapshot.starred {
            return FitnessReason::Starred;
        }
        self.default_fitness(snapshot)
    }

    fn default_fitness(&self, snapshot: &StudySnapshot) -> FitnessReason {
        if snapshot.context_chars >= self.policy.max_context_chars {
            return FitnessReason::ContextTooLong;
        }

        let origin = snapshot.origin.trim();
        if origin.to_lowercase() == snapshot.translation.trim().to_lowercase() {
            return FitnessReason::SameAsTranslation;
        }
        if origin.split_whitespace().count() > self.policy.max_origin_words {
            return FitnessReason::OriginTooLong;
        }

        if let (RankSignal::Ranked(rank), Some(max_rank)) =
            (snapshot.rank, self.policy.max_origin_rank)
        {
            if rank > max_rank {
                return FitnessReason::OriginTooRare;
            }
        }

        FitnessReason::Fit
    }
}

// ============================================================================
// TESTS
// ============================================================================
