//! Mastery Evaluator
//!
//! Decides from an exercise log alone whether a bookmark has been learned:
//!
//! - `corrects_in_a_row` trailing successes (default 4), where `TooEasy`
//!   counts as a strong `Correct`, or
//! - a trailing `TooEasy` when the policy allows it.
//!
//! The decision only ever moves forward. Applying a `StillLearning` verdict
//! to a learned bookmark changes nothing; un-learning is a separate,
//! explicit operation on the service. After an unlearn only exercises past
//! the bookmark's `mastery_baseline` count, the same run the review
//! scheduler restarts its streak from.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

use crate::bookmark::Bookmark;
use crate::config::MasteryPolicy;
use crate::events::{EventSink, LifecycleEvent};
use crate::exercise::{ExerciseLog, ExerciseOutcome};

/// Verdict for one log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Mastery {
    StillLearning,
    /// Learned at the time of the exercise that completed the streak
    Learned { at: DateTime<Utc> },
}

impl Mastery {
    pub fn is_learned(&self) -> bool {
        matches!(self, Mastery::Learned { .. })
    }
}

/// Pure log → mastery function with an injected event sink
pub struct MasteryEvaluator {
    policy: MasteryPolicy,
    events: Arc<dyn EventSink>,
}

impl MasteryEvaluator {
    pub fn new(policy: MasteryPolicy, events: Arc<dyn EventSink>) -> Self {
        Self { policy, events }
    }

    /// Evaluate the whole log. Same log, same verdict.
    pub fn evaluate(&self, log: &ExerciseLog) -> Mastery {
        self.evaluate_since(log, 0)
    }

    /// Evaluate only the exercises at log position `baseline` or later
    pub fn evaluate_since(&self, log: &ExerciseLog, baseline: usize) -> Mastery {
        let mastery = self.verdict(log, baseline);

        let summary = log.summary();
        let event = match mastery {
            Mastery::Learned { at } => LifecycleEvent::MasteryReached {
                bookmark_id: log.bookmark_id(),
                learned_at: at,
                summary,
            },
            Mastery::StillLearning => LifecycleEvent::StillLearning {
                bookmark_id: log.bookmark_id(),
                summary,
            },
        };
        self.events.emit(event);

        mastery
    }

    fn verdict(&self, log: &ExerciseLog, baseline: usize) -> Mastery {
        let Some(last) = log.last() else {
            return Mastery::StillLearning;
        };
        if log.len() <= baseline {
            return Mastery::StillLearning;
        }

        let streak_complete =
            log.success_tail_since(baseline) >= self.policy.corrects_in_a_row as usize;
        let too_easy_override =
            self.policy.too_easy_is_learned && last.outcome == ExerciseOutcome::TooEasy;

        if streak_complete || too_easy_override {
            Mastery::Learned { at: last.time }
        } else {
            Mastery::StillLearning
        }
    }

    /// Fold a verdict into the bookmark.
    ///
    /// Returns true only on the not-learned → learned transition.
    pub fn apply(bookmark: &mut Bookmark, mastery: Mastery) -> bool {
        match mastery {
            Mastery::Learned { at } if !bookmark.learned => {
                bookmark.learned = true;
                bookmark.learned_time = Some(at);
                bookmark.fit_for_study = false;
                true
            }
            _ => false,
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
