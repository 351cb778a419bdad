//! BasicSR - streak-driven interval tiers
//!
//! - `Correct`: streak + 1, one tier up; graduates at the mastery threshold
//! - `TooEasy`: graduates directly, or skips tiers when configured not to
//! - anything else: streak reset, `warming-up`, tier 0

use crate::config::ScheduleConfig;
use crate::exercise::{Exercise, ExerciseOutcome};

use super::{Phase, ReviewScheduler, ScheduleState, ScheduleUpdate};

/// Tiered scheduler
#[derive(Debug, Clone)]
pub struct BasicSR {
    config: ScheduleConfig,
    mastery_threshold: u32,
}

impl BasicSR {
    pub fn new(config: ScheduleConfig, mastery_threshold: u32) -> Self {
        Self {
            config,
            mastery_threshold,
        }
    }

    pub fn config(&self) -> &ScheduleConfig {
        &self.config
    }

    fn graduate(&self, state: &mut ScheduleState) {
        state.phase = Phase::Graduated;
        state.tier = self.config.top_tier();
    }

    fn advance(&self, state: &mut ScheduleState, tiers: usize) {
        state.tier = (state.tier + tiers).min(self.config.top_tier());
        if state.phase != Phase::Graduated {
            state.phase = Phase::Scheduled;
        }
    }

    fn transition(&self, state: &mut ScheduleState, outcome: ExerciseOutcome) {
        match outcome {
            ExerciseOutcome::Correct => {
                state.streak += 1;
                if state.streak >= self.mastery_threshold {
                    self.graduate(state);
                } else {
                    self.advance(state, 1);
                }
            }
            ExerciseOutcome::TooEasy => {
                if self.config.too_easy_graduates {
                    state.streak = state.streak.max(self.mastery_threshold);
                    self.graduate(state);
                } else {
                    state.streak += 1;
                    if state.streak >= self.mastery_threshold {
                        self.graduate(state);
                    } else {
                        self.advance(state, self.config.too_easy_tier_skip.max(1));
                    }
                }
            }
            ExerciseOutcome::Wrong
            | ExerciseOutcome::Typo
            | ExerciseOutcome::Retry
            | ExerciseOutcome::ShowSolution
            | ExerciseOutcome::AskedForHint => {
                state.streak = 0;
                state.tier = 0;
                state.phase = Phase::WarmingUp;
            }
        }
    }
}

impl ReviewScheduler for BasicSR {
    fn update(&self, state: Option<ScheduleState>, exercise: &Exercise) -> ScheduleUpdate {
        let mut state =
            state.unwrap_or_else(|| ScheduleState::new(exercise.bookmark_id, exercise.time));

        if state.last_exercise_id.as_deref() == Some(exercise.id.as_str()) {
            return ScheduleUpdate {
                state,
                applied: false,
            };
        }

        self.transition(&mut state, exercise.outcome);

        let interval = self.config.interval_minutes(state.tier);
        state.next_due = ScheduleState::due_after(exercise.time, interval);
        state.last_exercise_id = Some(exercise.id.clone());
        state.updated_at = exercise.time;

        ScheduleUpdate {
            state,
            applied: true,
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
