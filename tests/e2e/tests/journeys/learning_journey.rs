//! Learning Journey Tests
//!
//! A bookmark from first lookup to learned and back:
//! - Four correct answers in a row make it learned
//! - A miss in between restarts the count
//! - TooEasy learns immediately
//! - Unlearning returns it to the study pool
//! - Everything survives reopening the database

use chrono::Duration;
use glossa_core::{
    ExerciseOutcome, LifecycleEvent, Phase, Storage, StudyConfig, StudyError, StudyService,
    PIPELINE,
};
use glossa_e2e_tests::{TestDataFactory, TestDatabaseManager};
use std::sync::Arc;

// ============================================================================
// MASTERY
// ============================================================================

#[test]
fn test_four_corrects_make_bookmark_learned() {
    let db = TestDatabaseManager::new_temp();
    let bookmark = db.add("Hund", "dog", "Der Hund schläft im Garten.");
    assert!(bookmark.fit_for_study);

    let outcomes = db.report_many(bookmark.id, &["Correct", "Correct", "Correct"]);
    assert!(outcomes.iter().all(|o| o.applied && !o.bookmark.learned));

    let last = db.report(bookmark.id, "Correct");
    assert!(last.bookmark.learned);
    assert!(last.bookmark.learned_time.is_some());
    assert!(!last.bookmark.fit_for_study, "learned bookmarks leave the study pool");
    assert_eq!(last.schedule.phase, Phase::Graduated);
    assert_eq!(last.schedule.streak, 4);

    let stored = db.bookmark(bookmark.id);
    assert_eq!(stored, last.bookmark);
    assert_eq!(stored.version, bookmark.version + 4);
}

#[test]
fn test_miss_restarts_the_count() {
    let db = TestDatabaseManager::new_temp();
    let bookmark = db.add("Katze", "cat", "Die Katze miaut.");

    db.report_many(
        bookmark.id,
        &["Correct", "Correct", "Correct", "Wrong", "Correct", "Correct", "Correct"],
    );
    assert!(!db.bookmark(bookmark.id).learned);

    let last = db.report(bookmark.id, "Correct");
    assert!(last.bookmark.learned);

    let log = db.service.exercise_log(bookmark.id).unwrap();
    assert_eq!(log.len(), 8);
    assert_eq!(log.consecutive_correct_tail(), 4);
}

#[test]
fn test_too_easy_learns_immediately() {
    let db = TestDatabaseManager::new_temp();
    let bookmark = db.add("Haus", "house", "Das Haus ist alt.");

    let outcome = db.report(bookmark.id, "too easy");

    assert!(outcome.bookmark.learned);
    assert_eq!(outcome.exercise.outcome, ExerciseOutcome::TooEasy);
    assert_eq!(outcome.schedule.phase, Phase::Graduated);
}

#[test]
fn test_learning_is_sticky_without_explicit_unlearn() {
    let db = TestDatabaseManager::new_temp();
    let bookmark = db.add("Baum", "tree", "Der Baum ist grün.");
    db.report_many(bookmark.id, &["Correct"; 4]);

    let after_miss = db.report(bookmark.id, "Wrong");

    assert!(after_miss.bookmark.learned);
    assert_eq!(after_miss.schedule.phase, Phase::WarmingUp);
}

// ============================================================================
// PIPELINE AND EVENTS
// ============================================================================

#[test]
fn test_each_report_runs_the_full_pipeline_in_order() {
    let db = TestDatabaseManager::new_temp();
    let bookmark = db.add("Hund", "dog", "Der Hund bellt.");
    db.events.clear();

    db.report(bookmark.id, "Correct");

    let expected: Vec<&str> = PIPELINE.iter().map(|s| s.as_str()).collect();
    assert_eq!(db.events.stages(), expected);
}

#[test]
fn test_mastery_event_is_emitted_once() {
    let db = TestDatabaseManager::new_temp();
    let bookmark = db.add("Hund", "dog", "Der Hund bellt.");
    db.report_many(bookmark.id, &["Correct"; 4]);

    let mastered = db
        .events
        .events()
        .into_iter()
        .filter(|e| matches!(e, LifecycleEvent::MasteryReached { .. }))
        .count();
    assert_eq!(mastered, 1);
}

// ============================================================================
// IDEMPOTENCY AND ERRORS
// ============================================================================

#[test]
fn test_resent_report_is_recorded_once() {
    let db = TestDatabaseManager::new_temp();
    let bookmark = db.add("Hund", "dog", "Der Hund bellt.");
    let report = TestDataFactory::keyed_report(bookmark.id, "Correct", "client-42");

    let first = db.service.report_outcome(&report).unwrap();
    let second = db.service.report_outcome(&report).unwrap();

    assert!(first.applied);
    assert!(!second.applied);
    assert_eq!(second.exercise.id, "client-42");
    assert_eq!(second.bookmark.version, first.bookmark.version);
    assert_eq!(db.service.exercise_log(bookmark.id).unwrap().len(), 1);

    let json = serde_json::to_value(&second).unwrap();
    assert_eq!(json["applied"], false);
    assert_eq!(json["exercise"]["id"], "client-42");
}

#[test]
fn test_unknown_outcome_changes_nothing() {
    let db = TestDatabaseManager::new_temp();
    let bookmark = db.add("Hund", "dog", "Der Hund bellt.");

    let err = db.try_report(bookmark.id, "Brilliant").unwrap_err();

    assert!(matches!(err, StudyError::InvalidInput(_)));
    assert!(!err.is_retryable());
    assert_eq!(db.bookmark(bookmark.id), bookmark);
    assert!(db.service.exercise_log(bookmark.id).unwrap().is_empty());
}

#[test]
fn test_report_on_missing_bookmark() {
    let db = TestDatabaseManager::new_temp();
    let err = db.try_report(9_999, "Correct").unwrap_err();
    assert!(matches!(err, StudyError::NotFound(_)));
}

// ============================================================================
// UNLEARN
// ============================================================================

#[test]
fn test_unlearn_returns_bookmark_to_study_set() {
    let db = TestDatabaseManager::new_temp();
    let bookmark = db.add("Hund", "dog", "Der Hund bellt.");
    db.report_many(bookmark.id, &["Correct"; 4]);
    assert!(db.service.study_set(db.user_id(), 10).unwrap().is_empty());

    let unlearned = db.service.unlearn(bookmark.id).unwrap();

    assert!(!unlearned.learned);
    assert!(unlearned.learned_time.is_none());
    assert!(unlearned.fit_for_study);
    let set = db.service.study_set(db.user_id(), 10).unwrap();
    assert_eq!(set.iter().map(|b| b.id).collect::<Vec<_>>(), vec![bookmark.id]);
    assert!(db
        .events
        .events()
        .contains(&LifecycleEvent::Unlearned { bookmark_id: bookmark.id }));
}

#[test]
fn test_one_correct_after_unlearn_does_not_relearn() {
    let db = TestDatabaseManager::new_temp();
    let bookmark = db.add("Hund", "dog", "Der Hund bellt.");
    db.report_many(bookmark.id, &["Correct"; 4]);
    db.service.unlearn(bookmark.id).unwrap();
    assert_eq!(db.bookmark(bookmark.id).mastery_baseline, 4);

    let after = db.report(bookmark.id, "Correct");
    assert!(!after.bookmark.learned);
    assert!(after.bookmark.fit_for_study);
    assert_eq!(after.schedule.phase, Phase::Scheduled);
    assert_eq!(after.schedule.streak, 1);

    let outcomes = db.report_many(bookmark.id, &["Correct"; 2]);
    assert!(outcomes.iter().all(|o| !o.bookmark.learned));
    let last = db.report(bookmark.id, "Correct");
    assert!(last.bookmark.learned);
    assert_eq!(last.schedule.phase, Phase::Graduated);
}

#[test]
fn test_relearning_after_unlearn_and_a_miss() {
    let db = TestDatabaseManager::new_temp();
    let bookmark = db.add("Hund", "dog", "Der Hund bellt.");
    db.report_many(bookmark.id, &["Correct"; 4]);
    db.service.unlearn(bookmark.id).unwrap();

    let after_miss = db.report(bookmark.id, "Wrong");
    assert!(!after_miss.bookmark.learned);

    let outcomes = db.report_many(bookmark.id, &["Correct"; 3]);
    assert!(outcomes.iter().all(|o| !o.bookmark.learned));
    assert!(db.report(bookmark.id, "Correct").bookmark.learned);
}

// ============================================================================
// PERSISTENCE
// ============================================================================

#[test]
fn test_state_survives_reopening_the_database() {
    let db = TestDatabaseManager::new_temp();
    let bookmark = db.add("Hund", "dog", "Der Hund bellt.");
    db.report_many(bookmark.id, &["Wrong", "Correct", "Correct", "Correct", "Correct"]);

    let storage = Arc::new(Storage::new(Some(db.path().clone())).unwrap());
    let reopened = StudyService::new(storage, StudyConfig::default()).unwrap();

    let view = reopened.bookmark_view(bookmark.id).unwrap();
    assert!(!view.learned_datetime.is_empty());
    assert_eq!(view.exercise_count, 5);
    assert_eq!(view.phase.as_deref(), Some("graduated"));

    let log = reopened.exercise_log(bookmark.id).unwrap();
    let outcomes: Vec<ExerciseOutcome> = log.iter().map(|e| e.outcome).collect();
    assert_eq!(outcomes[0], ExerciseOutcome::Wrong);
    assert!(log.iter().zip(log.iter().skip(1)).all(|(a, b)| a.time <= b.time));
}

#[test]
fn test_correctness_window_and_stats() {
    let db = TestDatabaseManager::new_temp();
    let bookmark = db.add("Hund", "dog", "Der Hund bellt.");
    db.report_many(bookmark.id, &["Correct", "Wrong", "Correct"]);

    let now = chrono::Utc::now();
    let counts = db
        .service
        .exercise_correctness(db.user_id(), now - Duration::hours(1), now + Duration::hours(1))
        .unwrap();
    assert_eq!(counts.get(&ExerciseOutcome::Correct), Some(&2));
    assert_eq!(counts.get(&ExerciseOutcome::Wrong), Some(&1));

    let stats = db.service.user_stats(db.user_id()).unwrap();
    assert_eq!(stats.total_bookmarks, 1);
    assert_eq!(stats.total_exercises, 3);
    assert_eq!(stats.correct_exercises, 2);
    assert_eq!(stats.learned, 0);
}
