//! Concurrency Journey Tests
//!
//! Several reporters at once:
//! - Reports on one bookmark are serialized and none is lost
//! - Reports on different bookmarks proceed independently
//! - Two services over one database are kept apart by the version check

use chrono::Utc;
use glossa_core::{
    Attempt, BookmarkLifecycle, ExerciseOutcome, ExerciseSource, LifecycleStep, NullSink, RankSignal,
    StorageError, StudyError,
};
use glossa_e2e_tests::TestDatabaseManager;
use std::sync::Arc;
use std::thread;

#[test]
fn test_parallel_reports_on_one_bookmark_are_all_recorded() {
    let db = TestDatabaseManager::new_temp();
    let bookmark = db.add("Hund", "dog", "Der Hund bellt.");

    let handles: Vec<_> = (0..6)
        .map(|_| {
            let service = Arc::clone(&db.service);
            let report = glossa_core::ExerciseReport {
                bookmark_id: bookmark.id,
                outcome: "Correct".to_string(),
                source: "Translate".to_string(),
                solving_speed: "1500".to_string(),
                exercise_id: None,
            };
            thread::spawn(move || service.report_outcome(&report))
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    for result in &results {
        match result {
            Ok(outcome) => assert!(outcome.applied),
            Err(err) => assert!(err.is_retryable(), "unexpected error: {err}"),
        }
    }
    let recorded = results.iter().filter(|r| r.is_ok()).count();

    let stored = db.bookmark(bookmark.id);
    assert_eq!(db.service.exercise_log(bookmark.id).unwrap().len(), recorded);
    assert_eq!(stored.version, bookmark.version + recorded as i64);
    assert_eq!(stored.learned, recorded >= 4);
}

#[test]
fn test_parallel_reports_on_different_bookmarks() {
    let db = TestDatabaseManager::new_temp();
    let bookmarks = db.seed_bookmarks(4);

    let handles: Vec<_> = bookmarks
        .iter()
        .map(|bookmark| {
            let service = Arc::clone(&db.service);
            let id = bookmark.id;
            thread::spawn(move || {
                for _ in 0..4 {
                    service
                        .report_outcome(&glossa_core::ExerciseReport {
                            bookmark_id: id,
                            outcome: "Correct".to_string(),
                            source: "Matching".to_string(),
                            solving_speed: "900".to_string(),
                            exercise_id: None,
                        })
                        .unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    for bookmark in &bookmarks {
        let stored = db.bookmark(bookmark.id);
        assert!(stored.learned);
        assert_eq!(stored.version, bookmark.version + 4);
    }
    assert_eq!(db.service.user_stats(db.user_id()).unwrap().learned, 4);
}

#[test]
fn test_stale_commit_from_another_process_is_rejected() {
    let db = TestDatabaseManager::new_temp();
    let bookmark = db.add("Hund", "dog", "Der Hund bellt.");
    let other = db.second_service();
    let lifecycle = BookmarkLifecycle::new(db.service.config(), Arc::new(NullSink));

    let attempt = |outcome| Attempt {
        id: None,
        outcome,
        source: ExerciseSource::Recognize,
        solving_speed_ms: 1000,
        time: Utc::now(),
    };

    // Both read version 1
    let ours = db.service.storage().load_lifecycle(bookmark.id).unwrap();
    let theirs = other.storage().load_lifecycle(bookmark.id).unwrap();

    let LifecycleStep::Apply(first) =
        lifecycle.advance(ours, &attempt(ExerciseOutcome::Correct), RankSignal::Unranked)
    else {
        panic!("fresh attempt should apply");
    };
    let LifecycleStep::Apply(second) =
        lifecycle.advance(theirs, &attempt(ExerciseOutcome::Wrong), RankSignal::Unranked)
    else {
        panic!("fresh attempt should apply");
    };

    db.service.storage().commit_lifecycle(&first).unwrap();
    let err = other.storage().commit_lifecycle(&second).unwrap_err();
    assert!(matches!(err, StorageError::VersionConflict(id) if id == bookmark.id));
    assert!(StudyError::from(err).is_retryable());

    // The losing write left nothing behind
    let log = db.service.exercise_log(bookmark.id).unwrap();
    assert_eq!(log.len(), 1);
    assert_eq!(log.last().map(|e| e.outcome), Some(ExerciseOutcome::Correct));

    // A fresh report through the other service succeeds
    let retried = other
        .report_outcome(&glossa_core::ExerciseReport {
            bookmark_id: bookmark.id,
            outcome: "Wrong".to_string(),
            source: "Recognize".to_string(),
            solving_speed: "1000".to_string(),
            exercise_id: None,
        })
        .unwrap();
    assert_eq!(retried.bookmark.version, bookmark.version + 2);
}

#[test]
fn test_parallel_services_on_one_database() {
    let db = TestDatabaseManager::new_temp();
    let bookmark = db.add("Hund", "dog", "Der Hund bellt.");
    let services = [Arc::clone(&db.service), db.second_service()];

    let handles: Vec<_> = services
        .into_iter()
        .map(|service| {
            let id = bookmark.id;
            thread::spawn(move || {
                (0..3)
                    .map(|_| {
                        service.report_outcome(&glossa_core::ExerciseReport {
                            bookmark_id: id,
                            outcome: "Wrong".to_string(),
                            source: "Audio".to_string(),
                            solving_speed: "".to_string(),
                            exercise_id: None,
                        })
                    })
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    let results: Vec<_> = handles
        .into_iter()
        .flat_map(|h| h.join().unwrap())
        .collect();
    for result in &results {
        if let Err(err) = result {
            assert!(err.is_retryable(), "unexpected error: {err}");
        }
    }
    let recorded = results.iter().filter(|r| r.is_ok()).count();

    assert!(recorded >= 1);
    assert_eq!(db.service.exercise_log(bookmark.id).unwrap().len(), recorded);
    assert_eq!(db.bookmark(bookmark.id).version, bookmark.version + recorded as i64);
}
