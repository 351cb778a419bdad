//! Study Set Journey Tests
//!
//! What a learner is offered next:
//! - Only fit, unlearned bookmarks
//! - Starred before unstarred, then lowest tier, then least recent
//! - Rare words stay out unless starred
//! - A statistics outage never blocks a bookmark

use glossa_core::{LifecycleEvent, NoWordStatistics, StudyConfig};
use glossa_e2e_tests::{TestDataFactory, TestDatabaseManager, UnavailableStatistics};
use std::sync::Arc;

fn ids(bookmarks: &[glossa_core::Bookmark]) -> Vec<i64> {
    bookmarks.iter().map(|b| b.id).collect()
}

// ============================================================================
// ORDERING
// ============================================================================

#[test]
fn test_study_set_ordering() {
    let db = TestDatabaseManager::new_temp();
    let climbing = db.add("Hund", "dog", "Der Hund bellt.");
    let missed = db.add("Katze", "cat", "Die Katze miaut.");
    let untouched = db.add("Haus", "house", "Das Haus ist alt.");
    let favourite = db.add("Baum", "tree", "Der Baum ist grün.");

    db.report(climbing.id, "Correct");
    db.report(missed.id, "Wrong");
    db.service.set_starred(favourite.id, true).unwrap();

    let set = db.service.study_set(db.user_id(), 10).unwrap();

    assert_eq!(
        ids(&set),
        vec![favourite.id, untouched.id, missed.id, climbing.id]
    );
}

#[test]
fn test_least_recently_practiced_comes_first_within_a_tier() {
    let db = TestDatabaseManager::new_temp();
    let seeded = db.seed_bookmarks(3);
    for bookmark in seeded.iter().rev() {
        db.report(bookmark.id, "Wrong");
    }

    let set = db.service.study_set(db.user_id(), 10).unwrap();

    let expected: Vec<i64> = seeded.iter().rev().map(|b| b.id).collect();
    assert_eq!(ids(&set), expected);
}

#[test]
fn test_study_set_is_capped_and_stable() {
    let db = TestDatabaseManager::new_temp();
    db.seed_bookmarks(12);

    let first = db.service.study_set(db.user_id(), 5).unwrap();
    let second = db.service.study_set(db.user_id(), 5).unwrap();

    assert_eq!(first.len(), 5);
    assert_eq!(ids(&first), ids(&second));
    assert!(db.service.study_set(db.user_id(), 0).unwrap().is_empty());
}

#[test]
fn test_other_users_bookmarks_are_not_offered() {
    let db = TestDatabaseManager::new_temp();
    db.seed_bookmarks(2);

    assert!(db.service.study_set(db.user_id() + 1, 10).unwrap().is_empty());
}

// ============================================================================
// ELIGIBILITY
// ============================================================================

#[test]
fn test_unfit_bookmarks_are_left_out() {
    let db = TestDatabaseManager::new_temp();
    let long_context = db.add("Hund", "dog", &TestDataFactory::context_of(200));
    let same = db.add("Computer", "Computer", "Der Computer ist neu.");
    let phrase = db.add("auf die Nerven gehen", "to annoy", "Du gehst mir auf die Nerven.");
    let fine = db.add("Katze", "cat", "Die Katze miaut.");

    assert!(!long_context.fit_for_study);
    assert!(!same.fit_for_study);
    assert!(!phrase.fit_for_study);

    let set = db.service.study_set(db.user_id(), 10).unwrap();
    assert_eq!(ids(&set), vec![fine.id]);
}

#[test]
fn test_starring_overrides_unfitness() {
    let db = TestDatabaseManager::new_temp();
    let long_context = db.add("Hund", "dog", &TestDataFactory::context_of(200));

    let starred = db.service.set_starred(long_context.id, true).unwrap();
    assert!(starred.fit_for_study);
    assert_eq!(ids(&db.service.study_set(db.user_id(), 10).unwrap()), vec![long_context.id]);

    let unstarred = db.service.set_starred(long_context.id, false).unwrap();
    assert!(!unstarred.fit_for_study);
    assert!(db.service.study_set(db.user_id(), 10).unwrap().is_empty());
}

#[test]
fn test_rare_words_are_left_out() {
    let db = TestDatabaseManager::with_config(
        StudyConfig::default(),
        Arc::new(TestDataFactory::german_frequency_list()),
    );
    let rare = db.add("Querulant", "troublemaker", "Er ist ein Querulant.");
    let common = db.add("Hund", "dog", "Der Hund bellt.");

    assert!(!rare.fit_for_study);
    assert!(common.fit_for_study);

    let view = db.service.bookmark_view(rare.id).unwrap();
    assert_eq!(view.origin_rank, Some(87_000));
    assert_eq!(ids(&db.service.study_set(db.user_id(), 10).unwrap()), vec![common.id]);
}

#[test]
fn test_statistics_outage_keeps_bookmark_fit() {
    let db =
        TestDatabaseManager::with_config(StudyConfig::default(), Arc::new(UnavailableStatistics));

    let bookmark = db.add("Querulant", "troublemaker", "Er ist ein Querulant.");

    assert!(bookmark.fit_for_study);
    assert!(db.events.events().iter().any(|e| matches!(
        e,
        LifecycleEvent::StatisticsUnavailable { bookmark_id, .. } if *bookmark_id == bookmark.id
    )));

    let outcome = db.report(bookmark.id, "Correct");
    assert!(outcome.applied);
}

#[test]
fn test_stricter_context_limit_from_config() {
    let mut config = StudyConfig::default();
    config.fitness.max_context_chars = 10;
    let db = TestDatabaseManager::with_config(config, Arc::new(NoWordStatistics));

    let bookmark = db.add("Hund", "dog", "Der Hund bellt laut.");

    assert!(!bookmark.fit_for_study);
}

#[test]
fn test_re_adding_a_bookmark_keeps_its_history() {
    let db = TestDatabaseManager::new_temp();
    let original = db.add("Hund", "dog", "Der Hund bellt.");
    db.report(original.id, "Correct");

    let again = db.add("Hund", "hound", "Der Hund bellt.");

    assert_eq!(again.id, original.id);
    assert_eq!(again.translation, "hound");
    assert_eq!(db.service.exercise_log(original.id).unwrap().len(), 1);
    assert_eq!(db.service.user_stats(db.user_id()).unwrap().total_bookmarks, 1);
}
