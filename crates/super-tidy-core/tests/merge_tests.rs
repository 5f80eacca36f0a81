use std::sync::Arc;
use std::thread;

use chrono::{TimeZone, Utc};

use super_tidy_core::model::{Label, LabelKind, MergeSuggestion, ReferenceId, SimilarityBasis};
use super_tidy_core::oracle::Oracle;
use super_tidy_core::storage::{Database, MemoryStore, RecordStore};
use super_tidy_core::{EngineConfig, MergeError, MergeExecutor, SimilarityEngine};

fn at(secs: i64) -> chrono::DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).unwrap()
}

fn suggestion(source: &Label, target: &Label) -> MergeSuggestion {
    MergeSuggestion {
        source: source.clone(),
        target: target.clone(),
        score: 1.0,
        basis: SimilarityBasis::ExactCaseFold,
        rationale: String::new(),
    }
}

/// "Report" on references 1..=3 and "report" on 3 and 4.
fn report_store() -> (Arc<MemoryStore>, Label, Label) {
    let store = Arc::new(MemoryStore::new());
    let upper = store.insert_label(LabelKind::Tag, "Report", 3, at(100));
    let lower = store.insert_label(LabelKind::Tag, "report", 2, at(200));
    for r in 1..=3 {
        store.link(ReferenceId(r), upper.id);
    }
    for r in 3..=4 {
        store.link(ReferenceId(r), lower.id);
    }
    (store, upper, lower)
}

#[test]
fn test_merge_repoints_unlinks_and_aggregates_usage() {
    let (store, upper, lower) = report_store();
    let executor = MergeExecutor::new(store.clone());

    let outcome = executor.execute(&suggestion(&lower, &upper));

    assert!(outcome.success, "{:?}", outcome.error);
    // Reference 3 already carried the target, so only 4 moves.
    assert_eq!(outcome.affected_references, 1);
    assert_eq!(store.label(lower.id).unwrap(), None);

    let survivor = store.label(upper.id).unwrap().unwrap();
    assert_eq!(survivor.usage_count, 5);
    assert_eq!(
        store.references_of(upper.id).unwrap(),
        (1..=4).map(ReferenceId).collect::<Vec<_>>()
    );
    assert_eq!(store.labels_of(ReferenceId(3)), vec![upper.id]);
}

#[test]
fn test_running_a_suggestion_twice_is_stale_not_corrupting() {
    let (store, upper, lower) = report_store();
    let executor = MergeExecutor::new(store.clone());
    let s = suggestion(&lower, &upper);

    assert!(executor.execute(&s).success);
    let second = executor.execute(&s);

    assert!(!second.success);
    assert_eq!(second.affected_references, 0);
    assert_eq!(second.error, Some(MergeError::StaleSuggestion(lower.id)));
    assert_eq!(store.label(upper.id).unwrap().unwrap().usage_count, 5);
}

#[test]
fn test_missing_target_leaves_source_untouched() {
    let (store, upper, lower) = report_store();
    for reference in store.references_of(upper.id).unwrap() {
        store.unlink(reference, upper.id).unwrap();
    }
    store.delete(upper.id).unwrap();
    let executor = MergeExecutor::new(store.clone());

    let outcome = executor.execute(&suggestion(&lower, &upper));

    assert_eq!(outcome.error, Some(MergeError::StaleSuggestion(upper.id)));
    let source = store.label(lower.id).unwrap().unwrap();
    assert_eq!(source.usage_count, 2);
    assert_eq!(store.references_of(lower.id).unwrap().len(), 2);
}

#[test]
fn test_self_merge_is_rejected() {
    let (store, upper, _) = report_store();
    let executor = MergeExecutor::new(store.clone());

    let outcome = executor.execute(&suggestion(&upper, &upper));

    assert_eq!(outcome.error, Some(MergeError::SelfMerge(upper.id)));
    assert!(store.label(upper.id).unwrap().is_some());
}

#[test]
fn test_kind_mismatch_is_rejected() {
    let store = Arc::new(MemoryStore::new());
    let tag = store.insert_label(LabelKind::Tag, "travel", 1, at(1));
    let folder = store.insert_label(LabelKind::Folder { parent: None }, "Travel", 1, at(2));
    let executor = MergeExecutor::new(store.clone());

    let outcome = executor.execute(&suggestion(&tag, &folder));

    assert_eq!(outcome.error, Some(MergeError::KindMismatch(tag.id, folder.id)));
    assert!(store.label(tag.id).unwrap().is_some());
}

#[test]
fn test_usage_count_saturates() {
    let store = Arc::new(MemoryStore::new());
    let a = store.insert_label(LabelKind::Tag, "a", u64::MAX, at(1));
    let b = store.insert_label(LabelKind::Tag, "A", 7, at(2));
    let executor = MergeExecutor::new(store.clone());

    assert!(executor.execute(&suggestion(&b, &a)).success);
    assert_eq!(store.label(a.id).unwrap().unwrap().usage_count, u64::MAX);
}

#[test]
fn test_concurrent_identical_suggestions_succeed_exactly_once() {
    let (store, upper, lower) = report_store();
    let executor = Arc::new(MergeExecutor::new(store.clone()));
    let s = suggestion(&lower, &upper);

    let outcomes: Vec<_> = thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let executor = Arc::clone(&executor);
                let s = s.clone();
                scope.spawn(move || executor.execute(&s))
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert_eq!(outcomes.iter().filter(|o| o.success).count(), 1);
    assert!(outcomes
        .iter()
        .filter(|o| !o.success)
        .all(|o| o.error == Some(MergeError::StaleSuggestion(lower.id))));
    assert_eq!(store.label(upper.id).unwrap().unwrap().usage_count, 5);
}

#[test]
fn test_disjoint_merges_all_complete_concurrently() {
    let store = Arc::new(MemoryStore::new());
    let mut pairs = Vec::new();
    for i in 0..16 {
        let target = store.insert_label(LabelKind::Tag, &format!("Topic{}", i), 2, at(i));
        let source = store.insert_label(LabelKind::Tag, &format!("topic{}", i), 1, at(i + 100));
        store.link(ReferenceId(i), target.id);
        store.link(ReferenceId(i + 1000), source.id);
        pairs.push(suggestion(&source, &target));
    }
    let executor = Arc::new(MergeExecutor::new(store.clone()));

    let outcomes: Vec<_> = thread::scope(|scope| {
        let handles: Vec<_> = pairs
            .iter()
            .map(|s| {
                let executor = Arc::clone(&executor);
                scope.spawn(move || executor.execute(s))
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert!(outcomes.iter().all(|o| o.success && o.affected_references == 1));
    assert_eq!(store.all_labels(&LabelKind::Tag).unwrap().len(), 16);
}

#[test]
fn test_suggest_then_merge_against_sqlite() {
    let db = Arc::new(Database::open_in_memory().unwrap());
    let files: Vec<i64> = (1..=4)
        .map(|i| db.upsert_file(&format!("/docs/{}.pdf", i), 10, 0).unwrap())
        .collect();
    let upper = db.get_or_create_label(&LabelKind::Tag, "Report").unwrap();
    let lower = db.get_or_create_label(&LabelKind::Tag, "report").unwrap();
    for f in &files[0..3] {
        db.attach_label(*f, upper.id).unwrap();
    }
    for f in &files[2..4] {
        db.attach_label(*f, lower.id).unwrap();
    }

    let engine = SimilarityEngine::new(EngineConfig::default()).unwrap();
    let suggestions = engine
        .suggest_label_merges(db.as_ref(), &LabelKind::Tag, &Oracle::Disabled)
        .unwrap();
    assert_eq!(suggestions.len(), 1);
    assert_eq!(suggestions[0].target.id, upper.id);
    assert_eq!(suggestions[0].source.id, lower.id);

    let executor = MergeExecutor::new(db.clone());
    let outcome = executor.execute(&suggestions[0]);
    assert!(outcome.success, "{:?}", outcome.error);
    assert_eq!(outcome.affected_references, 1);

    let survivor = db.label(upper.id).unwrap().unwrap();
    assert_eq!(survivor.usage_count, 5);
    assert_eq!(db.references_of(upper.id).unwrap().len(), 4);
    assert_eq!(db.label(lower.id).unwrap(), None);
    assert_eq!(db.get_label_count().unwrap(), 1);

    let again = executor.execute(&suggestions[0]);
    assert_eq!(again.error, Some(MergeError::StaleSuggestion(lower.id)));
}

fn race_reversed_pair<S: RecordStore>(store: &Arc<S>, upper: &Label, lower: &Label) -> Vec<bool> {
    let first = MergeExecutor::new(Arc::clone(store));
    let second = MergeExecutor::new(Arc::clone(store));
    let forward = suggestion(lower, upper);
    let backward = suggestion(upper, lower);

    let outcomes: Vec<_> = thread::scope(|scope| {
        let a = scope.spawn(|| first.execute(&forward));
        let b = scope.spawn(|| second.execute(&backward));
        vec![a.join().unwrap(), b.join().unwrap()]
    });

    for o in outcomes.iter().filter(|o| !o.success) {
        assert!(
            o.error == Some(MergeError::StaleSuggestion(upper.id))
                || o.error == Some(MergeError::StaleSuggestion(lower.id)),
            "{:?}",
            o.error
        );
    }
    outcomes.iter().map(|o| o.success).collect()
}

#[test]
fn test_separate_executors_serialize_reversed_pair() {
    for _ in 0..32 {
        let (store, upper, lower) = report_store();

        let results = race_reversed_pair(&store, &upper, &lower);

        assert_eq!(results.iter().filter(|ok| **ok).count(), 1);
        let survivors: Vec<Label> = store.all_labels(&LabelKind::Tag).unwrap();
        assert_eq!(survivors.len(), 1);
        let survivor = &survivors[0];
        assert_eq!(survivor.usage_count, 5);
        assert_eq!(
            store.references_of(survivor.id).unwrap(),
            (1..=4).map(ReferenceId).collect::<Vec<_>>()
        );
    }
}

#[test]
fn test_separate_executors_serialize_reversed_pair_on_sqlite() {
    for _ in 0..8 {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let files: Vec<i64> = (1..=4)
            .map(|i| db.upsert_file(&format!("/race/{}.txt", i), 1, 0).unwrap())
            .collect();
        let upper = db.get_or_create_label(&LabelKind::Tag, "Draft").unwrap();
        let lower = db.get_or_create_label(&LabelKind::Tag, "draft").unwrap();
        for f in &files[0..3] {
            db.attach_label(*f, upper.id).unwrap();
        }
        for f in &files[2..4] {
            db.attach_label(*f, lower.id).unwrap();
        }

        let results = race_reversed_pair(&db, &upper, &lower);

        assert_eq!(results.iter().filter(|ok| **ok).count(), 1);
        assert_eq!(db.get_label_count().unwrap(), 1);
        let survivor = &db.all_labels(&LabelKind::Tag).unwrap()[0];
        assert_eq!(survivor.usage_count, 5);
        assert_eq!(db.references_of(survivor.id).unwrap().len(), 4);
    }
}
