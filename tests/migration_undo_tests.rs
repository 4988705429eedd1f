//! End-to-end runs: plan -> journaled run -> undo.

use migrundo::{
    ActionStatus, DocumentStore, JournalStore, MemoryStore, MigrateError, MigrationPlan, Migrator,
    PlannedOp, UndoEngine,
};
use serde_json::json;
use serde_json::Value;
use tempfile::TempDir;

fn insert_op(collection: &str, document: Value) -> PlannedOp {
    PlannedOp::Insert {
        collection: collection.to_string(),
        document,
    }
}

fn update_op(collection: &str, filter: Value, update: Value) -> PlannedOp {
    PlannedOp::Update {
        collection: collection.to_string(),
        filter,
        update,
    }
}

/// Scenario A: one inserted document; undo deletes exactly it and the
/// collection count returns to its pre-run value.
#[test]
fn undo_deletes_exactly_the_inserted_document() {
    let journal_dir = TempDir::new().unwrap();
    let store = MemoryStore::new();
    store.insert("y", json!({"_id": "existing"})).unwrap();

    let plan = MigrationPlan::new(vec![insert_op("y", json!({"name": "Alice"}))]);
    let run = Migrator::new(&store, journal_dir.path(), false)
        .run(&plan)
        .unwrap();
    assert_eq!(store.count("y").unwrap(), 2);

    let engine = UndoEngine::new(&store, JournalStore::new(journal_dir.path()));
    let summary = engine.undo(&run.tag, None).unwrap();
    assert_eq!(summary.undone, 1);
    assert_eq!(summary.failed, 0);

    assert_eq!(store.count("y").unwrap(), 1);
    let remaining = store.find("y", &json!({})).unwrap();
    assert_eq!(remaining[0]["_id"], json!("existing"));
}

/// Scenario B: three matched documents updated with `$set`; undo
/// restores each to its original content in every field, including
/// the original value of the touched field and the absence of the
/// added one.
#[test]
fn undo_restores_updated_documents_field_for_field() {
    let journal_dir = TempDir::new().unwrap();
    let store = MemoryStore::new();
    let originals: Vec<Value> = (1..=3)
        .map(|i| {
            json!({
                "_id": format!("d{i}"),
                "status": "old",
                "score": i,
                "createdAt": "2020-01-01T00:00:00Z",
            })
        })
        .collect();
    for doc in &originals {
        store.insert("z", doc.clone()).unwrap();
    }

    let plan = MigrationPlan::new(vec![update_op(
        "z",
        json!({"status": "old"}),
        json!({"$set": {"status": "new", "updatedAt": "2026-08-30T12:00:00Z"}}),
    )]);
    let run = Migrator::new(&store, journal_dir.path(), false)
        .run(&plan)
        .unwrap();

    assert_eq!(run.actions.len(), 3);
    for (action, original) in run.actions.iter().zip(&originals) {
        assert_eq!(action.status, ActionStatus::Success);
        assert_eq!(action.previous.as_ref(), Some(original));
    }
    assert_eq!(store.find("z", &json!({"status": "new"})).unwrap().len(), 3);

    let engine = UndoEngine::new(&store, JournalStore::new(journal_dir.path()));
    let summary = engine.undo(&run.tag, None).unwrap();
    assert_eq!(summary.undone, 3);

    let restored = store.find("z", &json!({})).unwrap();
    assert_eq!(restored, originals);
    assert!(restored.iter().all(|d| d.get("updatedAt").is_none()));
}

/// Scenario C: undo of a nonexistent tag fails without touching the
/// store.
#[test]
fn undo_of_unknown_tag_fails_without_store_side_effects() {
    let journal_dir = TempDir::new().unwrap();
    let store = MemoryStore::new();
    store.insert("y", json!({"_id": "a"})).unwrap();

    let engine = UndoEngine::new(&store, JournalStore::new(journal_dir.path()));
    let result = engine.undo("20990101T000000000Z", None);
    assert!(matches!(result, Err(MigrateError::MissingJournal(_))));
    assert_eq!(store.count("y").unwrap(), 1);
}

#[test]
fn undo_is_idempotent() {
    let journal_dir = TempDir::new().unwrap();
    let store = MemoryStore::new();
    store
        .insert("z", json!({"_id": "d1", "status": "old", "createdAt": "2020-01-01T00:00:00Z"}))
        .unwrap();

    let plan = MigrationPlan::new(vec![
        insert_op("y", json!({"name": "Alice"})),
        update_op("z", json!({"status": "old"}), json!({"$set": {"status": "new"}})),
    ]);
    let run = Migrator::new(&store, journal_dir.path(), false)
        .run(&plan)
        .unwrap();

    let engine = UndoEngine::new(&store, JournalStore::new(journal_dir.path()));
    engine.undo(&run.tag, None).unwrap();
    let after_first = store.snapshot().unwrap();

    // Second pass: no net change, nothing fatal.
    let summary = engine.undo(&run.tag, None).unwrap();
    assert_eq!(summary.failed, 0);
    assert_eq!(store.snapshot().unwrap(), after_first);
}

#[test]
fn undo_scoped_to_one_identifier_leaves_siblings_mutated() {
    let journal_dir = TempDir::new().unwrap();
    let store = MemoryStore::new();
    for i in 1..=3 {
        store
            .insert("z", json!({"_id": format!("d{i}"), "status": "old"}))
            .unwrap();
    }

    let plan = MigrationPlan::new(vec![update_op(
        "z",
        json!({"status": "old"}),
        json!({"$set": {"status": "new"}}),
    )]);
    let run = Migrator::new(&store, journal_dir.path(), false)
        .run(&plan)
        .unwrap();

    let engine = UndoEngine::new(&store, JournalStore::new(journal_dir.path()));
    let summary = engine.undo(&run.tag, Some("d2")).unwrap();
    assert_eq!(summary.undone, 1);

    assert_eq!(
        store.find("z", &json!({"_id": "d2"})).unwrap()[0]["status"],
        json!("old")
    );
    assert_eq!(store.find("z", &json!({"status": "new"})).unwrap().len(), 2);
}

#[test]
fn dry_run_previews_without_mutating_and_journals_every_would_be_action() {
    let journal_dir = TempDir::new().unwrap();
    let store = MemoryStore::new();
    for i in 1..=2 {
        store
            .insert("z", json!({"_id": format!("d{i}"), "status": "old"}))
            .unwrap();
    }
    let before = store.snapshot().unwrap();

    let plan = MigrationPlan::new(vec![
        insert_op("y", json!({"name": "Alice"})),
        update_op("z", json!({"status": "old"}), json!({"$set": {"status": "new"}})),
    ]);
    let run = Migrator::new(&store, journal_dir.path(), true)
        .run(&plan)
        .unwrap();

    assert_eq!(store.snapshot().unwrap(), before);
    assert_eq!(run.actions.len(), 3);
    assert!(run.actions.iter().all(|a| a.status == ActionStatus::DryRun));

    // A dry-run journal undoes to nothing.
    let engine = UndoEngine::new(&store, JournalStore::new(journal_dir.path()));
    let summary = engine.undo(&run.tag, None).unwrap();
    assert_eq!(summary.undone, 0);
    assert_eq!(summary.skipped, 3);
    assert_eq!(store.snapshot().unwrap(), before);
}

#[test]
fn error_actions_are_journaled_but_not_undone() {
    let journal_dir = TempDir::new().unwrap();
    let store = MemoryStore::new();
    store.insert("y", json!({"_id": "dup", "kept": true})).unwrap();

    let plan = MigrationPlan::new(vec![
        insert_op("y", json!({"_id": "dup"})),
        insert_op("y", json!({"_id": "fresh"})),
    ]);
    let run = Migrator::new(&store, journal_dir.path(), false)
        .run(&plan)
        .unwrap();
    assert_eq!(run.errors(), 1);

    let engine = UndoEngine::new(&store, JournalStore::new(journal_dir.path()));
    let summary = engine.undo(&run.tag, None).unwrap();
    assert_eq!(summary.undone, 1);
    assert_eq!(summary.skipped, 1);

    // The pre-existing document the failed insert collided with is intact.
    let docs = store.find("y", &json!({"_id": "dup"})).unwrap();
    assert_eq!(docs[0]["kept"], json!(true));
    assert!(store.find("y", &json!({"_id": "fresh"})).unwrap().is_empty());
}
