//! Legacy whole-set backup strategy.
//!
//! The first strategy generation copied every matched document into a
//! side collection before a bulk update and undid inserts by deleting
//! everything created at or after the run's instant. It is coarser
//! than the per-action journal (the time-window delete can take out
//! unrelated documents created in the same window and is sensitive to
//! clock precision) but is kept as an alternate path; the imprecision
//! is preserved deliberately, not corrected. Side collections are
//! never cleaned up automatically.

use crate::core::{MigrateError, Result, parse_tag};
use crate::store::DocumentStore;
use serde_json::{Map, Value};
use tracing::{info, warn};

/// Deterministic side-collection name for a source collection and a
/// run tag: `_backup_<collection>_<tag>`.
pub fn backup_collection_name(collection: &str, tag: &str) -> String {
    format!("_backup_{collection}_{tag}")
}

pub struct BackupSnapshotter<'a> {
    store: &'a dyn DocumentStore,
}

impl<'a> BackupSnapshotter<'a> {
    pub fn new(store: &'a dyn DocumentStore) -> Self {
        Self { store }
    }

    /// Copy every document matching `filter` verbatim into the side
    /// collection for (`collection`, `tag`). Returns how many were
    /// copied. Documents without a string `_id` cannot be restored by
    /// identifier and are skipped with a warning.
    pub fn snapshot(&self, collection: &str, filter: &Value, tag: &str) -> Result<usize> {
        let side = backup_collection_name(collection, tag);
        let matched = self.store.find(collection, filter)?;
        let mut copied = 0;
        for doc in matched {
            match doc.get("_id").and_then(Value::as_str) {
                Some(id) => {
                    let id = id.to_string();
                    self.store.upsert_by_id(&side, &id, doc)?;
                    copied += 1;
                }
                None => {
                    warn!(collection, "skipping backup of document without string '_id'");
                }
            }
        }
        info!(collection, %side, copied, "backup snapshot written");
        Ok(copied)
    }

    /// Restore an update-origin collection: upsert every document of
    /// the side collection back by identifier.
    pub fn restore_updates(&self, collection: &str, tag: &str) -> Result<usize> {
        let side = backup_collection_name(collection, tag);
        let saved = self.store.find(&side, &Value::Object(Map::new()))?;
        let mut restored = 0;
        for doc in saved {
            let id = doc
                .get("_id")
                .and_then(Value::as_str)
                .map(str::to_string)
                .ok_or_else(|| {
                    MigrateError::Store(format!(
                        "backup collection '{side}' holds a document without string '_id'"
                    ))
                })?;
            self.store.upsert_by_id(collection, &id, doc)?;
            restored += 1;
        }
        info!(collection, %side, restored, "restored from backup snapshot");
        Ok(restored)
    }

    /// Restore an insert-origin collection by the legacy time-window
    /// rule: delete everything created at or after the instant encoded
    /// in `tag`. An approximation, not an exact inverse.
    pub fn restore_inserts(&self, collection: &str, tag: &str) -> Result<usize> {
        let cutoff = parse_tag(tag)?;
        let deleted = self.store.delete_created_at_or_after(collection, cutoff)?;
        info!(collection, tag, deleted, "deleted documents in run's time window");
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use serde_json::json;

    const TAG: &str = "20260830T120000000Z";

    #[test]
    fn side_collection_naming_is_deterministic() {
        assert_eq!(
            backup_collection_name("users", TAG),
            "_backup_users_20260830T120000000Z"
        );
    }

    #[test]
    fn snapshot_copies_matched_set_verbatim() {
        let store = MemoryStore::new();
        store.insert("z", json!({"_id": "a", "status": "old"})).unwrap();
        store.insert("z", json!({"_id": "b", "status": "other"})).unwrap();

        let snapshotter = BackupSnapshotter::new(&store);
        let copied = snapshotter.snapshot("z", &json!({"status": "old"}), TAG).unwrap();
        assert_eq!(copied, 1);

        let side = backup_collection_name("z", TAG);
        let saved = store.find(&side, &json!({})).unwrap();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0]["_id"], json!("a"));
        assert_eq!(saved[0]["status"], json!("old"));
    }

    #[test]
    fn restore_updates_upserts_saved_content_back() {
        let store = MemoryStore::new();
        store.insert("z", json!({"_id": "a", "status": "old"})).unwrap();
        let snapshotter = BackupSnapshotter::new(&store);
        snapshotter.snapshot("z", &json!({}), TAG).unwrap();

        // Bulk mutation after the snapshot; one document even vanishes.
        store.update_by_id("z", "a", &json!({"$set": {"status": "new"}})).unwrap();
        store.delete_by_id("z", "a").unwrap();

        let restored = snapshotter.restore_updates("z", TAG).unwrap();
        assert_eq!(restored, 1);
        let docs = store.find("z", &json!({"_id": "a"})).unwrap();
        assert_eq!(docs[0]["status"], json!("old"));
    }

    #[test]
    fn restore_inserts_deletes_by_time_window_including_bystanders() {
        let store = MemoryStore::new();
        store
            .insert("y", json!({"_id": "before", "createdAt": "2026-08-30T11:59:59Z"}))
            .unwrap();
        store
            .insert("y", json!({"_id": "run-doc", "createdAt": "2026-08-30T12:00:01Z"}))
            .unwrap();
        // Unrelated document created inside the window: the legacy
        // strategy deletes it too.
        store
            .insert("y", json!({"_id": "bystander", "createdAt": "2026-08-30T12:00:02Z"}))
            .unwrap();

        let snapshotter = BackupSnapshotter::new(&store);
        let deleted = snapshotter.restore_inserts("y", TAG).unwrap();
        assert_eq!(deleted, 2);
        let remaining = store.find("y", &json!({})).unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0]["_id"], json!("before"));
    }

    #[test]
    fn restore_inserts_rejects_garbage_tags() {
        let store = MemoryStore::new();
        let snapshotter = BackupSnapshotter::new(&store);
        assert!(matches!(
            snapshotter.restore_inserts("y", "not-a-tag"),
            Err(MigrateError::InvalidTag(_))
        ));
    }
}
