//! Applying (or simulating) single mutations against the store.
//!
//! Every attempted mutation yields a tagged `ActionRecord` outcome
//! rather than an error: a failed insert or a failed per-document
//! update becomes a `status: error` record and the run moves on. Only
//! failures that poison the whole run (the up-front filter evaluation)
//! surface as `Err`.

use crate::core::Result;
use crate::journal::ActionRecord;
use crate::store::DocumentStore;
use serde_json::Value;
use tracing::debug;

pub struct MutationExecutor<'a> {
    store: &'a dyn DocumentStore,
    dry_run: bool,
}

impl<'a> MutationExecutor<'a> {
    pub fn new(store: &'a dyn DocumentStore, dry_run: bool) -> Self {
        Self { store, dry_run }
    }

    pub fn dry_run(&self) -> bool {
        self.dry_run
    }

    /// Insert one document. Exactly one store write in normal mode,
    /// zero in dry-run (no identifier is computed either).
    pub fn insert(&self, collection: &str, document: Value) -> ActionRecord {
        if self.dry_run {
            debug!(collection, "dry-run insert, store untouched");
            return ActionRecord::insert_dry_run(collection, document);
        }
        match self.store.insert(collection, document.clone()) {
            Ok(id) => ActionRecord::insert_success(collection, id, document),
            Err(e) => ActionRecord::insert_error(collection, document, e.to_string()),
        }
    }

    /// Evaluate `filter` once, producing the matched set the update
    /// pass will walk. Failure here aborts the planned operation (not
    /// the run) since no per-document outcome exists yet.
    pub fn match_documents(&self, collection: &str, filter: &Value) -> Result<Vec<Value>> {
        self.store.find(collection, filter)
    }

    /// Apply `update` to one already-matched document, capturing its
    /// full prior content first so the action can be inverted.
    ///
    /// Between the match and this per-document mutation another
    /// writer could alter the document; under the single-writer
    /// assumption that window is an accepted race, and the mutation
    /// proceeds on the identifier alone.
    pub fn update_document(&self, collection: &str, matched: &Value, update: &Value) -> ActionRecord {
        let id = matched.get("_id").and_then(Value::as_str);
        if self.dry_run {
            return ActionRecord::update_dry_run(
                collection,
                id.map(str::to_string),
                update.clone(),
            );
        }
        let Some(id) = id else {
            return ActionRecord::update_error(
                collection,
                None,
                update.clone(),
                "matched document has no string '_id'".to_string(),
            );
        };
        let previous = matched.clone();
        match self.store.update_by_id(collection, id, update) {
            Ok(true) => {
                ActionRecord::update_success(collection, id.to_string(), previous, update.clone())
            }
            Ok(false) => ActionRecord::update_error(
                collection,
                Some(id.to_string()),
                update.clone(),
                "document disappeared between match and update".to_string(),
            ),
            Err(e) => ActionRecord::update_error(
                collection,
                Some(id.to_string()),
                update.clone(),
                e.to_string(),
            ),
        }
    }

    /// Per-document update of everything matching `filter`: one
    /// record per matched document, per-document failures recorded
    /// and skipped, never aborting the siblings.
    pub fn update(
        &self,
        collection: &str,
        filter: &Value,
        update: &Value,
    ) -> Result<Vec<ActionRecord>> {
        let matched = self.match_documents(collection, filter)?;
        Ok(matched
            .iter()
            .map(|doc| self.update_document(collection, doc, update))
            .collect())
    }
}
