//! Replaying a recorded run in reverse effect.
//!
//! Undo loads the journal for a tag and walks its actions in recorded
//! order: a successful insert is inverted by deleting the recorded
//! identifier, a successful update by overwriting the document with
//! its recorded `previous` content in full. Error and dryRun records
//! were never applied, so they are skipped. The pass is best-effort:
//! a failing inverse is logged and counted, never fatal, and running
//! the same undo twice is safe. The journal itself is never rewritten.

use crate::core::{ActionKind, ActionStatus, Result};
use crate::journal::{ActionRecord, JournalStore, MigrationRun};
use crate::store::DocumentStore;
use std::fmt;
use tracing::{debug, info, warn};

/// Final tally of one undo pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UndoSummary {
    /// Inverses applied (including zero-effect deletes of documents
    /// already gone).
    pub undone: usize,
    /// Actions with nothing to invert: dryRun, error, or a restore
    /// whose target document no longer exists.
    pub skipped: usize,
    /// Inverses the store rejected.
    pub failed: usize,
}

impl fmt::Display for UndoSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} undone, {} skipped, {} failed",
            self.undone, self.skipped, self.failed
        )
    }
}

pub struct UndoEngine<'a> {
    store: &'a dyn DocumentStore,
    journals: JournalStore,
}

impl<'a> UndoEngine<'a> {
    pub fn new(store: &'a dyn DocumentStore, journals: JournalStore) -> Self {
        Self { store, journals }
    }

    /// Invert the run recorded under `tag`, optionally restricted to
    /// the actions of one document identifier. Fatal only when the
    /// journal is missing or unreadable.
    pub fn undo(&self, tag: &str, identifier: Option<&str>) -> Result<UndoSummary> {
        let run = self.journals.load(tag)?;
        info!(
            tag,
            actions = run.actions.len(),
            scope = identifier.unwrap_or("all"),
            "starting undo"
        );
        let summary = self.replay(&run, identifier);
        info!(tag, %summary, "undo finished");
        Ok(summary)
    }

    fn replay(&self, run: &MigrationRun, identifier: Option<&str>) -> UndoSummary {
        let mut summary = UndoSummary::default();
        for action in &run.actions {
            if let Some(wanted) = identifier {
                if action.identifier.as_deref() != Some(wanted) {
                    continue;
                }
            }
            self.invert(action, &mut summary);
        }
        summary
    }

    fn invert(&self, action: &ActionRecord, summary: &mut UndoSummary) {
        if action.status != ActionStatus::Success {
            debug!(
                collection = %action.collection,
                kind = %action.kind,
                status = %action.status,
                "nothing to undo, action was never applied"
            );
            summary.skipped += 1;
            return;
        }
        match action.kind {
            ActionKind::Insert => self.invert_insert(action, summary),
            ActionKind::Update => self.invert_update(action, summary),
        }
    }

    fn invert_insert(&self, action: &ActionRecord, summary: &mut UndoSummary) {
        let Some(id) = action.identifier.as_deref() else {
            warn!(collection = %action.collection, "successful insert without identifier, cannot undo");
            summary.failed += 1;
            return;
        };
        match self.store.delete_by_id(&action.collection, id) {
            Ok(true) => {
                info!(collection = %action.collection, id, "undid insert (deleted)");
                summary.undone += 1;
            }
            Ok(false) => {
                // Already gone; undo is idempotent.
                info!(collection = %action.collection, id, "insert already undone, document absent");
                summary.undone += 1;
            }
            Err(e) => {
                warn!(collection = %action.collection, id, "failed to undo insert: {e}");
                summary.failed += 1;
            }
        }
    }

    fn invert_update(&self, action: &ActionRecord, summary: &mut UndoSummary) {
        let (Some(id), Some(previous)) = (action.identifier.as_deref(), action.previous.as_ref())
        else {
            warn!(collection = %action.collection, "successful update without id/previous, cannot undo");
            summary.failed += 1;
            return;
        };
        match self
            .store
            .replace_by_id(&action.collection, id, previous.clone())
        {
            Ok(true) => {
                info!(collection = %action.collection, id, "undid update (restored previous content)");
                summary.undone += 1;
            }
            Ok(false) => {
                warn!(collection = %action.collection, id, "document absent, skipping restore");
                summary.skipped += 1;
            }
            Err(e) => {
                warn!(collection = %action.collection, id, "failed to undo update: {e}");
                summary.failed += 1;
            }
        }
    }
}
