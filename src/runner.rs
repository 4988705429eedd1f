//! Run sequencing: plan -> executor -> recorder, strictly in order.
//!
//! Each planned operation completes (and each of its per-document
//! outcomes is durably journaled) before the next begins. A journal
//! append failure stops the run immediately: a successful mutation
//! the journal does not know about has no undo.

use crate::core::{ActionStatus, Result, new_tag};
use crate::executor::MutationExecutor;
use crate::journal::{ActionRecord, JournalRecorder, MigrationRun};
use crate::plan::{MigrationPlan, PlannedOp};
use crate::store::DocumentStore;
use chrono::Utc;
use std::path::PathBuf;
use tracing::{info, warn};

pub struct Migrator<'a> {
    store: &'a dyn DocumentStore,
    journal_dir: PathBuf,
    dry_run: bool,
}

impl<'a> Migrator<'a> {
    pub fn new<P: Into<PathBuf>>(store: &'a dyn DocumentStore, journal_dir: P, dry_run: bool) -> Self {
        Self {
            store,
            journal_dir: journal_dir.into(),
            dry_run,
        }
    }

    /// Apply `plan` as one journaled run and return the completed run.
    /// Per-action failures are recorded and skipped; only connection,
    /// filter-evaluation, and journal failures are fatal.
    pub fn run(&self, plan: &MigrationPlan) -> Result<MigrationRun> {
        let created_at = Utc::now();
        let tag = new_tag(created_at);
        let mut recorder = JournalRecorder::create(&self.journal_dir, &tag, created_at)?;
        let executor = MutationExecutor::new(self.store, self.dry_run);
        let mut run = MigrationRun::new(tag.clone(), created_at);

        info!(
            %tag,
            ops = plan.len(),
            dry_run = self.dry_run,
            journal = %recorder.path().display(),
            "starting migration run"
        );

        for op in &plan.ops {
            match op {
                PlannedOp::Insert {
                    collection,
                    document,
                } => {
                    let action = executor.insert(collection, document.clone());
                    self.commit(&mut recorder, &mut run, action)?;
                }
                PlannedOp::Update {
                    collection,
                    filter,
                    update,
                } => {
                    let matched = executor.match_documents(collection, filter)?;
                    info!(collection, matched = matched.len(), "evaluated update filter");
                    for doc in &matched {
                        let action = executor.update_document(collection, doc, update);
                        self.commit(&mut recorder, &mut run, action)?;
                    }
                }
            }
        }

        info!(
            %tag,
            success = run.successes(),
            errors = run.errors(),
            dry_run = run.dry_runs(),
            "migration run finished"
        );
        Ok(run)
    }

    /// Journal one outcome before moving on, and log it as a single
    /// line carrying collection, kind, and identifier.
    fn commit(
        &self,
        recorder: &mut JournalRecorder,
        run: &mut MigrationRun,
        action: ActionRecord,
    ) -> Result<()> {
        recorder.record(&action)?;
        let id = action.identifier.as_deref().unwrap_or("-");
        match action.status {
            ActionStatus::Success => {
                info!(collection = %action.collection, kind = %action.kind, id, "applied");
            }
            ActionStatus::DryRun => {
                info!(collection = %action.collection, kind = %action.kind, id, "would apply (dry run)");
            }
            ActionStatus::Error => {
                warn!(
                    collection = %action.collection,
                    kind = %action.kind,
                    id,
                    "failed: {}",
                    action.error.as_deref().unwrap_or("unknown error")
                );
            }
        }
        run.actions.push(action);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::journal::JournalStore;
    use crate::store::MemoryStore;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn run_journals_every_outcome_in_order() {
        let dir = TempDir::new().unwrap();
        let store = MemoryStore::new();
        store.insert("z", json!({"_id": "d1", "status": "old"})).unwrap();

        let plan = MigrationPlan::new(vec![
            PlannedOp::Insert {
                collection: "y".to_string(),
                document: json!({"name": "Alice"}),
            },
            PlannedOp::Update {
                collection: "z".to_string(),
                filter: json!({"status": "old"}),
                update: json!({"$set": {"status": "new"}}),
            },
        ]);

        let run = Migrator::new(&store, dir.path(), false).run(&plan).unwrap();
        assert_eq!(run.actions.len(), 2);
        assert_eq!(run.successes(), 2);

        let loaded = JournalStore::new(dir.path()).load(&run.tag).unwrap();
        assert_eq!(loaded.actions, run.actions);
    }

    #[test]
    fn per_action_error_does_not_stop_the_run() {
        let dir = TempDir::new().unwrap();
        let store = MemoryStore::new();
        store.insert("y", json!({"_id": "dup"})).unwrap();

        let plan = MigrationPlan::new(vec![
            PlannedOp::Insert {
                collection: "y".to_string(),
                document: json!({"_id": "dup"}),
            },
            PlannedOp::Insert {
                collection: "y".to_string(),
                document: json!({"_id": "fresh"}),
            },
        ]);

        let run = Migrator::new(&store, dir.path(), false).run(&plan).unwrap();
        assert_eq!(run.errors(), 1);
        assert_eq!(run.successes(), 1);
        assert_eq!(store.count("y").unwrap(), 2);
    }

    #[test]
    fn unwritable_journal_dir_is_fatal_before_any_mutation() {
        let dir = TempDir::new().unwrap();
        let blocked = dir.path().join("blocked");
        std::fs::write(&blocked, "not a directory").unwrap();

        let store = MemoryStore::new();
        let plan = MigrationPlan::new(vec![PlannedOp::Insert {
            collection: "y".to_string(),
            document: json!({"name": "Alice"}),
        }]);

        assert!(Migrator::new(&store, &blocked, false).run(&plan).is_err());
        assert_eq!(store.count("y").unwrap(), 0);
    }
}
