// ============================================================================
// Migrundo Library
// ============================================================================
//
// Reversible migrations for JSON document stores. A run applies a plan
// of inserts and per-document updates and journals every outcome with
// enough prior state to invert it; a later undo pass replays the
// journal to restore the store, optionally scoped to one document.

pub mod backup;
pub mod config;
pub mod core;
pub mod executor;
pub mod journal;
pub mod plan;
pub mod runner;
pub mod store;
pub mod undo;

// Re-export main types for convenience
pub use backup::{BackupSnapshotter, backup_collection_name};
pub use config::MigrateConfig;
pub use crate::core::{ActionKind, ActionStatus, MigrateError, Result, new_tag, parse_tag};
pub use executor::MutationExecutor;
pub use journal::{ActionRecord, JournalRecorder, JournalStore, MigrationRun};
pub use plan::{MigrationPlan, PlannedOp};
pub use runner::Migrator;
pub use store::{DocumentStore, FileStore, MemoryStore};
pub use undo::{UndoEngine, UndoSummary};
