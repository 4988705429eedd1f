//! Resolved tool configuration.
//!
//! The engine consumes only this struct; how it gets filled in
//! (flags, environment) is the binary's business.

use crate::core::{MigrateError, Result};
use std::env;
use std::path::PathBuf;

pub const DEFAULT_JOURNAL_DIR: &str = "migrundo_journal";

/// Environment fallbacks, read only when the matching flag is absent.
pub const ENV_STORE: &str = "MIGRUNDO_STORE";
pub const ENV_JOURNAL_DIR: &str = "MIGRUNDO_JOURNAL_DIR";

#[derive(Debug, Clone)]
pub struct MigrateConfig {
    /// Path of the JSON store file.
    pub store_path: PathBuf,
    /// Directory holding one journal file per run.
    pub journal_dir: PathBuf,
    /// Record what would happen without touching the store.
    pub dry_run: bool,
}

impl MigrateConfig {
    pub fn new<S: Into<PathBuf>, J: Into<PathBuf>>(store_path: S, journal_dir: J) -> Self {
        Self {
            store_path: store_path.into(),
            journal_dir: journal_dir.into(),
            dry_run: false,
        }
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Resolve from optional flag values with environment fallbacks.
    /// The store path has no default; a missing one is a
    /// configuration error, reported before anything is opened.
    pub fn resolve(
        store: Option<PathBuf>,
        journal_dir: Option<PathBuf>,
        dry_run: bool,
    ) -> Result<Self> {
        let store_path = store
            .or_else(|| env::var(ENV_STORE).ok().map(PathBuf::from))
            .ok_or_else(|| {
                MigrateError::Config(format!(
                    "no store path given (use --store or {ENV_STORE})"
                ))
            })?;
        let journal_dir = journal_dir
            .or_else(|| env::var(ENV_JOURNAL_DIR).ok().map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_JOURNAL_DIR));
        Ok(Self {
            store_path,
            journal_dir,
            dry_run,
        })
    }
}
