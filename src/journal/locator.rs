//! Locating and loading persisted journals.

use crate::core::{MigrateError, Result};
use crate::journal::record::{ActionRecord, MigrationRun, RunHeader};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

pub const JOURNAL_EXTENSION: &str = "jsonl";

pub fn journal_path(dir: &Path, tag: &str) -> PathBuf {
    dir.join(format!("{tag}.{JOURNAL_EXTENSION}"))
}

/// Read side of the journal directory: find a run by tag and
/// reconstruct it from its append-only log. Never writes.
pub struct JournalStore {
    dir: PathBuf,
}

impl JournalStore {
    pub fn new<P: Into<PathBuf>>(dir: P) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self, tag: &str) -> PathBuf {
        journal_path(&self.dir, tag)
    }

    pub fn exists(&self, tag: &str) -> bool {
        self.path(tag).exists()
    }

    /// Load the run recorded under `tag`.
    ///
    /// The header line and every interior action line must parse; a
    /// malformed *final* line is the footprint of a crash mid-append
    /// and is skipped with a warning, since every earlier record was
    /// fsynced before it.
    pub fn load(&self, tag: &str) -> Result<MigrationRun> {
        let path = self.path(tag);
        if !path.exists() {
            return Err(MigrateError::MissingJournal(tag.to_string()));
        }
        let malformed = |detail: String| MigrateError::MalformedJournal {
            tag: tag.to_string(),
            detail,
        };

        let contents = fs::read_to_string(&path)
            .map_err(|e| MigrateError::Journal(format!("failed to read journal: {e}")))?;
        let mut lines = contents.lines().filter(|l| !l.trim().is_empty());

        let header_line = lines
            .next()
            .ok_or_else(|| malformed("journal file is empty".into()))?;
        let header: RunHeader = serde_json::from_str(header_line)
            .map_err(|e| malformed(format!("bad header line: {e}")))?;
        if header.tag != tag {
            return Err(malformed(format!(
                "header tag '{}' does not match file name",
                header.tag
            )));
        }

        let mut run = MigrationRun::new(header.tag, header.created_at);
        let action_lines: Vec<&str> = lines.collect();
        let last = action_lines.len().saturating_sub(1);
        for (index, line) in action_lines.iter().enumerate() {
            match serde_json::from_str::<ActionRecord>(line) {
                Ok(action) => run.actions.push(action),
                Err(e) if index == last => {
                    warn!(tag, "skipping truncated trailing journal record: {e}");
                }
                Err(e) => {
                    return Err(malformed(format!("bad record on line {}: {e}", index + 2)));
                }
            }
        }
        Ok(run)
    }

    /// Tags of every journal in the directory, newest last. An absent
    /// directory reads as empty.
    pub fn list_tags(&self) -> Result<Vec<String>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }
        let entries = fs::read_dir(&self.dir)
            .map_err(|e| MigrateError::Journal(format!("failed to read journal directory: {e}")))?;
        let mut tags = Vec::new();
        for entry in entries {
            let entry = entry
                .map_err(|e| MigrateError::Journal(format!("failed to read journal directory: {e}")))?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) == Some(JOURNAL_EXTENSION) {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    tags.push(stem.to_string());
                }
            }
        }
        tags.sort();
        Ok(tags)
    }
}
