//! Append-only journal writer.
//!
//! One journal file per run, named by tag. The first line is the run
//! header; every subsequent line is one `ActionRecord`, written,
//! flushed, and fsynced as a single unit before `record` returns.
//! A crash mid-append can therefore lose at most the record being
//! written, never an earlier one.

use crate::core::{MigrateError, Result};
use crate::journal::locator::journal_path;
use crate::journal::record::{ActionRecord, RunHeader};
use chrono::{DateTime, Utc};
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

pub struct JournalRecorder {
    path: PathBuf,
    file: BufWriter<File>,
    appended: usize,
}

impl JournalRecorder {
    /// Create the journal for a new run and durably write its header
    /// line. Fails if a journal for `tag` already exists: tags are
    /// unique per run, so an existing file means a tag collision.
    pub fn create(dir: &Path, tag: &str, created_at: DateTime<Utc>) -> Result<Self> {
        fs::create_dir_all(dir).map_err(|e| {
            MigrateError::Journal(format!(
                "failed to create journal directory '{}': {e}",
                dir.display()
            ))
        })?;
        let path = journal_path(dir, tag);
        let file = OpenOptions::new()
            .create_new(true)
            .append(true)
            .open(&path)
            .map_err(|e| {
                MigrateError::Journal(format!(
                    "failed to create journal '{}': {e}",
                    path.display()
                ))
            })?;
        let mut recorder = Self {
            path,
            file: BufWriter::new(file),
            appended: 0,
        };
        let header = RunHeader {
            tag: tag.to_string(),
            created_at,
        };
        let line = serde_json::to_string(&header)
            .map_err(|e| MigrateError::Journal(format!("failed to serialize header: {e}")))?;
        recorder.append_line(&line)?;
        Ok(recorder)
    }

    /// Durably append one action. If this returns `Ok`, the record
    /// survives a crash immediately afterwards; if it returns `Err`,
    /// the caller must stop the run (an unrecorded successful
    /// mutation has no undo).
    pub fn record(&mut self, action: &ActionRecord) -> Result<()> {
        let line = serde_json::to_string(action)
            .map_err(|e| MigrateError::Journal(format!("failed to serialize action: {e}")))?;
        self.append_line(&line)?;
        self.appended += 1;
        Ok(())
    }

    fn append_line(&mut self, line: &str) -> Result<()> {
        let io_err =
            |e: std::io::Error| MigrateError::Journal(format!("failed to write journal: {e}"));
        self.file.write_all(line.as_bytes()).map_err(io_err)?;
        self.file.write_all(b"\n").map_err(io_err)?;
        self.file.flush().map_err(io_err)?;
        self.file.get_mut().sync_all().map_err(io_err)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Actions appended so far (the header line is not counted).
    pub fn appended(&self) -> usize {
        self.appended
    }
}
