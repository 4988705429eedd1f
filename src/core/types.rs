use super::{MigrateError, Result};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Format behind every run tag: UTC invocation time at millisecond
/// precision, URL-safe, lexically ordered (`20260830T142501337Z`).
pub const TAG_FORMAT: &str = "%Y%m%dT%H%M%S%3fZ";

/// The two mutation kinds a run can apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    Insert,
    Update,
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionKind::Insert => write!(f, "insert"),
            ActionKind::Update => write!(f, "update"),
        }
    }
}

/// Outcome of one attempted document-level mutation. Set once at
/// execution time, immutable thereafter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ActionStatus {
    Success,
    Error,
    DryRun,
}

impl fmt::Display for ActionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionStatus::Success => write!(f, "success"),
            ActionStatus::Error => write!(f, "error"),
            ActionStatus::DryRun => write!(f, "dryRun"),
        }
    }
}

/// Derive a fresh run tag from an invocation instant.
///
/// The tag names the journal file and any backup side collections of
/// the run, so it must stay URL-safe and filesystem-safe.
pub fn new_tag(at: DateTime<Utc>) -> String {
    at.format(TAG_FORMAT).to_string()
}

/// Recover the invocation instant encoded in a tag.
///
/// Only the legacy time-window restore needs this; identifier-based
/// undo treats the tag as an opaque key.
pub fn parse_tag(tag: &str) -> Result<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(tag, TAG_FORMAT)
        .map(|naive| naive.and_utc())
        .map_err(|_| MigrateError::InvalidTag(tag.to_string()))
}
