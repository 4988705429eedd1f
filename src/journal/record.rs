//! Journal record types.
//!
//! Wire names follow the journal file format: `action`, `_id`,
//! `document`, `previous`, `update`, `error`. Optional fields are
//! omitted entirely when absent, so presence in the file encodes the
//! invariants (e.g. `previous` exists iff an update succeeded).

use crate::core::{ActionKind, ActionStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One attempted document-level mutation and its outcome, with enough
/// prior-state data to invert it. Append-only once recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionRecord {
    pub collection: String,

    #[serde(rename = "action")]
    pub kind: ActionKind,

    pub status: ActionStatus,

    /// Assigned or matched document id. Present for success and
    /// error; for dryRun only when the document pre-existed.
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,

    /// The insert payload.
    #[serde(rename = "document", default, skip_serializing_if = "Option::is_none")]
    pub document: Option<Value>,

    /// Full pre-mutation document content; what makes a successful
    /// update invertible.
    #[serde(rename = "previous", default, skip_serializing_if = "Option::is_none")]
    pub previous: Option<Value>,

    /// The update instruction that was (or would have been) applied.
    #[serde(rename = "update", default, skip_serializing_if = "Option::is_none")]
    pub update: Option<Value>,

    #[serde(rename = "error", default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ActionRecord {
    fn base(collection: &str, kind: ActionKind, status: ActionStatus) -> Self {
        Self {
            collection: collection.to_string(),
            kind,
            status,
            identifier: None,
            document: None,
            previous: None,
            update: None,
            error: None,
        }
    }

    pub fn insert_success(collection: &str, id: String, document: Value) -> Self {
        Self {
            identifier: Some(id),
            document: Some(document),
            ..Self::base(collection, ActionKind::Insert, ActionStatus::Success)
        }
    }

    pub fn insert_error(collection: &str, document: Value, detail: String) -> Self {
        Self {
            document: Some(document),
            error: Some(detail),
            ..Self::base(collection, ActionKind::Insert, ActionStatus::Error)
        }
    }

    pub fn insert_dry_run(collection: &str, document: Value) -> Self {
        Self {
            document: Some(document),
            ..Self::base(collection, ActionKind::Insert, ActionStatus::DryRun)
        }
    }

    pub fn update_success(collection: &str, id: String, previous: Value, update: Value) -> Self {
        Self {
            identifier: Some(id),
            previous: Some(previous),
            update: Some(update),
            ..Self::base(collection, ActionKind::Update, ActionStatus::Success)
        }
    }

    pub fn update_error(
        collection: &str,
        id: Option<String>,
        update: Value,
        detail: String,
    ) -> Self {
        Self {
            identifier: id,
            update: Some(update),
            error: Some(detail),
            ..Self::base(collection, ActionKind::Update, ActionStatus::Error)
        }
    }

    pub fn update_dry_run(collection: &str, id: Option<String>, update: Value) -> Self {
        Self {
            identifier: id,
            update: Some(update),
            ..Self::base(collection, ActionKind::Update, ActionStatus::DryRun)
        }
    }
}

/// First line of every journal file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunHeader {
    pub tag: String,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

/// One migration invocation: its tag, start instant, and the ordered
/// sequence of attempted actions. The tag is assigned once at run
/// start and is the sole key for the journal and any backup artifacts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationRun {
    pub tag: String,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    pub actions: Vec<ActionRecord>,
}

impl MigrationRun {
    pub fn new(tag: String, created_at: DateTime<Utc>) -> Self {
        Self {
            tag,
            created_at,
            actions: Vec::new(),
        }
    }

    pub fn header(&self) -> RunHeader {
        RunHeader {
            tag: self.tag.clone(),
            created_at: self.created_at,
        }
    }

    pub fn successes(&self) -> usize {
        self.count_status(ActionStatus::Success)
    }

    pub fn errors(&self) -> usize {
        self.count_status(ActionStatus::Error)
    }

    pub fn dry_runs(&self) -> usize {
        self.count_status(ActionStatus::DryRun)
    }

    fn count_status(&self, status: ActionStatus) -> usize {
        self.actions.iter().filter(|a| a.status == status).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn wire_names_and_presence_rules() {
        let record = ActionRecord::update_success(
            "users",
            "u1".to_string(),
            json!({"_id": "u1", "status": "old"}),
            json!({"$set": {"status": "new"}}),
        );
        let line = serde_json::to_value(&record).unwrap();
        assert_eq!(line["action"], json!("update"));
        assert_eq!(line["status"], json!("success"));
        assert_eq!(line["_id"], json!("u1"));
        assert_eq!(line["previous"]["status"], json!("old"));
        assert!(line.get("document").is_none());
        assert!(line.get("error").is_none());
    }

    #[test]
    fn dry_run_insert_carries_no_identifier() {
        let record = ActionRecord::insert_dry_run("users", json!({"name": "Alice"}));
        let line = serde_json::to_value(&record).unwrap();
        assert_eq!(line["status"], json!("dryRun"));
        assert!(line.get("_id").is_none());
    }

    #[test]
    fn record_round_trips_through_json() {
        let record =
            ActionRecord::insert_error("users", json!({"_id": "u1"}), "duplicate".to_string());
        let line = serde_json::to_string(&record).unwrap();
        let parsed: ActionRecord = serde_json::from_str(&line).unwrap();
        assert_eq!(parsed, record);
    }
}
