//! Migration plans: the ordered operations one run applies.
//!
//! A plan file is a JSON array of operation objects tagged by `op`:
//!
//! ```json
//! [
//!   {"op": "insert", "collection": "users", "document": {"name": "Alice"}},
//!   {"op": "update", "collection": "users",
//!    "filter": {"status": "old"}, "update": {"$set": {"status": "new"}}}
//! ]
//! ```

use crate::core::{MigrateError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum PlannedOp {
    Insert {
        collection: String,
        document: Value,
    },
    Update {
        collection: String,
        filter: Value,
        update: Value,
    },
}

impl PlannedOp {
    pub fn collection(&self) -> &str {
        match self {
            PlannedOp::Insert { collection, .. } => collection,
            PlannedOp::Update { collection, .. } => collection,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MigrationPlan {
    pub ops: Vec<PlannedOp>,
}

impl MigrationPlan {
    pub fn new(ops: Vec<PlannedOp>) -> Self {
        Self { ops }
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|e| {
            MigrateError::Plan(format!("cannot read plan '{}': {e}", path.display()))
        })?;
        serde_json::from_str(&raw).map_err(|e| {
            MigrateError::Plan(format!("plan '{}' is not valid: {e}", path.display()))
        })
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}
