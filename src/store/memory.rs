//! In-memory and file-backed document stores.
//!
//! `MemoryStore` keeps collections of JSON documents under an internal
//! lock. `FileStore` wraps it with a JSON snapshot on disk, loaded at
//! open and rewritten atomically (temp file + rename) after every
//! mutation, so the on-disk state never lags a reported success.

use crate::core::{MigrateError, Result};
use crate::store::filter::{apply_update, matches_filter};
use crate::store::DocumentStore;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use uuid::Uuid;

type Collections = BTreeMap<String, Vec<Value>>;

fn document_id(doc: &Value) -> Option<&str> {
    doc.get("_id").and_then(Value::as_str)
}

fn created_at(doc: &Value) -> Option<DateTime<Utc>> {
    doc.get("createdAt")
        .and_then(Value::as_str)
        .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
        .map(|parsed| parsed.with_timezone(&Utc))
}

// ============================================================================
// MemoryStore
// ============================================================================

/// Volatile document store over `serde_json::Value` collections.
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: RwLock<Collections>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a store from a snapshot object
    /// (`{"collection": [documents]}`).
    pub fn from_snapshot(snapshot: Value) -> Result<Self> {
        let Value::Object(collections) = snapshot else {
            return Err(MigrateError::Store(
                "store snapshot must be a JSON object".into(),
            ));
        };
        let mut loaded = Collections::new();
        for (name, docs) in collections {
            let Value::Array(docs) = docs else {
                return Err(MigrateError::Store(format!(
                    "collection '{name}' must be a JSON array"
                )));
            };
            loaded.insert(name, docs);
        }
        Ok(Self {
            collections: RwLock::new(loaded),
        })
    }

    /// Current contents as the snapshot object `FileStore` persists.
    pub fn snapshot(&self) -> Result<Value> {
        let collections = self.collections.read()?;
        let mut out = Map::new();
        for (name, docs) in collections.iter() {
            out.insert(name.clone(), Value::Array(docs.clone()));
        }
        Ok(Value::Object(out))
    }

    pub fn collection_names(&self) -> Result<Vec<String>> {
        Ok(self.collections.read()?.keys().cloned().collect())
    }
}

impl DocumentStore for MemoryStore {
    fn find(&self, collection: &str, filter: &Value) -> Result<Vec<Value>> {
        let collections = self.collections.read()?;
        let Some(docs) = collections.get(collection) else {
            return Ok(Vec::new());
        };
        Ok(docs
            .iter()
            .filter(|doc| matches_filter(doc, filter))
            .cloned()
            .collect())
    }

    fn insert(&self, collection: &str, document: Value) -> Result<String> {
        let Value::Object(mut body) = document else {
            return Err(MigrateError::Store("document must be a JSON object".into()));
        };
        let id = match body.get("_id") {
            None => {
                let id = Uuid::new_v4().to_string();
                body.insert("_id".to_string(), Value::String(id.clone()));
                id
            }
            Some(Value::String(id)) => id.clone(),
            Some(_) => {
                return Err(MigrateError::Store("'_id' must be a string".into()));
            }
        };
        body.entry("createdAt".to_string())
            .or_insert_with(|| Value::String(Utc::now().to_rfc3339()));

        let mut collections = self.collections.write()?;
        let docs = collections.entry(collection.to_string()).or_default();
        if docs.iter().any(|doc| document_id(doc) == Some(id.as_str())) {
            return Err(MigrateError::Store(format!(
                "duplicate _id '{id}' in collection '{collection}'"
            )));
        }
        docs.push(Value::Object(body));
        Ok(id)
    }

    fn update_by_id(&self, collection: &str, id: &str, update: &Value) -> Result<bool> {
        let mut collections = self.collections.write()?;
        let Some(docs) = collections.get_mut(collection) else {
            return Ok(false);
        };
        let Some(doc) = docs.iter_mut().find(|doc| document_id(doc) == Some(id)) else {
            return Ok(false);
        };
        apply_update(doc, update)?;
        Ok(true)
    }

    fn replace_by_id(&self, collection: &str, id: &str, document: Value) -> Result<bool> {
        let mut collections = self.collections.write()?;
        let Some(docs) = collections.get_mut(collection) else {
            return Ok(false);
        };
        let Some(doc) = docs.iter_mut().find(|doc| document_id(doc) == Some(id)) else {
            return Ok(false);
        };
        *doc = with_id(document, id)?;
        Ok(true)
    }

    fn upsert_by_id(&self, collection: &str, id: &str, document: Value) -> Result<()> {
        let document = with_id(document, id)?;
        let mut collections = self.collections.write()?;
        let docs = collections.entry(collection.to_string()).or_default();
        match docs.iter_mut().find(|doc| document_id(doc) == Some(id)) {
            Some(doc) => *doc = document,
            None => docs.push(document),
        }
        Ok(())
    }

    fn delete_by_id(&self, collection: &str, id: &str) -> Result<bool> {
        let mut collections = self.collections.write()?;
        let Some(docs) = collections.get_mut(collection) else {
            return Ok(false);
        };
        let before = docs.len();
        docs.retain(|doc| document_id(doc) != Some(id));
        Ok(docs.len() < before)
    }

    fn count(&self, collection: &str) -> Result<usize> {
        let collections = self.collections.read()?;
        Ok(collections.get(collection).map_or(0, Vec::len))
    }

    fn delete_created_at_or_after(
        &self,
        collection: &str,
        cutoff: DateTime<Utc>,
    ) -> Result<usize> {
        let mut collections = self.collections.write()?;
        let Some(docs) = collections.get_mut(collection) else {
            return Ok(0);
        };
        let before = docs.len();
        docs.retain(|doc| !matches!(created_at(doc), Some(stamp) if stamp >= cutoff));
        Ok(before - docs.len())
    }
}

fn with_id(document: Value, id: &str) -> Result<Value> {
    let Value::Object(mut body) = document else {
        return Err(MigrateError::Store("document must be a JSON object".into()));
    };
    body.insert("_id".to_string(), Value::String(id.to_string()));
    Ok(Value::Object(body))
}

// ============================================================================
// FileStore
// ============================================================================

/// `MemoryStore` backed by a JSON snapshot file, write-through on
/// every mutation.
pub struct FileStore {
    inner: MemoryStore,
    path: PathBuf,
}

impl FileStore {
    /// Open the snapshot at `path`, starting empty when the file does
    /// not exist yet. Nothing is written until the first mutation.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let inner = if path.exists() {
            let raw = fs::read_to_string(&path).map_err(|e| {
                MigrateError::Connection(format!("cannot read store '{}': {e}", path.display()))
            })?;
            let snapshot: Value = serde_json::from_str(&raw).map_err(|e| {
                MigrateError::Connection(format!("store '{}' is not JSON: {e}", path.display()))
            })?;
            MemoryStore::from_snapshot(snapshot)
                .map_err(|e| MigrateError::Connection(e.to_string()))?
        } else {
            MemoryStore::new()
        };
        Ok(Self { inner, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write the current snapshot out via a temp file and an atomic
    /// rename, fsynced before the swap.
    pub fn flush(&self) -> Result<()> {
        let snapshot = self.inner.snapshot()?;
        let serialized = serde_json::to_string_pretty(&snapshot)
            .map_err(|e| MigrateError::Store(format!("failed to serialize store: {e}")))?;
        let dir = self.path.parent().unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(dir)
            .map_err(|e| MigrateError::Store(format!("failed to create store directory: {e}")))?;
        let mut tmp = tempfile::NamedTempFile::new_in(dir)
            .map_err(|e| MigrateError::Store(format!("failed to create temp store file: {e}")))?;
        tmp.write_all(serialized.as_bytes())
            .map_err(|e| MigrateError::Store(format!("failed to write store: {e}")))?;
        tmp.as_file()
            .sync_all()
            .map_err(|e| MigrateError::Store(format!("failed to sync store: {e}")))?;
        tmp.persist(&self.path)
            .map_err(|e| MigrateError::Store(format!("failed to replace store file: {e}")))?;
        Ok(())
    }
}

impl DocumentStore for FileStore {
    fn find(&self, collection: &str, filter: &Value) -> Result<Vec<Value>> {
        self.inner.find(collection, filter)
    }

    fn insert(&self, collection: &str, document: Value) -> Result<String> {
        let id = self.inner.insert(collection, document)?;
        self.flush()?;
        Ok(id)
    }

    fn update_by_id(&self, collection: &str, id: &str, update: &Value) -> Result<bool> {
        let applied = self.inner.update_by_id(collection, id, update)?;
        if applied {
            self.flush()?;
        }
        Ok(applied)
    }

    fn replace_by_id(&self, collection: &str, id: &str, document: Value) -> Result<bool> {
        let replaced = self.inner.replace_by_id(collection, id, document)?;
        if replaced {
            self.flush()?;
        }
        Ok(replaced)
    }

    fn upsert_by_id(&self, collection: &str, id: &str, document: Value) -> Result<()> {
        self.inner.upsert_by_id(collection, id, document)?;
        self.flush()
    }

    fn delete_by_id(&self, collection: &str, id: &str) -> Result<bool> {
        let deleted = self.inner.delete_by_id(collection, id)?;
        if deleted {
            self.flush()?;
        }
        Ok(deleted)
    }

    fn count(&self, collection: &str) -> Result<usize> {
        self.inner.count(collection)
    }

    fn delete_created_at_or_after(
        &self,
        collection: &str,
        cutoff: DateTime<Utc>,
    ) -> Result<usize> {
        let deleted = self.inner.delete_created_at_or_after(collection, cutoff)?;
        if deleted > 0 {
            self.flush()?;
        }
        Ok(deleted)
    }
}
