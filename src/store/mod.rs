//! The store boundary: everything the engine needs from a connected
//! document store, and the two implementations shipped with the crate.
//!
//! Filters and update instructions cross this boundary as opaque
//! `serde_json::Value` payloads; the store alone interprets them.

pub mod filter;
pub mod memory;

pub use memory::{FileStore, MemoryStore};

use crate::core::Result;
use chrono::{DateTime, Utc};
use serde_json::Value;

/// Collection-scoped operations against a connected document store.
///
/// All methods take `&self`; implementations synchronize internally.
/// The engine assumes single-writer access for the duration of a run
/// or an undo (no locking is layered on top of this trait).
pub trait DocumentStore {
    /// All documents in `collection` matching `filter`, in insertion
    /// order. An unknown collection yields an empty set.
    fn find(&self, collection: &str, filter: &Value) -> Result<Vec<Value>>;

    /// Insert one document, returning its identifier. The store
    /// assigns an identifier (and a `createdAt` stamp) when the
    /// document lacks one; a duplicate `_id` is an error.
    fn insert(&self, collection: &str, document: Value) -> Result<String>;

    /// Apply an update instruction to the single document with `_id`
    /// equal to `id`. Returns false when no such document exists.
    fn update_by_id(&self, collection: &str, id: &str, update: &Value) -> Result<bool>;

    /// Overwrite the document at `id` with `document` in full,
    /// keeping `id` as its `_id`. Returns false when absent.
    fn replace_by_id(&self, collection: &str, id: &str, document: Value) -> Result<bool>;

    /// Overwrite the document at `id`, inserting it verbatim when
    /// absent. Never stamps `createdAt`.
    fn upsert_by_id(&self, collection: &str, id: &str, document: Value) -> Result<()>;

    /// Delete the document at `id`. Returns false when absent
    /// (zero-effect delete, not an error).
    fn delete_by_id(&self, collection: &str, id: &str) -> Result<bool>;

    /// Number of documents currently in `collection`.
    fn count(&self, collection: &str) -> Result<usize>;

    /// Delete every document whose `createdAt` is at or after
    /// `cutoff`, returning how many were removed. Documents without a
    /// parseable `createdAt` are kept. Used only by the legacy
    /// time-window restore.
    fn delete_created_at_or_after(&self, collection: &str, cutoff: DateTime<Utc>)
    -> Result<usize>;
}
