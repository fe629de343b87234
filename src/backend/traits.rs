//! Core trait for queue state backends.
//!
//! A backend stores, per [`Namespace`], a main ordered set of uuids, one
//! ordered set per status value, and one attribute record per uuid. The
//! trait speaks in raw string records so that callers and members share a
//! single implementation; typed hydration happens in [`crate::cache`].
//!
//! Every method that touches more than one key must apply its writes as a
//! single atomic step. In particular [`QueueBackend::update`] and
//! [`QueueBackend::remove`] read the stored status and adjust the matching
//! status set without another client being able to interleave.
//!
//! # Example: Implementing a Custom Backend
//!
//! ```rust,ignore
//! use payload::backend::{QueueBackend, BackendError};
//! use async_trait::async_trait;
//!
//! pub struct MyBackend { /* ... */ }
//!
//! #[async_trait]
//! impl QueueBackend for MyBackend {
//!     // Implement record operations...
//! }
//! ```

use std::collections::HashMap;

use async_trait::async_trait;

use super::error::BackendError;
use super::keys::Namespace;

/// Field name whose presence marks a record as existing.
pub const UUID_FIELD: &str = "uuid";
/// Field holding the current status code.
pub const STATUS_FIELD: &str = "status";
/// Field holding the timestamp of the last status change.
pub const STATUS_AT_FIELD: &str = "status_at";

/// Raw attribute record as stored in the backend.
pub type Record = HashMap<String, String>;

/// A record read back together with its live rank.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredRecord {
    /// All stored fields
    pub fields: Record,
    /// Zero-based rank of the uuid in the namespace's main ordered set
    pub rank: Option<u64>,
}

impl StoredRecord {
    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }
}

/// Move of a record into a new status set.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusChange {
    /// New status code
    pub status: String,
    /// Score for the new status-set entry
    pub score: f64,
    /// Encoded timestamp written to `status_at`
    pub status_at: String,
}

/// Partial update of a record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordPatch {
    /// Fields to overwrite; omitted fields are untouched
    pub fields: Vec<(String, String)>,
    /// Optional status transition
    pub status: Option<StatusChange>,
}

impl RecordPatch {
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.status.is_none()
    }
}

/// Storage operations for ordered, status-indexed queue entities.
///
/// # Implementation Notes
///
/// - All methods are async and implementations own their connection pooling
/// - Errors should be mapped to [`BackendError`] variants
/// - A record exists iff it carries a [`UUID_FIELD`] entry
#[async_trait]
pub trait QueueBackend: Send + Sync {
    /// Insert `uuid` into the main set and the `status` set with `score`
    /// and write `record`.
    ///
    /// Re-inserting an existing uuid overwrites the record fields and
    /// re-scores the set entries. If the stored status differs, the uuid
    /// leaves the old status set, so it sits in exactly one.
    async fn insert(
        &self,
        ns: &Namespace,
        uuid: &str,
        record: Record,
        status: &str,
        score: f64,
    ) -> Result<(), BackendError>;

    /// Read a record and its rank in the main set.
    ///
    /// Returns `None` when no record with a `uuid` field exists.
    async fn load(&self, ns: &Namespace, uuid: &str) -> Result<Option<StoredRecord>, BackendError>;

    /// Apply a partial update to an existing record.
    ///
    /// When `patch.status` is set, the uuid is removed from the status set
    /// named by the currently stored status and added to the new one.
    /// Returns `false` and writes nothing if the record does not exist.
    async fn update(&self, ns: &Namespace, uuid: &str, patch: RecordPatch)
        -> Result<bool, BackendError>;

    /// Remove a record together with its main-set and status-set entries.
    ///
    /// Returns the record as it was just before removal, or `None` if it
    /// did not exist.
    async fn remove(&self, ns: &Namespace, uuid: &str)
        -> Result<Option<StoredRecord>, BackendError>;

    /// Return uuids of the main set (`status == None`) or of one status set,
    /// in ascending score order, using inclusive `ZRANGE` index semantics
    /// (negative indexes count from the end).
    async fn range(
        &self,
        ns: &Namespace,
        status: Option<&str>,
        start: isize,
        stop: isize,
    ) -> Result<Vec<String>, BackendError>;

    /// Check that the backend is reachable.
    async fn ping(&self) -> Result<(), BackendError>;
}
