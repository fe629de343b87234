//! Backend abstraction layer for live queue state.
//!
//! # Architecture
//!
//! - [`QueueBackend`]: ordered-set + record + status-index primitives
//! - [`Namespace`]: key layout for one queue's callers or members
//! - [`BackendError`]: backend-agnostic error type
//!
//! Two implementations ship with the crate: [`RedisBackend`] (the default)
//! and [`MemoryBackend`].
//!
//! # Using a Custom Backend
//!
//! ```rust,ignore
//! use payload::QueueCache;
//! use payload::backend::QueueBackend;
//! use std::sync::Arc;
//!
//! let backend: Arc<dyn QueueBackend> = Arc::new(MyCustomBackend::new(config));
//! let cache = QueueCache::new(backend, notifier);
//! ```

mod error;
mod keys;
pub mod memory;
pub mod redis;
mod traits;

pub use error::BackendError;

pub use keys::{EntityKind, Namespace};

pub use traits::{
    QueueBackend, Record, RecordPatch, StatusChange, StoredRecord, STATUS_AT_FIELD, STATUS_FIELD,
    UUID_FIELD,
};

pub use memory::MemoryBackend;
pub use self::redis::RedisBackend;
