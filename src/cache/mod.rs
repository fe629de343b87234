//! Live queue state service.
//!
//! [`QueueCache`] owns a [`QueueBackend`] and a [`Notifier`] and exposes the
//! create/get/list/update/delete contract for queue callers and queue
//! members. Every mutation is applied to storage first, then announced as a
//! [`QueueEvent`].
//!
//! # Usage
//!
//! ```rust,ignore
//! use payload::{QueueCache, NewQueueCaller};
//!
//! let cache = QueueCache::builder()
//!     .redis(settings.redis.clone())
//!     .build()
//!     .await?;
//!
//! let caller = cache
//!     .create_queue_caller("support", NewQueueCaller::with_number("555-1234"))
//!     .await?;
//! assert_eq!(caller.position, Some(0));
//! ```

mod callers;
mod codec;
mod members;

use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;

use crate::backend::{EntityKind, Namespace, QueueBackend, RedisBackend};
use crate::clock::Clock;
use crate::config::{RedisSettings, DEFAULT_STATUS_LIST_LIMIT};
use crate::error::QueueError;
use crate::notify::{EventAction, NoopNotifier, Notifier, QueueEvent};

/// Service for queue callers and queue members.
///
/// Cheap to clone; clones share the backend, notifier and clock.
#[derive(Clone)]
pub struct QueueCache {
    backend: Arc<dyn QueueBackend>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<Clock>,
    status_list_limit: Option<usize>,
}

impl QueueCache {
    pub fn new(backend: Arc<dyn QueueBackend>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            backend,
            notifier,
            clock: Arc::new(Clock::new()),
            status_list_limit: Some(DEFAULT_STATUS_LIST_LIMIT),
        }
    }

    /// Cap status-filtered listings at `limit` entries; `None` lifts the cap.
    pub fn with_status_list_limit(mut self, limit: Option<usize>) -> Self {
        self.status_list_limit = limit;
        self
    }

    pub fn builder() -> QueueCacheBuilder {
        QueueCacheBuilder::new()
    }

    pub fn backend(&self) -> &Arc<dyn QueueBackend> {
        &self.backend
    }

    pub fn status_list_limit(&self) -> Option<usize> {
        self.status_list_limit
    }

    /// Check that the backend is reachable.
    pub async fn ping(&self) -> Result<(), QueueError> {
        self.backend.ping().await?;
        Ok(())
    }

    fn assign_uuid(supplied: Option<&str>) -> String {
        match supplied {
            Some(uuid) if !uuid.is_empty() => uuid.to_string(),
            _ => Uuid::new_v4().to_string(),
        }
    }

    /// Uuids of a namespace in rank order, optionally restricted to one
    /// status set and capped by the status list limit.
    async fn list_uuids(
        &self,
        ns: &Namespace,
        status: Option<String>,
    ) -> Result<Vec<String>, QueueError> {
        let stop = match (&status, self.status_list_limit) {
            (Some(_), Some(0)) => return Ok(Vec::new()),
            (Some(_), Some(limit)) => isize::try_from(limit).map_or(-1, |l| l - 1),
            _ => -1,
        };
        Ok(self.backend.range(ns, status.as_deref(), 0, stop).await?)
    }

    async fn publish<T: Serialize>(
        &self,
        entity: EntityKind,
        action: EventAction,
        queue_id: &str,
        uuid: &str,
        snapshot: &T,
    ) -> Result<(), QueueError> {
        let payload = serde_json::to_value(snapshot)
            .map_err(|e| QueueError::InvalidRecord(e.to_string()))?;
        self.notifier
            .notify(QueueEvent::new(entity, action, queue_id, uuid, payload))
            .await?;
        Ok(())
    }
}

/// Builder for [`QueueCache`].
///
/// Without an explicit backend a [`RedisBackend`] is created from the
/// configured [`RedisSettings`]. Without a notifier events are discarded.
pub struct QueueCacheBuilder {
    redis: RedisSettings,
    backend: Option<Arc<dyn QueueBackend>>,
    notifier: Option<Arc<dyn Notifier>>,
    status_list_limit: Option<usize>,
}

impl QueueCacheBuilder {
    pub fn new() -> Self {
        Self {
            redis: RedisSettings::default(),
            backend: None,
            notifier: None,
            status_list_limit: Some(DEFAULT_STATUS_LIST_LIMIT),
        }
    }

    pub fn redis(mut self, settings: RedisSettings) -> Self {
        self.redis = settings;
        self
    }

    pub fn backend(mut self, backend: Arc<dyn QueueBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    pub fn notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn status_list_limit(mut self, limit: Option<usize>) -> Self {
        self.status_list_limit = limit;
        self
    }

    pub async fn build(self) -> Result<QueueCache, QueueError> {
        let backend = match self.backend {
            Some(backend) => backend,
            None => {
                Arc::new(RedisBackend::connect(&self.redis).await?)
            }
        };
        let notifier = self.notifier.unwrap_or_else(|| Arc::new(NoopNotifier));

        Ok(QueueCache::new(backend, notifier).with_status_list_limit(self.status_list_limit))
    }
}

impl Default for QueueCacheBuilder {
    fn default() -> Self {
        Self::new()
    }
}
