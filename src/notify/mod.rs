//! Outbound notifications for queue mutations.
//!
//! Every create/update/delete performed through
//! [`QueueCache`](crate::QueueCache) publishes a [`QueueEvent`] named
//! `queue.<entity>.<action>` once the storage mutation has completed.
//!
//! - [`BroadcastNotifier`]: in-process subscribers (used by the SSE endpoint)
//! - [`RedisStreamNotifier`]: `XADD` to a Redis stream for other processes
//! - [`FanoutNotifier`]: publish to several notifiers
//! - [`NoopNotifier`]: discard events

mod broadcast;
mod models;
mod redis_stream;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

pub use broadcast::BroadcastNotifier;
pub use models::{EventAction, QueueEvent};
pub use redis_stream::{RedisStreamNotifier, DEFAULT_EVENTS_STREAM};

/// Errors raised by a notification transport.
#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for NotifyError {
    fn from(err: serde_json::Error) -> Self {
        NotifyError::Serialization(err.to_string())
    }
}

impl From<redis::RedisError> for NotifyError {
    fn from(err: redis::RedisError) -> Self {
        NotifyError::Transport(err.to_string())
    }
}

/// Sink for queue events.
///
/// Delivery is fire-and-forget from the cache's point of view: nothing is
/// retried, and an error is only surfaced to the caller of the mutation.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, event: QueueEvent) -> Result<(), NotifyError>;
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotifier;

#[async_trait]
impl Notifier for NoopNotifier {
    async fn notify(&self, _event: QueueEvent) -> Result<(), NotifyError> {
        Ok(())
    }
}

/// Publishes each event to every inner notifier in order.
///
/// All notifiers are attempted; the first error is returned.
#[derive(Clone, Default)]
pub struct FanoutNotifier {
    notifiers: Vec<Arc<dyn Notifier>>,
}

impl FanoutNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifiers.push(notifier);
        self
    }

    pub fn len(&self) -> usize {
        self.notifiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notifiers.is_empty()
    }
}

#[async_trait]
impl Notifier for FanoutNotifier {
    async fn notify(&self, event: QueueEvent) -> Result<(), NotifyError> {
        let mut first_err = None;
        for notifier in &self.notifiers {
            if let Err(err) = notifier.notify(event.clone()).await {
                tracing::warn!(event = %event.event, error = %err, "notifier failed");
                first_err.get_or_insert(err);
            }
        }
        match first_err {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}
