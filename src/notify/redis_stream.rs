use async_trait::async_trait;
use bb8_redis::{bb8::Pool, RedisConnectionManager};
use tracing::debug;

use super::{Notifier, NotifyError, QueueEvent};

/// Default stream key for queue events.
pub const DEFAULT_EVENTS_STREAM: &str = "queue:events";
const DEFAULT_MAX_LEN: usize = 10_000;

/// Publishes events to a Redis stream with `XADD`, approximately trimmed.
///
/// Each entry carries two fields: `event` (the dotted name) and `payload`
/// (the serialized [`QueueEvent`]).
#[derive(Clone)]
pub struct RedisStreamNotifier {
    pool: Pool<RedisConnectionManager>,
    stream_key: String,
    max_len: usize,
}

impl RedisStreamNotifier {
    pub fn new(pool: Pool<RedisConnectionManager>) -> Self {
        Self {
            pool,
            stream_key: DEFAULT_EVENTS_STREAM.to_string(),
            max_len: DEFAULT_MAX_LEN,
        }
    }

    pub fn with_stream_key(mut self, key: impl Into<String>) -> Self {
        self.stream_key = key.into();
        self
    }

    pub fn with_max_len(mut self, max_len: usize) -> Self {
        self.max_len = max_len;
        self
    }

    pub fn stream_key(&self) -> &str {
        &self.stream_key
    }
}

#[async_trait]
impl Notifier for RedisStreamNotifier {
    async fn notify(&self, event: QueueEvent) -> Result<(), NotifyError> {
        let payload = serde_json::to_string(&event)?;
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|e| NotifyError::Transport(format!("Failed to get Redis connection: {}", e)))?;

        let id: String = redis::cmd("XADD")
            .arg(&self.stream_key)
            .arg("MAXLEN")
            .arg("~")
            .arg(self.max_len)
            .arg("*")
            .arg("event")
            .arg(&event.event)
            .arg("payload")
            .arg(payload)
            .query_async(&mut *conn)
            .await?;

        debug!(stream = %self.stream_key, id = %id, event = %event.event, "Event published");
        Ok(())
    }
}
