//! Redis store for live queue state.
//!
//! Each namespace is one sorted set ranked by creation time, one sorted set
//! per status, and one hash per record. Writes that touch a status set run
//! as Lua scripts.
//!
//! ```rust,ignore
//! use payload::backend::RedisBackend;
//! use payload::RedisSettings;
//!
//! let backend = RedisBackend::connect(&RedisSettings::default()).await?;
//! ```

mod pool;
mod records;

use async_trait::async_trait;
use bb8_redis::{bb8::Pool, RedisConnectionManager};

pub use pool::RedisConfig;

use super::error::BackendError;
use super::keys::Namespace;
use super::traits::*;
use crate::config::RedisSettings;

/// [`QueueBackend`] over a bb8 pool of Redis connections.
#[derive(Clone)]
pub struct RedisBackend {
    pool: Pool<RedisConnectionManager>,
}

impl RedisBackend {
    /// Connect with the address, database, password and pool sizing in
    /// `settings`. Fails if Redis does not answer PING after a few retries.
    pub async fn connect(settings: &RedisSettings) -> Result<Self, BackendError> {
        Self::connect_url(&settings.url(), settings.pool).await
    }

    pub async fn connect_url(url: &str, config: RedisConfig) -> Result<Self, BackendError> {
        let pool = pool::open(url, config).await?;
        Ok(Self { pool })
    }

    /// Share a pool that is already open, e.g. with the event stream notifier.
    pub fn from_pool(pool: Pool<RedisConnectionManager>) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &Pool<RedisConnectionManager> {
        &self.pool
    }
}

#[async_trait]
impl QueueBackend for RedisBackend {
    async fn insert(
        &self,
        ns: &Namespace,
        uuid: &str,
        record: Record,
        status: &str,
        score: f64,
    ) -> Result<(), BackendError> {
        records::insert(self, ns, uuid, record, status, score).await
    }

    async fn load(&self, ns: &Namespace, uuid: &str) -> Result<Option<StoredRecord>, BackendError> {
        records::load(self, ns, uuid).await
    }

    async fn update(
        &self,
        ns: &Namespace,
        uuid: &str,
        patch: RecordPatch,
    ) -> Result<bool, BackendError> {
        records::update(self, ns, uuid, patch).await
    }

    async fn remove(
        &self,
        ns: &Namespace,
        uuid: &str,
    ) -> Result<Option<StoredRecord>, BackendError> {
        records::remove(self, ns, uuid).await
    }

    async fn range(
        &self,
        ns: &Namespace,
        status: Option<&str>,
        start: isize,
        stop: isize,
    ) -> Result<Vec<String>, BackendError> {
        records::range(self, ns, status, start, stop).await
    }

    async fn ping(&self) -> Result<(), BackendError> {
        records::ping(self).await
    }
}
