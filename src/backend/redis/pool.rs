use std::fmt;
use std::future::Future;
use std::time::Duration;

use bb8_redis::bb8::{Pool, PooledConnection, RunError};
use bb8_redis::RedisConnectionManager;
use tokio::time::sleep;
use tracing::{info, warn};

use crate::backend::BackendError;

/// Pool sizing and timeouts for the Redis backend.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RedisConfig {
    pub max_size: u32,
    pub min_idle: u32,
    /// How long a checkout may wait for a free connection.
    pub conn_timeout: Duration,
    pub idle_timeout: Duration,
    pub max_lifetime: Duration,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            max_size: 50,
            min_idle: 5,
            conn_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(300),
            max_lifetime: Duration::from_secs(1800),
        }
    }
}

const VERIFY_ATTEMPTS: u32 = 4;
const VERIFY_BACKOFF: Duration = Duration::from_millis(400);

/// Connection URL with any credentials masked, for logs and errors.
struct SafeUrl<'a>(&'a str);

impl fmt::Display for SafeUrl<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let masked = self
            .0
            .split_once("://")
            .and_then(|(scheme, rest)| rest.rsplit_once('@').map(|(_, host)| (scheme, host)));
        match masked {
            Some((scheme, host)) => write!(f, "{}://***@{}", scheme, host),
            None => f.write_str(self.0),
        }
    }
}

/// Open a pool against `url` and wait until Redis answers PING.
pub(super) async fn open(
    url: &str,
    config: RedisConfig,
) -> Result<Pool<RedisConnectionManager>, BackendError> {
    if config.max_size == 0 {
        return Err(BackendError::Configuration(
            "redis pool size must be at least 1".into(),
        ));
    }

    let manager = RedisConnectionManager::new(url)
        .map_err(|e| BackendError::Configuration(format!("{}: {}", SafeUrl(url), e)))?;
    let pool = Pool::builder()
        .max_size(config.max_size)
        .min_idle(Some(config.min_idle.clamp(1, config.max_size)))
        .connection_timeout(config.conn_timeout)
        .idle_timeout(Some(config.idle_timeout))
        .max_lifetime(Some(config.max_lifetime))
        .build(manager)
        .await?;

    with_backoff(VERIFY_ATTEMPTS, VERIFY_BACKOFF, || async {
        let mut conn = checkout(&pool).await?;
        ping(&mut conn).await
    })
    .await?;

    info!(
        url = %SafeUrl(url),
        max_size = config.max_size,
        min_idle = config.min_idle,
        "Redis pool ready"
    );
    Ok(pool)
}

/// Take a connection from the pool. A checkout that waits past
/// `conn_timeout` is a [`BackendError::Timeout`].
pub(super) async fn checkout(
    pool: &Pool<RedisConnectionManager>,
) -> Result<PooledConnection<'_, RedisConnectionManager>, BackendError> {
    pool.get().await.map_err(|e| match e {
        RunError::User(err) => err.into(),
        RunError::TimedOut => BackendError::Timeout("no free redis connection".into()),
    })
}

pub(super) async fn ping(
    conn: &mut PooledConnection<'_, RedisConnectionManager>,
) -> Result<(), BackendError> {
    let reply: String = redis::cmd("PING").query_async(&mut **conn).await?;
    if reply != "PONG" {
        return Err(BackendError::Unavailable(format!(
            "unexpected PING reply: {}",
            reply
        )));
    }
    Ok(())
}

/// Run `op` up to `attempts` times, doubling the pause after each
/// retryable failure. Other failures return at once.
async fn with_backoff<F, Fut>(attempts: u32, base: Duration, mut op: F) -> Result<(), BackendError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<(), BackendError>>,
{
    let mut attempt = 1;
    let mut delay = base;
    loop {
        match op().await {
            Ok(()) => return Ok(()),
            Err(err) if attempt < attempts && err.is_retryable() => {
                warn!(
                    attempt,
                    attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "Redis not ready, retrying"
                );
                sleep(delay).await;
                attempt += 1;
                delay *= 2;
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credentials_are_masked() {
        assert_eq!(
            SafeUrl("redis://:secret@localhost:6379/0").to_string(),
            "redis://***@localhost:6379/0"
        );
        assert_eq!(
            SafeUrl("redis://agent:p@ss@cache:6380").to_string(),
            "redis://***@cache:6380"
        );
        assert_eq!(
            SafeUrl("redis://127.0.0.1:6379").to_string(),
            "redis://127.0.0.1:6379"
        );
    }

    #[tokio::test]
    async fn zero_sized_pool_is_a_configuration_error() {
        let config = RedisConfig {
            max_size: 0,
            ..RedisConfig::default()
        };
        let err = open("redis://127.0.0.1:6379", config).await.unwrap_err();
        assert!(matches!(err, BackendError::Configuration(_)));
    }

    #[tokio::test]
    async fn unreachable_server_is_retried_until_attempts_run_out() {
        let mut calls = 0u32;
        let result = with_backoff(3, Duration::from_millis(1), || {
            calls += 1;
            async { Err(BackendError::Unavailable("refused".into())) }
        })
        .await;
        assert!(matches!(result, Err(BackendError::Unavailable(_))));
        assert_eq!(calls, 3);
    }

    #[tokio::test]
    async fn configuration_errors_are_not_retried() {
        let mut calls = 0u32;
        let result = with_backoff(3, Duration::from_millis(1), || {
            calls += 1;
            async { Err(BackendError::Configuration("bad url".into())) }
        })
        .await;
        assert!(matches!(result, Err(BackendError::Configuration(_))));
        assert_eq!(calls, 1);
    }

    #[tokio::test]
    async fn stops_after_first_success() {
        let mut calls = 0u32;
        let result = with_backoff(5, Duration::from_millis(1), || {
            calls += 1;
            let outcome = if calls < 2 {
                Err(BackendError::Timeout("slow".into()))
            } else {
                Ok(())
            };
            async move { outcome }
        })
        .await;
        assert!(result.is_ok());
        assert_eq!(calls, 2);
    }
}
