//! Service configuration.
//!
//! Everything is passed explicitly into constructors; [`Settings::from_env`]
//! is a convenience for the binary.

use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;

use crate::backend::redis::RedisConfig;
use crate::notify::DEFAULT_EVENTS_STREAM;

/// Number of entries returned by a status-filtered listing unless configured.
pub const DEFAULT_STATUS_LIST_LIMIT: usize = 2;

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("invalid value '{value}' for {key}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Redis connection settings.
#[derive(Debug, Clone, PartialEq)]
pub struct RedisSettings {
    pub host: String,
    pub port: u16,
    /// Logical database index
    pub database: u32,
    /// Password for `AUTH`, if any
    pub password: Option<String>,
    pub pool: RedisConfig,
}

impl Default for RedisSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 6379,
            database: 0,
            password: None,
            pool: RedisConfig::default(),
        }
    }
}

impl RedisSettings {
    /// Connection URL, `redis://[:password@]host:port/database`.
    pub fn url(&self) -> String {
        match &self.password {
            Some(password) => format!(
                "redis://:{}@{}:{}/{}",
                password, self.host, self.port, self.database
            ),
            None => format!("redis://{}:{}/{}", self.host, self.port, self.database),
        }
    }
}

/// Top-level settings for the API service.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub bind_addr: SocketAddr,
    pub redis: RedisSettings,
    /// Cap on status-filtered listings; `None` returns the whole status set
    pub status_list_limit: Option<usize>,
    /// Redis stream receiving events; `None` disables stream publishing
    pub events_stream: Option<String>,
    /// Postgres URL for the directory store
    pub database_url: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            redis: RedisSettings::default(),
            status_list_limit: Some(DEFAULT_STATUS_LIST_LIMIT),
            events_stream: Some(DEFAULT_EVENTS_STREAM.to_string()),
            database_url: None,
        }
    }
}

impl Settings {
    /// Read settings from the process environment.
    ///
    /// | variable                    | default        |
    /// |-----------------------------|----------------|
    /// | `PAYLOAD_BIND`              | `0.0.0.0:8080` |
    /// | `PAYLOAD_REDIS_HOST`        | `127.0.0.1`    |
    /// | `PAYLOAD_REDIS_PORT`        | `6379`         |
    /// | `PAYLOAD_REDIS_DATABASE`    | `0`            |
    /// | `PAYLOAD_REDIS_PASSWORD`    | unset          |
    /// | `PAYLOAD_REDIS_POOL_SIZE`   | `50`           |
    /// | `PAYLOAD_REDIS_TIMEOUT_SECS`| `30`           |
    /// | `PAYLOAD_STATUS_LIST_LIMIT` | `2` (`all` = no cap) |
    /// | `PAYLOAD_EVENTS_STREAM`     | `queue:events` (`off` = disabled) |
    /// | `DATABASE_URL`              | unset          |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut settings = Settings::default();

        if let Some(raw) = lookup("PAYLOAD_BIND") {
            settings.bind_addr = parse("PAYLOAD_BIND", &raw)?;
        }
        if let Some(raw) = lookup("PAYLOAD_REDIS_HOST") {
            settings.redis.host = raw;
        }
        if let Some(raw) = lookup("PAYLOAD_REDIS_PORT") {
            settings.redis.port = parse("PAYLOAD_REDIS_PORT", &raw)?;
        }
        if let Some(raw) = lookup("PAYLOAD_REDIS_DATABASE") {
            settings.redis.database = parse("PAYLOAD_REDIS_DATABASE", &raw)?;
        }
        settings.redis.password = lookup("PAYLOAD_REDIS_PASSWORD").filter(|p| !p.is_empty());
        if let Some(raw) = lookup("PAYLOAD_REDIS_POOL_SIZE") {
            settings.redis.pool.max_size = parse("PAYLOAD_REDIS_POOL_SIZE", &raw)?;
        }
        if let Some(raw) = lookup("PAYLOAD_REDIS_TIMEOUT_SECS") {
            let secs: u64 = parse("PAYLOAD_REDIS_TIMEOUT_SECS", &raw)?;
            settings.redis.pool.conn_timeout = Duration::from_secs(secs);
        }
        if let Some(raw) = lookup("PAYLOAD_STATUS_LIST_LIMIT") {
            settings.status_list_limit = if raw.eq_ignore_ascii_case("all") {
                None
            } else {
                Some(parse("PAYLOAD_STATUS_LIST_LIMIT", &raw)?)
            };
        }
        if let Some(raw) = lookup("PAYLOAD_EVENTS_STREAM") {
            settings.events_stream = if raw.is_empty() || raw.eq_ignore_ascii_case("off") {
                None
            } else {
                Some(raw)
            };
        }
        settings.database_url = lookup("DATABASE_URL").filter(|u| !u.is_empty());

        Ok(settings)
    }
}

fn parse<T>(key: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
        key,
        value: raw.to_string(),
        reason: e.to_string(),
    })
}
