//! # payload
//!
//! Live state for call-center queues. Each queue holds an ordered line of
//! **callers** and a set of **members** (agents); both are ranked by
//! creation time, indexed by status, and stored in Redis.
//!
//! ## Features
//!
//! - **Ordered queues**: callers keep their place, `position` is computed
//!   from the live rank on every read
//! - **Status indexes**: list the leading callers or members in a status
//! - **Atomic transitions**: status moves and deletes are single Redis scripts
//! - **Events**: every mutation emits `queue.<entity>.<action>`
//! - **HTTP API**: axum routers with server-sent events (`axum-api`, default)
//! - **Directory**: Postgres records of queues, agents and memberships
//!   (`postgres`)
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use payload::{CallerStatus, CallerUpdate, NewQueueCaller, QueueCache};
//!
//! # async fn example() -> Result<(), payload::QueueError> {
//! let cache = QueueCache::builder().build().await?;
//!
//! let caller = cache
//!     .create_queue_caller("support", NewQueueCaller::with_number("555-1234"))
//!     .await?;
//! assert_eq!(caller.status, CallerStatus::Waiting);
//!
//! cache
//!     .update_queue_caller("support", &caller.uuid, CallerUpdate::status(CallerStatus::Connected))
//!     .await?;
//! let connected = cache
//!     .list_queue_callers("support", Some(CallerStatus::Connected))
//!     .await?;
//! assert_eq!(connected.len(), 1);
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod cache;
pub mod clock;
pub mod config;
pub mod error;
pub mod models;
pub mod notify;

#[cfg(feature = "axum-api")]
pub mod api;

#[cfg(feature = "postgres")]
pub mod directory;

pub use cache::{QueueCache, QueueCacheBuilder};
pub use config::{ConfigError, RedisSettings, Settings};
pub use error::QueueError;
pub use models::{
    CallerStatus, CallerUpdate, MemberStatus, MemberUpdate, NewQueueCaller, NewQueueMember,
    QueueCaller, QueueMember, UnknownStatus,
};
pub use notify::{Notifier, QueueEvent};
