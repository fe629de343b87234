//! Axum HTTP endpoints for the queue service.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use payload::api::{router, ApiState};
//! use payload::backend::MemoryBackend;
//! use payload::notify::BroadcastNotifier;
//! use payload::QueueCache;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let events = BroadcastNotifier::default();
//! let cache = QueueCache::new(Arc::new(MemoryBackend::new()), Arc::new(events.clone()));
//! let app = router(ApiState::new(cache).with_events(events.sender()));
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```

#[cfg(feature = "postgres")]
mod directory;
mod error;
mod queues;

use axum::{routing::get, Router};
use tokio::sync::broadcast;

pub use error::ApiError;

use crate::cache::QueueCache;
#[cfg(feature = "postgres")]
use crate::directory::DirectoryStore;
use crate::notify::QueueEvent;

/// Shared handler state.
#[derive(Clone)]
pub struct ApiState {
    pub(crate) cache: QueueCache,
    pub(crate) events: Option<broadcast::Sender<QueueEvent>>,
    #[cfg(feature = "postgres")]
    pub(crate) directory: Option<DirectoryStore>,
}

impl ApiState {
    pub fn new(cache: QueueCache) -> Self {
        Self {
            cache,
            events: None,
            #[cfg(feature = "postgres")]
            directory: None,
        }
    }

    /// Serve `/v1/events` from this broadcast channel.
    pub fn with_events(mut self, events: broadcast::Sender<QueueEvent>) -> Self {
        self.events = Some(events);
        self
    }

    #[cfg(feature = "postgres")]
    pub fn with_directory(mut self, directory: DirectoryStore) -> Self {
        self.directory = Some(directory);
        self
    }
}

/// Build the full service router.
pub fn router(state: ApiState) -> Router {
    let app = Router::new()
        .route("/healthz", get(queues::health))
        .route("/v1/events", get(queues::event_stream))
        .route(
            "/v1/queues/:queue_id/callers",
            get(queues::list_callers).post(queues::create_caller),
        )
        .route(
            "/v1/queues/:queue_id/callers/:uuid",
            get(queues::get_caller)
                .put(queues::update_caller)
                .delete(queues::delete_caller),
        )
        .route(
            "/v1/queues/:queue_id/members",
            get(queues::list_members).post(queues::create_member),
        )
        .route(
            "/v1/queues/:queue_id/members/:uuid",
            get(queues::get_member)
                .put(queues::update_member)
                .delete(queues::delete_member),
        );

    #[cfg(feature = "postgres")]
    let app = app
        .route(
            "/v1/directory/queues",
            get(directory::list_queues).post(directory::create_queue),
        )
        .route(
            "/v1/directory/queues/:uuid",
            get(directory::get_queue)
                .put(directory::update_queue)
                .delete(directory::delete_queue),
        )
        .route(
            "/v1/directory/queues/:uuid/members",
            get(directory::list_queue_members).post(directory::create_queue_member),
        )
        .route(
            "/v1/directory/queues/:uuid/members/:agent_uuid",
            get(directory::get_queue_member).delete(directory::delete_queue_member),
        )
        .route(
            "/v1/directory/agents",
            get(directory::list_agents).post(directory::create_agent),
        )
        .route(
            "/v1/directory/agents/:uuid",
            get(directory::get_agent).delete(directory::delete_agent),
        );

    app.with_state(state)
}
