use std::sync::Arc;

use anyhow::Context;
use axum::serve;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

use payload::api::{router, ApiState};
use payload::backend::RedisBackend;
use payload::notify::{BroadcastNotifier, FanoutNotifier, RedisStreamNotifier};
use payload::{QueueCache, Settings};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let settings = Settings::from_env().context("invalid configuration")?;

    let backend = RedisBackend::connect(&settings.redis)
        .await
        .context("failed to connect to Redis")?;

    let events = BroadcastNotifier::default();
    let mut notifier = FanoutNotifier::new().with(Arc::new(events.clone()));
    if let Some(stream_key) = &settings.events_stream {
        notifier = notifier.with(Arc::new(
            RedisStreamNotifier::new(backend.pool().clone()).with_stream_key(stream_key.clone()),
        ));
        info!(stream = %stream_key, "Publishing events to Redis stream");
    }

    let cache = QueueCache::new(Arc::new(backend), Arc::new(notifier))
        .with_status_list_limit(settings.status_list_limit);

    let state = ApiState::new(cache).with_events(events.sender());
    let state = attach_directory(state, &settings).await?;

    let app = router(state)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );

    let listener = tokio::net::TcpListener::bind(settings.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", settings.bind_addr))?;
    info!(addr = %listener.local_addr()?, "payload-api listening");

    serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("payload-api stopped");
    Ok(())
}

#[cfg(feature = "postgres")]
async fn attach_directory(state: ApiState, settings: &Settings) -> anyhow::Result<ApiState> {
    let Some(database_url) = &settings.database_url else {
        return Ok(state);
    };
    let directory = payload::directory::DirectoryStore::new(database_url)
        .await
        .context("failed to connect to PostgreSQL")?;
    info!("Directory store enabled");
    Ok(state.with_directory(directory))
}

#[cfg(not(feature = "postgres"))]
async fn attach_directory(state: ApiState, _settings: &Settings) -> anyhow::Result<ApiState> {
    Ok(state)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for Ctrl-C");
    }
}
