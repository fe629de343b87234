//! Handlers for live queue callers and members.

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use futures::stream::{self, Stream};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::broadcast::error::RecvError;
use tracing::warn;

use super::{ApiError, ApiState};
use crate::models::{
    CallerStatus, CallerUpdate, MemberStatus, MemberUpdate, NewQueueCaller, NewQueueMember,
    QueueCaller, QueueMember,
};

#[derive(Deserialize, Default)]
pub(super) struct StatusFilter {
    status: Option<String>,
}

impl StatusFilter {
    fn parse<S>(&self) -> Result<Option<S>, ApiError>
    where
        S: std::str::FromStr,
        S::Err: std::fmt::Display,
    {
        match self.status.as_deref().filter(|s| !s.is_empty()) {
            Some(raw) => raw
                .parse()
                .map(Some)
                .map_err(|e: S::Err| ApiError::BadRequest(e.to_string())),
            None => Ok(None),
        }
    }
}

// ============================================================================
// Callers
// ============================================================================

pub(super) async fn list_callers(
    State(state): State<ApiState>,
    Path(queue_id): Path<String>,
    Query(filter): Query<StatusFilter>,
) -> Result<Json<Vec<QueueCaller>>, ApiError> {
    let status = filter.parse::<CallerStatus>()?;
    let callers = state.cache.list_queue_callers(&queue_id, status).await?;
    Ok(Json(callers))
}

pub(super) async fn create_caller(
    State(state): State<ApiState>,
    Path(queue_id): Path<String>,
    payload: Result<Json<NewQueueCaller>, JsonRejection>,
) -> Result<(StatusCode, Json<QueueCaller>), ApiError> {
    let Json(new) = payload?;
    let caller = state.cache.create_queue_caller(&queue_id, new).await?;
    Ok((StatusCode::CREATED, Json(caller)))
}

pub(super) async fn get_caller(
    State(state): State<ApiState>,
    Path((queue_id, uuid)): Path<(String, String)>,
) -> Result<Json<QueueCaller>, ApiError> {
    Ok(Json(state.cache.get_queue_caller(&queue_id, &uuid).await?))
}

pub(super) async fn update_caller(
    State(state): State<ApiState>,
    Path((queue_id, uuid)): Path<(String, String)>,
    payload: Result<Json<CallerUpdate>, JsonRejection>,
) -> Result<Json<QueueCaller>, ApiError> {
    let Json(update) = payload?;
    Ok(Json(
        state
            .cache
            .update_queue_caller(&queue_id, &uuid, update)
            .await?,
    ))
}

pub(super) async fn delete_caller(
    State(state): State<ApiState>,
    Path((queue_id, uuid)): Path<(String, String)>,
) -> Result<Json<QueueCaller>, ApiError> {
    Ok(Json(state.cache.delete_queue_caller(&queue_id, &uuid).await?))
}

// ============================================================================
// Members
// ============================================================================

pub(super) async fn list_members(
    State(state): State<ApiState>,
    Path(queue_id): Path<String>,
    Query(filter): Query<StatusFilter>,
) -> Result<Json<Vec<QueueMember>>, ApiError> {
    let status = filter.parse::<MemberStatus>()?;
    let members = state.cache.list_queue_members(&queue_id, status).await?;
    Ok(Json(members))
}

pub(super) async fn create_member(
    State(state): State<ApiState>,
    Path(queue_id): Path<String>,
    payload: Result<Json<NewQueueMember>, JsonRejection>,
) -> Result<(StatusCode, Json<QueueMember>), ApiError> {
    let Json(new) = payload?;
    let member = state.cache.create_queue_member(&queue_id, new).await?;
    Ok((StatusCode::CREATED, Json(member)))
}

pub(super) async fn get_member(
    State(state): State<ApiState>,
    Path((queue_id, uuid)): Path<(String, String)>,
) -> Result<Json<QueueMember>, ApiError> {
    Ok(Json(state.cache.get_queue_member(&queue_id, &uuid).await?))
}

pub(super) async fn update_member(
    State(state): State<ApiState>,
    Path((queue_id, uuid)): Path<(String, String)>,
    payload: Result<Json<MemberUpdate>, JsonRejection>,
) -> Result<Json<QueueMember>, ApiError> {
    let Json(update) = payload?;
    Ok(Json(
        state
            .cache
            .update_queue_member(&queue_id, &uuid, update)
            .await?,
    ))
}

pub(super) async fn delete_member(
    State(state): State<ApiState>,
    Path((queue_id, uuid)): Path<(String, String)>,
) -> Result<Json<QueueMember>, ApiError> {
    Ok(Json(state.cache.delete_queue_member(&queue_id, &uuid).await?))
}

// ============================================================================
// Events and health
// ============================================================================

pub(super) async fn event_stream(
    State(state): State<ApiState>,
) -> Result<Sse<impl Stream<Item = Result<Event, axum::Error>>>, ApiError> {
    let rx = state
        .events
        .as_ref()
        .map(|tx| tx.subscribe())
        .ok_or_else(|| ApiError::NotFound("event stream is not enabled".to_string()))?;

    let stream = stream::unfold(rx, |mut rx| async move {
        loop {
            match rx.recv().await {
                Ok(event) => {
                    let sse = Event::default().event(event.event.clone()).json_data(&event);
                    return Some((sse, rx));
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped = skipped, "SSE subscriber lagged behind");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    });

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

pub(super) async fn health(State(state): State<ApiState>) -> Result<Json<Value>, ApiError> {
    state
        .cache
        .ping()
        .await
        .map_err(|e| ApiError::Unavailable(e.to_string()))?;
    Ok(Json(json!({ "status": "ok" })))
}
