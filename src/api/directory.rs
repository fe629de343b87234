//! Handlers for queue, agent and membership records.
//!
//! `X-User-Id` and `X-Tenant-Id` fill `user_id` and `project_id` on create
//! when the body leaves them out; `X-Tenant-Id` also scopes listings.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{HeaderMap, StatusCode},
    Json,
};

use super::{ApiError, ApiState};
use crate::directory::{
    Agent, DirectoryStore, NewAgent, NewQueue, Queue, QueueMembership, QueueUpdate,
};

pub(super) const USER_HEADER: &str = "x-user-id";
pub(super) const TENANT_HEADER: &str = "x-tenant-id";

fn header(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn store(state: &ApiState) -> Result<&DirectoryStore, ApiError> {
    state
        .directory
        .as_ref()
        .ok_or_else(|| ApiError::NotFound("directory is not enabled".to_string()))
}

// ============================================================================
// Queues
// ============================================================================

pub(super) async fn list_queues(
    State(state): State<ApiState>,
    headers: HeaderMap,
) -> Result<Json<Vec<Queue>>, ApiError> {
    let tenant = header(&headers, TENANT_HEADER);
    Ok(Json(store(&state)?.list_queues(tenant.as_deref()).await?))
}

pub(super) async fn create_queue(
    State(state): State<ApiState>,
    headers: HeaderMap,
    payload: Result<Json<NewQueue>, JsonRejection>,
) -> Result<(StatusCode, Json<Queue>), ApiError> {
    let Json(mut new) = payload?;
    if new.user_id.is_none() {
        new.user_id = header(&headers, USER_HEADER);
    }
    if new.project_id.is_none() {
        new.project_id = header(&headers, TENANT_HEADER);
    }
    let queue = store(&state)?.create_queue(new).await?;
    Ok((StatusCode::CREATED, Json(queue)))
}

pub(super) async fn get_queue(
    State(state): State<ApiState>,
    Path(uuid): Path<String>,
) -> Result<Json<Queue>, ApiError> {
    Ok(Json(store(&state)?.get_queue(&uuid).await?))
}

pub(super) async fn update_queue(
    State(state): State<ApiState>,
    Path(uuid): Path<String>,
    payload: Result<Json<QueueUpdate>, JsonRejection>,
) -> Result<Json<Queue>, ApiError> {
    let Json(update) = payload?;
    Ok(Json(store(&state)?.update_queue(&uuid, update).await?))
}

pub(super) async fn delete_queue(
    State(state): State<ApiState>,
    Path(uuid): Path<String>,
) -> Result<StatusCode, ApiError> {
    store(&state)?.delete_queue(&uuid).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Agents
// ============================================================================

pub(super) async fn list_agents(
    State(state): State<ApiState>,
    headers: HeaderMap,
) -> Result<Json<Vec<Agent>>, ApiError> {
    let tenant = header(&headers, TENANT_HEADER);
    Ok(Json(store(&state)?.list_agents(tenant.as_deref()).await?))
}

pub(super) async fn create_agent(
    State(state): State<ApiState>,
    headers: HeaderMap,
    payload: Result<Json<NewAgent>, JsonRejection>,
) -> Result<(StatusCode, Json<Agent>), ApiError> {
    let Json(mut new) = payload?;
    if new.user_id.is_none() {
        new.user_id = header(&headers, USER_HEADER);
    }
    if new.project_id.is_none() {
        new.project_id = header(&headers, TENANT_HEADER);
    }
    let agent = store(&state)?.create_agent(new).await?;
    Ok((StatusCode::CREATED, Json(agent)))
}

pub(super) async fn get_agent(
    State(state): State<ApiState>,
    Path(uuid): Path<String>,
) -> Result<Json<Agent>, ApiError> {
    Ok(Json(store(&state)?.get_agent(&uuid).await?))
}

pub(super) async fn delete_agent(
    State(state): State<ApiState>,
    Path(uuid): Path<String>,
) -> Result<StatusCode, ApiError> {
    store(&state)?.delete_agent(&uuid).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Queue memberships
// ============================================================================

#[derive(serde::Deserialize)]
pub(super) struct NewMembership {
    agent_uuid: String,
}

pub(super) async fn list_queue_members(
    State(state): State<ApiState>,
    Path(queue_uuid): Path<String>,
) -> Result<Json<Vec<QueueMembership>>, ApiError> {
    Ok(Json(store(&state)?.list_queue_members(&queue_uuid).await?))
}

pub(super) async fn create_queue_member(
    State(state): State<ApiState>,
    Path(queue_uuid): Path<String>,
    payload: Result<Json<NewMembership>, JsonRejection>,
) -> Result<(StatusCode, Json<QueueMembership>), ApiError> {
    let Json(new) = payload?;
    let membership = store(&state)?
        .create_queue_member(&new.agent_uuid, &queue_uuid)
        .await?;
    Ok((StatusCode::CREATED, Json(membership)))
}

pub(super) async fn get_queue_member(
    State(state): State<ApiState>,
    Path((queue_uuid, agent_uuid)): Path<(String, String)>,
) -> Result<Json<QueueMembership>, ApiError> {
    Ok(Json(
        store(&state)?
            .get_queue_member(&agent_uuid, &queue_uuid)
            .await?,
    ))
}

pub(super) async fn delete_queue_member(
    State(state): State<ApiState>,
    Path((queue_uuid, agent_uuid)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    store(&state)?
        .delete_queue_member(&agent_uuid, &queue_uuid)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
