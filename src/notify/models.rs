//! Notification event types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::backend::EntityKind;

/// Mutation that triggered an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventAction {
    Create,
    Update,
    Delete,
}

impl EventAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventAction::Create => "create",
            EventAction::Update => "update",
            EventAction::Delete => "delete",
        }
    }
}

/// A notification emitted after a caller or member mutation.
///
/// `payload` is the entity's field/value mapping: the post-mutation
/// snapshot for create and update, the pre-delete snapshot for delete.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueEvent {
    /// Dotted event name, e.g. `queue.caller.create`
    pub event: String,
    pub entity: EntityKind,
    pub action: EventAction,
    pub queue_id: String,
    pub uuid: String,
    /// When the event was emitted
    pub timestamp: DateTime<Utc>,
    pub payload: Value,
}

impl QueueEvent {
    pub fn new(
        entity: EntityKind,
        action: EventAction,
        queue_id: impl Into<String>,
        uuid: impl Into<String>,
        payload: Value,
    ) -> Self {
        Self {
            event: Self::name(entity, action),
            entity,
            action,
            queue_id: queue_id.into(),
            uuid: uuid.into(),
            timestamp: Utc::now(),
            payload,
        }
    }

    /// `queue.<entity>.<action>`
    pub fn name(entity: EntityKind, action: EventAction) -> String {
        format!("queue.{}.{}", entity.as_str(), action.as_str())
    }
}
