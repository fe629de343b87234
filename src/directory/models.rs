use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;

/// Maximum length of a queue name.
pub const QUEUE_NAME_MAX_LEN: usize = 80;

/// A queue definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Queue {
    #[serde(skip_serializing)]
    pub id: i64,
    pub uuid: String,
    pub name: String,
    /// Free-form JSON description
    pub description: Option<Value>,
    pub disabled: bool,
    pub project_id: Option<String>,
    pub user_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewQueue {
    #[serde(default)]
    pub uuid: Option<String>,
    pub name: String,
    #[serde(default)]
    pub description: Option<Value>,
    #[serde(default)]
    pub disabled: bool,
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
}

/// Partial update of a queue. `None` leaves the column untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueUpdate {
    pub name: Option<String>,
    pub description: Option<Value>,
    pub disabled: Option<bool>,
}

/// An agent that can be attached to queues.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Agent {
    #[serde(skip_serializing)]
    pub id: i64,
    pub uuid: String,
    pub project_id: Option<String>,
    pub user_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NewAgent {
    pub uuid: Option<String>,
    pub project_id: Option<String>,
    pub user_id: Option<String>,
}

/// Link between an agent and a queue; unique per pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct QueueMembership {
    #[serde(skip_serializing)]
    pub id: i64,
    pub agent_uuid: String,
    pub queue_uuid: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn new_queue_requires_only_a_name() {
        let new: NewQueue = serde_json::from_value(json!({ "name": "support" })).unwrap();
        assert_eq!(new.name, "support");
        assert!(!new.disabled);
        assert!(new.uuid.is_none());
        assert!(serde_json::from_value::<NewQueue>(json!({})).is_err());
    }

    #[test]
    fn queue_json_hides_row_id() {
        let now = Utc::now();
        let queue = Queue {
            id: 7,
            uuid: "q1".into(),
            name: "support".into(),
            description: Some(json!({ "lang": "en" })),
            disabled: false,
            project_id: Some("p1".into()),
            user_id: None,
            created_at: now,
            updated_at: now,
        };
        let value = serde_json::to_value(&queue).unwrap();
        assert!(value.get("id").is_none());
        assert_eq!(value["description"]["lang"], "en");
    }
}
