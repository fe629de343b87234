use thiserror::Error;

/// Errors returned by [`DirectoryStore`](super::DirectoryStore).
#[derive(Error, Debug)]
pub enum DirectoryError {
    #[error("queue {0} could not be found")]
    QueueNotFound(String),

    #[error("agent {0} could not be found")]
    AgentNotFound(String),

    #[error("agent {agent_uuid} is not a member of queue {queue_uuid}")]
    QueueMemberNotFound {
        agent_uuid: String,
        queue_uuid: String,
    },

    /// Unique or foreign-key violation
    #[error("conflict: {0}")]
    Conflict(String),

    /// Input rejected before reaching the database
    #[error("invalid input: {0}")]
    Invalid(String),

    #[error("database error: {0}")]
    Database(String),
}

impl DirectoryError {
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            DirectoryError::QueueNotFound(_)
                | DirectoryError::AgentNotFound(_)
                | DirectoryError::QueueMemberNotFound { .. }
        )
    }
}

impl From<sqlx::Error> for DirectoryError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db)
                if db.is_unique_violation() || db.is_foreign_key_violation() =>
            {
                DirectoryError::Conflict(db.message().to_string())
            }
            _ => DirectoryError::Database(err.to_string()),
        }
    }
}
