use thiserror::Error;

use crate::backend::BackendError;
use crate::notify::NotifyError;

/// Errors returned by [`QueueCache`](crate::QueueCache) operations.
#[derive(Error, Debug)]
pub enum QueueError {
    /// No caller record exists for `(queue_id, uuid)`
    #[error("queue caller {uuid} could not be found in queue {queue_id}")]
    CallerNotFound { queue_id: String, uuid: String },

    /// No member record exists for `(queue_id, uuid)`
    #[error("queue member {uuid} could not be found in queue {queue_id}")]
    MemberNotFound { queue_id: String, uuid: String },

    /// A stored record could not be decoded
    #[error("invalid record: {0}")]
    InvalidRecord(String),

    #[error(transparent)]
    Backend(#[from] BackendError),

    /// The storage mutation succeeded but publishing its event failed
    #[error("notification failed: {0}")]
    Notify(#[from] NotifyError),
}

impl QueueError {
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            QueueError::CallerNotFound { .. } | QueueError::MemberNotFound { .. }
        )
    }
}
