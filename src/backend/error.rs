use thiserror::Error;

/// Failure reported by a [`QueueBackend`](super::QueueBackend).
///
/// Missing records are not errors at this layer: `load`, `update` and
/// `remove` report them through their return values and the cache turns
/// them into not-found errors.
#[derive(Error, Debug)]
pub enum BackendError {
    /// The store could not be reached or dropped the connection.
    #[error("backend unavailable: {0}")]
    Unavailable(String),

    #[error("backend timed out: {0}")]
    Timeout(String),

    /// Bad URL or pool settings. Retrying will not help.
    #[error("backend misconfigured: {0}")]
    Configuration(String),

    #[error("backend failure: {0}")]
    Internal(String),
}

impl BackendError {
    /// Whether the same call may succeed if tried again later.
    pub fn is_retryable(&self) -> bool {
        matches!(self, BackendError::Unavailable(_) | BackendError::Timeout(_))
    }
}

impl From<redis::RedisError> for BackendError {
    fn from(err: redis::RedisError) -> Self {
        match err.kind() {
            redis::ErrorKind::InvalidClientConfig => BackendError::Configuration(err.to_string()),
            _ if err.is_timeout() => BackendError::Timeout(err.to_string()),
            _ => BackendError::Unavailable(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_connection_trouble_is_retryable() {
        assert!(BackendError::Unavailable("refused".into()).is_retryable());
        assert!(BackendError::Timeout("pool checkout".into()).is_retryable());
        assert!(!BackendError::Configuration("bad url".into()).is_retryable());
        assert!(!BackendError::Internal("lock poisoned".into()).is_retryable());
    }

    #[test]
    fn invalid_client_config_is_not_retried() {
        let err = redis::RedisError::from((redis::ErrorKind::InvalidClientConfig, "bad url"));
        assert!(matches!(BackendError::from(err), BackendError::Configuration(_)));

        let err = redis::RedisError::from((redis::ErrorKind::IoError, "reset"));
        assert!(BackendError::from(err).is_retryable());
    }
}
