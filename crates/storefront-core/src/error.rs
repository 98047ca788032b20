//! Sync error handling
//!
//! Every remote operation fails with one of four kinds. The reason string
//! is human-readable and is what callers end up showing to the operator.

use thiserror::Error;

/// Errors that can occur while talking to the remote store
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SyncError {
    /// Network or service failure
    #[error("Remote store unavailable: {0}")]
    RemoteUnavailable(String),

    /// The mutation target does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// The payload was malformed or rejected by the server
    #[error("Validation rejected: {0}")]
    ValidationRejected(String),

    /// The role check failed or the credentials were refused
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
}

impl SyncError {
    /// Classify an HTTP status code returned by the remote store
    pub fn from_status(status: u16, reason: impl Into<String>) -> Self {
        let reason = reason.into();
        match status {
            401 | 403 => SyncError::Unauthorized(reason),
            404 => SyncError::NotFound(reason),
            400 | 409 | 422 => SyncError::ValidationRejected(reason),
            _ => SyncError::RemoteUnavailable(reason),
        }
    }

    /// The human-readable reason without the kind prefix
    pub fn reason(&self) -> &str {
        match self {
            SyncError::RemoteUnavailable(r)
            | SyncError::NotFound(r)
            | SyncError::ValidationRejected(r)
            | SyncError::Unauthorized(r) => r,
        }
    }

    /// Whether repeating the same call later could succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, SyncError::RemoteUnavailable(_))
    }
}

impl From<reqwest::Error> for SyncError {
    fn from(error: reqwest::Error) -> Self {
        match error.status() {
            Some(status) => SyncError::from_status(status.as_u16(), error.to_string()),
            None if error.is_decode() => {
                SyncError::RemoteUnavailable(format!("unreadable response: {}", error))
            }
            None => SyncError::RemoteUnavailable(error.to_string()),
        }
    }
}

/// Result type for remote operations
pub type SyncResult<T> = Result<T, SyncError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        assert!(matches!(
            SyncError::from_status(401, "bad key"),
            SyncError::Unauthorized(_)
        ));
        assert!(matches!(
            SyncError::from_status(403, "rls"),
            SyncError::Unauthorized(_)
        ));
        assert!(matches!(
            SyncError::from_status(404, "gone"),
            SyncError::NotFound(_)
        ));
        assert!(matches!(
            SyncError::from_status(422, "bad"),
            SyncError::ValidationRejected(_)
        ));
        assert!(matches!(
            SyncError::from_status(503, "down"),
            SyncError::RemoteUnavailable(_)
        ));
    }

    #[test]
    fn test_reason_and_display() {
        let err = SyncError::NotFound("product 7".to_string());
        assert_eq!(err.reason(), "product 7");
        assert_eq!(err.to_string(), "Not found: product 7");
    }

    #[test]
    fn test_only_unavailable_is_retryable() {
        assert!(SyncError::RemoteUnavailable("timeout".into()).is_retryable());
        assert!(!SyncError::ValidationRejected("bad".into()).is_retryable());
        assert!(!SyncError::Unauthorized("no".into()).is_retryable());
    }
}
