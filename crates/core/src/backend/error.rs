use thiserror::Error;

use crate::error::ErrorKind;

/// Errors that can occur when talking to the enrollment backend.
#[derive(Debug, Clone, Error)]
pub enum BackendError {
    /// The backend refused the request (`{success: false}` or a 4xx with an
    /// error body).
    #[error("{endpoint} rejected: {message}")]
    Rejected {
        endpoint: String,
        message: String,
        /// Per-item messages (`error.errors[].error`).
        errors: Vec<String>,
    },

    /// Resource not found (404).
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Any other non-success status.
    #[error("API error on {endpoint}: {status} - {message}")]
    ApiError {
        endpoint: String,
        status: u16,
        message: String,
    },

    /// Request timed out.
    #[error("Request to {0} timed out")]
    Timeout(String),

    /// Could not connect.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Failed to parse response.
    #[error("Failed to parse response: {0}")]
    ParseError(String),

    /// Client not configured.
    #[error("Client not configured: {0}")]
    NotConfigured(String),
}

impl BackendError {
    /// Whether repeating the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            BackendError::Timeout(_) | BackendError::ConnectionFailed(_) => true,
            BackendError::ApiError { status, .. } => *status >= 500,
            _ => false,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            BackendError::Rejected { .. } => ErrorKind::Eligibility,
            BackendError::NotFound(_) => ErrorKind::Validation,
            BackendError::ApiError { status, .. } if *status < 500 => ErrorKind::Eligibility,
            BackendError::NotConfigured(_) => ErrorKind::Validation,
            _ => ErrorKind::Transient,
        }
    }

    /// Messages to show the user: the per-item errors when present, the
    /// summary otherwise.
    pub fn messages(&self) -> Vec<String> {
        match self {
            BackendError::Rejected {
                message, errors, ..
            } if errors.is_empty() => vec![message.clone()],
            BackendError::Rejected { errors, .. } => errors.clone(),
            other => vec![other.to_string()],
        }
    }

    pub(crate) fn from_reqwest(endpoint: &str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            BackendError::Timeout(endpoint.to_string())
        } else if err.is_connect() {
            BackendError::ConnectionFailed(err.to_string())
        } else if err.is_decode() {
            BackendError::ParseError(format!("{}: {}", endpoint, err))
        } else {
            BackendError::ApiError {
                endpoint: endpoint.to_string(),
                status: err.status().map(|s| s.as_u16()).unwrap_or(0),
                message: err.to_string(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable() {
        assert!(BackendError::Timeout("advising".into()).is_retryable());
        assert!(BackendError::ConnectionFailed("refused".into()).is_retryable());
        assert!(BackendError::ApiError {
            endpoint: "batch".into(),
            status: 503,
            message: String::new()
        }
        .is_retryable());
        assert!(!BackendError::ApiError {
            endpoint: "batch".into(),
            status: 403,
            message: String::new()
        }
        .is_retryable());
        assert!(!BackendError::NotFound("student".into()).is_retryable());
    }

    #[test]
    fn test_kind() {
        let rejected = BackendError::Rejected {
            endpoint: "batch".into(),
            message: "Enrollment failed".into(),
            errors: vec![],
        };
        assert_eq!(rejected.kind(), ErrorKind::Eligibility);
        assert_eq!(BackendError::Timeout("x".into()).kind(), ErrorKind::Transient);
        assert_eq!(BackendError::NotFound("x".into()).kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_messages_prefer_item_errors() {
        let err = BackendError::Rejected {
            endpoint: "batch".into(),
            message: "Enrollment failed".into(),
            errors: vec!["CS101 is full".into(), "MATH1 is full".into()],
        };
        assert_eq!(err.messages(), vec!["CS101 is full", "MATH1 is full"]);

        let err = BackendError::Rejected {
            endpoint: "batch".into(),
            message: "Enrollment failed".into(),
            errors: vec![],
        };
        assert_eq!(err.messages(), vec!["Enrollment failed"]);
    }
}
