//! Error classification shared by every workflow-facing error.

use serde::Serialize;

/// How a failure is presented and whether it can be retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Missing or invalid input; shown next to the field, retry after fixing.
    Validation,
    /// Student not eligible for the action; blocking, back to the list.
    Eligibility,
    /// Network or server failure; retry the same action.
    Transient,
    /// A compensating rollback was needed (and may itself have failed).
    Rollback,
}

impl ErrorKind {
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorKind::Transient)
    }
}
