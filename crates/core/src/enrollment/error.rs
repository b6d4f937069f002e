use thiserror::Error;

use super::types::{EnrollmentStatus, RollbackOutcome, Transition};
use crate::advising::AdvisingError;
use crate::backend::BackendError;
use crate::error::ErrorKind;
use crate::student::StudentId;

/// Errors from enrollment transitions. A rejected transition never changes
/// the student's status.
#[derive(Debug, Error)]
pub enum EnrollmentError {
    #[error("Student id is required")]
    MissingStudentId,

    #[error("Cannot {transition} student {student_id} while {from}")]
    IllegalTransition {
        student_id: StudentId,
        from: EnrollmentStatus,
        transition: Transition,
    },

    #[error("Enrollment is closed for program '{program}'")]
    EnrollmentClosed { program: String },

    #[error("Student {student_id} must go through advising before billing")]
    MandatoryAdvising { student_id: StudentId },

    #[error("Student {student_id} has no recorded advising")]
    NotAdvised { student_id: StudentId },

    #[error("Invoice carries no advising basis")]
    UnstampedInvoice,

    #[error("Invoice for student {student_id} was priced before the latest advising")]
    StaleInvoice { student_id: StudentId },

    #[error("No courses to enroll")]
    EmptyCourseList,

    #[error("Another action for student {student_id} is still saving")]
    Busy { student_id: StudentId },

    #[error("Invalid course selection: {0}")]
    InvalidSelection(#[from] AdvisingError),

    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    /// Advising failed remotely; the student was reset to `NOT_ENROLLED`.
    #[error("Advising for student {student_id} failed: {source}")]
    AdvisingFailed {
        student_id: StudentId,
        #[source]
        source: BackendError,
        rollback: RollbackOutcome,
    },
}

impl EnrollmentError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EnrollmentError::MissingStudentId
            | EnrollmentError::EmptyCourseList
            | EnrollmentError::InvalidSelection(_)
            | EnrollmentError::UnstampedInvoice => ErrorKind::Validation,
            EnrollmentError::IllegalTransition { .. }
            | EnrollmentError::EnrollmentClosed { .. }
            | EnrollmentError::MandatoryAdvising { .. }
            | EnrollmentError::NotAdvised { .. }
            | EnrollmentError::StaleInvoice { .. } => ErrorKind::Eligibility,
            EnrollmentError::Busy { .. } => ErrorKind::Transient,
            EnrollmentError::Backend(e) => e.kind(),
            EnrollmentError::AdvisingFailed { .. } => ErrorKind::Rollback,
        }
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            EnrollmentError::Busy { .. } => true,
            EnrollmentError::Backend(e) => e.is_retryable(),
            EnrollmentError::AdvisingFailed { source, .. } => source.is_retryable(),
            _ => false,
        }
    }
}
