use thiserror::Error;

use super::types::{Notice, NoticeLevel};
use crate::advising::AdvisingError;
use crate::backend::BackendError;
use crate::enrollment::{EnrollmentError, EnrollmentStatus, RollbackOutcome};
use crate::error::ErrorKind;
use crate::render::RenderError;
use crate::student::StudentId;

/// Errors surfaced by workflow steps.
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("Select a student first")]
    NoStudentSelected,

    #[error("No courses advised for student {student_id}")]
    NoCourses { student_id: StudentId },

    #[error("No school year known for student {student_id}")]
    NoSchoolYear { student_id: StudentId },

    #[error("Course {code} has no backend id")]
    MissingCourseId { code: String },

    #[error("Course {course_id} is not in the current advising of student {student_id}")]
    CourseNotAdvised {
        student_id: StudentId,
        course_id: i64,
    },

    #[error("Student {student_id} is {status}, not enrolled")]
    NotEnrolled {
        student_id: StudentId,
        status: EnrollmentStatus,
    },

    #[error(transparent)]
    Enrollment(#[from] EnrollmentError),

    #[error(transparent)]
    Advising(#[from] AdvisingError),

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error(transparent)]
    Render(#[from] RenderError),
}

impl WorkflowError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            WorkflowError::NoStudentSelected
            | WorkflowError::NoCourses { .. }
            | WorkflowError::NoSchoolYear { .. }
            | WorkflowError::MissingCourseId { .. }
            | WorkflowError::Advising(_) => ErrorKind::Validation,
            WorkflowError::CourseNotAdvised { .. } | WorkflowError::NotEnrolled { .. } => {
                ErrorKind::Eligibility
            }
            WorkflowError::Enrollment(e) => e.kind(),
            WorkflowError::Backend(e) => e.kind(),
            WorkflowError::Render(e) => e.kind(),
        }
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            WorkflowError::Enrollment(e) => e.is_retryable(),
            WorkflowError::Backend(e) => e.is_retryable(),
            other => other.kind().is_retryable(),
        }
    }

    fn message(&self) -> String {
        match self {
            WorkflowError::Backend(e) => e.messages().join("; "),
            WorkflowError::Enrollment(EnrollmentError::Backend(e)) => e.messages().join("; "),
            WorkflowError::Enrollment(EnrollmentError::AdvisingFailed {
                source, rollback, ..
            }) => {
                let mut message = source.messages().join("; ");
                match rollback {
                    RollbackOutcome::Completed => {
                        message.push_str(". The student was reset to NOT_ENROLLED.")
                    }
                    RollbackOutcome::Failed(reason) => {
                        message.push_str(&format!(". Resetting the student also failed: {}", reason))
                    }
                }
                message
            }
            other => other.to_string(),
        }
    }
}

impl From<&WorkflowError> for Notice {
    fn from(err: &WorkflowError) -> Self {
        let kind = err.kind();
        let (level, title) = match kind {
            ErrorKind::Validation => (NoticeLevel::Warning, "Invalid input"),
            ErrorKind::Eligibility => (NoticeLevel::Warning, "Not eligible"),
            ErrorKind::Transient => (NoticeLevel::Error, "Request failed"),
            ErrorKind::Rollback => (NoticeLevel::Error, "Advising rolled back"),
        };
        Notice {
            level,
            title: title.to_string(),
            message: err.message(),
            kind: Some(kind),
        }
    }
}

impl From<WorkflowError> for Notice {
    fn from(err: WorkflowError) -> Self {
        Notice::from(&err)
    }
}

impl From<BackendError> for Notice {
    fn from(err: BackendError) -> Self {
        Notice::from(WorkflowError::Backend(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_rejection_lists_item_errors() {
        let err = WorkflowError::Backend(BackendError::Rejected {
            endpoint: "batch".to_string(),
            message: "Enrollment failed".to_string(),
            errors: vec!["CS101 is full".to_string(), "PE1 is closed".to_string()],
        });
        let notice = Notice::from(&err);
        assert_eq!(notice.kind, Some(ErrorKind::Eligibility));
        assert_eq!(notice.message, "CS101 is full; PE1 is closed");
    }

    #[test]
    fn test_advising_failure_mentions_rollback() {
        let err = WorkflowError::Enrollment(EnrollmentError::AdvisingFailed {
            student_id: StudentId::new("7"),
            source: BackendError::Timeout("advising".to_string()),
            rollback: RollbackOutcome::Failed("connection refused".to_string()),
        });
        let notice = Notice::from(err);
        assert_eq!(notice.level, NoticeLevel::Error);
        assert_eq!(notice.title, "Advising rolled back");
        assert!(notice.message.contains("connection refused"));
    }

    #[test]
    fn test_kinds() {
        assert_eq!(WorkflowError::NoStudentSelected.kind(), ErrorKind::Validation);
        let busy = WorkflowError::Enrollment(EnrollmentError::Busy {
            student_id: StudentId::new("7"),
        });
        assert_eq!(busy.kind(), ErrorKind::Transient);
        assert!(busy.is_retryable());
        let not_enrolled = WorkflowError::NotEnrolled {
            student_id: StudentId::new("7"),
            status: EnrollmentStatus::Waitlisted,
        };
        assert_eq!(not_enrolled.kind(), ErrorKind::Eligibility);
        assert_eq!(
            not_enrolled.to_string(),
            "Student 7 is WAITLISTED, not enrolled"
        );
    }
}
