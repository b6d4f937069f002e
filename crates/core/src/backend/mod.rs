//! Remote enrollment API.
//!
//! The backend owns every durable fact: student records, advising output,
//! committed enrollments and billings. The client only issues the requests
//! below and keeps no state of its own between them.

mod error;
mod http;

pub use error::BackendError;
pub use http::HttpBackend;

use async_trait::async_trait;

use crate::advising::{AdvisingResult, AdvisingSubmission};
use crate::cor::EnrollmentRecord;
use crate::enrollment::{BatchEnrollment, EnrollmentStatus};
use crate::student::{EnrollmentRow, EnrollmentWindow, GradeRecord, Student, StudentId};

/// Trait for enrollment backends.
///
/// Implemented by [`HttpBackend`] and by the mock in `testing`.
#[async_trait]
pub trait EnrollmentBackend: Send + Sync {
    /// Human-readable backend name, used in logs.
    fn name(&self) -> &str;

    /// `GET /student/<id>`
    async fn get_student(&self, id: &StudentId) -> Result<Student, BackendError>;

    /// `PATCH /student/<id>` with `{enrollment_status}`.
    async fn update_enrollment_status(
        &self,
        id: &StudentId,
        status: EnrollmentStatus,
    ) -> Result<(), BackendError>;

    /// `GET /enrollment?student=<id>&school_year=<year>`
    async fn get_enrollments(
        &self,
        id: &StudentId,
        school_year: &str,
    ) -> Result<Vec<EnrollmentRow>, BackendError>;

    /// `GET /grade?student=<id>&course__id=<course>`
    async fn get_grades(
        &self,
        id: &StudentId,
        course_id: i64,
    ) -> Result<Vec<GradeRecord>, BackendError>;

    /// `GET /enrollment_date`
    async fn get_enrollment_windows(&self) -> Result<Vec<EnrollmentWindow>, BackendError>;

    /// `GET /advising?id=<id>`
    async fn get_advising(&self, id: &StudentId) -> Result<AdvisingResult, BackendError>;

    /// `POST /advising?id=<id>` with course codes only.
    async fn submit_advising(&self, submission: &AdvisingSubmission) -> Result<(), BackendError>;

    /// `POST /batch/`
    async fn submit_batch(&self, batch: &BatchEnrollment) -> Result<(), BackendError>;

    /// `GET /cor?id=<id>`
    async fn get_cor(&self, id: &StudentId) -> Result<EnrollmentRecord, BackendError>;
}
