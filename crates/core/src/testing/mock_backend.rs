//! Mock enrollment backend for testing.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;
use tokio::sync::RwLock;

use crate::advising::{AdvisingResult, AdvisingSubmission};
use crate::backend::{BackendError, EnrollmentBackend};
use crate::cor::EnrollmentRecord;
use crate::enrollment::{BatchEnrollment, EnrollmentStatus};
use crate::student::{EnrollmentRow, EnrollmentWindow, GradeRecord, Student, StudentId};

/// Backend operations, for targeting injected failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendOp {
    GetStudent,
    UpdateStatus,
    GetEnrollments,
    GetGrades,
    GetWindows,
    GetAdvising,
    SubmitAdvising,
    SubmitBatch,
    GetCor,
}

/// A recorded mutating call for test assertions.
#[derive(Debug, Clone, PartialEq)]
pub enum BackendCall {
    UpdateStatus(StudentId, EnrollmentStatus),
    SubmitAdvising(StudentId, Vec<String>),
    SubmitBatch(BatchEnrollment),
}

/// Mock implementation of the EnrollmentBackend trait.
///
/// Behaves like a small in-memory registrar:
/// - status updates change the stored student
/// - an advising submission becomes the student's default courses
/// - a batch enrollment marks the student enrolled and produces a COR
///
/// # Example
///
/// ```rust,ignore
/// use enrollment_core::testing::{fixtures, BackendOp, MockBackend};
///
/// let backend = MockBackend::new();
/// backend.add_student(fixtures::student("2021-0001")).await;
/// backend.fail_on(BackendOp::SubmitBatch, error).await;
/// ```
#[derive(Debug)]
pub struct MockBackend {
    students: Arc<RwLock<HashMap<StudentId, Student>>>,
    advising: Arc<RwLock<HashMap<StudentId, AdvisingResult>>>,
    enrollments: Arc<RwLock<HashMap<StudentId, Vec<EnrollmentRow>>>>,
    grades: Arc<RwLock<HashMap<(StudentId, i64), Vec<GradeRecord>>>>,
    windows: Arc<RwLock<Vec<EnrollmentWindow>>>,
    cors: Arc<RwLock<HashMap<StudentId, EnrollmentRecord>>>,
    /// Recorded mutating calls, in order.
    calls: Arc<RwLock<Vec<BackendCall>>>,
    /// Failures returned by an operation until cleared.
    failures: Arc<RwLock<HashMap<BackendOp, BackendError>>>,
    /// Failures returned by status updates to a given status.
    status_failures: Arc<RwLock<HashMap<EnrollmentStatus, BackendError>>>,
    /// Simulated latency of every call.
    delay_ms: Arc<RwLock<u64>>,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MockBackend {
    /// Create an empty mock backend.
    pub fn new() -> Self {
        Self {
            students: Arc::new(RwLock::new(HashMap::new())),
            advising: Arc::new(RwLock::new(HashMap::new())),
            enrollments: Arc::new(RwLock::new(HashMap::new())),
            grades: Arc::new(RwLock::new(HashMap::new())),
            windows: Arc::new(RwLock::new(Vec::new())),
            cors: Arc::new(RwLock::new(HashMap::new())),
            calls: Arc::new(RwLock::new(Vec::new())),
            failures: Arc::new(RwLock::new(HashMap::new())),
            status_failures: Arc::new(RwLock::new(HashMap::new())),
            delay_ms: Arc::new(RwLock::new(0)),
        }
    }

    // =========================================================================
    // Configuration methods
    // =========================================================================

    pub async fn add_student(&self, student: Student) {
        self.students
            .write()
            .await
            .insert(student.id.clone(), student);
    }

    pub async fn set_advising(&self, id: &StudentId, result: AdvisingResult) {
        self.advising.write().await.insert(id.clone(), result);
    }

    pub async fn set_enrollments(&self, id: &StudentId, rows: Vec<EnrollmentRow>) {
        self.enrollments.write().await.insert(id.clone(), rows);
    }

    pub async fn set_grades(&self, id: &StudentId, course_id: i64, grades: Vec<GradeRecord>) {
        self.grades
            .write()
            .await
            .insert((id.clone(), course_id), grades);
    }

    pub async fn set_windows(&self, windows: Vec<EnrollmentWindow>) {
        *self.windows.write().await = windows;
    }

    pub async fn set_cor(&self, record: EnrollmentRecord) {
        self.cors
            .write()
            .await
            .insert(record.student.id.clone(), record);
    }

    /// Make every call to `op` fail with `error` until cleared.
    pub async fn fail_on(&self, op: BackendOp, error: BackendError) {
        self.failures.write().await.insert(op, error);
    }

    /// Make status updates to `status` fail with `error` until cleared.
    pub async fn fail_status_update(&self, status: EnrollmentStatus, error: BackendError) {
        self.status_failures.write().await.insert(status, error);
    }

    pub async fn clear_failures(&self) {
        self.failures.write().await.clear();
        self.status_failures.write().await.clear();
    }

    /// Delay every call by `ms` milliseconds.
    pub async fn set_delay_ms(&self, ms: u64) {
        *self.delay_ms.write().await = ms;
    }

    // =========================================================================
    // Inspection methods
    // =========================================================================

    pub async fn calls(&self) -> Vec<BackendCall> {
        self.calls.read().await.clone()
    }

    pub async fn batches(&self) -> Vec<BatchEnrollment> {
        self.calls
            .read()
            .await
            .iter()
            .filter_map(|c| match c {
                BackendCall::SubmitBatch(batch) => Some(batch.clone()),
                _ => None,
            })
            .collect()
    }

    pub async fn student(&self, id: &StudentId) -> Option<Student> {
        self.students.read().await.get(id).cloned()
    }

    pub async fn status_of(&self, id: &StudentId) -> Option<EnrollmentStatus> {
        self.student(id).await.map(|s| s.enrollment_status)
    }

    // =========================================================================
    // Internals
    // =========================================================================

    async fn enter(&self, op: BackendOp) -> Result<(), BackendError> {
        let delay = *self.delay_ms.read().await;
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        match self.failures.read().await.get(&op) {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }

    fn not_found(what: &str, id: &StudentId) -> BackendError {
        BackendError::NotFound(format!("{} {}", what, id))
    }

    /// Build the committed snapshot for a batch from the stored advising.
    async fn commit(&self, batch: &BatchEnrollment) -> Result<(), BackendError> {
        let student = self
            .student(&batch.student_id)
            .await
            .ok_or_else(|| Self::not_found("student", &batch.student_id))?;
        let advising = self
            .advising
            .read()
            .await
            .get(&batch.student_id)
            .cloned()
            .unwrap_or_default();

        let rows: Vec<EnrollmentRow> = advising
            .default_courses
            .iter()
            .filter(|c| c.id.is_some_and(|id| batch.course_ids.contains(&id)))
            .map(|course| EnrollmentRow {
                course: course.clone(),
                schedule: Default::default(),
                date: Some(chrono::Utc::now()),
            })
            .collect();
        if rows.len() != batch.course_ids.len() {
            return Err(BackendError::Rejected {
                endpoint: "batch".to_string(),
                message: "Enrollment failed".to_string(),
                errors: vec!["course not advised for this student".to_string()],
            });
        }

        let total = advising.billings.iter().map(|b| b.price).sum::<Decimal>();
        let mut student = student;
        student.enrollment_status = EnrollmentStatus::Enrolled;
        self.students
            .write()
            .await
            .insert(student.id.clone(), student.clone());

        let record = EnrollmentRecord {
            student,
            enrollments: rows,
            acad_term_billings: advising.billings,
            total_acad_term_billing_price: crate::billing::round_cents(total),
        };
        self.cors
            .write()
            .await
            .entry(batch.student_id.clone())
            .or_insert(record);
        Ok(())
    }
}

#[async_trait]
impl EnrollmentBackend for MockBackend {
    fn name(&self) -> &str {
        "mock"
    }

    async fn get_student(&self, id: &StudentId) -> Result<Student, BackendError> {
        self.enter(BackendOp::GetStudent).await?;
        self.student(id)
            .await
            .ok_or_else(|| Self::not_found("student", id))
    }

    async fn update_enrollment_status(
        &self,
        id: &StudentId,
        status: EnrollmentStatus,
    ) -> Result<(), BackendError> {
        self.calls
            .write()
            .await
            .push(BackendCall::UpdateStatus(id.clone(), status));
        self.enter(BackendOp::UpdateStatus).await?;
        if let Some(error) = self.status_failures.read().await.get(&status) {
            return Err(error.clone());
        }
        if let Some(student) = self.students.write().await.get_mut(id) {
            student.enrollment_status = status;
        }
        Ok(())
    }

    async fn get_enrollments(
        &self,
        id: &StudentId,
        _school_year: &str,
    ) -> Result<Vec<EnrollmentRow>, BackendError> {
        self.enter(BackendOp::GetEnrollments).await?;
        Ok(self
            .enrollments
            .read()
            .await
            .get(id)
            .cloned()
            .unwrap_or_default())
    }

    async fn get_grades(
        &self,
        id: &StudentId,
        course_id: i64,
    ) -> Result<Vec<GradeRecord>, BackendError> {
        self.enter(BackendOp::GetGrades).await?;
        Ok(self
            .grades
            .read()
            .await
            .get(&(id.clone(), course_id))
            .cloned()
            .unwrap_or_default())
    }

    async fn get_enrollment_windows(&self) -> Result<Vec<EnrollmentWindow>, BackendError> {
        self.enter(BackendOp::GetWindows).await?;
        Ok(self.windows.read().await.clone())
    }

    async fn get_advising(&self, id: &StudentId) -> Result<AdvisingResult, BackendError> {
        self.enter(BackendOp::GetAdvising).await?;
        self.advising
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| Self::not_found("advising for", id))
    }

    async fn submit_advising(&self, submission: &AdvisingSubmission) -> Result<(), BackendError> {
        self.calls.write().await.push(BackendCall::SubmitAdvising(
            submission.id.clone(),
            submission.default_courses.clone(),
        ));
        self.enter(BackendOp::SubmitAdvising).await?;

        let mut advising = self.advising.write().await;
        let result = advising.entry(submission.id.clone()).or_default();
        let mut pool: Vec<_> = result
            .default_courses
            .drain(..)
            .chain(result.suggestions.drain(..))
            .collect();
        for code in &submission.default_courses {
            if let Some(pos) = pool.iter().position(|c| &c.code == code) {
                result.default_courses.push(pool.remove(pos));
            }
        }
        result.suggestions = pool;
        Ok(())
    }

    async fn submit_batch(&self, batch: &BatchEnrollment) -> Result<(), BackendError> {
        self.calls
            .write()
            .await
            .push(BackendCall::SubmitBatch(batch.clone()));
        self.enter(BackendOp::SubmitBatch).await?;
        self.commit(batch).await
    }

    async fn get_cor(&self, id: &StudentId) -> Result<EnrollmentRecord, BackendError> {
        self.enter(BackendOp::GetCor).await?;
        self.cors
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| Self::not_found("cor for", id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixtures;

    #[tokio::test]
    async fn test_submission_moves_courses_out_of_suggestions() {
        let backend = MockBackend::new();
        let id = StudentId::new("1");
        backend.set_advising(&id, fixtures::advising_result()).await;

        let submission =
            AdvisingSubmission::new(id.clone(), vec!["CS101".into(), "CS102".into()]).unwrap();
        backend.submit_advising(&submission).await.unwrap();

        let result = backend.get_advising(&id).await.unwrap();
        let placed: Vec<_> = result.default_courses.iter().map(|c| c.code.as_str()).collect();
        assert_eq!(placed, vec!["CS101", "CS102"]);
        assert!(result.suggestions.iter().all(|c| c.code != "CS102"));
    }

    #[tokio::test]
    async fn test_injected_failure() {
        let backend = MockBackend::new();
        backend
            .fail_on(BackendOp::GetWindows, BackendError::Timeout("x".into()))
            .await;
        assert!(backend.get_enrollment_windows().await.is_err());
        backend.clear_failures().await;
        assert!(backend.get_enrollment_windows().await.is_ok());
    }
}
