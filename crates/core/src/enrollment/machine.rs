//! The enrollment state machine.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::error::EnrollmentError;
use super::flight::{FlightGuard, InFlight};
use super::types::{
    BatchEnrollment, BillingConfirmation, EnrollmentStatus, RollbackOutcome, Transition,
};
use crate::advising::{AdvisingStamp, AdvisingSubmission};
use crate::backend::EnrollmentBackend;
use crate::metrics::{BUSY_REJECTIONS, ROLLBACKS, STALE_INVOICES, TRANSITIONS};
use crate::student::{EnrollmentWindow, Student, StudentId};

/// A non-regular student who has not started enrollment must be advised
/// before anything can be billed.
///
/// Only `NOT_ENROLLED` students are flagged, so at confirmation the flag
/// replaces the illegal-transition error with its own, more specific one;
/// list and billing screens use it to send the student to advising first.
pub fn requires_mandatory_advising(student: &Student) -> bool {
    !student.status.is_regular() && student.enrollment_status == EnrollmentStatus::NotEnrolled
}

/// Advising history of one student in this process.
#[derive(Debug, Default)]
struct AdvisingLedger {
    /// Stamp of the advised set currently in force.
    current: Option<AdvisingStamp>,
    /// Last revision handed out; never decreases.
    revision: u64,
}

/// Drives a student through
/// `NOT_ENROLLED → PENDING_REQUEST → WAITLISTED → ENROLLED`.
///
/// Every transition is persisted through the backend before the working copy
/// of the student is updated. At most one mutating call per student runs at
/// a time; a concurrent call fails with [`EnrollmentError::Busy`].
pub struct EnrollmentMachine {
    backend: Arc<dyn EnrollmentBackend>,
    in_flight: InFlight,
    ledgers: RwLock<HashMap<StudentId, AdvisingLedger>>,
}

impl EnrollmentMachine {
    pub fn new(backend: Arc<dyn EnrollmentBackend>) -> Self {
        Self {
            backend,
            in_flight: InFlight::new(),
            ledgers: RwLock::new(HashMap::new()),
        }
    }

    pub fn backend(&self) -> &Arc<dyn EnrollmentBackend> {
        &self.backend
    }

    /// Whether a mutating call for `id` is in flight.
    pub fn is_saving(&self, id: &StudentId) -> bool {
        self.in_flight.is_busy(id)
    }

    /// Stamp of the student's current advised course set.
    pub async fn current_basis(&self, id: &StudentId) -> Option<AdvisingStamp> {
        self.ledgers
            .read()
            .await
            .get(id)
            .and_then(|l| l.current.clone())
    }

    /// `NOT_ENROLLED → PENDING_REQUEST`.
    ///
    /// With `windows`, the student's program must have an open window.
    pub async fn request_enrollment(
        &self,
        student: &mut Student,
        windows: Option<&[EnrollmentWindow]>,
    ) -> Result<(), EnrollmentError> {
        let transition = Transition::RequestEnrollment;
        self.check(student, transition)?;

        if let Some(windows) = windows {
            if !EnrollmentWindow::is_open_for(windows, &student.program) {
                record(transition, "rejected");
                return Err(EnrollmentError::EnrollmentClosed {
                    program: student.program.clone(),
                });
            }
        }

        let _guard = self.acquire(&student.id)?;
        if let Err(e) = self
            .backend
            .update_enrollment_status(&student.id, transition.target())
            .await
        {
            record(transition, "failed");
            return Err(e.into());
        }

        self.apply(student, transition);
        Ok(())
    }

    /// `NOT_ENROLLED | PENDING_REQUEST → WAITLISTED`.
    ///
    /// Marks the student waitlisted, then submits the course codes. If either
    /// call fails the student is reset to `NOT_ENROLLED` and the attempted
    /// course set is discarded. A failed reset is logged, not retried.
    pub async fn advise(
        &self,
        student: &mut Student,
        codes: Vec<String>,
    ) -> Result<AdvisingStamp, EnrollmentError> {
        let transition = Transition::Advise;
        self.check(student, transition)?;

        let submission = AdvisingSubmission::new(student.id.clone(), codes).map_err(|e| {
            record(transition, "rejected");
            EnrollmentError::from(e)
        })?;

        let _guard = self.acquire(&student.id)?;

        let submitted = async {
            self.backend
                .update_enrollment_status(&student.id, transition.target())
                .await?;
            self.backend.submit_advising(&submission).await
        }
        .await;

        if let Err(source) = submitted {
            record(transition, "failed");
            warn!(
                "Advising for student {} failed, resetting to {}: {}",
                student.id,
                EnrollmentStatus::NotEnrolled,
                source
            );
            let rollback = self.rollback(&student.id).await;
            self.discard_advising(&student.id).await;
            student.enrollment_status = Transition::Rollback.target();
            return Err(EnrollmentError::AdvisingFailed {
                student_id: student.id.clone(),
                source,
                rollback,
            });
        }

        let stamp = self
            .record_advising(&student.id, &submission.default_courses)
            .await;
        self.apply(student, transition);
        Ok(stamp)
    }

    /// Record the advised set of a student who was advised elsewhere (already
    /// `WAITLISTED` when loaded). Returns the current stamp unchanged when the
    /// codes match it.
    pub async fn adopt_advising<S: AsRef<str>>(
        &self,
        student: &Student,
        codes: &[S],
    ) -> Result<AdvisingStamp, EnrollmentError> {
        if student.id.is_blank() {
            return Err(EnrollmentError::MissingStudentId);
        }
        if student.enrollment_status != EnrollmentStatus::Waitlisted {
            return Err(EnrollmentError::NotAdvised {
                student_id: student.id.clone(),
            });
        }

        let mut ledgers = self.ledgers.write().await;
        let ledger = ledgers.entry(student.id.clone()).or_default();
        if let Some(current) = &ledger.current {
            let candidate = AdvisingStamp::compute(&student.id, codes, current.revision);
            if candidate.digest == current.digest {
                return Ok(current.clone());
            }
        }

        ledger.revision += 1;
        let stamp = AdvisingStamp::compute(&student.id, codes, ledger.revision);
        debug!(
            "Adopted advising revision {} for student {}",
            stamp.revision, student.id
        );
        ledger.current = Some(stamp.clone());
        Ok(stamp)
    }

    /// `WAITLISTED → ENROLLED`.
    ///
    /// The invoice must be stamped with the student's current advising; an
    /// invoice priced before a later advising is rejected.
    pub async fn confirm_billing(
        &self,
        student: &mut Student,
        confirmation: &BillingConfirmation,
    ) -> Result<(), EnrollmentError> {
        let transition = Transition::ConfirmBilling;

        if requires_mandatory_advising(student) {
            record(transition, "rejected");
            return Err(EnrollmentError::MandatoryAdvising {
                student_id: student.id.clone(),
            });
        }
        self.check(student, transition)?;

        if confirmation.course_ids.is_empty() {
            record(transition, "rejected");
            return Err(EnrollmentError::EmptyCourseList);
        }

        let _guard = self.acquire(&student.id)?;
        self.check_basis(student, confirmation).await?;

        let batch = BatchEnrollment {
            student_id: student.id.clone(),
            course_ids: confirmation.course_ids.clone(),
            voucher: confirmation.terms.voucher,
            paid: confirmation.terms.effective_received(),
        };
        if let Err(e) = self.backend.submit_batch(&batch).await {
            record(transition, "failed");
            return Err(e.into());
        }

        self.ledgers.write().await.remove(&student.id);
        self.apply(student, transition);
        Ok(())
    }

    fn check(&self, student: &Student, transition: Transition) -> Result<(), EnrollmentError> {
        if student.id.is_blank() {
            record(transition, "rejected");
            return Err(EnrollmentError::MissingStudentId);
        }
        if !student.enrollment_status.permits(transition) {
            record(transition, "rejected");
            warn!(
                "Rejected {} for student {} in {}",
                transition, student.id, student.enrollment_status
            );
            return Err(EnrollmentError::IllegalTransition {
                student_id: student.id.clone(),
                from: student.enrollment_status,
                transition,
            });
        }
        Ok(())
    }

    async fn check_basis(
        &self,
        student: &Student,
        confirmation: &BillingConfirmation,
    ) -> Result<(), EnrollmentError> {
        let transition = Transition::ConfirmBilling;
        let Some(basis) = &confirmation.invoice.basis else {
            record(transition, "rejected");
            return Err(EnrollmentError::UnstampedInvoice);
        };
        let Some(current) = self.current_basis(&student.id).await else {
            record(transition, "rejected");
            return Err(EnrollmentError::NotAdvised {
                student_id: student.id.clone(),
            });
        };
        if *basis != current {
            record(transition, "rejected");
            STALE_INVOICES.inc();
            warn!(
                "Stale invoice for student {}: priced at revision {}, current is {}",
                student.id, basis.revision, current.revision
            );
            return Err(EnrollmentError::StaleInvoice {
                student_id: student.id.clone(),
            });
        }
        Ok(())
    }

    fn acquire(&self, id: &StudentId) -> Result<FlightGuard, EnrollmentError> {
        self.in_flight.try_acquire(id).ok_or_else(|| {
            BUSY_REJECTIONS.inc();
            debug!("Student {} already has an action in flight", id);
            EnrollmentError::Busy {
                student_id: id.clone(),
            }
        })
    }

    async fn rollback(&self, id: &StudentId) -> RollbackOutcome {
        match self
            .backend
            .update_enrollment_status(id, Transition::Rollback.target())
            .await
        {
            Ok(()) => {
                ROLLBACKS.with_label_values(&["completed"]).inc();
                info!("Student {} reset to {}", id, EnrollmentStatus::NotEnrolled);
                RollbackOutcome::Completed
            }
            Err(e) => {
                ROLLBACKS.with_label_values(&["failed"]).inc();
                warn!("Failed to reset student {} after advising: {}", id, e);
                RollbackOutcome::Failed(e.to_string())
            }
        }
    }

    async fn record_advising(&self, id: &StudentId, codes: &[String]) -> AdvisingStamp {
        let mut ledgers = self.ledgers.write().await;
        let ledger = ledgers.entry(id.clone()).or_default();
        ledger.revision += 1;
        let stamp = AdvisingStamp::compute(id, codes, ledger.revision);
        ledger.current = Some(stamp.clone());
        stamp
    }

    async fn discard_advising(&self, id: &StudentId) {
        if let Some(ledger) = self.ledgers.write().await.get_mut(id) {
            ledger.current = None;
        }
    }

    fn apply(&self, student: &mut Student, transition: Transition) {
        let from = student.enrollment_status;
        student.enrollment_status = transition.target();
        record(transition, "ok");
        info!(
            "Student {}: {} -> {} ({})",
            student.id, from, student.enrollment_status, transition
        );
    }
}

fn record(transition: Transition, result: &str) {
    TRANSITIONS
        .with_label_values(&[transition.name(), result])
        .inc();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::BackendError;
    use crate::billing::{aggregate, BillingLineItem, FeeCategory, PaymentTerms};
    use crate::student::StudentStatus;
    use crate::testing::{BackendCall, BackendOp, MockBackend};
    use rust_decimal::Decimal;

    fn codes(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn student(status: EnrollmentStatus) -> Student {
        let mut student = Student::new("2021-0001", "BSCS");
        student.enrollment_status = status;
        student
    }

    fn confirmation(basis: Option<AdvisingStamp>) -> BillingConfirmation {
        let lines = vec![BillingLineItem::new("Tuition", FeeCategory::Assessment, Decimal::from(5000))];
        let mut invoice = aggregate(&lines, PaymentTerms::cash(Decimal::from(5000)));
        invoice.basis = basis;
        BillingConfirmation {
            invoice,
            course_ids: vec![1, 2],
            terms: PaymentTerms::cash(Decimal::from(5000)),
        }
    }

    #[tokio::test]
    async fn test_request_enrollment() {
        let backend = Arc::new(MockBackend::new());
        let machine = EnrollmentMachine::new(backend.clone());
        let mut s = student(EnrollmentStatus::NotEnrolled);

        machine.request_enrollment(&mut s, None).await.unwrap();

        assert_eq!(s.enrollment_status, EnrollmentStatus::PendingRequest);
        assert_eq!(
            backend.calls().await,
            vec![BackendCall::UpdateStatus(
                s.id.clone(),
                EnrollmentStatus::PendingRequest
            )]
        );
    }

    #[tokio::test]
    async fn test_request_with_blank_id_sends_nothing() {
        let backend = Arc::new(MockBackend::new());
        let machine = EnrollmentMachine::new(backend.clone());
        let mut s = Student::new("   ", "BSCS");

        let err = machine.request_enrollment(&mut s, None).await.unwrap_err();

        assert!(matches!(err, EnrollmentError::MissingStudentId));
        assert_eq!(s.enrollment_status, EnrollmentStatus::NotEnrolled);
        assert!(backend.calls().await.is_empty());
    }

    #[tokio::test]
    async fn test_request_refused_when_window_closed() {
        let backend = Arc::new(MockBackend::new());
        let machine = EnrollmentMachine::new(backend.clone());
        let mut s = student(EnrollmentStatus::NotEnrolled);
        let windows = vec![EnrollmentWindow {
            program_name: "BSCS".into(),
            from_date: None,
            to_date: None,
            message: None,
            is_enrollment: false,
        }];

        let err = machine
            .request_enrollment(&mut s, Some(&windows))
            .await
            .unwrap_err();

        assert!(matches!(err, EnrollmentError::EnrollmentClosed { .. }));
        assert_eq!(s.enrollment_status, EnrollmentStatus::NotEnrolled);
    }

    #[tokio::test]
    async fn test_advise_from_not_enrolled_and_pending() {
        for from in [EnrollmentStatus::NotEnrolled, EnrollmentStatus::PendingRequest] {
            let backend = Arc::new(MockBackend::new());
            let machine = EnrollmentMachine::new(backend.clone());
            let mut s = student(from);

            let stamp = machine
                .advise(&mut s, codes(&["CS101", "MATH1"]))
                .await
                .unwrap();

            assert_eq!(s.enrollment_status, EnrollmentStatus::Waitlisted);
            assert_eq!(stamp.revision, 1);
            assert_eq!(machine.current_basis(&s.id).await, Some(stamp));
            assert_eq!(
                backend.calls().await,
                vec![
                    BackendCall::UpdateStatus(s.id.clone(), EnrollmentStatus::Waitlisted),
                    BackendCall::SubmitAdvising(s.id.clone(), codes(&["CS101", "MATH1"])),
                ]
            );
        }
    }

    #[tokio::test]
    async fn test_advise_duplicate_codes_never_transmitted() {
        let backend = Arc::new(MockBackend::new());
        let machine = EnrollmentMachine::new(backend.clone());
        let mut s = student(EnrollmentStatus::PendingRequest);

        let err = machine
            .advise(&mut s, codes(&["CS101", "CS101"]))
            .await
            .unwrap_err();

        assert!(matches!(err, EnrollmentError::InvalidSelection(_)));
        assert_eq!(s.enrollment_status, EnrollmentStatus::PendingRequest);
        assert!(backend.calls().await.is_empty());
    }

    #[tokio::test]
    async fn test_failed_submission_rolls_back_to_not_enrolled() {
        let backend = Arc::new(MockBackend::new());
        backend
            .fail_on(BackendOp::SubmitAdvising, BackendError::Rejected {
                endpoint: "advising_submit".into(),
                message: "prerequisite missing".into(),
                errors: vec![],
            })
            .await;
        let machine = EnrollmentMachine::new(backend.clone());
        let mut s = student(EnrollmentStatus::PendingRequest);

        let err = machine
            .advise(&mut s, codes(&["CS101"]))
            .await
            .unwrap_err();

        match err {
            EnrollmentError::AdvisingFailed { rollback, .. } => {
                assert_eq!(rollback, RollbackOutcome::Completed)
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(s.enrollment_status, EnrollmentStatus::NotEnrolled);
        assert!(machine.current_basis(&s.id).await.is_none());
        assert_eq!(
            backend.calls().await.last(),
            Some(&BackendCall::UpdateStatus(
                s.id.clone(),
                EnrollmentStatus::NotEnrolled
            ))
        );
        assert!(!machine.is_saving(&s.id));
    }

    #[tokio::test]
    async fn test_failed_rollback_is_reported_not_retried() {
        let backend = Arc::new(MockBackend::new());
        backend
            .fail_on(
                BackendOp::SubmitAdvising,
                BackendError::Timeout("advising_submit".into()),
            )
            .await;
        backend
            .fail_status_update(
                EnrollmentStatus::NotEnrolled,
                BackendError::ConnectionFailed("refused".into()),
            )
            .await;
        let machine = EnrollmentMachine::new(backend.clone());
        let mut s = student(EnrollmentStatus::NotEnrolled);

        let err = machine
            .advise(&mut s, codes(&["CS101"]))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), crate::error::ErrorKind::Rollback);
        assert!(matches!(
            err,
            EnrollmentError::AdvisingFailed {
                rollback: RollbackOutcome::Failed(_),
                ..
            }
        ));
        let resets = backend
            .calls()
            .await
            .into_iter()
            .filter(|c| {
                *c == BackendCall::UpdateStatus(s.id.clone(), EnrollmentStatus::NotEnrolled)
            })
            .count();
        assert_eq!(resets, 1);
        assert_eq!(s.enrollment_status, EnrollmentStatus::NotEnrolled);
    }

    #[tokio::test]
    async fn test_confirm_requires_waitlisted() {
        for from in [
            EnrollmentStatus::NotEnrolled,
            EnrollmentStatus::PendingRequest,
            EnrollmentStatus::Enrolled,
        ] {
            let backend = Arc::new(MockBackend::new());
            let machine = EnrollmentMachine::new(backend.clone());
            let mut s = student(from);

            let err = machine
                .confirm_billing(&mut s, &confirmation(None))
                .await
                .unwrap_err();

            assert!(matches!(err, EnrollmentError::IllegalTransition { .. }));
            assert_eq!(s.enrollment_status, from);
            assert!(backend.calls().await.is_empty());
        }
    }

    #[tokio::test]
    async fn test_confirm_with_current_basis_enrolls() {
        let backend = Arc::new(MockBackend::new());
        let machine = EnrollmentMachine::new(backend.clone());
        let mut s = student(EnrollmentStatus::PendingRequest);
        let stamp = machine.advise(&mut s, codes(&["CS101"])).await.unwrap();

        machine
            .confirm_billing(&mut s, &confirmation(Some(stamp)))
            .await
            .unwrap();

        assert_eq!(s.enrollment_status, EnrollmentStatus::Enrolled);
        let batches = backend.batches().await;
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].course_ids, vec![1, 2]);
        assert_eq!(batches[0].paid, Decimal::from(5000));
    }

    #[tokio::test]
    async fn test_stale_invoice_rejected() {
        let backend = Arc::new(MockBackend::new());
        let machine = EnrollmentMachine::new(backend.clone());
        let mut s = student(EnrollmentStatus::Waitlisted);

        let old = machine.adopt_advising(&s, &["CS101"]).await.unwrap();
        let newer = machine
            .adopt_advising(&s, &["CS101", "MATH1"])
            .await
            .unwrap();
        assert!(newer.revision > old.revision);

        let err = machine
            .confirm_billing(&mut s, &confirmation(Some(old)))
            .await
            .unwrap_err();
        assert!(matches!(err, EnrollmentError::StaleInvoice { .. }));
        assert_eq!(s.enrollment_status, EnrollmentStatus::Waitlisted);

        let err = machine
            .confirm_billing(&mut s, &confirmation(None))
            .await
            .unwrap_err();
        assert!(matches!(err, EnrollmentError::UnstampedInvoice));
        assert!(backend.batches().await.is_empty());
    }

    #[tokio::test]
    async fn test_adopt_same_codes_keeps_stamp() {
        let machine = EnrollmentMachine::new(Arc::new(MockBackend::new()));
        let s = student(EnrollmentStatus::Waitlisted);

        let first = machine.adopt_advising(&s, &["CS101", "MATH1"]).await.unwrap();
        let again = machine.adopt_advising(&s, &["MATH1", "CS101"]).await.unwrap();
        assert_eq!(first, again);
    }

    #[tokio::test]
    async fn test_mandatory_advising_blocks_billing() {
        let machine = EnrollmentMachine::new(Arc::new(MockBackend::new()));
        let mut s = student(EnrollmentStatus::NotEnrolled);
        s.status = StudentStatus::Irregular;
        assert!(requires_mandatory_advising(&s));

        let err = machine
            .confirm_billing(&mut s, &confirmation(None))
            .await
            .unwrap_err();
        assert!(matches!(err, EnrollmentError::MandatoryAdvising { .. }));

        s.enrollment_status = EnrollmentStatus::Waitlisted;
        assert!(!requires_mandatory_advising(&s));
    }

    #[tokio::test]
    async fn test_concurrent_call_for_same_student_is_busy() {
        let backend = Arc::new(MockBackend::new());
        backend.set_delay_ms(50).await;
        let machine = Arc::new(EnrollmentMachine::new(backend.clone()));

        let m = Arc::clone(&machine);
        let first = tokio::spawn(async move {
            let mut s = student(EnrollmentStatus::PendingRequest);
            m.advise(&mut s, codes(&["CS101"])).await
        });
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;

        let mut s = student(EnrollmentStatus::PendingRequest);
        let err = machine.advise(&mut s, codes(&["CS101"])).await.unwrap_err();
        assert!(matches!(err, EnrollmentError::Busy { .. }));
        assert!(err.is_retryable());

        assert!(first.await.unwrap().is_ok());
    }
}
