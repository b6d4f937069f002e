//! Enrollment workflow integration tests.
//!
//! These tests drive the orchestrator through the complete lifecycle:
//! NOT_ENROLLED -> PENDING_REQUEST -> WAITLISTED -> ENROLLED -> COR

use std::sync::Arc;

use rust_decimal::Decimal;

use tempfile::TempDir;

use enrollment_core::{
    aggregate,
    config::{BackendConfig, BillingConfig, Config, RenderConfig, TermConfig},
    enrollment::{BillingConfirmation, EnrollmentError, EnrollmentStatus},
    render::{DocumentRenderer, FsDocumentSink, RenderMode, RenderOptions},
    student::{StudentId, StudentStatus},
    testing::{
        fixtures, BackendCall, BackendOp, MockBackend, MockDocumentSink, MockPrintSpooler,
        MockSurface,
    },
    BackendError, BillingLineItem, ErrorKind, FeeCategory, Orchestrator, PaymentTerms, Screen,
    StepOutcome,
};

/// Test helper wiring the orchestrator to mock collaborators.
struct TestHarness {
    backend: Arc<MockBackend>,
    spooler: Arc<MockPrintSpooler>,
    orchestrator: Orchestrator,
    _temp_dir: TempDir,
}

impl TestHarness {
    async fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let backend = Arc::new(MockBackend::new());
        let spooler = Arc::new(MockPrintSpooler::new());

        let config = Config {
            backend: BackendConfig::new("http://registrar.test"),
            term: TermConfig {
                school_year: Some("2024-2025".to_string()),
                semester: Some("FIRST".to_string()),
            },
            billing: BillingConfig::default(),
            render: RenderConfig {
                output_dir: temp_dir.path().join("documents"),
                institution: "State University".to_string(),
                ..RenderConfig::default()
            },
        };
        let orchestrator = Orchestrator::new(
            &config,
            backend.clone(),
            Arc::new(FsDocumentSink::new(config.render.output_dir.clone())),
            spooler.clone(),
        );

        Self {
            backend,
            spooler,
            orchestrator,
            _temp_dir: temp_dir,
        }
    }

    /// Add a not-yet-enrolled student with the standard advising result.
    async fn student(&self, id: &str) -> StudentId {
        self.backend.add_student(fixtures::student(id)).await;
        let id = StudentId::new(id);
        self.backend
            .set_advising(&id, fixtures::advising_result())
            .await;
        id
    }

    async fn status(&self, id: &StudentId) -> EnrollmentStatus {
        self.backend.status_of(id).await.expect("student exists")
    }
}

#[tokio::test]
async fn test_full_enrollment_lifecycle() {
    let harness = TestHarness::new().await;
    let id = harness.student("2021-0001").await;
    let orchestrator = &harness.orchestrator;

    // Student asks to be enrolled
    let student = orchestrator.request_enrollment(&id).await.ready().unwrap();
    assert_eq!(student.enrollment_status, EnrollmentStatus::PendingRequest);

    // Department advises, adding a suggested course
    let mut view = orchestrator.load_advising(&id).await.ready().unwrap();
    assert!(!view.mandatory);
    view.selection.add("CS102").unwrap();
    assert_eq!(view.selection.codes(), vec!["CS101", "MATH101", "CS102"]);

    let advised = orchestrator
        .submit_advising(&id, &view.selection)
        .await
        .ready()
        .unwrap();
    assert_eq!(advised.student.enrollment_status, EnrollmentStatus::Waitlisted);
    assert_eq!(harness.status(&id).await, EnrollmentStatus::Waitlisted);

    // Registrar bills and confirms
    let billing = orchestrator
        .billing(&id, PaymentTerms::cash(Decimal::from(6000)))
        .await
        .ready()
        .unwrap();
    assert_eq!(billing.courses.len(), 3);
    assert_eq!(billing.invoice.basis.as_ref(), Some(&advised.stamp));
    assert_eq!(billing.invoice.grand_total, Decimal::from(5500));
    assert_eq!(billing.invoice.change, Decimal::from(500));

    let enrolled = orchestrator
        .confirm_billing(&id, &billing)
        .await
        .ready()
        .unwrap();
    assert_eq!(enrolled.enrollment_status, EnrollmentStatus::Enrolled);

    let batches = harness.backend.batches().await;
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].course_ids, vec![1, 2, 3]);
    assert_eq!(batches[0].paid, Decimal::from(6000));
    assert!(!batches[0].voucher);

    // Certificate of registration
    let registration = orchestrator
        .registration(
            &id,
            RenderOptions {
                save: true,
                print: true,
                slice: false,
            },
        )
        .await
        .ready()
        .unwrap();
    assert!(registration
        .record
        .is_within(advised_codes(&view.selection.codes())));
    assert_eq!(
        registration.record.total_acad_term_billing_price,
        Decimal::from(5500)
    );

    let output = registration.output;
    assert_eq!(output.document.mode, RenderMode::Fit);
    assert_eq!(output.document.page_count(), 1);
    assert_eq!(output.document.image.scale, 3);

    let text = String::from_utf8(output.document.image.data.clone()).unwrap();
    assert!(text.contains("State University"));
    assert!(text.contains("CS102"));
    assert!(text.contains("P 5500.00"));
    assert!(!text.contains("Print PDF"));

    let saved = output.saved.expect("document saved");
    assert!(saved.manifest.exists());
    assert_eq!(saved.pages.len(), 1);
    assert!(saved.pages.iter().all(|page| page.exists()));
    assert!(output.printed);
    assert_eq!(harness.spooler.printed().await.len(), 1);
}

fn advised_codes(codes: &[String]) -> impl Iterator<Item = &str> {
    codes.iter().map(String::as_str)
}

#[tokio::test]
async fn test_billing_cash_totals() {
    let harness = TestHarness::new().await;
    let id = harness.student("2021-0002").await;
    harness
        .orchestrator
        .submit_advising(
            &id,
            &harness.orchestrator.load_advising(&id).await.ready().unwrap().selection,
        )
        .await
        .ready()
        .unwrap();

    let view = harness
        .orchestrator
        .billing(&id, PaymentTerms::cash(Decimal::from(4000)))
        .await
        .ready()
        .unwrap();
    let invoice = &view.invoice;
    assert_eq!(invoice.lab_total, Decimal::from(800));
    assert_eq!(invoice.other_total, Decimal::ZERO);
    assert_eq!(invoice.assessment_total, Decimal::from(4700));
    assert_eq!(invoice.grand_total, Decimal::from(5500));
    assert_eq!(invoice.amount_needed, Decimal::from(5500));
    assert_eq!(invoice.change, Decimal::ZERO);
    assert_eq!(invoice.balance, Decimal::from(1500));
}

#[tokio::test]
async fn test_billing_voucher_needs_nothing() {
    let harness = TestHarness::new().await;
    let id = harness.student("2021-0003").await;
    let selection = harness
        .orchestrator
        .load_advising(&id)
        .await
        .ready()
        .unwrap()
        .selection;
    harness
        .orchestrator
        .submit_advising(&id, &selection)
        .await
        .ready()
        .unwrap();

    let view = harness
        .orchestrator
        .billing(&id, PaymentTerms::voucher())
        .await
        .ready()
        .unwrap();
    assert_eq!(view.invoice.grand_total, Decimal::from(5500));
    assert_eq!(view.invoice.amount_needed, Decimal::ZERO);
    assert_eq!(view.invoice.change, Decimal::ZERO);

    harness
        .orchestrator
        .confirm_billing(&id, &view)
        .await
        .ready()
        .unwrap();
    let batches = harness.backend.batches().await;
    assert!(batches[0].voucher);
    assert_eq!(batches[0].paid, Decimal::ZERO);
}

#[tokio::test]
async fn test_confirm_from_not_enrolled_is_rejected() {
    let harness = TestHarness::new().await;
    let id = harness.student("2021-0004").await;
    let mut student = fixtures::student("2021-0004");

    let invoice = aggregate(
        &fixtures::billing_lines(),
        PaymentTerms::cash(Decimal::from(5500)),
    );
    let confirmation = BillingConfirmation {
        invoice,
        course_ids: vec![1, 2],
        terms: PaymentTerms::cash(Decimal::from(5500)),
    };
    let err = harness
        .orchestrator
        .machine()
        .confirm_billing(&mut student, &confirmation)
        .await
        .unwrap_err();

    assert!(matches!(err, EnrollmentError::IllegalTransition { .. }));
    assert_eq!(err.kind(), ErrorKind::Eligibility);
    assert_eq!(student.enrollment_status, EnrollmentStatus::NotEnrolled);
    assert_eq!(harness.status(&id).await, EnrollmentStatus::NotEnrolled);
    assert!(harness.backend.calls().await.is_empty());
}

#[tokio::test]
async fn test_duplicate_codes_never_transmitted() {
    let harness = TestHarness::new().await;
    let id = harness.student("2021-0005").await;
    let mut student = fixtures::student("2021-0005");

    let err = harness
        .orchestrator
        .machine()
        .advise(
            &mut student,
            vec!["CS101".to_string(), "CS101".to_string()],
        )
        .await
        .unwrap_err();

    assert!(matches!(err, EnrollmentError::InvalidSelection(_)));
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(student.enrollment_status, EnrollmentStatus::NotEnrolled);
    assert_eq!(harness.status(&id).await, EnrollmentStatus::NotEnrolled);
    assert!(harness.backend.calls().await.is_empty());
}

#[tokio::test]
async fn test_slice_mode_tiles_tall_capture() {
    // 400x1000 at 3x oversampling: a 1200x3000 image on 1200x1000 pages.
    let config = RenderConfig {
        page_width_mm: 1200.0,
        page_height_mm: 1000.0,
        ..RenderConfig::default()
    };
    let sink = Arc::new(MockDocumentSink::new());
    let renderer = DocumentRenderer::new(config, sink.clone(), Arc::new(MockPrintSpooler::new()));
    let surface = MockSurface::new(400, 1000);

    let output = renderer
        .render(
            &surface,
            "COR",
            RenderOptions {
                save: true,
                print: false,
                slice: true,
            },
        )
        .await
        .unwrap();

    let document = output.document;
    assert_eq!(document.image.height, 3000);
    assert_eq!(document.page_count(), 3);
    let offsets: Vec<f64> = document.pages.iter().map(|p| -p.y).collect();
    assert_eq!(offsets, vec![0.0, 1000.0, 2000.0]);
    assert!(document.pages.iter().all(|p| p.height == 3000.0));
    assert_eq!(sink.saved().await.len(), 1);
    assert!(!output.printed);
    assert!(surface.all_restored().await);
}

#[tokio::test]
async fn test_failed_advising_resets_student() {
    let harness = TestHarness::new().await;
    let id = harness.student("2021-0006").await;
    harness
        .backend
        .fail_on(
            BackendOp::SubmitAdvising,
            BackendError::ApiError {
                endpoint: "advising_submit".to_string(),
                status: 500,
                message: "Internal Server Error".to_string(),
            },
        )
        .await;

    let selection = harness
        .orchestrator
        .load_advising(&id)
        .await
        .ready()
        .unwrap()
        .selection;
    let outcome = harness.orchestrator.submit_advising(&id, &selection).await;

    let notice = outcome.notice().expect("advising failed");
    assert_eq!(notice.kind, Some(ErrorKind::Rollback));
    assert!(outcome.redirect().is_none());
    assert_eq!(harness.status(&id).await, EnrollmentStatus::NotEnrolled);
    assert_eq!(
        harness.backend.calls().await,
        vec![
            BackendCall::UpdateStatus(id.clone(), EnrollmentStatus::Waitlisted),
            BackendCall::SubmitAdvising(
                id.clone(),
                vec!["CS101".to_string(), "MATH101".to_string()]
            ),
            BackendCall::UpdateStatus(id.clone(), EnrollmentStatus::NotEnrolled),
        ]
    );

    // Billing is unavailable until the student is advised again
    let outcome = harness
        .orchestrator
        .billing(&id, PaymentTerms::cash(Decimal::ZERO))
        .await;
    assert!(!outcome.is_ready());
}

#[tokio::test]
async fn test_invoice_priced_before_readvising_is_stale() {
    let harness = TestHarness::new().await;
    let id = harness.student("2021-0007").await;
    let orchestrator = &harness.orchestrator;
    let selection = orchestrator.load_advising(&id).await.ready().unwrap().selection;
    orchestrator
        .submit_advising(&id, &selection)
        .await
        .ready()
        .unwrap();

    let priced = orchestrator
        .billing(&id, PaymentTerms::cash(Decimal::from(5500)))
        .await
        .ready()
        .unwrap();

    // The department adds a course elsewhere; the next billing reprices it
    let mut changed = fixtures::advising_result();
    let pe = changed.suggestions.remove(1);
    changed.default_courses.push(pe);
    harness.backend.set_advising(&id, changed).await;
    let repriced = orchestrator
        .billing(&id, PaymentTerms::cash(Decimal::from(5500)))
        .await
        .ready()
        .unwrap();
    assert_ne!(priced.invoice.basis, repriced.invoice.basis);

    let outcome = orchestrator.confirm_billing(&id, &priced).await;
    assert_eq!(outcome.redirect(), Some(Screen::StudentList));
    assert_eq!(harness.status(&id).await, EnrollmentStatus::Waitlisted);
    assert!(harness.backend.batches().await.is_empty());

    let enrolled = orchestrator
        .confirm_billing(&id, &repriced)
        .await
        .ready()
        .unwrap();
    assert_eq!(enrolled.enrollment_status, EnrollmentStatus::Enrolled);
    assert_eq!(harness.backend.batches().await[0].course_ids, vec![1, 2, 4]);
}

#[tokio::test]
async fn test_invoice_confirmed_after_backend_readvising_is_refused() {
    let harness = TestHarness::new().await;
    let id = harness.student("2021-0010").await;
    let orchestrator = &harness.orchestrator;
    let selection = orchestrator.load_advising(&id).await.ready().unwrap().selection;
    orchestrator
        .submit_advising(&id, &selection)
        .await
        .ready()
        .unwrap();

    let priced = orchestrator
        .billing(&id, PaymentTerms::cash(Decimal::from(5500)))
        .await
        .ready()
        .unwrap();
    assert_eq!(priced.invoice.grand_total, Decimal::from(5500));

    // Another session re-advises: one more course and a new lab fee
    let mut changed = fixtures::advising_result();
    let cs102 = changed.suggestions.remove(0);
    changed.default_courses.push(cs102);
    changed.billings.push(BillingLineItem::new(
        "Electronics Laboratory",
        FeeCategory::LabFees,
        Decimal::from(1000),
    ));
    harness.backend.set_advising(&id, changed).await;

    // Confirm straight away, without pricing the new set
    let outcome = orchestrator.confirm_billing(&id, &priced).await;
    assert_eq!(outcome.redirect(), Some(Screen::StudentList));
    assert!(outcome.notice().is_some());
    assert_eq!(harness.status(&id).await, EnrollmentStatus::Waitlisted);
    assert!(harness.backend.batches().await.is_empty());

    let repriced = orchestrator
        .billing(&id, PaymentTerms::cash(Decimal::from(6500)))
        .await
        .ready()
        .unwrap();
    assert_eq!(repriced.invoice.grand_total, Decimal::from(6500));
    orchestrator
        .confirm_billing(&id, &repriced)
        .await
        .ready()
        .unwrap();
    let batches = harness.backend.batches().await;
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].course_ids, vec![1, 2, 3]);
    assert_eq!(batches[0].paid, Decimal::from(6500));
}

#[tokio::test]
async fn test_concurrent_actions_for_one_student() {
    let harness = TestHarness::new().await;
    let id = harness.student("2021-0008").await;
    let selection = harness
        .orchestrator
        .load_advising(&id)
        .await
        .ready()
        .unwrap()
        .selection;
    harness.backend.set_delay_ms(50).await;

    let (first, second) = tokio::join!(
        harness.orchestrator.submit_advising(&id, &selection),
        harness.orchestrator.submit_advising(&id, &selection),
    );

    let outcomes = [first.is_ready(), second.is_ready()];
    assert_eq!(outcomes.iter().filter(|ready| **ready).count(), 1);
    let rejected = if first.is_ready() { &second } else { &first };
    let notice = rejected.notice().unwrap();
    assert_eq!(notice.kind, Some(ErrorKind::Transient));
    assert!(notice.is_retryable());
    assert!(!harness.orchestrator.is_saving(&id));
    assert_eq!(harness.status(&id).await, EnrollmentStatus::Waitlisted);
}

#[tokio::test]
async fn test_irregular_student_flagged_for_advising() {
    let harness = TestHarness::new().await;
    let mut student = fixtures::student("2021-0009");
    student.status = StudentStatus::Irregular;
    harness.backend.add_student(student).await;
    let id = StudentId::new("2021-0009");
    harness
        .backend
        .set_advising(&id, fixtures::advising_result())
        .await;

    let view = harness.orchestrator.load_advising(&id).await.ready().unwrap();
    assert!(view.mandatory);
}

#[tokio::test]
async fn test_request_refused_when_window_closed() {
    let harness = TestHarness::new().await;
    let id = harness.student("2021-0010").await;
    harness
        .backend
        .set_windows(vec![
            fixtures::enrollment_window("BSCS", false),
            fixtures::enrollment_window("BSIT", true),
        ])
        .await;

    let outcome = harness.orchestrator.request_enrollment(&id).await;
    match outcome {
        StepOutcome::Redirect { to, notice } => {
            assert_eq!(to, Screen::StudentList);
            assert!(notice.message.contains("BSCS"));
        }
        other => panic!("expected redirect, got {:?}", other.notice()),
    }
    assert_eq!(harness.status(&id).await, EnrollmentStatus::NotEnrolled);
    assert!(harness.backend.calls().await.is_empty());
}
