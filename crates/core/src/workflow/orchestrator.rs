//! Sequences evaluation, advising, billing and registration for one student.

use std::sync::Arc;

use futures::future::join_all;
use tracing::{debug, info, warn};

use super::error::WorkflowError;
use super::types::{
    Advised, AdvisingView, BillingView, EvaluatedCourse, Evaluation, LoadState, Notice,
    Registration, Screen, StepOutcome,
};
use crate::advising::{CourseSelection, CourseTotals};
use crate::backend::EnrollmentBackend;
use crate::billing::{aggregate_with, PaymentTerms, RoundingPolicy};
use crate::config::Config;
use crate::cor::{certificate_layout, CertificateHeader};
use crate::enrollment::{
    requires_mandatory_advising, BillingConfirmation, EnrollmentError, EnrollmentMachine,
    EnrollmentStatus,
};
use crate::error::ErrorKind;
use crate::metrics::INVOICES_PRICED;
use crate::render::{DocumentRenderer, DocumentSink, PrintSpooler, RenderOptions, TextSurface};
use crate::student::{AcademicTerm, Student, StudentId};

/// Runs the enrollment workflow steps.
///
/// Steps are keyed only by the student id and re-fetch whatever they need, so
/// any step can be entered directly. Failures come back as
/// [`StepOutcome::Notice`] or [`StepOutcome::Redirect`], never as panics or
/// global alerts.
pub struct Orchestrator {
    machine: EnrollmentMachine,
    renderer: DocumentRenderer,
    term: Option<AcademicTerm>,
    rounding: RoundingPolicy,
    header: CertificateHeader,
}

impl Orchestrator {
    pub fn new(
        config: &Config,
        backend: Arc<dyn EnrollmentBackend>,
        sink: Arc<dyn DocumentSink>,
        spooler: Arc<dyn PrintSpooler>,
    ) -> Self {
        Self {
            machine: EnrollmentMachine::new(backend),
            renderer: DocumentRenderer::new(config.render.clone(), sink, spooler),
            term: config.term.academic_term(),
            rounding: config.billing.rounding,
            header: CertificateHeader {
                institution: config.render.institution.clone(),
                campus: config.render.campus.clone(),
            },
        }
    }

    pub fn machine(&self) -> &EnrollmentMachine {
        &self.machine
    }

    fn backend(&self) -> &Arc<dyn EnrollmentBackend> {
        self.machine.backend()
    }

    /// Whether a mutating action for the student is still saving.
    pub fn is_saving(&self, id: &StudentId) -> bool {
        self.machine.is_saving(id)
    }

    /// Load a student for a screen activation.
    pub async fn load_student(&self, id: &StudentId) -> LoadState<Student> {
        let mut state = LoadState::Idle;
        if id.is_blank() {
            state.finish::<WorkflowError>(Err(WorkflowError::NoStudentSelected));
            return state;
        }
        state.start();
        state.finish(self.backend().get_student(id).await);
        state
    }

    /// Student list: ask to be enrolled.
    pub async fn request_enrollment(&self, id: &StudentId) -> StepOutcome<Student> {
        self.run("request enrollment", async {
            let mut student = self.fetch_student(id).await?;
            let windows = match self.backend().get_enrollment_windows().await {
                Ok(windows) => Some(windows),
                Err(e) => {
                    warn!("Enrollment windows unavailable, not checking them: {}", e);
                    None
                }
            };
            self.machine
                .request_enrollment(&mut student, windows.as_deref())
                .await?;
            Ok(student)
        })
        .await
    }

    /// Evaluation: prior enrollments of the school year with their grades.
    ///
    /// A failed grade lookup marks that course only.
    pub async fn evaluation(&self, id: &StudentId) -> StepOutcome<Evaluation> {
        if id.is_blank() {
            return to_student_list(WorkflowError::NoStudentSelected);
        }
        self.run("evaluation", async {
            let student = self.fetch_student(id).await?;
            let school_year = self
                .term
                .as_ref()
                .map(|t| t.school_year.clone())
                .or_else(|| student.academic_year.clone())
                .ok_or_else(|| WorkflowError::NoSchoolYear {
                    student_id: id.clone(),
                })?;

            let rows = self.backend().get_enrollments(id, &school_year).await?;
            // Each row loads its grades on its own; one failure leaves the others intact.
            let courses = join_all(rows.into_iter().map(move |row| async move {
                let mut grades = LoadState::Idle;
                if let Some(course_id) = row.course.id {
                    grades.start();
                    grades.finish(self.backend().get_grades(id, course_id).await);
                }
                EvaluatedCourse { row, grades }
            }))
            .await;

            debug!(
                "Evaluated {} course(s) of student {} for {}",
                courses.len(),
                id,
                school_year
            );
            Ok(Evaluation {
                student,
                school_year,
                courses,
            })
        })
        .await
    }

    /// Advising screen: the resolver's output and an editable selection.
    pub async fn load_advising(&self, id: &StudentId) -> StepOutcome<AdvisingView> {
        if id.is_blank() {
            return to_student_list(WorkflowError::NoStudentSelected);
        }
        self.run("load advising", async {
            let student = self.fetch_student(id).await?;
            let result = self.backend().get_advising(id).await?;
            let selection = CourseSelection::from_result(&result);
            Ok(AdvisingView {
                mandatory: requires_mandatory_advising(&student),
                student,
                result,
                selection,
            })
        })
        .await
    }

    /// Submit an edited selection; the student becomes `WAITLISTED`.
    pub async fn submit_advising(
        &self,
        id: &StudentId,
        selection: &CourseSelection,
    ) -> StepOutcome<Advised> {
        if id.is_blank() {
            return to_student_list(WorkflowError::NoStudentSelected);
        }
        self.run("submit advising", async {
            selection.validate()?;
            let mut student = self.fetch_student(id).await?;
            let stamp = self.machine.advise(&mut student, selection.codes()).await?;
            Ok(Advised { student, stamp })
        })
        .await
    }

    /// Billing screen: price the advised courses.
    ///
    /// Without a student, without advised courses, or for a student who still
    /// needs mandatory advising, the user is sent back to advising.
    pub async fn billing(&self, id: &StudentId, terms: PaymentTerms) -> StepOutcome<BillingView> {
        if id.is_blank() {
            return to_student_list(WorkflowError::NoStudentSelected);
        }

        let loaded = async {
            let student = self.fetch_student(id).await?;
            let advising = self.backend().get_advising(id).await?;
            Ok::<_, WorkflowError>((student, advising))
        }
        .await;
        let (student, advising) = match loaded {
            Ok(loaded) => loaded,
            Err(e) => return to_advising(e),
        };
        if requires_mandatory_advising(&student) {
            return to_advising(
                EnrollmentError::MandatoryAdvising {
                    student_id: id.clone(),
                }
                .into(),
            );
        }
        if advising.default_courses.is_empty() {
            return to_advising(WorkflowError::NoCourses {
                student_id: id.clone(),
            });
        }

        self.run("billing", async {
            let codes: Vec<&str> = advising
                .default_courses
                .iter()
                .map(|c| c.code.as_str())
                .collect();
            let basis = self.machine.adopt_advising(&student, &codes).await?;

            let invoice = aggregate_with(&advising.billings, terms, self.rounding).with_basis(basis);
            INVOICES_PRICED.inc();
            info!(
                "Priced invoice for student {}: {} course(s), grand total {:.2}",
                id,
                advising.default_courses.len(),
                invoice.grand_total
            );

            Ok(BillingView {
                totals: CourseTotals::of(&advising.default_courses),
                courses: advising.default_courses,
                lines: advising.billings,
                terms,
                invoice,
                student,
            })
        })
        .await
    }

    /// Confirm a priced invoice; the student becomes `ENROLLED`.
    ///
    /// The advised set is re-read from the backend and adopted first, so an
    /// invoice priced before the set changed there is rejected as stale.
    pub async fn confirm_billing(&self, id: &StudentId, view: &BillingView) -> StepOutcome<Student> {
        if id.is_blank() {
            return to_student_list(WorkflowError::NoStudentSelected);
        }
        self.run("confirm billing", async {
            let course_ids = view
                .courses
                .iter()
                .map(|c| {
                    c.id.ok_or_else(|| WorkflowError::MissingCourseId {
                        code: c.code.clone(),
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;

            let mut student = self.fetch_student(id).await?;
            let advised = self.backend().get_advising(id).await?;
            if let Some(&course_id) = course_ids.iter().find(|course_id| {
                !advised
                    .default_courses
                    .iter()
                    .any(|c| c.id == Some(**course_id))
            }) {
                return Err(WorkflowError::CourseNotAdvised {
                    student_id: id.clone(),
                    course_id,
                });
            }
            if student.enrollment_status == EnrollmentStatus::Waitlisted {
                let codes: Vec<&str> = advised
                    .default_courses
                    .iter()
                    .map(|c| c.code.as_str())
                    .collect();
                self.machine.adopt_advising(&student, &codes).await?;
            }

            let confirmation = BillingConfirmation {
                invoice: view.invoice.clone(),
                course_ids,
                terms: view.terms,
            };
            self.machine
                .confirm_billing(&mut student, &confirmation)
                .await?;
            Ok(student)
        })
        .await
    }

    /// Registration: render the committed certificate of registration.
    pub async fn registration(
        &self,
        id: &StudentId,
        options: RenderOptions,
    ) -> StepOutcome<Registration> {
        if id.is_blank() {
            return to_student_list(WorkflowError::NoStudentSelected);
        }
        self.run("registration", async {
            let student = self.fetch_student(id).await?;
            if student.enrollment_status != EnrollmentStatus::Enrolled {
                return Err(WorkflowError::NotEnrolled {
                    student_id: id.clone(),
                    status: student.enrollment_status,
                });
            }

            let record = self.backend().get_cor(id).await?;
            let layout = certificate_layout(&record, &self.header);
            let title = layout.title.clone();
            let surface = TextSurface::new(layout);
            let options = RenderOptions {
                slice: options.slice || self.renderer.config().slice_pages,
                ..options
            };
            let output = self.renderer.render(&surface, &title, options).await?;
            Ok(Registration { record, output })
        })
        .await
    }

    async fn fetch_student(&self, id: &StudentId) -> Result<Student, WorkflowError> {
        if id.is_blank() {
            return Err(WorkflowError::NoStudentSelected);
        }
        Ok(self.backend().get_student(id).await?)
    }

    /// Turn a step's result into an outcome, logging every failure.
    async fn run<T>(
        &self,
        step: &str,
        work: impl std::future::Future<Output = Result<T, WorkflowError>>,
    ) -> StepOutcome<T> {
        match work.await {
            Ok(value) => StepOutcome::Ready(value),
            Err(e) => {
                warn!("Step '{}' failed: {}", step, e);
                match e.kind() {
                    ErrorKind::Eligibility => StepOutcome::Redirect {
                        to: Screen::StudentList,
                        notice: Notice::from(&e),
                    },
                    _ => StepOutcome::Notice(Notice::from(&e)),
                }
            }
        }
    }
}

fn to_student_list<T>(err: WorkflowError) -> StepOutcome<T> {
    debug!("Redirecting to the student list: {}", err);
    StepOutcome::Redirect {
        to: Screen::StudentList,
        notice: Notice::from(&err),
    }
}

fn to_advising<T>(err: WorkflowError) -> StepOutcome<T> {
    warn!("Billing unavailable, back to advising: {}", err);
    StepOutcome::Redirect {
        to: Screen::Advising,
        notice: Notice::from(&err),
    }
}
