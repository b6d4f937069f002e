//! Types returned by workflow steps.

use serde::Serialize;

use crate::advising::{AdvisingResult, AdvisingStamp, CourseSelection, CourseTotals};
use crate::billing::{BillingLineItem, Invoice, PaymentTerms};
use crate::cor::EnrollmentRecord;
use crate::error::ErrorKind;
use crate::render::RenderOutput;
use crate::student::{Course, EnrollmentRow, GradeRecord, Student};

/// Screens a step can send the user to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Screen {
    StudentList,
    Evaluation,
    Advising,
    Billing,
    Registration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

/// A message for the user, returned instead of raised.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub title: String,
    pub message: String,
    /// Failure class, absent for informational notices.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<ErrorKind>,
}

impl Notice {
    pub fn info(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            title: title.into(),
            message: message.into(),
            kind: None,
        }
    }

    pub fn warning(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Warning,
            title: title.into(),
            message: message.into(),
            kind: None,
        }
    }

    /// Whether repeating the same action may succeed.
    pub fn is_retryable(&self) -> bool {
        self.kind.is_some_and(|k| k.is_retryable())
    }
}

/// Result of one workflow step.
#[derive(Debug, Clone)]
pub enum StepOutcome<T> {
    /// The step completed; show its data.
    Ready(T),
    /// An entry guard failed; go to another screen.
    Redirect { to: Screen, notice: Notice },
    /// The step stopped; stay on the screen and show the notice.
    Notice(Notice),
}

impl<T> StepOutcome<T> {
    pub fn is_ready(&self) -> bool {
        matches!(self, StepOutcome::Ready(_))
    }

    pub fn ready(self) -> Option<T> {
        match self {
            StepOutcome::Ready(value) => Some(value),
            _ => None,
        }
    }

    pub fn notice(&self) -> Option<&Notice> {
        match self {
            StepOutcome::Ready(_) => None,
            StepOutcome::Redirect { notice, .. } | StepOutcome::Notice(notice) => Some(notice),
        }
    }

    /// Screen to go to, if the step redirected.
    pub fn redirect(&self) -> Option<Screen> {
        match self {
            StepOutcome::Redirect { to, .. } => Some(*to),
            _ => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> StepOutcome<U> {
        match self {
            StepOutcome::Ready(value) => StepOutcome::Ready(f(value)),
            StepOutcome::Redirect { to, notice } => StepOutcome::Redirect { to, notice },
            StepOutcome::Notice(notice) => StepOutcome::Notice(notice),
        }
    }
}

/// Data a screen loads when it is activated.
///
/// One activation issues one request: `start` refuses while a load is
/// already running.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum LoadState<T> {
    #[default]
    Idle,
    Loading,
    Ready(T),
    Failed(Notice),
}

impl<T> LoadState<T> {
    /// Enter `Loading`. Returns false if a load is already in progress.
    pub fn start(&mut self) -> bool {
        if self.is_loading() {
            return false;
        }
        *self = LoadState::Loading;
        true
    }

    /// Leave `Loading` with the request's result.
    pub fn finish<E>(&mut self, result: Result<T, E>)
    where
        E: Into<Notice>,
    {
        *self = match result {
            Ok(value) => LoadState::Ready(value),
            Err(e) => LoadState::Failed(e.into()),
        };
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, LoadState::Loading)
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            LoadState::Ready(value) => Some(value),
            _ => None,
        }
    }
}

/// A prior enrollment with its grades.
#[derive(Debug, Clone)]
pub struct EvaluatedCourse {
    pub row: EnrollmentRow,
    /// `Idle` for rows whose course has no backend id.
    pub grades: LoadState<Vec<GradeRecord>>,
}

impl EvaluatedCourse {
    pub fn is_passed(&self) -> bool {
        self.grades
            .value()
            .is_some_and(|grades| grades.iter().any(|g| g.is_passed()))
    }
}

/// Evaluation screen: what the student took in a school year.
#[derive(Debug, Clone)]
pub struct Evaluation {
    pub student: Student,
    pub school_year: String,
    pub courses: Vec<EvaluatedCourse>,
}

impl Evaluation {
    /// Codes of courses with a passing grade.
    pub fn passed_codes(&self) -> Vec<&str> {
        self.courses
            .iter()
            .filter(|c| c.is_passed())
            .map(|c| c.row.course.code.as_str())
            .collect()
    }
}

/// Advising screen.
#[derive(Debug, Clone)]
pub struct AdvisingView {
    pub student: Student,
    pub result: AdvisingResult,
    /// Working copy for the editor.
    pub selection: CourseSelection,
    /// Non-regular student who has not started enrollment.
    pub mandatory: bool,
}

/// A successful advising submission.
#[derive(Debug, Clone)]
pub struct Advised {
    pub student: Student,
    pub stamp: AdvisingStamp,
}

/// Billing screen: the advised courses and their priced invoice.
#[derive(Debug, Clone)]
pub struct BillingView {
    pub student: Student,
    pub courses: Vec<Course>,
    pub totals: CourseTotals,
    pub lines: Vec<BillingLineItem>,
    pub terms: PaymentTerms,
    /// Stamped with the advising it was priced for.
    pub invoice: Invoice,
}

/// Registration screen: the committed record and its rendered document.
#[derive(Debug, Clone)]
pub struct Registration {
    pub record: EnrollmentRecord,
    pub output: RenderOutput,
}
