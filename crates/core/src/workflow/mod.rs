//! Enrollment workflow orchestration.
//!
//! Each screen of the enrollment flow is a step on [`Orchestrator`]:
//! evaluation, advising, billing and registration. Steps take only a student
//! id and return a [`StepOutcome`].

mod error;
mod orchestrator;
mod types;

pub use error::WorkflowError;
pub use orchestrator::Orchestrator;
pub use types::{
    Advised, AdvisingView, BillingView, EvaluatedCourse, Evaluation, LoadState, Notice,
    NoticeLevel, Registration, Screen, StepOutcome,
};
