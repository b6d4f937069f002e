pub mod advising;
pub mod backend;
pub mod billing;
pub mod config;
pub mod cor;
pub mod enrollment;
pub mod error;
pub mod metrics;
pub mod render;
pub mod schema;
pub mod student;
pub mod testing;
pub mod workflow;

pub use advising::{AdvisingError, AdvisingResult, AdvisingStamp, CourseSelection, CourseTotals};
pub use backend::{BackendError, EnrollmentBackend, HttpBackend};
pub use billing::{
    aggregate, aggregate_with, BillingLineItem, FeeCategory, Invoice, PaymentTerms, Peso,
    RoundingPolicy,
};
pub use config::{load_config, load_config_from_str, validate_config, Config, ConfigError};
pub use cor::{certificate_layout, CertificateHeader, EnrollmentRecord};
pub use enrollment::{EnrollmentError, EnrollmentMachine, EnrollmentStatus, Transition};
pub use error::ErrorKind;
pub use render::{
    CommandSpooler, DocumentRenderer, FsDocumentSink, PrintDocument, RenderError, RenderOptions,
};
pub use student::{Course, Student, StudentId, StudentStatus};
pub use workflow::{
    LoadState, Notice, NoticeLevel, Orchestrator, Screen, StepOutcome, WorkflowError,
};
