//! Enrollment lifecycle state machine.
//!
//! Status moves forward through three actors: the student requests
//! enrollment, the department advises, the registrar confirms billing.
//! Advising can be undone by a compensating reset; `ENROLLED` is final.

mod error;
mod flight;
mod machine;
mod types;

pub use error::EnrollmentError;
pub use flight::{FlightGuard, InFlight};
pub use machine::{requires_mandatory_advising, EnrollmentMachine};
pub use types::{
    BatchEnrollment, BillingConfirmation, EnrollmentStatus, RollbackOutcome, StatusUpdate,
    Transition,
};
