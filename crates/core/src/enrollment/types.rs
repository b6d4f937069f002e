//! Enrollment status and transition types.

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::billing::{Invoice, PaymentTerms};

/// A student's enrollment status.
///
/// ```text
/// NOT_ENROLLED ──request──▶ PENDING_REQUEST ──advise──▶ WAITLISTED ──confirm──▶ ENROLLED
///      │                          │                          ▲
///      └──────────advise──────────┼──────────────────────────┘
///      ▲                          │ (advise failed)
///      └──────────rollback────────┘ and from WAITLISTED
/// ```
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EnrollmentStatus {
    #[default]
    NotEnrolled,
    PendingRequest,
    Waitlisted,
    Enrolled,
}

impl EnrollmentStatus {
    /// Returns the wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            EnrollmentStatus::NotEnrolled => "NOT_ENROLLED",
            EnrollmentStatus::PendingRequest => "PENDING_REQUEST",
            EnrollmentStatus::Waitlisted => "WAITLISTED",
            EnrollmentStatus::Enrolled => "ENROLLED",
        }
    }

    /// Returns true if no further transition is defined.
    pub fn is_terminal(&self) -> bool {
        matches!(self, EnrollmentStatus::Enrolled)
    }

    /// Returns true if the transition may start from this status.
    pub fn permits(&self, transition: Transition) -> bool {
        transition.sources().contains(self)
    }
}

impl fmt::Display for EnrollmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Transitions of the enrollment state machine.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Transition {
    /// Student asks to be enrolled.
    RequestEnrollment,
    /// Department places the student's course load.
    Advise,
    /// Registrar confirms payment.
    ConfirmBilling,
    /// Compensating reset after a failed advising.
    Rollback,
}

impl Transition {
    /// Statuses the transition may start from.
    pub fn sources(&self) -> &'static [EnrollmentStatus] {
        match self {
            Transition::RequestEnrollment => &[EnrollmentStatus::NotEnrolled],
            Transition::Advise => &[
                EnrollmentStatus::NotEnrolled,
                EnrollmentStatus::PendingRequest,
            ],
            Transition::ConfirmBilling => &[EnrollmentStatus::Waitlisted],
            Transition::Rollback => &[
                EnrollmentStatus::NotEnrolled,
                EnrollmentStatus::PendingRequest,
                EnrollmentStatus::Waitlisted,
            ],
        }
    }

    /// Status reached on success.
    pub fn target(&self) -> EnrollmentStatus {
        match self {
            Transition::RequestEnrollment => EnrollmentStatus::PendingRequest,
            Transition::Advise => EnrollmentStatus::Waitlisted,
            Transition::ConfirmBilling => EnrollmentStatus::Enrolled,
            Transition::Rollback => EnrollmentStatus::NotEnrolled,
        }
    }

    /// Returns the transition name (metrics label).
    pub fn name(&self) -> &'static str {
        match self {
            Transition::RequestEnrollment => "request_enrollment",
            Transition::Advise => "advise",
            Transition::ConfirmBilling => "confirm_billing",
            Transition::Rollback => "rollback",
        }
    }
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Payload of `PATCH /student/<id>`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct StatusUpdate {
    pub enrollment_status: EnrollmentStatus,
}

/// Payload of `POST /batch/`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BatchEnrollment {
    pub student_id: crate::student::StudentId,
    pub course_ids: Vec<i64>,
    pub voucher: bool,
    #[serde(with = "rust_decimal::serde::float")]
    pub paid: Decimal,
}

/// Everything the registrar confirms on the billing screen.
#[derive(Debug, Clone, PartialEq)]
pub struct BillingConfirmation {
    /// Invoice shown to the registrar, stamped with its advising basis.
    pub invoice: Invoice,
    /// Backend ids of the advised courses.
    pub course_ids: Vec<i64>,
    pub terms: PaymentTerms,
}

/// Outcome of the compensating reset after a failed advising.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RollbackOutcome {
    /// Backend status reset to `NOT_ENROLLED`.
    Completed,
    /// The reset call failed; only logged.
    Failed(String),
}
