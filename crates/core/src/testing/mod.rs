//! Testing utilities and mock implementations.
//!
//! This module provides mock implementations of the backend and rendering
//! traits, allowing end-to-end workflow tests without a registrar server, a
//! display or a printer.
//!
//! # Example
//!
//! ```rust,ignore
//! use enrollment_core::testing::{fixtures, MockBackend};
//!
//! let backend = MockBackend::new();
//! let student = fixtures::student("2021-0001");
//! backend.add_student(student.clone()).await;
//! backend.set_advising(&student.id, fixtures::advising_result()).await;
//! ```

mod mock_backend;
mod mock_render;

pub use mock_backend::{BackendCall, BackendOp, MockBackend};
pub use mock_render::{MockDocumentSink, MockPrintSpooler, MockSurface};

/// Test fixtures and helper functions.
pub mod fixtures {
    use crate::advising::AdvisingResult;
    use crate::billing::{BillingLineItem, FeeCategory};
    use crate::student::{Address, Course, EnrollmentWindow, Student, StudentId};
    use rust_decimal::Decimal;

    /// A regular third-year BSCS student who has not started enrollment.
    pub fn student(id: &str) -> Student {
        let mut student = Student::new(StudentId::new(id), "BSCS");
        student.first_name = "Ana".to_string();
        student.middle_name = Some("Reyes".to_string());
        student.last_name = "Cruz".to_string();
        student.year_level = Some(3);
        student.semester = Some("FIRST".to_string());
        student.academic_year = Some("2024-2025".to_string());
        student.email = Some(format!("{}@students.example.edu", id));
        student.address = Address {
            street: Some("Aguinaldo Hwy".to_string()),
            barangay: Some("Molino".to_string()),
            city: Some("Bacoor".to_string()),
            province: Some("Cavite".to_string()),
        };
        student
    }

    /// A course with a backend id, lecture and lab units.
    pub fn course(id: i64, code: &str, lecture_units: u32, lab_units: u32) -> Course {
        let mut course = Course::new(code, format!("{} title", code));
        course.id = Some(id);
        course.lecture_units = lecture_units;
        course.lab_units = lab_units;
        course.lecture_hours = lecture_units;
        course.lab_hours = lab_units * 3;
        course
    }

    /// Lab fee 800, assessments 3200 and 1500: 5500 in total.
    pub fn billing_lines() -> Vec<BillingLineItem> {
        vec![
            BillingLineItem::new("Computer Laboratory", FeeCategory::LabFees, Decimal::from(800)),
            BillingLineItem::new("Tuition", FeeCategory::Assessment, Decimal::from(3200)),
            BillingLineItem::new("Miscellaneous", FeeCategory::Assessment, Decimal::from(1500)),
        ]
    }

    /// CS101 and MATH101 placed, CS102 and PE1 suggested, priced with
    /// [`billing_lines`].
    pub fn advising_result() -> AdvisingResult {
        AdvisingResult {
            default_courses: vec![course(1, "CS101", 2, 1), course(2, "MATH101", 3, 0)],
            suggestions: vec![course(3, "CS102", 2, 1), course(4, "PE1", 2, 0)],
            billings: billing_lines(),
        }
    }

    /// Enrollment window of `program`, open or closed.
    pub fn enrollment_window(program: &str, open: bool) -> EnrollmentWindow {
        EnrollmentWindow {
            program_name: program.to_string(),
            from_date: None,
            to_date: None,
            message: (!open).then(|| format!("Enrollment for {} is closed", program)),
            is_enrollment: open,
        }
    }
}
