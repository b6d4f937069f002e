//! Student and curriculum data model.

mod records;
mod types;

pub use records::{EnrollmentRow, EnrollmentWindow, GradeRecord, Schedule};
pub use types::{AcademicTerm, Address, Course, Student, StudentId, StudentStatus};
