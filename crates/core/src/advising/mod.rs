//! Course advising and eligibility.
//!
//! The eligibility computation itself runs on the backend; this module holds
//! its output ([`AdvisingResult`]) and the contracts the client keeps while
//! department staff edit that output before submitting it:
//!
//! - no course code is placed twice;
//! - a course placed from the suggestions leaves the suggestion pool;
//! - a removed course returns to the pool exactly once;
//! - only course codes are submitted, after validation.

mod error;
mod selection;
mod types;

pub use error::AdvisingError;
pub use selection::CourseSelection;
pub use types::{validate_codes, AdvisingResult, AdvisingStamp, AdvisingSubmission, CourseTotals};
