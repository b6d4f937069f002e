//! Advising data types.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::billing::BillingLineItem;
use crate::student::{Course, StudentId};

use super::error::AdvisingError;

/// Backend-computed advising for one student at one point in time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct AdvisingResult {
    /// Courses the resolver places by default.
    #[serde(default)]
    pub default_courses: Vec<Course>,
    /// Remaining eligible pool.
    #[serde(default, alias = "eligible_courses")]
    pub suggestions: Vec<Course>,
    /// Billing lines priced for this advising.
    #[serde(default)]
    pub billings: Vec<BillingLineItem>,
}

/// Payload of `POST /advising`: course codes only.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AdvisingSubmission {
    pub id: StudentId,
    pub default_courses: Vec<String>,
}

impl AdvisingSubmission {
    /// Build a validated submission. Nothing reaches the wire unless this
    /// succeeds.
    pub fn new(id: StudentId, codes: Vec<String>) -> Result<Self, AdvisingError> {
        validate_codes(&codes)?;
        Ok(Self {
            id,
            default_courses: codes,
        })
    }
}

/// Reject blank codes, duplicate codes and empty selections.
pub fn validate_codes(codes: &[String]) -> Result<(), AdvisingError> {
    if codes.is_empty() {
        return Err(AdvisingError::EmptySelection);
    }

    let mut seen = std::collections::HashSet::with_capacity(codes.len());
    for code in codes {
        let trimmed = code.trim();
        if trimmed.is_empty() {
            return Err(AdvisingError::BlankCode);
        }
        if !seen.insert(trimmed) {
            return Err(AdvisingError::DuplicateCourse {
                code: trimmed.to_string(),
            });
        }
    }
    Ok(())
}

/// Identifies the advised course set an invoice was priced against.
///
/// `revision` grows with every accepted advising of the student, so an
/// invoice computed before the latest advising never matches even when the
/// same codes were re-submitted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct AdvisingStamp {
    pub student_id: StudentId,
    pub revision: u64,
    /// Hex SHA-256 over the sorted course codes.
    pub digest: String,
}

impl AdvisingStamp {
    pub fn compute<S: AsRef<str>>(student_id: &StudentId, codes: &[S], revision: u64) -> Self {
        let mut sorted: Vec<&str> = codes.iter().map(|c| c.as_ref().trim()).collect();
        sorted.sort_unstable();
        sorted.dedup();

        let mut hasher = Sha256::new();
        hasher.update(student_id.as_str().as_bytes());
        for code in sorted {
            hasher.update(b"\n");
            hasher.update(code.as_bytes());
        }

        Self {
            student_id: student_id.clone(),
            revision,
            digest: format!("{:x}", hasher.finalize()),
        }
    }
}

/// Unit and contact-hour totals of a course set.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct CourseTotals {
    pub courses: usize,
    pub units: u32,
    pub hours: u32,
}

impl CourseTotals {
    pub fn of<'a>(courses: impl IntoIterator<Item = &'a Course>) -> Self {
        courses
            .into_iter()
            .fold(CourseTotals::default(), |acc, course| CourseTotals {
                courses: acc.courses + 1,
                units: acc.units + course.total_units(),
                hours: acc.hours + course.contact_hours(),
            })
    }
}
