//! Academic records attached to a student: enrollment rows, grades and
//! enrollment windows.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::types::Course;

/// Class schedule of an enrolled course. Missing parts print as `TBA`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Schedule {
    #[serde(default)]
    pub day: Option<String>,
    #[serde(default)]
    pub time: Option<String>,
    #[serde(default)]
    pub room: Option<String>,
}

impl Schedule {
    pub fn day_or_tba(&self) -> &str {
        self.day.as_deref().unwrap_or("TBA")
    }

    pub fn time_or_tba(&self) -> &str {
        self.time.as_deref().unwrap_or("TBA")
    }

    pub fn room_or_tba(&self) -> &str {
        self.room.as_deref().unwrap_or("TBA")
    }
}

/// One committed course/schedule pair of a term.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EnrollmentRow {
    pub course: Course,
    #[serde(default)]
    pub schedule: Schedule,
    /// When the row was committed.
    #[serde(default)]
    pub date: Option<DateTime<Utc>>,
}

/// Grade of a previously enrolled course, used during evaluation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GradeRecord {
    pub course: Course,
    #[serde(default)]
    pub grade: Option<String>,
    #[serde(default)]
    pub remarks: Option<String>,
}

impl GradeRecord {
    /// A course counts as passed unless its remarks say otherwise.
    pub fn is_passed(&self) -> bool {
        !matches!(
            self.remarks.as_deref().map(str::to_ascii_uppercase).as_deref(),
            Some("FAILED") | Some("INC") | Some("DROPPED")
        )
    }
}

/// Enrollment period published for a program.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EnrollmentWindow {
    pub program_name: String,
    #[serde(default)]
    pub from_date: Option<NaiveDate>,
    #[serde(default)]
    pub to_date: Option<NaiveDate>,
    #[serde(default)]
    pub message: Option<String>,
    /// Whether students of this program may request enrollment now.
    #[serde(default)]
    pub is_enrollment: bool,
}

impl EnrollmentWindow {
    /// Find the window of `program` and report whether it is open.
    pub fn is_open_for(windows: &[EnrollmentWindow], program: &str) -> bool {
        windows
            .iter()
            .any(|w| w.program_name == program && w.is_enrollment)
    }
}
