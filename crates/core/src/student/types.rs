//! Student and course data types.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

use crate::enrollment::EnrollmentStatus;

// ============================================================================
// Identifiers
// ============================================================================

/// Immutable student identifier.
///
/// The backend of record hands out either numeric or alphanumeric ids; both
/// are carried as text so the id survives round trips unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct StudentId(String);

impl StudentId {
    /// Create an id from any textual value (whitespace is trimmed).
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into().trim().to_string())
    }

    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// An id that carries no characters cannot address a student record.
    pub fn is_blank(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for StudentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for StudentId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for StudentId {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<u64> for StudentId {
    fn from(value: u64) -> Self {
        Self(value.to_string())
    }
}

impl<'de> Deserialize<'de> for StudentId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Number(i64),
            Text(String),
        }

        Ok(match RawId::deserialize(deserializer)? {
            RawId::Number(n) => StudentId(n.to_string()),
            RawId::Text(s) => StudentId::new(s),
        })
    }
}

// ============================================================================
// Student
// ============================================================================

/// Academic standing of a student.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StudentStatus {
    #[default]
    Regular,
    Irregular,
    Transferee,
}

impl StudentStatus {
    /// Returns the wire name of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            StudentStatus::Regular => "REGULAR",
            StudentStatus::Irregular => "IRREGULAR",
            StudentStatus::Transferee => "TRANSFEREE",
        }
    }

    pub fn is_regular(&self) -> bool {
        matches!(self, StudentStatus::Regular)
    }
}

/// Postal address of a student.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Address {
    #[serde(default)]
    pub street: Option<String>,
    #[serde(default)]
    pub barangay: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub province: Option<String>,
}

impl Address {
    /// Single-line rendering: `street barangay city, province`.
    pub fn one_line(&self) -> String {
        let locality = [&self.street, &self.barangay, &self.city]
            .iter()
            .filter_map(|part| part.as_deref())
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ");

        match self.province.as_deref() {
            Some(province) if !province.is_empty() && !locality.is_empty() => {
                format!("{}, {}", locality, province)
            }
            Some(province) if !province.is_empty() => province.to_string(),
            _ => locality,
        }
    }
}

/// A student's working copy as returned by the backend of record.
///
/// The client never caches this beyond a single workflow step; every step
/// re-fetches by [`StudentId`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Student {
    pub id: StudentId,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub middle_name: Option<String>,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub program: String,
    #[serde(default)]
    pub year_level: Option<u8>,
    #[serde(default)]
    pub section: Option<String>,
    #[serde(default)]
    pub semester: Option<String>,
    #[serde(default)]
    pub academic_year: Option<String>,
    #[serde(default)]
    pub enrollment_status: EnrollmentStatus,
    #[serde(default)]
    pub status: StudentStatus,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub contact_number: Option<String>,
    #[serde(default)]
    pub address: Address,
}

impl Student {
    /// Create a minimal student record (used by fixtures and tests).
    pub fn new(id: impl Into<StudentId>, program: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            first_name: String::new(),
            middle_name: None,
            last_name: String::new(),
            program: program.into(),
            year_level: None,
            section: None,
            semester: None,
            academic_year: None,
            enrollment_status: EnrollmentStatus::NotEnrolled,
            status: StudentStatus::Regular,
            email: None,
            contact_number: None,
            address: Address::default(),
        }
    }

    /// `Last, First Middle` as printed on the registration form.
    pub fn full_name(&self) -> String {
        match self.middle_name.as_deref().filter(|m| !m.is_empty()) {
            Some(middle) => format!("{}, {} {}", self.last_name, self.first_name, middle),
            None => format!("{}, {}", self.last_name, self.first_name),
        }
    }

    /// `PROGRAM YEAR-SECTION`, with `TBA` for a missing section.
    pub fn program_block(&self) -> String {
        let year = self
            .year_level
            .map(|y| y.to_string())
            .unwrap_or_default();
        format!(
            "{} {}-{}",
            self.program,
            year,
            self.section.as_deref().unwrap_or("TBA")
        )
    }
}

// ============================================================================
// Course
// ============================================================================

/// A curriculum course. Immutable from the client's perspective.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Course {
    /// Backend primary key (required by the batch enrollment endpoint).
    #[serde(default)]
    pub id: Option<i64>,
    pub code: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub program: Option<String>,
    #[serde(default)]
    pub year_level: Option<u8>,
    #[serde(default)]
    pub semester: Option<String>,
    #[serde(default, alias = "lec_units")]
    pub lecture_units: u32,
    #[serde(default)]
    pub lab_units: u32,
    #[serde(default, alias = "lec_hours")]
    pub lecture_hours: u32,
    #[serde(default)]
    pub lab_hours: u32,
}

impl Course {
    /// Create a course with a code and title only.
    pub fn new(code: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            title: title.into(),
            ..Default::default()
        }
    }

    /// Lecture plus lab units.
    pub fn total_units(&self) -> u32 {
        self.lecture_units + self.lab_units
    }

    /// Lecture plus lab contact hours.
    pub fn contact_hours(&self) -> u32 {
        self.lecture_hours + self.lab_hours
    }
}

/// Academic term a workflow runs in.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AcademicTerm {
    /// School year, e.g. `2024-2025`.
    pub school_year: String,
    /// Semester label, e.g. `1st`.
    #[serde(default)]
    pub semester: Option<String>,
}

impl AcademicTerm {
    pub fn new(school_year: impl Into<String>) -> Self {
        Self {
            school_year: school_year.into(),
            semester: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_student_id_accepts_numbers_and_text() {
        let numeric: StudentId = serde_json::from_str("202110345").unwrap();
        assert_eq!(numeric.as_str(), "202110345");

        let text: StudentId = serde_json::from_str("\" S-17 \"").unwrap();
        assert_eq!(text.as_str(), "S-17");
    }

    #[test]
    fn test_blank_student_id() {
        assert!(StudentId::new("   ").is_blank());
        assert!(!StudentId::new("7").is_blank());
    }

    #[test]
    fn test_student_deserialize_with_defaults() {
        let json = r#"{
            "id": 12,
            "first_name": "Ana",
            "last_name": "Reyes",
            "program": "BSCS",
            "enrollment_status": "PENDING_REQUEST",
            "status": "IRREGULAR"
        }"#;
        let student: Student = serde_json::from_str(json).unwrap();
        assert_eq!(student.id.as_str(), "12");
        assert_eq!(student.enrollment_status, EnrollmentStatus::PendingRequest);
        assert_eq!(student.status, StudentStatus::Irregular);
        assert_eq!(student.address, Address::default());
    }

    #[test]
    fn test_full_name_and_program_block() {
        let mut student = Student::new("1", "BSIT");
        student.first_name = "Ana".into();
        student.last_name = "Reyes".into();
        student.year_level = Some(3);
        assert_eq!(student.full_name(), "Reyes, Ana");
        assert_eq!(student.program_block(), "BSIT 3-TBA");

        student.middle_name = Some("Cruz".into());
        student.section = Some("A".into());
        assert_eq!(student.full_name(), "Reyes, Ana Cruz");
        assert_eq!(student.program_block(), "BSIT 3-A");
    }

    #[test]
    fn test_address_one_line() {
        let address = Address {
            street: Some("Rizal St".into()),
            barangay: None,
            city: Some("Indang".into()),
            province: Some("Cavite".into()),
        };
        assert_eq!(address.one_line(), "Rizal St Indang, Cavite");
        assert_eq!(Address::default().one_line(), "");
    }

    #[test]
    fn test_course_aliases_and_totals() {
        let json = r#"{"id": 4, "code": "CS101", "title": "Intro", "lec_units": 2, "lab_units": 1, "lecture_hours": 2, "lab_hours": 3}"#;
        let course: Course = serde_json::from_str(json).unwrap();
        assert_eq!(course.total_units(), 3);
        assert_eq!(course.contact_hours(), 5);
    }
}
