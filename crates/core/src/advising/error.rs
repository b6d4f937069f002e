//! Error types for local advising edits.

use thiserror::Error;

/// Errors raised while editing or submitting a course selection.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AdvisingError {
    /// The code is already placed in the default course set.
    #[error("Course {code} is already in the advised course set")]
    DuplicateCourse { code: String },

    /// The code is neither placed nor available in the selectable pool.
    #[error("Course {code} is not available for this student")]
    UnknownCourse { code: String },

    /// The selectable pool is empty.
    #[error("No eligible courses left to add")]
    NoSuggestions,

    /// Row index outside the placed course list.
    #[error("Course row {index} out of range (have {len})")]
    IndexOutOfRange { index: usize, len: usize },

    /// Advising must place at least one course.
    #[error("At least one course must be advised")]
    EmptySelection,

    /// A course code without characters.
    #[error("Course code cannot be blank")]
    BlankCode,
}
