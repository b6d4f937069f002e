//! Working copy of a student's course selection.

use tracing::debug;

use crate::student::Course;

use super::error::AdvisingError;
use super::types::{validate_codes, AdvisingResult, CourseTotals};

/// Locally edited advising result.
///
/// Holds the placed (default) courses and the selectable pool. A code is
/// never placed twice, and a code is never both placed and selectable.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CourseSelection {
    placed: Vec<Course>,
    pool: Vec<Course>,
}

impl CourseSelection {
    /// Start from the resolver's output.
    ///
    /// Duplicated default codes keep their first occurrence; suggestions that
    /// are already placed (or repeated) are dropped from the pool.
    pub fn from_result(result: &AdvisingResult) -> Self {
        let mut selection = Self::default();

        for course in &result.default_courses {
            if selection.is_placed(&course.code) {
                debug!("Dropping duplicated default course {}", course.code);
                continue;
            }
            selection.placed.push(course.clone());
        }

        for course in &result.suggestions {
            if selection.is_placed(&course.code) || selection.in_pool(&course.code) {
                continue;
            }
            selection.pool.push(course.clone());
        }

        selection
    }

    /// Placed courses in row order.
    pub fn placed(&self) -> &[Course] {
        &self.placed
    }

    /// Courses still available to place.
    pub fn pool(&self) -> &[Course] {
        &self.pool
    }

    pub fn is_empty(&self) -> bool {
        self.placed.is_empty()
    }

    pub fn is_placed(&self, code: &str) -> bool {
        self.placed.iter().any(|c| c.code == code)
    }

    fn in_pool(&self, code: &str) -> bool {
        self.pool.iter().any(|c| c.code == code)
    }

    fn take_from_pool(&mut self, code: &str) -> Result<Course, AdvisingError> {
        if self.is_placed(code) {
            return Err(AdvisingError::DuplicateCourse {
                code: code.to_string(),
            });
        }
        let position = self
            .pool
            .iter()
            .position(|c| c.code == code)
            .ok_or_else(|| AdvisingError::UnknownCourse {
                code: code.to_string(),
            })?;
        Ok(self.pool.remove(position))
    }

    fn release(&mut self, course: Course) {
        if !self.in_pool(&course.code) && !self.is_placed(&course.code) {
            self.pool.push(course);
        }
    }

    /// Place a course from the pool. It leaves the pool.
    pub fn add(&mut self, code: &str) -> Result<&Course, AdvisingError> {
        let course = self.take_from_pool(code)?;
        self.placed.push(course);
        Ok(&self.placed[self.placed.len() - 1])
    }

    /// Place the first available pool course.
    pub fn add_first(&mut self) -> Result<&Course, AdvisingError> {
        let code = self
            .pool
            .first()
            .map(|c| c.code.clone())
            .ok_or(AdvisingError::NoSuggestions)?;
        self.add(&code)
    }

    /// Remove the placed course at `index`; it returns to the pool.
    pub fn remove(&mut self, index: usize) -> Result<Course, AdvisingError> {
        if index >= self.placed.len() {
            return Err(AdvisingError::IndexOutOfRange {
                index,
                len: self.placed.len(),
            });
        }
        let course = self.placed.remove(index);
        self.release(course.clone());
        Ok(course)
    }

    /// Remove a placed course by code.
    pub fn remove_code(&mut self, code: &str) -> Result<Course, AdvisingError> {
        let index = self
            .placed
            .iter()
            .position(|c| c.code == code)
            .ok_or_else(|| AdvisingError::UnknownCourse {
                code: code.to_string(),
            })?;
        self.remove(index)
    }

    /// Swap the course at `index` for a pool course, keeping the row position.
    pub fn replace(&mut self, index: usize, code: &str) -> Result<(), AdvisingError> {
        if index >= self.placed.len() {
            return Err(AdvisingError::IndexOutOfRange {
                index,
                len: self.placed.len(),
            });
        }
        if self.placed[index].code == code {
            return Ok(());
        }
        let incoming = self.take_from_pool(code)?;
        let outgoing = std::mem::replace(&mut self.placed[index], incoming);
        self.release(outgoing);
        Ok(())
    }

    /// Placed course codes in row order.
    pub fn codes(&self) -> Vec<String> {
        self.placed.iter().map(|c| c.code.clone()).collect()
    }

    /// Backend ids of the placed courses (courses without an id are skipped).
    pub fn course_ids(&self) -> Vec<i64> {
        self.placed.iter().filter_map(|c| c.id).collect()
    }

    /// Units and contact hours of the placed courses.
    pub fn totals(&self) -> CourseTotals {
        CourseTotals::of(&self.placed)
    }

    /// Check the selection is submittable.
    pub fn validate(&self) -> Result<(), AdvisingError> {
        validate_codes(&self.codes())
    }
}
