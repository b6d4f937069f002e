//! Per-student single-flight registry.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use crate::student::StudentId;

/// Students with a mutating call in flight.
#[derive(Debug, Clone, Default)]
pub struct InFlight {
    students: Arc<Mutex<HashSet<StudentId>>>,
}

impl InFlight {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `id`; `None` when a call for the student is already running.
    pub fn try_acquire(&self, id: &StudentId) -> Option<FlightGuard> {
        let mut students = self.students.lock().unwrap_or_else(|e| e.into_inner());
        if !students.insert(id.clone()) {
            return None;
        }
        Some(FlightGuard {
            students: Arc::clone(&self.students),
            id: id.clone(),
        })
    }

    pub fn is_busy(&self, id: &StudentId) -> bool {
        self.students
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(id)
    }
}

/// Releases the claim on drop.
#[derive(Debug)]
pub struct FlightGuard {
    students: Arc<Mutex<HashSet<StudentId>>>,
    id: StudentId,
}

impl Drop for FlightGuard {
    fn drop(&mut self) {
        self.students
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&self.id);
    }
}
