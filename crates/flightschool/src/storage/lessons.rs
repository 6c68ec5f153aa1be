//! Persistent store of scheduled lessons.

use std::rc::Rc;

use chrono::NaiveDate;
use tracing::debug;

use crate::error::Result;
use crate::lesson::ScheduledLesson;

use super::{Collection, KeyValueStore, LESSONS_KEY};

/// Scheduled lessons. Business rules live in the booking engine; this store
/// only persists and filters.
#[derive(Debug)]
pub struct BookingStore {
    collection: Collection<ScheduledLesson>,
}

impl BookingStore {
    /// Open the lesson collection in `backend`.
    #[must_use]
    pub fn new(backend: Rc<dyn KeyValueStore>) -> Self {
        Self {
            collection: Collection::new(backend, LESSONS_KEY),
        }
    }

    /// Append a lesson.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the id is already taken.
    pub fn create(&self, lesson: ScheduledLesson) -> Result<ScheduledLesson> {
        self.collection.create(lesson)
    }

    /// Fetch a lesson by id.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::NotFound`] for an unknown id.
    pub fn get(&self, id: &str) -> Result<ScheduledLesson> {
        self.collection.get(id)
    }

    /// Lessons matching `filter`, in booking order.
    ///
    /// # Errors
    ///
    /// Returns an error if the collection cannot be read.
    pub fn list(&self, filter: impl Fn(&ScheduledLesson) -> bool) -> Result<Vec<ScheduledLesson>> {
        self.collection.list(filter)
    }

    /// Modify a lesson in place. Nothing is written if `patch` fails.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::NotFound`] for an unknown id, or the error from `patch`.
    pub fn update(
        &self,
        id: &str,
        patch: impl FnOnce(&mut ScheduledLesson) -> Result<()>,
    ) -> Result<ScheduledLesson> {
        let updated = self.collection.update(id, patch)?;
        debug!(id, status = %updated.status, "Updated lesson");
        Ok(updated)
    }

    /// Remove a lesson record entirely.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::NotFound`] for an unknown id.
    pub fn delete(&self, id: &str) -> Result<()> {
        self.collection.delete(id)
    }

    /// Non-cancelled lessons of an instructor on a date, by start time.
    ///
    /// # Errors
    ///
    /// Returns an error if the collection cannot be read.
    pub fn active_for(&self, instructor_id: &str, date: NaiveDate) -> Result<Vec<ScheduledLesson>> {
        let mut lessons = self.list(|l| l.blocks(instructor_id, date))?;
        lessons.sort_by_key(|l| l.start_time);
        Ok(lessons)
    }

    /// All lessons of a student, by date then start time.
    ///
    /// # Errors
    ///
    /// Returns an error if the collection cannot be read.
    pub fn for_student(&self, student_id: &str) -> Result<Vec<ScheduledLesson>> {
        let mut lessons = self.list(|l| l.student_id == student_id)?;
        lessons.sort_by_key(|l| (l.date, l.start_time));
        Ok(lessons)
    }

    /// All lessons of an instructor, by date then start time.
    ///
    /// # Errors
    ///
    /// Returns an error if the collection cannot be read.
    pub fn for_instructor(&self, instructor_id: &str) -> Result<Vec<ScheduledLesson>> {
        let mut lessons = self.list(|l| l.instructor_id == instructor_id)?;
        lessons.sort_by_key(|l| (l.date, l.start_time));
        Ok(lessons)
    }
}
