//! Persistent store of instructor availability windows.

use std::rc::Rc;

use chrono::NaiveDate;
use tracing::{debug, info};

use crate::availability::{Availability, AvailabilityPatch, NewAvailability};
use crate::clock::{Clock, SystemClock};
use crate::error::{Error, Result};

use super::{new_id, Collection, KeyValueStore, AVAILABILITY_KEY};

/// Availability windows, validated on every write.
#[derive(Debug)]
pub struct AvailabilityStore {
    collection: Collection<Availability>,
    max_students_limit: u32,
    clock: Rc<dyn Clock>,
}

impl AvailabilityStore {
    /// Open the availability collection in `backend`.
    ///
    /// `max_students_limit` caps the capacity a window may declare.
    #[must_use]
    pub fn new(backend: Rc<dyn KeyValueStore>, max_students_limit: u32) -> Self {
        Self {
            collection: Collection::new(backend, AVAILABILITY_KEY),
            max_students_limit,
            clock: Rc::new(SystemClock),
        }
    }

    /// Stamp `createdAt` from `clock` instead of the system clock.
    #[must_use]
    pub fn with_clock(mut self, clock: Rc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Create a new window.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the window is malformed.
    pub fn create(&self, new: NewAvailability) -> Result<Availability> {
        let availability = new.into_availability(new_id("avail"), self.clock.now());
        availability.validate(self.max_students_limit)?;
        let created = self.collection.create(availability)?;
        info!(
            id = %created.id,
            instructor = %created.instructor_id,
            date = %created.date,
            window = %created.window(),
            "Created availability"
        );
        Ok(created)
    }

    /// Apply a partial update and re-validate the result.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] for an unknown id, or a validation error if
    /// the patch is empty or the patched window is malformed.
    pub fn update(&self, id: &str, patch: AvailabilityPatch) -> Result<Availability> {
        if patch.is_empty() {
            return Err(Error::validation("patch", "nothing to update"));
        }
        let limit = self.max_students_limit;
        let updated = self.collection.update(id, |availability| {
            patch.apply(availability);
            availability.validate(limit)
        })?;
        debug!(id = %updated.id, "Updated availability");
        Ok(updated)
    }

    /// Delete a window. Lessons already booked against it are left alone.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] for an unknown id.
    pub fn delete(&self, id: &str) -> Result<()> {
        self.collection.delete(id)?;
        info!(id, "Deleted availability");
        Ok(())
    }

    /// Fetch a window by id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] for an unknown id.
    pub fn get(&self, id: &str) -> Result<Availability> {
        self.collection.get(id)
    }

    /// Windows matching `filter`, in creation order.
    ///
    /// # Errors
    ///
    /// Returns an error if the collection cannot be read.
    pub fn list(&self, filter: impl Fn(&Availability) -> bool) -> Result<Vec<Availability>> {
        self.collection.list(filter)
    }

    /// All windows of an instructor, by date then start time.
    ///
    /// # Errors
    ///
    /// Returns an error if the collection cannot be read.
    pub fn for_instructor(&self, instructor_id: &str) -> Result<Vec<Availability>> {
        let mut windows = self.list(|a| a.instructor_id == instructor_id)?;
        windows.sort_by_key(|a| (a.date, a.start_time));
        Ok(windows)
    }

    /// The instructor's windows that apply on `date`, re-dated to `date` and
    /// sorted by start time. Recurring windows contribute their occurrence.
    ///
    /// # Errors
    ///
    /// Returns an error if the collection cannot be read.
    pub fn covering(&self, instructor_id: &str, date: NaiveDate) -> Result<Vec<Availability>> {
        let mut windows: Vec<Availability> = self
            .list(|a| a.instructor_id == instructor_id)?
            .iter()
            .filter_map(|a| a.occurrence_on(date))
            .collect();
        windows.sort_by_key(|a| a.start_time);
        Ok(windows)
    }

    /// Every occurrence in `[from, until]`, re-dated, by date then start time.
    ///
    /// Restricted to one instructor when `instructor_id` is given.
    ///
    /// # Errors
    ///
    /// Returns an error if the collection cannot be read.
    pub fn occurring_between(
        &self,
        instructor_id: Option<&str>,
        from: NaiveDate,
        until: NaiveDate,
    ) -> Result<Vec<Availability>> {
        let mut windows: Vec<Availability> = self
            .list(|a| instructor_id.map_or(true, |id| a.instructor_id == id))?
            .into_iter()
            .flat_map(|a| {
                a.occurrences_between(from, until)
                    .into_iter()
                    .map(move |date| Availability { date, ..a.clone() })
            })
            .collect();
        windows.sort_by(|a, b| {
            (a.date, a.start_time, &a.instructor_id).cmp(&(b.date, b.start_time, &b.instructor_id))
        });
        Ok(windows)
    }

    /// Duplicate a window onto another date under a fresh id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the source window does not exist.
    pub fn copy_to(&self, id: &str, date: NaiveDate) -> Result<Availability> {
        let source = self.get(id)?;
        let copy = Availability {
            id: new_id("avail"),
            date,
            created_at: self.clock.now(),
            ..source
        };
        copy.validate(self.max_students_limit)?;
        let created = self.collection.create(copy)?;
        info!(from = id, id = %created.id, date = %date, "Copied availability");
        Ok(created)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::availability::Recurrence;
    use crate::clock::FixedClock;
    use crate::storage::MemoryStore;
    use crate::time::TimeRange;
    use crate::ErrorKind;

    fn create_test_store() -> AvailabilityStore {
        AvailabilityStore::new(Rc::new(MemoryStore::new()), 4)
    }

    fn day(value: &str) -> NaiveDate {
        value.parse().unwrap()
    }

    fn window(instructor: &str, date: &str, range: &str) -> NewAvailability {
        NewAvailability::new(instructor, day(date), TimeRange::parse(range).unwrap())
    }

    #[test]
    fn test_create_and_get() {
        let store = create_test_store();
        let created = store.create(window("I1", "2024-01-15", "09:00-11:00")).unwrap();

        assert!(created.id.starts_with("avail-"));
        assert_eq!(store.get(&created.id).unwrap(), created);
    }

    #[test]
    fn test_create_rejects_excess_capacity() {
        let store = create_test_store();
        let mut new = window("I1", "2024-01-15", "09:00-11:00");
        new.max_students = 9;

        let err = store.create(new).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(store.list(|_| true).unwrap().is_empty());
    }

    #[test]
    fn test_update_revalidates() {
        let store = create_test_store();
        let created = store.create(window("I1", "2024-01-15", "09:00-11:00")).unwrap();

        let bad = AvailabilityPatch {
            max_students: Some(0),
            ..AvailabilityPatch::default()
        };
        assert!(store.update(&created.id, bad).is_err());
        assert_eq!(store.get(&created.id).unwrap().max_students, 1);

        let good = AvailabilityPatch {
            window: Some(TimeRange::parse("08:00-12:00").unwrap()),
            ..AvailabilityPatch::default()
        };
        let updated = store.update(&created.id, good).unwrap();
        assert_eq!(updated.window().to_string(), "08:00-12:00");
    }

    #[test]
    fn test_update_empty_patch() {
        let store = create_test_store();
        let created = store.create(window("I1", "2024-01-15", "09:00-11:00")).unwrap();
        let err = store
            .update(&created.id, AvailabilityPatch::default())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_update_and_delete_missing() {
        let store = create_test_store();
        let patch = AvailabilityPatch {
            notes: Some("x".to_string()),
            ..AvailabilityPatch::default()
        };
        assert!(store.update("nope", patch).unwrap_err().is_not_found());
        assert!(store.delete("nope").unwrap_err().is_not_found());
    }

    #[test]
    fn test_delete() {
        let store = create_test_store();
        let created = store.create(window("I1", "2024-01-15", "09:00-11:00")).unwrap();
        store.delete(&created.id).unwrap();
        assert!(store.get(&created.id).unwrap_err().is_not_found());
    }

    #[test]
    fn test_for_instructor_sorted() {
        let store = create_test_store();
        store.create(window("I1", "2024-01-16", "09:00-11:00")).unwrap();
        store.create(window("I2", "2024-01-15", "09:00-11:00")).unwrap();
        store.create(window("I1", "2024-01-15", "13:00-15:00")).unwrap();
        store.create(window("I1", "2024-01-15", "08:00-10:00")).unwrap();

        let starts: Vec<String> = store
            .for_instructor("I1")
            .unwrap()
            .iter()
            .map(|a| format!("{} {}", a.date, a.window()))
            .collect();
        assert_eq!(
            starts,
            vec![
                "2024-01-15 08:00-10:00",
                "2024-01-15 13:00-15:00",
                "2024-01-16 09:00-11:00",
            ]
        );
    }

    #[test]
    fn test_covering_includes_recurring_occurrences() {
        let store = create_test_store();
        let mut weekly = window("I1", "2024-01-01", "14:00-16:00");
        weekly.recurrence = Some(Recurrence::Weekly);
        let weekly = store.create(weekly).unwrap();
        store.create(window("I1", "2024-01-15", "09:00-11:00")).unwrap();
        store.create(window("I2", "2024-01-15", "09:00-11:00")).unwrap();

        let covering = store.covering("I1", day("2024-01-15")).unwrap();
        assert_eq!(covering.len(), 2);
        assert_eq!(covering[0].window().to_string(), "09:00-11:00");
        assert_eq!(covering[1].id, weekly.id);
        assert!(covering.iter().all(|a| a.date == day("2024-01-15")));

        assert!(store.covering("I1", day("2024-01-16")).unwrap().is_empty());
    }

    #[test]
    fn test_occurring_between_expands_recurrence() {
        let store = create_test_store();
        let mut biweekly = window("I1", "2024-01-01", "14:00-16:00");
        biweekly.recurrence = Some(Recurrence::Biweekly);
        store.create(biweekly).unwrap();
        store.create(window("I1", "2024-01-16", "09:00-11:00")).unwrap();
        store.create(window("I2", "2024-01-15", "09:00-11:00")).unwrap();
        store.create(window("I1", "2024-02-01", "09:00-11:00")).unwrap();

        let listed: Vec<String> = store
            .occurring_between(Some("I1"), day("2024-01-10"), day("2024-01-31"))
            .unwrap()
            .iter()
            .map(|a| format!("{} {}", a.date, a.window()))
            .collect();
        assert_eq!(
            listed,
            vec![
                "2024-01-15 14:00-16:00",
                "2024-01-16 09:00-11:00",
                "2024-01-29 14:00-16:00",
            ]
        );

        let everyone = store
            .occurring_between(None, day("2024-01-15"), day("2024-01-15"))
            .unwrap();
        assert_eq!(everyone.len(), 2);
        assert_eq!(everyone[0].instructor_id, "I2");
        assert!(store
            .occurring_between(None, day("2024-01-31"), day("2024-01-10"))
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_copy_to() {
        let store = create_test_store();
        let mut new = window("I1", "2024-01-15", "09:00-11:00");
        new.notes = "Bring headset".to_string();
        let original = store.create(new).unwrap();

        let copy = store.copy_to(&original.id, day("2024-01-20")).unwrap();
        assert_ne!(copy.id, original.id);
        assert_eq!(copy.date, day("2024-01-20"));
        assert_eq!(copy.window(), original.window());
        assert_eq!(copy.notes, "Bring headset");
        assert_eq!(store.list(|_| true).unwrap().len(), 2);
    }

    #[test]
    fn test_created_at_comes_from_clock() {
        let created_at = Utc.with_ymd_and_hms(2024, 1, 10, 8, 30, 0).unwrap();
        let store = create_test_store().with_clock(Rc::new(FixedClock::new(created_at)));

        let original = store.create(window("I1", "2024-01-15", "09:00-11:00")).unwrap();
        let copy = store.copy_to(&original.id, day("2024-01-22")).unwrap();
        assert_eq!(original.created_at, created_at);
        assert_eq!(copy.created_at, created_at);
    }

    #[test]
    fn test_copy_missing() {
        let store = create_test_store();
        assert!(store
            .copy_to("nope", day("2024-01-20"))
            .unwrap_err()
            .is_not_found());
    }
}
