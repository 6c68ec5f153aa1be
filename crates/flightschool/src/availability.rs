//! Instructor availability windows.
//!
//! An availability window is an interval on one calendar day during which an
//! instructor accepts lessons. Recurring windows repeat every week or every
//! other week from their first date onward.

use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::storage::Record;
use crate::time::{hhmm, TimeRange};

/// How a recurring window repeats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recurrence {
    /// Every 7 days.
    Weekly,
    /// Every 14 days.
    Biweekly,
}

impl Recurrence {
    /// Days between occurrences.
    #[must_use]
    pub fn period_days(self) -> i64 {
        match self {
            Self::Weekly => 7,
            Self::Biweekly => 14,
        }
    }
}

impl fmt::Display for Recurrence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Weekly => write!(f, "weekly"),
            Self::Biweekly => write!(f, "biweekly"),
        }
    }
}

/// A window during which an instructor can be booked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Availability {
    /// Unique identifier.
    pub id: String,
    /// Owning instructor.
    pub instructor_id: String,
    /// First (or only) day of the window.
    pub date: NaiveDate,
    /// Inclusive start time.
    #[serde(with = "hhmm")]
    pub start_time: NaiveTime,
    /// Exclusive end time.
    #[serde(with = "hhmm")]
    pub end_time: NaiveTime,
    /// Whether the window repeats.
    #[serde(default)]
    pub is_recurring: bool,
    /// Repeat pattern, present only when recurring.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurrence_pattern: Option<Recurrence>,
    /// Declared capacity.
    pub max_students: u32,
    /// Free-form notes.
    #[serde(default)]
    pub notes: String,
    /// When the window was created.
    pub created_at: DateTime<Utc>,
}

impl Availability {
    /// The `[start, end)` interval of the window.
    #[must_use]
    pub fn window(&self) -> TimeRange {
        TimeRange {
            start: self.start_time,
            end: self.end_time,
        }
    }

    /// The recurrence, if the window repeats.
    #[must_use]
    pub fn recurrence(&self) -> Option<Recurrence> {
        if self.is_recurring {
            self.recurrence_pattern
        } else {
            None
        }
    }

    /// Check the record invariants.
    ///
    /// # Errors
    ///
    /// Returns a validation error describing the first violated invariant.
    pub fn validate(&self, max_students_limit: u32) -> Result<()> {
        if self.instructor_id.trim().is_empty() {
            return Err(Error::validation("instructor_id", "must not be empty"));
        }
        TimeRange::new(self.start_time, self.end_time)?;
        if self.max_students == 0 || self.max_students > max_students_limit {
            return Err(Error::validation(
                "max_students",
                format!(
                    "must be between 1 and {max_students_limit}, got {}",
                    self.max_students
                ),
            ));
        }
        match (self.is_recurring, self.recurrence_pattern) {
            (true, None) => Err(Error::validation(
                "recurrence_pattern",
                "recurring availability needs a pattern",
            )),
            (false, Some(_)) => Err(Error::validation(
                "recurrence_pattern",
                "pattern given for a one-off availability",
            )),
            _ => Ok(()),
        }
    }

    /// Whether this window applies on `date`.
    #[must_use]
    pub fn covers(&self, date: NaiveDate) -> bool {
        if date == self.date {
            return true;
        }
        match self.recurrence() {
            Some(recurrence) if date > self.date => {
                (date - self.date).num_days() % recurrence.period_days() == 0
            }
            _ => false,
        }
    }

    /// This window re-dated to `date`, if it applies on that day.
    #[must_use]
    pub fn occurrence_on(&self, date: NaiveDate) -> Option<Self> {
        self.covers(date).then(|| Self {
            date,
            ..self.clone()
        })
    }

    /// Days in `[from, until]` on which this window applies.
    #[must_use]
    pub fn occurrences_between(&self, from: NaiveDate, until: NaiveDate) -> Vec<NaiveDate> {
        let Some(recurrence) = self.recurrence() else {
            return if from <= self.date && self.date <= until {
                vec![self.date]
            } else {
                Vec::new()
            };
        };

        let period = recurrence.period_days();
        let first = if from <= self.date {
            self.date
        } else {
            let behind = (from - self.date).num_days();
            let steps = (behind + period - 1) / period;
            self.date + chrono::Duration::days(steps * period)
        };

        let mut dates = Vec::new();
        let mut current = first;
        while current <= until {
            dates.push(current);
            current += chrono::Duration::days(period);
        }
        dates
    }
}

impl Record for Availability {
    const KIND: &'static str = "availability";

    fn id(&self) -> &str {
        &self.id
    }
}

/// Input for creating an availability window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAvailability {
    /// Owning instructor.
    pub instructor_id: String,
    /// First (or only) day.
    pub date: NaiveDate,
    /// Bookable interval.
    pub window: TimeRange,
    /// Repeat pattern, if any.
    pub recurrence: Option<Recurrence>,
    /// Declared capacity.
    pub max_students: u32,
    /// Free-form notes.
    pub notes: String,
}

impl NewAvailability {
    /// A one-off single-student window with no notes.
    #[must_use]
    pub fn new(instructor_id: impl Into<String>, date: NaiveDate, window: TimeRange) -> Self {
        Self {
            instructor_id: instructor_id.into(),
            date,
            window,
            recurrence: None,
            max_students: 1,
            notes: String::new(),
        }
    }

    /// Build the stored record.
    #[must_use]
    pub fn into_availability(self, id: String, created_at: DateTime<Utc>) -> Availability {
        Availability {
            id,
            instructor_id: self.instructor_id,
            date: self.date,
            start_time: self.window.start,
            end_time: self.window.end,
            is_recurring: self.recurrence.is_some(),
            recurrence_pattern: self.recurrence,
            max_students: self.max_students,
            notes: self.notes,
            created_at,
        }
    }
}

/// Partial update of an availability window. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AvailabilityPatch {
    /// New date.
    pub date: Option<NaiveDate>,
    /// New interval.
    pub window: Option<TimeRange>,
    /// New recurrence; `Some(None)` makes the window one-off.
    pub recurrence: Option<Option<Recurrence>>,
    /// New capacity.
    pub max_students: Option<u32>,
    /// New notes.
    pub notes: Option<String>,
}

impl AvailabilityPatch {
    /// Whether the patch changes nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Apply the patch in place.
    pub fn apply(self, availability: &mut Availability) {
        if let Some(date) = self.date {
            availability.date = date;
        }
        if let Some(window) = self.window {
            availability.start_time = window.start;
            availability.end_time = window.end;
        }
        if let Some(recurrence) = self.recurrence {
            availability.is_recurring = recurrence.is_some();
            availability.recurrence_pattern = recurrence;
        }
        if let Some(max_students) = self.max_students {
            availability.max_students = max_students;
        }
        if let Some(notes) = self.notes {
            availability.notes = notes;
        }
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    /// A one-off single-student window for tests.
    pub(crate) fn availability(id: &str, instructor_id: &str, date: &str, range: &str) -> Availability {
        NewAvailability::new(
            instructor_id,
            date.parse().unwrap(),
            TimeRange::parse(range).unwrap(),
        )
        .into_availability(id.to_string(), Utc::now())
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::availability;
    use super::*;

    fn day(value: &str) -> NaiveDate {
        value.parse().unwrap()
    }

    #[test]
    fn test_validate_ok() {
        let a = availability("a1", "I1", "2024-01-15", "09:00-11:00");
        assert!(a.validate(4).is_ok());
    }

    #[test]
    fn test_validate_inverted_window() {
        let mut a = availability("a1", "I1", "2024-01-15", "09:00-11:00");
        a.end_time = a.start_time;
        let err = a.validate(4).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Validation);
    }

    #[test]
    fn test_validate_capacity_bounds() {
        let mut a = availability("a1", "I1", "2024-01-15", "09:00-11:00");
        a.max_students = 0;
        assert!(a.validate(4).is_err());
        a.max_students = 5;
        assert!(a.validate(4).unwrap_err().to_string().contains("max_students"));
        a.max_students = 4;
        assert!(a.validate(4).is_ok());
    }

    #[test]
    fn test_validate_recurrence_consistency() {
        let mut a = availability("a1", "I1", "2024-01-15", "09:00-11:00");
        a.is_recurring = true;
        assert!(a.validate(4).is_err());
        a.recurrence_pattern = Some(Recurrence::Weekly);
        assert!(a.validate(4).is_ok());
        a.is_recurring = false;
        assert!(a.validate(4).is_err());
    }

    #[test]
    fn test_one_off_covers_only_its_date() {
        let a = availability("a1", "I1", "2024-01-15", "09:00-11:00");
        assert!(a.covers(day("2024-01-15")));
        assert!(!a.covers(day("2024-01-22")));
        assert!(!a.covers(day("2024-01-08")));
    }

    #[test]
    fn test_weekly_covers_following_weeks() {
        let mut a = availability("a1", "I1", "2024-01-15", "09:00-11:00");
        a.is_recurring = true;
        a.recurrence_pattern = Some(Recurrence::Weekly);

        assert!(a.covers(day("2024-01-22")));
        assert!(a.covers(day("2024-02-05")));
        assert!(!a.covers(day("2024-01-16")));
        assert!(!a.covers(day("2024-01-08")));
    }

    #[test]
    fn test_biweekly_skips_alternate_weeks() {
        let mut a = availability("a1", "I1", "2024-01-15", "09:00-11:00");
        a.is_recurring = true;
        a.recurrence_pattern = Some(Recurrence::Biweekly);

        assert!(!a.covers(day("2024-01-22")));
        assert!(a.covers(day("2024-01-29")));
    }

    #[test]
    fn test_occurrence_on_redates() {
        let mut a = availability("a1", "I1", "2024-01-15", "09:00-11:00");
        a.is_recurring = true;
        a.recurrence_pattern = Some(Recurrence::Weekly);

        let occurrence = a.occurrence_on(day("2024-01-29")).unwrap();
        assert_eq!(occurrence.date, day("2024-01-29"));
        assert_eq!(occurrence.id, "a1");
        assert_eq!(occurrence.window(), a.window());
        assert!(a.occurrence_on(day("2024-01-30")).is_none());
    }

    #[test]
    fn test_occurrences_between() {
        let mut a = availability("a1", "I1", "2024-01-15", "09:00-11:00");
        assert_eq!(
            a.occurrences_between(day("2024-01-01"), day("2024-01-31")),
            vec![day("2024-01-15")]
        );
        assert!(a
            .occurrences_between(day("2024-01-16"), day("2024-01-31"))
            .is_empty());

        a.is_recurring = true;
        a.recurrence_pattern = Some(Recurrence::Weekly);
        assert_eq!(
            a.occurrences_between(day("2024-01-17"), day("2024-02-05")),
            vec![day("2024-01-22"), day("2024-01-29"), day("2024-02-05")]
        );
    }

    #[test]
    fn test_patch_apply() {
        let mut a = availability("a1", "I1", "2024-01-15", "09:00-11:00");
        let patch = AvailabilityPatch {
            window: Some(TimeRange::parse("10:00-12:00").unwrap()),
            recurrence: Some(Some(Recurrence::Biweekly)),
            notes: Some("Checkride prep only".to_string()),
            ..AvailabilityPatch::default()
        };
        assert!(!patch.is_empty());
        patch.apply(&mut a);

        assert_eq!(a.window(), TimeRange::parse("10:00-12:00").unwrap());
        assert!(a.is_recurring);
        assert_eq!(a.recurrence_pattern, Some(Recurrence::Biweekly));
        assert_eq!(a.notes, "Checkride prep only");
        assert_eq!(a.date, day("2024-01-15"));
    }

    #[test]
    fn test_serialization_uses_source_field_names() {
        let a = availability("a1", "I1", "2024-01-15", "09:00-11:00");
        let json = serde_json::to_value(&a).unwrap();
        assert_eq!(json["startTime"], "09:00");
        assert_eq!(json["maxStudents"], 1);
        assert_eq!(json["isRecurring"], false);
        assert!(json.get("recurrencePattern").is_none());
    }
}
