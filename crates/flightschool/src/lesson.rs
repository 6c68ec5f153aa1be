//! Scheduled lesson records and their status machine.
//!
//! A lesson moves `scheduled -> confirmed -> completed`. It can be cancelled
//! from `scheduled` or `confirmed`. `completed` and `cancelled` are terminal:
//! rescheduling means booking a new lesson.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::storage::Record;
use crate::time::{hhmm, TimeRange};

/// Kind of lesson being booked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LessonType {
    /// In the aircraft.
    Flight,
    /// Classroom or briefing.
    Ground,
}

impl fmt::Display for LessonType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Flight => write!(f, "flight"),
            Self::Ground => write!(f, "ground"),
        }
    }
}

/// Lifecycle status of a scheduled lesson.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LessonStatus {
    /// Booked by the student, awaiting instructor confirmation.
    Scheduled,
    /// Confirmed by the instructor.
    Confirmed,
    /// Flown or taught.
    Completed,
    /// Cancelled by either party.
    Cancelled,
}

impl LessonStatus {
    /// Whether the status machine allows moving from `self` to `next`.
    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Scheduled, Self::Confirmed | Self::Cancelled)
                | (Self::Confirmed, Self::Completed | Self::Cancelled)
        )
    }

    /// Whether no further transition is possible.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    /// Whether the lesson still holds its time interval.
    #[must_use]
    pub fn is_active(self) -> bool {
        self != Self::Cancelled
    }
}

impl fmt::Display for LessonStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scheduled => write!(f, "scheduled"),
            Self::Confirmed => write!(f, "confirmed"),
            Self::Completed => write!(f, "completed"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// A booked lesson carved out of an instructor's availability window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledLesson {
    /// Unique identifier.
    pub id: String,
    /// The booking student.
    pub student_id: String,
    /// The teaching instructor.
    pub instructor_id: String,
    /// The availability window the lesson was booked against.
    pub availability_id: String,
    /// Calendar day of the lesson.
    pub date: NaiveDate,
    /// Inclusive start time.
    #[serde(with = "hhmm")]
    pub start_time: NaiveTime,
    /// Exclusive end time.
    #[serde(with = "hhmm")]
    pub end_time: NaiveTime,
    /// Flight or ground lesson.
    #[serde(rename = "type")]
    pub lesson_type: LessonType,
    /// Tail number, flight lessons only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aircraft: Option<String>,
    /// Current status.
    pub status: LessonStatus,
    /// What the lesson will cover.
    pub lesson_objectives: BTreeSet<String>,
    /// Free-form notes from the student.
    #[serde(default)]
    pub notes: String,
    /// When the booking was made.
    pub scheduled_at: DateTime<Utc>,
    /// When the instructor confirmed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confirmed_at: Option<DateTime<Utc>>,
    /// When the lesson was marked complete.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    /// When the lesson was cancelled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancelled_at: Option<DateTime<Utc>>,
    /// Why the lesson was cancelled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancellation_reason: Option<String>,
}

impl ScheduledLesson {
    /// The `[start, end)` interval the lesson occupies.
    #[must_use]
    pub fn interval(&self) -> TimeRange {
        TimeRange {
            start: self.start_time,
            end: self.end_time,
        }
    }

    /// Whether the lesson still holds its interval.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }

    /// Whether this is an active lesson of `instructor_id` on `date`.
    #[must_use]
    pub fn blocks(&self, instructor_id: &str, date: NaiveDate) -> bool {
        self.is_active() && self.instructor_id == instructor_id && self.date == date
    }
}

impl Record for ScheduledLesson {
    const KIND: &'static str = "lesson";

    fn id(&self) -> &str {
        &self.id
    }
}
