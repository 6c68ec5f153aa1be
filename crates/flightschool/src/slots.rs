//! Bookable time slots derived from an availability window.
//!
//! Slots are never stored. They are recomputed from the window and the
//! current bookings every time they are needed, so they always reflect the
//! latest cancellations and bookings.

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::availability::Availability;
use crate::error::{Error, Result};
use crate::lesson::ScheduledLesson;
use crate::time::{hhmm, minute_of_day, time_from_minutes, TimeRange};

/// One fixed-length subdivision of an availability window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeSlot {
    /// Inclusive start.
    #[serde(with = "hhmm")]
    pub start: NaiveTime,
    /// Exclusive end.
    #[serde(with = "hhmm")]
    pub end: NaiveTime,
    /// Whether no active booking overlaps the slot.
    pub available: bool,
    /// The first active booking overlapping the slot, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub occupying_booking_id: Option<String>,
}

impl TimeSlot {
    /// The slot's `[start, end)` interval.
    #[must_use]
    pub fn range(&self) -> TimeRange {
        TimeRange {
            start: self.start,
            end: self.end,
        }
    }
}

/// Split `availability` into consecutive slots of `slot_duration_minutes`.
///
/// Slots start at the window start and tile it front to back. A trailing
/// remainder shorter than the duration is dropped. A slot is unavailable when
/// any non-cancelled booking of the same instructor on the same date overlaps
/// it; bookings of other instructors or days are ignored.
///
/// # Errors
///
/// Returns a validation error if the duration is zero or the window is empty.
///
/// # Examples
///
/// ```
/// use chrono::Utc;
/// use flightschool::availability::NewAvailability;
/// use flightschool::slots::generate_slots;
/// use flightschool::time::TimeRange;
///
/// let window = TimeRange::parse("09:00-11:30").unwrap();
/// let availability = NewAvailability::new("I1", "2024-01-15".parse().unwrap(), window)
///     .into_availability("avail-1".to_string(), Utc::now());
///
/// let slots = generate_slots(&availability, &[], 60).unwrap();
/// assert_eq!(slots.len(), 2);
/// assert!(slots.iter().all(|slot| slot.available));
/// ```
pub fn generate_slots(
    availability: &Availability,
    existing_bookings: &[ScheduledLesson],
    slot_duration_minutes: u32,
) -> Result<Vec<TimeSlot>> {
    if slot_duration_minutes == 0 {
        return Err(Error::validation(
            "slot_duration_minutes",
            "must be greater than 0",
        ));
    }
    let window = TimeRange::new(availability.start_time, availability.end_time)?;

    let blocking: Vec<&ScheduledLesson> = existing_bookings
        .iter()
        .filter(|booking| booking.blocks(&availability.instructor_id, availability.date))
        .collect();

    let window_end = minute_of_day(window.end);
    let mut slot_start = minute_of_day(window.start);
    let mut slots = Vec::new();

    while let Some(slot_end) = slot_start
        .checked_add(slot_duration_minutes)
        .filter(|end| *end <= window_end)
    {
        let (Some(start), Some(end)) = (time_from_minutes(slot_start), time_from_minutes(slot_end))
        else {
            break;
        };
        let range = TimeRange { start, end };
        let occupying = blocking
            .iter()
            .find(|booking| booking.interval().overlaps(&range));

        slots.push(TimeSlot {
            start,
            end,
            available: occupying.is_none(),
            occupying_booking_id: occupying.map(|booking| booking.id.clone()),
        });
        slot_start = slot_end;
    }

    debug!(
        availability = %availability.id,
        date = %availability.date,
        total = slots.len(),
        free = slots.iter().filter(|slot| slot.available).count(),
        "Generated slots"
    );
    Ok(slots)
}
