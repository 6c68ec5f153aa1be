//! Wall-clock time utilities for scheduling.
//!
//! Availability windows, lessons and slots are all expressed as half-open
//! `[start, end)` intervals of local wall-clock time on a single calendar day.
//! Times are persisted as `"HH:MM"` strings.

use std::fmt;

use chrono::{NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Format used for persisted and displayed times.
pub const TIME_FORMAT: &str = "%H:%M";

/// Number of minutes in a day.
pub const MINUTES_PER_DAY: u32 = 24 * 60;

/// Parse an `HH:MM` wall-clock time.
///
/// # Errors
///
/// Returns a validation error if the string is not a valid `HH:MM` time.
pub fn parse_time(value: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(value.trim(), TIME_FORMAT)
        .map_err(|_| Error::validation("time", format!("expected HH:MM, got '{value}'")))
}

/// Minutes elapsed since midnight.
#[must_use]
pub fn minute_of_day(time: NaiveTime) -> u32 {
    time.hour() * 60 + time.minute()
}

/// Build a time from minutes since midnight, if it falls within the day.
#[must_use]
pub fn time_from_minutes(minutes: u32) -> Option<NaiveTime> {
    if minutes >= MINUTES_PER_DAY {
        return None;
    }
    NaiveTime::from_hms_opt(minutes / 60, minutes % 60, 0)
}

/// A half-open `[start, end)` interval of wall-clock time.
///
/// A range ending exactly where another begins does not overlap it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TimeRange {
    /// Inclusive start.
    #[serde(with = "hhmm")]
    pub start: NaiveTime,
    /// Exclusive end.
    #[serde(with = "hhmm")]
    pub end: NaiveTime,
}

impl TimeRange {
    /// Create a range, rejecting empty or inverted intervals.
    ///
    /// # Errors
    ///
    /// Returns a validation error if `start >= end`.
    pub fn new(start: NaiveTime, end: NaiveTime) -> Result<Self> {
        if start >= end {
            return Err(Error::validation(
                "time_range",
                format!(
                    "start {} must be before end {}",
                    start.format(TIME_FORMAT),
                    end.format(TIME_FORMAT)
                ),
            ));
        }
        Ok(Self { start, end })
    }

    /// Parse an `HH:MM-HH:MM` range.
    ///
    /// # Errors
    ///
    /// Returns a validation error if either bound is malformed or the range is empty.
    pub fn parse(value: &str) -> Result<Self> {
        let (start, end) = value.split_once('-').ok_or_else(|| {
            Error::validation("time_range", format!("expected HH:MM-HH:MM, got '{value}'"))
        })?;
        Self::new(parse_time(start)?, parse_time(end)?)
    }

    /// A range of `minutes` length beginning at `start`.
    ///
    /// # Errors
    ///
    /// Returns a validation error if `minutes` is zero or the range would run past midnight.
    pub fn starting_at(start: NaiveTime, minutes: u32) -> Result<Self> {
        let end = minute_of_day(start)
            .checked_add(minutes)
            .and_then(time_from_minutes)
            .ok_or_else(|| {
                Error::validation(
                    "duration",
                    format!(
                        "{minutes} minutes from {} runs past midnight",
                        start.format(TIME_FORMAT)
                    ),
                )
            })?;
        Self::new(start, end)
    }

    /// Whether the two half-open intervals share any instant.
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Whether `other` lies entirely within this range.
    #[must_use]
    pub fn contains(&self, other: &Self) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    /// Length of the range in minutes.
    #[must_use]
    pub fn duration_minutes(&self) -> u32 {
        minute_of_day(self.end) - minute_of_day(self.start)
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}",
            self.start.format(TIME_FORMAT),
            self.end.format(TIME_FORMAT)
        )
    }
}

/// Serde adapter storing a [`NaiveTime`] as `"HH:MM"`.
pub mod hhmm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    use super::TIME_FORMAT;

    /// Serialize as `HH:MM`.
    ///
    /// # Errors
    ///
    /// Propagates serializer errors.
    pub fn serialize<S>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(&time.format(TIME_FORMAT))
    }

    /// Deserialize from `HH:MM`.
    ///
    /// # Errors
    ///
    /// Fails if the value is not a valid `HH:MM` string.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        NaiveTime::parse_from_str(&raw, TIME_FORMAT).map_err(serde::de::Error::custom)
    }
}
