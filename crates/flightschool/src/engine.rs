//! The booking engine.
//!
//! [`BookingEngine`] is the only component that creates lessons or changes
//! their status. It re-checks availability and overlaps against the stored
//! state at commit time, so a slot list shown to a student may be stale
//! without ever letting two lessons share an interval.
//!
//! Mutating operations take `&mut self`: one engine is one writer.

use std::collections::BTreeSet;
use std::rc::Rc;

use chrono::NaiveDate;
use tracing::{info, warn};

use crate::availability::Availability;
use crate::clock::{Clock, SystemClock};
use crate::error::{Error, Result};
use crate::fleet::AircraftRegistry;
use crate::lesson::{LessonStatus, LessonType, ScheduledLesson};
use crate::slots::{generate_slots, TimeSlot};
use crate::storage::{new_id, AvailabilityStore, BookingStore};
use crate::time::TimeRange;

/// A student's request for one lesson.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookingRequest {
    /// The booking student.
    pub student_id: String,
    /// The requested instructor.
    pub instructor_id: String,
    /// Day of the lesson.
    pub date: NaiveDate,
    /// Requested interval, usually a generated slot.
    pub slot: TimeRange,
    /// Flight or ground.
    pub lesson_type: LessonType,
    /// Tail number, flight lessons only.
    pub aircraft: Option<String>,
    /// What the lesson will cover. Must not be empty.
    pub objectives: BTreeSet<String>,
    /// Free-form notes.
    pub notes: String,
}

impl BookingRequest {
    /// A request with no aircraft, objectives or notes yet.
    #[must_use]
    pub fn new(
        student_id: impl Into<String>,
        instructor_id: impl Into<String>,
        date: NaiveDate,
        slot: TimeRange,
        lesson_type: LessonType,
    ) -> Self {
        Self {
            student_id: student_id.into(),
            instructor_id: instructor_id.into(),
            date,
            slot,
            lesson_type,
            aircraft: None,
            objectives: BTreeSet::new(),
            notes: String::new(),
        }
    }

    /// Set the aircraft.
    #[must_use]
    pub fn with_aircraft(mut self, tail_number: impl Into<String>) -> Self {
        self.aircraft = Some(tail_number.into());
        self
    }

    /// Add a lesson objective.
    #[must_use]
    pub fn with_objective(mut self, objective: impl Into<String>) -> Self {
        self.objectives.insert(objective.into());
        self
    }

    /// Set the notes.
    #[must_use]
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = notes.into();
        self
    }
}

/// Creates lessons and drives them through their status machine.
#[derive(Debug)]
pub struct BookingEngine {
    availability: AvailabilityStore,
    bookings: BookingStore,
    aircraft: Box<dyn AircraftRegistry>,
    clock: Rc<dyn Clock>,
}

impl BookingEngine {
    /// Create an engine over the given stores, using the system clock.
    #[must_use]
    pub fn new(
        availability: AvailabilityStore,
        bookings: BookingStore,
        aircraft: Box<dyn AircraftRegistry>,
    ) -> Self {
        Self {
            availability,
            bookings,
            aircraft,
            clock: Rc::new(SystemClock),
        }
    }

    /// Replace the clock, for the engine and its availability store.
    #[must_use]
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        let clock: Rc<dyn Clock> = Rc::new(clock);
        self.availability = self.availability.with_clock(Rc::clone(&clock));
        self.clock = clock;
        self
    }

    /// The availability store.
    #[must_use]
    pub fn availability(&self) -> &AvailabilityStore {
        &self.availability
    }

    /// The lesson store.
    #[must_use]
    pub fn bookings(&self) -> &BookingStore {
        &self.bookings
    }

    /// Current slots of an availability window on `date`.
    ///
    /// Recurring windows are expanded to `date` first.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] for an unknown window, or a validation error
    /// if the window does not apply on `date` or the duration is zero.
    pub fn slots(
        &self,
        availability_id: &str,
        date: NaiveDate,
        slot_duration_minutes: u32,
    ) -> Result<Vec<TimeSlot>> {
        let availability = self.availability.get(availability_id)?;
        let occurrence = availability.occurrence_on(date).ok_or_else(|| {
            Error::validation(
                "date",
                format!("availability '{availability_id}' does not apply on {date}"),
            )
        })?;
        let bookings = self
            .bookings
            .active_for(&occurrence.instructor_id, occurrence.date)?;
        generate_slots(&occurrence, &bookings, slot_duration_minutes)
    }

    /// Book a lesson.
    ///
    /// Checks run in order and the first failure wins: request fields, a
    /// covering availability window, overlap with active lessons, the
    /// aircraft, then objectives. A failed booking writes nothing.
    ///
    /// # Errors
    ///
    /// - [`Error::Validation`] for a malformed request, unknown aircraft, or
    ///   empty objectives.
    /// - [`Error::OutsideAvailability`] if no window of the instructor holds
    ///   the interval on that date.
    /// - [`Error::SlotConflict`] if an active lesson overlaps the interval.
    pub fn book(&mut self, request: BookingRequest) -> Result<ScheduledLesson> {
        let (availability, objectives) = match self.check_booking(&request) {
            Ok(checked) => checked,
            Err(err) => {
                warn!(
                    student = %request.student_id,
                    instructor = %request.instructor_id,
                    date = %request.date,
                    slot = %request.slot,
                    "Booking rejected: {err}"
                );
                return Err(err);
            }
        };
        self.commit(request, &availability, objectives)
    }

    fn check_booking(&self, request: &BookingRequest) -> Result<(Availability, BTreeSet<String>)> {
        if request.student_id.trim().is_empty() {
            return Err(Error::validation("student_id", "must not be empty"));
        }
        if request.instructor_id.trim().is_empty() {
            return Err(Error::validation("instructor_id", "must not be empty"));
        }

        let availability = self
            .availability
            .covering(&request.instructor_id, request.date)?
            .into_iter()
            .find(|a| a.window().contains(&request.slot))
            .ok_or_else(|| Error::OutsideAvailability {
                instructor_id: request.instructor_id.clone(),
                date: request.date,
                requested: request.slot,
            })?;

        if let Some(existing) = self
            .bookings
            .active_for(&request.instructor_id, request.date)?
            .into_iter()
            .find(|lesson| lesson.interval().overlaps(&request.slot))
        {
            return Err(Error::SlotConflict {
                conflicting: existing.interval(),
                booking_id: existing.id,
                requested: request.slot,
            });
        }

        match (request.lesson_type, request.aircraft.as_deref()) {
            (LessonType::Ground, Some(_)) => {
                return Err(Error::validation(
                    "aircraft",
                    "ground lessons do not use an aircraft",
                ));
            }
            (LessonType::Flight, Some(tail)) if !self.aircraft.is_known(tail) => {
                return Err(Error::validation(
                    "aircraft",
                    format!("unknown aircraft '{tail}'"),
                ));
            }
            _ => {}
        }

        let objectives: BTreeSet<String> = request
            .objectives
            .iter()
            .map(|o| o.trim())
            .filter(|o| !o.is_empty())
            .map(str::to_string)
            .collect();
        if objectives.is_empty() {
            return Err(Error::validation(
                "lesson_objectives",
                "at least one objective is required",
            ));
        }

        Ok((availability, objectives))
    }

    fn commit(
        &mut self,
        request: BookingRequest,
        availability: &Availability,
        objectives: BTreeSet<String>,
    ) -> Result<ScheduledLesson> {
        let lesson = ScheduledLesson {
            id: new_id("lesson"),
            student_id: request.student_id,
            instructor_id: request.instructor_id,
            availability_id: availability.id.clone(),
            date: request.date,
            start_time: request.slot.start,
            end_time: request.slot.end,
            lesson_type: request.lesson_type,
            aircraft: request
                .aircraft
                .map(|tail| tail.trim().to_ascii_uppercase()),
            status: LessonStatus::Scheduled,
            lesson_objectives: objectives,
            notes: request.notes,
            scheduled_at: self.clock.now(),
            confirmed_at: None,
            completed_at: None,
            cancelled_at: None,
            cancellation_reason: None,
        };

        let lesson = self.bookings.create(lesson)?;
        info!(
            id = %lesson.id,
            student = %lesson.student_id,
            instructor = %lesson.instructor_id,
            date = %lesson.date,
            slot = %lesson.interval(),
            "Booked lesson"
        );
        Ok(lesson)
    }

    /// Instructor confirmation of a scheduled lesson.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] for an unknown id, or
    /// [`Error::InvalidTransition`] unless the lesson is `scheduled`.
    pub fn confirm(&mut self, lesson_id: &str) -> Result<ScheduledLesson> {
        self.transition(lesson_id, LessonStatus::Confirmed, None)
    }

    /// Mark a confirmed lesson as flown or taught.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] for an unknown id, or
    /// [`Error::InvalidTransition`] unless the lesson is `confirmed`.
    pub fn complete(&mut self, lesson_id: &str) -> Result<ScheduledLesson> {
        self.transition(lesson_id, LessonStatus::Completed, None)
    }

    /// Cancel a lesson, freeing its interval.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] for an unknown id,
    /// [`Error::AlreadyCancelled`] for a cancelled lesson, or
    /// [`Error::InvalidTransition`] for a completed one.
    pub fn cancel(&mut self, lesson_id: &str, reason: Option<String>) -> Result<ScheduledLesson> {
        self.transition(lesson_id, LessonStatus::Cancelled, reason)
    }

    fn transition(
        &mut self,
        lesson_id: &str,
        to: LessonStatus,
        reason: Option<String>,
    ) -> Result<ScheduledLesson> {
        let now = self.clock.now();
        let lesson = self.bookings.update(lesson_id, |lesson| {
            let from = lesson.status;
            if from.is_terminal() {
                let id = lesson.id.clone();
                return Err(if from == LessonStatus::Cancelled && to == LessonStatus::Cancelled {
                    Error::AlreadyCancelled { id }
                } else {
                    Error::InvalidTransition { id, from, to }
                });
            }
            if !from.can_transition_to(to) {
                return Err(Error::InvalidTransition {
                    id: lesson.id.clone(),
                    from,
                    to,
                });
            }

            lesson.status = to;
            match to {
                LessonStatus::Confirmed => lesson.confirmed_at = Some(now),
                LessonStatus::Completed => lesson.completed_at = Some(now),
                LessonStatus::Cancelled => {
                    lesson.cancelled_at = Some(now);
                    lesson.cancellation_reason = reason;
                }
                LessonStatus::Scheduled => {}
            }
            Ok(())
        })?;

        info!(id = %lesson.id, status = %lesson.status, "Lesson status changed");
        Ok(lesson)
    }

    /// A student's non-cancelled lessons on or after `today`, soonest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the lesson store cannot be read.
    pub fn upcoming_for_student(
        &self,
        student_id: &str,
        today: NaiveDate,
    ) -> Result<Vec<ScheduledLesson>> {
        Ok(self
            .bookings
            .for_student(student_id)?
            .into_iter()
            .filter(|lesson| lesson.is_active() && lesson.date >= today)
            .collect())
    }

    /// An instructor's non-cancelled lessons on `date`, by start time.
    ///
    /// # Errors
    ///
    /// Returns an error if the lesson store cannot be read.
    pub fn schedule_for_instructor(
        &self,
        instructor_id: &str,
        date: NaiveDate,
    ) -> Result<Vec<ScheduledLesson>> {
        self.bookings.active_for(instructor_id, date)
    }
}
