//! `flightschool` - lesson scheduling for flight training schools
//!
//! Instructors publish availability windows, students book lessons carved out
//! of them, and the booking engine guarantees that no two active lessons of an
//! instructor overlap. Slots are derived on demand and never stored.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod availability;
pub mod cli;
pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod fleet;
pub mod identity;
pub mod lesson;
pub mod logging;
pub mod slots;
pub mod storage;
pub mod time;

pub use availability::{Availability, AvailabilityPatch, NewAvailability, Recurrence};
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::Config;
pub use engine::{BookingEngine, BookingRequest};
pub use error::{Error, ErrorKind, Result};
pub use fleet::{AircraftRegistry, Fleet};
pub use identity::{CurrentUser, IdentityProvider, Role, StaticIdentity};
pub use lesson::{LessonStatus, LessonType, ScheduledLesson};
pub use logging::init_logging;
pub use slots::{generate_slots, TimeSlot};
pub use storage::{AvailabilityStore, BookingStore, KeyValueStore, MemoryStore, SqliteStore};
pub use time::TimeRange;
