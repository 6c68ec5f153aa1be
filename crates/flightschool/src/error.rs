//! Error types for flightschool.
//!
//! Every scheduling operation returns either a value or one of these errors;
//! none of them is fatal to the process. [`Error::kind`] maps each variant
//! onto the coarse categories a front end uses to decide how to react.

use std::path::PathBuf;

use chrono::NaiveDate;
use thiserror::Error;

use crate::lesson::LessonStatus;
use crate::time::TimeRange;

/// Coarse error category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed input; the caller should correct it and retry.
    Validation,
    /// A referenced record does not exist.
    NotFound,
    /// The requested interval is unavailable.
    Conflict,
    /// The lesson status machine forbids the requested change.
    InvalidTransition,
    /// The persistence backend failed.
    Storage,
    /// Configuration could not be loaded or is invalid.
    Configuration,
    /// A bug or an unexpected environment failure.
    Internal,
}

/// The main error type for flightschool operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Scheduling Errors ===
    /// Input failed validation.
    #[error("invalid {field}: {message}")]
    Validation {
        /// The offending field.
        field: &'static str,
        /// Description of the problem.
        message: String,
    },

    /// A referenced record does not exist.
    #[error("{kind} '{id}' not found")]
    NotFound {
        /// Record kind, e.g. `availability`.
        kind: &'static str,
        /// The missing identifier.
        id: String,
    },

    /// No availability window of the instructor covers the requested interval.
    #[error("instructor '{instructor_id}' has no availability covering {requested} on {date}")]
    OutsideAvailability {
        /// Instructor the booking was requested with.
        instructor_id: String,
        /// Requested date.
        date: NaiveDate,
        /// Requested interval.
        requested: TimeRange,
    },

    /// The requested interval overlaps an active booking.
    #[error("{requested} overlaps lesson '{booking_id}' at {conflicting}")]
    SlotConflict {
        /// The booking already holding the interval.
        booking_id: String,
        /// Interval of the existing booking.
        conflicting: TimeRange,
        /// Requested interval.
        requested: TimeRange,
    },

    /// The lesson cannot move between these statuses.
    #[error("lesson '{id}' cannot go from {from} to {to}")]
    InvalidTransition {
        /// Lesson identifier.
        id: String,
        /// Current status.
        from: LessonStatus,
        /// Requested status.
        to: LessonStatus,
    },

    /// The lesson was already cancelled.
    #[error("lesson '{id}' is already cancelled")]
    AlreadyCancelled {
        /// Lesson identifier.
        id: String,
    },

    // === Storage Errors ===
    /// Failed to open or create the database.
    #[error("failed to open database at {path}: {source}")]
    DatabaseOpen {
        /// Path to the database file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: rusqlite::Error,
    },

    /// A database query failed.
    #[error("database query failed: {0}")]
    DatabaseQuery(#[from] rusqlite::Error),

    /// Failed to run database migrations.
    #[error("database migration failed: {message}")]
    DatabaseMigration {
        /// Description of what went wrong.
        message: String,
    },

    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    // === I/O Errors ===
    /// File system operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to create a required directory.
    #[error("failed to create directory {path}: {source}")]
    DirectoryCreate {
        /// Path that couldn't be created.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    // === Serialization Errors ===
    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // === Generic Errors ===
    /// An internal error occurred (bug).
    #[error("internal error: {0}")]
    Internal(String),
}

/// A specialized Result type for flightschool operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create a validation error.
    #[must_use]
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: message.into(),
        }
    }

    /// Create a not-found error.
    #[must_use]
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }

    /// Create a new internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// The category this error belongs to.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation { .. } => ErrorKind::Validation,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::OutsideAvailability { .. } | Self::SlotConflict { .. } => ErrorKind::Conflict,
            Self::InvalidTransition { .. } | Self::AlreadyCancelled { .. } => {
                ErrorKind::InvalidTransition
            }
            Self::DatabaseOpen { .. }
            | Self::DatabaseQuery(_)
            | Self::DatabaseMigration { .. }
            | Self::Json(_) => ErrorKind::Storage,
            Self::ConfigLoad(_) | Self::ConfigValidation { .. } => ErrorKind::Configuration,
            Self::Io(_) | Self::DirectoryCreate { .. } | Self::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Check if this error means the requested interval is unavailable.
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        self.kind() == ErrorKind::Conflict
    }

    /// Check if this error refers to a missing record.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
