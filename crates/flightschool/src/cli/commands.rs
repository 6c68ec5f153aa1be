//! CLI command definitions.
//!
//! This module defines the structure of all CLI subcommands.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Subcommand, ValueEnum};

use crate::availability::Recurrence;
use crate::error::Result;
use crate::lesson::LessonType;
use crate::time::{parse_time, TimeRange};

/// Availability window commands.
#[derive(Debug, Subcommand)]
pub enum AvailabilityCommand {
    /// Publish a new availability window
    Add {
        /// Day of the window (YYYY-MM-DD)
        date: NaiveDate,

        /// Bookable interval, e.g. 09:00-17:00
        window: String,

        /// Instructor id (defaults to the configured instructor)
        #[arg(short, long)]
        instructor: Option<String>,

        /// Repeat the window
        #[arg(short, long, value_enum)]
        recurrence: Option<RecurrenceArg>,

        /// Declared capacity
        #[arg(short, long, default_value = "1")]
        max_students: u32,

        /// Free-form notes
        #[arg(short, long, default_value = "")]
        notes: String,

        /// Output format
        #[arg(short, long, value_enum, default_value = "plain")]
        format: OutputFormat,
    },

    /// List availability windows
    List {
        /// Only this instructor's windows
        #[arg(short, long)]
        instructor: Option<String>,

        /// Only windows that apply on this day, recurring ones included
        #[arg(short, long)]
        date: Option<NaiveDate>,

        /// With --date, list every occurrence from that day through this one
        #[arg(short, long, requires = "date")]
        until: Option<NaiveDate>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "plain")]
        format: OutputFormat,
    },

    /// Change an availability window
    Edit {
        /// Window id
        id: String,

        /// New day
        #[arg(short, long)]
        date: Option<NaiveDate>,

        /// New interval, e.g. 10:00-12:00
        #[arg(short, long)]
        window: Option<String>,

        /// New repeat pattern
        #[arg(short, long, value_enum, conflicts_with = "one_off")]
        recurrence: Option<RecurrenceArg>,

        /// Stop repeating
        #[arg(long)]
        one_off: bool,

        /// New capacity
        #[arg(short, long)]
        max_students: Option<u32>,

        /// New notes
        #[arg(short, long)]
        notes: Option<String>,
    },

    /// Duplicate a window onto another day
    Copy {
        /// Window id
        id: String,

        /// Target day
        date: NaiveDate,
    },

    /// Delete an availability window
    Delete {
        /// Window id
        id: String,
    },
}

/// Slots command arguments.
#[derive(Debug, Args)]
pub struct SlotsCommand {
    /// Availability window id
    pub availability_id: String,

    /// Day to show (YYYY-MM-DD)
    pub date: NaiveDate,

    /// Slot length in minutes (defaults to the configured duration)
    #[arg(short, long)]
    pub duration: Option<u32>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "plain")]
    pub format: OutputFormat,
}

/// Book command arguments.
#[derive(Debug, Args)]
pub struct BookCommand {
    /// Day of the lesson (YYYY-MM-DD)
    pub date: NaiveDate,

    /// Interval (09:00-11:00) or start time (09:00) with the configured duration
    pub slot: String,

    /// Instructor id
    #[arg(short, long)]
    pub instructor: String,

    /// Student id (defaults to the configured student)
    #[arg(short, long)]
    pub student: Option<String>,

    /// Lesson type
    #[arg(short = 't', long = "type", value_enum, default_value = "flight")]
    pub lesson_type: LessonTypeArg,

    /// Aircraft tail number (flight lessons only)
    #[arg(short, long)]
    pub aircraft: Option<String>,

    /// Lesson objective (repeatable)
    #[arg(short, long = "objective", required = true)]
    pub objectives: Vec<String>,

    /// Free-form notes
    #[arg(short, long, default_value = "")]
    pub notes: String,

    /// Output format
    #[arg(short, long, value_enum, default_value = "plain")]
    pub format: OutputFormat,
}

impl BookCommand {
    /// The requested interval. A bare start time lasts `default_minutes`.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the slot is malformed.
    pub fn interval(&self, default_minutes: u32) -> Result<TimeRange> {
        if self.slot.contains('-') {
            TimeRange::parse(&self.slot)
        } else {
            TimeRange::starting_at(parse_time(&self.slot)?, default_minutes)
        }
    }
}

/// Lessons command arguments.
#[derive(Debug, Args)]
pub struct LessonsCommand {
    /// Only this student's lessons (defaults to the configured student)
    #[arg(short, long, conflicts_with = "instructor")]
    pub student: Option<String>,

    /// Only this instructor's lessons
    #[arg(short, long)]
    pub instructor: Option<String>,

    /// Only lessons on this day
    #[arg(short, long)]
    pub date: Option<NaiveDate>,

    /// Only non-cancelled lessons from today on
    #[arg(short, long)]
    pub upcoming: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value = "plain")]
    pub format: OutputFormat,
}

/// Status command arguments.
#[derive(Debug, Args)]
pub struct StatusCommand {
    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the configuration file path
    Path,

    /// Validate configuration
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

/// Recurrence argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RecurrenceArg {
    /// Every week
    Weekly,
    /// Every other week
    Biweekly,
}

impl From<RecurrenceArg> for Recurrence {
    fn from(arg: RecurrenceArg) -> Self {
        match arg {
            RecurrenceArg::Weekly => Self::Weekly,
            RecurrenceArg::Biweekly => Self::Biweekly,
        }
    }
}

/// Lesson type argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LessonTypeArg {
    /// In the aircraft
    Flight,
    /// Classroom or briefing
    Ground,
}

impl From<LessonTypeArg> for LessonType {
    fn from(arg: LessonTypeArg) -> Self {
        match arg {
            LessonTypeArg::Flight => Self::Flight,
            LessonTypeArg::Ground => Self::Ground,
        }
    }
}

/// Output format for commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Plain text output
    #[default]
    Plain,
    /// JSON output
    Json,
}
