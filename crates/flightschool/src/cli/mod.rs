//! Command-line interface for flightschool.
//!
//! This module provides the CLI structure for the `fsched` binary.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::logging::Verbosity;

pub use commands::{
    AvailabilityCommand, BookCommand, ConfigCommand, LessonTypeArg, LessonsCommand,
    OutputFormat, RecurrenceArg, SlotsCommand, StatusCommand,
};

/// fsched - Book flight lessons against instructor availability
///
/// Instructors publish availability windows; students book lessons inside
/// them. Overlapping lessons for the same instructor are always refused.
#[derive(Debug, Parser)]
#[command(name = "fsched")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Manage instructor availability
    #[command(subcommand)]
    Availability(AvailabilityCommand),

    /// Show the slots of an availability window on a day
    Slots(SlotsCommand),

    /// Book a lesson
    Book(BookCommand),

    /// Confirm a scheduled lesson
    Confirm {
        /// Lesson id
        id: String,
    },

    /// Mark a confirmed lesson as completed
    Complete {
        /// Lesson id
        id: String,
    },

    /// Cancel a lesson
    Cancel {
        /// Lesson id
        id: String,

        /// Why the lesson is cancelled
        #[arg(short, long)]
        reason: Option<String>,
    },

    /// List lessons
    Lessons(LessonsCommand),

    /// Show storage status
    Status(StatusCommand),

    /// View or validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> Verbosity {
        if self.quiet {
            Verbosity::Quiet
        } else {
            match self.verbose {
                0 => Verbosity::Normal,
                1 => Verbosity::Verbose,
                2 => Verbosity::Debug,
                _ => Verbosity::Trace,
            }
        }
    }
}
