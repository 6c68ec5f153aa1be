//! `fsched` - CLI for flightschool
//!
//! This binary publishes instructor availability, shows bookable slots, and
//! books and manages lessons against a local schedule database.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::rc::Rc;

use anyhow::{bail, Context};
use chrono::Local;
use clap::Parser;

use flightschool::cli::{
    AvailabilityCommand, BookCommand, Cli, Command, ConfigCommand, LessonsCommand, OutputFormat,
    SlotsCommand,
};
use flightschool::{
    init_logging, Availability, AvailabilityPatch, AvailabilityStore, BookingEngine,
    BookingRequest, BookingStore, Config, IdentityProvider, KeyValueStore, MemoryStore,
    NewAvailability, Role, ScheduledLesson, SqliteStore, StaticIdentity, TimeRange, TimeSlot,
};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    init_logging(cli.verbosity());

    let config = Config::load_from(cli.config.clone()).context("failed to load configuration")?;

    match cli.command {
        Command::Config(config_cmd) => handle_config(&config, config_cmd),
        Command::Status(status_cmd) => handle_status(&config, status_cmd.json),
        Command::Availability(cmd) => {
            handle_availability(&open_engine(&config)?, &config.identity(), cmd)
        }
        Command::Slots(cmd) => handle_slots(&open_engine(&config)?, &config, &cmd),
        Command::Book(cmd) => {
            handle_book(&mut open_engine(&config)?, &config, &config.identity(), cmd)
        }
        Command::Confirm { id } => {
            let lesson = open_engine(&config)?.confirm(&id)?;
            print_lessons(&[lesson], OutputFormat::Plain)
        }
        Command::Complete { id } => {
            let lesson = open_engine(&config)?.complete(&id)?;
            print_lessons(&[lesson], OutputFormat::Plain)
        }
        Command::Cancel { id, reason } => {
            let lesson = open_engine(&config)?.cancel(&id, reason)?;
            print_lessons(&[lesson], OutputFormat::Plain)
        }
        Command::Lessons(cmd) => handle_lessons(&open_engine(&config)?, &config.identity(), &cmd),
    }
}

fn open_backend(config: &Config) -> anyhow::Result<Rc<dyn KeyValueStore>> {
    if config.storage.in_memory {
        return Ok(Rc::new(MemoryStore::new()));
    }
    let path = config.database_path();
    let store = SqliteStore::open(&path)
        .with_context(|| format!("failed to open schedule at {}", path.display()))?;
    Ok(Rc::new(store))
}

fn open_engine(config: &Config) -> anyhow::Result<BookingEngine> {
    let backend = open_backend(config)?;
    let fleet = config.fleet()?;
    Ok(BookingEngine::new(
        AvailabilityStore::new(Rc::clone(&backend), config.scheduling.max_students_limit),
        BookingStore::new(backend),
        Box::new(fleet),
    ))
}

/// Use the explicit id, or fall back to the configured user if they hold `role`.
fn resolve_id(
    explicit: Option<String>,
    identity: &StaticIdentity,
    role: Role,
    flag: &str,
) -> anyhow::Result<String> {
    match explicit.or_else(|| identity.id_as(role)) {
        Some(id) => Ok(id),
        None => bail!("no {role} given: pass {flag} or set identity.user_id and identity.role = \"{role}\""),
    }
}

fn handle_availability(
    engine: &BookingEngine,
    identity: &StaticIdentity,
    cmd: AvailabilityCommand,
) -> anyhow::Result<()> {
    let store = engine.availability();
    match cmd {
        AvailabilityCommand::Add {
            date,
            window,
            instructor,
            recurrence,
            max_students,
            notes,
            format,
        } => {
            let instructor = resolve_id(instructor, identity, Role::Instructor, "--instructor")?;
            let new = NewAvailability {
                recurrence: recurrence.map(Into::into),
                max_students,
                notes,
                ..NewAvailability::new(instructor, date, TimeRange::parse(&window)?)
            };
            let created = store.create(new)?;
            print_availability(&[created], format)
        }
        AvailabilityCommand::List {
            instructor,
            date,
            until,
            format,
        } => {
            let windows = match (instructor, date, until) {
                (instructor, Some(from), Some(until)) => {
                    store.occurring_between(instructor.as_deref(), from, until)?
                }
                (Some(instructor), Some(date), None) => store.covering(&instructor, date)?,
                (Some(instructor), None, _) => store.for_instructor(&instructor)?,
                (None, Some(date), None) => {
                    let mut windows: Vec<Availability> = store
                        .list(|a| a.covers(date))?
                        .iter()
                        .filter_map(|a| a.occurrence_on(date))
                        .collect();
                    windows.sort_by(|a, b| {
                        (&a.instructor_id, a.start_time).cmp(&(&b.instructor_id, b.start_time))
                    });
                    windows
                }
                (None, None, _) => {
                    let mut windows = store.list(|_| true)?;
                    windows.sort_by_key(|a| (a.date, a.start_time));
                    windows
                }
            };
            print_availability(&windows, format)
        }
        AvailabilityCommand::Edit {
            id,
            date,
            window,
            recurrence,
            one_off,
            max_students,
            notes,
        } => {
            let patch = AvailabilityPatch {
                date,
                window: window.as_deref().map(TimeRange::parse).transpose()?,
                recurrence: if one_off {
                    Some(None)
                } else {
                    recurrence.map(|r| Some(r.into()))
                },
                max_students,
                notes,
            };
            let updated = store.update(&id, patch)?;
            print_availability(&[updated], OutputFormat::Plain)
        }
        AvailabilityCommand::Copy { id, date } => {
            let copy = store.copy_to(&id, date)?;
            print_availability(&[copy], OutputFormat::Plain)
        }
        AvailabilityCommand::Delete { id } => {
            store.delete(&id)?;
            println!("Deleted availability {id}");
            Ok(())
        }
    }
}

fn handle_slots(engine: &BookingEngine, config: &Config, cmd: &SlotsCommand) -> anyhow::Result<()> {
    let duration = cmd
        .duration
        .unwrap_or(config.scheduling.slot_duration_minutes);
    let slots = engine.slots(&cmd.availability_id, cmd.date, duration)?;

    match cmd.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&slots)?),
        OutputFormat::Plain => {
            if slots.is_empty() {
                println!("No {duration}-minute slots fit in this window.");
            }
            for slot in &slots {
                println!("{}", format_slot(slot));
            }
        }
    }
    Ok(())
}

fn handle_book(
    engine: &mut BookingEngine,
    config: &Config,
    identity: &StaticIdentity,
    cmd: BookCommand,
) -> anyhow::Result<()> {
    let slot = cmd.interval(config.scheduling.slot_duration_minutes)?;
    let format = cmd.format;
    let student = resolve_id(cmd.student, identity, Role::Student, "--student")?;

    let mut request =
        BookingRequest::new(student, cmd.instructor, cmd.date, slot, cmd.lesson_type.into())
            .with_notes(cmd.notes);
    request.aircraft = cmd.aircraft;
    request.objectives = cmd.objectives.into_iter().collect();

    let lesson = engine.book(request)?;
    print_lessons(&[lesson], format)
}

fn handle_lessons(
    engine: &BookingEngine,
    identity: &StaticIdentity,
    cmd: &LessonsCommand,
) -> anyhow::Result<()> {
    let today = Local::now().date_naive();
    let student = if cmd.instructor.is_none() {
        cmd.student.clone().or_else(|| identity.id_as(Role::Student))
    } else {
        None
    };

    let mut lessons = match (student, &cmd.instructor, cmd.date) {
        (_, Some(instructor), Some(date)) => engine.schedule_for_instructor(instructor, date)?,
        (_, Some(instructor), None) => engine.bookings().for_instructor(instructor)?,
        (Some(student), None, _) if cmd.upcoming => {
            engine.upcoming_for_student(&student, today)?
        }
        (Some(student), None, _) => engine.bookings().for_student(&student)?,
        (None, None, _) => {
            let mut all = engine.bookings().list(|_| true)?;
            all.sort_by_key(|l| (l.date, l.start_time));
            all
        }
    };

    if let Some(date) = cmd.date {
        lessons.retain(|l| l.date == date);
    }
    if cmd.upcoming {
        lessons.retain(|l| l.is_active() && l.date >= today);
    }

    if lessons.is_empty() && cmd.format == OutputFormat::Plain {
        println!("No lessons found.");
        return Ok(());
    }
    print_lessons(&lessons, cmd.format)
}

fn handle_status(config: &Config, json: bool) -> anyhow::Result<()> {
    if config.storage.in_memory {
        println!("Storage is in-memory; nothing is persisted.");
        return Ok(());
    }

    let store = Rc::new(SqliteStore::open(config.database_path())?);
    let stats = store.stats()?;
    let backend: Rc<dyn KeyValueStore> = store;
    let availability =
        AvailabilityStore::new(Rc::clone(&backend), config.scheduling.max_students_limit)
            .list(|_| true)?
            .len();
    let lessons = BookingStore::new(backend).list(|_| true)?;
    let active = lessons.iter().filter(|l| l.is_active()).count();

    if json {
        let status = serde_json::json!({
            "database_path": config.database_path(),
            "db_size_bytes": stats.db_size_bytes,
            "last_updated": stats.last_updated,
            "availability_windows": availability,
            "lessons": lessons.len(),
            "active_lessons": active,
        });
        println!("{}", serde_json::to_string_pretty(&status)?);
    } else {
        println!("fsched status");
        println!("-------------");
        println!("Database:      {}", config.database_path().display());
        println!("Size:          {} bytes", stats.db_size_bytes);
        match stats.last_updated {
            Some(at) => println!("Last updated:  {}", at.to_rfc3339()),
            None => println!("Last updated:  never"),
        }
        println!("Availability:  {availability} windows");
        println!("Lessons:       {} ({active} active)", lessons.len());
    }
    Ok(())
}

fn handle_config(config: &Config, cmd: ConfigCommand) -> anyhow::Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(config)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Storage]");
                println!("  Database path:      {}", config.database_path().display());
                println!("  In memory:          {}", config.storage.in_memory);
                println!();
                println!("[Scheduling]");
                println!(
                    "  Slot duration:      {} minutes",
                    config.scheduling.slot_duration_minutes
                );
                println!(
                    "  Max students limit: {}",
                    config.scheduling.max_students_limit
                );
                println!();
                println!("[Fleet]");
                println!("  Tail number regex:  {}", config.fleet.tail_number_pattern);
                for aircraft in &config.fleet.aircraft {
                    println!("  {:<19} {}", aircraft.tail_number, aircraft.model);
                }
                println!();
                println!("[Identity]");
                match config.identity().current_user() {
                    Some(user) => println!("  Acting as:          {} ({})", user.id, user.role),
                    None => println!("  Acting as:          nobody"),
                }
            }
        }
        ConfigCommand::Path => {
            println!("{}", Config::default_config_path().display());
        }
        ConfigCommand::Validate { file } => {
            let path = file.unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            Config::load_from(Some(path.clone()))
                .with_context(|| format!("invalid configuration in {}", path.display()))?;
            println!("Configuration is valid.");
        }
    }
    Ok(())
}

fn print_availability(windows: &[Availability], format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(windows)?),
        OutputFormat::Plain => {
            if windows.is_empty() {
                println!("No availability found.");
            }
            for a in windows {
                let repeat = a
                    .recurrence()
                    .map_or_else(|| "one-off".to_string(), |r| r.to_string());
                print!(
                    "{}  {}  {} {}  {:<8}  max {}",
                    a.id,
                    a.instructor_id,
                    a.date,
                    a.window(),
                    repeat,
                    a.max_students
                );
                if a.notes.is_empty() {
                    println!();
                } else {
                    println!("  {}", a.notes);
                }
            }
        }
    }
    Ok(())
}

fn format_slot(slot: &TimeSlot) -> String {
    match &slot.occupying_booking_id {
        Some(id) => format!("{}  booked ({id})", slot.range()),
        None => format!("{}  free", slot.range()),
    }
}

fn print_lessons(lessons: &[ScheduledLesson], format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(lessons)?),
        OutputFormat::Plain => {
            for l in lessons {
                let aircraft = l
                    .aircraft
                    .as_deref()
                    .map_or_else(String::new, |tail| format!("  {tail}"));
                println!(
                    "{}  {} {}  {}  student {}  instructor {}  {}{}",
                    l.id,
                    l.date,
                    l.interval(),
                    l.lesson_type,
                    l.student_id,
                    l.instructor_id,
                    l.status,
                    aircraft
                );
            }
        }
    }
    Ok(())
}
