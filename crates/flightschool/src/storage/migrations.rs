//! Database migration system for flightschool.
//!
//! This module handles database schema versioning and migrations,
//! ensuring stored collections stay readable as the application evolves.

use chrono::Utc;
use rusqlite::{Connection, OptionalExtension};
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::error::{Error, Result};

use super::schema::SCHEMA_STATEMENTS;
use super::AVAILABILITY_KEY;

/// The current schema version.
pub const CURRENT_VERSION: i32 = 2;

/// Key used to store the schema version in the metadata table.
const VERSION_KEY: &str = "schema_version";

/// Key under which older front ends stored availability windows.
pub const LEGACY_AVAILABILITY_KEY: &str = "instructor-availability";

/// Initialize the database schema.
///
/// Creates all tables if they don't exist, then runs any pending migrations
/// to bring the schema up to the current version.
///
/// # Errors
///
/// Returns an error if schema creation or migration fails.
pub fn initialize_schema(conn: &Connection) -> Result<()> {
    for statement in SCHEMA_STATEMENTS {
        conn.execute(statement, [])?;
    }

    let version = get_schema_version(conn)?;
    if version < CURRENT_VERSION {
        run_migrations(conn, version)?;
    }

    Ok(())
}

/// Get the current schema version from the database.
///
/// Returns 0 if no version is set (fresh database).
fn get_schema_version(conn: &Connection) -> Result<i32> {
    let result: std::result::Result<String, rusqlite::Error> = conn.query_row(
        "SELECT value FROM metadata WHERE key = ?1",
        [VERSION_KEY],
        |row| row.get(0),
    );

    match result {
        Ok(value) => value.parse().map_err(|_| Error::DatabaseMigration {
            message: format!("invalid schema version: {value}"),
        }),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(0),
        Err(e) => Err(e.into()),
    }
}

/// Set the schema version in the database.
fn set_schema_version(conn: &Connection, version: i32) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO metadata (key, value) VALUES (?1, ?2)",
        (VERSION_KEY, version.to_string()),
    )?;
    Ok(())
}

/// Run migrations from the given version to the current version.
fn run_migrations(conn: &Connection, from_version: i32) -> Result<()> {
    let mut current = from_version;

    while current < CURRENT_VERSION {
        current += 1;
        run_migration(conn, current)?;
    }

    set_schema_version(conn, CURRENT_VERSION)?;
    Ok(())
}

/// Run a specific migration version.
fn run_migration(conn: &Connection, version: i32) -> Result<()> {
    match version {
        1 => migrate_v1(conn),
        2 => migrate_v2(conn),
        _ => Err(Error::DatabaseMigration {
            message: format!("unknown migration version: {version}"),
        }),
    }
}

/// Migration to version 1 (initial schema).
///
/// Version 1 is the base schema created by `SCHEMA_STATEMENTS`.
fn migrate_v1(conn: &Connection) -> Result<()> {
    set_schema_version(conn, 1)?;
    Ok(())
}

/// Migration to version 2: availability windows move to a single key.
///
/// Windows saved under the legacy key are converted to the current record
/// shape and moved. If both keys hold data the legacy entry is left alone for
/// manual reconciliation.
fn migrate_v2(conn: &Connection) -> Result<()> {
    let current = stored_value(conn, AVAILABILITY_KEY)?;
    let legacy = stored_value(conn, LEGACY_AVAILABILITY_KEY)?;

    match (current, legacy) {
        (Some(_), Some(_)) => warn!(
            "Both '{}' and '{}' hold availability; leaving legacy key untouched",
            LEGACY_AVAILABILITY_KEY, AVAILABILITY_KEY
        ),
        (None, Some(legacy)) => {
            let now = Utc::now().to_rfc3339();
            let (converted, count) = convert_legacy_availability(&legacy, &now)?;
            conn.execute(
                "INSERT INTO collections (key, value, updated_at) VALUES (?1, ?2, ?3)",
                (AVAILABILITY_KEY, converted, &now),
            )?;
            conn.execute(
                "DELETE FROM collections WHERE key = ?1",
                [LEGACY_AVAILABILITY_KEY],
            )?;
            info!(
                count,
                "Moved availability from '{}' to '{}'", LEGACY_AVAILABILITY_KEY, AVAILABILITY_KEY
            );
        }
        _ => {}
    }

    set_schema_version(conn, 2)?;
    Ok(())
}

fn stored_value(conn: &Connection, key: &str) -> Result<Option<String>> {
    Ok(conn
        .query_row(
            "SELECT value FROM collections WHERE key = ?1",
            [key],
            |row| row.get(0),
        )
        .optional()?)
}

/// Rewrite legacy availability records into the current shape.
///
/// Legacy records carry precomputed `availableSlots` and lack capacity,
/// recurrence and creation time. Missing fields get one-off, single-student
/// defaults stamped with `created_at`.
fn convert_legacy_availability(raw: &str, created_at: &str) -> Result<(String, usize)> {
    let invalid = |message: String| Error::DatabaseMigration {
        message: format!("legacy availability: {message}"),
    };

    let value: Value = serde_json::from_str(raw).map_err(|e| invalid(e.to_string()))?;
    let Value::Array(records) = value else {
        return Err(invalid("expected a JSON array".to_string()));
    };

    let mut converted = Vec::with_capacity(records.len());
    for record in records {
        let Value::Object(mut fields) = record else {
            return Err(invalid("expected every record to be an object".to_string()));
        };
        fields.remove("availableSlots");
        fields.entry("maxStudents").or_insert_with(|| json!(1));
        fields.entry("isRecurring").or_insert_with(|| json!(false));
        fields.entry("notes").or_insert_with(|| json!(""));
        fields
            .entry("createdAt")
            .or_insert_with(|| json!(created_at));
        converted.push(Value::Object(fields));
    }

    let count = converted.len();
    Ok((serde_json::to_string(&converted)?, count))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_db() -> Connection {
        Connection::open_in_memory().expect("failed to create in-memory database")
    }

    #[test]
    fn test_initialize_schema_creates_tables() {
        let conn = create_test_db();
        initialize_schema(&conn).expect("failed to initialize schema");

        for table in ["collections", "metadata"] {
            let count: i32 = conn
                .query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?1",
                    [table],
                    |row| row.get(0),
                )
                .unwrap();
            assert_eq!(count, 1, "missing table {table}");
        }
    }

    #[test]
    fn test_initialize_schema_sets_version() {
        let conn = create_test_db();
        initialize_schema(&conn).expect("failed to initialize schema");

        let version = get_schema_version(&conn).unwrap();
        assert_eq!(version, CURRENT_VERSION);
    }

    #[test]
    fn test_initialize_schema_idempotent() {
        let conn = create_test_db();

        initialize_schema(&conn).expect("first init failed");
        initialize_schema(&conn).expect("second init failed");

        let version = get_schema_version(&conn).unwrap();
        assert_eq!(version, CURRENT_VERSION);
    }

    #[test]
    fn test_get_schema_version_fresh_db() {
        let conn = create_test_db();
        conn.execute(
            "CREATE TABLE metadata (key TEXT PRIMARY KEY, value TEXT NOT NULL)",
            [],
        )
        .unwrap();

        let version = get_schema_version(&conn).unwrap();
        assert_eq!(version, 0);
    }

    #[test]
    fn test_set_and_get_schema_version() {
        let conn = create_test_db();
        conn.execute(
            "CREATE TABLE metadata (key TEXT PRIMARY KEY, value TEXT NOT NULL)",
            [],
        )
        .unwrap();

        set_schema_version(&conn, 42).unwrap();
        assert_eq!(get_schema_version(&conn).unwrap(), 42);
    }

    #[test]
    fn test_run_migration_unknown_version() {
        let conn = create_test_db();
        initialize_schema(&conn).unwrap();

        let result = run_migration(&conn, 999);
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(err.to_string().contains("unknown migration version"));
    }

    #[test]
    fn test_v2_renames_legacy_availability_key() {
        let conn = create_test_db();
        for statement in SCHEMA_STATEMENTS {
            conn.execute(statement, []).unwrap();
        }
        set_schema_version(&conn, 1).unwrap();
        conn.execute(
            "INSERT INTO collections (key, value, updated_at) VALUES (?1, '[]', 'now')",
            [LEGACY_AVAILABILITY_KEY],
        )
        .unwrap();

        initialize_schema(&conn).unwrap();

        assert_eq!(stored_value(&conn, AVAILABILITY_KEY).unwrap().as_deref(), Some("[]"));
        assert!(stored_value(&conn, LEGACY_AVAILABILITY_KEY).unwrap().is_none());
        assert_eq!(get_schema_version(&conn).unwrap(), 2);
    }

    #[test]
    fn test_v2_keeps_legacy_key_when_both_exist() {
        let conn = create_test_db();
        for statement in SCHEMA_STATEMENTS {
            conn.execute(statement, []).unwrap();
        }
        set_schema_version(&conn, 1).unwrap();
        for (key, value) in [(LEGACY_AVAILABILITY_KEY, "[1]"), (AVAILABILITY_KEY, "[2]")] {
            conn.execute(
                "INSERT INTO collections (key, value, updated_at) VALUES (?1, ?2, 'now')",
                (key, value),
            )
            .unwrap();
        }

        initialize_schema(&conn).unwrap();

        assert_eq!(stored_value(&conn, AVAILABILITY_KEY).unwrap().as_deref(), Some("[2]"));
        assert_eq!(
            stored_value(&conn, LEGACY_AVAILABILITY_KEY).unwrap().as_deref(),
            Some("[1]")
        );
    }

    #[test]
    fn test_convert_legacy_availability_fills_missing_fields() {
        let legacy = r#"[
            {"id": "1", "instructorId": "instructor-1", "date": "2024-01-15",
             "startTime": "09:00", "endTime": "17:00",
             "availableSlots": [{"start": "09:00", "end": "11:00", "available": true}]},
            {"id": "2", "instructorId": "instructor-2", "date": "2024-01-15",
             "startTime": "08:00", "endTime": "16:00", "maxStudents": 3,
             "isRecurring": true, "recurrencePattern": "weekly", "notes": "kept",
             "createdAt": "2024-01-01T00:00:00Z"}
        ]"#;

        let (converted, count) =
            convert_legacy_availability(legacy, "2024-02-01T00:00:00+00:00").unwrap();
        assert_eq!(count, 2);

        let records: Vec<Value> = serde_json::from_str(&converted).unwrap();
        assert!(records[0].get("availableSlots").is_none());
        assert_eq!(records[0]["maxStudents"], 1);
        assert_eq!(records[0]["isRecurring"], false);
        assert_eq!(records[0]["createdAt"], "2024-02-01T00:00:00+00:00");
        assert_eq!(records[1]["maxStudents"], 3);
        assert_eq!(records[1]["recurrencePattern"], "weekly");
        assert_eq!(records[1]["notes"], "kept");
        assert_eq!(records[1]["createdAt"], "2024-01-01T00:00:00Z");
    }

    #[test]
    fn test_convert_legacy_availability_rejects_garbage() {
        assert!(convert_legacy_availability("{\"id\": 1}", "now").is_err());
        assert!(convert_legacy_availability("[1, 2]", "now").is_err());
        assert!(convert_legacy_availability("not json", "now").is_err());
    }

    #[test]
    fn test_v2_failed_conversion_keeps_legacy_data() {
        let conn = create_test_db();
        for statement in SCHEMA_STATEMENTS {
            conn.execute(statement, []).unwrap();
        }
        set_schema_version(&conn, 1).unwrap();
        conn.execute(
            "INSERT INTO collections (key, value, updated_at) VALUES (?1, 'oops', 'now')",
            [LEGACY_AVAILABILITY_KEY],
        )
        .unwrap();

        let err = initialize_schema(&conn).unwrap_err();
        assert!(matches!(err, Error::DatabaseMigration { .. }));
        assert_eq!(
            stored_value(&conn, LEGACY_AVAILABILITY_KEY).unwrap().as_deref(),
            Some("oops")
        );
        assert!(stored_value(&conn, AVAILABILITY_KEY).unwrap().is_none());
    }
}
