use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{ffi, types::Type, Row};

/// Render a timestamp in the fixed-width form stored in every table
pub fn to_db_timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn now_timestamp() -> String {
    to_db_timestamp(&Utc::now())
}

/// Read a stored timestamp column
pub fn timestamp_column(row: &Row, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn constraint_code(err: &rusqlite::Error) -> Option<i32> {
    match err {
        rusqlite::Error::SqliteFailure(failure, _)
            if failure.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            Some(failure.extended_code)
        }
        _ => None,
    }
}

/// UNIQUE / PRIMARY KEY violation, i.e. the edge or row already exists
pub fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        constraint_code(err),
        Some(ffi::SQLITE_CONSTRAINT_UNIQUE) | Some(ffi::SQLITE_CONSTRAINT_PRIMARYKEY)
    )
}

/// FOREIGN KEY violation, i.e. a referenced row is missing
pub fn is_foreign_key_violation(err: &rusqlite::Error) -> bool {
    constraint_code(err) == Some(ffi::SQLITE_CONSTRAINT_FOREIGNKEY)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    #[test]
    fn test_timestamps_sort_lexically() {
        let earlier: DateTime<Utc> = "2024-01-10T10:00:00Z".parse().unwrap();
        let later: DateTime<Utc> = "2024-01-10T10:00:00.5Z".parse().unwrap();

        let a = to_db_timestamp(&earlier);
        let b = to_db_timestamp(&later);
        assert_eq!(a, "2024-01-10T10:00:00.000000Z");
        assert_eq!(a.len(), b.len());
        assert!(a < b);
    }

    #[test]
    fn test_timestamp_column_round_trip() {
        let conn = Connection::open_in_memory().unwrap();
        let stored = now_timestamp();
        let parsed = conn
            .query_row("SELECT ?1", [&stored], |row| timestamp_column(row, 0))
            .unwrap();
        assert_eq!(to_db_timestamp(&parsed), stored);
    }

    #[test]
    fn test_constraint_classification() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "PRAGMA foreign_keys = ON;
             CREATE TABLE parent (id INTEGER PRIMARY KEY);
             CREATE TABLE child (a INTEGER, b INTEGER REFERENCES parent(id), UNIQUE (a));
             INSERT INTO parent (id) VALUES (1);
             INSERT INTO child (a, b) VALUES (1, 1);",
        )
        .unwrap();

        let dup = conn
            .execute("INSERT INTO child (a, b) VALUES (1, 1)", [])
            .unwrap_err();
        assert!(is_unique_violation(&dup));
        assert!(!is_foreign_key_violation(&dup));

        let dangling = conn
            .execute("INSERT INTO child (a, b) VALUES (2, 42)", [])
            .unwrap_err();
        assert!(is_foreign_key_violation(&dangling));
        assert!(!is_unique_violation(&dangling));
    }
}
