//! Database schema migrations for SQLite.
//!
//! We use a simple versioned migration system. Each migration is a SQL string
//! that transforms the schema from version N to N+1.

use rusqlite::Connection;

use crate::error::{Result, StoreError};

/// Current schema version.
pub const CURRENT_VERSION: u32 = 2;

/// Initialize or migrate the database schema.
///
/// This function is idempotent - it can be called multiple times safely.
pub fn migrate(conn: &mut Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at INTEGER NOT NULL
        )",
        [],
    )?;

    let current: u32 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
        [],
        |row| row.get(0),
    )?;

    if current > CURRENT_VERSION {
        return Err(StoreError::Migration(format!(
            "database schema version {} is newer than supported version {}",
            current, CURRENT_VERSION
        )));
    }

    if current < CURRENT_VERSION {
        let tx = conn.transaction()?;

        for version in (current + 1)..=CURRENT_VERSION {
            apply_migration(&tx, version)?;

            tx.execute(
                "INSERT INTO schema_migrations (version, applied_at) VALUES (?1, ?2)",
                rusqlite::params![version, now_millis()],
            )?;
            tracing::debug!(version, "applied schema migration");
        }

        tx.commit()?;
    }

    Ok(())
}

/// Apply a specific migration version.
fn apply_migration(conn: &Connection, version: u32) -> Result<()> {
    match version {
        1 => apply_v1(conn),
        2 => apply_v2(conn),
        _ => Err(StoreError::Migration(format!(
            "unknown migration version: {}",
            version
        ))),
    }
}

/// Migration v1: Initial schema.
fn apply_v1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        -- Records: one row per issued diploma
        CREATE TABLE records (
            seq INTEGER PRIMARY KEY AUTOINCREMENT,  -- insertion order, tie-break for created_at
            record_id TEXT NOT NULL UNIQUE,         -- allocated identifier
            student_index TEXT NOT NULL,            -- NOT unique: reissues share it
            owner TEXT,                             -- lower-cased wallet address
            valid INTEGER NOT NULL DEFAULT 1,
            document_address TEXT NOT NULL,
            verification_address TEXT NOT NULL,
            metadata_address TEXT NOT NULL,
            ledger_id TEXT,                         -- NULL until a mint succeeds
            ledger_tx TEXT,
            ledger_block INTEGER,
            student_name TEXT NOT NULL,
            program TEXT,
            credits INTEGER,
            graduation_date TEXT,
            final_grade TEXT,
            university_name TEXT,
            faculty_name TEXT,
            subjects BLOB,                          -- CBOR-encoded Subjects
            created_at INTEGER NOT NULL             -- Unix ms
        );

        -- Address to role mapping
        CREATE TABLE roles (
            address TEXT PRIMARY KEY,
            role TEXT NOT NULL,
            updated_at INTEGER NOT NULL
        );

        -- Indexes for common queries
        CREATE INDEX idx_records_index_created ON records(student_index, created_at DESC);
        CREATE INDEX idx_records_owner ON records(owner);
        CREATE INDEX idx_records_created ON records(created_at);
        "#,
    )?;

    Ok(())
}

/// Migration v2: identifier high-water mark.
///
/// Seeded from the largest all-digit identifier already stored.
fn apply_v2(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        -- Single row; only ever raised
        CREATE TABLE allocation (
            singleton INTEGER PRIMARY KEY CHECK (singleton = 1),
            high_water INTEGER NOT NULL
        );

        INSERT INTO allocation (singleton, high_water)
        SELECT 1, COALESCE(MAX(CAST(record_id AS INTEGER)), 0)
        FROM records
        WHERE record_id <> '' AND record_id NOT GLOB '*[^0-9]*';
        "#,
    )?;

    Ok(())
}

/// Get current time in milliseconds.
fn now_millis() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migration_creates_tables() {
        let mut conn = Connection::open_in_memory().unwrap();
        migrate(&mut conn).unwrap();

        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<std::result::Result<Vec<_>, _>>()
            .unwrap();

        assert!(tables.contains(&"records".to_string()));
        assert!(tables.contains(&"roles".to_string()));
        assert!(tables.contains(&"allocation".to_string()));
        assert!(tables.contains(&"schema_migrations".to_string()));
    }

    #[test]
    fn test_migration_idempotent() {
        let mut conn = Connection::open_in_memory().unwrap();
        migrate(&mut conn).unwrap();
        migrate(&mut conn).unwrap();
        migrate(&mut conn).unwrap();

        let version: u32 = conn
            .query_row("SELECT MAX(version) FROM schema_migrations", [], |row| {
                row.get(0)
            })
            .unwrap();
        assert_eq!(version, CURRENT_VERSION);
    }

    #[test]
    fn test_student_index_not_unique() {
        let mut conn = Connection::open_in_memory().unwrap();
        migrate(&mut conn).unwrap();

        let unique_indexes: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM pragma_index_list('records')
                 WHERE \"unique\" = 1 AND name = 'idx_records_index_created'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(unique_indexes, 0);
    }

    #[test]
    fn test_high_water_seeded_from_existing_records() {
        let mut conn = Connection::open_in_memory().unwrap();
        conn.execute(
            "CREATE TABLE schema_migrations (
                version INTEGER PRIMARY KEY,
                applied_at INTEGER NOT NULL
            )",
            [],
        )
        .unwrap();
        apply_v1(&conn).unwrap();
        conn.execute(
            "INSERT INTO schema_migrations (version, applied_at) VALUES (1, 0)",
            [],
        )
        .unwrap();

        for id in ["3", "12", "legacy-7"] {
            conn.execute(
                "INSERT INTO records (record_id, student_index, document_address,
                    verification_address, metadata_address, student_name, created_at)
                 VALUES (?1, '201234', 'pdf', 'qr', 'meta', 'Ana Petrovic', 0)",
                [id],
            )
            .unwrap();
        }

        migrate(&mut conn).unwrap();

        let high_water: i64 = conn
            .query_row("SELECT high_water FROM allocation", [], |row| row.get(0))
            .unwrap();
        assert_eq!(high_water, 12);
    }

    #[test]
    fn test_newer_schema_rejected() {
        let mut conn = Connection::open_in_memory().unwrap();
        migrate(&mut conn).unwrap();
        conn.execute(
            "INSERT INTO schema_migrations (version, applied_at) VALUES (99, 0)",
            [],
        )
        .unwrap();

        assert!(matches!(migrate(&mut conn), Err(StoreError::Migration(_))));
    }
}
