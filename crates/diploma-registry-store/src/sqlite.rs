//! SQLite implementation of the store traits.
//!
//! This is the primary storage backend for the diploma registry. It uses
//! rusqlite with bundled SQLite, wrapped in async via tokio::spawn_blocking.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::types::Type;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension};

use diploma_registry_core::{
    ContentAddress, ContentRefs, DiplomaDetails, LedgerRef, OwnerAddress, Record, RecordId, Role,
    StudentIndex, Subjects,
};

use crate::error::{Result, StoreError};
use crate::migration;
use crate::traits::{InsertResult, RecordStore, RoleStore, Transition};

/// Columns selected for every record query, in `row_to_record` order.
const RECORD_COLUMNS: &str = "record_id, student_index, owner, valid,
    document_address, verification_address, metadata_address,
    ledger_id, ledger_tx, ledger_block,
    student_name, program, credits, graduation_date, final_grade,
    university_name, faculty_name, subjects, created_at";

/// Most-recent-first ordering shared by all listings.
const RECENT_FIRST: &str = "ORDER BY created_at DESC, seq DESC";

/// SQLite-based store implementation.
///
/// Thread-safe via internal Mutex. All operations use spawn_blocking
/// to avoid blocking the async runtime. Writers are serialized on the single
/// connection, so each multi-statement write runs in its own transaction
/// without interleaving.
pub struct SqliteStore {
    /// The SQLite connection, protected by a mutex.
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open a SQLite database at the given path.
    ///
    /// Creates the file and runs migrations if it doesn't exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut conn = Connection::open(path)?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory SQLite database.
    ///
    /// Useful for testing.
    pub fn open_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run a blocking operation on the connection off the async runtime.
    async fn blocking<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);

        tokio::task::spawn_blocking(move || {
            let mut conn = conn
                .lock()
                .map_err(|e| StoreError::Poisoned(e.to_string()))?;
            f(&mut conn)
        })
        .await
        .map_err(|e| StoreError::Task(e.to_string()))?
    }
}

// Helper to convert a row to Record
fn row_to_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<Record> {
    let owner: Option<String> = row.get("owner")?;
    let ledger_id: Option<String> = row.get("ledger_id")?;
    let ledger_tx: Option<String> = row.get("ledger_tx")?;
    let ledger_block: Option<i64> = row.get("ledger_block")?;
    let subjects_cbor: Option<Vec<u8>> = row.get("subjects")?;

    let subjects = match subjects_cbor {
        Some(bytes) => Some(decode_subjects(&bytes).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(17, Type::Blob, e.into())
        })?),
        None => None,
    };

    let block_ref = match ledger_block {
        Some(block) => u64::try_from(block)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(9, Type::Integer, Box::new(e)))?,
        None => 0,
    };

    let ledger = match (ledger_id, ledger_tx) {
        (Some(ledger_id), Some(transaction_ref)) => Some(LedgerRef {
            ledger_id,
            transaction_ref,
            block_ref,
        }),
        _ => None,
    };

    Ok(Record {
        id: RecordId::new(row.get::<_, String>("record_id")?),
        student_index: StudentIndex::new(row.get::<_, String>("student_index")?),
        owner: owner.map(OwnerAddress::new),
        valid: row.get("valid")?,
        content: ContentRefs {
            primary_document: ContentAddress::new(row.get::<_, String>("document_address")?),
            verification_image: ContentAddress::new(
                row.get::<_, String>("verification_address")?,
            ),
            metadata_document: ContentAddress::new(row.get::<_, String>("metadata_address")?),
        },
        ledger,
        details: DiplomaDetails {
            student_name: row.get("student_name")?,
            program: row.get("program")?,
            credits: row.get("credits")?,
            graduation_date: row.get("graduation_date")?,
            final_grade: row.get("final_grade")?,
            university_name: row.get("university_name")?,
            faculty_name: row.get("faculty_name")?,
            subjects,
        },
        created_at: row.get("created_at")?,
    })
}

// Helper to encode subjects to CBOR
fn encode_subjects(subjects: &Subjects) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    ciborium::into_writer(subjects, &mut buf)
        .map_err(|e| StoreError::Serialization(e.to_string()))?;
    Ok(buf)
}

fn decode_subjects(bytes: &[u8]) -> std::result::Result<Subjects, String> {
    ciborium::from_reader(bytes).map_err(|e| e.to_string())
}

/// SQLite integers are signed 64-bit; larger values are refused, not wrapped.
fn to_sql_int(value: u64, what: &str) -> Result<i64> {
    i64::try_from(value).map_err(|_| {
        StoreError::InvalidData(format!("{} {} is out of range for SQLite", what, value))
    })
}

fn read_high_water(conn: &Connection) -> Result<u64> {
    let raw: i64 = conn.query_row(
        "SELECT high_water FROM allocation WHERE singleton = 1",
        [],
        |row| row.get(0),
    )?;
    u64::try_from(raw)
        .map_err(|_| StoreError::InvalidData(format!("negative high-water mark {}", raw)))
}

fn select_one(conn: &Connection, id: &str) -> rusqlite::Result<Option<Record>> {
    conn.query_row(
        &format!("SELECT {} FROM records WHERE record_id = ?1", RECORD_COLUMNS),
        params![id],
        row_to_record,
    )
    .optional()
}

fn select_many(
    conn: &Connection,
    filter: &str,
    args: impl rusqlite::Params,
) -> rusqlite::Result<Vec<Record>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM records {} {}",
        RECORD_COLUMNS, filter, RECENT_FIRST
    ))?;
    let records = stmt
        .query_map(args, row_to_record)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(records)
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::ConstraintViolation
    )
}

#[async_trait]
impl RecordStore for SqliteStore {
    async fn insert_record(&self, record: &Record) -> Result<InsertResult> {
        let record = record.clone();
        let subjects = record
            .details
            .subjects
            .as_ref()
            .map(encode_subjects)
            .transpose()?;
        let ledger_block = record
            .ledger
            .as_ref()
            .map(|l| to_sql_int(l.block_ref, "block"))
            .transpose()?;
        let number = record.id.as_number();
        let number_sql = number.map(|n| to_sql_int(n, "identifier")).transpose()?;

        self.blocking(move |conn| {
            let tx = conn.transaction()?;

            // Taken, or at or below the high-water mark (issued before, maybe deleted)
            let existing: Option<String> = tx
                .query_row(
                    "SELECT record_id FROM records WHERE record_id = ?1",
                    params![record.id.as_str()],
                    |row| row.get(0),
                )
                .optional()?;
            let high_water = read_high_water(&tx)?;
            let retired = number.is_some_and(|n| n <= high_water);

            if existing.is_some() || retired {
                return Ok(InsertResult::Conflict {
                    existing: record.id.clone(),
                });
            }

            let superseded = if record.valid {
                tx.execute(
                    "UPDATE records SET valid = 0 WHERE student_index = ?1 AND valid = 1",
                    params![record.student_index.as_str()],
                )?
            } else {
                0
            };

            let ledger = record.ledger.as_ref();
            let inserted = tx.execute(
                "INSERT INTO records (
                    record_id, student_index, owner, valid,
                    document_address, verification_address, metadata_address,
                    ledger_id, ledger_tx, ledger_block,
                    student_name, program, credits, graduation_date, final_grade,
                    university_name, faculty_name, subjects, created_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15,
                          ?16, ?17, ?18, ?19)",
                params![
                    record.id.as_str(),
                    record.student_index.as_str(),
                    record.owner.as_ref().map(|o| o.as_str()),
                    record.valid,
                    record.content.primary_document.as_str(),
                    record.content.verification_image.as_str(),
                    record.content.metadata_document.as_str(),
                    ledger.map(|l| l.ledger_id.as_str()),
                    ledger.map(|l| l.transaction_ref.as_str()),
                    ledger_block,
                    record.details.student_name,
                    record.details.program,
                    record.details.credits,
                    record.details.graduation_date,
                    record.details.final_grade,
                    record.details.university_name,
                    record.details.faculty_name,
                    subjects,
                    record.created_at,
                ],
            );

            match inserted {
                Ok(_) => {}
                // Lost a race on the unique identifier; the transaction rolls back.
                Err(e) if is_unique_violation(&e) => {
                    return Ok(InsertResult::Conflict {
                        existing: record.id.clone(),
                    })
                }
                Err(e) => return Err(e.into()),
            }

            if let Some(n) = number_sql {
                tx.execute(
                    "UPDATE allocation SET high_water = ?1 WHERE singleton = 1 AND high_water < ?1",
                    params![n],
                )?;
            }

            tx.commit()?;
            Ok(InsertResult::Inserted { superseded })
        })
        .await
    }

    async fn set_validity(&self, id: &RecordId, valid: bool) -> Result<Option<Transition>> {
        let id = id.clone();

        self.blocking(move |conn| {
            let tx = conn.transaction()?;

            let index: Option<String> = tx
                .query_row(
                    "SELECT student_index FROM records WHERE record_id = ?1",
                    params![id.as_str()],
                    |row| row.get(0),
                )
                .optional()?;

            let Some(index) = index else {
                return Ok(None);
            };

            let superseded = if valid {
                tx.execute(
                    "UPDATE records SET valid = 0
                     WHERE student_index = ?1 AND record_id <> ?2 AND valid = 1",
                    params![index, id.as_str()],
                )?
            } else {
                0
            };

            tx.execute(
                "UPDATE records SET valid = ?2 WHERE record_id = ?1",
                params![id.as_str(), valid],
            )?;

            let record = select_one(&tx, id.as_str())?.ok_or_else(|| {
                StoreError::InvalidData(format!("record {} vanished during update", id))
            })?;

            tx.commit()?;
            Ok(Some(Transition { record, superseded }))
        })
        .await
    }

    async fn set_ledger_ref(&self, id: &RecordId, ledger: &LedgerRef) -> Result<Option<Record>> {
        let id = id.clone();
        let ledger = ledger.clone();
        let block = to_sql_int(ledger.block_ref, "block")?;

        self.blocking(move |conn| {
            let updated = conn.execute(
                "UPDATE records SET ledger_id = ?2, ledger_tx = ?3, ledger_block = ?4
                 WHERE record_id = ?1",
                params![
                    id.as_str(),
                    ledger.ledger_id,
                    ledger.transaction_ref,
                    block
                ],
            )?;

            if updated == 0 {
                return Ok(None);
            }
            Ok(select_one(conn, id.as_str())?)
        })
        .await
    }

    async fn delete_record(&self, id: &RecordId) -> Result<bool> {
        let id = id.clone();

        self.blocking(move |conn| {
            let deleted = conn.execute(
                "DELETE FROM records WHERE record_id = ?1",
                params![id.as_str()],
            )?;
            Ok(deleted > 0)
        })
        .await
    }

    async fn get_record(&self, id: &RecordId) -> Result<Option<Record>> {
        let id = id.clone();
        self.blocking(move |conn| Ok(select_one(conn, id.as_str())?))
            .await
    }

    async fn records_by_index(&self, index: &StudentIndex) -> Result<Vec<Record>> {
        let index = index.clone();
        self.blocking(move |conn| {
            Ok(select_many(
                conn,
                "WHERE student_index = ?1",
                params![index.as_str()],
            )?)
        })
        .await
    }

    async fn current_valid(&self, index: &StudentIndex) -> Result<Option<Record>> {
        let index = index.clone();
        self.blocking(move |conn| {
            Ok(conn
                .query_row(
                    &format!(
                        "SELECT {} FROM records WHERE student_index = ?1 AND valid = 1 {} LIMIT 1",
                        RECORD_COLUMNS, RECENT_FIRST
                    ),
                    params![index.as_str()],
                    row_to_record,
                )
                .optional()?)
        })
        .await
    }

    async fn records_by_owner(&self, owner: &OwnerAddress) -> Result<Vec<Record>> {
        let owner = owner.clone();
        // Stored owners are lower-cased; lower() also covers rows written by
        // older tooling.
        self.blocking(move |conn| {
            Ok(select_many(
                conn,
                "WHERE lower(owner) = ?1",
                params![owner.as_str()],
            )?)
        })
        .await
    }

    async fn all_records(&self) -> Result<Vec<Record>> {
        self.blocking(|conn| Ok(select_many(conn, "", [])?)).await
    }

    async fn latest_record(&self) -> Result<Option<Record>> {
        self.blocking(|conn| {
            Ok(conn
                .query_row(
                    &format!("SELECT {} FROM records {} LIMIT 1", RECORD_COLUMNS, RECENT_FIRST),
                    [],
                    row_to_record,
                )
                .optional()?)
        })
        .await
    }

    async fn count_records(&self) -> Result<u64> {
        self.blocking(|conn| {
            let count: i64 = conn.query_row("SELECT COUNT(*) FROM records", [], |row| row.get(0))?;
            Ok(count as u64)
        })
        .await
    }

    async fn high_water(&self) -> Result<u64> {
        self.blocking(|conn| read_high_water(conn)).await
    }
}

#[async_trait]
impl RoleStore for SqliteStore {
    async fn get_role(&self, address: &OwnerAddress) -> Result<Option<Role>> {
        let address = address.clone();

        self.blocking(move |conn| {
            let role: Option<String> = conn
                .query_row(
                    "SELECT role FROM roles WHERE address = ?1",
                    params![address.as_str()],
                    |row| row.get(0),
                )
                .optional()?;

            role.map(|r| {
                r.parse::<Role>()
                    .map_err(|e| StoreError::InvalidData(e.to_string()))
            })
            .transpose()
        })
        .await
    }

    async fn upsert_role(&self, address: &OwnerAddress, role: Role) -> Result<()> {
        let address = address.clone();

        self.blocking(move |conn| {
            conn.execute(
                "INSERT INTO roles (address, role, updated_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(address) DO UPDATE SET role = excluded.role,
                                                    updated_at = excluded.updated_at",
                params![address.as_str(), role.as_str(), now_millis()],
            )?;
            Ok(())
        })
        .await
    }
}

/// Get current time in milliseconds.
fn now_millis() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or_default()
}
