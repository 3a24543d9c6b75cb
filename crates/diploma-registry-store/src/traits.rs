//! Store traits: the abstract interface for record and role persistence.
//!
//! These traits allow the registry to be storage-agnostic. Implementations
//! include SQLite (primary) and in-memory (for tests).

use async_trait::async_trait;
use diploma_registry_core::{LedgerRef, OwnerAddress, Record, RecordId, Role, StudentIndex};

use crate::error::Result;

/// Result of inserting a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertResult {
    /// Record was inserted. `superseded` counts the previously valid
    /// records for the same student index that were marked invalid.
    Inserted { superseded: usize },
    /// The identifier is taken, or was issued before and retired. Nothing
    /// changed.
    Conflict {
        /// The identifier that collided.
        existing: RecordId,
    },
}

/// Result of changing a record's validity.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    /// The record after the change.
    pub record: Record,
    /// Other records for the same student index marked invalid.
    pub superseded: usize,
}

/// The RecordStore trait: async interface for record persistence.
///
/// All methods are async to support both sync (SQLite) and async backends.
/// For SQLite, we use `spawn_blocking` internally to avoid blocking the runtime.
///
/// # Design Notes
///
/// - **Uniqueness**: identifiers are never reused. The store keeps a
///   high-water mark of the largest numeric identifier ever inserted; it only
///   grows, deletes included. Inserting an identifier that exists, or a
///   numeric one at or below the mark, returns `Conflict` and leaves the store
///   untouched.
/// - **Currency**: whenever a record becomes valid (on insert or via
///   [`set_validity`](RecordStore::set_validity)), every other valid record
///   with the same student index is marked invalid atomically with it.
/// - **Ordering**: every listing is most-recent-first.
#[async_trait]
pub trait RecordStore: Send + Sync {
    // ─────────────────────────────────────────────────────────────────────────
    // Write Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Insert a new record.
    ///
    /// # Returns
    /// - `Inserted` with the number of superseded records.
    /// - `Conflict` if the identifier is taken or was retired by the high-water mark.
    async fn insert_record(&self, record: &Record) -> Result<InsertResult>;

    /// Set a record's validity flag.
    ///
    /// Setting `valid = true` supersedes the other valid records for the
    /// record's student index in the same transaction. Returns `None` if the
    /// record does not exist.
    async fn set_validity(&self, id: &RecordId, valid: bool) -> Result<Option<Transition>>;

    /// Backfill the ledger reference of an existing record.
    ///
    /// Returns `None` if the record does not exist.
    async fn set_ledger_ref(&self, id: &RecordId, ledger: &LedgerRef) -> Result<Option<Record>>;

    /// Hard-delete a record. Returns `false` if it did not exist.
    async fn delete_record(&self, id: &RecordId) -> Result<bool>;

    // ─────────────────────────────────────────────────────────────────────────
    // Read Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Get a record by identifier.
    async fn get_record(&self, id: &RecordId) -> Result<Option<Record>>;

    /// All records for a student index, most-recent-first.
    async fn records_by_index(&self, index: &StudentIndex) -> Result<Vec<Record>>;

    /// The most recently created valid record for a student index.
    async fn current_valid(&self, index: &StudentIndex) -> Result<Option<Record>>;

    /// All records owned by an address, most-recent-first.
    async fn records_by_owner(&self, owner: &OwnerAddress) -> Result<Vec<Record>>;

    /// Every record, most-recent-first.
    async fn all_records(&self) -> Result<Vec<Record>>;

    /// The most recently created record system-wide.
    async fn latest_record(&self) -> Result<Option<Record>>;

    /// Total number of records.
    async fn count_records(&self) -> Result<u64>;

    /// The largest numeric identifier ever inserted, `0` for a fresh store.
    async fn high_water(&self) -> Result<u64>;
}

/// The RoleStore trait: the persisted address → role mapping.
#[async_trait]
pub trait RoleStore: Send + Sync {
    /// Look up the stored role of an address.
    async fn get_role(&self, address: &OwnerAddress) -> Result<Option<Role>>;

    /// Insert or replace the role of an address.
    async fn upsert_role(&self, address: &OwnerAddress, role: Role) -> Result<()>;
}

/// Extension trait for common store patterns.
pub trait RecordStoreExt: RecordStore {
    /// All valid records for a student index, most-recent-first.
    ///
    /// With the currency rule upheld this holds at most one record.
    fn valid_records(
        &self,
        index: &StudentIndex,
    ) -> impl std::future::Future<Output = Result<Vec<Record>>> + Send;
}

impl<S: RecordStore + ?Sized> RecordStoreExt for S {
    async fn valid_records(&self, index: &StudentIndex) -> Result<Vec<Record>> {
        let records = self.records_by_index(index).await?;
        Ok(records.into_iter().filter(|r| r.valid).collect())
    }
}
