//! In-memory implementation of the store traits.
//!
//! This is primarily for testing. It has the same semantics as SQLite
//! but keeps everything in memory with no persistence.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;

use diploma_registry_core::{LedgerRef, OwnerAddress, Record, RecordId, Role, StudentIndex};

use crate::error::{Result, StoreError};
use crate::traits::{InsertResult, RecordStore, RoleStore, Transition};

/// In-memory store implementation.
///
/// All data is lost when the store is dropped. Thread-safe via RwLock; every
/// write runs under the single write lock, which makes each write atomic.
pub struct MemoryStore {
    inner: RwLock<MemoryStoreInner>,
}

#[derive(Default)]
struct MemoryStoreInner {
    /// Records indexed by identifier.
    records: HashMap<RecordId, StoredRecord>,

    /// Insertion counter, the tie-break for equal creation times.
    next_seq: u64,

    /// Largest numeric identifier ever inserted. Never decreases.
    high_water: u64,

    /// Address → role mapping.
    roles: HashMap<OwnerAddress, Role>,
}

struct StoredRecord {
    record: Record,
    seq: u64,
}

impl StoredRecord {
    fn recency(&self) -> (i64, u64) {
        (self.record.created_at, self.seq)
    }
}

impl MemoryStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(MemoryStoreInner::default()),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, MemoryStoreInner>> {
        self.inner
            .read()
            .map_err(|e| StoreError::Poisoned(e.to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, MemoryStoreInner>> {
        self.inner
            .write()
            .map_err(|e| StoreError::Poisoned(e.to_string()))
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStoreInner {
    /// Records matching a filter, most-recent-first.
    fn select(&self, filter: impl Fn(&Record) -> bool) -> Vec<Record> {
        let mut matching: Vec<&StoredRecord> = self
            .records
            .values()
            .filter(|sr| filter(&sr.record))
            .collect();
        matching.sort_by_key(|sr| std::cmp::Reverse(sr.recency()));
        matching.into_iter().map(|sr| sr.record.clone()).collect()
    }

    /// Mark every valid record for `index` invalid, except `keep`.
    fn supersede(&mut self, index: &StudentIndex, keep: Option<&RecordId>) -> usize {
        let mut count = 0;
        for sr in self.records.values_mut() {
            let record = &mut sr.record;
            if record.valid && &record.student_index == index && Some(&record.id) != keep {
                record.valid = false;
                count += 1;
            }
        }
        count
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn insert_record(&self, record: &Record) -> Result<InsertResult> {
        let mut inner = self.write()?;

        let number = record.id.as_number();
        let retired = number.is_some_and(|n| n <= inner.high_water);
        if retired || inner.records.contains_key(&record.id) {
            return Ok(InsertResult::Conflict {
                existing: record.id.clone(),
            });
        }

        let superseded = if record.valid {
            inner.supersede(&record.student_index, None)
        } else {
            0
        };

        if let Some(n) = number {
            inner.high_water = n;
        }

        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.records.insert(
            record.id.clone(),
            StoredRecord {
                record: record.clone(),
                seq,
            },
        );

        Ok(InsertResult::Inserted { superseded })
    }

    async fn set_validity(&self, id: &RecordId, valid: bool) -> Result<Option<Transition>> {
        let mut inner = self.write()?;

        let index = match inner.records.get(id) {
            Some(sr) => sr.record.student_index.clone(),
            None => return Ok(None),
        };

        let superseded = if valid {
            inner.supersede(&index, Some(id))
        } else {
            0
        };

        let Some(sr) = inner.records.get_mut(id) else {
            return Ok(None);
        };
        sr.record.valid = valid;

        Ok(Some(Transition {
            record: sr.record.clone(),
            superseded,
        }))
    }

    async fn set_ledger_ref(&self, id: &RecordId, ledger: &LedgerRef) -> Result<Option<Record>> {
        let mut inner = self.write()?;
        Ok(inner.records.get_mut(id).map(|sr| {
            sr.record.ledger = Some(ledger.clone());
            sr.record.clone()
        }))
    }

    async fn delete_record(&self, id: &RecordId) -> Result<bool> {
        let mut inner = self.write()?;
        Ok(inner.records.remove(id).is_some())
    }

    async fn get_record(&self, id: &RecordId) -> Result<Option<Record>> {
        let inner = self.read()?;
        Ok(inner.records.get(id).map(|sr| sr.record.clone()))
    }

    async fn records_by_index(&self, index: &StudentIndex) -> Result<Vec<Record>> {
        let inner = self.read()?;
        Ok(inner.select(|r| &r.student_index == index))
    }

    async fn current_valid(&self, index: &StudentIndex) -> Result<Option<Record>> {
        let inner = self.read()?;
        Ok(inner
            .select(|r| r.valid && &r.student_index == index)
            .into_iter()
            .next())
    }

    async fn records_by_owner(&self, owner: &OwnerAddress) -> Result<Vec<Record>> {
        let inner = self.read()?;
        Ok(inner.select(|r| r.owner.as_ref() == Some(owner)))
    }

    async fn all_records(&self) -> Result<Vec<Record>> {
        let inner = self.read()?;
        Ok(inner.select(|_| true))
    }

    async fn latest_record(&self) -> Result<Option<Record>> {
        let inner = self.read()?;
        Ok(inner
            .records
            .values()
            .max_by_key(|sr| sr.recency())
            .map(|sr| sr.record.clone()))
    }

    async fn count_records(&self) -> Result<u64> {
        let inner = self.read()?;
        Ok(inner.records.len() as u64)
    }

    async fn high_water(&self) -> Result<u64> {
        Ok(self.read()?.high_water)
    }
}

#[async_trait]
impl RoleStore for MemoryStore {
    async fn get_role(&self, address: &OwnerAddress) -> Result<Option<Role>> {
        let inner = self.read()?;
        Ok(inner.roles.get(address).copied())
    }

    async fn upsert_role(&self, address: &OwnerAddress, role: Role) -> Result<()> {
        let mut inner = self.write()?;
        inner.roles.insert(address.clone(), role);
        Ok(())
    }
}
