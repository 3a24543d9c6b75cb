//! Identifier allocation.
//!
//! The allocator only proposes the next identifier. Uniqueness is settled by
//! the store, which rejects an identifier that exists or was ever issued; the
//! caller then asks for a new proposal above the rejected one.

use std::sync::Arc;

use diploma_registry_core::RecordId;
use diploma_registry_store::{RecordStore, Result, StoreError};

/// Proposes record identifiers from the current store contents.
pub struct IdentifierAllocator<S: RecordStore> {
    store: Arc<S>,
}

impl<S: RecordStore> IdentifierAllocator<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Propose the next identifier.
    ///
    /// One past the store's high-water mark, so a deleted identifier is never
    /// offered again. The most recently created record's identifier plus one
    /// (or the record count plus one) is used when it is larger. An empty
    /// store yields `1`.
    pub async fn next(&self) -> Result<RecordId> {
        let floor = successor(self.store.high_water().await?)?;

        let latest = self
            .store
            .latest_record()
            .await?
            .and_then(|r| r.id.as_number())
            .and_then(|n| n.checked_add(1));
        let hint = match latest {
            Some(n) => n,
            None => self.store.count_records().await?.saturating_add(1),
        };

        Ok(RecordId::from_number(hint.max(floor)))
    }

    /// Propose an identifier after `rejected` lost a uniqueness race.
    ///
    /// Never returns a value at or below a numeric `rejected`.
    pub async fn next_after(&self, rejected: &RecordId) -> Result<RecordId> {
        let proposal = self.next().await?;

        let floor = match rejected.as_number() {
            Some(n) => successor(n)?,
            None => return Ok(proposal),
        };

        match proposal.as_number() {
            Some(n) if n >= floor => Ok(proposal),
            _ => Ok(RecordId::from_number(floor)),
        }
    }
}

fn successor(n: u64) -> Result<u64> {
    n.checked_add(1)
        .ok_or_else(|| StoreError::InvalidData("identifier space exhausted".into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use diploma_registry_core::{ContentAddress, ContentRefs, DiplomaDetails, Record, StudentIndex};
    use diploma_registry_store::MemoryStore;

    fn record(id: &str, created_at: i64) -> Record {
        Record {
            id: RecordId::new(id),
            student_index: StudentIndex::new("201234"),
            owner: None,
            valid: false,
            content: ContentRefs {
                primary_document: ContentAddress::new("pdf"),
                verification_image: ContentAddress::new("qr"),
                metadata_document: ContentAddress::new("meta"),
            },
            ledger: None,
            details: DiplomaDetails::default(),
            created_at,
        }
    }

    #[tokio::test]
    async fn test_empty_store_starts_at_one() {
        let allocator = IdentifierAllocator::new(Arc::new(MemoryStore::new()));
        assert_eq!(allocator.next().await.unwrap().as_str(), "1");
    }

    #[tokio::test]
    async fn test_follows_latest_record() {
        let store = Arc::new(MemoryStore::new());
        store.insert_record(&record("6", 1000)).await.unwrap();
        store.insert_record(&record("7", 2000)).await.unwrap();

        let allocator = IdentifierAllocator::new(store);
        assert_eq!(allocator.next().await.unwrap().as_str(), "8");
    }

    #[tokio::test]
    async fn test_deleted_latest_not_reoffered() {
        let store = Arc::new(MemoryStore::new());
        store.insert_record(&record("1", 1000)).await.unwrap();
        store.insert_record(&record("2", 2000)).await.unwrap();
        store.delete_record(&RecordId::new("2")).await.unwrap();

        let allocator = IdentifierAllocator::new(Arc::clone(&store));
        assert_eq!(allocator.next().await.unwrap().as_str(), "3");

        store.delete_record(&RecordId::new("1")).await.unwrap();
        assert_eq!(allocator.next().await.unwrap().as_str(), "3");
    }

    #[tokio::test]
    async fn test_largest_identifier_does_not_overflow() {
        let store = Arc::new(MemoryStore::new());
        store
            .insert_record(&record(&u64::MAX.to_string(), 1000))
            .await
            .unwrap();
        let allocator = IdentifierAllocator::new(store);

        assert!(matches!(
            allocator.next().await,
            Err(StoreError::InvalidData(_))
        ));
        assert!(matches!(
            allocator.next_after(&RecordId::from_number(u64::MAX)).await,
            Err(StoreError::InvalidData(_))
        ));
    }

    #[tokio::test]
    async fn test_non_numeric_latest_falls_back_to_count() {
        let store = Arc::new(MemoryStore::new());
        store.insert_record(&record("1", 1000)).await.unwrap();
        store.insert_record(&record("legacy-a", 2000)).await.unwrap();

        let allocator = IdentifierAllocator::new(store);
        assert_eq!(allocator.next().await.unwrap().as_str(), "3");
    }

    #[tokio::test]
    async fn test_next_after_respects_floor() {
        let store = Arc::new(MemoryStore::new());
        store.insert_record(&record("1", 1000)).await.unwrap();
        let allocator = IdentifierAllocator::new(store);

        let rejected = RecordId::from_number(5);
        assert_eq!(allocator.next_after(&rejected).await.unwrap().as_str(), "6");

        let stale = RecordId::from_number(1);
        assert_eq!(allocator.next_after(&stale).await.unwrap().as_str(), "2");

        let legacy = RecordId::new("legacy-a");
        assert_eq!(allocator.next_after(&legacy).await.unwrap().as_str(), "2");
    }
}
