//! Read-side lookups over the record store.

use std::sync::Arc;

use serde::Serialize;

use diploma_registry_core::{OwnerAddress, Record, RecordId, StudentIndex};
use diploma_registry_store::RecordStore;

use crate::config::RegistryConfig;
use crate::error::{RegistryError, Result};

/// A record with its content addresses resolved to gateway URLs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordView {
    #[serde(flatten)]
    pub record: Record,
    pub pdf_url: String,
    pub metadata_url: String,
    pub qr_url: String,
}

/// Read-only queries. Every listing is most-recent-first.
pub struct QueryFacade<S: RecordStore> {
    store: Arc<S>,
    config: Arc<RegistryConfig>,
}

impl<S: RecordStore> Clone for QueryFacade<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            config: Arc::clone(&self.config),
        }
    }
}

impl<S: RecordStore> QueryFacade<S> {
    pub fn new(store: Arc<S>, config: Arc<RegistryConfig>) -> Self {
        Self { store, config }
    }

    /// Exact lookup by identifier.
    pub async fn by_identifier(&self, id: &RecordId) -> Result<Record> {
        self.store
            .get_record(id)
            .await?
            .ok_or_else(|| RegistryError::RecordNotFound(id.clone()))
    }

    /// Every record for a student index, valid or not.
    pub async fn by_index(&self, index: &StudentIndex) -> Result<Vec<Record>> {
        Ok(self.store.records_by_index(index).await?)
    }

    /// The most recently created valid record for a student index.
    ///
    /// Fails with `NoValidRecord` when only invalid records exist.
    pub async fn current_valid_by_index(&self, index: &StudentIndex) -> Result<Record> {
        self.store
            .current_valid(index)
            .await?
            .ok_or_else(|| RegistryError::NoValidRecord(index.clone()))
    }

    /// Records owned by an address, compared case-insensitively.
    pub async fn by_owner(&self, owner: &str) -> Result<Vec<Record>> {
        let owner = OwnerAddress::new(owner);
        if owner.as_str().is_empty() {
            return Ok(Vec::new());
        }
        Ok(self.store.records_by_owner(&owner).await?)
    }

    /// Every record.
    pub async fn all(&self) -> Result<Vec<Record>> {
        Ok(self.store.all_records().await?)
    }

    /// Resolve a record's content addresses against the content gateway.
    pub fn view(&self, record: Record) -> RecordView {
        let content = &record.content;
        RecordView {
            pdf_url: self.config.content_url(&content.primary_document),
            metadata_url: self.config.content_url(&content.metadata_document),
            qr_url: self.config.content_url(&content.verification_image),
            record,
        }
    }

    /// [`view`](Self::view) over a listing.
    pub fn views(&self, records: Vec<Record>) -> Vec<RecordView> {
        records.into_iter().map(|r| self.view(r)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use diploma_registry_core::{ContentAddress, ContentRefs, DiplomaDetails};
    use diploma_registry_store::MemoryStore;

    fn record(id: u64, index: &str, owner: Option<&str>, valid: bool, created_at: i64) -> Record {
        Record {
            id: RecordId::from_number(id),
            student_index: StudentIndex::new(index),
            owner: owner.map(OwnerAddress::new),
            valid,
            content: ContentRefs {
                primary_document: ContentAddress::new(format!("pdf{}", id)),
                verification_image: ContentAddress::new(format!("qr{}", id)),
                metadata_document: ContentAddress::new(format!("meta{}", id)),
            },
            ledger: None,
            details: DiplomaDetails::default(),
            created_at,
        }
    }

    async fn facade(records: &[Record]) -> QueryFacade<MemoryStore> {
        let store = Arc::new(MemoryStore::new());
        for r in records {
            store.insert_record(r).await.unwrap();
        }
        QueryFacade::new(store, Arc::new(RegistryConfig::default()))
    }

    #[tokio::test]
    async fn test_by_identifier_not_found() {
        let queries = facade(&[]).await;
        let err = queries
            .by_identifier(&RecordId::from_number(9))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_current_valid_ignores_invalid() {
        let queries = facade(&[record(1, "201234", None, false, 1000)]).await;
        let index = StudentIndex::new("201234");

        assert_eq!(queries.by_index(&index).await.unwrap().len(), 1);
        assert!(matches!(
            queries.current_valid_by_index(&index).await,
            Err(RegistryError::NoValidRecord(_))
        ));
    }

    #[tokio::test]
    async fn test_by_owner_case_insensitive() {
        let queries = facade(&[
            record(1, "a", Some("0xAbC"), true, 1000),
            record(2, "b", Some("0xdef"), true, 2000),
        ])
        .await;

        let found = queries.by_owner("0XABC").await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id.as_str(), "1");

        assert!(queries.by_owner("  ").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_view_resolves_urls() {
        let queries = facade(&[]).await;
        let view = queries.view(record(3, "a", None, true, 0));

        assert_eq!(view.pdf_url, "https://gateway.pinata.cloud/ipfs/pdf3");
        assert_eq!(view.qr_url, "https://gateway.pinata.cloud/ipfs/qr3");
        assert_eq!(view.metadata_url, "https://gateway.pinata.cloud/ipfs/meta3");

        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["id"], "3");
        assert_eq!(json["pdf_url"], view.pdf_url);
    }
}
