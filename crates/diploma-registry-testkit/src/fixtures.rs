//! Test fixtures and helpers.
//!
//! Common setup code for integration tests.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use rand::RngCore;

use diploma_registry::{CreateOutcome, Gateways, QueryFacade, Registry, RegistryConfig};
use diploma_registry_core::{
    ContentAddress, ContentRefs, DiplomaDetails, NewDiploma, Record, RecordId,
    StudentIndex,
};
use diploma_registry_gateway::{MemoryContentGateway, MemoryLedger};
use diploma_registry_store::{MemoryStore, RecordStore, RecordStoreExt, SqliteStore, StoreError};

/// A registry wired to in-memory gateways the test can poke at.
pub struct TestFixture<S: RecordStore> {
    pub registry: Registry<S>,
    pub content: Arc<MemoryContentGateway>,
    pub ledger: Arc<MemoryLedger>,
}

impl TestFixture<MemoryStore> {
    /// Memory store, enabled ledger, default config.
    pub fn new() -> Self {
        Self::with_store(MemoryStore::new(), RegistryConfig::default())
    }

    /// Memory store with a ledger that reports itself disabled.
    pub fn ledger_disabled() -> Self {
        Self::with_ledger(
            MemoryStore::new(),
            MemoryLedger::disabled(),
            RegistryConfig::default(),
        )
    }
}

impl Default for TestFixture<MemoryStore> {
    fn default() -> Self {
        Self::new()
    }
}

impl TestFixture<SqliteStore> {
    /// In-memory SQLite store.
    pub fn sqlite() -> Result<Self, StoreError> {
        Ok(Self::with_store(
            SqliteStore::open_memory()?,
            RegistryConfig::default(),
        ))
    }

    /// SQLite store at a file path.
    pub fn sqlite_at(path: impl AsRef<Path>, config: RegistryConfig) -> Result<Self, StoreError> {
        Ok(Self::with_store(SqliteStore::open(path)?, config))
    }
}

impl<S: RecordStore> TestFixture<S> {
    /// Any store, enabled ledger.
    pub fn with_store(store: S, config: RegistryConfig) -> Self {
        Self::with_ledger(store, MemoryLedger::new(), config)
    }

    pub fn with_ledger(store: S, ledger: MemoryLedger, config: RegistryConfig) -> Self {
        let content = Arc::new(MemoryContentGateway::new());
        let ledger = Arc::new(ledger);
        let gateways = Gateways::new(content.clone()).with_ledger(ledger.clone());

        Self {
            registry: Registry::new(store, gateways, config),
            content,
            ledger,
        }
    }

    pub fn queries(&self) -> QueryFacade<S> {
        self.registry.queries()
    }

    /// Create a record for `index` from [`sample_diploma`] with no owner.
    pub async fn issue(&self, index: &str) -> diploma_registry::Result<CreateOutcome> {
        self.registry.create(&sample_diploma(index), sample_pdf()).await
    }

    /// Create a record for `index` owned by `owner`.
    pub async fn issue_to(
        &self,
        index: &str,
        owner: &str,
    ) -> diploma_registry::Result<CreateOutcome> {
        let input = sample_diploma(index).owner(owner);
        self.registry.create(&input, sample_pdf()).await
    }

    /// Every record currently valid for `index`.
    pub async fn valid_ids(&self, index: &str) -> diploma_registry::Result<Vec<RecordId>> {
        let records = self
            .registry
            .store()
            .valid_records(&StudentIndex::new(index))
            .await?;
        Ok(records.into_iter().map(|r| r.id).collect())
    }
}

/// A complete creation input for `index`.
pub fn sample_diploma(index: &str) -> NewDiploma {
    NewDiploma::new(index, "Ana", "Petrovic")
        .program("Software Engineering")
        .credits("240")
        .graduation_date("2024-07-01")
        .final_grade("9,12")
        .university("University of Novi Sad")
        .faculty("Faculty of Technical Sciences")
        .subjects(r#"{"Algorithms": 10, "Databases": 9}"#)
}

/// A small document payload.
pub fn sample_pdf() -> Bytes {
    Bytes::from_static(b"%PDF-1.7\n1 0 obj << /Type /Catalog >> endobj\n%%EOF")
}

/// A random address in upper-case hex, to exercise normalization.
pub fn random_owner() -> String {
    let mut bytes = [0u8; 20];
    rand::thread_rng().fill_bytes(&mut bytes);
    format!("0x{}", hex::encode_upper(bytes))
}

/// Default config with timeouts short enough for slow-gateway tests.
pub fn fast_timeouts() -> RegistryConfig {
    RegistryConfig {
        ledger_timeout_ms: 50,
        content_timeout_ms: 200,
        ..RegistryConfig::default()
    }
}

/// How long a gateway must stall to trip [`fast_timeouts`].
pub const STALL: Duration = Duration::from_secs(2);

/// A record written straight to a store, bypassing the registry.
pub fn bare_record(id: &str, index: &str, valid: bool, created_at: i64) -> Record {
    Record {
        id: RecordId::new(id),
        student_index: StudentIndex::new(index),
        owner: None,
        valid,
        content: ContentRefs {
            primary_document: ContentAddress::new(format!("pdf-{}", id)),
            verification_image: ContentAddress::new(format!("qr-{}", id)),
            metadata_document: ContentAddress::new(format!("meta-{}", id)),
        },
        ledger: None,
        details: DiplomaDetails {
            student_name: "Imported Record".into(),
            ..Default::default()
        },
        created_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_owner_shape() {
        let owner = random_owner();
        assert_eq!(owner.len(), 42);
        assert!(owner.starts_with("0x"));
        assert_ne!(owner, random_owner());
    }

    #[test]
    fn test_sample_diploma_is_valid() {
        let input = sample_diploma("201234");
        assert!(diploma_registry_core::validate_new_diploma(&input, &sample_pdf()).is_ok());
        assert_eq!(input.details().unwrap().credits, Some(240));
    }
}
