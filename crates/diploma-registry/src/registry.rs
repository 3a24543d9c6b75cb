//! The Registry: lifecycle coordination for diploma records.
//!
//! The Registry owns the write path. It validates input, pushes payloads to
//! content storage, commits records to the store, and mirrors each change to
//! the ledger on a best-effort basis.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;

use diploma_registry_core::{
    validate_new_diploma, ContentAddress, ContentRefs, DiplomaDetails, LedgerRef,
    MetadataDocument, NewDiploma, OwnerAddress, Record, RecordId, Role, StudentIndex,
};
use diploma_registry_gateway::{
    ContentError, ContentGateway, DisabledLedger, LedgerGateway, LedgerReceipt, TextRenderer,
    TxReceipt, VerificationRenderer,
};
use diploma_registry_store::{InsertResult, RecordStore, RoleStore};

use crate::allocator::IdentifierAllocator;
use crate::config::RegistryConfig;
use crate::error::{RegistryError, Result};
use crate::mirror::{self, LedgerSync, LocalOnlyReason};
use crate::query::QueryFacade;
use crate::roles::RoleDirectory;

/// The external collaborators a registry talks to.
#[derive(Clone)]
pub struct Gateways {
    pub content: Arc<dyn ContentGateway>,
    pub ledger: Arc<dyn LedgerGateway>,
    pub renderer: Arc<dyn VerificationRenderer>,
}

impl Gateways {
    /// Content storage only: the ledger is disabled and verification images
    /// are rendered as text.
    pub fn new(content: Arc<dyn ContentGateway>) -> Self {
        Self {
            content,
            ledger: Arc::new(DisabledLedger),
            renderer: Arc::new(TextRenderer),
        }
    }

    pub fn with_ledger(mut self, ledger: Arc<dyn LedgerGateway>) -> Self {
        self.ledger = ledger;
        self
    }

    pub fn with_renderer(mut self, renderer: Arc<dyn VerificationRenderer>) -> Self {
        self.renderer = renderer;
        self
    }
}

/// Result of a successful Create.
#[derive(Debug, Clone)]
pub struct CreateOutcome {
    /// The persisted record, with its ledger reference if the mint succeeded.
    pub record: Record,
    /// Previously valid records for the same index that were marked invalid.
    pub superseded: usize,
    /// Identifiers tried before one stuck.
    pub attempts: u32,
    pub ledger: LedgerSync<LedgerReceipt>,
}

/// Result of a successful Validate or Invalidate.
#[derive(Debug, Clone)]
pub struct TransitionOutcome {
    pub record: Record,
    pub superseded: usize,
    pub ledger: LedgerSync<TxReceipt>,
}

/// A record together with what the ledger currently says about it.
#[derive(Debug, Clone)]
pub struct Verification {
    pub record: Record,
    /// `None` when the record was never minted or the ledger could not be
    /// read.
    pub ledger_valid: Option<bool>,
}

/// The lifecycle coordinator.
///
/// Provides:
/// - Creating records (with content upload and ledger mint)
/// - Validating and invalidating records
/// - Deleting records
/// - Read-side queries and role lookup
///
/// At most one record per student index is valid at a time. The store makes
/// "mark the others invalid" and "insert or flip this one" a single atomic
/// write, so concurrent writers for the same index cannot both end valid.
pub struct Registry<S: RecordStore> {
    store: Arc<S>,
    gateways: Gateways,
    allocator: IdentifierAllocator<S>,
    config: Arc<RegistryConfig>,
    /// Loaded once from configuration, never mutated.
    overrides: Arc<HashMap<OwnerAddress, Role>>,
}

impl<S: RecordStore> Registry<S> {
    /// Create a registry over a store.
    pub fn new(store: S, gateways: Gateways, config: RegistryConfig) -> Self {
        Self::with_shared_store(Arc::new(store), gateways, config)
    }

    /// Create a registry over a store that is also used elsewhere.
    pub fn with_shared_store(store: Arc<S>, gateways: Gateways, config: RegistryConfig) -> Self {
        let overrides = Arc::new(config.role_overrides());
        Self {
            allocator: IdentifierAllocator::new(Arc::clone(&store)),
            store,
            gateways,
            config: Arc::new(config),
            overrides,
        }
    }

    /// Get the store reference.
    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Read-side queries over the same store.
    pub fn queries(&self) -> QueryFacade<S> {
        QueryFacade::new(Arc::clone(&self.store), Arc::clone(&self.config))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Create
    // ─────────────────────────────────────────────────────────────────────────

    /// Issue a new record for `input.student_index`.
    ///
    /// Every valid record already held for the index is marked invalid when
    /// the new record is committed, whatever its contents. Content storage
    /// failures abort with nothing persisted; ledger failures are absorbed
    /// and reported in [`CreateOutcome::ledger`].
    pub async fn create(&self, input: &NewDiploma, document: Bytes) -> Result<CreateOutcome> {
        let started = Instant::now();

        validate_new_diploma(input, &document)?;
        let details = input.details()?;
        let index = &input.student_index;

        tracing::info!(index = %index, owner = ?input.owner_address(), "creating record");

        let max_attempts = self.config.max_allocation_attempts.max(1);
        let mut id = self.allocator.next().await?;
        let mut attempt = 0;

        loop {
            attempt += 1;

            // Content names embed the identifier, so each attempt uploads
            // afresh. Blobs from a lost attempt stay behind unreferenced.
            let content = self.upload_content(&id, index, &details, &document).await?;

            let record = Record {
                id: id.clone(),
                student_index: index.clone(),
                owner: input.owner_address().cloned(),
                valid: true,
                content,
                ledger: None,
                details: details.clone(),
                created_at: now_millis(),
            };

            match self.store.insert_record(&record).await? {
                InsertResult::Inserted { superseded } => {
                    if superseded > 0 {
                        tracing::info!(index = %index, superseded, "superseded previous records");
                    }

                    let (record, ledger) = self.mint(record).await;

                    tracing::info!(
                        record_id = %record.id,
                        index = %index,
                        attempt,
                        ledger = ?ledger.reason(),
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "record created"
                    );

                    return Ok(CreateOutcome {
                        record,
                        superseded,
                        attempts: attempt,
                        ledger,
                    });
                }
                InsertResult::Conflict { existing } => {
                    tracing::warn!(record_id = %existing, attempt, "identifier taken; reallocating");
                    if attempt >= max_attempts {
                        return Err(RegistryError::Conflict {
                            attempts: attempt,
                            last: existing,
                        });
                    }
                    id = self.allocator.next_after(&existing).await?;
                }
            }
        }
    }

    /// Store the document, the verification image and the metadata document.
    async fn upload_content(
        &self,
        id: &RecordId,
        index: &StudentIndex,
        details: &DiplomaDetails,
        document: &Bytes,
    ) -> Result<ContentRefs> {
        let primary_document = self
            .store_content(&format!("diploma_{}.pdf", id), document.clone())
            .await?;

        let target = self.config.verify_url(id);
        let image = self.gateways.renderer.render(&target)?;
        let verification_image = self
            .store_content(&format!("qr_{}.png", id), image)
            .await?;

        let metadata =
            MetadataDocument::build(index, details, &primary_document, &verification_image);
        let metadata_document = self
            .store_content(&format!("metadata_{}", id), Bytes::from(metadata.to_bytes()?))
            .await?;

        Ok(ContentRefs {
            primary_document,
            verification_image,
            metadata_document,
        })
    }

    async fn store_content(&self, name: &str, bytes: Bytes) -> Result<ContentAddress> {
        let timeout = self.config.content_timeout();
        let address = tokio::time::timeout(timeout, self.gateways.content.store(name, bytes))
            .await
            .map_err(|_| ContentError::Timeout(timeout))??;

        tracing::debug!(name, address = %address, "content stored");
        Ok(address)
    }

    /// Mint a freshly committed record and backfill its ledger reference.
    async fn mint(&self, record: Record) -> (Record, LedgerSync<LedgerReceipt>) {
        let ledger = &self.gateways.ledger;

        if !ledger.enabled() {
            tracing::debug!(record_id = %record.id, "ledger disabled; mint skipped");
            return (record, LedgerSync::LocalOnly(LocalOnlyReason::Disabled));
        }

        let Some(request) = mirror::mint_request(&record) else {
            tracing::debug!(record_id = %record.id, "no owner; mint skipped");
            return (record, LedgerSync::LocalOnly(LocalOnlyReason::NoOwner));
        };

        let sync = mirror::settle(
            "mint",
            &record.id,
            self.config.ledger_timeout(),
            ledger.mint(&request),
        )
        .await;

        let receipt = match sync {
            LedgerSync::Committed(receipt) => receipt,
            local => return (record, local),
        };

        let ledger_ref = LedgerRef {
            ledger_id: receipt.ledger_id.clone(),
            transaction_ref: receipt.transaction_ref.clone(),
            block_ref: receipt.block_ref,
        };

        match self.store.set_ledger_ref(&record.id, &ledger_ref).await {
            Ok(Some(updated)) => {
                tracing::info!(
                    record_id = %updated.id,
                    ledger_id = %receipt.ledger_id,
                    block = receipt.block_ref,
                    "minted on ledger"
                );
                (updated, LedgerSync::Committed(receipt))
            }
            Ok(None) => {
                tracing::warn!(
                    record_id = %record.id,
                    ledger_id = %receipt.ledger_id,
                    "record removed before its ledger reference was stored"
                );
                let reason = LocalOnlyReason::Failed("record removed before backfill".into());
                (record, LedgerSync::LocalOnly(reason))
            }
            Err(e) => {
                tracing::error!(
                    record_id = %record.id,
                    ledger_id = %receipt.ledger_id,
                    error = %e,
                    "minted but ledger reference not stored"
                );
                let reason = LocalOnlyReason::Failed(format!("backfill failed: {}", e));
                (record, LedgerSync::LocalOnly(reason))
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // State Transitions
    // ─────────────────────────────────────────────────────────────────────────

    /// Make a record the valid one for its student index.
    pub async fn validate(&self, id: &RecordId) -> Result<TransitionOutcome> {
        let transition = self.store.set_validity(id, true).await?.ok_or_else(|| {
            tracing::debug!(record_id = %id, "validate: not found");
            RegistryError::RecordNotFound(id.clone())
        })?;

        let record = transition.record;
        if transition.superseded > 0 {
            tracing::info!(
                index = %record.student_index,
                superseded = transition.superseded,
                "superseded previous records"
            );
        }

        let ledger = match self.ledger_target(&record) {
            Ok(ledger_id) => {
                mirror::settle(
                    "validate",
                    &record.id,
                    self.config.ledger_timeout(),
                    self.gateways.ledger.validate(ledger_id),
                )
                .await
            }
            Err(reason) => LedgerSync::LocalOnly(reason),
        };

        tracing::info!(record_id = %record.id, ledger = ?ledger.reason(), "record validated");
        Ok(TransitionOutcome {
            record,
            superseded: transition.superseded,
            ledger,
        })
    }

    /// Mark a record invalid. `reason` defaults to the configured one.
    pub async fn invalidate(&self, id: &RecordId, reason: Option<&str>) -> Result<TransitionOutcome> {
        let reason = reason
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .unwrap_or(self.config.default_invalidation_reason.as_str());

        let transition = self.store.set_validity(id, false).await?.ok_or_else(|| {
            tracing::debug!(record_id = %id, "invalidate: not found");
            RegistryError::RecordNotFound(id.clone())
        })?;

        let record = transition.record;
        let ledger = match self.ledger_target(&record) {
            Ok(ledger_id) => {
                mirror::settle(
                    "invalidate",
                    &record.id,
                    self.config.ledger_timeout(),
                    self.gateways.ledger.invalidate(ledger_id, reason),
                )
                .await
            }
            Err(reason) => LedgerSync::LocalOnly(reason),
        };

        tracing::info!(record_id = %record.id, reason, ledger = ?ledger.reason(), "record invalidated");
        Ok(TransitionOutcome {
            record,
            superseded: transition.superseded,
            ledger,
        })
    }

    /// Hard-delete a record. The ledger is not told.
    pub async fn delete(&self, id: &RecordId) -> Result<()> {
        if !self.store.delete_record(id).await? {
            tracing::debug!(record_id = %id, "delete: not found");
            return Err(RegistryError::RecordNotFound(id.clone()));
        }

        tracing::info!(record_id = %id, "record deleted");
        Ok(())
    }

    /// Look up a record and read its validity from the ledger when possible.
    pub async fn verify(&self, id: &RecordId) -> Result<Verification> {
        let record = self.queries().by_identifier(id).await?;

        let ledger_valid = match self.ledger_target(&record) {
            Ok(ledger_id) => {
                let timeout = self.config.ledger_timeout();
                match tokio::time::timeout(timeout, self.gateways.ledger.is_valid(ledger_id)).await
                {
                    Ok(Ok(valid)) => Some(valid),
                    Ok(Err(e)) => {
                        tracing::warn!(record_id = %id, error = %e, "ledger validity unavailable");
                        None
                    }
                    Err(_) => {
                        tracing::warn!(record_id = %id, ?timeout, "ledger validity read timed out");
                        None
                    }
                }
            }
            Err(_) => None,
        };

        Ok(Verification {
            record,
            ledger_valid,
        })
    }

    /// The ledger token to mirror a transition to, or why there is none.
    fn ledger_target<'a>(
        &self,
        record: &'a Record,
    ) -> std::result::Result<&'a str, LocalOnlyReason> {
        if !self.gateways.ledger.enabled() {
            return Err(LocalOnlyReason::Disabled);
        }
        record.ledger_id().ok_or(LocalOnlyReason::NotMinted)
    }
}

impl<S: RecordStore + RoleStore> Registry<S> {
    /// Role lookup over the same store, with the configured overrides.
    pub fn roles(&self) -> RoleDirectory<S> {
        RoleDirectory::new(Arc::clone(&self.store), Arc::clone(&self.overrides))
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
