//! Ledger abstraction.
//!
//! The ledger is a best-effort, independently failing mirror of the record
//! store. Implementations talk to a smart contract, a test chain, or keep
//! tokens in memory.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use diploma_registry_core::OwnerAddress;

use crate::error::LedgerError;

/// Result type for ledger operations.
pub type Result<T> = std::result::Result<T, LedgerError>;

/// Receipt of a successful mint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerReceipt {
    /// Token identifier assigned by the ledger.
    pub ledger_id: String,
    pub transaction_ref: String,
    pub block_ref: u64,
}

/// Receipt of a state-changing transaction on an existing token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxReceipt {
    pub transaction_ref: String,
    pub block_ref: u64,
}

/// Who the diploma was issued to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    pub first_name: String,
    pub last_name: String,
    pub student_index: String,
}

/// Institution fields mirrored alongside the grades.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Transcript {
    pub university: String,
    pub faculty: String,
    pub program: String,
}

/// Academic fields mirrored to the ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcademicRecord {
    pub field_of_study: String,
    /// Subject grades; raw subjects text arrives as `{"subjects": <text>}`.
    pub grades: Map<String, Value>,
    pub credits: u32,
    pub gpa: f64,
    pub graduation_date: String,
    pub transcript: Transcript,
}

impl AcademicRecord {
    /// GPA as the ledger stores it: hundredths, truncated.
    pub fn gpa_hundredths(&self) -> u32 {
        if self.gpa.is_finite() && self.gpa > 0.0 {
            (self.gpa * 100.0).floor() as u32
        } else {
            0
        }
    }
}

/// Everything needed to mint a diploma token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MintRequest {
    pub owner: OwnerAddress,
    pub identity: Identity,
    pub academic: AcademicRecord,
    /// `ipfs://` URI of the metadata document.
    pub token_uri: String,
}

/// Ledger gateway trait.
///
/// Implementations must be thread-safe (Send + Sync). Callers check
/// [`enabled`](LedgerGateway::enabled) first; a disabled ledger is skipped
/// entirely rather than called.
#[async_trait]
pub trait LedgerGateway: Send + Sync {
    /// Whether ledger mirroring is switched on.
    fn enabled(&self) -> bool;

    /// Mint a new diploma token.
    async fn mint(&self, request: &MintRequest) -> Result<LedgerReceipt>;

    /// Mark a token valid.
    async fn validate(&self, ledger_id: &str) -> Result<TxReceipt>;

    /// Mark a token invalid, recording the reason on the ledger.
    async fn invalidate(&self, ledger_id: &str, reason: &str) -> Result<TxReceipt>;

    /// Read a token's validity flag.
    async fn is_valid(&self, ledger_id: &str) -> Result<bool>;
}

/// A ledger that is switched off.
///
/// Every call fails with [`LedgerError::Disabled`].
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledLedger;

#[async_trait]
impl LedgerGateway for DisabledLedger {
    fn enabled(&self) -> bool {
        false
    }

    async fn mint(&self, _request: &MintRequest) -> Result<LedgerReceipt> {
        Err(LedgerError::Disabled)
    }

    async fn validate(&self, _ledger_id: &str) -> Result<TxReceipt> {
        Err(LedgerError::Disabled)
    }

    async fn invalidate(&self, _ledger_id: &str, _reason: &str) -> Result<TxReceipt> {
        Err(LedgerError::Disabled)
    }

    async fn is_valid(&self, _ledger_id: &str) -> Result<bool> {
        Err(LedgerError::Disabled)
    }
}

/// A simple in-memory ledger for testing.
///
/// Tokens are numbered from 1 and every transaction lands in its own block.
/// Supports injecting outages and latency.
pub mod memory {
    use super::*;
    use std::collections::BTreeMap;
    use std::time::Duration;
    use tokio::sync::RwLock;

    /// A minted token as the ledger sees it.
    #[derive(Debug, Clone, PartialEq)]
    pub struct LedgerToken {
        pub owner: OwnerAddress,
        pub request: MintRequest,
        pub valid: bool,
        pub invalidation_reason: Option<String>,
        pub minted_in: u64,
    }

    #[derive(Default)]
    struct LedgerState {
        tokens: BTreeMap<u64, LedgerToken>,
        next_token: u64,
        block: u64,
        transactions: u64,
    }

    impl LedgerState {
        /// Advance to the next block and derive a transaction hash for it.
        fn next_tx(&mut self, op: &str, token: u64) -> TxReceipt {
            self.block += 1;
            self.transactions += 1;

            let mut hasher = blake3::Hasher::new();
            hasher.update(op.as_bytes());
            hasher.update(&token.to_be_bytes());
            hasher.update(&self.block.to_be_bytes());

            TxReceipt {
                transaction_ref: format!("0x{}", hex::encode(hasher.finalize().as_bytes())),
                block_ref: self.block,
            }
        }

        fn token_mut(&mut self, ledger_id: &str) -> Result<(u64, &mut LedgerToken)> {
            let id = parse_token_id(ledger_id)?;
            self.tokens
                .get_mut(&id)
                .map(|t| (id, t))
                .ok_or_else(|| LedgerError::UnknownToken(ledger_id.to_string()))
        }
    }

    fn parse_token_id(ledger_id: &str) -> Result<u64> {
        ledger_id
            .parse()
            .map_err(|_| LedgerError::UnknownToken(ledger_id.to_string()))
    }

    #[derive(Default)]
    struct Faults {
        offline: bool,
        delay: Option<Duration>,
    }

    /// In-memory ledger implementation.
    pub struct MemoryLedger {
        enabled: bool,
        state: RwLock<LedgerState>,
        faults: RwLock<Faults>,
    }

    impl MemoryLedger {
        /// Create an enabled, empty ledger.
        pub fn new() -> Self {
            Self {
                enabled: true,
                state: RwLock::new(LedgerState {
                    next_token: 1,
                    ..Default::default()
                }),
                faults: RwLock::new(Faults::default()),
            }
        }

        /// Make every call fail with `Unavailable`.
        pub async fn set_offline(&self, offline: bool) {
            self.faults.write().await.offline = offline;
        }

        /// Delay every call.
        pub async fn set_delay(&self, delay: Option<Duration>) {
            self.faults.write().await.delay = delay;
        }

        /// Look up a minted token.
        pub async fn token(&self, ledger_id: &str) -> Option<LedgerToken> {
            let id = parse_token_id(ledger_id).ok()?;
            self.state.read().await.tokens.get(&id).cloned()
        }

        /// Number of minted tokens.
        pub async fn token_count(&self) -> usize {
            self.state.read().await.tokens.len()
        }

        /// Number of committed transactions of any kind.
        pub async fn transaction_count(&self) -> u64 {
            self.state.read().await.transactions
        }

        async fn check_faults(&self) -> Result<()> {
            let delay = {
                let faults = self.faults.read().await;
                if faults.offline {
                    return Err(LedgerError::Unavailable("node offline".into()));
                }
                faults.delay
            };
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            Ok(())
        }
    }

    impl MemoryLedger {
        /// A ledger that reports itself switched off but would otherwise work.
        pub fn disabled() -> Self {
            Self {
                enabled: false,
                ..Self::new()
            }
        }
    }

    impl Default for MemoryLedger {
        fn default() -> Self {
            Self::new()
        }
    }

    #[async_trait]
    impl LedgerGateway for MemoryLedger {
        fn enabled(&self) -> bool {
            self.enabled
        }

        async fn mint(&self, request: &MintRequest) -> Result<LedgerReceipt> {
            self.check_faults().await?;

            let mut state = self.state.write().await;
            let token = state.next_token;
            state.next_token += 1;

            let tx = state.next_tx("mint", token);
            state.tokens.insert(
                token,
                LedgerToken {
                    owner: request.owner.clone(),
                    request: request.clone(),
                    valid: true,
                    invalidation_reason: None,
                    minted_in: tx.block_ref,
                },
            );

            tracing::trace!(token, block = tx.block_ref, "minted token");
            Ok(LedgerReceipt {
                ledger_id: token.to_string(),
                transaction_ref: tx.transaction_ref,
                block_ref: tx.block_ref,
            })
        }

        async fn validate(&self, ledger_id: &str) -> Result<TxReceipt> {
            self.check_faults().await?;

            let mut state = self.state.write().await;
            let (id, token) = state.token_mut(ledger_id)?;
            if token.valid {
                return Err(LedgerError::Reverted("diploma already valid".into()));
            }
            token.valid = true;
            token.invalidation_reason = None;
            Ok(state.next_tx("validate", id))
        }

        async fn invalidate(&self, ledger_id: &str, reason: &str) -> Result<TxReceipt> {
            self.check_faults().await?;

            let mut state = self.state.write().await;
            let (id, token) = state.token_mut(ledger_id)?;
            if !token.valid {
                return Err(LedgerError::Reverted("diploma already invalid".into()));
            }
            token.valid = false;
            token.invalidation_reason = Some(reason.to_string());
            Ok(state.next_tx("invalidate", id))
        }

        async fn is_valid(&self, ledger_id: &str) -> Result<bool> {
            self.check_faults().await?;

            let id = parse_token_id(ledger_id)?;
            let state = self.state.read().await;
            state
                .tokens
                .get(&id)
                .map(|t| t.valid)
                .ok_or_else(|| LedgerError::UnknownToken(ledger_id.to_string()))
        }
    }
}
