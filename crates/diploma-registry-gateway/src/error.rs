//! Error types for the gateway module.

use std::time::Duration;

use thiserror::Error;

/// Errors from the content storage gateway.
///
/// Every variant is fatal to the operation that triggered it.
#[derive(Debug, Error)]
pub enum ContentError {
    /// The storage service could not be reached.
    #[error("content storage unavailable: {0}")]
    Unavailable(String),

    /// The storage service refused the payload.
    #[error("content rejected ({name}): {reason}")]
    Rejected { name: String, reason: String },

    /// The upload did not finish in time.
    #[error("content upload timed out after {0:?}")]
    Timeout(Duration),
}

/// Errors from the ledger gateway.
///
/// The registry never propagates these; they are logged and reported as a
/// local-only outcome.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Ledger integration is switched off.
    #[error("ledger disabled")]
    Disabled,

    /// The ledger node could not be reached.
    #[error("ledger unavailable: {0}")]
    Unavailable(String),

    /// The ledger reverted the transaction.
    #[error("transaction reverted: {0}")]
    Reverted(String),

    /// The ledger has no token with this identifier.
    #[error("unknown ledger token: {0}")]
    UnknownToken(String),

    /// The call did not finish in time.
    #[error("ledger call timed out after {0:?}")]
    Timeout(Duration),
}

/// Errors from the verification renderer.
#[derive(Debug, Error)]
pub enum RenderError {
    /// The target could not be encoded.
    #[error("render failed: {0}")]
    Failed(String),
}
