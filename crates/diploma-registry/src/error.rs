//! Error types for the registry.

use diploma_registry_core::{CoreError, RecordId, StudentIndex, ValidationError};
use diploma_registry_gateway::{ContentError, RenderError};
use diploma_registry_store::StoreError;
use thiserror::Error;

/// Errors that can occur during registry operations.
///
/// Ledger failures never appear here; they are absorbed and reported through
/// [`LedgerSync`](crate::LedgerSync).
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Caller input was rejected before anything was stored.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// No record with this identifier.
    #[error("record not found: {0}")]
    RecordNotFound(RecordId),

    /// No valid record for this student index.
    #[error("no valid record for index {0}")]
    NoValidRecord(StudentIndex),

    /// Every allocated identifier was taken by a concurrent writer.
    #[error("identifier conflict after {attempts} attempts (last tried {last})")]
    Conflict { attempts: u32, last: RecordId },

    /// Record store failure.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// Content storage failure.
    #[error("content error: {0}")]
    Content(#[from] ContentError),

    /// Verification image could not be rendered.
    #[error("render error: {0}")]
    Render(#[from] RenderError),

    /// Metadata document could not be encoded.
    #[error("encoding error: {0}")]
    Core(#[from] CoreError),

    /// Configuration could not be loaded.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
}

impl RegistryError {
    /// Whether the error means the requested record does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            RegistryError::RecordNotFound(_) | RegistryError::NoValidRecord(_)
        )
    }

    /// Whether the error came from the record store or content storage.
    pub fn is_storage(&self) -> bool {
        matches!(self, RegistryError::Store(_) | RegistryError::Content(_))
    }
}

/// Errors raised while loading [`RegistryConfig`](crate::RegistryConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Result type for registry operations.
pub type Result<T> = std::result::Result<T, RegistryError>;
