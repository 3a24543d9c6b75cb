//! Error types for the diploma registry core.

use thiserror::Error;

/// Core errors raised while building documents from records.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("encoding error: {0}")]
    EncodingError(String),

    #[error("decoding error: {0}")]
    DecodingError(String),
}

/// Validation errors for caller-supplied input.
///
/// Raised before anything is stored, so a failed validation never leaves a
/// partial record behind.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("diploma document is required")]
    MissingDocument,

    #[error("student index is required")]
    MissingStudentIndex,

    #[error("student name is required")]
    MissingStudentName,

    #[error("credits must be a non-negative integer, got {0:?}")]
    InvalidCredits(String),

    #[error("invalid role: {0}")]
    UnknownRole(String),

    #[error("address is required")]
    MissingAddress,
}
