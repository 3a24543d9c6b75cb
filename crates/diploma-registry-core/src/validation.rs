//! Input validation: required fields and numeric parsing.

use crate::error::ValidationError;
use crate::record::NewDiploma;

/// Validate issuance input before anything is stored.
///
/// This checks:
/// - A document payload was supplied
/// - The student index is present
/// - Some part of the student name is present
/// - Credits, when given, are a non-negative integer
pub fn validate_new_diploma(input: &NewDiploma, document: &[u8]) -> Result<(), ValidationError> {
    if document.is_empty() {
        return Err(ValidationError::MissingDocument);
    }

    if input.student_index.is_empty() {
        return Err(ValidationError::MissingStudentIndex);
    }

    if input.full_name().is_empty() {
        return Err(ValidationError::MissingStudentName);
    }

    if let Some(raw) = &input.credits {
        parse_credits(raw)?;
    }

    Ok(())
}

/// Parse submitted credits.
///
/// Blank text means "not given"; anything else must be a non-negative
/// integer.
pub fn parse_credits(raw: &str) -> Result<Option<u32>, ValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    trimmed
        .parse::<u32>()
        .map(Some)
        .map_err(|_| ValidationError::InvalidCredits(raw.to_string()))
}
