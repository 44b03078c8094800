//! Validation utilities for caller-supplied identifiers and arguments
//!
//! Ids arrive from the bot layer as opaque strings (chat ids, catalog ids).
//! The engine accepts printable ascii identifiers without whitespace; empty
//! or oversized ids are rejected.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::CineMatchError;

/// Longest id the engine will accept
pub const MAX_ID_LENGTH: usize = 128;

/// Entity id pattern: alphanumeric start, then a small punctuation set
pub static ENTITY_ID_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_.:@-]*$").expect("Failed to compile entity id regex")
});

/// True when `id` is acceptable as a user or item identifier.
///
/// Used by the matrix builder to skip-and-count malformed log records
/// without raising.
pub fn is_valid_entity_id(id: &str) -> bool {
    !id.is_empty() && id.len() <= MAX_ID_LENGTH && ENTITY_ID_REGEX.is_match(id)
}

/// Validate a caller-supplied user id
pub fn validate_user_id(id: &str) -> Result<(), CineMatchError> {
    if is_valid_entity_id(id) {
        Ok(())
    } else {
        Err(CineMatchError::invalid_argument_field(
            "User id must be a non-empty ascii identifier",
            "user_id",
        ))
    }
}

/// Validate a caller-supplied item id
pub fn validate_item_id(id: &str) -> Result<(), CineMatchError> {
    if is_valid_entity_id(id) {
        Ok(())
    } else {
        Err(CineMatchError::invalid_argument_field(
            "Item id must be a non-empty ascii identifier",
            "item_id",
        ))
    }
}

/// Validate a requested result count
pub fn validate_top_n(top_n: usize) -> Result<(), CineMatchError> {
    if top_n == 0 {
        return Err(CineMatchError::invalid_argument_field(
            "Requested result count must be positive",
            "top_n",
        ));
    }
    Ok(())
}
