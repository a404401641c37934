//! Encoding identifiers into display names.
//!
//! A tagged name has the form `"<id>:<original>"`. Only the part before the
//! first [`DELIMITER`] is interpreted; everything after it is the original
//! display value and is never re-parsed.

use crate::error::DecodeError;
use crate::id::PersistentId;

/// Separates the identifier prefix from the original display value.
pub const DELIMITER: char = ':';

/// Prefix `original` with the identifier. An absent original name encodes
/// as an empty display value.
#[must_use]
pub fn encode(id: PersistentId, original: Option<&str>) -> String {
    format!("{id}{DELIMITER}{}", original.unwrap_or_default())
}

/// Recover the identifier from a tagged display name.
///
/// # Errors
///
/// - [`DecodeError::Untagged`] if the name is absent or empty.
/// - [`DecodeError::MissingIdentifier`] if nothing precedes the delimiter.
/// - [`DecodeError::InvalidIdentifier`] if the prefix is not a non-negative
///   integer.
pub fn decode(name: Option<&str>) -> Result<PersistentId, DecodeError> {
    let name = match name {
        Some(name) if !name.is_empty() => name,
        _ => return Err(DecodeError::Untagged),
    };

    let prefix = name.split(DELIMITER).next().unwrap_or_default();
    if prefix.is_empty() {
        return Err(DecodeError::MissingIdentifier);
    }

    prefix
        .parse::<PersistentId>()
        .map_err(|_| DecodeError::InvalidIdentifier(prefix.to_string()))
}

/// Returns the display value after the first delimiter, or `None` if the
/// name carries no delimiter at all.
#[must_use]
pub fn original_name(name: &str) -> Option<&str> {
    name.split_once(DELIMITER).map(|(_, rest)| rest)
}
