//! API models for request and response payloads
//!
//! Request structs keep required fields optional so that a missing field
//! becomes a 400 with a readable message instead of a deserializer error.

pub mod badge;
pub mod expense;
pub mod payment;
pub mod receipt;
pub mod reminder;
pub mod user;

use crate::error::ApiError;

/// Unwrap a required request field
pub(crate) fn required<T>(value: Option<T>, field: &str) -> Result<T, ApiError> {
    value.ok_or_else(|| ApiError::BadRequest(format!("{} is required", field)))
}

/// Unwrap a required string field, treating blank strings as missing
pub(crate) fn required_text(value: Option<String>, field: &str) -> Result<String, ApiError> {
    match value.map(|v| v.trim().to_string()) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(ApiError::BadRequest(format!("{} is required", field))),
    }
}

/// Strip a leading `@` from a user-typed handle or name
pub fn strip_at(value: &str) -> &str {
    value.trim().trim_start_matches('@')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_text_rejects_blank() {
        assert!(required_text(None, "groupId").is_err());
        assert!(required_text(Some("  ".into()), "groupId").is_err());
        assert_eq!(required_text(Some(" g1 ".into()), "groupId").unwrap(), "g1");
    }

    #[test]
    fn test_strip_at() {
        assert_eq!(strip_at("@alice"), "alice");
        assert_eq!(strip_at("bob"), "bob");
    }
}
