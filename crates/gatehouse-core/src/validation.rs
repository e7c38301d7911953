//! Input validation for catalog names.

use crate::error::{CoreError, Result};

/// Longest accepted permission or role name, in bytes.
pub const MAX_NAME_LEN: usize = 128;

/// Trim a permission or role name and reject empty or oversized values.
pub fn validate_name(field: &'static str, name: &str) -> Result<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(CoreError::InvalidInput {
            field,
            reason: "must not be empty".into(),
        });
    }
    if trimmed.len() > MAX_NAME_LEN {
        return Err(CoreError::InvalidInput {
            field,
            reason: format!("longer than {} bytes", MAX_NAME_LEN),
        });
    }
    Ok(trimmed.to_string())
}
