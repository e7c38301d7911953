//! Error types for Gatehouse Core.

use thiserror::Error;

/// Core errors: token handling, key material, input validation.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid signature")]
    InvalidSignature,

    #[error("invalid public key")]
    InvalidPublicKey,

    #[error("malformed token: {0}")]
    MalformedToken(String),

    #[error("token expired")]
    TokenExpired,

    #[error("encoding error: {0}")]
    EncodingError(String),

    #[error("decoding error: {0}")]
    DecodingError(String),

    #[error("invalid {field}: {reason}")]
    InvalidInput { field: &'static str, reason: String },
}

impl From<jsonwebtoken::errors::Error> for CoreError {
    fn from(e: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;
        match e.kind() {
            ErrorKind::ExpiredSignature => CoreError::TokenExpired,
            ErrorKind::InvalidSignature => CoreError::InvalidSignature,
            _ => CoreError::MalformedToken(e.to_string()),
        }
    }
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
