//! Error types for the token crate.

use crate::compact::CompactValueError;
use thiserror::Error;

/// Errors that can occur while issuing or validating tokens.
#[derive(Debug, Error)]
pub enum TokenError {
    /// The key ring held no keys when an encrypt or decrypt was attempted.
    #[error("no encryption keys available")]
    KeysNotFound,

    /// The ciphertext did not authenticate under any key in the ring.
    ///
    /// Tampering, a retired key and corruption all land here.
    #[error("token failed authentication")]
    InvalidToken,

    /// The decrypted bytes are not a well-formed payload for the format.
    #[error("malformed token payload: {0}")]
    MalformedPayload(String),

    /// A compact UUID or timestamp could not be converted.
    #[error("malformed compact value: {0}")]
    MalformedValue(#[from] CompactValueError),

    /// The wire token's format marker is not registered.
    #[error("unsupported token format: {marker:?}")]
    UnsupportedFormat { marker: String },

    /// Token creation input is missing a field the format requires.
    #[error("token data missing required claim: {claim}")]
    MissingClaim { claim: String },

    /// Key material could not be decoded.
    #[error("invalid key material: {0}")]
    InvalidKey(String),

    /// IO error (reading key repositories).
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Failure reported by a trust lookup or metadata expander, passed through as-is.
    #[error(transparent)]
    Collaborator(anyhow::Error),
}

impl TokenError {
    /// Whether this error means the caller presented an unauthenticated token.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::InvalidToken)
    }
}
