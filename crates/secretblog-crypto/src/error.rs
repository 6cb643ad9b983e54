//! Error types for cryptographic operations

use thiserror::Error;

use crate::derivation::Purpose;

/// Errors from key handling, decryption and derivation.
///
/// Variants deliberately carry no key material and no plaintext. A failed
/// authentication tag is reported as a bare [`CryptoError::DecryptionFailed`]
/// whatever the cause (wrong key, tampering, truncation past the nonce).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// The encoded key is not valid base64
    #[error("invalid key encoding: {reason}")]
    InvalidKeyEncoding {
        /// Decoder error description
        reason: String,
    },

    /// The key decoded to the wrong number of bytes
    #[error("invalid key length: expected {expected} bytes, got {actual}")]
    InvalidKeyLength {
        /// Expected key length in bytes
        expected: usize,
        /// Actual key length in bytes
        actual: usize,
    },

    /// The input is shorter than the nonce prefix
    #[error("ciphertext too short: {len} bytes, need at least {min}")]
    CiphertextTooShort {
        /// Length of the input
        len: usize,
        /// Minimum acceptable length
        min: usize,
    },

    /// Authentication failed (wrong key, tampered or corrupt data)
    #[error("decryption failed")]
    DecryptionFailed,

    /// A derived key was used for a purpose it was not derived for
    #[error("derived key purpose mismatch: expected {expected:?}, got {actual:?}")]
    PurposeMismatch {
        /// Purpose the operation requires
        expected: Purpose,
        /// Purpose the key was derived for
        actual: Purpose,
    },
}

impl CryptoError {
    /// Returns true if this error was raised while validating key material
    /// rather than while processing a resource.
    pub fn is_key_error(&self) -> bool {
        matches!(self, Self::InvalidKeyEncoding { .. } | Self::InvalidKeyLength { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_errors_are_classified() {
        assert!(CryptoError::InvalidKeyEncoding { reason: "bad".into() }.is_key_error());
        assert!(CryptoError::InvalidKeyLength { expected: 16, actual: 3 }.is_key_error());
        assert!(!CryptoError::DecryptionFailed.is_key_error());
        assert!(!CryptoError::CiphertextTooShort { len: 3, min: 12 }.is_key_error());
    }

    #[test]
    fn decryption_failure_message_has_no_detail() {
        assert_eq!(CryptoError::DecryptionFailed.to_string(), "decryption failed");
    }
}
