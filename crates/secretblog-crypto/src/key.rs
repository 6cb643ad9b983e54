//! Session key parsing and encoding
//!
//! The key travels in the address fragment as base64. Publishers and chat
//! apps mangle it in predictable ways, so decoding is lenient about form and
//! strict about content:
//!
//! - trailing `=` padding is optional, and too much of it is ignored
//! - the URL-safe alphabet (`-_`) is accepted alongside the standard one
//! - unused bits in the final symbol are ignored
//! - the decoded length must match the deployment exactly

use base64::{
    Engine, alphabet,
    engine::{
        DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig, general_purpose::URL_SAFE_NO_PAD,
    },
};
use zeroize::Zeroize;

use crate::error::CryptoError;

/// Decoder for fragment keys after padding is stripped and the URL-safe
/// alphabet is folded into the standard one.
const FRAGMENT_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_allow_trailing_bits(true)
        .with_decode_padding_mode(DecodePaddingMode::RequireNone),
);

/// Session key size for a deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum KeyLength {
    /// 128-bit key (AES-128-GCM when used directly)
    #[default]
    Bits128,
    /// 256-bit key (AES-256-GCM when used directly)
    Bits256,
}

impl KeyLength {
    /// Key size in bytes.
    pub const fn bytes(self) -> usize {
        match self {
            Self::Bits128 => 16,
            Self::Bits256 => 32,
        }
    }

    /// Key length for a byte count, if it is a supported size.
    pub const fn from_bytes(len: usize) -> Option<Self> {
        match len {
            16 => Some(Self::Bits128),
            32 => Some(Self::Bits256),
            _ => None,
        }
    }
}

/// Raw session key material.
///
/// The bytes are zeroized when the key is dropped. `Debug` prints only the
/// key size.
pub struct SessionKey {
    bytes: Vec<u8>,
}

impl SessionKey {
    /// Wrap raw key bytes, checking them against the expected length.
    pub fn from_bytes(bytes: &[u8], expected: KeyLength) -> Result<Self, CryptoError> {
        if bytes.len() != expected.bytes() {
            return Err(CryptoError::InvalidKeyLength {
                expected: expected.bytes(),
                actual: bytes.len(),
            });
        }
        Ok(Self { bytes: bytes.to_vec() })
    }

    /// Decode a key as carried in the address fragment.
    ///
    /// # Errors
    ///
    /// - `InvalidKeyEncoding`: not base64 in either alphabet
    /// - `InvalidKeyLength`: decoded, but not `expected` bytes long
    pub fn decode(encoded: &str, expected: KeyLength) -> Result<Self, CryptoError> {
        let mut normalized: String = encoded
            .trim_end_matches('=')
            .chars()
            .map(|c| match c {
                '-' => '+',
                '_' => '/',
                other => other,
            })
            .collect();

        let decoded = FRAGMENT_ENGINE.decode(normalized.as_bytes());
        normalized.zeroize();

        let mut bytes = decoded
            .map_err(|e| CryptoError::InvalidKeyEncoding { reason: e.to_string() })?;
        let key = Self::from_bytes(&bytes, expected);
        bytes.zeroize();
        key
    }

    /// Encode the key for an address fragment (URL-safe, unpadded).
    pub fn encode(&self) -> String {
        URL_SAFE_NO_PAD.encode(&self.bytes)
    }

    /// Raw key bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Size of this key.
    pub fn length(&self) -> KeyLength {
        if self.bytes.len() == KeyLength::Bits256.bytes() {
            KeyLength::Bits256
        } else {
            KeyLength::Bits128
        }
    }
}

impl Drop for SessionKey {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

impl std::fmt::Debug for SessionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionKey").field("length", &self.length()).finish_non_exhaustive()
    }
}
