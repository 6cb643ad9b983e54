//! Keyed tile names
//!
//! A map tile at `(zoom, x, y)` is stored under a name only the key holder
//! can compute: lower-case, unpadded base32 of
//! `HMAC-SHA256(names_key, "{zoom}_{x}_{y}")`. Base32 keeps names valid on
//! case-insensitive file systems.

use data_encoding::BASE32_NOPAD;
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::{
    derivation::{DerivedKey, Purpose},
    error::CryptoError,
};

type HmacSha256 = Hmac<Sha256>;

/// Canonical MAC input for a tile coordinate.
pub fn tile_message(zoom: u8, x: u32, y: u32) -> String {
    format!("{zoom}_{x}_{y}")
}

/// Derive the stored name of a tile.
///
/// # Errors
///
/// - `PurposeMismatch`: `names_key` was not derived for [`Purpose::Names`]
pub fn derive_tile_name(
    names_key: &DerivedKey,
    zoom: u8,
    x: u32,
    y: u32,
) -> Result<String, CryptoError> {
    if names_key.purpose() != Purpose::Names {
        return Err(CryptoError::PurposeMismatch {
            expected: Purpose::Names,
            actual: names_key.purpose(),
        });
    }

    let Ok(mut mac) = HmacSha256::new_from_slice(names_key.as_bytes()) else {
        unreachable!("HMAC accepts keys of any length");
    };
    mac.update(tile_message(zoom, x, y).as_bytes());
    let digest = mac.finalize().into_bytes();

    Ok(BASE32_NOPAD.encode(&digest).to_ascii_lowercase())
}
