//! Resource decryption using AES-GCM
//!
//! Every stored resource is `nonce (12 bytes) || ciphertext || tag (16
//! bytes)`. The key size selects AES-128 or AES-256; the format is otherwise
//! identical.

use aes_gcm::{
    Aes128Gcm, Aes256Gcm, Nonce,
    aead::{Aead, KeyInit},
};

use crate::{error::CryptoError, key::KeyLength};

/// Size of the nonce prefix (96 bits)
pub const NONCE_SIZE: usize = 12;

/// GCM tag size (128 bits)
pub const TAG_SIZE: usize = 16;

/// An imported AES-GCM key, ready to decrypt resources.
#[derive(Clone)]
pub enum ContentKey {
    /// AES-128-GCM
    Aes128(Aes128Gcm),
    /// AES-256-GCM
    Aes256(Aes256Gcm),
}

impl ContentKey {
    /// Import raw key bytes. 16 bytes selects AES-128, 32 bytes AES-256.
    ///
    /// # Errors
    ///
    /// - `InvalidKeyLength`: any other length
    pub fn import(raw: &[u8]) -> Result<Self, CryptoError> {
        let invalid = || CryptoError::InvalidKeyLength {
            expected: KeyLength::Bits128.bytes(),
            actual: raw.len(),
        };

        match KeyLength::from_bytes(raw.len()) {
            Some(KeyLength::Bits128) => {
                Aes128Gcm::new_from_slice(raw).map(Self::Aes128).map_err(|_| invalid())
            },
            Some(KeyLength::Bits256) => {
                Aes256Gcm::new_from_slice(raw).map(Self::Aes256).map_err(|_| invalid())
            },
            None => Err(invalid()),
        }
    }

    /// Size of the imported key.
    pub fn length(&self) -> KeyLength {
        match self {
            Self::Aes128(_) => KeyLength::Bits128,
            Self::Aes256(_) => KeyLength::Bits256,
        }
    }
}

impl std::fmt::Debug for ContentKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("ContentKey").field(&self.length()).finish()
    }
}

/// Decrypt a nonce-prefixed resource.
///
/// Returns the plaintext only if the tag verifies. Never retries.
///
/// # Errors
///
/// - `CiphertextTooShort`: input shorter than the nonce
/// - `DecryptionFailed`: wrong key, tampered or truncated ciphertext
pub fn decrypt(key: &ContentKey, data: &[u8]) -> Result<Vec<u8>, CryptoError> {
    if data.len() < NONCE_SIZE {
        return Err(CryptoError::CiphertextTooShort { len: data.len(), min: NONCE_SIZE });
    }

    let (nonce, ciphertext) = data.split_at(NONCE_SIZE);
    let plaintext = match key {
        ContentKey::Aes128(cipher) => cipher.decrypt(Nonce::from_slice(nonce), ciphertext),
        ContentKey::Aes256(cipher) => cipher.decrypt(Nonce::from_slice(nonce), ciphertext),
    };

    plaintext.map_err(|_| CryptoError::DecryptionFailed)
}

/// Encrypt `plaintext` into the stored resource format.
///
/// Publishing normally happens elsewhere; this exists so fixtures and tools
/// can produce resources. The caller MUST never reuse a nonce under the same
/// key.
pub fn encrypt(key: &ContentKey, nonce: [u8; NONCE_SIZE], plaintext: &[u8]) -> Vec<u8> {
    let sealed = match key {
        ContentKey::Aes128(cipher) => cipher.encrypt(Nonce::from_slice(&nonce), plaintext),
        ContentKey::Aes256(cipher) => cipher.encrypt(Nonce::from_slice(&nonce), plaintext),
    };

    let Ok(ciphertext) = sealed else {
        unreachable!("AES-GCM encryption cannot fail for in-memory plaintext");
    };

    let mut packed = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
    packed.extend_from_slice(&nonce);
    packed.extend_from_slice(&ciphertext);
    packed
}

#[cfg(test)]
mod tests {
    use super::*;

    /// `<p>Hello</p>` under the all-zero 128-bit key and all-zero nonce.
    const HELLO_FIXTURE: &str =
        "0000000000000000000000003ff8e48605dacffdcf07b287a7affea02efd36078ebc4dcd3f23197e";

    fn zero_key_128() -> ContentKey {
        ContentKey::import(&[0u8; 16]).unwrap()
    }

    #[test]
    fn decrypts_known_fixture() {
        let data = hex::decode(HELLO_FIXTURE).unwrap();
        let plaintext = decrypt(&zero_key_128(), &data).unwrap();
        assert_eq!(plaintext, b"<p>Hello</p>");
    }

    #[test]
    fn encrypt_matches_known_fixture() {
        let packed = encrypt(&zero_key_128(), [0u8; NONCE_SIZE], b"<p>Hello</p>");
        assert_eq!(hex::encode(packed), HELLO_FIXTURE);
    }

    #[test]
    fn encrypt_decrypt_roundtrip_256() {
        let key = ContentKey::import(&[7u8; 32]).unwrap();
        let packed = encrypt(&key, [9u8; NONCE_SIZE], b"panorama bytes");
        assert_eq!(decrypt(&key, &packed).unwrap(), b"panorama bytes");
    }

    #[test]
    fn empty_plaintext_roundtrips() {
        let key = zero_key_128();
        let packed = encrypt(&key, [1u8; NONCE_SIZE], b"");
        assert_eq!(packed.len(), NONCE_SIZE + TAG_SIZE);
        assert_eq!(decrypt(&key, &packed).unwrap(), b"");
    }

    #[test]
    fn wrong_key_fails() {
        let packed = encrypt(&zero_key_128(), [0u8; NONCE_SIZE], b"secret");
        let other = ContentKey::import(&[1u8; 16]).unwrap();
        assert_eq!(decrypt(&other, &packed), Err(CryptoError::DecryptionFailed));
    }

    #[test]
    fn tampered_tag_fails() {
        let mut packed = encrypt(&zero_key_128(), [0u8; NONCE_SIZE], b"secret");
        let last = packed.len() - 1;
        packed[last] ^= 0x01;
        assert_eq!(decrypt(&zero_key_128(), &packed), Err(CryptoError::DecryptionFailed));
    }

    #[test]
    fn tampered_nonce_fails() {
        let mut packed = encrypt(&zero_key_128(), [0u8; NONCE_SIZE], b"secret");
        packed[0] ^= 0x80;
        assert_eq!(decrypt(&zero_key_128(), &packed), Err(CryptoError::DecryptionFailed));
    }

    #[test]
    fn shorter_than_nonce_is_rejected() {
        let result = decrypt(&zero_key_128(), &[0u8; NONCE_SIZE - 1]);
        assert_eq!(result, Err(CryptoError::CiphertextTooShort { len: 11, min: NONCE_SIZE }));
    }

    #[test]
    fn nonce_only_fails_authentication() {
        let result = decrypt(&zero_key_128(), &[0u8; NONCE_SIZE]);
        assert_eq!(result, Err(CryptoError::DecryptionFailed));
    }

    #[test]
    fn import_rejects_unsupported_sizes() {
        assert!(ContentKey::import(&[0u8; 24]).is_err());
        assert!(ContentKey::import(&[]).is_err());
        assert_eq!(ContentKey::import(&[0u8; 32]).unwrap().length(), KeyLength::Bits256);
    }
}
