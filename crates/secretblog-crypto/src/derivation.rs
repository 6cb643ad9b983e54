//! Purpose-scoped key derivation using HKDF

use hkdf::Hkdf;
use sha2::Sha256;
use zeroize::Zeroize;

use crate::key::SessionKey;

/// What a derived key may be used for.
///
/// The label is the HKDF info string. Keys for different purposes are
/// independent; learning one reveals neither the session key nor any other
/// derived key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Purpose {
    /// HMAC key for tile names (`"names"`)
    Names,
    /// AES-256-GCM content key for deployments that don't use the session
    /// key directly (`"files"`)
    Files,
}

impl Purpose {
    /// HKDF info label.
    pub const fn label(self) -> &'static [u8] {
        match self {
            Self::Names => b"names",
            Self::Files => b"files",
        }
    }

    /// Output length in bytes.
    ///
    /// The names key is one SHA-256 block (64 bytes), which is what the
    /// browser's HMAC key import produces by default. The files key is an
    /// AES-256 key.
    pub const fn output_len(self) -> usize {
        match self {
            Self::Names => 64,
            Self::Files => 32,
        }
    }
}

/// Key material derived from a session key for a single purpose.
pub struct DerivedKey {
    purpose: Purpose,
    bytes: Vec<u8>,
}

impl DerivedKey {
    /// Purpose this key was derived for.
    pub fn purpose(&self) -> Purpose {
        self.purpose
    }

    /// Raw key bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl Drop for DerivedKey {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

impl std::fmt::Debug for DerivedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DerivedKey").field("purpose", &self.purpose).finish_non_exhaustive()
    }
}

/// Derive a purpose-scoped key from the session key.
///
/// HKDF-SHA256 with an empty salt and the purpose label as info.
/// Deterministic: the same session key and purpose always give the same key.
pub fn derive_key(session_key: &SessionKey, purpose: Purpose) -> DerivedKey {
    let hkdf = Hkdf::<Sha256>::new(None, session_key.as_bytes());

    let mut bytes = vec![0u8; purpose.output_len()];
    let Ok(()) = hkdf.expand(purpose.label(), &mut bytes) else {
        unreachable!("64 bytes is a valid HKDF-SHA256 output length");
    };

    DerivedKey { purpose, bytes }
}
