//! secretblog Cryptographic Primitives
//!
//! Cryptographic building blocks for the secretblog client. Pure functions
//! with deterministic outputs. Callers provide nonces when encrypting so
//! fixtures can be produced deterministically.
//!
//! # Key Lifecycle
//!
//! A single session key unlocks a post. It arrives base64-encoded in the
//! address fragment, never touches the network, and every other key is
//! derived from it:
//!
//! ```text
//! Address fragment (base64)
//!        │
//!        ▼
//! Session Key (128 or 256 bits)
//!        │
//!        ├──────────────► AES-GCM Content Key ──► decrypt(nonce || ct || tag)
//!        │                  (raw, or HKDF "files")
//!        ▼
//! HKDF "names" → Names Key
//!        │
//!        ▼
//! HMAC("z_x_y") → base32 → tiles/<name>
//! ```
//!
//! # Security
//!
//! Confidentiality:
//! - AES-GCM with a 96-bit nonce prefixed to every stored resource
//! - Nonce uniqueness per (key, resource) is the publisher's job
//!
//! Integrity:
//! - 128-bit GCM tag; any bit flip rejects the whole resource
//! - Decryption never returns partial plaintext
//!
//! Structure hiding:
//! - Tile names are keyed MACs over grid coordinates, so the host only sees
//!   opaque names
//! - Derived keys are purpose-bound; a names key can't decrypt content
//!
//! Key hygiene:
//! - Session and derived key bytes are zeroized on drop
//! - `Debug` output of key types never contains key material

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod aead;
mod derivation;
mod error;
mod key;
mod naming;

pub use aead::{ContentKey, NONCE_SIZE, TAG_SIZE, decrypt, encrypt};
pub use derivation::{DerivedKey, Purpose, derive_key};
pub use error::CryptoError;
pub use key::{KeyLength, SessionKey};
pub use naming::{derive_tile_name, tile_message};
