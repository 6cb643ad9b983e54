//! Key Store and per-session key material.
//!
//! The key reaches the reader in the address fragment, which browsers never
//! send to the host. On first load it is moved into session storage and the
//! fragment is cleared, so it neither lingers in the address bar nor leaks
//! through shared links, yet survives navigation within the session.
//!
//! # Key lifecycle
//!
//! ```text
//! #fragment ──capture──▶ session storage ──session_key──▶ SessionContext
//!                                                          ├── content key (AES-GCM)
//!                                                          └── names key (HKDF, lazy)
//! ```

use std::sync::OnceLock;

use secretblog_crypto::{
    ContentKey, CryptoError, DerivedKey, KeyLength, Purpose, SessionKey, derive_key,
};

use crate::{
    env::Environment,
    error::KeyError,
    tiles::{TileCoord, TileIndex, TileResolver},
};

/// Session storage item holding the encoded key.
pub const SESSION_KEY_ITEM: &str = "key";

/// Which key encrypts page and media content.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ContentKeyScheme {
    /// The session key itself
    #[default]
    Session,
    /// A key derived from the session key for [`Purpose::Files`]
    Derived,
}

/// Key handling for a deployment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KeyConfig {
    /// Required session key length
    pub key_length: KeyLength,
    /// Content key scheme
    pub content_key: ContentKeyScheme,
}

impl KeyConfig {
    /// 256-bit session key with derived content and names keys.
    pub fn derived() -> Self {
        Self { key_length: KeyLength::Bits256, content_key: ContentKeyScheme::Derived }
    }
}

/// Capture the key from the address fragment, reporting why none was taken.
///
/// On success the canonical encoding is written to session storage and the
/// fragment is cleared. On failure nothing is changed.
///
/// # Errors
///
/// - `Absent`: no fragment
/// - `Invalid`: the fragment is not a key of `config.key_length`
pub fn try_capture_key<E: Environment>(
    env: &mut E,
    config: &KeyConfig,
) -> Result<SessionKey, KeyError> {
    let fragment = env.location_fragment().ok_or(KeyError::Absent)?;
    let encoded = fragment.strip_prefix('#').unwrap_or(&fragment);
    if encoded.is_empty() {
        return Err(KeyError::Absent);
    }

    let key = SessionKey::decode(encoded, config.key_length).map_err(KeyError::Invalid)?;
    env.set_session_item(SESSION_KEY_ITEM, &key.encode());
    env.clear_location_fragment();
    Ok(key)
}

/// Capture the key from the address fragment if it holds a valid one.
pub fn capture_key_from_location<E: Environment>(
    env: &mut E,
    config: &KeyConfig,
) -> Option<SessionKey> {
    try_capture_key(env, config).ok()
}

/// Key previously captured in this browsing session.
///
/// A stored value that no longer decodes is treated as absent.
pub fn session_key<E: Environment>(env: &E, config: &KeyConfig) -> Option<SessionKey> {
    let stored = env.session_item(SESSION_KEY_ITEM)?;
    SessionKey::decode(&stored, config.key_length).ok()
}

/// Key material for one page load.
///
/// Holds the imported content key and lazily derives the names key the
/// first time a tile is resolved. Shared read-only by all concurrent loads.
pub struct SessionContext {
    session_key: SessionKey,
    content_key: ContentKey,
    names_key: OnceLock<DerivedKey>,
}

impl SessionContext {
    /// Import keys for `session_key` under `scheme`.
    ///
    /// # Errors
    ///
    /// - `InvalidKeyLength`: the content key length is not usable for AES-GCM
    pub fn new(session_key: SessionKey, scheme: ContentKeyScheme) -> Result<Self, CryptoError> {
        let content_key = match scheme {
            ContentKeyScheme::Session => ContentKey::import(session_key.as_bytes())?,
            ContentKeyScheme::Derived => {
                ContentKey::import(derive_key(&session_key, Purpose::Files).as_bytes())?
            },
        };
        Ok(Self { session_key, content_key, names_key: OnceLock::new() })
    }

    /// Capture or recall the session key and import it.
    ///
    /// A key in the fragment takes precedence over a stored one. Returns
    /// `None` when neither is available, in which case the page must be
    /// left untouched.
    pub fn establish<E: Environment>(env: &mut E, config: &KeyConfig) -> Option<Self> {
        let key = match capture_key_from_location(env, config) {
            Some(key) => key,
            None => session_key(env, config)?,
        };
        Self::new(key, config.content_key).ok()
    }

    /// Key that decrypts page and media content.
    pub fn content_key(&self) -> &ContentKey {
        &self.content_key
    }

    /// HMAC key for tile names, derived on first use.
    pub fn names_key(&self) -> &DerivedKey {
        self.names_key.get_or_init(|| derive_key(&self.session_key, Purpose::Names))
    }

    /// Resolver for the declared tiles of `index`.
    pub fn tile_resolver<'a>(&'a self, index: &'a TileIndex) -> TileResolver<'a> {
        TileResolver::new(self.names_key(), index)
    }

    /// Keyed storage name of `tile`, declared or not.
    pub fn tile_name(&self, tile: TileCoord) -> Result<String, CryptoError> {
        secretblog_crypto::derive_tile_name(self.names_key(), tile.zoom, tile.x, tile.y)
    }
}

impl std::fmt::Debug for SessionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionContext")
            .field("key_length", &self.session_key.length())
            .field("names_key_derived", &self.names_key.get().is_some())
            .finish_non_exhaustive()
    }
}
