//! Fetch-then-decrypt for single resources.

use std::sync::Arc;

use secretblog_core::{BlobHandle, BlobStore, LoadError, Locator, SessionContext};
use secretblog_crypto::decrypt;

use crate::Fetcher;

/// Type of published images and panoramas, which are always JPEG.
pub const IMAGE_JPEG: &str = "image/jpeg";

/// Type of map tiles.
pub const IMAGE_PNG: &str = "image/png";

/// Media type implied by a locator's extension.
///
/// Tiles have no extension and are served as PNG. Published media names
/// usually carry no extension either, so `None` is the common case.
pub fn media_type(locator: &Locator) -> Option<&'static str> {
    let path = locator.as_str();
    if path.starts_with("tiles/") {
        return Some(IMAGE_PNG);
    }
    let name = path.rsplit('/').next().unwrap_or(path);
    let extension = name.rsplit_once('.').map(|(_, ext)| ext.to_ascii_lowercase());
    match extension.as_deref()? {
        "jpg" | "jpeg" => Some(IMAGE_JPEG),
        "png" => Some(IMAGE_PNG),
        "webp" => Some("image/webp"),
        "gif" => Some("image/gif"),
        "svg" => Some("image/svg+xml"),
        "json" | "geojson" => Some("application/json"),
        _ => None,
    }
}

/// Fetches resources and decrypts them with the session content key.
///
/// Cloning shares the fetcher and session; concurrent loads run
/// independently of each other.
pub struct ResourceFetcher<F> {
    fetcher: F,
    session: Arc<SessionContext>,
}

impl<F: Clone> Clone for ResourceFetcher<F> {
    fn clone(&self) -> Self {
        Self { fetcher: self.fetcher.clone(), session: Arc::clone(&self.session) }
    }
}

impl<F: Fetcher> ResourceFetcher<F> {
    /// Decrypt resources from `fetcher` with the keys in `session`.
    pub fn new(fetcher: F, session: Arc<SessionContext>) -> Self {
        Self { fetcher, session }
    }

    /// Session key material.
    pub fn session(&self) -> &Arc<SessionContext> {
        &self.session
    }

    /// Fetch `locator` and return its plaintext.
    ///
    /// Nothing is returned unless the ciphertext authenticates.
    ///
    /// # Errors
    ///
    /// - `Network`: retrieval failed
    /// - `Decryption`: wrong key, tampering or truncation
    pub async fn fetch_and_decrypt(&self, locator: &Locator) -> Result<Vec<u8>, LoadError> {
        let fetched = self.fetcher.fetch(locator).await?;
        decrypt(self.session.content_key(), &fetched.bytes)
            .map_err(|source| LoadError::Decryption { locator: locator.clone(), source })
    }

    /// Fetch `locator` and return its plaintext as UTF-8 text.
    ///
    /// # Errors
    ///
    /// As [`fetch_and_decrypt`](Self::fetch_and_decrypt), plus `Malformed`
    /// when the plaintext is not UTF-8.
    pub async fn fetch_and_decrypt_to_text(&self, locator: &Locator) -> Result<String, LoadError> {
        let plaintext = self.fetch_and_decrypt(locator).await?;
        String::from_utf8(plaintext).map_err(|_| LoadError::Malformed {
            locator: locator.clone(),
            reason: "plaintext is not UTF-8".into(),
        })
    }

    /// Fetch `locator` and register its plaintext in `blobs` as `mime`.
    ///
    /// The caller owns the returned handle and must revoke it once the
    /// content has been rendered.
    ///
    /// # Errors
    ///
    /// As [`fetch_and_decrypt`](Self::fetch_and_decrypt); no blob is created.
    pub async fn fetch_and_decrypt_to_handle(
        &self,
        locator: &Locator,
        mime: &str,
        blobs: &mut BlobStore,
    ) -> Result<BlobHandle, LoadError> {
        let plaintext = self.fetch_and_decrypt(locator).await?;
        Ok(blobs.create(plaintext, mime))
    }
}
