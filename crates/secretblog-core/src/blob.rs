//! Ephemeral in-memory store for decrypted binary content.
//!
//! Decrypted media never touches a URL the host can see. Instead it is
//! registered here and displayed through an opaque [`BlobHandle`], which
//! must be revoked once every consumer has rendered it.

use std::{collections::HashMap, fmt};

use bytes::Bytes;

/// Opaque reference to decrypted content held in a [`BlobStore`].
///
/// Handles are never reused within a store, so a revoked handle cannot
/// resolve to someone else's content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlobHandle(u64);

impl fmt::Display for BlobHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "blob:secretblog/{}", self.0)
    }
}

/// Decrypted content plus its media type.
#[derive(Debug, Clone)]
pub struct Blob {
    /// Media type hint for the renderer.
    pub mime: String,
    /// Decrypted bytes.
    pub bytes: Bytes,
}

/// Live decrypted blobs.
#[derive(Debug, Default)]
pub struct BlobStore {
    next_id: u64,
    live: HashMap<BlobHandle, Blob>,
}

impl BlobStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register decrypted bytes and return a fresh handle.
    pub fn create(&mut self, bytes: impl Into<Bytes>, mime: impl Into<String>) -> BlobHandle {
        let handle = BlobHandle(self.next_id);
        self.next_id += 1;
        self.live.insert(handle, Blob { mime: mime.into(), bytes: bytes.into() });
        handle
    }

    /// Look up a live blob.
    pub fn get(&self, handle: BlobHandle) -> Option<&Blob> {
        self.live.get(&handle)
    }

    /// Release a blob. Returns false if it was already revoked.
    pub fn revoke(&mut self, handle: BlobHandle) -> bool {
        self.live.remove(&handle).is_some()
    }

    /// Number of blobs not yet revoked.
    pub fn live_count(&self) -> usize {
        self.live.len()
    }
}
