//! Transport abstraction for encrypted resources.

use std::future::Future;

use bytes::Bytes;
use secretblog_core::{FetchError, Locator};

/// Bytes retrieved from the host.
///
/// The declared type describes what the host stored, which is always
/// ciphertext; the type of the decrypted content is chosen by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fetched {
    /// Raw stored bytes.
    pub bytes: Bytes,
    /// Content type reported by the host, if it reported one.
    pub declared_type: Option<String>,
}

impl Fetched {
    /// Bytes with no declared type.
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self { bytes: bytes.into(), declared_type: None }
    }

    /// Attach the content type the host reported.
    #[must_use]
    pub fn with_declared_type(mut self, declared_type: impl Into<String>) -> Self {
        self.declared_type = Some(declared_type.into());
        self
    }
}

/// Retrieves encrypted bytes from the host.
///
/// Implementations are cheap to clone and shared by concurrent loads; each
/// clone talks to the same host.
///
/// # Implementations
///
/// - **Viewer**: reads from a directory on disk
/// - **Simulation**: serves an in-memory site with failure injection
/// - **Browser**: would issue same-origin HTTP GETs
pub trait Fetcher: Clone + Send + Sync + 'static {
    /// Fetch the raw bytes stored at `locator`, with the type the host
    /// declared for them.
    ///
    /// # Errors
    ///
    /// - `NotFound`: nothing is stored there
    /// - `Status`: the host refused with another status
    /// - `Unreachable`: the transfer did not complete
    fn fetch(&self, locator: &Locator) -> impl Future<Output = Result<Fetched, FetchError>> + Send;
}
