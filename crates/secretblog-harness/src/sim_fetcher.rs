//! Simulated static host.
//!
//! Serves encrypted files from memory, records every request and can be told
//! to fail specific resources.

#![allow(clippy::disallowed_types, reason = "Synchronous locking operations only")]

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use bytes::Bytes;
use secretblog_app::{Fetched, Fetcher};
use secretblog_core::{FetchError, Locator};

/// Type a static host declares for extensionless files.
const OPAQUE_TYPE: &str = "application/octet-stream";

/// How a resource misbehaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureMode {
    /// Host answers with this status
    Status(u16),
    /// Connection drops
    Unreachable,
    /// Body arrives with one bit flipped
    Corrupt,
}

#[derive(Default)]
struct HostState {
    files: HashMap<Locator, Bytes>,
    failures: HashMap<Locator, FailureMode>,
    requests: Vec<Locator>,
}

/// In-memory host shared by all clones.
#[derive(Clone, Default)]
pub struct SimFetcher {
    state: Arc<Mutex<HostState>>,
}

impl SimFetcher {
    /// Empty host.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HostState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Store `bytes` at `locator`.
    pub fn put(&self, locator: Locator, bytes: impl Into<Bytes>) {
        self.lock().files.insert(locator, bytes.into());
    }

    /// Make requests for `locator` fail.
    pub fn fail(&self, locator: Locator, mode: FailureMode) {
        self.lock().failures.insert(locator, mode);
    }

    /// Every request made so far, in order.
    pub fn requests(&self) -> Vec<Locator> {
        self.lock().requests.clone()
    }

    /// How many times `locator` was requested.
    pub fn request_count(&self, locator: &Locator) -> usize {
        self.lock().requests.iter().filter(|l| *l == locator).count()
    }

    /// Bytes stored at `locator`, as the host would serve them.
    pub fn stored(&self, locator: &Locator) -> Option<Bytes> {
        self.lock().files.get(locator).cloned()
    }

    /// Every stored locator.
    pub fn locators(&self) -> Vec<Locator> {
        let mut locators: Vec<_> = self.lock().files.keys().cloned().collect();
        locators.sort();
        locators
    }

    fn respond(&self, locator: &Locator) -> Result<Bytes, FetchError> {
        let mut state = self.lock();
        state.requests.push(locator.clone());

        let found = state.files.get(locator).cloned();
        let failure = state.failures.get(locator).copied();
        if let Some(mode) = failure {
            tracing::debug!(%locator, ?mode, "injecting failure");
        }
        match (failure, found) {
            (Some(FailureMode::Status(status)), _) => {
                Err(FetchError::Status { locator: locator.clone(), status })
            },
            (Some(FailureMode::Unreachable), _) => Err(FetchError::Unreachable {
                locator: locator.clone(),
                reason: "connection reset".into(),
            }),
            (Some(FailureMode::Corrupt), Some(bytes)) => {
                let mut corrupted = bytes.to_vec();
                if let Some(last) = corrupted.last_mut() {
                    *last ^= 0x01;
                }
                Ok(Bytes::from(corrupted))
            },
            (_, Some(bytes)) => Ok(bytes),
            (_, None) => Err(FetchError::NotFound { locator: locator.clone() }),
        }
    }
}

impl Fetcher for SimFetcher {
    async fn fetch(&self, locator: &Locator) -> Result<Fetched, FetchError> {
        // Let other loads interleave, as a real network would.
        tokio::task::yield_now().await;
        let bytes = self.respond(locator)?;
        Ok(Fetched::new(bytes).with_declared_type(OPAQUE_TYPE))
    }
}
