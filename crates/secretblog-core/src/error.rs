//! Error types for the secretblog client core.
//!
//! Separate layers get separate errors: key capture ([`KeyError`]), transport
//! ([`FetchError`]) and the full fetch-then-decrypt path ([`LoadError`]).
//! None of them carry key material or decrypted bytes.

use secretblog_crypto::CryptoError;
use thiserror::Error;

use crate::locator::Locator;

/// Why no key could be taken from the address fragment.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KeyError {
    /// The address has no fragment
    #[error("no key in address fragment")]
    Absent,

    /// The fragment is not a valid key of the configured length
    #[error("invalid key in address fragment: {0}")]
    Invalid(#[source] CryptoError),
}

/// Transport failure for a single resource.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// Host reported the resource does not exist
    #[error("resource not found: {locator}")]
    NotFound {
        /// Resource that was requested
        locator: Locator,
    },

    /// Host answered with a non-success status
    #[error("unexpected status {status} for {locator}")]
    Status {
        /// Resource that was requested
        locator: Locator,
        /// Status code returned
        status: u16,
    },

    /// Host could not be reached or the transfer broke off
    #[error("resource unreachable: {locator}: {reason}")]
    Unreachable {
        /// Resource that was requested
        locator: Locator,
        /// Transport-level description
        reason: String,
    },
}

impl FetchError {
    /// Resource the failure relates to.
    pub fn locator(&self) -> &Locator {
        match self {
            Self::NotFound { locator } | Self::Status { locator, .. } | Self::Unreachable { locator, .. } => {
                locator
            },
        }
    }
}

/// Coarse failure classes that callers handle differently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// Bytes never arrived
    Network,
    /// Bytes arrived but are not authentic content under this key
    Decryption,
}

/// Fetch-then-decrypt failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LoadError {
    /// Retrieval failed
    #[error(transparent)]
    Network(#[from] FetchError),

    /// Authentication failed (wrong key, tampering, truncation)
    #[error("cannot decrypt {locator}: {source}")]
    Decryption {
        /// Resource that was fetched
        locator: Locator,
        /// Underlying codec failure
        #[source]
        source: CryptoError,
    },

    /// Authentic plaintext that is not in the expected form
    #[error("malformed content in {locator}: {reason}")]
    Malformed {
        /// Resource that was fetched
        locator: Locator,
        /// What was wrong with it
        reason: String,
    },
}

impl LoadError {
    /// Classify this failure.
    ///
    /// Malformed plaintext is reported as a decryption failure: the caller
    /// cannot tell a wrong key from content it cannot interpret.
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Network(_) => FailureKind::Network,
            Self::Decryption { .. } | Self::Malformed { .. } => FailureKind::Decryption,
        }
    }

    /// Resource the failure relates to.
    pub fn locator(&self) -> &Locator {
        match self {
            Self::Network(err) => err.locator(),
            Self::Decryption { locator, .. } | Self::Malformed { locator, .. } => locator,
        }
    }
}
