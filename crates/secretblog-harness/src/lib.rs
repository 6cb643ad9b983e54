//! Deterministic simulation harness for secretblog testing.
//!
//! In-memory implementations of the [`secretblog_core::Environment`],
//! [`secretblog_app::Fetcher`] and [`secretblog_app::Page`] traits, so the
//! production [`secretblog_app::Runtime`] can be driven end to end without a
//! browser or a host.
//!
//! [`SiteBuilder`] plays the publishing side: it encrypts a page, its media
//! and its map tiles with seeded nonces and serves the result through a
//! [`SimFetcher`].
//!
//! # Invariant Testing
//!
//! The `invariants` module checks properties that must hold after any run,
//! whatever the document and scroll sequence. Use
//! [`InvariantRegistry::standard()`] for the common set.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod invariants;
pub mod sim_env;
pub mod sim_fetcher;
pub mod sim_page;
pub mod site;

pub use invariants::{
    BlobsReleased, DeclaredTilesOnly, Invariant, InvariantRegistry, InvariantResult,
    NoDuplicateFetches, RunSnapshot, Violation,
};
pub use sim_env::SimEnv;
pub use sim_fetcher::{FailureMode, SimFetcher};
pub use sim_page::{Rendered, SimPage, SimPageError};
pub use site::{Site, SiteBuilder};
