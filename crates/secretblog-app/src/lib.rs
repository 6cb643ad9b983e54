//! Application layer for secretblog
//!
//! Wires the pure [`secretblog_core::LazyLoader`] to real I/O: resources are
//! fetched through a [`Fetcher`], decrypted with the session's content key
//! and handed to a [`Page`]. The same [`Runtime`] drives a browser page, the
//! headless viewer and the simulation harness.
//!
//! # Components
//!
//! - [`Fetcher`]: Trait for retrieving encrypted bytes by locator
//! - [`ResourceFetcher`]: Fetch-then-decrypt with the session content key
//! - [`ContentLoader`]: Decrypts the page body, fail-closed
//! - [`Page`]: Trait for the rendering surface
//! - [`Runtime`]: Generic orchestration loop

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod content;
mod fetcher;
mod page;
mod resource;
mod runtime;

pub use content::ContentLoader;
pub use fetcher::{Fetched, Fetcher};
pub use page::{Page, PageEvent};
pub use resource::{IMAGE_JPEG, IMAGE_PNG, ResourceFetcher, media_type};
pub use runtime::{Boot, Runtime};
