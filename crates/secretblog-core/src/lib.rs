//! secretblog Core
//!
//! Sans-IO logic for the client side of an encrypted static blog: key
//! capture, the session context, resource locators, the ephemeral blob
//! store, content markers, the map tile index and the lazy loader state
//! machine.
//!
//! Nothing in this crate performs I/O. Browser facilities come in through
//! the [`Environment`] trait; network and rendering are driven by the
//! caller from the [`LoaderAction`]s the [`LazyLoader`] produces. The same
//! code therefore runs under a real page and in deterministic tests.
//!
//! # Components
//!
//! - [`SessionContext`]: session key, imported content key, derived keys
//! - [`capture_key_from_location`]: Key Store entry point
//! - [`BlobStore`]: decrypted binary content addressable by [`BlobHandle`]
//! - [`scan_markers`]: finds pending encrypted resources in markup
//! - [`TileIndex`] / [`TileResolver`]: declared map tiles and their keyed
//!   names
//! - [`PanoramaCrop`]: equirectangular crop parameters from GPano metadata
//! - [`LazyLoader`]: visibility-gated, deduplicated load state machine

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod blob;
pub mod env;
mod error;
pub mod loader;
mod locator;
mod markers;
mod panorama;
mod session;
pub mod tiles;

pub use blob::{Blob, BlobHandle, BlobStore};
pub use env::Environment;
pub use error::{FailureKind, FetchError, KeyError, LoadError};
pub use loader::{
    ElementState, LazyLoader, LoaderAction, LoaderConfig, LoaderEvent, Span, VisibilityEntry,
};
pub use locator::{Locator, LocatorError};
pub use markers::{ElementId, Marker, MediaKind, scan_markers};
pub use panorama::PanoramaCrop;
pub use session::{
    ContentKeyScheme, KeyConfig, SESSION_KEY_ITEM, SessionContext, capture_key_from_location,
    session_key, try_capture_key,
};
pub use tiles::{Bounds, TileCoord, TileError, TileIndex, TileResolver};
