//! Page trait for abstracting the rendering surface.
//!
//! The [`Page`] trait decouples the runtime from where content ends up. A
//! browser page sets element sources and opens viewers; the headless viewer
//! writes files; the simulation page records calls for assertions.

use std::{future::Future, sync::Arc};

use secretblog_core::{
    Blob, BlobHandle, ElementId, PanoramaCrop, Span, TileCoord, TileIndex, VisibilityEntry,
};

/// Inputs the page reports to the runtime.
#[derive(Debug, Clone, PartialEq)]
pub enum PageEvent {
    /// Positions of observed elements after a scroll or layout change.
    Viewport {
        /// Visible region
        viewport: Span,
        /// Positions of observed elements
        entries: Vec<VisibilityEntry>,
    },

    /// An element finished rendering what it was given.
    DisplayReady {
        /// Element rendered
        element: ElementId,
    },

    /// A map viewer wants a tile.
    TileRequested {
        /// Map element
        element: ElementId,
        /// Tile wanted
        tile: TileCoord,
    },

    /// A map viewer finished rendering a tile.
    TileReady {
        /// Map element
        element: ElementId,
        /// Tile rendered
        tile: TileCoord,
    },
}

/// Rendering surface driven by the [`Runtime`](crate::Runtime).
///
/// Blobs are lent for the duration of a call only. Implementations that need
/// the bytes later must copy them; the handle is revoked once the element
/// reports [`PageEvent::DisplayReady`].
pub trait Page: Send {
    /// Platform-specific error type.
    type Error: std::error::Error + Send + 'static;

    /// Replace the page body with decrypted markup.
    fn insert_content(&mut self, markup: &str) -> Result<(), Self::Error>;

    /// Display an image in an element.
    fn show_image(
        &mut self,
        element: ElementId,
        handle: BlobHandle,
        blob: &Blob,
    ) -> Result<(), Self::Error>;

    /// Open a panorama viewer in an element.
    fn show_panorama(
        &mut self,
        element: ElementId,
        handle: BlobHandle,
        blob: &Blob,
        crop: Option<PanoramaCrop>,
    ) -> Result<(), Self::Error>;

    /// Open a map viewer in an element.
    fn show_map(&mut self, element: ElementId, index: &Arc<TileIndex>) -> Result<(), Self::Error>;

    /// Give a map viewer one of its tiles.
    fn show_tile(
        &mut self,
        element: ElementId,
        tile: TileCoord,
        handle: BlobHandle,
        blob: &Blob,
    ) -> Result<(), Self::Error>;

    /// Wait for the next page event.
    ///
    /// Returns `None` when the page has nothing to report until it is given
    /// something new to render. Must be cancel safe: the runtime drops the
    /// future when a load completes first.
    fn next_event(&mut self) -> impl Future<Output = Result<Option<PageEvent>, Self::Error>> + Send;
}
