//! Loader input events.
//!
//! Events come from two sources:
//! - The page: visibility batches and render confirmations
//! - The runtime: results of fetches the loader asked for

use std::sync::Arc;

use crate::{
    blob::BlobHandle,
    error::FailureKind,
    locator::Locator,
    markers::{ElementId, MediaKind},
    panorama::PanoramaCrop,
    tiles::{TileCoord, TileIndex},
};

/// Vertical extent in page pixels, `top <= bottom`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Span {
    /// Upper edge
    pub top: i64,
    /// Lower edge
    pub bottom: i64,
}

impl Span {
    /// Span from `top` covering `height` pixels, clamped at the page limits.
    pub fn new(top: i64, height: i64) -> Self {
        Self { top, bottom: top.saturating_add(height) }
    }

    /// Whether the spans overlap once `self` is grown by `margin` on each
    /// side. Touching edges count as overlapping.
    pub fn intersects(&self, other: &Span, margin: u32) -> bool {
        let margin = i64::from(margin);
        self.top.saturating_sub(margin) <= other.bottom
            && self.bottom.saturating_add(margin) >= other.top
    }
}

/// One element's position in a visibility batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisibilityEntry {
    /// Element reported on
    pub element: ElementId,
    /// Element's current extent
    pub bounds: Span,
}

/// Events processed by the loader.
#[derive(Debug, Clone)]
pub enum LoaderEvent {
    /// Batch of element positions relative to the current viewport.
    Viewport {
        /// Visible region
        viewport: Span,
        /// Positions of observed elements
        entries: Vec<VisibilityEntry>,
    },

    /// An image resource was decrypted into a blob.
    ImageDecrypted {
        /// Resource fetched
        locator: Locator,
        /// Blob holding the plaintext
        handle: BlobHandle,
    },

    /// A panorama resource was decrypted into a blob.
    PanoramaDecrypted {
        /// Resource fetched
        locator: Locator,
        /// Blob holding the plaintext
        handle: BlobHandle,
        /// Crop parameters, if the image carries them
        crop: Option<PanoramaCrop>,
    },

    /// A map's tile index was decrypted and parsed.
    MapDecrypted {
        /// Resource fetched
        locator: Locator,
        /// Parsed index
        index: Arc<TileIndex>,
    },

    /// Fetching or decrypting a resource failed.
    LoadFailed {
        /// Kind the resource was requested as
        kind: MediaKind,
        /// Resource fetched
        locator: Locator,
        /// Failure class
        failure: FailureKind,
    },

    /// The page finished rendering an element's content.
    DisplayReady {
        /// Element rendered
        element: ElementId,
    },

    /// A map asked for one of its tiles.
    TileRequested {
        /// Map element
        element: ElementId,
        /// Tile wanted
        tile: TileCoord,
    },

    /// A requested tile was decrypted into a blob.
    TileDecrypted {
        /// Map element
        element: ElementId,
        /// Tile fetched
        tile: TileCoord,
        /// Blob holding the plaintext
        handle: BlobHandle,
    },

    /// Fetching or decrypting a tile failed.
    TileFailed {
        /// Map element
        element: ElementId,
        /// Tile fetched
        tile: TileCoord,
    },

    /// The map finished rendering a tile.
    TileReady {
        /// Map element
        element: ElementId,
        /// Tile rendered
        tile: TileCoord,
    },
}
