//! Loader side effects.
//!
//! This module defines the [`LoaderAction`] enum, the instructions produced
//! by the [`crate::LazyLoader`] for the runtime to execute.

use std::sync::Arc;

use crate::{
    blob::BlobHandle,
    locator::Locator,
    markers::{ElementId, MediaKind},
    panorama::PanoramaCrop,
    tiles::{TileCoord, TileIndex},
};

/// Actions produced by the loader.
#[derive(Debug, Clone, PartialEq)]
pub enum LoaderAction {
    /// Fetch and decrypt a resource, then report the result.
    Fetch {
        /// Resource to fetch
        locator: Locator,
        /// How to interpret the plaintext
        kind: MediaKind,
    },

    /// Set an image element's source.
    ShowImage {
        /// Target element
        element: ElementId,
        /// Decrypted image
        handle: BlobHandle,
    },

    /// Open a panorama viewer in an element.
    ShowPanorama {
        /// Target element
        element: ElementId,
        /// Decrypted image
        handle: BlobHandle,
        /// Crop parameters, if known
        crop: Option<PanoramaCrop>,
    },

    /// Open a map viewer in an element.
    ShowMap {
        /// Target element
        element: ElementId,
        /// Track features and declared tiles
        index: Arc<TileIndex>,
    },

    /// Fetch and decrypt one declared tile of a map.
    FetchTile {
        /// Map element
        element: ElementId,
        /// Tile to fetch
        tile: TileCoord,
    },

    /// Hand a decrypted tile to a map.
    ShowTile {
        /// Map element
        element: ElementId,
        /// Tile position
        tile: TileCoord,
        /// Decrypted tile image
        handle: BlobHandle,
    },

    /// Release a blob no element still needs.
    Revoke {
        /// Blob to release
        handle: BlobHandle,
    },
}
