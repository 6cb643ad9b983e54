//! Simulation page implementing the Page trait.
//!
//! `SimPage` stands in for a browser document. Tests queue visibility
//! batches, the runtime renders into it, and everything it was given is
//! recorded for assertions. Clones share state, so a test keeps one clone
//! while the runtime owns another.

#![allow(clippy::disallowed_types, reason = "Synchronous locking operations only")]

use std::{
    collections::VecDeque,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use bytes::Bytes;
use secretblog_app::{Page, PageEvent};
use secretblog_core::{
    Blob, BlobHandle, ElementId, PanoramaCrop, Span, TileCoord, TileIndex, VisibilityEntry,
};

/// Error type for the simulation page.
#[derive(Debug, Clone)]
pub struct SimPageError(pub String);

impl std::fmt::Display for SimPageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SimPageError: {}", self.0)
    }
}

impl std::error::Error for SimPageError {}

/// Something the runtime handed to the page.
#[derive(Debug, Clone, PartialEq)]
pub enum Rendered {
    /// Image source set
    Image {
        /// Element
        element: ElementId,
        /// Handle the source pointed at
        handle: BlobHandle,
        /// Copy of the decrypted bytes
        bytes: Bytes,
        /// Media type of the blob
        mime: String,
    },
    /// Panorama viewer opened
    Panorama {
        /// Element
        element: ElementId,
        /// Handle the viewer was given
        handle: BlobHandle,
        /// Copy of the decrypted bytes
        bytes: Bytes,
        /// Media type of the blob
        mime: String,
        /// Crop parameters passed along
        crop: Option<PanoramaCrop>,
    },
    /// Map viewer opened
    Map {
        /// Element
        element: ElementId,
        /// Index the map was given
        index: Arc<TileIndex>,
    },
    /// Tile handed to a map
    Tile {
        /// Map element
        element: ElementId,
        /// Tile position
        tile: TileCoord,
        /// Copy of the decrypted bytes
        bytes: Bytes,
        /// Media type of the blob
        mime: String,
    },
}

impl Rendered {
    /// Element this was rendered into.
    pub fn element(&self) -> ElementId {
        match self {
            Self::Image { element, .. }
            | Self::Panorama { element, .. }
            | Self::Map { element, .. }
            | Self::Tile { element, .. } => *element,
        }
    }
}

#[derive(Default)]
struct PageState {
    events: VecDeque<PageEvent>,
    content: Option<String>,
    rendered: Vec<Rendered>,
    auto_ready: bool,
    auto_tiles: bool,
    reject_content: bool,
}

/// Simulated document.
#[derive(Clone, Default)]
pub struct SimPage {
    state: Arc<Mutex<PageState>>,
}

impl SimPage {
    /// Page that reports rendering done as soon as it is given something.
    pub fn new() -> Self {
        let page = Self::default();
        page.lock().auto_ready = true;
        page
    }

    /// Page that never confirms rendering on its own.
    pub fn manual() -> Self {
        Self::default()
    }

    /// Make maps request every declared tile as soon as they open.
    #[must_use]
    pub fn with_auto_tiles(self) -> Self {
        self.lock().auto_tiles = true;
        self
    }

    /// Make `insert_content` fail.
    #[must_use]
    pub fn rejecting_content(self) -> Self {
        self.lock().reject_content = true;
        self
    }

    fn lock(&self) -> MutexGuard<'_, PageState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queue an event for the runtime.
    pub fn push_event(&self, event: PageEvent) {
        self.lock().events.push_back(event);
    }

    /// Queue a batch reporting every listed element inside an 800px viewport.
    pub fn scroll_to(&self, elements: impl IntoIterator<Item = u32>) {
        let entries = elements
            .into_iter()
            .map(|id| VisibilityEntry { element: ElementId(id), bounds: Span::new(100, 200) })
            .collect();
        self.push_event(PageEvent::Viewport { viewport: Span::new(0, 800), entries });
    }

    /// Markup inserted into the page, if any.
    pub fn content(&self) -> Option<String> {
        self.lock().content.clone()
    }

    /// Everything rendered so far, in order.
    pub fn rendered(&self) -> Vec<Rendered> {
        self.lock().rendered.clone()
    }

    /// Rendered items for one element.
    pub fn rendered_into(&self, element: ElementId) -> Vec<Rendered> {
        self.lock().rendered.iter().filter(|r| r.element() == element).cloned().collect()
    }

    fn render(&self, item: Rendered, follow_up: impl IntoIterator<Item = PageEvent>) {
        let mut state = self.lock();
        state.rendered.push(item);
        if state.auto_ready {
            state.events.extend(follow_up);
        }
    }
}

impl Page for SimPage {
    type Error = SimPageError;

    fn insert_content(&mut self, markup: &str) -> Result<(), Self::Error> {
        let mut state = self.lock();
        if state.reject_content {
            return Err(SimPageError("content rejected".into()));
        }
        state.content = Some(markup.to_owned());
        Ok(())
    }

    fn show_image(
        &mut self,
        element: ElementId,
        handle: BlobHandle,
        blob: &Blob,
    ) -> Result<(), Self::Error> {
        let item = Rendered::Image {
            element,
            handle,
            bytes: blob.bytes.clone(),
            mime: blob.mime.clone(),
        };
        self.render(item, [PageEvent::DisplayReady { element }]);
        Ok(())
    }

    fn show_panorama(
        &mut self,
        element: ElementId,
        handle: BlobHandle,
        blob: &Blob,
        crop: Option<PanoramaCrop>,
    ) -> Result<(), Self::Error> {
        let item = Rendered::Panorama {
            element,
            handle,
            bytes: blob.bytes.clone(),
            mime: blob.mime.clone(),
            crop,
        };
        self.render(item, [PageEvent::DisplayReady { element }]);
        Ok(())
    }

    fn show_map(&mut self, element: ElementId, index: &Arc<TileIndex>) -> Result<(), Self::Error> {
        let mut state = self.lock();
        state.rendered.push(Rendered::Map { element, index: Arc::clone(index) });
        if state.auto_tiles {
            let requests: Vec<_> =
                index.tiles().map(|&tile| PageEvent::TileRequested { element, tile }).collect();
            state.events.extend(requests);
        }
        Ok(())
    }

    fn show_tile(
        &mut self,
        element: ElementId,
        tile: TileCoord,
        _handle: BlobHandle,
        blob: &Blob,
    ) -> Result<(), Self::Error> {
        let item = Rendered::Tile {
            element,
            tile,
            bytes: blob.bytes.clone(),
            mime: blob.mime.clone(),
        };
        self.render(item, [PageEvent::TileReady { element, tile }]);
        Ok(())
    }

    async fn next_event(&mut self) -> Result<Option<PageEvent>, Self::Error> {
        Ok(self.lock().events.pop_front())
    }
}
