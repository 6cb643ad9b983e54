//! Generic runtime for page orchestration.
//!
//! The Runtime drives the page event loop, coordinating between:
//! - [`LazyLoader`]: load decisions
//! - [`ResourceFetcher`]: concurrent fetch-and-decrypt tasks
//! - [`Page`]: platform-specific rendering

use std::sync::Arc;

use secretblog_core::{
    BlobStore, ElementId, Environment, FailureKind, KeyConfig, LazyLoader, LoadError,
    LoaderAction, LoaderConfig, LoaderEvent, Locator, MediaKind, PanoramaCrop, SessionContext,
    TileCoord, TileIndex, scan_markers,
};
use tokio::task::JoinSet;

use crate::{
    ContentLoader, Fetcher, IMAGE_JPEG, IMAGE_PNG, Page, PageEvent, ResourceFetcher, media_type,
};

/// Result of a background load.
enum Completion {
    Resource { kind: MediaKind, locator: Locator, result: Result<Vec<u8>, LoadError> },
    Tile { element: ElementId, tile: TileCoord, result: Result<Vec<u8>, LoadError> },
}

/// Type for a decrypted image or panorama.
///
/// Published media is JPEG; an explicit extension takes precedence.
fn image_type(locator: &Locator) -> &'static str {
    media_type(locator).unwrap_or(IMAGE_JPEG)
}

/// How starting up a page went.
pub enum Boot<P, F> {
    /// Content is installed and media can be loaded.
    Ready(Runtime<P, F>),
    /// No key in the address or the session; the page was not touched.
    NoKey,
    /// The body could not be loaded; the page was not touched.
    Failed(LoadError),
}

impl<P, F> std::fmt::Debug for Boot<P, F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ready(_) => f.write_str("Ready"),
            Self::NoKey => f.write_str("NoKey"),
            Self::Failed(err) => f.debug_tuple("Failed").field(err).finish(),
        }
    }
}

/// Generic runtime that orchestrates the loader, fetches and the page.
///
/// # Type Parameters
///
/// - `P`: Rendering surface
/// - `F`: Transport for encrypted resources
pub struct Runtime<P, F> {
    page: P,
    resources: ResourceFetcher<F>,
    loader: LazyLoader,
    blobs: BlobStore,
    tasks: JoinSet<Completion>,
    /// Page reported nothing further since it was last given something.
    page_quiet: bool,
}

impl<P, F> Runtime<P, F>
where
    P: Page,
    F: Fetcher,
{
    /// Create a runtime for a page whose content is already installed.
    pub fn new(page: P, resources: ResourceFetcher<F>, config: LoaderConfig) -> Self {
        Self {
            page,
            resources,
            loader: LazyLoader::new(config),
            blobs: BlobStore::new(),
            tasks: JoinSet::new(),
            page_quiet: false,
        }
    }

    /// Establish the session key, decrypt the body and install it.
    ///
    /// The page is only modified once the body has authenticated. Markers in
    /// the installed markup are registered with the loader.
    ///
    /// # Errors
    ///
    /// Returns an error if the page rejects the content.
    pub async fn boot<E: Environment>(
        env: &mut E,
        keys: &KeyConfig,
        fetcher: F,
        mut page: P,
        config: LoaderConfig,
    ) -> Result<Boot<P, F>, P::Error> {
        let Some(session) = SessionContext::establish(env, keys) else {
            tracing::info!("no key available, leaving page untouched");
            return Ok(Boot::NoKey);
        };

        let resources = ResourceFetcher::new(fetcher, Arc::new(session));
        let markup = match ContentLoader::new(&resources).load().await {
            Ok(markup) => markup,
            Err(err) => {
                tracing::info!(failure = ?err.kind(), "content unavailable, leaving page untouched");
                return Ok(Boot::Failed(err));
            },
        };

        page.insert_content(&markup)?;
        let markers = scan_markers(&markup);
        tracing::debug!(markers = markers.len(), "content installed");

        let mut runtime = Self::new(page, resources, config);
        runtime.loader.register(&markers);
        Ok(Boot::Ready(runtime))
    }

    /// Run the event loop until the page goes quiet.
    ///
    /// Page events and load completions are processed as they arrive. A
    /// quiet page is polled again once it has been given something new to
    /// render. Returns when the page is quiet and every load has completed.
    /// Each call polls the page at least once, so events queued after an
    /// earlier run are picked up.
    ///
    /// # Errors
    ///
    /// Returns an error if the page fails to render.
    pub async fn run(&mut self) -> Result<(), P::Error> {
        self.page_quiet = false;
        loop {
            if self.page_quiet && self.tasks.is_empty() {
                break;
            }

            tokio::select! {
                biased;

                Some(joined) = self.tasks.join_next(), if !self.tasks.is_empty() => {
                    match joined {
                        Ok(completion) => self.complete(completion)?,
                        Err(err) => tracing::error!(%err, "load task aborted"),
                    }
                },
                event = self.page.next_event(), if !self.page_quiet => {
                    match event? {
                        Some(event) => self.page_event(event)?,
                        None => self.page_quiet = true,
                    }
                },
            }
        }

        Ok(())
    }

    /// Feed a page event to the loader.
    ///
    /// # Errors
    ///
    /// Returns an error if the page fails to render.
    pub fn page_event(&mut self, event: PageEvent) -> Result<(), P::Error> {
        let event = match event {
            PageEvent::Viewport { viewport, entries } => LoaderEvent::Viewport { viewport, entries },
            PageEvent::DisplayReady { element } => LoaderEvent::DisplayReady { element },
            PageEvent::TileRequested { element, tile } => {
                LoaderEvent::TileRequested { element, tile }
            },
            PageEvent::TileReady { element, tile } => LoaderEvent::TileReady { element, tile },
        };
        let actions = self.loader.handle(event);
        self.process_actions(actions)
    }

    fn complete(&mut self, completion: Completion) -> Result<(), P::Error> {
        let event = match completion {
            Completion::Resource { kind, locator, result: Ok(plaintext) } => {
                self.decrypted(kind, locator, plaintext)
            },
            Completion::Resource { kind, locator, result: Err(err) } => {
                tracing::debug!(%locator, ?kind, failure = ?err.kind(), "resource unavailable");
                LoaderEvent::LoadFailed { kind, locator, failure: err.kind() }
            },
            Completion::Tile { element, tile, result: Ok(plaintext) } => {
                let handle = self.blobs.create(plaintext, IMAGE_PNG);
                LoaderEvent::TileDecrypted { element, tile, handle }
            },
            Completion::Tile { element, tile, result: Err(err) } => {
                tracing::debug!(?element, failure = ?err.kind(), "tile unavailable");
                LoaderEvent::TileFailed { element, tile }
            },
        };

        let actions = self.loader.handle(event);
        self.process_actions(actions)
    }

    fn decrypted(&mut self, kind: MediaKind, locator: Locator, plaintext: Vec<u8>) -> LoaderEvent {
        match kind {
            MediaKind::Image => {
                let handle = self.blobs.create(plaintext, image_type(&locator));
                LoaderEvent::ImageDecrypted { locator, handle }
            },
            MediaKind::Panorama => {
                let crop = PanoramaCrop::from_image(&plaintext);
                let handle = self.blobs.create(plaintext, image_type(&locator));
                LoaderEvent::PanoramaDecrypted { locator, handle, crop }
            },
            MediaKind::Map => {
                let index =
                    std::str::from_utf8(&plaintext).ok().and_then(|text| TileIndex::parse(text).ok());
                match index {
                    Some(index) => LoaderEvent::MapDecrypted { locator, index: Arc::new(index) },
                    None => {
                        tracing::debug!(%locator, "map index unusable");
                        LoaderEvent::LoadFailed { kind, locator, failure: FailureKind::Decryption }
                    },
                }
            },
        }
    }

    fn process_actions(&mut self, initial: Vec<LoaderAction>) -> Result<(), P::Error> {
        let mut pending = initial;

        while !pending.is_empty() {
            for action in std::mem::take(&mut pending) {
                match action {
                    LoaderAction::Fetch { locator, kind } => {
                        tracing::debug!(%locator, ?kind, "fetching");
                        let resources = self.resources.clone();
                        self.tasks.spawn(async move {
                            let result = resources.fetch_and_decrypt(&locator).await;
                            Completion::Resource { kind, locator, result }
                        });
                    },
                    LoaderAction::ShowImage { element, handle } => {
                        if let Some(blob) = self.blobs.get(handle) {
                            self.page.show_image(element, handle, blob)?;
                            self.page_quiet = false;
                        }
                    },
                    LoaderAction::ShowPanorama { element, handle, crop } => {
                        if let Some(blob) = self.blobs.get(handle) {
                            self.page.show_panorama(element, handle, blob, crop)?;
                            self.page_quiet = false;
                        }
                    },
                    LoaderAction::ShowMap { element, index } => {
                        self.page.show_map(element, &index)?;
                        self.page_quiet = false;
                    },
                    LoaderAction::FetchTile { element, tile } => {
                        if let Some(event) = self.spawn_tile(element, tile) {
                            pending.extend(self.loader.handle(event));
                        }
                    },
                    LoaderAction::ShowTile { element, tile, handle } => {
                        if let Some(blob) = self.blobs.get(handle) {
                            self.page.show_tile(element, tile, handle, blob)?;
                            self.page_quiet = false;
                        }
                    },
                    LoaderAction::Revoke { handle } => {
                        self.blobs.revoke(handle);
                    },
                }
            }
        }

        Ok(())
    }

    /// Start fetching a declared tile.
    ///
    /// Returns the failure event to feed back if the tile cannot be named.
    fn spawn_tile(&mut self, element: ElementId, tile: TileCoord) -> Option<LoaderEvent> {
        let index = self.loader.map_index(element)?;
        let locator = match self.resources.session().tile_resolver(index).locator(&tile) {
            Ok(Some(locator)) => locator,
            Ok(None) | Err(_) => return Some(LoaderEvent::TileFailed { element, tile }),
        };

        let resources = self.resources.clone();
        self.tasks.spawn(async move {
            let result = resources.fetch_and_decrypt(&locator).await;
            Completion::Tile { element, tile, result }
        });
        None
    }

    /// Loader state.
    pub fn loader(&self) -> &LazyLoader {
        &self.loader
    }

    /// Decrypted blobs not yet revoked.
    pub fn blobs(&self) -> &BlobStore {
        &self.blobs
    }

    /// Session key material.
    pub fn session(&self) -> &Arc<SessionContext> {
        self.resources.session()
    }

    /// The page being driven.
    pub fn page(&self) -> &P {
        &self.page
    }

    /// Whether any load is still running.
    pub fn is_busy(&self) -> bool {
        !self.tasks.is_empty()
    }
}
