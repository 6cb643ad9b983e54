//! Lazy loader state machine.

use std::{
    collections::{BTreeMap, BTreeSet, HashMap, HashSet},
    sync::Arc,
};

use crate::{
    blob::BlobHandle,
    locator::Locator,
    markers::{ElementId, Marker, MediaKind},
    tiles::{TileCoord, TileIndex},
};

use super::{ElementState, LoaderAction, LoaderEvent, Span, VisibilityEntry};

/// Loader tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoaderConfig {
    /// Distance from the viewport at which loading starts, in pixels.
    pub prefetch_margin_px: u32,
    /// Panoramas and maps started per visibility batch. `None` lifts the
    /// limit.
    pub max_viewers_per_batch: Option<usize>,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self { prefetch_margin_px: 50, max_viewers_per_batch: Some(1) }
    }
}

#[derive(Debug, Clone)]
struct Element {
    kind: MediaKind,
    locator: Locator,
    state: ElementState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TileState {
    Loading,
    Shown(BlobHandle),
    Done,
    Failed,
}

/// Visibility-gated loader for marked elements.
///
/// Pure state machine that processes events and produces actions.
/// No I/O dependencies - fully testable in simulation.
#[derive(Debug, Clone, Default)]
pub struct LazyLoader {
    config: LoaderConfig,
    elements: BTreeMap<ElementId, Element>,
    /// Outstanding fetches keyed by how the plaintext will be used.
    in_flight: HashSet<(MediaKind, Locator)>,
    /// Elements that still have to render each live blob.
    consumers: HashMap<BlobHandle, BTreeSet<ElementId>>,
    /// Blob each element was given and has not yet confirmed.
    shown: HashMap<ElementId, BlobHandle>,
    /// Tile indexes of loaded maps.
    maps: HashMap<ElementId, Arc<TileIndex>>,
    tiles: HashMap<(ElementId, TileCoord), TileState>,
}

impl LazyLoader {
    /// Create a loader with no registered elements.
    pub fn new(config: LoaderConfig) -> Self {
        Self { config, ..Self::default() }
    }

    /// Start tracking marked elements. Already known elements are ignored.
    pub fn register(&mut self, markers: &[Marker]) {
        for marker in markers {
            self.elements.entry(marker.element).or_insert_with(|| Element {
                kind: marker.kind,
                locator: marker.locator.clone(),
                state: ElementState::Pending,
            });
        }
    }

    /// Process an event and return actions.
    pub fn handle(&mut self, event: LoaderEvent) -> Vec<LoaderAction> {
        match event {
            LoaderEvent::Viewport { viewport, entries } => self.on_viewport(viewport, entries),
            LoaderEvent::ImageDecrypted { locator, handle } => {
                self.complete(MediaKind::Image, &locator, handle, |element| {
                    LoaderAction::ShowImage { element, handle }
                })
            },
            LoaderEvent::PanoramaDecrypted { locator, handle, crop } => {
                self.complete(MediaKind::Panorama, &locator, handle, |element| {
                    LoaderAction::ShowPanorama { element, handle, crop }
                })
            },
            LoaderEvent::MapDecrypted { locator, index } => {
                self.in_flight.remove(&(MediaKind::Map, locator.clone()));
                let targets = self.waiting(MediaKind::Map, &locator);
                targets
                    .into_iter()
                    .map(|element| {
                        self.set_state(element, ElementState::Loaded);
                        self.maps.insert(element, Arc::clone(&index));
                        LoaderAction::ShowMap { element, index: Arc::clone(&index) }
                    })
                    .collect()
            },
            LoaderEvent::LoadFailed { kind, locator, .. } => {
                self.in_flight.remove(&(kind, locator.clone()));
                for element in self.waiting(kind, &locator) {
                    self.set_state(element, ElementState::Failed);
                }
                vec![]
            },
            LoaderEvent::DisplayReady { element } => self.on_display_ready(element),
            LoaderEvent::TileRequested { element, tile } => {
                let declared = self.maps.get(&element).is_some_and(|index| index.is_declared(&tile));
                if !declared {
                    return vec![];
                }
                // Maps drop off-screen tiles and ask again; only an open
                // fetch or a failure holds a request back.
                let key = (element, tile);
                let mut actions = match self.tiles.get(&key).copied() {
                    Some(TileState::Loading | TileState::Failed) => return vec![],
                    Some(TileState::Shown(handle)) => vec![LoaderAction::Revoke { handle }],
                    Some(TileState::Done) | None => vec![],
                };
                self.tiles.insert(key, TileState::Loading);
                actions.push(LoaderAction::FetchTile { element, tile });
                actions
            },
            LoaderEvent::TileDecrypted { element, tile, handle } => {
                match self.tiles.get_mut(&(element, tile)) {
                    Some(state @ TileState::Loading) => {
                        *state = TileState::Shown(handle);
                        vec![LoaderAction::ShowTile { element, tile, handle }]
                    },
                    _ => vec![LoaderAction::Revoke { handle }],
                }
            },
            LoaderEvent::TileFailed { element, tile } => {
                if let Some(state @ TileState::Loading) = self.tiles.get_mut(&(element, tile)) {
                    *state = TileState::Failed;
                }
                vec![]
            },
            LoaderEvent::TileReady { element, tile } => {
                match self.tiles.get_mut(&(element, tile)) {
                    Some(state) => match *state {
                        TileState::Shown(handle) => {
                            *state = TileState::Done;
                            vec![LoaderAction::Revoke { handle }]
                        },
                        _ => vec![],
                    },
                    None => vec![],
                }
            },
        }
    }

    fn on_viewport(&mut self, viewport: Span, mut entries: Vec<VisibilityEntry>) -> Vec<LoaderAction> {
        entries.sort_by_key(|entry| entry.element);
        entries.dedup_by_key(|entry| entry.element);

        let mut actions = Vec::new();
        let mut viewers_started = 0usize;

        for entry in entries {
            if !entry.bounds.intersects(&viewport, self.config.prefetch_margin_px) {
                continue;
            }
            let Some(element) = self.elements.get_mut(&entry.element) else { continue };
            if element.state != ElementState::Pending {
                continue;
            }

            if element.kind.is_viewer() {
                if self.config.max_viewers_per_batch.is_some_and(|max| viewers_started >= max) {
                    continue;
                }
                viewers_started += 1;
            }

            element.state = ElementState::Loading;
            let key = (element.kind, element.locator.clone());
            if self.in_flight.insert(key) {
                actions.push(LoaderAction::Fetch {
                    locator: element.locator.clone(),
                    kind: element.kind,
                });
            }
        }

        actions
    }

    /// Hand a decrypted blob to every element waiting on it.
    ///
    /// A blob nobody is waiting for is revoked straight away.
    fn complete(
        &mut self,
        kind: MediaKind,
        locator: &Locator,
        handle: BlobHandle,
        show: impl Fn(ElementId) -> LoaderAction,
    ) -> Vec<LoaderAction> {
        self.in_flight.remove(&(kind, locator.clone()));

        let targets = self.waiting(kind, locator);
        if targets.is_empty() {
            return vec![LoaderAction::Revoke { handle }];
        }

        let mut actions = Vec::with_capacity(targets.len());
        for &element in &targets {
            self.set_state(element, ElementState::Loaded);
            self.shown.insert(element, handle);
            actions.push(show(element));
        }
        self.consumers.insert(handle, targets);
        actions
    }

    fn on_display_ready(&mut self, element: ElementId) -> Vec<LoaderAction> {
        let Some(handle) = self.shown.remove(&element) else { return vec![] };
        let Some(waiting) = self.consumers.get_mut(&handle) else { return vec![] };

        waiting.remove(&element);
        if waiting.is_empty() {
            self.consumers.remove(&handle);
            return vec![LoaderAction::Revoke { handle }];
        }
        vec![]
    }

    /// Elements that take the result of fetching `locator` as `kind`.
    ///
    /// Images apply to every element with the locator, visible or not.
    /// Viewers apply only to elements that were started, so the per-batch
    /// limit holds.
    fn waiting(&self, kind: MediaKind, locator: &Locator) -> BTreeSet<ElementId> {
        self.elements
            .iter()
            .filter(|(_, el)| el.kind == kind && &el.locator == locator)
            .filter(|(_, el)| match el.state {
                ElementState::Loading => true,
                ElementState::Pending => !kind.is_viewer(),
                ElementState::Loaded | ElementState::Failed => false,
            })
            .map(|(&id, _)| id)
            .collect()
    }

    fn set_state(&mut self, element: ElementId, state: ElementState) {
        if let Some(el) = self.elements.get_mut(&element) {
            el.state = state;
        }
    }

    /// Current state of an element, if registered.
    pub fn state(&self, element: ElementId) -> Option<ElementState> {
        self.elements.get(&element).map(|el| el.state)
    }

    /// Number of registered elements.
    pub fn element_count(&self) -> usize {
        self.elements.len()
    }

    /// Whether any resource fetch is outstanding.
    pub fn has_fetches_in_flight(&self) -> bool {
        !self.in_flight.is_empty()
            || self.tiles.values().any(|state| *state == TileState::Loading)
    }

    /// Blobs handed out that have not yet been released.
    pub fn unreleased_blobs(&self) -> usize {
        let tiles = self.tiles.values().filter(|s| matches!(s, TileState::Shown(_))).count();
        self.consumers.len() + tiles
    }

    /// Tile index of a loaded map.
    pub fn map_index(&self, element: ElementId) -> Option<&Arc<TileIndex>> {
        self.maps.get(&element)
    }

    /// Loader configuration.
    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }
}
