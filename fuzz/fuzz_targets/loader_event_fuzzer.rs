//! Fuzz target for the lazy loader state machine
//!
//! # Strategy
//!
//! - Documents: images, panoramas and maps sharing a few locators
//! - Scrolls: arbitrary visibility batches at arbitrary offsets
//! - Completions: outstanding fetches resolved in arbitrary order, as
//!   successes, network failures or decryption failures
//! - Page feedback: display and tile confirmations for any element
//!
//! # Invariants
//!
//! - No fetch is issued for a resource already in flight
//! - At most one viewer fetch is started per visibility batch
//! - Only declared tiles are ever fetched, and never while in flight
//! - No blob is shown after it was revoked, or revoked twice
//! - Every live blob is accounted for by the loader

#![no_main]

use std::sync::Arc;

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use secretblog_core::{
    scan_markers, BlobStore, ElementId, FailureKind, LazyLoader, LoaderAction, LoaderConfig,
    LoaderEvent, Locator, MediaKind, Span, TileCoord, TileIndex, VisibilityEntry,
};

#[derive(Debug, Clone, Arbitrary)]
struct Scenario {
    elements: Vec<(u8, u8)>,
    ops: Vec<LoaderOp>,
}

#[derive(Debug, Clone, Arbitrary)]
enum LoaderOp {
    Scroll { elements: Vec<u8>, offset: i16 },
    CompleteFetch { slot: u8, outcome: Outcome },
    DisplayReady { element: u8 },
    RequestTile { element: u8, tile: bool },
    CompleteTile { slot: u8, ok: bool },
    TileReady { element: u8, tile: bool },
}

#[derive(Debug, Clone, Copy, Arbitrary)]
enum Outcome {
    Decrypted,
    Network,
    Decryption,
}

fn element(id: u8) -> ElementId {
    ElementId(u32::from(id % 10))
}

/// The declared tile, or its undeclared neighbour.
fn tile(declared: bool) -> TileCoord {
    let text = if declared { "5_3_7" } else { "5_3_8" };
    text.parse().unwrap()
}

fn markup(elements: &[(u8, u8)]) -> String {
    elements
        .iter()
        .take(8)
        .map(|&(kind, resource)| {
            let path = format!("r{}.jpg", resource % 3);
            match kind % 3 {
                0 => format!(r#"<img data-src="{path}">"#),
                1 => format!(r#"<div data-panorama="{path}"></div>"#),
                _ => format!(r#"<div data-map="{path}"></div>"#),
            }
        })
        .collect()
}

fuzz_target!(|scenario: Scenario| {
    let mut loader = LazyLoader::new(LoaderConfig::default());
    loader.register(&scan_markers(&markup(&scenario.elements)));

    let index = Arc::new(TileIndex::new(serde_json::Value::Null, [tile(true)]));
    let mut blobs = BlobStore::new();
    let mut fetches: Vec<(MediaKind, Locator)> = Vec::new();
    let mut tile_fetches: Vec<(ElementId, TileCoord)> = Vec::new();

    for op in scenario.ops {
        let event = match op {
            LoaderOp::Scroll { elements, offset } => LoaderEvent::Viewport {
                viewport: Span::new(i64::from(offset), 800),
                entries: elements
                    .iter()
                    .map(|&id| VisibilityEntry { element: element(id), bounds: Span::new(0, 100) })
                    .collect(),
            },
            LoaderOp::CompleteFetch { slot, outcome } => {
                if fetches.is_empty() {
                    continue;
                }
                let (kind, locator) = fetches.remove(usize::from(slot) % fetches.len());
                match (outcome, kind) {
                    (Outcome::Network, _) => {
                        LoaderEvent::LoadFailed { kind, locator, failure: FailureKind::Network }
                    }
                    (Outcome::Decryption, _) => {
                        LoaderEvent::LoadFailed { kind, locator, failure: FailureKind::Decryption }
                    }
                    (Outcome::Decrypted, MediaKind::Image) => LoaderEvent::ImageDecrypted {
                        locator,
                        handle: blobs.create(vec![0u8], "image/jpeg"),
                    },
                    (Outcome::Decrypted, MediaKind::Panorama) => LoaderEvent::PanoramaDecrypted {
                        locator,
                        handle: blobs.create(vec![0u8], "image/jpeg"),
                        crop: None,
                    },
                    (Outcome::Decrypted, MediaKind::Map) => {
                        LoaderEvent::MapDecrypted { locator, index: Arc::clone(&index) }
                    }
                }
            }
            LoaderOp::DisplayReady { element: id } => LoaderEvent::DisplayReady { element: element(id) },
            LoaderOp::RequestTile { element: id, tile: declared } => {
                LoaderEvent::TileRequested { element: element(id), tile: tile(declared) }
            }
            LoaderOp::CompleteTile { slot, ok } => {
                if tile_fetches.is_empty() {
                    continue;
                }
                let (element, tile) = tile_fetches.remove(usize::from(slot) % tile_fetches.len());
                if ok {
                    let handle = blobs.create(vec![0u8], "image/png");
                    LoaderEvent::TileDecrypted { element, tile, handle }
                } else {
                    LoaderEvent::TileFailed { element, tile }
                }
            }
            LoaderOp::TileReady { element: id, tile: declared } => {
                LoaderEvent::TileReady { element: element(id), tile: tile(declared) }
            }
        };

        let mut viewers_started = 0;
        for action in loader.handle(event) {
            match action {
                LoaderAction::Fetch { locator, kind } => {
                    let key = (kind, locator);
                    assert!(!fetches.contains(&key), "duplicate fetch in flight: {key:?}");
                    if kind.is_viewer() {
                        viewers_started += 1;
                    }
                    fetches.push(key);
                }
                LoaderAction::FetchTile { element, tile } => {
                    assert!(index.is_declared(&tile), "undeclared tile fetched: {tile}");
                    assert!(!tile_fetches.contains(&(element, tile)), "tile fetched while in flight");
                    tile_fetches.push((element, tile));
                }
                LoaderAction::ShowImage { handle, .. }
                | LoaderAction::ShowPanorama { handle, .. }
                | LoaderAction::ShowTile { handle, .. } => {
                    assert!(blobs.get(handle).is_some(), "revoked blob shown: {handle}");
                }
                LoaderAction::ShowMap { .. } => {}
                LoaderAction::Revoke { handle } => {
                    assert!(blobs.revoke(handle), "blob revoked twice: {handle}");
                }
            }
        }

        assert!(viewers_started <= 1, "{viewers_started} viewers started in one batch");
        assert_eq!(blobs.live_count(), loader.unreleased_blobs());
    }
});
