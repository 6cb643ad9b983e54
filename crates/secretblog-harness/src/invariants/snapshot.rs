//! Observable state of a finished run.

use std::collections::{BTreeMap, BTreeSet};

use secretblog_app::Runtime;
use secretblog_core::{Locator, MediaKind, scan_markers};

use crate::{Rendered, SimFetcher, SimPage};

/// Snapshot of a run for invariant checking.
///
/// Captures what the host saw, what the page was given and what the runtime
/// still holds, without reaching into loader internals.
#[derive(Debug, Clone, Default)]
pub struct RunSnapshot {
    /// Loads were still running when captured
    pub busy: bool,
    /// Blobs not yet revoked
    pub live_blobs: usize,
    /// Blobs the loader is still waiting on a page to render
    pub unreleased_blobs: usize,
    /// Requests per locator
    pub requests: BTreeMap<Locator, usize>,
    /// Marked elements per locator and kind in the installed markup
    pub marker_uses: BTreeMap<Locator, BTreeMap<MediaKind, usize>>,
    /// Tile locators declared by every map the page opened
    pub declared_tiles: BTreeSet<Locator>,
}

impl RunSnapshot {
    /// Capture state after a run.
    pub fn capture(runtime: &Runtime<SimPage, SimFetcher>, host: &SimFetcher) -> Self {
        let mut requests = BTreeMap::new();
        for locator in host.requests() {
            *requests.entry(locator).or_insert(0) += 1;
        }

        let page = runtime.page();
        let mut marker_uses: BTreeMap<Locator, BTreeMap<MediaKind, usize>> = BTreeMap::new();
        for marker in scan_markers(page.content().as_deref().unwrap_or_default()) {
            *marker_uses.entry(marker.locator).or_default().entry(marker.kind).or_insert(0) += 1;
        }

        let mut declared_tiles = BTreeSet::new();
        for rendered in page.rendered() {
            let Rendered::Map { index, .. } = rendered else { continue };
            let resolver = runtime.session().tile_resolver(&index);
            declared_tiles
                .extend(index.tiles().filter_map(|tile| resolver.locator(tile).ok().flatten()));
        }

        Self {
            busy: runtime.is_busy(),
            live_blobs: runtime.blobs().live_count(),
            unreleased_blobs: runtime.loader().unreleased_blobs(),
            requests,
            marker_uses,
            declared_tiles,
        }
    }

    /// Elements of `kind` marked with `locator`.
    pub fn uses(&self, locator: &Locator, kind: MediaKind) -> usize {
        self.marker_uses.get(locator).and_then(|kinds| kinds.get(&kind)).copied().unwrap_or(0)
    }

    /// Requests made for `locator`.
    pub fn request_count(&self, locator: &Locator) -> usize {
        self.requests.get(locator).copied().unwrap_or(0)
    }
}
