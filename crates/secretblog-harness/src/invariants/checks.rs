//! Standard run invariants.

use secretblog_core::{Locator, MediaKind};

use super::{Invariant, InvariantResult, RunSnapshot, Violation};

/// Every decrypted blob is revoked once a quiet run ends.
///
/// A live blob after the page has rendered everything means plaintext
/// outlived its use.
pub struct BlobsReleased;

impl Invariant for BlobsReleased {
    fn name(&self) -> &'static str {
        "blobs_released"
    }

    fn check(&self, state: &RunSnapshot) -> InvariantResult {
        if state.busy {
            return Ok(());
        }

        if state.live_blobs != 0 || state.unreleased_blobs != 0 {
            return Err(Violation {
                invariant: self.name(),
                message: format!(
                    "{} live blobs, {} awaiting release after run",
                    state.live_blobs, state.unreleased_blobs
                ),
            });
        }

        Ok(())
    }
}

/// Shared resources cross the network once.
///
/// An image result reaches every element sharing its locator, so an image
/// locator is fetched at most once. Viewers held back by the per-batch limit
/// start later and fetch again, so each viewer element may add one fetch.
/// Tiles are excluded; [`DeclaredTilesOnly`] covers them.
pub struct NoDuplicateFetches;

impl NoDuplicateFetches {
    fn allowed(state: &RunSnapshot, locator: &Locator) -> usize {
        let image = usize::from(state.uses(locator, MediaKind::Image) > 0);
        let viewers = state.uses(locator, MediaKind::Panorama) + state.uses(locator, MediaKind::Map);
        (image + viewers).max(1)
    }
}

impl Invariant for NoDuplicateFetches {
    fn name(&self) -> &'static str {
        "no_duplicate_fetches"
    }

    fn check(&self, state: &RunSnapshot) -> InvariantResult {
        for (locator, &count) in &state.requests {
            if locator.as_str().starts_with("tiles/") {
                continue;
            }

            let allowed = Self::allowed(state, locator);
            if count > allowed {
                return Err(Violation {
                    invariant: self.name(),
                    message: format!("{locator} fetched {count} times, at most {allowed} allowed"),
                });
            }
        }

        Ok(())
    }
}

/// Only tiles some opened map declared are ever requested.
pub struct DeclaredTilesOnly;

impl Invariant for DeclaredTilesOnly {
    fn name(&self) -> &'static str {
        "declared_tiles_only"
    }

    fn check(&self, state: &RunSnapshot) -> InvariantResult {
        let undeclared = state.requests.keys().find(|locator| {
            locator.as_str().starts_with("tiles/") && !state.declared_tiles.contains(*locator)
        });

        match undeclared {
            Some(locator) => Err(Violation {
                invariant: self.name(),
                message: format!("{locator} requested but never declared"),
            }),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn locator(path: &str) -> Locator {
        Locator::parse(path).unwrap()
    }

    #[test]
    fn live_blobs_violate_only_when_idle() {
        let mut state = RunSnapshot { live_blobs: 1, busy: true, ..RunSnapshot::default() };
        assert!(BlobsReleased.check(&state).is_ok());

        state.busy = false;
        let violation = BlobsReleased.check(&state).unwrap_err();
        assert_eq!(violation.invariant, "blobs_released");
    }

    fn used(state: &mut RunSnapshot, path: &str, kind: MediaKind, count: usize) {
        state.marker_uses.entry(locator(path)).or_default().insert(kind, count);
    }

    #[test]
    fn shared_image_fetched_twice_is_a_violation() {
        let mut state = RunSnapshot::default();
        used(&mut state, "a.jpg", MediaKind::Image, 2);
        state.requests.insert(locator("a.jpg"), 1);
        assert!(NoDuplicateFetches.check(&state).is_ok());

        state.requests.insert(locator("a.jpg"), 2);
        let violation = NoDuplicateFetches.check(&state).unwrap_err();
        assert_eq!(violation.invariant, "no_duplicate_fetches");
    }

    #[test]
    fn held_back_viewers_may_fetch_once_each() {
        let mut state = RunSnapshot::default();
        used(&mut state, "p.jpg", MediaKind::Panorama, 2);
        state.requests.insert(locator("p.jpg"), 2);
        assert!(NoDuplicateFetches.check(&state).is_ok());

        state.requests.insert(locator("p.jpg"), 3);
        assert!(NoDuplicateFetches.check(&state).is_err());
    }

    #[test]
    fn image_and_viewer_uses_of_one_locator_add_up() {
        let mut state = RunSnapshot::default();
        used(&mut state, "p.jpg", MediaKind::Image, 3);
        used(&mut state, "p.jpg", MediaKind::Panorama, 1);
        state.requests.insert(locator("p.jpg"), 2);
        assert!(NoDuplicateFetches.check(&state).is_ok());

        state.requests.insert(locator("p.jpg"), 3);
        assert!(NoDuplicateFetches.check(&state).is_err());
    }

    #[test]
    fn unmarked_locators_are_fetched_once() {
        let mut state = RunSnapshot::default();
        state.requests.insert(Locator::root(), 1);
        assert!(NoDuplicateFetches.check(&state).is_ok());

        state.requests.insert(Locator::root(), 2);
        assert!(NoDuplicateFetches.check(&state).is_err());
    }

    #[test]
    fn undeclared_tile_request_is_a_violation() {
        let mut state = RunSnapshot::default();
        state.requests.insert(locator("tiles/abc"), 1);
        assert!(DeclaredTilesOnly.check(&state).is_err());

        state.declared_tiles.insert(locator("tiles/abc"));
        assert!(DeclaredTilesOnly.check(&state).is_ok());
    }
}
