//! Fuzz target for content marker scanning
//!
//! Decrypted post bodies are authored markup, but a scanner that panics on
//! odd input takes the whole page down with it.
//!
//! # Invariants
//!
//! - NEVER panic on arbitrary text
//! - Element ids are assigned densely in document order
//! - Every locator found stays under the site root

#![no_main]

use libfuzzer_sys::fuzz_target;
use secretblog_core::{scan_markers, ElementId, Locator};

fuzz_target!(|markup: &str| {
    let markers = scan_markers(markup);

    for (i, marker) in markers.iter().enumerate() {
        assert_eq!(marker.element, ElementId(i as u32));
        assert!(
            Locator::parse(marker.locator.as_str()).is_ok(),
            "locator does not re-validate: {:?}",
            marker.locator
        );
    }
});
