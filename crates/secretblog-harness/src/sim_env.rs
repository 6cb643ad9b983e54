//! In-memory browsing session.

use std::collections::HashMap;

use secretblog_core::Environment;

/// Address bar and session storage for one simulated browsing session.
///
/// [`navigate`](Self::navigate) models following a link within the same
/// session: the fragment changes, session storage survives.
#[derive(Debug, Clone, Default)]
pub struct SimEnv {
    fragment: Option<String>,
    storage: HashMap<String, String>,
    fragment_clears: usize,
}

impl SimEnv {
    /// Fresh session with no fragment.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fresh session opened from a link carrying `fragment`.
    pub fn with_fragment(fragment: impl Into<String>) -> Self {
        Self { fragment: Some(fragment.into()), ..Self::default() }
    }

    /// Load another page in the same session.
    pub fn navigate(&mut self, fragment: Option<&str>) {
        self.fragment = fragment.map(str::to_owned);
    }

    /// Fragment currently visible in the address bar.
    pub fn fragment(&self) -> Option<&str> {
        self.fragment.as_deref()
    }

    /// Everything in session storage.
    pub fn storage(&self) -> &HashMap<String, String> {
        &self.storage
    }

    /// How many times the fragment was cleared.
    pub fn fragment_clears(&self) -> usize {
        self.fragment_clears
    }
}

impl Environment for SimEnv {
    fn location_fragment(&self) -> Option<String> {
        self.fragment.clone()
    }

    fn clear_location_fragment(&mut self) {
        self.fragment = None;
        self.fragment_clears += 1;
    }

    fn session_item(&self, name: &str) -> Option<String> {
        self.storage.get(name).cloned()
    }

    fn set_session_item(&mut self, name: &str, value: &str) {
        self.storage.insert(name.to_owned(), value.to_owned());
    }
}
