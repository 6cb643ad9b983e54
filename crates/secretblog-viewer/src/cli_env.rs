//! Browsing session for a single viewer run.

use std::collections::HashMap;

use secretblog_core::Environment;

/// Address fragment taken from a shared link, with session storage held in
/// process memory for the length of the run.
#[derive(Debug, Default)]
pub struct CliEnv {
    fragment: Option<String>,
    session: HashMap<String, String>,
}

impl CliEnv {
    /// Session opened from `link`.
    ///
    /// Accepts a full shared link (`https://host/post/#KEY`) or the bare
    /// fragment.
    pub fn from_link(link: &str) -> Self {
        let fragment = link.rsplit_once('#').map_or(link, |(_, fragment)| fragment).trim();
        Self { fragment: Some(fragment.to_owned()), session: HashMap::new() }
    }

    /// Fragment still visible, if the key was not captured.
    pub fn fragment(&self) -> Option<&str> {
        self.fragment.as_deref()
    }
}

impl Environment for CliEnv {
    fn location_fragment(&self) -> Option<String> {
        self.fragment.clone()
    }

    fn clear_location_fragment(&mut self) {
        self.fragment = None;
    }

    fn session_item(&self, name: &str) -> Option<String> {
        self.session.get(name).cloned()
    }

    fn set_session_item(&mut self, name: &str, value: &str) {
        self.session.insert(name.to_owned(), value.to_owned());
    }
}
