//! Environment abstraction for the browsing session.
//!
//! Decouples key capture from browser facilities (the address bar and
//! session-scoped storage). Enables deterministic tests with an in-memory
//! environment and a headless viewer backed by process memory.

/// Browser facilities the Key Store depends on.
///
/// # Invariants
///
/// Implementations MUST guarantee:
///
/// - Session items live exactly as long as the browsing session: they
///   survive navigation within it and are never written to persistent
///   storage
/// - Nothing passed to [`set_session_item`](Self::set_session_item) is sent
///   over the network
/// - [`clear_location_fragment`](Self::clear_location_fragment) changes only
///   the visible address; it does not navigate or reload
pub trait Environment {
    /// Current address fragment without the leading `#`, if any.
    fn location_fragment(&self) -> Option<String>;

    /// Remove the fragment from the visible address.
    fn clear_location_fragment(&mut self);

    /// Read a session-scoped item.
    fn session_item(&self, name: &str) -> Option<String>;

    /// Write a session-scoped item.
    fn set_session_item(&mut self, name: &str, value: &str);
}
