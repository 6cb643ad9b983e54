//! Per-element load state.

/// Where a marked element is in its load lifecycle.
///
/// ```text
/// Pending ──visible──▶ Loading ──decrypted──▶ Loaded
///                         │
///                         └──failed──▶ Failed
/// ```
///
/// `Loaded` and `Failed` are terminal. There are no automatic retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementState {
    /// Waiting to come into view.
    Pending,
    /// Fetch requested or joined.
    Loading,
    /// Content handed to the page.
    Loaded,
    /// Fetch or decryption failed.
    Failed,
}

impl ElementState {
    /// Whether no further transition can happen.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Loaded | Self::Failed)
    }
}
