//! Lazy loading of encrypted media.
//!
//! [`LazyLoader`] decides when each marked element starts loading and what
//! happens when its content arrives. It is a pure state machine: it consumes
//! [`LoaderEvent`]s (visibility reports, decrypted results, render
//! confirmations) and produces [`LoaderAction`]s for the runtime to execute.
//!
//! # Rules
//!
//! - Nothing is fetched before its element comes within the prefetch margin
//!   of the viewport
//! - Each resource is fetched at most once while a fetch is outstanding, and
//!   the result is applied to every element waiting on it
//! - At most [`LoaderConfig::max_viewers_per_batch`] panoramas or maps start
//!   per visibility batch; the rest stay pending
//! - A decrypted blob is revoked once every element showing it has rendered

mod action;
mod event;
mod machine;
mod state;

pub use action::LoaderAction;
pub use event::{LoaderEvent, Span, VisibilityEntry};
pub use machine::{LazyLoader, LoaderConfig};
pub use state::ElementState;
