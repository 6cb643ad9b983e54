//! Headless secretblog viewer.
//!
//! Opens a post from a local copy of the static site with the key from a
//! shared link, drives the full pipeline and exports the decrypted body and
//! media to a directory.
//!
//! # Components
//!
//! - [`DirFetcher`]: serves the encrypted site files from disk
//! - [`CliEnv`]: address fragment and in-memory session storage
//! - [`HeadlessPage`]: writes everything rendered into the output directory

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod cli_env;
mod dir_fetcher;
mod error;
mod headless;

use std::path::PathBuf;

use secretblog_app::{Boot, Runtime};
use secretblog_core::{ElementState, Environment, KeyConfig, LoaderConfig};

pub use cli_env::CliEnv;
pub use dir_fetcher::DirFetcher;
pub use error::ViewerError;
pub use headless::{CONTENT_FILE, HeadlessPage};

/// Viewer configuration.
#[derive(Debug, Clone)]
pub struct ViewerConfig {
    /// Directory holding the encrypted post
    pub site_dir: PathBuf,
    /// Directory to export into
    pub out_dir: PathBuf,
    /// How the session key is interpreted
    pub keys: KeyConfig,
    /// Loader tuning
    pub loader: LoaderConfig,
}

/// Outcome of a viewer run.
#[derive(Debug, Clone, Default)]
pub struct Report {
    /// Files exported, in order
    pub written: Vec<PathBuf>,
    /// Marked elements that rendered
    pub loaded: usize,
    /// Marked elements whose resource was unavailable
    pub failed: usize,
}

/// Decrypt the post in `config.site_dir` and export it.
///
/// Individual media failures are counted in the report, not returned.
///
/// # Errors
///
/// - [`ViewerError::NoKey`] if no usable key is available
/// - [`ViewerError::Content`] if the post body is missing or does not
///   authenticate; nothing is exported
/// - [`ViewerError::Write`] if the output directory cannot be written
pub async fn view<E: Environment>(
    env: &mut E,
    config: &ViewerConfig,
) -> Result<Report, ViewerError> {
    let fetcher = DirFetcher::new(&config.site_dir);
    let page = HeadlessPage::new(&config.out_dir);

    let mut runtime = match Runtime::boot(env, &config.keys, fetcher, page, config.loader).await? {
        Boot::Ready(runtime) => runtime,
        Boot::NoKey => return Err(ViewerError::NoKey),
        Boot::Failed(err) => return Err(ViewerError::Content(err)),
    };
    runtime.run().await?;

    let page = runtime.page();
    let loader = runtime.loader();
    let count = |state| {
        page.elements().iter().filter(|&&element| loader.state(element) == Some(state)).count()
    };

    Ok(Report {
        written: page.written().to_vec(),
        loaded: count(ElementState::Loaded),
        failed: count(ElementState::Failed),
    })
}
