//! Page body loading.

use secretblog_core::{LoadError, Locator};

use crate::{Fetcher, ResourceFetcher};

/// Loads the encrypted page body.
///
/// Fail-closed: the body is either the complete authenticated plaintext or
/// an error. There is no partial result to render.
pub struct ContentLoader<'a, F> {
    resources: &'a ResourceFetcher<F>,
    locator: Locator,
}

impl<'a, F: Fetcher> ContentLoader<'a, F> {
    /// Load the body from its default location.
    pub fn new(resources: &'a ResourceFetcher<F>) -> Self {
        Self { resources, locator: Locator::root() }
    }

    /// Load the body from `locator` instead.
    #[must_use]
    pub fn with_locator(mut self, locator: Locator) -> Self {
        self.locator = locator;
        self
    }

    /// Fetch and decrypt the page markup.
    ///
    /// # Errors
    ///
    /// Any [`LoadError`]; the page must then be left as it is.
    pub async fn load(&self) -> Result<String, LoadError> {
        let markup = self.resources.fetch_and_decrypt_to_text(&self.locator).await?;
        tracing::debug!(locator = %self.locator, bytes = markup.len(), "content decrypted");
        Ok(markup)
    }
}
