//! Resource fetcher backed by a local copy of the site.

use std::{
    io,
    path::{Path, PathBuf},
    sync::Arc,
};

use bytes::Bytes;
use secretblog_app::{Fetched, Fetcher};
use secretblog_core::{FetchError, Locator};

/// Serves encrypted files from a directory, as the static host would.
///
/// Locators never climb out of the site, so every path stays under the
/// root directory.
#[derive(Debug, Clone)]
pub struct DirFetcher {
    root: Arc<PathBuf>,
}

impl DirFetcher {
    /// Serve files under `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: Arc::new(root.into()) }
    }

    /// Site directory.
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl Fetcher for DirFetcher {
    async fn fetch(&self, locator: &Locator) -> Result<Fetched, FetchError> {
        let path = self.root.join(locator.as_str());
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Fetched::new(Bytes::from(bytes))),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                Err(FetchError::NotFound { locator: locator.clone() })
            },
            Err(err) => {
                Err(FetchError::Unreachable { locator: locator.clone(), reason: err.to_string() })
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reads_files_under_root() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("tiles")).unwrap();
        std::fs::write(dir.path().join("tiles/abc"), b"sealed").unwrap();

        let fetcher = DirFetcher::new(dir.path());
        let fetched = fetcher.fetch(&Locator::tile("abc")).await.unwrap();
        assert_eq!(fetched.bytes.as_ref(), b"sealed");
        assert_eq!(fetched.declared_type, None);
    }

    #[tokio::test]
    async fn missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = DirFetcher::new(dir.path());

        let err = fetcher.fetch(&Locator::root()).await.unwrap_err();
        assert!(matches!(err, FetchError::NotFound { .. }));
    }
}
