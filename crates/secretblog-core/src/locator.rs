//! Resource locators.
//!
//! A locator is a site-relative path naming one encrypted resource. The page
//! body lives at [`Locator::root`], media at paths taken from markers and map
//! tiles at `tiles/<keyed name>`.

use std::fmt;

use thiserror::Error;

/// Path of the encrypted page body.
const ROOT: &str = "content";

/// Directory holding encrypted map tiles.
const TILE_DIR: &str = "tiles";

/// Rejected locator text.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LocatorError {
    /// Nothing to fetch
    #[error("empty locator")]
    Empty,

    /// Absolute paths, URLs and parent references escape the site
    #[error("locator escapes the site: {0:?}")]
    OutsideSite(String),
}

/// Site-relative path of an encrypted resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Locator(String);

impl Locator {
    /// Locator of the encrypted page body.
    pub fn root() -> Self {
        Self(ROOT.to_owned())
    }

    /// Locator of a map tile given its keyed name.
    pub fn tile(name: &str) -> Self {
        Self(format!("{TILE_DIR}/{name}"))
    }

    /// Validate a path taken from markup.
    ///
    /// Leading `./` is dropped. Absolute paths, anything with a scheme,
    /// backslashes and `..` segments are rejected.
    ///
    /// # Errors
    ///
    /// - `Empty`: nothing left after trimming
    /// - `OutsideSite`: the path does not stay under the site root
    pub fn parse(path: &str) -> Result<Self, LocatorError> {
        let trimmed = path.trim();
        let trimmed = trimmed.strip_prefix("./").map_or(trimmed, str::trim_start);
        if trimmed.is_empty() {
            return Err(LocatorError::Empty);
        }

        let escapes = trimmed.starts_with('/')
            || trimmed.contains(':')
            || trimmed.contains('\\')
            || trimmed.split('/').any(|segment| segment == "..");
        if escapes {
            return Err(LocatorError::OutsideSite(trimmed.to_owned()));
        }

        Ok(Self(trimmed.to_owned()))
    }

    /// Path text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
