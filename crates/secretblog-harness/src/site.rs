//! Encrypted site builder.
//!
//! Produces the files a publisher would upload: the page body, media, map
//! indexes and keyed tiles, all sealed with AES-GCM. Nonces come from a
//! seeded ChaCha RNG so every build of the same site is byte-identical.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use secretblog_core::{
    ContentKeyScheme, Environment, KeyConfig, Locator, LocatorError, SESSION_KEY_ITEM, TileCoord,
};
use secretblog_crypto::{
    ContentKey, CryptoError, Purpose, SessionKey, derive_key, derive_tile_name, encrypt,
};
use serde_json::json;

use crate::{SimEnv, SimFetcher};

enum Entry {
    Sealed { path: String, plaintext: Vec<u8> },
    Tile { tile: TileCoord, plaintext: Vec<u8> },
    Raw { path: String, bytes: Vec<u8> },
}

/// Builds an encrypted site for one session key.
pub struct SiteBuilder {
    session_key: SessionKey,
    scheme: ContentKeyScheme,
    rng: ChaCha20Rng,
    entries: Vec<Entry>,
}

impl SiteBuilder {
    /// Site whose content is sealed with the session key itself.
    pub fn new(seed: u64, session_key: SessionKey) -> Self {
        Self {
            session_key,
            scheme: ContentKeyScheme::Session,
            rng: ChaCha20Rng::seed_from_u64(seed),
            entries: Vec::new(),
        }
    }

    /// Site whose content is sealed with the derived files key.
    pub fn derived(seed: u64, session_key: SessionKey) -> Self {
        Self { scheme: ContentKeyScheme::Derived, ..Self::new(seed, session_key) }
    }

    /// Page body markup.
    #[must_use]
    pub fn content(self, markup: &str) -> Self {
        let root = Locator::root();
        self.media(root.as_str(), markup.as_bytes().to_vec())
    }

    /// Encrypted file at `path`.
    #[must_use]
    pub fn media(mut self, path: &str, plaintext: impl Into<Vec<u8>>) -> Self {
        self.entries.push(Entry::Sealed { path: path.to_owned(), plaintext: plaintext.into() });
        self
    }

    /// Map index at `path` declaring `tiles`, plus each tile under its keyed
    /// name.
    #[must_use]
    pub fn map(
        mut self,
        path: &str,
        features: serde_json::Value,
        tiles: impl IntoIterator<Item = (TileCoord, Vec<u8>)>,
    ) -> Self {
        let tiles: Vec<_> = tiles.into_iter().collect();
        let declared: Vec<String> = tiles.iter().map(|(tile, _)| tile.to_string()).collect();
        let index = json!({ "features": features, "tiles": declared });

        self = self.media(path, index.to_string().into_bytes());
        for (tile, plaintext) in tiles {
            self.entries.push(Entry::Tile { tile, plaintext });
        }
        self
    }

    /// File stored exactly as given, without encryption.
    #[must_use]
    pub fn raw(mut self, path: &str, bytes: impl Into<Vec<u8>>) -> Self {
        self.entries.push(Entry::Raw { path: path.to_owned(), bytes: bytes.into() });
        self
    }

    /// Seal everything and load it into a host.
    ///
    /// # Errors
    ///
    /// Returns an error if a path is not a valid site locator.
    pub fn build(mut self) -> Result<Site, LocatorError> {
        let Ok(content_key) = self.content_key() else {
            unreachable!("session and files keys are valid AES key sizes");
        };
        let names_key = derive_key(&self.session_key, Purpose::Names);
        let fetcher = SimFetcher::new();

        for entry in std::mem::take(&mut self.entries) {
            match entry {
                Entry::Sealed { path, plaintext } => {
                    let nonce = self.rng.r#gen();
                    fetcher.put(Locator::parse(&path)?, encrypt(&content_key, nonce, &plaintext));
                },
                Entry::Tile { tile, plaintext } => {
                    let Ok(name) = derive_tile_name(&names_key, tile.zoom, tile.x, tile.y) else {
                        unreachable!("names key is derived for tile names");
                    };
                    let nonce = self.rng.r#gen();
                    fetcher.put(Locator::tile(&name), encrypt(&content_key, nonce, &plaintext));
                },
                Entry::Raw { path, bytes } => fetcher.put(Locator::parse(&path)?, bytes),
            }
        }

        let config = KeyConfig { key_length: self.session_key.length(), content_key: self.scheme };
        Ok(Site { fetcher, fragment: self.session_key.encode(), config })
    }

    fn content_key(&self) -> Result<ContentKey, CryptoError> {
        match self.scheme {
            ContentKeyScheme::Session => ContentKey::import(self.session_key.as_bytes()),
            ContentKeyScheme::Derived => {
                ContentKey::import(derive_key(&self.session_key, Purpose::Files).as_bytes())
            },
        }
    }
}

/// A built site and the key needed to read it.
pub struct Site {
    /// Host serving the encrypted files
    pub fetcher: SimFetcher,
    /// Key configuration readers need
    pub config: KeyConfig,
    fragment: String,
}

impl Site {
    /// Address fragment carrying the key.
    pub fn fragment(&self) -> &str {
        &self.fragment
    }

    /// Session opened from a link carrying the key.
    pub fn visit(&self) -> SimEnv {
        SimEnv::with_fragment(self.fragment.clone())
    }

    /// Session that captured the key on an earlier page.
    pub fn revisit(&self) -> SimEnv {
        let mut env = SimEnv::new();
        env.set_session_item(SESSION_KEY_ITEM, &self.fragment);
        env
    }
}
