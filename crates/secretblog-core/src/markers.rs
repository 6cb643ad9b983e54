//! Content markers.
//!
//! Decrypted page markup refers to encrypted media through data attributes
//! instead of real sources, so the browser never requests anything on its
//! own:
//!
//! | Attribute       | Kind                        |
//! |-----------------|-----------------------------|
//! | `data-src`      | [`MediaKind::Image`]        |
//! | `data-panorama` | [`MediaKind::Panorama`]     |
//! | `data-map`      | [`MediaKind::Map`]          |
//! | `data-geojson`  | [`MediaKind::Map`] (legacy) |
//!
//! The scanner only needs start tags and their attributes. It is not an
//! HTML parser and does not try to be one.

use crate::locator::Locator;

/// Position of a marked element in document order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(pub u32);

/// How a resource is presented once decrypted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MediaKind {
    /// Plain image
    Image,
    /// Equirectangular panorama in an interactive viewer
    Panorama,
    /// Tiled map with a track overlay
    Map,
}

impl MediaKind {
    fn from_attribute(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "data-src" => Some(Self::Image),
            "data-panorama" => Some(Self::Panorama),
            "data-map" | "data-geojson" => Some(Self::Map),
            _ => None,
        }
    }

    /// Whether presenting this kind needs an interactive viewer.
    pub fn is_viewer(self) -> bool {
        matches!(self, Self::Panorama | Self::Map)
    }
}

/// An element awaiting an encrypted resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Marker {
    /// Element identity, stable for the lifetime of the page
    pub element: ElementId,
    /// How to present the resource
    pub kind: MediaKind,
    /// Encrypted resource to fetch
    pub locator: Locator,
}

/// Find all marked elements in `markup`, in document order.
///
/// The first marker attribute on an element wins. Markers whose path does
/// not stay inside the site are skipped. Comments are ignored.
pub fn scan_markers(markup: &str) -> Vec<Marker> {
    let mut markers = Vec::new();
    let mut rest = markup;

    while let Some(open) = rest.find('<') {
        let after = &rest[open + 1..];

        if let Some(comment) = after.strip_prefix("!--") {
            match comment.find("-->") {
                Some(end) => {
                    rest = &comment[end + 3..];
                    continue;
                },
                None => break,
            }
        }

        // An unterminated value ends at the first `>` so later tags survive.
        let Some(close) = tag_end(after).or_else(|| after.find('>')) else { break };
        let tag = &after[..close];
        rest = &after[close + 1..];

        if !tag.starts_with(|c: char| c.is_ascii_alphabetic()) {
            continue;
        }

        let found = Attributes::new(tag).find_map(|(name, value)| {
            let kind = MediaKind::from_attribute(name)?;
            let locator = Locator::parse(&unescape(value)).ok()?;
            Some((kind, locator))
        });

        if let Some((kind, locator)) = found {
            let element = ElementId(markers.len() as u32);
            markers.push(Marker { element, kind, locator });
        }
    }

    markers
}

/// Index of the `>` closing a tag, ignoring any inside quoted values.
///
/// Quotes only open a value directly after `=`; elsewhere they are literal.
fn tag_end(tag: &str) -> Option<usize> {
    let mut quote = None;
    let mut value_start = false;
    for (i, c) in tag.char_indices() {
        match (quote, c) {
            (Some(q), _) if q == c => quote = None,
            (Some(_), _) => {},
            (None, '>') => return Some(i),
            (None, '"' | '\'') if value_start => quote = Some(c),
            (None, '=') => {
                value_start = true;
                continue;
            },
            (None, c) if c.is_whitespace() => continue,
            (None, _) => {},
        }
        value_start = false;
    }
    None
}

/// Attribute pairs of a start tag, skipping the tag name.
///
/// Valueless attributes yield an empty value.
struct Attributes<'a> {
    rest: &'a str,
}

impl<'a> Attributes<'a> {
    fn new(tag: &'a str) -> Self {
        let name_end = tag.find(|c: char| c.is_whitespace() || c == '/').unwrap_or(tag.len());
        Self { rest: &tag[name_end..] }
    }
}

impl<'a> Iterator for Attributes<'a> {
    type Item = (&'a str, &'a str);

    fn next(&mut self) -> Option<Self::Item> {
        let rest = self.rest.trim_start_matches(|c: char| c.is_whitespace() || c == '/');
        if rest.is_empty() {
            return None;
        }

        let name_end =
            rest.find(|c: char| c.is_whitespace() || c == '=' || c == '/').unwrap_or(rest.len());
        let name = &rest[..name_end];
        let after_name = rest[name_end..].trim_start();

        let Some(after_eq) = after_name.strip_prefix('=') else {
            self.rest = after_name;
            return Some((name, ""));
        };
        let after_eq = after_eq.trim_start();

        let (value, remaining) = match after_eq.chars().next() {
            Some(q @ ('"' | '\'')) => {
                let body = &after_eq[1..];
                match body.find(q) {
                    Some(end) => (&body[..end], &body[end + 1..]),
                    None => (body, ""),
                }
            },
            _ => {
                let end = after_eq.find(char::is_whitespace).unwrap_or(after_eq.len());
                (&after_eq[..end], &after_eq[end..])
            },
        };

        self.rest = remaining;
        Some((name, value))
    }
}

/// Decode the handful of entities that show up in paths.
fn unescape(value: &str) -> String {
    if !value.contains('&') {
        return value.to_owned();
    }
    value
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}
