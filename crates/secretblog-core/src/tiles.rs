//! Map tiles: coordinates, the per-map tile index and keyed tile locators.
//!
//! Tiles use the Web Mercator `z/x/y` scheme. Each map ships a decrypted
//! index declaring the track features and the tiles that were published for
//! it; only declared tiles are ever requested. The storage name of a tile is
//! keyed (see [`secretblog_crypto::derive_tile_name`]), so the index, not the
//! host, is the only place the coverage of a map is visible.

use std::{
    collections::{BTreeSet, HashSet},
    f64::consts::PI,
    fmt,
    str::FromStr,
};

use secretblog_crypto::{CryptoError, DerivedKey, derive_tile_name};
use serde::Deserialize;
use thiserror::Error;

use crate::locator::Locator;

/// Highest zoom level whose tile grid fits in `u32` coordinates.
pub const MAX_ZOOM: u8 = 30;

/// Web Mercator latitude limit in degrees.
pub const MAX_LATITUDE: f64 = 85.051_129;

/// Tile coordinate or index failure.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TileError {
    /// Text is not of the form `zoom_x_y`
    #[error("malformed tile coordinate: {0:?}")]
    Malformed(String),

    /// Zoom above [`MAX_ZOOM`]
    #[error("zoom {0} out of range")]
    ZoomOutOfRange(u8),

    /// Coordinate outside the `2^zoom` grid
    #[error("tile {x},{y} outside zoom {zoom} grid")]
    OutsideGrid {
        /// Zoom level
        zoom: u8,
        /// Column
        x: u32,
        /// Row
        y: u32,
    },

    /// Latitude beyond the Web Mercator limit
    #[error("latitude {0} beyond mercator limit")]
    LatitudeOutOfRange(f64),

    /// Index JSON could not be parsed
    #[error("invalid tile index: {0}")]
    InvalidIndex(String),
}

/// A Web Mercator tile.
///
/// Ordered by zoom, then column, then row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(try_from = "String")]
pub struct TileCoord {
    /// Zoom level
    pub zoom: u8,
    /// Column, wraps around the antimeridian
    pub x: u32,
    /// Row, counted from the north
    pub y: u32,
}

impl TileCoord {
    /// Validate a coordinate against its zoom grid.
    pub fn new(zoom: u8, x: u32, y: u32) -> Result<Self, TileError> {
        if zoom > MAX_ZOOM {
            return Err(TileError::ZoomOutOfRange(zoom));
        }
        let size = grid_size(zoom);
        if x >= size || y >= size {
            return Err(TileError::OutsideGrid { zoom, x, y });
        }
        Ok(Self { zoom, x, y })
    }

    /// Tile containing a point.
    pub fn containing(lat: f64, lon: f64, zoom: u8) -> Result<Self, TileError> {
        if zoom > MAX_ZOOM {
            return Err(TileError::ZoomOutOfRange(zoom));
        }
        if !lat.is_finite() || lat.abs() > MAX_LATITUDE {
            return Err(TileError::LatitudeOutOfRange(lat));
        }

        let size = grid_size(zoom);
        let n = f64::from(size);
        let x = (((lon + 180.0) / 360.0 * n).floor() as i64).rem_euclid(i64::from(size));
        let lat_rad = lat.to_radians();
        let y = ((1.0 - lat_rad.tan().asinh() / PI) / 2.0 * n).floor() as i64;
        let y = y.clamp(0, i64::from(size) - 1);

        Ok(Self { zoom, x: x as u32, y: y as u32 })
    }

    /// This tile and the tiles within `expand` steps of it.
    ///
    /// Columns wrap around the antimeridian. Rows stop at the poles.
    pub fn neighborhood(self, expand: u32) -> BTreeSet<Self> {
        let size = grid_size(self.zoom);
        let columns = neighbors(self.x, size, expand, true);
        let rows = neighbors(self.y, size, expand, false);

        columns
            .iter()
            .flat_map(|&x| rows.iter().map(move |&y| Self { zoom: self.zoom, x, y }))
            .collect()
    }

    /// Canonical `zoom_x_y` form used for keyed names.
    pub fn message(self) -> String {
        secretblog_crypto::tile_message(self.zoom, self.x, self.y)
    }
}

impl fmt::Display for TileCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}_{}", self.zoom, self.x, self.y)
    }
}

impl FromStr for TileCoord {
    type Err = TileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || TileError::Malformed(s.to_owned());
        let mut parts = s.split('_');
        let (Some(zoom), Some(x), Some(y), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(malformed());
        };
        let zoom = zoom.parse().map_err(|_| malformed())?;
        let x = x.parse().map_err(|_| malformed())?;
        let y = y.parse().map_err(|_| malformed())?;
        Self::new(zoom, x, y)
    }
}

impl TryFrom<String> for TileCoord {
    type Error = TileError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

fn grid_size(zoom: u8) -> u32 {
    1u32 << zoom
}

/// Values within `expand` of `coord` on an axis of `size` cells.
///
/// Ordered from `coord - expand` upwards. With `wrap` the axis is circular
/// and each cell appears at most once; without it the range is clipped to
/// `0..size`.
pub fn neighbors(coord: u32, size: u32, expand: u32, wrap: bool) -> Vec<u32> {
    let coord = i64::from(coord);
    let size = i64::from(size);
    let expand = i64::from(expand);

    if !wrap {
        let start = (coord - expand).max(0);
        let end = (coord + expand).min(size - 1);
        return (start..=end).map(|v| v as u32).collect();
    }

    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for offset in -expand..=expand {
        let value = (coord + offset).rem_euclid(size) as u32;
        if seen.insert(value) {
            out.push(value);
        }
        if out.len() as i64 == size {
            break;
        }
    }
    out
}

/// Geographic bounding box in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    /// Southern edge
    pub min_lat: f64,
    /// Western edge
    pub min_lon: f64,
    /// Northern edge
    pub max_lat: f64,
    /// Eastern edge
    pub max_lon: f64,
}

impl Bounds {
    fn point(lat: f64, lon: f64) -> Self {
        Self { min_lat: lat, min_lon: lon, max_lat: lat, max_lon: lon }
    }

    fn extend(&mut self, lat: f64, lon: f64) {
        self.min_lat = self.min_lat.min(lat);
        self.min_lon = self.min_lon.min(lon);
        self.max_lat = self.max_lat.max(lat);
        self.max_lon = self.max_lon.max(lon);
    }
}

/// Decrypted description of one map.
///
/// ```json
/// { "features": { "type": "FeatureCollection", ... }, "tiles": ["12_2200_1343", ...] }
/// ```
///
/// Older sites name the features field `geojson`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TileIndex {
    /// GeoJSON track overlay
    #[serde(alias = "geojson")]
    pub features: serde_json::Value,
    #[serde(default)]
    tiles: BTreeSet<TileCoord>,
}

impl TileIndex {
    /// Parse decrypted index text.
    pub fn parse(text: &str) -> Result<Self, TileError> {
        serde_json::from_str(text).map_err(|err| TileError::InvalidIndex(err.to_string()))
    }

    /// Build an index directly.
    pub fn new(features: serde_json::Value, tiles: impl IntoIterator<Item = TileCoord>) -> Self {
        Self { features, tiles: tiles.into_iter().collect() }
    }

    /// Whether `tile` was published for this map.
    pub fn is_declared(&self, tile: &TileCoord) -> bool {
        self.tiles.contains(tile)
    }

    /// Declared tiles in order.
    pub fn tiles(&self) -> impl Iterator<Item = &TileCoord> {
        self.tiles.iter()
    }

    /// Lowest and highest declared zoom.
    pub fn zoom_range(&self) -> Option<(u8, u8)> {
        let min = self.tiles.iter().map(|t| t.zoom).min()?;
        let max = self.tiles.iter().map(|t| t.zoom).max()?;
        Some((min, max))
    }

    /// Bounding box of every position in the features.
    ///
    /// Positions are GeoJSON `[lon, lat, ...]` arrays at any depth under a
    /// `coordinates` member.
    pub fn bounds(&self) -> Option<Bounds> {
        let mut bounds = None;
        collect_positions(&self.features, false, &mut |lat, lon| match &mut bounds {
            None => bounds = Some(Bounds::point(lat, lon)),
            Some(b) => b.extend(lat, lon),
        });
        bounds
    }
}

fn collect_positions(value: &serde_json::Value, in_coords: bool, visit: &mut impl FnMut(f64, f64)) {
    match value {
        serde_json::Value::Array(items) => {
            let number = |i: usize| items.get(i).and_then(serde_json::Value::as_f64);
            if in_coords && let (Some(lon), Some(lat)) = (number(0), number(1)) {
                visit(lat, lon);
                return;
            }
            for item in items {
                collect_positions(item, in_coords, visit);
            }
        },
        serde_json::Value::Object(map) => {
            for (key, item) in map {
                collect_positions(item, in_coords || key == "coordinates", visit);
            }
        },
        _ => {},
    }
}

/// Maps declared tiles to their keyed locators.
#[derive(Debug, Clone, Copy)]
pub struct TileResolver<'a> {
    names_key: &'a DerivedKey,
    index: &'a TileIndex,
}

impl<'a> TileResolver<'a> {
    /// Resolve tiles of `index` with `names_key`.
    pub fn new(names_key: &'a DerivedKey, index: &'a TileIndex) -> Self {
        Self { names_key, index }
    }

    /// Locator of `tile`, or `None` if the map does not declare it.
    ///
    /// # Errors
    ///
    /// - `PurposeMismatch`: the resolver was given a key not derived for
    ///   tile names
    pub fn locator(&self, tile: &TileCoord) -> Result<Option<Locator>, CryptoError> {
        if !self.index.is_declared(tile) {
            return Ok(None);
        }
        let name = derive_tile_name(self.names_key, tile.zoom, tile.x, tile.y)?;
        Ok(Some(Locator::tile(&name)))
    }
}

#[cfg(test)]
mod tests {
    use secretblog_crypto::{KeyLength, Purpose, SessionKey, derive_key};
    use serde_json::json;

    use super::*;

    fn tile(s: &str) -> TileCoord {
        s.parse().unwrap()
    }

    #[test]
    fn parse_and_display_round_trip() {
        let coord = tile("12_2200_1343");
        assert_eq!(coord, TileCoord { zoom: 12, x: 2200, y: 1343 });
        assert_eq!(coord.to_string(), "12_2200_1343");
        assert_eq!(coord.message(), "12_2200_1343");
    }

    #[test]
    fn parse_rejects_malformed() {
        for text in ["", "1_2", "1_2_3_4", "a_b_c", "-1_0_0", "1_0_0 "] {
            assert!(matches!(text.parse::<TileCoord>(), Err(TileError::Malformed(_))), "{text}");
        }
    }

    #[test]
    fn parse_rejects_outside_grid() {
        assert!(matches!("1_2_0".parse::<TileCoord>(), Err(TileError::OutsideGrid { .. })));
        assert_eq!("31_0_0".parse::<TileCoord>(), Err(TileError::ZoomOutOfRange(31)));
    }

    #[test]
    fn containing_tile() {
        assert_eq!(TileCoord::containing(0.0, 0.0, 0).unwrap(), tile("0_0_0"));
        assert_eq!(TileCoord::containing(0.0, 0.0, 1).unwrap(), tile("1_1_1"));
        assert_eq!(TileCoord::containing(51.5, -0.12, 10).unwrap(), tile("10_511_340"));
        assert_eq!(TileCoord::containing(40.0, 180.0, 2).unwrap().x, 0);
    }

    #[test]
    fn containing_rejects_polar_latitudes() {
        assert!(matches!(
            TileCoord::containing(86.0, 0.0, 5),
            Err(TileError::LatitudeOutOfRange(_))
        ));
        assert!(TileCoord::containing(-MAX_LATITUDE, 0.0, 5).is_ok());
    }

    #[test]
    fn neighbors_without_wrap_are_clipped() {
        assert_eq!(neighbors(0, 5, 2, false), [0, 1, 2]);
        assert_eq!(neighbors(3, 5, 2, false), [1, 2, 3, 4]);
        assert_eq!(neighbors(2, 5, 0, false), [2]);
    }

    #[test]
    fn neighbors_with_wrap() {
        assert_eq!(neighbors(1, 6, 2, true), [5, 0, 1, 2, 3]);
        assert_eq!(neighbors(5, 6, 2, true), [3, 4, 5, 0, 1]);
        assert_eq!(neighbors(2, 5, 2, true), [0, 1, 2, 3, 4]);
        assert_eq!(neighbors(3, 5, 2, true), [1, 2, 3, 4, 0]);
    }

    #[test]
    fn neighbors_wrapping_onto_themselves_are_unique() {
        assert_eq!(neighbors(3, 4, 2, true), [1, 2, 3, 0]);
        assert_eq!(neighbors(3, 4, 3, true), [0, 1, 2, 3]);
        assert_eq!(neighbors(1, 3, 4, true), [0, 1, 2]);
        assert_eq!(neighbors(0, 1, 5, true), [0]);
    }

    #[test]
    fn neighborhood_wraps_columns_only() {
        let hood = TileCoord::new(2, 0, 0).unwrap().neighborhood(1);
        let expected: BTreeSet<_> =
            ["2_3_0", "2_0_0", "2_1_0", "2_3_1", "2_0_1", "2_1_1"].into_iter().map(tile).collect();
        assert_eq!(hood, expected);
    }

    #[test]
    fn index_parses_with_either_feature_name() {
        let modern =
            TileIndex::parse(r#"{"features": {"type": "FeatureCollection"}, "tiles": ["1_0_0"]}"#)
                .unwrap();
        let legacy =
            TileIndex::parse(r#"{"geojson": {"type": "FeatureCollection"}, "tiles": ["1_0_0"]}"#)
                .unwrap();
        assert_eq!(modern, legacy);
        assert!(modern.is_declared(&tile("1_0_0")));
        assert!(!modern.is_declared(&tile("1_1_0")));
    }

    #[test]
    fn index_without_tiles_declares_nothing() {
        let index = TileIndex::parse(r#"{"features": {}}"#).unwrap();
        assert_eq!(index.tiles().count(), 0);
        assert_eq!(index.zoom_range(), None);
    }

    #[test]
    fn index_rejects_bad_json_and_bad_tiles() {
        assert!(matches!(TileIndex::parse("not json"), Err(TileError::InvalidIndex(_))));
        assert!(matches!(
            TileIndex::parse(r#"{"features": {}, "tiles": ["oops"]}"#),
            Err(TileError::InvalidIndex(_))
        ));
    }

    #[test]
    fn zoom_range_spans_declared_tiles() {
        let index = TileIndex::new(json!({}), [tile("12_0_0"), tile("9_0_0"), tile("14_0_0")]);
        assert_eq!(index.zoom_range(), Some((9, 14)));
    }

    #[test]
    fn bounds_cover_all_positions() {
        let features = json!({
            "type": "FeatureCollection",
            "features": [
                {"type": "Feature", "properties": {"name": "walk"},
                 "geometry": {"type": "LineString", "coordinates": [[10.0, 50.0, 300.0], [11.5, 49.0]]}},
                {"type": "Feature", "properties": {},
                 "geometry": {"type": "Point", "coordinates": [9.5, 51.0]}}
            ]
        });
        let bounds = TileIndex::new(features, []).bounds().unwrap();
        assert_eq!(bounds, Bounds { min_lat: 49.0, min_lon: 9.5, max_lat: 51.0, max_lon: 11.5 });
    }

    #[test]
    fn bounds_of_empty_features() {
        assert_eq!(TileIndex::new(json!({"type": "FeatureCollection", "features": []}), []).bounds(), None);
    }

    #[test]
    fn resolver_only_names_declared_tiles() {
        let session = SessionKey::from_bytes(&[0u8; 16], KeyLength::Bits128).unwrap();
        let names = derive_key(&session, Purpose::Names);
        let index = TileIndex::new(json!({}), [tile("5_3_7")]);
        let resolver = TileResolver::new(&names, &index);

        assert_eq!(
            resolver.locator(&tile("5_3_7")).unwrap().unwrap().as_str(),
            "tiles/tlflm4gojts3tmycsux233dhy5vhyp6lo7uk3axqyxzkgj47g5oa"
        );
        assert_eq!(resolver.locator(&tile("5_3_8")).unwrap(), None);
    }
}
