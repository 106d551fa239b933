// src/map/coord.rs
//! Slippy-map tile coordinates and their cache keys

use crate::error::{MetaError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Highest zoom level a tile coordinate may carry.
pub const MAX_ZOOM: u8 = 30;

/// Calculate tile coordinates from lat/lon and zoom level
pub fn lat_lon_to_tile(lat: f64, lon: f64, zoom: u8) -> (i64, i64) {
    let n = 2_f64.powi(zoom as i32);
    let x = ((lon + 180.0) / 360.0 * n).floor() as i64;
    let lat_rad = lat.to_radians();
    let y = ((1.0 - (lat_rad.tan() + 1.0 / lat_rad.cos()).ln() / std::f64::consts::PI) / 2.0 * n)
        .floor() as i64;
    (x, y)
}

/// Calculate lat/lon of a tile's north-west corner
pub fn tile_to_lat_lon(x: i64, y: i64, zoom: u8) -> (f64, f64) {
    let n = 2_f64.powi(zoom as i32);
    let lon = x as f64 / n * 360.0 - 180.0;
    let lat_rad = ((1.0 - 2.0 * y as f64 / n) * std::f64::consts::PI).sinh().atan();
    let lat = lat_rad.to_degrees();
    (lat, lon)
}

/// A tile address. `x` and `y` are signed so wrapped world copies keep
/// distinct keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TileCoord {
    pub x: i64,
    pub y: i64,
    pub z: u8,
}

impl TileCoord {
    pub fn new(x: i64, y: i64, z: u8) -> Self {
        Self { x, y, z }
    }

    /// Tile containing the given position at `zoom`.
    ///
    /// Latitudes beyond the Web Mercator limit are clamped into the edge rows.
    pub fn from_lat_lon(lat: f64, lon: f64, zoom: u8) -> Result<Self> {
        if !lat.is_finite() || !lon.is_finite() {
            return Err(MetaError::Other(format!("Invalid position: {}, {}", lat, lon)));
        }
        if zoom > MAX_ZOOM {
            return Err(MetaError::Other(format!("Zoom {} exceeds maximum {}", zoom, MAX_ZOOM)));
        }

        let (x, y) = lat_lon_to_tile(lat, lon, zoom);
        let last = (1_i64 << zoom) - 1;
        Ok(Self::new(x.clamp(0, last), y.clamp(0, last), zoom))
    }

    /// Serialized cache key, `"x:y:z"`.
    pub fn key(&self) -> TileKey {
        TileKey(format!("{}:{}:{}", self.x, self.y, self.z))
    }
}

impl fmt::Display for TileCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.z, self.x, self.y)
    }
}

/// String form of a [`TileCoord`] used to index cache slots.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TileKey(String);

impl TileKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Recover the coordinate this key was built from
    pub fn coord(&self) -> Result<TileCoord> {
        let mut parts = self.0.split(':');
        let (Some(x), Some(y), Some(z), None) = (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(MetaError::Other(format!("Invalid tile key: {}", self.0)));
        };

        let invalid =
            |_: std::num::ParseIntError| MetaError::Other(format!("Invalid tile key: {}", self.0));
        Ok(TileCoord::new(
            x.parse::<i64>().map_err(invalid)?,
            y.parse::<i64>().map_err(invalid)?,
            z.parse::<u8>().map_err(invalid)?,
        ))
    }
}

impl FromStr for TileKey {
    type Err = MetaError;

    fn from_str(s: &str) -> Result<Self> {
        let key = TileKey(s.to_string());
        // Round-trip so only canonical keys are accepted
        let canonical = key.coord()?.key();
        if canonical != key {
            return Err(MetaError::Other(format!("Invalid tile key: {}", s)));
        }
        Ok(key)
    }
}

impl fmt::Display for TileKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<TileCoord> for TileKey {
    fn from(coord: TileCoord) -> Self {
        coord.key()
    }
}
