// src/map/mod.rs
//! Map tile addressing: coordinates, cache keys, host aliases and request URLs

mod coord;
mod subdomain;
mod url;

pub use coord::{lat_lon_to_tile, tile_to_lat_lon, TileCoord, TileKey, MAX_ZOOM};
pub use subdomain::{choose_subdomain, Subdomains};
pub use url::UrlTemplate;

/// Cache key for a tile, `"x:y:z"`
pub fn serialize_coord(coord: &TileCoord) -> TileKey {
    coord.key()
}
