// src/lib.rs
//! Geo-entity tile cache
//!
//! Serves the geo-entities visible in map tiles, fetching each tile from an
//! HTTP data source at most once and storing entity metadata once per id.

pub mod config;
pub mod error;
pub mod geometry;
pub mod logging;
pub mod map;
pub mod origin;

// Re-export main types for convenience
pub use config::OriginConfig;
pub use error::{MetaError, Result};
pub use geometry::{Geometry, LatLng};
pub use map::{serialize_coord, TileCoord, TileKey};
pub use origin::{Origin, OriginOptions, RawEntity, ResolvedEntity, TileState};
