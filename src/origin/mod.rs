// src/origin/mod.rs
//! Geo-entity overlay data: fetching, merging and serving entities per tile

mod cache;
pub mod entity;
mod slot;
pub mod source;

pub use cache::{DataFilter, Origin, OriginOptions};
pub use entity::{EntityRecord, RawEntity, ResolvedEntity};
pub use slot::{CacheStats, MergeReport, ResolvedTile, TileSlot, TileState};
pub use source::{decode_entities, entities_from_value, AsyncHttpClient, ReqwestClient};
