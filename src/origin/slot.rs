// src/origin/slot.rs
//! Per-tile cache slot states

use super::entity::ResolvedEntity;
use crate::geometry::Geometry;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// Geometries of one resolved tile, keyed by entity id.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedTile {
    pub geometries: BTreeMap<String, Geometry>,
    pub resolved_at: DateTime<Utc>,
}

impl ResolvedTile {
    pub fn new() -> Self {
        Self {
            geometries: BTreeMap::new(),
            resolved_at: Utc::now(),
        }
    }

    pub fn len(&self) -> usize {
        self.geometries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.geometries.is_empty()
    }
}

impl Default for ResolvedTile {
    fn default() -> Self {
        Self::new()
    }
}

/// State of one tile in the cache
#[derive(Debug, Clone, PartialEq)]
pub enum TileSlot {
    /// Never requested, or cleared by a flush or a surfaced failure
    NotRequested,
    /// Fetch in flight
    Pending,
    /// Last fetch failed; reported once by the next `get`
    Failed(String),
    Resolved(ResolvedTile),
}

impl TileSlot {
    pub fn is_pending(&self) -> bool {
        matches!(self, TileSlot::Pending)
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, TileSlot::Resolved(_))
    }
}

/// What `get` hands back for a tile.
#[derive(Debug, Clone, PartialEq)]
pub enum TileState {
    /// Entities are not available yet; ask again later
    Pending,
    Resolved(Vec<ResolvedEntity>),
}

impl TileState {
    pub fn is_pending(&self) -> bool {
        matches!(self, TileState::Pending)
    }

    /// Entities of a resolved tile, `None` while pending
    pub fn entities(&self) -> Option<&[ResolvedEntity]> {
        match self {
            TileState::Pending => None,
            TileState::Resolved(entities) => Some(entities),
        }
    }

    pub fn into_entities(self) -> Option<Vec<ResolvedEntity>> {
        match self {
            TileState::Pending => None,
            TileState::Resolved(entities) => Some(entities),
        }
    }
}

/// Outcome of merging a batch of entities into a tile.
#[derive(Debug, Default)]
pub struct MergeReport {
    /// Entities stored
    pub merged: usize,
    /// Entities skipped, with the reason
    pub skipped: Vec<crate::error::MetaError>,
}

#[derive(Debug, Clone, Default)]
pub struct CacheStats {
    pub tiles: usize,
    pub pending_tiles: usize,
    pub resolved_tiles: usize,
    pub failed_tiles: usize,
    pub entities: usize,
    pub in_flight: usize,
    pub fetches_started: u64,
    pub fetches_failed: u64,
    pub last_resolved: Option<DateTime<Utc>>,
}
