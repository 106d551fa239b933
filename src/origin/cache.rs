// src/origin/cache.rs
//! Tile entity cache with per-tile request deduplication

use super::entity::{EntityRecord, RawEntity, ResolvedEntity};
use super::slot::{CacheStats, MergeReport, ResolvedTile, TileSlot, TileState};
use super::source::{entities_from_value, AsyncHttpClient, ReqwestClient};
use crate::config::OriginConfig;
use crate::error::{MetaError, Result};
use crate::geometry::wkt;
use crate::map::{Subdomains, TileCoord, TileKey, UrlTemplate};
use chrono::Utc;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;
use tokio::task::AbortHandle;
use tracing::{debug, warn};

/// Transform applied to the raw response of a tile before it is decoded.
///
/// The result must be a JSON array of entity objects.
pub type DataFilter = Arc<dyn Fn(Value, &TileCoord) -> Value + Send + Sync>;

#[derive(Clone, Default)]
pub struct OriginOptions {
    pub subdomains: Subdomains,
    pub data_filter: Option<DataFilter>,
}

impl OriginOptions {
    pub fn with_subdomains(mut self, subdomains: impl Into<Subdomains>) -> Self {
        self.subdomains = subdomains.into();
        self
    }

    pub fn with_data_filter<F>(mut self, filter: F) -> Self
    where
        F: Fn(Value, &TileCoord) -> Value + Send + Sync + 'static,
    {
        self.data_filter = Some(Arc::new(filter));
        self
    }
}

impl fmt::Debug for OriginOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OriginOptions")
            .field("subdomains", &self.subdomains)
            .field("data_filter", &self.data_filter.is_some())
            .finish()
    }
}

struct InFlight {
    abort: AbortHandle,
    done: watch::Receiver<bool>,
}

#[derive(Default)]
struct State {
    url: Option<UrlTemplate>,
    tiles: HashMap<TileKey, TileSlot>,
    entities: HashMap<String, EntityRecord>,
    in_flight: HashMap<TileKey, InFlight>,
    /// Bumped by flush; completions from an older epoch are dropped
    epoch: u64,
    fetches_started: u64,
    fetches_failed: u64,
}

impl State {
    fn merge(&mut self, key: &TileKey, entities: Vec<RawEntity>) -> MergeReport {
        let mut report = MergeReport::default();

        let slot = self
            .tiles
            .entry(key.clone())
            .or_insert(TileSlot::NotRequested);
        if !slot.is_resolved() {
            *slot = TileSlot::Resolved(ResolvedTile::new());
        }
        let TileSlot::Resolved(tile) = slot else {
            return report;
        };

        for entity in entities {
            let geometry = match wkt::parse(&entity.geometry) {
                Ok(geometry) => geometry,
                Err(e) => {
                    report.skipped.push(MetaError::MalformedEntity {
                        id: entity.id,
                        reason: e.to_string(),
                    });
                    continue;
                }
            };

            // Identity and geometry never live in the shared record
            let mut fields = entity.fields;
            fields.remove("id");
            fields.remove("geometry");

            tile.geometries.insert(entity.id.clone(), geometry);
            self.entities.insert(
                entity.id.clone(),
                EntityRecord {
                    id: entity.id,
                    fields,
                },
            );
            report.merged += 1;
        }
        tile.resolved_at = Utc::now();

        report
    }

    fn collect(&self, tile: &ResolvedTile) -> Vec<ResolvedEntity> {
        tile.geometries
            .iter()
            .map(|(id, geometry)| ResolvedEntity {
                id: id.clone(),
                geometry: geometry.clone(),
                fields: self
                    .entities
                    .get(id)
                    .map(|record| record.fields.clone())
                    .unwrap_or_default(),
            })
            .collect()
    }
}

fn lock_state(state: &Mutex<State>) -> MutexGuard<'_, State> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Run the caller's filter over a raw response.
///
/// A panicking filter fails the tile instead of taking the fetch down with it.
fn run_filter(filter: Option<&DataFilter>, data: Value, coord: &TileCoord) -> Result<Value> {
    let Some(filter) = filter else {
        return Ok(data);
    };
    panic::catch_unwind(AssertUnwindSafe(|| filter(data, coord)))
        .map_err(|_| MetaError::Other(format!("data filter panicked for tile {}", coord.key())))
}

fn log_skipped(key: &TileKey, report: &MergeReport) {
    for skipped in &report.skipped {
        warn!(tile = %key, error = %skipped, "Skipping malformed entity");
    }
}

/// Serve the entities visible in map tiles.
///
/// Each tile is fetched from the data source at most once; entity metadata is
/// stored once per id and shared by every tile the entity appears in. Clones
/// share the same cache.
pub struct Origin<C> {
    client: Arc<C>,
    options: OriginOptions,
    state: Arc<Mutex<State>>,
}

impl<C> Clone for Origin<C> {
    fn clone(&self) -> Self {
        Self {
            client: Arc::clone(&self.client),
            options: self.options.clone(),
            state: Arc::clone(&self.state),
        }
    }
}

impl Origin<ReqwestClient> {
    /// Cache fetching over HTTP as described by `config`
    pub fn from_config(config: &OriginConfig) -> Result<Self> {
        let client = ReqwestClient::with_options(config.request_timeout_secs, &config.user_agent)?;
        let options = OriginOptions::default().with_subdomains(config.subdomains.clone());
        Ok(Self::new(config.url.as_deref().map(UrlTemplate::from), client, options))
    }
}

impl<C: AsyncHttpClient + 'static> Origin<C> {
    /// Create a cache. Without a URL every tile resolves to no entities.
    pub fn new(url: Option<UrlTemplate>, client: C, options: OriginOptions) -> Self {
        let state = State {
            url,
            ..State::default()
        };
        Self {
            client: Arc::new(client),
            options,
            state: Arc::new(Mutex::new(state)),
        }
    }

    pub fn serialize_coord(&self, coord: &TileCoord) -> TileKey {
        coord.key()
    }

    /// Entities for a tile.
    ///
    /// The first call for a tile starts a fetch in the background and returns
    /// [`TileState::Pending`]; later calls return the entities once the fetch
    /// has been merged. A failed fetch is reported once as
    /// [`MetaError::FetchFailed`], after which the next call fetches again.
    ///
    /// Must be called from within a tokio runtime when a URL is configured.
    pub fn get(&self, coord: TileCoord) -> Result<TileState> {
        let key = self.serialize_coord(&coord);
        let mut state = self.lock();

        let failure = match state.tiles.get(&key) {
            Some(TileSlot::Resolved(tile)) => {
                return Ok(TileState::Resolved(state.collect(tile)));
            }
            Some(TileSlot::Pending) => return Ok(TileState::Pending),
            Some(TileSlot::Failed(reason)) => Some(reason.clone()),
            Some(TileSlot::NotRequested) | None => None,
        };

        if let Some(reason) = failure {
            state.tiles.remove(&key);
            debug!(tile = %key, "Reporting failed fetch, slot cleared for retry");
            return Err(MetaError::FetchFailed {
                key: key.to_string(),
                reason,
            });
        }

        if state.in_flight.contains_key(&key) {
            return Ok(TileState::Pending);
        }

        let Some(template) = state.url.clone() else {
            drop(state);
            let (entities, rejected) =
                run_filter(self.options.data_filter.as_ref(), Value::Array(Vec::new()), &coord)
                    .and_then(entities_from_value)
                    .map_err(|e| MetaError::FetchFailed {
                        key: key.to_string(),
                        reason: e.to_string(),
                    })?;
            for e in &rejected {
                warn!(tile = %key, error = %e, "Skipping malformed entity");
            }
            self.set(coord, entities);
            return self.get(coord);
        };

        let url = template.render(&coord, &self.options.subdomains)?;
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| MetaError::Runtime(format!("No async runtime to fetch {}: {}", key, e)))?;

        let (done_tx, done_rx) = watch::channel(false);
        let epoch = state.epoch;
        state.tiles.insert(key.clone(), TileSlot::Pending);
        state.fetches_started += 1;

        debug!(tile = %key, url = %url, in_flight = state.in_flight.len() + 1, "Starting tile fetch");

        let task = runtime.spawn(Self::fetch(
            Arc::clone(&self.client),
            Arc::clone(&self.state),
            self.options.data_filter.clone(),
            coord,
            key.clone(),
            url,
            epoch,
            done_tx,
        ));
        state.in_flight.insert(
            key,
            InFlight {
                abort: task.abort_handle(),
                done: done_rx,
            },
        );

        Ok(TileState::Pending)
    }

    /// Wait for any fetch in flight for `coord`, then [`get`](Self::get) it.
    ///
    /// Starts a fetch if the tile was never requested. May still return
    /// `Pending` if the cache was flushed while waiting.
    pub async fn settled(&self, coord: TileCoord) -> Result<TileState> {
        let first = self.get(coord)?;
        if !first.is_pending() {
            return Ok(first);
        }

        let key = self.serialize_coord(&coord);
        let waiter = self.lock().in_flight.get(&key).map(|f| f.done.clone());
        if let Some(mut done) = waiter {
            // Err means the fetch was aborted by a flush
            let finished = done.wait_for(|finished| *finished).await.is_ok();
            if !finished {
                debug!(tile = %key, "Fetch aborted while waiting");
            }
        }

        self.get(coord)
    }

    /// Merge entities into a tile.
    ///
    /// Each entity's WKT geometry is parsed and stored under the tile; the
    /// rest of the entity replaces the shared record for its id. The tile
    /// becomes resolved even when `entities` is empty. Entities whose
    /// geometry does not parse are skipped and listed in the report.
    pub fn set(&self, coord: TileCoord, entities: Vec<RawEntity>) -> MergeReport {
        let key = self.serialize_coord(&coord);
        let report = self.lock().merge(&key, entities);
        log_skipped(&key, &report);
        debug!(tile = %key, merged = report.merged, skipped = report.skipped.len(), "Merged entities");
        report
    }

    /// Drop every tile, entity and in-flight fetch.
    ///
    /// Fetches started before the flush never write into the cache.
    pub fn flush(&self) {
        let mut state = self.lock();
        let aborted = state.in_flight.len();
        for (_, in_flight) in state.in_flight.drain() {
            in_flight.abort.abort();
        }
        state.tiles.clear();
        state.entities.clear();
        state.epoch += 1;
        debug!(aborted, epoch = state.epoch, "Flushed tile cache");
    }

    /// Replace the request URL template. Tiles already cached are kept.
    pub fn set_url(&self, url: impl Into<UrlTemplate>) {
        self.lock().url = Some(url.into());
    }

    /// Stop fetching; uncached tiles resolve to no entities.
    pub fn clear_url(&self) {
        self.lock().url = None;
    }

    pub fn url(&self) -> Option<UrlTemplate> {
        self.lock().url.clone()
    }

    pub fn options(&self) -> &OriginOptions {
        &self.options
    }

    /// Current state of a tile, without starting a fetch
    pub fn peek(&self, coord: &TileCoord) -> TileSlot {
        self.lock()
            .tiles
            .get(&coord.key())
            .cloned()
            .unwrap_or(TileSlot::NotRequested)
    }

    /// Shared metadata record for an entity id
    pub fn entity(&self, id: &str) -> Option<EntityRecord> {
        self.lock().entities.get(id).cloned()
    }

    pub fn stats(&self) -> CacheStats {
        let state = self.lock();
        let mut stats = CacheStats {
            tiles: state.tiles.len(),
            entities: state.entities.len(),
            in_flight: state.in_flight.len(),
            fetches_started: state.fetches_started,
            fetches_failed: state.fetches_failed,
            ..CacheStats::default()
        };

        for slot in state.tiles.values() {
            match slot {
                TileSlot::Pending => stats.pending_tiles += 1,
                TileSlot::Failed(_) => stats.failed_tiles += 1,
                TileSlot::Resolved(tile) => {
                    stats.resolved_tiles += 1;
                    if stats.last_resolved.map_or(true, |t| tile.resolved_at > t) {
                        stats.last_resolved = Some(tile.resolved_at);
                    }
                }
                TileSlot::NotRequested => {}
            }
        }

        stats
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        lock_state(&self.state)
    }

    #[allow(clippy::too_many_arguments)]
    async fn fetch(
        client: Arc<C>,
        shared: Arc<Mutex<State>>,
        filter: Option<DataFilter>,
        coord: TileCoord,
        key: TileKey,
        url: String,
        epoch: u64,
        done: watch::Sender<bool>,
    ) {
        let outcome = match client.get(&url).await {
            Ok(body) => serde_json::from_slice::<Value>(&body).map_err(MetaError::from),
            Err(e) => Err(e),
        };

        // Filter outside the lock; it is caller code
        let outcome = outcome
            .and_then(|data| run_filter(filter.as_ref(), data, &coord))
            .and_then(entities_from_value);

        {
            let mut state = lock_state(&shared);
            if state.epoch != epoch {
                debug!(tile = %key, "Discarding fetch result from before flush");
                return;
            }
            state.in_flight.remove(&key);

            match outcome {
                Ok((entities, rejected)) => {
                    let mut report = state.merge(&key, entities);
                    report.skipped.extend(rejected);
                    log_skipped(&key, &report);
                    debug!(
                        tile = %key,
                        merged = report.merged,
                        skipped = report.skipped.len(),
                        "Tile fetch resolved"
                    );
                }
                Err(e) => {
                    state.fetches_failed += 1;
                    warn!(tile = %key, url = %url, error = %e, "Tile fetch failed");
                    state.tiles.insert(key, TileSlot::Failed(e.to_string()));
                }
            }
        }

        let _ = done.send(true);
    }
}
