//! The zone-partitioned spatial item index.
//!
//! Each zone is in one of three states:
//!
//! - untracked: no entry; the first query starts a rebuild
//! - building: a [`RebuildState`] advanced one chunk per query (cache miss)
//! - ready: an authoritative [`CacheEntry`]
//!
//! Incremental `add`/`remove`/`move_item` calls keep both building and ready
//! zones current. Queries resolve hits against the live world and evict
//! anything stale, so a missed despawn event heals on the next lookup.

use std::collections::BTreeMap;

use quartermaster_types::{Item, ItemId, Position, ZoneId};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::IndexConfig;
use crate::error::IndexError;
use crate::grid::{CacheEntry, InsertOutcome};
use crate::rebuild::RebuildState;
use crate::source::{Admission, ItemSource, admissible};

/// Cache state of one zone.
#[derive(Debug, Clone, PartialEq)]
enum ZoneState {
    Ready(CacheEntry),
    Building(RebuildState),
}

impl ZoneState {
    const fn entry_mut(&mut self) -> &mut CacheEntry {
        match self {
            Self::Ready(entry) => entry,
            Self::Building(state) => state.partial_mut(),
        }
    }

    const fn entry(&self) -> &CacheEntry {
        match self {
            Self::Ready(entry) => entry,
            Self::Building(state) => state.partial(),
        }
    }
}

/// Lifetime counters for one zone; survive invalidation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct ZoneCounters {
    queries: u64,
    stale_evictions: u64,
    dropped_at_cap: u64,
    rebuilds: u64,
}

/// Diagnostic snapshot of one zone's cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Zone described.
    pub zone: ZoneId,
    /// The zone has an authoritative entry.
    pub ready: bool,
    /// Items tracked (in the partial entry while building).
    pub tracked: usize,
    /// Occupied grid cells.
    pub cells: usize,
    /// Change counter of the entry.
    pub revision: u64,
    /// Ids still to examine while building.
    pub rebuild_remaining: usize,
    /// Radius queries served.
    pub queries: u64,
    /// Stale items evicted during queries.
    pub stale_evictions: u64,
    /// Adds dropped because the zone was full.
    pub dropped_at_cap: u64,
    /// Rebuilds started.
    pub rebuilds: u64,
}

/// Result of [`SpatialItemIndex::add`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    /// Newly tracked.
    Added,
    /// Already tracked; filing refreshed.
    AlreadyTracked,
    /// Destroyed, out of zone, non-finite, or not admitted.
    Rejected,
    /// The zone is at its item cap.
    AtCapacity,
    /// The zone has no cache yet; its first rebuild will pick the item up.
    ZoneNotTracked,
}

/// Per-zone uniform-grid index over eligible items.
#[derive(Debug, Clone)]
pub struct SpatialItemIndex {
    config: IndexConfig,
    zones: BTreeMap<ZoneId, ZoneState>,
    counters: BTreeMap<ZoneId, ZoneCounters>,
    /// Which zone each tracked item is filed in.
    locator: BTreeMap<ItemId, ZoneId>,
}

impl SpatialItemIndex {
    /// Create an empty index.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::InvalidConfig`] if the configuration is unusable.
    pub fn new(config: IndexConfig) -> Result<Self, IndexError> {
        config.validate()?;
        Ok(Self {
            config,
            zones: BTreeMap::new(),
            counters: BTreeMap::new(),
            locator: BTreeMap::new(),
        })
    }

    /// Active configuration.
    pub const fn config(&self) -> &IndexConfig {
        &self.config
    }

    /// Whether `zone` has an authoritative entry.
    pub fn is_ready(&self, zone: ZoneId) -> bool {
        matches!(self.zones.get(&zone), Some(ZoneState::Ready(_)))
    }

    /// Whether `id` is tracked in any zone.
    pub fn is_tracked(&self, id: ItemId) -> bool {
        self.locator.contains_key(&id)
    }

    /// The authoritative entry of a ready zone.
    pub fn entry(&self, zone: ZoneId) -> Option<&CacheEntry> {
        match self.zones.get(&zone) {
            Some(ZoneState::Ready(entry)) => Some(entry),
            _ => None,
        }
    }

    /// Zones with a ready or building cache.
    pub fn zones(&self) -> impl Iterator<Item = ZoneId> + '_ {
        self.zones.keys().copied()
    }

    /// Start tracking `item`.
    ///
    /// Items that moved zones are dropped from their old zone first.
    pub fn add(&mut self, item: &Item, admission: &dyn Admission) -> AddOutcome {
        if !admissible(item, item.zone, admission) {
            self.remove(item.id);
            return AddOutcome::Rejected;
        }
        if let Some(&previous) = self.locator.get(&item.id)
            && previous != item.zone
        {
            self.remove(item.id);
        }
        let Some(state) = self.zones.get_mut(&item.zone) else {
            return AddOutcome::ZoneNotTracked;
        };
        match state.entry_mut().insert(
            item.id,
            item.position,
            self.config.cell_size,
            self.config.max_items_per_zone,
        ) {
            InsertOutcome::Inserted => {
                self.locator.insert(item.id, item.zone);
                AddOutcome::Added
            }
            InsertOutcome::AlreadyTracked => AddOutcome::AlreadyTracked,
            InsertOutcome::AtCapacity => {
                let counters = self.counters.entry(item.zone).or_default();
                counters.dropped_at_cap = counters.dropped_at_cap.saturating_add(1);
                debug!(zone = %item.zone, item_id = %item.id, "Zone at item cap; add dropped");
                AddOutcome::AtCapacity
            }
            InsertOutcome::InvalidPosition => AddOutcome::Rejected,
        }
    }

    /// Stop tracking `id`. A second call is a no-op returning `false`.
    pub fn remove(&mut self, id: ItemId) -> bool {
        let Some(zone) = self.locator.remove(&id) else {
            return false;
        };
        self.zones
            .get_mut(&zone)
            .is_some_and(|state| state.entry_mut().remove(id))
    }

    /// Apply a position change reported by the world.
    ///
    /// `item` carries the live state (including a possibly new zone);
    /// `old_position` is the position the host last reported. Items that are
    /// no longer admissible are dropped.
    pub fn move_item(
        &mut self,
        item: &Item,
        old_position: Position,
        new_position: Position,
        admission: &dyn Admission,
    ) -> AddOutcome {
        if !admissible(item, item.zone, admission) || !new_position.is_finite() {
            self.remove(item.id);
            return AddOutcome::Rejected;
        }
        match self.locator.get(&item.id) {
            Some(&zone) if zone == item.zone => {}
            _ => return self.add(item, admission),
        }
        let cell_size = self.config.cell_size;
        let Some(state) = self.zones.get_mut(&item.zone) else {
            return AddOutcome::ZoneNotTracked;
        };
        let entry = state.entry_mut();
        if let Some(tracked) = entry.tracked(item.id)
            && tracked.position.distance_sq(old_position) > 0.0
        {
            debug!(item_id = %item.id, "Move event disagrees with tracked position");
        }
        entry.relocate(item.id, new_position, cell_size);
        AddOutcome::AlreadyTracked
    }

    /// Items within `radius` of `center` in `zone`.
    ///
    /// On a cache miss this advances the zone's rebuild by one chunk and
    /// returns nothing until the zone is ready. Hits are checked against the
    /// live world: vanished or no-longer-admissible items are evicted and
    /// drifted items are refiled at their live position.
    pub fn query_radius(
        &mut self,
        source: &dyn ItemSource,
        admission: &dyn Admission,
        zone: ZoneId,
        center: Position,
        radius: f32,
        tick: u64,
    ) -> Vec<ItemId> {
        let counters = self.counters.entry(zone).or_default();
        counters.queries = counters.queries.saturating_add(1);

        if !self.advance(source, admission, zone, tick) {
            return Vec::new();
        }
        let cell_size = self.config.cell_size;
        let Some(ZoneState::Ready(entry)) = self.zones.get_mut(&zone) else {
            return Vec::new();
        };

        let radius_sq = radius * radius;
        let mut hits = Vec::new();
        let mut stale = Vec::new();
        for id in entry.query(center, radius, cell_size) {
            match source.item(id) {
                Some(item) if admissible(item, zone, admission) => {
                    let drifted = entry
                        .tracked(id)
                        .is_some_and(|t| t.position.distance_sq(item.position) > 0.0);
                    if drifted {
                        entry.relocate(id, item.position, cell_size);
                    }
                    if item.position.distance_sq(center) <= radius_sq {
                        hits.push(id);
                    }
                }
                _ => stale.push(id),
            }
        }

        for id in &stale {
            entry.remove(*id);
            if self.locator.get(id) == Some(&zone) {
                self.locator.remove(id);
            }
        }
        if !stale.is_empty() {
            let evicted = u64::try_from(stale.len()).unwrap_or(u64::MAX);
            let counters = self.counters.entry(zone).or_default();
            counters.stale_evictions = counters.stale_evictions.saturating_add(evicted);
            debug!(%zone, evicted, "Evicted stale items during query");
        }
        hits
    }

    /// Advance `zone` toward ready without querying. Returns whether it is ready.
    pub fn warm(
        &mut self,
        source: &dyn ItemSource,
        admission: &dyn Admission,
        zone: ZoneId,
        tick: u64,
    ) -> bool {
        self.advance(source, admission, zone, tick)
    }

    /// Drop the zone's entry and any rebuild in progress.
    pub fn invalidate(&mut self, zone: ZoneId) {
        if self.zones.remove(&zone).is_some() {
            self.locator.retain(|_, z| *z != zone);
            debug!(%zone, "Zone cache invalidated");
        }
    }

    /// Drop every zone's cache.
    pub fn invalidate_all(&mut self) {
        self.zones.clear();
        self.locator.clear();
    }

    /// Diagnostic snapshot of `zone`.
    pub fn stats(&self, zone: ZoneId) -> CacheStats {
        let counters = self.counters.get(&zone).copied().unwrap_or_default();
        let state = self.zones.get(&zone);
        let entry = state.map(ZoneState::entry);
        CacheStats {
            zone,
            ready: matches!(state, Some(ZoneState::Ready(_))),
            tracked: entry.map_or(0, CacheEntry::len),
            cells: entry.map_or(0, CacheEntry::cell_count),
            revision: entry.map_or(0, CacheEntry::revision),
            rebuild_remaining: match state {
                Some(ZoneState::Building(rebuild)) => rebuild.remaining(),
                _ => 0,
            },
            queries: counters.queries,
            stale_evictions: counters.stale_evictions,
            dropped_at_cap: counters.dropped_at_cap,
            rebuilds: counters.rebuilds,
        }
    }

    /// Start or continue the zone's rebuild; promote it when exhausted.
    fn advance(
        &mut self,
        source: &dyn ItemSource,
        admission: &dyn Admission,
        zone: ZoneId,
        tick: u64,
    ) -> bool {
        let mut rebuild = match self.zones.remove(&zone) {
            Some(ZoneState::Ready(entry)) => {
                self.zones.insert(zone, ZoneState::Ready(entry));
                return true;
            }
            Some(ZoneState::Building(rebuild)) => rebuild,
            None => {
                let pending = source.items_in_zone(zone);
                let counters = self.counters.entry(zone).or_default();
                counters.rebuilds = counters.rebuilds.saturating_add(1);
                debug!(%zone, pending = pending.len(), tick, "Zone rebuild started");
                RebuildState::start(zone, pending, tick)
            }
        };

        let report = rebuild.step(source, admission, &self.config, tick);
        for (id, _) in rebuild.partial().iter() {
            self.locator.insert(*id, zone);
        }
        if report.hit_cap {
            warn!(
                %zone,
                cap = self.config.max_items_per_zone,
                "Zone item cap reached; rebuild stopped early"
            );
        }

        if rebuild.is_exhausted() {
            let started = rebuild.started_tick();
            let entry = rebuild.finish();
            info!(
                %zone,
                tracked = entry.len(),
                cells = entry.cell_count(),
                ticks = tick.saturating_sub(started),
                "Zone cache ready"
            );
            self.zones.insert(zone, ZoneState::Ready(entry));
            true
        } else {
            self.zones.insert(zone, ZoneState::Building(rebuild));
            false
        }
    }
}
