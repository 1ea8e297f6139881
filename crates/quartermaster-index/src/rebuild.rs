//! Incremental construction of a zone's [`CacheEntry`].
//!
//! A [`RebuildState`] snapshots the ids of every item the world reports in a
//! zone and then files them a bounded chunk at a time. Each step resolves
//! ids against the live world, so items destroyed or picked up while the
//! rebuild is in flight are simply skipped. Once the cursor is exhausted the
//! partial entry is handed over via [`RebuildState::finish`].

use quartermaster_types::{ItemId, ZoneId};

use crate::config::IndexConfig;
use crate::grid::{CacheEntry, InsertOutcome};
use crate::{Admission, ItemSource, admissible};

/// Outcome of one [`RebuildState::step`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepReport {
    /// Ids examined this step.
    pub processed: usize,
    /// Ids filed into the partial entry this step.
    pub admitted: usize,
    /// The step stopped because the zone cap was reached.
    pub hit_cap: bool,
}

/// Transient state of a zone whose cache is still being built.
#[derive(Debug, Clone, PartialEq)]
pub struct RebuildState {
    /// Zone being rebuilt.
    zone: ZoneId,
    /// Ids to examine, in world order.
    pending: Vec<ItemId>,
    /// Index of the next id in `pending`.
    cursor: usize,
    /// Entry built so far.
    partial: CacheEntry,
    /// Tick the rebuild started on.
    started_tick: u64,
    /// Tick of the most recent step.
    last_processed_tick: u64,
}

impl RebuildState {
    /// Begin a rebuild of `zone` over `pending`.
    pub const fn start(zone: ZoneId, pending: Vec<ItemId>, tick: u64) -> Self {
        Self {
            zone,
            pending,
            cursor: 0,
            partial: CacheEntry::new(),
            started_tick: tick,
            last_processed_tick: tick,
        }
    }

    /// Zone being rebuilt.
    pub const fn zone(&self) -> ZoneId {
        self.zone
    }

    /// Ids not yet examined.
    pub const fn remaining(&self) -> usize {
        self.pending.len().saturating_sub(self.cursor)
    }

    /// Whether every pending id has been examined.
    pub const fn is_exhausted(&self) -> bool {
        self.cursor >= self.pending.len()
    }

    /// Tick the rebuild started on.
    pub const fn started_tick(&self) -> u64 {
        self.started_tick
    }

    /// Tick of the most recent step.
    pub const fn last_processed_tick(&self) -> u64 {
        self.last_processed_tick
    }

    /// Entry built so far.
    pub const fn partial(&self) -> &CacheEntry {
        &self.partial
    }

    /// Mutable access for event updates that arrive mid-rebuild.
    pub const fn partial_mut(&mut self) -> &mut CacheEntry {
        &mut self.partial
    }

    /// Examine up to `config.rebuild_chunk` pending ids.
    ///
    /// Reaching the zone cap ends the rebuild early: the cursor jumps to the
    /// end so the next check promotes the capped entry.
    pub fn step(
        &mut self,
        source: &dyn ItemSource,
        admission: &dyn Admission,
        config: &IndexConfig,
        tick: u64,
    ) -> StepReport {
        let mut report = StepReport {
            processed: 0,
            admitted: 0,
            hit_cap: false,
        };
        self.last_processed_tick = tick;

        while report.processed < config.rebuild_chunk {
            let Some(&id) = self.pending.get(self.cursor) else {
                break;
            };
            self.cursor = self.cursor.saturating_add(1);
            report.processed = report.processed.saturating_add(1);

            let Some(item) = source.item(id) else {
                continue;
            };
            if !admissible(item, self.zone, admission) {
                continue;
            }
            match self.partial.insert(
                id,
                item.position,
                config.cell_size,
                config.max_items_per_zone,
            ) {
                InsertOutcome::Inserted => report.admitted = report.admitted.saturating_add(1),
                InsertOutcome::AtCapacity => {
                    report.hit_cap = true;
                    self.cursor = self.pending.len();
                    break;
                }
                InsertOutcome::AlreadyTracked | InsertOutcome::InvalidPosition => {}
            }
        }
        report
    }

    /// Hand over the finished entry.
    pub fn finish(self) -> CacheEntry {
        self.partial
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use quartermaster_types::{Item, ItemDef, Position};

    use super::*;
    use crate::AdmitAll;

    struct Items {
        zone: ZoneId,
        items: BTreeMap<ItemId, Item>,
        order: Vec<ItemId>,
    }

    impl ItemSource for Items {
        fn item(&self, id: ItemId) -> Option<&Item> {
            self.items.get(&id)
        }

        fn items_in_zone(&self, zone: ZoneId) -> Vec<ItemId> {
            if zone == self.zone { self.order.clone() } else { Vec::new() }
        }
    }

    fn world(count: usize) -> Items {
        let zone = ZoneId::new();
        let mut items = BTreeMap::new();
        let mut order = Vec::new();
        for i in 0..count {
            #[allow(clippy::cast_precision_loss)]
            let x = i as f32 * 13.0;
            let item = Item::new(ItemDef::melee("spear", 12.0, 2.0), zone, Position::new(x, 5.0));
            order.push(item.id);
            items.insert(item.id, item);
        }
        Items { zone, items, order }
    }

    #[test]
    fn steps_are_bounded_by_chunk() {
        let source = world(10);
        let config = IndexConfig {
            rebuild_chunk: 4,
            ..IndexConfig::default()
        };
        let mut state = RebuildState::start(source.zone, source.order.clone(), 0);

        let first = state.step(&source, &AdmitAll, &config, 1);
        assert_eq!(first.processed, 4);
        assert_eq!(state.remaining(), 6);
        assert!(!state.is_exhausted());

        state.step(&source, &AdmitAll, &config, 2);
        let last = state.step(&source, &AdmitAll, &config, 3);
        assert_eq!(last.processed, 2);
        assert!(state.is_exhausted());
        assert_eq!(state.last_processed_tick(), 3);
        assert_eq!(state.finish().len(), 10);
    }

    #[test]
    fn vanished_items_are_skipped() {
        let mut source = world(5);
        let gone = source.order.first().copied().unwrap_or_default();
        let mut state = RebuildState::start(source.zone, source.order.clone(), 0);
        source.items.remove(&gone);

        let report = state.step(&source, &AdmitAll, &IndexConfig::default(), 1);
        assert_eq!(report.processed, 5);
        assert_eq!(report.admitted, 4);
        assert!(!state.partial().contains(gone));
    }

    #[test]
    fn cap_stops_rebuild_early() {
        let source = world(10);
        let config = IndexConfig {
            max_items_per_zone: 3,
            rebuild_chunk: 100,
            ..IndexConfig::default()
        };
        let mut state = RebuildState::start(source.zone, source.order.clone(), 0);
        let report = state.step(&source, &AdmitAll, &config, 1);
        assert!(report.hit_cap);
        assert!(state.is_exhausted());
        assert_eq!(state.partial().len(), 3);
    }
}
