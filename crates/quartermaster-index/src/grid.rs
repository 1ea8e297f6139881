//! Uniform grid bucketing and the per-zone [`CacheEntry`].
//!
//! A [`CacheEntry`] keeps three views of the same item set in lock-step:
//!
//! - `items`: item -> tracked position and the cell it is filed under
//! - `grid`: cell -> items filed in that cell
//! - `revision`: bumped on every mutation
//!
//! Invariant: every tracked item is filed in exactly one cell, and that cell
//! is the one containing its tracked position. Empty cells are pruned.

use std::collections::{BTreeMap, BTreeSet};

use quartermaster_types::{ItemId, Position};
use serde::Serialize;

/// Integer coordinates of one grid cell: `floor(pos / cell_size)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct CellKey {
    /// Column.
    pub x: i32,
    /// Row.
    pub y: i32,
}

impl CellKey {
    /// The cell containing `position`.
    pub fn containing(position: Position, cell_size: f32) -> Self {
        Self {
            x: floor_to_cell(position.x / cell_size),
            y: floor_to_cell(position.y / cell_size),
        }
    }
}

/// Float-to-int floor; `as` saturates at the `i32` bounds.
#[allow(clippy::cast_possible_truncation)]
fn floor_to_cell(value: f32) -> i32 {
    value.floor() as i32
}

/// Where a tracked item sits in the grid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TrackedItem {
    /// Position when last filed.
    pub position: Position,
    /// Cell the item is filed under.
    pub cell: CellKey,
}

/// Result of [`CacheEntry::insert`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// The item was newly filed.
    Inserted,
    /// The item was already tracked; its position was refreshed.
    AlreadyTracked,
    /// The entry is full; the item was dropped.
    AtCapacity,
    /// The position was not finite; the item was dropped.
    InvalidPosition,
}

/// The authoritative item grid for one zone.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CacheEntry {
    /// Tracked items and their filing.
    items: BTreeMap<ItemId, TrackedItem>,
    /// Occupied cells.
    grid: BTreeMap<CellKey, BTreeSet<ItemId>>,
    /// Monotonic change counter.
    revision: u64,
}

impl CacheEntry {
    /// Create an empty entry.
    pub const fn new() -> Self {
        Self {
            items: BTreeMap::new(),
            grid: BTreeMap::new(),
            revision: 0,
        }
    }

    /// Build an entry in a single pass, admitting items in order until `cap`.
    pub fn build<I>(items: I, cell_size: f32, cap: usize) -> Self
    where
        I: IntoIterator<Item = (ItemId, Position)>,
    {
        let mut entry = Self::new();
        for (id, position) in items {
            if entry.insert(id, position, cell_size, cap) == InsertOutcome::AtCapacity {
                break;
            }
        }
        entry
    }

    /// Number of tracked items.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether nothing is tracked.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Number of occupied cells.
    pub fn cell_count(&self) -> usize {
        self.grid.len()
    }

    /// Monotonic change counter.
    pub const fn revision(&self) -> u64 {
        self.revision
    }

    /// Whether `id` is tracked.
    pub fn contains(&self, id: ItemId) -> bool {
        self.items.contains_key(&id)
    }

    /// Filing of `id`, if tracked.
    pub fn tracked(&self, id: ItemId) -> Option<&TrackedItem> {
        self.items.get(&id)
    }

    /// Iterate tracked items in id order.
    pub fn iter(&self) -> impl Iterator<Item = (&ItemId, &TrackedItem)> {
        self.items.iter()
    }

    /// Items filed under `cell`.
    pub fn cell(&self, cell: CellKey) -> impl Iterator<Item = ItemId> + '_ {
        self.grid.get(&cell).into_iter().flatten().copied()
    }

    /// File `id` at `position`.
    ///
    /// Re-inserting a tracked item never duplicates it; it only refreshes the
    /// filing. New items beyond `cap` are dropped.
    pub fn insert(
        &mut self,
        id: ItemId,
        position: Position,
        cell_size: f32,
        cap: usize,
    ) -> InsertOutcome {
        if !position.is_finite() {
            return InsertOutcome::InvalidPosition;
        }
        if self.items.contains_key(&id) {
            self.relocate(id, position, cell_size);
            return InsertOutcome::AlreadyTracked;
        }
        if self.items.len() >= cap {
            return InsertOutcome::AtCapacity;
        }
        let cell = CellKey::containing(position, cell_size);
        self.items.insert(id, TrackedItem { position, cell });
        self.grid.entry(cell).or_default().insert(id);
        self.bump();
        InsertOutcome::Inserted
    }

    /// Stop tracking `id`. Returns `false` if it was not tracked.
    pub fn remove(&mut self, id: ItemId) -> bool {
        let Some(tracked) = self.items.remove(&id) else {
            return false;
        };
        self.unfile(id, tracked.cell);
        self.bump();
        true
    }

    /// Move a tracked item to `position`, refiling it if its cell changed.
    ///
    /// Returns `false` if `id` is not tracked or `position` is not finite.
    pub fn relocate(&mut self, id: ItemId, position: Position, cell_size: f32) -> bool {
        if !position.is_finite() {
            return false;
        }
        let cell = CellKey::containing(position, cell_size);
        let Some(tracked) = self.items.get_mut(&id) else {
            return false;
        };
        let old_cell = tracked.cell;
        tracked.position = position;
        tracked.cell = cell;
        if old_cell != cell {
            self.unfile(id, old_cell);
            self.grid.entry(cell).or_default().insert(id);
        }
        self.bump();
        true
    }

    /// Items whose tracked position lies within `radius` of `center`.
    ///
    /// Only cells intersecting the bounding square of the radius are
    /// visited; when that square spans more cells than are occupied, the
    /// occupied cells are scanned instead. Results are in cell order.
    pub fn query(&self, center: Position, radius: f32, cell_size: f32) -> Vec<ItemId> {
        if !center.is_finite() || radius.is_nan() || radius < 0.0 {
            return Vec::new();
        }
        let radius_sq = radius * radius;
        // Pad the square so float rounding at its edge never drops a cell.
        let pad = radius.mul_add(1e-5, 1e-3);
        let min = CellKey::containing(
            Position::new(center.x - radius - pad, center.y - radius - pad),
            cell_size,
        );
        let max = CellKey::containing(
            Position::new(center.x + radius + pad, center.y + radius + pad),
            cell_size,
        );

        let span_x = i64::from(max.x) - i64::from(min.x) + 1;
        let span_y = i64::from(max.y) - i64::from(min.y) + 1;
        let occupied = i64::try_from(self.grid.len()).unwrap_or(i64::MAX);

        let mut hits = Vec::new();
        let mut visit = |ids: &BTreeSet<ItemId>| {
            for id in ids {
                if let Some(tracked) = self.items.get(id)
                    && tracked.position.distance_sq(center) <= radius_sq
                {
                    hits.push(*id);
                }
            }
        };

        if span_x.saturating_mul(span_y) > occupied {
            for (cell, ids) in &self.grid {
                if (min.x..=max.x).contains(&cell.x) && (min.y..=max.y).contains(&cell.y) {
                    visit(ids);
                }
            }
        } else {
            for x in min.x..=max.x {
                for y in min.y..=max.y {
                    if let Some(ids) = self.grid.get(&CellKey { x, y }) {
                        visit(ids);
                    }
                }
            }
        }
        hits
    }

    /// Verify the grid invariant: each tracked item is filed in exactly one
    /// cell, that cell contains its position, and no cell is empty or holds
    /// an untracked id.
    pub fn check_invariants(&self, cell_size: f32) -> bool {
        let mut filed = 0usize;
        for (cell, ids) in &self.grid {
            if ids.is_empty() {
                return false;
            }
            for id in ids {
                match self.items.get(id) {
                    Some(tracked) if tracked.cell == *cell => filed = filed.saturating_add(1),
                    _ => return false,
                }
            }
        }
        filed == self.items.len()
            && self
                .items
                .values()
                .all(|tracked| CellKey::containing(tracked.position, cell_size) == tracked.cell)
    }

    fn unfile(&mut self, id: ItemId, cell: CellKey) {
        if let Some(ids) = self.grid.get_mut(&cell) {
            ids.remove(&id);
            if ids.is_empty() {
                self.grid.remove(&cell);
            }
        }
    }

    const fn bump(&mut self) {
        self.revision = self.revision.saturating_add(1);
    }
}
