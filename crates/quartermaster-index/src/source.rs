//! How the index sees the world: read-only item lookup plus an admission
//! predicate supplied by the eligibility layer.

use quartermaster_types::{Item, ItemId, ZoneId};

/// Read access to the world's items.
///
/// The world owns every item; the index only keeps ids and resolves them
/// through this trait when rebuilding or healing.
pub trait ItemSource {
    /// Look up a live item by id. Removed items return `None`.
    fn item(&self, id: ItemId) -> Option<&Item>;

    /// Ids of every item currently in `zone`, in a stable order.
    fn items_in_zone(&self, zone: ZoneId) -> Vec<ItemId>;
}

/// Decides which items belong in the index at all.
///
/// Implemented by the eligibility filter with its agent-independent item
/// checks (equippable, not heavyweight, on the ground or in approved storage).
pub trait Admission {
    /// Whether `item` should be indexed.
    fn admits(&self, item: &Item) -> bool;
}

/// Admits every item. Useful for tests and hosts that pre-filter.
#[derive(Debug, Clone, Copy, Default)]
pub struct AdmitAll;

impl Admission for AdmitAll {
    fn admits(&self, _item: &Item) -> bool {
        true
    }
}

/// Checks the index applies regardless of admission: the item is alive, in
/// `zone`, at a finite position, and admitted.
pub fn admissible(item: &Item, zone: ZoneId, admission: &dyn Admission) -> bool {
    !item.destroyed && item.zone == zone && item.position.is_finite() && admission.admits(item)
}
