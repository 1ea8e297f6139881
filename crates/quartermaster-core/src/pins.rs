//! Pinned (forced) item assignments.
//!
//! A pin records that the user explicitly chose an item for an agent. While a
//! pin is active the evaluator never proposes a replacement. Pins end when the
//! user clears them or when the item leaves the agent's hands.

use std::collections::BTreeMap;

use quartermaster_types::{AgentId, ItemId};
use serde::Serialize;

/// One forced assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pin {
    /// The forced item.
    pub item: ItemId,
    /// Whether the agent has been observed holding the item.
    pub equipped: bool,
    /// Tick the pin was set on.
    pub set_tick: u64,
}

/// Forced assignments keyed by agent.
#[derive(Debug, Clone, Default)]
pub struct PinTracker {
    pins: BTreeMap<AgentId, Pin>,
}

impl PinTracker {
    /// No pins.
    pub const fn new() -> Self {
        Self {
            pins: BTreeMap::new(),
        }
    }

    /// Force `item` onto `agent`, replacing any earlier pin.
    pub fn set(&mut self, agent: AgentId, item: ItemId, equipped: bool, tick: u64) {
        self.pins.insert(
            agent,
            Pin {
                item,
                equipped,
                set_tick: tick,
            },
        );
    }

    /// Release the agent's pin. Returns the pin that was removed.
    pub fn clear(&mut self, agent: AgentId) -> Option<Pin> {
        self.pins.remove(&agent)
    }

    /// The agent's pin.
    pub fn get(&self, agent: AgentId) -> Option<&Pin> {
        self.pins.get(&agent)
    }

    /// Whether the agent has a pin.
    pub fn is_pinned(&self, agent: AgentId) -> bool {
        self.pins.contains_key(&agent)
    }

    /// Drop every pin on `item` (the item left the world).
    pub fn clear_item(&mut self, item: ItemId) -> usize {
        let before = self.pins.len();
        self.pins.retain(|_, pin| pin.item != item);
        before.saturating_sub(self.pins.len())
    }

    /// Reconcile a pin with the item's current holder.
    ///
    /// Marks the pin equipped once the agent holds the item. A pin whose item
    /// was equipped and is now held by someone else (or nobody) is cleared.
    /// Returns `true` if a pin was cleared.
    pub fn observe_holder(&mut self, item: ItemId, holder: Option<AgentId>) -> bool {
        let mut cleared = false;
        self.pins.retain(|agent, pin| {
            if pin.item != item {
                return true;
            }
            if holder == Some(*agent) {
                pin.equipped = true;
                return true;
            }
            if pin.equipped {
                cleared = true;
                return false;
            }
            true
        });
        cleared
    }

    /// Keep only pins for which `keep` returns `true`.
    pub fn retain(&mut self, mut keep: impl FnMut(AgentId, &Pin) -> bool) {
        self.pins.retain(|agent, pin| keep(*agent, pin));
    }

    /// Number of active pins.
    pub fn len(&self) -> usize {
        self.pins.len()
    }

    /// Whether no pins are active.
    pub fn is_empty(&self) -> bool {
        self.pins.is_empty()
    }
}
