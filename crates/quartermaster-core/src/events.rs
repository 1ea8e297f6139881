//! World events and the queue that serializes them into the tick.
//!
//! Hosts report spawns, moves, policy changes and task outcomes whenever they
//! happen, from any thread. The events are only applied at the start of
//! [`UpgradeEngine::tick`], which is the sole writer of the index and all
//! per-agent records.
//!
//! [`UpgradeEngine::tick`]: crate::engine::UpgradeEngine::tick

use std::sync::mpsc::{self, Receiver, Sender};

use quartermaster_types::{AgentId, ItemId, Position, ZoneId};
use serde::{Deserialize, Serialize};

/// Something that changed in the host world.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "event")]
pub enum WorldEvent {
    /// A new item appeared.
    ItemSpawned {
        /// The item.
        item: ItemId,
    },
    /// An item left the world (destroyed, consumed, removed).
    ItemDespawned {
        /// The item.
        item: ItemId,
    },
    /// An item changed position (possibly zone).
    ItemMoved {
        /// The item.
        item: ItemId,
        /// Position before the move.
        from: Position,
    },
    /// An item was picked up, dropped, stored or packed.
    ItemHolderChanged {
        /// The item.
        item: ItemId,
    },
    /// Equipment policy changed for one agent, one zone, or everyone.
    PolicyChanged {
        /// Affected agent, if scoped to one.
        agent: Option<AgentId>,
        /// Affected zone, if scoped to one.
        zone: Option<ZoneId>,
    },
    /// An agent joined the world.
    AgentSpawned {
        /// The agent.
        agent: AgentId,
    },
    /// An agent left the world.
    AgentDespawned {
        /// The agent.
        agent: AgentId,
    },
    /// The user forced `item` onto `agent`.
    PinSet {
        /// The agent.
        agent: AgentId,
        /// The forced item.
        item: ItemId,
    },
    /// The user released the agent's forced item.
    PinCleared {
        /// The agent.
        agent: AgentId,
    },
    /// The executor finished an engine task.
    TaskCompleted {
        /// The agent.
        agent: AgentId,
        /// Target item of the task.
        item: ItemId,
    },
    /// The executor abandoned an engine task.
    TaskFailed {
        /// The agent.
        agent: AgentId,
        /// Target item of the task.
        item: ItemId,
    },
}

/// Cloneable handle for pushing [`WorldEvent`]s into the engine.
#[derive(Debug, Clone)]
pub struct EventSender {
    tx: Sender<WorldEvent>,
}

impl EventSender {
    /// Queue `event`. Returns `false` if the engine has been dropped.
    pub fn send(&self, event: WorldEvent) -> bool {
        self.tx.send(event).is_ok()
    }
}

/// Receiving end owned by the engine.
#[derive(Debug)]
pub struct EventQueue {
    tx: Sender<WorldEvent>,
    rx: Receiver<WorldEvent>,
}

impl EventQueue {
    /// An empty queue.
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();
        Self { tx, rx }
    }

    /// A new sender for this queue.
    pub fn sender(&self) -> EventSender {
        EventSender {
            tx: self.tx.clone(),
        }
    }

    /// Take every event queued so far, in arrival order.
    pub fn drain(&self) -> Vec<WorldEvent> {
        self.rx.try_iter().collect()
    }
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drains_in_arrival_order() {
        let queue = EventQueue::new();
        let sender = queue.sender();
        let a = ItemId::new();
        let b = ItemId::new();
        assert!(sender.send(WorldEvent::ItemSpawned { item: a }));
        assert!(sender.send(WorldEvent::ItemDespawned { item: b }));

        let drained = queue.drain();
        assert_eq!(
            drained,
            vec![
                WorldEvent::ItemSpawned { item: a },
                WorldEvent::ItemDespawned { item: b }
            ]
        );
        assert!(queue.drain().is_empty());
    }

    #[test]
    fn senders_work_across_threads() {
        let queue = EventQueue::new();
        let sender = queue.sender();
        let agent = AgentId::new();
        let handle = std::thread::spawn(move || sender.send(WorldEvent::AgentSpawned { agent }));
        assert!(handle.join().is_ok_and(|sent| sent));
        assert_eq!(queue.drain().len(), 1);
    }
}
