//! In-memory implementations of every host interface.
//!
//! [`InMemoryWorld`] keeps agents and items in ordered maps and applies
//! finished tasks itself; [`RecordingExecutor`], [`StaticPolicies`] and
//! [`RecordingSink`] record what the engine asked for. Used by the
//! integration tests and the soak harness.

use std::collections::{BTreeMap, BTreeSet};

use quartermaster_index::ItemSource;
use quartermaster_scoring::{EligibilityWorld, ScoringEnvironment};
use quartermaster_types::{
    ActivityDescriptor, Agent, AgentId, EquipSlot, EquipTask, EquipmentPolicy, Holder, Item,
    ItemId, PriorityMode, Position, TaskKind, ZoneId,
};

use crate::events::WorldEvent;
use crate::host::{Notification, NotificationSink, PolicyProvider, TaskExecutor, World};

/// A complete world held in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryWorld {
    agents: BTreeMap<AgentId, Agent>,
    items: BTreeMap<ItemId, Item>,
    threatened: BTreeSet<ZoneId>,
    forbidden: BTreeSet<(ItemId, AgentId)>,
    research: BTreeSet<String>,
    unreachable: BTreeSet<ItemId>,
    ammo: BTreeMap<(AgentId, String), u32>,
}

impl InMemoryWorld {
    /// An empty world.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an agent. Returns the matching event.
    pub fn add_agent(&mut self, agent: Agent) -> WorldEvent {
        let id = agent.id;
        self.agents.insert(id, agent);
        WorldEvent::AgentSpawned { agent: id }
    }

    /// Remove an agent, dropping whatever it held on the spot.
    pub fn remove_agent(&mut self, id: AgentId) -> Vec<WorldEvent> {
        let mut events = Vec::new();
        let Some(agent) = self.agents.remove(&id) else {
            return events;
        };
        for item in [agent.held_item, agent.sidearm].into_iter().flatten() {
            if let Some(live) = self.items.get_mut(&item) {
                live.holder = Holder::OnGround;
                live.position = agent.position;
                events.push(WorldEvent::ItemHolderChanged { item });
            }
        }
        events.push(WorldEvent::AgentDespawned { agent: id });
        events
    }

    /// Mutable access to an agent.
    pub fn agent_mut(&mut self, id: AgentId) -> Option<&mut Agent> {
        self.agents.get_mut(&id)
    }

    /// Insert or replace an item. Returns the matching event.
    pub fn add_item(&mut self, item: Item) -> WorldEvent {
        let id = item.id;
        self.items.insert(id, item);
        WorldEvent::ItemSpawned { item: id }
    }

    /// Remove an item, clearing it from any agent's hands.
    pub fn remove_item(&mut self, id: ItemId) -> Option<WorldEvent> {
        self.items.remove(&id)?;
        for agent in self.agents.values_mut() {
            if agent.held_item == Some(id) {
                agent.held_item = None;
            }
            if agent.sidearm == Some(id) {
                agent.sidearm = None;
            }
        }
        Some(WorldEvent::ItemDespawned { item: id })
    }

    /// Mutable access to an item.
    pub fn item_mut(&mut self, id: ItemId) -> Option<&mut Item> {
        self.items.get_mut(&id)
    }

    /// Move an item within its zone or into `zone`.
    pub fn move_item(&mut self, id: ItemId, zone: ZoneId, to: Position) -> Option<WorldEvent> {
        let item = self.items.get_mut(&id)?;
        let from = item.position;
        item.position = to;
        item.zone = zone;
        Some(WorldEvent::ItemMoved { item: id, from })
    }

    /// Change an item's holder.
    pub fn set_holder(&mut self, id: ItemId, holder: Holder) -> Option<WorldEvent> {
        let item = self.items.get_mut(&id)?;
        item.holder = holder;
        Some(WorldEvent::ItemHolderChanged { item: id })
    }

    /// Mark a zone as under threat (or not).
    pub fn set_threatened(&mut self, zone: ZoneId, threatened: bool) {
        if threatened {
            self.threatened.insert(zone);
        } else {
            self.threatened.remove(&zone);
        }
    }

    /// Forbid `item` to `agent`.
    pub fn forbid(&mut self, item: ItemId, agent: AgentId) {
        self.forbidden.insert((item, agent));
    }

    /// Mark a research project complete.
    pub fn complete_research(&mut self, project: &str) {
        self.research.insert(project.to_owned());
    }

    /// Make `item` unreachable for everyone.
    pub fn block_path_to(&mut self, item: ItemId) {
        self.unreachable.insert(item);
    }

    /// Set how much of `ammo_kind` the agent can get at.
    pub fn set_ammo(&mut self, agent: AgentId, ammo_kind: &str, count: u32) {
        self.ammo.insert((agent, ammo_kind.to_owned()), count);
    }

    /// Number of items in the world.
    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    /// Every item id, in order.
    pub fn item_ids(&self) -> Vec<ItemId> {
        self.items.keys().copied().collect()
    }

    /// Apply a finished engine task and return the events it caused.
    ///
    /// Equipping moves the previously held item in that slot to the ground at
    /// the agent's feet.
    pub fn apply_task(&mut self, task: &EquipTask) -> Vec<WorldEvent> {
        match task.kind {
            TaskKind::Equip { item, slot } => self.equip(task.agent, item, slot),
            TaskKind::Drop { item } => self.drop_item(task.agent, item),
        }
    }

    /// Put `item` into the agent's `slot`.
    pub fn equip(&mut self, agent: AgentId, item: ItemId, slot: EquipSlot) -> Vec<WorldEvent> {
        let mut events = Vec::new();
        let Some(holder) = self.agents.get_mut(&agent) else {
            return events;
        };
        if !self.items.contains_key(&item) {
            return events;
        }
        let position = holder.position;
        let zone = holder.zone;
        let previous = match slot {
            EquipSlot::Primary => holder.held_item.replace(item),
            EquipSlot::Sidearm => holder.sidearm.replace(item),
        };
        if let Some(previous) = previous.filter(|previous| *previous != item)
            && let Some(old) = self.items.get_mut(&previous)
        {
            old.holder = Holder::OnGround;
            old.position = position;
            if let Some(zone) = zone {
                old.zone = zone;
            }
            events.push(WorldEvent::ItemHolderChanged { item: previous });
        }
        if let Some(new) = self.items.get_mut(&item) {
            new.holder = Holder::HeldBy { agent };
            new.position = position;
            events.push(WorldEvent::ItemHolderChanged { item });
        }
        events
    }

    /// Drop the agent's `item` where it stands.
    pub fn drop_item(&mut self, agent: AgentId, item: ItemId) -> Vec<WorldEvent> {
        let Some(holder) = self.agents.get_mut(&agent) else {
            return Vec::new();
        };
        if holder.held_item == Some(item) {
            holder.held_item = None;
        } else if holder.sidearm == Some(item) {
            holder.sidearm = None;
        } else {
            return Vec::new();
        }
        let position = holder.position;
        let Some(live) = self.items.get_mut(&item) else {
            return Vec::new();
        };
        live.holder = Holder::OnGround;
        live.position = position;
        vec![WorldEvent::ItemHolderChanged { item }]
    }
}

impl ItemSource for InMemoryWorld {
    fn item(&self, id: ItemId) -> Option<&Item> {
        self.items.get(&id)
    }

    fn items_in_zone(&self, zone: ZoneId) -> Vec<ItemId> {
        self.items
            .values()
            .filter(|item| item.zone == zone)
            .map(|item| item.id)
            .collect()
    }
}

impl EligibilityWorld for InMemoryWorld {
    fn is_forbidden(&self, item: &Item, agent: &Agent) -> bool {
        self.forbidden.contains(&(item.id, agent.id))
    }

    fn research_complete(&self, project: &str) -> bool {
        self.research.contains(project)
    }

    fn can_reach(&self, _agent: &Agent, item: &Item) -> bool {
        !self.unreachable.contains(&item.id)
    }
}

impl ScoringEnvironment for InMemoryWorld {
    fn ammo_available(&self, agent: &Agent, ammo_kind: &str) -> Option<u32> {
        self.ammo.get(&(agent.id, ammo_kind.to_owned())).copied()
    }
}

impl World for InMemoryWorld {
    fn agent(&self, id: AgentId) -> Option<&Agent> {
        self.agents.get(&id)
    }

    fn agent_ids(&self) -> Vec<AgentId> {
        self.agents.keys().copied().collect()
    }

    fn zone_under_threat(&self, zone: ZoneId) -> bool {
        self.threatened.contains(&zone)
    }
}

/// One task handed to [`RecordingExecutor`].
#[derive(Debug, Clone, PartialEq)]
pub struct StartedTask {
    /// The task.
    pub task: EquipTask,
    /// Requested priority.
    pub mode: PriorityMode,
}

/// Executor that records tasks and reports scripted activities.
#[derive(Debug, Clone)]
pub struct RecordingExecutor {
    /// Tasks accepted so far, oldest first.
    pub started: Vec<StartedTask>,
    /// Activity per agent; unlisted agents are idle.
    pub activities: BTreeMap<AgentId, ActivityDescriptor>,
    /// Agents under direct control.
    pub locked: BTreeSet<AgentId>,
    /// Whether `start_task` accepts tasks.
    pub accept: bool,
}

impl RecordingExecutor {
    /// An executor that accepts everything.
    pub const fn new() -> Self {
        Self {
            started: Vec::new(),
            activities: BTreeMap::new(),
            locked: BTreeSet::new(),
            accept: true,
        }
    }

    /// Remove and return every recorded task.
    pub fn take_started(&mut self) -> Vec<StartedTask> {
        std::mem::take(&mut self.started)
    }
}

impl Default for RecordingExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskExecutor for RecordingExecutor {
    fn start_task(&mut self, _agent: AgentId, task: &EquipTask, mode: PriorityMode) -> bool {
        if self.accept {
            self.started.push(StartedTask {
                task: task.clone(),
                mode,
            });
        }
        self.accept
    }

    fn current_activity(&self, agent: AgentId) -> ActivityDescriptor {
        self.activities
            .get(&agent)
            .cloned()
            .unwrap_or_else(ActivityDescriptor::idle)
    }

    fn is_activity_locked(&self, agent: AgentId) -> bool {
        self.locked.contains(&agent)
    }
}

/// Policies from a fixed table with a shared default.
#[derive(Debug, Clone)]
pub struct StaticPolicies {
    /// Policy for agents without their own entry.
    pub default: EquipmentPolicy,
    /// Per-agent policies.
    pub per_agent: BTreeMap<AgentId, EquipmentPolicy>,
}

impl StaticPolicies {
    /// Every agent may use everything.
    pub const fn allow_all() -> Self {
        Self {
            default: EquipmentPolicy::allow_all(),
            per_agent: BTreeMap::new(),
        }
    }
}

impl Default for StaticPolicies {
    fn default() -> Self {
        Self::allow_all()
    }
}

impl PolicyProvider for StaticPolicies {
    fn policy_for(&self, agent: AgentId) -> &EquipmentPolicy {
        self.per_agent.get(&agent).unwrap_or(&self.default)
    }
}

/// Sink that keeps every notification.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    /// Notifications received, oldest first.
    pub received: Vec<Notification>,
}

impl NotificationSink for RecordingSink {
    fn notify(&mut self, notification: Notification) {
        self.received.push(notification);
    }
}
