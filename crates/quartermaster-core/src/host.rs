//! Interfaces to the host simulation.
//!
//! The engine consumes a [`World`] (read-only state), a [`TaskExecutor`]
//! (starts tasks and reports what agents are doing), and a
//! [`PolicyProvider`] (equipment allow-lists). It emits fire-and-forget
//! [`Notification`]s into a [`NotificationSink`].

use quartermaster_index::ItemSource;
use quartermaster_scoring::{EligibilityWorld, ScoringEnvironment};
use quartermaster_types::{
    ActivityDescriptor, Agent, AgentId, EquipSlot, EquipTask, EquipmentPolicy, ItemId,
    ItemKindId, PriorityMode, ZoneId,
};
use serde::Serialize;
use tracing::info;

/// Read-only view of the host world.
pub trait World: ItemSource + EligibilityWorld + ScoringEnvironment {
    /// Look up a live agent.
    fn agent(&self, id: AgentId) -> Option<&Agent>;

    /// Every live agent, in a stable order.
    fn agent_ids(&self) -> Vec<AgentId>;

    /// Whether `zone` is under active threat (shrinks the search radius).
    fn zone_under_threat(&self, _zone: ZoneId) -> bool {
        false
    }
}

/// Starts tasks and reports agent activity.
pub trait TaskExecutor {
    /// Ask the host to start `task`. Returns `false` if the host refuses.
    fn start_task(&mut self, agent: AgentId, task: &EquipTask, mode: PriorityMode) -> bool;

    /// What `agent` is doing now.
    fn current_activity(&self, agent: AgentId) -> ActivityDescriptor;

    /// Whether the agent is under direct control (drafted, scripted) and
    /// must not be given automatic tasks.
    fn is_activity_locked(&self, agent: AgentId) -> bool;
}

/// Supplies each agent's equipment policy.
pub trait PolicyProvider {
    /// The policy currently assigned to `agent`.
    fn policy_for(&self, agent: AgentId) -> &EquipmentPolicy;

    /// Whether `policy` admits `kind`.
    fn allows(&self, policy: &EquipmentPolicy, kind: ItemKindId) -> bool {
        policy.allows(kind)
    }
}

/// Observability events emitted by the engine.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum Notification {
    /// An armed agent finished switching to a better item.
    Upgraded {
        /// The agent.
        agent: AgentId,
        /// Slot that changed.
        slot: EquipSlot,
        /// New item.
        item: ItemId,
        /// Item held before.
        previous_item: Option<ItemId>,
        /// Score of the new item.
        score: f32,
        /// Score of the previous item.
        previous_score: Option<f32>,
    },
    /// An unarmed agent finished picking up an item.
    AutoEquipped {
        /// The agent.
        agent: AgentId,
        /// Slot that was filled.
        slot: EquipSlot,
        /// New item.
        item: ItemId,
        /// Score of the new item.
        score: f32,
    },
    /// The engine told an agent to drop an item its policy no longer allows.
    AutoDropped {
        /// The agent.
        agent: AgentId,
        /// Item being dropped.
        item: ItemId,
    },
    /// The executor refused or failed an engine task.
    TaskRejected {
        /// The agent.
        agent: AgentId,
        /// Target item of the task.
        item: ItemId,
        /// Tick until which the agent is backed off.
        backoff_until: u64,
    },
}

impl Notification {
    /// Agent the notification concerns.
    pub const fn agent(&self) -> AgentId {
        match self {
            Self::Upgraded { agent, .. }
            | Self::AutoEquipped { agent, .. }
            | Self::AutoDropped { agent, .. }
            | Self::TaskRejected { agent, .. } => *agent,
        }
    }
}

/// Receives notifications. Must not block.
pub trait NotificationSink {
    /// Accept one notification.
    fn notify(&mut self, notification: Notification);
}

/// Discards every notification.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl NotificationSink for NullSink {
    fn notify(&mut self, _notification: Notification) {}
}

/// Forwards notifications to `tracing` at info level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl NotificationSink for TracingSink {
    fn notify(&mut self, notification: Notification) {
        match notification {
            Notification::Upgraded {
                agent,
                slot,
                item,
                previous_item,
                score,
                previous_score,
            } => info!(
                agent_id = %agent,
                ?slot,
                item_id = %item,
                ?previous_item,
                score,
                ?previous_score,
                "Agent upgraded equipment"
            ),
            Notification::AutoEquipped {
                agent,
                slot,
                item,
                score,
            } => info!(agent_id = %agent, ?slot, item_id = %item, score, "Agent auto-equipped"),
            Notification::AutoDropped { agent, item } => {
                info!(agent_id = %agent, item_id = %item, "Agent dropping disallowed item");
            }
            Notification::TaskRejected {
                agent,
                item,
                backoff_until,
            } => info!(
                agent_id = %agent,
                item_id = %item,
                backoff_until,
                "Equip task rejected"
            ),
        }
    }
}

/// Everything the engine needs from the host for one call.
pub struct Host<'a, W: World> {
    /// World state.
    pub world: &'a W,
    /// Task executor.
    pub executor: &'a mut dyn TaskExecutor,
    /// Equipment policies.
    pub policies: &'a dyn PolicyProvider,
    /// Notification sink.
    pub sink: &'a mut dyn NotificationSink,
}
