//! Activity descriptors reported by the host and task descriptors the engine
//! hands back to it.

use serde::{Deserialize, Serialize};

use crate::enums::{ActivityClass, EquipSlot};
use crate::ids::{AgentId, ItemId};

/// What an agent is doing right now, as reported by the task executor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityDescriptor {
    /// Host activity kind, e.g. `"wander"` or `"tend_patient"`.
    pub kind: String,
    /// Classification supplied by the host when it already knows it.
    pub class_hint: Option<ActivityClass>,
    /// Work priority tier of the job (1 = most important), if it is work.
    pub work_priority: Option<u8>,
    /// The activity is an equip/drop task started by this engine.
    pub engine_task: bool,
}

impl ActivityDescriptor {
    /// An activity of the given kind with no extra hints.
    pub fn of_kind(kind: &str) -> Self {
        Self {
            kind: kind.to_owned(),
            class_hint: None,
            work_priority: None,
            engine_task: false,
        }
    }

    /// The idle activity.
    pub fn idle() -> Self {
        Self::of_kind("idle")
    }
}

/// What the executor should make the agent do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum TaskKind {
    /// Walk to `item` and hold it in `slot`.
    Equip {
        /// Target item.
        item: ItemId,
        /// Slot the item goes into.
        slot: EquipSlot,
    },
    /// Drop the held `item`.
    Drop {
        /// Item to drop.
        item: ItemId,
    },
}

impl TaskKind {
    /// The item the task acts on.
    pub const fn item(self) -> ItemId {
        match self {
            Self::Equip { item, .. } | Self::Drop { item } => item,
        }
    }
}

/// A task descriptor produced by the evaluator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquipTask {
    /// Agent the task is for.
    pub agent: AgentId,
    /// What to do.
    pub kind: TaskKind,
    /// Score of the target item (0 for drops).
    pub score: f32,
    /// Item the agent held in the affected slot before the task.
    pub previous_item: Option<ItemId>,
    /// Score of `previous_item`, if there was one.
    pub previous_score: Option<f32>,
    /// Generated by the engine rather than requested by a user pin.
    pub auto_generated: bool,
    /// Tick the task was produced on.
    pub created_tick: u64,
}

impl EquipTask {
    /// The item the task acts on.
    pub const fn target(&self) -> ItemId {
        self.kind.item()
    }

    /// Candidate/current score ratio; infinite when nothing comparable was held.
    ///
    /// For a negative current score the gain is measured against its
    /// magnitude, matching how the upgrade threshold treats it.
    pub fn improvement_ratio(&self) -> f32 {
        match self.previous_score {
            None => f32::INFINITY,
            Some(previous) if previous > 0.0 => self.score / previous,
            Some(previous) if previous < 0.0 => 1.0 + (self.score - previous) / previous.abs(),
            Some(_) if self.score > 0.0 => f32::INFINITY,
            Some(_) => 1.0,
        }
    }
}
