//! Enumeration types shared across the Quartermaster workspace.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Items
// ---------------------------------------------------------------------------

/// Discrete quality tier of a crafted item, worst to best.
///
/// The derived ordering follows declaration order, so `Awful < Legendary`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum QualityTier {
    /// Barely functional.
    Awful,
    /// Below average.
    Poor,
    /// Standard quality; the tier of uncrafted loot.
    #[default]
    Normal,
    /// Above average.
    Good,
    /// Clearly superior.
    Excellent,
    /// Master-crafted.
    Masterwork,
    /// Best attainable.
    Legendary,
}

impl QualityTier {
    /// Every tier in ascending order.
    pub const ALL: [Self; 7] = [
        Self::Awful,
        Self::Poor,
        Self::Normal,
        Self::Good,
        Self::Excellent,
        Self::Masterwork,
        Self::Legendary,
    ];

    /// Zero-based rank of the tier (`Awful` = 0, `Legendary` = 6).
    pub const fn rank(self) -> u8 {
        match self {
            Self::Awful => 0,
            Self::Poor => 1,
            Self::Normal => 2,
            Self::Good => 3,
            Self::Excellent => 4,
            Self::Masterwork => 5,
            Self::Legendary => 6,
        }
    }
}

/// Broad combat class of a holdable item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemClass {
    /// Close-combat item (blades, clubs, spears).
    Melee,
    /// Projectile item (bows, firearms).
    Ranged,
}

impl ItemClass {
    /// The other class. Sidearm checks look for this relative to the primary.
    pub const fn opposite(self) -> Self {
        match self {
            Self::Melee => Self::Ranged,
            Self::Ranged => Self::Melee,
        }
    }

    /// The skill category that governs use of this class.
    pub const fn skill(self) -> SkillCategory {
        match self {
            Self::Melee => SkillCategory::Melee,
            Self::Ranged => SkillCategory::Shooting,
        }
    }
}

// ---------------------------------------------------------------------------
// Agents
// ---------------------------------------------------------------------------

/// Skill categories relevant to item selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkillCategory {
    /// Close combat.
    Melee,
    /// Ranged combat.
    Shooting,
}

/// Kind of being an agent is. Only some categories manage their own gear.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentCategory {
    /// A thinking being that chooses its own equipment.
    Sapient,
    /// A mechanical unit with fixed loadout.
    Mechanical,
    /// An animal.
    Animal,
}

/// Lifecycle state of an agent in the host simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifeState {
    /// Known to the host but not placed in any zone yet.
    Unspawned,
    /// Spawned and able to act.
    Alive,
    /// Spawned but incapacitated.
    Downed,
    /// Dead.
    Dead,
}

/// Personality traits that change how items are valued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentTrait {
    /// Refuses ranged items and strongly prefers melee.
    Brawler,
    /// Fires quickly; values short cycle times on ranged items.
    TriggerHappy,
    /// Aims carefully; values long engagement range.
    CarefulShooter,
}

/// Role or faction standing of an agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentRole {
    /// Ordinary member of the managed population.
    Colonist,
    /// Assigned guard; keeps its issued item.
    Guard,
    /// Assigned hunter; prefers ranged items.
    Hunter,
    /// Visitor from another faction.
    Guest,
    /// Captive.
    Prisoner,
}

/// Group duty the agent is currently assigned to.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum GroupDuty {
    /// No group duty.
    #[default]
    None,
    /// Travelling with a caravan.
    Caravan,
    /// Taking part in a ritual or ceremony.
    Ritual,
    /// Defending a position.
    Defend,
    /// Escorting another agent.
    Escort,
}

// ---------------------------------------------------------------------------
// Activities and tasks
// ---------------------------------------------------------------------------

/// How an agent's current activity may be preempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityClass {
    /// Never interrupted except by an explicit pin override.
    Critical,
    /// Idle or low-value activity; always interruptible.
    Safe,
    /// Ordinary productive work; interruptible under conditions.
    Conditional,
}

/// Equipment slot a task targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EquipSlot {
    /// The single held item.
    Primary,
    /// The secondary carried item.
    Sidearm,
}

/// How the task executor should schedule a started task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriorityMode {
    /// Preempt the current activity.
    Interrupt,
    /// Run after the current activity ends.
    Queue,
}
