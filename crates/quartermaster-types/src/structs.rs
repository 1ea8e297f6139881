//! Core entity structs: items, item definitions, agents, and equipment policies.
//!
//! The host world owns every [`Item`] and [`Agent`]; the engine only holds
//! identifiers and reads these structs through borrowed views.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::enums::{
    AgentCategory, AgentRole, AgentTrait, GroupDuty, ItemClass, LifeState, QualityTier,
    SkillCategory,
};
use crate::ids::{AgentId, ItemId, ItemKindId, ZoneId};

// ---------------------------------------------------------------------------
// Geometry
// ---------------------------------------------------------------------------

/// A point in a zone's 2D world coordinates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// Horizontal coordinate in world units.
    pub x: f32,
    /// Vertical coordinate in world units.
    pub y: f32,
}

impl Position {
    /// Create a position.
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Squared Euclidean distance to `other`.
    pub fn distance_sq(self, other: Self) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx.mul_add(dx, dy * dy)
    }

    /// Whether both coordinates are finite.
    pub const fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

// ---------------------------------------------------------------------------
// Item definitions
// ---------------------------------------------------------------------------

/// Combat statistics of a ranged item.
///
/// Times are in seconds except `burst_interval_ticks`, which is the host's
/// native delay between shots of one burst.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangedStats {
    /// Damage per projectile.
    pub damage: f32,
    /// Projectiles per burst (at least 1).
    pub burst_count: u32,
    /// Aiming time before the first shot of a burst.
    pub warmup_secs: f32,
    /// Steady-state delay after a burst completes.
    pub cooldown_secs: f32,
    /// Delay between shots within a burst, in host ticks.
    pub burst_interval_ticks: u32,
    /// Maximum engagement range in world units.
    pub range: f32,
}

/// Combat statistics of a melee item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeleeStats {
    /// Damage per strike.
    pub damage: f32,
    /// Seconds between strikes.
    pub cooldown_secs: f32,
}

/// Static definition shared by every instance of one item kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemDef {
    /// Kind identifier referenced by equipment policies.
    pub kind: ItemKindId,
    /// Display label used in notifications and logs.
    pub label: String,
    /// Combat class.
    pub class: ItemClass,
    /// Whether instances can be held as equipment at all.
    pub equippable: bool,
    /// Heavyweight kinds (mounted guns, siege gear) are never auto-equipped.
    pub heavyweight: bool,
    /// Research project that must be complete before agents may use it.
    pub research_prerequisite: Option<String>,
    /// Ammunition kind consumed per shot, if any.
    pub ammo_kind: Option<String>,
    /// Ranged statistics; present for ranged items.
    pub ranged: Option<RangedStats>,
    /// Melee statistics; present for melee items and ranged items usable as clubs.
    pub melee: Option<MeleeStats>,
}

impl ItemDef {
    /// A melee definition with the given strike damage and cooldown.
    pub fn melee(label: &str, damage: f32, cooldown_secs: f32) -> Self {
        Self {
            kind: ItemKindId::new(),
            label: label.to_owned(),
            class: ItemClass::Melee,
            equippable: true,
            heavyweight: false,
            research_prerequisite: None,
            ammo_kind: None,
            ranged: None,
            melee: Some(MeleeStats {
                damage,
                cooldown_secs,
            }),
        }
    }

    /// A ranged definition from its full statistics.
    pub fn ranged(label: &str, stats: RangedStats) -> Self {
        Self {
            kind: ItemKindId::new(),
            label: label.to_owned(),
            class: ItemClass::Ranged,
            equippable: true,
            heavyweight: false,
            research_prerequisite: None,
            ammo_kind: None,
            ranged: Some(stats),
            melee: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Item instances
// ---------------------------------------------------------------------------

/// Where an item currently sits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "state")]
pub enum Holder {
    /// Lying loose on the ground.
    OnGround,
    /// Held or carried by an agent.
    HeldBy {
        /// The holding agent.
        agent: AgentId,
    },
    /// Inside a container or storage building.
    Contained {
        /// Whether the container is approved storage agents may take from.
        approved: bool,
    },
    /// Packed for transport ("minified"); must be unpacked before use.
    Packed,
}

/// A single item instance in the world.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    /// Unique instance identifier.
    pub id: ItemId,
    /// Kind definition.
    pub def: ItemDef,
    /// Current position within its zone.
    pub position: Position,
    /// Zone the item is in.
    pub zone: ZoneId,
    /// Remaining hit points.
    pub hit_points: u32,
    /// Maximum hit points.
    pub max_hit_points: u32,
    /// Crafted quality.
    pub quality: QualityTier,
    /// Current holder.
    pub holder: Holder,
    /// Biocoded owner: only this agent may use the item.
    pub owner_lock: Option<AgentId>,
    /// Persona bond: the item is unique to this agent.
    pub bonded_to: Option<AgentId>,
    /// Item belongs to a quest and must not be wasted.
    pub quest_bound: bool,
    /// Set once the world has destroyed the item.
    pub destroyed: bool,
    /// Item is currently on fire.
    pub burning: bool,
    /// Free-form numeric attributes read by extension scorers
    /// (e.g. `"infusion"`).
    #[serde(default)]
    pub attributes: BTreeMap<String, f32>,
}

impl Item {
    /// A fresh, undamaged, normal-quality item lying on the ground.
    pub fn new(def: ItemDef, zone: ZoneId, position: Position) -> Self {
        Self {
            id: ItemId::new(),
            def,
            position,
            zone,
            hit_points: 100,
            max_hit_points: 100,
            quality: QualityTier::Normal,
            holder: Holder::OnGround,
            owner_lock: None,
            bonded_to: None,
            quest_bound: false,
            destroyed: false,
            burning: false,
            attributes: BTreeMap::new(),
        }
    }

    /// Remaining durability as a fraction in `[0, 1]`.
    pub fn durability_fraction(&self) -> f32 {
        if self.max_hit_points == 0 {
            return 0.0;
        }
        #[allow(clippy::cast_precision_loss)]
        let fraction = self.hit_points as f32 / self.max_hit_points as f32;
        fraction.clamp(0.0, 1.0)
    }

    /// The agent holding this item, if any.
    pub const fn held_by(&self) -> Option<AgentId> {
        match self.holder {
            Holder::HeldBy { agent } => Some(agent),
            _ => None,
        }
    }

    /// Numeric attribute lookup; missing attributes read as `None`.
    pub fn attribute(&self, key: &str) -> Option<f32> {
        self.attributes.get(key).copied()
    }
}

// ---------------------------------------------------------------------------
// Agents
// ---------------------------------------------------------------------------

/// An autonomous actor that can hold one item and a sidearm.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    /// Unique identifier.
    pub id: AgentId,
    /// Current position.
    pub position: Position,
    /// Zone the agent stands in; `None` while in transit between zones.
    pub zone: Option<ZoneId>,
    /// Lifecycle state.
    pub life: LifeState,
    /// Category of being.
    pub category: AgentCategory,
    /// Role or faction standing.
    pub role: AgentRole,
    /// Current group duty.
    pub duty: GroupDuty,
    /// Age in years, used by age gating.
    pub age_years: u32,
    /// Whether the agent can physically handle items.
    pub can_manipulate: bool,
    /// Personality traits.
    pub traits: BTreeSet<AgentTrait>,
    /// Skill level per category (0--20).
    pub skills: BTreeMap<SkillCategory, u32>,
    /// Currently held primary item.
    pub held_item: Option<ItemId>,
    /// Currently carried secondary item.
    pub sidearm: Option<ItemId>,
    /// Work priority tier at or above which the agent's own work
    /// configuration treats a job as low priority (1 = highest priority).
    pub low_priority_threshold: u8,
}

impl Agent {
    /// A spawned, healthy, unarmed adult colonist.
    pub fn new(zone: ZoneId, position: Position) -> Self {
        Self {
            id: AgentId::new(),
            position,
            zone: Some(zone),
            life: LifeState::Alive,
            category: AgentCategory::Sapient,
            role: AgentRole::Colonist,
            duty: GroupDuty::None,
            age_years: 30,
            can_manipulate: true,
            traits: BTreeSet::new(),
            skills: BTreeMap::new(),
            held_item: None,
            sidearm: None,
            low_priority_threshold: 3,
        }
    }

    /// Skill level in `category`, zero when untrained.
    pub fn skill(&self, category: SkillCategory) -> u32 {
        self.skills.get(&category).copied().unwrap_or(0)
    }

    /// Whether the agent has `trait_`.
    pub fn has_trait(&self, trait_: AgentTrait) -> bool {
        self.traits.contains(&trait_)
    }

    /// Whether the agent holds a primary item.
    pub const fn is_armed(&self) -> bool {
        self.held_item.is_some()
    }
}

// ---------------------------------------------------------------------------
// Equipment policy
// ---------------------------------------------------------------------------

/// Allow-list over item kinds constraining what an agent may hold.
///
/// Denials win over allowances; `allow_all` admits every kind that is not
/// explicitly denied.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EquipmentPolicy {
    /// Admit every kind not in `denied`.
    pub allow_all: bool,
    /// Kinds explicitly admitted.
    pub allowed: BTreeSet<ItemKindId>,
    /// Kinds explicitly refused.
    pub denied: BTreeSet<ItemKindId>,
}

impl EquipmentPolicy {
    /// A policy admitting every kind.
    pub const fn allow_all() -> Self {
        Self {
            allow_all: true,
            allowed: BTreeSet::new(),
            denied: BTreeSet::new(),
        }
    }

    /// A policy admitting nothing.
    pub const fn deny_all() -> Self {
        Self {
            allow_all: false,
            allowed: BTreeSet::new(),
            denied: BTreeSet::new(),
        }
    }

    /// A policy admitting exactly `kinds`.
    pub fn only(kinds: impl IntoIterator<Item = ItemKindId>) -> Self {
        Self {
            allow_all: false,
            allowed: kinds.into_iter().collect(),
            denied: BTreeSet::new(),
        }
    }

    /// Whether the policy admits `kind`.
    pub fn allows(&self, kind: ItemKindId) -> bool {
        !self.denied.contains(&kind) && (self.allow_all || self.allowed.contains(&kind))
    }
}
