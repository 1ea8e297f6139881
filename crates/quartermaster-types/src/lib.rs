//! Shared type definitions for the Quartermaster equipment-upgrade engine.
//!
//! This crate is the single source of truth for the data model used across
//! the workspace. It holds no logic beyond small accessors.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe UUID wrappers for agents, items, zones, and kinds
//! - [`enums`] -- Quality tiers, item classes, agent flags, activity classes
//! - [`structs`] -- [`Item`], [`ItemDef`], [`Agent`], [`EquipmentPolicy`]
//! - [`tasks`] -- [`ActivityDescriptor`] and [`EquipTask`]

pub mod enums;
pub mod ids;
pub mod structs;
pub mod tasks;

// Re-export all public types at crate root for convenience.
pub use enums::{
    ActivityClass, AgentCategory, AgentRole, AgentTrait, EquipSlot, GroupDuty, ItemClass,
    LifeState, PriorityMode, QualityTier, SkillCategory,
};
pub use ids::{AgentId, ItemId, ItemKindId, ZoneId};
pub use structs::{
    Agent, EquipmentPolicy, Holder, Item, ItemDef, MeleeStats, Position, RangedStats,
};
pub use tasks::{ActivityDescriptor, EquipTask, TaskKind};
