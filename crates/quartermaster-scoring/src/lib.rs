//! Item scoring and candidate eligibility for the Quartermaster engine.
//!
//! Scoring turns an (agent, item) pair into one comparable number built from
//! independent factors. Eligibility decides whether the pair may be
//! considered at all. Both accept host-supplied extensions registered at
//! startup.
//!
//! # Modules
//!
//! - [`config`] -- [`ScoringConfig`] factor weights and [`EligibilityConfig`]
//!   agent gating rules.
//! - [`error`] -- Configuration validation errors.
//! - [`factor`] -- The [`ScoreFactor`] trait, [`ScoringContext`], and the
//!   [`ScoringEnvironment`] seam.
//! - [`engine`] -- [`ScoringEngine`]: ordered factor registry with early-exit
//!   disqualification and per-factor breakdowns.
//! - [`factors`] -- Built-in factors: policy, trait/role, skill match,
//!   quality, condition, throughput, range preference.
//! - [`extensions`] -- Ammunition, infusion, and persona-bond factors.
//! - [`eligibility`] -- [`EligibilityFilter`] item and agent checks with
//!   typed rejection reasons; doubles as the index admission predicate.

pub mod config;
pub mod eligibility;
pub mod engine;
pub mod error;
pub mod extensions;
pub mod factor;
pub mod factors;

// Re-export primary types at crate root.
pub use config::{EligibilityConfig, ScoringConfig};
pub use eligibility::{
    AgentPredicate, AgentRejection, EligibilityFilter, EligibilityWorld, ItemPredicate,
    ItemRejection, OpenWorld,
};
pub use engine::{FactorScore, ScoreBreakdown, ScoringEngine};
pub use error::ScoringError;
pub use extensions::{AmmoAvailabilityFactor, InfusionFactor, PersonaBondFactor};
pub use factor::{NoEnvironment, ScoreFactor, ScoringContext, ScoringEnvironment};
pub use factors::{
    ConditionFactor, PolicyFactor, QualityFactor, RangePreferenceFactor, SkillMatchFactor,
    ThroughputFactor, TraitRoleFactor, melee_throughput, ranged_throughput,
};
