//! The [`ScoreFactor`] seam and the context every factor reads.
//!
//! A factor is a stateless function over one (agent, item) pair. Factors are
//! registered on a [`ScoringEngine`](crate::engine::ScoringEngine) in order;
//! built-in factors live in [`factors`](crate::factors) and third-party
//! modifiers in [`extensions`](crate::extensions), but both use this same
//! trait.

use std::fmt;

use quartermaster_types::{Agent, EquipmentPolicy, Item};

/// World facts some factors need beyond the agent and item themselves.
///
/// Every method has a neutral default so hosts only implement what their
/// registered factors actually read.
pub trait ScoringEnvironment {
    /// Rounds of `ammo_kind` the agent can get at, or `None` if unknown.
    fn ammo_available(&self, _agent: &Agent, _ammo_kind: &str) -> Option<u32> {
        None
    }
}

/// A [`ScoringEnvironment`] that knows nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoEnvironment;

impl ScoringEnvironment for NoEnvironment {}

/// Everything a factor may look at for one score.
#[derive(Clone, Copy)]
pub struct ScoringContext<'a> {
    /// Agent the item is scored for.
    pub agent: &'a Agent,
    /// Item being scored.
    pub item: &'a Item,
    /// The agent's current equipment policy.
    pub policy: &'a EquipmentPolicy,
    /// Extra world facts.
    pub environment: &'a dyn ScoringEnvironment,
    /// Value a factor returns to disqualify the item outright.
    pub disqualified: f32,
}

impl fmt::Debug for ScoringContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScoringContext")
            .field("agent", &self.agent.id)
            .field("item", &self.item.id)
            .field("disqualified", &self.disqualified)
            .finish_non_exhaustive()
    }
}

/// One independent term of an item's score.
///
/// Implementations must be pure: the same context always yields the same
/// value. Returning a value at or below the engine's disqualification
/// threshold ends scoring for the item.
pub trait ScoreFactor: Send + Sync + fmt::Debug {
    /// Stable name used in breakdowns and logs.
    fn name(&self) -> &'static str;

    /// This factor's contribution for `ctx`.
    fn score(&self, ctx: &ScoringContext<'_>) -> f32;
}

/// Convert a skill level or count to `f32` without precision lints.
pub(crate) fn level(value: u32) -> f32 {
    u16::try_from(value).map_or(f32::from(u16::MAX), f32::from)
}
