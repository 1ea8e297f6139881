//! Extension factors modelling third-party content.
//!
//! These plug into the same [`ScoreFactor`] registry as the built-ins. Hosts
//! without ammunition, infusions, or persona items can leave them registered;
//! they return zero when the data they read is absent.

use crate::config::ScoringConfig;
use crate::factor::{ScoreFactor, ScoringContext};

/// Attribute key read by [`InfusionFactor`].
pub const INFUSION_ATTRIBUTE: &str = "infusion";

/// Penalises ranged items the agent has no ammunition for.
#[derive(Debug, Clone)]
pub struct AmmoAvailabilityFactor {
    penalty: f32,
}

impl AmmoAvailabilityFactor {
    /// Build from config weights.
    pub const fn new(config: &ScoringConfig) -> Self {
        Self {
            penalty: config.ammo_missing_penalty,
        }
    }
}

impl ScoreFactor for AmmoAvailabilityFactor {
    fn name(&self) -> &'static str {
        "ammo_availability"
    }

    fn score(&self, ctx: &ScoringContext<'_>) -> f32 {
        let Some(ammo) = ctx.item.def.ammo_kind.as_deref() else {
            return 0.0;
        };
        match ctx.environment.ammo_available(ctx.agent, ammo) {
            Some(0) => -self.penalty,
            _ => 0.0,
        }
    }
}

/// Bonus proportional to the item's infusion attribute.
#[derive(Debug, Clone)]
pub struct InfusionFactor {
    weight: f32,
}

impl InfusionFactor {
    /// Build from config weights.
    pub const fn new(config: &ScoringConfig) -> Self {
        Self {
            weight: config.infusion_weight,
        }
    }
}

impl ScoreFactor for InfusionFactor {
    fn name(&self) -> &'static str {
        "infusion"
    }

    fn score(&self, ctx: &ScoringContext<'_>) -> f32 {
        ctx.item
            .attribute(INFUSION_ATTRIBUTE)
            .filter(|value| value.is_finite())
            .map_or(0.0, |value| value * self.weight)
    }
}

/// Persona-bond and biocode exclusivity.
///
/// Items bonded or owner-locked to another agent are disqualified; an item
/// bonded to the scoring agent earns a bonus.
#[derive(Debug, Clone)]
pub struct PersonaBondFactor {
    bonded_bonus: f32,
}

impl PersonaBondFactor {
    /// Build from config weights.
    pub const fn new(config: &ScoringConfig) -> Self {
        Self {
            bonded_bonus: config.bonded_bonus,
        }
    }
}

impl ScoreFactor for PersonaBondFactor {
    fn name(&self) -> &'static str {
        "persona_bond"
    }

    fn score(&self, ctx: &ScoringContext<'_>) -> f32 {
        let me = ctx.agent.id;
        if ctx.item.owner_lock.is_some_and(|owner| owner != me) {
            return ctx.disqualified;
        }
        match ctx.item.bonded_to {
            Some(owner) if owner == me => self.bonded_bonus,
            Some(_) => ctx.disqualified,
            None => 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use quartermaster_types::{
        Agent, AgentId, EquipmentPolicy, Item, ItemDef, Position, RangedStats, ZoneId,
    };

    use super::*;
    use crate::factor::{NoEnvironment, ScoringEnvironment};

    struct NoAmmo;

    impl ScoringEnvironment for NoAmmo {
        fn ammo_available(&self, _agent: &Agent, _ammo_kind: &str) -> Option<u32> {
            Some(0)
        }
    }

    fn ctx_score(
        factor: &dyn ScoreFactor,
        agent: &Agent,
        item: &Item,
        environment: &dyn ScoringEnvironment,
    ) -> f32 {
        let policy = EquipmentPolicy::allow_all();
        factor.score(&ScoringContext {
            agent,
            item,
            policy: &policy,
            environment,
            disqualified: -1000.0,
        })
    }

    #[test]
    fn missing_ammo_is_penalised() {
        let zone = ZoneId::new();
        let agent = Agent::new(zone, Position::default());
        let mut def = ItemDef::ranged(
            "musket",
            RangedStats {
                damage: 20.0,
                burst_count: 1,
                warmup_secs: 2.0,
                cooldown_secs: 3.0,
                burst_interval_ticks: 0,
                range: 22.0,
            },
        );
        def.ammo_kind = Some("ball".to_owned());
        let item = Item::new(def, zone, Position::default());
        let factor = AmmoAvailabilityFactor::new(&ScoringConfig::default());

        assert!(ctx_score(&factor, &agent, &item, &NoAmmo) < 0.0);
        assert!(ctx_score(&factor, &agent, &item, &NoEnvironment).abs() < f32::EPSILON);
    }

    #[test]
    fn infusion_adds_bonus() {
        let zone = ZoneId::new();
        let agent = Agent::new(zone, Position::default());
        let mut item = Item::new(ItemDef::melee("blade", 11.0, 1.8), zone, Position::default());
        let factor = InfusionFactor::new(&ScoringConfig::default());
        assert!(ctx_score(&factor, &agent, &item, &NoEnvironment).abs() < f32::EPSILON);
        item.attributes.insert(INFUSION_ATTRIBUTE.to_owned(), 2.0);
        assert!((ctx_score(&factor, &agent, &item, &NoEnvironment) - 20.0).abs() < 1e-4);
    }

    #[test]
    fn foreign_bond_disqualifies() {
        let zone = ZoneId::new();
        let agent = Agent::new(zone, Position::default());
        let mut item = Item::new(ItemDef::melee("blade", 11.0, 1.8), zone, Position::default());
        let factor = PersonaBondFactor::new(&ScoringConfig::default());

        item.bonded_to = Some(AgentId::new());
        assert!(ctx_score(&factor, &agent, &item, &NoEnvironment) <= -1000.0);

        item.bonded_to = Some(agent.id);
        assert!(ctx_score(&factor, &agent, &item, &NoEnvironment) > 0.0);

        item.owner_lock = Some(AgentId::new());
        assert!(ctx_score(&factor, &agent, &item, &NoEnvironment) <= -1000.0);
    }
}
