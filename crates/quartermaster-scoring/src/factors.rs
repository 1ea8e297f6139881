//! Built-in scoring factors.
//!
//! Each factor reads one aspect of the (agent, item) pair. Weights come from
//! [`ScoringConfig`] at construction; none of them keep mutable state.

use quartermaster_types::{AgentRole, AgentTrait, ItemClass, MeleeStats, RangedStats};

use crate::config::ScoringConfig;
use crate::factor::{ScoreFactor, ScoringContext, level};

/// Host ticks per second, used to convert burst intervals.
pub const TICKS_PER_SECOND: f32 = 60.0;

/// Sustained ranged damage per second.
///
/// One cycle is the warmup, every inter-shot delay of the burst, and the
/// steady-state cooldown; the cycle delivers `damage * burst_count`.
/// Degenerate statistics yield zero.
pub fn ranged_throughput(stats: &RangedStats) -> f32 {
    let shots = level(stats.burst_count.max(1));
    let gaps = level(stats.burst_count.saturating_sub(1));
    let burst_secs = gaps * level(stats.burst_interval_ticks) / TICKS_PER_SECOND;
    let cycle = stats.warmup_secs + stats.cooldown_secs + burst_secs;
    let dps = stats.damage * shots / cycle;
    if cycle > 0.0 && dps.is_finite() && dps > 0.0 { dps } else { 0.0 }
}

/// Melee damage per second.
pub fn melee_throughput(stats: &MeleeStats) -> f32 {
    let dps = stats.damage / stats.cooldown_secs;
    if stats.cooldown_secs > 0.0 && dps.is_finite() && dps > 0.0 { dps } else { 0.0 }
}

/// Zero when the agent's equipment policy allows the item, else disqualifying.
#[derive(Debug, Clone, Copy, Default)]
pub struct PolicyFactor;

impl ScoreFactor for PolicyFactor {
    fn name(&self) -> &'static str {
        "policy"
    }

    fn score(&self, ctx: &ScoringContext<'_>) -> f32 {
        if ctx.policy.allows(ctx.item.def.kind) {
            0.0
        } else {
            ctx.disqualified
        }
    }
}

/// Trait and role preferences versus item class.
///
/// Brawlers refuse ranged items outright and favour melee. Hunters favour
/// ranged items. Trigger-happy agents like multi-shot guns; careful shooters
/// like guns that reach at least the ideal range.
#[derive(Debug, Clone)]
pub struct TraitRoleFactor {
    brawler_melee_bonus: f32,
    hunter_ranged_bonus: f32,
    trigger_happy_bonus: f32,
    careful_shooter_bonus: f32,
    ideal_range: f32,
}

impl TraitRoleFactor {
    /// Build from config weights.
    pub const fn new(config: &ScoringConfig) -> Self {
        Self {
            brawler_melee_bonus: config.brawler_melee_bonus,
            hunter_ranged_bonus: config.hunter_ranged_bonus,
            trigger_happy_bonus: config.trigger_happy_bonus,
            careful_shooter_bonus: config.careful_shooter_bonus,
            ideal_range: config.ideal_range,
        }
    }
}

impl ScoreFactor for TraitRoleFactor {
    fn name(&self) -> &'static str {
        "trait_role"
    }

    fn score(&self, ctx: &ScoringContext<'_>) -> f32 {
        let agent = ctx.agent;
        match ctx.item.def.class {
            ItemClass::Melee => {
                if agent.has_trait(AgentTrait::Brawler) {
                    self.brawler_melee_bonus
                } else {
                    0.0
                }
            }
            ItemClass::Ranged => {
                if agent.has_trait(AgentTrait::Brawler) {
                    return ctx.disqualified;
                }
                let mut bonus = 0.0;
                if agent.role == AgentRole::Hunter {
                    bonus += self.hunter_ranged_bonus;
                }
                if let Some(stats) = &ctx.item.def.ranged {
                    if agent.has_trait(AgentTrait::TriggerHappy) && stats.burst_count > 1 {
                        bonus += self.trigger_happy_bonus;
                    }
                    if agent.has_trait(AgentTrait::CarefulShooter) && stats.range >= self.ideal_range
                    {
                        bonus += self.careful_shooter_bonus;
                    }
                }
                bonus
            }
        }
    }
}

/// Skill in the item's class, plus the gap to the other class's skill.
///
/// The gap term is multiplied when it is negative, so an agent trained in
/// the other class is pushed away harder than a matching agent is pulled in.
#[derive(Debug, Clone)]
pub struct SkillMatchFactor {
    skill_weight: f32,
    gap_weight: f32,
    mismatch_multiplier: f32,
}

impl SkillMatchFactor {
    /// Build from config weights.
    pub const fn new(config: &ScoringConfig) -> Self {
        Self {
            skill_weight: config.skill_weight,
            gap_weight: config.skill_gap_weight,
            mismatch_multiplier: config.skill_mismatch_multiplier,
        }
    }
}

impl ScoreFactor for SkillMatchFactor {
    fn name(&self) -> &'static str {
        "skill_match"
    }

    fn score(&self, ctx: &ScoringContext<'_>) -> f32 {
        let class = ctx.item.def.class;
        let matching = level(ctx.agent.skill(class.skill()));
        let other = level(ctx.agent.skill(class.opposite().skill()));
        let gap = matching - other;
        let gap_term = if gap < 0.0 {
            gap * self.gap_weight * self.mismatch_multiplier
        } else {
            gap * self.gap_weight
        };
        matching.mul_add(self.skill_weight, gap_term)
    }
}

/// Monotonic in quality tier.
#[derive(Debug, Clone)]
pub struct QualityFactor {
    weight: f32,
}

impl QualityFactor {
    /// Build from config weights.
    pub const fn new(config: &ScoringConfig) -> Self {
        Self {
            weight: config.quality_weight,
        }
    }
}

impl ScoreFactor for QualityFactor {
    fn name(&self) -> &'static str {
        "quality"
    }

    fn score(&self, ctx: &ScoringContext<'_>) -> f32 {
        f32::from(ctx.item.quality.rank()) * self.weight
    }
}

/// Monotonic in remaining durability fraction.
#[derive(Debug, Clone)]
pub struct ConditionFactor {
    weight: f32,
}

impl ConditionFactor {
    /// Build from config weights.
    pub const fn new(config: &ScoringConfig) -> Self {
        Self {
            weight: config.condition_weight,
        }
    }
}

impl ScoreFactor for ConditionFactor {
    fn name(&self) -> &'static str {
        "condition"
    }

    fn score(&self, ctx: &ScoringContext<'_>) -> f32 {
        ctx.item.durability_fraction() * self.weight
    }
}

/// Damage throughput of the item's own class.
#[derive(Debug, Clone)]
pub struct ThroughputFactor {
    ranged_weight: f32,
    melee_weight: f32,
}

impl ThroughputFactor {
    /// Build from config weights.
    pub const fn new(config: &ScoringConfig) -> Self {
        Self {
            ranged_weight: config.ranged_throughput_weight,
            melee_weight: config.melee_throughput_weight,
        }
    }
}

impl ScoreFactor for ThroughputFactor {
    fn name(&self) -> &'static str {
        "throughput"
    }

    fn score(&self, ctx: &ScoringContext<'_>) -> f32 {
        let def = &ctx.item.def;
        match def.class {
            ItemClass::Ranged => def
                .ranged
                .as_ref()
                .map_or(0.0, |stats| ranged_throughput(stats) * self.ranged_weight),
            ItemClass::Melee => def
                .melee
                .as_ref()
                .map_or(0.0, |stats| melee_throughput(stats) * self.melee_weight),
        }
    }
}

/// Preference for ranged items near the ideal engagement range.
///
/// Below the ideal the value tapers as `(range / ideal)^exponent`; above it
/// the value decays toward `overshoot_floor` of the peak and never below.
#[derive(Debug, Clone)]
pub struct RangePreferenceFactor {
    ideal: f32,
    weight: f32,
    exponent: f32,
    overshoot_floor: f32,
}

impl RangePreferenceFactor {
    /// Build from config weights.
    pub const fn new(config: &ScoringConfig) -> Self {
        Self {
            ideal: config.ideal_range,
            weight: config.range_weight,
            exponent: config.range_falloff_exponent,
            overshoot_floor: config.range_overshoot_floor,
        }
    }

    /// Factor value for a weapon reaching `range`.
    pub fn value_at(&self, range: f32) -> f32 {
        if !range.is_finite() || range <= 0.0 {
            return 0.0;
        }
        let shape = if range <= self.ideal {
            (range / self.ideal).powf(self.exponent)
        } else {
            (1.0 - self.overshoot_floor).mul_add(self.ideal / range, self.overshoot_floor)
        };
        shape * self.weight
    }
}

impl ScoreFactor for RangePreferenceFactor {
    fn name(&self) -> &'static str {
        "range_preference"
    }

    fn score(&self, ctx: &ScoringContext<'_>) -> f32 {
        match (&ctx.item.def.class, &ctx.item.def.ranged) {
            (ItemClass::Ranged, Some(stats)) => self.value_at(stats.range),
            _ => 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use quartermaster_types::{
        Agent, EquipmentPolicy, Item, ItemDef, Position, QualityTier, SkillCategory, ZoneId,
    };

    use super::*;
    use crate::factor::NoEnvironment;

    fn rifle(range: f32, burst: u32) -> ItemDef {
        ItemDef::ranged(
            "rifle",
            RangedStats {
                damage: 18.0,
                burst_count: burst,
                warmup_secs: 1.0,
                cooldown_secs: 1.5,
                burst_interval_ticks: 6,
                range,
            },
        )
    }

    fn score_with(factor: &dyn ScoreFactor, agent: &Agent, item: &Item) -> f32 {
        let policy = EquipmentPolicy::allow_all();
        factor.score(&ScoringContext {
            agent,
            item,
            policy: &policy,
            environment: &NoEnvironment,
            disqualified: -1000.0,
        })
    }

    #[test]
    fn ranged_throughput_includes_burst_gaps() {
        let stats = RangedStats {
            damage: 10.0,
            burst_count: 3,
            warmup_secs: 1.0,
            cooldown_secs: 1.0,
            burst_interval_ticks: 30,
            range: 30.0,
        };
        // 30 damage over 1 + 1 + 2 * 0.5 seconds.
        assert!((ranged_throughput(&stats) - 10.0).abs() < 1e-4);
    }

    #[test]
    fn degenerate_stats_have_no_throughput() {
        let stats = RangedStats {
            damage: 10.0,
            burst_count: 0,
            warmup_secs: 0.0,
            cooldown_secs: 0.0,
            burst_interval_ticks: 0,
            range: 30.0,
        };
        assert!(ranged_throughput(&stats).abs() < f32::EPSILON);
        let melee = MeleeStats {
            damage: 5.0,
            cooldown_secs: 0.0,
        };
        assert!(melee_throughput(&melee).abs() < f32::EPSILON);
    }

    #[test]
    fn policy_denial_disqualifies() {
        let zone = ZoneId::new();
        let agent = Agent::new(zone, Position::default());
        let item = Item::new(ItemDef::melee("knife", 8.0, 1.2), zone, Position::default());
        let policy = EquipmentPolicy::deny_all();
        let value = PolicyFactor.score(&ScoringContext {
            agent: &agent,
            item: &item,
            policy: &policy,
            environment: &NoEnvironment,
            disqualified: -1000.0,
        });
        assert!((value - -1000.0).abs() < f32::EPSILON);
    }

    #[test]
    fn brawler_refuses_ranged_and_favours_melee() {
        let zone = ZoneId::new();
        let mut agent = Agent::new(zone, Position::default());
        agent.traits.insert(AgentTrait::Brawler);
        let factor = TraitRoleFactor::new(&ScoringConfig::default());

        let gun = Item::new(rifle(30.0, 1), zone, Position::default());
        assert!(score_with(&factor, &agent, &gun) <= -1000.0);

        let sword = Item::new(ItemDef::melee("sword", 16.0, 2.0), zone, Position::default());
        assert!(score_with(&factor, &agent, &sword) > 0.0);
    }

    #[test]
    fn mismatched_skill_is_penalised_harder() {
        let zone = ZoneId::new();
        let factor = SkillMatchFactor::new(&ScoringConfig::default());
        let gun = Item::new(rifle(30.0, 1), zone, Position::default());

        let mut shooter = Agent::new(zone, Position::default());
        shooter.skills.insert(SkillCategory::Shooting, 10);
        let mut fighter = Agent::new(zone, Position::default());
        fighter.skills.insert(SkillCategory::Melee, 10);

        let pull = score_with(&factor, &shooter, &gun);
        let push = score_with(&factor, &fighter, &gun);
        assert!(pull > 0.0);
        assert!(push < 0.0);
        assert!(push.abs() > 10.0 * 1.5);
    }

    #[test]
    fn quality_is_monotonic() {
        let zone = ZoneId::new();
        let agent = Agent::new(zone, Position::default());
        let factor = QualityFactor::new(&ScoringConfig::default());
        let mut item = Item::new(ItemDef::melee("axe", 14.0, 2.2), zone, Position::default());
        let mut last = f32::NEG_INFINITY;
        for tier in QualityTier::ALL {
            item.quality = tier;
            let value = score_with(&factor, &agent, &item);
            assert!(value >= last);
            last = value;
        }
    }

    #[test]
    fn range_peaks_at_ideal_and_flattens_above() {
        let factor = RangePreferenceFactor::new(&ScoringConfig::default());
        let peak = factor.value_at(25.0);
        assert!(factor.value_at(10.0) < peak);
        assert!(factor.value_at(40.0) < peak);
        assert!(factor.value_at(1000.0) >= 0.75 * peak - 1e-3);
        assert!(factor.value_at(10.0) < factor.value_at(20.0));
        assert!(factor.value_at(0.0).abs() < f32::EPSILON);
    }

    #[test]
    fn careful_shooter_likes_long_guns() {
        let zone = ZoneId::new();
        let mut agent = Agent::new(zone, Position::default());
        agent.traits.insert(AgentTrait::CarefulShooter);
        let factor = TraitRoleFactor::new(&ScoringConfig::default());
        let long = Item::new(rifle(40.0, 1), zone, Position::default());
        let short = Item::new(rifle(12.0, 1), zone, Position::default());
        assert!(score_with(&factor, &agent, &long) > score_with(&factor, &agent, &short));
    }
}
