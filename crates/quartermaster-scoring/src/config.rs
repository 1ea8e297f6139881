//! Tunables for scoring factors and eligibility gating.
//!
//! Both structs deserialize from sections of the engine's YAML config with
//! every field defaulted, so an empty section yields the stock tuning.

use std::collections::BTreeSet;

use quartermaster_types::{AgentCategory, AgentRole, GroupDuty};
use serde::Deserialize;

use crate::error::ScoringError;

/// Weights and constants for the built-in scoring factors.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ScoringConfig {
    /// Scores at or below this value disqualify an item outright.
    #[serde(default = "default_disqualify_threshold")]
    pub disqualify_threshold: f32,

    /// Fixed score of a pinned item; never judged replaceable.
    #[serde(default = "default_pinned_score")]
    pub pinned_score: f32,

    /// Bonus for a melee item held by a brawler.
    #[serde(default = "default_brawler_melee_bonus")]
    pub brawler_melee_bonus: f32,

    /// Bonus for a ranged item held by a hunter.
    #[serde(default = "default_hunter_ranged_bonus")]
    pub hunter_ranged_bonus: f32,

    /// Bonus for multi-shot ranged items held by a trigger-happy agent.
    #[serde(default = "default_trigger_happy_bonus")]
    pub trigger_happy_bonus: f32,

    /// Bonus for long-range items held by a careful shooter.
    #[serde(default = "default_careful_shooter_bonus")]
    pub careful_shooter_bonus: f32,

    /// Points per level of the skill matching the item's class.
    #[serde(default = "default_skill_weight")]
    pub skill_weight: f32,

    /// Points per level of difference between matching and other skill.
    #[serde(default = "default_skill_gap_weight")]
    pub skill_gap_weight: f32,

    /// Multiplier on the gap term when the agent's skills favour the other class.
    #[serde(default = "default_skill_mismatch_multiplier")]
    pub skill_mismatch_multiplier: f32,

    /// Points per quality tier rank.
    #[serde(default = "default_quality_weight")]
    pub quality_weight: f32,

    /// Points at full durability.
    #[serde(default = "default_condition_weight")]
    pub condition_weight: f32,

    /// Points per unit of ranged damage throughput.
    #[serde(default = "default_ranged_throughput_weight")]
    pub ranged_throughput_weight: f32,

    /// Points per unit of melee damage throughput.
    #[serde(default = "default_melee_throughput_weight")]
    pub melee_throughput_weight: f32,

    /// Engagement range, in world units, the range factor peaks at.
    #[serde(default = "default_ideal_range")]
    pub ideal_range: f32,

    /// Peak value of the range factor.
    #[serde(default = "default_range_weight")]
    pub range_weight: f32,

    /// Exponent of the taper below the ideal range.
    #[serde(default = "default_range_falloff_exponent")]
    pub range_falloff_exponent: f32,

    /// Fraction of the peak the range factor flattens toward above ideal.
    #[serde(default = "default_range_overshoot_floor")]
    pub range_overshoot_floor: f32,

    /// Penalty when the agent has no ammunition for the item.
    #[serde(default = "default_ammo_missing_penalty")]
    pub ammo_missing_penalty: f32,

    /// Points per unit of the item's `infusion` attribute.
    #[serde(default = "default_infusion_weight")]
    pub infusion_weight: f32,

    /// Bonus for an item persona-bonded to the scoring agent.
    #[serde(default = "default_bonded_bonus")]
    pub bonded_bonus: f32,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            disqualify_threshold: default_disqualify_threshold(),
            pinned_score: default_pinned_score(),
            brawler_melee_bonus: default_brawler_melee_bonus(),
            hunter_ranged_bonus: default_hunter_ranged_bonus(),
            trigger_happy_bonus: default_trigger_happy_bonus(),
            careful_shooter_bonus: default_careful_shooter_bonus(),
            skill_weight: default_skill_weight(),
            skill_gap_weight: default_skill_gap_weight(),
            skill_mismatch_multiplier: default_skill_mismatch_multiplier(),
            quality_weight: default_quality_weight(),
            condition_weight: default_condition_weight(),
            ranged_throughput_weight: default_ranged_throughput_weight(),
            melee_throughput_weight: default_melee_throughput_weight(),
            ideal_range: default_ideal_range(),
            range_weight: default_range_weight(),
            range_falloff_exponent: default_range_falloff_exponent(),
            range_overshoot_floor: default_range_overshoot_floor(),
            ammo_missing_penalty: default_ammo_missing_penalty(),
            infusion_weight: default_infusion_weight(),
            bonded_bonus: default_bonded_bonus(),
        }
    }
}

impl ScoringConfig {
    /// Check that every value is usable.
    ///
    /// # Errors
    ///
    /// Returns [`ScoringError::InvalidConfig`] when the sentinels overlap,
    /// a weight is not finite, or the range shape is degenerate.
    pub fn validate(&self) -> Result<(), ScoringError> {
        if self.disqualify_threshold.is_nan() || self.disqualify_threshold >= 0.0 {
            return Err(invalid(format!(
                "disqualify_threshold must be negative, got {}",
                self.disqualify_threshold
            )));
        }
        if self.pinned_score.is_nan() || self.pinned_score <= 0.0 {
            return Err(invalid(format!(
                "pinned_score must be positive, got {}",
                self.pinned_score
            )));
        }
        if !self.ideal_range.is_finite() || self.ideal_range <= 0.0 {
            return Err(invalid(format!(
                "ideal_range must be positive, got {}",
                self.ideal_range
            )));
        }
        if !(0.0..=1.0).contains(&self.range_overshoot_floor) {
            return Err(invalid(format!(
                "range_overshoot_floor must be within [0, 1], got {}",
                self.range_overshoot_floor
            )));
        }
        let weights = [
            self.brawler_melee_bonus,
            self.hunter_ranged_bonus,
            self.trigger_happy_bonus,
            self.careful_shooter_bonus,
            self.skill_weight,
            self.skill_gap_weight,
            self.skill_mismatch_multiplier,
            self.quality_weight,
            self.condition_weight,
            self.ranged_throughput_weight,
            self.melee_throughput_weight,
            self.range_weight,
            self.range_falloff_exponent,
            self.ammo_missing_penalty,
            self.infusion_weight,
            self.bonded_bonus,
        ];
        if weights.iter().any(|w| !w.is_finite()) {
            return Err(invalid("scoring weights must be finite".to_owned()));
        }
        if self.quality_weight < 0.0 || self.condition_weight < 0.0 {
            return Err(invalid(
                "quality_weight and condition_weight must not be negative".to_owned(),
            ));
        }
        Ok(())
    }
}

/// Agent-side gating rules for the eligibility filter.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EligibilityConfig {
    /// Categories of being allowed to auto-equip.
    #[serde(default = "default_eligible_categories")]
    pub eligible_categories: BTreeSet<AgentCategory>,

    /// Roles allowed to auto-equip.
    #[serde(default = "default_eligible_roles")]
    pub eligible_roles: BTreeSet<AgentRole>,

    /// Group duties that do not block auto-equip.
    #[serde(default = "default_allowed_duties")]
    pub allowed_duties: BTreeSet<GroupDuty>,

    /// Minimum age in years.
    #[serde(default = "default_min_age_years")]
    pub min_age_years: u32,

    /// Roles left alone once armed ("already equipped, do not disturb").
    #[serde(default)]
    pub exempt_when_armed: BTreeSet<AgentRole>,
}

impl Default for EligibilityConfig {
    fn default() -> Self {
        Self {
            eligible_categories: default_eligible_categories(),
            eligible_roles: default_eligible_roles(),
            allowed_duties: default_allowed_duties(),
            min_age_years: default_min_age_years(),
            exempt_when_armed: BTreeSet::new(),
        }
    }
}

impl EligibilityConfig {
    /// Check that the gating rules can admit anyone at all.
    ///
    /// # Errors
    ///
    /// Returns [`ScoringError::InvalidConfig`] if no category or no role is
    /// eligible.
    pub fn validate(&self) -> Result<(), ScoringError> {
        if self.eligible_categories.is_empty() {
            return Err(invalid("eligible_categories must not be empty".to_owned()));
        }
        if self.eligible_roles.is_empty() {
            return Err(invalid("eligible_roles must not be empty".to_owned()));
        }
        Ok(())
    }
}

fn invalid(reason: String) -> ScoringError {
    ScoringError::InvalidConfig { reason }
}

const fn default_disqualify_threshold() -> f32 {
    -1000.0
}

const fn default_pinned_score() -> f32 {
    10_000.0
}

const fn default_brawler_melee_bonus() -> f32 {
    60.0
}

const fn default_hunter_ranged_bonus() -> f32 {
    25.0
}

const fn default_trigger_happy_bonus() -> f32 {
    8.0
}

const fn default_careful_shooter_bonus() -> f32 {
    10.0
}

const fn default_skill_weight() -> f32 {
    2.0
}

const fn default_skill_gap_weight() -> f32 {
    1.5
}

const fn default_skill_mismatch_multiplier() -> f32 {
    2.0
}

const fn default_quality_weight() -> f32 {
    6.0
}

const fn default_condition_weight() -> f32 {
    20.0
}

const fn default_ranged_throughput_weight() -> f32 {
    2.5
}

const fn default_melee_throughput_weight() -> f32 {
    2.5
}

const fn default_ideal_range() -> f32 {
    25.0
}

const fn default_range_weight() -> f32 {
    15.0
}

const fn default_range_falloff_exponent() -> f32 {
    1.5
}

const fn default_range_overshoot_floor() -> f32 {
    0.75
}

const fn default_ammo_missing_penalty() -> f32 {
    40.0
}

const fn default_infusion_weight() -> f32 {
    10.0
}

const fn default_bonded_bonus() -> f32 {
    30.0
}

fn default_eligible_categories() -> BTreeSet<AgentCategory> {
    BTreeSet::from([AgentCategory::Sapient])
}

fn default_eligible_roles() -> BTreeSet<AgentRole> {
    BTreeSet::from([AgentRole::Colonist, AgentRole::Guard, AgentRole::Hunter])
}

fn default_allowed_duties() -> BTreeSet<GroupDuty> {
    BTreeSet::from([GroupDuty::None, GroupDuty::Defend])
}

const fn default_min_age_years() -> u32 {
    13
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(ScoringConfig::default().validate().is_ok());
        assert!(EligibilityConfig::default().validate().is_ok());
    }

    #[test]
    fn empty_sections_use_defaults() {
        let scoring: ScoringConfig = serde_yml::from_str("{}").unwrap();
        assert_eq!(scoring, ScoringConfig::default());
        let eligibility: EligibilityConfig = serde_yml::from_str("{}").unwrap();
        assert_eq!(eligibility, EligibilityConfig::default());
    }

    #[test]
    fn partial_override_keeps_other_defaults() {
        let yaml = "ideal_range: 40.0\nexempt_when_armed: [guard]\n";
        let scoring: ScoringConfig = serde_yml::from_str(yaml).unwrap();
        assert!((scoring.ideal_range - 40.0).abs() < f32::EPSILON);
        assert!((scoring.quality_weight - 6.0).abs() < f32::EPSILON);

        let eligibility: EligibilityConfig = serde_yml::from_str(yaml).unwrap();
        assert!(eligibility.exempt_when_armed.contains(&AgentRole::Guard));
    }

    #[test]
    fn rejects_positive_disqualify_threshold() {
        let config = ScoringConfig {
            disqualify_threshold: 5.0,
            ..ScoringConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_empty_roles() {
        let config = EligibilityConfig {
            eligible_roles: BTreeSet::new(),
            ..EligibilityConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
