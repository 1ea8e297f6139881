//! The scoring engine: an ordered registry of factors summed with an
//! early-exit disqualification.

use quartermaster_types::{Agent, EquipmentPolicy, Item};
use serde::Serialize;
use tracing::trace;

use crate::config::ScoringConfig;
use crate::error::ScoringError;
use crate::extensions::{AmmoAvailabilityFactor, InfusionFactor, PersonaBondFactor};
use crate::factor::{ScoreFactor, ScoringContext, ScoringEnvironment};
use crate::factors::{
    ConditionFactor, PolicyFactor, QualityFactor, RangePreferenceFactor, SkillMatchFactor,
    ThroughputFactor, TraitRoleFactor,
};

/// One factor's contribution in a [`ScoreBreakdown`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FactorScore {
    /// Factor name.
    pub name: &'static str,
    /// Value it returned.
    pub value: f32,
}

/// Per-factor detail of one score, for diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreBreakdown {
    /// Final score.
    pub total: f32,
    /// Factors evaluated, in order. Stops at the disqualifying factor.
    pub factors: Vec<FactorScore>,
    /// Name of the factor that disqualified the item, if any.
    pub disqualified_by: Option<&'static str>,
}

/// Ordered registry of [`ScoreFactor`]s.
#[derive(Debug)]
pub struct ScoringEngine {
    factors: Vec<Box<dyn ScoreFactor>>,
    disqualify_threshold: f32,
    pinned_score: f32,
}

impl ScoringEngine {
    /// An engine with no factors. Every item scores zero.
    pub fn empty(disqualify_threshold: f32, pinned_score: f32) -> Self {
        Self {
            factors: Vec::new(),
            disqualify_threshold,
            pinned_score,
        }
    }

    /// The stock factor set, tuned by `config`.
    ///
    /// Registration order puts the cheap disqualifying factors first so
    /// most rejected items exit before the combat math runs.
    ///
    /// # Errors
    ///
    /// Returns [`ScoringError::InvalidConfig`] if `config` fails validation.
    pub fn standard(config: &ScoringConfig) -> Result<Self, ScoringError> {
        config.validate()?;
        let engine = Self::empty(config.disqualify_threshold, config.pinned_score)
            .with_factor(PolicyFactor)
            .with_factor(PersonaBondFactor::new(config))
            .with_factor(TraitRoleFactor::new(config))
            .with_factor(SkillMatchFactor::new(config))
            .with_factor(QualityFactor::new(config))
            .with_factor(ConditionFactor::new(config))
            .with_factor(ThroughputFactor::new(config))
            .with_factor(RangePreferenceFactor::new(config))
            .with_factor(AmmoAvailabilityFactor::new(config))
            .with_factor(InfusionFactor::new(config));
        Ok(engine)
    }

    /// Append a factor (builder style).
    #[must_use]
    pub fn with_factor(mut self, factor: impl ScoreFactor + 'static) -> Self {
        self.register(Box::new(factor));
        self
    }

    /// Append a factor.
    pub fn register(&mut self, factor: Box<dyn ScoreFactor>) {
        self.factors.push(factor);
    }

    /// Remove every factor named `name`. Returns how many were removed.
    pub fn unregister(&mut self, name: &str) -> usize {
        let before = self.factors.len();
        self.factors.retain(|factor| factor.name() != name);
        before.saturating_sub(self.factors.len())
    }

    /// Registered factor names, in order.
    pub fn factor_names(&self) -> Vec<&'static str> {
        self.factors.iter().map(|factor| factor.name()).collect()
    }

    /// Scores at or below this value are disqualified.
    pub const fn disqualify_threshold(&self) -> f32 {
        self.disqualify_threshold
    }

    /// Fixed score of a pinned item.
    pub const fn pinned_score(&self) -> f32 {
        self.pinned_score
    }

    /// Whether `score` disqualifies the item.
    pub fn is_disqualified(&self, score: f32) -> bool {
        score.is_nan() || score <= self.disqualify_threshold
    }

    /// Score `item` for `agent`.
    ///
    /// The sum of every factor in registration order; the first factor
    /// returning a value at or below the disqualification threshold ends the
    /// sum and its value becomes the score.
    pub fn score(
        &self,
        agent: &Agent,
        item: &Item,
        policy: &EquipmentPolicy,
        environment: &dyn ScoringEnvironment,
    ) -> f32 {
        let ctx = self.context(agent, item, policy, environment);
        let mut total = 0.0_f32;
        for factor in &self.factors {
            let value = factor.score(&ctx);
            if self.is_disqualified(value) {
                trace!(
                    agent_id = %agent.id,
                    item_id = %item.id,
                    factor = factor.name(),
                    "Item disqualified"
                );
                return self.sentinel_or(value);
            }
            total += value;
        }
        total
    }

    /// Like [`score`](Self::score) but keeps every factor's contribution.
    pub fn breakdown(
        &self,
        agent: &Agent,
        item: &Item,
        policy: &EquipmentPolicy,
        environment: &dyn ScoringEnvironment,
    ) -> ScoreBreakdown {
        let ctx = self.context(agent, item, policy, environment);
        let mut breakdown = ScoreBreakdown {
            total: 0.0,
            factors: Vec::with_capacity(self.factors.len()),
            disqualified_by: None,
        };
        for factor in &self.factors {
            let value = factor.score(&ctx);
            breakdown.factors.push(FactorScore {
                name: factor.name(),
                value,
            });
            if self.is_disqualified(value) {
                breakdown.total = self.sentinel_or(value);
                breakdown.disqualified_by = Some(factor.name());
                return breakdown;
            }
            breakdown.total += value;
        }
        breakdown
    }

    /// A disqualifying value is the score, except NaN, which maps to the threshold.
    const fn sentinel_or(&self, value: f32) -> f32 {
        if value.is_nan() { self.disqualify_threshold } else { value }
    }

    fn context<'a>(
        &self,
        agent: &'a Agent,
        item: &'a Item,
        policy: &'a EquipmentPolicy,
        environment: &'a dyn ScoringEnvironment,
    ) -> ScoringContext<'a> {
        ScoringContext {
            agent,
            item,
            policy,
            environment,
            disqualified: self.disqualify_threshold,
        }
    }
}
