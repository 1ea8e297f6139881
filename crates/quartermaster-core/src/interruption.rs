//! Activity classification and the interrupt decision.
//!
//! Every activity maps to one of three classes. Critical work is never
//! interrupted by an automatic upgrade, safe activities always are, and
//! ordinary work is interrupted only when the upgrade justifies it.

use std::fmt;

use quartermaster_types::{ActivityClass, ActivityDescriptor, Agent};
use tracing::trace;

use crate::config::InterruptionConfig;

/// Host-supplied classification for activity kinds the table cannot
/// anticipate (third-party content).
pub trait ClassificationOverride: Send + Sync + fmt::Debug {
    /// Class for `activity`, or `None` to defer to the next rule.
    fn classify(&self, activity: &ActivityDescriptor) -> Option<ActivityClass>;
}

/// Resolves an [`ActivityDescriptor`] to an [`ActivityClass`].
///
/// Resolution order: registered overrides (first `Some` wins), the
/// descriptor's own hint, the configured table, then the default class.
/// Engine-issued equip/drop tasks are always critical.
#[derive(Debug)]
pub struct ActivityClassifier {
    config: InterruptionConfig,
    overrides: Vec<Box<dyn ClassificationOverride>>,
}

impl ActivityClassifier {
    /// A classifier over `config`'s table.
    pub const fn new(config: InterruptionConfig) -> Self {
        Self {
            config,
            overrides: Vec::new(),
        }
    }

    /// Append an override; earlier overrides take precedence.
    pub fn register_override(&mut self, classifier: Box<dyn ClassificationOverride>) {
        self.overrides.push(classifier);
    }

    /// Classify `activity`.
    pub fn classify(&self, activity: &ActivityDescriptor) -> ActivityClass {
        if activity.engine_task {
            return ActivityClass::Critical;
        }
        if let Some(class) = self
            .overrides
            .iter()
            .find_map(|classifier| classifier.classify(activity))
        {
            return class;
        }
        activity
            .class_hint
            .or_else(|| self.config.activity_classes.get(&activity.kind).copied())
            .unwrap_or(self.config.default_class)
    }
}

/// Decides whether an upgrade may interrupt what an agent is doing.
#[derive(Debug)]
pub struct InterruptionPolicy {
    classifier: ActivityClassifier,
    major_upgrade_margin: f32,
}

impl InterruptionPolicy {
    /// Build from config.
    pub fn new(config: InterruptionConfig) -> Self {
        let major_upgrade_margin = config.major_upgrade_margin;
        Self {
            classifier: ActivityClassifier::new(config),
            major_upgrade_margin,
        }
    }

    /// The underlying classifier.
    pub const fn classifier(&self) -> &ActivityClassifier {
        &self.classifier
    }

    /// Register a classification override.
    pub fn register_override(&mut self, classifier: Box<dyn ClassificationOverride>) {
        self.classifier.register_override(classifier);
    }

    /// Classify and decide in one step.
    pub fn allows(
        &self,
        agent: &Agent,
        activity: &ActivityDescriptor,
        improvement_ratio: f32,
    ) -> bool {
        let class = self.classifier.classify(activity);
        let decision = self.should_interrupt(agent, class, activity, improvement_ratio);
        trace!(
            agent_id = %agent.id,
            activity = %activity.kind,
            ?class,
            improvement_ratio,
            decision,
            "Interruption decision"
        );
        decision
    }

    /// Whether an upgrade with `improvement_ratio` may interrupt `class`.
    ///
    /// Conditional work yields when the agent is unarmed, when the ratio
    /// meets the major-upgrade margin, or when the job's priority tier is at
    /// or below the agent's own low-priority threshold.
    pub fn should_interrupt(
        &self,
        agent: &Agent,
        class: ActivityClass,
        activity: &ActivityDescriptor,
        improvement_ratio: f32,
    ) -> bool {
        match class {
            ActivityClass::Critical => false,
            ActivityClass::Safe => true,
            ActivityClass::Conditional => {
                !agent.is_armed()
                    || improvement_ratio >= self.major_upgrade_margin
                    || activity
                        .work_priority
                        .is_some_and(|tier| tier >= agent.low_priority_threshold)
            }
        }
    }
}
