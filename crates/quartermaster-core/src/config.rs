//! Configuration loading and typed config structures for the Quartermaster
//! engine.
//!
//! The reference configuration lives in `quartermaster.yaml` at the
//! workspace root. Every field has a named default, so an empty document
//! yields the stock tuning. The index and scoring sections reuse the config
//! types of their own crates.

use std::collections::BTreeMap;
use std::path::Path;

use quartermaster_index::IndexConfig;
use quartermaster_scoring::{EligibilityConfig, ScoringConfig};
use quartermaster_types::ActivityClass;
use serde::Deserialize;

/// Environment variable overriding `logging.level`.
pub const LOG_LEVEL_ENV: &str = "QUARTERMASTER_LOG";

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// A value parsed but cannot be used.
    #[error("invalid configuration: {reason}")]
    Invalid {
        /// Explanation of what is wrong with the configuration.
        reason: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct EngineConfig {
    /// Spatial index tunables.
    #[serde(default)]
    pub index: IndexConfig,

    /// Scoring factor weights and sentinels.
    #[serde(default)]
    pub scoring: ScoringConfig,

    /// Agent gating rules.
    #[serde(default)]
    pub eligibility: EligibilityConfig,

    /// Upgrade search parameters.
    #[serde(default)]
    pub evaluator: EvaluatorConfig,

    /// Activity classification and interruption margins.
    #[serde(default)]
    pub interruption: InterruptionConfig,

    /// Budgets, intervals, cooldowns, and record hygiene.
    #[serde(default)]
    pub scheduler: SchedulerConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl EngineConfig {
    /// Load and validate configuration from a YAML file.
    ///
    /// `QUARTERMASTER_LOG` overrides `logging.level` when set.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Yaml`] if the content is not valid YAML, or
    /// [`ConfigError::Invalid`] if a value fails validation.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse and validate configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML or
    /// [`ConfigError::Invalid`] if a value fails validation.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let mut config: Self = serde_yml::from_str(yaml)?;
        config.logging.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Reject values the engine cannot run with.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first bad value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.index.validate().map_err(invalid)?;
        self.scoring.validate().map_err(invalid)?;
        self.eligibility.validate().map_err(invalid)?;
        self.evaluator.validate()?;
        self.interruption.validate()?;
        self.scheduler.validate()?;
        Ok(())
    }
}

fn invalid(err: impl std::fmt::Display) -> ConfigError {
    ConfigError::Invalid {
        reason: err.to_string(),
    }
}

/// Upgrade evaluator configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EvaluatorConfig {
    /// Candidate/current score ratio an armed agent needs to switch.
    #[serde(default = "default_upgrade_margin")]
    pub upgrade_margin: f32,

    /// Search radius in world units.
    #[serde(default = "default_search_radius")]
    pub search_radius: f32,

    /// Search radius while the agent's zone is under threat.
    #[serde(default = "default_threatened_radius")]
    pub threatened_radius: f32,

    /// Most candidates scored per evaluation, nearest first.
    #[serde(default = "default_candidate_cap")]
    pub candidate_cap: usize,
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            upgrade_margin: default_upgrade_margin(),
            search_radius: default_search_radius(),
            threatened_radius: default_threatened_radius(),
            candidate_cap: default_candidate_cap(),
        }
    }
}

impl EvaluatorConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if !self.upgrade_margin.is_finite() || self.upgrade_margin < 1.0 {
            return Err(ConfigError::Invalid {
                reason: format!("upgrade_margin must be >= 1.0, got {}", self.upgrade_margin),
            });
        }
        for (name, radius) in [
            ("search_radius", self.search_radius),
            ("threatened_radius", self.threatened_radius),
        ] {
            if !radius.is_finite() || radius <= 0.0 {
                return Err(ConfigError::Invalid {
                    reason: format!("{name} must be positive, got {radius}"),
                });
            }
        }
        if self.candidate_cap == 0 {
            return Err(ConfigError::Invalid {
                reason: "candidate_cap must be at least 1".to_owned(),
            });
        }
        Ok(())
    }
}

/// Interruption policy configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct InterruptionConfig {
    /// Ratio an armed agent's upgrade needs to interrupt ordinary work.
    #[serde(default = "default_major_upgrade_margin")]
    pub major_upgrade_margin: f32,

    /// Class of activities the table and overrides do not cover.
    #[serde(default = "default_activity_class")]
    pub default_class: ActivityClass,

    /// Activity kind to class.
    #[serde(default = "default_activity_classes")]
    pub activity_classes: BTreeMap<String, ActivityClass>,
}

impl Default for InterruptionConfig {
    fn default() -> Self {
        Self {
            major_upgrade_margin: default_major_upgrade_margin(),
            default_class: default_activity_class(),
            activity_classes: default_activity_classes(),
        }
    }
}

impl InterruptionConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if !self.major_upgrade_margin.is_finite() || self.major_upgrade_margin < 1.0 {
            return Err(ConfigError::Invalid {
                reason: format!(
                    "major_upgrade_margin must be >= 1.0, got {}",
                    self.major_upgrade_margin
                ),
            });
        }
        Ok(())
    }
}

/// One row of the population-scaled evaluation budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct BudgetStep {
    /// Population at which this row starts to apply.
    pub min_population: usize,
    /// Evaluations allowed per tick.
    pub evaluations: usize,
}

/// Tick scheduler configuration. All durations are in ticks.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SchedulerConfig {
    /// Evaluation budget per tick by population; the last row whose
    /// `min_population` is reached applies.
    #[serde(default = "default_budget_steps")]
    pub budget_steps: Vec<BudgetStep>,

    /// Most roster slots examined per tick.
    #[serde(default = "default_scan_limit")]
    pub scan_limit: usize,

    /// Re-evaluation interval for unarmed agents.
    #[serde(default = "default_unarmed_interval")]
    pub unarmed_interval: u64,

    /// Base re-evaluation interval for armed agents.
    #[serde(default = "default_armed_interval")]
    pub armed_interval: u64,

    /// Extra armed interval per agent in the population.
    #[serde(default = "default_armed_interval_per_agent")]
    pub armed_interval_per_agent: u64,

    /// Ceiling on the armed interval.
    #[serde(default = "default_armed_interval_max")]
    pub armed_interval_max: u64,

    /// Interval between sidearm checks.
    #[serde(default = "default_sidearm_interval")]
    pub sidearm_interval: u64,

    /// Per-agent offsets are drawn from `[0, stagger_window)`.
    #[serde(default = "default_stagger_window")]
    pub stagger_window: u64,

    /// Minimum cooldown after an armed agent's search finds nothing.
    #[serde(default = "default_no_upgrade_cooldown")]
    pub no_upgrade_cooldown: u64,

    /// Cooldown per agent in the population after an empty search.
    #[serde(default = "default_no_upgrade_cooldown_per_agent")]
    pub no_upgrade_cooldown_per_agent: u64,

    /// Backoff after the executor rejects or fails a task.
    #[serde(default = "default_failure_backoff")]
    pub failure_backoff: u64,

    /// Interval between record purges.
    #[serde(default = "default_purge_interval")]
    pub purge_interval: u64,

    /// Maximum entries retained per record structure.
    #[serde(default = "default_max_records")]
    pub max_records: usize,

    /// Lifetime of an exclusive item claim.
    #[serde(default = "default_claim_ttl")]
    pub claim_ttl: u64,

    /// Dispatched tasks unresolved after this long are forgotten.
    #[serde(default = "default_pending_task_ttl")]
    pub pending_task_ttl: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            budget_steps: default_budget_steps(),
            scan_limit: default_scan_limit(),
            unarmed_interval: default_unarmed_interval(),
            armed_interval: default_armed_interval(),
            armed_interval_per_agent: default_armed_interval_per_agent(),
            armed_interval_max: default_armed_interval_max(),
            sidearm_interval: default_sidearm_interval(),
            stagger_window: default_stagger_window(),
            no_upgrade_cooldown: default_no_upgrade_cooldown(),
            no_upgrade_cooldown_per_agent: default_no_upgrade_cooldown_per_agent(),
            failure_backoff: default_failure_backoff(),
            purge_interval: default_purge_interval(),
            max_records: default_max_records(),
            claim_ttl: default_claim_ttl(),
            pending_task_ttl: default_pending_task_ttl(),
        }
    }
}

impl SchedulerConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.budget_steps.is_empty() {
            return Err(ConfigError::Invalid {
                reason: "budget_steps must not be empty".to_owned(),
            });
        }
        if self.budget_steps.iter().any(|step| step.evaluations == 0) {
            return Err(ConfigError::Invalid {
                reason: "every budget step must allow at least one evaluation".to_owned(),
            });
        }
        if self
            .budget_steps
            .windows(2)
            .any(|pair| matches!(pair, [a, b] if a.min_population >= b.min_population))
        {
            return Err(ConfigError::Invalid {
                reason: "budget_steps must be sorted by strictly increasing min_population"
                    .to_owned(),
            });
        }
        let nonzero = [
            ("scan_limit", u64::try_from(self.scan_limit).unwrap_or(u64::MAX)),
            ("unarmed_interval", self.unarmed_interval),
            ("armed_interval", self.armed_interval),
            ("sidearm_interval", self.sidearm_interval),
            ("stagger_window", self.stagger_window),
            ("purge_interval", self.purge_interval),
            ("max_records", u64::try_from(self.max_records).unwrap_or(u64::MAX)),
            ("claim_ttl", self.claim_ttl),
            ("pending_task_ttl", self.pending_task_ttl),
        ];
        if let Some((name, _)) = nonzero.iter().find(|(_, value)| *value == 0) {
            return Err(ConfigError::Invalid {
                reason: format!("{name} must be at least 1"),
            });
        }
        if self.armed_interval_max < self.armed_interval {
            return Err(ConfigError::Invalid {
                reason: "armed_interval_max must be >= armed_interval".to_owned(),
            });
        }
        Ok(())
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error) or a full filter directive.
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl LoggingConfig {
    /// Override the level with `QUARTERMASTER_LOG` when set.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var(LOG_LEVEL_ENV) {
            self.level = val;
        }
    }
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

const fn default_upgrade_margin() -> f32 {
    1.05
}

const fn default_search_radius() -> f32 {
    60.0
}

const fn default_threatened_radius() -> f32 {
    25.0
}

const fn default_candidate_cap() -> usize {
    40
}

const fn default_major_upgrade_margin() -> f32 {
    1.15
}

const fn default_activity_class() -> ActivityClass {
    ActivityClass::Conditional
}

fn default_activity_classes() -> BTreeMap<String, ActivityClass> {
    let critical = [
        "tend_patient",
        "rescue",
        "surgery",
        "combat",
        "attack",
        "flee",
        "board_transport",
        "trade",
        "negotiate",
        "ceremony",
        "drop_equipment",
    ];
    let safe = [
        "idle",
        "wander",
        "wait",
        "stand",
        "chat",
        "relax",
        "clean",
        "haul",
    ];
    critical
        .into_iter()
        .map(|kind| (kind.to_owned(), ActivityClass::Critical))
        .chain(safe.into_iter().map(|kind| (kind.to_owned(), ActivityClass::Safe)))
        .collect()
}

fn default_budget_steps() -> Vec<BudgetStep> {
    [(0, 3), (10, 4), (20, 5), (35, 6), (50, 7)]
        .into_iter()
        .map(|(min_population, evaluations)| BudgetStep {
            min_population,
            evaluations,
        })
        .collect()
}

const fn default_scan_limit() -> usize {
    64
}

const fn default_unarmed_interval() -> u64 {
    30
}

const fn default_armed_interval() -> u64 {
    600
}

const fn default_armed_interval_per_agent() -> u64 {
    10
}

const fn default_armed_interval_max() -> u64 {
    1800
}

const fn default_sidearm_interval() -> u64 {
    2400
}

const fn default_stagger_window() -> u64 {
    120
}

const fn default_no_upgrade_cooldown() -> u64 {
    300
}

const fn default_no_upgrade_cooldown_per_agent() -> u64 {
    15
}

const fn default_failure_backoff() -> u64 {
    600
}

const fn default_purge_interval() -> u64 {
    2500
}

const fn default_max_records() -> usize {
    4096
}

const fn default_claim_ttl() -> u64 {
    2500
}

const fn default_pending_task_ttl() -> u64 {
    5000
}

fn default_log_level() -> String {
    "info".to_owned()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let config: EngineConfig = serde_yml::from_str("{}").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn reference_file_spells_out_the_defaults() {
        let yaml = include_str!("../../../quartermaster.yaml");
        let config: EngineConfig = serde_yml::from_str(yaml).unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn default_budget_scales_with_population() {
        let steps = default_budget_steps();
        assert_eq!(steps.first().map(|s| s.evaluations), Some(3));
        assert_eq!(steps.last().map(|s| s.evaluations), Some(7));
    }

    #[test]
    fn sections_override_independently() {
        let yaml = "
evaluator:
  upgrade_margin: 1.2
scheduler:
  unarmed_interval: 5
interruption:
  activity_classes:
    sow: safe
";
        let config: EngineConfig = serde_yml::from_str(yaml).unwrap();
        assert!((config.evaluator.upgrade_margin - 1.2).abs() < f32::EPSILON);
        assert_eq!(config.evaluator.candidate_cap, 40);
        assert_eq!(config.scheduler.unarmed_interval, 5);
        assert_eq!(
            config.interruption.activity_classes.get("sow"),
            Some(&ActivityClass::Safe)
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn margin_below_one_is_invalid() {
        let mut config = EngineConfig::default();
        config.evaluator.upgrade_margin = 0.9;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn unsorted_budget_is_invalid() {
        let mut config = EngineConfig::default();
        config.scheduler.budget_steps.reverse();
        assert!(config.validate().is_err());
    }

    #[test]
    fn bad_cell_size_surfaces_as_invalid() {
        let mut config = EngineConfig::default();
        config.index.cell_size = -1.0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid { .. })));
    }
}
