//! Harness configuration, read from the `sim` section of the engine's
//! YAML file.

use std::path::Path;

use serde::Deserialize;

use crate::error::SimError;

/// Shape and pacing of the synthetic world.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct HarnessConfig {
    /// Seed for every random choice the harness makes.
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Ticks to run before stopping.
    #[serde(default = "default_ticks")]
    pub ticks: u64,

    /// Number of zones.
    #[serde(default = "default_zones")]
    pub zones: u32,

    /// Agents placed in each zone at startup.
    #[serde(default = "default_agents_per_zone")]
    pub agents_per_zone: u32,

    /// Items scattered in each zone at startup.
    #[serde(default = "default_items_per_zone")]
    pub items_per_zone: u32,

    /// Edge length of each square zone in world units.
    #[serde(default = "default_zone_size")]
    pub zone_size: u16,

    /// Ticks between a task being started and the world applying it.
    #[serde(default = "default_task_latency")]
    pub task_latency: u64,

    /// Per-tick chance of spawning a new item somewhere.
    #[serde(default = "default_spawn_chance")]
    pub spawn_chance: f64,

    /// Per-tick chance of moving a random item.
    #[serde(default = "default_move_chance")]
    pub move_chance: f64,

    /// Per-tick chance of despawning a random item.
    #[serde(default = "default_despawn_chance")]
    pub despawn_chance: f64,

    /// Chance that the executor refuses a task on a given tick.
    #[serde(default = "default_reject_chance")]
    pub reject_chance: f64,

    /// Chance that an accepted task fails instead of completing.
    #[serde(default = "default_failure_chance")]
    pub failure_chance: f64,

    /// Per-tick chance that an agent switches to a new activity.
    #[serde(default = "default_activity_change_chance")]
    pub activity_change_chance: f64,

    /// Log a tick summary every this many ticks.
    #[serde(default = "default_report_every")]
    pub report_every: u64,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            seed: default_seed(),
            ticks: default_ticks(),
            zones: default_zones(),
            agents_per_zone: default_agents_per_zone(),
            items_per_zone: default_items_per_zone(),
            zone_size: default_zone_size(),
            task_latency: default_task_latency(),
            spawn_chance: default_spawn_chance(),
            move_chance: default_move_chance(),
            despawn_chance: default_despawn_chance(),
            reject_chance: default_reject_chance(),
            failure_chance: default_failure_chance(),
            activity_change_chance: default_activity_change_chance(),
            report_every: default_report_every(),
        }
    }
}

impl HarnessConfig {
    /// Read the `sim` section from `path`; defaults when the file or the
    /// section is missing.
    pub fn load(path: &Path) -> Result<Self, SimError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path).map_err(|e| SimError::Harness {
            message: format!("failed to read config file: {e}"),
        })?;
        let raw: serde_yml::Value =
            serde_yml::from_str(&contents).map_err(|e| SimError::Harness {
                message: format!("failed to parse config YAML: {e}"),
            })?;
        let config = match raw.get("sim") {
            Some(section) => {
                serde_yml::from_value(section.clone()).map_err(|e| SimError::Harness {
                    message: format!("failed to parse sim section: {e}"),
                })?
            }
            None => Self::default(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject values the harness cannot run with.
    pub fn validate(&self) -> Result<(), SimError> {
        let chances = [
            ("spawn_chance", self.spawn_chance),
            ("move_chance", self.move_chance),
            ("despawn_chance", self.despawn_chance),
            ("reject_chance", self.reject_chance),
            ("failure_chance", self.failure_chance),
            ("activity_change_chance", self.activity_change_chance),
        ];
        if let Some((name, _)) = chances
            .iter()
            .find(|(_, chance)| !(0.0..=1.0).contains(chance))
        {
            return Err(SimError::Harness {
                message: format!("{name} must be within [0, 1]"),
            });
        }
        if self.zones == 0 || self.zone_size == 0 || self.report_every == 0 {
            return Err(SimError::Harness {
                message: "zones, zone_size and report_every must be positive".to_owned(),
            });
        }
        Ok(())
    }
}

const fn default_seed() -> u64 {
    7
}

const fn default_ticks() -> u64 {
    6000
}

const fn default_zones() -> u32 {
    3
}

const fn default_agents_per_zone() -> u32 {
    12
}

const fn default_items_per_zone() -> u32 {
    400
}

const fn default_zone_size() -> u16 {
    250
}

const fn default_task_latency() -> u64 {
    40
}

const fn default_spawn_chance() -> f64 {
    0.2
}

const fn default_move_chance() -> f64 {
    0.3
}

const fn default_despawn_chance() -> f64 {
    0.1
}

const fn default_reject_chance() -> f64 {
    0.02
}

const fn default_failure_chance() -> f64 {
    0.05
}

const fn default_activity_change_chance() -> f64 {
    0.01
}

const fn default_report_every() -> u64 {
    500
}
