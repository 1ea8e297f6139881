//! Evaluation budget, intervals and cooldowns.
//!
//! Pure timing rules over [`AgentRecord`]s. The engine owns the roster and
//! calls these to decide who is due on a given tick.

use quartermaster_types::AgentId;

use crate::config::SchedulerConfig;
use crate::roster::AgentRecord;

/// Which slot of an agent is due for evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DueCheck {
    /// The primary slot.
    Primary,
    /// The sidearm slot.
    Sidearm,
}

/// Timing rules derived from [`SchedulerConfig`].
#[derive(Debug, Clone)]
pub struct TickScheduler {
    config: SchedulerConfig,
}

impl TickScheduler {
    /// Build from config.
    pub const fn new(config: SchedulerConfig) -> Self {
        Self { config }
    }

    /// Active configuration.
    pub const fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Evaluations allowed per tick for `population` agents.
    pub fn budget_for(&self, population: usize) -> usize {
        self.config
            .budget_steps
            .iter()
            .rev()
            .find(|step| population >= step.min_population)
            .or_else(|| self.config.budget_steps.first())
            .map_or(1, |step| step.evaluations)
    }

    /// Re-evaluation interval for an armed agent, growing with population.
    pub fn armed_interval(&self, population: usize) -> u64 {
        let population = u64::try_from(population).unwrap_or(u64::MAX);
        self.config
            .armed_interval
            .saturating_add(self.config.armed_interval_per_agent.saturating_mul(population))
            .min(self.config.armed_interval_max)
    }

    /// Empty-search cooldown for an armed agent.
    pub fn no_upgrade_cooldown(&self, population: usize) -> u64 {
        let population = u64::try_from(population).unwrap_or(u64::MAX);
        self.config.no_upgrade_cooldown.max(
            self.config
                .no_upgrade_cooldown_per_agent
                .saturating_mul(population),
        )
    }

    /// Stable per-agent offset in `[0, stagger_window)`.
    pub fn stagger_for(&self, agent: AgentId) -> u64 {
        agent
            .stable_hash()
            .checked_rem(self.config.stagger_window)
            .unwrap_or(0)
    }

    /// Which check, if any, is due for `record` at `tick`.
    ///
    /// The primary check wins when both are due. Agents never evaluated are
    /// due immediately; backoff suppresses everything.
    pub fn due(
        &self,
        record: &AgentRecord,
        armed: bool,
        has_sidearm_slot: bool,
        population: usize,
        tick: u64,
    ) -> Option<DueCheck> {
        if tick < record.backoff_until {
            return None;
        }
        let primary_due = match record.last_evaluated {
            None => true,
            Some(last) => {
                let interval = if armed {
                    self.armed_interval(population)
                } else {
                    self.config.unarmed_interval
                };
                let wait = interval.saturating_add(if armed { record.stagger } else { 0 });
                tick.saturating_sub(last) >= wait && (!armed || tick >= record.no_upgrade_until)
            }
        };
        if primary_due {
            return Some(DueCheck::Primary);
        }
        if armed && has_sidearm_slot {
            let sidearm_due = record.last_sidearm_check.is_none_or(|last| {
                tick.saturating_sub(last)
                    >= self.config.sidearm_interval.saturating_add(record.stagger)
            });
            if sidearm_due {
                return Some(DueCheck::Sidearm);
            }
        }
        None
    }

    /// Tick until which a failed dispatch suppresses the agent.
    pub const fn backoff_until(&self, tick: u64) -> u64 {
        tick.saturating_add(self.config.failure_backoff)
    }

    /// Whether a purge pass is due.
    pub const fn purge_due(&self, last_purge: u64, tick: u64) -> bool {
        tick.saturating_sub(last_purge) >= self.config.purge_interval
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(stagger: u64) -> AgentRecord {
        AgentRecord {
            agent: AgentId::new(),
            stagger,
            registered_tick: 0,
            last_evaluated: None,
            last_sidearm_check: None,
            no_upgrade_until: 0,
            backoff_until: 0,
            evaluations: 0,
        }
    }

    #[test]
    fn budget_scales_with_population() {
        let scheduler = TickScheduler::new(SchedulerConfig::default());
        assert_eq!(scheduler.budget_for(0), 3);
        assert_eq!(scheduler.budget_for(9), 3);
        assert_eq!(scheduler.budget_for(10), 4);
        assert_eq!(scheduler.budget_for(34), 5);
        assert_eq!(scheduler.budget_for(500), 7);
    }

    #[test]
    fn armed_interval_grows_and_caps() {
        let scheduler = TickScheduler::new(SchedulerConfig::default());
        assert_eq!(scheduler.armed_interval(0), 600);
        assert_eq!(scheduler.armed_interval(10), 700);
        assert_eq!(scheduler.armed_interval(10_000), 1800);
    }

    #[test]
    fn cooldown_is_proportional_to_population() {
        let scheduler = TickScheduler::new(SchedulerConfig::default());
        assert_eq!(scheduler.no_upgrade_cooldown(5), 300);
        assert_eq!(scheduler.no_upgrade_cooldown(40), 600);
    }

    #[test]
    fn stagger_is_stable_and_bounded() {
        let scheduler = TickScheduler::new(SchedulerConfig::default());
        let agent = AgentId::new();
        let offset = scheduler.stagger_for(agent);
        assert_eq!(offset, scheduler.stagger_for(agent));
        assert!(offset < 120);
    }

    #[test]
    fn first_evaluation_is_immediate() {
        let scheduler = TickScheduler::new(SchedulerConfig::default());
        assert_eq!(scheduler.due(&record(50), true, true, 1, 1), Some(DueCheck::Primary));
    }

    #[test]
    fn unarmed_agents_ignore_stagger_and_cooldown() {
        let scheduler = TickScheduler::new(SchedulerConfig::default());
        let mut rec = record(100);
        rec.last_evaluated = Some(10);
        rec.no_upgrade_until = 10_000;
        assert_eq!(scheduler.due(&rec, false, false, 1, 39), None);
        assert_eq!(scheduler.due(&rec, false, false, 1, 40), Some(DueCheck::Primary));
    }

    #[test]
    fn armed_agents_wait_for_interval_and_cooldown() {
        let scheduler = TickScheduler::new(SchedulerConfig::default());
        let mut rec = record(0);
        rec.last_evaluated = Some(0);
        rec.last_sidearm_check = Some(0);
        assert_eq!(scheduler.due(&rec, true, true, 0, 599), None);
        assert_eq!(scheduler.due(&rec, true, true, 0, 600), Some(DueCheck::Primary));
        rec.no_upgrade_until = 900;
        assert_eq!(scheduler.due(&rec, true, true, 0, 600), None);
        assert_eq!(scheduler.due(&rec, true, true, 0, 2400), Some(DueCheck::Primary));
    }

    #[test]
    fn sidearm_check_runs_on_its_own_interval() {
        let scheduler = TickScheduler::new(SchedulerConfig::default());
        let mut rec = record(0);
        rec.last_evaluated = Some(0);
        rec.no_upgrade_until = u64::MAX;
        assert_eq!(scheduler.due(&rec, true, true, 0, 1), Some(DueCheck::Sidearm));
        rec.last_sidearm_check = Some(1);
        assert_eq!(scheduler.due(&rec, true, true, 0, 2400), None);
        assert_eq!(scheduler.due(&rec, true, true, 0, 2401), Some(DueCheck::Sidearm));
        assert_eq!(scheduler.due(&rec, true, false, 0, 2401), None);
    }

    #[test]
    fn backoff_suppresses_everything() {
        let scheduler = TickScheduler::new(SchedulerConfig::default());
        let mut rec = record(0);
        rec.backoff_until = scheduler.backoff_until(5);
        assert_eq!(scheduler.due(&rec, false, false, 1, 604), None);
        assert_eq!(scheduler.due(&rec, false, false, 1, 605), Some(DueCheck::Primary));
    }
}
