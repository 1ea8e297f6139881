//! Property tests for round-robin selection, scheduler intervals and the
//! upgrade threshold.

#![allow(clippy::unwrap_used, clippy::arithmetic_side_effects)]

use std::collections::BTreeSet;

use proptest::prelude::*;
use quartermaster_core::UpgradeEvaluator;
use quartermaster_core::config::{EvaluatorConfig, SchedulerConfig};
use quartermaster_core::roster::Roster;
use quartermaster_core::scheduler::TickScheduler;
use quartermaster_types::AgentId;

proptest! {
    #[test]
    fn every_due_agent_is_reached_within_a_rotation(
        population in 1usize..80,
        budget in 1usize..8,
        removed in proptest::collection::vec(any::<bool>(), 80),
    ) {
        let mut roster = Roster::new();
        let ids: Vec<AgentId> = (0..population).map(|_| AgentId::new()).collect();
        for id in &ids {
            roster.register(*id, 0, 0);
        }
        for (id, gone) in ids.iter().zip(&removed) {
            if *gone {
                roster.unregister(*id);
            }
        }
        let live: BTreeSet<AgentId> = roster.agents().collect();

        let mut seen = BTreeSet::new();
        let rotations = live.len().div_ceil(budget);
        for _ in 0..rotations {
            let picked = roster.round_robin(usize::MAX, budget, |record| {
                (!seen.contains(&record.agent)).then_some(())
            });
            prop_assert!(picked.len() <= budget);
            for (agent, ()) in picked {
                prop_assert!(seen.insert(agent), "agent picked twice");
            }
        }
        prop_assert_eq!(seen, live);
    }

    #[test]
    fn armed_interval_stays_within_bounds(population in 0usize..100_000) {
        let scheduler = TickScheduler::new(SchedulerConfig::default());
        let config = scheduler.config();
        let interval = scheduler.armed_interval(population);
        prop_assert!(interval >= config.armed_interval);
        prop_assert!(interval <= config.armed_interval_max);
        prop_assert!(scheduler.no_upgrade_cooldown(population) >= config.no_upgrade_cooldown);
        prop_assert!(scheduler.stagger_for(AgentId::new()) < config.stagger_window);
    }

    #[test]
    fn an_upgrade_never_scores_below_the_current_item(
        current in -1000.0f32..1000.0,
        candidate in -1000.0f32..1000.0,
    ) {
        let evaluator = UpgradeEvaluator::new(EvaluatorConfig::default());
        prop_assert!(evaluator.threshold(Some(current)) >= current);
        if evaluator.beats(candidate, Some(current)) {
            prop_assert!(candidate > current);
        }
    }
}
