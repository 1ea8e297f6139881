//! End-to-end scenarios for the upgrade engine.
//!
//! Every scenario drives [`UpgradeEngine::tick`] against the in-memory host
//! implementations, feeding world changes through the event queue exactly as
//! a live host would.

#![allow(
    clippy::unwrap_used,
    clippy::panic,
    clippy::indexing_slicing,
    clippy::arithmetic_side_effects,
    clippy::float_cmp
)]

use quartermaster_core::{
    EngineConfig, EventSender, Evaluation, Host, InMemoryWorld, Notification, RecordingExecutor,
    RecordingSink, StaticPolicies, TickSummary, UpgradeEngine, WorldEvent,
};
use quartermaster_index::ItemSource;
use quartermaster_scoring::{ScoreFactor, ScoringContext, ScoringEngine};
use quartermaster_types::{
    ActivityDescriptor, Agent, AgentId, EquipSlot, EquipmentPolicy, Item, ItemClass, ItemDef,
    ItemId, Position, PriorityMode, QualityTier, RangedStats, TaskKind, ZoneId,
};

/// Scores an item by its `power` attribute alone.
#[derive(Debug)]
struct Power;

impl ScoreFactor for Power {
    fn name(&self) -> &'static str {
        "power"
    }

    fn score(&self, ctx: &ScoringContext<'_>) -> f32 {
        ctx.item.attribute("power").unwrap_or(0.0)
    }
}

struct Harness {
    world: InMemoryWorld,
    executor: RecordingExecutor,
    policies: StaticPolicies,
    sink: RecordingSink,
    engine: UpgradeEngine,
    events: EventSender,
    zone: ZoneId,
}

impl Harness {
    fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    fn with_config(config: EngineConfig) -> Self {
        Self::from_engine(UpgradeEngine::new(config).unwrap())
    }

    fn from_engine(engine: UpgradeEngine) -> Self {
        let events = engine.event_sender();
        Self {
            world: InMemoryWorld::new(),
            executor: RecordingExecutor::new(),
            policies: StaticPolicies::allow_all(),
            sink: RecordingSink::default(),
            engine,
            events,
            zone: ZoneId::new(),
        }
    }

    fn send(&self, event: WorldEvent) {
        assert!(self.events.send(event));
    }

    fn tick(&mut self) -> TickSummary {
        let mut host = Host {
            world: &self.world,
            executor: &mut self.executor,
            policies: &self.policies,
            sink: &mut self.sink,
        };
        self.engine.tick(&mut host).unwrap()
    }

    fn spawn_agent_at(&mut self, x: f32, y: f32) -> AgentId {
        let agent = Agent::new(self.zone, Position::new(x, y));
        let id = agent.id;
        let event = self.world.add_agent(agent);
        self.send(event);
        id
    }

    fn spawn_item(&mut self, item: Item) -> ItemId {
        let id = item.id;
        let event = self.world.add_item(item);
        self.send(event);
        id
    }

    fn club_at(&self, x: f32, y: f32) -> Item {
        Item::new(ItemDef::melee("club", 8.0, 2.0), self.zone, Position::new(x, y))
    }

    fn powered_at(&self, power: f32, x: f32, y: f32) -> Item {
        let mut item = self.club_at(x, y);
        item.attributes.insert("power".to_owned(), power);
        item
    }

    fn arm(&mut self, agent: AgentId, item: ItemId) {
        for event in self.world.equip(agent, item, EquipSlot::Primary) {
            self.send(event);
        }
    }

    /// Carry out every started task in the world and report completion.
    fn complete_started(&mut self) {
        for started in self.executor.take_started() {
            for event in self.world.apply_task(&started.task) {
                self.send(event);
            }
            self.send(WorldEvent::TaskCompleted {
                agent: started.task.agent,
                item: started.task.target(),
            });
        }
    }
}

#[test]
fn unarmed_agent_picks_up_nearby_item() {
    let mut h = Harness::new();
    let agent = h.spawn_agent_at(0.0, 0.0);
    let club = h.club_at(5.0, 5.0);
    let item = h.spawn_item(club);

    let summary = h.tick();
    assert!(summary.purged);
    assert_eq!(summary.population, 1);
    assert_eq!(summary.dispatched, 1);

    let started = &h.executor.started;
    assert_eq!(started.len(), 1);
    assert_eq!(started[0].mode, PriorityMode::Interrupt);
    assert_eq!(started[0].task.target(), item);
    assert!(started[0].task.auto_generated);
    assert!(started[0].task.previous_item.is_none());
    assert_eq!(h.engine.claims().claimant(item, 1), Some(agent));
    assert!(h.engine.pending_task(agent).is_some());

    h.complete_started();
    h.tick();

    assert!(h.engine.pending_task(agent).is_none());
    assert!(h.engine.claims().is_empty());
    assert!(matches!(
        h.sink.received.as_slice(),
        [Notification::AutoEquipped { agent: a, item: i, slot: EquipSlot::Primary, .. }]
            if *a == agent && *i == item
    ));
    assert_eq!(h.engine.dump_cache_stats(h.zone).tracked, 0);
}

#[test]
fn upgrade_must_clear_the_margin() {
    let scoring = ScoringEngine::empty(-1000.0, 10_000.0).with_factor(Power);
    let engine = UpgradeEngine::new(EngineConfig::default())
        .unwrap()
        .with_scoring(scoring);
    let mut h = Harness::from_engine(engine);
    let margin = h.engine.config().evaluator.upgrade_margin;
    let current = 40.0_f32;

    let agent = h.spawn_agent_at(0.0, 0.0);
    let held = h.powered_at(current, 0.0, 0.0);
    let held = h.spawn_item(held);
    h.arm(agent, held);
    let rival = h.powered_at(current * margin, 3.0, 0.0);
    let rival = h.spawn_item(rival);

    assert!(h.engine.evaluate_now(&h.world, &h.policies, agent).is_none());

    h.world
        .item_mut(rival)
        .unwrap()
        .attributes
        .insert("power".to_owned(), current * margin + 0.01);
    let task = h.engine.evaluate_now(&h.world, &h.policies, agent).unwrap();
    assert_eq!(task.target(), rival);
    assert_eq!(task.previous_item, Some(held));
    assert_eq!(task.previous_score, Some(current));
}

#[test]
fn armed_upgrade_reports_the_replaced_item() {
    let mut h = Harness::new();
    let agent = h.spawn_agent_at(0.0, 0.0);
    let mut worn = h.club_at(0.0, 0.0);
    worn.quality = QualityTier::Awful;
    worn.hit_points = 10;
    let worn = h.spawn_item(worn);
    h.arm(agent, worn);
    let mut fine = h.club_at(4.0, 0.0);
    fine.quality = QualityTier::Excellent;
    let fine = h.spawn_item(fine);

    h.tick();
    let task = h.executor.started[0].task.clone();
    assert_eq!(task.target(), fine);
    assert_eq!(task.previous_item, Some(worn));
    assert!(task.improvement_ratio() > 1.05);

    h.complete_started();
    h.tick();

    match h.sink.received.as_slice() {
        [Notification::Upgraded {
            item,
            previous_item,
            ..
        }] => {
            assert_eq!(*item, fine);
            assert_eq!(*previous_item, Some(worn));
        }
        other => panic!("unexpected notifications: {other:?}"),
    }
    // The dropped club is back on the ground and indexed again.
    assert_eq!(h.engine.dump_cache_stats(h.zone).tracked, 1);
}

#[test]
fn pinned_agent_is_left_alone() {
    let mut h = Harness::new();
    let agent = h.spawn_agent_at(0.0, 0.0);
    let mut worn = h.club_at(0.0, 0.0);
    worn.quality = QualityTier::Awful;
    let worn = h.spawn_item(worn);
    h.arm(agent, worn);
    let mut fine = h.club_at(2.0, 0.0);
    fine.quality = QualityTier::Legendary;
    h.spawn_item(fine);
    h.send(WorldEvent::PinSet { agent, item: worn });

    let summary = h.tick();
    assert_eq!(summary.pinned, 1);
    assert_eq!(summary.dispatched, 0);
    assert!(h.executor.started.is_empty());
    assert!(h.engine.pins().is_pinned(agent));
    assert!(h.engine.evaluate_now(&h.world, &h.policies, agent).is_none());
    let report = h
        .engine
        .evaluate_detailed(&h.world, &h.policies, agent, EquipSlot::Primary)
        .unwrap();
    assert_eq!(report.outcome, Evaluation::Pinned);
    assert_eq!(report.current_score, Some(h.engine.scoring().pinned_score()));

    h.send(WorldEvent::PinCleared { agent });
    let summary = h.tick();
    assert_eq!(summary.dispatched, 1);
}

#[test]
fn pinning_an_unheld_item_forces_an_equip() {
    let mut h = Harness::new();
    let agent = h.spawn_agent_at(0.0, 0.0);
    let mut poor = h.club_at(30.0, 0.0);
    poor.quality = QualityTier::Awful;
    let poor = h.spawn_item(poor);
    h.send(WorldEvent::PinSet { agent, item: poor });

    let summary = h.tick();
    assert_eq!(summary.dispatched, 1);
    let started = &h.executor.started[0];
    assert_eq!(started.mode, PriorityMode::Interrupt);
    assert!(!started.task.auto_generated);
    assert_eq!(started.task.score, h.engine.scoring().pinned_score());

    h.complete_started();
    h.tick();
    assert!(h.sink.received.is_empty());
    assert!(h.engine.pins().get(agent).is_some_and(|pin| pin.equipped));
}

#[test]
fn critical_activity_defers_the_upgrade() {
    let mut h = Harness::new();
    let agent = h.spawn_agent_at(0.0, 0.0);
    let club = h.club_at(5.0, 0.0);
    h.spawn_item(club);
    h.executor
        .activities
        .insert(agent, ActivityDescriptor::of_kind("combat"));

    let summary = h.tick();
    assert_eq!(summary.deferred, 1);
    assert!(h.executor.started.is_empty());
    assert!(h.engine.pending_task(agent).is_none());
    assert_eq!(
        h.engine.roster().get(agent).and_then(|r| r.last_evaluated),
        Some(1)
    );

    h.executor.activities.remove(&agent);
    let mut dispatched_at = None;
    for _ in 0..40 {
        let summary = h.tick();
        if summary.dispatched > 0 {
            dispatched_at = Some(summary.tick);
            break;
        }
    }
    let interval = h.engine.config().scheduler.unarmed_interval;
    assert_eq!(dispatched_at, Some(1 + interval));
}

#[test]
fn locked_agents_are_not_evaluated() {
    let mut h = Harness::new();
    let agent = h.spawn_agent_at(0.0, 0.0);
    let club = h.club_at(1.0, 0.0);
    h.spawn_item(club);
    h.executor.locked.insert(agent);

    let summary = h.tick();
    assert_eq!(summary.evaluated, 0);
    assert!(h.executor.started.is_empty());
}

#[test]
fn budget_scales_and_rotates_fairly() {
    let mut h = Harness::new();
    let agents: Vec<AgentId> = (0..12)
        .map(|i| h.spawn_agent_at(f32::from(u8::try_from(i).unwrap()), 0.0))
        .collect();

    let mut evaluated = 0;
    for _ in 0..3 {
        let summary = h.tick();
        assert_eq!(summary.population, 12);
        assert_eq!(summary.budget, 4);
        assert!(summary.evaluated <= summary.budget);
        evaluated += summary.evaluated;
    }
    assert_eq!(evaluated, 12);
    for agent in &agents {
        assert_eq!(h.engine.roster().get(*agent).map(|r| r.evaluations), Some(1));
    }

    // Nobody is due again until the unarmed interval passes.
    assert_eq!(h.tick().evaluated, 0);
}

#[test]
fn refused_task_backs_the_agent_off() {
    let mut h = Harness::new();
    let agent = h.spawn_agent_at(0.0, 0.0);
    let club = h.club_at(1.0, 0.0);
    let item = h.spawn_item(club);
    h.executor.accept = false;

    let summary = h.tick();
    assert_eq!(summary.rejected, 1);
    assert!(h.engine.pending_task(agent).is_none());
    assert!(h.engine.claims().is_empty());

    let backoff = 1 + h.engine.config().scheduler.failure_backoff;
    assert!(matches!(
        h.sink.received.as_slice(),
        [Notification::TaskRejected { agent: a, item: i, backoff_until }]
            if *a == agent && *i == item && *backoff_until == backoff
    ));

    for _ in 0..100 {
        assert_eq!(h.tick().evaluated, 0);
    }
}

#[test]
fn failed_task_releases_the_claim_and_backs_off() {
    let mut h = Harness::new();
    let agent = h.spawn_agent_at(0.0, 0.0);
    let club = h.club_at(1.0, 0.0);
    let item = h.spawn_item(club);

    h.tick();
    assert_eq!(h.engine.claims().claimant(item, 1), Some(agent));

    h.send(WorldEvent::TaskFailed { agent, item });
    let summary = h.tick();
    assert_eq!(summary.rejected, 1);
    assert!(h.engine.claims().is_empty());
    assert!(h.engine.pending_task(agent).is_none());
    assert!(
        h.engine
            .roster()
            .get(agent)
            .is_some_and(|r| r.backoff_until > summary.tick)
    );
}

#[test]
fn disallowed_item_is_dropped() {
    let mut h = Harness::new();
    let agent = h.spawn_agent_at(0.0, 0.0);
    let club = h.club_at(0.0, 0.0);
    let item = h.spawn_item(club);
    h.arm(agent, item);
    h.policies.per_agent.insert(agent, EquipmentPolicy::deny_all());

    let summary = h.tick();
    assert_eq!(summary.dispatched, 1);
    let started = &h.executor.started[0];
    assert_eq!(started.mode, PriorityMode::Queue);
    assert!(matches!(started.task.kind, TaskKind::Drop { item: i } if i == item));
    assert!(matches!(
        h.sink.received.as_slice(),
        [Notification::AutoDropped { agent: a, item: i }] if *a == agent && *i == item
    ));
}

#[test]
fn quest_items_are_never_dropped() {
    let mut h = Harness::new();
    let agent = h.spawn_agent_at(0.0, 0.0);
    let mut relic = h.club_at(0.0, 0.0);
    relic.quest_bound = true;
    let relic = h.spawn_item(relic);
    h.arm(agent, relic);
    h.policies.per_agent.insert(agent, EquipmentPolicy::deny_all());

    let summary = h.tick();
    assert_eq!(summary.no_upgrade, 1);
    assert!(h.executor.started.is_empty());
}

#[test]
fn despawned_items_leave_the_index() {
    let mut h = Harness::new();
    let agent = h.spawn_agent_at(0.0, 0.0);
    h.policies.per_agent.insert(agent, EquipmentPolicy::deny_all());
    let club = h.club_at(10.0, 10.0);
    let item = h.spawn_item(club);

    h.tick();
    assert_eq!(h.engine.dump_cache_stats(h.zone).tracked, 1);

    let event = h.world.remove_item(item).unwrap();
    h.send(event);
    h.tick();
    assert_eq!(h.engine.dump_cache_stats(h.zone).tracked, 0);
    assert!(h.engine.check_invariants());
}

#[test]
fn moved_items_are_refiled() {
    let mut h = Harness::new();
    let agent = h.spawn_agent_at(0.0, 0.0);
    h.policies.per_agent.insert(agent, EquipmentPolicy::deny_all());
    let club = h.club_at(10.0, 10.0);
    let item = h.spawn_item(club);
    h.tick();

    let zone = h.zone;
    let event = h.world.move_item(item, zone, Position::new(90.0, 45.0)).unwrap();
    h.send(event);
    h.tick();
    assert_eq!(h.engine.dump_cache_stats(zone).tracked, 1);
    assert!(h.engine.check_invariants());

    // Out of reach now: a permissive policy still finds nothing.
    h.policies.per_agent.clear();
    assert!(h.engine.evaluate_now(&h.world, &h.policies, agent).is_none());
}

#[test]
fn claimed_item_is_not_offered_twice() {
    let mut h = Harness::new();
    let first = h.spawn_agent_at(0.0, 0.0);
    let second = h.spawn_agent_at(1.0, 0.0);
    let club = h.club_at(0.5, 0.0);
    let item = h.spawn_item(club);

    let summary = h.tick();
    assert_eq!(summary.evaluated, 2);
    assert_eq!(summary.dispatched, 1);
    assert_eq!(summary.no_upgrade, 1);
    assert_eq!(h.engine.claims().len(), 1);

    let claimant = h.engine.claims().claimant(item, 1).unwrap();
    assert!(claimant == first || claimant == second);
    assert_eq!(h.executor.started[0].task.agent, claimant);
}

#[test]
fn sidearm_is_the_opposite_class() {
    let mut h = Harness::new();
    let agent = h.spawn_agent_at(0.0, 0.0);
    let club = h.club_at(0.0, 0.0);
    let club = h.spawn_item(club);
    h.arm(agent, club);
    let other_club = h.club_at(2.0, 0.0);
    h.spawn_item(other_club);
    let bow = Item::new(
        ItemDef::ranged(
            "short bow",
            RangedStats {
                damage: 10.0,
                burst_count: 1,
                warmup_secs: 1.0,
                cooldown_secs: 1.5,
                burst_interval_ticks: 0,
                range: 25.0,
            },
        ),
        h.zone,
        Position::new(6.0, 0.0),
    );
    let bow = h.spawn_item(bow);

    let report = h
        .engine
        .evaluate_detailed(&h.world, &h.policies, agent, EquipSlot::Sidearm)
        .unwrap();
    let task = match report.outcome {
        Evaluation::Upgrade(task) => task,
        other => panic!("expected a sidearm upgrade, got {other:?}"),
    };
    assert_eq!(
        task.kind,
        TaskKind::Equip {
            item: bow,
            slot: EquipSlot::Sidearm
        }
    );
    assert_eq!(h.world.item(bow).map(|item| item.def.class), Some(ItemClass::Ranged));

    // Without a primary there is no sidearm slot.
    let unarmed = h.spawn_agent_at(0.0, 0.0);
    let report = h
        .engine
        .evaluate_detailed(&h.world, &h.policies, unarmed, EquipSlot::Sidearm)
        .unwrap();
    assert_eq!(report.outcome, Evaluation::NoUpgrade);
}

#[test]
fn threat_shrinks_the_search_radius() {
    let mut h = Harness::new();
    let agent = h.spawn_agent_at(0.0, 0.0);
    let club = h.club_at(40.0, 0.0);
    h.spawn_item(club);

    let zone = h.zone;
    h.world.set_threatened(zone, true);
    assert!(h.engine.evaluate_now(&h.world, &h.policies, agent).is_none());

    h.world.set_threatened(zone, false);
    assert!(h.engine.evaluate_now(&h.world, &h.policies, agent).is_some());
}

#[test]
fn warming_zone_retries_without_cooldown() {
    let mut config = EngineConfig::default();
    config.index.rebuild_chunk = 1;
    let mut h = Harness::with_config(config);
    h.spawn_agent_at(0.0, 0.0);
    for x in [20.0, 30.0, 40.0] {
        let club = h.club_at(x, 0.0);
        h.spawn_item(club);
    }

    let first = h.tick();
    assert_eq!(first.warming, 1);
    assert_eq!(first.dispatched, 0);

    let mut ticks = 1;
    while h.executor.started.is_empty() {
        let summary = h.tick();
        assert!(summary.warming + summary.dispatched == 1);
        ticks += 1;
        assert!(ticks < 10);
    }
    // The nearest club is chosen once the zone is fully indexed.
    assert_eq!(
        h.world
            .item(h.executor.started[0].task.target())
            .map(|item| item.position.x),
        Some(20.0)
    );
}

#[test]
fn policy_change_forces_reevaluation() {
    let mut h = Harness::new();
    let agent = h.spawn_agent_at(0.0, 0.0);
    let club = h.club_at(0.0, 0.0);
    let club = h.spawn_item(club);
    h.arm(agent, club);

    let summary = h.tick();
    assert_eq!(summary.no_upgrade, 1);
    assert!(h.engine.roster().get(agent).is_some_and(|r| r.no_upgrade_until > 1));
    // The sidearm slot is checked next; nothing after that until the cooldown.
    assert_eq!(h.tick().dispatched, 0);
    assert_eq!(h.tick().evaluated, 0);

    h.policies.per_agent.insert(agent, EquipmentPolicy::deny_all());
    h.send(WorldEvent::PolicyChanged {
        agent: Some(agent),
        zone: None,
    });
    let summary = h.tick();
    assert_eq!(summary.evaluated, 1);
    assert_eq!(summary.dispatched, 1);
}

#[test]
fn despawned_agents_are_forgotten() {
    let mut h = Harness::new();
    let agent = h.spawn_agent_at(0.0, 0.0);
    let club = h.club_at(1.0, 0.0);
    let item = h.spawn_item(club);
    h.tick();
    assert!(h.engine.pending_task(agent).is_some());

    for event in h.world.remove_agent(agent) {
        h.send(event);
    }
    let summary = h.tick();
    assert_eq!(summary.population, 0);
    assert!(h.engine.pending_task(agent).is_none());
    assert!(h.engine.claims().claimant(item, summary.tick).is_none());
}

#[test]
fn notifications_serialize_with_a_kind_tag() {
    let notification = Notification::AutoDropped {
        agent: AgentId::new(),
        item: ItemId::new(),
    };
    let json = serde_json::to_value(&notification).unwrap();
    assert_eq!(json["kind"], "auto_dropped");

    let summary = TickSummary {
        tick: 7,
        ..TickSummary::default()
    };
    let json = serde_json::to_value(&summary).unwrap();
    assert_eq!(json["tick"], 7);
}

#[test]
fn zone_wide_policy_change_rebuilds_the_zone_cache() {
    let mut h = Harness::new();
    let agent = h.spawn_agent_at(0.0, 0.0);
    let club = h.club_at(0.0, 0.0);
    let club = h.spawn_item(club);
    h.arm(agent, club);

    assert_eq!(h.tick().no_upgrade, 1);
    h.tick();
    assert_eq!(h.tick().evaluated, 0);
    assert_eq!(h.engine.dump_cache_stats(h.zone).rebuilds, 1);

    h.send(WorldEvent::PolicyChanged {
        agent: None,
        zone: Some(h.zone),
    });
    let summary = h.tick();
    assert_eq!(summary.evaluated, 1);
    assert_eq!(h.engine.dump_cache_stats(h.zone).rebuilds, 2);
    assert!(h.engine.check_invariants());
}

/// Totals over a few ticks for an agent holding a `held`-power item, with a
/// `candidate`-power item nearby and low-priority work in progress.
fn upgrade_during_work(held: f32, candidate: f32) -> (usize, usize) {
    let scoring = ScoringEngine::empty(-1000.0, 10_000.0).with_factor(Power);
    let engine = UpgradeEngine::new(EngineConfig::default())
        .unwrap()
        .with_scoring(scoring);
    let mut h = Harness::from_engine(engine);
    let agent = h.spawn_agent_at(0.0, 0.0);
    let held = h.powered_at(held, 0.0, 0.0);
    let held = h.spawn_item(held);
    h.arm(agent, held);
    let candidate = h.powered_at(candidate, 2.0, 0.0);
    h.spawn_item(candidate);
    let mut mining = ActivityDescriptor::of_kind("mine");
    mining.work_priority = Some(1);
    h.executor.activities.insert(agent, mining);

    let (mut dispatched, mut deferred) = (0, 0);
    for _ in 0..5 {
        let summary = h.tick();
        dispatched += summary.dispatched;
        deferred += summary.deferred;
    }
    (dispatched, deferred)
}

#[test]
fn small_gain_over_a_negative_score_does_not_interrupt_work() {
    assert_eq!(upgrade_during_work(-20.0, -18.9), (0, 1));
    assert_eq!(upgrade_during_work(-20.0, -15.0), (1, 0));
}

#[test]
fn candidate_cap_counts_only_scored_items() {
    let mut config = EngineConfig::default();
    config.evaluator.candidate_cap = 5;
    let mut h = Harness::with_config(config);
    let agent = h.spawn_agent_at(0.0, 0.0);
    for n in 0..8_u8 {
        let club = h.club_at(1.0, f32::from(n) * 0.1);
        let club = h.spawn_item(club);
        h.world.forbid(club, agent);
    }
    let far = h.club_at(10.0, 0.0);
    let far = h.spawn_item(far);

    let report = h
        .engine
        .evaluate_detailed(&h.world, &h.policies, agent, EquipSlot::Primary)
        .unwrap();
    assert_eq!(report.found, 9);
    assert_eq!(report.rejections.len(), 8);
    assert_eq!(report.scored, 1);
    assert_eq!(report.outcome.task().map(|task| task.target()), Some(far));

    for n in 0..8_u8 {
        let club = h.club_at(12.0, f32::from(n));
        h.spawn_item(club);
    }
    h.tick();
    let report = h
        .engine
        .evaluate_detailed(&h.world, &h.policies, agent, EquipSlot::Primary)
        .unwrap();
    assert_eq!(report.scored, 5);
}

#[test]
fn pending_cap_eviction_releases_the_claim() {
    let mut config = EngineConfig::default();
    config.scheduler.max_records = 2;
    config.scheduler.purge_interval = 1;
    let mut h = Harness::with_config(config);

    let first = h.spawn_agent_at(0.0, 0.0);
    let club = h.club_at(1.0, 0.0);
    let claimed = h.spawn_item(club);
    assert_eq!(h.tick().dispatched, 1);
    assert_eq!(h.engine.claims().claimant(claimed, 1), Some(first));

    // Two drop tasks push the pending table over its cap without claiming.
    for x in [100.0, 200.0] {
        let agent = h.spawn_agent_at(x, 0.0);
        let held = h.club_at(x, 0.0);
        let held = h.spawn_item(held);
        h.arm(agent, held);
        h.policies.per_agent.insert(agent, EquipmentPolicy::deny_all());
        assert_eq!(h.tick().dispatched, 1);
    }
    assert_eq!(h.engine.claims().len(), 1);

    let summary = h.tick();
    assert!(summary.purged);
    assert!(h.engine.pending_task(first).is_none());
    assert!(h.engine.claims().claimant(claimed, summary.tick).is_none());
    assert!(h.engine.claims().is_empty());
}
