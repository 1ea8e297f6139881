//! The [`UpgradeEngine`] facade and its tick cycle.
//!
//! One call to [`UpgradeEngine::tick`] runs four phases in order:
//!
//! 1. Events: drain the event queue into the index, pins, claims and roster.
//! 2. Purge: on the purge interval, reconcile every record with the world
//!    and enforce record caps.
//! 3. Select: walk the roster round-robin and pick up to the population
//!    budget of agents whose primary or sidearm check is due.
//! 4. Evaluate and dispatch: run the evaluator for each picked agent,
//!    consult the interruption policy, and hand tasks to the executor.
//!
//! The engine is the single writer of every cache and record it owns.

use std::collections::BTreeMap;

use quartermaster_index::{Admission, CacheStats, SpatialItemIndex};
use quartermaster_scoring::{
    AgentPredicate, EligibilityFilter, ItemPredicate, ScoreFactor, ScoringEngine,
};
use quartermaster_types::{
    Agent, AgentId, EquipSlot, EquipTask, ItemId, LifeState, PriorityMode, TaskKind, ZoneId,
};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::claims::{ClaimTable, ClaimView};
use crate::clock::TickClock;
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::evaluator::{Evaluation, EvaluationReport, SearchContext, UpgradeEvaluator};
use crate::events::{EventQueue, EventSender, WorldEvent};
use crate::host::{Host, Notification, PolicyProvider, World};
use crate::interruption::{ClassificationOverride, InterruptionPolicy};
use crate::pins::PinTracker;
use crate::roster::Roster;
use crate::scheduler::{DueCheck, TickScheduler};

/// A dispatched task awaiting its outcome.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingTask {
    /// The task as dispatched.
    pub task: EquipTask,
    /// Tick it was handed to the executor.
    pub dispatched_tick: u64,
}

/// What happened during one tick.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TickSummary {
    /// The tick that was executed.
    pub tick: u64,
    /// Events drained from the queue.
    pub events_applied: usize,
    /// Whether the purge pass ran.
    pub purged: bool,
    /// Agents on the roster.
    pub population: usize,
    /// Evaluation budget for this tick.
    pub budget: usize,
    /// Evaluations run.
    pub evaluated: usize,
    /// Tasks accepted by the executor.
    pub dispatched: usize,
    /// Upgrades held back by the interruption policy.
    pub deferred: usize,
    /// Evaluations that found nothing better.
    pub no_upgrade: usize,
    /// Evaluations that hit a zone still being indexed.
    pub warming: usize,
    /// Agents found ineligible.
    pub ineligible: usize,
    /// Agents skipped because of a pin.
    pub pinned: usize,
    /// Tasks refused or failed by the executor.
    pub rejected: usize,
}

fn bump(counter: &mut usize) {
    *counter = counter.saturating_add(1);
}

/// Owns every engine component and drives them tick by tick.
#[derive(Debug)]
pub struct UpgradeEngine {
    config: EngineConfig,
    clock: TickClock,
    index: SpatialItemIndex,
    scoring: ScoringEngine,
    filter: EligibilityFilter,
    evaluator: UpgradeEvaluator,
    interruption: InterruptionPolicy,
    scheduler: TickScheduler,
    roster: Roster,
    pins: PinTracker,
    claims: ClaimTable,
    pending: BTreeMap<AgentId, PendingTask>,
    events: EventQueue,
    last_purge: u64,
    needs_sync: bool,
}

impl UpgradeEngine {
    /// Build an engine with the standard scoring factors.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] if any configuration section is invalid.
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        config.validate()?;
        let scoring = ScoringEngine::standard(&config.scoring)?;
        let index = SpatialItemIndex::new(config.index.clone())?;
        Ok(Self {
            clock: TickClock::new(),
            index,
            scoring,
            filter: EligibilityFilter::new(config.eligibility.clone()),
            evaluator: UpgradeEvaluator::new(config.evaluator.clone()),
            interruption: InterruptionPolicy::new(config.interruption.clone()),
            scheduler: TickScheduler::new(config.scheduler.clone()),
            roster: Roster::new(),
            pins: PinTracker::new(),
            claims: ClaimTable::new(config.scheduler.claim_ttl, config.scheduler.max_records),
            pending: BTreeMap::new(),
            events: EventQueue::new(),
            last_purge: 0,
            needs_sync: true,
            config,
        })
    }

    /// Replace the scoring engine (e.g. one built from custom factors).
    #[must_use]
    pub fn with_scoring(mut self, scoring: ScoringEngine) -> Self {
        self.scoring = scoring;
        self
    }

    /// Append a scoring factor.
    pub fn register_factor(&mut self, factor: Box<dyn ScoreFactor>) {
        self.scoring.register(factor);
    }

    /// Append an item eligibility predicate.
    pub fn register_item_predicate(&mut self, predicate: Box<dyn ItemPredicate>) {
        self.filter.register_item_predicate(predicate);
    }

    /// Append an agent eligibility predicate.
    pub fn register_agent_predicate(&mut self, predicate: Box<dyn AgentPredicate>) {
        self.filter.register_agent_predicate(predicate);
    }

    /// Append an activity classification override.
    pub fn register_classification_override(
        &mut self,
        classifier: Box<dyn ClassificationOverride>,
    ) {
        self.interruption.register_override(classifier);
    }

    /// A handle for pushing world events from anywhere.
    pub fn event_sender(&self) -> EventSender {
        self.events.sender()
    }

    /// Active configuration.
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Last executed tick.
    pub const fn current_tick(&self) -> u64 {
        self.clock.tick()
    }

    /// The scoring engine.
    pub const fn scoring(&self) -> &ScoringEngine {
        &self.scoring
    }

    /// The scheduling roster.
    pub const fn roster(&self) -> &Roster {
        &self.roster
    }

    /// Active pins.
    pub const fn pins(&self) -> &PinTracker {
        &self.pins
    }

    /// Active item claims.
    pub const fn claims(&self) -> &ClaimTable {
        &self.claims
    }

    /// The dispatched task awaiting an outcome for `agent`.
    pub fn pending_task(&self, agent: AgentId) -> Option<&PendingTask> {
        self.pending.get(&agent)
    }

    /// Diagnostic snapshot of one zone's cache.
    pub fn dump_cache_stats(&self, zone: ZoneId) -> CacheStats {
        self.index.stats(zone)
    }

    /// Whether every ready zone satisfies the grid invariants.
    pub fn check_invariants(&self) -> bool {
        let cell_size = self.index.config().cell_size;
        self.index.zones().all(|zone| {
            self.index
                .entry(zone)
                .is_none_or(|entry| entry.check_invariants(cell_size))
        })
    }

    /// Run one tick.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Clock`] if the tick counter would overflow.
    pub fn tick<W: World>(
        &mut self,
        host: &mut Host<'_, W>,
    ) -> Result<TickSummary, EngineError> {
        let tick = self.clock.advance()?;
        let mut summary = TickSummary {
            tick,
            ..TickSummary::default()
        };

        // --- Phase 1: Events ---
        for event in self.events.drain() {
            self.apply_event(host, event, tick, &mut summary);
            bump(&mut summary.events_applied);
        }

        // --- Phase 2: Purge ---
        if self.needs_sync || self.scheduler.purge_due(self.last_purge, tick) {
            self.purge(host.world, tick);
            summary.purged = true;
        }

        // --- Phase 3: Select ---
        let population = self.roster.len();
        let budget = self.scheduler.budget_for(population);
        summary.population = population;
        summary.budget = budget;
        let due = {
            let world = host.world;
            let executor = &*host.executor;
            let pending = &self.pending;
            let scheduler = &self.scheduler;
            self.roster
                .round_robin(scheduler.config().scan_limit, budget, |record| {
                    if pending.contains_key(&record.agent)
                        || executor.is_activity_locked(record.agent)
                    {
                        return None;
                    }
                    let agent = world.agent(record.agent)?;
                    let armed = agent.is_armed();
                    scheduler.due(record, armed, armed, population, tick)
                })
        };

        // --- Phase 4: Evaluate and dispatch ---
        let world = host.world;
        let policies = host.policies;
        for (agent_id, check) in due {
            let Some(agent) = world.agent(agent_id) else {
                continue;
            };
            bump(&mut summary.evaluated);
            let report = self.run_evaluator(world, policies, agent, check, tick);
            self.settle(host, agent, check, report.outcome, tick, &mut summary);
        }

        debug!(
            tick,
            events = summary.events_applied,
            evaluated = summary.evaluated,
            dispatched = summary.dispatched,
            deferred = summary.deferred,
            "Tick complete"
        );
        Ok(summary)
    }

    /// Evaluate `agent` right now, bypassing throttling and cooldowns.
    ///
    /// The agent's zone cache is warmed to completion first. Nothing is
    /// dispatched and no record is touched.
    pub fn evaluate_now<W: World>(
        &mut self,
        world: &W,
        policies: &dyn PolicyProvider,
        agent: AgentId,
    ) -> Option<EquipTask> {
        self.evaluate_detailed(world, policies, agent, EquipSlot::Primary)
            .and_then(|report| report.outcome.task().cloned())
    }

    /// Like [`evaluate_now`](Self::evaluate_now) for either slot, returning
    /// the full report.
    pub fn evaluate_detailed<W: World>(
        &mut self,
        world: &W,
        policies: &dyn PolicyProvider,
        agent: AgentId,
        slot: EquipSlot,
    ) -> Option<EvaluationReport> {
        let agent = world.agent(agent)?;
        let tick = self.clock.tick();
        if let Some(zone) = agent.zone {
            while !self.index.warm(world, &self.filter, zone, tick) {}
        }
        let check = match slot {
            EquipSlot::Primary => DueCheck::Primary,
            EquipSlot::Sidearm => DueCheck::Sidearm,
        };
        Some(self.run_evaluator(world, policies, agent, check, tick))
    }

    fn run_evaluator<W: World>(
        &mut self,
        world: &W,
        policies: &dyn PolicyProvider,
        agent: &Agent,
        check: DueCheck,
        tick: u64,
    ) -> EvaluationReport {
        let view = ClaimView::new(world, &self.claims, tick);
        let ctx = SearchContext {
            world: &view,
            scoring: &self.scoring,
            filter: &self.filter,
            policies,
            pins: &self.pins,
            tick,
        };
        match check {
            DueCheck::Primary => self.evaluator.find_upgrade(&mut self.index, &ctx, agent),
            DueCheck::Sidearm => self.evaluator.find_sidearm(&mut self.index, &ctx, agent),
        }
    }

    /// Turn an evaluation outcome into records, dispatches and counters.
    fn settle<W: World>(
        &mut self,
        host: &mut Host<'_, W>,
        agent: &Agent,
        check: DueCheck,
        outcome: Evaluation,
        tick: u64,
        summary: &mut TickSummary,
    ) {
        match outcome {
            Evaluation::IndexWarming => {
                bump(&mut summary.warming);
                return;
            }
            Evaluation::AgentIneligible(reason) => {
                debug!(tick, agent_id = %agent.id, %reason, "Agent ineligible");
                bump(&mut summary.ineligible);
            }
            Evaluation::Pinned => bump(&mut summary.pinned),
            Evaluation::NoUpgrade => {
                bump(&mut summary.no_upgrade);
                if check == DueCheck::Primary && agent.is_armed() {
                    let cooldown = self.scheduler.no_upgrade_cooldown(summary.population);
                    if let Some(record) = self.roster.get_mut(agent.id) {
                        record.no_upgrade_until = tick.saturating_add(cooldown);
                    }
                }
            }
            Evaluation::Upgrade(task) => {
                let mode = if check == DueCheck::Sidearm {
                    PriorityMode::Queue
                } else {
                    let activity = host.executor.current_activity(agent.id);
                    if !self
                        .interruption
                        .allows(agent, &activity, task.improvement_ratio())
                    {
                        debug!(
                            tick,
                            agent_id = %agent.id,
                            activity = %activity.kind,
                            "Upgrade deferred by current activity"
                        );
                        bump(&mut summary.deferred);
                        self.mark_evaluated(agent.id, check, tick);
                        return;
                    }
                    PriorityMode::Interrupt
                };
                self.dispatch(host, task, mode, tick, summary);
            }
            Evaluation::Drop(task) => {
                self.dispatch(host, task, PriorityMode::Queue, tick, summary);
            }
        }
        self.mark_evaluated(agent.id, check, tick);
    }

    fn mark_evaluated(&mut self, agent: AgentId, check: DueCheck, tick: u64) {
        if let Some(record) = self.roster.get_mut(agent) {
            match check {
                DueCheck::Primary => record.last_evaluated = Some(tick),
                DueCheck::Sidearm => record.last_sidearm_check = Some(tick),
            }
            record.evaluations = record.evaluations.saturating_add(1);
        }
    }

    /// Hand `task` to the executor and record the outcome.
    fn dispatch<W: World>(
        &mut self,
        host: &mut Host<'_, W>,
        task: EquipTask,
        mode: PriorityMode,
        tick: u64,
        summary: &mut TickSummary,
    ) {
        let agent = task.agent;
        let item = task.target();
        if !host.executor.start_task(agent, &task, mode) {
            self.reject(host, agent, item, tick);
            bump(&mut summary.rejected);
            return;
        }
        match task.kind {
            TaskKind::Equip { slot, .. } => {
                self.claims.claim(item, agent, tick);
                info!(
                    tick,
                    agent_id = %agent,
                    item_id = %item,
                    ?slot,
                    ?mode,
                    score = task.score,
                    previous = ?task.previous_item,
                    "Equip task dispatched"
                );
            }
            TaskKind::Drop { .. } => {
                info!(tick, agent_id = %agent, item_id = %item, "Drop task dispatched");
                host.sink.notify(Notification::AutoDropped { agent, item });
            }
        }
        self.pending.insert(
            agent,
            PendingTask {
                task,
                dispatched_tick: tick,
            },
        );
        bump(&mut summary.dispatched);
    }

    /// Back the agent off after the executor refused or failed its task.
    fn reject<W: World>(
        &mut self,
        host: &mut Host<'_, W>,
        agent: AgentId,
        item: ItemId,
        tick: u64,
    ) {
        let backoff_until = self.scheduler.backoff_until(tick);
        if let Some(record) = self.roster.get_mut(agent) {
            record.backoff_until = backoff_until;
        }
        warn!(tick, agent_id = %agent, item_id = %item, backoff_until, "Equip task rejected");
        host.sink.notify(Notification::TaskRejected {
            agent,
            item,
            backoff_until,
        });
    }

    fn apply_event<W: World>(
        &mut self,
        host: &mut Host<'_, W>,
        event: WorldEvent,
        tick: u64,
        summary: &mut TickSummary,
    ) {
        let world = host.world;
        match event {
            WorldEvent::ItemSpawned { item } => {
                if let Some(live) = world.item(item) {
                    self.index.add(live, &self.filter);
                }
            }
            WorldEvent::ItemDespawned { item } => {
                self.index.remove(item);
                self.pins.clear_item(item);
                self.claims.release_item(item);
            }
            WorldEvent::ItemMoved { item, from } => match world.item(item) {
                Some(live) => {
                    self.index.move_item(live, from, live.position, &self.filter);
                }
                None => {
                    self.index.remove(item);
                }
            },
            WorldEvent::ItemHolderChanged { item } => match world.item(item) {
                Some(live) => {
                    if self.pins.observe_holder(item, live.held_by()) {
                        debug!(tick, item_id = %item, "Pinned item left its holder; pin cleared");
                    }
                    if self.filter.admits(live) {
                        self.index.add(live, &self.filter);
                    } else {
                        self.index.remove(item);
                    }
                }
                None => {
                    self.index.remove(item);
                }
            },
            WorldEvent::PolicyChanged { agent, zone } => {
                self.policy_changed(world, agent, zone);
            }
            WorldEvent::AgentSpawned { agent } => {
                let stagger = self.scheduler.stagger_for(agent);
                self.roster.register(agent, stagger, tick);
            }
            WorldEvent::AgentDespawned { agent } => self.forget_agent(agent),
            WorldEvent::PinSet { agent, item } => self.pin(host, agent, item, tick, summary),
            WorldEvent::PinCleared { agent } => {
                self.pins.clear(agent);
                if let Some(record) = self.roster.get_mut(agent) {
                    record.last_evaluated = None;
                    record.no_upgrade_until = 0;
                }
            }
            WorldEvent::TaskCompleted { agent, item } => {
                self.task_completed(host, agent, item, tick);
            }
            WorldEvent::TaskFailed { agent, item } => {
                if self.take_pending(agent, item).is_some() {
                    self.claims.release_item(item);
                    self.reject(host, agent, item, tick);
                    bump(&mut summary.rejected);
                }
            }
        }
    }

    /// Force re-evaluation of every agent the policy change can affect.
    ///
    /// A change not scoped to one agent also drops the affected zone caches.
    fn policy_changed<W: World>(
        &mut self,
        world: &W,
        agent: Option<AgentId>,
        zone: Option<ZoneId>,
    ) {
        match (agent, zone) {
            (Some(_), _) => {}
            (None, Some(zone)) => self.index.invalidate(zone),
            (None, None) => self.index.invalidate_all(),
        }
        let affected: Vec<AgentId> = self
            .roster
            .agents()
            .filter(|id| agent.is_none_or(|target| target == *id))
            .filter(|id| {
                zone.is_none_or(|target| world.agent(*id).is_some_and(|a| a.zone == Some(target)))
            })
            .collect();
        for id in &affected {
            if let Some(record) = self.roster.get_mut(*id) {
                record.last_evaluated = None;
                record.no_upgrade_until = 0;
            }
        }
        debug!(affected = affected.len(), "Equipment policy changed");
    }

    fn pin<W: World>(
        &mut self,
        host: &mut Host<'_, W>,
        agent: AgentId,
        item: ItemId,
        tick: u64,
        summary: &mut TickSummary,
    ) {
        let world = host.world;
        let holder = world.agent(agent);
        let equipped = holder.is_some_and(|a| a.held_item == Some(item));
        self.pins.set(agent, item, equipped, tick);
        info!(tick, agent_id = %agent, item_id = %item, equipped, "Item pinned");
        if let Some(superseded) = self.pending.remove(&agent) {
            self.claims.release_item(superseded.task.target());
        }
        if equipped || world.item(item).is_none() {
            return;
        }
        let Some(holder) = holder else {
            return;
        };
        let task = EquipTask {
            agent,
            kind: TaskKind::Equip {
                item,
                slot: EquipSlot::Primary,
            },
            score: self.scoring.pinned_score(),
            previous_item: holder.held_item,
            previous_score: None,
            auto_generated: false,
            created_tick: tick,
        };
        self.dispatch(host, task, PriorityMode::Interrupt, tick, summary);
    }

    fn task_completed<W: World>(
        &mut self,
        host: &mut Host<'_, W>,
        agent: AgentId,
        item: ItemId,
        tick: u64,
    ) {
        let Some(pending) = self.take_pending(agent, item) else {
            return;
        };
        self.claims.release_item(item);
        if let Some(record) = self.roster.get_mut(agent) {
            record.no_upgrade_until = 0;
        }
        let task = pending.task;
        let TaskKind::Equip { slot, .. } = task.kind else {
            return;
        };
        if !task.auto_generated {
            self.pins.observe_holder(item, Some(agent));
            return;
        }
        let notification = match task.previous_item {
            Some(previous) => Notification::Upgraded {
                agent,
                slot,
                item,
                previous_item: Some(previous),
                score: task.score,
                previous_score: task.previous_score,
            },
            None => Notification::AutoEquipped {
                agent,
                slot,
                item,
                score: task.score,
            },
        };
        debug!(tick, agent_id = %agent, item_id = %item, "Equip task completed");
        host.sink.notify(notification);
    }

    /// Remove the agent's pending task if it targets `item`.
    fn take_pending(&mut self, agent: AgentId, item: ItemId) -> Option<PendingTask> {
        if self
            .pending
            .get(&agent)
            .is_some_and(|pending| pending.task.target() == item)
        {
            self.pending.remove(&agent)
        } else {
            None
        }
    }

    fn forget_agent(&mut self, agent: AgentId) {
        self.roster.unregister(agent);
        self.pins.clear(agent);
        self.claims.release_agent(agent);
        self.pending.remove(&agent);
    }

    /// Reconcile records with the world and enforce caps.
    fn purge<W: World>(&mut self, world: &W, tick: u64) {
        let live: Vec<AgentId> = world
            .agent_ids()
            .into_iter()
            .filter(|id| world.agent(*id).is_some_and(|a| a.life != LifeState::Dead))
            .collect();
        for id in &live {
            if !self.roster.contains(*id) {
                let stagger = self.scheduler.stagger_for(*id);
                self.roster.register(*id, stagger, tick);
            }
        }
        let gone = self.roster.retain(|record| {
            world
                .agent(record.agent)
                .is_some_and(|a| a.life != LifeState::Dead)
        });
        for agent in &gone {
            self.forget_agent(*agent);
        }
        self.roster.compact();

        let expired_claims = self.claims.purge(tick);

        let ttl = self.scheduler.config().pending_task_ttl;
        let stale: Vec<AgentId> = self
            .pending
            .iter()
            .filter(|(_, pending)| tick.saturating_sub(pending.dispatched_tick) >= ttl)
            .map(|(agent, _)| *agent)
            .collect();
        for agent in &stale {
            if let Some(pending) = self.pending.remove(agent) {
                self.claims.release_item(pending.task.target());
            }
        }
        let cap = self.scheduler.config().max_records;
        while self.pending.len() > cap {
            let oldest = self
                .pending
                .iter()
                .min_by_key(|(_, pending)| pending.dispatched_tick)
                .map(|(agent, _)| *agent);
            let Some(agent) = oldest else {
                break;
            };
            if let Some(pending) = self.pending.remove(&agent) {
                self.claims.release_item(pending.task.target());
            }
        }

        self.pins.retain(|agent, pin| {
            world.agent(agent).is_some()
                && world.item(pin.item).is_some_and(|item| !item.destroyed)
        });

        self.last_purge = tick;
        self.needs_sync = false;
        info!(
            tick,
            population = self.roster.len(),
            removed_agents = gone.len(),
            expired_claims,
            stale_tasks = stale.len(),
            pins = self.pins.len(),
            "Purge complete"
        );
    }
}
