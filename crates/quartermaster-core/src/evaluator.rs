//! The Upgrade Evaluator.
//!
//! Given one agent, find the best nearby item that clears the improvement
//! threshold and describe the task that would equip it. The evaluator reads
//! the world and mutates only the spatial index (through its self-healing
//! queries); cooldowns and dispatch belong to the engine.

use std::cmp::Ordering;

use quartermaster_index::{ItemSource, SpatialItemIndex};
use quartermaster_scoring::{AgentRejection, EligibilityFilter, ItemRejection, ScoringEngine};
use quartermaster_types::{Agent, EquipSlot, EquipTask, EquipmentPolicy, Item, ItemId, TaskKind};
use serde::Serialize;
use tracing::debug;

use crate::claims::ClaimView;
use crate::config::EvaluatorConfig;
use crate::host::{PolicyProvider, World};
use crate::pins::PinTracker;

/// Outcome of evaluating one agent.
#[derive(Debug, Clone, PartialEq)]
pub enum Evaluation {
    /// Equip a better item.
    Upgrade(EquipTask),
    /// Drop a held item the policy no longer allows.
    Drop(EquipTask),
    /// Nothing beats what the agent has.
    NoUpgrade,
    /// The agent's item is pinned.
    Pinned,
    /// The agent may not auto-equip right now.
    AgentIneligible(AgentRejection),
    /// The agent's zone cache is still being built.
    IndexWarming,
}

impl Evaluation {
    /// The task to dispatch, if any.
    pub const fn task(&self) -> Option<&EquipTask> {
        match self {
            Self::Upgrade(task) | Self::Drop(task) => Some(task),
            _ => None,
        }
    }
}

/// One candidate that failed eligibility, kept for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CandidateRejection {
    /// The item.
    pub item: ItemId,
    /// Why it was excluded.
    pub reason: ItemRejection,
}

/// Full record of one evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationReport {
    /// The decision.
    pub outcome: Evaluation,
    /// Score of the item currently in the slot, if it counts as held. A
    /// pinned item reports the fixed pinned score.
    pub current_score: Option<f32>,
    /// Items returned by the index query.
    pub found: usize,
    /// Items that passed eligibility and were scored; at most the candidate cap.
    pub scored: usize,
    /// Candidates excluded by eligibility checks.
    pub rejections: Vec<CandidateRejection>,
}

impl EvaluationReport {
    fn decided(outcome: Evaluation) -> Self {
        Self {
            outcome,
            current_score: None,
            found: 0,
            scored: 0,
            rejections: Vec::new(),
        }
    }
}

/// Read-only inputs shared by every evaluation in a tick.
pub struct SearchContext<'a, W: World> {
    /// World view with engine claims applied.
    pub world: &'a ClaimView<'a, W>,
    /// Scoring engine.
    pub scoring: &'a ScoringEngine,
    /// Eligibility filter; also the index admission predicate.
    pub filter: &'a EligibilityFilter,
    /// Equipment policies.
    pub policies: &'a dyn PolicyProvider,
    /// Forced assignments.
    pub pins: &'a PinTracker,
    /// Current tick.
    pub tick: u64,
}

/// Score of the item currently in a slot.
#[derive(Debug, Clone, Copy)]
struct Current {
    item: Option<ItemId>,
    /// `None` when the slot is empty or its item does not count (disqualified).
    score: Option<f32>,
    /// The held item is rejected by the agent's policy.
    disallowed: bool,
}

/// Finds upgrades for single agents.
#[derive(Debug, Clone)]
pub struct UpgradeEvaluator {
    config: EvaluatorConfig,
}

impl UpgradeEvaluator {
    /// Build from config.
    pub const fn new(config: EvaluatorConfig) -> Self {
        Self { config }
    }

    /// Active configuration.
    pub const fn config(&self) -> &EvaluatorConfig {
        &self.config
    }

    /// Lowest score that does not beat `current`.
    ///
    /// An empty slot accepts any positive score. Otherwise the candidate must
    /// exceed `current * margin`; for non-positive scores the margin is
    /// applied to the magnitude so the bar still rises.
    pub fn threshold(&self, current: Option<f32>) -> f32 {
        let margin = self.config.upgrade_margin;
        match current {
            None => 0.0,
            Some(score) if score > 0.0 => score * margin,
            Some(score) => score.abs().mul_add(margin - 1.0, score),
        }
    }

    /// Whether `candidate` is a strict improvement over `current`.
    pub fn beats(&self, candidate: f32, current: Option<f32>) -> bool {
        candidate > self.threshold(current)
    }

    /// Evaluate the agent's primary slot.
    pub fn find_upgrade<W: World>(
        &self,
        index: &mut SpatialItemIndex,
        ctx: &SearchContext<'_, W>,
        agent: &Agent,
    ) -> EvaluationReport {
        self.evaluate(index, ctx, agent, EquipSlot::Primary)
    }

    /// Evaluate the agent's sidearm slot.
    ///
    /// Sidearms are items of the class opposite to the held primary. Agents
    /// without a primary have no sidearm slot.
    pub fn find_sidearm<W: World>(
        &self,
        index: &mut SpatialItemIndex,
        ctx: &SearchContext<'_, W>,
        agent: &Agent,
    ) -> EvaluationReport {
        self.evaluate(index, ctx, agent, EquipSlot::Sidearm)
    }

    fn evaluate<W: World>(
        &self,
        index: &mut SpatialItemIndex,
        ctx: &SearchContext<'_, W>,
        agent: &Agent,
        slot: EquipSlot,
    ) -> EvaluationReport {
        if let Err(reason) = ctx.filter.validate_agent(agent) {
            return EvaluationReport::decided(Evaluation::AgentIneligible(reason));
        }
        if let Some(pin) = ctx.pins.get(agent.id) {
            let mut report = EvaluationReport::decided(Evaluation::Pinned);
            let slot_item = match slot {
                EquipSlot::Primary => agent.held_item,
                EquipSlot::Sidearm => agent.sidearm,
            };
            report.current_score =
                (slot_item == Some(pin.item)).then_some(ctx.scoring.pinned_score());
            return report;
        }
        let Some(zone) = agent.zone else {
            return EvaluationReport::decided(Evaluation::AgentIneligible(
                AgentRejection::InTransit,
            ));
        };
        let policy = ctx.policies.policy_for(agent.id);

        let wanted_class = match slot {
            EquipSlot::Primary => None,
            EquipSlot::Sidearm => {
                let primary = agent.held_item.and_then(|id| ctx.world.item(id));
                match primary {
                    Some(item) => Some(item.def.class.opposite()),
                    None => return EvaluationReport::decided(Evaluation::NoUpgrade),
                }
            }
        };
        let slot_item = match slot {
            EquipSlot::Primary => agent.held_item,
            EquipSlot::Sidearm => agent.sidearm,
        };
        let current = Self::current(ctx, agent, policy, slot_item);

        let radius = if ctx.world.inner().zone_under_threat(zone) {
            self.config.threatened_radius
        } else {
            self.config.search_radius
        };
        let found = index.query_radius(
            ctx.world,
            ctx.filter,
            zone,
            agent.position,
            radius,
            ctx.tick,
        );
        if !index.is_ready(zone) {
            return EvaluationReport::decided(Evaluation::IndexWarming);
        }

        let mut candidates: Vec<&Item> = found
            .iter()
            .filter_map(|id| ctx.world.item(*id))
            .filter(|item| Some(item.id) != agent.held_item && Some(item.id) != agent.sidearm)
            .filter(|item| wanted_class.is_none_or(|class| item.def.class == class))
            .collect();
        candidates.sort_by(|a, b| {
            a.position
                .distance_sq(agent.position)
                .total_cmp(&b.position.distance_sq(agent.position))
                .then_with(|| a.id.cmp(&b.id))
        });

        let mut report = EvaluationReport {
            outcome: Evaluation::NoUpgrade,
            current_score: current.score,
            found: found.len(),
            scored: 0,
            rejections: Vec::new(),
        };

        let mut best: Option<(ItemId, f32)> = None;
        for item in candidates {
            if report.scored >= self.config.candidate_cap {
                break;
            }
            if let Err(reason) = ctx.filter.validate_item(item, agent, policy, ctx.world) {
                report.rejections.push(CandidateRejection {
                    item: item.id,
                    reason,
                });
                continue;
            }
            report.scored = report.scored.saturating_add(1);
            let score = ctx.scoring.score(agent, item, policy, ctx.world);
            if ctx.scoring.is_disqualified(score) || !self.beats(score, current.score) {
                continue;
            }
            let better = best.is_none_or(|(_, top)| score.total_cmp(&top) == Ordering::Greater);
            if better {
                best = Some((item.id, score));
            }
        }

        report.outcome = match best {
            Some((item, score)) if Self::still_valid(ctx, agent, policy, item) => {
                debug!(
                    tick = ctx.tick,
                    agent_id = %agent.id,
                    item_id = %item,
                    score,
                    current = ?current.score,
                    ?slot,
                    "Upgrade found"
                );
                Evaluation::Upgrade(EquipTask {
                    agent: agent.id,
                    kind: TaskKind::Equip { item, slot },
                    score,
                    previous_item: current.item,
                    previous_score: current.score,
                    auto_generated: true,
                    created_tick: ctx.tick,
                })
            }
            Some((item, _)) => {
                debug!(agent_id = %agent.id, item_id = %item, "Best candidate vanished");
                Evaluation::NoUpgrade
            }
            None => Self::drop_or_nothing(ctx, agent, slot, current),
        };
        report
    }

    fn current<W: World>(
        ctx: &SearchContext<'_, W>,
        agent: &Agent,
        policy: &EquipmentPolicy,
        slot_item: Option<ItemId>,
    ) -> Current {
        let Some(item) = slot_item.and_then(|id| ctx.world.item(id)) else {
            return Current {
                item: slot_item,
                score: None,
                disallowed: false,
            };
        };
        let disallowed = !ctx.policies.allows(policy, item.def.kind);
        let score = ctx.scoring.score(agent, item, policy, ctx.world);
        Current {
            item: Some(item.id),
            score: (!disallowed && !ctx.scoring.is_disqualified(score)).then_some(score),
            disallowed,
        }
    }

    /// Re-read a chosen candidate right before handing out the task.
    fn still_valid<W: World>(
        ctx: &SearchContext<'_, W>,
        agent: &Agent,
        policy: &EquipmentPolicy,
        item: ItemId,
    ) -> bool {
        ctx.world.item(item).is_some_and(|live| {
            !live.destroyed
                && ctx
                    .filter
                    .validate_item(live, agent, policy, ctx.world)
                    .is_ok()
        })
    }

    fn drop_or_nothing<W: World>(
        ctx: &SearchContext<'_, W>,
        agent: &Agent,
        slot: EquipSlot,
        current: Current,
    ) -> Evaluation {
        let droppable = slot == EquipSlot::Primary && current.disallowed;
        let Some(item) = current.item.filter(|_| droppable) else {
            return Evaluation::NoUpgrade;
        };
        if ctx.world.item(item).is_some_and(|live| live.quest_bound) {
            return Evaluation::NoUpgrade;
        }
        debug!(agent_id = %agent.id, item_id = %item, "Held item disallowed; dropping");
        Evaluation::Drop(EquipTask {
            agent: agent.id,
            kind: TaskKind::Drop { item },
            score: 0.0,
            previous_item: Some(item),
            previous_score: None,
            auto_generated: true,
            created_tick: ctx.tick,
        })
    }
}
