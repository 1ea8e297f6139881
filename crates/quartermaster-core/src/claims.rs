//! Exclusive item claims for dispatched tasks.
//!
//! Once a task targeting an item is dispatched, no other agent may be sent
//! after the same item until the task finishes or the claim expires.

use std::collections::BTreeMap;

use quartermaster_index::ItemSource;
use quartermaster_scoring::{EligibilityWorld, ScoringEnvironment};
use quartermaster_types::{Agent, AgentId, Item, ItemId, ZoneId};

use crate::host::World;

/// One exclusive claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Claim {
    /// Claiming agent.
    pub agent: AgentId,
    /// Tick at which the claim lapses.
    pub expires_at: u64,
}

/// Claims keyed by item.
#[derive(Debug, Clone)]
pub struct ClaimTable {
    claims: BTreeMap<ItemId, Claim>,
    ttl: u64,
    max_claims: usize,
}

impl ClaimTable {
    /// An empty table with the given claim lifetime and size cap.
    pub const fn new(ttl: u64, max_claims: usize) -> Self {
        Self {
            claims: BTreeMap::new(),
            ttl,
            max_claims,
        }
    }

    /// Claim `item` for `agent` from `tick`.
    ///
    /// At the size cap the claim expiring soonest is evicted first.
    pub fn claim(&mut self, item: ItemId, agent: AgentId, tick: u64) {
        if !self.claims.contains_key(&item) && self.claims.len() >= self.max_claims {
            let oldest = self
                .claims
                .iter()
                .min_by_key(|(_, claim)| claim.expires_at)
                .map(|(id, _)| *id);
            if let Some(oldest) = oldest {
                self.claims.remove(&oldest);
            }
        }
        self.claims.insert(
            item,
            Claim {
                agent,
                expires_at: tick.saturating_add(self.ttl),
            },
        );
    }

    /// Release the claim on `item`.
    pub fn release_item(&mut self, item: ItemId) -> Option<Claim> {
        self.claims.remove(&item)
    }

    /// Release every claim held by `agent`.
    pub fn release_agent(&mut self, agent: AgentId) {
        self.claims.retain(|_, claim| claim.agent != agent);
    }

    /// Who holds a live claim on `item` at `tick`.
    pub fn claimant(&self, item: ItemId, tick: u64) -> Option<AgentId> {
        self.claims
            .get(&item)
            .filter(|claim| claim.expires_at > tick)
            .map(|claim| claim.agent)
    }

    /// Drop expired claims. Returns how many were dropped.
    pub fn purge(&mut self, tick: u64) -> usize {
        let before = self.claims.len();
        self.claims.retain(|_, claim| claim.expires_at > tick);
        before.saturating_sub(self.claims.len())
    }

    /// Number of stored claims (live or not yet purged).
    pub fn len(&self) -> usize {
        self.claims.len()
    }

    /// Whether no claims are stored.
    pub fn is_empty(&self) -> bool {
        self.claims.is_empty()
    }
}

/// A world view whose claim lookup consults the engine's [`ClaimTable`].
///
/// Every other query is forwarded to the wrapped world.
pub struct ClaimView<'a, W: World> {
    world: &'a W,
    claims: &'a ClaimTable,
    tick: u64,
}

impl<'a, W: World> ClaimView<'a, W> {
    /// Wrap `world` with the claims live at `tick`.
    pub const fn new(world: &'a W, claims: &'a ClaimTable, tick: u64) -> Self {
        Self {
            world,
            claims,
            tick,
        }
    }

    /// The wrapped world.
    pub const fn inner(&self) -> &'a W {
        self.world
    }
}

impl<W: World> EligibilityWorld for ClaimView<'_, W> {
    fn is_forbidden(&self, item: &Item, agent: &Agent) -> bool {
        self.world.is_forbidden(item, agent)
    }

    fn research_complete(&self, project: &str) -> bool {
        self.world.research_complete(project)
    }

    fn can_reach(&self, agent: &Agent, item: &Item) -> bool {
        self.world.can_reach(agent, item)
    }

    fn can_reserve(&self, agent: &Agent, item: &Item) -> bool {
        self.world.can_reserve(agent, item)
    }

    fn claimant(&self, item: ItemId) -> Option<AgentId> {
        self.claims
            .claimant(item, self.tick)
            .or_else(|| self.world.claimant(item))
    }
}

impl<W: World> ItemSource for ClaimView<'_, W> {
    fn item(&self, id: ItemId) -> Option<&Item> {
        self.world.item(id)
    }

    fn items_in_zone(&self, zone: ZoneId) -> Vec<ItemId> {
        self.world.items_in_zone(zone)
    }
}

impl<W: World> ScoringEnvironment for ClaimView<'_, W> {
    fn ammo_available(&self, agent: &Agent, ammo_kind: &str) -> Option<u32> {
        self.world.ammo_available(agent, ammo_kind)
    }
}
