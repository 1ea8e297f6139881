//! Per-agent scheduling records.
//!
//! Records live in an arena of slots with a stable index per agent, so the
//! round-robin cursor can walk them without a full scan and despawned agents
//! free their slot for reuse.

use std::collections::BTreeMap;

use quartermaster_types::AgentId;

/// Scheduling state of one agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentRecord {
    /// The agent.
    pub agent: AgentId,
    /// Stable per-agent offset added to every interval.
    pub stagger: u64,
    /// Tick the agent joined the roster.
    pub registered_tick: u64,
    /// Last tick the primary slot was evaluated.
    pub last_evaluated: Option<u64>,
    /// Last tick the sidearm slot was evaluated.
    pub last_sidearm_check: Option<u64>,
    /// No empty-search re-evaluation before this tick.
    pub no_upgrade_until: u64,
    /// No evaluation at all before this tick (executor failure).
    pub backoff_until: u64,
    /// Evaluations performed for this agent.
    pub evaluations: u64,
}

impl AgentRecord {
    fn new(agent: AgentId, stagger: u64, tick: u64) -> Self {
        Self {
            agent,
            stagger,
            registered_tick: tick,
            last_evaluated: None,
            last_sidearm_check: None,
            no_upgrade_until: 0,
            backoff_until: 0,
            evaluations: 0,
        }
    }
}

/// Arena of [`AgentRecord`]s with a round-robin cursor.
#[derive(Debug, Clone, Default)]
pub struct Roster {
    slots: Vec<Option<AgentRecord>>,
    index: BTreeMap<AgentId, usize>,
    free: Vec<usize>,
    cursor: usize,
}

impl Roster {
    /// An empty roster.
    pub const fn new() -> Self {
        Self {
            slots: Vec::new(),
            index: BTreeMap::new(),
            free: Vec::new(),
            cursor: 0,
        }
    }

    /// Number of registered agents.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Whether no agents are registered.
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Whether `agent` is registered.
    pub fn contains(&self, agent: AgentId) -> bool {
        self.index.contains_key(&agent)
    }

    /// Register `agent`. A second call leaves the existing record untouched.
    pub fn register(&mut self, agent: AgentId, stagger: u64, tick: u64) {
        if self.index.contains_key(&agent) {
            return;
        }
        let record = AgentRecord::new(agent, stagger, tick);
        let slot = match self.free.pop() {
            Some(slot) => {
                if let Some(cell) = self.slots.get_mut(slot) {
                    *cell = Some(record);
                }
                slot
            }
            None => {
                self.slots.push(Some(record));
                self.slots.len().saturating_sub(1)
            }
        };
        self.index.insert(agent, slot);
    }

    /// Remove `agent`. Returns its record.
    pub fn unregister(&mut self, agent: AgentId) -> Option<AgentRecord> {
        let slot = self.index.remove(&agent)?;
        let record = self.slots.get_mut(slot).and_then(Option::take);
        self.free.push(slot);
        record
    }

    /// The agent's record.
    pub fn get(&self, agent: AgentId) -> Option<&AgentRecord> {
        let slot = *self.index.get(&agent)?;
        self.slots.get(slot).and_then(Option::as_ref)
    }

    /// The agent's record, mutably.
    pub fn get_mut(&mut self, agent: AgentId) -> Option<&mut AgentRecord> {
        let slot = *self.index.get(&agent)?;
        self.slots.get_mut(slot).and_then(Option::as_mut)
    }

    /// Registered agents in id order.
    pub fn agents(&self) -> impl Iterator<Item = AgentId> + '_ {
        self.index.keys().copied()
    }

    /// Walk the arena from the cursor, offering each record to `pick`.
    ///
    /// Stops after `max_examined` records or once `budget` picks returned
    /// `Some`. The cursor resumes just past the last examined slot on the
    /// next call, so agents skipped for budget are visited first next time.
    pub fn round_robin<T>(
        &mut self,
        max_examined: usize,
        budget: usize,
        mut pick: impl FnMut(&AgentRecord) -> Option<T>,
    ) -> Vec<(AgentId, T)> {
        let mut picked = Vec::new();
        let slot_count = self.slots.len();
        if slot_count == 0 || budget == 0 {
            return picked;
        }
        if self.cursor >= slot_count {
            self.cursor = 0;
        }
        let mut examined = 0usize;
        let mut visited = 0usize;
        while visited < slot_count && examined < max_examined && picked.len() < budget {
            let slot = self.cursor;
            self.cursor = slot.saturating_add(1);
            if self.cursor >= slot_count {
                self.cursor = 0;
            }
            visited = visited.saturating_add(1);
            let Some(Some(record)) = self.slots.get(slot) else {
                continue;
            };
            examined = examined.saturating_add(1);
            if let Some(value) = pick(record) {
                picked.push((record.agent, value));
            }
        }
        picked
    }

    /// Drop records for which `keep` returns `false`. Returns the removed ids.
    pub fn retain(&mut self, mut keep: impl FnMut(&AgentRecord) -> bool) -> Vec<AgentId> {
        let doomed: Vec<AgentId> = self
            .slots
            .iter()
            .flatten()
            .filter(|&record| !keep(record))
            .map(|record| record.agent)
            .collect();
        for agent in &doomed {
            self.unregister(*agent);
        }
        doomed
    }

    /// Compact the arena when more than half of it is free slots.
    pub fn compact(&mut self) {
        if self.free.len() <= self.index.len() {
            return;
        }
        let records: Vec<AgentRecord> = self.slots.drain(..).flatten().collect();
        self.free.clear();
        self.index.clear();
        for (slot, record) in records.into_iter().enumerate() {
            self.index.insert(record.agent, slot);
            self.slots.push(Some(record));
        }
        self.cursor = 0;
    }
}
