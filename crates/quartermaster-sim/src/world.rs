//! Seeded synthetic world for the soak harness.
//!
//! Zones are square areas filled with agents and items drawn from a fixed
//! catalogue. Between ticks [`SimWorld::churn`] spawns, moves and despawns
//! items the way a busy host would, returning the events to push.

use quartermaster_core::{InMemoryWorld, RecordingExecutor, StaticPolicies, World, WorldEvent};
use quartermaster_index::ItemSource;
use quartermaster_types::{
    ActivityDescriptor, Agent, AgentId, AgentRole, AgentTrait, EquipmentPolicy, Holder, Item,
    ItemClass, ItemDef, ItemId, Position, QualityTier, RangedStats, SkillCategory, ZoneId,
};
use rand::Rng;
use rand::rngs::StdRng;

use crate::config::HarnessConfig;

/// Activities the harness assigns, with the work tier used for ordinary jobs.
const ACTIVITIES: &[(&str, Option<u8>)] = &[
    ("idle", None),
    ("wander", None),
    ("haul", None),
    ("mine", Some(2)),
    ("construct", Some(3)),
    ("cook", Some(4)),
    ("combat", None),
    ("surgery", None),
];

/// Every item definition the harness can spawn.
#[derive(Debug, Clone)]
pub struct Catalogue {
    defs: Vec<ItemDef>,
}

impl Catalogue {
    /// A small mixed armoury.
    pub fn standard() -> Self {
        let ranged = |label: &str, damage, burst_count, warmup_secs, cooldown_secs, range| {
            ItemDef::ranged(
                label,
                RangedStats {
                    damage,
                    burst_count,
                    warmup_secs,
                    cooldown_secs,
                    burst_interval_ticks: 8,
                    range,
                },
            )
        };
        Self {
            defs: vec![
                ItemDef::melee("knife", 6.0, 1.0),
                ItemDef::melee("club", 8.0, 2.0),
                ItemDef::melee("spear", 11.0, 1.8),
                ItemDef::melee("mace", 12.0, 2.4),
                ranged("short bow", 10.0, 1, 1.0, 1.5, 25.0),
                ranged("rifle", 18.0, 1, 1.5, 1.7, 36.0),
                ranged("machine pistol", 7.0, 3, 0.6, 1.2, 20.0),
            ],
        }
    }

    /// Policy that only admits the catalogue's melee items.
    pub fn melee_only(&self) -> EquipmentPolicy {
        EquipmentPolicy::only(
            self.defs
                .iter()
                .filter(|def| def.class == ItemClass::Melee)
                .map(|def| def.kind),
        )
    }

    fn pick(&self, rng: &mut StdRng) -> Option<&ItemDef> {
        if self.defs.is_empty() {
            return None;
        }
        self.defs.get(rng.random_range(0..self.defs.len()))
    }
}

/// The world plus everything needed to keep it changing.
#[derive(Debug)]
pub struct SimWorld {
    /// The live world handed to the engine.
    pub world: InMemoryWorld,
    /// Every zone, in creation order.
    pub zones: Vec<ZoneId>,
    catalogue: Catalogue,
    zone_size: u16,
}

impl SimWorld {
    /// Build the starting world. Returns the world, the agents' policies,
    /// and the spawn events to push before the first tick.
    pub fn generate(
        config: &HarnessConfig,
        rng: &mut StdRng,
    ) -> (Self, StaticPolicies, Vec<WorldEvent>) {
        let mut sim = Self {
            world: InMemoryWorld::new(),
            zones: (0..config.zones).map(|_| ZoneId::new()).collect(),
            catalogue: Catalogue::standard(),
            zone_size: config.zone_size,
        };
        let mut policies = StaticPolicies::allow_all();
        let mut events = Vec::new();

        for zone in sim.zones.clone() {
            for n in 0..config.agents_per_zone {
                let agent = sim.random_agent(rng, zone);
                if n.checked_rem(4) == Some(3) {
                    policies.per_agent.insert(agent.id, sim.catalogue.melee_only());
                }
                events.push(sim.world.add_agent(agent));
            }
            for _ in 0..config.items_per_zone {
                if let Some(item) = sim.random_item(rng, zone) {
                    events.push(sim.world.add_item(item));
                }
            }
        }
        (sim, policies, events)
    }

    /// Random item spawns, moves and despawns for one tick.
    pub fn churn(&mut self, rng: &mut StdRng, config: &HarnessConfig) -> Vec<WorldEvent> {
        let mut events = Vec::new();
        if rng.random_bool(config.spawn_chance)
            && let Some(zone) = self.random_zone(rng)
            && let Some(item) = self.random_item(rng, zone)
        {
            events.push(self.world.add_item(item));
        }
        if rng.random_bool(config.move_chance)
            && let Some(id) = self.random_loose_item(rng)
            && let Some(zone) = self.random_zone(rng)
        {
            let to = self.random_position(rng);
            events.extend(self.world.move_item(id, zone, to));
        }
        if rng.random_bool(config.despawn_chance)
            && let Some(id) = self.random_loose_item(rng)
        {
            events.extend(self.world.remove_item(id));
        }
        events
    }

    /// Give some agents a new activity.
    pub fn shuffle_activities(
        &self,
        rng: &mut StdRng,
        executor: &mut RecordingExecutor,
        chance: f64,
    ) {
        for agent in self.world.agent_ids() {
            if !rng.random_bool(chance) {
                continue;
            }
            let Some(&(kind, work_priority)) =
                ACTIVITIES.get(rng.random_range(0..ACTIVITIES.len()))
            else {
                continue;
            };
            let mut activity = ActivityDescriptor::of_kind(kind);
            activity.work_priority = work_priority;
            executor.activities.insert(agent, activity);
        }
    }

    fn random_zone(&self, rng: &mut StdRng) -> Option<ZoneId> {
        if self.zones.is_empty() {
            return None;
        }
        self.zones.get(rng.random_range(0..self.zones.len())).copied()
    }

    fn random_position(&self, rng: &mut StdRng) -> Position {
        let mut coord = || f32::from(rng.random_range(0..self.zone_size)) + rng.random::<f32>();
        let x = coord();
        let y = coord();
        Position::new(x, y)
    }

    fn random_agent(&self, rng: &mut StdRng, zone: ZoneId) -> Agent {
        let mut agent = Agent::new(zone, self.random_position(rng));
        agent
            .skills
            .insert(SkillCategory::Melee, rng.random_range(0..=20));
        agent
            .skills
            .insert(SkillCategory::Shooting, rng.random_range(0..=20));
        match rng.random_range(0..10) {
            0 => {
                agent.traits.insert(AgentTrait::Brawler);
            }
            1 => {
                agent.traits.insert(AgentTrait::TriggerHappy);
            }
            2 => {
                agent.traits.insert(AgentTrait::CarefulShooter);
            }
            3 => agent.role = AgentRole::Hunter,
            _ => {}
        }
        agent.low_priority_threshold = rng.random_range(2..=4);
        agent
    }

    fn random_item(&self, rng: &mut StdRng, zone: ZoneId) -> Option<Item> {
        let def = self.catalogue.pick(rng)?.clone();
        let mut item = Item::new(def, zone, self.random_position(rng));
        item.quality = QualityTier::ALL
            .get(rng.random_range(0..QualityTier::ALL.len()))
            .copied()
            .unwrap_or_default();
        item.hit_points = rng.random_range(20..=item.max_hit_points.max(20));
        Some(item)
    }

    /// A random item lying on the ground.
    fn random_loose_item(&self, rng: &mut StdRng) -> Option<ItemId> {
        let loose: Vec<ItemId> = self
            .world
            .item_ids()
            .into_iter()
            .filter(|id| {
                self.world
                    .item(*id)
                    .is_some_and(|item| item.holder == Holder::OnGround)
            })
            .collect();
        if loose.is_empty() {
            return None;
        }
        loose.get(rng.random_range(0..loose.len())).copied()
    }

    /// Agent ids in the world.
    pub fn agent_ids(&self) -> Vec<AgentId> {
        self.world.agent_ids()
    }
}
