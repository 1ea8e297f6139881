//! Soak harness for the Quartermaster upgrade engine.
//!
//! Drives [`UpgradeEngine`] against a seeded synthetic world for a fixed
//! number of ticks: tasks the engine starts are applied back into the world
//! after a delay, items spawn, move and despawn at random, and agents switch
//! activities. There is no user interface and no command-line arguments.
//!
//! # Startup Sequence
//!
//! 1. Load engine configuration from `QUARTERMASTER_CONFIG` or
//!    `quartermaster.yaml`
//! 2. Initialize structured logging (tracing)
//! 3. Load the harness's `sim` section
//! 4. Build the engine and generate the world
//! 5. Run the tick loop
//! 6. Log final cache statistics

mod config;
mod error;
mod world;

use std::path::{Path, PathBuf};

use quartermaster_core::{
    EngineConfig, EventSender, Host, Notification, NotificationSink, RecordingExecutor,
    TickSummary, TracingSink, UpgradeEngine, WorldEvent,
};
use quartermaster_types::EquipTask;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::HarnessConfig;
use crate::error::SimError;
use crate::world::SimWorld;

/// Environment variable naming the config file.
const CONFIG_PATH_ENV: &str = "QUARTERMASTER_CONFIG";

/// Config file used when `QUARTERMASTER_CONFIG` is unset.
const DEFAULT_CONFIG_PATH: &str = "quartermaster.yaml";

/// A started task waiting for the world to carry it out.
#[derive(Debug)]
struct InFlight {
    finish_at: u64,
    task: EquipTask,
}

/// Counts notifications by kind and forwards them to tracing.
#[derive(Debug, Default)]
struct Tally {
    inner: TracingSink,
    upgraded: u64,
    auto_equipped: u64,
    auto_dropped: u64,
    rejected: u64,
}

impl NotificationSink for Tally {
    fn notify(&mut self, notification: Notification) {
        let counter = match notification {
            Notification::Upgraded { .. } => &mut self.upgraded,
            Notification::AutoEquipped { .. } => &mut self.auto_equipped,
            Notification::AutoDropped { .. } => &mut self.auto_dropped,
            Notification::TaskRejected { .. } => &mut self.rejected,
        };
        *counter = counter.saturating_add(1);
        self.inner.notify(notification);
    }
}

/// Tick summaries summed over one report window.
#[derive(Debug, Default)]
struct Window {
    ticks: u64,
    evaluated: usize,
    dispatched: usize,
    deferred: usize,
    no_upgrade: usize,
    warming: usize,
    ineligible: usize,
    pinned: usize,
    rejected: usize,
}

impl Window {
    fn record(&mut self, summary: &TickSummary) {
        self.ticks = self.ticks.saturating_add(1);
        self.evaluated = self.evaluated.saturating_add(summary.evaluated);
        self.dispatched = self.dispatched.saturating_add(summary.dispatched);
        self.deferred = self.deferred.saturating_add(summary.deferred);
        self.no_upgrade = self.no_upgrade.saturating_add(summary.no_upgrade);
        self.warming = self.warming.saturating_add(summary.warming);
        self.ineligible = self.ineligible.saturating_add(summary.ineligible);
        self.pinned = self.pinned.saturating_add(summary.pinned);
        self.rejected = self.rejected.saturating_add(summary.rejected);
    }
}

/// Application entry point for the soak harness.
///
/// # Errors
///
/// Returns an error if configuration is invalid, logging cannot be
/// installed, or the engine fails a tick or its grid invariants.
#[allow(clippy::too_many_lines)]
fn main() -> Result<(), SimError> {
    // 1. Load engine configuration.
    let config_path = config_path();
    let config = load_config(&config_path)?;

    // 2. Initialize structured logging.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .map_err(|e| SimError::Logging {
            message: format!("{e}"),
        })?;

    info!(path = %config_path.display(), "quartermaster-sim starting");

    // 3. Load harness configuration.
    let harness = HarnessConfig::load(&config_path)?;
    info!(
        seed = harness.seed,
        ticks = harness.ticks,
        zones = harness.zones,
        agents_per_zone = harness.agents_per_zone,
        items_per_zone = harness.items_per_zone,
        "Harness configuration loaded"
    );

    // 4. Build the engine and the world.
    let mut engine = UpgradeEngine::new(config)?;
    let events = engine.event_sender();
    let mut rng = StdRng::seed_from_u64(harness.seed);
    let (mut sim, policies, spawned) = SimWorld::generate(&harness, &mut rng);
    info!(
        agents = sim.agent_ids().len(),
        items = sim.world.item_count(),
        "World generated"
    );
    push_all(&events, spawned);

    // 5. Run the tick loop.
    let mut executor = RecordingExecutor::new();
    let mut sink = Tally::default();
    let mut in_flight: Vec<InFlight> = Vec::new();
    let mut window = Window::default();

    for _ in 0..harness.ticks {
        executor.accept = !rng.random_bool(harness.reject_chance);
        let summary = {
            let mut host = Host {
                world: &sim.world,
                executor: &mut executor,
                policies: &policies,
                sink: &mut sink,
            };
            engine.tick(&mut host)?
        };
        window.record(&summary);

        let tick = summary.tick;
        in_flight.extend(executor.take_started().into_iter().map(|started| InFlight {
            finish_at: tick.saturating_add(harness.task_latency),
            task: started.task,
        }));
        let (due, waiting): (Vec<InFlight>, Vec<InFlight>) = in_flight
            .into_iter()
            .partition(|flight| flight.finish_at <= tick);
        in_flight = waiting;
        for flight in due {
            finish(&mut sim, &events, &mut rng, harness.failure_chance, &flight.task);
        }

        push_all(&events, sim.churn(&mut rng, &harness));
        sim.shuffle_activities(&mut rng, &mut executor, harness.activity_change_chance);

        if tick.checked_rem(harness.report_every) == Some(0) {
            report(&engine, &window, &sink, summary.population, in_flight.len(), tick);
            window = Window::default();
            if !engine.check_invariants() {
                return Err(SimError::Invariant { tick });
            }
        }
    }

    // 6. Log final cache statistics.
    for zone in &sim.zones {
        let stats = engine.dump_cache_stats(*zone);
        info!(
            %zone,
            ready = stats.ready,
            tracked = stats.tracked,
            cells = stats.cells,
            revision = stats.revision,
            queries = stats.queries,
            stale_evictions = stats.stale_evictions,
            dropped_at_cap = stats.dropped_at_cap,
            rebuilds = stats.rebuilds,
            "Zone cache"
        );
    }
    if !engine.check_invariants() {
        return Err(SimError::Invariant {
            tick: engine.current_tick(),
        });
    }
    info!(
        ticks = engine.current_tick(),
        upgraded = sink.upgraded,
        auto_equipped = sink.auto_equipped,
        auto_dropped = sink.auto_dropped,
        rejected = sink.rejected,
        "quartermaster-sim finished"
    );
    Ok(())
}

/// The config file named by `QUARTERMASTER_CONFIG`, or the default.
fn config_path() -> PathBuf {
    std::env::var_os(CONFIG_PATH_ENV)
        .map_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from)
}

/// Load engine configuration, using defaults when the file is missing.
fn load_config(path: &Path) -> Result<EngineConfig, SimError> {
    if path.exists() {
        Ok(EngineConfig::from_file(path)?)
    } else {
        let mut config = EngineConfig::default();
        config.logging.apply_env_overrides();
        Ok(config)
    }
}

fn push_all(events: &EventSender, batch: impl IntoIterator<Item = WorldEvent>) {
    for event in batch {
        if !events.send(event) {
            warn!(?event, "Event queue closed; event dropped");
        }
    }
}

/// Carry out (or fail) one task in the world and report the outcome.
fn finish(
    sim: &mut SimWorld,
    events: &EventSender,
    rng: &mut StdRng,
    failure_chance: f64,
    task: &EquipTask,
) {
    let outcome = if rng.random_bool(failure_chance) {
        WorldEvent::TaskFailed {
            agent: task.agent,
            item: task.target(),
        }
    } else {
        push_all(events, sim.world.apply_task(task));
        WorldEvent::TaskCompleted {
            agent: task.agent,
            item: task.target(),
        }
    };
    push_all(events, [outcome]);
}

fn report(
    engine: &UpgradeEngine,
    window: &Window,
    sink: &Tally,
    population: usize,
    in_flight: usize,
    tick: u64,
) {
    info!(
        tick,
        window_ticks = window.ticks,
        population,
        evaluated = window.evaluated,
        dispatched = window.dispatched,
        deferred = window.deferred,
        no_upgrade = window.no_upgrade,
        warming = window.warming,
        ineligible = window.ineligible,
        pinned = window.pinned,
        rejected = window.rejected,
        in_flight,
        claims = engine.claims().len(),
        pins = engine.pins().len(),
        upgraded_total = sink.upgraded,
        auto_equipped_total = sink.auto_equipped,
        "Soak progress"
    );
}
