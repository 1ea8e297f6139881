//! Evaluation, scheduling, and orchestration for the Quartermaster
//! equipment-upgrade engine.
//!
//! This crate ties the spatial index and the scoring engine into a
//! tick-driven service. [`UpgradeEngine`] owns every cache and record, drains
//! world events at the start of each tick, picks a population-scaled budget
//! of due agents, and dispatches equip tasks to the host.
//!
//! # Modules
//!
//! - [`clock`] -- Monotonic tick counter.
//! - [`config`] -- Configuration loading from `quartermaster.yaml` into
//!   strongly-typed structs.
//! - [`host`] -- [`World`], [`TaskExecutor`], [`PolicyProvider`], and
//!   [`NotificationSink`] seams to the host simulation.
//! - [`events`] -- [`WorldEvent`] and the queue that serializes them.
//! - [`pins`] -- Forced item assignments.
//! - [`claims`] -- Exclusive item claims for dispatched tasks.
//! - [`roster`] -- Arena of per-agent scheduling records.
//! - [`scheduler`] -- Budget, interval, stagger, and cooldown rules.
//! - [`interruption`] -- Activity classification and the interrupt decision.
//! - [`evaluator`] -- [`UpgradeEvaluator`]: best candidate over the threshold.
//! - [`engine`] -- [`UpgradeEngine`]: the tick cycle and diagnostics.
//! - [`memory`] -- In-memory host implementations for tests and soak runs.
//! - [`error`] -- [`EngineError`].

pub mod claims;
pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod evaluator;
pub mod events;
pub mod host;
pub mod interruption;
pub mod memory;
pub mod pins;
pub mod roster;
pub mod scheduler;

// Re-export primary types at crate root.
pub use claims::{ClaimTable, ClaimView};
pub use clock::{ClockError, TickClock};
pub use config::{ConfigError, EngineConfig};
pub use engine::{PendingTask, TickSummary, UpgradeEngine};
pub use error::EngineError;
pub use evaluator::{Evaluation, EvaluationReport, UpgradeEvaluator};
pub use events::{EventSender, WorldEvent};
pub use host::{
    Host, Notification, NotificationSink, NullSink, PolicyProvider, TaskExecutor, TracingSink,
    World,
};
pub use interruption::{ActivityClassifier, ClassificationOverride, InterruptionPolicy};
pub use memory::{InMemoryWorld, RecordingExecutor, RecordingSink, StaticPolicies};
