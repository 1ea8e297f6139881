//! Per-zone spatial index of equippable items for the Quartermaster engine.
//!
//! Each zone keeps a uniform grid keyed by integer cell coordinates. Caches
//! are rebuilt lazily and incrementally so a large zone never stalls a single
//! tick, and incremental add/remove/move events keep them current between
//! rebuilds.
//!
//! # Modules
//!
//! - [`config`] -- Cell size, per-zone item cap, and rebuild chunk size.
//! - [`error`] -- Error types for index construction.
//! - [`grid`] -- [`CacheEntry`]: the id-to-cell map and cell buckets of one
//!   zone, with radius queries and an invariant check.
//! - [`rebuild`] -- [`RebuildState`]: chunked construction of a zone's entry.
//! - [`source`] -- The [`ItemSource`] and [`Admission`] seams to the world
//!   and the eligibility layer.
//! - [`index`] -- [`SpatialItemIndex`]: zone states, self-healing queries,
//!   and diagnostics.

pub mod config;
pub mod error;
pub mod grid;
pub mod index;
pub mod rebuild;
pub mod source;

// Re-export primary types at crate root.
pub use config::IndexConfig;
pub use error::IndexError;
pub use grid::{CacheEntry, CellKey, InsertOutcome, TrackedItem};
pub use index::{AddOutcome, CacheStats, SpatialItemIndex};
pub use rebuild::{RebuildState, StepReport};
pub use source::{AdmitAll, Admission, ItemSource, admissible};
