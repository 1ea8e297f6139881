//! Error types for the upgrade engine.
//!
//! [`EngineError`] wraps every failure that can stop engine construction or
//! a tick. Per-agent problems (ineligible agents, rejected candidates,
//! refused tasks) are outcomes, not errors, and never surface here.

use crate::clock::ClockError;
use crate::config::ConfigError;

/// Top-level error for [`UpgradeEngine`](crate::engine::UpgradeEngine).
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The tick counter could not advance.
    #[error("clock error: {source}")]
    Clock {
        /// The underlying clock error.
        #[from]
        source: ClockError,
    },

    /// Configuration was rejected.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: ConfigError,
    },

    /// The spatial index could not be built.
    #[error("index error: {source}")]
    Index {
        /// The underlying index error.
        #[from]
        source: quartermaster_index::IndexError,
    },

    /// The scoring engine could not be built.
    #[error("scoring error: {source}")]
    Scoring {
        /// The underlying scoring error.
        #[from]
        source: quartermaster_scoring::ScoringError,
    },
}
