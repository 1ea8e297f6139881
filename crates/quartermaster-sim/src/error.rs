//! Error types for the soak harness binary.
//!
//! [`SimError`] wraps every failure that can stop the harness during
//! startup or while driving the engine.

use quartermaster_core::{ConfigError, EngineError};

/// Top-level error for the soak harness.
#[derive(Debug, thiserror::Error)]
pub enum SimError {
    /// Engine configuration could not be loaded.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: ConfigError,
    },

    /// The engine failed to build or to run a tick.
    #[error("engine error: {source}")]
    Engine {
        /// The underlying engine error.
        #[from]
        source: EngineError,
    },

    /// The `sim` section of the config file is unusable.
    #[error("harness config error: {message}")]
    Harness {
        /// Description of the problem.
        message: String,
    },

    /// A zone cache failed its grid invariant check.
    #[error("grid invariant violated at tick {tick}")]
    Invariant {
        /// Tick at which the check failed.
        tick: u64,
    },

    /// The tracing subscriber could not be installed.
    #[error("logging error: {message}")]
    Logging {
        /// Description of the failure.
        message: String,
    },
}
