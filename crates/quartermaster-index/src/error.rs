//! Error types for the `quartermaster-index` crate.
//!
//! Index operations themselves never fail: malformed input is dropped and
//! reported through return values. The only fallible step is building an
//! index from an unusable [`IndexConfig`].
//!
//! [`IndexConfig`]: crate::config::IndexConfig

/// Errors that can occur when constructing a spatial index.
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    /// A configuration value cannot be used (e.g. non-positive cell size).
    #[error("invalid index configuration: {reason}")]
    InvalidConfig {
        /// Explanation of what is wrong with the configuration.
        reason: String,
    },
}
