//! Error types for the `quartermaster-scoring` crate.
//!
//! Scoring and eligibility never fail at evaluation time: disqualification
//! is a score and ineligibility is a rejection reason. Only configuration
//! can be invalid.

/// Errors raised while validating scoring or eligibility configuration.
#[derive(Debug, thiserror::Error)]
pub enum ScoringError {
    /// A configuration value cannot be used.
    #[error("invalid scoring configuration: {reason}")]
    InvalidConfig {
        /// Explanation of what is wrong with the configuration.
        reason: String,
    },
}
