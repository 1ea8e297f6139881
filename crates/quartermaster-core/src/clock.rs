//! The engine's tick counter.
//!
//! All engine timing (intervals, cooldowns, TTLs) is measured in ticks of
//! this clock rather than wall time, so behaviour is reproducible and the
//! engine never needs a timeout of its own.

/// Errors that can occur during clock operations.
#[derive(Debug, thiserror::Error)]
pub enum ClockError {
    /// Tick counter would overflow.
    #[error("tick counter overflow: cannot advance beyond u64::MAX")]
    TickOverflow,
}

/// Monotonic tick counter advanced once per [`UpgradeEngine::tick`].
///
/// [`UpgradeEngine::tick`]: crate::engine::UpgradeEngine::tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickClock {
    /// Current tick (0 before the first advance).
    tick: u64,
}

impl TickClock {
    /// A clock at tick 0.
    pub const fn new() -> Self {
        Self { tick: 0 }
    }

    /// A clock resumed at `tick`.
    pub const fn from_tick(tick: u64) -> Self {
        Self { tick }
    }

    /// Advance by one tick. Returns the new tick number.
    ///
    /// # Errors
    ///
    /// Returns [`ClockError::TickOverflow`] if the counter would exceed
    /// `u64::MAX`.
    pub fn advance(&mut self) -> Result<u64, ClockError> {
        self.tick = self.tick.checked_add(1).ok_or(ClockError::TickOverflow)?;
        Ok(self.tick)
    }

    /// Current tick.
    pub const fn tick(&self) -> u64 {
        self.tick
    }

    /// Whether `interval` ticks have passed since `since`.
    pub const fn elapsed(&self, since: u64, interval: u64) -> bool {
        self.tick.saturating_sub(since) >= interval
    }
}
