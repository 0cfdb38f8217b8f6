//! Retention of idempotency records.

use std::time::Duration;

/// Controls how long idempotency records are kept before cleanup.
///
/// # Example
///
/// ```
/// # use gigzz_backend::domain::IdempotencyConfig;
/// # use std::time::Duration;
/// assert_eq!(IdempotencyConfig::default().ttl(), Duration::from_secs(24 * 3600));
/// assert_eq!(IdempotencyConfig::from_hours(0).ttl(), Duration::from_secs(3600));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdempotencyConfig {
    ttl: Duration,
}

impl IdempotencyConfig {
    /// Default retention in hours.
    pub const DEFAULT_TTL_HOURS: u64 = 24;
    /// Shortest retention; retries must be able to complete.
    pub const MIN_TTL_HOURS: u64 = 1;
    /// Longest retention (ten years).
    pub const MAX_TTL_HOURS: u64 = 24 * 365 * 10;

    /// Build from a configured number of hours, clamped to
    /// [`Self::MIN_TTL_HOURS`]..=[`Self::MAX_TTL_HOURS`].
    pub fn from_hours(hours: u64) -> Self {
        let hours = hours.clamp(Self::MIN_TTL_HOURS, Self::MAX_TTL_HOURS);
        Self {
            ttl: Duration::from_secs(hours.saturating_mul(3600)),
        }
    }

    /// Use an explicit TTL.
    pub fn with_ttl(ttl: Duration) -> Self {
        Self { ttl }
    }

    /// Configured TTL.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}

impl Default for IdempotencyConfig {
    fn default() -> Self {
        Self::from_hours(Self::DEFAULT_TTL_HOURS)
    }
}
