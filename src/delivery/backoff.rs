use std::time::Duration;

use crate::config::HttpSettings;

/// Upper bound on a single backoff wait.
pub const MAX_BACKOFF_MS: u64 = 30_000;

/// Wait before retry number `attempt` (1-based): `base_ms * 2^(attempt-1)`,
/// capped at 30 seconds.
pub fn compute_backoff(
    base_ms: u64,
    attempt: u32,
) -> Duration {
    let factor = 1u64
        .checked_shl(attempt.saturating_sub(1))
        .unwrap_or(u64::MAX);
    Duration::from_millis(base_ms.saturating_mul(factor).min(MAX_BACKOFF_MS))
}

/// Retry schedule for protocols that retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_backoff_ms: u64,
}

impl RetryPolicy {
    pub fn new(
        max_retries: u32,
        base_backoff_ms: u64,
    ) -> Self {
        Self {
            max_retries,
            base_backoff_ms,
        }
    }

    /// First attempt plus every retry.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    pub fn backoff(
        &self,
        attempt: u32,
    ) -> Duration {
        compute_backoff(self.base_backoff_ms, attempt)
    }
}

impl From<&HttpSettings> for RetryPolicy {
    fn from(settings: &HttpSettings) -> Self {
        Self::new(settings.max_retries, settings.retry_backoff_ms)
    }
}
