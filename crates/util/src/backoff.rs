//! Exponential backoff schedule for fetch retries.

use std::time::Duration;

/// Upper bound for a single retry delay.
pub const MAX_BACKOFF: Duration = Duration::from_secs(5 * 60);

/// Yields one delay per allowed retry: `min`, `2 * min`, `4 * min`, ...
/// capped at [`MAX_BACKOFF`].
pub fn backoff_delays(min: Duration, retries: u32) -> impl Iterator<Item = Duration> {
    (0..retries).map(move |attempt| {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        min.checked_mul(factor).map_or(MAX_BACKOFF, |delay| delay.min(MAX_BACKOFF))
    })
}
