//! Exponential backoff with jitter.

use rand::Rng;
use std::time::Duration;

use crate::config::RetryConfig;

/// Uniform jitter ceiling added to each delay. Pure exponential backoff lets
/// concurrent callers hitting the same outage retry in lockstep; up to one
/// second of jitter desynchronizes them.
const JITTER_MS: u64 = 1_000;

/// Delay before the retry following failed attempt `attempt` (0-based):
/// `min(base * 2^attempt + jitter(0..1s), max)`.
pub fn backoff_delay(attempt: u32, cfg: &RetryConfig) -> Duration {
    let exponent = 2u64.saturating_pow(attempt.min(32));
    let raw = cfg.base_delay_ms.saturating_mul(exponent);
    let jitter = rand::thread_rng().gen_range(0..JITTER_MS);
    Duration::from_millis(raw.saturating_add(jitter).min(cfg.max_delay_ms))
}
