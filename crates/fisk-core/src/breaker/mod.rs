//! Circuit breaker gating all traffic to the tax authority.
//!
//! # States
//! - Closed: calls permitted; failures accumulate
//! - Open: calls rejected immediately, no upstream attempt
//! - Half-open: limited probes to test recovery
//!
//! # State transitions
//! ```text
//! Closed → Open: failure_count >= failure_threshold
//! Open → Half-open: recovery_time elapsed (checked lazily on next access)
//! Half-open → Closed: half_open_requests consecutive probe successes
//! Half-open → Open: a single probe failure
//! ```
//!
//! There is no background timer; the open→half-open transition happens on
//! the next permission check after the deadline, which keeps tests
//! deterministic under a paused tokio clock.
//!
//! State is per process and owned by this struct alone; share it with `Arc`.
//! A multi-instance deployment would need to move this into an external
//! shared store, which nothing here attempts.

mod stats;

pub use stats::CircuitStats;

use serde::Serialize;
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::Notify;
use tokio::time::Instant;

use crate::config::{CircuitConfig, CircuitConfigPatch};

fn now_unix_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Breaker state machine position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl CircuitState {
    pub fn as_str(self) -> &'static str {
        match self {
            CircuitState::Closed => "closed",
            CircuitState::Open => "open",
            CircuitState::HalfOpen => "half-open",
        }
    }
}

#[derive(Debug)]
struct BreakerInner {
    config: CircuitConfig,
    state: CircuitState,
    /// Failures since the last transition into closed.
    failure_count: u32,
    /// Successes over the breaker's lifetime.
    success_count: u64,
    half_open_successes: u32,
    /// Probes admitted in the current half-open window.
    half_open_admitted: u32,
    opened_at: Option<Instant>,
    opened_at_unix_ms: Option<u64>,
    last_failure_at_ms: Option<u64>,
    last_success_at_ms: Option<u64>,
}

/// Process-wide gate every upstream call must pass.
///
/// Callers ask [`allow_request`](Self::allow_request) before attempting a
/// call and report the outcome back via [`record_success`](Self::record_success)
/// / [`record_failure`](Self::record_failure); nothing else mutates the state.
pub struct CircuitBreaker {
    inner: Mutex<BreakerInner>,
    /// Signalled on every transition into closed (including force-close) so
    /// the queue worker can start draining.
    closed: Arc<Notify>,
}

impl CircuitBreaker {
    pub fn new(config: CircuitConfig) -> Self {
        Self {
            inner: Mutex::new(BreakerInner {
                config,
                state: CircuitState::Closed,
                failure_count: 0,
                success_count: 0,
                half_open_successes: 0,
                half_open_admitted: 0,
                opened_at: None,
                opened_at_unix_ms: None,
                last_failure_at_ms: None,
                last_success_at_ms: None,
            }),
            closed: Arc::new(Notify::new()),
        }
    }

    /// Signal handle notified whenever the circuit closes. The queue worker
    /// waits on this; enqueue kicks reuse the same channel.
    pub fn close_signal(&self) -> Arc<Notify> {
        Arc::clone(&self.closed)
    }

    pub fn state(&self) -> CircuitState {
        self.lock().state
    }

    /// May a call be attempted right now?
    ///
    /// While open, this is where the lazy open→half-open transition happens
    /// once the recovery deadline has passed. In half-open, admissions are
    /// capped at `half_open_requests` per window.
    pub fn allow_request(&self) -> bool {
        let mut inner = self.lock();
        match inner.state {
            CircuitState::Closed => true,
            CircuitState::Open => {
                let recovery = Duration::from_millis(inner.config.recovery_time_ms);
                let due = inner
                    .opened_at
                    .map(|at| at.elapsed() >= recovery)
                    .unwrap_or(true);
                if !due {
                    return false;
                }
                tracing::info!("circuit recovery window elapsed, moving to half-open");
                Self::enter_half_open(&mut inner);
                inner.half_open_admitted = 1;
                true
            }
            CircuitState::HalfOpen => {
                if inner.half_open_admitted < inner.config.half_open_requests {
                    inner.half_open_admitted += 1;
                    true
                } else {
                    false
                }
            }
        }
    }

    /// Report a successful call.
    pub fn record_success(&self) {
        let mut inner = self.lock();
        inner.success_count += 1;
        inner.last_success_at_ms = Some(now_unix_ms());
        if inner.state == CircuitState::HalfOpen {
            inner.half_open_successes += 1;
            tracing::debug!(
                successes = inner.half_open_successes,
                needed = inner.config.half_open_requests,
                "half-open probe succeeded"
            );
            if inner.half_open_successes >= inner.config.half_open_requests {
                tracing::info!("circuit closing after successful recovery probes");
                Self::enter_closed(&mut inner);
                drop(inner);
                self.closed.notify_one();
            }
        }
    }

    /// Report a failed call.
    pub fn record_failure(&self) {
        let now_ms = now_unix_ms();
        let mut inner = self.lock();
        inner.last_failure_at_ms = Some(now_ms);
        match inner.state {
            CircuitState::Closed => {
                inner.failure_count += 1;
                if inner.failure_count >= inner.config.failure_threshold {
                    tracing::warn!(
                        failures = inner.failure_count,
                        "failure threshold reached, circuit opening"
                    );
                    Self::enter_open(&mut inner, now_ms);
                } else {
                    tracing::debug!(
                        failures = inner.failure_count,
                        threshold = inner.config.failure_threshold,
                        "upstream failure while closed"
                    );
                }
            }
            // One strike: any probe failure reopens regardless of prior
            // successes in this half-open window.
            CircuitState::HalfOpen => {
                tracing::warn!("half-open probe failed, circuit reopening");
                Self::enter_open(&mut inner, now_ms);
            }
            CircuitState::Open => {}
        }
    }

    /// Operator override: close unconditionally and reset counters,
    /// bypassing the recovery deadline. Idempotent when already closed.
    pub fn force_close(&self) {
        {
            let mut inner = self.lock();
            if inner.state != CircuitState::Closed {
                tracing::info!(from = inner.state.as_str(), "circuit force-closed");
            }
            Self::enter_closed(&mut inner);
        }
        self.closed.notify_one();
    }

    pub fn stats(&self) -> CircuitStats {
        let inner = self.lock();
        let half_open_probe_at_ms = match inner.state {
            CircuitState::Open => inner
                .opened_at_unix_ms
                .map(|at| at + inner.config.recovery_time_ms),
            _ => None,
        };
        CircuitStats {
            state: inner.state,
            failure_count: inner.failure_count,
            success_count: inner.success_count,
            last_failure_at_ms: inner.last_failure_at_ms,
            last_success_at_ms: inner.last_success_at_ms,
            half_open_probe_at_ms,
        }
    }

    /// Apply a partial config update; takes effect on the next transition
    /// checks (an already-running recovery window keeps its old deadline
    /// start but uses the new duration).
    pub fn update_config(&self, patch: &CircuitConfigPatch) {
        let mut inner = self.lock();
        patch.apply(&mut inner.config);
        tracing::info!(config = ?inner.config, "circuit config updated");
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BreakerInner> {
        self.inner.lock().expect("circuit breaker mutex poisoned")
    }

    fn enter_closed(inner: &mut BreakerInner) {
        inner.state = CircuitState::Closed;
        inner.failure_count = 0;
        inner.half_open_successes = 0;
        inner.half_open_admitted = 0;
        inner.opened_at = None;
        inner.opened_at_unix_ms = None;
    }

    fn enter_open(inner: &mut BreakerInner, now_ms: u64) {
        inner.state = CircuitState::Open;
        inner.half_open_successes = 0;
        inner.half_open_admitted = 0;
        inner.opened_at = Some(Instant::now());
        inner.opened_at_unix_ms = Some(now_ms);
    }

    fn enter_half_open(inner: &mut BreakerInner) {
        inner.state = CircuitState::HalfOpen;
        inner.half_open_successes = 0;
        inner.half_open_admitted = 0;
    }
}
