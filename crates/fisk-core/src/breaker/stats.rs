//! Read-only breaker snapshot for the admin/introspection surface.

use serde::Serialize;

use super::CircuitState;

/// Point-in-time view of the breaker. `failure_count` is only meaningful
/// since the last transition into closed; `success_count` is monotonic for
/// the life of the breaker.
#[derive(Debug, Clone, Serialize)]
pub struct CircuitStats {
    pub state: CircuitState,
    pub failure_count: u32,
    pub success_count: u64,
    /// Unix millis of the most recent failure, if any.
    pub last_failure_at_ms: Option<u64>,
    /// Unix millis of the most recent success, if any.
    pub last_success_at_ms: Option<u64>,
    /// Unix millis at which a half-open probe becomes eligible. `Some` only
    /// while the circuit is open.
    pub half_open_probe_at_ms: Option<u64>,
}
