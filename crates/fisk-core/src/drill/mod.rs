//! Drill mode: exercise the full client against a synthetic flaky upstream
//! and report how the breaker and retry loop behaved.
//!
//! The drill registers an in-process handler that fails with a configurable
//! probability, runs a fixed number of calls through `FiskClient::execute`,
//! and summarizes the outcomes. Useful to sanity-check a tuned config before
//! pointing the client at the real authority.

use rand::Rng;
use serde_json::json;

use crate::breaker::{CircuitState, CircuitStats};
use crate::client::FiskClient;
use crate::config::FiskConfig;
use crate::handler::{handler_fn, HandlerRegistry};
use crate::upstream::UpstreamError;

const DRILL_REQUEST_TYPE: &str = "drill";

/// Drill parameters.
#[derive(Debug, Clone, Copy)]
pub struct DrillOptions {
    /// Logical requests to run.
    pub requests: u32,
    /// Probability in [0, 1] that a single attempt fails with HTTP 503.
    pub fail_rate: f64,
}

impl Default for DrillOptions {
    fn default() -> Self {
        Self {
            requests: 20,
            fail_rate: 0.5,
        }
    }
}

/// What happened across one drill run.
#[derive(Debug, Clone)]
pub struct DrillReport {
    pub requests: u32,
    pub succeeded: u32,
    pub failed: u32,
    /// Requests the breaker rejected without any upstream attempt.
    pub rejected_by_circuit: u32,
    /// Upstream attempts across all requests, retries included.
    pub total_attempts: u32,
    pub final_state: CircuitState,
    pub circuit: CircuitStats,
}

/// Run `options.requests` calls against a handler that fails each attempt
/// with probability `options.fail_rate`, using the given config for retry
/// and breaker tuning.
pub async fn run_drill(config: FiskConfig, options: DrillOptions) -> DrillReport {
    let fail_rate = options.fail_rate.clamp(0.0, 1.0);
    let mut registry = HandlerRegistry::new();
    registry.register(
        DRILL_REQUEST_TYPE,
        handler_fn(move |payload| async move {
            if rand::thread_rng().gen_bool(fail_rate) {
                Err(UpstreamError::Status {
                    code: 503,
                    message: "synthetic outage".into(),
                })
            } else {
                Ok(json!({ "ok": payload }))
            }
        }),
    );
    let client = FiskClient::new(config, registry);

    let mut report = DrillReport {
        requests: options.requests,
        succeeded: 0,
        failed: 0,
        rejected_by_circuit: 0,
        total_attempts: 0,
        final_state: CircuitState::Closed,
        circuit: client.circuit_stats(),
    };

    for n in 0..options.requests {
        // Registered above, so execute cannot fail with an unknown type.
        let Ok(result) = client.execute(DRILL_REQUEST_TYPE, json!({ "n": n })).await else {
            continue;
        };
        report.total_attempts += result.attempts;
        if result.success {
            report.succeeded += 1;
        } else if result.attempts == 0 {
            report.rejected_by_circuit += 1;
        } else {
            report.failed += 1;
        }
    }

    report.final_state = client.circuit_state();
    report.circuit = client.circuit_stats();
    report
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quick_config() -> FiskConfig {
        let mut cfg = FiskConfig::default();
        cfg.retry.base_delay_ms = 1;
        cfg.retry.max_delay_ms = 5;
        cfg
    }

    #[tokio::test(start_paused = true)]
    async fn all_successes_when_nothing_fails() {
        let report = run_drill(
            quick_config(),
            DrillOptions {
                requests: 10,
                fail_rate: 0.0,
            },
        )
        .await;
        assert_eq!(report.succeeded, 10);
        assert_eq!(report.failed, 0);
        assert_eq!(report.rejected_by_circuit, 0);
        assert_eq!(report.total_attempts, 10);
        assert_eq!(report.final_state, CircuitState::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn total_failure_trips_the_circuit() {
        let mut cfg = quick_config();
        cfg.circuit.failure_threshold = 3;
        cfg.circuit.recovery_time_ms = 3_600_000;
        let report = run_drill(
            cfg,
            DrillOptions {
                requests: 10,
                fail_rate: 1.0,
            },
        )
        .await;
        assert_eq!(report.succeeded, 0);
        assert_eq!(report.final_state, CircuitState::Open);
        // Once open, the remaining requests are rejected without attempts.
        assert!(report.rejected_by_circuit > 0);
        assert!(report.total_attempts >= 3);
    }

    #[test]
    fn fail_rate_is_clamped() {
        let options = DrillOptions {
            requests: 1,
            fail_rate: 1.7,
        };
        assert_eq!(options.fail_rate.clamp(0.0, 1.0), 1.0);
    }
}
