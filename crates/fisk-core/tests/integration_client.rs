//! Integration tests: full client against a scripted upstream.
//!
//! Exercise the retry loop, circuit breaker and queue processor together
//! through the public `FiskClient` surface, under a paused tokio clock so
//! backoff and recovery windows are deterministic.

mod common;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use common::flaky_upstream::FlakyUpstream;
use fisk_core::breaker::CircuitState;
use fisk_core::client::FiskClient;
use fisk_core::config::FiskConfig;
use fisk_core::handler::{handler_fn, HandlerRegistry};
use fisk_core::queue::{Priority, RequestQueue, RequestStatus};
use fisk_core::request_log::AttemptOutcome;
use serde_json::{json, Value};
use tokio::time::advance;

fn test_config() -> FiskConfig {
    let mut cfg = FiskConfig::default();
    cfg.retry.base_delay_ms = 10;
    cfg.retry.max_delay_ms = 100;
    cfg.queue.dispatch_gap_ms = 10;
    cfg.queue.drain_interval_ms = 60_000;
    cfg
}

#[tokio::test(start_paused = true)]
async fn transient_outage_is_retried_to_success() {
    let upstream = FlakyUpstream::with_status(2, 503);
    let mut registry = HandlerRegistry::new();
    registry.register("invoice", upstream.handler());
    let client = FiskClient::new(test_config(), registry);

    let result = client
        .execute("invoice", json!({"invoice_id": 7}))
        .await
        .unwrap();
    assert!(result.success);
    assert_eq!(result.attempts, 3);
    assert_eq!(upstream.calls(), 3);
    assert_eq!(result.data, Some(json!({ "accepted": {"invoice_id": 7} })));

    let log = client.request_log(10);
    assert_eq!(log.len(), 3);
    assert_eq!(log[0].outcome, AttemptOutcome::Success);
    assert_eq!(log[1].outcome, AttemptOutcome::Retry);
    assert_eq!(log[2].outcome, AttemptOutcome::Retry);
}

#[tokio::test(start_paused = true)]
async fn client_errors_are_not_retried() {
    let upstream = FlakyUpstream::with_status(u32::MAX, 400);
    let mut registry = HandlerRegistry::new();
    registry.register("invoice", upstream.handler());
    let client = FiskClient::new(test_config(), registry);

    let result = client.execute("invoice", json!(null)).await.unwrap();
    assert!(!result.success);
    assert_eq!(result.attempts, 1);
    assert_eq!(upstream.calls(), 1);
    assert_eq!(result.error.as_deref(), Some("HTTP 400: scripted failure"));
}

#[tokio::test(start_paused = true)]
async fn sustained_failures_open_circuit_and_shed_load() {
    let mut cfg = test_config();
    cfg.retry.max_retries = 2;
    cfg.circuit.failure_threshold = 3;
    cfg.circuit.recovery_time_ms = 3_600_000;
    let upstream = FlakyUpstream::with_transport(u32::MAX);
    let mut registry = HandlerRegistry::new();
    registry.register("invoice", upstream.handler());
    let client = FiskClient::new(cfg, registry);

    // Three failing attempts reach the threshold inside one call.
    let first = client.execute("invoice", json!(1)).await.unwrap();
    assert!(!first.success);
    assert_eq!(first.attempts, 3);
    assert_eq!(client.circuit_state(), CircuitState::Open);

    // Subsequent calls are rejected without touching the upstream.
    let second = client.execute("invoice", json!(2)).await.unwrap();
    assert!(!second.success);
    assert_eq!(second.attempts, 0);
    assert_eq!(second.circuit_state, CircuitState::Open);
    assert_eq!(upstream.calls(), 3);
}

#[tokio::test(start_paused = true)]
async fn circuit_recovers_through_half_open_probes() {
    let mut cfg = test_config();
    cfg.circuit.failure_threshold = 1;
    cfg.circuit.recovery_time_ms = 5_000;
    cfg.circuit.half_open_requests = 2;
    // First attempt fails and opens the circuit; everything after succeeds.
    let upstream = FlakyUpstream::with_transport(1);
    let mut registry = HandlerRegistry::new();
    registry.register("invoice", upstream.handler());
    let client = FiskClient::new(cfg, registry);

    let mut retry_off = fisk_core::config::RetryConfigPatch::default();
    retry_off.max_retries = Some(0);
    client.update_retry_config(&retry_off);

    let first = client.execute("invoice", json!(1)).await.unwrap();
    assert!(!first.success);
    assert_eq!(client.circuit_state(), CircuitState::Open);

    advance(Duration::from_millis(5_000)).await;

    // Two successful probes close the circuit again.
    let probe1 = client.execute("invoice", json!(2)).await.unwrap();
    assert!(probe1.success);
    assert_eq!(client.circuit_state(), CircuitState::HalfOpen);
    let probe2 = client.execute("invoice", json!(3)).await.unwrap();
    assert!(probe2.success);
    assert_eq!(client.circuit_state(), CircuitState::Closed);
}

#[tokio::test(start_paused = true)]
async fn queue_built_up_while_open_drains_by_priority_on_force_close() {
    let mut cfg = test_config();
    cfg.retry.max_retries = 0;
    cfg.circuit.failure_threshold = 1;
    cfg.circuit.recovery_time_ms = 3_600_000;
    let order = Arc::new(Mutex::new(Vec::<Value>::new()));
    let order_in = Arc::clone(&order);
    let mut registry = HandlerRegistry::new();
    registry.register(
        "submit",
        handler_fn(move |payload| {
            let order = Arc::clone(&order_in);
            async move {
                order.lock().unwrap().push(payload);
                Ok(Value::Null)
            }
        }),
    );
    let down = FlakyUpstream::with_transport(u32::MAX);
    registry.register("down", down.handler());
    let client = FiskClient::new(cfg, registry);
    let worker = client.start();

    // One failing call trips the threshold-1 breaker.
    let tripped = client.execute("down", json!(null)).await.unwrap();
    assert!(!tripped.success);
    assert_eq!(client.circuit_state(), CircuitState::Open);

    client.enqueue("submit", json!("low"), Priority::Low).unwrap();
    client.enqueue("submit", json!("high"), Priority::High).unwrap();
    client.enqueue("submit", json!("medium"), Priority::Medium).unwrap();

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(client.queue_stats().pending, 3);
    assert!(order.lock().unwrap().is_empty());

    client.force_close_circuit();
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(client.queue_stats().total, 0);
    assert_eq!(
        *order.lock().unwrap(),
        vec![json!("high"), json!("medium"), json!("low")]
    );
    worker.abort();
}

#[tokio::test(start_paused = true)]
async fn queued_request_exhausts_budget_and_stays_failed() {
    let mut cfg = test_config();
    cfg.retry.max_retries = 2;
    cfg.circuit.failure_threshold = 100;
    let upstream = FlakyUpstream::with_status(u32::MAX, 503);
    let mut registry = HandlerRegistry::new();
    registry.register("invoice", upstream.handler());
    let client = FiskClient::new(cfg, registry);

    let id = client.enqueue("invoice", json!(null), Priority::High).unwrap();
    for _ in 0..3 {
        client.drain_once().await;
    }

    let entry = client.queued_request(&id).unwrap();
    assert_eq!(entry.status, RequestStatus::Failed);
    assert_eq!(entry.retry_count, 2);
    assert_eq!(entry.last_error.as_deref(), Some("retryable: HTTP 503: scripted failure"));
    assert_eq!(upstream.calls(), 2);
    // Failed entries are kept for inspection and never re-dispatched.
    assert_eq!(client.queue_stats().failed, 1);
}

#[tokio::test(start_paused = true)]
async fn queue_survives_a_restart_via_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("queue.json");

    let upstream = FlakyUpstream::with_transport(0);
    let mut registry = HandlerRegistry::new();
    registry.register("invoice", upstream.handler());

    let client = FiskClient::new(test_config(), registry);
    client.enqueue("invoice", json!({"n": 1}), Priority::High).unwrap();
    client.enqueue("invoice", json!({"n": 2}), Priority::Low).unwrap();
    client.save_queue(&path).unwrap();
    drop(client);

    let queue = RequestQueue::load_from_path(&path).unwrap().unwrap();
    assert_eq!(queue.len(), 2);

    let upstream = FlakyUpstream::with_transport(0);
    let mut registry = HandlerRegistry::new();
    registry.register("invoice", upstream.handler());
    let restored = FiskClient::with_queue(test_config(), registry, queue);
    let summary = restored.drain_once().await;
    assert_eq!(summary.completed, 2);
    assert_eq!(upstream.calls(), 2);
    assert!(restored.queued_requests().is_empty());
}
