//! Client facade: one handle owning the breaker, queue, attempt log and
//! handler registry.
//!
//! Cheap to clone (`Arc` inner); every clone shares the same circuit state
//! and queue, so the whole process presents a single view of the upstream.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde_json::Value;
use tokio::time::MissedTickBehavior;

use crate::breaker::{CircuitBreaker, CircuitState, CircuitStats};
use crate::config::{CircuitConfigPatch, FiskConfig, QueueConfig, RetryConfig, RetryConfigPatch};
use crate::handler::HandlerRegistry;
use crate::queue::{drain_pass, DrainSummary, Priority, QueueStats, QueuedRequest, RequestId, RequestQueue};
use crate::request_log::{RequestLog, RequestLogEntry};
use crate::upstream::{run_with_retry, CallResult};

/// A request type nothing in the registry can serve.
#[derive(Debug, thiserror::Error)]
#[error("no handler registered for request type {0:?}")]
pub struct UnknownRequestType(pub String);

struct ClientInner {
    breaker: CircuitBreaker,
    queue: RequestQueue,
    log: RequestLog,
    handlers: HandlerRegistry,
    retry: Mutex<RetryConfig>,
    queue_cfg: QueueConfig,
    /// Single-flight guard for drain passes.
    draining: AtomicBool,
    /// Sequence for direct-call request ids.
    call_seq: AtomicU64,
}

#[derive(Clone)]
pub struct FiskClient {
    inner: Arc<ClientInner>,
}

impl FiskClient {
    pub fn new(config: FiskConfig, handlers: HandlerRegistry) -> Self {
        Self::with_queue(config, handlers, RequestQueue::new())
    }

    /// Build a client around an existing queue (e.g. one restored from disk).
    pub fn with_queue(config: FiskConfig, handlers: HandlerRegistry, queue: RequestQueue) -> Self {
        Self {
            inner: Arc::new(ClientInner {
                breaker: CircuitBreaker::new(config.circuit),
                queue,
                log: RequestLog::new(config.queue.request_log_capacity),
                handlers,
                retry: Mutex::new(config.retry),
                queue_cfg: config.queue,
                draining: AtomicBool::new(false),
                call_seq: AtomicU64::new(0),
            }),
        }
    }

    /// Run one request synchronously through the breaker gate and the retry
    /// loop, using the handler registered for `request_type`.
    ///
    /// Failures come back inside the [`CallResult`], never as `Err`; the only
    /// error is an unregistered request type.
    pub async fn execute(
        &self,
        request_type: &str,
        payload: Value,
    ) -> Result<CallResult, UnknownRequestType> {
        let handler = self
            .inner
            .handlers
            .get(request_type)
            .ok_or_else(|| UnknownRequestType(request_type.to_string()))?;
        let retry = self.retry_snapshot();
        let request_id = self.next_call_id();
        let result = run_with_retry(
            &self.inner.breaker,
            &self.inner.log,
            &retry,
            &request_id,
            request_type,
            move || handler.call(payload.clone()),
        )
        .await;
        Ok(result)
    }

    /// Park a request for background dispatch and return its id. Rejected
    /// up front when no handler is registered for the type.
    ///
    /// While the circuit is closed the queue worker is kicked immediately;
    /// while it is open the entry just waits for recovery.
    pub fn enqueue(
        &self,
        request_type: &str,
        payload: Value,
        priority: Priority,
    ) -> Result<RequestId, UnknownRequestType> {
        if !self.inner.handlers.contains(request_type) {
            return Err(UnknownRequestType(request_type.to_string()));
        }
        let id = self.inner.queue.enqueue(request_type, payload, priority);
        if self.inner.breaker.state() == CircuitState::Closed {
            self.kick();
        }
        Ok(id)
    }

    /// Wake the queue worker for an immediate drain attempt.
    pub fn kick(&self) {
        self.inner.breaker.close_signal().notify_one();
    }

    /// Run one drain pass on the caller's task. The background worker uses
    /// the same single-flight guard, so concurrent passes cannot overlap.
    pub async fn drain_once(&self) -> DrainSummary {
        let retry = self.retry_snapshot();
        drain_pass(
            &self.inner.draining,
            &self.inner.queue,
            &self.inner.breaker,
            &self.inner.handlers,
            &self.inner.log,
            &retry,
            Duration::from_millis(self.inner.queue_cfg.dispatch_gap_ms),
        )
        .await
    }

    /// Spawn the background queue worker: drains on every circuit close or
    /// enqueue kick, with a periodic tick as a safety net. The first tick
    /// fires immediately, which drains a queue restored from disk.
    ///
    /// Abort the returned handle to stop the worker.
    pub fn start(&self) -> tokio::task::JoinHandle<()> {
        let client = self.clone();
        let signal = client.inner.breaker.close_signal();
        let period = Duration::from_millis(client.inner.queue_cfg.drain_interval_ms);
        tokio::spawn(async move {
            let mut tick = tokio::time::interval(period);
            tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = signal.notified() => {}
                    _ = tick.tick() => {}
                }
                let summary = client.drain_once().await;
                if summary.dispatched > 0 || summary.halted_by_breaker {
                    tracing::debug!(
                        dispatched = summary.dispatched,
                        completed = summary.completed,
                        requeued = summary.requeued,
                        failed = summary.failed,
                        halted = summary.halted_by_breaker,
                        "drain pass finished"
                    );
                }
            }
        })
    }

    pub fn circuit_state(&self) -> CircuitState {
        self.inner.breaker.state()
    }

    pub fn circuit_stats(&self) -> CircuitStats {
        self.inner.breaker.stats()
    }

    /// Operator override: close the circuit now and kick a drain.
    pub fn force_close_circuit(&self) {
        self.inner.breaker.force_close();
    }

    pub fn update_retry_config(&self, patch: &RetryConfigPatch) {
        let mut retry = self.inner.retry.lock().expect("retry config mutex poisoned");
        patch.apply(&mut retry);
        tracing::info!(config = ?*retry, "retry config updated");
    }

    pub fn update_circuit_config(&self, patch: &CircuitConfigPatch) {
        self.inner.breaker.update_config(patch);
    }

    pub fn retry_config(&self) -> RetryConfig {
        self.retry_snapshot()
    }

    pub fn request_types(&self) -> Vec<String> {
        self.inner.handlers.request_types()
    }

    pub fn queued_requests(&self) -> Vec<QueuedRequest> {
        self.inner.queue.list()
    }

    pub fn queued_request(&self, id: &str) -> Option<QueuedRequest> {
        self.inner.queue.get(id)
    }

    pub fn queue_stats(&self) -> QueueStats {
        self.inner.queue.stats()
    }

    /// Newest attempt-log entries, newest first.
    pub fn request_log(&self, limit: usize) -> Vec<RequestLogEntry> {
        self.inner.log.tail(limit)
    }

    pub fn save_queue(&self, path: &std::path::Path) -> anyhow::Result<()> {
        self.inner.queue.save_to_path(path)
    }

    fn retry_snapshot(&self) -> RetryConfig {
        self.inner
            .retry
            .lock()
            .expect("retry config mutex poisoned")
            .clone()
    }

    fn next_call_id(&self) -> String {
        let ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        let seq = self.inner.call_seq.fetch_add(1, Ordering::Relaxed);
        format!("call-{ms}-{seq:06}")
    }
}
