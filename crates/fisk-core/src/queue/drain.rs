//! One queue drain pass: priority-ordered dispatch behind the breaker gate.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crate::breaker::CircuitBreaker;
use crate::config::RetryConfig;
use crate::handler::HandlerRegistry;
use crate::request_log::{AttemptOutcome, RequestLog};
use crate::upstream::{classify, FailureClass};

use super::entry::RequestStatus;
use super::state::RequestQueue;

/// Counters describing what a single drain pass did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainSummary {
    /// Entries actually dispatched to a handler.
    pub dispatched: u32,
    pub completed: u32,
    /// Failed dispatches put back to pending for a later pass.
    pub requeued: u32,
    /// Entries that exhausted their retry budget this pass.
    pub failed: u32,
    /// The breaker denied traffic mid-pass; remaining entries stayed pending.
    pub halted_by_breaker: bool,
}

/// Releases the single-flight drain flag when dropped.
struct DrainGuard<'a>(&'a AtomicBool);

impl Drop for DrainGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Run one drain pass. At most one pass runs at a time per process
/// (`flag` is the single-flight guard); a pass that loses the race returns
/// an empty summary immediately.
///
/// Selection order is priority rank, then creation time, then id. Between
/// dispatches a fixed `dispatch_gap` pause keeps a long pass from bursting
/// the upstream even while the circuit is closed.
pub(crate) async fn drain_pass(
    flag: &AtomicBool,
    queue: &RequestQueue,
    breaker: &CircuitBreaker,
    handlers: &HandlerRegistry,
    log: &RequestLog,
    retry: &RetryConfig,
    dispatch_gap: Duration,
) -> DrainSummary {
    if flag
        .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
        .is_err()
    {
        return DrainSummary::default();
    }
    let _guard = DrainGuard(flag);

    let stale = queue.reset_stale_processing();
    if stale > 0 {
        tracing::warn!(stale, "re-queued requests left processing by an interrupted pass");
    }

    let pending = queue.pending_sorted();
    let mut summary = DrainSummary::default();
    if pending.is_empty() {
        return summary;
    }
    tracing::debug!(pending = pending.len(), "queue drain pass starting");

    for (i, req) in pending.iter().enumerate() {
        if !breaker.allow_request() {
            tracing::info!(
                remaining = pending.len() - i,
                "circuit denied traffic mid-pass, leaving remaining requests pending"
            );
            summary.halted_by_breaker = true;
            break;
        }
        if !queue.mark_processing(&req.id) {
            // Entry disappeared or changed state since selection.
            continue;
        }

        let Some(handler) = handlers.get(&req.request_type) else {
            // Only possible for persisted entries whose type is no longer
            // registered; no upstream attempt happened, so the breaker is
            // not consulted.
            let status = queue.record_failure(
                &req.id,
                "terminal: no handler registered for request type",
                retry.max_retries,
            );
            tracing::warn!(
                request_id = %req.id,
                request_type = %req.request_type,
                status = status.as_str(),
                "queued request has no registered handler"
            );
            if status == RequestStatus::Failed {
                summary.failed += 1;
            } else {
                summary.requeued += 1;
            }
            continue;
        };

        summary.dispatched += 1;
        let attempt = req.retry_count + 1;
        let started = Instant::now();
        match handler.call(req.payload.clone()).await {
            Ok(_) => {
                breaker.record_success();
                log.record(
                    &req.id,
                    &req.request_type,
                    AttemptOutcome::Success,
                    started.elapsed().as_millis() as u64,
                    attempt,
                    None,
                );
                queue.complete(&req.id);
                summary.completed += 1;
                tracing::debug!(request_id = %req.id, "queued request completed");
            }
            Err(err) => {
                breaker.record_failure();
                let class = classify(&err, retry);
                let text = format!("{}: {}", class.as_str(), err);
                let status = queue.record_failure(&req.id, &text, retry.max_retries);
                log.record(
                    &req.id,
                    &req.request_type,
                    if status == RequestStatus::Failed {
                        AttemptOutcome::Failure
                    } else {
                        AttemptOutcome::Retry
                    },
                    started.elapsed().as_millis() as u64,
                    attempt,
                    Some(text.clone()),
                );
                if status == RequestStatus::Failed {
                    summary.failed += 1;
                    tracing::warn!(
                        request_id = %req.id,
                        retries = attempt,
                        error = %text,
                        "queued request exhausted its retry budget"
                    );
                } else {
                    summary.requeued += 1;
                    if class == FailureClass::Terminal {
                        tracing::debug!(
                            request_id = %req.id,
                            error = %text,
                            "terminal dispatch error, re-queued under the retry budget"
                        );
                    }
                }
            }
        }

        if i + 1 < pending.len() {
            tokio::time::sleep(dispatch_gap).await;
        }
    }

    summary
}
