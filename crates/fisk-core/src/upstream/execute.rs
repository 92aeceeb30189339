//! Retry loop: drive one logical request through the breaker gate until
//! success, a terminal failure, or retry exhaustion.

use serde_json::Value;
use std::future::Future;
use std::time::Instant;

use crate::breaker::{CircuitBreaker, CircuitState};
use crate::config::RetryConfig;
use crate::request_log::{AttemptOutcome, RequestLog};

use super::backoff::backoff_delay;
use super::classify::{classify, FailureClass};
use super::error::UpstreamError;

/// Outcome of one logical request after the retry loop has finished.
///
/// Failures are returned in this shape, never raised: callers check
/// `success` and can use `circuit_state` to tell "the upstream is down"
/// apart from "this specific request failed".
#[derive(Debug, Clone, serde::Serialize)]
pub struct CallResult {
    pub success: bool,
    pub data: Option<Value>,
    pub error: Option<String>,
    /// Attempts actually performed; 0 when the breaker refused outright.
    pub attempts: u32,
    pub request_id: String,
    pub circuit_state: CircuitState,
}

/// Run `call` until it succeeds, fails terminally, or exhausts the retry
/// budget. At most `max_retries + 1` attempts are performed.
///
/// A breaker denial returns immediately with the attempts performed so far;
/// the denial itself is not an attempt and is not retried here (the queue
/// path retries it on a later drain pass).
pub async fn run_with_retry<F, Fut>(
    breaker: &CircuitBreaker,
    log: &RequestLog,
    retry: &RetryConfig,
    request_id: &str,
    request_type: &str,
    mut call: F,
) -> CallResult
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Value, UpstreamError>>,
{
    let mut attempt: u32 = 0;
    loop {
        if !breaker.allow_request() {
            tracing::debug!(
                request_id,
                request_type,
                attempts = attempt,
                "circuit open, not attempting upstream call"
            );
            return CallResult {
                success: false,
                data: None,
                error: Some("circuit open: upstream calls suspended".to_string()),
                attempts: attempt,
                request_id: request_id.to_string(),
                circuit_state: breaker.state(),
            };
        }

        attempt += 1;
        let started = Instant::now();
        match call().await {
            Ok(data) => {
                breaker.record_success();
                log.record(
                    request_id,
                    request_type,
                    AttemptOutcome::Success,
                    started.elapsed().as_millis() as u64,
                    attempt,
                    None,
                );
                return CallResult {
                    success: true,
                    data: Some(data),
                    error: None,
                    attempts: attempt,
                    request_id: request_id.to_string(),
                    circuit_state: breaker.state(),
                };
            }
            Err(err) => {
                breaker.record_failure();
                let class = classify(&err, retry);
                let attempts_remain = attempt <= retry.max_retries;
                let will_retry = class == FailureClass::Retryable && attempts_remain;
                log.record(
                    request_id,
                    request_type,
                    if will_retry {
                        AttemptOutcome::Retry
                    } else {
                        AttemptOutcome::Failure
                    },
                    started.elapsed().as_millis() as u64,
                    attempt,
                    Some(err.to_string()),
                );
                if !will_retry {
                    tracing::warn!(
                        request_id,
                        request_type,
                        attempts = attempt,
                        class = class.as_str(),
                        error = %err,
                        "upstream call failed, giving up"
                    );
                    return CallResult {
                        success: false,
                        data: None,
                        error: Some(err.to_string()),
                        attempts: attempt,
                        request_id: request_id.to_string(),
                        circuit_state: breaker.state(),
                    };
                }
                let delay = backoff_delay(attempt - 1, retry);
                tracing::debug!(
                    request_id,
                    request_type,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "retryable upstream failure, backing off"
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}
