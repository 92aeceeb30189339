//! Bounded in-memory log of individual upstream attempts.
//!
//! One entry per attempt, not per logical request; a call that retries twice
//! before succeeding produces three entries. The newest `capacity` entries
//! are kept, oldest evicted. This is an observability artifact, not a
//! durability guarantee.

use serde::Serialize;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

/// What a single attempt amounted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AttemptOutcome {
    /// The call succeeded.
    Success,
    /// The call failed and another attempt will follow.
    Retry,
    /// The call failed and no further attempt follows (terminal error or
    /// exhausted budget).
    Failure,
}

impl AttemptOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            AttemptOutcome::Success => "success",
            AttemptOutcome::Retry => "retry",
            AttemptOutcome::Failure => "failure",
        }
    }
}

/// Record of one attempt.
#[derive(Debug, Clone, Serialize)]
pub struct RequestLogEntry {
    pub request_id: String,
    pub request_type: String,
    pub outcome: AttemptOutcome,
    pub duration_ms: u64,
    /// 1-based attempt number within the logical request.
    pub attempt: u32,
    pub error: Option<String>,
    /// Unix millis when the attempt finished.
    pub at_ms: u64,
}

/// Ring buffer of attempt records. Owned exclusively by the client; other
/// components only append through [`record`](Self::record).
pub struct RequestLog {
    capacity: usize,
    entries: Mutex<VecDeque<RequestLogEntry>>,
}

impl RequestLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: Mutex::new(VecDeque::new()),
        }
    }

    /// Append an attempt record, stamping its timestamp; evicts the oldest
    /// entry when full.
    pub fn record(
        &self,
        request_id: &str,
        request_type: &str,
        outcome: AttemptOutcome,
        duration_ms: u64,
        attempt: u32,
        error: Option<String>,
    ) {
        let entry = RequestLogEntry {
            request_id: request_id.to_string(),
            request_type: request_type.to_string(),
            outcome,
            duration_ms,
            attempt,
            error,
            at_ms: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_millis() as u64)
                .unwrap_or(0),
        };
        let mut entries = self.entries.lock().expect("request log mutex poisoned");
        if entries.len() == self.capacity {
            entries.pop_front();
        }
        entries.push_back(entry);
    }

    /// Newest entries first, at most `limit`.
    pub fn tail(&self, limit: usize) -> Vec<RequestLogEntry> {
        let entries = self.entries.lock().expect("request log mutex poisoned");
        entries.iter().rev().take(limit).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().expect("request log mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
