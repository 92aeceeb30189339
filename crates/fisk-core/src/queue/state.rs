//! In-memory request queue: id-keyed map with priority-ordered selection.

use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use super::entry::{Priority, QueuedRequest, RequestId, RequestStatus};

fn now_unix_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Aggregate counts for the introspection surface.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct QueueStats {
    pub total: usize,
    pub pending: usize,
    pub processing: usize,
    pub failed: usize,
}

/// Deferred-request store. Entries are keyed by id for O(1) lookup and
/// removal; drain-order selection sorts the pending subset on demand.
///
/// All mutation goes through these methods; the drain pass never reaches
/// into the map directly.
pub struct RequestQueue {
    entries: Mutex<HashMap<RequestId, QueuedRequest>>,
    seq: AtomicU64,
}

impl Default for RequestQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestQueue {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            seq: AtomicU64::new(0),
        }
    }

    /// Rebuild a queue from persisted entries. Entries caught mid-dispatch
    /// by a shutdown (`processing`) are put back to `pending`.
    pub fn from_entries(entries: Vec<QueuedRequest>) -> Self {
        let seq = entries.len() as u64;
        let map = entries
            .into_iter()
            .map(|mut e| {
                if e.status == RequestStatus::Processing {
                    e.status = RequestStatus::Pending;
                }
                (e.id.clone(), e)
            })
            .collect();
        Self {
            entries: Mutex::new(map),
            seq: AtomicU64::new(seq),
        }
    }

    /// Insert a new pending request and return its id.
    pub fn enqueue(&self, request_type: &str, payload: Value, priority: Priority) -> RequestId {
        let seq = self.seq.fetch_add(1, Ordering::Relaxed);
        // Zero-padded seq keeps same-millisecond ids in submission order
        // under the lexicographic tie-break used by pending_sorted.
        let id: RequestId = format!("req-{}-{:06}", now_unix_ms(), seq);
        let entry = QueuedRequest {
            id: id.clone(),
            request_type: request_type.to_string(),
            priority,
            payload,
            retry_count: 0,
            status: RequestStatus::Pending,
            created_at_ms: now_unix_ms(),
            last_attempt_at_ms: None,
            last_error: None,
        };
        self.lock().insert(id.clone(), entry);
        tracing::debug!(
            request_id = %id,
            request_type,
            priority = priority.as_str(),
            "request queued"
        );
        id
    }

    pub fn get(&self, id: &str) -> Option<QueuedRequest> {
        self.lock().get(id).cloned()
    }

    /// All entries, oldest first (stable display/persistence order).
    pub fn list(&self) -> Vec<QueuedRequest> {
        let mut all: Vec<QueuedRequest> = self.lock().values().cloned().collect();
        all.sort_by(|a, b| (a.created_at_ms, &a.id).cmp(&(b.created_at_ms, &b.id)));
        all
    }

    pub fn stats(&self) -> QueueStats {
        let entries = self.lock();
        let mut stats = QueueStats {
            total: entries.len(),
            ..QueueStats::default()
        };
        for e in entries.values() {
            match e.status {
                RequestStatus::Pending => stats.pending += 1,
                RequestStatus::Processing => stats.processing += 1,
                RequestStatus::Failed => stats.failed += 1,
                RequestStatus::Completed => {}
            }
        }
        stats
    }

    /// Pending entries in drain order: priority rank ascending, then
    /// creation time, then id (ids embed the mint sequence, so same-millis
    /// submissions keep submission order).
    pub fn pending_sorted(&self) -> Vec<QueuedRequest> {
        let mut pending: Vec<QueuedRequest> = self
            .lock()
            .values()
            .filter(|e| e.status == RequestStatus::Pending)
            .cloned()
            .collect();
        pending.sort_by(|a, b| {
            (a.priority, a.created_at_ms, &a.id).cmp(&(b.priority, b.created_at_ms, &b.id))
        });
        pending
    }

    /// Revert entries left `processing` by an interrupted pass back to
    /// `pending` so the next pass re-selects them. Returns how many.
    pub fn reset_stale_processing(&self) -> usize {
        let mut entries = self.lock();
        let mut reverted = 0;
        for e in entries.values_mut() {
            if e.status == RequestStatus::Processing {
                e.status = RequestStatus::Pending;
                reverted += 1;
            }
        }
        reverted
    }

    /// Move a pending entry to `processing` and stamp its attempt time.
    /// Returns false if the entry is gone or no longer pending.
    pub fn mark_processing(&self, id: &str) -> bool {
        let mut entries = self.lock();
        match entries.get_mut(id) {
            Some(e) if e.status == RequestStatus::Pending => {
                e.status = RequestStatus::Processing;
                e.last_attempt_at_ms = Some(now_unix_ms());
                true
            }
            _ => false,
        }
    }

    /// Dispatch succeeded: drop the entry from the queue.
    pub fn complete(&self, id: &str) {
        self.lock().remove(id);
    }

    /// Dispatch failed: bump the retry counter and store the error. The
    /// entry turns `failed` (kept, never auto-deleted) once the counter
    /// reaches `max_retries`, otherwise it goes back to `pending` for a
    /// later pass. Returns the resulting status.
    pub fn record_failure(&self, id: &str, error: &str, max_retries: u32) -> RequestStatus {
        let mut entries = self.lock();
        let Some(e) = entries.get_mut(id) else {
            return RequestStatus::Failed;
        };
        e.retry_count += 1;
        e.last_error = Some(error.to_string());
        e.status = if e.retry_count >= max_retries {
            RequestStatus::Failed
        } else {
            RequestStatus::Pending
        };
        e.status
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<RequestId, QueuedRequest>> {
        self.entries.lock().expect("request queue mutex poisoned")
    }
}
