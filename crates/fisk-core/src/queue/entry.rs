//! Queued request types.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Queued request identifier: unique, roughly monotonic, readable in logs
/// and CLI output (`req-<unix-millis>-<seq>`).
pub type RequestId = String;

/// Dispatch priority. Lower numeric rank drains first; entries of equal
/// priority drain in submission order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    /// Numeric rank (high=1, low=3), as shown on the wire and in the CLI.
    pub fn rank(self) -> u8 {
        match self {
            Priority::High => 1,
            Priority::Medium => 2,
            Priority::Low => 3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "high" => Some(Priority::High),
            "medium" => Some(Priority::Medium),
            "low" => Some(Priority::Low),
            _ => None,
        }
    }
}

/// Lifecycle of a queued request. `completed` entries are removed from the
/// queue; `failed` entries stay for operator inspection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl RequestStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Processing => "processing",
            RequestStatus::Completed => "completed",
            RequestStatus::Failed => "failed",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "pending" => RequestStatus::Pending,
            "processing" => RequestStatus::Processing,
            "completed" => RequestStatus::Completed,
            _ => RequestStatus::Failed,
        }
    }
}

/// One deferred request awaiting (re)dispatch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueuedRequest {
    pub id: RequestId,
    pub request_type: String,
    pub priority: Priority,
    /// Opaque domain payload; handed to the registered handler untouched.
    pub payload: Value,
    /// Dispatch failures so far; the entry turns `failed` when this reaches
    /// the retry budget.
    pub retry_count: u32,
    pub status: RequestStatus,
    pub created_at_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_attempt_at_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}
