//! Upstream call error type for retry classification.

use std::fmt;

/// Error produced by one attempted call to the authority (transport failure,
/// HTTP status, or an application-level rejection). Kept structured so the
/// classifier can decide retries before the error is flattened into text.
#[derive(Debug, Clone)]
pub enum UpstreamError {
    /// No response at all: connection refused, timeout, DNS failure.
    Transport(String),
    /// A response arrived carrying a non-success HTTP status.
    Status { code: u16, message: String },
    /// The authority answered but rejected the request itself (schema
    /// violation, bad credentials, duplicate submission). Never retried.
    Rejected(String),
}

impl fmt::Display for UpstreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpstreamError::Transport(reason) => write!(f, "transport: {}", reason),
            UpstreamError::Status { code, message } => {
                if message.is_empty() {
                    write!(f, "HTTP {}", code)
                } else {
                    write!(f, "HTTP {}: {}", code, message)
                }
            }
            UpstreamError::Rejected(reason) => write!(f, "rejected: {}", reason),
        }
    }
}

impl std::error::Error for UpstreamError {}
