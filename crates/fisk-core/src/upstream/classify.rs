//! Classify upstream failures as retryable or terminal.

use crate::config::RetryConfig;

use super::error::UpstreamError;

/// Whether a failed attempt is worth retrying.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    Retryable,
    Terminal,
}

impl FailureClass {
    pub fn as_str(self) -> &'static str {
        match self {
            FailureClass::Retryable => "retryable",
            FailureClass::Terminal => "terminal",
        }
    }
}

/// Classify an HTTP status code against the configured retryable set.
pub fn classify_status(code: u16, cfg: &RetryConfig) -> FailureClass {
    if cfg.retryable_status.contains(&code) {
        return FailureClass::Retryable;
    }
    if cfg.retry_server_errors && (500..=599).contains(&code) {
        return FailureClass::Retryable;
    }
    FailureClass::Terminal
}

/// Classify one attempt's error.
///
/// Transport failures (no response received) are always retryable. Statuses
/// follow the configured set. Application-level rejections are terminal:
/// retrying them wastes attempts and can mask a caller bug.
pub fn classify(err: &UpstreamError, cfg: &RetryConfig) -> FailureClass {
    match err {
        UpstreamError::Transport(_) => FailureClass::Retryable,
        UpstreamError::Status { code, .. } => classify_status(*code, cfg),
        UpstreamError::Rejected(_) => FailureClass::Terminal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_always_retryable() {
        let cfg = RetryConfig::default();
        let err = UpstreamError::Transport("connection refused".into());
        assert_eq!(classify(&err, &cfg), FailureClass::Retryable);
    }

    #[test]
    fn default_retryable_statuses() {
        let cfg = RetryConfig::default();
        assert_eq!(classify_status(408, &cfg), FailureClass::Retryable);
        assert_eq!(classify_status(429, &cfg), FailureClass::Retryable);
        assert_eq!(classify_status(500, &cfg), FailureClass::Retryable);
        assert_eq!(classify_status(503, &cfg), FailureClass::Retryable);
        assert_eq!(classify_status(599, &cfg), FailureClass::Retryable);
    }

    #[test]
    fn client_errors_terminal() {
        let cfg = RetryConfig::default();
        assert_eq!(classify_status(400, &cfg), FailureClass::Terminal);
        assert_eq!(classify_status(401, &cfg), FailureClass::Terminal);
        assert_eq!(classify_status(404, &cfg), FailureClass::Terminal);
        assert_eq!(classify_status(422, &cfg), FailureClass::Terminal);
    }

    #[test]
    fn server_errors_follow_family_flag() {
        let mut cfg = RetryConfig::default();
        cfg.retry_server_errors = false;
        assert_eq!(classify_status(503, &cfg), FailureClass::Terminal);
        // Explicitly listed codes still win.
        assert_eq!(classify_status(429, &cfg), FailureClass::Retryable);
    }

    #[test]
    fn rejection_terminal() {
        let cfg = RetryConfig::default();
        let err = UpstreamError::Rejected("invoice schema invalid".into());
        assert_eq!(classify(&err, &cfg), FailureClass::Terminal);
    }
}
