//! Synthetic upstream with scripted failures for integration tests.
//!
//! Stands in for the tax authority: fails a configured number of attempts,
//! then succeeds, while counting every call it receives.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use fisk_core::handler::{handler_fn, RequestHandler};
use fisk_core::upstream::UpstreamError;
use serde_json::json;

#[derive(Clone, Copy)]
enum Failure {
    Status(u16),
    Transport,
}

/// Attempt-counting upstream stand-in. `handler()` hands out clones that all
/// share the same counter, so one instance can back several request types.
pub struct FlakyUpstream {
    calls: Arc<AtomicU32>,
    fail_first: u32,
    failure: Failure,
}

impl FlakyUpstream {
    /// Fail the first `fail_first` attempts with the given HTTP status.
    pub fn with_status(fail_first: u32, code: u16) -> Self {
        Self {
            calls: Arc::new(AtomicU32::new(0)),
            fail_first,
            failure: Failure::Status(code),
        }
    }

    /// Fail the first `fail_first` attempts with a transport error.
    pub fn with_transport(fail_first: u32) -> Self {
        Self {
            calls: Arc::new(AtomicU32::new(0)),
            fail_first,
            failure: Failure::Transport,
        }
    }

    /// Attempts received so far.
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn handler(&self) -> Arc<dyn RequestHandler> {
        let calls = Arc::clone(&self.calls);
        let fail_first = self.fail_first;
        let failure = self.failure;
        handler_fn(move |payload| {
            let calls = Arc::clone(&calls);
            async move {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                if n < fail_first {
                    Err(match failure {
                        Failure::Status(code) => UpstreamError::Status {
                            code,
                            message: "scripted failure".into(),
                        },
                        Failure::Transport => {
                            UpstreamError::Transport("connection refused".into())
                        }
                    })
                } else {
                    Ok(json!({ "accepted": payload }))
                }
            }
        })
    }
}
