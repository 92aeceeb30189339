//! Upstream attempt handling: error shape, retry classification, backoff,
//! and the retry executor that drives one logical request to completion.
//!
//! The client never owns the transport; domain collaborators supply the
//! actual call as an opaque async closure or registered handler, and this
//! module decides whether and when to run it again after a failure.

mod backoff;
mod classify;
mod error;
mod execute;

pub use backoff::backoff_delay;
pub use classify::{classify, classify_status, FailureClass};
pub use error::UpstreamError;
pub use execute::{run_with_retry, CallResult};
