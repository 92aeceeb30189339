//! Deferred-request queue: entries, priority-ordered state, drain pass and
//! disk persistence.
//!
//! Requests that should not (or cannot) run right now are parked here and
//! drained later, highest priority first, behind the circuit breaker gate.

mod drain;
mod entry;
mod persist;
mod state;

pub use drain::DrainSummary;
pub use entry::{Priority, QueuedRequest, RequestId, RequestStatus};
pub use state::{QueueStats, RequestQueue};

pub(crate) use drain::drain_pass;
