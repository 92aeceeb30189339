//! CLI command handlers, one file per command.

mod config;
mod drill;
mod queue_add;
mod queue_list;
mod queue_stats;

pub use config::run_config;
pub use drill::run_drill;
pub use queue_add::run_queue_add;
pub use queue_list::run_queue_list;
pub use queue_stats::run_queue_stats;
