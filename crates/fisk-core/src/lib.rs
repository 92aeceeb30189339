pub mod config;
pub mod logging;

pub mod breaker;
pub mod client;
pub mod drill;
pub mod handler;
pub mod queue;
pub mod request_log;
pub mod upstream;
