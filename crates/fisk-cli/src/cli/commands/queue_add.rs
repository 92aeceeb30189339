//! `fisk queue add` – append a request to the persisted queue.

use anyhow::{Context, Result};
use fisk_core::queue::{Priority, RequestQueue};

pub fn run_queue_add(request_type: &str, payload: &str, priority: &str) -> Result<()> {
    let priority = Priority::from_str(priority)
        .with_context(|| format!("invalid priority {priority:?} (use high, medium or low)"))?;
    let payload: serde_json::Value =
        serde_json::from_str(payload).context("payload is not valid JSON")?;

    let path = RequestQueue::default_path()?;
    let queue = RequestQueue::load_from_path(&path)?.unwrap_or_default();
    let id = queue.enqueue(request_type, payload, priority);
    queue.save_to_path(&path)?;

    println!("queued {id} ({request_type}, {})", priority.as_str());
    Ok(())
}
