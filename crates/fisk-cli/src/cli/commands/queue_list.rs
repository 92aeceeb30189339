//! `fisk queue list` – list queued requests.

use anyhow::Result;
use fisk_core::queue::RequestQueue;

pub fn run_queue_list() -> Result<()> {
    let path = RequestQueue::default_path()?;
    let Some(queue) = RequestQueue::load_from_path(&path)? else {
        println!("Queue is empty.");
        return Ok(());
    };
    let entries = queue.list();
    if entries.is_empty() {
        println!("Queue is empty.");
        return Ok(());
    }

    println!(
        "{:<28} {:<16} {:<8} {:<10} {:<7} {}",
        "ID", "TYPE", "PRIO", "STATUS", "RETRIES", "LAST ERROR"
    );
    for e in entries {
        println!(
            "{:<28} {:<16} {:<8} {:<10} {:<7} {}",
            e.id,
            e.request_type,
            e.priority.as_str(),
            e.status.as_str(),
            e.retry_count,
            e.last_error.as_deref().unwrap_or("-")
        );
    }
    Ok(())
}
