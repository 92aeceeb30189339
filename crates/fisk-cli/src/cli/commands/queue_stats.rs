//! `fisk queue stats` – show queue counters.

use anyhow::Result;
use fisk_core::queue::RequestQueue;

pub fn run_queue_stats() -> Result<()> {
    let path = RequestQueue::default_path()?;
    let stats = match RequestQueue::load_from_path(&path)? {
        Some(queue) => queue.stats(),
        None => Default::default(),
    };
    println!("total:      {}", stats.total);
    println!("pending:    {}", stats.pending);
    println!("processing: {}", stats.processing);
    println!("failed:     {}", stats.failed);
    Ok(())
}
