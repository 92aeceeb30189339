//! Persist the queue to disk (JSON under XDG state dir) so deferred
//! requests survive across runs.

use anyhow::{Context, Result};
use std::path::Path;

use super::entry::QueuedRequest;
use super::state::RequestQueue;

impl RequestQueue {
    /// Default path for the queue file: `~/.local/state/fisk/queue.json`.
    pub fn default_path() -> Result<std::path::PathBuf> {
        let xdg_dirs = xdg::BaseDirectories::with_prefix("fisk")?;
        Ok(xdg_dirs.get_state_home().join("fisk").join("queue.json"))
    }

    /// Save the current entries to the given path (creates parent dir if
    /// needed). Entries are written in creation order.
    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        let entries = self.list();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create dir: {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(&entries).context("serialize queue")?;
        std::fs::write(path, json).with_context(|| format!("write queue: {}", path.display()))?;
        Ok(())
    }

    /// Load a queue from the given path. A missing file returns None (caller
    /// starts with an empty queue). Entries persisted mid-dispatch come back
    /// as `pending`.
    pub fn load_from_path(path: &Path) -> Result<Option<RequestQueue>> {
        let bytes = match std::fs::read(path) {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e).with_context(|| format!("read queue: {}", path.display())),
        };
        let entries: Vec<QueuedRequest> =
            serde_json::from_slice(&bytes).with_context(|| format!("parse queue: {}", path.display()))?;
        Ok(Some(RequestQueue::from_entries(entries)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::entry::{Priority, RequestStatus};
    use serde_json::json;

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state").join("queue.json");

        let q = RequestQueue::new();
        let high = q.enqueue("invoice", json!({"invoice_id": 7}), Priority::High);
        let low = q.enqueue("status-poll", json!(null), Priority::Low);
        q.mark_processing(&low);
        q.save_to_path(&path).unwrap();

        let restored = RequestQueue::load_from_path(&path).unwrap().unwrap();
        assert_eq!(restored.len(), 2);
        let entry = restored.get(&high).unwrap();
        assert_eq!(entry.priority, Priority::High);
        assert_eq!(entry.payload, json!({"invoice_id": 7}));
        // Mid-dispatch entries come back pending.
        assert_eq!(restored.get(&low).unwrap().status, RequestStatus::Pending);
    }

    #[test]
    fn load_missing_file_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope.json");
        assert!(RequestQueue::load_from_path(&path).unwrap().is_none());
    }

    #[test]
    fn load_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("queue.json");
        std::fs::write(&path, b"not json").unwrap();
        assert!(RequestQueue::load_from_path(&path).is_err());
    }
}
