//! Presence snapshot manifests.
//!
//! A snapshot is a plain JSON copy of whatever a query produced, written to
//! disk with a timestamped filename. Useful for debugging companions and for
//! frontends that want the last-known presence across restarts.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::context::PresenceContext;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresenceSnapshot {
    pub available: bool,
    pub client_id: u64,
    pub state: Option<String>,
    pub details: Option<String>,
    pub large_icon_url: Option<String>,
    pub small_icon_url: Option<String>,
    /// RFC 3339 capture time.
    pub captured_at: String,
}

impl PresenceSnapshot {
    /// Copy the decoded fields out of a context. Works on unavailable
    /// contexts too, recording the degraded state as-is.
    pub fn capture(context: &PresenceContext) -> Self {
        Self {
            available: context.is_available(),
            client_id: context.client_id(),
            state: context.state().map(str::to_owned),
            details: context.details().map(str::to_owned),
            large_icon_url: context.large_icon_url().map(str::to_owned),
            small_icon_url: context.small_icon_url().map(str::to_owned),
            captured_at: chrono::Local::now().to_rfc3339(),
        }
    }
}

/// Write a snapshot as pretty-printed JSON with a timestamped filename.
/// Returns the path of the file written.
pub fn write_snapshot(snapshot: &PresenceSnapshot, dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(dir)
        .context(format!("Failed to create snapshot directory: {:?}", dir))?;

    let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
    let filename = format!("presence_{}_{}.json", snapshot.client_id, timestamp);
    let path = dir.join(filename);

    let content = serde_json::to_string_pretty(snapshot)?;
    fs::write(&path, content)
        .context(format!("Failed to write snapshot file: {:?}", path))?;

    Ok(path)
}

/// Read a snapshot written by [`write_snapshot`].
pub fn read_snapshot(path: &Path) -> Result<PresenceSnapshot> {
    let content = fs::read_to_string(path)
        .context(format!("Failed to read snapshot file: {:?}", path))?;
    serde_json::from_str(&content)
        .context(format!("Failed to parse snapshot file: {:?}", path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PresenceConfig;
    use crate::resolver::ModuleHandle;

    fn unavailable_context() -> PresenceContext {
        PresenceContext::query(&ModuleHandle::detached(), &PresenceConfig::default()).unwrap()
    }

    #[test]
    fn capture_of_unavailable_context_records_defaults() {
        let snapshot = PresenceSnapshot::capture(&unavailable_context());
        assert!(!snapshot.available);
        assert_eq!(snapshot.client_id, 0);
        assert_eq!(snapshot.state, None);
        assert!(!snapshot.captured_at.is_empty());
    }

    #[test]
    fn write_then_read_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let snapshot = PresenceSnapshot {
            available: true,
            client_id: 42,
            state: Some("Playing".into()),
            details: None,
            large_icon_url: Some("icon.png".into()),
            small_icon_url: None,
            captured_at: chrono::Local::now().to_rfc3339(),
        };

        let path = write_snapshot(&snapshot, dir.path()).unwrap();
        assert!(path.exists());

        let loaded = read_snapshot(&path).unwrap();
        assert!(loaded.available);
        assert_eq!(loaded.client_id, 42);
        assert_eq!(loaded.state.as_deref(), Some("Playing"));
        assert_eq!(loaded.large_icon_url.as_deref(), Some("icon.png"));
        assert_eq!(loaded.small_icon_url, None);
    }
}
