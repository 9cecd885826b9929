//! File-backed persistence for per-PR tracking documents.
//!
//! One JSON document per pull request under the configured state directory.
//! The store is deliberately dumb: reconstruction from comments lives in the
//! orchestrator, which owns the degradation policy.

use std::fs;
use std::path::{Path, PathBuf};

use reviewgate_core::TrackingState;

use crate::error::GateError;

pub struct TrackingStore {
    dir: PathBuf,
}

impl TrackingStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        TrackingStore { dir: dir.into() }
    }

    pub fn path_for(&self, pr_number: u64) -> PathBuf {
        self.dir.join(format!("pr-{pr_number}-tracking.json"))
    }

    /// Load the local tracking document, if one exists.
    pub fn load(&self, pr_number: u64) -> Result<Option<TrackingState>, GateError> {
        let path = self.path_for(pr_number);
        if !path.exists() {
            return Ok(None);
        }
        let raw = fs::read_to_string(&path)
            .map_err(|e| persistence(&path, "reading tracking document", e))?;
        let state = serde_json::from_str(&raw).map_err(|e| {
            GateError::Persistence(format!(
                "parsing tracking document {}: {e}",
                path.display()
            ))
        })?;
        Ok(Some(state))
    }

    /// Write the tracking document, creating the state directory if needed.
    pub fn save(&self, state: &TrackingState) -> Result<(), GateError> {
        fs::create_dir_all(&self.dir)
            .map_err(|e| persistence(&self.dir, "creating state directory", e))?;
        let path = self.path_for(state.pr_number);
        let raw = serde_json::to_string_pretty(state)
            .map_err(|e| GateError::Persistence(format!("serializing tracking document: {e}")))?;
        fs::write(&path, raw).map_err(|e| persistence(&path, "writing tracking document", e))
    }
}

fn persistence(path: &Path, what: &str, err: std::io::Error) -> GateError {
    GateError::Persistence(format!("{what} {}: {err}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;
    use reviewgate_core::parse_review;

    fn temp_store(name: &str) -> TrackingStore {
        let dir = std::env::temp_dir().join(format!("reviewgate-store-{name}-{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        TrackingStore::new(dir)
    }

    #[test]
    fn test_path_layout_is_per_pr() {
        let store = TrackingStore::new(".reviewgate");
        assert_eq!(
            store.path_for(42),
            PathBuf::from(".reviewgate/pr-42-tracking.json")
        );
    }

    #[test]
    fn test_load_missing_is_none() {
        let store = temp_store("missing");
        assert!(store.load(1).unwrap().is_none());
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let store = temp_store("round-trip");
        let now: DateTime<chrono::Utc> = "2024-12-13T10:00:00Z".parse().unwrap();
        let mut state = TrackingState::new(7, now);
        state.record_review(parse_review("🔴 REQUIRED\nFix injection\n"), None, now);

        store.save(&state).unwrap();
        let loaded = store.load(7).unwrap().unwrap();
        assert_eq!(loaded, state);
    }

    #[test]
    fn test_corrupt_document_is_a_persistence_error() {
        let store = temp_store("corrupt");
        fs::create_dir_all(&store.dir).unwrap();
        fs::write(store.path_for(3), "{ not json").unwrap();

        let err = store.load(3).unwrap_err();
        assert!(matches!(err, GateError::Persistence(_)));
        assert!(!err.is_degradable_read());
    }
}
