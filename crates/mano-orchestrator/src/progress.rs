//! Idempotence log: every reconciliation step is keyed on
//! `(slice id, placement name, step index)`; repeating a completed step
//! is a no-op, and a restart resumes at the next one (`spec.md` §4.4,
//! "Idempotence").

use std::path::{Path, PathBuf};

use mano_core::{SliceId, store};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReconcileProgress {
    completed_steps: std::collections::HashSet<String>,
}

impl ReconcileProgress {
    #[must_use]
    pub fn is_done(&self, key: &str) -> bool {
        self.completed_steps.contains(key)
    }

    pub fn mark_done(&mut self, key: impl Into<String>) {
        self.completed_steps.insert(key.into());
    }
}

#[must_use]
pub fn apply_step_key(placement_name: &str) -> String {
    format!("placement_apply:{placement_name}")
}

#[must_use]
pub fn ready_step_key(placement_name: &str) -> String {
    format!("placement_ready:{placement_name}")
}

#[must_use]
pub fn tn_activation_step_key(placement_name: &str) -> String {
    format!("tn_activation:{placement_name}")
}

pub const VALIDATION_STEP_KEY: &str = "validation";

fn path_for(data_dir: &Path, slice_id: SliceId) -> PathBuf {
    data_dir.join("progress").join(format!("{slice_id}.json"))
}

/// A missing or unreadable progress file means a fresh slice: start from
/// an empty log rather than failing the reconcile.
pub async fn load(data_dir: &Path, slice_id: SliceId) -> ReconcileProgress {
    store::read_json(&path_for(data_dir, slice_id)).await.unwrap_or_default()
}

pub async fn save(
    data_dir: &Path,
    slice_id: SliceId,
    progress: &ReconcileProgress,
) -> Result<(), store::StoreError> {
    store::write_atomic(&path_for(data_dir, slice_id), progress).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn round_trips_through_atomic_store() {
        let dir = std::env::temp_dir().join(format!("mano-orch-progress-test-{}", mano_core::csprng::random_hex_suffix(8)));
        let slice_id = SliceId::new();
        let mut progress = ReconcileProgress::default();
        progress.mark_done(apply_step_key("ran"));
        save(&dir, slice_id, &progress).await.unwrap();

        let reloaded = load(&dir, slice_id).await;
        assert!(reloaded.is_done(&apply_step_key("ran")));
        assert!(!reloaded.is_done(&apply_step_key("cn")));
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn missing_file_yields_empty_progress() {
        let dir = std::env::temp_dir().join(format!("mano-orch-progress-missing-{}", mano_core::csprng::random_hex_suffix(8)));
        let progress = load(&dir, SliceId::new()).await;
        assert!(!progress.is_done("anything"));
    }
}
