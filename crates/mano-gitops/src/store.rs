//! Content-addressed package storage: each emitted [`PackageSet`] is
//! signed by hashing `(plan fingerprint, package content)` and written
//! under the overlay directory at that digest (`spec.md` §4.5).

use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::{error::GitopsError, package::PackageSet};

/// Hex-encoded sha256 over the plan fingerprint and the serialized
/// package content.
#[must_use]
pub fn content_digest(package_set: &PackageSet) -> Result<String, GitopsError> {
    let json = serde_json::to_vec(package_set).map_err(GitopsError::Serialize)?;
    let mut hasher = Sha256::new();
    hasher.update(package_set.plan_fingerprint.as_bytes());
    hasher.update(&json);
    Ok(hasher.finalize().iter().map(|b| format!("{b:02x}")).collect())
}

fn package_path(overlay_dir: &Path, cluster_id: &str, digest: &str) -> PathBuf {
    overlay_dir.join(cluster_id).join(format!("{digest}.json"))
}

/// Writes `package_set` to `overlay_dir/<cluster_id>/<digest>.json`
/// atomically, returning the path it was written to.
pub async fn write_package(
    overlay_dir: &Path,
    cluster_id: &str,
    package_set: &PackageSet,
) -> Result<PathBuf, GitopsError> {
    let digest = content_digest(package_set)?;
    let path = package_path(overlay_dir, cluster_id, &digest);
    mano_core::store::write_atomic(&path, package_set)
        .await
        .map_err(|source| GitopsError::Write {
            path: path.clone(),
            source,
        })?;
    Ok(path)
}

/// Reads back a previously written package set by its content digest.
pub async fn read_package(
    overlay_dir: &Path,
    cluster_id: &str,
    digest: &str,
) -> Result<PackageSet, GitopsError> {
    let path = package_path(overlay_dir, cluster_id, digest);
    mano_core::store::read_json(&path)
        .await
        .map_err(|source| GitopsError::Write { path, source })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_package_set() -> PackageSet {
        PackageSet {
            slice_id: "abc".to_owned(),
            plan_fingerprint: "deadbeef".to_owned(),
            namespace: "mano-slice-abc".to_owned(),
            workloads: vec![],
            services: vec![],
            configs: vec![],
            secrets: vec![],
            network_policies: vec![],
        }
    }

    #[test]
    fn digest_is_deterministic() {
        let package_set = sample_package_set();
        assert_eq!(
            content_digest(&package_set).unwrap(),
            content_digest(&package_set).unwrap()
        );
    }

    #[test]
    fn digest_changes_with_fingerprint() {
        let mut a = sample_package_set();
        let b = {
            let mut p = sample_package_set();
            p.plan_fingerprint = "cafebabe".to_owned();
            p
        };
        a.namespace = a.namespace.clone();
        assert_ne!(content_digest(&a).unwrap(), content_digest(&b).unwrap());
    }

    #[tokio::test]
    async fn round_trips_through_overlay_dir() {
        let dir = std::env::temp_dir().join(format!(
            "mano-gitops-store-test-{}",
            mano_core::csprng::random_hex_suffix(8)
        ));
        let package_set = sample_package_set();
        let path = write_package(&dir, "edge-1", &package_set).await.unwrap();
        assert!(path.starts_with(&dir));
        let digest = content_digest(&package_set).unwrap();
        let read_back = read_package(&dir, "edge-1", &digest).await.unwrap();
        assert_eq!(read_back, package_set);
        let _ = std::fs::remove_dir_all(&dir);
    }
}
