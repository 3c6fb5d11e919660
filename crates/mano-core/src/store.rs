//! Atomic JSON persistence: write-to-temp, fsync, rename
//! (`spec.md` §6, "Persisted state").

use std::path::{Path, PathBuf};

use serde::{Serialize, de::DeserializeOwned};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("failed to serialize document: {0}")]
    Serialize(#[source] serde_json::Error),
    #[error("failed to deserialize document: {0}")]
    Deserialize(#[source] serde_json::Error),
    #[error("io error writing {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Writes `value` as JSON to `path` by writing to a sibling `.tmp` file,
/// fsyncing it, then renaming over the destination — the rename is
/// atomic on the same filesystem, so readers never observe a partial
/// document.
pub async fn write_atomic<T: Serialize>(path: &Path, value: &T) -> Result<(), StoreError> {
    let json = serde_json::to_vec_pretty(value).map_err(StoreError::Serialize)?;
    let tmp_path = tmp_path_for(path);

    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|source| StoreError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
    }

    let file = tokio::fs::File::create(&tmp_path)
        .await
        .map_err(|source| StoreError::Io {
            path: tmp_path.clone(),
            source,
        })?;
    {
        use tokio::io::AsyncWriteExt as _;
        let mut file = file;
        file.write_all(&json)
            .await
            .map_err(|source| StoreError::Io {
                path: tmp_path.clone(),
                source,
            })?;
        file.sync_all().await.map_err(|source| StoreError::Io {
            path: tmp_path.clone(),
            source,
        })?;
    }

    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(|source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(())
}

pub async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, StoreError> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        })?;
    serde_json::from_slice(&bytes).map_err(StoreError::Deserialize)
}

fn tmp_path_for(path: &Path) -> PathBuf {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    PathBuf::from(tmp)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn round_trips_through_atomic_write() {
        let dir = tempfile_dir();
        let path = dir.join("plan.json");
        write_atomic(&path, &vec![1, 2, 3]).await.unwrap();
        let read_back: Vec<i32> = read_json(&path).await.unwrap();
        assert_eq!(read_back, vec![1, 2, 3]);
        let _ = std::fs::remove_dir_all(&dir);
    }

    fn tempfile_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "mano-core-store-test-{}",
            crate::csprng::random_hex_suffix(8)
        ));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }
}
