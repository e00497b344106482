use std::path::PathBuf;

use log::{debug, warn};
use tokio::fs;

use crate::engine::models::Manifest;
use crate::env;

const MANIFEST_FILE: &str = "manifest.json";

/// Owns the persisted manifest and the download/install directories.
#[derive(Clone)]
pub struct StorageManager {
    base_dir: PathBuf,
}

impl StorageManager {
    pub fn new() -> Self {
        // Best-effort directory creation; failures are surfaced on write.
        let _ = env::ensure_base_dirs();
        Self {
            base_dir: env::default_app_dir(),
        }
    }

    pub fn with_base_dir(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// Load the local manifest state. A missing or unparsable file yields the
    /// all-null default rather than an error.
    pub async fn read_manifest(&self) -> Manifest {
        let path = self.manifest_path();
        match fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice(&bytes).unwrap_or_else(|err| {
                warn!(
                    "storage: discarding unparsable manifest {}: {err}",
                    path.display()
                );
                Manifest::default()
            }),
            Err(err) => {
                debug!("storage: no manifest at {} ({err})", path.display());
                Manifest::default()
            }
        }
    }

    /// Overwrite the local manifest state. Writes to a sibling temp file and
    /// renames it into place so a crash mid-write cannot leave a torn
    /// manifest behind for the next run.
    pub async fn write_manifest(&self, manifest: &Manifest) -> Result<(), String> {
        let path = self.manifest_path();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| format!("unable to create state dir: {e}"))?;
        }

        let json = serde_json::to_vec_pretty(manifest)
            .map_err(|e| format!("unable to encode manifest: {e}"))?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, &json)
            .await
            .map_err(|e| format!("unable to write manifest: {e}"))?;
        fs::rename(&tmp, &path)
            .await
            .map_err(|e| format!("unable to persist manifest: {e}"))
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.base_dir.join(MANIFEST_FILE)
    }

    /// Where a descriptor's archive lands before extraction.
    pub fn archive_path(&self, relative: &str) -> PathBuf {
        self.base_dir.join(relative)
    }

    pub fn install_dir(&self) -> PathBuf {
        self.base_dir.join("bin").join("latest")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::models::Manifest;

    fn storage() -> (tempfile::TempDir, StorageManager) {
        let dir = tempfile::tempdir().unwrap();
        let storage = StorageManager::with_base_dir(dir.path());
        (dir, storage)
    }

    #[tokio::test]
    async fn missing_manifest_reads_as_default() {
        let (_dir, storage) = storage();
        assert_eq!(storage.read_manifest().await, Manifest::default());
    }

    #[tokio::test]
    async fn corrupt_manifest_reads_as_default() {
        let (_dir, storage) = storage();
        std::fs::write(storage.manifest_path(), b"{not json").unwrap();
        assert_eq!(storage.read_manifest().await, Manifest::default());
    }

    #[tokio::test]
    async fn write_then_read_round_trips() {
        let (_dir, storage) = storage();
        let manifest = Manifest {
            runtime_version: Some("5".into()),
            game_version: Some("12".into()),
            runtime_path: Some("r5.zip".into()),
            game_path: Some("g12.zip".into()),
        };
        storage.write_manifest(&manifest).await.unwrap();
        assert_eq!(storage.read_manifest().await, manifest);
    }

    #[tokio::test]
    async fn write_leaves_no_temp_file_behind() {
        let (_dir, storage) = storage();
        storage.write_manifest(&Manifest::default()).await.unwrap();
        assert!(storage.manifest_path().exists());
        assert!(!storage.manifest_path().with_extension("json.tmp").exists());
    }
}
