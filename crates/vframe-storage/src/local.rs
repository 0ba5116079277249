//! Filesystem-backed implementation of the storage port.
//!
//! References are paths relative to the base directory (`uploads/...`,
//! `artifacts/...`), so they stay opaque to callers and survive a move
//! of the base directory itself.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tracing::{debug, info};
use uuid::Uuid;

use vframe_core::{Storage, StorageError, UploadStream};
use vframe_models::StorageRef;

/// Storage gateway configuration.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Base directory for uploads, artifacts and temp trees
    pub base_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("./data"),
        }
    }
}

impl StorageConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            base_dir: std::env::var("STORAGE_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./data")),
        }
    }
}

/// Local filesystem storage rooted at a base directory.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    base_dir: PathBuf,
}

impl LocalStorage {
    /// Create the gateway, ensuring the directory layout exists.
    pub fn new(config: StorageConfig) -> Result<Self, StorageError> {
        let storage = Self {
            base_dir: config.base_dir,
        };
        std::fs::create_dir_all(storage.uploads_dir())?;
        std::fs::create_dir_all(storage.artifacts_dir())?;
        std::fs::create_dir_all(storage.temp_root())?;
        Ok(storage)
    }

    fn uploads_dir(&self) -> PathBuf {
        self.base_dir.join("uploads")
    }

    fn artifacts_dir(&self) -> PathBuf {
        self.base_dir.join("artifacts")
    }

    fn temp_root(&self) -> PathBuf {
        self.base_dir.join("tmp")
    }
}

#[async_trait]
impl Storage for LocalStorage {
    async fn save_upload(
        &self,
        mut reader: UploadStream,
        filename: &str,
    ) -> Result<StorageRef, StorageError> {
        let name = format!("{}-{}", Uuid::new_v4(), sanitize_filename(filename));
        let path = self.uploads_dir().join(&name);

        let mut file = fs::File::create(&path).await?;
        let bytes = tokio::io::copy(&mut reader, &mut file).await?;
        file.sync_all().await?;

        info!("saved upload {} ({} bytes)", path.display(), bytes);
        Ok(StorageRef::from(format!("uploads/{name}")))
    }

    async fn save_artifact(&self, local_path: &Path) -> Result<StorageRef, StorageError> {
        let name = local_path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                StorageError::invalid_ref(format!("artifact has no filename: {}", local_path.display()))
            })?
            .to_string();
        let dest = self.artifacts_dir().join(&name);

        move_file(local_path, &dest).await?;

        info!("stored artifact {}", dest.display());
        Ok(StorageRef::from(format!("artifacts/{name}")))
    }

    async fn make_temp_dir(&self, prefix: &str) -> Result<PathBuf, StorageError> {
        let root = self.temp_root();
        let prefix = format!("{}-", sanitize_filename(prefix));
        // Builder is blocking but cheap; the directory must outlive the
        // TempDir handle, so the handle is disarmed with into_path.
        let dir = tokio::task::spawn_blocking(move || {
            tempfile::Builder::new()
                .prefix(&prefix)
                .tempdir_in(root)
                .map(|d| d.into_path())
        })
        .await
        .map_err(|e| StorageError::Io(std::io::Error::other(e)))??;

        debug!("created temp dir {}", dir.display());
        Ok(dir)
    }

    fn resolve_path(&self, storage_ref: &StorageRef) -> PathBuf {
        self.base_dir.join(storage_ref.as_str())
    }
}

/// Strip path separators and oddball characters from a client-supplied
/// filename so it cannot escape the storage tree.
fn sanitize_filename(filename: &str) -> String {
    let name: String = filename
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if name.trim_matches(['.', '_']).is_empty() {
        "upload".to_string()
    } else {
        name
    }
}

/// Move `src` to `dst`, falling back to copy+delete when the rename
/// crosses filesystems (EXDEV).
async fn move_file(src: &Path, dst: &Path) -> Result<(), StorageError> {
    match fs::rename(src, dst).await {
        Ok(()) => Ok(()),
        Err(e) if is_cross_device_error(&e) => {
            debug!(
                "cross-device rename, copying instead: {} -> {}",
                src.display(),
                dst.display()
            );
            fs::copy(src, dst).await?;
            fs::remove_file(src).await?;
            Ok(())
        }
        Err(e) => Err(StorageError::Io(e)),
    }
}

/// EXDEV is error code 18 on Linux/macOS.
fn is_cross_device_error(e: &std::io::Error) -> bool {
    e.raw_os_error() == Some(18)
}
