use log::{debug, info};
use std::path::{Path, PathBuf};
use tokio::fs as async_fs;

use crate::utils::{P2PError, Result};

pub const FILE_EXTENSION: &str = "txt";

/// A peer's storage directory. Logical file `name` lives at `<shared_dir>/<name>.txt`.
pub struct FileManager {
    shared_dir: PathBuf,
}

impl FileManager {
    pub async fn new(shared_dir: PathBuf) -> Result<Self> {
        async_fs::create_dir_all(&shared_dir)
            .await
            .map_err(|e| P2PError::IoError(format!("Failed to create directory: {}", e)))?;

        info!("Serving files from: {:?}", shared_dir);
        Ok(Self { shared_dir })
    }

    pub fn shared_dir(&self) -> &Path {
        &self.shared_dir
    }

    /// Rejects names that would escape the storage directory.
    pub fn path_for(&self, name: &str) -> Result<PathBuf> {
        if name.is_empty() || name.contains(['/', '\\']) || name == "." || name == ".." {
            return Err(P2PError::LocalFileMissing(format!("invalid file name: {:?}", name)));
        }
        Ok(self.shared_dir.join(format!("{}.{}", name, FILE_EXTENSION)))
    }

    pub async fn exists(&self, name: &str) -> bool {
        match self.path_for(name) {
            Ok(path) => async_fs::metadata(&path)
                .await
                .map(|m| m.is_file())
                .unwrap_or(false),
            Err(_) => false,
        }
    }

    pub async fn open(&self, name: &str) -> Result<async_fs::File> {
        let path = self.path_for(name)?;
        async_fs::File::open(&path)
            .await
            .map_err(|e| P2PError::LocalFileMissing(format!("{:?}: {}", path, e)))
    }

    /// Staging path a download is written to before it replaces `<name>.txt`.
    pub fn partial_path_for(&self, name: &str) -> Result<PathBuf> {
        self.path_for(name)?;
        Ok(self.shared_dir.join(format!("{}.{}.part", name, FILE_EXTENSION)))
    }

    /// Creates (or truncates) the staging file for `name`. The published copy is untouched.
    pub async fn create_partial(&self, name: &str) -> Result<async_fs::File> {
        let path = self.partial_path_for(name)?;
        debug!("Creating staging file {:?}", path);
        async_fs::File::create(&path)
            .await
            .map_err(|e| P2PError::IoError(format!("Failed to create {:?}: {}", path, e)))
    }

    /// Moves a finished staging file over `<name>.txt`.
    pub async fn commit_partial(&self, name: &str) -> Result<PathBuf> {
        let partial = self.partial_path_for(name)?;
        let path = self.path_for(name)?;
        async_fs::rename(&partial, &path).await.map_err(|e| {
            P2PError::IoError(format!("Failed to move {:?} to {:?}: {}", partial, path, e))
        })?;
        Ok(path)
    }

    pub async fn discard_partial(&self, name: &str) {
        if let Ok(partial) = self.partial_path_for(name) {
            if let Err(e) = async_fs::remove_file(&partial).await {
                debug!("No staging file removed at {:?}: {}", partial, e);
            }
        }
    }
}
