//! Transient on-disk copies of uploaded documents.
//!
//! Loaders read from a path, so uploaded bytes are written to a scratch
//! directory for the duration of one index build and removed afterwards.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{RagError, Result};

/// Writes uploads into a scratch directory and removes them again.
#[derive(Debug, Clone)]
pub struct TempFileStore {
    dir: PathBuf,
}

impl Default for TempFileStore {
    fn default() -> Self {
        Self::new(std::env::temp_dir().join("docinsight"))
    }
}

impl TempFileStore {
    /// Use `dir` as the scratch directory. It is created on first save.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Write `bytes` to a uniquely named file, keeping the extension of
    /// `file_name` so loaders can recognise the type.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::StorageError`] if the directory or file cannot be written.
    pub async fn save(&self, bytes: &[u8], file_name: &str) -> Result<PathBuf> {
        tokio::fs::create_dir_all(&self.dir).await.map_err(|e| {
            RagError::StorageError(format!("cannot create '{}': {e}", self.dir.display()))
        })?;

        let mut name = Uuid::new_v4().to_string();
        if let Some(extension) = Path::new(file_name).extension().and_then(|e| e.to_str()) {
            name.push('.');
            name.push_str(extension);
        }
        let path = self.dir.join(name);

        tokio::fs::write(&path, bytes).await.map_err(|e| {
            RagError::StorageError(format!("cannot write '{}': {e}", path.display()))
        })?;

        debug!(path = %path.display(), bytes = bytes.len(), "saved upload");
        Ok(path)
    }

    /// Remove a file written by [`save`](Self::save).
    ///
    /// Never fails: a missing file is ignored and other errors are logged.
    pub async fn delete(&self, path: &Path) {
        match tokio::fs::remove_file(path).await {
            Ok(()) => debug!(path = %path.display(), "deleted upload"),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => warn!(path = %path.display(), error = %e, "failed to delete upload"),
        }
    }
}
