//! Blob stores for progress records.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProgressError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Malformed progress record: {0}")]
    Malformed(String),
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Key/blob persistence. A missing key is `Ok(None)`, not an error.
pub trait ProgressStore: Send + Sync {
    fn read(&self, path: &str) -> Result<Option<Vec<u8>>, ProgressError>;
    fn write(&self, path: &str, bytes: &[u8]) -> Result<(), ProgressError>;
}

/// Stores blobs as files below a root directory
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> PathBuf {
        self.root.join(path)
    }
}

impl ProgressStore for FileStore {
    fn read(&self, path: &str) -> Result<Option<Vec<u8>>, ProgressError> {
        match fs::read(self.resolve(path)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    /// Writes to a sibling temp file, then renames over the target
    fn write(&self, path: &str, bytes: &[u8]) -> Result<(), ProgressError> {
        let target = self.resolve(path);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut tmp = target.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        fs::write(&tmp, bytes)?;
        fs::rename(&tmp, &target)?;
        Ok(())
    }
}

/// In-memory store for tests and headless sessions
#[derive(Debug, Default)]
pub struct MemoryStore {
    blobs: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryStore {
    pub fn contains(&self, path: &str) -> bool {
        self.blobs
            .lock()
            .map(|blobs| blobs.contains_key(path))
            .unwrap_or(false)
    }
}

impl ProgressStore for MemoryStore {
    fn read(&self, path: &str) -> Result<Option<Vec<u8>>, ProgressError> {
        let blobs = self
            .blobs
            .lock()
            .map_err(|e| ProgressError::Unavailable(e.to_string()))?;
        Ok(blobs.get(path).cloned())
    }

    fn write(&self, path: &str, bytes: &[u8]) -> Result<(), ProgressError> {
        let mut blobs = self
            .blobs
            .lock()
            .map_err(|e| ProgressError::Unavailable(e.to_string()))?;
        blobs.insert(path.to_string(), bytes.to_vec());
        Ok(())
    }
}
