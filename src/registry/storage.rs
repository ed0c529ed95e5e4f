//! registry::storage
//!
//! Persistence of the canonical module tree.
//!
//! # CAS Semantics
//!
//! [`FileStorage`] remembers the fingerprint of the bytes it last read or
//! wrote. A write first takes the repository lock, then checks that the
//! file still has that fingerprint; if another process changed it in the
//! meantime the write fails with [`StorageError::Conflict`] and nothing is
//! written. New content goes to a temporary file that is renamed over the
//! old one, so readers never see a partial tree.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use thiserror::Error;
use tracing::debug;

use crate::core::lock::{LockError, RepoLock};
use crate::core::paths::RepoPaths;
use crate::core::types::Fingerprint;
use crate::datatree::DataTree;

/// Errors from reading or writing the persisted tree.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("i/o error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed registry file: {0}")]
    Json(#[from] serde_json::Error),

    /// The persisted tree changed since it was last read.
    #[error("registry file changed underneath: expected {expected}, found {found}")]
    Conflict { expected: String, found: String },

    #[error(transparent)]
    Lock(#[from] LockError),
}

/// Where the canonical tree lives between runs.
pub trait TreeStorage: Send + Sync {
    /// The persisted tree, or `None` if nothing was stored yet.
    fn read(&self) -> Result<Option<DataTree>, StorageError>;

    /// Replace the persisted tree.
    fn write(&self, tree: &DataTree) -> Result<(), StorageError>;
}

/// JSON file in a repository directory.
#[derive(Debug)]
pub struct FileStorage {
    paths: RepoPaths,
    seen: Mutex<Option<Fingerprint>>,
}

impl FileStorage {
    pub fn new(paths: RepoPaths) -> Self {
        Self {
            paths,
            seen: Mutex::new(None),
        }
    }

    pub fn paths(&self) -> &RepoPaths {
        &self.paths
    }

    fn read_bytes(path: &Path) -> Result<Option<Vec<u8>>, StorageError> {
        match fs::read(path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StorageError::Io {
                path: path.to_path_buf(),
                source,
            }),
        }
    }
}

fn describe(fingerprint: Option<&Fingerprint>) -> String {
    fingerprint.map_or_else(|| "nothing".to_string(), |f| f.short(12).to_string())
}

impl TreeStorage for FileStorage {
    fn read(&self) -> Result<Option<DataTree>, StorageError> {
        let path = self.paths.modules_path();
        let bytes = Self::read_bytes(&path)?;
        *self.seen.lock() = bytes.as_deref().map(Fingerprint::compute);
        match bytes {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    fn write(&self, tree: &DataTree) -> Result<(), StorageError> {
        let path = self.paths.modules_path();
        let io_err = |source| StorageError::Io {
            path: path.clone(),
            source,
        };

        self.paths.ensure_dirs().map_err(io_err)?;
        let _lock = RepoLock::acquire(&self.paths)?;

        let mut seen = self.seen.lock();
        let current = Self::read_bytes(&path)?.map(|b| Fingerprint::compute(&b));
        if current != *seen {
            return Err(StorageError::Conflict {
                expected: describe(seen.as_ref()),
                found: describe(current.as_ref()),
            });
        }

        let json = tree.to_json()?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json.as_bytes()).map_err(io_err)?;
        fs::rename(&tmp, &path).map_err(io_err)?;

        let fingerprint = Fingerprint::compute(json.as_bytes());
        debug!(path = %path.display(), fingerprint = fingerprint.short(12), "wrote registry");
        *seen = Some(fingerprint);
        Ok(())
    }
}

/// Storage kept in memory, for embedding and tests.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    tree: Mutex<Option<DataTree>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

}

impl TreeStorage for MemoryStorage {
    fn read(&self) -> Result<Option<DataTree>, StorageError> {
        Ok(self.tree.lock().clone())
    }

    fn write(&self, tree: &DataTree) -> Result<(), StorageError> {
        *self.tree.lock() = Some(tree.clone());
        Ok(())
    }
}
