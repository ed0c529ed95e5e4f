//! core::paths
//!
//! Centralized path routing for registry storage locations.
//!
//! # Storage Layout
//!
//! Everything a registry persists lives under one repository directory:
//! - `modules.json` - Persisted module tree
//! - `lock` - Exclusive lock file for writers
//! - `config.toml` - Repository configuration
//!
//! **Hard rule:** no code outside this module joins these file names onto a
//! repository path. All paths go through [`RepoPaths`].
//!
//! # Example
//!
//! ```
//! use modreg::core::paths::RepoPaths;
//! use std::path::PathBuf;
//!
//! let paths = RepoPaths::new("/var/lib/modreg");
//!
//! assert_eq!(
//!     paths.modules_path(),
//!     PathBuf::from("/var/lib/modreg/modules.json")
//! );
//! ```

use std::path::{Path, PathBuf};

/// File name of the persisted module tree.
pub const MODULES_FILE: &str = "modules.json";

/// File name of the writer lock.
pub const LOCK_FILE: &str = "lock";

/// File name of the repository configuration.
pub const CONFIG_FILE: &str = "config.toml";

/// Path routing for one registry repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoPaths {
    root: PathBuf,
}

impl RepoPaths {
    /// Create paths for the repository rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The repository directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path to the persisted module tree.
    pub fn modules_path(&self) -> PathBuf {
        self.root.join(MODULES_FILE)
    }

    /// Path to the writer lock file.
    pub fn lock_path(&self) -> PathBuf {
        self.root.join(LOCK_FILE)
    }

    /// Path to the repository configuration file.
    pub fn config_path(&self) -> PathBuf {
        self.root.join(CONFIG_FILE)
    }

    /// Create the repository directory if it does not exist.
    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.root)
    }
}
