//! core::config
//!
//! Configuration schema and loading.
//!
//! # Overview
//!
//! Two configuration scopes exist:
//! - **Global**: User-level settings
//! - **Repo**: Overrides stored in the registry repository
//!
//! # Precedence
//!
//! Configuration values are resolved in this order (later overrides earlier):
//! 1. Default values
//! 2. Global config file
//! 3. Repo config file
//! 4. CLI flags (not handled here)
//!
//! # Global Config Locations
//!
//! Searched in order:
//! 1. `$MODREG_CONFIG` if set
//! 2. `$XDG_CONFIG_HOME/modreg/config.toml`
//! 3. `~/.modreg/config.toml`
//!
//! # Example
//!
//! ```no_run
//! use modreg::core::config::Config;
//!
//! let global = Config::load(None).unwrap();
//! let repo = global.repo_path().map(|p| p.to_path_buf());
//! let config = Config::load(repo.as_deref()).unwrap();
//! println!("search dirs: {:?}", config.search_dirs());
//! ```

pub mod schema;

pub use schema::{GlobalConfig, RepoConfig};

use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::debug;

use crate::core::paths::RepoPaths;

/// Environment variable naming an explicit global config file.
pub const CONFIG_ENV: &str = "MODREG_CONFIG";

/// Errors from configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("invalid config value: {0}")]
    InvalidValue(String),
}

/// Merged configuration from all sources.
///
/// Accessors apply precedence: repo config overrides global config.
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub global: GlobalConfig,
    pub repo: Option<RepoConfig>,
    repo_root: Option<PathBuf>,
}

impl Config {
    /// Load configuration from default locations.
    ///
    /// If `repo` is provided, its `config.toml` is loaded as well.
    ///
    /// # Errors
    ///
    /// Returns an error if config files exist but cannot be parsed or
    /// hold invalid values. Missing files are not an error.
    pub fn load(repo: Option<&Path>) -> Result<Self, ConfigError> {
        let global_path = Self::find_global();
        let repo_file = repo.map(|r| RepoPaths::new(r).config_path());
        Self::from_files(
            global_path.as_deref(),
            repo_file.as_deref().filter(|p| p.exists()),
            repo,
        )
    }

    /// Load configuration from explicit files.
    pub fn from_files(
        global: Option<&Path>,
        repo_file: Option<&Path>,
        repo_root: Option<&Path>,
    ) -> Result<Self, ConfigError> {
        let global_config: GlobalConfig = match global {
            Some(path) => read_toml(path)?,
            None => GlobalConfig::default(),
        };
        let repo_config: Option<RepoConfig> = repo_file.map(read_toml::<RepoConfig>).transpose()?;

        global_config.validate()?;
        if let Some(ref r) = repo_config {
            r.validate()?;
        }

        debug!(global = ?global, repo = ?repo_file, "loaded configuration");
        Ok(Self {
            global: global_config,
            repo: repo_config,
            repo_root: repo_root.map(Path::to_path_buf),
        })
    }

    fn find_global() -> Option<PathBuf> {
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        if let Ok(xdg_home) = std::env::var("XDG_CONFIG_HOME") {
            let path = PathBuf::from(xdg_home).join("modreg/config.toml");
            if path.exists() {
                return Some(path);
            }
        }

        dirs::home_dir()
            .map(|home| home.join(".modreg/config.toml"))
            .filter(|path| path.exists())
    }

    /// Repository configured globally.
    pub fn repo_path(&self) -> Option<&Path> {
        self.global.repo_path.as_deref()
    }

    /// Import search directories, repo config first.
    ///
    /// Relative repo entries resolve against the repository directory.
    pub fn search_dirs(&self) -> Vec<PathBuf> {
        let repo_dirs = self.repo.as_ref().and_then(|r| r.search_dirs.as_ref());
        match (repo_dirs, &self.repo_root) {
            (Some(dirs), Some(root)) => dirs.iter().map(|d| root.join(d)).collect(),
            (Some(dirs), None) => dirs.clone(),
            (None, _) => self.global.search_dirs.clone().unwrap_or_default(),
        }
    }

    /// Whether installs enable replay when the flag is not given.
    pub fn replay_by_default(&self) -> bool {
        self.repo
            .as_ref()
            .and_then(|r| r.replay_by_default)
            .or(self.global.replay_by_default)
            .unwrap_or(false)
    }
}

fn read_toml<T: DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.to_path_buf(),
        source: e,
    })?;

    toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}
