//! core::config::schema
//!
//! Configuration schema types.
//!
//! # Global Config
//!
//! Located at (in order of precedence):
//! 1. `$MODREG_CONFIG` if set
//! 2. `$XDG_CONFIG_HOME/modreg/config.toml`
//! 3. `~/.modreg/config.toml`
//!
//! # Repo Config
//!
//! Located at `<repo>/config.toml`.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::ConfigError;

/// Global configuration (user scope).
///
/// # Example
///
/// ```toml
/// repo_path = "/var/lib/modreg"
/// search_dirs = ["/usr/share/yang/modules", "/usr/local/share/yang"]
/// replay_by_default = false
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct GlobalConfig {
    /// Registry repository used when `--repo` is not given
    pub repo_path: Option<PathBuf>,

    /// Directories searched for imported modules
    pub search_dirs: Option<Vec<PathBuf>>,

    /// Enable replay on install unless told otherwise
    pub replay_by_default: Option<bool>,
}

impl GlobalConfig {
    /// Validate the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if any value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(path) = &self.repo_path {
            if path.as_os_str().is_empty() {
                return Err(ConfigError::InvalidValue(
                    "repo_path cannot be empty".to_string(),
                ));
            }
        }
        validate_search_dirs(self.search_dirs.as_deref())
    }
}

/// Repository configuration.
///
/// # Example
///
/// ```toml
/// search_dirs = ["modules"]
/// replay_by_default = true
/// ```
///
/// Relative search directories are taken relative to the repository.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct RepoConfig {
    /// Directories searched for imported modules
    pub search_dirs: Option<Vec<PathBuf>>,

    /// Enable replay on install unless told otherwise
    pub replay_by_default: Option<bool>,
}

impl RepoConfig {
    /// Validate the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if any value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_search_dirs(self.search_dirs.as_deref())
    }
}

fn validate_search_dirs(dirs: Option<&[PathBuf]>) -> Result<(), ConfigError> {
    if dirs.is_some_and(|d| d.iter().any(|p| p.as_os_str().is_empty())) {
        return Err(ConfigError::InvalidValue(
            "search_dirs entries cannot be empty".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn global_parses_all_keys() {
        let config: GlobalConfig = toml::from_str(
            r#"
            repo_path = "/var/lib/modreg"
            search_dirs = ["/a", "/b"]
            replay_by_default = true
            "#,
        )
        .unwrap();
        assert_eq!(config.repo_path, Some(PathBuf::from("/var/lib/modreg")));
        assert_eq!(config.search_dirs.as_ref().map(Vec::len), Some(2));
        assert_eq!(config.replay_by_default, Some(true));
        config.validate().unwrap();
    }

    #[test]
    fn empty_file_is_default() {
        let config: GlobalConfig = toml::from_str("").unwrap();
        assert_eq!(config, GlobalConfig::default());
    }

    #[test]
    fn unknown_keys_rejected() {
        assert!(toml::from_str::<GlobalConfig>("colour = \"red\"").is_err());
        assert!(toml::from_str::<RepoConfig>("repo_path = \"/x\"").is_err());
    }

    #[test]
    fn empty_search_dir_invalid() {
        let config = RepoConfig {
            search_dirs: Some(vec![PathBuf::from("/ok"), PathBuf::new()]),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn empty_repo_path_invalid() {
        let config = GlobalConfig {
            repo_path: Some(PathBuf::new()),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
