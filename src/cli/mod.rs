//! cli
//!
//! Command-line interface layer for modreg.
//!
//! # Responsibilities
//!
//! - Parse command-line arguments and global flags
//! - Resolve the repository and configuration
//! - Delegate to command handlers
//!
//! # Architecture
//!
//! The CLI layer is thin. It parses arguments via clap and dispatches to
//! [`crate::registry::Registry`]. All state changes flow through the
//! registry, which persists through [`crate::registry::FileStorage`].

pub mod args;
pub mod commands;

pub use args::Cli;

use std::path::PathBuf;

use anyhow::{Context as _, Result};

use crate::core::config::Config;
use crate::telemetry;
use crate::ui::output::Verbosity;

/// Execution context shared by every command.
#[derive(Debug, Clone)]
pub struct Context {
    /// Registry repository directory
    pub repo: PathBuf,
    /// Loaded configuration (global and repo)
    pub config: Config,
    /// Output verbosity
    pub verbosity: Verbosity,
}

/// Run the CLI application.
///
/// This is the main entry point called from `main.rs`.
pub fn run() -> Result<()> {
    let cli = Cli::parse_args();
    let verbosity = Verbosity::from_flags(cli.quiet, cli.debug);
    telemetry::init(verbosity);

    let ctx = context(cli.repo, verbosity)?;
    commands::dispatch(cli.command, &ctx)
}

/// Resolve the repository (flag, then global config) and load its config.
fn context(repo_flag: Option<PathBuf>, verbosity: Verbosity) -> Result<Context> {
    let repo = match repo_flag {
        Some(repo) => repo,
        None => Config::load(None)
            .context("failed to load configuration")?
            .repo_path()
            .map(PathBuf::from)
            .context("no repository given; pass --repo or set repo_path in the config file")?,
    };

    let config = Config::load(Some(&repo)).context("failed to load configuration")?;
    Ok(Context {
        repo,
        config,
        verbosity,
    })
}
