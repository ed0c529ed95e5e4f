//! install command - Import a module file and register it

use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};

use super::open_registry;
use crate::cli::Context;
use crate::ui::output;

/// Install a module.
///
/// Search paths are the `-s` directories followed by the configured ones.
/// Replay is enabled by `--replay` or by `replay_by_default`.
pub fn install(ctx: &Context, file: &Path, search_dirs: &[PathBuf], replay: bool) -> Result<()> {
    let registry = open_registry(ctx)?;

    let mut search_paths = search_dirs.to_vec();
    for dir in ctx.config.search_dirs() {
        if !search_paths.contains(&dir) {
            search_paths.push(dir);
        }
    }
    let replay = replay || ctx.config.replay_by_default();

    let name = registry
        .install_module(file, &search_paths, replay)
        .with_context(|| format!("failed to install '{}'", file.display()))?;

    let record = registry.get_module_record(name.as_str())?;
    output::print(
        format!("Installed {}", output::format_record(&record)),
        ctx.verbosity,
    );
    Ok(())
}
