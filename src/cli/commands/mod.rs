//! cli::commands
//!
//! Command dispatch and handlers.
//!
//! # Architecture
//!
//! Each command handler:
//! 1. Opens the registry for the resolved repository
//! 2. Calls the matching [`Registry`] operation
//! 3. Formats and displays output
//!
//! Handlers do NOT touch `modules.json` directly.

mod inspect;
mod install;
mod remove;

// Re-export command functions for testing and direct invocation
pub use inspect::{deps, list, show};
pub use install::install;
pub use remove::{purge, purge_removed, remove};

use anyhow::{Context as _, Result};

use crate::cli::args::Command;
use crate::cli::Context;
use crate::core::paths::RepoPaths;
use crate::registry::{FileStorage, Registry};
use crate::schema::YangImporter;

/// Dispatch a command to its handler.
pub fn dispatch(command: Command, ctx: &Context) -> Result<()> {
    match command {
        Command::Install {
            file,
            search_dirs,
            replay,
        } => install::install(ctx, &file, &search_dirs, replay),
        Command::Remove { name } => remove::remove(ctx, &name),
        Command::Purge { name } => remove::purge(ctx, &name),
        Command::PurgeRemoved => remove::purge_removed(ctx),
        Command::Show { name, json } => inspect::show(ctx, &name, json),
        Command::List => inspect::list(ctx),
        Command::Deps { name } => inspect::deps(ctx, &name),
    }
}

/// Open the registry stored in the context's repository.
pub(crate) fn open_registry(ctx: &Context) -> Result<Registry> {
    let storage = FileStorage::new(RepoPaths::new(&ctx.repo));
    Registry::open(Box::new(storage), Box::new(YangImporter::new()))
        .with_context(|| format!("failed to open registry at '{}'", ctx.repo.display()))
}
