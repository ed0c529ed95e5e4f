//! remove, purge and purge-removed commands

use anyhow::{Context as _, Result};

use super::open_registry;
use crate::cli::Context;
use crate::ui::output;

/// Mark a module as removed.
pub fn remove(ctx: &Context, name: &str) -> Result<()> {
    let registry = open_registry(ctx)?;
    registry
        .remove_module(name)
        .with_context(|| format!("failed to remove '{}'", name))?;
    output::print(format!("Removed {}", name), ctx.verbosity);
    Ok(())
}

/// Delete a module record.
pub fn purge(ctx: &Context, name: &str) -> Result<()> {
    let registry = open_registry(ctx)?;
    registry
        .purge_module(name)
        .with_context(|| format!("failed to purge '{}'", name))?;
    output::print(format!("Purged {}", name), ctx.verbosity);
    Ok(())
}

/// Purge every removed module that nothing live references.
pub fn purge_removed(ctx: &Context) -> Result<()> {
    let registry = open_registry(ctx)?;
    let purged = registry
        .purge_removed()
        .context("failed to purge removed modules")?;

    if purged.is_empty() {
        output::print("Nothing to purge", ctx.verbosity);
    } else {
        output::print(
            format!("Purged {} module(s):\n{}", purged.len(), output::format_list(&purged, "  ")),
            ctx.verbosity,
        );
    }

    let left: Vec<_> = registry
        .list_modules()
        .into_iter()
        .filter(|r| r.is_removed())
        .map(|r| r.name().clone())
        .collect();
    if !left.is_empty() {
        output::warn(
            format!(
                "still referenced, kept: {}",
                left.iter().map(|n| n.as_str()).collect::<Vec<_>>().join(", ")
            ),
            ctx.verbosity,
        );
    }
    Ok(())
}
