//! show, list and deps commands - read-only views of the registry
//!
//! Query results always go to stdout, even with `--quiet`.

use anyhow::{Context as _, Result};

use super::open_registry;
use crate::cli::Context;
use crate::ui::output;

/// Print the canonical record of one module.
pub fn show(ctx: &Context, name: &str, json: bool) -> Result<()> {
    let registry = open_registry(ctx)?;
    let tree = registry.render_module(name)?;
    if json {
        println!("{}", tree.to_json_pretty().context("failed to encode record")?);
    } else {
        println!("{}", tree.to_xml());
    }
    Ok(())
}

/// List modules in registration order.
pub fn list(ctx: &Context) -> Result<()> {
    let registry = open_registry(ctx)?;
    let records = registry.list_modules();
    if records.is_empty() {
        output::print("No modules installed", ctx.verbosity);
        return Ok(());
    }
    for record in &records {
        println!("{}", output::format_record(record));
    }
    Ok(())
}

/// Show a module's dependencies and its live dependents.
pub fn deps(ctx: &Context, name: &str) -> Result<()> {
    let registry = open_registry(ctx)?;
    let record = registry.get_module_record(name)?;
    let dependents = registry.dependents(name)?;

    println!("{}", output::format_record(&record));

    if !record.data_deps().is_empty() {
        println!("data dependencies:");
        println!("{}", output::format_deps(record.data_deps(), "  "));
    }

    if !record.op_deps().is_empty() {
        println!("operation dependencies:");
        for op in record.op_deps() {
            println!("  {}", op.xpath().path());
            if !op.in_deps().is_empty() {
                println!("    in:");
                println!("{}", output::format_deps(op.in_deps(), "      "));
            }
            if !op.out_deps().is_empty() {
                println!("    out:");
                println!("{}", output::format_deps(op.out_deps(), "      "));
            }
        }
    }

    if !dependents.is_empty() {
        println!("required by:");
        println!("{}", output::format_list(&dependents, "  "));
    }
    Ok(())
}
