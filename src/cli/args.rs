//! cli::args
//!
//! Command-line argument definitions using clap derive.
//!
//! # Global Flags
//!
//! These flags are available on all commands:
//! - `--help` / `-h`: Show help
//! - `--version`: Show version
//! - `--repo <dir>`: Registry repository (overrides config)
//! - `--debug`: Enable debug logging
//! - `--quiet` / `-q`: Minimal output

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// modreg - registry of installed schema modules
#[derive(Parser, Debug)]
#[command(name = "modreg")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Registry repository directory
    #[arg(long, global = true, value_name = "DIR")]
    pub repo: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Minimal output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Parser::parse()
    }
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Import a module file and register it
    #[command(after_help = "\
EXAMPLES:
    # Install a module, resolving imports next to it and in /usr/share/yang
    modreg install ietf-interfaces.yang -s /usr/share/yang

    # Install with notification replay enabled
    modreg install refs.yang --replay")]
    Install {
        /// Module source file
        file: PathBuf,

        /// Additional directory searched for imported modules (repeatable)
        #[arg(short = 's', long = "search-dir", value_name = "DIR")]
        search_dirs: Vec<PathBuf>,

        /// Enable replay support for the module
        #[arg(long)]
        replay: bool,
    },

    /// Mark a module as removed (its record is kept until purged)
    Remove {
        /// Module name
        name: String,
    },

    /// Delete a module record that nothing live depends on
    Purge {
        /// Module name
        name: String,
    },

    /// Purge every removed module that is no longer referenced
    #[command(name = "purge-removed")]
    PurgeRemoved,

    /// Print the canonical record of a module
    Show {
        /// Module name
        name: String,

        /// Print the JSON tree instead of XML
        #[arg(long)]
        json: bool,
    },

    /// List registered modules in registration order
    List,

    /// Show what a module depends on and what depends on it
    Deps {
        /// Module name
        name: String,
    },
}
