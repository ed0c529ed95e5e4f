//! schema
//!
//! Schema import: module text to compiled schema trees.
//!
//! # Pipeline
//!
//! 1. [`parser`] turns text into a generic statement tree
//! 2. [`compile`] interprets statements into a [`tree::CompiledModule`]
//! 3. [`importer`] locates imports, compiles them first, and validates
//!    cross-module references
//!
//! The registry only sees [`SchemaImporter`] and the resulting
//! [`SchemaTree`].

pub mod compile;
pub mod importer;
pub mod parser;
pub mod tree;

use std::path::PathBuf;

use thiserror::Error;

pub use importer::{SchemaImporter, YangImporter};
pub use tree::{NodeKind, NodeRef, SchemaTree};

/// Errors from importing a module.
#[derive(Debug, Error)]
pub enum ImportError {
    /// An imported module was not found in any search directory.
    #[error("cannot find imported module '{module}' (searched: {})", display_dirs(.searched))]
    UnresolvedImport {
        module: String,
        searched: Vec<PathBuf>,
    },

    /// Source text is not syntactically valid.
    #[error("{}:{line}: {message}", .path.display())]
    ParseFailure {
        path: PathBuf,
        line: usize,
        message: String,
    },

    /// Source parses but does not form a valid module.
    #[error("invalid module '{module}': {message}")]
    Invalid { module: String, message: String },

    #[error("cannot read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

fn display_dirs(dirs: &[PathBuf]) -> String {
    if dirs.is_empty() {
        return "none".to_string();
    }
    dirs.iter()
        .map(|d| d.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
