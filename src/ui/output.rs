//! ui::output
//!
//! Output formatting and display.
//!
//! # Design
//!
//! Output is formatted consistently and respects the quiet flag.
//! Diagnostics go to stderr; results go to stdout.

use std::fmt::Display;

use crate::registry::{Dependency, DepList, ModuleRecord};

/// Output verbosity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    /// Quiet mode - minimal output
    Quiet,
    /// Normal mode - standard output
    Normal,
    /// Debug mode - verbose output
    Debug,
}

impl Verbosity {
    /// Create verbosity from flags.
    pub fn from_flags(quiet: bool, debug: bool) -> Self {
        if quiet {
            Verbosity::Quiet
        } else if debug {
            Verbosity::Debug
        } else {
            Verbosity::Normal
        }
    }
}

/// Print a message (respects quiet mode).
pub fn print(message: impl Display, verbosity: Verbosity) {
    if verbosity != Verbosity::Quiet {
        println!("{}", message);
    }
}

/// Print an error message (always shown).
pub fn error(message: impl Display) {
    eprintln!("error: {}", message);
}

/// Print a warning message (respects quiet mode).
pub fn warn(message: impl Display, verbosity: Verbosity) {
    if verbosity != Verbosity::Quiet {
        eprintln!("warning: {}", message);
    }
}

/// One-line summary of a record: name, revision and flags.
pub fn format_record(record: &ModuleRecord) -> String {
    let mut line = record.name().to_string();
    if let Some(rev) = record.revision() {
        line.push('@');
        line.push_str(rev.as_str());
    }

    let flags: Vec<&str> = [
        (record.has_data(), "data"),
        (record.replay_support(), "replay"),
        (record.is_removed(), "removed"),
    ]
    .into_iter()
    .filter_map(|(set, label)| set.then_some(label))
    .collect();
    if !flags.is_empty() {
        line.push_str(&format!(" [{}]", flags.join(", ")));
    }
    line
}

/// Indented listing of a dependency list.
pub fn format_deps(deps: &DepList, indent: &str) -> String {
    deps.iter()
        .map(|dep| match dep {
            Dependency::Module(m) => format!("{indent}module {m}"),
            Dependency::InstId(inst) => match inst.default_module() {
                Some(m) => format!("{indent}inst-id {} (default {m})", inst.xpath().path()),
                None => format!("{indent}inst-id {}", inst.xpath().path()),
            },
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Format a list of items.
pub fn format_list<T: Display>(items: &[T], prefix: &str) -> String {
    items
        .iter()
        .map(|item| format!("{}{}", prefix, item))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{ModuleName, Revision};
    use crate::registry::{InstIdDep, SchemaPath};

    #[test]
    fn verbosity_from_flags() {
        assert_eq!(Verbosity::from_flags(true, true), Verbosity::Quiet);
        assert_eq!(Verbosity::from_flags(false, true), Verbosity::Debug);
        assert_eq!(Verbosity::from_flags(false, false), Verbosity::Normal);
    }

    #[test]
    fn record_summary() {
        let record = ModuleRecord::builder(ModuleName::new("ietf-interfaces").unwrap())
            .revision(Some(Revision::new("2014-05-08").unwrap()))
            .has_data(true)
            .replay_support(true)
            .build();
        assert_eq!(
            format_record(&record),
            "ietf-interfaces@2014-05-08 [data, replay]"
        );

        let bare = ModuleRecord::builder(ModuleName::new("plain").unwrap()).build();
        assert_eq!(format_record(&bare), "plain");
    }

    #[test]
    fn deps_listing() {
        let mut deps = DepList::new();
        deps.add_module(ModuleName::new("test").unwrap());
        deps.add_inst_id(InstIdDep::new(
            SchemaPath::new("/r:inst-id", "r", "urn:refs"),
            Some(ModuleName::new("test").unwrap()),
        ));
        assert_eq!(
            format_deps(&deps, "  "),
            "  module test\n  inst-id /r:inst-id (default test)"
        );
    }

    #[test]
    fn list_formatting() {
        assert_eq!(format_list(&["a", "b"], "- "), "- a\n- b");
    }
}
