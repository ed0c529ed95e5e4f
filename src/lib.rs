//! modreg - registry of installed schema modules
//!
//! modreg keeps track of the YANG modules a configuration datastore has
//! installed: their revision, whether they define configuration data,
//! whether notification replay is enabled, and which other modules their
//! references (leafrefs, identityrefs, instance-identifiers, `when`/`must`
//! expressions) depend on. Removal is a tombstone; records are purged once
//! nothing live refers to them.
//!
//! # Architecture
//!
//! - [`cli`] - Command-line interface layer (parses args, delegates to the registry)
//! - [`registry`] - Module records, dependency extraction, store, persistence
//! - [`schema`] - YANG module parsing, import resolution and compilation
//! - [`datatree`] - Minimal data tree used for the canonical form
//! - [`core`] - Validated types, paths, repository lock, configuration
//! - [`telemetry`] - Logging setup
//! - [`ui`] - User-facing output
//!
//! # Correctness Invariants
//!
//! 1. Module names are unique across the registry
//! 2. A removed module never becomes live again
//! 3. A record referenced by a live module is never purged
//! 4. A failed operation leaves memory and disk unchanged

pub mod cli;
pub mod core;
pub mod datatree;
pub mod registry;
pub mod schema;
pub mod telemetry;
pub mod ui;
