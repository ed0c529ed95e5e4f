//! core
//!
//! Core domain types and repository plumbing for modreg.
//!
//! # Modules
//!
//! - [`types`] - Strong types: ModuleName, Revision, Fingerprint
//! - [`paths`] - Path routing inside a registry repository
//! - [`lock`] - Exclusive repository lock
//! - [`config`] - Configuration schema and loading
//!
//! # Design Principles
//!
//! - Strong typing prevents invalid states at compile time
//! - Schemas are strict and self-describing

pub mod config;
pub mod lock;
pub mod paths;
pub mod types;
