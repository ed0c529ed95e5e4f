//! registry
//!
//! The module registry proper.
//!
//! # Components
//!
//! - [`record`] - Module records and dependency lists
//! - [`extract`] - Dependencies of a compiled schema
//! - [`store`] - Name to record mapping
//! - [`planner`] - Tombstone and purge
//! - [`canon`] - Canonical tree rendering and parsing
//! - [`storage`] - Persistence of the canonical tree
//! - [`handle`] - [`Registry`], the caller-facing entry point
//!
//! # Example
//!
//! ```
//! use modreg::registry::{ModuleStore, ModuleRecord};
//! use modreg::core::types::ModuleName;
//!
//! let mut store = ModuleStore::new();
//! store.insert(ModuleRecord::builder(ModuleName::new("test").unwrap()).build()).unwrap();
//! store.mark_removed("test").unwrap();
//! assert!(store.get("test").unwrap().is_removed());
//! ```

pub mod canon;
pub mod extract;
pub mod handle;
pub mod planner;
pub mod record;
pub mod storage;
pub mod store;

use thiserror::Error;

pub use canon::SerializeError;
pub use handle::Registry;
pub use record::{DepList, Dependency, InstIdDep, ModuleRecord, OpDep, SchemaPath};
pub use storage::{FileStorage, MemoryStorage, StorageError, TreeStorage};
pub use store::{ModuleStore, StoreError};

use crate::schema::ImportError;

/// Errors from registry operations.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error(transparent)]
    Import(#[from] ImportError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("corrupt registry: {0}")]
    Serialize(#[from] SerializeError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}
