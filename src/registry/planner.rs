//! registry::planner
//!
//! Two-phase removal: tombstone first, purge once nothing live refers to
//! the module any more.

use tracing::{debug, info};

use super::store::{ModuleStore, StoreError};
use crate::core::types::ModuleName;

/// Mark a module removed.
///
/// Dependents are not consulted; the record and its dependency lists stay
/// in the store until purged.
pub fn remove_module(store: &mut ModuleStore, name: &str) -> Result<(), StoreError> {
    store.mark_removed(name)?;
    info!(module = name, "module marked removed");
    Ok(())
}

/// Delete a record once no non-removed record references it.
pub fn purge_module(store: &mut ModuleStore, name: &str) -> Result<(), StoreError> {
    store.purge(name)?;
    info!(module = name, "module purged");
    Ok(())
}

/// Purge every removed record that nothing live references.
///
/// A single pass in registration order. Returns the purged names.
pub fn purge_removed(store: &mut ModuleStore) -> Vec<ModuleName> {
    let candidates: Vec<ModuleName> = store
        .iter()
        .filter(|r| r.is_removed())
        .map(|r| r.name().clone())
        .collect();

    let mut purged = Vec::new();
    for name in candidates {
        match store.purge(name.as_str()) {
            Ok(_) => purged.push(name),
            Err(e) => debug!(module = %name, error = %e, "removed module kept"),
        }
    }
    if !purged.is_empty() {
        info!(count = purged.len(), "purged removed modules");
    }
    purged
}

/// Names that would make [`purge_module`] fail for `name`.
pub fn blocking_dependents(store: &ModuleStore, name: &str) -> Result<Vec<ModuleName>, StoreError> {
    store.get(name)?;
    Ok(store.dependents(name).into_iter().cloned().collect())
}
