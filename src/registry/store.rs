//! registry::store
//!
//! Authoritative name to record mapping.
//!
//! # Invariants
//!
//! - At most one record per module name, tombstoned records included
//! - Records keep registration order
//! - A tombstone is never cleared; only purge removes the record
//! - A record referenced by a non-removed record cannot be purged

use thiserror::Error;
use tracing::debug;

use super::canon::{self, SerializeError};
use super::record::ModuleRecord;
use crate::core::types::ModuleName;
use crate::datatree::DataTree;

/// Errors from store operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("module '{0}' is already installed")]
    DuplicateModule(String),

    #[error("module '{0}' not found")]
    NotFound(String),

    #[error("module '{0}' is already removed")]
    AlreadyRemoved(String),

    /// Purge blocked by records that still depend on the module.
    #[error("module '{module}' is still referenced by {}", .dependents.join(", "))]
    StillReferenced {
        module: String,
        dependents: Vec<String>,
    },
}

/// Insertion-ordered collection of module records.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModuleStore {
    records: Vec<ModuleRecord>,
}

impl ModuleStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a new record.
    ///
    /// # Errors
    ///
    /// [`StoreError::DuplicateModule`] if a record with the same name
    /// exists, removed or not.
    pub fn insert(&mut self, record: ModuleRecord) -> Result<(), StoreError> {
        if self.contains(record.name().as_str()) {
            return Err(StoreError::DuplicateModule(record.name().to_string()));
        }
        debug!(module = %record.name(), "inserted record");
        self.records.push(record);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Result<&ModuleRecord, StoreError> {
        self.position(name)
            .map(|i| &self.records[i])
            .ok_or_else(|| StoreError::NotFound(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// Set the tombstone on a record.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotFound`] or [`StoreError::AlreadyRemoved`].
    pub fn mark_removed(&mut self, name: &str) -> Result<(), StoreError> {
        let idx = self
            .position(name)
            .ok_or_else(|| StoreError::NotFound(name.to_string()))?;
        let record = &mut self.records[idx];
        if record.is_removed() {
            return Err(StoreError::AlreadyRemoved(name.to_string()));
        }
        record.mark_removed();
        Ok(())
    }

    /// Delete a record.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotFound`], or [`StoreError::StillReferenced`] naming
    /// the non-removed records that depend on `name`.
    pub fn purge(&mut self, name: &str) -> Result<ModuleRecord, StoreError> {
        let idx = self
            .position(name)
            .ok_or_else(|| StoreError::NotFound(name.to_string()))?;
        let dependents: Vec<String> = self
            .dependents(name)
            .into_iter()
            .map(ToString::to_string)
            .collect();
        if !dependents.is_empty() {
            return Err(StoreError::StillReferenced {
                module: name.to_string(),
                dependents,
            });
        }
        Ok(self.records.remove(idx))
    }

    /// Records in registration order.
    pub fn list(&self) -> &[ModuleRecord] {
        &self.records
    }

    pub fn iter(&self) -> impl Iterator<Item = &ModuleRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Names of the non-removed records, other than `name` itself, that
    /// reference `name`.
    pub fn dependents(&self, name: &str) -> Vec<&ModuleName> {
        self.records
            .iter()
            .filter(|r| !r.is_removed() && r.name().as_str() != name && r.references(name))
            .map(ModuleRecord::name)
            .collect()
    }

    /// Canonical tree of the whole store.
    pub fn to_tree(&self) -> DataTree {
        canon::render_all(&self.records)
    }

    /// Rebuild a store from its canonical tree.
    pub fn from_tree(tree: &DataTree) -> Result<Self, SerializeError> {
        Ok(Self {
            records: canon::parse_all(tree)?,
        })
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.records.iter().position(|r| r.name().as_str() == name)
    }
}
