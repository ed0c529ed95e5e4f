//! registry::handle
//!
//! The registry handle: one lock-guarded store wired to an importer and a
//! storage backend.
//!
//! # Locking
//!
//! Mutations take the write lock for the whole check, mutate and persist
//! sequence. Schema import happens before the lock is taken. If persisting
//! fails the in-memory store is restored, so a failed call leaves the
//! registry exactly as it was.
//!
//! # Example
//!
//! ```no_run
//! use std::path::{Path, PathBuf};
//! use modreg::registry::Registry;
//!
//! let registry = Registry::in_memory();
//! let name = registry
//!     .install_module(Path::new("test.yang"), &[PathBuf::from("/usr/share/yang")], false)
//!     .unwrap();
//! registry.remove_module(name.as_str()).unwrap();
//! ```

use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use tracing::{debug, info};

use super::extract::extract;
use super::planner;
use super::record::ModuleRecord;
use super::storage::{MemoryStorage, TreeStorage};
use super::store::{ModuleStore, StoreError};
use super::{canon, RegistryError};
use crate::core::types::ModuleName;
use crate::datatree::DataTree;
use crate::schema::{SchemaImporter, YangImporter};

/// Shared handle to a module registry.
pub struct Registry {
    store: RwLock<ModuleStore>,
    storage: Box<dyn TreeStorage>,
    importer: Box<dyn SchemaImporter>,
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("modules", &self.store.read().len())
            .finish_non_exhaustive()
    }
}

impl Registry {
    /// Open a registry, loading whatever `storage` holds.
    pub fn open(
        storage: Box<dyn TreeStorage>,
        importer: Box<dyn SchemaImporter>,
    ) -> Result<Self, RegistryError> {
        let store = match storage.read()? {
            Some(tree) => ModuleStore::from_tree(&tree)?,
            None => ModuleStore::new(),
        };
        debug!(modules = store.len(), "opened registry");
        Ok(Self {
            store: RwLock::new(store),
            storage,
            importer,
        })
    }

    /// An empty registry kept in memory, importing module files from disk.
    pub fn in_memory() -> Self {
        Self {
            store: RwLock::new(ModuleStore::new()),
            storage: Box::new(MemoryStorage::new()),
            importer: Box::new(YangImporter::new()),
        }
    }

    /// Import, analyze and register a module.
    ///
    /// # Errors
    ///
    /// Import failures, [`StoreError::DuplicateModule`]
    /// and storage failures. The registry is unchanged on error.
    pub fn install_module(
        &self,
        source: &Path,
        search_paths: &[PathBuf],
        enable_replay: bool,
    ) -> Result<ModuleName, RegistryError> {
        let tree = self.importer.import(source, search_paths)?;
        let info = tree.module();
        let name = info.name.clone();
        let extraction = extract(&tree, &name);

        let record = ModuleRecord::builder(name.clone())
            .revision(info.revision.clone())
            .has_data(extraction.has_data)
            .replay_support(enable_replay)
            .data_deps(extraction.data_deps)
            .op_deps(extraction.op_deps)
            .build();

        self.mutate(|store| store.insert(record))?;
        info!(module = %name, replay = enable_replay, "module installed");
        Ok(name)
    }

    /// Tombstone a module.
    pub fn remove_module(&self, name: &str) -> Result<(), RegistryError> {
        self.mutate(|store| planner::remove_module(store, name))
    }

    /// Delete a removed or unreferenced module's record.
    pub fn purge_module(&self, name: &str) -> Result<(), RegistryError> {
        self.mutate(|store| planner::purge_module(store, name))
    }

    /// Purge every removed module nothing live depends on.
    pub fn purge_removed(&self) -> Result<Vec<ModuleName>, RegistryError> {
        self.mutate(|store| Ok::<_, StoreError>(planner::purge_removed(store)))
    }

    /// Snapshot of one record.
    pub fn get_module_record(&self, name: &str) -> Result<ModuleRecord, RegistryError> {
        Ok(self.store.read().get(name)?.clone())
    }

    /// Snapshot of all records in registration order.
    pub fn list_modules(&self) -> Vec<ModuleRecord> {
        self.store.read().list().to_vec()
    }

    /// Non-removed modules referencing `name`.
    pub fn dependents(&self, name: &str) -> Result<Vec<ModuleName>, RegistryError> {
        Ok(planner::blocking_dependents(&self.store.read(), name)?)
    }

    /// Canonical tree of one record.
    pub fn render_module(&self, name: &str) -> Result<DataTree, RegistryError> {
        Ok(canon::render(self.store.read().get(name)?))
    }

    /// Canonical tree of the whole registry.
    pub fn render_all(&self) -> DataTree {
        self.store.read().to_tree()
    }

    fn mutate<T, E>(
        &self,
        op: impl FnOnce(&mut ModuleStore) -> Result<T, E>,
    ) -> Result<T, RegistryError>
    where
        RegistryError: From<E>,
    {
        let mut store = self.store.write();
        let before = store.clone();
        let value = op(&mut *store)?;
        if *store == before {
            return Ok(value);
        }
        if let Err(e) = self.storage.write(&store.to_tree()) {
            *store = before;
            return Err(e.into());
        }
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::storage::StorageError;
    use std::fs;
    use std::sync::Arc;
    use tempfile::TempDir;

    struct FailingStorage;

    impl TreeStorage for FailingStorage {
        fn read(&self) -> Result<Option<DataTree>, StorageError> {
            Ok(None)
        }

        fn write(&self, _tree: &DataTree) -> Result<(), StorageError> {
            Err(StorageError::Io {
                path: PathBuf::from("/dev/full"),
                source: std::io::Error::other("disk full"),
            })
        }
    }

    fn module_file(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(format!("{name}.yang"));
        fs::write(
            &path,
            format!("module {name} {{ namespace \"urn:{name}\"; prefix {name}; {body} }}"),
        )
        .unwrap();
        path
    }

    #[test]
    fn install_records_metadata() {
        let temp = TempDir::new().unwrap();
        let file = module_file(temp.path(), "test", "revision 2020-01-01; leaf l { type string; }");
        let registry = Registry::in_memory();

        let name = registry.install_module(&file, &[], true).unwrap();
        let record = registry.get_module_record(name.as_str()).unwrap();
        assert_eq!(record.revision().map(|r| r.as_str()), Some("2020-01-01"));
        assert!(record.has_data());
        assert!(record.replay_support());
        assert!(!record.is_removed());
    }

    #[test]
    fn duplicate_install_fails() {
        let temp = TempDir::new().unwrap();
        let file = module_file(temp.path(), "test", "");
        let registry = Registry::in_memory();
        registry.install_module(&file, &[], false).unwrap();

        let err = registry.install_module(&file, &[], false).unwrap_err();
        assert!(matches!(
            err,
            RegistryError::Store(StoreError::DuplicateModule(ref n)) if n == "test"
        ));
        assert_eq!(registry.list_modules().len(), 1);
    }

    #[test]
    fn failed_write_rolls_back() {
        let temp = TempDir::new().unwrap();
        let file = module_file(temp.path(), "test", "");
        let registry =
            Registry::open(Box::new(FailingStorage), Box::new(YangImporter::new())).unwrap();

        assert!(matches!(
            registry.install_module(&file, &[], false),
            Err(RegistryError::Storage(_))
        ));
        assert!(registry.list_modules().is_empty());
    }

    #[test]
    fn failed_operation_writes_nothing() {
        let registry = Registry::in_memory();
        assert!(matches!(
            registry.remove_module("missing"),
            Err(RegistryError::Store(StoreError::NotFound(_)))
        ));
    }

    #[test]
    fn reopen_from_storage() {
        let temp = TempDir::new().unwrap();
        let a = module_file(temp.path(), "zeta", "");
        let b = module_file(temp.path(), "alpha", "");

        let storage = Arc::new(MemoryStorage::new());
        let registry =
            Registry::open(Box::new(SharedStorage(storage.clone())), Box::new(YangImporter::new()))
                .unwrap();
        registry.install_module(&a, &[], false).unwrap();
        registry.install_module(&b, &[], false).unwrap();
        registry.remove_module("zeta").unwrap();

        let reopened = Registry::open(
            Box::new(SharedStorage(storage)),
            Box::new(YangImporter::new()),
        )
        .unwrap();
        let names: Vec<_> = reopened
            .list_modules()
            .iter()
            .map(|r| r.name().to_string())
            .collect();
        assert_eq!(names, vec!["zeta", "alpha"]);
        assert!(reopened.get_module_record("zeta").unwrap().is_removed());
    }

    #[test]
    fn registry_is_shareable_across_threads() {
        let temp = TempDir::new().unwrap();
        let registry = Arc::new(Registry::in_memory());
        let files: Vec<_> = (0..4)
            .map(|i| module_file(temp.path(), &format!("m{i}"), ""))
            .collect();

        let handles: Vec<_> = files
            .into_iter()
            .map(|file| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || registry.install_module(&file, &[], false).unwrap())
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(registry.list_modules().len(), 4);
    }

    struct SharedStorage(Arc<MemoryStorage>);

    impl TreeStorage for SharedStorage {
        fn read(&self) -> Result<Option<DataTree>, StorageError> {
            self.0.read()
        }

        fn write(&self, tree: &DataTree) -> Result<(), StorageError> {
            self.0.write(tree)
        }
    }
}
