//! registry::record
//!
//! Module records and their dependency lists.
//!
//! # Canonical order
//!
//! A [`DepList`] keeps plain module references and instance-identifier
//! references apart, so module entries always precede inst-id entries no
//! matter the discovery order. Both halves keep first-insertion order and
//! reject duplicates.
//!
//! # Example
//!
//! ```
//! use modreg::core::types::ModuleName;
//! use modreg::registry::record::{DepList, InstIdDep, ModuleRecord, SchemaPath};
//!
//! let mut deps = DepList::new();
//! let test = ModuleName::new("test").unwrap();
//! assert!(deps.add_module(test.clone()));
//! assert!(!deps.add_module(test.clone()));
//! deps.add_inst_id(InstIdDep::new(SchemaPath::new("/r:inst-id", "r", "urn:refs"), None));
//!
//! let record = ModuleRecord::builder(ModuleName::new("refs").unwrap())
//!     .has_data(true)
//!     .data_deps(deps)
//!     .build();
//!
//! assert!(record.references("test"));
//! assert!(!record.is_removed());
//! ```

use crate::core::types::{ModuleName, Revision};

/// A schema data path together with the prefix binding it is written in.
///
/// The path uses the defining module's prefix (`/o:cont/o:leaf`); the
/// binding is rendered as an `xmlns:<prefix>` declaration.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SchemaPath {
    path: String,
    prefix: String,
    namespace: String,
}

impl SchemaPath {
    pub fn new(
        path: impl Into<String>,
        prefix: impl Into<String>,
        namespace: impl Into<String>,
    ) -> Self {
        Self {
            path: path.into(),
            prefix: prefix.into(),
            namespace: namespace.into(),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }
}

/// An instance-identifier reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstIdDep {
    xpath: SchemaPath,
    default_module: Option<ModuleName>,
}

impl InstIdDep {
    pub fn new(xpath: SchemaPath, default_module: Option<ModuleName>) -> Self {
        Self {
            xpath,
            default_module,
        }
    }

    /// Path of the instance-identifier node.
    pub fn xpath(&self) -> &SchemaPath {
        &self.xpath
    }

    /// Module owning the first node of the declared default, if any.
    pub fn default_module(&self) -> Option<&ModuleName> {
        self.default_module.as_ref()
    }
}

/// One entry of a dependency list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dependency<'a> {
    /// Plain dependency on another module.
    Module(&'a ModuleName),
    /// Instance-identifier reference.
    InstId(&'a InstIdDep),
}

/// Ordered, duplicate-free dependency list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DepList {
    modules: Vec<ModuleName>,
    inst_ids: Vec<InstIdDep>,
}

impl DepList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a module reference. Returns `false` if it was already present.
    pub fn add_module(&mut self, module: ModuleName) -> bool {
        if self.modules.contains(&module) {
            return false;
        }
        self.modules.push(module);
        true
    }

    /// Add an instance-identifier reference. Returns `false` if an entry
    /// with the same path was already present.
    pub fn add_inst_id(&mut self, dep: InstIdDep) -> bool {
        if self
            .inst_ids
            .iter()
            .any(|d| d.xpath.path == dep.xpath.path)
        {
            return false;
        }
        self.inst_ids.push(dep);
        true
    }

    pub fn modules(&self) -> &[ModuleName] {
        &self.modules
    }

    pub fn inst_ids(&self) -> &[InstIdDep] {
        &self.inst_ids
    }

    pub fn len(&self) -> usize {
        self.modules.len() + self.inst_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty() && self.inst_ids.is_empty()
    }

    /// All entries in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = Dependency<'_>> {
        self.modules
            .iter()
            .map(Dependency::Module)
            .chain(self.inst_ids.iter().map(Dependency::InstId))
    }

    /// Modules this list points at: module entries and inst-id defaults.
    pub fn referenced_modules(&self) -> impl Iterator<Item = &ModuleName> {
        self.modules
            .iter()
            .chain(self.inst_ids.iter().filter_map(InstIdDep::default_module))
    }

    /// Whether `module` is referenced by any entry.
    pub fn references(&self, module: &str) -> bool {
        self.referenced_modules().any(|m| m.as_str() == module)
    }
}

/// Dependencies of one RPC, action or notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpDep {
    xpath: SchemaPath,
    in_deps: DepList,
    out_deps: DepList,
}

impl OpDep {
    pub fn new(xpath: SchemaPath, in_deps: DepList, out_deps: DepList) -> Self {
        Self {
            xpath,
            in_deps,
            out_deps,
        }
    }

    /// Path of the operation node.
    pub fn xpath(&self) -> &SchemaPath {
        &self.xpath
    }

    /// Dependencies of the input (or notification payload).
    pub fn in_deps(&self) -> &DepList {
        &self.in_deps
    }

    /// Dependencies of the output.
    pub fn out_deps(&self) -> &DepList {
        &self.out_deps
    }

    pub fn references(&self, module: &str) -> bool {
        self.in_deps.references(module) || self.out_deps.references(module)
    }
}

/// Registry entry for one installed (or removed but retained) module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleRecord {
    name: ModuleName,
    revision: Option<Revision>,
    has_data: bool,
    replay_support: bool,
    removed: bool,
    data_deps: DepList,
    op_deps: Vec<OpDep>,
}

impl ModuleRecord {
    /// Start building a record for `name`.
    pub fn builder(name: ModuleName) -> ModuleRecordBuilder {
        ModuleRecordBuilder::new(name)
    }

    pub fn name(&self) -> &ModuleName {
        &self.name
    }

    pub fn revision(&self) -> Option<&Revision> {
        self.revision.as_ref()
    }

    /// Whether the schema defines configuration data.
    pub fn has_data(&self) -> bool {
        self.has_data
    }

    pub fn replay_support(&self) -> bool {
        self.replay_support
    }

    pub fn is_removed(&self) -> bool {
        self.removed
    }

    pub fn data_deps(&self) -> &DepList {
        &self.data_deps
    }

    pub fn op_deps(&self) -> &[OpDep] {
        &self.op_deps
    }

    /// Whether any dependency of this record points at `module`.
    pub fn references(&self, module: &str) -> bool {
        self.data_deps.references(module) || self.op_deps.iter().any(|op| op.references(module))
    }

    /// Set the tombstone. Dependency lists are left untouched.
    pub(crate) fn mark_removed(&mut self) {
        self.removed = true;
    }
}

/// Builder for [`ModuleRecord`].
#[derive(Debug, Clone)]
pub struct ModuleRecordBuilder {
    record: ModuleRecord,
}

impl ModuleRecordBuilder {
    pub fn new(name: ModuleName) -> Self {
        Self {
            record: ModuleRecord {
                name,
                revision: None,
                has_data: false,
                replay_support: false,
                removed: false,
                data_deps: DepList::new(),
                op_deps: Vec::new(),
            },
        }
    }

    pub fn revision(mut self, revision: Option<Revision>) -> Self {
        self.record.revision = revision;
        self
    }

    pub fn has_data(mut self, has_data: bool) -> Self {
        self.record.has_data = has_data;
        self
    }

    pub fn replay_support(mut self, replay: bool) -> Self {
        self.record.replay_support = replay;
        self
    }

    pub fn removed(mut self, removed: bool) -> Self {
        self.record.removed = removed;
        self
    }

    pub fn data_deps(mut self, deps: DepList) -> Self {
        self.record.data_deps = deps;
        self
    }

    /// Append an operation entry. Entries repeating an earlier path are
    /// dropped.
    pub fn op_dep(mut self, dep: OpDep) -> Self {
        if !self
            .record
            .op_deps
            .iter()
            .any(|d| d.xpath.path == dep.xpath.path)
        {
            self.record.op_deps.push(dep);
        }
        self
    }

    pub fn op_deps(self, deps: impl IntoIterator<Item = OpDep>) -> Self {
        deps.into_iter().fold(self, Self::op_dep)
    }

    pub fn build(self) -> ModuleRecord {
        self.record
    }
}
