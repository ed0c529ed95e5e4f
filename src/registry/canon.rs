//! registry::canon
//!
//! Canonical tree form of module records.
//!
//! # Layout
//!
//! ```text
//! modules (xmlns="urn:modreg")
//!   module*
//!     name
//!     revision?
//!     has-data?          presence marker
//!     replay-support?    presence marker
//!     removed?           presence marker
//!     data-deps?         module*, inst-id*
//!     op-deps*           xpath, in?, out?
//! ```
//!
//! `inst-id` holds `xpath` then an optional `default-module`. Every `xpath`
//! carries the `xmlns:<prefix>` declaration of the prefix it is written in.
//! Empty dependency blocks are omitted.
//!
//! Parsing is strict: unknown, repeated or out-of-order elements are
//! rejected, so `parse(render(r)) == r` and rendering a parsed tree gives
//! the original tree back.

use thiserror::Error;

use super::record::{DepList, InstIdDep, ModuleRecord, OpDep, SchemaPath};
use crate::core::types::{ModuleName, Revision, TypeError};
use crate::datatree::DataTree;

/// Namespace of the registry's own tree.
pub const NAMESPACE: &str = "urn:modreg";

const MODULES: &str = "modules";
const MODULE: &str = "module";
const NAME: &str = "name";
const REVISION: &str = "revision";
const HAS_DATA: &str = "has-data";
const REPLAY_SUPPORT: &str = "replay-support";
const REMOVED: &str = "removed";
const DATA_DEPS: &str = "data-deps";
const OP_DEPS: &str = "op-deps";
const INST_ID: &str = "inst-id";
const XPATH: &str = "xpath";
const DEFAULT_MODULE: &str = "default-module";
const IN: &str = "in";
const OUT: &str = "out";

/// Errors from parsing a canonical tree.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SerializeError {
    #[error("unexpected element '{found}' in '{parent}'")]
    UnexpectedElement { parent: String, found: String },

    #[error("missing element '{element}' in '{parent}'")]
    MissingElement { parent: String, element: String },

    #[error("element '{0}' has malformed content")]
    MalformedContent(String),

    #[error("expected namespace '{NAMESPACE}', found '{0}'")]
    WrongNamespace(String),

    #[error("duplicate module '{0}'")]
    DuplicateModule(String),

    #[error("invalid value: {0}")]
    InvalidValue(#[from] TypeError),
}

/// Render one record.
pub fn render(record: &ModuleRecord) -> DataTree {
    let mut tree = DataTree::new(MODULE).with_namespace(NAMESPACE);
    tree.push(DataTree::leaf(NAME, record.name().as_str()));
    if let Some(rev) = record.revision() {
        tree.push(DataTree::leaf(REVISION, rev.as_str()));
    }
    if record.has_data() {
        tree.push(DataTree::new(HAS_DATA));
    }
    if record.replay_support() {
        tree.push(DataTree::new(REPLAY_SUPPORT));
    }
    if record.is_removed() {
        tree.push(DataTree::new(REMOVED));
    }
    if let Some(deps) = render_deps(DATA_DEPS, record.data_deps()) {
        tree.push(deps);
    }
    for op in record.op_deps() {
        let mut entry = DataTree::new(OP_DEPS);
        entry.push(render_xpath(op.xpath()));
        entry.children.extend(render_deps(IN, op.in_deps()));
        entry.children.extend(render_deps(OUT, op.out_deps()));
        tree.push(entry);
    }
    tree
}

/// Render a sequence of records under the `modules` root.
pub fn render_all<'a>(records: impl IntoIterator<Item = &'a ModuleRecord>) -> DataTree {
    let mut root = DataTree::new(MODULES).with_namespace(NAMESPACE);
    root.children.extend(records.into_iter().map(render));
    root
}

fn render_deps(name: &str, deps: &DepList) -> Option<DataTree> {
    if deps.is_empty() {
        return None;
    }
    let mut tree = DataTree::new(name);
    for module in deps.modules() {
        tree.push(DataTree::leaf(MODULE, module.as_str()));
    }
    for inst in deps.inst_ids() {
        let mut entry = DataTree::new(INST_ID);
        entry.push(render_xpath(inst.xpath()));
        if let Some(module) = inst.default_module() {
            entry.push(DataTree::leaf(DEFAULT_MODULE, module.as_str()));
        }
        tree.push(entry);
    }
    Some(tree)
}

fn render_xpath(path: &SchemaPath) -> DataTree {
    DataTree::leaf(XPATH, path.path()).with_prefix(path.prefix(), path.namespace())
}

/// Parse a `module` element.
pub fn parse(tree: &DataTree) -> Result<ModuleRecord, SerializeError> {
    expect_name(tree, MODULE, MODULES)?;
    check_namespace(tree)?;

    let mut children = Children::new(tree);
    let name = ModuleName::new(text_value(children.required(NAME)?)?)?;
    let revision = children
        .optional(REVISION)
        .map(|r| text_value(r).and_then(|v| Ok(Revision::new(v)?)))
        .transpose()?;
    let has_data = children.marker(HAS_DATA)?;
    let replay_support = children.marker(REPLAY_SUPPORT)?;
    let removed = children.marker(REMOVED)?;
    let data_deps = children
        .optional(DATA_DEPS)
        .map(parse_deps)
        .transpose()?
        .unwrap_or_default();

    let mut op_deps: Vec<OpDep> = Vec::new();
    while let Some(op) = children.optional(OP_DEPS) {
        let op = parse_op(op)?;
        if op_deps.iter().any(|o| o.xpath().path() == op.xpath().path()) {
            return Err(SerializeError::MalformedContent(OP_DEPS.to_string()));
        }
        op_deps.push(op);
    }
    children.finish()?;

    Ok(ModuleRecord::builder(name)
        .revision(revision)
        .has_data(has_data)
        .replay_support(replay_support)
        .removed(removed)
        .data_deps(data_deps)
        .op_deps(op_deps)
        .build())
}

/// Parse a `modules` root into its records, in document order.
pub fn parse_all(tree: &DataTree) -> Result<Vec<ModuleRecord>, SerializeError> {
    expect_name(tree, MODULES, "")?;
    check_namespace(tree)?;
    if tree.value.is_some() {
        return Err(SerializeError::MalformedContent(MODULES.to_string()));
    }

    let mut records: Vec<ModuleRecord> = Vec::with_capacity(tree.children.len());
    for child in &tree.children {
        let record = parse(child)?;
        if records.iter().any(|r| r.name() == record.name()) {
            return Err(SerializeError::DuplicateModule(record.name().to_string()));
        }
        records.push(record);
    }
    Ok(records)
}

fn parse_deps(tree: &DataTree) -> Result<DepList, SerializeError> {
    if tree.value.is_some() || tree.children.is_empty() {
        return Err(SerializeError::MalformedContent(tree.name.clone()));
    }
    let mut deps = DepList::new();
    let mut children = Children::new(tree);
    while let Some(module) = children.optional(MODULE) {
        let module = ModuleName::new(text_value(module)?)?;
        if !deps.add_module(module) {
            return Err(SerializeError::MalformedContent(tree.name.clone()));
        }
    }
    while let Some(inst) = children.optional(INST_ID) {
        let mut fields = Children::new(inst);
        let xpath = parse_xpath(fields.required(XPATH)?)?;
        let default_module = fields
            .optional(DEFAULT_MODULE)
            .map(|m| text_value(m).and_then(|v| Ok(ModuleName::new(v)?)))
            .transpose()?;
        fields.finish()?;
        if !deps.add_inst_id(InstIdDep::new(xpath, default_module)) {
            return Err(SerializeError::MalformedContent(tree.name.clone()));
        }
    }
    children.finish()?;
    Ok(deps)
}

fn parse_op(tree: &DataTree) -> Result<OpDep, SerializeError> {
    let mut children = Children::new(tree);
    let xpath = parse_xpath(children.required(XPATH)?)?;
    let in_deps = children.optional(IN).map(parse_deps).transpose()?;
    let out_deps = children.optional(OUT).map(parse_deps).transpose()?;
    children.finish()?;
    Ok(OpDep::new(
        xpath,
        in_deps.unwrap_or_default(),
        out_deps.unwrap_or_default(),
    ))
}

fn parse_xpath(tree: &DataTree) -> Result<SchemaPath, SerializeError> {
    let path = text_value(tree)?;
    match tree.prefixes.as_slice() {
        [decl] if tree.children.is_empty() => {
            Ok(SchemaPath::new(path, decl.prefix.clone(), decl.uri.clone()))
        }
        _ => Err(SerializeError::MalformedContent(XPATH.to_string())),
    }
}

fn expect_name(tree: &DataTree, expected: &str, parent: &str) -> Result<(), SerializeError> {
    if tree.name == expected {
        Ok(())
    } else {
        Err(SerializeError::UnexpectedElement {
            parent: parent.to_string(),
            found: tree.name.clone(),
        })
    }
}

fn check_namespace(tree: &DataTree) -> Result<(), SerializeError> {
    match tree.namespace.as_deref() {
        Some(NAMESPACE) => Ok(()),
        Some(other) => Err(SerializeError::WrongNamespace(other.to_string())),
        None => Err(SerializeError::WrongNamespace(String::new())),
    }
}

fn text_value(tree: &DataTree) -> Result<&str, SerializeError> {
    match (&tree.value, tree.children.is_empty()) {
        (Some(v), true) => Ok(v),
        _ => Err(SerializeError::MalformedContent(tree.name.clone())),
    }
}

/// Cursor over an element's children that only moves forward.
struct Children<'a> {
    parent: &'a DataTree,
    pos: usize,
}

impl<'a> Children<'a> {
    fn new(parent: &'a DataTree) -> Self {
        Self { parent, pos: 0 }
    }

    fn optional(&mut self, name: &str) -> Option<&'a DataTree> {
        let child = self.parent.children.get(self.pos)?;
        if child.name == name {
            self.pos += 1;
            Some(child)
        } else {
            None
        }
    }

    fn required(&mut self, name: &str) -> Result<&'a DataTree, SerializeError> {
        self.optional(name)
            .ok_or_else(|| SerializeError::MissingElement {
                parent: self.parent.name.clone(),
                element: name.to_string(),
            })
    }

    fn marker(&mut self, name: &str) -> Result<bool, SerializeError> {
        match self.optional(name) {
            Some(child) if child.is_marker() => Ok(true),
            Some(_) => Err(SerializeError::MalformedContent(name.to_string())),
            None => Ok(false),
        }
    }

    fn finish(self) -> Result<(), SerializeError> {
        match self.parent.children.get(self.pos) {
            Some(extra) => Err(SerializeError::UnexpectedElement {
                parent: self.parent.name.clone(),
                found: extra.name.clone(),
            }),
            None => Ok(()),
        }
    }
}
