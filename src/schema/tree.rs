//! schema::tree
//!
//! Compiled, in-memory schema trees.
//!
//! # Architecture
//!
//! A [`SchemaContext`] holds every compiled module needed to interpret one
//! imported module: the module itself plus everything it (transitively)
//! imports. Each [`CompiledModule`] stores its schema nodes in an arena;
//! nodes are addressed across modules with a [`NodeRef`].
//!
//! A [`SchemaTree`] is what the importer hands out: the context plus the
//! identity of the main module.
//!
//! # Invariants
//!
//! - Every node in a module's arena belongs to that module
//! - `parent`/`children` links are consistent within one arena
//! - Leafref paths of a compiled module resolve (checked at import time)

use std::collections::{BTreeMap, HashMap};

use crate::core::types::{ModuleName, Revision};
use crate::schema::parser::Statement;

/// Index of a node within its module's arena.
pub type NodeId = usize;

/// Address of a schema node anywhere in a [`SchemaContext`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeRef {
    pub module: usize,
    pub node: NodeId,
}

/// Kinds of schema nodes the compiler produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Container,
    List,
    Leaf,
    LeafList,
    AnyData,
    Choice,
    Case,
    Rpc,
    Action,
    Notification,
    Input,
    Output,
}

impl NodeKind {
    /// RPCs, actions and notifications.
    pub fn is_operation(self) -> bool {
        matches!(self, NodeKind::Rpc | NodeKind::Action | NodeKind::Notification)
    }

    /// Nodes that exist only in the schema and never appear in data paths.
    pub fn is_schema_only(self) -> bool {
        matches!(
            self,
            NodeKind::Choice | NodeKind::Case | NodeKind::Input | NodeKind::Output
        )
    }

    /// Nodes that can hold instance data.
    pub fn is_data(self) -> bool {
        matches!(
            self,
            NodeKind::Container
                | NodeKind::List
                | NodeKind::Leaf
                | NodeKind::LeafList
                | NodeKind::AnyData
        )
    }
}

/// An expression written in the source together with the module whose
/// prefix bindings apply to it.
///
/// A leafref path inside a typedef or grouping imported from another module
/// uses that module's prefixes, not the prefixes of the module where the
/// node ends up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expr {
    pub text: String,
    pub context: ModuleName,
}

/// A resolved identity reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityRef {
    pub module: ModuleName,
    pub name: String,
}

/// A leaf type with typedefs flattened away.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeSpec {
    Leafref { path: Expr },
    InstanceIdentifier,
    Identityref { bases: Vec<IdentityRef> },
    Union(Vec<TypeSpec>),
    /// Any other built-in type, by name.
    Builtin(String),
}

/// One compiled schema node.
#[derive(Debug, Clone)]
pub struct SchemaNode {
    pub name: String,
    pub kind: NodeKind,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    /// Effective `config` value (inherited from ancestors).
    pub config: bool,
    /// Type of a leaf or leaf-list.
    pub ty: Option<TypeSpec>,
    /// Default value of a leaf (or the first default of a leaf-list).
    pub default: Option<Expr>,
    /// `must` and `when` expressions attached to the node.
    pub constraints: Vec<Expr>,
}

/// Header information of a compiled module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleInfo {
    pub name: ModuleName,
    pub namespace: String,
    pub prefix: String,
    pub revision: Option<Revision>,
    /// Import prefix -> imported module.
    pub imports: BTreeMap<String, ModuleName>,
}

/// A fully compiled module.
#[derive(Debug, Clone)]
pub struct CompiledModule {
    pub info: ModuleInfo,
    pub nodes: Vec<SchemaNode>,
    pub roots: Vec<NodeId>,
    /// Identities defined by the module.
    pub identities: Vec<String>,
    /// Top-level typedef statements, for importing modules.
    pub typedefs: HashMap<String, Statement>,
    /// Top-level grouping statements, for importing modules.
    pub groupings: HashMap<String, Statement>,
}

impl CompiledModule {
    /// The node with the given id.
    pub fn node(&self, id: NodeId) -> &SchemaNode {
        &self.nodes[id]
    }
}

/// A set of compiled modules with cross-module lookups.
#[derive(Debug, Clone, Default)]
pub struct SchemaContext {
    modules: Vec<CompiledModule>,
    index: HashMap<ModuleName, usize>,
}

/// Cursor while walking a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Cursor {
    Root,
    Node(NodeRef),
}

/// One step of a path with predicates removed.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Step<'a> {
    Parent,
    Current,
    Child { prefix: Option<&'a str>, name: &'a str },
}

impl SchemaContext {
    /// Create an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a compiled module, returning its index.
    ///
    /// Adding a module with a name already present replaces nothing and
    /// returns the existing index.
    pub fn add(&mut self, module: CompiledModule) -> usize {
        if let Some(&idx) = self.index.get(&module.info.name) {
            return idx;
        }
        let idx = self.modules.len();
        self.index.insert(module.info.name.clone(), idx);
        self.modules.push(module);
        idx
    }

    /// Index of a module by name.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    /// Look up a module by name.
    pub fn get(&self, name: &str) -> Option<&CompiledModule> {
        self.index_of(name).map(|idx| &self.modules[idx])
    }

    /// The module at an index.
    pub fn module(&self, idx: usize) -> &CompiledModule {
        &self.modules[idx]
    }

    /// Whether a module is present.
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Number of modules in the context.
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    /// Whether the context is empty.
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// The node a reference points at.
    pub fn node(&self, r: NodeRef) -> &SchemaNode {
        self.modules[r.module].node(r.node)
    }

    /// Name of the module owning a node.
    pub fn module_name(&self, r: NodeRef) -> &ModuleName {
        &self.modules[r.module].info.name
    }

    /// Resolve `prefix` as written inside module `context`.
    ///
    /// The module's own prefix resolves to the module itself.
    pub fn resolve_prefix(&self, context: &str, prefix: &str) -> Option<&ModuleName> {
        let module = self.get(context)?;
        if module.info.prefix == prefix {
            Some(&module.info.name)
        } else {
            module.info.imports.get(prefix)
        }
    }

    /// Nearest ancestor that appears in data paths, or `None` for a top-level node.
    pub fn data_parent(&self, r: NodeRef) -> Option<NodeRef> {
        let module = &self.modules[r.module];
        let mut parent = module.node(r.node).parent;
        while let Some(p) = parent {
            if !module.node(p).kind.is_schema_only() {
                return Some(NodeRef {
                    module: r.module,
                    node: p,
                });
            }
            parent = module.node(p).parent;
        }
        None
    }

    /// Whether `node` is `ancestor` or lies in its subtree.
    pub fn is_within(&self, node: NodeRef, ancestor: NodeRef) -> bool {
        if node.module != ancestor.module {
            return false;
        }
        let module = &self.modules[node.module];
        let mut current = Some(node.node);
        while let Some(id) = current {
            if id == ancestor.node {
                return true;
            }
            current = module.node(id).parent;
        }
        false
    }

    /// Data path of a node: `/<prefix>:<name>/...`, skipping schema-only nodes.
    pub fn data_path(&self, r: NodeRef) -> String {
        let module = &self.modules[r.module];
        let mut segments = Vec::new();
        let mut current = Some(r.node);
        while let Some(id) = current {
            let node = module.node(id);
            if !node.kind.is_schema_only() {
                segments.push(format!("/{}:{}", module.info.prefix, node.name));
            }
            current = node.parent;
        }
        segments.reverse();
        segments.concat()
    }

    /// Resolve a leafref-style path from `from`, interpreting prefixes in
    /// the module `context`.
    ///
    /// Predicates are ignored. Unprefixed names belong to the module of the
    /// node the path is evaluated on. Schema-only nodes (choice, case,
    /// input, output) are transparent.
    ///
    /// Returns `None` if the path does not lead to a node.
    pub fn resolve_path(&self, from: NodeRef, path: &str, context: &str) -> Option<NodeRef> {
        let stripped = strip_predicates(path);
        let (absolute, steps) = parse_steps(&stripped)?;
        let default_module = self.module_name(from).clone();

        let mut cursor = if absolute {
            Cursor::Root
        } else {
            Cursor::Node(from)
        };

        for step in steps {
            cursor = match step {
                Step::Current => cursor,
                Step::Parent => match cursor {
                    Cursor::Root => return None,
                    Cursor::Node(n) => match self.data_parent(n) {
                        Some(p) => Cursor::Node(p),
                        None => Cursor::Root,
                    },
                },
                Step::Child { prefix, name } => {
                    let module = match prefix {
                        Some(p) => self.resolve_prefix(context, p)?,
                        None => &default_module,
                    };
                    Cursor::Node(self.find_child(cursor, module, name)?)
                }
            };
        }

        match cursor {
            Cursor::Root => None,
            Cursor::Node(n) => Some(n),
        }
    }

    /// Module owning the first node of an instance-identifier value.
    pub fn first_step_module(&self, value: &Expr) -> Option<ModuleName> {
        let stripped = strip_predicates(&value.text);
        let (_, steps) = parse_steps(&stripped)?;
        match steps.first()? {
            Step::Child {
                prefix: Some(p), ..
            } => self.resolve_prefix(value.context.as_str(), p).cloned(),
            Step::Child { prefix: None, .. } => Some(value.context.clone()),
            _ => None,
        }
    }

    fn find_child(&self, cursor: Cursor, module: &ModuleName, name: &str) -> Option<NodeRef> {
        match cursor {
            Cursor::Root => {
                let idx = self.index_of(module.as_str())?;
                let m = &self.modules[idx];
                self.search(idx, &m.roots, name)
            }
            Cursor::Node(n) => {
                if self.module_name(n) != module {
                    return None;
                }
                let children = &self.modules[n.module].node(n.node).children;
                self.search(n.module, children, name)
            }
        }
    }

    fn search(&self, module: usize, ids: &[NodeId], name: &str) -> Option<NodeRef> {
        let m = &self.modules[module];
        for &id in ids {
            let node = m.node(id);
            if node.kind.is_schema_only() {
                if let Some(found) = self.search(module, &node.children, name) {
                    return Some(found);
                }
            } else if node.name == name {
                return Some(NodeRef { module, node: id });
            }
        }
        None
    }
}

/// Remove `[...]` predicates, honouring quotes inside them.
fn strip_predicates(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    for c in path.chars() {
        if let Some(q) = quote {
            if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '[' => depth += 1,
            ']' if depth > 0 => depth -= 1,
            '\'' | '"' if depth > 0 => quote = Some(c),
            _ if depth == 0 => {
                if !c.is_whitespace() {
                    out.push(c);
                }
            }
            _ => {}
        }
    }
    out
}

fn parse_steps(path: &str) -> Option<(bool, Vec<Step<'_>>)> {
    let absolute = path.starts_with('/');
    let body = path.trim_start_matches('/');
    if body.is_empty() {
        return None;
    }
    let mut steps = Vec::new();
    for raw in body.split('/') {
        let step = match raw {
            "" => return None,
            ".." => Step::Parent,
            "." => Step::Current,
            qualified => match qualified.split_once(':') {
                Some((prefix, name)) => Step::Child {
                    prefix: Some(prefix),
                    name,
                },
                None => Step::Child {
                    prefix: None,
                    name: qualified,
                },
            },
        };
        steps.push(step);
    }
    Some((absolute, steps))
}

/// Module prefixes of the qualified names used in an XPath expression.
///
/// String literals are skipped; axis specifiers (`child::x`) are not
/// mistaken for prefixes.
pub fn expression_prefixes(expr: &str) -> Vec<&str> {
    let bytes = expr.as_bytes();
    let is_start = |b: u8| b.is_ascii_alphabetic() || b == b'_';
    let is_name = |b: u8| b.is_ascii_alphanumeric() || matches!(b, b'_' | b'-' | b'.');

    let mut prefixes: Vec<&str> = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        if b == b'\'' || b == b'"' {
            i += 1;
            while i < bytes.len() && bytes[i] != b {
                i += 1;
            }
            i += 1;
            continue;
        }
        let preceded_by_name = i > 0 && is_name(bytes[i - 1]);
        if is_start(b) && !preceded_by_name {
            let start = i;
            while i < bytes.len() && is_name(bytes[i]) {
                i += 1;
            }
            let qualified = i + 1 < bytes.len()
                && bytes[i] == b':'
                && bytes[i + 1] != b':'
                && is_start(bytes[i + 1]);
            if qualified && !prefixes.contains(&&expr[start..i]) {
                prefixes.push(&expr[start..i]);
            }
            continue;
        }
        i += 1;
    }
    prefixes
}

/// Absolute location paths in an XPath expression, predicates included.
///
/// A `/` starts an absolute path unless it follows a step, a predicate or a
/// closing parenthesis. String literals are skipped.
pub fn expression_paths(expr: &str) -> Vec<&str> {
    let bytes = expr.as_bytes();
    let is_name = |b: u8| b.is_ascii_alphanumeric() || matches!(b, b'_' | b'-' | b'.');

    let mut paths = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        if b == b'\'' || b == b'"' {
            i = skip_literal(bytes, i);
            continue;
        }
        if b != b'/' || follows_step(&expr[..i]) {
            i += 1;
            continue;
        }

        let start = i;
        let mut depth = 0usize;
        while i < bytes.len() {
            match bytes[i] {
                b'\'' | b'"' if depth > 0 => {
                    i = skip_literal(bytes, i);
                    continue;
                }
                b'[' => depth += 1,
                b']' if depth > 0 => depth -= 1,
                c if depth == 0 && !(is_name(c) || matches!(c, b':' | b'/' | b'*')) => break,
                _ => {}
            }
            i += 1;
        }
        let path = expr[start..i].trim_end_matches('/');
        if !path.is_empty() {
            paths.push(path);
        }
    }
    paths
}

/// Whether a `/` after `before` continues a path rather than starting one.
fn follows_step(before: &str) -> bool {
    let before = before.trim_end();
    let Some(&last) = before.as_bytes().last() else {
        return false;
    };
    if matches!(last, b')' | b']' | b'*' | b'/') {
        return true;
    }
    if !(last.is_ascii_alphanumeric() || matches!(last, b'_' | b'-' | b'.' | b':')) {
        return false;
    }
    let word_start = before
        .rfind(|c: char| !(c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | ':')))
        .map_or(0, |p| p + 1);
    !matches!(&before[word_start..], "and" | "or" | "div" | "mod")
}

/// Index just past the string literal opening at `start`.
fn skip_literal(bytes: &[u8], start: usize) -> usize {
    let quote = bytes[start];
    let mut i = start + 1;
    while i < bytes.len() && bytes[i] != quote {
        i += 1;
    }
    (i + 1).min(bytes.len())
}

/// An imported module together with every module it depends on.
#[derive(Debug, Clone)]
pub struct SchemaTree {
    context: SchemaContext,
    main: usize,
}

impl SchemaTree {
    /// Wrap a context whose module at index `main` was imported.
    pub fn new(context: SchemaContext, main: usize) -> Self {
        Self { context, main }
    }

    /// Header of the imported module.
    pub fn module(&self) -> &ModuleInfo {
        &self.context.module(self.main).info
    }

    /// The imported module.
    pub fn compiled(&self) -> &CompiledModule {
        self.context.module(self.main)
    }

    /// All modules available to the imported one.
    pub fn context(&self) -> &SchemaContext {
        &self.context
    }

    /// Top-level nodes of the imported module.
    pub fn roots(&self) -> impl Iterator<Item = NodeRef> + '_ {
        self.compiled().roots.iter().map(move |&node| NodeRef {
            module: self.main,
            node,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strip_predicates_removes_brackets() {
        assert_eq!(
            strip_predicates("/if:interfaces/if:interface[if:name = current()/../name]/if:type"),
            "/if:interfaces/if:interface/if:type"
        );
        assert_eq!(strip_predicates("/a:b[c='x]y']/a:d"), "/a:b/a:d");
    }

    #[test]
    fn parse_steps_relative_and_absolute() {
        let (abs, steps) = parse_steps("../l10").unwrap();
        assert!(!abs);
        assert_eq!(
            steps,
            vec![
                Step::Parent,
                Step::Child {
                    prefix: None,
                    name: "l10"
                }
            ]
        );

        let (abs, steps) = parse_steps("/o:cont/o:l12").unwrap();
        assert!(abs);
        assert_eq!(steps.len(), 2);
    }

    #[test]
    fn parse_steps_rejects_empty() {
        assert!(parse_steps("/").is_none());
        assert!(parse_steps("a//b").is_none());
    }

    #[test]
    fn expression_prefixes_finds_qualified_names() {
        let prefixes =
            expression_prefixes("/if:interfaces/if:interface[if:name = 'x:y'] and ../t:l");
        assert_eq!(prefixes, vec!["if", "t"]);
    }

    #[test]
    fn expression_prefixes_ignores_axes_and_functions() {
        assert!(expression_prefixes("count(child::node()) > 1").is_empty());
        assert_eq!(expression_prefixes("derived-from(., 'x:y') or a:b"), vec!["a"]);
    }

    #[test]
    fn expression_paths_finds_absolute_paths() {
        assert_eq!(
            expression_paths("/a:x[a:k = '/not/a/path'] = 'v' and count(/b:y/b:z) > 0"),
            vec!["/a:x[a:k = '/not/a/path']", "/b:y/b:z"]
        );
        assert_eq!(expression_paths("../a:x or /a:y"), vec!["/a:y"]);
    }

    #[test]
    fn expression_paths_skips_relative_steps() {
        assert!(expression_paths("current()/../a:x").is_empty());
        assert!(expression_paths("../a:x/a:y = './a:z'").is_empty());
        assert!(expression_paths("/").is_empty());
    }

    #[test]
    fn node_kind_classification() {
        assert!(NodeKind::Action.is_operation());
        assert!(NodeKind::Input.is_schema_only());
        assert!(!NodeKind::Choice.is_data());
        assert!(NodeKind::LeafList.is_data());
    }
}
