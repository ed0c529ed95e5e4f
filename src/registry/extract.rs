//! registry::extract
//!
//! Dependency extraction from a compiled schema tree.
//!
//! # Traversal
//!
//! Nodes are visited depth-first in document order. Configuration data is
//! scanned into the data dependency list; operations (RPCs, actions,
//! notifications) are collected on the way and scanned afterwards, each
//! into its own [`OpDep`] entry. The data walk never descends into an
//! operation.
//!
//! # Reference rules
//!
//! - instance-identifier: always an entry, with the module of the default's
//!   first step when a default exists
//! - leafref: a module entry for the target's module when the target is
//!   outside the scope (another module for data, outside the operation's
//!   own subtree for operations)
//! - identityref: a module entry per base defined in another module
//! - `must`/`when`: a module entry per prefix bound to another module; in
//!   an operation, also an entry for every absolute path whose target lies
//!   outside the operation's subtree
//! - unions: the rules above for every member type
//!
//! An operation without any reference-bearing node gets no entry.

use tracing::debug;

use super::record::{DepList, InstIdDep, OpDep, SchemaPath};
use crate::core::types::ModuleName;
use crate::schema::tree::{
    expression_paths, expression_prefixes, Expr, NodeKind, NodeRef, SchemaContext, TypeSpec,
};
use crate::schema::SchemaTree;

/// Result of scanning one module.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extraction {
    /// Whether any configuration data node exists outside operations.
    pub has_data: bool,
    pub data_deps: DepList,
    pub op_deps: Vec<OpDep>,
}

#[derive(Debug, Clone, Copy)]
enum Scope {
    Data,
    Operation(NodeRef),
}

/// Scan the imported module of `tree` on behalf of module `own`.
///
/// Never fails: references that cannot be resolved are skipped.
pub fn extract(tree: &SchemaTree, own: &ModuleName) -> Extraction {
    let scanner = Scanner {
        context: tree.context(),
        own,
    };

    let mut extraction = Extraction::default();
    let mut operations = Vec::new();
    for root in tree.roots() {
        scanner.walk_data(root, &mut extraction, &mut operations);
    }

    for op in operations {
        if let Some(dep) = scanner.scan_operation(op) {
            extraction.op_deps.push(dep);
        }
    }

    debug!(
        module = %own,
        has_data = extraction.has_data,
        data_deps = extraction.data_deps.len(),
        op_deps = extraction.op_deps.len(),
        "extracted dependencies"
    );
    extraction
}

struct Scanner<'a> {
    context: &'a SchemaContext,
    own: &'a ModuleName,
}

impl Scanner<'_> {
    fn walk_data(&self, r: NodeRef, extraction: &mut Extraction, operations: &mut Vec<NodeRef>) {
        let node = self.context.node(r);
        if node.kind.is_operation() {
            operations.push(r);
            return;
        }
        if node.config && node.kind.is_data() {
            extraction.has_data = true;
            self.scan_node(r, Scope::Data, &mut extraction.data_deps);
        }
        for &child in &node.children {
            let child = NodeRef {
                module: r.module,
                node: child,
            };
            self.walk_data(child, extraction, operations);
        }
    }

    fn scan_operation(&self, op: NodeRef) -> Option<OpDep> {
        let node = self.context.node(op);
        let mut in_deps = DepList::new();
        let mut out_deps = DepList::new();
        let mut bearing = false;

        for &child in &node.children {
            let child = NodeRef {
                module: op.module,
                node: child,
            };
            let deps = match (node.kind, self.context.node(child).kind) {
                (NodeKind::Notification, _) | (_, NodeKind::Input) => &mut in_deps,
                (_, NodeKind::Output) => &mut out_deps,
                _ => continue,
            };
            bearing |= self.walk_operation(child, op, deps);
        }

        if !bearing {
            return None;
        }
        Some(OpDep::new(self.schema_path(op), in_deps, out_deps))
    }

    fn walk_operation(&self, r: NodeRef, op: NodeRef, deps: &mut DepList) -> bool {
        let node = self.context.node(r);
        if node.kind.is_operation() {
            return false;
        }
        let mut bearing = self.scan_node(r, Scope::Operation(op), deps);
        for &child in &node.children {
            let child = NodeRef {
                module: r.module,
                node: child,
            };
            bearing |= self.walk_operation(child, op, deps);
        }
        bearing
    }

    /// Scan one node's type and constraints. Returns whether the node is
    /// reference-bearing.
    fn scan_node(&self, r: NodeRef, scope: Scope, deps: &mut DepList) -> bool {
        let node = self.context.node(r);
        let mut bearing = false;
        if let Some(ty) = &node.ty {
            bearing |= self.scan_type(r, ty, node.default.as_ref(), scope, deps);
        }
        for expr in &node.constraints {
            bearing |= self.scan_expression(r, expr, scope, deps);
        }
        bearing
    }

    fn scan_type(
        &self,
        r: NodeRef,
        ty: &TypeSpec,
        default: Option<&Expr>,
        scope: Scope,
        deps: &mut DepList,
    ) -> bool {
        match ty {
            TypeSpec::InstanceIdentifier => {
                let default_module = default.and_then(|d| self.context.first_step_module(d));
                deps.add_inst_id(InstIdDep::new(self.schema_path(r), default_module));
                true
            }
            TypeSpec::Leafref { path } => {
                match self
                    .context
                    .resolve_path(r, &path.text, path.context.as_str())
                {
                    Some(target) => {
                        let target_module = self.context.module_name(target);
                        let outside = match scope {
                            Scope::Data => target_module != self.own,
                            Scope::Operation(op) => !self.context.is_within(target, op),
                        };
                        if outside {
                            deps.add_module(target_module.clone());
                        }
                    }
                    None => debug!(
                        node = %self.context.data_path(r),
                        path = %path.text,
                        "leafref target not found"
                    ),
                }
                true
            }
            TypeSpec::Identityref { bases } => {
                let mut bearing = false;
                for base in bases.iter().filter(|b| b.module != *self.own) {
                    deps.add_module(base.module.clone());
                    bearing = true;
                }
                bearing
            }
            TypeSpec::Union(members) => members.iter().fold(false, |bearing, member| {
                self.scan_type(r, member, default, scope, deps) || bearing
            }),
            TypeSpec::Builtin(_) => false,
        }
    }

    fn scan_expression(&self, r: NodeRef, expr: &Expr, scope: Scope, deps: &mut DepList) -> bool {
        let mut bearing = false;
        for prefix in expression_prefixes(&expr.text) {
            match self.context.resolve_prefix(expr.context.as_str(), prefix) {
                Some(module) if module != self.own => {
                    deps.add_module(module.clone());
                    bearing = true;
                }
                Some(_) => {}
                None => debug!(prefix, expr = %expr.text, "unknown prefix in expression"),
            }
        }

        let Scope::Operation(op) = scope else {
            return bearing;
        };
        for path in expression_paths(&expr.text) {
            let Some(target) = self.context.resolve_path(r, path, expr.context.as_str()) else {
                debug!(path, expr = %expr.text, "expression path not found");
                continue;
            };
            if !self.context.is_within(target, op) {
                deps.add_module(self.context.module_name(target).clone());
            }
            bearing = true;
        }
        bearing
    }

    fn schema_path(&self, r: NodeRef) -> SchemaPath {
        let info = &self.context.module(r.module).info;
        SchemaPath::new(
            self.context.data_path(r),
            info.prefix.clone(),
            info.namespace.clone(),
        )
    }
}
