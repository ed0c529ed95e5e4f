//! schema::compile
//!
//! Statement tree to compiled module.
//!
//! The compiler interprets the subset of statements that matter for
//! dependency tracking: data nodes, operations, types (with typedefs
//! flattened), groupings, identities, defaults and `must`/`when`
//! constraints. Documentation and other metadata statements are skipped.
//!
//! # Scoping
//!
//! Typedefs and groupings are looked up innermost scope first, then at the
//! top level of the module they are qualified with. Expanding a grouping
//! from another module switches prefix resolution to that module for the
//! grouping body, while the produced nodes still belong to the module being
//! compiled.

use std::collections::{BTreeMap, HashMap};

use tracing::{debug, warn};

use super::parser::Statement;
use super::tree::{
    CompiledModule, Expr, IdentityRef, ModuleInfo, NodeId, NodeKind, NodeRef, SchemaContext,
    SchemaNode, TypeSpec,
};
use super::ImportError;
use crate::core::types::{ModuleName, Revision};

const BUILTIN_TYPES: &[&str] = &[
    "binary",
    "bits",
    "boolean",
    "decimal64",
    "empty",
    "enumeration",
    "identityref",
    "instance-identifier",
    "int8",
    "int16",
    "int32",
    "int64",
    "leafref",
    "string",
    "uint8",
    "uint16",
    "uint32",
    "uint64",
    "union",
];

/// Typedef chains longer than this are treated as cyclic.
const MAX_TYPE_DEPTH: usize = 32;

fn invalid(module: impl AsRef<str>, message: impl Into<String>) -> ImportError {
    ImportError::Invalid {
        module: module.as_ref().to_string(),
        message: message.into(),
    }
}

#[derive(Debug, Clone, Copy)]
enum Table {
    Typedef,
    Grouping,
}

impl Table {
    fn pick<'t>(
        self,
        typedefs: &'t HashMap<String, Statement>,
        groupings: &'t HashMap<String, Statement>,
    ) -> &'t HashMap<String, Statement> {
        match self {
            Table::Typedef => typedefs,
            Table::Grouping => groupings,
        }
    }

    fn label(self) -> &'static str {
        match self {
            Table::Typedef => "typedef",
            Table::Grouping => "grouping",
        }
    }
}

#[derive(Debug, Default)]
struct Scope {
    module: Option<ModuleName>,
    typedefs: HashMap<String, Statement>,
    groupings: HashMap<String, Statement>,
}

struct Compiler<'a> {
    context: &'a SchemaContext,
    info: ModuleInfo,
    nodes: Vec<SchemaNode>,
    roots: Vec<NodeId>,
    identities: Vec<String>,
    typedefs: HashMap<String, Statement>,
    groupings: HashMap<String, Statement>,
    scopes: Vec<Scope>,
    expanding: Vec<(ModuleName, String)>,
}

/// Compile a parsed `module` statement.
///
/// Every module named by an `import` must already be present in `context`.
///
/// # Errors
///
/// Returns [`ImportError::Invalid`] when the module is well-formed text but
/// not a valid module: missing header statements, unknown prefixes,
/// typedefs, groupings or identities, or a submodule.
pub fn compile_module(
    stmt: &Statement,
    context: &SchemaContext,
) -> Result<CompiledModule, ImportError> {
    match stmt.keyword.as_str() {
        "module" => {}
        "submodule" => {
            return Err(invalid(
                stmt.arg(),
                "submodules cannot be installed on their own",
            ))
        }
        other => {
            return Err(invalid(
                stmt.arg(),
                format!("expected a 'module' statement, found '{other}'"),
            ))
        }
    }

    let name = ModuleName::new(stmt.arg()).map_err(|e| invalid(stmt.arg(), e.to_string()))?;
    let namespace = stmt
        .child_arg("namespace")
        .ok_or_else(|| invalid(&name, "missing 'namespace' statement"))?;
    let prefix = stmt
        .child_arg("prefix")
        .ok_or_else(|| invalid(&name, "missing 'prefix' statement"))?;

    let mut imports = BTreeMap::new();
    for import in stmt.children_named("import") {
        let target = ModuleName::new(import.arg()).map_err(|e| invalid(&name, e.to_string()))?;
        let import_prefix = import
            .child_arg("prefix")
            .ok_or_else(|| invalid(&name, format!("import of '{target}' has no prefix")))?;
        if import_prefix == prefix || imports.contains_key(import_prefix) {
            return Err(invalid(
                &name,
                format!("prefix '{import_prefix}' is bound more than once"),
            ));
        }
        if !context.contains(target.as_str()) {
            return Err(invalid(&name, format!("imported module '{target}' is not loaded")));
        }
        imports.insert(import_prefix.to_string(), target);
    }

    let mut revision: Option<Revision> = None;
    for rev in stmt.children_named("revision") {
        let rev = Revision::new(rev.arg()).map_err(|e| invalid(&name, e.to_string()))?;
        if revision.as_ref().map_or(true, |current| rev > *current) {
            revision = Some(rev);
        }
    }

    let info = ModuleInfo {
        name: name.clone(),
        namespace: namespace.to_string(),
        prefix: prefix.to_string(),
        revision,
        imports,
    };

    let mut compiler = Compiler {
        context,
        info,
        nodes: Vec::new(),
        roots: Vec::new(),
        identities: stmt
            .children_named("identity")
            .map(|i| i.arg().to_string())
            .collect(),
        typedefs: collect_named(stmt, "typedef"),
        groupings: collect_named(stmt, "grouping"),
        scopes: Vec::new(),
        expanding: Vec::new(),
    };

    for identity in stmt.children_named("identity") {
        for base in identity.children_named("base") {
            compiler.resolve_identity(base.arg(), &name)?;
        }
    }

    compiler.compile_body(stmt, None, true, false, &name)?;

    debug!(
        module = %name,
        nodes = compiler.nodes.len(),
        identities = compiler.identities.len(),
        "compiled module"
    );

    Ok(CompiledModule {
        info: compiler.info,
        nodes: compiler.nodes,
        roots: compiler.roots,
        identities: compiler.identities,
        typedefs: compiler.typedefs,
        groupings: compiler.groupings,
    })
}

fn collect_named(stmt: &Statement, keyword: &str) -> HashMap<String, Statement> {
    stmt.children_named(keyword)
        .map(|s| (s.arg().to_string(), s.clone()))
        .collect()
}

impl<'a> Compiler<'a> {
    fn compile_body(
        &mut self,
        body: &Statement,
        parent: Option<NodeId>,
        config: bool,
        in_op: bool,
        ctx: &ModuleName,
    ) -> Result<(), ImportError> {
        for child in &body.children {
            let kind = match child.keyword.as_str() {
                "container" => NodeKind::Container,
                "list" => NodeKind::List,
                "leaf" => NodeKind::Leaf,
                "leaf-list" => NodeKind::LeafList,
                "anydata" | "anyxml" => NodeKind::AnyData,
                "choice" => NodeKind::Choice,
                "case" => NodeKind::Case,
                "rpc" => NodeKind::Rpc,
                "action" => NodeKind::Action,
                "notification" => NodeKind::Notification,
                "input" => NodeKind::Input,
                "output" => NodeKind::Output,
                "uses" => {
                    self.expand_uses(child, parent, config, in_op, ctx)?;
                    continue;
                }
                "augment" | "deviation" => {
                    warn!(
                        module = %self.info.name,
                        line = child.line,
                        "'{}' is not supported and was ignored",
                        child.keyword
                    );
                    continue;
                }
                _ => continue,
            };
            self.check_placement(child, kind, parent)?;
            self.add_node(child, kind, parent, config, in_op, ctx)?;
        }
        Ok(())
    }

    fn check_placement(
        &self,
        stmt: &Statement,
        kind: NodeKind,
        parent: Option<NodeId>,
    ) -> Result<(), ImportError> {
        let parent_kind = parent.map(|p| self.nodes[p].kind);
        let ok = match kind {
            NodeKind::Rpc => parent.is_none(),
            NodeKind::Action => matches!(parent_kind, Some(NodeKind::Container | NodeKind::List)),
            NodeKind::Input | NodeKind::Output => {
                matches!(parent_kind, Some(NodeKind::Rpc | NodeKind::Action))
            }
            _ => true,
        };
        if ok {
            Ok(())
        } else {
            Err(invalid(
                &self.info.name,
                format!("line {}: '{}' is not allowed here", stmt.line, stmt.keyword),
            ))
        }
    }

    fn add_node(
        &mut self,
        stmt: &Statement,
        kind: NodeKind,
        parent: Option<NodeId>,
        config: bool,
        in_op: bool,
        ctx: &ModuleName,
    ) -> Result<(), ImportError> {
        let name = match kind {
            NodeKind::Input => "input",
            NodeKind::Output => "output",
            _ => stmt.arg(),
        };
        if name.is_empty() {
            return Err(invalid(
                &self.info.name,
                format!("line {}: '{}' requires a name", stmt.line, stmt.keyword),
            ));
        }

        let own_config = match stmt.child_arg("config") {
            None | Some("true") => true,
            Some("false") => false,
            Some(other) => {
                return Err(invalid(
                    &self.info.name,
                    format!("line {}: invalid config value '{other}'", stmt.line),
                ))
            }
        };
        let in_op = in_op || kind.is_operation();
        let config = config && own_config && !in_op;

        let (ty, default) = if matches!(kind, NodeKind::Leaf | NodeKind::LeafList) {
            let type_stmt = stmt.child("type").ok_or_else(|| {
                invalid(
                    &self.info.name,
                    format!("line {}: '{name}' has no type", stmt.line),
                )
            })?;
            let (ty, inherited) = self.compile_type(type_stmt, ctx, 0)?;
            let default = stmt
                .child_arg("default")
                .map(|text| Expr {
                    text: text.to_string(),
                    context: ctx.clone(),
                })
                .or(inherited);
            (Some(ty), default)
        } else {
            (None, None)
        };

        let constraints = stmt
            .children
            .iter()
            .filter(|c| c.keyword == "must" || c.keyword == "when")
            .map(|c| Expr {
                text: c.arg().to_string(),
                context: ctx.clone(),
            })
            .collect();

        let id = self.nodes.len();
        self.nodes.push(SchemaNode {
            name: name.to_string(),
            kind,
            parent,
            children: Vec::new(),
            config,
            ty,
            default,
            constraints,
        });
        match parent {
            Some(p) => self.nodes[p].children.push(id),
            None => self.roots.push(id),
        }

        self.scopes.push(scope_of(stmt, ctx));
        let result = self.compile_body(stmt, Some(id), config, in_op, ctx);
        self.scopes.pop();
        result
    }

    fn expand_uses(
        &mut self,
        uses: &Statement,
        parent: Option<NodeId>,
        config: bool,
        in_op: bool,
        ctx: &ModuleName,
    ) -> Result<(), ImportError> {
        let (module, grouping) = self.lookup(uses.arg(), ctx, Table::Grouping)?;
        let key = (module.clone(), grouping.arg().to_string());
        if self.expanding.contains(&key) {
            return Err(invalid(
                &self.info.name,
                format!("grouping '{}' uses itself", uses.arg()),
            ));
        }

        self.expanding.push(key);
        let saved = if module != *ctx {
            Some(std::mem::take(&mut self.scopes))
        } else {
            None
        };

        self.scopes.push(scope_of(&grouping, &module));
        let result = self.compile_body(&grouping, parent, config, in_op, &module);
        self.scopes.pop();

        if let Some(scopes) = saved {
            self.scopes = scopes;
        }
        self.expanding.pop();
        result
    }

    fn compile_type(
        &self,
        stmt: &Statement,
        ctx: &ModuleName,
        depth: usize,
    ) -> Result<(TypeSpec, Option<Expr>), ImportError> {
        if depth > MAX_TYPE_DEPTH {
            return Err(invalid(
                &self.info.name,
                format!("type '{}' is defined in terms of itself", stmt.arg()),
            ));
        }

        let name = stmt.arg();
        if !name.contains(':') && BUILTIN_TYPES.contains(&name) {
            let spec = match name {
                "leafref" => {
                    let path = stmt.child_arg("path").ok_or_else(|| {
                        invalid(
                            &self.info.name,
                            format!("line {}: leafref type requires a path", stmt.line),
                        )
                    })?;
                    TypeSpec::Leafref {
                        path: Expr {
                            text: path.to_string(),
                            context: ctx.clone(),
                        },
                    }
                }
                "instance-identifier" => TypeSpec::InstanceIdentifier,
                "identityref" => {
                    let bases = stmt
                        .children_named("base")
                        .map(|b| self.resolve_identity(b.arg(), ctx))
                        .collect::<Result<Vec<_>, _>>()?;
                    if bases.is_empty() {
                        return Err(invalid(
                            &self.info.name,
                            format!("line {}: identityref type requires a base", stmt.line),
                        ));
                    }
                    TypeSpec::Identityref { bases }
                }
                "union" => {
                    let members = stmt
                        .children_named("type")
                        .map(|t| self.compile_type(t, ctx, depth + 1).map(|(spec, _)| spec))
                        .collect::<Result<Vec<_>, _>>()?;
                    if members.is_empty() {
                        return Err(invalid(
                            &self.info.name,
                            format!("line {}: union type requires member types", stmt.line),
                        ));
                    }
                    TypeSpec::Union(members)
                }
                other => TypeSpec::Builtin(other.to_string()),
            };
            return Ok((spec, None));
        }

        let (module, typedef) = self.lookup(name, ctx, Table::Typedef)?;
        let inner = typedef.child("type").ok_or_else(|| {
            invalid(
                &self.info.name,
                format!("typedef '{name}' has no type"),
            )
        })?;
        let (spec, inherited) = self.compile_type(inner, &module, depth + 1)?;
        let default = typedef
            .child_arg("default")
            .map(|text| Expr {
                text: text.to_string(),
                context: module.clone(),
            })
            .or(inherited);
        Ok((spec, default))
    }

    fn resolve_identity(&self, name: &str, ctx: &ModuleName) -> Result<IdentityRef, ImportError> {
        let (module, local) = self.split_qualified(name, ctx)?;
        let known = if module == self.info.name {
            self.identities.iter().any(|i| i == local)
        } else {
            self.context
                .get(module.as_str())
                .is_some_and(|m| m.identities.iter().any(|i| i == local))
        };
        if !known {
            return Err(invalid(&self.info.name, format!("unknown identity '{name}'")));
        }
        Ok(IdentityRef {
            module,
            name: local.to_string(),
        })
    }

    /// Find a typedef or grouping by (possibly qualified) name.
    fn lookup(
        &self,
        name: &str,
        ctx: &ModuleName,
        table: Table,
    ) -> Result<(ModuleName, Statement), ImportError> {
        let (module, local) = self.split_qualified(name, ctx)?;

        let scoped = self
            .scopes
            .iter()
            .rev()
            .filter(|s| s.module.as_ref() == Some(&module))
            .find_map(|s| table.pick(&s.typedefs, &s.groupings).get(local));

        let found = match scoped {
            Some(stmt) => Some(stmt),
            None if module == self.info.name => {
                table.pick(&self.typedefs, &self.groupings).get(local)
            }
            None => self
                .context
                .get(module.as_str())
                .and_then(|m| table.pick(&m.typedefs, &m.groupings).get(local)),
        };

        found
            .cloned()
            .map(|stmt| (module, stmt))
            .ok_or_else(|| invalid(&self.info.name, format!("unknown {} '{name}'", table.label())))
    }

    fn split_qualified<'n>(
        &self,
        name: &'n str,
        ctx: &ModuleName,
    ) -> Result<(ModuleName, &'n str), ImportError> {
        match name.split_once(':') {
            None => Ok((ctx.clone(), name)),
            Some((prefix, local)) => {
                let module = if *ctx == self.info.name {
                    if prefix == self.info.prefix {
                        Some(self.info.name.clone())
                    } else {
                        self.info.imports.get(prefix).cloned()
                    }
                } else {
                    self.context.resolve_prefix(ctx.as_str(), prefix).cloned()
                };
                module
                    .map(|m| (m, local))
                    .ok_or_else(|| invalid(&self.info.name, format!("unknown prefix in '{name}'")))
            }
        }
    }
}

fn scope_of(stmt: &Statement, module: &ModuleName) -> Scope {
    Scope {
        module: Some(module.clone()),
        typedefs: collect_named(stmt, "typedef"),
        groupings: collect_named(stmt, "grouping"),
    }
}

/// Check that the references of a module added to `context` resolve.
///
/// Leafref paths must lead to a node and instance-identifier defaults must
/// name a known module in their first step.
pub fn validate_references(context: &SchemaContext, module: usize) -> Result<(), ImportError> {
    let compiled = context.module(module);
    for id in 0..compiled.nodes.len() {
        let r = NodeRef { module, node: id };
        let node = compiled.node(id);
        if let Some(ty) = &node.ty {
            check_type(context, r, ty, node.default.as_ref())?;
        }
    }
    Ok(())
}

fn check_type(
    context: &SchemaContext,
    r: NodeRef,
    ty: &TypeSpec,
    default: Option<&Expr>,
) -> Result<(), ImportError> {
    match ty {
        TypeSpec::Leafref { path } => {
            if context
                .resolve_path(r, &path.text, path.context.as_str())
                .is_none()
            {
                return Err(invalid(
                    context.module_name(r),
                    format!(
                        "leafref path '{}' of '{}' does not resolve",
                        path.text,
                        context.data_path(r)
                    ),
                ));
            }
        }
        TypeSpec::InstanceIdentifier => {
            if let Some(value) = default {
                if context.first_step_module(value).is_none() {
                    return Err(invalid(
                        context.module_name(r),
                        format!(
                            "default '{}' of '{}' names an unknown module",
                            value.text,
                            context.data_path(r)
                        ),
                    ));
                }
            }
        }
        TypeSpec::Union(members) => {
            for member in members {
                check_type(context, r, member, default)?;
            }
        }
        TypeSpec::Identityref { .. } | TypeSpec::Builtin(_) => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::parser::parse_statements;

    fn compile(src: &str) -> Result<CompiledModule, ImportError> {
        let stmt = parse_statements(src).unwrap();
        compile_module(&stmt, &SchemaContext::new())
    }

    fn compile_in(src: &str, context: &mut SchemaContext) -> Result<usize, ImportError> {
        let stmt = parse_statements(src).unwrap();
        let module = compile_module(&stmt, context)?;
        let idx = context.add(module);
        validate_references(context, idx)?;
        Ok(idx)
    }

    #[test]
    fn compiles_header() {
        let m = compile(
            r#"module a { namespace "urn:a"; prefix a;
                revision 2019-01-01; revision 2020-02-02; }"#,
        )
        .unwrap();
        assert_eq!(m.info.name.as_str(), "a");
        assert_eq!(m.info.namespace, "urn:a");
        assert_eq!(m.info.prefix, "a");
        assert_eq!(m.info.revision.unwrap().as_str(), "2020-02-02");
    }

    #[test]
    fn missing_namespace_is_invalid() {
        let err = compile("module a { prefix a; }").unwrap_err();
        assert!(matches!(err, ImportError::Invalid { .. }));
        assert!(err.to_string().contains("namespace"));
    }

    #[test]
    fn submodule_is_invalid() {
        let err = compile("submodule s { belongs-to a { prefix a; } }").unwrap_err();
        assert!(err.to_string().contains("submodule"));
    }

    #[test]
    fn config_false_is_inherited() {
        let m = compile(
            r#"module a { namespace "urn:a"; prefix a;
                container state { config false; leaf counter { type uint32; } }
                container conf { leaf name { type string; } } }"#,
        )
        .unwrap();
        let state = &m.nodes[m.roots[0]];
        let counter = &m.nodes[state.children[0]];
        assert!(!state.config);
        assert!(!counter.config);
        assert!(m.nodes[m.roots[1]].config);
    }

    #[test]
    fn typedefs_are_flattened_with_defaults() {
        let m = compile(
            r#"module a { namespace "urn:a"; prefix a;
                typedef ref { type instance-identifier; default "/a:x"; }
                typedef ref2 { type ref; }
                leaf x { type string; }
                leaf y { type ref2; } }"#,
        )
        .unwrap();
        let y = &m.nodes[m.roots[1]];
        assert_eq!(y.ty, Some(TypeSpec::InstanceIdentifier));
        assert_eq!(y.default.as_ref().unwrap().text, "/a:x");
    }

    #[test]
    fn cyclic_typedef_is_invalid() {
        let err = compile(
            r#"module a { namespace "urn:a"; prefix a;
                typedef t { type t; } leaf x { type t; } }"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("itself"));
    }

    #[test]
    fn groupings_expand_in_place() {
        let m = compile(
            r#"module a { namespace "urn:a"; prefix a;
                grouping g { leaf inner { type string; } }
                container c { uses g; leaf after { type string; } } }"#,
        )
        .unwrap();
        let c = &m.nodes[m.roots[0]];
        let names: Vec<_> = c.children.iter().map(|&id| m.nodes[id].name.as_str()).collect();
        assert_eq!(names, vec!["inner", "after"]);
    }

    #[test]
    fn recursive_grouping_is_invalid() {
        let err = compile(
            r#"module a { namespace "urn:a"; prefix a;
                grouping g { container c { uses g; } }
                uses g; }"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("uses itself"));
    }

    #[test]
    fn unknown_identity_is_invalid() {
        let err = compile(
            r#"module a { namespace "urn:a"; prefix a;
                leaf t { type identityref { base missing; } } }"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("unknown identity"));
    }

    #[test]
    fn action_at_top_level_is_invalid() {
        let err = compile(
            r#"module a { namespace "urn:a"; prefix a; action act; }"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("not allowed"));
    }

    #[test]
    fn operations_carry_no_config() {
        let m = compile(
            r#"module a { namespace "urn:a"; prefix a;
                rpc r { input { leaf i { type string; } } } }"#,
        )
        .unwrap();
        let rpc = &m.nodes[m.roots[0]];
        let input = &m.nodes[rpc.children[0]];
        assert_eq!(input.kind, NodeKind::Input);
        assert!(!m.nodes[input.children[0]].config);
    }

    #[test]
    fn imported_grouping_uses_its_own_prefixes() {
        let mut context = SchemaContext::new();
        compile_in(
            r#"module base { namespace "urn:base"; prefix b;
                leaf target { type string; }
                grouping g { leaf r { type leafref { path "/b:target"; } } } }"#,
            &mut context,
        )
        .unwrap();
        let idx = compile_in(
            r#"module user { namespace "urn:user"; prefix u;
                import base { prefix other; }
                container c { uses other:g; } }"#,
            &mut context,
        )
        .unwrap();

        let user = context.module(idx);
        let c = user.node(user.roots[0]);
        let r = user.node(c.children[0]);
        match &r.ty {
            Some(TypeSpec::Leafref { path }) => assert_eq!(path.context.as_str(), "base"),
            other => panic!("unexpected type {other:?}"),
        }
    }

    #[test]
    fn dangling_leafref_is_invalid() {
        let mut context = SchemaContext::new();
        let err = compile_in(
            r#"module a { namespace "urn:a"; prefix a;
                leaf r { type leafref { path "/a:nowhere"; } } }"#,
            &mut context,
        )
        .unwrap_err();
        assert!(err.to_string().contains("does not resolve"));
    }

    #[test]
    fn relative_leafref_inside_input_resolves() {
        let mut context = SchemaContext::new();
        compile_in(
            r#"module a { namespace "urn:a"; prefix a;
                rpc r { input {
                    leaf x { type string; }
                    leaf y { type leafref { path "../x"; } } } } }"#,
            &mut context,
        )
        .unwrap();
    }
}
