//! schema::importer
//!
//! Locating, parsing and compiling a module together with its imports.
//!
//! The registry depends only on the [`SchemaImporter`] trait; the default
//! implementation, [`YangImporter`], reads module files from disk.
//!
//! # Resolution
//!
//! Imports are looked up in the source file's directory first, then in
//! each search directory in order. Within a directory, an import with a
//! `revision-date` prefers `<name>@<revision>.yang`; otherwise the newest
//! `<name>@<revision>.yang` wins, falling back to `<name>.yang`.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, trace};

use super::compile::{compile_module, validate_references};
use super::parser::parse_statements;
use super::tree::{SchemaContext, SchemaTree};
use super::ImportError;
use crate::core::types::Revision;

/// File extension of module sources.
pub const MODULE_EXTENSION: &str = "yang";

/// Produces compiled schema trees from module sources.
pub trait SchemaImporter: Send + Sync {
    /// Import the module in `source`, resolving its imports through
    /// `search_paths`.
    fn import(&self, source: &Path, search_paths: &[PathBuf]) -> Result<SchemaTree, ImportError>;
}

/// Importer for module files on disk.
#[derive(Debug, Clone, Copy, Default)]
pub struct YangImporter;

impl YangImporter {
    /// Create a new importer.
    pub fn new() -> Self {
        Self
    }
}

#[cfg(test)]
impl YangImporter {
    /// Import a module given as text, resolving imports through
    /// `search_paths` only.
    pub(crate) fn import_str(
        &self,
        text: &str,
        search_paths: &[PathBuf],
    ) -> Result<SchemaTree, ImportError> {
        let mut loader = Loader::new(search_paths.to_vec());
        let main = loader.load_source(Path::new("<input>"), text, None)?;
        Ok(SchemaTree::new(loader.context, main))
    }
}

impl SchemaImporter for YangImporter {
    fn import(&self, source: &Path, search_paths: &[PathBuf]) -> Result<SchemaTree, ImportError> {
        let mut dirs = Vec::with_capacity(search_paths.len() + 1);
        if let Some(parent) = source.parent() {
            let parent = if parent.as_os_str().is_empty() {
                Path::new(".")
            } else {
                parent
            };
            dirs.push(parent.to_path_buf());
        }
        for dir in search_paths {
            if !dirs.contains(dir) {
                dirs.push(dir.clone());
            }
        }

        let mut loader = Loader::new(dirs);
        let main = loader.load_file(source, None)?;
        let tree = SchemaTree::new(loader.context, main);
        debug!(
            module = %tree.module().name,
            loaded = tree.context().len(),
            "imported schema"
        );
        Ok(tree)
    }
}

struct Loader {
    search_paths: Vec<PathBuf>,
    context: SchemaContext,
    loading: Vec<String>,
}

impl Loader {
    fn new(search_paths: Vec<PathBuf>) -> Self {
        Self {
            search_paths,
            context: SchemaContext::new(),
            loading: Vec::new(),
        }
    }

    fn load_file(&mut self, path: &Path, expected: Option<&str>) -> Result<usize, ImportError> {
        let text = fs::read_to_string(path).map_err(|source| ImportError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        self.load_source(path, &text, expected)
    }

    fn load_source(
        &mut self,
        path: &Path,
        text: &str,
        expected: Option<&str>,
    ) -> Result<usize, ImportError> {
        let stmt = parse_statements(text).map_err(|e| ImportError::ParseFailure {
            path: path.to_path_buf(),
            line: e.line,
            message: e.message,
        })?;

        let name = stmt.arg().to_string();
        if let Some(expected) = expected {
            if name != expected {
                return Err(ImportError::Invalid {
                    module: expected.to_string(),
                    message: format!("{} declares module '{name}'", path.display()),
                });
            }
        }
        if let Some(idx) = self.context.index_of(&name) {
            return Ok(idx);
        }

        self.loading.push(name.clone());
        for import in stmt.children_named("import") {
            let dep = import.arg();
            if self.context.contains(dep) {
                continue;
            }
            if self.loading.iter().any(|n| n == dep) {
                return Err(ImportError::Invalid {
                    module: name,
                    message: format!("circular import of '{dep}'"),
                });
            }
            let file = self
                .locate(dep, import.child_arg("revision-date"))
                .ok_or_else(|| ImportError::UnresolvedImport {
                    module: dep.to_string(),
                    searched: self.search_paths.clone(),
                })?;
            debug!(module = %name, import = dep, file = %file.display(), "resolved import");
            self.load_file(&file, Some(dep))?;
        }

        let compiled = compile_module(&stmt, &self.context)?;
        let idx = self.context.add(compiled);
        validate_references(&self.context, idx)?;
        self.loading.pop();
        Ok(idx)
    }

    fn locate(&self, module: &str, revision: Option<&str>) -> Option<PathBuf> {
        for dir in &self.search_paths {
            trace!(module, dir = %dir.display(), "searching for module");
            if let Some(rev) = revision {
                let exact = dir.join(format!("{module}@{rev}.{MODULE_EXTENSION}"));
                if exact.is_file() {
                    return Some(exact);
                }
            } else if let Some(newest) = newest_revision(dir, module) {
                return Some(newest);
            }

            let bare = dir.join(format!("{module}.{MODULE_EXTENSION}"));
            if bare.is_file() {
                return Some(bare);
            }
        }
        None
    }
}

fn newest_revision(dir: &Path, module: &str) -> Option<PathBuf> {
    let entries = fs::read_dir(dir).ok()?;
    let mut best: Option<(Revision, PathBuf)> = None;
    for entry in entries.flatten() {
        let file_name = entry.file_name();
        let Some(file_name) = file_name.to_str() else {
            continue;
        };
        let rev = file_name
            .strip_prefix(module)
            .and_then(|rest| rest.strip_prefix('@'))
            .and_then(|rest| rest.strip_suffix(MODULE_EXTENSION))
            .and_then(|rest| rest.strip_suffix('.'))
            .and_then(|rest| Revision::new(rest).ok());
        if let Some(rev) = rev {
            if best.as_ref().map_or(true, |(current, _)| rev > *current) {
                best = Some((rev, entry.path()));
            }
        }
    }
    best.map(|(_, path)| path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::tree::TypeSpec;
    use tempfile::TempDir;

    fn write(dir: &Path, file: &str, text: &str) -> PathBuf {
        let path = dir.join(file);
        fs::write(&path, text).unwrap();
        path
    }

    const BASE: &str = r#"module base { namespace "urn:base"; prefix b; leaf x { type string; } }"#;

    #[test]
    fn imports_from_source_directory() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "base.yang", BASE);
        let user = write(
            dir.path(),
            "user.yang",
            r#"module user { namespace "urn:user"; prefix u;
                import base { prefix b; }
                leaf r { type leafref { path "/b:x"; } } }"#,
        );

        let tree = YangImporter::new().import(&user, &[]).unwrap();
        assert_eq!(tree.module().name.as_str(), "user");
        assert!(tree.context().contains("base"));
    }

    #[test]
    fn imports_from_search_directory() {
        let src = TempDir::new().unwrap();
        let lib = TempDir::new().unwrap();
        write(lib.path(), "base.yang", BASE);
        let user = write(
            src.path(),
            "user.yang",
            r#"module user { namespace "urn:user"; prefix u; import base { prefix b; } }"#,
        );

        let importer = YangImporter::new();
        assert!(matches!(
            importer.import(&user, &[]),
            Err(ImportError::UnresolvedImport { ref module, .. }) if module == "base"
        ));
        assert!(importer.import(&user, &[lib.path().to_path_buf()]).is_ok());
    }

    #[test]
    fn newest_revision_file_wins() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            "base@2019-01-01.yang",
            r#"module base { namespace "urn:base"; prefix b; revision 2019-01-01; }"#,
        );
        write(
            dir.path(),
            "base@2021-06-30.yang",
            r#"module base { namespace "urn:base"; prefix b; revision 2021-06-30; }"#,
        );
        let user = write(
            dir.path(),
            "user.yang",
            r#"module user { namespace "urn:user"; prefix u; import base { prefix b; } }"#,
        );

        let tree = YangImporter::new().import(&user, &[]).unwrap();
        let base = tree.context().get("base").unwrap();
        assert_eq!(base.info.revision.as_ref().unwrap().as_str(), "2021-06-30");
    }

    #[test]
    fn revision_date_is_honoured() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            "base@2019-01-01.yang",
            r#"module base { namespace "urn:base"; prefix b; revision 2019-01-01; }"#,
        );
        write(
            dir.path(),
            "base@2021-06-30.yang",
            r#"module base { namespace "urn:base"; prefix b; revision 2021-06-30; }"#,
        );
        let user = write(
            dir.path(),
            "user.yang",
            r#"module user { namespace "urn:user"; prefix u;
                import base { prefix b; revision-date 2019-01-01; } }"#,
        );

        let tree = YangImporter::new().import(&user, &[]).unwrap();
        let base = tree.context().get("base").unwrap();
        assert_eq!(base.info.revision.as_ref().unwrap().as_str(), "2019-01-01");
    }

    #[test]
    fn imported_grouping_resolves_unprefixed_paths_where_used() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            "base.yang",
            r#"module base { namespace "urn:base"; prefix b;
                grouping g { leaf r { type leafref { path "/name"; } } } }"#,
        );
        let user = write(
            dir.path(),
            "user.yang",
            r#"module user { namespace "urn:user"; prefix u;
                import base { prefix b; }
                leaf name { type string; }
                uses b:g; }"#,
        );

        let tree = YangImporter::new().import(&user, &[]).unwrap();
        let ctx = tree.context();
        let r = tree.roots().find(|&n| ctx.node(n).name == "r").unwrap();
        let Some(TypeSpec::Leafref { path }) = &ctx.node(r).ty else {
            panic!("expected a leafref");
        };
        assert_eq!(path.context.as_str(), "base");
        let target = ctx.resolve_path(r, &path.text, path.context.as_str()).unwrap();
        assert_eq!(ctx.module_name(target).as_str(), "user");
        assert_eq!(ctx.node(target).name, "name");
    }

    #[test]
    fn circular_import_is_invalid() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            "a.yang",
            r#"module a { namespace "urn:a"; prefix a; import b { prefix b; } }"#,
        );
        let b = write(
            dir.path(),
            "b.yang",
            r#"module b { namespace "urn:b"; prefix b; import a { prefix a; } }"#,
        );

        let err = YangImporter::new().import(&b, &[]).unwrap_err();
        assert!(err.to_string().contains("circular"));
    }

    #[test]
    fn mismatched_file_name_is_invalid() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            "base.yang",
            r#"module other { namespace "urn:o"; prefix o; }"#,
        );
        let user = write(
            dir.path(),
            "user.yang",
            r#"module user { namespace "urn:user"; prefix u; import base { prefix b; } }"#,
        );

        let err = YangImporter::new().import(&user, &[]).unwrap_err();
        assert!(matches!(err, ImportError::Invalid { ref module, .. } if module == "base"));
    }

    #[test]
    fn syntax_error_reports_line() {
        let err = YangImporter::new()
            .import_str("module a {\n  namespace \"urn:a\";\n  prefix a\n}", &[])
            .unwrap_err();
        match err {
            ImportError::ParseFailure { line, .. } => assert!(line >= 3),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = YangImporter::new()
            .import(Path::new("/nonexistent/dir/nothing.yang"), &[])
            .unwrap_err();
        assert!(matches!(err, ImportError::Io { .. }));
    }
}
