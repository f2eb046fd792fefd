//! Classification of variable references into function-local and global scopes.
//!
//! The remote engine can evaluate a variable by name but cannot list the
//! variables visible in a frame. The adapter recovers that list from the
//! source file of the frame instead.

use crate::script::ast::{FunctionDecl, Stmt, VarExpr, VarKind, Visitor};
use crate::script::parse_source;
use indexmap::{IndexMap, IndexSet};
use log::{debug, warn};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Variables found in a single source file.
///
/// Names carry their sigil (`%` for locals, `$` for globals), so they can be
/// sent to the engine as is.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct FileScopes {
    /// Lowercase qualified function name -> local variable names.
    pub locals: IndexMap<String, IndexSet<String>>,
    pub globals: IndexSet<String>,
}

impl FileScopes {
    /// Run the scope collector over parsed top-level statements.
    pub fn collect(stmts: &[Stmt]) -> Self {
        let mut collector = ScopeCollector::default();
        for stmt in stmts {
            stmt.accept(&mut collector);
        }
        collector.scopes
    }

    /// Local variables of a function, matched case-insensitively.
    pub fn locals_of(&self, function: &str) -> Vec<String> {
        self.locals
            .get(&function.to_lowercase())
            .map(|vars| vars.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn globals(&self) -> Vec<String> {
        self.globals.iter().cloned().collect()
    }
}

/// Single pass visitor. Function declarations cannot nest, so one cursor
/// naming the enclosing function is enough.
#[derive(Default)]
struct ScopeCollector {
    scopes: FileScopes,
    current_fn: String,
}

impl Visitor for ScopeCollector {
    fn visit_function_decl(&mut self, decl: &FunctionDecl) {
        let mut name = match &decl.namespace {
            Some(ns) => format!("{}::{}", ns.lexeme, decl.name.lexeme),
            None => decl.name.lexeme.clone(),
        };
        if let Some(package) = &decl.package {
            name = format!("{}::{name}", package.lexeme);
        }
        self.current_fn = name.to_lowercase();
    }

    fn visit_var(&mut self, var: &VarExpr) {
        match var.kind {
            VarKind::Local => {
                self.scopes
                    .locals
                    .entry(self.current_fn.clone())
                    .or_default()
                    .insert(format!("%{}", var.name.lexeme));
            }
            VarKind::Global => {
                self.scopes.globals.insert(format!("${}", var.name.lexeme));
            }
        }
    }
}

/// Per-session cache of [`FileScopes`], keyed by source path.
///
/// Files are parsed on first use and never re-read during the session.
#[derive(Default)]
pub struct ScopeCache {
    files: HashMap<PathBuf, FileScopes>,
}

impl ScopeCache {
    /// Return scopes of a file, parsing it on first request.
    ///
    /// Unreadable files yield `None` and are retried next time. A file that
    /// fails to parse is cached as having no known variables.
    pub fn get_or_parse(&mut self, path: &Path) -> Option<&FileScopes> {
        if !self.files.contains_key(path) {
            let source = match std::fs::read_to_string(path) {
                Ok(source) => source,
                Err(e) => {
                    warn!(target: "scope", "read {}: {e}", path.display());
                    return None;
                }
            };

            let scopes = match parse_source(&source) {
                Ok(stmts) => FileScopes::collect(&stmts),
                Err(e) => {
                    warn!(target: "scope", "parse {}: {e}", path.display());
                    FileScopes::default()
                }
            };
            debug!(
                target: "scope",
                "{}: {} function scopes, {} globals",
                path.display(),
                scopes.locals.len(),
                scopes.globals.len()
            );
            self.files.insert(path.to_path_buf(), scopes);
        }

        self.files.get(path)
    }

    pub fn is_cached(&self, path: &Path) -> bool {
        self.files.contains_key(path)
    }
}
