//! Workspace loading.
//!
//! Locates the TypeScript compiler configuration, enumerates source files
//! matching a whitelist of glob patterns, and parses each file with
//! tree-sitter. Absence of a tsconfig disables parsing (the caller reports
//! zero routes); per-file failures are logged and skipped.

use crate::ast;
use crate::types::ParserOptions;
use anyhow::{bail, Context, Result};
use ignore::overrides::OverrideBuilder;
use ignore::WalkBuilder;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use tree_sitter::{Node, Parser, Tree};

/// Directories that never contain user endpoints.
const ALWAYS_EXCLUDED: &[&str] = &[
    "!**/node_modules/**",
    "!**/.next/**",
    "!**/dist/**",
    "!**/build/**",
    "!**/.git/**",
];

/// A parsed source file owned by a [`Project`].
pub struct SourceFile {
    /// Absolute path.
    pub path: PathBuf,
    /// Path relative to the workspace root, slash-separated.
    pub rel_path: String,
    pub source: String,
    tree: Tree,
}

impl SourceFile {
    pub fn root_node(&self) -> Node<'_> {
        self.tree.root_node()
    }

    /// Source text covered by a node of this file's tree.
    pub fn text(&self, node: Node) -> &str {
        ast::text_of(&self.source, node)
    }

    /// Map of top-level declarations: identifier name to its initializer
    /// (for `const x = ...`) or to the declaration node itself (for
    /// `function x() {}`). Export wrappers are looked through.
    pub fn declarations(&self) -> HashMap<String, Node<'_>> {
        let mut decls = HashMap::new();
        let root = self.root_node();
        let mut cursor = root.walk();
        for stmt in root.named_children(&mut cursor) {
            let stmt = if stmt.kind() == "export_statement" {
                match stmt.child_by_field_name("declaration") {
                    Some(decl) => decl,
                    None => continue,
                }
            } else {
                stmt
            };
            match stmt.kind() {
                "function_declaration" | "generator_function_declaration" => {
                    if let Some(name) = stmt.child_by_field_name("name") {
                        decls.insert(self.text(name).to_string(), stmt);
                    }
                }
                "lexical_declaration" | "variable_declaration" => {
                    let mut inner = stmt.walk();
                    for declarator in stmt.named_children(&mut inner) {
                        if declarator.kind() != "variable_declarator" {
                            continue;
                        }
                        let name = declarator.child_by_field_name("name");
                        let value = declarator.child_by_field_name("value");
                        if let (Some(name), Some(value)) = (name, value) {
                            if name.kind() == "identifier" {
                                decls.insert(self.text(name).to_string(), value);
                            }
                        }
                    }
                }
                _ => {}
            }
        }
        decls
    }
}

/// The set of source files under a workspace root.
pub struct Project {
    pub root: PathBuf,
    pub files: Vec<SourceFile>,
}

impl Project {
    /// Load the files under `root` matching `patterns`.
    ///
    /// A nonexistent root is a caller contract violation and returns an
    /// error; a missing tsconfig yields an empty project.
    pub async fn load(root: &Path, patterns: &[String], options: &ParserOptions) -> Result<Self> {
        if !root.is_dir() {
            bail!("workspace root {} is not a directory", root.display());
        }
        let root = root
            .canonicalize()
            .with_context(|| format!("canonicalizing {}", root.display()))?;

        let tsconfig = options
            .tsconfig_path
            .clone()
            .unwrap_or_else(|| root.join("tsconfig.json"));
        if !tsconfig.is_file() {
            warn!(
                "no compiler config at {}; skipping workspace",
                tsconfig.display()
            );
            return Ok(Self {
                root,
                files: Vec::new(),
            });
        }

        let mut paths = discover_paths(&root, patterns);
        paths.sort();
        paths.dedup();

        let mut files = Vec::with_capacity(paths.len());
        for path in paths {
            let source = match tokio::fs::read_to_string(&path).await {
                Ok(source) => source,
                Err(err) => {
                    warn!("failed to read {}: {err}", path.display());
                    continue;
                }
            };
            let tree = match parse_source(&path, &source) {
                Some(tree) => tree,
                None => {
                    warn!("failed to parse {}", path.display());
                    continue;
                }
            };
            let rel_path = path
                .strip_prefix(&root)
                .unwrap_or(&path)
                .to_string_lossy()
                .replace('\\', "/");
            files.push(SourceFile {
                path,
                rel_path,
                source,
                tree,
            });
        }

        Ok(Self { root, files })
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

fn discover_paths(root: &Path, patterns: &[String]) -> Vec<PathBuf> {
    let mut overrides = OverrideBuilder::new(root);
    for pattern in patterns {
        if let Err(err) = overrides.add(pattern) {
            debug!("skipping glob {pattern}: {err}");
        }
    }
    for pattern in ALWAYS_EXCLUDED {
        if let Err(err) = overrides.add(pattern) {
            debug!("skipping exclude {pattern}: {err}");
        }
    }
    let overrides = match overrides.build() {
        Ok(overrides) => overrides,
        Err(err) => {
            warn!("failed to build glob set: {err}");
            return Vec::new();
        }
    };

    let walker = WalkBuilder::new(root)
        .git_ignore(true)
        .git_global(true)
        .git_exclude(true)
        .require_git(false)
        .overrides(overrides)
        .build();

    walker
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().map(|ft| ft.is_file()).unwrap_or(false))
        .map(|entry| entry.into_path())
        .filter(|path| path.starts_with(root))
        .collect()
}

fn parse_source(path: &Path, source: &str) -> Option<Tree> {
    let language = match path.extension().and_then(|ext| ext.to_str()) {
        Some("tsx") | Some("jsx") => tree_sitter_typescript::LANGUAGE_TSX,
        // Plain .js is a subset of what the TypeScript grammar accepts.
        _ => tree_sitter_typescript::LANGUAGE_TYPESCRIPT,
    };
    let mut parser = Parser::new();
    parser.set_language(&language.into()).ok()?;
    parser.parse(source, None)
}
