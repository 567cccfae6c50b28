//! Next.js app-router parser.
//!
//! One route file per URL (`app/**/route.{ts,js}`), one exported handler
//! per HTTP verb. Handlers are collected from exported function
//! declarations, exported variables bound to function values, verb-named
//! re-exports, and an exported `methods` string array.

use super::RouteParser;
use crate::normalize;
use crate::patterns;
use crate::project::{Project, SourceFile};
use crate::types::{
    DynamicSegment, HttpMethod, NextHandlerRecord, ParserOptions, Route, RouteKind,
};
use anyhow::Result;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::debug;
use tree_sitter::Node;

const APP_ROUTE_PATTERNS: &[&str] = &["**/app/**/route.ts", "**/app/**/route.js"];

/// Paths that exist for layout grouping or CMS plumbing, not as endpoints.
const ROUTE_PATH_DENYLIST: &[&str] = &["admin/[[...segments]]"];

pub struct AppRouterParser {
    options: ParserOptions,
    route_cache: HashMap<(PathBuf, PathBuf), (String, Vec<DynamicSegment>)>,
}

impl AppRouterParser {
    pub fn new(options: ParserOptions) -> Self {
        Self {
            options,
            route_cache: HashMap::new(),
        }
    }

    /// Parse all app-router routes under `root`.
    pub async fn parse(&mut self, root: &Path) -> Result<Vec<Route>> {
        super::parse_with(self, root).await
    }

    /// Internal handler records, prior to normalization.
    pub fn parse_handler_records(&mut self, project: &Project) -> Vec<NextHandlerRecord> {
        let mut records = Vec::new();
        for file in &project.files {
            debug!("Scanning file {}", file.rel_path);
            records.extend(self.parse_file(project, file));
        }
        records
    }

    fn parse_file(&mut self, project: &Project, file: &SourceFile) -> Vec<NextHandlerRecord> {
        if patterns::is_trpc_adapter_file(file) {
            debug!("Skipping tRPC adapter file {}", file.rel_path);
            return Vec::new();
        }
        if is_denylisted(&file.rel_path) {
            debug!("Skipping route-group path {}", file.rel_path);
            return Vec::new();
        }

        let (route_path, segments) = self.route_path_for(project, file);
        let decls = file.declarations();
        let has_middleware = patterns::has_middleware_export(file);
        let is_server_action = patterns::is_server_action_file(file);

        let mut seen: HashSet<HttpMethod> = HashSet::new();
        let mut records = Vec::new();
        for (method, node) in collect_handlers(file, &decls) {
            if !seen.insert(method) {
                continue;
            }
            debug!(
                "Found {} handler at {} (line {})",
                method,
                route_path,
                crate::ast::start_line(node)
            );
            let body_example = if method.carries_body() {
                super::infer_body(file, node, &decls)
            } else {
                None
            };
            records.push(NextHandlerRecord {
                route_path: route_path.clone(),
                method,
                file: file.path.clone(),
                line: crate::ast::start_line(node),
                dynamic_segments: segments.clone(),
                is_dynamic: !segments.is_empty(),
                has_middleware,
                is_server_action,
                handler_lines: crate::ast::line_span(node),
                uses_db: super::uses_db(file, node),
                has_error_handling: super::has_error_handling(node),
                has_validation: super::has_validation(file, node),
                headers: super::headers_for_body(&body_example),
                query_params: super::search_param_keys(file, node),
                body_example,
            });
        }
        records
    }

    fn route_path_for(
        &mut self,
        project: &Project,
        file: &SourceFile,
    ) -> (String, Vec<DynamicSegment>) {
        let key = (project.root.clone(), file.path.clone());
        if let Some(hit) = self.route_cache.get(&key) {
            return hit.clone();
        }
        let computed = app_route_path(&file.rel_path);
        self.route_cache.insert(key, computed.clone());
        computed
    }
}

impl RouteParser for AppRouterParser {
    fn name(&self) -> &'static str {
        "nextjs-app"
    }

    fn default_patterns(&self) -> &'static [&'static str] {
        APP_ROUTE_PATTERNS
    }

    fn options(&self) -> &ParserOptions {
        &self.options
    }

    fn parse_routes(&mut self, project: &Project) -> Vec<Route> {
        self.parse_handler_records(project)
            .iter()
            .map(|record| normalize::next_route(record, RouteKind::NextJsApp, &project.root))
            .collect()
    }
}

/// Map an on-disk route file to its URL pattern and dynamic segments.
fn app_route_path(rel: &str) -> (String, Vec<DynamicSegment>) {
    let mut p = rel;
    p = p.strip_prefix("src/").unwrap_or(p);
    p = p.strip_prefix("app/").unwrap_or(p);
    for suffix in ["/route.ts", "/route.js"] {
        if let Some(stripped) = p.strip_suffix(suffix) {
            p = stripped;
        }
    }
    if p == "route.ts" || p == "route.js" || p == "app" {
        p = "";
    }
    let segments = patterns::extract_dynamic_segments(p);
    let path = patterns::normalize_route_path(&patterns::convert_segments(p));
    (path, segments)
}

fn is_denylisted(rel: &str) -> bool {
    rel.split('/')
        .any(|segment| segment.starts_with('(') && segment.ends_with(')'))
        || ROUTE_PATH_DENYLIST.iter().any(|entry| rel.contains(entry))
}

/// Enumerate (method, handler node) pairs in AST traversal order.
fn collect_handlers<'f>(
    file: &'f SourceFile,
    decls: &HashMap<String, Node<'f>>,
) -> Vec<(HttpMethod, Node<'f>)> {
    let mut handlers = Vec::new();
    let root = file.root_node();
    let mut cursor = root.walk();
    for stmt in root.named_children(&mut cursor) {
        if stmt.kind() != "export_statement" {
            continue;
        }
        if let Some(decl) = stmt.child_by_field_name("declaration") {
            match decl.kind() {
                "function_declaration" | "generator_function_declaration" => {
                    if let Some(method) = decl
                        .child_by_field_name("name")
                        .and_then(|n| HttpMethod::from_export_name(file.text(n)))
                    {
                        handlers.push((method, decl));
                    }
                }
                "lexical_declaration" | "variable_declaration" => {
                    let mut inner = decl.walk();
                    for declarator in decl.named_children(&mut inner) {
                        if declarator.kind() != "variable_declarator" {
                            continue;
                        }
                        let name = declarator.child_by_field_name("name");
                        let value = declarator.child_by_field_name("value");
                        let (Some(name), Some(value)) = (name, value) else {
                            continue;
                        };
                        let value = crate::ast::unwrap_expression(value);
                        let name_text = file.text(name);
                        if let Some(method) = HttpMethod::from_export_name(name_text) {
                            if crate::ast::is_function_like(value.kind()) {
                                handlers.push((method, declarator));
                            }
                        } else if name_text == "methods" && value.kind() == "array" {
                            handlers.extend(methods_array_entries(file, value));
                        }
                    }
                }
                _ => {}
            }
        }
        for name in patterns::exported_clause_names(file, stmt) {
            if let Some(method) = HttpMethod::from_export_name(name) {
                // Resolve the re-exported name to its declaration so body
                // and query inference see the real handler; an external
                // re-export falls back to the clause itself.
                let node = decls.get(name).copied().unwrap_or(stmt);
                handlers.push((method, node));
            }
        }
    }
    handlers
}

/// Entries of an exported `methods` array; the implicit handler node is the
/// source file itself.
fn methods_array_entries<'f>(
    file: &'f SourceFile,
    array: Node<'f>,
) -> Vec<(HttpMethod, Node<'f>)> {
    let mut out = Vec::new();
    let mut cursor = array.walk();
    for element in array.named_children(&mut cursor) {
        if let Some(method) = patterns::method_literal(file, element) {
            out.push((method, file.root_node()));
        }
    }
    out
}
