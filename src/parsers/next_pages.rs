//! Next.js pages-router parser.
//!
//! One dispatcher per file (`pages/api/**/*.{ts,js}`), dispatching on the
//! request method in its body. The set of accepted methods is inferred
//! from `req.method` equality comparisons, `switch (req.method)` case
//! labels, and an exported `methods` string array.

use super::RouteParser;
use crate::ast;
use crate::normalize;
use crate::patterns;
use crate::project::{Project, SourceFile};
use crate::types::{
    DynamicSegment, HttpMethod, NextHandlerRecord, ParserOptions, Route, RouteKind,
};
use anyhow::Result;
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::debug;
use tree_sitter::Node;

const PAGES_ROUTE_PATTERNS: &[&str] = &["**/pages/api/**/*.ts", "**/pages/api/**/*.js"];

pub struct PagesRouterParser {
    options: ParserOptions,
    route_cache: HashMap<(PathBuf, PathBuf), (String, Vec<DynamicSegment>)>,
}

impl PagesRouterParser {
    pub fn new(options: ParserOptions) -> Self {
        Self {
            options,
            route_cache: HashMap::new(),
        }
    }

    /// Parse all pages-router routes under `root`.
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
        // `route.{ts,js}` belongs to the app-router parser.
        if file.rel_path.ends_with("/route.ts") || file.rel_path.ends_with("/route.js") {
            return Vec::new();
        }

        let decls = file.declarations();
        let Some(handler) = find_dispatcher(file, &decls) else {
            return Vec::new();
        };

        let (route_path, segments) = self.route_path_for(project, file);
        let mut methods = infer_methods(file, handler);
        methods.extend(exported_methods_array(file));

        let has_middleware = patterns::has_middleware_export(file);
        let is_server_action = patterns::is_server_action_file(file);

        let mut seen: HashSet<HttpMethod> = HashSet::new();
        let mut records = Vec::new();
        for method in methods {
            if !seen.insert(method) {
                continue;
            }
            debug!(
                "Found {} handler at {} (line {})",
                method,
                route_path,
                ast::start_line(handler)
            );
            let body_example = if method.carries_body() {
                super::infer_body(file, handler, &decls)
            } else {
                None
            };
            records.push(NextHandlerRecord {
                route_path: route_path.clone(),
                method,
                file: file.path.clone(),
                line: ast::start_line(handler),
                dynamic_segments: segments.clone(),
                is_dynamic: !segments.is_empty(),
                has_middleware,
                is_server_action,
                handler_lines: ast::line_span(handler),
                uses_db: super::uses_db(file, handler),
                has_error_handling: super::has_error_handling(handler),
                has_validation: super::has_validation(file, handler),
                headers: super::headers_for_body(&body_example),
                query_params: request_query_keys(file, handler),
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
        let computed = pages_route_path(&file.rel_path);
        self.route_cache.insert(key, computed.clone());
        computed
    }
}

impl RouteParser for PagesRouterParser {
    fn name(&self) -> &'static str {
        "nextjs-page"
    }

    fn default_patterns(&self) -> &'static [&'static str] {
        PAGES_ROUTE_PATTERNS
    }

    fn options(&self) -> &ParserOptions {
        &self.options
    }

    fn parse_routes(&mut self, project: &Project) -> Vec<Route> {
        self.parse_handler_records(project)
            .iter()
            .map(|record| normalize::next_route(record, RouteKind::NextJsPage, &project.root))
            .collect()
    }
}

/// Map an on-disk page file to its URL pattern. `pages/api/index.ts` maps
/// to `/api`.
fn pages_route_path(rel: &str) -> (String, Vec<DynamicSegment>) {
    let mut p = rel;
    p = p.strip_prefix("src/").unwrap_or(p);
    p = p.strip_prefix("pages/").unwrap_or(p);
    for ext in [".tsx", ".jsx", ".ts", ".js"] {
        if let Some(stripped) = p.strip_suffix(ext) {
            p = stripped;
            break;
        }
    }
    if let Some(stripped) = p.strip_suffix("/index") {
        p = stripped;
    } else if p == "index" {
        p = "";
    }
    let segments = patterns::extract_dynamic_segments(p);
    let path = patterns::normalize_route_path(&patterns::convert_segments(p));
    (path, segments)
}

/// The single dispatcher: the default export's first declaration, else the
/// named export `handler`.
fn find_dispatcher<'f>(
    file: &'f SourceFile,
    decls: &HashMap<String, Node<'f>>,
) -> Option<Node<'f>> {
    let root = file.root_node();
    let mut cursor = root.walk();
    for stmt in root.named_children(&mut cursor) {
        if stmt.kind() != "export_statement" {
            continue;
        }
        let is_default = {
            let mut inner = stmt.walk();
            let has_default = stmt.children(&mut inner).any(|c| c.kind() == "default");
            has_default
        };
        if !is_default {
            continue;
        }
        if let Some(decl) = stmt.child_by_field_name("declaration") {
            if matches!(
                decl.kind(),
                "function_declaration" | "generator_function_declaration"
            ) {
                return Some(decl);
            }
        }
        if let Some(value) = stmt.child_by_field_name("value") {
            let value = ast::unwrap_expression(value);
            if ast::is_function_like(value.kind()) {
                return Some(value);
            }
            if value.kind() == "identifier" {
                if let Some(resolved) = decls.get(file.text(value)) {
                    return Some(*resolved);
                }
            }
        }
    }
    // Fall back to an exported symbol named `handler`.
    let root = file.root_node();
    let mut cursor = root.walk();
    for stmt in root.named_children(&mut cursor) {
        if stmt.kind() != "export_statement" {
            continue;
        }
        if let Some(decl) = stmt.child_by_field_name("declaration") {
            match decl.kind() {
                "function_declaration" | "generator_function_declaration" => {
                    if decl
                        .child_by_field_name("name")
                        .map(|n| file.text(n) == "handler")
                        .unwrap_or(false)
                    {
                        return Some(decl);
                    }
                }
                "lexical_declaration" | "variable_declaration" => {
                    let mut inner = decl.walk();
                    for declarator in decl.named_children(&mut inner) {
                        if declarator.kind() != "variable_declarator" {
                            continue;
                        }
                        let named_handler = declarator
                            .child_by_field_name("name")
                            .map(|n| file.text(n) == "handler")
                            .unwrap_or(false);
                        if !named_handler {
                            continue;
                        }
                        if let Some(value) = declarator.child_by_field_name("value") {
                            let value = ast::unwrap_expression(value);
                            if ast::is_function_like(value.kind()) {
                                return Some(value);
                            }
                        }
                    }
                }
                _ => {}
            }
        }
        if patterns::exported_clause_names(file, stmt).any(|n| n == "handler") {
            if let Some(resolved) = decls.get("handler") {
                return Some(*resolved);
            }
        }
    }
    None
}

/// Infer accepted methods from `req.method` comparisons and switch cases.
fn infer_methods(file: &SourceFile, handler: Node) -> Vec<HttpMethod> {
    let mut receivers: HashSet<String> = ["req", "request"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    if let Some(first) = ast::first_parameter_name(&file.source, handler) {
        receivers.insert(first);
    }

    let mut methods = Vec::new();
    ast::for_each_descendant(handler, &mut |node| match node.kind() {
        "binary_expression" => {
            let operator = node
                .child_by_field_name("operator")
                .map(|op| file.text(op).to_string())
                .unwrap_or_default();
            if operator != "===" && operator != "==" {
                return;
            }
            let left = node.child_by_field_name("left");
            let right = node.child_by_field_name("right");
            let (Some(left), Some(right)) = (left, right) else {
                return;
            };
            let literal = if is_request_method(file, left, &receivers) {
                patterns::method_literal(file, right)
            } else if is_request_method(file, right, &receivers) {
                patterns::method_literal(file, left)
            } else {
                None
            };
            if let Some(method) = literal {
                methods.push(method);
            }
        }
        "switch_statement" => {
            let subject = node
                .child_by_field_name("condition")
                .and_then(|c| c.named_child(0))
                .map(ast::unwrap_expression);
            if !subject
                .map(|s| is_request_method(file, s, &receivers))
                .unwrap_or(false)
            {
                return;
            }
            let Some(body) = node.child_by_field_name("body") else {
                return;
            };
            let mut cursor = body.walk();
            for case in body.named_children(&mut cursor) {
                if case.kind() != "switch_case" {
                    continue;
                }
                if let Some(method) = case
                    .child_by_field_name("value")
                    .and_then(|v| patterns::method_literal(file, v))
                {
                    methods.push(method);
                }
            }
        }
        _ => {}
    });
    methods
}

/// `<req>.method` where `<req>` is one of the accepted receiver names.
fn is_request_method(file: &SourceFile, node: Node, receivers: &HashSet<String>) -> bool {
    let node = ast::unwrap_expression(node);
    if node.kind() != "member_expression" {
        return false;
    }
    let property_is_method = node
        .child_by_field_name("property")
        .map(|p| file.text(p) == "method")
        .unwrap_or(false);
    let object_is_receiver = node
        .child_by_field_name("object")
        .map(|o| o.kind() == "identifier" && receivers.contains(file.text(o)))
        .unwrap_or(false);
    property_is_method && object_is_receiver
}

/// Methods declared by an exported `methods` string array.
fn exported_methods_array(file: &SourceFile) -> Vec<HttpMethod> {
    let root = file.root_node();
    let mut methods = Vec::new();
    let mut cursor = root.walk();
    for stmt in root.named_children(&mut cursor) {
        if stmt.kind() != "export_statement" {
            continue;
        }
        let Some(decl) = stmt.child_by_field_name("declaration") else {
            continue;
        };
        if !matches!(decl.kind(), "lexical_declaration" | "variable_declaration") {
            continue;
        }
        let mut inner = decl.walk();
        for declarator in decl.named_children(&mut inner) {
            if declarator.kind() != "variable_declarator" {
                continue;
            }
            let is_methods = declarator
                .child_by_field_name("name")
                .map(|n| file.text(n) == "methods")
                .unwrap_or(false);
            if !is_methods {
                continue;
            }
            let Some(value) = declarator.child_by_field_name("value") else {
                continue;
            };
            let value = ast::unwrap_expression(value);
            if value.kind() != "array" {
                continue;
            }
            let mut elements = value.walk();
            for element in value.named_children(&mut elements) {
                if let Some(method) = patterns::method_literal(file, element) {
                    methods.push(method);
                }
            }
        }
    }
    methods
}

/// Query keys read through `<req>.query.<key>` or `<req>.query["key"]`.
fn request_query_keys(file: &SourceFile, handler: Node) -> Map<String, Value> {
    let mut receivers: HashSet<String> = ["req", "request"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    if let Some(first) = ast::first_parameter_name(&file.source, handler) {
        receivers.insert(first);
    }

    let mut params = Map::new();
    ast::for_each_descendant(handler, &mut |node| {
        let (object, key) = match node.kind() {
            "member_expression" => {
                let object = node.child_by_field_name("object");
                let key = node
                    .child_by_field_name("property")
                    .map(|p| file.text(p).to_string());
                (object, key)
            }
            "subscript_expression" => {
                let object = node.child_by_field_name("object");
                let key = node
                    .child_by_field_name("index")
                    .and_then(|i| ast::string_literal_value(&file.source, i));
                (object, key)
            }
            _ => return,
        };
        let (Some(object), Some(key)) = (object, key) else {
            return;
        };
        if !is_request_query(file, object, &receivers) {
            return;
        }
        params
            .entry(key)
            .or_insert_with(|| Value::String("string".into()));
    });
    params
}

/// `<req>.query` member access.
fn is_request_query(file: &SourceFile, node: Node, receivers: &HashSet<String>) -> bool {
    let node = ast::unwrap_expression(node);
    if node.kind() != "member_expression" {
        return false;
    }
    let property_is_query = node
        .child_by_field_name("property")
        .map(|p| file.text(p) == "query")
        .unwrap_or(false);
    let object_is_receiver = node
        .child_by_field_name("object")
        .map(|o| o.kind() == "identifier" && receivers.contains(file.text(o)))
        .unwrap_or(false);
    property_is_query && object_is_receiver
}
