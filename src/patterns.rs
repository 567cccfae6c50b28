//! Stateless helpers shared by the Next.js parsers.
//!
//! Dynamic-segment handling, route-path normalization, and the syntactic
//! detectors (middleware export, server-action directive, tRPC adapter
//! files, method literals).

use crate::ast;
use crate::project::SourceFile;
use crate::types::{DynamicSegment, HttpMethod};
use tree_sitter::Node;

/// Import sources / symbols that mark a file as a tRPC HTTP adapter rather
/// than a user endpoint.
const TRPC_ADAPTER_SOURCE: &str = "@trpc/server/adapters";
const TRPC_ADAPTER_SYMBOLS: &[&str] = &[
    "fetchRequestHandler",
    "createNextApiHandler",
    "nodeHTTPRequestHandler",
    "awsLambdaRequestHandler",
    "createExpressMiddleware",
    "createHTTPHandler",
];

/// Extract bracketed dynamic segments from a relative URL pattern, in
/// directory order. `[x]` is a required parameter, `[...x]` a catch-all,
/// `[[...x]]` an optional catch-all.
pub fn extract_dynamic_segments(pattern: &str) -> Vec<DynamicSegment> {
    pattern
        .split('/')
        .filter_map(|segment| {
            if let Some(name) = segment
                .strip_prefix("[[...")
                .and_then(|s| s.strip_suffix("]]"))
            {
                Some(DynamicSegment {
                    name: name.to_string(),
                    is_catch_all: true,
                    is_optional: true,
                })
            } else if let Some(name) =
                segment.strip_prefix("[...").and_then(|s| s.strip_suffix("]"))
            {
                Some(DynamicSegment {
                    name: name.to_string(),
                    is_catch_all: true,
                    is_optional: false,
                })
            } else if let Some(name) =
                segment.strip_prefix('[').and_then(|s| s.strip_suffix(']'))
            {
                Some(DynamicSegment {
                    name: name.to_string(),
                    is_catch_all: false,
                    is_optional: false,
                })
            } else {
                None
            }
        })
        .collect()
}

/// Convert bracket segments to colon form: `[x]` to `:x`, `[...x]` to
/// `:x*`, `[[...x]]` to `:x?`. Applied once per segment, left to right.
pub fn convert_segments(pattern: &str) -> String {
    pattern
        .split('/')
        .map(|segment| {
            if let Some(name) = segment
                .strip_prefix("[[...")
                .and_then(|s| s.strip_suffix("]]"))
            {
                format!(":{name}?")
            } else if let Some(name) =
                segment.strip_prefix("[...").and_then(|s| s.strip_suffix("]"))
            {
                format!(":{name}*")
            } else if let Some(name) =
                segment.strip_prefix('[').and_then(|s| s.strip_suffix(']'))
            {
                format!(":{name}")
            } else {
                segment.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Collapse duplicate slashes, strip the trailing slash (except for the
/// root), and ensure a leading slash. The empty pattern maps to `/`.
pub fn normalize_route_path(path: &str) -> String {
    let mut out = path.to_string();
    while out.contains("//") {
        out = out.replace("//", "/");
    }
    if !out.starts_with('/') {
        out.insert(0, '/');
    }
    while out.len() > 1 && out.ends_with('/') {
        out.pop();
    }
    out
}

/// True when the file exports a symbol named `middleware` (variable or
/// function, declaration or clause form).
pub fn has_middleware_export(file: &SourceFile) -> bool {
    let root = file.root_node();
    let mut cursor = root.walk();
    for stmt in root.named_children(&mut cursor) {
        if stmt.kind() != "export_statement" {
            continue;
        }
        if let Some(decl) = stmt.child_by_field_name("declaration") {
            match decl.kind() {
                "function_declaration" => {
                    if decl
                        .child_by_field_name("name")
                        .map(|n| file.text(n) == "middleware")
                        .unwrap_or(false)
                    {
                        return true;
                    }
                }
                "lexical_declaration" | "variable_declaration" => {
                    let mut inner = decl.walk();
                    for declarator in decl.named_children(&mut inner) {
                        if declarator.kind() == "variable_declarator"
                            && declarator
                                .child_by_field_name("name")
                                .map(|n| file.text(n) == "middleware")
                                .unwrap_or(false)
                        {
                            return true;
                        }
                    }
                }
                _ => {}
            }
        }
        if exported_clause_names(file, stmt).any(|name| name == "middleware") {
            return true;
        }
    }
    false
}

/// True when the file's first non-comment statement is the `"use server"`
/// directive.
pub fn is_server_action_file(file: &SourceFile) -> bool {
    let root = file.root_node();
    let mut cursor = root.walk();
    for stmt in root.named_children(&mut cursor) {
        match stmt.kind() {
            "comment" | "hash_bang_line" => continue,
            "expression_statement" => {
                return stmt
                    .named_child(0)
                    .and_then(|n| ast::string_literal_value(&file.source, n))
                    .map(|v| v == "use server")
                    .unwrap_or(false);
            }
            _ => return false,
        }
    }
    false
}

/// True when the file imports or references known tRPC HTTP-adapter
/// symbols. Such files are adapters, not user endpoints, and are excluded
/// from Next.js parsing.
pub fn is_trpc_adapter_file(file: &SourceFile) -> bool {
    let root = file.root_node();
    let mut cursor = root.walk();
    for stmt in root.named_children(&mut cursor) {
        if stmt.kind() != "import_statement" {
            continue;
        }
        if let Some(source) = stmt
            .child_by_field_name("source")
            .and_then(|n| ast::string_literal_value(&file.source, n))
        {
            if source.contains(TRPC_ADAPTER_SOURCE) {
                return true;
            }
        }
        if ast::any_descendant(stmt, &|n| {
            n.kind() == "import_specifier"
                && n.child_by_field_name("name")
                    .map(|name| TRPC_ADAPTER_SYMBOLS.contains(&file.text(name)))
                    .unwrap_or(false)
        }) {
            return true;
        }
    }
    // A bare reference (no import in sight) still marks an adapter.
    ast::any_descendant(root, &|n| {
        n.kind() == "call_expression"
            && n.child_by_field_name("function")
                .map(|callee| {
                    callee.kind() == "identifier"
                        && TRPC_ADAPTER_SYMBOLS.contains(&file.text(callee))
                })
                .unwrap_or(false)
    })
}

/// The HTTP method named by a string literal or substitution-free template
/// string, if the value is a recognized verb.
pub fn method_literal(file: &SourceFile, node: Node) -> Option<HttpMethod> {
    let value = ast::string_literal_value(&file.source, node)?;
    HttpMethod::from_token(&value)
}

/// Names exported by an `export { a, b as c }` clause.
pub fn exported_clause_names<'f>(
    file: &'f SourceFile,
    export_stmt: Node<'f>,
) -> impl Iterator<Item = &'f str> {
    let mut names = Vec::new();
    let mut cursor = export_stmt.walk();
    for child in export_stmt.named_children(&mut cursor) {
        if child.kind() != "export_clause" {
            continue;
        }
        let mut inner = child.walk();
        for spec in child.named_children(&mut inner) {
            if spec.kind() != "export_specifier" {
                continue;
            }
            let exported = spec
                .child_by_field_name("alias")
                .or_else(|| spec.child_by_field_name("name"));
            if let Some(node) = exported {
                names.push(file.text(node));
            }
        }
    }
    names.into_iter()
}
