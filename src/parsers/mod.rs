//! Route parsers.
//!
//! Each parser implements one abstract step, [`RouteParser::parse_routes`];
//! the shared template [`parse_with`] handles the common lifecycle: find
//! the compiler config, load the project, run the parser, log the summary.

pub mod next_app;
pub mod next_pages;
pub mod trpc;

use crate::ast;
use crate::project::{Project, SourceFile};
use crate::schema;
use crate::types::{ParserOptions, Route};
use anyhow::Result;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::Path;
use tracing::info;
use tree_sitter::Node;

pub use next_app::AppRouterParser;
pub use next_pages::PagesRouterParser;
pub use trpc::TrpcParser;

/// A route parser with a single abstract step.
pub trait RouteParser {
    /// Display name used in log lines (`nextjs-app`, `nextjs-page`, `trpc`).
    fn name(&self) -> &'static str;

    /// File-pattern set used when the options bag supplies none.
    fn default_patterns(&self) -> &'static [&'static str];

    fn options(&self) -> &ParserOptions;

    /// Extract routes from a loaded project.
    fn parse_routes(&mut self, project: &Project) -> Vec<Route>;
}

/// Shared parse lifecycle. All parsers present this uniform async entry.
pub async fn parse_with<P: RouteParser>(parser: &mut P, root: &Path) -> Result<Vec<Route>> {
    info!("Parsing {} routes with AST", parser.name());
    let options = parser.options().clone();
    let patterns: Vec<String> = options.include.clone().unwrap_or_else(|| {
        parser
            .default_patterns()
            .iter()
            .map(|s| s.to_string())
            .collect()
    });
    let project = Project::load(root, &patterns, &options).await?;
    let routes = parser.parse_routes(&project);
    info!("Parsed {} {} routes", routes.len(), parser.name());
    Ok(routes)
}

/// Infer an example body from the first `<schema>.parse(..)` or
/// `<schema>.safeParse(..)` call inside a handler whose receiver resolves
/// to an interpretable schema expression.
pub(crate) fn infer_body(
    file: &SourceFile,
    handler: Node,
    decls: &HashMap<String, Node>,
) -> Option<String> {
    let mut body = None;
    ast::for_each_descendant(handler, &mut |node| {
        if body.is_some() || node.kind() != "call_expression" {
            return;
        }
        let Some(callee) = node.child_by_field_name("function") else {
            return;
        };
        if callee.kind() != "member_expression" {
            return;
        }
        let Some(property) = callee.child_by_field_name("property") else {
            return;
        };
        if !matches!(file.text(property), "parse" | "safeParse") {
            return;
        }
        let Some(receiver) = callee.child_by_field_name("object") else {
            return;
        };
        body = schema::body_from_schema(file, receiver, decls);
    });
    body
}

/// True when the handler contains a validation call (`.parse`/`.safeParse`).
pub(crate) fn has_validation(file: &SourceFile, handler: Node) -> bool {
    ast::any_descendant(handler, &|node| {
        node.kind() == "call_expression"
            && node
                .child_by_field_name("function")
                .filter(|c| c.kind() == "member_expression")
                .and_then(|c| c.child_by_field_name("property"))
                .map(|p| matches!(file.text(p), "parse" | "safeParse"))
                .unwrap_or(false)
    })
}

/// True when the handler contains a `try` statement.
pub(crate) fn has_error_handling(handler: Node) -> bool {
    ast::any_descendant(handler, &|node| node.kind() == "try_statement")
}

/// Heuristic data-access marker.
pub(crate) fn uses_db(file: &SourceFile, handler: Node) -> bool {
    let text = file.text(handler);
    text.contains("db.") || text.contains("prisma.")
}

/// Query parameters read through `<x>.searchParams.get("key")` calls
/// (app-router style). Each discovered key maps to the example `"string"`.
pub(crate) fn search_param_keys(file: &SourceFile, handler: Node) -> Map<String, Value> {
    let mut params = Map::new();
    ast::for_each_descendant(handler, &mut |node| {
        if node.kind() != "call_expression" {
            return;
        }
        let Some(callee) = node.child_by_field_name("function") else {
            return;
        };
        if callee.kind() != "member_expression" {
            return;
        }
        let Some(property) = callee.child_by_field_name("property") else {
            return;
        };
        if file.text(property) != "get" {
            return;
        }
        let Some(object) = callee.child_by_field_name("object") else {
            return;
        };
        let is_search_params = match object.kind() {
            "identifier" => file.text(object) == "searchParams",
            "member_expression" => object
                .child_by_field_name("property")
                .map(|p| file.text(p) == "searchParams")
                .unwrap_or(false),
            _ => false,
        };
        if !is_search_params {
            return;
        }
        if let Some(key) = ast::first_argument(node)
            .and_then(|arg| ast::string_literal_value(&file.source, arg))
        {
            params.entry(key).or_insert_with(|| Value::String("string".into()));
        }
    });
    params
}

/// Headers recorded on a handler record: `Content-Type: application/json`
/// when a body example exists, empty otherwise.
pub(crate) fn headers_for_body(body: &Option<String>) -> Map<String, Value> {
    let mut headers = Map::new();
    if body.is_some() {
        headers.insert(
            "Content-Type".to_string(),
            Value::String("application/json".to_string()),
        );
    }
    headers
}
