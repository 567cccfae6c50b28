//! tRPC router parser.
//!
//! Discovers router-factory calls, walks their object-literal arguments
//! into procedures and mount edges, and resolves fully-qualified dotted
//! router paths through the composition resolver.

use super::RouteParser;
use crate::ast;
use crate::composition;
use crate::normalize;
use crate::project::{Project, SourceFile};
use crate::types::{
    ParserOptions, ProcedureMethod, ProcedureVisibility, Route, RouterMountEdge, TrpcParseResult,
    TrpcProcedure, TrpcRouterMeta,
};
use anyhow::Result;
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use tracing::{debug, info};
use tree_sitter::Node;

const TRPC_PATTERNS: &[&str] = &["**/*.ts", "**/*.tsx"];

/// Factory identifiers recognized out of the box. Both the bare-call form
/// (`router({...})`, `createTRPCRouter({...})`) and the property-access
/// form (`t.router({...})`) are matched against this list.
const DEFAULT_ROUTER_FACTORIES: &[&str] = &["router", "createTRPCRouter"];

pub struct TrpcParser {
    options: ParserOptions,
}

impl TrpcParser {
    pub fn new(options: ParserOptions) -> Self {
        Self { options }
    }

    /// Parse all tRPC routes under `root`, returning the full aggregate
    /// (routes plus per-procedure and per-router records).
    pub async fn parse(&mut self, root: &Path) -> Result<TrpcParseResult> {
        info!("Parsing {} routes with AST", self.name());
        let options = self.options.clone();
        let patterns: Vec<String> = options
            .include
            .clone()
            .unwrap_or_else(|| TRPC_PATTERNS.iter().map(|s| s.to_string()).collect());
        let project = Project::load(root, &patterns, &options).await?;
        let result = self.parse_project(&project);
        info!("Parsed {} {} routes", result.routes.len(), self.name());
        Ok(result)
    }

    /// Extract the aggregate result from a loaded project.
    pub fn parse_project(&self, project: &Project) -> TrpcParseResult {
        let mut collector = Collector::new(&self.options);
        for file in &project.files {
            debug!("Scanning file {}", file.rel_path);
            collector.scan_file(file);
        }
        let Collector {
            mut procedures,
            mut routers,
            edges,
            ..
        } = collector;

        composition::resolve_composition(&mut procedures, &mut routers, &edges);

        let routes = procedures
            .iter()
            .map(|procedure| normalize::trpc_route(procedure, &project.root))
            .collect();
        TrpcParseResult {
            routes,
            procedures,
            routers,
        }
    }
}

impl RouteParser for TrpcParser {
    fn name(&self) -> &'static str {
        "trpc"
    }

    fn default_patterns(&self) -> &'static [&'static str] {
        TRPC_PATTERNS
    }

    fn options(&self) -> &ParserOptions {
        &self.options
    }

    fn parse_routes(&mut self, project: &Project) -> Vec<Route> {
        self.parse_project(project).routes
    }
}

struct Collector {
    factories: Vec<String>,
    identifier_pattern: Option<regex::Regex>,
    procedures: Vec<TrpcProcedure>,
    routers: Vec<TrpcRouterMeta>,
    edges: Vec<RouterMountEdge>,
}

impl Collector {
    fn new(options: &ParserOptions) -> Self {
        let mut factories: Vec<String> = DEFAULT_ROUTER_FACTORIES
            .iter()
            .map(|s| s.to_string())
            .collect();
        if let Some(extra) = &options.router_factories {
            for name in extra {
                if !factories.contains(name) {
                    factories.push(name.clone());
                }
            }
        }
        Self {
            factories,
            identifier_pattern: options.router_identifier_pattern.clone(),
            procedures: Vec::new(),
            routers: Vec::new(),
            edges: Vec::new(),
        }
    }

    fn scan_file(&mut self, file: &SourceFile) {
        let decls = file.declarations();
        let mut calls = Vec::new();
        ast::for_each_descendant(file.root_node(), &mut |node| {
            if node.kind() == "call_expression" && self.is_factory_call(file, node) {
                calls.push(node);
            }
        });

        // Pre-order collection: a parent factory call precedes any inline
        // child, so inline children are consumed before their own turn.
        let mut consumed: HashSet<usize> = HashSet::new();
        for call in calls {
            if consumed.contains(&call.id()) {
                continue;
            }
            let name = enclosing_router_name(file, call)
                .unwrap_or_else(|| fallback_router_name(file));
            self.walk_router(file, &decls, call, name, &mut consumed);
        }
    }

    /// A call site is a router factory when its callee matches a configured
    /// factory name and its first argument is an object literal.
    fn is_factory_call(&self, file: &SourceFile, call: Node) -> bool {
        if call.kind() != "call_expression" {
            return false;
        }
        let Some(callee) = call.child_by_field_name("function") else {
            return false;
        };
        let callee = ast::unwrap_expression(callee);
        let name = match callee.kind() {
            "identifier" => file.text(callee),
            "member_expression" => match callee.child_by_field_name("property") {
                Some(property) => file.text(property),
                None => return false,
            },
            _ => return false,
        };
        if !self.factories.iter().any(|f| f.as_str() == name) {
            return false;
        }
        ast::first_argument(call)
            .map(|arg| ast::unwrap_expression(arg).kind() == "object")
            .unwrap_or(false)
    }

    fn walk_router(
        &mut self,
        file: &SourceFile,
        decls: &HashMap<String, Node>,
        call: Node,
        router_name: String,
        consumed: &mut HashSet<usize>,
    ) {
        consumed.insert(call.id());
        self.routers.push(TrpcRouterMeta {
            name: router_name.clone(),
            file: file.path.clone(),
            line: ast::start_line(call),
            lines_of_code: ast::line_span(call),
        });

        let Some(arg) = ast::first_argument(call) else {
            return;
        };
        let object = ast::unwrap_expression(arg);
        let mut cursor = object.walk();
        for prop in object.named_children(&mut cursor) {
            match prop.kind() {
                "pair" => {
                    let Some(key) = prop
                        .child_by_field_name("key")
                        .and_then(|k| ast::property_key_name(&file.source, k))
                    else {
                        continue;
                    };
                    let Some(value) = prop.child_by_field_name("value") else {
                        continue;
                    };
                    let value = ast::unwrap_expression(value);
                    if value.kind() == "call_expression" && self.is_factory_call(file, value) {
                        // Inline child router, known only by its mount name.
                        self.edges.push(RouterMountEdge {
                            parent: router_name.clone(),
                            property: key.clone(),
                            target: key.clone(),
                        });
                        self.walk_router(file, decls, value, key, consumed);
                    } else if value.kind() == "identifier"
                        && self.is_router_reference(file, decls, file.text(value))
                    {
                        self.edges.push(RouterMountEdge {
                            parent: router_name.clone(),
                            property: key,
                            target: file.text(value).to_string(),
                        });
                    } else if let Some(procedure) =
                        self.analyze_procedure(file, decls, &router_name, &key, value)
                    {
                        debug!(
                            "Found {} procedure {}.{} (line {})",
                            procedure.method.as_str(),
                            router_name,
                            procedure.procedure,
                            procedure.line
                        );
                        self.procedures.push(procedure);
                    } else {
                        debug!("Skipping property {key} on router {router_name}");
                    }
                }
                "shorthand_property_identifier" => {
                    let name = file.text(prop).to_string();
                    if self.is_router_reference(file, decls, &name) {
                        self.edges.push(RouterMountEdge {
                            parent: router_name.clone(),
                            property: name.clone(),
                            target: name,
                        });
                    } else {
                        debug!("Skipping property {name} on router {router_name}");
                    }
                }
                "comment" => {}
                _ => {
                    debug!("Skipping non-pair property on router {router_name}");
                }
            }
        }
    }

    /// An identifier denotes a router when its in-file declaration is a
    /// factory call, or its name matches the configured identifier regex.
    fn is_router_reference(
        &self,
        file: &SourceFile,
        decls: &HashMap<String, Node>,
        name: &str,
    ) -> bool {
        if let Some(decl) = decls.get(name) {
            let decl = ast::unwrap_expression(*decl);
            if self.is_factory_call(file, decl) {
                return true;
            }
        }
        self.identifier_pattern
            .as_ref()
            .map(|pattern| pattern.is_match(name))
            .unwrap_or(false)
    }

    /// Walk a builder chain from its outermost call inward.
    fn analyze_procedure(
        &self,
        file: &SourceFile,
        decls: &HashMap<String, Node>,
        router_name: &str,
        key: &str,
        value: Node,
    ) -> Option<TrpcProcedure> {
        if value.kind() != "call_expression" {
            return None;
        }
        let mut current = value;
        let mut method: Option<ProcedureMethod> = None;
        let mut has_input = false;
        let mut has_output = false;
        let mut schema: Option<Node> = None;
        let mut resolver_lines = 0;

        while current.kind() == "call_expression" {
            let Some(callee) = current.child_by_field_name("function") else {
                break;
            };
            let callee = ast::unwrap_expression(callee);
            if callee.kind() != "member_expression" {
                current = callee;
                break;
            }
            if let Some(property) = callee.child_by_field_name("property") {
                match file.text(property) {
                    "input" => {
                        has_input = true;
                        if schema.is_none() {
                            schema = ast::first_argument(current);
                        }
                    }
                    "output" => has_output = true,
                    "query" | "mutation" => {
                        if method.is_none() {
                            method = Some(if file.text(property) == "query" {
                                ProcedureMethod::Query
                            } else {
                                ProcedureMethod::Mutation
                            });
                        }
                        if let Some(handler) = ast::first_argument(current) {
                            let handler = ast::unwrap_expression(handler);
                            if ast::is_function_like(handler.kind()) {
                                resolver_lines = ast::line_span(handler);
                            }
                        }
                    }
                    _ => {}
                }
            }
            match callee.child_by_field_name("object") {
                Some(object) => current = ast::unwrap_expression(object),
                None => break,
            }
        }

        // No query/mutation link: not a procedure.
        let method = method?;
        let visibility = if current.kind() == "identifier" {
            ProcedureVisibility::from_identifier(file.text(current))
        } else {
            ProcedureVisibility::Unknown
        };
        let body_example =
            schema.and_then(|node| crate::schema::body_from_schema(file, node, decls));

        let mut headers = Map::new();
        headers.insert(
            "Content-Type".to_string(),
            Value::String("application/json".to_string()),
        );

        Some(TrpcProcedure {
            router: router_name.to_string(),
            procedure: key.to_string(),
            method,
            visibility,
            file: file.path.clone(),
            line: ast::start_line(value),
            has_input,
            has_output,
            body_example,
            headers,
            resolver_lines,
        })
    }
}

/// Name of the variable a factory call is bound to, climbing through
/// expression wrappers.
fn enclosing_router_name(file: &SourceFile, call: Node) -> Option<String> {
    let mut node = call;
    while let Some(parent) = node.parent() {
        match parent.kind() {
            "variable_declarator" => {
                let name = parent.child_by_field_name("name")?;
                if name.kind() == "identifier" {
                    return Some(file.text(name).to_string());
                }
                return None;
            }
            "parenthesized_expression" | "as_expression" | "satisfies_expression"
            | "non_null_expression" | "type_assertion" | "await_expression" => {
                node = parent;
            }
            _ => return None,
        }
    }
    None
}

/// Presentational fallback for unbound routers: file stem, then directory
/// basename, each run through the usual name normalization.
fn fallback_router_name(file: &SourceFile) -> String {
    if let Some(stem) = file.path.file_stem().and_then(|s| s.to_str()) {
        let normalized = composition::normalize_router_name(stem);
        if !normalized.is_empty() {
            return normalized;
        }
    }
    if let Some(dir) = file
        .path
        .parent()
        .and_then(|p| p.file_name())
        .and_then(|s| s.to_str())
    {
        let normalized = composition::normalize_router_name(dir);
        if !normalized.is_empty() {
            return normalized;
        }
    }
    "router".to_string()
}
