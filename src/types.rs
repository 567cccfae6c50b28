//! Core types for the route catalogue.
//!
//! The public output of every parser is a list of [`Route`] records. The
//! internal records ([`NextHandlerRecord`], [`TrpcProcedure`],
//! [`TrpcRouterMeta`], [`RouterMountEdge`]) are what the parsers accumulate
//! before the normalizer projects them onto the shared `Route` shape.

use regex::Regex;
use serde::Serialize;
use serde_json::{Map, Value};
use std::path::PathBuf;

/// HTTP methods recognized by the extractor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
            Self::Head => "HEAD",
            Self::Options => "OPTIONS",
        }
    }

    /// Parse an upper-cased (or mixed-case) method token.
    pub fn from_token(token: &str) -> Option<Self> {
        match token.to_ascii_uppercase().as_str() {
            "GET" => Some(Self::Get),
            "POST" => Some(Self::Post),
            "PUT" => Some(Self::Put),
            "PATCH" => Some(Self::Patch),
            "DELETE" => Some(Self::Delete),
            "HEAD" => Some(Self::Head),
            "OPTIONS" => Some(Self::Options),
            _ => None,
        }
    }

    /// Parse an exported handler name. Verb exports are upper-case by
    /// convention; `get` is an ordinary function, not a handler.
    pub fn from_export_name(name: &str) -> Option<Self> {
        if name.chars().all(|c| c.is_ascii_uppercase()) {
            Self::from_token(name)
        } else {
            None
        }
    }

    /// Whether requests with this method conventionally carry a body.
    pub fn carries_body(&self) -> bool {
        matches!(self, Self::Post | Self::Put | Self::Patch)
    }
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Origin of a route record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RouteKind {
    #[serde(rename = "nextjs-app")]
    NextJsApp,
    #[serde(rename = "nextjs-page")]
    NextJsPage,
    #[serde(rename = "trpc")]
    Trpc,
}

impl RouteKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NextJsApp => "nextjs-app",
            Self::NextJsPage => "nextjs-page",
            Self::Trpc => "trpc",
        }
    }
}

/// A normalized, JSON-serializable route record.
///
/// Invariants: `path` starts with `/`, contains every dynamic segment
/// declared in the source in colon form, and `body` is absent for methods
/// that conventionally carry none.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Route {
    /// Display string, `"METHOD path"`.
    pub name: String,
    pub method: HttpMethod,
    pub path: String,
    /// Absolute path of the originating source file.
    pub file_path: PathBuf,
    #[serde(rename = "type")]
    pub kind: RouteKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub headers: Option<Map<String, Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<Map<String, Value>>,
    /// Example request body, serialized as a JSON document.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

/// A dynamic path segment declared in a bracketed directory name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DynamicSegment {
    pub name: String,
    pub is_catch_all: bool,
    pub is_optional: bool,
}

/// Internal handler record shared by both Next.js parsers.
///
/// Consumed only by the normalizer; the diagnostic fields (`uses_db`,
/// `has_error_handling`, `has_validation`, `handler_lines`) never appear in
/// the emitted [`Route`].
#[derive(Debug, Clone)]
pub struct NextHandlerRecord {
    pub route_path: String,
    pub method: HttpMethod,
    pub file: PathBuf,
    pub line: usize,
    pub dynamic_segments: Vec<DynamicSegment>,
    pub is_dynamic: bool,
    pub has_middleware: bool,
    pub is_server_action: bool,
    pub handler_lines: usize,
    pub uses_db: bool,
    pub has_error_handling: bool,
    pub has_validation: bool,
    pub headers: Map<String, Value>,
    pub query_params: Map<String, Value>,
    pub body_example: Option<String>,
}

/// tRPC procedure flavor; queries map to GET, mutations to POST.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcedureMethod {
    Query,
    Mutation,
}

impl ProcedureMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Query => "query",
            Self::Mutation => "mutation",
        }
    }

    pub fn http_method(&self) -> HttpMethod {
        match self {
            Self::Query => HttpMethod::Get,
            Self::Mutation => HttpMethod::Post,
        }
    }
}

/// Visibility tag derived from the procedure builder's base identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcedureVisibility {
    Public,
    Private,
    Protected,
    Admin,
    Unknown,
}

impl ProcedureVisibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Private => "private",
            Self::Protected => "protected",
            Self::Admin => "admin",
            Self::Unknown => "unknown",
        }
    }

    /// Map a builder base identifier (`publicProcedure`, ...) to a tag.
    pub fn from_identifier(name: &str) -> Self {
        match name {
            "publicProcedure" => Self::Public,
            "privateProcedure" => Self::Private,
            "protectedProcedure" => Self::Protected,
            "adminProcedure" => Self::Admin,
            _ => Self::Unknown,
        }
    }
}

/// A single tRPC procedure discovered inside a router literal.
///
/// `router` initially holds the declared router identifier; the composition
/// resolver rewrites it to the fully-qualified dotted path.
#[derive(Debug, Clone)]
pub struct TrpcProcedure {
    pub router: String,
    pub procedure: String,
    pub method: ProcedureMethod,
    pub visibility: ProcedureVisibility,
    pub file: PathBuf,
    pub line: usize,
    pub has_input: bool,
    pub has_output: bool,
    pub body_example: Option<String>,
    pub headers: Map<String, Value>,
    pub resolver_lines: usize,
}

/// Per-router metadata. `name` follows the same rewrite rule as
/// [`TrpcProcedure::router`]; a root router keeps its presentational name.
#[derive(Debug, Clone)]
pub struct TrpcRouterMeta {
    pub name: String,
    pub file: PathBuf,
    pub line: usize,
    pub lines_of_code: usize,
}

/// A named reference from a parent router to a mounted child.
#[derive(Debug, Clone)]
pub struct RouterMountEdge {
    /// Identifier of the enclosing router.
    pub parent: String,
    /// Property key the child was mounted under.
    pub property: String,
    /// Identifier expression the child was referenced by.
    pub target: String,
}

/// Aggregate result of a tRPC parse.
#[derive(Debug, Clone, Default)]
pub struct TrpcParseResult {
    pub routes: Vec<Route>,
    pub procedures: Vec<TrpcProcedure>,
    pub routers: Vec<TrpcRouterMeta>,
}

/// Options bag shared by all parsers. Users never subclass; unset fields
/// fall back to per-parser defaults.
#[derive(Debug, Clone, Default)]
pub struct ParserOptions {
    /// Compiler-config path; defaults to `<root>/tsconfig.json`.
    pub tsconfig_path: Option<PathBuf>,
    /// Replacement for the default file-pattern set.
    pub include: Option<Vec<String>>,
    /// Enable the debug log sink (the binary maps this to an env filter).
    pub verbose: bool,
    /// Additional tRPC router-factory identifiers.
    pub router_factories: Option<Vec<String>>,
    /// Regex matching identifiers that denote router references.
    pub router_identifier_pattern: Option<Regex>,
}
