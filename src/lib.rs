//! Route Atlas
//!
//! Static discovery of HTTP-callable endpoints in a TypeScript project.
//!
//! # Architecture
//!
//! The extractor is a pipeline fed by a [`project::Project`] — the set of
//! parsed source files under a workspace root:
//!
//! 1. **Project loader**: locates the compiler config, enumerates files
//!    matching whitelist globs, parses each with tree-sitter.
//! 2. **Parsers**: three independent strategies over disjoint file sets —
//!    Next.js app router (`app/**/route.{ts,js}`), Next.js pages router
//!    (`pages/api/**`), and tRPC router trees.
//! 3. **Composition resolver**: rewrites tRPC router references to
//!    fully-qualified dotted paths, tolerating cycles and orphan roots.
//! 4. **Normalizer**: projects every parser's internal records onto the
//!    shared [`Route`] shape.
//!
//! The extractor returns nothing when uncertain; a missing route is
//! acceptable, a wrong route is a bug.
//!
//! # Usage
//!
//! ```ignore
//! use route_atlas::{AppRouterParser, ParserOptions};
//!
//! let mut parser = AppRouterParser::new(ParserOptions::default());
//! let routes = parser.parse(workspace_root).await?;
//! println!("{}", serde_json::to_string_pretty(&routes)?);
//! ```

pub mod ast;
pub mod composition;
pub mod normalize;
pub mod parsers;
pub mod patterns;
pub mod project;
pub mod schema;
pub mod types;

// Re-exports
pub use parsers::{AppRouterParser, PagesRouterParser, RouteParser, TrpcParser};
pub use project::{Project, SourceFile};
pub use types::{
    DynamicSegment, HttpMethod, NextHandlerRecord, ParserOptions, ProcedureMethod,
    ProcedureVisibility, Route, RouteKind, RouterMountEdge, TrpcParseResult, TrpcProcedure,
    TrpcRouterMeta,
};
