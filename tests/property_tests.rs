//! Property-based tests for the route extractor.
//!
//! Uses proptest to generate random inputs and verify the universal route
//! invariants hold.

use proptest::prelude::*;
use route_atlas::normalize;
use route_atlas::patterns::{convert_segments, extract_dynamic_segments, normalize_route_path};
use route_atlas::{
    HttpMethod, NextHandlerRecord, ProcedureMethod, ProcedureVisibility, RouteKind, TrpcProcedure,
};
use serde_json::Map;
use std::path::PathBuf;

// ============================================================================
// Strategies for generating test data
// ============================================================================

/// Generate valid path-segment identifiers
fn segment_name() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9]{0,8}"
}

#[derive(Debug, Clone)]
enum Piece {
    Static(String),
    Dynamic(String),
    CatchAll(String),
    OptionalCatchAll(String),
}

impl Piece {
    fn source_form(&self) -> String {
        match self {
            Piece::Static(n) => n.clone(),
            Piece::Dynamic(n) => format!("[{n}]"),
            Piece::CatchAll(n) => format!("[...{n}]"),
            Piece::OptionalCatchAll(n) => format!("[[...{n}]]"),
        }
    }

    fn colon_form(&self) -> Option<String> {
        match self {
            Piece::Static(_) => None,
            Piece::Dynamic(n) => Some(format!(":{n}")),
            Piece::CatchAll(n) => Some(format!(":{n}*")),
            Piece::OptionalCatchAll(n) => Some(format!(":{n}?")),
        }
    }
}

fn piece() -> impl Strategy<Value = Piece> {
    (segment_name(), 0..4u8).prop_map(|(name, kind)| match kind {
        0 => Piece::Static(name),
        1 => Piece::Dynamic(name),
        2 => Piece::CatchAll(name),
        _ => Piece::OptionalCatchAll(name),
    })
}

/// A route path fragment with unique segment names.
fn pieces() -> impl Strategy<Value = Vec<Piece>> {
    prop::collection::vec(piece(), 1..6).prop_map(|pieces| {
        pieces
            .into_iter()
            .enumerate()
            .map(|(i, piece)| match piece {
                Piece::Static(n) => Piece::Static(format!("{n}{i}")),
                Piece::Dynamic(n) => Piece::Dynamic(format!("{n}{i}")),
                Piece::CatchAll(n) => Piece::CatchAll(format!("{n}{i}")),
                Piece::OptionalCatchAll(n) => Piece::OptionalCatchAll(format!("{n}{i}")),
            })
            .collect()
    })
}

fn http_method() -> impl Strategy<Value = HttpMethod> {
    prop_oneof![
        Just(HttpMethod::Get),
        Just(HttpMethod::Post),
        Just(HttpMethod::Put),
        Just(HttpMethod::Patch),
        Just(HttpMethod::Delete),
        Just(HttpMethod::Head),
        Just(HttpMethod::Options),
    ]
}

fn procedure_method() -> impl Strategy<Value = ProcedureMethod> {
    prop_oneof![Just(ProcedureMethod::Query), Just(ProcedureMethod::Mutation)]
}

fn body_example() -> impl Strategy<Value = Option<String>> {
    prop_oneof![
        Just(None),
        Just(Some(r#"{"name":"string"}"#.to_string())),
        Just(Some(
            r#"{"limit":0,"deep":{"a":"string"},"flag":false}"#.to_string()
        )),
        Just(Some(r#"{"only":{"nested":0}}"#.to_string())),
    ]
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    /// Converted paths carry no bracket characters and keep a leading slash.
    #[test]
    fn converted_paths_are_normalized(pieces in pieces()) {
        let source = pieces.iter().map(|p| p.source_form()).collect::<Vec<_>>().join("/");
        let path = normalize_route_path(&convert_segments(&source));

        prop_assert!(path.starts_with('/'));
        prop_assert!(!path.contains("//"));
        prop_assert!(!path.contains('['));
        prop_assert!(!path.contains(']'));
    }

    /// Every dynamic segment appears in colon form in exactly one position.
    #[test]
    fn dynamic_segments_appear_exactly_once(pieces in pieces()) {
        let source = pieces.iter().map(|p| p.source_form()).collect::<Vec<_>>().join("/");
        let path = normalize_route_path(&convert_segments(&source));
        let parts: Vec<&str> = path.split('/').collect();

        for piece in &pieces {
            if let Some(expected) = piece.colon_form() {
                let count = parts.iter().filter(|p| **p == expected).count();
                prop_assert_eq!(count, 1, "{} in {}", expected, path);
            }
        }
    }

    /// Extraction and conversion agree on the set of dynamic segments.
    #[test]
    fn extraction_matches_conversion(pieces in pieces()) {
        let source = pieces.iter().map(|p| p.source_form()).collect::<Vec<_>>().join("/");
        let extracted = extract_dynamic_segments(&source);
        let expected: Vec<String> = pieces
            .iter()
            .filter_map(|p| match p {
                Piece::Static(_) => None,
                Piece::Dynamic(n) | Piece::CatchAll(n) | Piece::OptionalCatchAll(n) => {
                    Some(n.clone())
                }
            })
            .collect();

        let names: Vec<String> = extracted.iter().map(|s| s.name.clone()).collect();
        prop_assert_eq!(names, expected);
    }

    /// Normalization is idempotent and always yields a rooted path.
    #[test]
    fn normalization_is_idempotent(raw in "[a-z/]{0,20}") {
        let once = normalize_route_path(&raw);
        prop_assert!(once.starts_with('/'));
        prop_assert!(!once.contains("//"));
        prop_assert!(once == "/" || !once.ends_with('/'));
        prop_assert_eq!(normalize_route_path(&once), once);
    }

    /// Bodyless methods never carry a body through normalization.
    #[test]
    fn bodyless_methods_lose_their_body(
        method in http_method(),
        body in body_example(),
        pieces in pieces(),
    ) {
        let source = pieces.iter().map(|p| p.source_form()).collect::<Vec<_>>().join("/");
        let record = NextHandlerRecord {
            route_path: convert_segments(&source),
            method,
            file: PathBuf::from("/workspace/app/probe/route.ts"),
            line: 1,
            dynamic_segments: extract_dynamic_segments(&source),
            is_dynamic: false,
            has_middleware: false,
            is_server_action: false,
            handler_lines: 1,
            uses_db: false,
            has_error_handling: false,
            has_validation: false,
            headers: Map::new(),
            query_params: Map::new(),
            body_example: body,
        };
        let route = normalize::next_route(
            &record,
            RouteKind::NextJsApp,
            std::path::Path::new("/workspace"),
        );

        if !method.carries_body() {
            prop_assert!(route.body.is_none());
        }
        prop_assert!(route.path.starts_with('/'));
        prop_assert_eq!(route.name, format!("{} {}", method.as_str(), route.path.clone()));
    }

    /// tRPC emission invariants: the path prefix, the JSON content type,
    /// no body on GET, and string-valued query projections.
    #[test]
    fn trpc_emission_invariants(
        method in procedure_method(),
        body in body_example(),
        router in prop_oneof![Just(String::new()), segment_name()],
        name in segment_name(),
    ) {
        let procedure = TrpcProcedure {
            router,
            procedure: name,
            method,
            visibility: ProcedureVisibility::Public,
            file: PathBuf::from("/workspace/server/router.ts"),
            line: 1,
            has_input: body.is_some(),
            has_output: false,
            body_example: body,
            headers: Map::new(),
            resolver_lines: 1,
        };
        let route = normalize::trpc_route(&procedure, std::path::Path::new("/workspace"));

        prop_assert!(route.path.starts_with("/api/trpc/"));
        let headers = route.headers.expect("headers always present");
        prop_assert_eq!(
            headers.get("Content-Type").and_then(|v| v.as_str()),
            Some("application/json")
        );
        if route.method == HttpMethod::Get {
            prop_assert!(route.body.is_none());
            if let Some(query) = &route.query {
                prop_assert!(!query.is_empty());
                prop_assert!(query.values().all(|v| v.is_string()));
            }
        }
    }
}
