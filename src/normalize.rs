//! Projection of internal handler records onto the public [`Route`] shape.

use crate::patterns;
use crate::types::{HttpMethod, NextHandlerRecord, Route, RouteKind, TrpcProcedure};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

/// Normalize a Next.js handler record.
pub fn next_route(record: &NextHandlerRecord, kind: RouteKind, root: &Path) -> Route {
    let path = patterns::normalize_route_path(&record.route_path);
    let method = record.method;
    let body = if method.carries_body() {
        record.body_example.clone()
    } else {
        None
    };
    Route {
        name: format!("{} {}", method.as_str(), path),
        method,
        path,
        file_path: absolutize(root, &record.file),
        kind,
        headers: non_empty(record.headers.clone()),
        query: non_empty(record.query_params.clone()),
        body,
    }
}

/// Emit a tRPC procedure as a route.
///
/// Queries map to GET with the body example projected onto query
/// parameters; mutations map to POST with the body emitted verbatim. The
/// JSON content type is always present.
pub fn trpc_route(procedure: &TrpcProcedure, root: &Path) -> Route {
    let raw_path = if procedure.router.is_empty() {
        format!("/api/trpc/{}", procedure.procedure)
    } else {
        format!("/api/trpc/{}.{}", procedure.router, procedure.procedure)
    };
    let path = patterns::normalize_route_path(&raw_path);
    let method = procedure.method.http_method();

    let mut headers = procedure.headers.clone();
    headers
        .entry("Content-Type".to_string())
        .or_insert_with(|| Value::String("application/json".to_string()));

    let (query, body) = match method {
        HttpMethod::Get => (
            procedure
                .body_example
                .as_deref()
                .and_then(project_onto_query),
            None,
        ),
        _ => (None, procedure.body_example.clone()),
    };

    Route {
        name: format!("{} {}", method.as_str(), path),
        method,
        path,
        file_path: absolutize(root, &procedure.file),
        kind: RouteKind::Trpc,
        headers: Some(headers),
        query,
        body,
    }
}

/// Top-level primitive keys of a body example become string-valued query
/// entries; object- and array-valued keys are dropped.
fn project_onto_query(body: &str) -> Option<Map<String, Value>> {
    let Ok(Value::Object(example)) = serde_json::from_str::<Value>(body) else {
        return None;
    };
    let mut query = Map::new();
    for (key, value) in example {
        let projected = match value {
            Value::String(s) => s,
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            _ => continue,
        };
        query.insert(key, Value::String(projected));
    }
    if query.is_empty() {
        None
    } else {
        Some(query)
    }
}

fn non_empty(map: Map<String, Value>) -> Option<Map<String, Value>> {
    if map.is_empty() {
        None
    } else {
        Some(map)
    }
}

fn absolutize(root: &Path, file: &Path) -> PathBuf {
    if file.is_absolute() {
        file.to_path_buf()
    } else {
        root.join(file)
    }
}
