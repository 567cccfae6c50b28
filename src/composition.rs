//! Router-composition resolution.
//!
//! Routers are nodes, mounts are directed parent-to-child edges labelled by
//! the mount property. Each router's fully-qualified dotted path is
//! computed by a depth-first walk from its root ancestor; an in-progress
//! set tolerates cycles, and orphan roots resolve to the empty path.

use crate::types::{RouterMountEdge, TrpcProcedure, TrpcRouterMeta};
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Strip a trailing `Router` and lowercase the first letter.
pub fn normalize_router_name(name: &str) -> String {
    let base = name.strip_suffix("Router").unwrap_or(name);
    let mut chars = base.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

/// Rewrite every procedure's `router` field and every router meta's `name`
/// to the resolved dotted path. Root routers keep a presentational name.
pub fn resolve_composition(
    procedures: &mut [TrpcProcedure],
    routers: &mut [TrpcRouterMeta],
    edges: &[RouterMountEdge],
) {
    let known: HashSet<String> = routers.iter().map(|r| r.name.clone()).collect();
    let resolver = PathResolver::new(known, edges);

    for procedure in procedures.iter_mut() {
        procedure.router = resolver.resolve(&procedure.router);
    }
    for meta in routers.iter_mut() {
        let resolved = resolver.resolve(&meta.name);
        if resolved.is_empty() {
            meta.name = presentational_name(meta);
        } else {
            meta.name = resolved;
        }
    }
}

/// Display name for a root router: the normalized identifier, falling back
/// to the file stem, the containing directory, then the raw identifier.
fn presentational_name(meta: &TrpcRouterMeta) -> String {
    let normalized = normalize_router_name(&meta.name);
    if !normalized.is_empty() {
        return normalized;
    }
    if let Some(stem) = meta.file.file_stem().and_then(|s| s.to_str()) {
        let normalized = normalize_router_name(stem);
        if !normalized.is_empty() {
            return normalized;
        }
    }
    if let Some(dir) = meta
        .file
        .parent()
        .and_then(|p| p.file_name())
        .and_then(|s| s.to_str())
    {
        let normalized = normalize_router_name(dir);
        if !normalized.is_empty() {
            return normalized;
        }
    }
    meta.name.clone()
}

/// Dotted-path resolver over the mount-edge graph.
pub struct PathResolver {
    incoming: HashMap<String, Vec<RouterMountEdge>>,
    known: HashSet<String>,
}

impl PathResolver {
    pub fn new(known: HashSet<String>, edges: &[RouterMountEdge]) -> Self {
        let mut incoming: HashMap<String, Vec<RouterMountEdge>> = HashMap::new();
        for edge in edges {
            incoming
                .entry(edge.target.clone())
                .or_default()
                .push(edge.clone());
            let normalized = normalize_router_name(&edge.target);
            if !normalized.is_empty() && normalized != edge.target {
                incoming.entry(normalized).or_default().push(edge.clone());
            }
        }
        Self { incoming, known }
    }

    /// Fully-qualified dotted path of a router; empty for a root.
    pub fn resolve(&self, name: &str) -> String {
        let mut in_progress = HashSet::new();
        self.resolve_inner(name, &mut in_progress)
    }

    fn resolve_inner(&self, name: &str, in_progress: &mut HashSet<String>) -> String {
        if !in_progress.insert(name.to_string()) {
            debug!("cycle in router composition at {name}");
            return name.to_string();
        }
        let result = match self.first_incoming(name) {
            None => {
                if self.known.contains(name) {
                    String::new()
                } else {
                    name.to_string()
                }
            }
            Some(edge) => {
                let parent_path = self.resolve_inner(&edge.parent, in_progress);
                if parent_path.is_empty() {
                    edge.property.clone()
                } else {
                    format!("{parent_path}.{}", edge.property)
                }
            }
        };
        in_progress.remove(name);
        result
    }

    /// First incoming edge in source-scan order, trying the declared name
    /// and then its normalized form.
    fn first_incoming(&self, name: &str) -> Option<&RouterMountEdge> {
        if let Some(edges) = self.incoming.get(name) {
            return edges.first();
        }
        let normalized = normalize_router_name(name);
        if normalized != name {
            return self.incoming.get(&normalized).and_then(|v| v.first());
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn edge(parent: &str, property: &str, target: &str) -> RouterMountEdge {
        RouterMountEdge {
            parent: parent.to_string(),
            property: property.to_string(),
            target: target.to_string(),
        }
    }

    fn known(names: &[&str]) -> HashSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn root_resolves_to_empty_path() {
        let resolver = PathResolver::new(known(&["appRouter"]), &[]);
        assert_eq!(resolver.resolve("appRouter"), "");
    }

    #[test]
    fn child_resolves_through_root() {
        let edges = vec![edge("appRouter", "user", "userRouter")];
        let resolver = PathResolver::new(known(&["appRouter", "userRouter"]), &edges);
        assert_eq!(resolver.resolve("userRouter"), "user");
    }

    #[test]
    fn nested_mounts_produce_dotted_paths() {
        let edges = vec![
            edge("appRouter", "user", "userRouter"),
            edge("userRouter", "settings", "settingsRouter"),
        ];
        let resolver = PathResolver::new(
            known(&["appRouter", "userRouter", "settingsRouter"]),
            &edges,
        );
        assert_eq!(resolver.resolve("settingsRouter"), "user.settings");
    }

    #[test]
    fn cycle_breaks_to_current_name() {
        let edges = vec![
            edge("aRouter", "b", "bRouter"),
            edge("bRouter", "a", "aRouter"),
        ];
        let resolver = PathResolver::new(known(&["aRouter", "bRouter"]), &edges);
        // Resolution terminates; the revisited entry node contributes its
        // own name as the prefix instead of recursing forever.
        assert_eq!(resolver.resolve("bRouter"), "bRouter.a.b");
        assert_eq!(resolver.resolve("aRouter"), "aRouter.b.a");
    }

    #[test]
    fn multiple_parents_use_first_edge() {
        let edges = vec![
            edge("appRouter", "user", "userRouter"),
            edge("adminRouter", "users", "userRouter"),
        ];
        let resolver = PathResolver::new(
            known(&["appRouter", "adminRouter", "userRouter"]),
            &edges,
        );
        assert_eq!(resolver.resolve("userRouter"), "user");
    }

    #[test]
    fn normalization_strips_router_suffix() {
        assert_eq!(normalize_router_name("userRouter"), "user");
        assert_eq!(normalize_router_name("UserRouter"), "user");
        assert_eq!(normalize_router_name("search"), "search");
        assert_eq!(normalize_router_name("Router"), "");
    }

    #[test]
    fn meta_rewrite_keeps_presentational_name_for_roots() {
        let mut procedures = Vec::new();
        let mut routers = vec![TrpcRouterMeta {
            name: "appRouter".to_string(),
            file: PathBuf::from("/w/server/routers.ts"),
            line: 1,
            lines_of_code: 3,
        }];
        resolve_composition(&mut procedures, &mut routers, &[]);
        assert_eq!(routers[0].name, "app");
    }
}
