//! Input-schema interpretation.
//!
//! Walks a validator-schema expression (the fluent object/leaf builder
//! style) and synthesizes an example value tree. Unrecognized constructs
//! yield `None` for that sub-tree and the parent omits the key; nothing is
//! ever fabricated. Every emitted example serializes as valid JSON, with
//! object key order preserved.

use crate::ast;
use crate::project::SourceFile;
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use tree_sitter::Node;

/// Bound on recursion through declarations and nested builders. Mutually
/// referential declarations would otherwise loop.
const MAX_DEPTH: usize = 32;

/// Interpret a schema expression into an example body, serialized as a
/// compact JSON document.
pub fn body_from_schema(
    file: &SourceFile,
    schema: Node,
    decls: &HashMap<String, Node>,
) -> Option<String> {
    let value = example_from_schema(file, schema, decls)?;
    serde_json::to_string(&value).ok()
}

/// Interpret a schema expression into an example value tree.
pub fn example_from_schema(
    file: &SourceFile,
    schema: Node,
    decls: &HashMap<String, Node>,
) -> Option<Value> {
    walk(file, schema, decls, 0)
}

fn walk(file: &SourceFile, node: Node, decls: &HashMap<String, Node>, depth: usize) -> Option<Value> {
    if depth > MAX_DEPTH {
        return None;
    }
    let node = ast::unwrap_expression(node);
    match node.kind() {
        // A named schema: resolve the identifier to its in-file declaration.
        "identifier" => {
            let decl = decls.get(file.text(node))?;
            walk(file, *decl, decls, depth + 1)
        }
        "call_expression" => walk_call(file, node, decls, depth),
        _ => None,
    }
}

fn walk_call(
    file: &SourceFile,
    call: Node,
    decls: &HashMap<String, Node>,
    depth: usize,
) -> Option<Value> {
    let callee = ast::unwrap_expression(call.child_by_field_name("function")?);
    if callee.kind() != "member_expression" {
        return None;
    }
    let property = callee.child_by_field_name("property")?;
    let receiver = callee.child_by_field_name("object")?;

    match file.text(property) {
        // Modifier links: the example value is the wrapped schema's value.
        "optional" | "nullable" | "describe" => walk(file, receiver, decls, depth + 1),
        // `.default(v)` emits `v` verbatim, literals only.
        "default" => literal_value(file, ast::first_argument(call)?, 0),
        "object" => {
            let arg = ast::unwrap_expression(ast::first_argument(call)?);
            if arg.kind() != "object" {
                return None;
            }
            let mut map = Map::new();
            let mut cursor = arg.walk();
            for prop in arg.named_children(&mut cursor) {
                if prop.kind() != "pair" {
                    continue;
                }
                let Some(name) = prop
                    .child_by_field_name("key")
                    .and_then(|key| ast::property_key_name(&file.source, key))
                else {
                    continue;
                };
                let Some(value) = prop.child_by_field_name("value") else {
                    continue;
                };
                // Unknown sub-tree: omit the key, never substitute.
                if let Some(example) = walk(file, value, decls, depth + 1) {
                    map.insert(name, example);
                }
            }
            Some(Value::Object(map))
        }
        "string" => Some(json!("string")),
        "number" => Some(json!(0)),
        "boolean" => Some(json!(false)),
        "array" => {
            let inner = walk(file, ast::first_argument(call)?, decls, depth + 1)?;
            Some(Value::Array(vec![inner]))
        }
        "enum" => {
            let arg = ast::unwrap_expression(ast::first_argument(call)?);
            if arg.kind() != "array" {
                return None;
            }
            let mut cursor = arg.walk();
            let first = arg
                .named_children(&mut cursor)
                .find(|n| n.kind() != "comment")?;
            literal_value(file, first, 0)
        }
        "literal" => literal_value(file, ast::first_argument(call)?, 0),
        _ => None,
    }
}

/// Convert a literal expression to a JSON value. Anything non-literal
/// (calls, references, spreads) yields `None`.
fn literal_value(file: &SourceFile, node: Node, depth: usize) -> Option<Value> {
    if depth > MAX_DEPTH {
        return None;
    }
    let node = ast::unwrap_expression(node);
    match node.kind() {
        "string" | "template_string" => {
            ast::string_literal_value(&file.source, node).map(Value::String)
        }
        "number" => number_value(file.text(node)),
        "true" => Some(Value::Bool(true)),
        "false" => Some(Value::Bool(false)),
        "null" => Some(Value::Null),
        "unary_expression" => {
            let text = file.text(node);
            if text.starts_with('-') {
                number_value(text)
            } else {
                None
            }
        }
        "array" => {
            let mut items = Vec::new();
            let mut cursor = node.walk();
            for child in node.named_children(&mut cursor) {
                if child.kind() == "comment" {
                    continue;
                }
                items.push(literal_value(file, child, depth + 1)?);
            }
            Some(Value::Array(items))
        }
        "object" => {
            let mut map = Map::new();
            let mut cursor = node.walk();
            for prop in node.named_children(&mut cursor) {
                if prop.kind() == "comment" {
                    continue;
                }
                if prop.kind() != "pair" {
                    return None;
                }
                let key = prop.child_by_field_name("key")?;
                let name = ast::property_key_name(&file.source, key)?;
                let value = literal_value(file, prop.child_by_field_name("value")?, depth + 1)?;
                map.insert(name, value);
            }
            Some(Value::Object(map))
        }
        _ => None,
    }
}

fn number_value(text: &str) -> Option<Value> {
    let text = text.trim();
    if let Ok(int) = text.parse::<i64>() {
        return Some(json!(int));
    }
    text.parse::<f64>().ok().map(|f| json!(f))
}
