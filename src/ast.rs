//! Shared tree-sitter helpers for walking TypeScript syntax trees.

use tree_sitter::Node;

/// Source text covered by a node.
pub fn text_of<'a>(source: &'a str, node: Node) -> &'a str {
    source.get(node.start_byte()..node.end_byte()).unwrap_or("")
}

/// 1-based start line of a node.
pub fn start_line(node: Node) -> usize {
    node.start_position().row + 1
}

/// Number of source lines a node spans.
pub fn line_span(node: Node) -> usize {
    node.end_position().row - node.start_position().row + 1
}

/// Strip expression wrappers that carry no route-relevant meaning:
/// parentheses, type assertions, `satisfies`, non-null assertions, `await`.
pub fn unwrap_expression(mut node: Node) -> Node {
    loop {
        match node.kind() {
            "parenthesized_expression" => {
                match node
                    .child_by_field_name("expression")
                    .or_else(|| node.named_child(0))
                {
                    Some(inner) => node = inner,
                    None => return node,
                }
            }
            "as_expression" | "satisfies_expression" | "non_null_expression"
            | "type_assertion" | "await_expression" => {
                match node.named_child(0) {
                    Some(inner) => node = inner,
                    None => return node,
                }
            }
            _ => return node,
        }
    }
}

/// Value of a string literal, or of a template string with no substitutions.
pub fn string_literal_value(source: &str, node: Node) -> Option<String> {
    match node.kind() {
        "string" => {
            let mut out = String::new();
            let mut cursor = node.walk();
            for child in node.named_children(&mut cursor) {
                if child.kind() == "string_fragment" {
                    out.push_str(text_of(source, child));
                }
            }
            Some(out)
        }
        "template_string" => {
            let mut out = String::new();
            let mut cursor = node.walk();
            for child in node.named_children(&mut cursor) {
                match child.kind() {
                    "template_substitution" => return None,
                    "string_fragment" => out.push_str(text_of(source, child)),
                    _ => {}
                }
            }
            Some(out)
        }
        _ => None,
    }
}

/// Whether a node kind denotes a function value (arrow or expression form).
/// Both grammar generations are accepted (`function` was renamed to
/// `function_expression`).
pub fn is_function_like(kind: &str) -> bool {
    matches!(
        kind,
        "arrow_function" | "function" | "function_expression" | "generator_function"
    )
}

/// Name of the key node of an object-literal `pair` (identifier or string).
pub fn property_key_name(source: &str, key: Node) -> Option<String> {
    match key.kind() {
        "property_identifier" | "identifier" => Some(text_of(source, key).to_string()),
        "string" => string_literal_value(source, key),
        _ => None,
    }
}

/// First named argument of a call expression, skipping comments.
pub fn first_argument(call: Node) -> Option<Node> {
    let args = call.child_by_field_name("arguments")?;
    let mut cursor = args.walk();
    let result = args
        .named_children(&mut cursor)
        .find(|n| n.kind() != "comment");
    result
}

/// Name of the first parameter of a function-like node, when it is a plain
/// identifier. Handles both `formal_parameters` and the single-parameter
/// arrow form.
pub fn first_parameter_name(source: &str, func: Node) -> Option<String> {
    if let Some(param) = func.child_by_field_name("parameter") {
        if param.kind() == "identifier" {
            return Some(text_of(source, param).to_string());
        }
    }
    let params = func.child_by_field_name("parameters")?;
    let mut cursor = params.walk();
    let first = params
        .named_children(&mut cursor)
        .find(|n| n.kind() != "comment")?;
    match first.kind() {
        "identifier" => Some(text_of(source, first).to_string()),
        "required_parameter" | "optional_parameter" => {
            let pattern = first.child_by_field_name("pattern")?;
            if pattern.kind() == "identifier" {
                Some(text_of(source, pattern).to_string())
            } else {
                None
            }
        }
        _ => None,
    }
}

/// Depth-first search for any descendant (including `node`) matching the
/// predicate.
pub fn any_descendant<F: Fn(Node) -> bool>(node: Node, pred: &F) -> bool {
    if pred(node) {
        return true;
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if any_descendant(child, pred) {
            return true;
        }
    }
    false
}

/// Visit every descendant of `node` (including `node`), pre-order.
pub fn for_each_descendant<'t, F: FnMut(Node<'t>)>(node: Node<'t>, f: &mut F) {
    let mut stack = vec![node];
    while let Some(current) = stack.pop() {
        f(current);
        let mut cursor = current.walk();
        let children: Vec<Node> = current.children(&mut cursor).collect();
        for child in children.into_iter().rev() {
            stack.push(child);
        }
    }
}
