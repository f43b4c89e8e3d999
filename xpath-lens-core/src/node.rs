//! ParsedNode shape helpers over xot
//!
//! The rest of the crate treats a parsed node as `(&Xot, Node)`. These helpers
//! give that pair the surface the locator, synthesizer and click resolver
//! need: node classification, names, attributes and per-type serialization.

use serde::Serialize;
use xot::{Node, Value, Xot};

/// Node classification, mirroring the kinds an XPath evaluation can return
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum NodeType {
    Element,
    Text,
    Attribute,
    Comment,
    ProcessingInstruction,
    Document,
    /// Non-node results (numbers, strings, booleans) from the evaluator
    Atomic,
}

/// Classify an xot node
pub fn node_type(xot: &Xot, node: Node) -> NodeType {
    match xot.value(node) {
        Value::Element(_) => NodeType::Element,
        Value::Text(_) => NodeType::Text,
        Value::Attribute(_) => NodeType::Attribute,
        Value::Comment(_) => NodeType::Comment,
        Value::ProcessingInstruction(_) => NodeType::ProcessingInstruction,
        _ => NodeType::Document,
    }
}

/// Name of an element or attribute node, if it has one
pub fn node_name(xot: &Xot, node: Node) -> Option<String> {
    match xot.value(node) {
        Value::Element(element) => Some(xot.local_name_str(element.name()).to_string()),
        Value::Attribute(attribute) => Some(xot.local_name_str(attribute.name()).to_string()),
        Value::ProcessingInstruction(pi) => Some(xot.local_name_str(pi.target()).to_string()),
        _ => None,
    }
}

/// Element tag name (local part only)
pub fn element_name(xot: &Xot, node: Node) -> Option<String> {
    match xot.value(node) {
        Value::Element(element) => Some(xot.local_name_str(element.name()).to_string()),
        _ => None,
    }
}

/// Ordered (name, value) attribute pairs of an element
pub fn attributes_of(xot: &Xot, node: Node) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    for (name_id, value) in xot.attributes(node).iter() {
        pairs.push((xot.local_name_str(name_id).to_string(), value.clone()));
    }
    pairs
}

/// Value of a named attribute on an element, if present and non-empty
pub fn attribute_value(xot: &Xot, node: Node, name: &str) -> Option<String> {
    for (name_id, value) in xot.attributes(node).iter() {
        if xot.local_name_str(name_id).eq_ignore_ascii_case(name) && !value.is_empty() {
            return Some(value.clone());
        }
    }
    None
}

/// Element children of a node, in document order
pub fn element_children(xot: &Xot, node: Node) -> Vec<Node> {
    xot.children(node)
        .filter(|child| matches!(xot.value(*child), Value::Element(_)))
        .collect()
}

/// Tag names of the leading element children, up to `limit`
pub fn child_element_names(xot: &Xot, node: Node, limit: usize) -> Vec<String> {
    element_children(xot, node)
        .into_iter()
        .take(limit)
        .filter_map(|child| element_name(xot, child))
        .collect()
}

/// Nearest ancestor element of a node (parent for elements, owning element
/// for attributes and text)
pub fn parent_element(xot: &Xot, node: Node) -> Option<Node> {
    let mut current = xot.parent(node)?;
    loop {
        if matches!(xot.value(current), Value::Element(_)) {
            return Some(current);
        }
        current = xot.parent(current)?;
    }
}

/// Concatenated descendant text of a node, trimmed
pub fn trimmed_text(xot: &Xot, node: Node) -> String {
    xot.string_value(node).trim().to_string()
}

/// Serialize a node's value for match output.
///
/// Elements render as outer markup, text nodes as their raw text, attributes
/// as `name="value"`, comments and processing instructions as their content.
pub fn serialize_value(xot: &Xot, node: Node) -> String {
    match xot.value(node) {
        Value::Element(_) => xot.to_string(node).unwrap_or_default(),
        Value::Text(text) => text.get().to_string(),
        Value::Attribute(attribute) => format!(
            r#"{}="{}""#,
            xot.local_name_str(attribute.name()),
            attribute.value()
        ),
        Value::Comment(comment) => comment.get().to_string(),
        Value::ProcessingInstruction(pi) => pi.data().unwrap_or_default().to_string(),
        _ => xot.string_value(node),
    }
}

/// Collect every element in the subtree under `root` whose tag name matches
/// `tag` case-insensitively, in document order, stopping at `cap` + 1 so the
/// caller can detect overflow.
pub fn elements_named(xot: &Xot, root: Node, tag: &str, cap: usize) -> Vec<Node> {
    let mut found = Vec::new();
    collect_named(xot, root, tag, cap, &mut found);
    found
}

fn collect_named(xot: &Xot, node: Node, tag: &str, cap: usize, found: &mut Vec<Node>) {
    if found.len() > cap {
        return;
    }
    if let Some(name) = element_name(xot, node) {
        if name.eq_ignore_ascii_case(tag) {
            found.push(node);
        }
    }
    for child in xot.children(node) {
        collect_named(xot, child, tag, cap, found);
    }
}
