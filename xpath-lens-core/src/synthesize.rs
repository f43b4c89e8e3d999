//! XPath synthesis
//!
//! Produces one canonical XPath string for an element node, independent of
//! the source text: an id shortcut when possible, otherwise a relative path
//! from the nearest id-carrying ancestor, otherwise an absolute path with
//! sibling-position predicates. Pure function of tree structure; the same
//! node shape always yields the same path.

use xot::{Node, Value, Xot};

use crate::node;

/// Synthesize an XPath expression identifying `node`.
///
/// Text and attribute nodes resolve to the path of their owning element.
/// Returns `None` for the document node and other non-element input.
pub fn xpath_for(xot: &Xot, node: Node) -> Option<String> {
    let element = match xot.value(node) {
        Value::Element(_) => node,
        Value::Text(_) | Value::Attribute(_) => node::parent_element(xot, node)?,
        _ => return None,
    };

    // The id shortcut is the most specific form and always wins
    if let Some(id) = node::attribute_value(xot, element, "id") {
        return Some(id_expression(&id));
    }

    // Walk up looking for the nearest id-carrying ancestor; collect the
    // steps from the element back up as we go
    let mut steps = vec![step_for(xot, element)];
    let mut current = element;
    while let Some(parent) = node::parent_element(xot, current) {
        if let Some(id) = node::attribute_value(xot, parent, "id") {
            steps.reverse();
            return Some(format!("{}/{}", id_expression(&id), steps.join("/")));
        }
        steps.push(step_for(xot, parent));
        current = parent;
    }

    // No id anywhere: absolute path from the document root
    steps.reverse();
    Some(format!("/{}", steps.join("/")))
}

/// One path step: the plain tag name when unique among same-tag siblings,
/// else `tag[k]` with a 1-based position counted among same-tag siblings
/// in document order.
fn step_for(xot: &Xot, element: Node) -> String {
    let name = node::element_name(xot, element).unwrap_or_default();
    match sibling_position(xot, element, &name) {
        Some(position) => format!("{}[{}]", name, position),
        None => name,
    }
}

/// 1-based position among same-tag siblings, or `None` when the element is
/// the only child of its parent with that tag name.
fn sibling_position(xot: &Xot, element: Node, name: &str) -> Option<usize> {
    let parent = xot.parent(element)?;
    let same_tag: Vec<Node> = node::element_children(xot, parent)
        .into_iter()
        .filter(|sibling| {
            node::element_name(xot, *sibling)
                .map(|n| n == name)
                .unwrap_or(false)
        })
        .collect();
    if same_tag.len() <= 1 {
        return None;
    }
    same_tag.iter().position(|s| *s == element).map(|i| i + 1)
}

/// `//*[@id="…"]`, switching quote style when the id itself contains quotes
fn id_expression(id: &str) -> String {
    if id.contains('"') {
        format!("//*[@id='{}']", id)
    } else {
        format!(r#"//*[@id="{}"]"#, id)
    }
}
