//! Parser adapter
//!
//! Wraps the external parsing stack (xee-xpath's `Documents`, backed by xot)
//! behind the single contract the rest of the crate relies on: source text in,
//! navigable tree out. XML parses strictly first and falls back to the lenient
//! HTML repair pass, so malformed input still yields a best-effort tree.

pub mod html;

use thiserror::Error;
use xee_xpath::{DocumentHandle, Documents};
use xot::{Node, Xot};

/// How the source text should be parsed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseMode {
    Xml,
    Html,
}

/// Errors that can occur while producing a tree
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("Failed to parse document: {0}")]
    Syntax(String),
    #[error("Failed to read file: {0}")]
    FileRead(#[from] std::io::Error),
}

/// A parsed document: the evaluator's document store, the handle of the one
/// document in it, and the document root node.
///
/// Owns its whole tree; nothing is shared between requests.
pub struct ParsedDocument {
    pub documents: Documents,
    pub handle: DocumentHandle,
    pub root: Node,
    pub mode: ParseMode,
}

impl ParsedDocument {
    /// The xot arena holding the tree
    pub fn xot(&self) -> &Xot {
        self.documents.xot()
    }
}

/// Detect parse mode from a file path extension
pub fn detect_mode(path: &str) -> ParseMode {
    let ext = path.rsplit('.').next().unwrap_or("");
    match ext.to_lowercase().as_str() {
        "html" | "htm" | "xhtml" => ParseMode::Html,
        _ => ParseMode::Xml,
    }
}

/// Parse source text into a document tree.
///
/// HTML mode always runs the repair pass first. XML mode tries the strict
/// parser and only then repairs, so well-formed XML keeps exact semantics.
pub fn parse_string(text: &str, mode: ParseMode) -> Result<ParsedDocument, ParseError> {
    if text.trim().is_empty() {
        return Err(ParseError::Syntax("empty document".to_string()));
    }
    match mode {
        ParseMode::Html => {
            let normalized = html::normalize_html(text);
            load(&normalized, mode)
        }
        ParseMode::Xml => match load(text, mode) {
            Ok(doc) => Ok(doc),
            Err(first) => {
                log::debug!("strict XML parse failed ({}), retrying leniently", first);
                let normalized = html::normalize_html(text);
                load(&normalized, mode).map_err(|_| first)
            }
        },
    }
}

fn load(xml: &str, mode: ParseMode) -> Result<ParsedDocument, ParseError> {
    let mut documents = Documents::new();
    let handle = documents
        .add_string_without_uri(xml)
        .map_err(|e| ParseError::Syntax(e.to_string()))?;
    let root = documents
        .document_node(handle)
        .ok_or_else(|| ParseError::Syntax("document has no root node".to_string()))?;
    Ok(ParsedDocument {
        documents,
        handle,
        root,
        mode,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_mode() {
        assert_eq!(detect_mode("page.html"), ParseMode::Html);
        assert_eq!(detect_mode("page.HTM"), ParseMode::Html);
        assert_eq!(detect_mode("feed.xml"), ParseMode::Xml);
        assert_eq!(detect_mode("noext"), ParseMode::Xml);
    }

    #[test]
    fn test_parse_xml() {
        let doc = parse_string("<root><item>a</item></root>", ParseMode::Xml).unwrap();
        let root_el = doc.xot().document_element(doc.root).unwrap();
        assert_eq!(
            crate::node::element_name(doc.xot(), root_el).as_deref(),
            Some("root")
        );
    }

    #[test]
    fn test_parse_html_soup() {
        let doc = parse_string("<ul><li>A<li>B</ul>", ParseMode::Html).unwrap();
        let xot = doc.xot();
        let root_el = xot.document_element(doc.root).unwrap();
        let lis = crate::node::elements_named(xot, root_el, "li", 10);
        assert_eq!(lis.len(), 2);
    }

    #[test]
    fn test_malformed_xml_falls_back() {
        // Unclosed tag is a strict XML error but repairable
        let doc = parse_string("<root><item>a</root>", ParseMode::Xml).unwrap();
        let xot = doc.xot();
        let root_el = xot.document_element(doc.root).unwrap();
        assert_eq!(crate::node::elements_named(xot, root_el, "item", 10).len(), 1);
    }

    #[test]
    fn test_hopeless_input_errors() {
        let err = parse_string("", ParseMode::Xml).err();
        assert!(matches!(err, Some(ParseError::Syntax(_))));
    }
}
