//! XPath evaluation engine and orchestration

use std::cell::RefCell;
use std::time::Instant;

use xee_xpath::{query::SequenceQuery, Queries, Query};

use super::{EvaluateError, Evaluation, MatchResult};
use crate::locate;
use crate::node;
use crate::parser::{self, ParseMode};
use crate::source_utils::char_offset;

// Thread-local cache for the compiled XPath query.
// Each thread gets its own compiled query to avoid RefCell conflicts;
// repeated evaluations of the same expression skip recompilation.
thread_local! {
    static QUERY_CACHE: RefCell<Option<(String, SequenceQuery)>> = const { RefCell::new(None) };
}

fn execute_cached_query(source: &str, xpath: &str, mode: ParseMode) -> Result<Evaluation, EvaluateError> {
    let started = Instant::now();
    let mut doc = parser::parse_string(source, mode)?;

    QUERY_CACHE.with(|cache| {
        let mut cache = cache.borrow_mut();

        let query = if let Some((cached_xpath, cached_query)) = cache.as_ref() {
            if cached_xpath == xpath {
                cached_query
            } else {
                // Different expression, recompile
                let queries = Queries::default();
                let new_query = queries
                    .sequence(xpath)
                    .map_err(|e| EvaluateError::Compile(e.to_string()))?;
                *cache = Some((xpath.to_string(), new_query));
                &cache.as_ref().unwrap().1
            }
        } else {
            let queries = Queries::default();
            let new_query = queries
                .sequence(xpath)
                .map_err(|e| EvaluateError::Compile(e.to_string()))?;
            *cache = Some((xpath.to_string(), new_query));
            &cache.as_ref().unwrap().1
        };

        let results = query
            .execute(&mut doc.documents, doc.handle)
            .map_err(|e: xee_xpath::error::Error| EvaluateError::Execute(e.to_string()))?;

        let mut matches = Vec::new();
        for item in results.iter() {
            match item {
                xee_xpath::Item::Node(node) => {
                    let xot = doc.documents.xot();
                    let value = node::serialize_value(xot, node);
                    let node_type = node::node_type(xot, node);
                    let node_name = node::node_name(xot, node);

                    let mut m = MatchResult::new(value, node_type, node_name);
                    // Absent offsets are the expected outcome for anything
                    // the locator cannot pin down; never fail the request
                    if let Some(span) = locate::locate(source, xot, node) {
                        m = m.with_offsets(
                            char_offset(source, span.start),
                            char_offset(source, span.end),
                        );
                    }
                    matches.push(m);
                }
                xee_xpath::Item::Atomic(_) => {
                    // Canonical lexical form; plain to_string only covers
                    // xs:string values
                    let value = item
                        .string_value(doc.documents.xot())
                        .map_err(|e| EvaluateError::Execute(e.to_string()))?;
                    matches.push(MatchResult::new(value, node::NodeType::Atomic, None));
                }
                xee_xpath::Item::Function(_) => {}
            }
        }

        let count = matches.len();
        Ok(Evaluation {
            matches,
            count,
            execution_time_ms: started.elapsed().as_secs_f64() * 1000.0,
        })
    })
}

/// XPath evaluation orchestrator.
///
/// Each call parses its own tree; nothing is shared between requests. The
/// compiled query is cached per thread, so repeated evaluations of the same
/// expression against edited documents stay cheap.
#[derive(Debug, Default)]
pub struct XPathEngine;

impl XPathEngine {
    pub fn new() -> Self {
        XPathEngine
    }

    /// Evaluate `xpath` against `source` and return positioned matches in
    /// the evaluator's result order.
    pub fn evaluate(
        &self,
        source: &str,
        xpath: &str,
        mode: ParseMode,
    ) -> Result<Evaluation, EvaluateError> {
        execute_cached_query(source, xpath, mode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::NodeType;

    fn evaluate(source: &str, xpath: &str) -> Result<Evaluation, EvaluateError> {
        XPathEngine::new().evaluate(source, xpath, ParseMode::Xml)
    }

    #[test]
    fn test_positional_match_with_offsets() {
        // //p[2] must return the second <p> with offsets at its source span
        let source = "<div><p>Hello</p><p>World</p></div>";
        let result = evaluate(source, "//p[2]").unwrap();
        assert_eq!(result.count, 1);

        let m = &result.matches[0];
        assert_eq!(m.value, "<p>World</p>");
        assert_eq!(m.node_type, NodeType::Element);
        assert_eq!(m.node_name.as_deref(), Some("p"));
        assert_eq!(m.start_offset, Some(source.find("<p>World").unwrap()));
        assert_eq!(m.end_offset, Some(source.find("</p></div>").unwrap() + 4));
    }

    #[test]
    fn test_all_matches_in_document_order() {
        let source = "<div><p>a</p><p>b</p><p>c</p></div>";
        let result = evaluate(source, "//p").unwrap();
        assert_eq!(result.count, 3);
        let values: Vec<&str> = result.matches.iter().map(|m| m.value.as_str()).collect();
        assert_eq!(values, vec!["<p>a</p>", "<p>b</p>", "<p>c</p>"]);
    }

    #[test]
    fn test_invalid_expression_is_compile_error() {
        // An invalid expression must fail loudly, never return an empty
        // success
        let err = evaluate("<r/>", "//[bad").unwrap_err();
        match err {
            EvaluateError::Compile(message) => assert!(!message.is_empty()),
            other => panic!("expected compile error, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_match_list_is_success() {
        let result = evaluate("<r><a/></r>", "//missing").unwrap();
        assert_eq!(result.count, 0);
        assert!(result.matches.is_empty());
    }

    #[test]
    fn test_text_node_match() {
        let source = "<r><p>Hello</p></r>";
        let result = evaluate(source, "//p/text()").unwrap();
        assert_eq!(result.count, 1);
        let m = &result.matches[0];
        assert_eq!(m.value, "Hello");
        assert_eq!(m.node_type, NodeType::Text);
        assert_eq!(m.start_offset, Some(source.find("Hello").unwrap()));
        assert_eq!(m.end_offset, Some(source.find("Hello").unwrap() + 5));
    }

    #[test]
    fn test_attribute_match() {
        let source = r#"<r><a href="docs.html">x</a></r>"#;
        let result = evaluate(source, "//a/@href").unwrap();
        assert_eq!(result.count, 1);
        let m = &result.matches[0];
        assert_eq!(m.value, r#"href="docs.html""#);
        assert_eq!(m.node_type, NodeType::Attribute);
        assert_eq!(m.node_name.as_deref(), Some("href"));
        assert_eq!(m.start_offset, Some(source.find("href=").unwrap()));
    }

    #[test]
    fn test_atomic_result() {
        let result = evaluate("<r><p/><p/></r>", "count(//p)").unwrap();
        assert_eq!(result.count, 1);
        let m = &result.matches[0];
        assert_eq!(m.node_type, NodeType::Atomic);
        assert_eq!(m.value, "2");
        assert!(!m.is_located());
    }

    #[test]
    fn test_atomic_boolean_canonical_form() {
        let result = evaluate("<r><p/></r>", "count(//p) > 0").unwrap();
        assert_eq!(result.count, 1);
        assert_eq!(result.matches[0].value, "true");
        assert_eq!(result.matches[0].node_type, NodeType::Atomic);
    }

    #[test]
    fn test_html_mode_forgiving_parse() {
        let source = "<ul><li>A<li>B</ul>";
        let result = XPathEngine::new()
            .evaluate(source, "//li", ParseMode::Html)
            .unwrap();
        assert_eq!(result.count, 2);
        // Both list items still map back into the raw, unrepaired source
        assert_eq!(result.matches[0].start_offset, Some(source.find("<li>A").unwrap()));
        assert_eq!(result.matches[1].start_offset, Some(source.find("<li>B").unwrap()));
    }

    #[test]
    fn test_execution_time_recorded() {
        let result = evaluate("<r><a/></r>", "//a").unwrap();
        assert!(result.execution_time_ms >= 0.0);
    }
}
