//! Match result types for XPath evaluation

use serde::Serialize;

use crate::node::NodeType;

/// A single match from an XPath evaluation.
///
/// Offsets are character offsets into the original source text and are
/// omitted when the match could not be located; callers simply draw no
/// highlight in that case.
#[derive(Debug, Clone, Serialize)]
pub struct MatchResult {
    /// Serialized node content: outer markup for elements, raw text for text
    /// nodes, `name="value"` for attributes, the value itself for atomics
    pub value: String,
    pub node_type: NodeType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_offset: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_offset: Option<usize>,
}

impl MatchResult {
    /// Create a match with no recovered location
    pub fn new(value: String, node_type: NodeType, node_name: Option<String>) -> Self {
        MatchResult {
            value,
            node_type,
            node_name,
            start_offset: None,
            end_offset: None,
        }
    }

    /// Attach a recovered source span
    pub fn with_offsets(mut self, start: usize, end: usize) -> Self {
        self.start_offset = Some(start);
        self.end_offset = Some(end);
        self
    }

    /// Whether a highlight can be drawn for this match
    pub fn is_located(&self) -> bool {
        self.start_offset.is_some() && self.end_offset.is_some()
    }
}

/// The assembled output of one evaluation request
#[derive(Debug, Serialize)]
pub struct Evaluation {
    pub matches: Vec<MatchResult>,
    pub count: usize,
    /// Wall-clock evaluation time in milliseconds
    pub execution_time_ms: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offsets_omitted_from_json() {
        let m = MatchResult::new("<p>x</p>".to_string(), NodeType::Element, Some("p".to_string()));
        let json = serde_json::to_value(&m).unwrap();
        assert!(json.get("start_offset").is_none());
        assert_eq!(json["node_type"], "element");

        let located = m.with_offsets(3, 11);
        let json = serde_json::to_value(&located).unwrap();
        assert_eq!(json["start_offset"], 3);
        assert_eq!(json["end_offset"], 11);
    }
}
