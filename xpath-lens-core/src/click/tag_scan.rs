//! Syntactic tag detection at a click position
//!
//! Works on raw editor lines, before any parsing: finds the complete tag
//! covering a column, or recognizes a partial tag (the line holds an
//! unmatched `<` or `>`) and reassembles it from surrounding lines when the
//! tag spans a line break.

use once_cell::sync::Lazy;
use regex::Regex;

/// A complete tag found in a clicked line, either opening or closing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementMatch {
    pub tag_name: String,
    /// Parsed attributes; may be incomplete when reassembled from a
    /// multi-line tag
    pub attributes: Vec<(String, String)>,
    /// Byte range of the tag within the text it was found in
    pub start_index: usize,
    pub end_index: usize,
    pub is_closing: bool,
}

/// Which side of a partial tag is missing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartialKind {
    Opening,
    Closing,
    Unknown,
}

/// A tag fragment on the clicked line that does not close on that line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartialTag {
    pub kind: PartialKind,
    pub name: Option<String>,
    /// Byte index of the unmatched bracket within the clicked line
    pub bracket_index: usize,
}

static TAG_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"<(/?)([A-Za-z][A-Za-z0-9:._-]*)((?:"[^"]*"|'[^']*'|[^<>"'])*?)(/?)>"#).unwrap()
});

static ATTR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"([A-Za-z_][A-Za-z0-9:._-]*)\s*(?:=\s*("[^"]*"|'[^']*'|[^\s"'>/]+))?"#).unwrap()
});

static WS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

static NAME_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^</?\s*([A-Za-z][A-Za-z0-9:._-]*)").unwrap());

/// Byte span of the character at 1-based `column`, clamped to the last
/// character of the line. Columns count characters, not bytes, so a click on
/// a line with multibyte text never produces a mid-character index.
fn column_char_span(line: &str, column: u32) -> Option<(usize, usize)> {
    let col = (column as usize).saturating_sub(1);
    let (idx, ch) = line
        .char_indices()
        .nth(col)
        .or_else(|| line.char_indices().last())?;
    Some((idx, idx + ch.len_utf8()))
}

/// Find the complete tag whose span covers `column` (1-based) in a line
pub fn tag_at_column(line: &str, column: u32) -> Option<ElementMatch> {
    let (idx, _) = column_char_span(line, column)?;
    for caps in TAG_RE.captures_iter(line) {
        let whole = caps.get(0).expect("group 0 always present");
        if whole.start() <= idx && idx < whole.end() {
            return Some(element_match_from_captures(&caps, whole.start(), whole.end()));
        }
    }
    None
}

/// Parse the first complete tag out of a (possibly reassembled) string
pub fn parse_tag(text: &str) -> Option<ElementMatch> {
    let caps = TAG_RE.captures(text)?;
    let whole = caps.get(0).expect("group 0 always present");
    Some(element_match_from_captures(&caps, whole.start(), whole.end()))
}

fn element_match_from_captures(
    caps: &regex::Captures,
    start: usize,
    end: usize,
) -> ElementMatch {
    let is_closing = &caps[1] == "/";
    let tag_name = caps[2].to_lowercase();
    let attributes = if is_closing {
        Vec::new()
    } else {
        parse_attributes(&caps[3])
    };
    ElementMatch {
        tag_name,
        attributes,
        start_index: start,
        end_index: end,
        is_closing,
    }
}

/// Parse an opening tag's attribute region. Values may be double-quoted,
/// single-quoted or unquoted; bare attributes get an empty value.
pub fn parse_attributes(raw: &str) -> Vec<(String, String)> {
    let mut attrs = Vec::new();
    for caps in ATTR_RE.captures_iter(raw) {
        let name = caps[1].to_lowercase();
        let value = caps
            .get(2)
            .map(|m| strip_quotes(m.as_str()).to_string())
            .unwrap_or_default();
        attrs.push((name, value));
    }
    attrs
}

fn strip_quotes(value: &str) -> &str {
    let bytes = value.as_bytes();
    if bytes.len() >= 2 && (bytes[0] == b'"' || bytes[0] == b'\'') && bytes[bytes.len() - 1] == bytes[0]
    {
        &value[1..value.len() - 1]
    } else {
        value
    }
}

/// Detect a tag fragment at `column` when no complete tag covers it: either
/// an unmatched `<` with no `>` to its right, or an unmatched `>` with no
/// `<` to its left (the tag started on an earlier line).
pub fn partial_tag_at_column(line: &str, column: u32) -> Option<PartialTag> {
    let (idx, after) = column_char_span(line, column)?;

    // Unmatched '<' at or before the click
    if let Some(lt) = line[..after].rfind('<') {
        if !line[lt..].contains('>') {
            let fragment = &line[lt..];
            let kind = if fragment.starts_with("</") {
                PartialKind::Closing
            } else {
                PartialKind::Opening
            };
            let name = NAME_RE
                .captures(fragment)
                .map(|caps| caps[1].to_lowercase());
            return Some(PartialTag {
                kind,
                name,
                bracket_index: lt,
            });
        }
    }

    // Unmatched '>' at or after the click: the line starts mid-tag
    if let Some(rel_gt) = line[idx..].find('>') {
        let gt = idx + rel_gt;
        if !line[..gt].contains('<') {
            return Some(PartialTag {
                kind: PartialKind::Unknown,
                name: None,
                bracket_index: gt,
            });
        }
    }

    None
}

/// Reassemble a multi-line tag from a window of surrounding lines.
///
/// Locates the clicked line inside the window, extends from the unmatched
/// bracket to its missing counterpart, collapses embedded newlines and
/// re-parses the assembled tag.
pub fn assemble_partial(
    partial: &PartialTag,
    line_text: &str,
    surrounding: &str,
) -> Option<ElementMatch> {
    let base = surrounding.find(line_text)?;
    let bracket = base + partial.bracket_index;

    let assembled = match partial.kind {
        PartialKind::Opening | PartialKind::Closing => {
            // '<' is on the clicked line; find the '>' further on
            let gt = surrounding[bracket..].find('>')?;
            &surrounding[bracket..bracket + gt + 1]
        }
        PartialKind::Unknown => {
            // '>' is on the clicked line; find the '<' further back
            let lt = surrounding[..bracket].rfind('<')?;
            &surrounding[lt..bracket + 1]
        }
    };

    let normalized = WS_RE.replace_all(assembled, " ");
    parse_tag(&normalized)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_at_column_simple() {
        let line = r#"<div class="hero"><p>x</p></div>"#;
        let tag = tag_at_column(line, 3).unwrap();
        assert_eq!(tag.tag_name, "div");
        assert_eq!(tag.attributes, vec![("class".to_string(), "hero".to_string())]);
        assert!(!tag.is_closing);
        assert_eq!(tag.start_index, 0);
    }

    #[test]
    fn test_tag_at_column_picks_covering_tag() {
        let line = "<div><p>x</p></div>";
        let tag = tag_at_column(line, 7).unwrap();
        assert_eq!(tag.tag_name, "p");
        let tag = tag_at_column(line, 11).unwrap();
        assert_eq!(tag.tag_name, "p");
        assert!(tag.is_closing);
    }

    #[test]
    fn test_tag_at_column_in_text_is_none() {
        let line = "<p>some words</p>";
        assert_eq!(tag_at_column(line, 6), None);
    }

    #[test]
    fn test_attribute_quote_styles() {
        let attrs = parse_attributes(r#" id="a" name='b' data-x=plain checked"#);
        assert_eq!(
            attrs,
            vec![
                ("id".to_string(), "a".to_string()),
                ("name".to_string(), "b".to_string()),
                ("data-x".to_string(), "plain".to_string()),
                ("checked".to_string(), String::new()),
            ]
        );
    }

    #[test]
    fn test_self_closing_tag() {
        let tag = tag_at_column(r#"<img src="x.png"/>"#, 2).unwrap();
        assert_eq!(tag.tag_name, "img");
        assert!(!tag.is_closing);
    }

    #[test]
    fn test_partial_opening() {
        let partial = partial_tag_at_column("  <div", 5).unwrap();
        assert_eq!(partial.kind, PartialKind::Opening);
        assert_eq!(partial.name.as_deref(), Some("div"));
        assert_eq!(partial.bracket_index, 2);
    }

    #[test]
    fn test_partial_closing() {
        let partial = partial_tag_at_column("</div", 3).unwrap();
        assert_eq!(partial.kind, PartialKind::Closing);
        assert_eq!(partial.name.as_deref(), Some("div"));
    }

    #[test]
    fn test_partial_unknown_from_continuation_line() {
        // Line is the tail of a tag opened on the previous line
        let partial = partial_tag_at_column("   class=\"hero\">", 5).unwrap();
        assert_eq!(partial.kind, PartialKind::Unknown);
        assert_eq!(partial.name, None);
    }

    #[test]
    fn test_no_partial_in_plain_text() {
        assert_eq!(partial_tag_at_column("just words", 4), None);
        assert_eq!(partial_tag_at_column("", 1), None);
    }

    #[test]
    fn test_multibyte_line_columns_are_characters() {
        // Column 6 lands inside the CJK text; slicing must stay on character
        // boundaries and simply find no tag there
        let line = "<p>日本語テキスト</p>";
        assert_eq!(tag_at_column(line, 6), None);
        assert_eq!(partial_tag_at_column(line, 6), None);

        // On the tag itself the match still works
        let tag = tag_at_column(line, 2).unwrap();
        assert_eq!(tag.tag_name, "p");

        let partial = partial_tag_at_column("  <div 日本", 9).unwrap();
        assert_eq!(partial.kind, PartialKind::Opening);
        assert_eq!(partial.name.as_deref(), Some("div"));
    }

    #[test]
    fn test_assemble_split_opening_tag() {
        let line = "<div";
        let surrounding = "<body>\n<div\n  class=\"hero\" id=\"top\">\n<p>x</p>";
        let partial = partial_tag_at_column(line, 2).unwrap();
        let tag = assemble_partial(&partial, line, surrounding).unwrap();
        assert_eq!(tag.tag_name, "div");
        assert_eq!(
            tag.attributes,
            vec![
                ("class".to_string(), "hero".to_string()),
                ("id".to_string(), "top".to_string()),
            ]
        );
    }

    #[test]
    fn test_assemble_continuation_line() {
        let line = "   class=\"hero\">";
        let surrounding = "<body>\n<div\n   class=\"hero\">\n<p>x</p>";
        let partial = partial_tag_at_column(line, 5).unwrap();
        let tag = assemble_partial(&partial, line, surrounding).unwrap();
        assert_eq!(tag.tag_name, "div");
        assert_eq!(tag.attributes, vec![("class".to_string(), "hero".to_string())]);
    }
}
