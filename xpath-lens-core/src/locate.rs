//! Offset locator
//!
//! Maps a parsed node back to the `[start, end)` byte span in the original,
//! unparsed source text that produced it. Parsed nodes carry no positions
//! (there is no source map), so spans are recovered by searching the source
//! for the node's opening tag, text or attribute and disambiguating among
//! same-name occurrences with the scoring constants in [`crate::scoring`].
//!
//! `None` means "could not be reliably located" and is an expected, non-fatal
//! outcome, never an error.

use regex::Regex;
use xot::{Node, Value, Xot};

use crate::node;
use crate::parser::html::is_void_element;
use crate::scoring;
use crate::source_utils::{ceil_char_boundary, floor_char_boundary};

/// A half-open `[start, end)` byte range into the original source text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OffsetSpan {
    pub start: usize,
    pub end: usize,
}

/// Locate the source span of a node.
///
/// Elements, text nodes and attributes are located; comments, processing
/// instructions and the document node are not highlighted and return `None`.
pub fn locate(source: &str, xot: &Xot, node: Node) -> Option<OffsetSpan> {
    match xot.value(node) {
        Value::Element(_) => locate_element(source, xot, node),
        Value::Text(_) => locate_text(source, xot, node),
        Value::Attribute(attribute) => {
            let name = xot.local_name_str(attribute.name()).to_string();
            locate_attribute(source, &name, attribute.value())
        }
        _ => None,
    }
}

/// One opening-tag occurrence of the target tag name in the source
#[derive(Debug, Clone)]
struct Candidate {
    /// Byte offset of `<`
    start: usize,
    /// Byte offset just past the opening tag's `>`
    open_end: usize,
    /// Computed end of the whole element span
    end: usize,
    /// Whether `end` comes from a real closing tag (or self-closing form)
    /// rather than the serialized-length guess
    end_exact: bool,
    /// Scoring limit for inexact ends: the next same-name occurrence's start,
    /// so a guessed span never credits a sibling's content
    scan_cap: usize,
    /// The opening tag's markup, lowercased for compatibility checks
    tag_lower: String,
    self_closing: bool,
}

fn locate_element(source: &str, xot: &Xot, node: Node) -> Option<OffsetSpan> {
    let tag = node::element_name(xot, node)?;
    let serialized_len = node::serialize_value(xot, node).len();

    let candidates = opening_tags(source, &tag, serialized_len)?;

    // Attribute compatibility: every source-visible attribute of the node
    // must appear in the candidate's opening tag. Namespace declarations are
    // excluded since serialized and source forms often disagree on them.
    let attrs: Vec<(String, String)> = node::attributes_of(xot, node)
        .into_iter()
        .filter(|(name, _)| !name.to_lowercase().starts_with("xmlns"))
        .collect();

    let compatible: Vec<&Candidate> = candidates
        .iter()
        .filter(|c| attrs.iter().all(|(k, v)| attr_compatible(&c.tag_lower, k, v)))
        .collect();
    // When serialization and source disagree on attributes, fall back to
    // every same-name occurrence rather than giving up
    let pool: Vec<&Candidate> = if compatible.is_empty() {
        candidates.iter().collect()
    } else {
        compatible
    };

    let chosen = if pool.len() == 1 {
        pool[0]
    } else {
        pick_best(source, xot, node, &attrs, &pool)
    };

    Some(OffsetSpan {
        start: chosen.start,
        end: chosen.end,
    })
}

fn attr_compatible(tag_lower: &str, name: &str, value: &str) -> bool {
    if !tag_lower.contains(&name.to_lowercase()) {
        return false;
    }
    if value.is_empty() {
        return true;
    }
    let v = value.to_lowercase();
    tag_lower.contains(&format!("\"{}\"", v))
        || tag_lower.contains(&format!("'{}'", v))
        || tag_lower.contains(&format!("={}", v))
}

/// Score multi-candidate ambiguity and pick the best occurrence, defaulting
/// to the first when everything ties.
fn pick_best<'a>(
    source: &str,
    xot: &Xot,
    node: Node,
    attrs: &[(String, String)],
    pool: &[&'a Candidate],
) -> &'a Candidate {
    let text = node::trimmed_text(xot, node);
    let text_snippet = leading_chars(&text, 80);
    let child_names = node::child_element_names(xot, node, scoring::CHILD_TAG_SAMPLE);
    let attr_strings: Vec<String> = attrs
        .iter()
        .map(|(k, v)| format!(r#"{}="{}""#, k.to_lowercase(), v.to_lowercase()))
        .collect();

    let mut best = pool[0];
    let mut best_score = f64::MIN;
    for candidate in pool {
        let score = score_candidate(source, candidate, text_snippet, &child_names, &attr_strings);
        if score > best_score {
            best_score = score;
            best = candidate;
        }
    }
    best
}

fn score_candidate(
    source: &str,
    candidate: &Candidate,
    text_snippet: &str,
    child_names: &[String],
    attr_strings: &[String],
) -> f64 {
    let mut score = 0.0;

    // (a) the node's own text appearing inside the candidate's span. A
    // guessed end is additionally capped at the next same-name occurrence so
    // an unclosed element never matches on a sibling's text
    if !text_snippet.is_empty() {
        let mut limit = (candidate.start + scoring::TEXT_CONTENT_WINDOW).min(candidate.end);
        if !candidate.end_exact {
            limit = limit.min(candidate.scan_cap);
        }
        let window = window_of(source, candidate.open_end, limit);
        if window.contains(text_snippet) {
            score += scoring::TEXT_CONTENT_BONUS;
        }
    }

    // (b) leading child tag names appearing shortly after the candidate
    if !child_names.is_empty() {
        let window = window_of(
            source,
            candidate.open_end,
            (candidate.open_end + scoring::CHILD_TAG_WINDOW).min(candidate.end),
        )
        .to_lowercase();
        let found = child_names
            .iter()
            .filter(|name| window.contains(&format!("<{}", name.to_lowercase())))
            .count();
        score += scoring::CHILD_TAG_BONUS * found as f64 / child_names.len() as f64;
    }

    // (c) serialized attribute strings appearing near the candidate
    if !attr_strings.is_empty() {
        let window = window_of(
            source,
            candidate.start,
            candidate.start + scoring::ATTRIBUTE_WINDOW,
        )
        .to_lowercase();
        let found = attr_strings.iter().filter(|a| window.contains(a.as_str())).count();
        score += scoring::ATTRIBUTE_BONUS * found as f64 / attr_strings.len() as f64;
    }

    score
}

/// Find every opening tag of `tag` in the source, with computed element ends.
/// Returns `None` when the tag does not occur or there are too many
/// occurrences to disambiguate within the candidate cap.
fn opening_tags(source: &str, tag: &str, serialized_len: usize) -> Option<Vec<Candidate>> {
    let pattern = format!(r"(?i)<{}[\s/>]", regex::escape(tag));
    let re = Regex::new(&pattern).ok()?;

    let mut candidates = Vec::new();
    for m in re.find_iter(source) {
        if candidates.len() >= scoring::MAX_CANDIDATES {
            log::debug!("offset locator: too many <{}> occurrences, giving up", tag);
            return None;
        }
        let start = m.start();
        let Some((open_end, self_closing)) = tag_end(source, start) else {
            continue;
        };
        let tag_lower = source[start..open_end].to_lowercase();
        let (end, end_exact) = if self_closing || is_void_element(tag) {
            (open_end, true)
        } else {
            element_end(source, tag, open_end, start, serialized_len)
        };
        candidates.push(Candidate {
            start,
            open_end,
            end,
            end_exact,
            scan_cap: usize::MAX,
            tag_lower,
            self_closing,
        });
    }

    if candidates.is_empty() {
        return None;
    }

    let caps: Vec<usize> = (0..candidates.len())
        .map(|i| candidates.get(i + 1).map_or(usize::MAX, |next| next.start))
        .collect();
    for (candidate, cap) in candidates.iter_mut().zip(caps) {
        candidate.scan_cap = cap;
    }

    Some(candidates)
}

/// Scan forward from just past an opening tag, tracking same-name nesting
/// depth, to the matching closing tag. Falls back to the first subsequent
/// closing tag, then to the serialized markup length.
fn element_end(
    source: &str,
    tag: &str,
    open_end: usize,
    start: usize,
    serialized_len: usize,
) -> (usize, bool) {
    let escaped = regex::escape(tag);
    let pattern = format!(r"(?i)<(/?){}[\s/>]", escaped);
    if let Ok(re) = Regex::new(&pattern) {
        let mut depth = 1i32;
        for m in re.find_iter(&source[open_end..]) {
            let at = open_end + m.start();
            let closing = source[at..].starts_with("</");
            if closing {
                depth -= 1;
                if depth == 0 {
                    if let Some(gt) = source[at..].find('>') {
                        return (at + gt + 1, true);
                    }
                }
            } else if let Some((_, self_closing)) = tag_end(source, at) {
                if !self_closing && !is_void_element(tag) {
                    depth += 1;
                }
            }
        }
    }

    // Depth tracking failed: first subsequent closing tag of the same name
    let close_pattern = format!(r"(?i)</{}\s*>", escaped);
    if let Ok(re) = Regex::new(&close_pattern) {
        if let Some(m) = re.find(&source[open_end..]) {
            return (open_end + m.end(), true);
        }
    }

    // Last resort: assume the source is close to the serialized form
    (
        ceil_char_boundary(source, (start + serialized_len).min(source.len())),
        false,
    )
}

fn locate_text(source: &str, xot: &Xot, node: Node) -> Option<OffsetSpan> {
    let text = match xot.value(node) {
        Value::Text(text) => text.get().trim().to_string(),
        _ => return None,
    };
    // Whitespace-only text nodes are never located
    if text.is_empty() {
        return None;
    }

    // Prefer searching inside the parent element's span: identical text under
    // different parents would otherwise always resolve to the first copy
    if let Some(parent) = node::parent_element(xot, node) {
        if let Some(parent_span) = locate_element(source, xot, parent) {
            if let Some((content_start, _)) = tag_end(source, parent_span.start) {
                let window_end = parent_span.end.max(content_start);
                let window = window_of(source, content_start, window_end);
                if let Some(found) = window.find(&text) {
                    let start = content_start + found;
                    return Some(OffsetSpan {
                        start,
                        end: start + text.len(),
                    });
                }
            }
        }
    }

    // Documented limitation: ambiguous duplicate text picks the first
    // occurrence in the document
    source.find(&text).map(|start| OffsetSpan {
        start,
        end: start + text.len(),
    })
}

/// Locate an attribute by its `name = "value"` pattern, quote tolerant.
/// Takes the first match in the document.
pub fn locate_attribute(source: &str, name: &str, value: &str) -> Option<OffsetSpan> {
    let pattern = format!(
        r#"(?i){}\s*=\s*("{}"|'{}')"#,
        regex::escape(name),
        regex::escape(value),
        regex::escape(value)
    );
    let re = Regex::new(&pattern).ok()?;
    re.find(source).map(|m| OffsetSpan {
        start: m.start(),
        end: m.end(),
    })
}

/// Scan from `<` at `lt` to the tag's closing `>`, respecting quoted
/// attribute values. Returns the offset past `>` and whether the tag was
/// self-closing.
fn tag_end(source: &str, lt: usize) -> Option<(usize, bool)> {
    let bytes = source.as_bytes();
    let mut quote: Option<u8> = None;
    let mut i = lt;
    while i < bytes.len() {
        let b = bytes[i];
        match quote {
            Some(q) => {
                if b == q {
                    quote = None;
                }
            }
            None => match b {
                b'"' | b'\'' => quote = Some(b),
                b'>' => {
                    let self_closing = i > lt && bytes[i - 1] == b'/';
                    return Some((i + 1, self_closing));
                }
                _ => {}
            },
        }
        i += 1;
    }
    None
}

/// Char-boundary-safe slice of `source[start..end]`
fn window_of(source: &str, start: usize, end: usize) -> &str {
    let start = ceil_char_boundary(source, start.min(source.len()));
    let end = floor_char_boundary(source, end.min(source.len()));
    if end <= start {
        ""
    } else {
        &source[start..end]
    }
}

/// First `max` characters of a string, trimmed
fn leading_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => text[..idx].trim_end(),
        None => text,
    }
}
