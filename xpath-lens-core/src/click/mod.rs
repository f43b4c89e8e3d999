//! Click-to-XPath resolution
//!
//! Turns "user clicked line L, column C in the raw text" into one XPath
//! string: detect the tag under the cursor (reassembling it when it spans
//! lines), retarget closing tags to their opening tag, re-parse the whole
//! document, disambiguate among same-tag candidates and synthesize a path
//! for the winner.
//!
//! Failures here are expected and non-fatal; callers show a transient notice
//! at most and leave their current XPath untouched.

pub mod tag_scan;

use std::sync::atomic::{AtomicU64, Ordering};

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;
use xot::{Node, Xot};

use crate::locate;
use crate::node;
use crate::parser::{self, ParseError, ParseMode};
use crate::scoring;
use crate::source_utils::{ceil_char_boundary, floor_char_boundary, position_to_offset, surrounding_lines};
use crate::synthesize;
use tag_scan::ElementMatch;

/// How many lines on each side of the click to use for multi-line tag
/// reassembly when the caller supplies no window of its own.
const DEFAULT_SURROUNDING_RADIUS: u32 = 3;

/// A click position in the raw source text
#[derive(Debug, Clone)]
pub struct ClickTarget {
    /// 1-based line number
    pub line: u32,
    /// 1-based column
    pub column: u32,
    /// Text of the clicked line
    pub line_text: String,
    /// Optional window of lines around the click, used only when the clicked
    /// line alone cannot produce a complete tag
    pub surrounding: Option<String>,
}

/// Why a click could not be resolved. Non-fatal by design; the caller's
/// current XPath stays unchanged.
#[derive(Error, Debug)]
pub enum ClickError {
    #[error("no tag found at the clicked position")]
    NoTagAtPosition,
    #[error("no <{0}> element found in the document")]
    ElementNotFound(String),
    #[error("too many <{0}> elements to disambiguate")]
    TooAmbiguous(String),
    #[error(transparent)]
    Parse(#[from] ParseError),
}

/// Resolve a click to an XPath expression for the element under it
pub fn resolve_click(
    source: &str,
    mode: ParseMode,
    target: &ClickTarget,
) -> Result<String, ClickError> {
    let clicked = detect_tag(source, target)?;
    let click_offset = position_to_offset(source, target.line, target.column);

    // Closing tags resolve to their matching opening tag
    let (clicked, anchor) = if clicked.is_closing {
        let line_start = position_to_offset(source, target.line, 1);
        let closing_at = line_start + clicked.start_index.min(target.line_text.len());
        match matching_opening_tag(source, &clicked.tag_name, closing_at) {
            Some((opening, at)) => (opening, at),
            None => return Err(ClickError::ElementNotFound(clicked.tag_name)),
        }
    } else {
        (clicked, click_offset)
    };

    // Fresh parse of the entire source; the click may follow edits that
    // invalidate any earlier tree
    let doc = parser::parse_string(source, mode)?;
    let xot = doc.xot();

    let candidates = node::elements_named(xot, doc.root, &clicked.tag_name, scoring::MAX_CANDIDATES);
    if candidates.is_empty() {
        return Err(ClickError::ElementNotFound(clicked.tag_name));
    }
    if candidates.len() > scoring::MAX_CANDIDATES {
        return Err(ClickError::TooAmbiguous(clicked.tag_name));
    }

    let chosen = select_candidate(source, xot, &candidates, &clicked, anchor);

    synthesize::xpath_for(xot, chosen).ok_or(ClickError::ElementNotFound(clicked.tag_name))
}

/// Step 1 and 2: complete tag on the clicked line, else multi-line reassembly
fn detect_tag(source: &str, target: &ClickTarget) -> Result<ElementMatch, ClickError> {
    if let Some(tag) = tag_scan::tag_at_column(&target.line_text, target.column) {
        return Ok(tag);
    }
    let partial = tag_scan::partial_tag_at_column(&target.line_text, target.column)
        .ok_or(ClickError::NoTagAtPosition)?;
    let window = match &target.surrounding {
        Some(window) => window.clone(),
        None => surrounding_lines(source, target.line, DEFAULT_SURROUNDING_RADIUS),
    };
    tag_scan::assemble_partial(&partial, &target.line_text, &window)
        .ok_or(ClickError::NoTagAtPosition)
}

/// Step 3: scan backward from a closing tag, keeping a same-name skip count,
/// to the opening tag it closes. Returns the reconstructed `ElementMatch`
/// and the opening tag's byte offset.
fn matching_opening_tag(
    source: &str,
    tag_name: &str,
    closing_at: usize,
) -> Option<(ElementMatch, usize)> {
    let pattern = format!(r"(?i)<(/?){}[\s/>]", regex::escape(tag_name));
    let re = Regex::new(&pattern).ok()?;
    let before = &source[..floor_char_boundary(source, closing_at)];

    let occurrences: Vec<(usize, bool)> = re
        .find_iter(before)
        .map(|m| (m.start(), source[m.start()..].starts_with("</")))
        .collect();

    let mut pending = 0usize;
    for (at, closing) in occurrences.into_iter().rev() {
        if closing {
            pending += 1;
        } else if pending == 0 {
            let gt = source[at..].find('>')?;
            let tag = tag_scan::parse_tag(&source[at..at + gt + 1])?;
            return Some((tag, at));
        } else {
            pending -= 1;
        }
    }
    None
}

/// Steps 4: pick one node among same-tag candidates.
///
/// Candidates carrying every attribute seen in the clicked tag are preferred
/// outright; remaining ambiguity falls to context scoring around the click.
fn select_candidate(
    source: &str,
    xot: &Xot,
    candidates: &[Node],
    clicked: &ElementMatch,
    anchor: usize,
) -> Node {
    if candidates.len() == 1 {
        return candidates[0];
    }

    let pool: Vec<Node> = if clicked.attributes.is_empty() {
        candidates.to_vec()
    } else {
        let agreeing: Vec<Node> = candidates
            .iter()
            .copied()
            .filter(|c| attributes_agree(xot, *c, &clicked.attributes))
            .collect();
        match agreeing.len() {
            0 => candidates.to_vec(),
            1 => return agreeing[0],
            _ => agreeing,
        }
    };

    let window = context_window(source, anchor).to_lowercase();
    let mut best = pool[0];
    let mut best_score = f64::MIN;
    for candidate in &pool {
        let score = score_candidate(source, xot, *candidate, anchor, &window);
        if score > best_score {
            best_score = score;
            best = *candidate;
        }
    }
    best
}

fn attributes_agree(xot: &Xot, candidate: Node, clicked_attrs: &[(String, String)]) -> bool {
    clicked_attrs.iter().all(|(name, value)| {
        node::attributes_of(xot, candidate).iter().any(|(n, v)| {
            n.eq_ignore_ascii_case(name) && (value.is_empty() || v.eq_ignore_ascii_case(value))
        })
    })
}

static WS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Context scoring for one candidate (constants in [`crate::scoring`]):
/// structural keywords shared between the candidate's
/// ancestor signature and the click context, the candidate's own text
/// appearing in the context, and a distance-decayed bonus for how close the
/// candidate's recovered source span is to the click.
fn score_candidate(source: &str, xot: &Xot, candidate: Node, anchor: usize, window: &str) -> f64 {
    let mut score = 0.0;

    let signature = ancestor_signature(xot, candidate);
    for keyword in scoring::STRUCTURAL_KEYWORDS {
        if signature.contains(keyword) && window.contains(keyword) {
            score += scoring::KEYWORD_BONUS;
        }
    }

    let own_text = leading_text(xot, candidate);
    if !own_text.is_empty() && window.contains(&own_text) {
        score += scoring::OWN_TEXT_BONUS;
    }

    match locate::locate(source, xot, candidate) {
        Some(span) => {
            let distance = span.start.abs_diff(anchor) as f64;
            score += scoring::PROXIMITY_BONUS / (1.0 + distance / scoring::PROXIMITY_SCALE);
        }
        None => {
            score -= scoring::UNLOCATED_PENALTY;
        }
    }

    score
}

/// Tag + class + truncated text per ancestor level, up to the root,
/// lowercased into one searchable string
fn ancestor_signature(xot: &Xot, node: Node) -> String {
    let mut parts = Vec::new();
    let mut current = Some(node);
    while let Some(element) = current {
        let name = node::element_name(xot, element).unwrap_or_default();
        let class = node::attribute_value(xot, element, "class").unwrap_or_default();
        let text = leading_text(xot, element);
        parts.push(format!("{} {} {}", name, class, text));
        current = node::parent_element(xot, element);
    }
    parts.join(" ").to_lowercase()
}

/// Leading trimmed text of an element, whitespace-collapsed and lowercased
fn leading_text(xot: &Xot, node: Node) -> String {
    let text = node::trimmed_text(xot, node);
    let collapsed = WS_RE.replace_all(&text, " ");
    let mut truncated: String = collapsed.chars().take(scoring::SIGNATURE_TEXT_LEN).collect();
    truncated.truncate(truncated.trim_end().len());
    truncated.to_lowercase()
}

/// Source window of ±[`scoring::CLICK_CONTEXT_RADIUS`] bytes around the click
fn context_window(source: &str, anchor: usize) -> &str {
    let start = ceil_char_boundary(source, anchor.saturating_sub(scoring::CLICK_CONTEXT_RADIUS));
    let end = floor_char_boundary(source, (anchor + scoring::CLICK_CONTEXT_RADIUS).min(source.len()));
    if end <= start {
        ""
    } else {
        &source[start..end]
    }
}

/// Latest-wins sequencing for concurrent click requests.
///
/// Resolution is not interruptible; instead every request takes an id from
/// `begin` and the caller applies a finished result only while its id is
/// still current, so stale resolutions are discarded.
#[derive(Debug, Default)]
pub struct ClickSequencer {
    issued: AtomicU64,
}

impl ClickSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue the next sequence id (monotonically increasing, starting at 1)
    pub fn begin(&self) -> u64 {
        self.issued.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Whether a finished request's result may still be applied
    pub fn is_current(&self, id: u64) -> bool {
        self.issued.load(Ordering::SeqCst) == id
    }
}
