//! Disambiguation scoring constants
//!
//! Matching serialized markup back to source text has no exact answer without
//! a parser-provided source map, so both the offset locator and the click
//! resolver rank candidates heuristically. All point values and search windows
//! live here. The values are empirically chosen and may need corpus-driven
//! tuning; they are an accepted approximation, not precision constants.

/// Bonus when the element's own trimmed text content appears shortly after a
/// candidate opening tag.
pub const TEXT_CONTENT_BONUS: f64 = 50.0;
/// How far past a candidate opening tag to look for the element's text.
pub const TEXT_CONTENT_WINDOW: usize = 1000;

/// Maximum bonus for child tag names found after a candidate, scaled by the
/// fraction of sampled child names present.
pub const CHILD_TAG_BONUS: f64 = 30.0;
/// How far past a candidate to look for child tag names.
pub const CHILD_TAG_WINDOW: usize = 500;
/// How many leading child element names to sample.
pub const CHILD_TAG_SAMPLE: usize = 3;

/// Maximum bonus for serialized attribute strings found near a candidate,
/// scaled by the fraction present.
pub const ATTRIBUTE_BONUS: f64 = 20.0;
/// How far around a candidate to look for attribute strings.
pub const ATTRIBUTE_WINDOW: usize = 100;

/// Cap on same-name candidates considered before giving up. Past this the
/// locator reports "not located" and the click resolver "too ambiguous"
/// rather than scanning pathological documents indefinitely.
pub const MAX_CANDIDATES: usize = 100;

/// Half-width (in bytes) of the source window around a click offset that
/// candidate signatures are compared against.
pub const CLICK_CONTEXT_RADIUS: usize = 500;

/// Bonus per structural keyword present in both a candidate's ancestor
/// signature and the click context window.
pub const KEYWORD_BONUS: f64 = 10.0;

/// Strong bonus when the candidate's own leading text appears in the click
/// context window.
pub const OWN_TEXT_BONUS: f64 = 40.0;

/// Maximum distance-decayed bonus for a candidate whose located source span
/// is close to the click offset.
pub const PROXIMITY_BONUS: f64 = 60.0;
/// Decay scale (bytes) for the proximity bonus.
pub const PROXIMITY_SCALE: f64 = 200.0;

/// Penalty when a candidate cannot be located in the source at all.
pub const UNLOCATED_PENALTY: f64 = 100.0;

/// Structural cues compared between ancestor signatures and click context.
pub const STRUCTURAL_KEYWORDS: &[&str] = &[
    "sidebar", "nav", "header", "footer", "content", "main", "article",
    "section", "menu", "banner", "aside",
];

/// How many characters of trimmed text to include per ancestor level in a
/// candidate signature.
pub const SIGNATURE_TEXT_LEN: usize = 40;
