//! xpath-lens-core: XPath testing library for XML and HTML
//!
//! This library provides:
//! - Forgiving XML/HTML parsing into an XPath-queryable tree
//! - XPath 3.1 evaluation with positioned matches
//! - Source offset recovery for matched nodes in the original, unrepaired text
//! - Click-to-XPath resolution and XPath synthesis
//! - Size-threshold dispatch of evaluation work

pub mod click;
pub mod locate;
pub mod node;
pub mod parser;
pub mod scoring;
pub mod source_utils;
pub mod synthesize;
pub mod worker;
pub mod xpath;

pub use click::{resolve_click, ClickError, ClickSequencer, ClickTarget};
pub use locate::{locate, locate_attribute, OffsetSpan};
pub use parser::{detect_mode, parse_string, ParseError, ParseMode, ParsedDocument};
pub use synthesize::xpath_for;
pub use worker::{Dispatcher, EvalRequest, ExecutionPath, DEFAULT_WORKER_THRESHOLD};
pub use xpath::{EvaluateError, Evaluation, MatchResult, XPathEngine};
