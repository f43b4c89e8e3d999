//! XPath evaluation using xee-xpath
//!
//! This module runs one expression against one document and assembles
//! positioned results: parse, evaluate, then recover source offsets per
//! match where possible.

mod engine;
mod match_result;

pub use engine::XPathEngine;
pub use match_result::{Evaluation, MatchResult};

use thiserror::Error;

use crate::parser::ParseError;

/// Errors that abort a single evaluation request.
///
/// Absent offsets on an individual match are not an error; they are the
/// expected "could not be located" state carried inside [`MatchResult`].
#[derive(Error, Debug)]
pub enum EvaluateError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error("Failed to compile XPath: {0}")]
    Compile(String),
    #[error("Failed to execute XPath: {0}")]
    Execute(String),
}
