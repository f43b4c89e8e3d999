//! Size-threshold evaluation dispatch
//!
//! Small documents are evaluated directly on the calling thread; documents
//! above a configurable size threshold are handed to a spawned worker thread
//! and the result comes back over a channel. Every request owns its content,
//! so nothing is shared between the caller and the worker.

use std::sync::mpsc;
use std::thread;

use crate::parser::ParseMode;
use crate::xpath::{EvaluateError, Evaluation, XPathEngine};

/// Documents larger than this are evaluated off the calling thread
pub const DEFAULT_WORKER_THRESHOLD: usize = 5 * 1024 * 1024;

/// Where an evaluation request will run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionPath {
    InProcess,
    Worker,
}

/// One self-contained evaluation request
#[derive(Debug, Clone)]
pub struct EvalRequest {
    pub content: String,
    pub xpath: String,
    pub mode: ParseMode,
}

/// Routes evaluation requests by document size.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    threshold: usize,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Dispatcher {
            threshold: DEFAULT_WORKER_THRESHOLD,
        }
    }
}

impl Dispatcher {
    pub fn new() -> Self {
        Dispatcher::default()
    }

    pub fn with_threshold(threshold: usize) -> Self {
        Dispatcher { threshold }
    }

    /// Pure routing decision, based only on content length
    pub fn route(&self, content_len: usize) -> ExecutionPath {
        if content_len > self.threshold {
            ExecutionPath::Worker
        } else {
            ExecutionPath::InProcess
        }
    }

    /// Evaluate a request on the path its size routes it to
    pub fn dispatch(&self, request: EvalRequest) -> Result<Evaluation, EvaluateError> {
        match self.route(request.content.len()) {
            ExecutionPath::InProcess => {
                XPathEngine::new().evaluate(&request.content, &request.xpath, request.mode)
            }
            ExecutionPath::Worker => {
                let (sender, receiver) = mpsc::channel();
                thread::spawn(move || {
                    let result =
                        XPathEngine::new().evaluate(&request.content, &request.xpath, request.mode);
                    // The caller may have gone away; nothing to do then
                    let _ = sender.send(result);
                });
                receiver
                    .recv()
                    .map_err(|_| EvaluateError::Execute("worker thread disconnected".to_string()))?
            }
        }
    }
}
