//! Non-local exits.
//!
//! `return`, `break` and `throw` travel on their own channel next to ordinary
//! errors. Each signal records the depth of the marker it targets; a guard
//! handles a signal only when the depth matches its own frame and re-raises
//! everything else unchanged.

use std::fmt;

use crate::Error;
use crate::ast::Value;

/// Context key of the counter pushed by lambda and macro frames
pub const CALL_DEPTH: &str = "CallDepth";
/// Context key of the counter pushed by `try`
pub const TRY_DEPTH: &str = "TryDepth";
/// Context key of the counter pushed by `while`
pub const LOOP_DEPTH: &str = "LoopDepth";

/// A control transfer in flight
#[derive(Debug, Clone)]
pub enum Signal {
    /// Unwind to the enclosing lambda or macro frame with a result
    Return { value: Value, depth: usize },
    /// Unwind to the enclosing loop
    Break { depth: usize },
    /// Unwind to the enclosing `try` with a text payload
    Throw { message: String, depth: usize },
}

impl Signal {
    pub fn depth(&self) -> usize {
        match self {
            Signal::Return { depth, .. } | Signal::Break { depth } | Signal::Throw { depth, .. } => {
                *depth
            }
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Signal::Return { value, .. } => write!(f, "return of {value}"),
            Signal::Break { .. } => write!(f, "break"),
            Signal::Throw { message, .. } => write!(f, "throw: {message}"),
        }
    }
}

/// Why an evaluation did not produce a value
#[derive(Debug, Clone)]
pub enum Flow {
    Error(Error),
    Signal(Signal),
}

impl Flow {
    /// Collapse into an ordinary error, for signals that escaped every guard
    pub fn into_error(self) -> Error {
        match self {
            Flow::Error(err) => err,
            Flow::Signal(Signal::Throw { message, .. }) => {
                Error::EvalError(format!("uncaught throw: {message}"))
            }
            Flow::Signal(signal) => Error::EvalError(format!("{signal} escaped its frame")),
        }
    }
}

impl From<Error> for Flow {
    fn from(err: Error) -> Self {
        Flow::Error(err)
    }
}

impl fmt::Display for Flow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Flow::Error(err) => write!(f, "{err}"),
            Flow::Signal(signal) => write!(f, "{signal}"),
        }
    }
}

/// Result of every evaluation step inside the interpreter
pub type EvalResult = Result<Value, Flow>;
