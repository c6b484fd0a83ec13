//! lispcore - evaluation core of a small Lisp-family scripting language
//!
//! This crate implements the semantic heart of the language: symbols and
//! namespaces, lexical scoping with closures, the function-call protocol
//! (builtins, assignable places, lambdas and macros), the recursive evaluator,
//! backquote expansion and structured non-local exits (`return`, `break`,
//! `throw`/`try`).
//!
//! ```lisp
//! (var make-counter
//!   (lambda ()
//!     (var n 0)
//!     (lambda () (= n (+ n 1)))))
//! (var c (make-counter))
//! (c) (c)                       ; => 2
//! ((macro (x) (list '+ x 1)) 5) ; => 6
//! `(1 ,(+ 1 1) ,@(list 3 4))    ; => (1 2 3 4)
//! ```
//!
//! ## Evaluation model
//!
//! - Atoms other than symbols evaluate to themselves.
//! - Symbols resolve through the scope chain, innermost scope first.
//! - Lists apply the function in operator position. Each function declares a
//!   minimum arity and whether its arguments are evaluated first, so special
//!   forms are ordinary function values with an unevaluated-arguments policy.
//!
//! ## Error channels
//!
//! Ordinary failures are [`Error`] values. Control transfers travel on a
//! separate channel (see [`evaluator::Signal`]) and are intercepted only by the
//! frame whose depth marker they target.
//!
//! ## Modules
//!
//! - `ast`: the [`ast::Value`] union, symbols, cons cells and numbers
//! - `collections`: arrays, dictionaries and hash tables
//! - `namespace`: named symbol containers
//! - `evaluator`: the [`evaluator::Environment`] and the evaluation algorithm
//! - `builtinops`: the standard library installed at bootstrap
//! - `reader`: S-expression text to values (feature `reader`)

use thiserror::Error;

/// Maximum nesting accepted by the reader before it gives up
pub const MAX_PARSE_DEPTH: usize = 64;

/// Default maximum evaluation depth; deeper recursion is reported as an error
/// instead of overflowing the host stack.
///
/// A user-level call takes about three levels, so this allows non-tail
/// recursion around 1300 calls deep. It is sized for an 8 MB main thread;
/// hosts evaluating on smaller stacks should lower it through [`Config`].
pub const MAX_EVAL_DEPTH: usize = 4096;

/// Runtime configuration for an [`evaluator::Environment`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// Maximum nesting of `eval` calls
    pub max_eval_depth: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            max_eval_depth: MAX_EVAL_DEPTH,
        }
    }
}

/// Error types for the interpreter
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    #[error("ParseError: {0}")]
    ParseError(String),
    #[error("EvaluationError: {0}")]
    EvalError(String),
    #[error("Type error: {0}")]
    TypeError(String),
    #[error("Unbound symbol: {0}")]
    UnboundSymbol(String),
    #[error("Reserved symbol: {0}")]
    ReservedSymbol(String),
    #[error("Namespace error: {0}")]
    NamespaceError(String),
    #[error("{}", format_arity(.expected, .got, .expression))]
    ArityError {
        expected: usize,
        got: usize,
        expression: Option<String>, // Optional expression context
    },
}

fn format_arity(expected: &usize, got: &usize, expression: &Option<String>) -> String {
    match expression {
        Some(expr) => {
            format!("ArityError: expression {expr}: expected at least {expected} arguments, got {got}")
        }
        None => format!("ArityError: function expected at least {expected} arguments but got {got}"),
    }
}

impl Error {
    /// Create an ArityError without expression context
    pub fn arity_error(expected: usize, got: usize) -> Self {
        Error::ArityError {
            expected,
            got,
            expression: None,
        }
    }

    /// Create an ArityError with expression context
    pub fn arity_error_with_expr(expected: usize, got: usize, expression: String) -> Self {
        Error::ArityError {
            expected,
            got,
            expression: Some(expression),
        }
    }
}

pub mod ast;
pub mod builtinops;
pub mod collections;
pub mod evaluator;
pub mod namespace;

#[cfg(feature = "reader")]
pub mod reader;

pub use ast::Value;
pub use evaluator::Environment;
