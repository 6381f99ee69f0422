#![forbid(unsafe_code)]

use thiserror::Error;

/// Violations of the contract of the term operations.
///
/// The `try_` variants of the operations return these errors, the other
/// variants panic with the same message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TermError {
    #[error("symbol {symbol} has arity {arity}, but {arguments} arguments were given")]
    ArityMismatch {
        symbol: String,
        arity: usize,
        arguments: usize,
    },

    #[error("argument {index} does not exist for a term with head symbol {symbol} of arity {arity}")]
    ArgumentOutOfRange { symbol: String, index: usize, arity: usize },

    #[error("a term with head symbol {symbol} is not an integer term")]
    NotAnInteger { symbol: String },

    #[error("cannot combine terms and symbols of different term pools")]
    ForeignPool,
}

/// Panics with the message of the error, used by the operations that treat contract violations as programming errors.
#[track_caller]
pub(crate) fn contract<T>(result: Result<T, TermError>) -> T {
    match result {
        Ok(value) => value,
        Err(error) => panic!("{error}"),
    }
}
