//! Error types for query parsing.

use thiserror::Error;

/// Errors that can occur while parsing a query.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    /// Parse error at a specific position in the input.
    #[error("parse error at position {position}: {message}")]
    ParseError {
        /// Position in the input where the error occurred.
        position: usize,
        /// Description of the error.
        message: String,
    },

    /// Query text ended before the constraint tree was closed.
    #[error("query is incomplete: {0}")]
    Incomplete(String),

    /// Empty input provided.
    #[error("empty query")]
    EmptyQuery,

    /// Constraint name is not part of the supported vocabulary.
    #[error("unknown constraint: {0}")]
    UnknownConstraint(String),

    /// Constraint is known but its arguments are not valid for it.
    #[error("invalid arguments of {constraint}: {message}")]
    InvalidArgument {
        /// Name of the offending constraint.
        constraint: String,
        /// Description of the problem.
        message: String,
    },
}

impl QueryError {
    pub(crate) fn invalid(constraint: &str, message: impl Into<String>) -> Self {
        QueryError::InvalidArgument {
            constraint: constraint.to_string(),
            message: message.into(),
        }
    }
}

/// Result type for query operations.
pub type QueryResult<T> = std::result::Result<T, QueryError>;
