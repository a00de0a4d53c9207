//! Errors raised while turning a query string into predicates

use thiserror::Error;

use crate::models::RecordKind;

/// Failure of a library query
///
/// Every variant except `Store` describes input the engine cannot interpret.
/// An empty result is not an error; it is an `Ok` with no items.
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("No query given")]
    EmptyQuery,

    #[error("Invalid query term: '{0}'")]
    MalformedTerm(String),

    #[error("Unknown {kind} field: '{name}'")]
    UnknownField { name: String, kind: RecordKind },

    #[error("Invalid regular expression: '{pattern}'")]
    InvalidRegex {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// Failure raised by the store, passed through untouched
    #[error("Library lookup failed: {0:#}")]
    Store(anyhow::Error),
}

impl QueryError {
    /// True when the query text itself is at fault
    pub fn is_user_error(&self) -> bool {
        !matches!(self, QueryError::Store(_))
    }

    /// True when the query does not follow the `field:value` grammar
    pub fn is_syntax_error(&self) -> bool {
        matches!(self, QueryError::EmptyQuery | QueryError::MalformedTerm(_))
    }
}
