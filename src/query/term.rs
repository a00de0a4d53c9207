//! Query string tokenizing and term parsing
//!
//! A query string is split like a shell command line, so a term containing
//! whitespace survives as one word when quoted. Each word is then parsed as a
//! `field:value` (pattern) or `field::value` (regex) term.

use regex::Regex;
use std::fmt;
use std::sync::OnceLock;

use super::error::QueryError;

/// The term matching every record of the queried kind
pub const WILDCARD: &str = "*";

/// How a term's value is matched against its field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Separator {
    /// `field:value`, LIKE-style pattern match
    Like,
    /// `field::value`, regular expression search
    Regex,
}

impl Separator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Separator::Like => ":",
            Separator::Regex => "::",
        }
    }
}

/// A parsed `field<separator>value` term
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryTerm {
    /// Lower-cased field name
    pub field: String,
    pub separator: Separator,
    pub value: String,
}

impl fmt::Display for QueryTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.field, self.separator.as_str(), self.value)
    }
}

/// One word of a query
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Term {
    /// `*`
    Wildcard,
    Field(QueryTerm),
}

/// Split a raw query into shell-style words
///
/// Quotes group whitespace and are stripped. Fails with `EmptyQuery` when no
/// words remain.
pub fn tokenize(raw: &str) -> Result<Vec<String>, QueryError> {
    let tokens = shell_words::split(raw).map_err(|e| {
        log::debug!("Failed to split query '{}': {}", raw, e);
        QueryError::MalformedTerm(raw.to_string())
    })?;

    if tokens.is_empty() {
        return Err(QueryError::EmptyQuery);
    }

    Ok(tokens)
}

fn term_regex() -> &'static Regex {
    static TERM_RE: OnceLock<Regex> = OnceLock::new();
    TERM_RE.get_or_init(|| {
        // field: lazy run of non-whitespace, then ':' or '::', then a value
        // that starts with non-whitespace and runs to the end of the word
        Regex::new(r"^(?P<field>\S+?)(?P<separator>::?)(?P<value>(?s:\S.*))$")
            .expect("term grammar is a valid regex")
    })
}

/// Parse a single query word
pub fn parse_term(token: &str) -> Result<Term, QueryError> {
    if token == WILDCARD {
        return Ok(Term::Wildcard);
    }

    let caps = term_regex()
        .captures(token)
        .ok_or_else(|| QueryError::MalformedTerm(token.to_string()))?;

    let separator = match &caps["separator"] {
        "::" => Separator::Regex,
        _ => Separator::Like,
    };

    Ok(Term::Field(QueryTerm {
        field: caps["field"].to_lowercase(),
        separator,
        value: caps["value"].to_string(),
    }))
}
