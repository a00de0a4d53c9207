//! Predicate compilation and in-process evaluation
//!
//! A predicate is a storage-agnostic matching rule. Stores either evaluate
//! predicates directly with [`Predicate::matches`] or translate them into
//! their own filter language (see `library.rs` for the SQLite translation).
//!
//! # Pattern semantics
//!
//! `field:value` terms use SQL `LIKE` rules with `/` as the escape character:
//!
//! - `%` matches any run of characters (including none)
//! - `_` matches exactly one character
//! - `/` makes the following character literal; a trailing `/` matches nothing
//! - letters compare without regard to ASCII case
//!
//! These are the rules SQLite applies to `LIKE ... ESCAPE '/'`, so both store
//! implementations agree.

use regex::{Regex, RegexBuilder};

use super::error::QueryError;
use super::fields::FieldDescriptor;
use super::term::{QueryTerm, Separator};
use crate::models::Record;

/// Escape character of pattern terms
pub const ESCAPE: char = '/';
/// Matches any run of characters
pub const WILDCARD_ANY: char = '%';
/// Matches exactly one character
pub const WILDCARD_ONE: char = '_';

/// A compiled matching rule for one query term
#[derive(Debug, Clone)]
pub enum Predicate {
    /// Matches every record (the `*` term)
    All,
    /// LIKE-style pattern over the field's text
    Pattern {
        field: &'static FieldDescriptor,
        pattern: LikePattern,
    },
    /// Case-insensitive regex search over the field's text
    Regex {
        field: &'static FieldDescriptor,
        regex: Regex,
    },
}

impl Predicate {
    /// The field this predicate reads, if any
    pub fn field(&self) -> Option<&'static FieldDescriptor> {
        match self {
            Predicate::All => None,
            Predicate::Pattern { field, .. } | Predicate::Regex { field, .. } => Some(*field),
        }
    }

    /// Evaluate against a record; missing field values never match
    pub fn matches(&self, record: &Record) -> bool {
        match self {
            Predicate::All => true,
            Predicate::Pattern { field, pattern } => field
                .value(record)
                .as_text()
                .is_some_and(|text| pattern.matches(&text)),
            Predicate::Regex { field, regex } => field
                .value(record)
                .as_text()
                .is_some_and(|text| regex.is_match(&text)),
        }
    }
}

/// Compile a parsed term against its resolved field
///
/// Regex values are validated here so a bad pattern never reaches a store.
pub fn compile(term: &QueryTerm, field: &'static FieldDescriptor) -> Result<Predicate, QueryError> {
    match term.separator {
        Separator::Like => Ok(Predicate::Pattern {
            field,
            pattern: LikePattern::new(&term.value),
        }),
        Separator::Regex => {
            let regex = build_regex(&term.value).map_err(|source| QueryError::InvalidRegex {
                pattern: term.value.clone(),
                source,
            })?;
            Ok(Predicate::Regex { field, regex })
        }
    }
}

/// Build the case-insensitive regex used for `field::value` terms
pub fn build_regex(pattern: &str) -> Result<Regex, regex::Error> {
    RegexBuilder::new(pattern).case_insensitive(true).build()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LikeToken {
    Literal(char),
    One,
    Any,
}

/// A LIKE pattern with `/` escapes, compiled to tokens
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LikePattern {
    source: String,
    tokens: Vec<LikeToken>,
    /// False when the pattern ends in a dangling escape
    matchable: bool,
}

impl LikePattern {
    pub fn new(source: &str) -> Self {
        let mut tokens = Vec::with_capacity(source.len());
        let mut matchable = true;
        let mut chars = source.chars();

        while let Some(c) = chars.next() {
            let token = match c {
                WILDCARD_ANY => {
                    // Runs of % behave like a single %
                    if tokens.last() == Some(&LikeToken::Any) {
                        continue;
                    }
                    LikeToken::Any
                }
                WILDCARD_ONE => LikeToken::One,
                ESCAPE => match chars.next() {
                    Some(escaped) => LikeToken::Literal(escaped),
                    None => {
                        matchable = false;
                        break;
                    }
                },
                other => LikeToken::Literal(other),
            };
            tokens.push(token);
        }

        Self {
            source: source.to_string(),
            tokens,
            matchable,
        }
    }

    /// The pattern as written, escapes included
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Match the whole of `text` against the pattern
    pub fn matches(&self, text: &str) -> bool {
        if !self.matchable {
            return false;
        }

        let text: Vec<char> = text.chars().collect();
        let (mut p, mut t) = (0, 0);
        // Resume point after the most recent %: (pattern index, text index)
        let mut backtrack: Option<(usize, usize)> = None;

        while t < text.len() {
            match self.tokens.get(p) {
                Some(LikeToken::Any) => {
                    p += 1;
                    backtrack = Some((p, t));
                }
                Some(LikeToken::One) => {
                    p += 1;
                    t += 1;
                }
                Some(LikeToken::Literal(c)) if c.eq_ignore_ascii_case(&text[t]) => {
                    p += 1;
                    t += 1;
                }
                _ => match backtrack {
                    Some((resume_p, resume_t)) => {
                        // Let the last % swallow one more character
                        p = resume_p;
                        t = resume_t + 1;
                        backtrack = Some((resume_p, t));
                    }
                    None => return false,
                },
            }
        }

        self.tokens[p..].iter().all(|token| *token == LikeToken::Any)
    }
}
