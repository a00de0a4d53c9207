//! Query engine for searching the library
//!
//! A query is a small `field:value` language. The engine splits the query into
//! terms, resolves each term's field against the requested record kind,
//! compiles one predicate per term and hands the conjunction to a [`Store`].
//!
//! ```no_run
//! use tunedex::{Library, QueryEngine, RecordKind};
//!
//! let library = Library::open("library.db").unwrap();
//! let engine = QueryEngine::new(&library);
//! let tracks = engine.run(r#""artist:wu-tang clan" title:a%"#, RecordKind::Track).unwrap();
//! ```

pub mod error;
pub mod fields;
pub mod predicate;
pub mod term;

pub use error::QueryError;
pub use fields::{FieldDescriptor, fields, resolve};
pub use predicate::{LikePattern, Predicate, compile};
pub use term::{QueryTerm, Separator, Term, parse_term, tokenize};

use crate::models::{Record, RecordKind};
use crate::store::Store;

/// User-facing description of the query language
pub const HELP: &str = r#"QUERY SYNTAX

A query is one or more terms of the form 'field:value'. The field names a
field of the items being queried and the value is matched against it. Field
names and values are both case-insensitive.

Quote a term that contains whitespace, e.g. "artist:wu-tang clan".

'field:value' matches the whole field using LIKE wildcards:
    %   any run of characters, including none
    _   exactly one character
    /   makes the next character literal, e.g. 'title:100/%' matches "100%"

Because '/' escapes, a literal path doubles its slashes:
    'path://music//gza//%'

'field::value' searches the field with a regular expression,
e.g. 'title::^a.*'. Single-quote regexes containing backslashes.

'*' matches every item.

Terms are combined with AND, so every term must match. To find all Wu-Tang
Clan tracks starting with the letter 'a':
    tdx ls '"artist:wu-tang clan" title:a%'

Tracks are queried by default; pass --album or --extra to query albums or
extra files instead. 'tdx fields' lists the fields of each kind.
"#;

/// A compiled query: the record kind plus predicates joined by AND
#[derive(Debug, Clone)]
pub struct Query {
    kind: RecordKind,
    predicates: Vec<Predicate>,
}

impl Query {
    /// Compile a query string without running it
    ///
    /// Terms are handled left to right, each one parsed, resolved and
    /// compiled before the next is looked at. The first failing term decides
    /// the error, whatever stage it fails at.
    pub fn parse(query_str: &str, kind: RecordKind) -> Result<Self, QueryError> {
        let mut predicates = Vec::new();

        for token in tokenize(query_str)? {
            let predicate = match parse_term(&token)? {
                Term::Wildcard => Predicate::All,
                Term::Field(term) => {
                    let field = resolve(kind, &term.field)?;
                    log::trace!("Compiling term {} against {} field '{}'", term, kind, field.name);
                    compile(&term, field)?
                }
            };
            predicates.push(predicate);
        }

        Ok(Self { kind, predicates })
    }

    pub fn kind(&self) -> RecordKind {
        self.kind
    }

    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }
}

/// Runs query strings against a store
pub struct QueryEngine<S> {
    store: S,
}

impl<S: Store> QueryEngine<S> {
    /// Create a new query engine over the given store
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Execute a query and return every matching record of `kind`
    ///
    /// Nothing reaches the store unless the whole query compiles. Store errors
    /// are returned as `QueryError::Store` without being altered.
    pub fn run(&self, query_str: &str, kind: RecordKind) -> Result<Vec<Record>, QueryError> {
        log::debug!("Querying library: query={:?}, kind={}", query_str, kind);

        let query = Query::parse(query_str, kind)?;
        let items = self
            .store
            .find(query.kind(), query.predicates())
            .map_err(QueryError::Store)?;

        if items.is_empty() {
            log::info!("No items found for the query '{}'", query_str);
        } else {
            log::debug!("Query returned {} {} item(s)", items.len(), kind);
        }

        Ok(items)
    }
}
