//! Record stores the query engine runs against
//!
//! The engine only needs one operation from a store: return every record of a
//! kind that satisfies all of a list of predicates. `MemoryStore` evaluates
//! predicates in-process; `Library` (see `library.rs`) translates them to SQL.

use anyhow::Result;

use crate::models::{Record, RecordKind};
use crate::query::Predicate;

/// Source of records for the query engine
///
/// Implementations must treat `predicates` as a conjunction and must not
/// modify any records. Errors (including cancellation) are returned to the
/// caller untouched.
pub trait Store {
    fn find(&self, kind: RecordKind, predicates: &[Predicate]) -> Result<Vec<Record>>;
}

impl<S: Store + ?Sized> Store for &S {
    fn find(&self, kind: RecordKind, predicates: &[Predicate]) -> Result<Vec<Record>> {
        (**self).find(kind, predicates)
    }
}

impl<S: Store + ?Sized> Store for Box<S> {
    fn find(&self, kind: RecordKind, predicates: &[Predicate]) -> Result<Vec<Record>> {
        (**self).find(kind, predicates)
    }
}

/// Reject predicates compiled for a different record kind
pub(crate) fn ensure_kind(kind: RecordKind, predicates: &[Predicate]) -> Result<()> {
    for field in predicates.iter().filter_map(Predicate::field) {
        if field.kind() != kind {
            anyhow::bail!(
                "Predicate on {} field '{}' cannot filter {} records",
                field.kind(),
                field.name,
                kind
            );
        }
    }
    Ok(())
}

/// In-memory record store
///
/// Records are kept in insertion order. The store is read-only during a
/// query, so a shared reference can serve concurrent queries.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    records: Vec<Record>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, record: impl Into<Record>) {
        self.records.push(record.into());
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl<R: Into<Record>> FromIterator<R> for MemoryStore {
    fn from_iter<I: IntoIterator<Item = R>>(iter: I) -> Self {
        Self {
            records: iter.into_iter().map(Into::into).collect(),
        }
    }
}

impl Store for MemoryStore {
    fn find(&self, kind: RecordKind, predicates: &[Predicate]) -> Result<Vec<Record>> {
        ensure_kind(kind, predicates)?;

        Ok(self
            .records
            .iter()
            .filter(|record| record.kind() == kind)
            .filter(|record| predicates.iter().all(|p| p.matches(record)))
            .cloned()
            .collect())
    }
}
