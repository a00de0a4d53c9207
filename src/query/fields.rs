//! Per-kind field registries
//!
//! Each record kind exposes a fixed set of queryable fields. A descriptor pairs
//! the lower-case field name with a typed accessor (used when predicates are
//! evaluated in-process) and the SQL column expression the library store
//! filters on. Registries are built once and only read afterwards.
//!
//! SQL aliases: `t` = tracks, `a` = albums, `e` = extras. Track and extra
//! queries join their album as `a`.

use std::fmt;
use std::sync::OnceLock;

use super::error::QueryError;
use crate::models::{Album, Extra, FieldValue, Record, RecordKind, Track};

/// Typed read access to one field of one record shape
#[derive(Clone, Copy)]
pub enum Accessor {
    Track(for<'a> fn(&'a Track) -> FieldValue<'a>),
    Album(for<'a> fn(&'a Album) -> FieldValue<'a>),
    Extra(for<'a> fn(&'a Extra) -> FieldValue<'a>),
}

/// A queryable field of a record kind
pub struct FieldDescriptor {
    /// Lower-case name used in query terms
    pub name: &'static str,
    /// SQL expression selecting the field in the library schema
    pub column: &'static str,
    accessor: Accessor,
}

impl FieldDescriptor {
    fn track(name: &'static str, column: &'static str, get: for<'a> fn(&'a Track) -> FieldValue<'a>) -> Self {
        Self { name, column, accessor: Accessor::Track(get) }
    }

    fn album(name: &'static str, column: &'static str, get: for<'a> fn(&'a Album) -> FieldValue<'a>) -> Self {
        Self { name, column, accessor: Accessor::Album(get) }
    }

    fn extra(name: &'static str, column: &'static str, get: for<'a> fn(&'a Extra) -> FieldValue<'a>) -> Self {
        Self { name, column, accessor: Accessor::Extra(get) }
    }

    /// The record kind this field belongs to
    pub fn kind(&self) -> RecordKind {
        match self.accessor {
            Accessor::Track(_) => RecordKind::Track,
            Accessor::Album(_) => RecordKind::Album,
            Accessor::Extra(_) => RecordKind::Extra,
        }
    }

    /// Read the field from a record (`Missing` if the record is another kind)
    pub fn value<'r>(&self, record: &'r Record) -> FieldValue<'r> {
        match (self.accessor, record) {
            (Accessor::Track(get), Record::Track(track)) => get(track),
            (Accessor::Album(get), Record::Album(album)) => get(album),
            (Accessor::Extra(get), Record::Extra(extra)) => get(extra),
            _ => FieldValue::Missing,
        }
    }
}

impl fmt::Debug for FieldDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldDescriptor")
            .field("name", &self.name)
            .field("kind", &self.kind())
            .field("column", &self.column)
            .finish()
    }
}

impl PartialEq for FieldDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.kind() == other.kind()
    }
}

impl Eq for FieldDescriptor {}

fn track_fields() -> Vec<FieldDescriptor> {
    vec![
        FieldDescriptor::track("id", "t.id", |t| FieldValue::Number(t.id)),
        FieldDescriptor::track("track_num", "t.track_num", |t| FieldValue::Number(t.track_num.into())),
        FieldDescriptor::track("disc", "t.disc", |t| FieldValue::Number(t.disc.into())),
        FieldDescriptor::track("title", "t.title", |t| FieldValue::text(&t.title)),
        FieldDescriptor::track("artist", "t.artist", |t| FieldValue::text(&t.artist)),
        FieldDescriptor::track("genre", "t.genre", |t| FieldValue::optional(t.genre.as_deref())),
        FieldDescriptor::track("path", "t.path", |t| FieldValue::path(&t.path)),
        FieldDescriptor::track("album", "a.title", |t| FieldValue::text(&t.album.title)),
        FieldDescriptor::track("albumartist", "a.artist", |t| FieldValue::text(&t.album.artist)),
        FieldDescriptor::track("date", "a.date", |t| FieldValue::date(t.album.date)),
        FieldDescriptor::track("year", YEAR_COLUMN, |t| FieldValue::Number(t.album.year().into())),
        FieldDescriptor::track("album_path", "a.path", |t| FieldValue::path(&t.album.path)),
        FieldDescriptor::track("mb_album_id", "a.mb_album_id", |t| {
            FieldValue::optional(t.album.mb_album_id.as_deref())
        }),
    ]
}

fn album_fields() -> Vec<FieldDescriptor> {
    vec![
        FieldDescriptor::album("id", "a.id", |a| FieldValue::Number(a.id)),
        FieldDescriptor::album("artist", "a.artist", |a| FieldValue::text(&a.artist)),
        FieldDescriptor::album("title", "a.title", |a| FieldValue::text(&a.title)),
        FieldDescriptor::album("date", "a.date", |a| FieldValue::date(a.date)),
        FieldDescriptor::album("year", YEAR_COLUMN, |a| FieldValue::Number(a.year().into())),
        FieldDescriptor::album("path", "a.path", |a| FieldValue::path(&a.path)),
        FieldDescriptor::album("disc_total", "a.disc_total", |a| FieldValue::Number(a.disc_total.into())),
        FieldDescriptor::album("mb_album_id", "a.mb_album_id", |a| FieldValue::optional(a.mb_album_id.as_deref())),
    ]
}

fn extra_fields() -> Vec<FieldDescriptor> {
    vec![
        FieldDescriptor::extra("id", "e.id", |e| FieldValue::Number(e.id)),
        FieldDescriptor::extra("filename", "e.filename", |e| FieldValue::Text(e.filename())),
        FieldDescriptor::extra("path", "e.path", |e| FieldValue::path(&e.path)),
        FieldDescriptor::extra("album", "a.title", |e| FieldValue::text(&e.album.title)),
        FieldDescriptor::extra("albumartist", "a.artist", |e| FieldValue::text(&e.album.artist)),
        FieldDescriptor::extra("album_path", "a.path", |e| FieldValue::path(&e.album.path)),
    ]
}

/// Release year, derived from the stored `YYYY-MM-DD` date
const YEAR_COLUMN: &str = "CAST(substr(a.date, 1, 4) AS INTEGER)";

/// All fields of a record kind, in display order
pub fn fields(kind: RecordKind) -> &'static [FieldDescriptor] {
    static TRACK: OnceLock<Vec<FieldDescriptor>> = OnceLock::new();
    static ALBUM: OnceLock<Vec<FieldDescriptor>> = OnceLock::new();
    static EXTRA: OnceLock<Vec<FieldDescriptor>> = OnceLock::new();

    let registry = match kind {
        RecordKind::Track => TRACK.get_or_init(track_fields),
        RecordKind::Album => ALBUM.get_or_init(album_fields),
        RecordKind::Extra => EXTRA.get_or_init(extra_fields),
    };
    registry.as_slice()
}

/// Look up a field of `kind` by name, ignoring case
pub fn resolve(kind: RecordKind, name: &str) -> Result<&'static FieldDescriptor, QueryError> {
    fields(kind)
        .iter()
        .find(|field| field.name.eq_ignore_ascii_case(name))
        .ok_or_else(|| QueryError::UnknownField {
            name: name.to_string(),
            kind,
        })
}
