//! Core data models for the music library
//!
//! The library holds three record shapes: albums, the tracks that belong to
//! them, and extra files (cover art, rip logs, cue sheets) attached to an album.
//! Tracks and extras carry a copy of their owning album so that album-level
//! fields can be queried directly on them.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;
use std::path::{Path, PathBuf};
use strum::{Display, EnumString};

/// Which record shape a query targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum RecordKind {
    Track,
    Album,
    Extra,
}

impl RecordKind {
    pub const ALL: [RecordKind; 3] = [RecordKind::Track, RecordKind::Album, RecordKind::Extra];
}

/// An album in the library
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Album {
    /// Library id (assigned by the store)
    pub id: i64,
    /// Album artist
    pub artist: String,
    /// Album title
    pub title: String,
    /// Release date
    pub date: NaiveDate,
    /// Album directory
    pub path: PathBuf,
    /// Number of discs in the release
    pub disc_total: u32,
    /// MusicBrainz release id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mb_album_id: Option<String>,
}

impl Album {
    pub fn year(&self) -> i32 {
        self.date.year()
    }
}

impl fmt::Display for Album {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {} ({})", self.artist, self.title, self.year())
    }
}

/// A single track of an album
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    pub id: i64,
    /// The album this track belongs to
    pub album: Album,
    pub track_num: u32,
    /// Disc number (1-indexed)
    pub disc: u32,
    pub title: String,
    /// Track artist (may differ from the album artist on compilations)
    pub artist: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genre: Option<String>,
    /// Audio file location
    pub path: PathBuf,
}

impl fmt::Display for Track {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {} - {}", self.artist, self.album.title, self.title)
    }
}

/// A non-audio file attached to an album
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Extra {
    pub id: i64,
    pub album: Album,
    pub path: PathBuf,
}

impl Extra {
    /// Final path component, e.g. `cover.jpg`
    pub fn filename(&self) -> Cow<'_, str> {
        file_name(&self.path)
    }
}

impl fmt::Display for Extra {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {} - {}", self.album.artist, self.album.title, self.filename())
    }
}

pub(crate) fn file_name(path: &Path) -> Cow<'_, str> {
    path.file_name()
        .map(|name| name.to_string_lossy())
        .unwrap_or_default()
}

/// Any record a query can return
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Record {
    Track(Track),
    Album(Album),
    Extra(Extra),
}

impl Record {
    pub fn kind(&self) -> RecordKind {
        match self {
            Record::Track(_) => RecordKind::Track,
            Record::Album(_) => RecordKind::Album,
            Record::Extra(_) => RecordKind::Extra,
        }
    }

    pub fn id(&self) -> i64 {
        match self {
            Record::Track(track) => track.id,
            Record::Album(album) => album.id,
            Record::Extra(extra) => extra.id,
        }
    }

    /// Filesystem location of the item
    pub fn path(&self) -> &Path {
        match self {
            Record::Track(track) => &track.path,
            Record::Album(album) => &album.path,
            Record::Extra(extra) => &extra.path,
        }
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Record::Track(track) => track.fmt(f),
            Record::Album(album) => album.fmt(f),
            Record::Extra(extra) => extra.fmt(f),
        }
    }
}

impl From<Track> for Record {
    fn from(track: Track) -> Self {
        Record::Track(track)
    }
}

impl From<Album> for Record {
    fn from(album: Album) -> Self {
        Record::Album(album)
    }
}

impl From<Extra> for Record {
    fn from(extra: Extra) -> Self {
        Record::Extra(extra)
    }
}

/// The value of one field of a record, as seen by the query engine
///
/// Matching always happens against the textual form: numbers are rendered in
/// decimal and dates as `YYYY-MM-DD`. `Missing` never matches anything.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue<'a> {
    Text(Cow<'a, str>),
    Number(i64),
    Missing,
}

impl<'a> FieldValue<'a> {
    pub fn text(value: &'a str) -> Self {
        FieldValue::Text(Cow::Borrowed(value))
    }

    pub fn optional(value: Option<&'a str>) -> Self {
        value.map_or(FieldValue::Missing, FieldValue::text)
    }

    pub fn path(value: &'a Path) -> Self {
        FieldValue::Text(value.to_string_lossy())
    }

    pub fn date(value: NaiveDate) -> Self {
        FieldValue::Text(Cow::Owned(value.format("%Y-%m-%d").to_string()))
    }

    /// Text the predicates are evaluated against (None for missing values)
    pub fn as_text(&self) -> Option<Cow<'_, str>> {
        match self {
            FieldValue::Text(text) => Some(Cow::Borrowed(text.as_ref())),
            FieldValue::Number(number) => Some(Cow::Owned(number.to_string())),
            FieldValue::Missing => None,
        }
    }
}

impl fmt::Display for FieldValue<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Text(text) => f.write_str(text),
            FieldValue::Number(number) => write!(f, "{}", number),
            FieldValue::Missing => Ok(()),
        }
    }
}

/// One album of an import manifest, with its tracks and extras
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlbumEntry {
    pub artist: String,
    pub title: String,
    pub date: NaiveDate,
    pub path: PathBuf,
    #[serde(default = "default_one")]
    pub disc_total: u32,
    #[serde(default)]
    pub mb_album_id: Option<String>,
    #[serde(default)]
    pub tracks: Vec<TrackEntry>,
    #[serde(default)]
    pub extras: Vec<ExtraEntry>,
}

/// A track of an import manifest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackEntry {
    pub track_num: u32,
    #[serde(default = "default_one")]
    pub disc: u32,
    pub title: String,
    /// Defaults to the album artist
    #[serde(default)]
    pub artist: Option<String>,
    #[serde(default)]
    pub genre: Option<String>,
    pub path: PathBuf,
}

/// An extra file of an import manifest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtraEntry {
    pub path: PathBuf,
}

fn default_one() -> u32 {
    1
}
