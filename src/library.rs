//! SQLite-backed music library
//!
//! The library database holds three tables plus a small `meta` table:
//!
//! - `albums`: one row per album
//! - `tracks`: audio files, each owned by an album
//! - `extras`: non-audio files (cover art, logs), each owned by an album
//! - `meta`: key/value bookkeeping (schema hash)
//!
//! Queries are answered by translating predicates to SQL. Pattern predicates
//! become `LIKE ... ESCAPE '/'`; regex predicates call a `regexp()` scalar
//! function registered on the connection. Values are always bound as
//! parameters.

use anyhow::{Context, Result};
use rusqlite::functions::FunctionFlags;
use rusqlite::types::ValueRef;
use rusqlite::{Connection, InterruptHandle, OptionalExtension, Row, Transaction, params};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::models::{Album, AlbumEntry, Extra, Record, RecordKind, Track, file_name};
use crate::query::Predicate;
use crate::query::predicate::build_regex;
use crate::store::{Store, ensure_kind};

/// Default database file name inside the config directory
pub const LIBRARY_DB: &str = "library.db";

/// Hash of the schema-defining sources at build time (see build.rs)
const SCHEMA_HASH: &str = env!("LIBRARY_SCHEMA_HASH");

const ALBUM_COLUMNS: &str = "a.id, a.artist, a.title, a.date, a.path, a.disc_total, a.mb_album_id";

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// A music library stored in SQLite
pub struct Library {
    conn: Connection,
}

impl Library {
    /// Open (creating if needed) the library database at `path`
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        log::debug!("Opening library at {:?}", path);

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create library directory {:?}", parent))?;
        }

        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open library database {:?}", path))?;
        Self::from_connection(conn)
    }

    /// Open a throwaway library that lives only in memory
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory library")?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.pragma_update(None, "foreign_keys", "ON")?;
        register_regexp(&conn).context("Failed to register regexp() function")?;

        let library = Self { conn };
        library.init_schema()?;
        library.check_schema_hash()?;
        Ok(library)
    }

    fn init_schema(&self) -> Result<()> {
        self.conn
            .execute_batch(
                "CREATE TABLE IF NOT EXISTS albums (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    artist TEXT NOT NULL,
                    title TEXT NOT NULL,
                    date TEXT NOT NULL,
                    path TEXT NOT NULL UNIQUE,
                    disc_total INTEGER NOT NULL DEFAULT 1,
                    mb_album_id TEXT
                );

                CREATE TABLE IF NOT EXISTS tracks (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    album_id INTEGER NOT NULL,
                    track_num INTEGER NOT NULL,
                    disc INTEGER NOT NULL DEFAULT 1,
                    title TEXT NOT NULL,
                    artist TEXT NOT NULL,
                    genre TEXT,
                    path TEXT NOT NULL UNIQUE,
                    FOREIGN KEY (album_id) REFERENCES albums(id) ON DELETE CASCADE
                );

                CREATE INDEX IF NOT EXISTS idx_tracks_album ON tracks(album_id);

                CREATE TABLE IF NOT EXISTS extras (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    album_id INTEGER NOT NULL,
                    filename TEXT NOT NULL,
                    path TEXT NOT NULL UNIQUE,
                    FOREIGN KEY (album_id) REFERENCES albums(id) ON DELETE CASCADE
                );

                CREATE INDEX IF NOT EXISTS idx_extras_album ON extras(album_id);

                CREATE TABLE IF NOT EXISTS meta (
                    key TEXT PRIMARY KEY,
                    value TEXT NOT NULL
                );",
            )
            .context("Failed to create library schema")?;

        self.conn.execute(
            "INSERT OR IGNORE INTO meta (key, value) VALUES ('schema_hash', ?1)",
            [SCHEMA_HASH],
        )?;

        Ok(())
    }

    /// Warn when the database was created by a build with a different schema
    fn check_schema_hash(&self) -> Result<()> {
        let stored: Option<String> = self
            .conn
            .query_row("SELECT value FROM meta WHERE key = 'schema_hash'", [], |row| row.get(0))
            .optional()?;

        match stored {
            Some(hash) if hash != SCHEMA_HASH => {
                log::warn!(
                    "Library schema hash mismatch (database: {}, current: {}); the library may need to be rebuilt",
                    hash,
                    SCHEMA_HASH
                );
            }
            _ => log::debug!("Library schema hash: {}", SCHEMA_HASH),
        }

        Ok(())
    }

    /// Handle that can cancel a running query from another thread
    ///
    /// An interrupted `find` fails with `rusqlite::Error::SqliteFailure`
    /// (`ErrorCode::OperationInterrupted`).
    pub fn interrupt_handle(&self) -> InterruptHandle {
        self.conn.get_interrupt_handle()
    }

    /// Add an album together with its tracks and extras in one transaction
    pub fn add_album(&mut self, entry: &AlbumEntry) -> Result<Album> {
        let tx = self.conn.transaction()?;
        let album = insert_album(&tx, entry)?;
        tx.commit()?;
        Ok(album)
    }

    /// Import every album of a JSON manifest (an array of album entries)
    ///
    /// All albums go in under one transaction: if any album fails, none of the
    /// manifest is kept.
    pub fn import_manifest(&mut self, path: &Path) -> Result<Vec<Album>> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read manifest {:?}", path))?;
        let entries: Vec<AlbumEntry> = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse manifest {:?}", path))?;

        let tx = self.conn.transaction()?;
        let albums = entries
            .iter()
            .map(|entry| insert_album(&tx, entry))
            .collect::<Result<Vec<_>>>()?;
        tx.commit()?;

        log::info!("Imported {} album(s) from {:?}", albums.len(), path);
        Ok(albums)
    }

    /// Number of stored records of a kind
    pub fn count(&self, kind: RecordKind) -> Result<usize> {
        let table = match kind {
            RecordKind::Track => "tracks",
            RecordKind::Album => "albums",
            RecordKind::Extra => "extras",
        };
        let count: i64 = self
            .conn
            .query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

impl Store for Library {
    fn find(&self, kind: RecordKind, predicates: &[Predicate]) -> Result<Vec<Record>> {
        ensure_kind(kind, predicates)?;

        let (sql, values) = build_select(kind, predicates);
        log::trace!("Library query: {} {:?}", sql, values);

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(rusqlite::params_from_iter(values.iter()), |row| match kind {
            RecordKind::Track => track_from_row(row).map(Record::Track),
            RecordKind::Album => album_from_row(row, 0).map(Record::Album),
            RecordKind::Extra => extra_from_row(row).map(Record::Extra),
        })?;

        let records = rows.collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(records)
    }
}

/// Insert one album with its tracks and extras; the caller commits
fn insert_album(tx: &Transaction<'_>, entry: &AlbumEntry) -> Result<Album> {
    tx.execute(
        "INSERT INTO albums (artist, title, date, path, disc_total, mb_album_id)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            entry.artist,
            entry.title,
            entry.date,
            entry.path.to_string_lossy(),
            entry.disc_total,
            entry.mb_album_id,
        ],
    )
    .with_context(|| format!("Failed to add album {:?}", entry.path))?;

    let album = Album {
        id: tx.last_insert_rowid(),
        artist: entry.artist.clone(),
        title: entry.title.clone(),
        date: entry.date,
        path: entry.path.clone(),
        disc_total: entry.disc_total,
        mb_album_id: entry.mb_album_id.clone(),
    };

    for track in &entry.tracks {
        tx.execute(
            "INSERT INTO tracks (album_id, track_num, disc, title, artist, genre, path)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                album.id,
                track.track_num,
                track.disc,
                track.title,
                track.artist.as_deref().unwrap_or(&entry.artist),
                track.genre,
                track.path.to_string_lossy(),
            ],
        )
        .with_context(|| format!("Failed to add track {:?}", track.path))?;
    }

    for extra in &entry.extras {
        tx.execute(
            "INSERT INTO extras (album_id, filename, path) VALUES (?1, ?2, ?3)",
            params![album.id, file_name(&extra.path), extra.path.to_string_lossy()],
        )
        .with_context(|| format!("Failed to add extra {:?}", extra.path))?;
    }

    log::info!(
        "Added album '{}' with {} track(s) and {} extra(s)",
        album,
        entry.tracks.len(),
        entry.extras.len()
    );
    Ok(album)
}

/// Translate predicates to a SELECT statement and its bound values
fn build_select(kind: RecordKind, predicates: &[Predicate]) -> (String, Vec<String>) {
    let (mut sql, order_by) = match kind {
        RecordKind::Track => (
            format!(
                "SELECT t.id, t.track_num, t.disc, t.title, t.artist, t.genre, t.path, {} \
                 FROM tracks t JOIN albums a ON a.id = t.album_id",
                ALBUM_COLUMNS
            ),
            "t.id",
        ),
        RecordKind::Album => (format!("SELECT {} FROM albums a", ALBUM_COLUMNS), "a.id"),
        RecordKind::Extra => (
            format!(
                "SELECT e.id, e.path, {} FROM extras e JOIN albums a ON a.id = e.album_id",
                ALBUM_COLUMNS
            ),
            "e.id",
        ),
    };

    let mut values = Vec::new();
    let mut clauses = Vec::new();

    for predicate in predicates {
        match predicate {
            Predicate::All => clauses.push("1".to_string()),
            Predicate::Pattern { field, pattern } => {
                values.push(pattern.as_str().to_string());
                clauses.push(format!("{} LIKE ?{} ESCAPE '/'", field.column, values.len()));
            }
            Predicate::Regex { field, regex } => {
                values.push(regex.as_str().to_string());
                clauses.push(format!("regexp(?{}, {})", values.len(), field.column));
            }
        }
    }

    if !clauses.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&clauses.join(" AND "));
    }
    sql.push_str(" ORDER BY ");
    sql.push_str(order_by);

    (sql, values)
}

/// Read album columns starting at `offset`
fn album_from_row(row: &Row<'_>, offset: usize) -> rusqlite::Result<Album> {
    Ok(Album {
        id: row.get(offset)?,
        artist: row.get(offset + 1)?,
        title: row.get(offset + 2)?,
        date: row.get(offset + 3)?,
        path: PathBuf::from(row.get::<_, String>(offset + 4)?),
        disc_total: row.get(offset + 5)?,
        mb_album_id: row.get(offset + 6)?,
    })
}

fn track_from_row(row: &Row<'_>) -> rusqlite::Result<Track> {
    Ok(Track {
        id: row.get(0)?,
        track_num: row.get(1)?,
        disc: row.get(2)?,
        title: row.get(3)?,
        artist: row.get(4)?,
        genre: row.get(5)?,
        path: PathBuf::from(row.get::<_, String>(6)?),
        album: album_from_row(row, 7)?,
    })
}

fn extra_from_row(row: &Row<'_>) -> rusqlite::Result<Extra> {
    Ok(Extra {
        id: row.get(0)?,
        path: PathBuf::from(row.get::<_, String>(1)?),
        album: album_from_row(row, 2)?,
    })
}

/// Register `regexp(pattern, value)` on the connection
///
/// Uses the same case-insensitive regex as in-process evaluation. The compiled
/// regex is cached per statement; NULL values never match.
fn register_regexp(conn: &Connection) -> rusqlite::Result<()> {
    conn.create_scalar_function(
        "regexp",
        2,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let regex: Arc<regex::Regex> = ctx.get_or_create_aux(0, |pattern| -> Result<_, BoxError> {
                Ok(build_regex(pattern.as_str()?)?)
            })?;

            let is_match = match ctx.get_raw(1) {
                ValueRef::Text(bytes) => std::str::from_utf8(bytes)
                    .map(|text| regex.is_match(text))
                    .unwrap_or(false),
                ValueRef::Integer(number) => regex.is_match(&number.to_string()),
                ValueRef::Real(number) => regex.is_match(&number.to_string()),
                ValueRef::Null | ValueRef::Blob(_) => false,
            };
            Ok(is_match)
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ExtraEntry, TrackEntry};
    use crate::query::{Query, QueryEngine, QueryError};
    use rusqlite::ErrorCode;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn entry() -> AlbumEntry {
        AlbumEntry {
            artist: "Wu-Tang Clan".to_string(),
            title: "Enter the Wu-Tang (36 Chambers)".to_string(),
            date: NaiveDate::from_ymd_opt(1993, 11, 9).unwrap(),
            path: PathBuf::from("/music/wu"),
            disc_total: 1,
            mb_album_id: None,
            tracks: vec![
                TrackEntry {
                    track_num: 1,
                    disc: 1,
                    title: "Bring da Ruckus".to_string(),
                    artist: None,
                    genre: Some("Hip Hop".to_string()),
                    path: PathBuf::from("/music/wu/01.flac"),
                },
                TrackEntry {
                    track_num: 10,
                    disc: 1,
                    title: "100% Raw".to_string(),
                    artist: Some("Method Man".to_string()),
                    genre: None,
                    path: PathBuf::from("/music/wu/10.flac"),
                },
            ],
            extras: vec![ExtraEntry {
                path: PathBuf::from("/music/wu/cover.jpg"),
            }],
        }
    }

    fn library() -> Library {
        let mut library = Library::open_in_memory().unwrap();
        library.add_album(&entry()).unwrap();
        library
    }

    fn find(library: &Library, query: &str, kind: RecordKind) -> Vec<Record> {
        let query = Query::parse(query, kind).unwrap();
        library.find(kind, query.predicates()).unwrap()
    }

    #[test]
    fn test_open_creates_database_file() {
        let temp = TempDir::new().unwrap();
        let db_path = temp.path().join("nested").join(LIBRARY_DB);

        Library::open(&db_path).unwrap();
        assert!(db_path.exists());

        // Reopening an existing library is fine
        Library::open(&db_path).unwrap();
    }

    #[test]
    fn test_schema_hash_recorded() {
        let library = Library::open_in_memory().unwrap();
        let hash: String = library
            .conn
            .query_row("SELECT value FROM meta WHERE key = 'schema_hash'", [], |row| row.get(0))
            .unwrap();
        assert_eq!(hash, SCHEMA_HASH);
    }

    #[test]
    fn test_add_album_stores_children() {
        let library = library();
        assert_eq!(library.count(RecordKind::Album).unwrap(), 1);
        assert_eq!(library.count(RecordKind::Track).unwrap(), 2);
        assert_eq!(library.count(RecordKind::Extra).unwrap(), 1);
    }

    #[test]
    fn test_add_album_rolls_back_on_duplicate_path() {
        let mut library = library();
        let mut duplicate = entry();
        duplicate.path = PathBuf::from("/music/wu-again");

        // Track paths clash with the first album, so nothing is kept
        assert!(library.add_album(&duplicate).is_err());
        assert_eq!(library.count(RecordKind::Album).unwrap(), 1);
    }

    #[test]
    fn test_find_round_trips_records() {
        let library = library();
        let tracks = find(&library, "track_num:10", RecordKind::Track);
        assert_eq!(tracks.len(), 1);

        match &tracks[0] {
            Record::Track(track) => {
                assert_eq!(track.title, "100% Raw");
                assert_eq!(track.artist, "Method Man");
                assert_eq!(track.genre, None);
                assert_eq!(track.album.title, "Enter the Wu-Tang (36 Chambers)");
                assert_eq!(track.album.date, NaiveDate::from_ymd_opt(1993, 11, 9).unwrap());
            }
            other => panic!("expected track, got {:?}", other),
        }
    }

    #[test]
    fn test_find_like_uses_slash_escape() {
        let library = library();
        assert_eq!(find(&library, "title:100/%%", RecordKind::Track).len(), 1);
        assert_eq!(find(&library, "title:100/_%", RecordKind::Track).len(), 0);
        assert_eq!(find(&library, "title:bring%", RecordKind::Track).len(), 1);
        assert_eq!(find(&library, "title:abc/", RecordKind::Track).len(), 0);
    }

    #[test]
    fn test_find_regex_is_case_insensitive_search() {
        let library = library();
        assert_eq!(find(&library, "title::RUCK", RecordKind::Track).len(), 1);
        assert_eq!(find(&library, "track_num::^1", RecordKind::Track).len(), 2);
        // NULL genre never matches, not even an everything-regex
        assert_eq!(find(&library, "genre::.*", RecordKind::Track).len(), 1);
    }

    #[test]
    fn test_find_derived_and_album_fields() {
        let library = library();
        assert_eq!(find(&library, "year:1993 albumartist:wu-tang%", RecordKind::Track).len(), 2);
        assert_eq!(find(&library, "date:1993-11-__", RecordKind::Album).len(), 1);
        assert_eq!(find(&library, "filename:cover.jpg", RecordKind::Extra).len(), 1);
        assert_eq!(find(&library, "*", RecordKind::Extra).len(), 1);
    }

    #[test]
    fn test_build_select_binds_values() {
        let query = Query::parse("title:100/%% artist::a", RecordKind::Track).unwrap();
        let (sql, values) = build_select(RecordKind::Track, query.predicates());

        assert!(sql.contains("t.title LIKE ?1 ESCAPE '/'"));
        assert!(sql.contains("regexp(?2, t.artist)"));
        assert!(sql.ends_with("ORDER BY t.id"));
        assert_eq!(values, vec!["100/%%".to_string(), "a".to_string()]);
    }

    #[test]
    fn test_import_manifest() {
        let temp = TempDir::new().unwrap();
        let manifest = temp.path().join("albums.json");
        std::fs::write(&manifest, serde_json::to_string(&vec![entry()]).unwrap()).unwrap();

        let mut library = Library::open(temp.path().join(LIBRARY_DB)).unwrap();
        let albums = library.import_manifest(&manifest).unwrap();

        assert_eq!(albums.len(), 1);
        assert_eq!(library.count(RecordKind::Track).unwrap(), 2);
    }

    #[test]
    fn test_interrupted_find_surfaces_sqlite_error() {
        let mut library = library();
        library
            .add_album(&AlbumEntry {
                title: "Wu-Tang Forever".to_string(),
                path: PathBuf::from("/music/wu-forever"),
                tracks: vec![],
                extras: vec![],
                ..entry()
            })
            .unwrap();

        // Swap in a regexp() that cancels the running statement on first use
        let handle = library.interrupt_handle();
        library
            .conn
            .create_scalar_function("regexp", 2, FunctionFlags::SQLITE_UTF8, move |_ctx| {
                handle.interrupt();
                Ok(true)
            })
            .unwrap();

        match QueryEngine::new(&library).run("title::wu", RecordKind::Album) {
            Err(QueryError::Store(err)) => match err.downcast_ref::<rusqlite::Error>() {
                Some(rusqlite::Error::SqliteFailure(failure, _)) => {
                    assert_eq!(failure.code, ErrorCode::OperationInterrupted)
                }
                other => panic!("expected interrupt failure, got {:?}", other),
            },
            other => panic!("expected Store error, got {:?}", other),
        }

        // The connection stays usable for the next query
        assert_eq!(find(&library, "title:wu%", RecordKind::Album).len(), 1);
    }
}
