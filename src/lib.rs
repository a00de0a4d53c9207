//! tunedex: query engine for a local music library
//!
//! Items (tracks, albums and extra files) are selected with a small query
//! language of `field:value` terms joined by AND.
//!
//! # Architecture
//!
//! - **Query**: tokenizes the query string, parses terms, resolves fields and
//!   compiles predicates (`query` module)
//! - **Store**: anything that can return the records satisfying a list of
//!   predicates; `MemoryStore` in-process, `Library` on SQLite
//! - **CLI**: the `tdx` binary (`ls`, `info`, `add`, `fields`)
//!
//! # Example Usage
//!
//! ```no_run
//! use tunedex::{Library, QueryEngine, RecordKind};
//!
//! let library = Library::open("library.db").unwrap();
//! let engine = QueryEngine::new(&library);
//!
//! for album in engine.run("year:199_", RecordKind::Album).unwrap() {
//!     println!("{}", album);
//! }
//! ```

pub mod cli;
pub mod config;
pub mod library;
pub mod models;
pub mod output;
pub mod query;
pub mod store;

// Re-export commonly used types
pub use config::Config;
pub use library::Library;
pub use models::{Album, AlbumEntry, Extra, ExtraEntry, FieldValue, Record, RecordKind, Track, TrackEntry};
pub use query::{FieldDescriptor, Predicate, Query, QueryEngine, QueryError};
pub use store::{MemoryStore, Store};
