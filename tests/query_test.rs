//! Query engine tests against both store implementations
//!
//! Every query runs against the in-memory store and the SQLite library; the
//! two must agree before a result is checked.


use anyhow::anyhow;
use std::sync::atomic::{AtomicUsize, Ordering};
use test_helpers::*;
use tunedex::{Predicate, QueryEngine, QueryError, Record, RecordKind, Store};

/// Run a query on both stores, assert they agree and return the records
fn query(query_str: &str, kind: RecordKind) -> Vec<Record> {
    let memory = memory_store();
    let (_temp, library) = library();

    let from_memory = QueryEngine::new(&memory).run(query_str, kind).unwrap();
    let from_library = QueryEngine::new(&library).run(query_str, kind).unwrap();

    assert_eq!(
        from_memory, from_library,
        "MemoryStore and Library disagree on '{}' ({})",
        query_str, kind
    );
    assert_all_kind(&from_memory, kind);
    from_memory
}

fn titles(records: &[Record]) -> Vec<String> {
    records
        .iter()
        .map(|record| match record {
            Record::Track(track) => track.title.clone(),
            Record::Album(album) => album.title.clone(),
            Record::Extra(extra) => extra.filename().into_owned(),
        })
        .collect()
}

/// Store that counts calls and never matches anything
#[derive(Default)]
struct CountingStore {
    calls: AtomicUsize,
}

impl Store for CountingStore {
    fn find(&self, _kind: RecordKind, _predicates: &[Predicate]) -> anyhow::Result<Vec<Record>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Vec::new())
    }
}

/// Store whose every lookup fails with an I/O error
struct FailingStore;

impl Store for FailingStore {
    fn find(&self, _kind: RecordKind, _predicates: &[Predicate]) -> anyhow::Result<Vec<Record>> {
        Err(anyhow!(std::io::Error::new(std::io::ErrorKind::TimedOut, "library timed out")))
    }
}

#[test]
fn test_conjunction_of_terms() {
    let found = query(r#""artist:wu-tang clan" title:a%"#, RecordKind::Track);
    assert_eq!(titles(&found), vec!["Adventure"]);
    assert_eq!(
        summaries(&found),
        vec!["Wu-Tang Clan - Enter the Wu-Tang (36 Chambers) - Adventure"]
    );

    let found = query("artist:wu-tang% title:a%", RecordKind::Track);
    assert_eq!(titles(&found), vec!["Adventure"]);
}

#[test]
fn test_like_matches_whole_value() {
    assert!(query("artist:wu-tang title:a%", RecordKind::Track).is_empty());
    assert_eq!(query("title:bravo", RecordKind::Track).len(), 1);
    assert!(query("title:brav", RecordKind::Track).is_empty());
}

#[test]
fn test_field_names_and_values_ignore_case() {
    let lower = query(r#""artist:wu-tang clan""#, RecordKind::Track);
    let mixed = query(r#""ARTIST:wU-tAnG cLaN""#, RecordKind::Track);

    assert_eq!(lower, mixed);
    assert_eq!(titles(&lower), vec!["Adventure", "Bravo", "Reunited", "Triumph"]);
}

#[test]
fn test_like_wildcards_and_escapes() {
    assert_eq!(titles(&query("title:100/%%", RecordKind::Track)), vec!["100% Raw"]);
    assert_eq!(titles(&query(r#""title:100/% RAW""#, RecordKind::Track)), vec!["100% Raw"]);
    assert!(query(r#""title:100x raw""#, RecordKind::Track).is_empty());
    assert!(query("title:100/_%", RecordKind::Track).is_empty());

    assert_eq!(query("year:199_", RecordKind::Album).len(), 3);
    assert_eq!(titles(&query("year:1995", RecordKind::Album)), vec!["Liquid Swords"]);
    assert_eq!(titles(&query("date:1997-__-__", RecordKind::Album)), vec!["Wu-Tang Forever"]);
}

#[test]
fn test_regex_search() {
    assert_eq!(titles(&query("title::^a", RecordKind::Track)), vec!["Adventure"]);
    assert_eq!(titles(&query("title::IRON", RecordKind::Track)), vec!["Duel of the Iron Mic"]);
    assert_eq!(titles(&query("track_num::^2$", RecordKind::Track)), vec!["Bravo", "Duel of the Iron Mic"]);
    assert_eq!(
        titles(&query(r"'filename::\.(jpg|png)$'", RecordKind::Extra)),
        vec!["cover.jpg", "folder.png"]
    );
}

#[test]
fn test_missing_values_never_match() {
    let with_genre = query("genre:%", RecordKind::Track);
    assert_eq!(with_genre.len(), 6);
    assert!(!titles(&with_genre).contains(&"100% Raw".to_string()));

    assert_eq!(query("genre::.*", RecordKind::Track).len(), 6);

    let with_mbid = query("mb_album_id:%", RecordKind::Track);
    assert_eq!(with_mbid.len(), 2);
    assert!(with_mbid.iter().all(|r| match r {
        Record::Track(track) => track.album.artist == "GZA",
        _ => false,
    }));
}

#[test]
fn test_wildcard_matches_every_record_of_kind() {
    assert_eq!(ids(&query("*", RecordKind::Track)), vec![1, 2, 3, 4, 5, 6, 7]);
    assert_eq!(ids(&query("*", RecordKind::Album)), vec![1, 2, 3]);
    assert_eq!(ids(&query("*", RecordKind::Extra)), vec![1, 2, 3]);
    assert_eq!(titles(&query("* title:a%", RecordKind::Track)), vec!["Adventure"]);
}

#[test]
fn test_album_fields_on_tracks_and_extras() {
    assert_eq!(
        titles(&query(r#""album:liquid swords""#, RecordKind::Track)),
        vec!["Liquid Swords", "Duel of the Iron Mic"]
    );
    assert_eq!(query("albumartist:gza", RecordKind::Track).len(), 2);
    assert_eq!(
        titles(&query("album_path:%36-chambers", RecordKind::Extra)),
        vec!["cover.jpg", "rip.log"]
    );
    // Slashes in paths are escapes, so a literal path doubles them
    assert_eq!(query("album_path://music//gza//liquid-swords", RecordKind::Track).len(), 2);
    assert!(query("album_path:/music/gza/liquid-swords", RecordKind::Track).is_empty());
    assert_eq!(titles(&query("disc:2", RecordKind::Track)), vec!["Triumph"]);
}

#[test]
fn test_empty_result_is_not_an_error() {
    let store = memory_store();
    let found = QueryEngine::new(&store).run("artist:nobody", RecordKind::Track);
    assert!(matches!(found, Ok(ref items) if items.is_empty()));
}

#[test]
fn test_same_query_twice_gives_same_results() {
    let store = memory_store();
    let engine = QueryEngine::new(&store);
    let first = engine.run("artist:wu-tang% genre::hop", RecordKind::Track).unwrap();
    let second = engine.run("artist:wu-tang% genre::hop", RecordKind::Track).unwrap();
    assert_eq!(first, second);
    assert!(!first.is_empty());
}

#[test]
fn test_empty_query_never_reaches_store() {
    let engine = QueryEngine::new(CountingStore::default());

    for empty in ["", "   ", "\t\n"] {
        assert!(matches!(engine.run(empty, RecordKind::Track), Err(QueryError::EmptyQuery)));
    }
    assert_eq!(engine.store().calls.load(Ordering::SeqCst), 0);
}

#[test]
fn test_invalid_input_never_reaches_store() {
    let engine = QueryEngine::new(CountingStore::default());

    match engine.run("title::(", RecordKind::Track) {
        Err(QueryError::InvalidRegex { pattern, .. }) => assert_eq!(pattern, "("),
        other => panic!("expected InvalidRegex, got {:?}", other),
    }
    match engine.run("bogus:1", RecordKind::Track) {
        Err(QueryError::UnknownField { name, kind }) => {
            assert_eq!(name, "bogus");
            assert_eq!(kind, RecordKind::Track);
        }
        other => panic!("expected UnknownField, got {:?}", other),
    }
    assert!(matches!(
        engine.run("artist:gza badtoken", RecordKind::Track),
        Err(QueryError::MalformedTerm(ref token)) if token == "badtoken"
    ));
    assert!(matches!(
        engine.run("track_num:1", RecordKind::Album),
        Err(QueryError::UnknownField { .. })
    ));
    assert_eq!(engine.store().calls.load(Ordering::SeqCst), 0);

    engine.run("artist:gza", RecordKind::Track).unwrap();
    assert_eq!(engine.store().calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_store_errors_pass_through_unchanged() {
    let engine = QueryEngine::new(FailingStore);
    match engine.run("*", RecordKind::Track) {
        Err(QueryError::Store(err)) => {
            let io = err.downcast_ref::<std::io::Error>().expect("io::Error preserved");
            assert_eq!(io.kind(), std::io::ErrorKind::TimedOut);
        }
        other => panic!("expected Store error, got {:?}", other),
    }
}

#[test]
fn test_concurrent_queries_share_one_store() {
    let store = memory_store();
    let engine = QueryEngine::new(&store);
    let queries = ["*", "artist:wu-tang%", "title::^a", "genre:%", "albumartist:gza", "year:1997"];

    let expected: Vec<Vec<Record>> = queries
        .iter()
        .map(|q| engine.run(q, RecordKind::Track).unwrap())
        .collect();

    std::thread::scope(|scope| {
        let handles: Vec<_> = queries
            .iter()
            .map(|q| {
                let engine = &engine;
                scope.spawn(move || engine.run(q, RecordKind::Track).unwrap())
            })
            .collect();

        for (handle, expected) in handles.into_iter().zip(&expected) {
            assert_eq!(&handle.join().unwrap(), expected);
        }
    });
}
