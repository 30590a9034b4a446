//! End-to-end tests of loading, indexing and match navigation through the
//! public API, using files on disk.

mod fixtures;

use fixtures::utils::{Recorder, write_fixture};
use std::path::Path;
use std::time::Duration;
use tabula::{
    Coordinate, Document, IndexStatus, LoadCoordinator, LoadError, LoadState, MatchNavigator,
    ParserOptions, SearchIndex, ViewerConfig,
};

fn config() -> ViewerConfig {
    ViewerConfig {
        flush_rows: 3,
        ..ViewerConfig::default()
    }
}

#[test]
fn test_row_count_matches_records_outside_quotes() {
    let content = "id,note\n1,\"first\nline\"\n2,plain\n3,\"x,y\"\"z\"\"\"\n";
    let (_dir, path) = write_fixture("notes.csv", content);

    let mut loader = LoadCoordinator::new();
    let mut recorder = Recorder::default();
    loader.start_load(&path, ParserOptions::default()).unwrap();
    assert_eq!(loader.wait(&mut recorder), LoadState::Completed);

    let table = loader.table().unwrap();
    assert_eq!(table.row_count(), 4);
    assert_eq!(table.cell(1, 1), Some("first\nline"));
    assert_eq!(table.cell(3, 1), Some("x,y\"z\""));
    assert_eq!(recorder.completed, 1);
}

#[test]
fn test_quoted_separator_scenario() {
    let (_dir, path) = write_fixture("pairs.csv", "a,b\n\"c,d\",e\n");

    let mut loader = LoadCoordinator::new();
    let mut recorder = Recorder::default();
    loader.start_load(&path, ParserOptions::default()).unwrap();
    loader.wait(&mut recorder);

    let table = loader.table().unwrap();
    let rows: Vec<Vec<String>> = table.rows().map(|r| r.fields().to_vec()).collect();
    assert_eq!(rows, vec![vec!["a", "b"], vec!["c,d", "e"]]);
    assert_eq!(recorder.progress.iter().filter(|&&p| p == 1.0).count(), 1);
    assert_eq!(recorder.progress.last(), Some(&1.0));
}

#[test]
fn test_cancel_mid_load() {
    let content = "alpha,beta,\"gamma, delta\"\n".repeat(400_000);
    let (_dir, path) = write_fixture("big.csv", content);

    let mut loader = LoadCoordinator::new();
    let mut recorder = Recorder::default();
    loader.start_load(&path, ParserOptions::default()).unwrap();

    // Let the worker get going before cancelling
    while loader.rows_loaded() == 0 {
        std::thread::sleep(Duration::from_millis(1));
    }
    loader.cancel();

    assert_eq!(loader.state(), LoadState::Cancelled);
    let frozen = loader.table().unwrap().row_count();
    assert_eq!(loader.rows_loaded(), frozen);

    std::thread::sleep(Duration::from_millis(50));
    assert_eq!(loader.pump(&mut recorder), LoadState::Cancelled);
    assert_eq!(loader.rows_loaded(), frozen);
    assert_eq!(loader.table().unwrap().row_count(), frozen);
    assert_eq!(recorder.completed, 0);
    assert!(recorder.errors.is_empty());
}

#[test]
fn test_empty_file() {
    let (_dir, path) = write_fixture("empty.csv", "");

    let mut doc = Document::open(&path, "csv", &config()).unwrap();
    let mut recorder = Recorder::default();
    assert!(matches!(
        doc.wait_until_indexed(&mut recorder),
        IndexStatus::Ready(_)
    ));

    assert_eq!(recorder.completed, 1);
    assert_eq!(doc.table().unwrap().row_count(), 0);
    assert!(doc.query("anything").unwrap().is_empty());
    assert!(doc.query("a").unwrap().is_empty());
}

#[test]
fn test_apple_banana_scenario() {
    let (_dir, path) = write_fixture("fruit.tsv", "apple\tbanana\ncherry\tapple\n");

    let mut doc = Document::open(&path, "tsv", &config()).unwrap();
    let mut recorder = Recorder::default();
    doc.wait_until_indexed(&mut recorder);
    assert_eq!(recorder.index_ready, 1);

    let hits = doc.query("apple").unwrap();
    assert_eq!(hits, vec![Coordinate::new(0, 0), Coordinate::new(1, 1)]);
    assert_eq!(doc.navigator().current(), Some(Coordinate::new(0, 0)));
}

#[test]
fn test_readd_yields_same_results() {
    let mut once = SearchIndex::new();
    once.add(Coordinate::new(0, 0), "apple").unwrap();
    once.add(Coordinate::new(1, 1), "apple tart").unwrap();
    once.flush();

    let mut twice = SearchIndex::new();
    for _ in 0..2 {
        twice.add(Coordinate::new(0, 0), "apple").unwrap();
        twice.add(Coordinate::new(1, 1), "apple tart").unwrap();
        twice.flush();
    }

    let mut a = once.search("apple");
    let mut b = twice.search("apple");
    a.sort();
    b.sort();
    assert_eq!(a, b);
    assert_eq!(a.len(), 2);
}

#[test]
fn test_navigator_full_cycle() {
    let (_dir, path) = write_fixture(
        "cycle.csv",
        "x,a1,b\nc,d,a2\na3,e,f\nnothing,here,at all\n",
    );
    let mut doc = Document::open(&path, "csv", &config()).unwrap();
    doc.wait_until_indexed(&mut ());

    let hits = doc.query("a").unwrap();
    let expected = vec![
        Coordinate::new(0, 1),
        Coordinate::new(1, 2),
        Coordinate::new(2, 0),
        Coordinate::new(3, 2),
    ];
    assert_eq!(hits, expected);

    let mut seen = Vec::new();
    for _ in 0..hits.len() {
        seen.push(doc.advance_match(true).unwrap());
    }
    // One full cycle visits every match once and lands back on the first
    assert_eq!(seen.last(), Some(&expected[0]));
    let mut sorted = seen.clone();
    sorted.sort();
    assert_eq!(sorted, expected);

    let mut nav = MatchNavigator::new();
    nav.set_results(hits.into_iter().rev().collect());
    assert_eq!(nav.previous(), Some(Coordinate::new(3, 2)));
}

#[test]
fn test_flush_progress_reported() {
    let content: String = (0..10).map(|i| format!("row{i},value{i}\n")).collect();
    let (_dir, path) = write_fixture("ten.csv", content);

    let mut doc = Document::open(&path, "csv", &config()).unwrap();
    let mut recorder = Recorder::default();
    doc.wait_until_indexed(&mut recorder);

    assert_eq!(
        recorder.index_progress,
        vec![(3, 10), (6, 10), (9, 10), (10, 10)]
    );
    assert_eq!(doc.query("value7").unwrap(), vec![Coordinate::new(7, 1)]);
}

#[test]
fn test_pump_drives_load_and_index() {
    let (_dir, path) = write_fixture("pump.csv", "one,two\nthree,four\n");
    let mut doc = Document::open(&path, "csv", &config()).unwrap();
    let mut recorder = Recorder::default();

    let mut status = doc.pump(&mut recorder);
    for _ in 0..5000 {
        if matches!(status, IndexStatus::Ready(_)) {
            break;
        }
        std::thread::sleep(Duration::from_millis(1));
        status = doc.pump(&mut recorder);
    }

    assert!(matches!(status, IndexStatus::Ready(_)));
    assert_eq!(recorder.completed, 1);
    assert_eq!(doc.query("four").unwrap(), vec![Coordinate::new(1, 1)]);
}

#[test]
fn test_close_during_load() {
    let content = "some,text,here\n".repeat(300_000);
    let (_dir, path) = write_fixture("close.csv", content);

    let mut doc = Document::open(&path, "csv", &config()).unwrap();
    let mut recorder = Recorder::default();
    doc.close();

    assert_eq!(doc.load_state(), LoadState::Cancelled);
    assert_eq!(doc.pump(&mut recorder), IndexStatus::Stopped);
    assert_eq!(recorder.completed, 0);
}

#[test]
fn test_legacy_encoding_detected() {
    // windows-1252 without a byte-order mark
    let bytes = b"name,city\nRen\xE9,Z\xFCrich\n".to_vec();
    let (_dir, path) = write_fixture("legacy.csv", bytes);

    let mut loader = LoadCoordinator::new();
    loader.start_load(&path, ParserOptions::default()).unwrap();
    assert_eq!(loader.wait(&mut ()), LoadState::Completed);
    let table = loader.table().unwrap();
    assert_eq!(table.cell(1, 0), Some("René"));
    assert_eq!(table.cell(1, 1), Some("Zürich"));

    let mut doc = Document::open(&path, "csv", &config()).unwrap();
    doc.wait_until_indexed(&mut ());
    assert_eq!(doc.query("zürich").unwrap(), vec![Coordinate::new(1, 1)]);
}

#[test]
fn test_legacy_encoding_with_hint() {
    // "café,naïve" in windows-1252
    let bytes = b"caf\xE9,na\xEFve\n".to_vec();
    let (_dir, path) = write_fixture("hinted.csv", bytes);

    let mut loader = LoadCoordinator::new();
    let options = ParserOptions {
        encoding: Some("windows-1252".to_string()),
        ..ParserOptions::default()
    };
    loader.start_load(&path, options).unwrap();
    loader.wait(&mut ());
    assert_eq!(loader.table().unwrap().cell(0, 0), Some("café"));
    assert_eq!(loader.table().unwrap().cell(0, 1), Some("naïve"));
}

#[test]
fn test_missing_file() {
    let result = Document::open(Path::new("/no/such/dir/file.csv"), "csv", &config());
    assert!(matches!(result, Err(LoadError::Source(_))));
}
