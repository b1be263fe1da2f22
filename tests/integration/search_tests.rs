//! Integration tests for indexing and search
//!
//! Each test writes a TSV extract into a temporary directory, builds the
//! JSON artifacts from it and queries them through `SearchEngine::open`.

use forage::search::{
    build_index_from_path, read_index, write_index, write_lengths, SearchEngine, DOCUMENTS_FILE,
};
use forage::ForageError;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const EXTRACT: &str = "name\tingredients\tlink\n\
Apple Juice\tapple, water\thttps://shop.test/product/1\n\
Apple Pie\tapple, flour, apple\thttps://shop.test/product/2\n\
Still Water\twater\thttps://shop.test/product/3\n";

/// Builds and writes every artifact for `extract` into `dir`
fn build_artifacts(dir: &Path, extract: &str) {
    let input = dir.join("extract.tsv");
    fs::write(&input, extract).unwrap();

    let (mut index, report) = build_index_from_path(&input).unwrap();
    assert_eq!(report.skipped_rows, 0);
    write_index(&index, dir).unwrap();
    index.compute_wf_lengths();
    write_lengths(&index, dir).unwrap();
}

#[test]
fn test_apple_ranking() {
    let dir = TempDir::new().unwrap();
    build_artifacts(dir.path(), EXTRACT);
    let engine = SearchEngine::open(dir.path()).unwrap();

    let results = engine.search("apple", 10);
    assert_eq!(results.total, 2);
    assert_eq!(results.hits[0].name, "Apple Pie");
    assert_eq!(results.hits[0].link, "https://shop.test/product/2");
    assert_eq!(results.hits[1].name, "Apple Juice");

    // apple appears in 2 of 3 documents; pie: apple(3) pie(1) flour(1)
    let idf = (3.0_f64 / 2.0).log10();
    let wf_length = 4.0_f64.log10() + 2.0_f64.log10() + 2.0_f64.log10();
    let expected = (1.0 + 3.0_f64.log10()) / wf_length * idf;
    assert!((results.hits[0].score - expected).abs() < 1e-9);
}

#[test]
fn test_conjunctive_query() {
    let dir = TempDir::new().unwrap();
    build_artifacts(dir.path(), EXTRACT);
    let engine = SearchEngine::open(dir.path()).unwrap();

    let results = engine.search("Apple WATER", 10);
    assert_eq!(results.total, 1);
    assert_eq!(results.hits[0].doc_id, 0);
}

#[test]
fn test_unknown_term_returns_nothing() {
    let dir = TempDir::new().unwrap();
    build_artifacts(dir.path(), EXTRACT);
    let engine = SearchEngine::open(dir.path()).unwrap();

    let results = engine.search("apple mango", 10);
    assert!(results.is_empty());
    assert_eq!(results.unknown_term.as_deref(), Some("mango"));
}

#[test]
fn test_tie_break_by_document_order() {
    let dir = TempDir::new().unwrap();
    build_artifacts(
        dir.path(),
        "name\ttext\tlink\nB\tsalt\tl0\nA\tsalt\tl1\nC\tsalt\tl2\n",
    );
    let engine = SearchEngine::open(dir.path()).unwrap();

    let results = engine.search("salt", 10);
    let names: Vec<&str> = results.hits.iter().map(|h| h.name.as_str()).collect();
    assert_eq!(names, vec!["B", "A", "C"]);
}

#[test]
fn test_open_without_artifacts_is_startup_error() {
    let dir = TempDir::new().unwrap();
    let result = SearchEngine::open(dir.path());
    assert!(matches!(result, Err(ForageError::Startup(_))));
}

#[test]
fn test_precompute_from_base_artifacts() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("extract.tsv");
    fs::write(&input, EXTRACT).unwrap();
    let (index, _) = build_index_from_path(&input).unwrap();
    write_index(&index, dir.path()).unwrap();

    // lengths not written yet
    assert!(SearchEngine::open(dir.path()).is_err());

    let mut loaded = read_index(dir.path(), DOCUMENTS_FILE).unwrap();
    loaded.compute_wf_lengths();
    write_lengths(&loaded, dir.path()).unwrap();

    let engine = SearchEngine::open(dir.path()).unwrap();
    assert_eq!(engine.document_count(), 3);
    assert_eq!(engine.search("water", 10).total, 2);
}
