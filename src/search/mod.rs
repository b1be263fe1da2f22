//! Inverted index and tf-idf search over extracted page records
//!
//! - `tokenize`: lowercase ASCII alphanumeric tokens
//! - `indexer`: documents, vocabulary and postings from a TSV extract
//! - `artifacts`: JSON files the index is persisted to
//! - `ranking`: conjunctive tf-idf query evaluation

mod artifacts;
mod indexer;
mod ranking;
mod tokenize;

pub use artifacts::{
    read_index, write_index, write_lengths, DOCUMENTS_FILE, DOCUMENTS_WITH_LENGTH_FILE,
    POSTING_LIST_FILE, WORD_IDS_FILE,
};
pub use indexer::{build_index, build_index_from_path, BuildReport, Document, Index, Vocabulary};
pub use ranking::{QueryTermStats, SearchEngine, SearchHit, SearchResults, TermContribution};
pub use tokenize::tokenize;

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while building, persisting or loading an index
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("Failed to read index input {}: {source}", .path.display())]
    Input {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Missing index artifact: {}", .0.display())]
    MissingArtifact(PathBuf),

    #[error("Corrupt index: {0}")]
    Corrupt(String),

    #[error("Document {0} has no precomputed wf_length")]
    MissingLength(u32),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
