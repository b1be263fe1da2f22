//! JSON index artifacts
//!
//! | File | Content |
//! |------|---------|
//! | `documents.json` | doc id -> `{name, link}` |
//! | `word_ids.json` | word id -> word |
//! | `posting_list.json` | word id -> {doc id -> tf} |
//! | `documents_w_length.json` | doc id -> `{name, link, wf_length}` |
//!
//! Ids are written as JSON object keys (strings).

use crate::search::indexer::{Document, Index, Vocabulary};
use crate::search::IndexError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

pub const DOCUMENTS_FILE: &str = "documents.json";
pub const WORD_IDS_FILE: &str = "word_ids.json";
pub const POSTING_LIST_FILE: &str = "posting_list.json";
pub const DOCUMENTS_WITH_LENGTH_FILE: &str = "documents_w_length.json";

/// Writes documents, vocabulary and postings into `dir`
pub fn write_index(index: &Index, dir: &Path) -> Result<(), IndexError> {
    fs::create_dir_all(dir)?;

    let documents: BTreeMap<u32, Document> = index
        .documents
        .iter()
        .enumerate()
        .map(|(doc_id, doc)| {
            (
                doc_id as u32,
                Document {
                    wf_length: None,
                    ..doc.clone()
                },
            )
        })
        .collect();
    write_json(&dir.join(DOCUMENTS_FILE), &documents)?;

    let words: BTreeMap<u32, &str> = index
        .vocabulary
        .words()
        .iter()
        .enumerate()
        .map(|(word_id, word)| (word_id as u32, word.as_str()))
        .collect();
    write_json(&dir.join(WORD_IDS_FILE), &words)?;

    let postings: BTreeMap<u32, &BTreeMap<u32, u32>> = index
        .postings
        .iter()
        .enumerate()
        .map(|(word_id, posting)| (word_id as u32, posting))
        .collect();
    write_json(&dir.join(POSTING_LIST_FILE), &postings)?;

    tracing::info!(dir = %dir.display(), "Wrote index artifacts");
    Ok(())
}

/// Writes `documents_w_length.json`; every document must carry a `wf_length`
pub fn write_lengths(index: &Index, dir: &Path) -> Result<(), IndexError> {
    fs::create_dir_all(dir)?;

    let mut documents = BTreeMap::new();
    for (doc_id, doc) in index.documents.iter().enumerate() {
        let doc_id = doc_id as u32;
        if doc.wf_length.is_none() {
            return Err(IndexError::MissingLength(doc_id));
        }
        documents.insert(doc_id, doc);
    }
    write_json(&dir.join(DOCUMENTS_WITH_LENGTH_FILE), &documents)?;

    tracing::info!(dir = %dir.display(), documents = documents.len(), "Wrote document lengths");
    Ok(())
}

/// Reads an index from `dir`, taking the document table from `documents_file`
pub fn read_index(dir: &Path, documents_file: &str) -> Result<Index, IndexError> {
    let documents: BTreeMap<u32, Document> = read_json(&dir.join(documents_file))?;
    let words: BTreeMap<u32, String> = read_json(&dir.join(WORD_IDS_FILE))?;
    let postings: BTreeMap<u32, BTreeMap<u32, u32>> = read_json(&dir.join(POSTING_LIST_FILE))?;

    let documents = dense(documents, "document")?;
    let vocabulary = Vocabulary::from_words(dense(words, "word")?)?;

    let mut dense_postings = vec![BTreeMap::new(); vocabulary.len()];
    for (word_id, posting) in postings {
        let slot = dense_postings.get_mut(word_id as usize).ok_or_else(|| {
            IndexError::Corrupt(format!("posting list for unknown word {}", word_id))
        })?;
        *slot = posting;
    }

    let index = Index {
        documents,
        vocabulary,
        postings: dense_postings,
    };
    index.validate()?;

    tracing::info!(
        dir = %dir.display(),
        documents = index.documents.len(),
        words = index.vocabulary.len(),
        "Loaded index"
    );
    Ok(index)
}

/// Converts an id-keyed map into a vector, requiring ids `0..n`
fn dense<T>(map: BTreeMap<u32, T>, what: &str) -> Result<Vec<T>, IndexError> {
    let mut values = Vec::with_capacity(map.len());
    for (expected, (id, value)) in map.into_iter().enumerate() {
        if id as usize != expected {
            return Err(IndexError::Corrupt(format!(
                "{} ids are not contiguous: expected {}, found {}",
                what, expected, id
            )));
        }
        values.push(value);
    }
    Ok(values)
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), IndexError> {
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer(&mut writer, value)?;
    writer.flush()?;
    Ok(())
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, IndexError> {
    if !path.exists() {
        return Err(IndexError::MissingArtifact(path.to_path_buf()));
    }
    let reader = BufReader::new(File::open(path)?);
    Ok(serde_json::from_reader(reader)?)
}
