//! Inverted index construction
//!
//! Input rows are tab-separated extracted records whose first field is the
//! product name and whose last field is the page link. Tokenization runs in
//! parallel; document and word ids are then assigned in a single sequential
//! pass, so the result does not depend on thread scheduling.

use crate::search::tokenize::tokenize;
use crate::search::IndexError;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// One indexed record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub name: String,
    pub link: String,
    /// `Σ log10(1 + tf)` over the document's words, once precomputed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wf_length: Option<f64>,
}

/// Bidirectional word <-> id map; ids are assigned in first-seen order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Vocabulary {
    words: Vec<String>,
    ids: HashMap<String, u32>,
}

impl Vocabulary {
    /// Returns the id of `word`, assigning the next id if it is new
    pub fn intern(&mut self, word: &str) -> u32 {
        if let Some(&id) = self.ids.get(word) {
            return id;
        }
        let id = self.words.len() as u32;
        self.words.push(word.to_string());
        self.ids.insert(word.to_string(), id);
        id
    }

    pub fn id(&self, word: &str) -> Option<u32> {
        self.ids.get(word).copied()
    }

    pub fn word(&self, id: u32) -> Option<&str> {
        self.words.get(id as usize).map(String::as_str)
    }

    /// Words in id order
    pub fn words(&self) -> &[String] {
        &self.words
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Builds a vocabulary from words listed in id order
    pub(crate) fn from_words(words: Vec<String>) -> Result<Self, IndexError> {
        let mut ids = HashMap::with_capacity(words.len());
        for (id, word) in words.iter().enumerate() {
            if ids.insert(word.clone(), id as u32).is_some() {
                return Err(IndexError::Corrupt(format!("duplicate word '{}'", word)));
            }
        }
        Ok(Self { words, ids })
    }
}

/// Documents, vocabulary and postings (`word id -> doc id -> tf`)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Index {
    pub documents: Vec<Document>,
    pub vocabulary: Vocabulary,
    pub postings: Vec<BTreeMap<u32, u32>>,
}

impl Index {
    /// Documents that contain `word_id`, with term frequencies
    pub fn posting(&self, word_id: u32) -> Option<&BTreeMap<u32, u32>> {
        self.postings.get(word_id as usize)
    }

    pub fn document(&self, doc_id: u32) -> Option<&Document> {
        self.documents.get(doc_id as usize)
    }

    /// Computes `wf_length` for every document
    pub fn compute_wf_lengths(&mut self) {
        let mut lengths = vec![0.0_f64; self.documents.len()];
        for posting in &self.postings {
            for (&doc_id, &tf) in posting {
                if let Some(length) = lengths.get_mut(doc_id as usize) {
                    *length += (1.0 + f64::from(tf)).log10();
                }
            }
        }
        for (document, length) in self.documents.iter_mut().zip(lengths) {
            document.wf_length = Some(length);
        }
    }

    /// Checks that every posting refers to a known document and word
    pub(crate) fn validate(&self) -> Result<(), IndexError> {
        if self.postings.len() != self.vocabulary.len() {
            return Err(IndexError::Corrupt(format!(
                "{} posting lists for {} words",
                self.postings.len(),
                self.vocabulary.len()
            )));
        }
        let doc_count = self.documents.len();
        for (word_id, posting) in self.postings.iter().enumerate() {
            if let Some((&doc_id, _)) = posting
                .iter()
                .find(|&(&doc_id, &tf)| doc_id as usize >= doc_count || tf == 0)
            {
                return Err(IndexError::Corrupt(format!(
                    "posting of word {} has invalid entry for document {}",
                    word_id, doc_id
                )));
            }
        }
        Ok(())
    }
}

/// Outcome counts of an index build
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildReport {
    pub rows: usize,
    pub documents: usize,
    pub skipped_rows: usize,
    pub words: usize,
}

struct ParsedRow {
    name: String,
    link: String,
    tokens: Vec<String>,
}

fn parse_row(line: &str) -> Result<ParsedRow, usize> {
    let fields: Vec<&str> = line.split('\t').collect();
    if fields.len() < 2 {
        return Err(fields.len());
    }

    let decode = |s: &str| html_escape::decode_html_entities(s).into_owned();
    let text = decode(&fields[..fields.len() - 1].join(" "));

    Ok(ParsedRow {
        name: decode(fields[0]),
        link: decode(fields[fields.len() - 1]),
        tokens: tokenize(&text),
    })
}

/// Builds an index from TSV rows; the first line is a header and is skipped
///
/// Rows with fewer than two fields are logged and skipped.
pub fn build_index<R: BufRead>(reader: R) -> Result<(Index, BuildReport), IndexError> {
    let mut lines = Vec::new();
    for (line_no, line) in reader.lines().enumerate().skip(1) {
        lines.push((line_no + 1, line?));
    }

    let parsed: Vec<(usize, Result<ParsedRow, usize>)> = lines
        .par_iter()
        .map(|(line_no, line)| (*line_no, parse_row(line.trim())))
        .collect();

    let mut index = Index::default();
    let mut report = BuildReport {
        rows: parsed.len(),
        ..BuildReport::default()
    };

    for (line_no, row) in parsed {
        let row = match row {
            Ok(row) => row,
            Err(field_count) => {
                tracing::warn!(line = line_no, fields = field_count, "Skipping malformed row");
                report.skipped_rows += 1;
                continue;
            }
        };

        let doc_id = index.documents.len() as u32;
        for token in &row.tokens {
            let word_id = index.vocabulary.intern(token);
            if word_id as usize == index.postings.len() {
                index.postings.push(BTreeMap::new());
            }
            *index.postings[word_id as usize].entry(doc_id).or_insert(0) += 1;
        }
        index.documents.push(Document {
            name: row.name,
            link: row.link,
            wf_length: None,
        });
    }

    report.documents = index.documents.len();
    report.words = index.vocabulary.len();
    tracing::info!(
        documents = report.documents,
        words = report.words,
        skipped = report.skipped_rows,
        "Built index"
    );
    Ok((index, report))
}

/// Builds an index from a TSV file
pub fn build_index_from_path(path: &Path) -> Result<(Index, BuildReport), IndexError> {
    let file = File::open(path).map_err(|e| IndexError::Input {
        path: path.to_path_buf(),
        source: e,
    })?;
    build_index(BufReader::new(file))
}
