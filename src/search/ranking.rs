//! tf-idf ranking over the inverted index
//!
//! Query weight of a term: `wtq = (1 + log10(tf_q)) * log10(N / df)`.
//! Document weight: `wtd = (1 + log10(tf_d)) / wf_length(doc)`, with no idf
//! factor on the document side. A document's score is `Σ wtd * wtq` over the
//! query terms.
//!
//! Queries are conjunctive: only documents containing every query term are
//! scored, and a query with a term outside the vocabulary matches nothing.

use crate::search::artifacts::{read_index, DOCUMENTS_WITH_LENGTH_FILE};
use crate::search::indexer::Index;
use crate::search::tokenize::tokenize;
use crate::search::IndexError;
use crate::ForageError;
use std::collections::BTreeMap;
use std::path::Path;

/// Weights of one distinct query term
#[derive(Debug, Clone, PartialEq)]
pub struct QueryTermStats {
    pub word: String,
    pub word_id: u32,
    /// Occurrences in the query
    pub tf: u32,
    /// Documents containing the word
    pub df: usize,
    pub idf: f64,
    pub wf: f64,
    pub wtq: f64,
}

/// Share of a document's score contributed by one query term
#[derive(Debug, Clone, PartialEq)]
pub struct TermContribution {
    pub word: String,
    pub tf: u32,
    pub wf_log: f64,
    pub wtd: f64,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    /// 1-based position in the ranking
    pub rank: usize,
    pub doc_id: u32,
    pub score: f64,
    pub name: String,
    pub link: String,
    pub contributions: Vec<TermContribution>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchResults {
    /// Number of matching documents before the top-k cut
    pub total: usize,
    pub hits: Vec<SearchHit>,
    pub terms: Vec<QueryTermStats>,
    /// First query word missing from the vocabulary
    pub unknown_term: Option<String>,
}

impl SearchResults {
    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }
}

/// Query engine over a loaded index with precomputed document lengths
#[derive(Debug, Clone)]
pub struct SearchEngine {
    index: Index,
    wf_lengths: Vec<f64>,
}

impl SearchEngine {
    /// Wraps an index; every document must have a `wf_length`
    pub fn new(index: Index) -> Result<Self, IndexError> {
        let wf_lengths = index
            .documents
            .iter()
            .enumerate()
            .map(|(doc_id, doc)| doc.wf_length.ok_or(IndexError::MissingLength(doc_id as u32)))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { index, wf_lengths })
    }

    /// Loads the index artifacts from `dir`
    ///
    /// A missing artifact is a startup error: the index has to be built and
    /// precomputed before searching.
    pub fn open(dir: &Path) -> Result<Self, ForageError> {
        let index = read_index(dir, DOCUMENTS_WITH_LENGTH_FILE).map_err(|e| match e {
            IndexError::MissingArtifact(path) => ForageError::Startup(format!(
                "missing index artifact {}; run `index` first",
                path.display()
            )),
            other => other.into(),
        })?;
        Ok(Self::new(index)?)
    }

    pub fn document_count(&self) -> usize {
        self.index.documents.len()
    }

    /// Computes the weights of the distinct query terms, in first-seen order
    ///
    /// Returns `Err(word)` with the first word that is not in the vocabulary.
    pub fn analyze_query(&self, query: &str) -> Result<Vec<QueryTermStats>, String> {
        let total_documents = self.document_count() as f64;
        let mut terms: Vec<QueryTermStats> = Vec::new();

        for word in tokenize(query) {
            let Some(word_id) = self.index.vocabulary.id(&word) else {
                return Err(word);
            };
            match terms.iter_mut().find(|t| t.word_id == word_id) {
                Some(term) => term.tf += 1,
                None => terms.push(QueryTermStats {
                    word,
                    word_id,
                    tf: 1,
                    df: 0,
                    idf: 0.0,
                    wf: 0.0,
                    wtq: 0.0,
                }),
            }
        }

        for term in &mut terms {
            term.df = self.index.posting(term.word_id).map_or(0, BTreeMap::len);
            term.idf = if term.df == 0 {
                0.0
            } else {
                (total_documents / term.df as f64).log10()
            };
            term.wf = 1.0 + f64::from(term.tf).log10();
            term.wtq = term.wf * term.idf;
        }
        Ok(terms)
    }

    /// Runs a query and returns the `top_k` best documents
    pub fn search(&self, query: &str, top_k: usize) -> SearchResults {
        let terms = match self.analyze_query(query) {
            Ok(terms) => terms,
            Err(word) => {
                tracing::warn!(word = %word, "Query word not in index, no results");
                return SearchResults {
                    unknown_term: Some(word),
                    ..SearchResults::default()
                };
            }
        };
        if terms.is_empty() {
            return SearchResults::default();
        }

        let postings: Vec<&BTreeMap<u32, u32>> = terms
            .iter()
            .filter_map(|t| self.index.posting(t.word_id))
            .collect();
        let Some(shortest) = postings.iter().min_by_key(|p| p.len()) else {
            return SearchResults::default();
        };

        let mut hits: Vec<SearchHit> = shortest
            .keys()
            .filter(|doc_id| postings.iter().all(|p| p.contains_key(doc_id)))
            .filter_map(|&doc_id| self.score_document(doc_id, &terms, &postings))
            .collect();

        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        let total = hits.len();
        hits.truncate(top_k);
        for (i, hit) in hits.iter_mut().enumerate() {
            hit.rank = i + 1;
        }

        tracing::debug!(query = %query, total, "Search finished");
        SearchResults {
            total,
            hits,
            terms,
            unknown_term: None,
        }
    }

    fn score_document(
        &self,
        doc_id: u32,
        terms: &[QueryTermStats],
        postings: &[&BTreeMap<u32, u32>],
    ) -> Option<SearchHit> {
        let document = self.index.document(doc_id)?;
        let wf_length = *self.wf_lengths.get(doc_id as usize)?;

        let mut contributions = Vec::with_capacity(terms.len());
        for (term, posting) in terms.iter().zip(postings) {
            let tf = *posting.get(&doc_id)?;
            let wf_log = 1.0 + f64::from(tf).log10();
            let wtd = wf_log / wf_length;
            contributions.push(TermContribution {
                word: term.word.clone(),
                tf,
                wf_log,
                wtd,
                score: wtd * term.wtq,
            });
        }

        Some(SearchHit {
            rank: 0,
            doc_id,
            score: contributions.iter().map(|c| c.score).sum(),
            name: document.name.clone(),
            link: document.link.clone(),
            contributions,
        })
    }
}
