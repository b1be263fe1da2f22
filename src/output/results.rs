//! Terminal rendering of search results

use crate::search::SearchResults;
use std::fmt::Write;

/// Formats search results
///
/// With `explain`, every hit is followed by the query term weights and the
/// contribution of each term to the hit's score.
pub fn render_results(results: &SearchResults, explain: bool) -> String {
    let mut out = String::new();

    if results.is_empty() {
        let _ = writeln!(out, "No results found.");
        return out;
    }

    let _ = writeln!(out, "Total results: {}", results.total);
    if explain {
        for term in &results.terms {
            let _ = writeln!(
                out,
                "   term '{}': tf={} df={} idf={:.6} wf={:.6} wtq={:.6}",
                term.word, term.tf, term.df, term.idf, term.wf, term.wtq
            );
        }
    }

    for hit in &results.hits {
        let _ = writeln!(out, "{}. Document ID: {}, Score: {}", hit.rank, hit.doc_id, hit.score);
        let _ = writeln!(out, "   Title: {}", hit.name);
        let _ = writeln!(out, "   URL: {}", hit.link);
        if explain {
            for c in &hit.contributions {
                let _ = writeln!(
                    out,
                    "     {}: tf={} wf={:.6} wtd={:.6} score={:.6}",
                    c.word, c.tf, c.wf_log, c.wtd, c.score
                );
            }
        }
        let _ = writeln!(out);
    }
    out
}

pub fn print_results(results: &SearchResults, explain: bool) {
    print!("{}", render_results(results, explain));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::{QueryTermStats, SearchHit, TermContribution};

    fn results() -> SearchResults {
        SearchResults {
            total: 3,
            hits: vec![SearchHit {
                rank: 1,
                doc_id: 4,
                score: 0.5,
                name: "Apple Juice".to_string(),
                link: "https://e.org/product/4".to_string(),
                contributions: vec![TermContribution {
                    word: "apple".to_string(),
                    tf: 2,
                    wf_log: 1.30103,
                    wtd: 0.25,
                    score: 0.5,
                }],
            }],
            terms: vec![QueryTermStats {
                word: "apple".to_string(),
                word_id: 0,
                tf: 1,
                df: 3,
                idf: 2.0,
                wf: 1.0,
                wtq: 2.0,
            }],
            unknown_term: None,
        }
    }

    #[test]
    fn test_render_hits() {
        let text = render_results(&results(), false);
        assert_eq!(
            text,
            "Total results: 3\n\
             1. Document ID: 4, Score: 0.5\n   \
             Title: Apple Juice\n   \
             URL: https://e.org/product/4\n\n"
        );
    }

    #[test]
    fn test_render_explain() {
        let text = render_results(&results(), true);
        assert!(text.contains("term 'apple': tf=1 df=3"));
        assert!(text.contains("apple: tf=2 wf=1.301030 wtd=0.250000 score=0.500000"));
    }

    #[test]
    fn test_render_empty() {
        assert_eq!(
            render_results(&SearchResults::default(), true),
            "No results found.\n"
        );
    }
}
