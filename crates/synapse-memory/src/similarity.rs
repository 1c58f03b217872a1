//! Similarity scoring and top-k ranking shared by every backend.

use std::collections::HashSet;

use synapse_contracts::memory::{MemoryRecord, NO_EXPERIENCES_FOUND, RECALL_SEPARATOR};

/// Scores how relevant a stored document is to a query.
///
/// Higher is more similar. Scores only need to be comparable with each other
/// and with the store's threshold.
pub trait Similarity: Send + Sync {
    fn score(&self, query: &str, document: &str) -> f32;
}

/// Share of the query's lower-cased alphanumeric tokens that also occur in
/// the document, in `[0.0, 1.0]`.
///
/// Only the query side normalises the score, so a long stored solution does
/// not dilute a record whose query matches exactly.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokenOverlap;

impl TokenOverlap {
    fn tokens(text: &str) -> HashSet<String> {
        text.split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .map(str::to_lowercase)
            .collect()
    }
}

impl Similarity for TokenOverlap {
    fn score(&self, query: &str, document: &str) -> f32 {
        let q = Self::tokens(query);
        let d = Self::tokens(document);
        if q.is_empty() || d.is_empty() {
            return 0.0;
        }
        let shared = q.intersection(&d).count();
        shared as f32 / q.len() as f32
    }
}

/// Minimum score a record needs to be recalled by default.
pub const DEFAULT_MIN_SCORE: f32 = 0.3;

/// Pick the `k` records scoring at least `min_score`, best first, and join
/// their content. Records are scored on their query and solution text, not
/// the `Query:`/`Solution:` labels. Ties keep insertion order. Returns the
/// sentinel when nothing qualifies.
pub fn rank(
    records: &[MemoryRecord],
    query: &str,
    k: usize,
    similarity: &dyn Similarity,
    min_score: f32,
) -> String {
    let mut scored: Vec<(f32, String)> = records
        .iter()
        .map(|r| {
            let document = format!("{}\n{}", r.query, r.solution);
            (similarity.score(query, &document), r.content())
        })
        .filter(|(score, _)| *score >= min_score)
        .collect();

    scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
    scored.truncate(k);

    if scored.is_empty() {
        return NO_EXPERIENCES_FOUND.to_string();
    }
    scored
        .into_iter()
        .map(|(_, content)| content)
        .collect::<Vec<_>>()
        .join(RECALL_SEPARATOR)
}
