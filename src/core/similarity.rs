//! Similarity engine - bag-of-words cosine ranking of historical RCAs
//!
//! Each indexed RCA is a term-frequency vector whose norm is computed once at
//! insertion. Queries are scored against every vector; there is no
//! corpus-relative weighting, so inserting one RCA never changes the score of
//! another.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock};

use crate::core::identity::EntityId;
use crate::core::normalize::TokenBag;

/// Default similarity threshold
pub const DEFAULT_THRESHOLD: f64 = 0.3;

/// Default number of matches shown for an incident
pub const DEFAULT_MAX_MATCHES: usize = 5;

/// Term-frequency vector with its precomputed Euclidean norm
#[derive(Debug, Clone, PartialEq)]
pub struct TermVector {
    weights: BTreeMap<String, f64>,
    norm: f64,
}

impl TermVector {
    pub fn from_tokens(tokens: &TokenBag) -> Self {
        let weights: BTreeMap<String, f64> = tokens
            .iter()
            .map(|(token, count)| (token.to_string(), f64::from(count)))
            .collect();
        let norm = weights.values().map(|w| w * w).sum::<f64>().sqrt();
        Self { weights, norm }
    }

    pub fn norm(&self) -> f64 {
        self.norm
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    /// Cosine similarity in [0, 1]; 0 when either vector is empty
    pub fn cosine(&self, other: &TermVector) -> f64 {
        if self.norm == 0.0 || other.norm == 0.0 {
            return 0.0;
        }
        let (small, large) = if self.weights.len() <= other.weights.len() {
            (self, other)
        } else {
            (other, self)
        };
        let dot: f64 = small
            .weights
            .iter()
            .filter_map(|(token, w)| large.weights.get(token).map(|v| w * v))
            .sum();
        (dot / (self.norm * other.norm)).clamp(0.0, 1.0)
    }
}

/// One ranked candidate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarityMatch {
    pub rca_id: EntityId,
    pub score: f64,
}

#[derive(Debug)]
struct IndexedRca {
    vector: TermVector,
    indexed_at: DateTime<Utc>,
    /// Insertion order; higher is more recent
    sequence: u64,
}

#[derive(Debug, Default)]
struct Corpus {
    entries: BTreeMap<EntityId, IndexedRca>,
    next_sequence: u64,
}

/// In-process corpus of historical RCAs
///
/// Writers take the exclusive lock only to swap in a fully built vector, so a
/// poisoned lock never guards a half-written entry and is recovered.
#[derive(Debug, Default)]
pub struct SimilarityIndex {
    corpus: RwLock<Corpus>,
}

impl SimilarityIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index an RCA, replacing its previous vector if present
    ///
    /// A replaced RCA keeps its position in the recency order.
    pub fn insert(&self, rca_id: EntityId, tokens: &TokenBag) {
        let vector = TermVector::from_tokens(tokens);
        let indexed_at = Utc::now();

        let mut corpus = self.corpus.write().unwrap_or_else(PoisonError::into_inner);
        let sequence = match corpus.entries.get(&rca_id) {
            Some(existing) => existing.sequence,
            None => {
                corpus.next_sequence += 1;
                corpus.next_sequence
            }
        };
        tracing::debug!(rca = %rca_id, terms = vector.weights.len(), "indexed rca");
        corpus.entries.insert(
            rca_id,
            IndexedRca {
                vector,
                indexed_at,
                sequence,
            },
        );
    }

    /// Drop an RCA from the corpus; returns whether it was indexed
    pub fn remove(&self, rca_id: &EntityId) -> bool {
        let mut corpus = self.corpus.write().unwrap_or_else(PoisonError::into_inner);
        corpus.entries.remove(rca_id).is_some()
    }

    pub fn contains(&self, rca_id: &EntityId) -> bool {
        let corpus = self.corpus.read().unwrap_or_else(PoisonError::into_inner);
        corpus.entries.contains_key(rca_id)
    }

    /// When this RCA was last indexed
    pub fn indexed_at(&self, rca_id: &EntityId) -> Option<DateTime<Utc>> {
        let corpus = self.corpus.read().unwrap_or_else(PoisonError::into_inner);
        corpus.entries.get(rca_id).map(|e| e.indexed_at)
    }

    pub fn len(&self) -> usize {
        let corpus = self.corpus.read().unwrap_or_else(PoisonError::into_inner);
        corpus.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All RCAs scoring at least `threshold`, best first
    ///
    /// Equal scores put the most recently indexed RCA first, then order by id.
    pub fn rank(&self, query: &TokenBag, threshold: f64) -> Vec<SimilarityMatch> {
        self.rank_top(query, threshold, None)
    }

    /// As [`Self::rank`], keeping at most `limit` matches
    pub fn rank_top(
        &self,
        query: &TokenBag,
        threshold: f64,
        limit: Option<usize>,
    ) -> Vec<SimilarityMatch> {
        let query = TermVector::from_tokens(query);
        let corpus = self.corpus.read().unwrap_or_else(PoisonError::into_inner);

        if corpus.entries.is_empty() {
            tracing::debug!("similarity corpus is empty");
            return Vec::new();
        }

        let mut scored: Vec<(f64, u64, &EntityId)> = corpus
            .entries
            .iter()
            .map(|(id, entry)| (query.cosine(&entry.vector), entry.sequence, id))
            .filter(|(score, _, _)| *score >= threshold)
            .collect();

        scored.sort_by(|a, b| {
            b.0.total_cmp(&a.0)
                .then_with(|| b.1.cmp(&a.1))
                .then_with(|| a.2.cmp(b.2))
        });
        if let Some(limit) = limit {
            scored.truncate(limit);
        }

        tracing::debug!(
            corpus = corpus.entries.len(),
            matches = scored.len(),
            threshold,
            "ranked incident"
        );
        scored
            .into_iter()
            .map(|(score, _, id)| SimilarityMatch {
                rca_id: id.clone(),
                score,
            })
            .collect()
    }
}
