//! In-memory corpus of embedded chunks with exact cosine search.
//!
//! The corpus is an immutable snapshot behind an `Arc`. Writers build a new
//! `Vec` and swap the pointer under a short write lock; readers clone the
//! pointer and scan without holding the lock, so every search sees one
//! complete corpus.

use log::debug;
use serde::Serialize;
use std::sync::{Arc, RwLock};

use crate::embeddings::Embedding;
use crate::error::{RagError, Result};

/// A stored chunk with its embedding and originating file name
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkRecord {
    pub text: String,
    pub embedding: Embedding,
    pub source: String,
}

impl ChunkRecord {
    pub fn new(text: impl Into<String>, embedding: Embedding, source: impl Into<String>) -> Self {
        ChunkRecord {
            text: text.into(),
            embedding,
            source: source.into(),
        }
    }
}

/// A search hit
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredChunk {
    pub text: String,
    pub score: f32,
    pub source: String,
}

/// Holds exactly one corpus at a time
#[derive(Debug, Default)]
pub struct VectorStore {
    corpus: RwLock<Arc<Vec<ChunkRecord>>>,
}

impl VectorStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Discard the current corpus and install `records` in its place.
    ///
    /// All records must share one embedding dimension; otherwise the store is
    /// left untouched.
    pub fn replace_all(&self, records: Vec<ChunkRecord>) -> Result<()> {
        if let Some(first) = records.first() {
            let expected = first.embedding.dimension();
            if let Some(bad) = records
                .iter()
                .find(|r| r.embedding.dimension() != expected)
            {
                return Err(RagError::DimensionMismatch {
                    expected,
                    actual: bad.embedding.dimension(),
                });
            }
        }

        debug!("Replacing corpus with {} records", records.len());
        let snapshot = Arc::new(records);
        *self.corpus.write().unwrap_or_else(|e| e.into_inner()) = snapshot;
        Ok(())
    }

    pub fn clear(&self) {
        *self.corpus.write().unwrap_or_else(|e| e.into_inner()) = Arc::new(Vec::new());
    }

    pub fn size(&self) -> usize {
        self.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot().is_empty()
    }

    /// Embedding dimension of the current corpus, if any records are loaded
    pub fn dimension(&self) -> Option<usize> {
        self.snapshot().first().map(|r| r.embedding.dimension())
    }

    /// Current corpus as an immutable snapshot
    pub fn snapshot(&self) -> Arc<Vec<ChunkRecord>> {
        Arc::clone(&self.corpus.read().unwrap_or_else(|e| e.into_inner()))
    }

    /// Rank every stored chunk by cosine similarity to the query.
    ///
    /// Exact scan; equal scores keep insertion order.
    pub fn search(&self, query: &Embedding, top_n: usize) -> Vec<ScoredChunk> {
        let corpus = self.snapshot();

        let mut scored: Vec<ScoredChunk> = corpus
            .iter()
            .map(|record| ScoredChunk {
                text: record.text.clone(),
                score: cosine_similarity(&query.values, &record.embedding.values),
                source: record.source.clone(),
            })
            .collect();

        // sort_by is stable
        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        scored.truncate(top_n);
        scored
    }
}

/// Cosine similarity, `0.0` when either vector has zero norm or the lengths differ.
///
/// Accumulates in `f64` so large components do not overflow the norms.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let mut dot_product = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (&x, &y) in a.iter().zip(b.iter()) {
        let (x, y) = (x as f64, y as f64);
        dot_product += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    let similarity = dot_product / (norm_a.sqrt() * norm_b.sqrt());
    if similarity.is_finite() {
        similarity.clamp(-1.0, 1.0) as f32
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(text: &str, values: Vec<f32>) -> ChunkRecord {
        ChunkRecord::new(text, Embedding::new(values), "doc.txt")
    }

    #[test]
    fn identical_vectors_have_similarity_one() {
        let v = [0.3, -1.2, 4.0, 0.5];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn zero_vector_has_similarity_zero() {
        assert_eq!(cosine_similarity(&[1.0, 2.0], &[0.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[0.0, 0.0]), 0.0);
    }

    #[test]
    fn opposite_and_orthogonal_vectors() {
        assert!((cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]) + 1.0).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 3.0]), 0.0);
    }

    #[test]
    fn large_components_do_not_overflow() {
        let v = [1e20, 1e20];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
        assert!((cosine_similarity(&[3e38, 0.0], &[-3e38, 0.0]) + 1.0).abs() < 1e-6);

        let store = VectorStore::new();
        store
            .replace_all(
                (0..40)
                    .map(|k| record(&k.to_string(), vec![1.0, k as f32]))
                    .collect(),
            )
            .unwrap();

        let results = store.search(&Embedding::new(vec![1e20, 0.0]), 40);
        assert_eq!(results.len(), 40);
        assert!(results.iter().all(|r| r.score.is_finite()));
        assert_eq!(results[0].text, "0");
        assert!((results[0].score - 1.0).abs() < 1e-6);
        let expected = 1.0 / (1.0f32 + 3.0 * 3.0).sqrt();
        assert!((results[3].score - expected).abs() < 1e-6);
        assert!(results.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[test]
    fn search_on_empty_store_is_empty() {
        let store = VectorStore::new();
        assert!(store.search(&Embedding::new(vec![1.0, 0.0]), 5).is_empty());
        assert_eq!(store.size(), 0);
        assert_eq!(store.dimension(), None);
    }

    #[test]
    fn search_ranks_by_descending_similarity() {
        let store = VectorStore::new();
        store
            .replace_all(vec![
                record("orthogonal", vec![0.0, 1.0]),
                record("exact", vec![1.0, 0.0]),
                record("close", vec![0.9, 0.1]),
                record("opposite", vec![-1.0, 0.0]),
            ])
            .unwrap();

        let results = store.search(&Embedding::new(vec![1.0, 0.0]), 10);
        let texts: Vec<&str> = results.iter().map(|r| r.text.as_str()).collect();
        assert_eq!(texts, vec!["exact", "close", "orthogonal", "opposite"]);
        assert!(results.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[test]
    fn search_respects_top_n_and_corpus_size() {
        let store = VectorStore::new();
        store
            .replace_all(
                (0..8)
                    .map(|i| record(&i.to_string(), vec![1.0, i as f32]))
                    .collect(),
            )
            .unwrap();

        let query = Embedding::new(vec![1.0, 1.0]);
        assert_eq!(store.search(&query, 3).len(), 3);
        assert_eq!(store.search(&query, 100).len(), 8);
        assert!(store.search(&query, 0).is_empty());
    }

    #[test]
    fn equal_scores_keep_insertion_order() {
        let store = VectorStore::new();
        store
            .replace_all(vec![
                record("first", vec![2.0, 0.0]),
                record("low", vec![0.0, 1.0]),
                record("second", vec![1.0, 0.0]),
                record("third", vec![5.0, 0.0]),
            ])
            .unwrap();

        let results = store.search(&Embedding::new(vec![1.0, 0.0]), 3);
        let texts: Vec<&str> = results.iter().map(|r| r.text.as_str()).collect();
        assert_eq!(texts, vec!["first", "second", "third"]);
    }

    #[test]
    fn replace_all_discards_previous_corpus() {
        let store = VectorStore::new();
        store
            .replace_all(vec![record("a", vec![1.0]), record("b", vec![1.0])])
            .unwrap();
        store.replace_all(vec![record("c", vec![1.0])]).unwrap();

        assert_eq!(store.size(), 1);
        assert_eq!(store.snapshot()[0].text, "c");

        store.clear();
        assert!(store.is_empty());
    }

    #[test]
    fn mixed_dimensions_are_rejected_without_touching_the_corpus() {
        let store = VectorStore::new();
        store.replace_all(vec![record("old", vec![1.0, 0.0])]).unwrap();

        let err = store
            .replace_all(vec![record("x", vec![1.0, 0.0]), record("y", vec![1.0])])
            .unwrap_err();
        assert!(matches!(
            err,
            RagError::DimensionMismatch {
                expected: 2,
                actual: 1
            }
        ));
        assert_eq!(store.snapshot()[0].text, "old");
    }

    #[test]
    fn concurrent_readers_never_see_a_mixed_corpus() {
        let store = VectorStore::new();
        let corpus = |source: &str, n: usize| -> Vec<ChunkRecord> {
            (0..n)
                .map(|i| {
                    let embedding = Embedding::new(vec![1.0, i as f32]);
                    ChunkRecord::new(format!("{source}{i}"), embedding, source)
                })
                .collect()
        };
        store.replace_all(corpus("a", 10)).unwrap();

        std::thread::scope(|scope| {
            scope.spawn(|| {
                for round in 0..200 {
                    let next = if round % 2 == 0 {
                        corpus("b", 20)
                    } else {
                        corpus("a", 10)
                    };
                    store.replace_all(next).unwrap();
                }
            });

            for _ in 0..4 {
                scope.spawn(|| {
                    let query = Embedding::new(vec![1.0, 1.0]);
                    for _ in 0..200 {
                        let results = store.search(&query, 100);
                        let source = &results[0].source;
                        assert!(results.iter().all(|r| &r.source == source));
                        let expected = if source == "a" { 10 } else { 20 };
                        assert_eq!(results.len(), expected);
                    }
                });
            }
        });
    }
}
