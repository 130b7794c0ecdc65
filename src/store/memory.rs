//! In-memory vector store with linear-scan cosine search
//!
//! Readers (`search`, `stats`) share the lock; writers (`add`, `clear`,
//! `remove_document`) take it exclusively. Tokio's RwLock is
//! write-preferring, so a continuous stream of readers cannot starve
//! ingestion.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::errors::{RagError, Result};
use crate::store::similarity::cosine_similarity;
use crate::store::types::{ChunkId, SearchResult, StoreStats, VectorRecord};
use crate::store::VectorStore;

struct StoreInner {
    /// Records in insertion order; upserts keep their original slot
    records: Vec<VectorRecord>,
    /// Chunk id -> index into `records`
    by_id: HashMap<ChunkId, usize>,
    /// Fixed vector dimension, bound by config or first insert
    dimension: Option<usize>,
    /// Whether `dimension` was pinned by configuration
    pinned: bool,
}

/// Linear-scan vector store held entirely in memory
pub struct MemoryVectorStore {
    inner: RwLock<StoreInner>,
}

impl MemoryVectorStore {
    /// Create an unbound store; the first successful add fixes the dimension
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(StoreInner {
                records: Vec::new(),
                by_id: HashMap::new(),
                dimension: None,
                pinned: false,
            }),
        }
    }

    /// Create a store with an explicitly configured dimension
    pub fn with_dimension(dimension: usize) -> Self {
        Self {
            inner: RwLock::new(StoreInner {
                records: Vec::new(),
                by_id: HashMap::new(),
                dimension: Some(dimension),
                pinned: true,
            }),
        }
    }

    /// Validate a batch against the store dimension and itself.
    ///
    /// Returns the dimension the store should be bound to. Runs before any
    /// mutation so a failed add leaves the store untouched.
    fn validate_batch(records: &[VectorRecord], dimension: Option<usize>) -> Result<usize> {
        let expected = match dimension {
            Some(d) => d,
            None => records
                .first()
                .map(|r| r.vector.len())
                .ok_or_else(|| RagError::InvalidArgument("empty record batch".to_string()))?,
        };

        let mut seen = HashSet::with_capacity(records.len());
        for record in records {
            if record.vector.len() != expected {
                return Err(RagError::DimensionMismatch {
                    expected,
                    actual: record.vector.len(),
                });
            }
            if !seen.insert(record.chunk.id) {
                return Err(RagError::DuplicateChunk {
                    chunk_id: record.chunk.id.to_string(),
                });
            }
        }

        Ok(expected)
    }
}

impl Default for MemoryVectorStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VectorStore for MemoryVectorStore {
    async fn add(&self, records: Vec<VectorRecord>) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }

        let mut inner = self.inner.write().await;
        let dimension = Self::validate_batch(&records, inner.dimension)?;
        inner.dimension = Some(dimension);

        let mut inserted = 0usize;
        let mut updated = 0usize;
        for record in records {
            match inner.by_id.get(&record.chunk.id).copied() {
                Some(idx) => {
                    inner.records[idx] = record;
                    updated += 1;
                }
                None => {
                    let idx = inner.records.len();
                    inner.by_id.insert(record.chunk.id, idx);
                    inner.records.push(record);
                    inserted += 1;
                }
            }
        }

        debug!(inserted, updated, total = inner.records.len(), "store add");
        Ok(())
    }

    async fn search(
        &self,
        query: &[f32],
        top_k: usize,
        title_filter: Option<&str>,
    ) -> Result<Vec<SearchResult>> {
        if top_k == 0 {
            return Err(RagError::InvalidArgument("top_k must be > 0".to_string()));
        }

        let inner = self.inner.read().await;
        if inner.records.is_empty() {
            return Ok(Vec::new());
        }

        if let Some(expected) = inner.dimension {
            if query.len() != expected {
                return Err(RagError::DimensionMismatch {
                    expected,
                    actual: query.len(),
                });
            }
        }

        // (score, insertion index) pairs; insertion index breaks score ties
        let mut scored: Vec<(f32, usize)> = inner
            .records
            .iter()
            .enumerate()
            .filter(|(_, r)| title_filter.map_or(true, |t| r.chunk.source.title == t))
            .map(|(idx, r)| (cosine_similarity(query, &r.vector), idx))
            .collect();

        scored.sort_by(|a, b| {
            b.0.partial_cmp(&a.0)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.1.cmp(&b.1))
        });
        scored.truncate(top_k);

        let results = scored
            .into_iter()
            .enumerate()
            .map(|(rank, (score, idx))| {
                let record = &inner.records[idx];
                SearchResult {
                    chunk_id: record.chunk.id,
                    score,
                    text: record.chunk.text.clone(),
                    source: record.chunk.source.clone(),
                    rank,
                }
            })
            .collect();

        Ok(results)
    }

    async fn stats(&self) -> StoreStats {
        let inner = self.inner.read().await;

        let estimated_bytes = inner
            .records
            .iter()
            .map(|r| r.vector.len() * std::mem::size_of::<f32>() + r.chunk.text.len())
            .sum();

        let distinct_documents = inner
            .records
            .iter()
            .map(|r| r.chunk.document_id.as_str())
            .collect::<HashSet<_>>()
            .len();

        StoreStats {
            total_vectors: inner.records.len(),
            dimension: inner.dimension.unwrap_or(0),
            estimated_bytes,
            distinct_documents,
        }
    }

    async fn clear(&self) {
        let mut inner = self.inner.write().await;
        inner.records.clear();
        inner.by_id.clear();
        if !inner.pinned {
            inner.dimension = None;
        }
    }

    async fn remove_document(&self, document_id: &str) -> Result<usize> {
        let mut inner = self.inner.write().await;
        let before = inner.records.len();

        inner.records.retain(|r| r.chunk.document_id != document_id);
        inner.by_id = inner
            .records
            .iter()
            .enumerate()
            .map(|(idx, r)| (r.chunk.id, idx))
            .collect();

        Ok(before - inner.records.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::types::{Chunk, ChunkSource};

    fn record(document_id: &str, position: usize, text: &str, vector: Vec<f32>) -> VectorRecord {
        let source = ChunkSource::new("notes", "md", "general");
        VectorRecord::new(Chunk::new(document_id, position, text.to_string(), source), vector)
    }

    #[tokio::test]
    async fn test_add_binds_dimension_on_first_insert() {
        let store = MemoryVectorStore::new();
        store.add(vec![record("d1", 0, "a", vec![1.0, 0.0])]).await.unwrap();

        let err = store
            .add(vec![record("d1", 1, "b", vec![1.0, 0.0, 0.0])])
            .await
            .unwrap_err();
        assert!(matches!(err, RagError::DimensionMismatch { expected: 2, actual: 3 }));
    }

    #[tokio::test]
    async fn test_duplicate_within_batch_rejected_atomically() {
        let store = MemoryVectorStore::with_dimension(2);
        let a = record("d1", 0, "a", vec![1.0, 0.0]);
        let duplicate = VectorRecord::new(a.chunk.clone(), vec![0.0, 1.0]);

        let err = store.add(vec![a, duplicate]).await.unwrap_err();
        assert!(matches!(err, RagError::DuplicateChunk { .. }));
        assert_eq!(store.stats().await.total_vectors, 0);
    }

    #[tokio::test]
    async fn test_upsert_across_batches_overwrites() {
        let store = MemoryVectorStore::with_dimension(2);
        let original = record("d1", 0, "old text", vec![1.0, 0.0]);
        let mut replacement = original.clone();
        replacement.chunk.text = "new text".to_string();
        replacement.vector = vec![0.0, 1.0];

        store.add(vec![original]).await.unwrap();
        store.add(vec![replacement]).await.unwrap();

        let stats = store.stats().await;
        assert_eq!(stats.total_vectors, 1);

        let results = store.search(&[0.0, 1.0], 1, None).await.unwrap();
        assert_eq!(results[0].text, "new text");
    }

    #[tokio::test]
    async fn test_search_descending_with_insertion_tiebreak() {
        let store = MemoryVectorStore::with_dimension(2);
        store
            .add(vec![
                record("d1", 0, "east", vec![1.0, 0.0]),
                record("d1", 1, "north", vec![0.0, 1.0]),
                record("d1", 2, "east again", vec![2.0, 0.0]),
            ])
            .await
            .unwrap();

        let results = store.search(&[1.0, 0.0], 3, None).await.unwrap();
        assert_eq!(results.len(), 3);
        // east and east-again tie at 1.0; the earlier insert wins
        assert_eq!(results[0].text, "east");
        assert_eq!(results[1].text, "east again");
        assert_eq!(results[2].text, "north");
        assert!(results[0].score >= results[1].score);
        assert!(results[1].score >= results[2].score);
        assert_eq!(results[0].rank, 0);
        assert_eq!(results[2].rank, 2);
    }

    #[tokio::test]
    async fn test_search_empty_store_returns_empty() {
        let store = MemoryVectorStore::new();
        let results = store.search(&[1.0, 0.0], 5, None).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_search_zero_top_k_is_invalid() {
        let store = MemoryVectorStore::new();
        let err = store.search(&[1.0, 0.0], 0, None).await.unwrap_err();
        assert!(matches!(err, RagError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn test_title_filter_is_exact_match() {
        let store = MemoryVectorStore::with_dimension(2);
        let mut other = record("d2", 0, "elsewhere", vec![1.0, 0.0]);
        other.chunk.source.title = "other".to_string();

        store
            .add(vec![record("d1", 0, "here", vec![1.0, 0.0]), other])
            .await
            .unwrap();

        let results = store.search(&[1.0, 0.0], 5, Some("other")).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].text, "elsewhere");
    }

    #[tokio::test]
    async fn test_stats_counts_documents() {
        let store = MemoryVectorStore::with_dimension(2);
        store
            .add(vec![
                record("d1", 0, "a", vec![1.0, 0.0]),
                record("d1", 1, "b", vec![0.0, 1.0]),
                record("d2", 0, "c", vec![1.0, 1.0]),
            ])
            .await
            .unwrap();

        let stats = store.stats().await;
        assert_eq!(stats.total_vectors, 3);
        assert_eq!(stats.distinct_documents, 2);
        assert_eq!(stats.dimension, 2);
        assert!(stats.estimated_bytes > 0);
    }

    #[tokio::test]
    async fn test_clear_is_idempotent() {
        let store = MemoryVectorStore::with_dimension(2);
        store.add(vec![record("d1", 0, "a", vec![1.0, 0.0])]).await.unwrap();

        store.clear().await;
        store.clear().await;

        let stats = store.stats().await;
        assert_eq!(stats.total_vectors, 0);
        // Configured dimension survives a clear
        assert_eq!(stats.dimension, 2);
    }

    #[tokio::test]
    async fn test_remove_document_drops_only_that_document() {
        let store = MemoryVectorStore::with_dimension(2);
        store
            .add(vec![
                record("d1", 0, "a", vec![1.0, 0.0]),
                record("d2", 0, "b", vec![0.0, 1.0]),
            ])
            .await
            .unwrap();

        let removed = store.remove_document("d1").await.unwrap();
        assert_eq!(removed, 1);

        let stats = store.stats().await;
        assert_eq!(stats.total_vectors, 1);
        assert_eq!(stats.distinct_documents, 1);
    }
}
