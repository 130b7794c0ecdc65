//! Vector storage: persistence, similarity search, introspection
//!
//! Components:
//! - Types: Chunk, VectorRecord, SearchResult, StoreStats
//! - Similarity: cosine scoring with a defined zero-norm policy
//! - Memory store: linear-scan store behind a read/write lock
//!
//! The trait assumes no native vector index; a linear scan is acceptable
//! at the target scale (tens of thousands of chunks) and the interface
//! does not preclude an indexed backend later.

pub mod memory;
pub mod similarity;
pub mod types;

use async_trait::async_trait;

use crate::errors::Result;

pub use memory::MemoryVectorStore;
pub use similarity::cosine_similarity;
pub use types::{Chunk, ChunkId, ChunkSource, SearchResult, StoreStats, VectorRecord};

/// Pluggable storage backend for chunk vectors and metadata
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Bulk-insert records with upsert semantics across batches.
    ///
    /// Fails with `DimensionMismatch` if any vector's length differs from
    /// the store dimension, and with `DuplicateChunk` if a chunk id appears
    /// twice within the same batch. A failed add leaves the store unchanged.
    async fn add(&self, records: Vec<VectorRecord>) -> Result<()>;

    /// Top-k most similar chunks in strictly descending score order, ties
    /// broken by insertion order. `top_k == 0` is `InvalidArgument`; an
    /// empty store returns an empty vec.
    async fn search(
        &self,
        query: &[f32],
        top_k: usize,
        title_filter: Option<&str>,
    ) -> Result<Vec<SearchResult>>;

    /// Read-only snapshot of contents; never fails, never negative.
    async fn stats(&self) -> StoreStats;

    /// Remove every record; idempotent.
    async fn clear(&self);

    /// Remove all chunks of one document; returns how many were dropped.
    async fn remove_document(&self, document_id: &str) -> Result<usize>;
}
