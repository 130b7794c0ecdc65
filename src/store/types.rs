//! Core data types for chunked, vector-indexed storage

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for chunks
pub type ChunkId = Uuid;

/// Where a chunk came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkSource {
    /// Document title
    pub title: String,
    /// Origin type (file extension, URL scheme, "inline", ...)
    pub origin: String,
    /// Collection/category tag
    pub category: String,
}

impl ChunkSource {
    pub fn new(title: impl Into<String>, origin: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            origin: origin.into(),
            category: category.into(),
        }
    }
}

/// Immutable unit of ingested text
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    /// Unique chunk identifier
    pub id: ChunkId,
    /// Owning document identifier
    pub document_id: String,
    /// Ordinal position within the document (0-based)
    pub position: usize,
    /// Raw chunk text
    pub text: String,
    /// Character count of `text`
    pub char_count: usize,
    /// Source metadata
    pub source: ChunkSource,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl Chunk {
    /// Create a new chunk at the given document position
    pub fn new(document_id: impl Into<String>, position: usize, text: String, source: ChunkSource) -> Self {
        let char_count = text.chars().count();
        Self {
            id: Uuid::new_v4(),
            document_id: document_id.into(),
            position,
            text,
            char_count,
            source,
            created_at: Utc::now(),
        }
    }
}

/// Association between a chunk and its embedding
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorRecord {
    /// The embedded chunk
    pub chunk: Chunk,
    /// Fixed-dimension embedding vector
    pub vector: Vec<f32>,
    /// Last-updated timestamp
    pub updated_at: DateTime<Utc>,
}

impl VectorRecord {
    pub fn new(chunk: Chunk, vector: Vec<f32>) -> Self {
        Self {
            chunk,
            vector,
            updated_at: Utc::now(),
        }
    }
}

/// Ranked search hit, computed per query and never persisted
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    /// Matched chunk identifier
    pub chunk_id: ChunkId,
    /// Cosine similarity score (higher = more similar)
    pub score: f32,
    /// Chunk text at match time
    pub text: String,
    /// Source metadata copied from the chunk
    pub source: ChunkSource,
    /// Position in the returned ordering (0-based)
    pub rank: usize,
}

/// Read-only snapshot of store contents
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreStats {
    /// Total stored vectors
    pub total_vectors: usize,
    /// Configured dimension (0 until first insert binds it)
    pub dimension: usize,
    /// Estimated storage size in bytes
    pub estimated_bytes: usize,
    /// Distinct owning documents
    pub distinct_documents: usize,
}
