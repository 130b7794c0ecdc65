//! Error types for the saferag retrieval pipeline.
//!
//! One taxonomy for the whole crate: configuration and argument faults,
//! store faults, and embedding-capability faults. Policy rejections are
//! not errors; they are a normal query outcome (see `pipeline`).

use thiserror::Error;

/// Main error type for the retrieval-and-safety pipeline
#[derive(Error, Debug)]
pub enum RagError {
    /// Invalid component configuration (fatal at construction)
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Invalid argument to an otherwise well-configured component
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Vector length differs from the store's fixed dimension
    #[error("Dimension mismatch: store expects {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Chunk identifier collided within a single ingestion batch
    #[error("Duplicate chunk {chunk_id} in batch")]
    DuplicateChunk { chunk_id: String },

    /// Embedding capability is down (fatal, not retryable)
    #[error("Embedding backend unavailable: {0}")]
    EmbeddingUnavailable(String),

    /// Embedding call exceeded its deadline (retryable)
    #[error("Embedding timed out after {timeout_ms}ms")]
    EmbeddingTimeout { timeout_ms: u64 },

    /// Guardrails scanning fault; the request proceeds as allowed
    #[error("Guardrails engine degraded: {0}")]
    EngineDegraded(String),

    /// Backing store cannot be reached
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    /// HTTP client errors
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl RagError {
    /// Whether a retry with backoff is worth attempting
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            RagError::EmbeddingTimeout { .. } | RagError::StorageUnavailable(_)
        )
    }
}

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, RagError>;
