//! End-to-end retrieval pipeline

use std::sync::Arc;
use std::time::Instant;

use futures_util::stream::{self, StreamExt, TryStreamExt};
use serde::{Deserialize, Serialize};
use tokio::time::{sleep, timeout, Duration};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::chunker::{Chunker, ChunkerConfig};
use crate::embedding::Embedder;
use crate::errors::{RagError, Result};
use crate::guardrails::{GuardrailsEngine, Violation, ViolationKind};
use crate::store::{ChunkSource, SearchResult, StoreStats, VectorRecord, VectorStore};

/// Pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Default number of results when the caller does not say
    pub top_k: usize,
    /// Optional relevance floor; results scoring below it are dropped
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_score: Option<f32>,
    /// Deadline for a single embedding call
    pub embed_timeout_ms: u64,
    /// Bounded retries for transient embedding faults
    pub embed_retries: u32,
    /// Concurrent embedding calls during ingestion
    pub embed_concurrency: usize,
    /// Chunking parameters for ingestion
    pub chunker: ChunkerConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            top_k: 5,
            min_score: None,
            embed_timeout_ms: 5000,
            embed_retries: 2,
            embed_concurrency: 8,
            chunker: ChunkerConfig::default(),
        }
    }
}

/// One sanitized result with its residual violations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedPassage {
    /// The underlying search hit; `text` is already sanitized
    pub result: SearchResult,
    /// Non-blocking violations found while sanitizing this passage
    pub violations: Vec<Violation>,
}

/// Per-stage wall-clock timing
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct PipelineTiming {
    pub embed_ms: u64,
    pub search_ms: u64,
    pub sanitize_ms: u64,
    pub total_ms: u64,
}

/// Ranked, policy-compliant answer to a query
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerSet {
    /// Original query text
    pub query: String,
    /// Ranked, sanitized passages
    pub passages: Vec<RankedPassage>,
    /// Non-blocking violations recorded against the query itself
    pub query_violations: Vec<Violation>,
    /// Stage timings
    pub timing: PipelineTiming,
}

/// Structured rejection: kinds and severities, never raw offending text
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyRejection {
    /// Everything recorded for the rejected request
    pub violations: Vec<Violation>,
}

impl PolicyRejection {
    /// Kinds of the violations that caused the block
    pub fn blocking_kinds(&self) -> Vec<ViolationKind> {
        self.violations
            .iter()
            .filter(|v| v.is_blocking())
            .map(|v| v.kind)
            .collect()
    }
}

/// Outcome of a query: ranked results or a structured rejection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum QueryOutcome {
    Answered(AnswerSet),
    Rejected(PolicyRejection),
}

/// Ingestion receipt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestReport {
    /// Identifier assigned to the ingested document
    pub document_id: String,
    /// Number of chunks stored
    pub chunks: usize,
    /// Wall-clock time for the whole ingestion
    pub elapsed_ms: u64,
}

/// Orchestrates chunker, embedder, store, and guardrails
pub struct RetrievalPipeline {
    chunker: Chunker,
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
    guardrails: Arc<GuardrailsEngine>,
    config: PipelineConfig,
}

impl RetrievalPipeline {
    /// Create a pipeline with default configuration
    pub fn new(
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn VectorStore>,
        guardrails: Arc<GuardrailsEngine>,
    ) -> Result<Self> {
        Self::with_config(embedder, store, guardrails, PipelineConfig::default())
    }

    /// Create a pipeline with custom configuration
    pub fn with_config(
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn VectorStore>,
        guardrails: Arc<GuardrailsEngine>,
        config: PipelineConfig,
    ) -> Result<Self> {
        let chunker = Chunker::new(config.chunker)?;
        Ok(Self {
            chunker,
            embedder,
            store,
            guardrails,
            config,
        })
    }

    /// Ingest one document: chunk, embed, store.
    ///
    /// Embedding runs with bounded concurrency; the store add is a single
    /// batch, so a failed ingestion leaves the store unchanged.
    pub async fn ingest_document(
        &self,
        title: &str,
        text: &str,
        origin: &str,
        category: &str,
    ) -> Result<IngestReport> {
        let started = Instant::now();
        let document_id = Uuid::new_v4().to_string();
        let source = ChunkSource::new(title, origin, category);

        let chunks: Vec<_> = self.chunker.chunk(&document_id, source, text).collect();
        if chunks.is_empty() {
            return Ok(IngestReport {
                document_id,
                chunks: 0,
                elapsed_ms: started.elapsed().as_millis() as u64,
            });
        }

        let records: Vec<VectorRecord> = stream::iter(chunks.into_iter().map(|chunk| async move {
            let vector = self.embed_with_retry(&chunk.text).await?;
            Ok::<_, RagError>(VectorRecord::new(chunk, vector))
        }))
        .buffered(self.config.embed_concurrency)
        .try_collect()
        .await?;

        let stored = records.len();
        self.store.add(records).await?;

        let report = IngestReport {
            document_id,
            chunks: stored,
            elapsed_ms: started.elapsed().as_millis() as u64,
        };
        info!(
            document_id = %report.document_id,
            chunks = report.chunks,
            elapsed_ms = report.elapsed_ms,
            "document ingested"
        );
        Ok(report)
    }

    /// Answer a query: validate, embed, search, sanitize.
    pub async fn answer_query(
        &self,
        text: &str,
        identity: &str,
        top_k: usize,
        title_filter: Option<&str>,
    ) -> Result<QueryOutcome> {
        let started = Instant::now();

        let verdict = self.guardrails.validate_query(text, identity).await;
        if !verdict.allowed {
            return Ok(QueryOutcome::Rejected(PolicyRejection {
                violations: verdict.violations,
            }));
        }

        let embed_started = Instant::now();
        let query_vector = self.embed_with_retry(text).await?;
        let embed_ms = embed_started.elapsed().as_millis() as u64;

        let search_started = Instant::now();
        let mut results = self.store.search(&query_vector, top_k, title_filter).await?;
        if let Some(floor) = self.config.min_score {
            results.retain(|r| r.score >= floor);
        }
        let search_ms = search_started.elapsed().as_millis() as u64;

        let sanitize_started = Instant::now();
        let mut passages = Vec::with_capacity(results.len());
        for mut result in results {
            let sanitized = self
                .guardrails
                .validate_response(&result.text, text, identity)
                .await;
            result.text = sanitized.text;
            passages.push(RankedPassage {
                result,
                violations: sanitized.violations,
            });
        }
        let sanitize_ms = sanitize_started.elapsed().as_millis() as u64;

        debug!(
            identity,
            passages = passages.len(),
            embed_ms,
            search_ms,
            "query answered"
        );

        Ok(QueryOutcome::Answered(AnswerSet {
            query: text.to_string(),
            passages,
            query_violations: verdict.violations,
            timing: PipelineTiming {
                embed_ms,
                search_ms,
                sanitize_ms,
                total_ms: started.elapsed().as_millis() as u64,
            },
        }))
    }

    /// Embed with a per-call deadline and bounded backoff on transient
    /// faults. `EmbeddingUnavailable` is fatal and surfaces immediately.
    async fn embed_with_retry(&self, text: &str) -> Result<Vec<f32>> {
        let deadline = Duration::from_millis(self.config.embed_timeout_ms);
        let mut attempt = 0u32;

        loop {
            let outcome = match timeout(deadline, self.embedder.embed(text)).await {
                Ok(result) => result,
                Err(_) => Err(RagError::EmbeddingTimeout {
                    timeout_ms: self.config.embed_timeout_ms,
                }),
            };

            match outcome {
                Ok(vector) => return Ok(vector),
                Err(e) if e.is_retryable() && attempt < self.config.embed_retries => {
                    attempt += 1;
                    warn!(attempt, error = %e, "embedding retry");
                    sleep(Duration::from_millis(100 * u64::from(attempt))).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Snapshot of the backing store
    pub async fn store_stats(&self) -> StoreStats {
        self.store.stats().await
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }
}
