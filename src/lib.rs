//! SafeRAG - retrieval with built-in guardrails
//!
//! A retrieval-and-safety pipeline between raw user queries and ranked
//! text passages: documents are chunked and vector-indexed, queries are
//! similarity-ranked against them, and a guardrails layer validates both
//! directions against content-safety, privacy, and rate-limit policies
//! while keeping an auditable violation ledger.
//!
//! # Architecture
//!
//! - **chunker**: overlapping windows over document text
//! - **embedding**: external vector capability behind a trait
//! - **store**: pluggable vector storage with cosine search
//! - **guardrails**: policy enforcement + violation ledger
//! - **pipeline**: ingestion and serving orchestration

pub mod chunker;
pub mod cli;
pub mod config;
pub mod embedding;
pub mod errors;
pub mod guardrails;
pub mod pipeline;
pub mod store;

// Re-export commonly used types
pub use errors::{RagError, Result};
pub use pipeline::{QueryOutcome, RetrievalPipeline};
