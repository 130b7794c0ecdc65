//! Retrieval pipeline: orchestration of chunking, embedding, storage,
//! and guardrails
//!
//! Data flows one way for ingestion (chunk -> embed -> store) and
//! round-trip for serving (validate query -> embed -> search -> sanitize
//! results -> ranked answer).

pub mod retrieval;

pub use retrieval::{
    AnswerSet, IngestReport, PipelineConfig, PipelineTiming, PolicyRejection, QueryOutcome,
    RankedPassage, RetrievalPipeline,
};
