//! Command-line interface for driving the pipeline
//!
//! One-shot commands over an in-process store: ingest files and query
//! them, preview chunking, or scan text through the guardrails.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;

use crate::chunker::{Chunker, ChunkerConfig};
use crate::config::Config;
use crate::embedding::{Embedder, MockEmbedder, OllamaEmbedder};
use crate::guardrails::{GuardrailState, GuardrailsEngine};
use crate::pipeline::{QueryOutcome, RetrievalPipeline};
use crate::store::{ChunkSource, MemoryVectorStore};

#[derive(Parser)]
#[command(name = "saferag", version, about = "Grounded retrieval with built-in guardrails")]
pub struct Cli {
    /// Enable debug logging
    #[arg(long, global = true)]
    pub verbose: bool,

    /// Ollama server URL (overrides config; default is the mock embedder)
    #[arg(long, global = true)]
    pub ollama_url: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Ingest documents and answer a query against them
    Query {
        /// Query text
        text: String,
        /// Files to ingest before querying (repeatable)
        #[arg(short, long = "file")]
        files: Vec<PathBuf>,
        /// Number of results to return
        #[arg(long)]
        top_k: Option<usize>,
        /// Acting identity for rate limiting and the violation ledger
        #[arg(long, default_value = "local")]
        identity: String,
        /// Restrict the search to one document title
        #[arg(long)]
        title_filter: Option<String>,
    },
    /// Validate a query through the guardrails and show the verdict
    Scan {
        /// Text to scan
        text: String,
        /// Acting identity
        #[arg(long, default_value = "local")]
        identity: String,
    },
    /// Preview how a file would be chunked
    Chunk {
        /// File to chunk
        file: PathBuf,
        /// Chunk size in characters
        #[arg(long)]
        size: Option<usize>,
        /// Overlap in characters
        #[arg(long)]
        overlap: Option<usize>,
    },
}

/// Build the embedder from config/flags: HTTP when a URL is known,
/// otherwise the deterministic mock.
fn build_embedder(config: &Config, ollama_url: &Option<String>) -> Arc<dyn Embedder> {
    let url = ollama_url.clone().or_else(|| config.embedding.ollama_url.clone());
    match url {
        Some(url) => Arc::new(OllamaEmbedder::new(
            url,
            config.embedding.model.clone(),
            config.embedding.dimension,
        )),
        None => Arc::new(MockEmbedder::new()),
    }
}

fn build_pipeline(config: &Config, ollama_url: &Option<String>) -> Result<RetrievalPipeline> {
    let state = Arc::new(GuardrailState::new(&config.guardrails));
    let guardrails = Arc::new(GuardrailsEngine::with_config(
        state,
        config.guardrails.clone(),
    )?);
    let pipeline = RetrievalPipeline::with_config(
        build_embedder(config, ollama_url),
        Arc::new(MemoryVectorStore::new()),
        guardrails,
        config.pipeline.clone(),
    )?;
    Ok(pipeline)
}

pub async fn run_query(
    config: &Config,
    ollama_url: &Option<String>,
    text: &str,
    files: &[PathBuf],
    top_k: Option<usize>,
    identity: &str,
    title_filter: Option<&str>,
) -> Result<()> {
    let pipeline = build_pipeline(config, ollama_url)?;

    for file in files {
        let contents = std::fs::read_to_string(file)
            .with_context(|| format!("Failed to read {}", file.display()))?;
        let title = file
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "untitled".to_string());
        let origin = file
            .extension()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "txt".to_string());

        let report = pipeline
            .ingest_document(&title, &contents, &origin, "general")
            .await?;
        println!(
            "{} {} ({} chunks, {}ms)",
            "ingested".green(),
            title.bold(),
            report.chunks,
            report.elapsed_ms
        );
    }

    let top_k = top_k.unwrap_or(config.pipeline.top_k);
    let outcome = pipeline
        .answer_query(text, identity, top_k, title_filter)
        .await?;

    match outcome {
        QueryOutcome::Rejected(rejection) => {
            println!("{}", "query rejected by policy".red().bold());
            for kind in rejection.blocking_kinds() {
                println!("  blocking violation: {}", kind.as_str().red());
            }
        }
        QueryOutcome::Answered(answer) => {
            if answer.passages.is_empty() {
                println!("{}", "no matching passages".yellow());
            }
            for passage in &answer.passages {
                println!(
                    "{} {} {}",
                    format!("#{}", passage.result.rank + 1).bold(),
                    passage.result.source.title.cyan(),
                    format!("(score {:.3})", passage.result.score).dimmed()
                );
                println!("  {}", passage.result.text.trim().replace('\n', "\n  "));
                for violation in &passage.violations {
                    println!(
                        "  {} {} ({})",
                        "note:".yellow(),
                        violation.message,
                        violation.severity.as_str()
                    );
                }
            }
            for violation in &answer.query_violations {
                println!(
                    "{} {} ({})",
                    "query note:".yellow(),
                    violation.message,
                    violation.severity.as_str()
                );
            }
            println!(
                "{}",
                format!(
                    "embed {}ms | search {}ms | sanitize {}ms | total {}ms",
                    answer.timing.embed_ms,
                    answer.timing.search_ms,
                    answer.timing.sanitize_ms,
                    answer.timing.total_ms
                )
                .dimmed()
            );
        }
    }

    Ok(())
}

pub async fn run_scan(config: &Config, text: &str, identity: &str) -> Result<()> {
    let state = Arc::new(GuardrailState::new(&config.guardrails));
    let engine = GuardrailsEngine::with_config(state, config.guardrails.clone())?;

    let verdict = engine.validate_query(text, identity).await;
    if verdict.allowed {
        println!("{}", "allowed".green().bold());
    } else {
        println!("{}", "blocked".red().bold());
    }
    for violation in &verdict.violations {
        println!(
            "  [{}] {} - {}",
            violation.severity.as_str(),
            violation.kind.as_str(),
            violation.message
        );
    }

    let summary = engine.violations_summary(24).await;
    println!(
        "{}",
        format!(
            "ledger: {} violations / {} identities in the last 24h",
            summary.total, summary.distinct_identities
        )
        .dimmed()
    );

    Ok(())
}

pub fn run_chunk(
    config: &Config,
    file: &PathBuf,
    size: Option<usize>,
    overlap: Option<usize>,
) -> Result<()> {
    let contents = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;

    let chunker_config = ChunkerConfig {
        chunk_size: size.unwrap_or(config.pipeline.chunker.chunk_size),
        overlap: overlap.unwrap_or(config.pipeline.chunker.overlap),
    };
    let chunker = Chunker::new(chunker_config)?;

    let source = ChunkSource::new(
        file.file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "untitled".to_string()),
        "file",
        "preview",
    );

    for chunk in chunker.chunk("preview", source, &contents) {
        println!(
            "{} {}",
            format!("chunk {}", chunk.position).bold(),
            format!("({} chars)", chunk.char_count).dimmed()
        );
        println!("  {}", chunk.text.trim().replace('\n', "\n  "));
    }

    Ok(())
}
