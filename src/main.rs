//! saferag - CLI entry point

use anyhow::Result;
use clap::Parser;

use saferag::cli::{self, Cli, Command};
use saferag::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt().with_max_level(level).init();

    let config = Config::load()?;

    match &cli.command {
        Command::Query {
            text,
            files,
            top_k,
            identity,
            title_filter,
        } => {
            cli::run_query(
                &config,
                &cli.ollama_url,
                text,
                files,
                *top_k,
                identity,
                title_filter.as_deref(),
            )
            .await?;
        }
        Command::Scan { text, identity } => {
            cli::run_scan(&config, text, identity).await?;
        }
        Command::Chunk {
            file,
            size,
            overlap,
        } => {
            cli::run_chunk(&config, file, *size, *overlap)?;
        }
    }

    Ok(())
}
