// SPDX-License-Identifier: MIT OR Apache-2.0

//! ragpipe - Minimal retrieval-augmented generation CLI
//!
//! Chunks JSON documents, embeds the chunks through a local model service,
//! retrieves the most similar chunks for a question and asks a generation
//! model to answer with them as context.

mod cli;
mod commands;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use cli::{Cli, Commands};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with RAGPIPE_LOG env var (e.g., RAGPIPE_LOG=debug ragpipe ask ...)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("RAGPIPE_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let format = cli.format;

    if let Commands::Completions { shell } = cli.command {
        let mut cmd = Cli::command();
        generate(shell, &mut cmd, "ragpipe", &mut std::io::stdout());
        return Ok(());
    }

    let config = commands::load_config(cli.config.as_deref(), cli.provider)?;

    match cli.command {
        Commands::Chunk {
            file,
            target_size,
            overlap,
        } => {
            commands::chunk::run(&file, target_size, overlap, &config, format)?;
        }
        Commands::Ask { query, docs, top_k } => {
            commands::ask::run(&query, &docs, top_k, &config, format).await?;
        }
        Commands::Search { query, docs, top_k } => {
            commands::ask::search(&query, &docs, top_k, &config, format).await?;
        }
        Commands::Embed { text } => {
            commands::embed::run(&text, &config, format).await?;
        }
        Commands::EmbedBatch {
            file,
            stream,
            batch_size,
            delay_ms,
        } => {
            commands::embed::run_batch(&file, stream, batch_size, delay_ms, &config, format)
                .await?;
        }
        Commands::ModelInfo { model } => {
            commands::model::info(model.as_deref(), &config, format).await?;
        }
        Commands::Health => {
            commands::model::health(&config, format).await?;
        }
        Commands::Completions { .. } => unreachable!("handled before configuration is loaded"),
    }

    Ok(())
}
