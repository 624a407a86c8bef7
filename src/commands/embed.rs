// SPDX-License-Identifier: MIT OR Apache-2.0

//! Embed commands - single texts and large JSON arrays

use anyhow::{Context, Result};
use futures_util::{pin_mut, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::json;
use std::path::Path;
use std::time::Duration;

use crate::cli::OutputFormat;
use crate::commands::read_json;
use ragpipe::config::Config;
use ragpipe::embedding::{build_providers, items_from_value, BatchEmbedder, EmbeddingClient};
use ragpipe::output::{colorize_dim, colorize_heading, use_colors};

fn embedding_client(config: &Config) -> Result<EmbeddingClient> {
    let (provider, _) = build_providers(config.model())?;
    Ok(EmbeddingClient::new(provider).with_max_chunk_size(config.embeddings().max_chunk_size()))
}

/// Run the embed command
pub async fn run(text: &str, config: &Config, format: OutputFormat) -> Result<()> {
    let client = embedding_client(config)?;
    let embedding = client.embed(text).await.context("Failed to embed text")?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string(&json!({ "embedding": embedding }))?);
        }
        OutputFormat::Text => {
            let use_color = use_colors();
            println!(
                "{} {}",
                colorize_heading(client.model(), use_color),
                colorize_dim(&format!("({} dimensions)", embedding.len()), use_color)
            );
            println!("{}", serde_json::to_string(&embedding)?);
        }
    }

    Ok(())
}

/// Run the embed-batch command
pub async fn run_batch(
    file: &Path,
    stream: bool,
    batch_size: Option<usize>,
    delay_ms: Option<u64>,
    config: &Config,
    format: OutputFormat,
) -> Result<()> {
    let items = items_from_value(read_json(file)?)?;
    let total = items.len();

    let mut batch_config = config.embeddings().batch_config();
    if let Some(size) = batch_size {
        batch_config.batch_size = size.max(1);
    }
    if let Some(ms) = delay_ms {
        batch_config.batch_delay = Duration::from_millis(ms);
    }
    let embedder = BatchEmbedder::new(embedding_client(config)?, batch_config);

    if stream {
        let events = embedder.stream(items);
        pin_mut!(events);
        while let Some(event) = events.next().await {
            println!("{}", serde_json::to_string(&event)?);
        }
        return Ok(());
    }

    let pb = ProgressBar::new(total as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{bar:40.cyan/blue}] {pos}/{len} items | Embedding {msg}")
            .expect("valid progress bar template")
            .progress_chars("##."),
    );

    let results = embedder
        .embed_batch_with_progress(items, |progress| {
            pb.set_position(progress.processed as u64);
            if let Some(item) = &progress.current_item {
                pb.set_message(item.clone());
            }
        })
        .await;
    pb.finish_and_clear();

    match format {
        OutputFormat::Json => {
            let payload = json!({
                "embeddings": results,
                "totalProcessed": results.len(),
            });
            println!("{}", serde_json::to_string(&payload)?);
        }
        OutputFormat::Text => {
            let use_color = use_colors();
            println!(
                "{}",
                colorize_heading(&format!("Embedded {}/{} items", results.len(), total), use_color)
            );
            for result in &results {
                println!(
                    "  #{} {} {}",
                    result.original_index,
                    colorize_dim(&format!("[{} dims]", result.embedding.len()), use_color),
                    result.text
                );
            }
        }
    }

    Ok(())
}
