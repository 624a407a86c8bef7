// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ask and search commands - ingest documents, then answer or retrieve

use anyhow::{Context, Result};
use serde_json::json;
use std::path::PathBuf;

use crate::cli::OutputFormat;
use crate::commands::read_document;
use ragpipe::config::Config;
use ragpipe::output::{colorize_dim, colorize_heading, colorize_id, colorize_score, use_colors};
use ragpipe::RagService;

async fn ingest_all(
    config: &Config,
    docs: &[PathBuf],
    top_k: Option<usize>,
) -> Result<RagService> {
    let mut service = RagService::from_config(config)?;
    if let Some(k) = top_k {
        service = service.with_top_k(k);
    }

    for path in docs {
        let document = read_document(path)?;
        let stored = service
            .ingest(&document)
            .await
            .with_context(|| format!("Failed to ingest {}", path.display()))?;
        tracing::info!(path = %path.display(), chunks = stored, "document ingested");
    }

    Ok(service)
}

/// Run the ask command
pub async fn run(
    query: &str,
    docs: &[PathBuf],
    top_k: Option<usize>,
    config: &Config,
    format: OutputFormat,
) -> Result<()> {
    let service = ingest_all(config, docs, top_k).await?;
    let answer = service
        .answer(query)
        .await
        .context("Failed to generate answer")?;

    match format {
        OutputFormat::Json => {
            let payload = json!({
                "answer": answer,
                "chunks": service.store().len(),
            });
            println!("{}", serde_json::to_string_pretty(&payload)?);
        }
        OutputFormat::Text => {
            println!("{}", answer.trim_end());
        }
    }

    Ok(())
}

/// Run the search command
pub async fn search(
    query: &str,
    docs: &[PathBuf],
    top_k: Option<usize>,
    config: &Config,
    format: OutputFormat,
) -> Result<()> {
    let service = ingest_all(config, docs, top_k).await?;
    let results = service
        .retrieve_scored(query, service.top_k())
        .await
        .context("Failed to search documents")?;

    match format {
        OutputFormat::Json => {
            let rows: Vec<_> = results
                .iter()
                .map(|r| {
                    json!({
                        "id": r.chunk.id,
                        "score": r.score,
                        "content": r.chunk.content,
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&json!({ "results": rows }))?);
        }
        OutputFormat::Text => {
            let use_color = use_colors();
            if results.is_empty() {
                println!("{}", colorize_dim("No matching chunks", use_color));
            }
            for (rank, result) in results.iter().enumerate() {
                println!(
                    "{} {} {}",
                    colorize_heading(&format!("#{}", rank + 1), use_color),
                    colorize_id(&result.chunk.id, use_color),
                    colorize_score(result.score, use_color)
                );
                println!("{}", result.chunk.content);
                println!();
            }
        }
    }

    Ok(())
}
