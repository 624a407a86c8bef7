// SPDX-License-Identifier: MIT OR Apache-2.0

//! Chunk command - shows how a document is split before embedding

use anyhow::Result;
use std::path::Path;

use crate::cli::OutputFormat;
use crate::commands::read_document;
use ragpipe::config::Config;
use ragpipe::embedding::{ChunkConfig, TextChunker};
use ragpipe::output::{colorize_dim, colorize_id, use_colors};
use ragpipe::utils::char_len;

/// Run the chunk command
pub fn run(
    file: &Path,
    target_size: Option<usize>,
    overlap: Option<usize>,
    config: &Config,
    format: OutputFormat,
) -> Result<()> {
    let document = read_document(file)?;
    let chunk_config = ChunkConfig::new(
        target_size.unwrap_or_else(|| config.chunking().target_chunk_size()),
        overlap.unwrap_or_else(|| config.chunking().overlap_sentences()),
    )?;
    let chunks = TextChunker::new(chunk_config).chunk(&document)?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&chunks)?);
        }
        OutputFormat::Text => {
            let use_color = use_colors();
            if chunks.is_empty() {
                println!("{}", colorize_dim("Document is empty, no chunks produced", use_color));
            }
            for chunk in &chunks {
                let size = format!("({} chars)", char_len(&chunk.content));
                println!(
                    "{} {}",
                    colorize_id(&chunk.id, use_color),
                    colorize_dim(&size, use_color)
                );
                println!("{}", chunk.content);
                println!();
            }
        }
    }

    Ok(())
}
