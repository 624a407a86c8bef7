// SPDX-License-Identifier: MIT OR Apache-2.0

//! CLI argument parsing using clap

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

/// ragpipe - Minimal retrieval-augmented generation over JSON documents
///
/// Chunks documents, embeds them through an embedding model and answers
/// questions with the most similar chunks as context.
#[derive(Parser, Debug)]
#[command(name = "ragpipe")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Output format (text or json)
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Configuration file (defaults to .ragpiperc.toml or ~/.config/ragpipe/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Override the configured model provider
    #[arg(long, global = true, value_enum)]
    pub provider: Option<CliProvider>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Output format for results
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Model provider selectable from the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum CliProvider {
    /// Ollama HTTP API
    Ollama,
    /// External embedding command (generation still uses Ollama)
    Command,
    /// Deterministic offline provider
    Dummy,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Split a JSON document into chunks
    Chunk {
        /// Document file (JSON; other text is treated as a JSON string)
        file: PathBuf,

        /// Maximum characters per chunk
        #[arg(long)]
        target_size: Option<usize>,

        /// Sentences carried over between chunks
        #[arg(long)]
        overlap: Option<usize>,
    },

    /// Ingest documents and answer a question about them
    Ask {
        /// Question to answer
        query: String,

        /// Document file to ingest (repeatable)
        #[arg(short, long = "doc", required = true)]
        docs: Vec<PathBuf>,

        /// Number of context chunks
        #[arg(short = 'k', long)]
        top_k: Option<usize>,
    },

    /// Ingest documents and show the chunks most similar to a query
    #[command(alias = "s")]
    Search {
        /// Search query
        query: String,

        /// Document file to ingest (repeatable)
        #[arg(short, long = "doc", required = true)]
        docs: Vec<PathBuf>,

        /// Number of chunks to return
        #[arg(short = 'k', long)]
        top_k: Option<usize>,
    },

    /// Embed a single text
    Embed {
        /// Text to embed
        text: String,
    },

    /// Embed every item of a JSON array file
    EmbedBatch {
        /// JSON file containing an array of items
        file: PathBuf,

        /// Emit one JSON event per line as batches complete
        #[arg(long)]
        stream: bool,

        /// Items embedded concurrently per batch
        #[arg(long)]
        batch_size: Option<usize>,

        /// Pause between batches in milliseconds
        #[arg(long)]
        delay_ms: Option<u64>,
    },

    /// Show details about a model
    ModelInfo {
        /// Model name (defaults to the generation model)
        #[arg(long)]
        model: Option<String>,
    },

    /// Check that the model service is reachable
    Health,

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}
