// SPDX-License-Identifier: MIT OR Apache-2.0

//! Sentence-aware text chunker for document ingestion.
//!
//! Documents are serialized to pretty-printed JSON and split into sentence-like
//! units (text up to and including a run of `.`, `!`, `?` or newline). Units are
//! packed greedily into chunks of at most `target_chunk_size` characters, and each
//! new chunk is seeded with the trailing units of the previous one so adjacent
//! chunks share context.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::RagError;
use crate::utils::char_len;

/// Default maximum number of characters per chunk.
pub const DEFAULT_TARGET_CHUNK_SIZE: usize = 500;

/// Default number of trailing units carried into the next chunk.
pub const DEFAULT_OVERLAP_SENTENCES: usize = 1;

/// Value of the `source` metadata key on every chunk.
pub const CHUNK_SOURCE: &str = "uploaded_document";

// Every character of the input belongs to exactly one match.
static SENTENCE_UNIT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^.!?\n]*[.!?\n]+|[^.!?\n]+$").expect("valid sentence regex"));

/// Configuration for the text chunker.
#[derive(Debug, Clone)]
pub struct ChunkConfig {
    /// Maximum accumulated characters per chunk.
    pub target_chunk_size: usize,
    /// Number of trailing units from the previous chunk that seed the next one.
    pub overlap_sentences: usize,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            target_chunk_size: DEFAULT_TARGET_CHUNK_SIZE,
            overlap_sentences: DEFAULT_OVERLAP_SENTENCES,
        }
    }
}

impl ChunkConfig {
    /// Creates a new ChunkConfig with the specified parameters.
    pub fn new(target_chunk_size: usize, overlap_sentences: usize) -> Result<Self, RagError> {
        if target_chunk_size == 0 {
            return Err(RagError::Config(
                "target_chunk_size must be greater than 0".to_string(),
            ));
        }
        Ok(Self {
            target_chunk_size,
            overlap_sentences,
        })
    }
}

/// A bounded-size unit of document text, optionally carrying its embedding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub id: String,
    pub content: String,
    /// `source` and `chunk_index`.
    pub metadata: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
}

impl Chunk {
    /// Ordinal position of the chunk within its document.
    pub fn chunk_index(&self) -> Option<u64> {
        self.metadata.get("chunk_index").and_then(Value::as_u64)
    }
}

/// Splits documents into overlapping, sentence-aligned chunks.
pub struct TextChunker {
    config: ChunkConfig,
}

impl TextChunker {
    /// Creates a new chunker with the given configuration.
    pub fn new(config: ChunkConfig) -> Self {
        Self { config }
    }

    /// Creates a chunker with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(ChunkConfig::default())
    }

    /// Returns the current configuration.
    pub fn config(&self) -> &ChunkConfig {
        &self.config
    }

    /// Chunks an arbitrary JSON value.
    ///
    /// `null`, `""`, `[]` and `{}` are treated as empty documents and yield no chunks.
    pub fn chunk(&self, input: &Value) -> Result<Vec<Chunk>, RagError> {
        if is_empty_document(input) {
            return Ok(Vec::new());
        }
        let text = serde_json::to_string_pretty(input)?;
        Ok(self.chunk_text(&text))
    }

    /// Chunks already-serialized text.
    ///
    /// A chunk is emitted right before the unit that would push it past
    /// `target_chunk_size`. The next chunk always starts with the last
    /// `overlap_sentences` units of the emitted one, so a chunk may exceed the
    /// target by its overlap units or when it holds a single oversized unit.
    pub fn chunk_text(&self, text: &str) -> Vec<Chunk> {
        let target = self.config.target_chunk_size;
        let mut chunks = Vec::new();
        let mut current: Vec<&str> = Vec::new();
        let mut current_len = 0_usize;

        for unit in split_units(text) {
            let unit_len = char_len(unit);

            if !current.is_empty() && current_len + unit_len > target {
                chunks.push(make_chunk(chunks.len(), &current));

                let keep = self.config.overlap_sentences.min(current.len());
                current = current.split_off(current.len() - keep);
                current_len = current.iter().map(|u| char_len(u)).sum();
            }

            current.push(unit);
            current_len += unit_len;
        }

        if !current.is_empty() {
            chunks.push(make_chunk(chunks.len(), &current));
        }

        chunks
    }
}

/// Splits text into sentence-like units, each retaining its terminators.
///
/// A trailing remainder without a terminator forms its own unit. Concatenating
/// the units reproduces the input exactly.
pub fn split_units(text: &str) -> Vec<&str> {
    SENTENCE_UNIT.find_iter(text).map(|m| m.as_str()).collect()
}

fn make_chunk(index: usize, units: &[&str]) -> Chunk {
    let mut metadata = Map::new();
    metadata.insert("source".to_string(), Value::from(CHUNK_SOURCE));
    metadata.insert("chunk_index".to_string(), Value::from(index));

    Chunk {
        id: format!("chunk_{index}"),
        content: units.concat(),
        metadata,
        embedding: None,
    }
}

fn is_empty_document(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}
