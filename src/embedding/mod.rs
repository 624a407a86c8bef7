// SPDX-License-Identifier: MIT OR Apache-2.0

//! Embedding module - chunking, embedding and similarity search
//!
//! Documents are split into chunks, embedded through an [`EmbeddingProvider`]
//! and kept in an in-memory [`VectorStore`] for cosine similarity retrieval.

pub mod batch;
pub mod chunker;
pub mod client;
pub mod provider;
pub mod storage;

pub use batch::{
    items_from_value, BatchConfig, BatchEmbedder, BatchEvent, CompletionSummary,
    EmbeddingResult, StreamingProgress,
};
pub use chunker::{split_units, Chunk, ChunkConfig, TextChunker};
pub use client::{mean_vectors, split_words, EmbeddingClient};
pub use provider::{
    build_providers, CommandProvider, DummyProvider, EmbeddingProvider, GenerationProvider,
};
pub use storage::{cosine_similarity, SimilarityResult, VectorStore};
