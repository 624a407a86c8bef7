// SPDX-License-Identifier: MIT OR Apache-2.0

//! Retrieval-augmented generation over ingested documents.
//!
//! Ingestion runs chunk → embed → store strictly in chunk order, one chunk at a
//! time. Answering embeds the query with the same embedding client, retrieves the
//! most similar chunks and hands them to the generation model as context.

use serde_json::Value;
use std::sync::Arc;

use crate::config::Config;
use crate::embedding::{
    build_providers, EmbeddingClient, GenerationProvider, SimilarityResult, TextChunker,
    VectorStore,
};
use crate::errors::RagError;

/// Default number of chunks used as answer context.
pub const DEFAULT_TOP_K: usize = 3;

/// Owns the vector store and composes chunking, embedding, retrieval and generation.
pub struct RagService {
    chunker: TextChunker,
    embedder: EmbeddingClient,
    generator: Arc<dyn GenerationProvider>,
    store: VectorStore,
    top_k: usize,
    documents: usize,
}

impl RagService {
    pub fn new(embedder: EmbeddingClient, generator: Arc<dyn GenerationProvider>) -> Self {
        Self {
            chunker: TextChunker::with_defaults(),
            embedder,
            generator,
            store: VectorStore::new(),
            top_k: DEFAULT_TOP_K,
            documents: 0,
        }
    }

    /// Builds a service from configuration using the configured providers.
    pub fn from_config(config: &Config) -> Result<Self, RagError> {
        let (embedding_provider, generator) = build_providers(config.model())?;
        let embedder = EmbeddingClient::new(embedding_provider)
            .with_max_chunk_size(config.embeddings().max_chunk_size());
        let chunker = TextChunker::new(config.chunking().chunk_config()?);

        Ok(Self::new(embedder, generator)
            .with_chunker(chunker)
            .with_top_k(config.retrieval().top_k()))
    }

    pub fn with_chunker(mut self, chunker: TextChunker) -> Self {
        self.chunker = chunker;
        self
    }

    /// Sets the number of context chunks (minimum 1).
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k.max(1);
        self
    }

    pub fn store(&self) -> &VectorStore {
        &self.store
    }

    pub fn embedder(&self) -> &EmbeddingClient {
        &self.embedder
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    /// Chunks, embeds and stores a document, returning the number of chunks stored.
    ///
    /// The first chunk that fails to embed, or whose embedding the store rejects,
    /// aborts the document with [`RagError::EmbeddingFailed`]; chunks stored
    /// before it stay in the store.
    pub async fn ingest(&mut self, document: &Value) -> Result<usize, RagError> {
        let chunks = self.chunker.chunk(document)?;
        let ordinal = self.documents;
        self.documents += 1;

        tracing::info!(document = ordinal, chunks = chunks.len(), "ingesting document");

        let mut stored = 0;
        for mut chunk in chunks {
            if ordinal > 0 {
                chunk.id = format!("doc{}_{}", ordinal, chunk.id);
            }

            let chunk_id = chunk.id.clone();
            let failed = |source: RagError| RagError::EmbeddingFailed {
                chunk_id: chunk_id.clone(),
                source: Box::new(source),
            };

            let embedding = self.embedder.embed(&chunk.content).await.map_err(failed)?;
            chunk.embedding = Some(embedding);
            // Empty or wrong-width vectors are rejected by the store.
            self.store.insert(chunk).map_err(failed)?;
            stored += 1;
        }

        Ok(stored)
    }

    /// Returns the contents of the `top_k` chunks most similar to `query`.
    pub async fn retrieve(&self, query: &str) -> Result<Vec<String>, RagError> {
        Ok(self
            .retrieve_scored(query, self.top_k)
            .await?
            .into_iter()
            .map(|result| result.chunk.content.clone())
            .collect())
    }

    /// Retrieval with scores. An empty store returns nothing without embedding the query.
    pub async fn retrieve_scored(
        &self,
        query: &str,
        top_k: usize,
    ) -> Result<Vec<SimilarityResult<'_>>, RagError> {
        if self.store.is_empty() {
            return Ok(Vec::new());
        }
        let query_embedding = self.embedder.embed(query).await?;
        Ok(self.store.search_scored(&query_embedding, top_k))
    }

    /// Answers `query` using the most relevant stored chunks as context.
    pub async fn answer(&self, query: &str) -> Result<String, RagError> {
        if query.trim().is_empty() {
            return Err(RagError::MalformedInput("query must not be empty".to_string()));
        }

        let context = self.retrieve(query).await?;
        tracing::debug!(context_chunks = context.len(), "built answer context");

        let prompt = build_prompt(query, &context);
        self.generator.generate(&prompt).await
    }
}

/// Builds the generation prompt.
///
/// Without context the prompt is the bare query.
pub fn build_prompt(query: &str, context: &[String]) -> String {
    if context.is_empty() {
        return query.to_string();
    }

    format!(
        "Context information:\n{}\n\nQuestion: {}\n\n\
         Please provide a comprehensive answer based on the context information provided above.\n\
         Show the sources you have used to answer the question.\n",
        context.join("\n\n"),
        query
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_without_context_is_bare_query() {
        assert_eq!(build_prompt("What is up?", &[]), "What is up?");
    }

    #[test]
    fn test_prompt_with_context() {
        let prompt = build_prompt("Who sat?", &["The cat sat.".to_string(), "The dog ran.".to_string()]);
        assert!(prompt.starts_with("Context information:\nThe cat sat.\n\nThe dog ran.\n\n"));
        assert!(prompt.contains("Question: Who sat?"));
        assert!(prompt.contains("comprehensive answer"));
        assert!(prompt.contains("Show the sources"));
    }
}
