// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory, append-only storage for embedded chunks.
//!
//! All stored chunks share one embedding dimension, fixed by the first insert.
//! Search is a brute-force cosine similarity scan.

use crate::embedding::chunker::Chunk;
use crate::errors::RagError;

/// A search result from similarity search.
#[derive(Debug, Clone)]
pub struct SimilarityResult<'a> {
    /// The matching chunk
    pub chunk: &'a Chunk,
    /// Cosine similarity score (-1.0 to 1.0)
    pub score: f32,
}

/// Append-only collection of embedded chunks.
#[derive(Debug, Default)]
pub struct VectorStore {
    chunks: Vec<Chunk>,
    dimension: Option<usize>,
}

impl VectorStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a chunk.
    ///
    /// The chunk must carry a non-empty embedding whose dimension matches every
    /// chunk already stored.
    pub fn insert(&mut self, chunk: Chunk) -> Result<(), RagError> {
        let dimension = match chunk.embedding.as_deref() {
            Some(embedding) if !embedding.is_empty() => embedding.len(),
            _ => return Err(RagError::MissingEmbedding(chunk.id)),
        };

        if let Some(expected) = self.dimension {
            if expected != dimension {
                return Err(RagError::DimensionMismatch {
                    expected,
                    actual: dimension,
                });
            }
        }

        self.dimension = Some(dimension);
        self.chunks.push(chunk);
        Ok(())
    }

    /// Returns the contents of the `top_k` most similar chunks, best first.
    pub fn search(&self, query_embedding: &[f32], top_k: usize) -> Vec<String> {
        self.search_scored(query_embedding, top_k)
            .into_iter()
            .map(|result| result.chunk.content.clone())
            .collect()
    }

    /// Returns the `top_k` most similar chunks with their scores.
    ///
    /// Results are sorted by descending cosine similarity; equal scores keep
    /// insertion order.
    pub fn search_scored(&self, query_embedding: &[f32], top_k: usize) -> Vec<SimilarityResult<'_>> {
        if self.chunks.is_empty() || top_k == 0 {
            return Vec::new();
        }

        if let Some(expected) = self.dimension {
            if expected != query_embedding.len() {
                tracing::warn!(
                    expected,
                    actual = query_embedding.len(),
                    "query embedding dimension differs from stored chunks"
                );
            }
        }

        let mut results: Vec<SimilarityResult<'_>> = self
            .chunks
            .iter()
            .map(|chunk| {
                let score =
                    cosine_similarity(query_embedding, chunk.embedding.as_deref().unwrap_or(&[]));
                SimilarityResult {
                    chunk,
                    // NaN ranks last.
                    score: if score.is_nan() { f32::MIN } else { score },
                }
            })
            .collect();

        // Sort by score (descending); sort_by is stable.
        results.sort_by(|a, b| b.score.total_cmp(&a.score));
        results.truncate(top_k);

        results
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Embedding dimension of the stored chunks, once any are stored.
    pub fn dimension(&self) -> Option<usize> {
        self.dimension
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }
}

/// Computes cosine similarity between two vectors.
///
/// Vectors of different length, empty vectors and zero vectors score 0.0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    // f64 accumulation keeps large components from overflowing.
    let dot_product: f64 = a
        .iter()
        .zip(b.iter())
        .map(|(x, y)| f64::from(*x) * f64::from(*y))
        .sum();
    let magnitude_a: f64 = a.iter().map(|x| f64::from(*x).powi(2)).sum::<f64>().sqrt();
    let magnitude_b: f64 = b.iter().map(|x| f64::from(*x).powi(2)).sum::<f64>().sqrt();

    if magnitude_a == 0.0 || magnitude_b == 0.0 {
        return 0.0;
    }

    (dot_product / (magnitude_a * magnitude_b)) as f32
}
