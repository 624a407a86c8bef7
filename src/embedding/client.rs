// SPDX-License-Identifier: MIT OR Apache-2.0

//! Embedding client with oversized-text handling.
//!
//! Texts longer than `max_chunk_size` characters are split on whitespace into
//! sub-chunks, each sub-chunk is embedded on its own, and the resulting vectors
//! are combined by element-wise arithmetic mean.

use std::sync::Arc;

use crate::embedding::provider::EmbeddingProvider;
use crate::errors::RagError;
use crate::utils::{char_len, split_at_chars};

/// Default maximum number of characters sent in one embedding request.
pub const DEFAULT_MAX_CHUNK_SIZE: usize = 8000;

/// Wraps an [`EmbeddingProvider`] and keeps each request under the size limit.
#[derive(Clone)]
pub struct EmbeddingClient {
    provider: Arc<dyn EmbeddingProvider>,
    max_chunk_size: usize,
}

impl EmbeddingClient {
    pub fn new(provider: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            provider,
            max_chunk_size: DEFAULT_MAX_CHUNK_SIZE,
        }
    }

    /// Sets the maximum characters per request (minimum 1).
    pub fn with_max_chunk_size(mut self, max_chunk_size: usize) -> Self {
        self.max_chunk_size = max_chunk_size.max(1);
        self
    }

    pub fn max_chunk_size(&self) -> usize {
        self.max_chunk_size
    }

    pub fn model(&self) -> &str {
        self.provider.embedding_model()
    }

    /// Embeds `text`, splitting and averaging when it exceeds the size limit.
    ///
    /// Sub-chunks are embedded one after another; the first failure fails the call.
    pub async fn embed(&self, text: &str) -> Result<Vec<f32>, RagError> {
        if text.is_empty() {
            return Err(RagError::MalformedInput(
                "cannot embed empty text".to_string(),
            ));
        }

        if char_len(text) <= self.max_chunk_size {
            return self.provider.embed(text).await;
        }

        let pieces = split_words(text, self.max_chunk_size);
        if pieces.is_empty() {
            return Err(RagError::MalformedInput(
                "cannot embed whitespace-only text".to_string(),
            ));
        }
        tracing::debug!(
            pieces = pieces.len(),
            limit = self.max_chunk_size,
            "splitting oversized text before embedding"
        );

        let mut vectors = Vec::with_capacity(pieces.len());
        for piece in &pieces {
            vectors.push(self.provider.embed(piece).await?);
        }

        mean_vectors(&vectors)
    }
}

/// Greedily packs whitespace-separated words into pieces of at most `max_chars`
/// characters, joined by single spaces.
///
/// A word longer than the limit is cut at the limit; its remainder starts the
/// next piece.
pub fn split_words(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut pieces = Vec::new();
    let mut current = String::new();
    let mut current_len = 0_usize;

    for word in text.split_whitespace() {
        let mut word = word;
        let mut word_len = char_len(word);

        while word_len > max_chars {
            if !current.is_empty() {
                pieces.push(std::mem::take(&mut current));
                current_len = 0;
            }
            let (head, rest) = split_at_chars(word, max_chars);
            pieces.push(head.to_string());
            word = rest;
            word_len -= max_chars;
        }

        if word.is_empty() {
            continue;
        }

        let needed = if current.is_empty() { word_len } else { word_len + 1 };
        if current_len + needed > max_chars {
            pieces.push(std::mem::take(&mut current));
            current_len = 0;
        }

        if !current.is_empty() {
            current.push(' ');
            current_len += 1;
        }
        current.push_str(word);
        current_len += word_len;
    }

    if !current.is_empty() {
        pieces.push(current);
    }

    pieces
}

/// Element-wise arithmetic mean of equally sized vectors.
pub fn mean_vectors(vectors: &[Vec<f32>]) -> Result<Vec<f32>, RagError> {
    let first = vectors
        .first()
        .ok_or_else(|| RagError::upstream("no embeddings to combine"))?;
    let dimension = first.len();

    let mut sums = vec![0.0_f64; dimension];
    for vector in vectors {
        if vector.len() != dimension {
            return Err(RagError::DimensionMismatch {
                expected: dimension,
                actual: vector.len(),
            });
        }
        for (sum, value) in sums.iter_mut().zip(vector) {
            *sum += f64::from(*value);
        }
    }

    let count = vectors.len() as f64;
    Ok(sums.into_iter().map(|sum| (sum / count) as f32).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Records every request and returns `[chars, first byte]`.
    struct RecordingProvider {
        seen: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl EmbeddingProvider for RecordingProvider {
        fn embedding_model(&self) -> &str {
            "recording"
        }

        async fn embed(&self, text: &str) -> Result<Vec<f32>, RagError> {
            self.seen.lock().unwrap().push(text.to_string());
            if text.contains("fail") {
                return Err(RagError::UpstreamUnavailable("down".to_string()));
            }
            Ok(vec![char_len(text) as f32, text.as_bytes()[0] as f32])
        }
    }

    fn client(limit: usize) -> (EmbeddingClient, Arc<RecordingProvider>) {
        let provider = Arc::new(RecordingProvider {
            seen: Mutex::new(Vec::new()),
        });
        let client = EmbeddingClient::new(provider.clone()).with_max_chunk_size(limit);
        (client, provider)
    }

    #[test]
    fn test_split_words_packs_greedily() {
        assert_eq!(
            split_words("aa bb cc dd", 5),
            vec!["aa bb".to_string(), "cc dd".to_string()]
        );
        assert_eq!(split_words("  spaced\n\nout\t", 20), vec!["spaced out".to_string()]);
    }

    #[test]
    fn test_split_words_cuts_long_word() {
        let pieces = split_words("ab abcdefghij k", 4);
        assert_eq!(pieces, vec!["ab", "abcd", "efgh", "ij k"]);
        for piece in &pieces {
            assert!(char_len(piece) <= 4);
        }
    }

    #[test]
    fn test_mean_vectors() {
        let mean = mean_vectors(&[vec![1.0, 2.0, -4.0], vec![3.0, 4.0, 0.0]]).unwrap();
        assert_eq!(mean, vec![2.0, 3.0, -2.0]);

        assert!(matches!(
            mean_vectors(&[vec![1.0], vec![1.0, 2.0]]),
            Err(RagError::DimensionMismatch { expected: 1, actual: 2 })
        ));
        assert!(mean_vectors(&[]).is_err());
    }

    #[tokio::test]
    async fn test_short_text_is_single_request() {
        let (client, provider) = client(100);
        let vector = client.embed("hello world").await.unwrap();
        assert_eq!(vector, vec![11.0, b'h' as f32]);
        assert_eq!(provider.seen.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_oversized_text_is_mean_of_pieces() {
        let (client, provider) = client(5);
        let vector = client.embed("aa bb cc dd e").await.unwrap();

        let seen = provider.seen.lock().unwrap().clone();
        assert_eq!(seen, vec!["aa bb", "cc dd", "e"]);

        let expected = [
            (5.0 + 5.0 + 1.0) / 3.0,
            (b'a' as f64 + b'c' as f64 + b'e' as f64) / 3.0,
        ];
        for (got, want) in vector.iter().zip(expected) {
            assert!((f64::from(*got) - want).abs() < 1e-5, "{got} vs {want}");
        }
    }

    #[tokio::test]
    async fn test_any_piece_failure_fails_embed() {
        let (client, _) = client(5);
        let err = client.embed("aa bb fail cc").await.unwrap_err();
        assert!(matches!(err, RagError::UpstreamUnavailable(_)));
    }

    #[tokio::test]
    async fn test_oversized_whitespace_rejected_without_requests() {
        let (client, provider) = client(5);
        assert!(matches!(
            client.embed(" \n\t        ").await,
            Err(RagError::MalformedInput(_))
        ));
        assert!(provider.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_text_rejected() {
        let (client, provider) = client(5);
        assert!(matches!(
            client.embed("").await,
            Err(RagError::MalformedInput(_))
        ));
        assert!(provider.seen.lock().unwrap().is_empty());
    }
}
