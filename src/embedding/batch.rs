// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bounded-concurrency batch embedding with progress events.
//!
//! Items are processed in fixed-size batches. Every item of a batch is embedded
//! concurrently; the next batch starts only after the whole batch has finished
//! and a fixed delay has elapsed. Failed items are logged and dropped, never
//! retried.
//!
//! ```text
//! for batch in items.chunks(batch_size):
//!   sleep(batch_delay)            # skipped before the first batch
//!   results = join_all(embed(item) for item in batch)
//!   yield Embedding(result) for each successful result, in batch order
//!   yield Progress(processed, total)
//! yield Complete(total_processed)
//! ```

use async_stream::stream;
use futures_util::future::join_all;
use futures_util::{pin_mut, Stream, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

use crate::embedding::client::EmbeddingClient;
use crate::errors::RagError;
use crate::utils::truncate_to_chars;

/// Default number of items embedded concurrently.
pub const DEFAULT_BATCH_SIZE: usize = 5;

/// Default pause between consecutive batches.
pub const DEFAULT_BATCH_DELAY: Duration = Duration::from_millis(100);

/// Default length of the text preview attached to results and progress.
pub const DEFAULT_PREVIEW_CHARS: usize = 100;

/// Configuration for the batch embedder.
#[derive(Debug, Clone)]
pub struct BatchConfig {
    pub batch_size: usize,
    pub batch_delay: Duration,
    pub preview_chars: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            batch_delay: DEFAULT_BATCH_DELAY,
            preview_chars: DEFAULT_PREVIEW_CHARS,
        }
    }
}

/// Embedding of one input item, tied back to its position in the input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmbeddingResult {
    pub embedding: Vec<f32>,
    pub original_index: usize,
    /// Truncated preview of the embedded text.
    pub text: String,
}

/// Snapshot of batch progress.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamingProgress {
    /// Items attempted so far, failed ones included.
    pub processed: usize,
    pub total: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_item: Option<String>,
}

impl StreamingProgress {
    /// Rounded completion percentage; an empty job counts as complete.
    pub fn percentage(&self) -> u32 {
        if self.total == 0 {
            return 100;
        }
        ((self.processed as f64 / self.total as f64) * 100.0).round() as u32
    }
}

/// Final summary of a batch run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionSummary {
    pub message: String,
    /// Number of successfully embedded items.
    pub total_processed: usize,
}

/// Event emitted by [`BatchEmbedder::stream`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "lowercase")]
pub enum BatchEvent {
    Progress(StreamingProgress),
    Embedding(EmbeddingResult),
    Complete(CompletionSummary),
}

/// Checks that a batch request payload is a JSON array and returns its items.
pub fn items_from_value(value: Value) -> Result<Vec<Value>, RagError> {
    match value {
        Value::Array(items) => Ok(items),
        other => Err(RagError::MalformedInput(format!(
            "batch input must be an array, got {}",
            value_kind(&other)
        ))),
    }
}

/// Text sent to the embedding model for one item.
///
/// Strings pass through unchanged; every other value is serialized as compact JSON.
pub fn item_text(item: &Value) -> String {
    match item {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Drives batched, concurrent embedding of large item collections.
pub struct BatchEmbedder {
    client: EmbeddingClient,
    config: BatchConfig,
}

impl BatchEmbedder {
    pub fn new(client: EmbeddingClient, config: BatchConfig) -> Self {
        Self { client, config }
    }

    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    /// Lazily embeds `items`, yielding events as each batch completes.
    ///
    /// Embedding events appear in batch-submission order, not globally sorted.
    /// Each call starts a fresh run; nothing happens until the stream is polled.
    pub fn stream(&self, items: Vec<Value>) -> impl Stream<Item = BatchEvent> + '_ {
        let batch_size = self.config.batch_size.max(1);
        let delay = self.config.batch_delay;
        let preview_chars = self.config.preview_chars;
        let client = &self.client;

        stream! {
            let total = items.len();
            let texts: Vec<String> = items.iter().map(item_text).collect();
            let mut processed = 0_usize;
            let mut succeeded = 0_usize;

            for (batch_no, batch) in texts.chunks(batch_size).enumerate() {
                if batch_no > 0 && !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }

                let offset = batch_no * batch_size;
                tracing::debug!(batch = batch_no, size = batch.len(), offset, "embedding batch");

                let outcomes = join_all(batch.iter().enumerate().map(|(i, text)| async move {
                    (offset + i, text, client.embed(text).await)
                }))
                .await;

                for (index, text, outcome) in outcomes {
                    match outcome {
                        Ok(embedding) => {
                            succeeded += 1;
                            yield BatchEvent::Embedding(EmbeddingResult {
                                embedding,
                                original_index: index,
                                text: truncate_to_chars(text, preview_chars).into_owned(),
                            });
                        }
                        Err(err) => {
                            tracing::warn!(index, error = %err, "failed to embed item, skipping");
                        }
                    }
                }

                processed += batch.len();
                yield BatchEvent::Progress(StreamingProgress {
                    processed,
                    total,
                    current_item: batch
                        .last()
                        .map(|text| truncate_to_chars(text, preview_chars).into_owned()),
                });
            }

            tracing::info!(total, succeeded, "batch embedding complete");
            yield BatchEvent::Complete(CompletionSummary {
                message: "Processing complete".to_string(),
                total_processed: succeeded,
            });
        }
    }

    /// Embeds every item and returns the successful results ordered by input index.
    pub async fn embed_batch(&self, items: Vec<Value>) -> Vec<EmbeddingResult> {
        self.embed_batch_with_progress(items, |_| {}).await
    }

    /// Like [`embed_batch`](Self::embed_batch), reporting progress after each batch.
    pub async fn embed_batch_with_progress<F>(
        &self,
        items: Vec<Value>,
        mut on_progress: F,
    ) -> Vec<EmbeddingResult>
    where
        F: FnMut(&StreamingProgress),
    {
        let events = self.stream(items);
        pin_mut!(events);

        let mut results = Vec::new();
        while let Some(event) = events.next().await {
            match event {
                BatchEvent::Embedding(result) => results.push(result),
                BatchEvent::Progress(progress) => on_progress(&progress),
                BatchEvent::Complete(_) => {}
            }
        }

        // Stable sort; concurrent completion order must not leak into the output.
        results.sort_by_key(|r| r.original_index);
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::provider::EmbeddingProvider;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Arc;

    struct LengthProvider;

    #[async_trait]
    impl EmbeddingProvider for LengthProvider {
        fn embedding_model(&self) -> &str {
            "length"
        }

        async fn embed(&self, text: &str) -> Result<Vec<f32>, RagError> {
            Ok(vec![text.len() as f32])
        }
    }

    fn embedder(batch_size: usize) -> BatchEmbedder {
        BatchEmbedder::new(
            EmbeddingClient::new(Arc::new(LengthProvider)),
            BatchConfig {
                batch_size,
                batch_delay: Duration::ZERO,
                preview_chars: 3,
            },
        )
    }

    #[test]
    fn test_items_from_value_requires_array() {
        assert_eq!(items_from_value(json!([1, "a"])).unwrap().len(), 2);
        let err = items_from_value(json!({"data": []})).unwrap_err();
        assert!(matches!(err, RagError::MalformedInput(ref m) if m.contains("object")));
    }

    #[test]
    fn test_item_text_conversion() {
        assert_eq!(item_text(&json!("plain")), "plain");
        assert_eq!(item_text(&json!({"a": 1})), r#"{"a":1}"#);
        assert_eq!(item_text(&json!(42)), "42");
        assert_eq!(item_text(&json!(null)), "null");
    }

    #[test]
    fn test_percentage() {
        let progress = StreamingProgress {
            processed: 1,
            total: 3,
            current_item: None,
        };
        assert_eq!(progress.percentage(), 33);
        let empty = StreamingProgress {
            processed: 0,
            total: 0,
            current_item: None,
        };
        assert_eq!(empty.percentage(), 100);
    }

    #[test]
    fn test_event_wire_shape() {
        let event = BatchEvent::Embedding(EmbeddingResult {
            embedding: vec![0.5],
            original_index: 2,
            text: "abc".to_string(),
        });
        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            json!({"event": "embedding", "data": {"embedding": [0.5], "originalIndex": 2, "text": "abc"}})
        );

        let progress = BatchEvent::Progress(StreamingProgress {
            processed: 1,
            total: 2,
            current_item: Some("x".to_string()),
        });
        assert_eq!(
            serde_json::to_value(&progress).unwrap()["data"],
            json!({"processed": 1, "total": 2, "currentItem": "x"})
        );

        let complete = BatchEvent::Complete(CompletionSummary {
            message: "Processing complete".to_string(),
            total_processed: 4,
        });
        assert_eq!(
            serde_json::to_value(&complete).unwrap()["data"]["totalProcessed"],
            json!(4)
        );
    }

    #[tokio::test]
    async fn test_previews_are_truncated() {
        let results = embedder(2).embed_batch(vec![json!("abcdef")]).await;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].text, "abc");
        assert_eq!(results[0].embedding, vec![6.0]);
    }

    #[tokio::test]
    async fn test_empty_input_completes_immediately() {
        let events: Vec<BatchEvent> = embedder(2).stream(Vec::new()).collect().await;
        assert_eq!(
            events,
            vec![BatchEvent::Complete(CompletionSummary {
                message: "Processing complete".to_string(),
                total_processed: 0,
            })]
        );
    }
}
