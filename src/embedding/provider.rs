// SPDX-License-Identifier: MIT OR Apache-2.0

//! Model capability interfaces and implementations.
//!
//! The pipeline only talks to models through two capabilities: turning text into
//! an embedding vector and turning a prompt into generated text.

use async_trait::async_trait;
use serde_json::Value;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::config::{ModelConfig, ProviderType};
use crate::errors::RagError;
use crate::ollama::OllamaProvider;

/// Default dimension of vectors produced by [`DummyProvider`].
pub const DEFAULT_DUMMY_DIMENSION: usize = 384;

/// Text-to-vector capability.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Returns the embedding model identifier.
    fn embedding_model(&self) -> &str;

    /// Generates an embedding for a single text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, RagError>;
}

/// Prompt-to-text capability.
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    /// Returns the generation model identifier.
    fn generation_model(&self) -> &str;

    async fn generate(&self, prompt: &str) -> Result<String, RagError>;
}

/// Builds the embedding and generation providers selected by the configuration.
///
/// The same embedding provider (and model) serves both document and query
/// embedding; mixing models would make similarity scores meaningless.
pub fn build_providers(
    config: &ModelConfig,
) -> Result<(Arc<dyn EmbeddingProvider>, Arc<dyn GenerationProvider>), RagError> {
    match config.provider() {
        ProviderType::Ollama => {
            let ollama = Arc::new(OllamaProvider::from_config(config)?);
            let embedder: Arc<dyn EmbeddingProvider> = ollama.clone();
            let generator: Arc<dyn GenerationProvider> = ollama;
            Ok((embedder, generator))
        }
        ProviderType::Command => {
            let command = config.command().ok_or_else(|| {
                RagError::Config("model.command is required for the command provider".to_string())
            })?;
            let embedder: Arc<dyn EmbeddingProvider> = Arc::new(
                CommandProvider::new(command.to_string(), config.embedding_model().to_string())
                    .with_timeout(config.timeout()),
            );
            let generator: Arc<dyn GenerationProvider> =
                Arc::new(OllamaProvider::from_config(config)?);
            Ok((embedder, generator))
        }
        ProviderType::Dummy => {
            let dummy = Arc::new(DummyProvider::new(config.dimension()));
            let embedder: Arc<dyn EmbeddingProvider> = dummy.clone();
            let generator: Arc<dyn GenerationProvider> = dummy;
            Ok((embedder, generator))
        }
    }
}

/// Command provider that shells out to an external process.
///
/// The command receives `{"model": ..., "texts": [...]}` on stdin and must print
/// either a JSON array of vectors or an object holding one under `embeddings`,
/// `vectors` or `data`.
pub struct CommandProvider {
    command: String,
    model: String,
    timeout: Option<Duration>,
}

impl CommandProvider {
    pub fn new(command: String, model: String) -> Self {
        Self {
            command,
            model,
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    async fn run_command(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, RagError> {
        let payload = serde_json::json!({
            "model": self.model,
            "texts": texts,
        });

        let mut child = Command::new("sh")
            .arg("-c")
            .arg(&self.command)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                RagError::UpstreamUnavailable(format!(
                    "failed to spawn embedding command `{}`: {e}",
                    self.command
                ))
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(payload.to_string().as_bytes())
                .await
                .map_err(|e| RagError::upstream(format!("failed to write payload: {e}")))?;
        }

        let wait = child.wait_with_output();
        let output = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, wait).await.map_err(|_| {
                RagError::UpstreamUnavailable(format!(
                    "embedding command timed out after {}s",
                    limit.as_secs()
                ))
            })?,
            None => wait.await,
        }
        .map_err(|e| RagError::upstream(format!("failed to read command output: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(RagError::UpstreamError {
                status: output.status.code().map(|c| c as u16),
                message: format!("embedding command failed: {}", stderr.trim()),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let parsed: Value = serde_json::from_str(stdout.trim())
            .map_err(|e| RagError::upstream(format!("command output is not JSON: {e}")))?;
        parse_vectors(parsed)
    }
}

#[async_trait]
impl EmbeddingProvider for CommandProvider {
    fn embedding_model(&self) -> &str {
        &self.model
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, RagError> {
        self.run_command(&[text])
            .await?
            .pop()
            .ok_or_else(|| RagError::upstream("embedding command returned no vectors"))
    }
}

fn parse_vectors(parsed: Value) -> Result<Vec<Vec<f32>>, RagError> {
    let rows = match parsed {
        Value::Array(rows) => rows,
        Value::Object(mut obj) => match ["embeddings", "vectors", "data"]
            .iter()
            .find_map(|key| obj.remove(*key))
        {
            Some(Value::Array(rows)) => rows,
            Some(_) => return Err(RagError::upstream("embeddings field must be an array")),
            None => return Err(RagError::upstream("command output missing 'embeddings' field")),
        },
        _ => return Err(RagError::upstream("command output must be a JSON array or object")),
    };

    rows.iter()
        .map(|row| {
            row.as_array()
                .ok_or_else(|| RagError::upstream("embedding row must be an array"))?
                .iter()
                .map(|value| {
                    value
                        .as_f64()
                        .map(|v| v as f32)
                        .ok_or_else(|| RagError::upstream("embedding value must be a number"))
                })
                .collect::<Result<Vec<f32>, RagError>>()
        })
        .collect()
}

/// Deterministic offline provider (for testing/fallback).
///
/// Embeddings are derived from a blake3 hash of the text, so equal texts get equal
/// vectors. Generation echoes the prompt.
pub struct DummyProvider {
    model: String,
    dimension: usize,
}

impl DummyProvider {
    /// Creates a new dummy provider with specified dimension.
    pub fn new(dimension: usize) -> Self {
        Self {
            model: "dummy".to_string(),
            dimension: dimension.max(1),
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    fn hash_vector(&self, text: &str) -> Vec<f32> {
        let mut reader = blake3::Hasher::new().update(text.as_bytes()).finalize_xof();
        let mut bytes = vec![0_u8; self.dimension];
        reader.fill(&mut bytes);

        let mut vector: Vec<f32> = bytes.iter().map(|b| *b as f32 / 127.5 - 1.0).collect();
        l2_normalize(&mut vector);
        vector
    }
}

#[async_trait]
impl EmbeddingProvider for DummyProvider {
    fn embedding_model(&self) -> &str {
        &self.model
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, RagError> {
        Ok(self.hash_vector(text))
    }
}

#[async_trait]
impl GenerationProvider for DummyProvider {
    fn generation_model(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &str) -> Result<String, RagError> {
        Ok(prompt.to_string())
    }
}

fn l2_normalize(vector: &mut [f32]) {
    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm == 0.0 {
        return;
    }
    for value in vector.iter_mut() {
        *value /= norm;
    }
}
