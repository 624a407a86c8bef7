// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ollama client implementing both model capabilities.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::ModelConfig;
use crate::embedding::provider::{EmbeddingProvider, GenerationProvider};
use crate::errors::RagError;

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    embedding: Vec<f32>,
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

#[derive(Debug, Serialize)]
struct ShowRequest<'a> {
    name: &'a str,
}

/// Ollama provider.
///
/// One embedding model serves every embedding call; generation uses its own model.
pub struct OllamaProvider {
    client: reqwest::Client,
    endpoint: String,
    embedding_model: String,
    generation_model: String,
}

impl OllamaProvider {
    /// Create a new Ollama provider with an unconfigured HTTP client.
    pub fn new(
        endpoint: impl Into<String>,
        embedding_model: impl Into<String>,
        generation_model: impl Into<String>,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            embedding_model: embedding_model.into(),
            generation_model: generation_model.into(),
        }
    }

    /// Create a provider from configuration, applying the request timeout.
    pub fn from_config(config: &ModelConfig) -> Result<Self, RagError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.timeout() {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| RagError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: config.endpoint().trim_end_matches('/').to_string(),
            embedding_model: config.embedding_model().to_string(),
            generation_model: config.generation_model().to_string(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn post_json<B, R>(&self, path: &str, body: &B) -> Result<R, RagError>
    where
        B: Serialize + ?Sized,
        R: for<'de> Deserialize<'de>,
    {
        let url = format!("{}{}", self.endpoint, path);
        let response = self.client.post(&url).json(body).send().await?;
        Self::read_json(response).await
    }

    async fn read_json<R>(response: reqwest::Response) -> Result<R, RagError>
    where
        R: for<'de> Deserialize<'de>,
    {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RagError::UpstreamError {
                status: Some(status.as_u16()),
                message: format!("Ollama API error: {}", body.trim()),
            });
        }
        response.json::<R>().await.map_err(|e| RagError::UpstreamError {
            status: Some(status.as_u16()),
            message: format!("unexpected Ollama response: {e}"),
        })
    }

    /// Returns details about a model (`/api/show`); defaults to the generation model.
    pub async fn model_info(&self, model: Option<&str>) -> Result<Value, RagError> {
        let name = model.unwrap_or(&self.generation_model);
        tracing::debug!(model = name, "fetching model info");
        self.post_json("/api/show", &ShowRequest { name }).await
    }

    /// Lists locally available models (`/api/tags`); succeeds only if Ollama is reachable.
    pub async fn health(&self) -> Result<Value, RagError> {
        let url = format!("{}/api/tags", self.endpoint);
        let response = self.client.get(&url).send().await?;
        Self::read_json(response).await
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaProvider {
    fn embedding_model(&self) -> &str {
        &self.embedding_model
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, RagError> {
        tracing::debug!(model = %self.embedding_model, chars = text.len(), "embedding text");
        let request = EmbeddingRequest {
            model: &self.embedding_model,
            prompt: text,
        };
        let result: EmbeddingResponse = self.post_json("/api/embeddings", &request).await?;
        if result.embedding.is_empty() {
            return Err(RagError::upstream("Ollama returned an empty embedding"));
        }
        Ok(result.embedding)
    }
}

#[async_trait]
impl GenerationProvider for OllamaProvider {
    fn generation_model(&self) -> &str {
        &self.generation_model
    }

    async fn generate(&self, prompt: &str) -> Result<String, RagError> {
        tracing::debug!(model = %self.generation_model, chars = prompt.len(), "generating response");
        let request = GenerateRequest {
            model: &self.generation_model,
            prompt,
            stream: false,
        };
        let result: GenerateResponse = self.post_json("/api/generate", &request).await?;
        Ok(result.response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ollama_provider_from_config() {
        let config = ModelConfig {
            endpoint: Some("http://ollama:11434/".to_string()),
            ..Default::default()
        };
        let provider = OllamaProvider::from_config(&config).unwrap();
        assert_eq!(provider.endpoint(), "http://ollama:11434");
        assert_eq!(provider.embedding_model(), "nomic-embed-text");
        assert_eq!(provider.generation_model(), "llama3.2:3b");
    }

    #[test]
    fn test_request_shapes() {
        let embed = serde_json::to_value(EmbeddingRequest {
            model: "m",
            prompt: "p",
        })
        .unwrap();
        assert_eq!(embed, serde_json::json!({"model": "m", "prompt": "p"}));

        let generate = serde_json::to_value(GenerateRequest {
            model: "m",
            prompt: "p",
            stream: false,
        })
        .unwrap();
        assert_eq!(generate["stream"], serde_json::json!(false));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_unavailable() {
        // Port 9 (discard) on localhost is not expected to serve HTTP.
        let provider = OllamaProvider::new("http://127.0.0.1:9", "e", "g");
        match provider.embed("hello").await {
            Err(RagError::UpstreamUnavailable(_)) => {}
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
