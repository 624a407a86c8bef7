// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration file support for ragpipe
//!
//! Loads configuration from .ragpiperc.toml in current directory or ~/.config/ragpipe/config.toml,
//! then applies environment overrides.

use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::embedding::batch::BatchConfig;
use crate::embedding::chunker::ChunkConfig;
use crate::errors::RagError;

/// Model provider type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderType {
    #[default]
    Ollama,
    Command,
    Dummy,
}

impl std::str::FromStr for ProviderType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ollama" => Ok(ProviderType::Ollama),
            "command" => Ok(ProviderType::Command),
            "dummy" => Ok(ProviderType::Dummy),
            _ => Err(format!("Unknown provider: {}", s)),
        }
    }
}

/// Model service configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Provider type (ollama, command, dummy)
    pub provider: Option<ProviderType>,
    /// Base URL of the Ollama service
    pub endpoint: Option<String>,
    /// Model used for both document and query embeddings
    pub embedding_model: Option<String>,
    /// Model used for answer generation
    pub generation_model: Option<String>,
    /// Command to execute for the command provider
    pub command: Option<String>,
    /// Per-request timeout in seconds (0 disables the timeout)
    pub timeout_secs: Option<u64>,
    /// Vector dimension for the dummy provider
    pub dimension: Option<usize>,
}

impl ModelConfig {
    /// Get provider type (defaults to Ollama)
    pub fn provider(&self) -> ProviderType {
        self.provider.unwrap_or_default()
    }

    /// Get endpoint (defaults to "http://localhost:11434")
    pub fn endpoint(&self) -> &str {
        self.endpoint.as_deref().unwrap_or("http://localhost:11434")
    }

    /// Get embedding model (defaults to "nomic-embed-text")
    pub fn embedding_model(&self) -> &str {
        self.embedding_model.as_deref().unwrap_or("nomic-embed-text")
    }

    /// Get generation model (defaults to "llama3.2:3b")
    pub fn generation_model(&self) -> &str {
        self.generation_model.as_deref().unwrap_or("llama3.2:3b")
    }

    pub fn command(&self) -> Option<&str> {
        self.command.as_deref()
    }

    /// Get request timeout (defaults to 120s, `None` when disabled)
    pub fn timeout(&self) -> Option<Duration> {
        match self.timeout_secs.unwrap_or(120) {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    /// Get dummy dimension (defaults to 384)
    pub fn dimension(&self) -> usize {
        self.dimension
            .unwrap_or(crate::embedding::provider::DEFAULT_DUMMY_DIMENSION)
    }
}

/// Chunking configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Maximum characters per chunk
    pub target_chunk_size: Option<usize>,
    /// Number of sentences carried over between chunks
    pub overlap_sentences: Option<usize>,
}

impl ChunkingConfig {
    /// Get target chunk size (defaults to 500)
    pub fn target_chunk_size(&self) -> usize {
        self.target_chunk_size.unwrap_or(500)
    }

    /// Get overlap sentences (defaults to 1)
    pub fn overlap_sentences(&self) -> usize {
        self.overlap_sentences.unwrap_or(1)
    }

    pub fn chunk_config(&self) -> Result<ChunkConfig, RagError> {
        ChunkConfig::new(self.target_chunk_size(), self.overlap_sentences())
    }
}

/// Embedding configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Texts longer than this many characters are split before embedding
    pub max_chunk_size: Option<usize>,
    /// Number of items embedded concurrently per batch
    pub batch_size: Option<usize>,
    /// Pause between batches in milliseconds
    pub batch_delay_ms: Option<u64>,
    /// Length of text previews in batch results
    pub preview_chars: Option<usize>,
}

impl EmbeddingConfig {
    /// Get max chunk size (defaults to 8000)
    pub fn max_chunk_size(&self) -> usize {
        self.max_chunk_size.unwrap_or(8000)
    }

    /// Get batch size (defaults to 5)
    pub fn batch_size(&self) -> usize {
        self.batch_size.unwrap_or(5)
    }

    /// Get batch delay (defaults to 100ms)
    pub fn batch_delay(&self) -> Duration {
        Duration::from_millis(self.batch_delay_ms.unwrap_or(100))
    }

    /// Get preview length (defaults to 100)
    pub fn preview_chars(&self) -> usize {
        self.preview_chars.unwrap_or(100)
    }

    pub fn batch_config(&self) -> BatchConfig {
        BatchConfig {
            batch_size: self.batch_size().max(1),
            batch_delay: self.batch_delay(),
            preview_chars: self.preview_chars(),
        }
    }
}

/// Retrieval configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Number of chunks used as context for an answer
    pub top_k: Option<usize>,
}

impl RetrievalConfig {
    /// Get top k (defaults to 3)
    pub fn top_k(&self) -> usize {
        self.top_k.unwrap_or(3)
    }
}

/// Configuration loaded from .ragpiperc.toml or ~/.config/ragpipe/config.toml
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Model service configuration
    #[serde(default)]
    pub model: ModelConfig,

    /// Chunking configuration
    #[serde(default)]
    pub chunking: ChunkingConfig,

    /// Embedding configuration
    #[serde(default)]
    pub embeddings: EmbeddingConfig,

    /// Retrieval configuration
    #[serde(default)]
    pub retrieval: RetrievalConfig,
}

impl Config {
    /// Load configuration from files
    ///
    /// Precedence (highest to lowest):
    /// 1. .ragpiperc.toml in current directory
    /// 2. ~/.config/ragpipe/config.toml
    pub fn load() -> Self {
        // Try current directory first
        if let Some(config) = Self::try_load(&PathBuf::from(".ragpiperc.toml")) {
            return config;
        }

        // Try home directory config
        if let Some(home) = dirs::home_dir() {
            let config_path = home.join(".config").join("ragpipe").join("config.toml");
            if let Some(config) = Self::try_load(&config_path) {
                return config;
            }
        }

        Self::default()
    }

    /// Load configuration from an explicit path, failing if it cannot be read or parsed.
    pub fn load_from(path: &Path) -> Result<Self, RagError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| RagError::Config(format!("failed to read {}: {}", path.display(), e)))?;
        toml::from_str(&content)
            .map_err(|e| RagError::Config(format!("failed to parse {}: {}", path.display(), e)))
    }

    fn try_load(path: &Path) -> Option<Self> {
        if !path.exists() {
            return None;
        }
        match Self::load_from(path) {
            Ok(config) => Some(config),
            Err(e) => {
                tracing::warn!("{}", e);
                None
            }
        }
    }

    /// Apply environment overrides on top of file configuration
    ///
    /// `OLLAMA_HOST`, `RAGPIPE_EMBEDDING_MODEL`, `RAGPIPE_GENERATION_MODEL` and
    /// `RAGPIPE_BATCH_SIZE` are honoured; empty values are ignored.
    pub fn with_env_overrides(mut self) -> Result<Self, RagError> {
        if let Some(host) = read_env("OLLAMA_HOST")? {
            self.model.endpoint = Some(normalize_endpoint(&host));
        }
        if let Some(model) = read_env("RAGPIPE_EMBEDDING_MODEL")? {
            self.model.embedding_model = Some(model);
        }
        if let Some(model) = read_env("RAGPIPE_GENERATION_MODEL")? {
            self.model.generation_model = Some(model);
        }
        if let Some(raw) = read_env("RAGPIPE_BATCH_SIZE")? {
            let size = raw.parse::<usize>().map_err(|_| {
                RagError::Config(format!("Invalid RAGPIPE_BATCH_SIZE value: {}", raw))
            })?;
            self.embeddings.batch_size = Some(size);
        }
        Ok(self)
    }

    /// Get the model configuration
    pub fn model(&self) -> &ModelConfig {
        &self.model
    }

    /// Get the chunking configuration
    pub fn chunking(&self) -> &ChunkingConfig {
        &self.chunking
    }

    /// Get the embedding configuration
    pub fn embeddings(&self) -> &EmbeddingConfig {
        &self.embeddings
    }

    /// Get the retrieval configuration
    pub fn retrieval(&self) -> &RetrievalConfig {
        &self.retrieval
    }
}

fn read_env(name: &str) -> Result<Option<String>, RagError> {
    match env::var(name) {
        Ok(raw) => {
            let value = raw.trim();
            Ok((!value.is_empty()).then(|| value.to_string()))
        }
        Err(env::VarError::NotPresent) => Ok(None),
        Err(err) => Err(RagError::Config(format!("Failed to read {}: {}", name, err))),
    }
}

// OLLAMA_HOST is commonly given as `host:port` without a scheme.
fn normalize_endpoint(host: &str) -> String {
    let host = host.trim_end_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("http://{}", host)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = Config::default();
        assert_eq!(config.model().provider(), ProviderType::Ollama);
        assert_eq!(config.model().endpoint(), "http://localhost:11434");
        assert_eq!(config.model().embedding_model(), "nomic-embed-text");
        assert_eq!(config.model().generation_model(), "llama3.2:3b");
        assert_eq!(config.model().timeout(), Some(Duration::from_secs(120)));
        assert_eq!(config.chunking().target_chunk_size(), 500);
        assert_eq!(config.chunking().overlap_sentences(), 1);
        assert_eq!(config.embeddings().max_chunk_size(), 8000);
        assert_eq!(config.embeddings().batch_size(), 5);
        assert_eq!(config.embeddings().batch_delay(), Duration::from_millis(100));
        assert_eq!(config.retrieval().top_k(), 3);
    }

    #[test]
    fn parses_partial_toml() {
        let config: Config = toml::from_str(
            r#"
[model]
provider = "dummy"
dimension = 16
timeout_secs = 0

[chunking]
target_chunk_size = 40

[embeddings]
batch_size = 2
batch_delay_ms = 0
"#,
        )
        .unwrap();

        assert_eq!(config.model().provider(), ProviderType::Dummy);
        assert_eq!(config.model().dimension(), 16);
        assert_eq!(config.model().timeout(), None);
        assert_eq!(config.chunking().target_chunk_size(), 40);
        assert_eq!(config.chunking().overlap_sentences(), 1);

        let batch = config.embeddings().batch_config();
        assert_eq!(batch.batch_size, 2);
        assert_eq!(batch.batch_delay, Duration::ZERO);
    }

    #[test]
    fn load_from_reports_parse_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "[model\nprovider = ").unwrap();
        assert!(matches!(Config::load_from(&path), Err(RagError::Config(_))));
    }

    #[test]
    fn normalize_endpoint_adds_scheme() {
        assert_eq!(normalize_endpoint("127.0.0.1:11434"), "http://127.0.0.1:11434");
        assert_eq!(normalize_endpoint("https://ollama.example/"), "https://ollama.example");
    }

    #[test]
    fn provider_from_str() {
        assert_eq!("Dummy".parse::<ProviderType>(), Ok(ProviderType::Dummy));
        assert!("openai".parse::<ProviderType>().is_err());
    }
}
