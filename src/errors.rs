// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types shared by the ragpipe library.

use thiserror::Error;

/// Errors produced by the embedding and retrieval pipeline.
#[derive(Error, Debug)]
pub enum RagError {
    /// The model service could not be reached (connection refused, timeout).
    #[error("upstream model service unavailable: {0}")]
    UpstreamUnavailable(String),

    /// The model service answered, but with an error or an unusable body.
    #[error("upstream model service error{}: {message}", .status.map(|s| format!(" (status {s})")).unwrap_or_default())]
    UpstreamError {
        status: Option<u16>,
        message: String,
    },

    /// Embedding a chunk failed while ingesting a document.
    #[error("failed to embed {chunk_id}: {source}")]
    EmbeddingFailed {
        chunk_id: String,
        #[source]
        source: Box<RagError>,
    },

    #[error("malformed input: {0}")]
    MalformedInput(String),

    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("chunk {0} has no embedding")]
    MissingEmbedding(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl RagError {
    pub fn upstream(message: impl Into<String>) -> Self {
        RagError::UpstreamError {
            status: None,
            message: message.into(),
        }
    }
}

impl From<reqwest::Error> for RagError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_connect() || err.is_timeout() {
            RagError::UpstreamUnavailable(err.to_string())
        } else {
            RagError::UpstreamError {
                status: err.status().map(|s| s.as_u16()),
                message: err.to_string(),
            }
        }
    }
}

impl From<serde_json::Error> for RagError {
    fn from(err: serde_json::Error) -> Self {
        RagError::MalformedInput(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upstream_error_message_includes_status() {
        let err = RagError::UpstreamError {
            status: Some(500),
            message: "boom".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "upstream model service error (status 500): boom"
        );
        assert_eq!(
            RagError::upstream("boom").to_string(),
            "upstream model service error: boom"
        );
    }

    #[test]
    fn embedding_failed_keeps_source() {
        let err = RagError::EmbeddingFailed {
            chunk_id: "chunk_2".to_string(),
            source: Box::new(RagError::UpstreamUnavailable("refused".to_string())),
        };
        let source = std::error::Error::source(&err).unwrap();
        assert!(source.to_string().contains("refused"));
        assert!(err.to_string().starts_with("failed to embed chunk_2"));
    }
}
