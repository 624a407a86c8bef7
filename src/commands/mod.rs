// SPDX-License-Identifier: MIT OR Apache-2.0

//! Subcommand implementations

pub mod ask;
pub mod chunk;
pub mod embed;
pub mod model;

use anyhow::{Context, Result};
use serde_json::Value;
use std::path::Path;

use crate::cli::CliProvider;
use ragpipe::config::{Config, ProviderType};

/// Loads configuration, applies environment overrides and the CLI provider flag.
pub fn load_config(path: Option<&Path>, provider: Option<CliProvider>) -> Result<Config> {
    let config = match path {
        Some(path) => Config::load_from(path)?,
        None => Config::load(),
    };
    let mut config = config.with_env_overrides()?;

    if let Some(provider) = provider {
        config.model.provider = Some(match provider {
            CliProvider::Ollama => ProviderType::Ollama,
            CliProvider::Command => ProviderType::Command,
            CliProvider::Dummy => ProviderType::Dummy,
        });
    }

    Ok(config)
}

/// Reads a document file. Content that is not valid JSON becomes a JSON string.
pub fn read_document(path: &Path) -> Result<Value> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read document: {}", path.display()))?;
    Ok(serde_json::from_str(&content).unwrap_or(Value::String(content)))
}

/// Reads a file that must contain valid JSON.
pub fn read_json(path: &Path) -> Result<Value> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read file: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse {} as JSON", path.display()))
}
