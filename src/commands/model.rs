// SPDX-License-Identifier: MIT OR Apache-2.0

//! Model service commands - model details and reachability

use anyhow::{Context, Result};
use colored::Colorize;

use crate::cli::OutputFormat;
use ragpipe::config::Config;
use ragpipe::ollama::OllamaProvider;

/// Run the model-info command
pub async fn info(model: Option<&str>, config: &Config, format: OutputFormat) -> Result<()> {
    let provider = OllamaProvider::from_config(config.model())?;
    let info = provider
        .model_info(model)
        .await
        .context("Failed to retrieve model info")?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&info)?),
        OutputFormat::Text => {
            let name = model.unwrap_or(config.model().generation_model());
            println!("{}", name.bold());
            if let Some(details) = info.get("details").and_then(|d| d.as_object()) {
                for (key, value) in details {
                    println!("  {}: {}", key.cyan(), value);
                }
            } else {
                println!("{}", serde_json::to_string_pretty(&info)?);
            }
        }
    }

    Ok(())
}

/// Run the health command
pub async fn health(config: &Config, format: OutputFormat) -> Result<()> {
    let provider = OllamaProvider::from_config(config.model())?;
    let result = provider.health().await;

    match format {
        OutputFormat::Json => {
            let payload = serde_json::json!({
                "endpoint": provider.endpoint(),
                "reachable": result.is_ok(),
                "error": result.as_ref().err().map(|e| e.to_string()),
            });
            println!("{}", serde_json::to_string_pretty(&payload)?);
        }
        OutputFormat::Text => match &result {
            Ok(_) => println!("{} {} is reachable", "✓".green(), provider.endpoint()),
            Err(e) => println!("{} {}: {}", "✗".red(), provider.endpoint(), e),
        },
    }

    result.map(|_| ()).context("Model service is not reachable")
}
