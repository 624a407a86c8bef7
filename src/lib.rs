// SPDX-License-Identifier: MIT OR Apache-2.0

//! ragpipe - Minimal retrieval-augmented generation library
//!
//! Shared modules for the ragpipe CLI tool.

pub mod config;
pub mod embedding;
pub mod errors;
pub mod ollama;
pub mod output;
pub mod rag;
pub mod utils;

pub use errors::RagError;
pub use rag::RagService;
