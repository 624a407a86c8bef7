// SPDX-License-Identifier: MIT OR Apache-2.0

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn write_file(path: &Path, content: &str) {
    fs::write(path, content).expect("write file");
}

fn ragpipe(dir: &TempDir) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("ragpipe"));
    cmd.current_dir(dir.path())
        .env("HOME", dir.path())
        .env("NO_COLOR", "1")
        .env_remove("OLLAMA_HOST")
        .env_remove("RAGPIPE_EMBEDDING_MODEL")
        .env_remove("RAGPIPE_GENERATION_MODEL")
        .env_remove("RAGPIPE_BATCH_SIZE");
    cmd
}

fn stdout_json(output: &std::process::Output) -> Value {
    let stdout = String::from_utf8(output.stdout.clone()).expect("utf8");
    serde_json::from_str(&stdout).expect("json output")
}

#[test]
fn chunk_prints_json_chunks() {
    let dir = TempDir::new().expect("tempdir");
    let doc = dir.path().join("doc.json");
    write_file(&doc, r#""The cat sat. The dog ran.""#);

    let assert = ragpipe(&dir)
        .args(["--format", "json", "chunk", "doc.json", "--target-size", "15", "--overlap", "0"])
        .assert()
        .success();

    let chunks = stdout_json(assert.get_output());
    let chunks = chunks.as_array().expect("array");
    assert_eq!(chunks.len(), 2);
    assert_eq!(chunks[0]["id"], "chunk_0");
    assert_eq!(chunks[1]["metadata"]["chunk_index"], 1);
    assert_eq!(chunks[1]["metadata"]["source"], "uploaded_document");
    assert!(chunks[0].get("embedding").is_none());
}

#[test]
fn chunk_empty_document_in_text_mode() {
    let dir = TempDir::new().expect("tempdir");
    write_file(&dir.path().join("empty.json"), "{}");

    ragpipe(&dir)
        .args(["chunk", "empty.json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("no chunks produced"));
}

#[test]
fn embed_batch_with_dummy_provider() {
    let dir = TempDir::new().expect("tempdir");
    write_file(&dir.path().join("items.json"), r#"["alpha", "beta", {"k": 1}]"#);

    let assert = ragpipe(&dir)
        .args([
            "--format",
            "json",
            "--provider",
            "dummy",
            "embed-batch",
            "items.json",
            "--batch-size",
            "2",
            "--delay-ms",
            "0",
        ])
        .assert()
        .success();

    let payload = stdout_json(assert.get_output());
    assert_eq!(payload["totalProcessed"], 3);
    let embeddings = payload["embeddings"].as_array().expect("array");
    let indices: Vec<u64> = embeddings
        .iter()
        .map(|e| e["originalIndex"].as_u64().expect("index"))
        .collect();
    assert_eq!(indices, vec![0, 1, 2]);
    assert_eq!(embeddings[0]["text"], "alpha");
    assert_eq!(embeddings[0]["embedding"].as_array().expect("vector").len(), 384);
}

#[test]
fn embed_batch_stream_ends_with_complete_event() {
    let dir = TempDir::new().expect("tempdir");
    write_file(&dir.path().join("items.json"), r#"["alpha", "beta"]"#);

    let assert = ragpipe(&dir)
        .args([
            "--provider",
            "dummy",
            "embed-batch",
            "items.json",
            "--stream",
            "--delay-ms",
            "0",
        ])
        .assert()
        .success();

    let stdout = String::from_utf8(assert.get_output().stdout.clone()).expect("utf8");
    let events: Vec<Value> = stdout
        .lines()
        .map(|line| serde_json::from_str(line).expect("json line"))
        .collect();
    assert_eq!(events.len(), 4);
    assert_eq!(events[2]["event"], "progress");
    assert_eq!(events[2]["data"]["processed"], 2);
    assert_eq!(events[3]["event"], "complete");
    assert_eq!(events[3]["data"]["message"], "Processing complete");
}

#[test]
fn embed_batch_rejects_non_array() {
    let dir = TempDir::new().expect("tempdir");
    write_file(&dir.path().join("items.json"), r#"{"text": "alpha"}"#);

    ragpipe(&dir)
        .args(["--provider", "dummy", "embed-batch", "items.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("must be an array"));
}

#[test]
fn ask_with_dummy_provider_echoes_prompt() {
    let dir = TempDir::new().expect("tempdir");
    write_file(&dir.path().join("doc.json"), r#"{"title": "Cats", "body": "Cats sleep a lot."}"#);

    ragpipe(&dir)
        .args(["--provider", "dummy", "ask", "How much do cats sleep?", "-d", "doc.json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Context information:"))
        .stdout(predicate::str::contains("Cats sleep a lot."))
        .stdout(predicate::str::contains("Question: How much do cats sleep?"));
}

#[test]
fn search_requires_a_document() {
    let dir = TempDir::new().expect("tempdir");

    ragpipe(&dir)
        .args(["--provider", "dummy", "search", "cats"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--doc"));
}

#[test]
fn embed_with_dummy_provider_is_deterministic() {
    let dir = TempDir::new().expect("tempdir");

    let first = ragpipe(&dir)
        .args(["--format", "json", "--provider", "dummy", "embed", "hello"])
        .assert()
        .success();
    let second = ragpipe(&dir)
        .args(["--format", "json", "--provider", "dummy", "embed", "hello"])
        .assert()
        .success();

    assert_eq!(
        stdout_json(first.get_output())["embedding"],
        stdout_json(second.get_output())["embedding"]
    );
}

#[test]
fn completions_do_not_need_config() {
    let dir = TempDir::new().expect("tempdir");

    ragpipe(&dir)
        .args(["--config", "missing.toml", "completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("ragpipe"));
}
