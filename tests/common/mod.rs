#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use anyhow::Result;

pub fn message_line(id: &str, site_id: &str, from: &str, timestamp: i64, message: &str) -> String {
    serde_json::json!({
        "id": id,
        "site_id": site_id,
        "type": "message",
        "from": from,
        "timestamp": timestamp,
        "data": { "message": message },
    })
    .to_string()
}

pub fn status_line(id: &str, site_id: &str, from: &str, timestamp: i64, status: &str) -> String {
    serde_json::json!({
        "id": id,
        "site_id": site_id,
        "type": "status",
        "from": from,
        "timestamp": timestamp,
        "data": { "status": status },
    })
    .to_string()
}

pub fn create_test_jsonl(dir: &Path, filename: &str, lines: &[String]) -> Result<PathBuf> {
    let file_path = dir.join(filename);
    fs::write(&file_path, lines.join("\n"))?;
    Ok(file_path)
}

/// Two sites with a known expected report.
pub fn sample_lines() -> Vec<String> {
    vec![
        status_line("1", "site-b", "op1", 10, "online"),
        message_line("2", "site-b", "v1", 12, "Hi, anyone there?"),
        status_line("3", "site-b", "op1", 20, "offline"),
        message_line("4", "site-b", "v2", 25, "Hello?"),
        message_line("5", "site-a", "v3", 5, "Is this thing on?"),
        message_line("6", "site-a", "v3", 6, ""),
        status_line("7", "site-a", "op2", 3, "online"),
        status_line("8", "site-a", "op3", 4, "online"),
        message_line("2", "site-b", "v1", 12, "Hi, anyone there?"),
    ]
}

pub const SAMPLE_REPORT: &str = "site-a,messages=1,emails=0,operators=2,visitors=1\n\
site-b,messages=1,emails=1,operators=1,visitors=2\n";

pub fn setup_test_environment() -> Result<(TempDir, PathBuf)> {
    let temp_dir = TempDir::new()?;
    let path = create_test_jsonl(temp_dir.path(), "events.jsonl", &sample_lines())?;
    Ok((temp_dir, path))
}
