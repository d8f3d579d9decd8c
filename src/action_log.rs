//! Action logging for Ballpark commands.
//!
//! Every CLI invocation is appended to `log.jsonl` in the project's data
//! directory, giving an audit trail of who estimated what and when.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

use crate::storage;

/// A single action log entry.
#[derive(Debug, Serialize, Deserialize)]
pub struct ActionLog {
    /// ISO 8601 timestamp when the action occurred
    pub timestamp: DateTime<Utc>,

    /// Project path where the command was executed
    pub repo_path: String,

    /// Command name (e.g., "feature add", "estimate")
    pub command: String,

    /// Command arguments as JSON
    pub args: serde_json::Value,

    /// Whether the command succeeded
    pub success: bool,

    /// Error message if the command failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Command execution duration in milliseconds
    pub duration_ms: u64,

    /// User who executed the command
    pub user: String,
}

/// Log an action to the project's log file.
///
/// This function never fails loudly; logging problems must not break the
/// command that triggered them.
pub fn log_action(
    repo_path: &Path,
    command: &str,
    args: serde_json::Value,
    success: bool,
    error: Option<String>,
    duration_ms: u64,
) -> Result<(), Box<dyn std::error::Error>> {
    // Uninitialized project: nothing to log into yet
    let Ok(data_dir) = storage::get_storage_dir(repo_path) else {
        return Ok(());
    };
    if !data_dir.exists() {
        return Ok(());
    }

    let entry = ActionLog {
        timestamp: Utc::now(),
        repo_path: repo_path.to_string_lossy().to_string(),
        command: command.to_string(),
        args: compact_args(&args),
        success,
        error,
        duration_ms,
        user: get_current_user(),
    };

    let log_path = data_dir.join("log.jsonl");
    if let Err(e) = write_log_entry(&log_path, &entry) {
        eprintln!("Warning: Failed to write action log: {}", e);
    }

    Ok(())
}

/// Read the action log, newest entries last.
pub fn read_log(repo_path: &Path) -> crate::Result<Vec<ActionLog>> {
    let data_dir = storage::get_storage_dir(repo_path)?;
    let log_path = data_dir.join("log.jsonl");
    if !log_path.exists() {
        return Ok(Vec::new());
    }

    let file = fs::File::open(&log_path)?;
    let reader = BufReader::new(file);

    let mut entries = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        if let Ok(entry) = serde_json::from_str::<ActionLog>(&line) {
            entries.push(entry);
        }
    }

    Ok(entries)
}

/// Write a log entry to the log file.
fn write_log_entry(path: &Path, entry: &ActionLog) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let json = serde_json::to_string(entry)?;
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(file, "{}", json)?;

    Ok(())
}

/// Compact arguments for logging: long strings are truncated and large
/// arrays summarized so one bulk import doesn't bloat the log.
fn compact_args(args: &serde_json::Value) -> serde_json::Value {
    match args {
        serde_json::Value::Object(map) => serde_json::Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), compact_args(v)))
                .collect(),
        ),
        serde_json::Value::Array(arr) => {
            if arr.len() > 10 {
                serde_json::Value::String(format!("[Array with {} items]", arr.len()))
            } else {
                serde_json::Value::Array(arr.iter().map(compact_args).collect())
            }
        }
        serde_json::Value::String(s) => {
            if s.len() > 100 {
                serde_json::Value::String(format!("{}... ({} chars)", &s[..97], s.len()))
            } else {
                serde_json::Value::String(s.clone())
            }
        }
        _ => args.clone(),
    }
}

/// Get the current user's username.
fn get_current_user() -> String {
    std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "unknown".to_string())
}
