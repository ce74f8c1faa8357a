//! JSON-lines run history, one record per backed up target

use super::pipeline::BackupResult;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub target: String,
    /// `SUCCESS` or `FAILED`
    pub status: String,
    pub size: u64,
    pub sha256: String,
    pub error: String,
    pub duration_secs: f64,
    pub created_at: DateTime<Utc>,
}

impl HistoryRecord {
    pub fn from_result(result: &BackupResult, created_at: DateTime<Utc>) -> Self {
        let (status, size, sha256, error) = match (result.artifact(), result.error()) {
            (Some(info), _) => ("SUCCESS", info.size, info.sha256.clone(), String::new()),
            (None, Some(err)) => ("FAILED", 0, String::new(), err.to_string()),
            (None, None) => ("FAILED", 0, String::new(), String::new()),
        };

        Self {
            target: result.target.clone(),
            status: status.to_string(),
            size,
            sha256,
            error,
            duration_secs: result.duration.as_secs_f64(),
            created_at,
        }
    }
}

pub struct HistoryLog {
    path: PathBuf,
}

impl HistoryLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, record: &HistoryRecord) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create history directory {:?}", parent))?;
        }

        let mut line = serde_json::to_string(record)?;
        line.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("Failed to open history file {:?}", self.path))?;
        file.write_all(line.as_bytes())
            .with_context(|| format!("Failed to write history file {:?}", self.path))?;
        Ok(())
    }

    /// All records, oldest first
    pub fn read_all(&self) -> Result<Vec<HistoryRecord>> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e).with_context(|| format!("Failed to read {:?}", self.path)),
        };

        contents
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| serde_json::from_str(line).context("Malformed history record"))
            .collect()
    }
}
