// Pipeline progress tracing
// Append-only JSONL trace of stage starts, completions and failures

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

use super::stages::Stage;

/// Errors that can occur during trace operations
#[derive(Debug, Error)]
pub enum TraceError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageStatus {
    Started,
    Completed,
    Failed,
}

/// A single line of the run trace
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceEntry {
    pub timestamp: DateTime<Utc>,

    pub stage: Stage,

    pub status: StageStatus,

    /// Overall run progress [0.0, 1.0]
    pub progress: f32,

    /// Human-readable message describing current operation
    pub message: String,

    /// Optional structured data (offsets, note counts, artifact paths)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl TraceEntry {
    pub fn new(stage: Stage, status: StageStatus, progress: f32, message: String) -> Self {
        TraceEntry {
            timestamp: Utc::now(),
            stage,
            status,
            progress: progress.clamp(0.0, 1.0),
            message,
            data: None,
        }
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Serialize to JSON line (with newline)
    pub fn to_json_line(&self) -> Result<String, serde_json::Error> {
        let json = serde_json::to_string(self)?;
        Ok(format!("{}\n", json))
    }
}

/// Append-only JSONL trace file for one run
pub struct TraceWriter {
    file_path: PathBuf,
}

impl TraceWriter {
    pub fn new(file_path: PathBuf) -> Self {
        TraceWriter { file_path }
    }

    /// Append a trace entry, creating the file if needed
    pub fn write(&self, entry: &TraceEntry) -> Result<(), TraceError> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.file_path)?;

        let json_line = entry.to_json_line()?;
        file.write_all(json_line.as_bytes())?;
        file.flush()?;

        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.file_path
    }
}

/// Builds entries for one stage with progress derived from its position in the run
pub struct TraceBuilder {
    stage: Stage,
}

impl TraceBuilder {
    pub fn stage(stage: Stage) -> Self {
        TraceBuilder { stage }
    }

    /// Progress stays at the previous stage's completion value
    pub fn start(self, message: impl Into<String>) -> TraceEntry {
        let progress = self.stage.progress() - 1.0 / Stage::ALL.len() as f32;
        TraceEntry::new(self.stage, StageStatus::Started, progress, message.into())
    }

    pub fn complete(self, message: impl Into<String>) -> TraceEntry {
        TraceEntry::new(
            self.stage,
            StageStatus::Completed,
            self.stage.progress(),
            message.into(),
        )
    }

    pub fn failed(self, message: impl Into<String>) -> TraceEntry {
        let progress = self.stage.progress() - 1.0 / Stage::ALL.len() as f32;
        TraceEntry::new(self.stage, StageStatus::Failed, progress, message.into())
    }
}

/// Read trace entries from a JSONL file
pub fn read_trace_file(path: &Path) -> Result<Vec<TraceEntry>, TraceError> {
    let contents = std::fs::read_to_string(path)?;
    let mut entries = Vec::new();

    for line in contents.lines() {
        if line.trim().is_empty() {
            continue;
        }

        let entry: TraceEntry = serde_json::from_str(line)?;
        entries.push(entry);
    }

    Ok(entries)
}
