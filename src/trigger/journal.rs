// Trigger journal
// Append-only JSONL record of every dispatch and how it ended

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum JournalError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TriggerOutcome {
    Delivered,
    Failed,
}

/// One dispatch as recorded in the journal
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerRecord {
    /// RFC 3339 timestamp of when the dispatch finished
    pub timestamp: String,

    /// Sequence number of the dispatch since the poller started (1-based)
    pub trigger: u64,

    pub outcome: TriggerOutcome,

    /// Attempts spent, including the successful one
    pub attempts: u32,

    /// Error text for failed dispatches
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl TriggerRecord {
    pub fn delivered(trigger: u64, attempts: u32) -> Self {
        TriggerRecord {
            timestamp: Utc::now().to_rfc3339(),
            trigger,
            outcome: TriggerOutcome::Delivered,
            attempts,
            message: None,
        }
    }

    pub fn failed(trigger: u64, attempts: u32, message: impl Into<String>) -> Self {
        TriggerRecord {
            timestamp: Utc::now().to_rfc3339(),
            trigger,
            outcome: TriggerOutcome::Failed,
            attempts,
            message: Some(message.into()),
        }
    }

    /// Serialize to JSON line (with newline)
    pub fn to_json_line(&self) -> Result<String, serde_json::Error> {
        let json = serde_json::to_string(self)?;
        Ok(format!("{}\n", json))
    }
}

/// Appends trigger records to a JSONL file, creating it on first write
pub struct JournalWriter {
    file_path: PathBuf,
}

impl JournalWriter {
    pub fn new(file_path: PathBuf) -> Self {
        JournalWriter { file_path }
    }

    pub fn write(&self, record: &TriggerRecord) -> Result<(), JournalError> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.file_path)?;

        file.write_all(record.to_json_line()?.as_bytes())?;
        file.flush()?;

        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.file_path
    }
}

/// Read trigger records from a JSONL file
pub fn read_journal(path: &Path) -> Result<Vec<TriggerRecord>, JournalError> {
    let contents = std::fs::read_to_string(path)?;
    let mut records = Vec::new();

    for line in contents.lines() {
        if line.trim().is_empty() {
            continue;
        }
        records.push(serde_json::from_str(line)?);
    }

    Ok(records)
}
