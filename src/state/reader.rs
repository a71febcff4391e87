// Exported state reader
// Missing or malformed state files become structured errors, never panics

use serde_json::{json, Value};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use super::models::ExportedState;

#[derive(Debug, Error)]
pub enum StateError {
    #[error("No piano roll state file found. Run the piano roll script and click 'Export State'.")]
    NotFound(PathBuf),
    #[error("Failed to read piano roll state: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse piano roll state: {0}")]
    Parse(#[from] serde_json::Error),
}

pub type StateResult<T> = Result<T, StateError>;

fn read_contents(path: &Path) -> StateResult<String> {
    if !path.exists() {
        return Err(StateError::NotFound(path.to_path_buf()));
    }
    Ok(fs::read_to_string(path)?)
}

/// Raw state JSON, including fields this crate does not model
pub fn read_state_value(path: &Path) -> StateResult<Value> {
    let contents = read_contents(path)?;
    Ok(serde_json::from_str(&contents)?)
}

/// Typed state snapshot
pub fn read_state(path: &Path) -> StateResult<ExportedState> {
    let contents = read_contents(path)?;
    Ok(serde_json::from_str(&contents)?)
}

/// Error payload returned to tool callers in place of state
pub fn error_payload(error: &StateError, path: &Path) -> Value {
    match error {
        StateError::NotFound(expected) => json!({
            "error": error.to_string(),
            "expected_location": expected.display().to_string(),
        }),
        _ => json!({
            "error": error.to_string(),
            "location": path.display().to_string(),
        }),
    }
}
