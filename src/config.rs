// Bridge configuration
// File locations, poll timing, retry budget and host automation settings

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Environment variable that overrides the bridge directory
pub const BRIDGE_DIR_ENV: &str = "PIANOROLL_BRIDGE_DIR";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid config file: {0}")]
    Parse(#[from] serde_json::Error),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Settings for the OS automation that wakes the host application
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    /// Process name as reported by System Events
    pub process_name: String,

    /// Substring identifying the piano roll window title
    pub window_marker: String,

    /// Key of the "run last script" shortcut
    pub key: String,

    /// AppleScript modifier list for the shortcut
    pub modifiers: Vec<String>,

    /// Delay between focus steps and after the keystroke
    pub step_delay_ms: u64,

    /// Timeout for the full trigger script
    pub script_timeout_ms: u64,

    /// Timeout for the running/window probes
    pub probe_timeout_ms: u64,
}

impl Default for HostConfig {
    fn default() -> Self {
        HostConfig {
            process_name: "OsxFL".to_string(),
            window_marker: "Piano roll".to_string(),
            key: "y".to_string(),
            modifiers: vec!["command down".to_string(), "option down".to_string()],
            step_delay_ms: 300,
            script_timeout_ms: 8000,
            probe_timeout_ms: 3000,
        }
    }
}

impl HostConfig {
    pub fn step_delay(&self) -> Duration {
        Duration::from_millis(self.step_delay_ms)
    }

    pub fn script_timeout(&self) -> Duration {
        Duration::from_millis(self.script_timeout_ms)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    /// Human-readable shortcut, e.g. "Cmd+Opt+Y"
    pub fn shortcut_label(&self) -> String {
        let mut parts: Vec<String> = self
            .modifiers
            .iter()
            .map(|m| match m.trim_end_matches(" down") {
                "command" => "Cmd".to_string(),
                "option" => "Opt".to_string(),
                "control" => "Ctrl".to_string(),
                "shift" => "Shift".to_string(),
                other => other.to_string(),
            })
            .collect();
        parts.push(self.key.to_uppercase());
        parts.join("+")
    }
}

/// Complete bridge configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Directory shared with the host's piano roll script
    pub bridge_dir: PathBuf,

    /// Request queue file name inside `bridge_dir`
    pub request_file_name: String,

    /// Exported state file name inside `bridge_dir`
    pub state_file_name: String,

    pub poll_interval_ms: u64,

    /// Pause after each dispatch so the host can drain the queue
    pub post_dispatch_delay_ms: u64,

    /// Total dispatch attempts per trigger
    pub max_attempts: u32,

    pub retry_backoff_ms: u64,

    /// Consecutive failed triggers before the aggregated warning
    pub failure_warning_threshold: u32,

    /// Optional JSONL journal of trigger outcomes
    pub journal_file: Option<PathBuf>,

    pub host: HostConfig,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        BridgeConfig {
            bridge_dir: default_bridge_dir(),
            request_file_name: "mcp_request.json".to_string(),
            state_file_name: "piano_roll_state.json".to_string(),
            poll_interval_ms: 300,
            post_dispatch_delay_ms: 300,
            max_attempts: 2,
            retry_backoff_ms: 500,
            failure_warning_threshold: 3,
            journal_file: None,
            host: HostConfig::default(),
        }
    }
}

impl BridgeConfig {
    /// Build a configuration rooted at an explicit directory
    pub fn with_bridge_dir(dir: impl Into<PathBuf>) -> Self {
        BridgeConfig {
            bridge_dir: dir.into(),
            ..Default::default()
        }
    }

    /// Defaults, then the optional JSON config file, then the environment override
    pub fn load(path: Option<&Path>) -> ConfigResult<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };

        if let Ok(dir) = std::env::var(BRIDGE_DIR_ENV) {
            if !dir.trim().is_empty() {
                config.bridge_dir = PathBuf::from(dir);
            }
        }

        Ok(config)
    }

    /// Read a JSON config file; missing keys keep their defaults
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let contents = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    pub fn request_file(&self) -> PathBuf {
        self.bridge_dir.join(&self.request_file_name)
    }

    pub fn state_file(&self) -> PathBuf {
        self.bridge_dir.join(&self.state_file_name)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn post_dispatch_delay(&self) -> Duration {
        Duration::from_millis(self.post_dispatch_delay_ms)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
}

/// FL Studio's piano roll script directory under the user's documents folder
pub fn default_bridge_dir() -> PathBuf {
    let documents = dirs::document_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join("Documents")))
        .unwrap_or_else(|| PathBuf::from("."));

    documents
        .join("Image-Line")
        .join("FL Studio")
        .join("Settings")
        .join("Piano roll scripts")
}
