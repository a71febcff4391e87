// Host wake capability
// The one thing the poller needs from the OS: make the host re-run its last script

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AutomationError {
    #[error("Accessibility permission denied: {0}")]
    PermissionDenied(String),
    #[error("Timeout after {duration_ms}ms: {operation}")]
    Timeout { operation: String, duration_ms: u64 },
    #[error("Host application is not running: {0}")]
    ProcessNotRunning(String),
    #[error("Automation script failed with code {code:?}: {stderr}")]
    ScriptFailed { code: Option<i32>, stderr: String },
    #[error("Failed to launch automation: {0}")]
    Spawn(#[from] std::io::Error),
}

impl AutomationError {
    /// Whether another attempt could succeed without operator action
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AutomationError::Timeout { .. } | AutomationError::ScriptFailed { .. }
        )
    }

    /// Operator hint printed alongside the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            AutomationError::PermissionDenied(_) => Some(
                "Grant access in System Settings > Privacy & Security > Accessibility for your terminal app",
            ),
            AutomationError::ProcessNotRunning(_) => {
                Some("Open FL Studio and a piano roll, then run the bridge script once")
            }
            AutomationError::Spawn(_) => Some("osascript must be available on PATH (macOS only)"),
            _ => None,
        }
    }
}

pub type AutomationResult<T> = Result<T, AutomationError>;

/// Wakes the host application's script runtime
#[allow(async_fn_in_trait)]
pub trait HostWaker {
    async fn wake_host(&mut self) -> AutomationResult<()>;
}
