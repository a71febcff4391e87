// AppleScript host waker
// Drives FL Studio through System Events: find the piano roll, send the shortcut, restore focus

use std::time::Duration;
use tokio::process::Command;

use super::waker::{AutomationError, AutomationResult, HostWaker};
use crate::config::HostConfig;

/// Wakes FL Studio on macOS by running `osascript`
pub struct OsaScriptWaker {
    config: HostConfig,
}

impl OsaScriptWaker {
    pub fn new(config: HostConfig) -> Self {
        OsaScriptWaker { config }
    }

    pub fn config(&self) -> &HostConfig {
        &self.config
    }

    /// Whether System Events lists the host process
    pub async fn is_host_running(&self) -> AutomationResult<bool> {
        let script = running_script(&self.config);
        let stdout = run_osascript(&script, self.config.probe_timeout(), "process check").await?;
        Ok(stdout.to_lowercase().contains("true"))
    }

    /// 1-based index of the first window whose title contains the marker
    pub async fn find_target_window(&self) -> Option<usize> {
        let script = find_window_script(&self.config);
        match run_osascript(&script, self.config.probe_timeout(), "window lookup").await {
            Ok(stdout) => stdout.trim().parse::<usize>().ok().filter(|&i| i > 0),
            Err(e) => {
                log::debug!("Window lookup failed: {}", e);
                None
            }
        }
    }
}

impl HostWaker for OsaScriptWaker {
    async fn wake_host(&mut self) -> AutomationResult<()> {
        if !self.is_host_running().await? {
            return Err(AutomationError::ProcessNotRunning(
                self.config.process_name.clone(),
            ));
        }

        let window = match self.find_target_window().await {
            Some(index) => index,
            None => {
                log::warn!(
                    "No '{}' window found, falling back to window 1. Open and detach a piano roll window.",
                    self.config.window_marker
                );
                1
            }
        };

        let script = trigger_script(&self.config, window);
        run_osascript(&script, self.config.script_timeout(), "trigger").await?;
        Ok(())
    }
}

/// Run one AppleScript, returning stdout on success
async fn run_osascript(script: &str, timeout: Duration, operation: &str) -> AutomationResult<String> {
    let mut command = Command::new("osascript");
    command.arg("-e").arg(script).kill_on_drop(true);

    let output = match tokio::time::timeout(timeout, command.output()).await {
        Ok(result) => result?,
        Err(_) => {
            return Err(AutomationError::Timeout {
                operation: operation.to_string(),
                duration_ms: timeout.as_millis() as u64,
            })
        }
    };

    if output.status.success() {
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        Err(classify_failure(output.status.code(), stderr))
    }
}

/// Map a failed run to an error; permission problems are never retried
pub fn classify_failure(code: Option<i32>, stderr: String) -> AutomationError {
    let lowered = stderr.to_lowercase();
    if lowered.contains("not allowed") || lowered.contains("accessibility") {
        AutomationError::PermissionDenied(stderr)
    } else {
        AutomationError::ScriptFailed { code, stderr }
    }
}

/// Quote a value as an AppleScript string literal
fn quoted(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

fn seconds(duration: Duration) -> String {
    format!("{}", duration.as_secs_f64())
}

pub fn running_script(config: &HostConfig) -> String {
    format!(
        r#"tell application "System Events"
    return (name of processes) contains {process}
end tell"#,
        process = quoted(&config.process_name)
    )
}

pub fn find_window_script(config: &HostConfig) -> String {
    format!(
        r#"tell application "System Events"
    tell process {process}
        set windowIndex to 0
        repeat with w in (every window)
            set windowIndex to windowIndex + 1
            try
                if (title of w) contains {marker} then
                    return windowIndex
                end if
            end try
        end repeat
        return 0
    end tell
end tell"#,
        process = quoted(&config.process_name),
        marker = quoted(&config.window_marker)
    )
}

/// Save focus, raise the host window, send the shortcut, settle, restore focus
pub fn trigger_script(config: &HostConfig, window: usize) -> String {
    let delay = seconds(config.step_delay());
    format!(
        r#"tell application "System Events"
    set originalApp to name of first application process whose frontmost is true
end tell

tell application "System Events"
    tell process {process}
        set frontmost to true
        delay {delay}
        try
            perform action "AXRaise" of window {window}
            delay {delay}
        on error
            try
                perform action "AXRaise" of window 1
                delay {delay}
            end try
        end try
        keystroke {key} using {{{modifiers}}}
    end tell
end tell

delay {delay}

try
    tell application "System Events"
        set frontmost of process originalApp to true
    end tell
end try

return "success""#,
        process = quoted(&config.process_name),
        delay = delay,
        window = window,
        key = quoted(&config.key),
        modifiers = config.modifiers.join(", ")
    )
}
