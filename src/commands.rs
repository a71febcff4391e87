// Tool commands
// The tool-call surface: every tool takes JSON arguments and answers with plain text
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::PathBuf;

use crate::config::BridgeConfig;
use crate::queue::{
    unknown_chord_message, Mode, Note, NoteInput, NoteRefInput, QueueError, RequestQueue,
};
use crate::state::{self, note_name};

#[derive(Debug, Serialize)]
pub struct CommandError {
    message: String,
}

impl<E: std::fmt::Display> From<E> for CommandError {
    fn from(error: E) -> Self {
        CommandError {
            message: error.to_string(),
        }
    }
}

impl CommandError {
    pub fn message(&self) -> &str {
        &self.message
    }
}

type CommandResult<T> = Result<T, CommandError>;

/// Shared files the tools operate on
#[derive(Debug, Clone)]
pub struct Bridge {
    queue: RequestQueue,
    state_file: PathBuf,
}

impl Bridge {
    pub fn new(request_file: impl Into<PathBuf>, state_file: impl Into<PathBuf>) -> Self {
        Bridge {
            queue: RequestQueue::new(request_file),
            state_file: state_file.into(),
        }
    }

    pub fn from_config(config: &BridgeConfig) -> Self {
        Self::new(config.request_file(), config.state_file())
    }

    pub fn queue(&self) -> &RequestQueue {
        &self.queue
    }
}

/// Name and one-line description of a tool
#[derive(Debug, Clone, Serialize)]
pub struct ToolInfo {
    pub name: &'static str,
    pub description: &'static str,
}

pub fn list_tools() -> Vec<ToolInfo> {
    vec![
        ToolInfo {
            name: "enqueue_notes",
            description: "Queue notes {midi, duration, time?, velocity?} for the piano roll; mode 'add' or 'replace'",
        },
        ToolInfo {
            name: "enqueue_chord_from_name",
            description: "Queue a named chord (major, minor, dim, aug, maj7, min7, dom7, sus2, sus4, maj9, min9) on a MIDI root",
        },
        ToolInfo {
            name: "enqueue_delete",
            description: "Queue deletion of notes identified by {midi, time}",
        },
        ToolInfo {
            name: "clear_queue",
            description: "Discard pending requests without touching the piano roll",
        },
        ToolInfo {
            name: "read_state",
            description: "Return the exported piano roll state as JSON",
        },
        ToolInfo {
            name: "analyze_state",
            description: "Summarize the exported state: pitch range, time span, velocity, colors",
        },
        ToolInfo {
            name: "describe_notes",
            description: "List the exported notes with names, positions and lengths",
        },
    ]
}

/// Run a tool by name; failures come back as "Error: ..." text, never as panics
pub fn invoke(bridge: &Bridge, tool: &str, args: Value) -> String {
    let result = match tool {
        "enqueue_notes" => parse_args(args).and_then(|input| enqueue_notes(bridge, input)),
        "enqueue_chord_from_name" => {
            parse_args(args).and_then(|input| enqueue_chord_from_name(bridge, input))
        }
        "enqueue_delete" => parse_args(args).and_then(|input| enqueue_delete(bridge, input)),
        "clear_queue" => clear_queue(bridge),
        "read_state" => Ok(read_state(bridge)),
        "analyze_state" => Ok(analyze_state(bridge)),
        "describe_notes" => parse_args(args).map(|input| describe_notes(bridge, input)),
        other => Err(CommandError::from(format!("unknown tool '{}'", other))),
    };

    result.unwrap_or_else(|e| format!("Error: {}", e.message))
}

fn parse_args<T: DeserializeOwned>(args: Value) -> CommandResult<T> {
    let args = match args {
        Value::Null => Value::Object(Default::default()),
        other => other,
    };
    serde_json::from_value(args)
        .map_err(|e| CommandError::from(format!("invalid arguments: {}", e)))
}

fn parse_mode(mode: Option<&str>) -> CommandResult<Mode> {
    match mode {
        Some(mode) => Mode::from_string(mode).map_err(|e| queue_error(e, "Invalid mode")),
        None => Ok(Mode::Add),
    }
}

/// Validation messages go out as-is; IO problems get the operation as context
fn queue_error(error: QueueError, context: &str) -> CommandError {
    let message = match error {
        QueueError::Validation(message) => message,
        QueueError::UnknownChord(name) => unknown_chord_message(&name),
        other => format!("{}: {}", context, other),
    };
    CommandError { message }
}

fn midi_list(notes: &[Note]) -> String {
    let pitches: Vec<String> = notes.iter().map(|n| n.midi.to_string()).collect();
    format!("[{}]", pitches.join(", "))
}

// ==================== QUEUE COMMANDS ====================

#[derive(Debug, Deserialize)]
pub struct EnqueueNotesInput {
    pub notes: Vec<NoteInput>,
    pub mode: Option<String>,
}

pub fn enqueue_notes(bridge: &Bridge, input: EnqueueNotesInput) -> CommandResult<String> {
    let mode = parse_mode(input.mode.as_deref())?;
    let notes = bridge
        .queue
        .enqueue_notes(&input.notes, mode)
        .map_err(|e| queue_error(e, "Error sending notes"))?;

    log::info!("Queued {} notes ({})", notes.len(), mode.as_str());

    Ok(format!(
        "Queued {} notes (mode: {}). MIDI notes: {}",
        notes.len(),
        mode.as_str(),
        midi_list(&notes)
    ))
}

#[derive(Debug, Deserialize)]
pub struct EnqueueChordInput {
    pub chord_name: String,
    pub root_note: f64,
    pub octave: Option<i32>,
    pub duration: Option<f64>,
    pub time: Option<f64>,
    pub mode: Option<String>,
}

pub fn enqueue_chord_from_name(bridge: &Bridge, input: EnqueueChordInput) -> CommandResult<String> {
    let mode = parse_mode(input.mode.as_deref())?;
    let notes = bridge
        .queue
        .enqueue_chord(
            &input.chord_name,
            input.root_note,
            input.octave.unwrap_or(0),
            input.duration.unwrap_or(1.0),
            input.time,
            mode,
        )
        .map_err(|e| queue_error(e, "Error sending chord"))?;

    let root = notes.first().map(|n| note_name(n.midi as i32)).unwrap_or_default();
    let placement = match input.time {
        Some(time) => format!("at beat {}", time),
        None => "after the last note".to_string(),
    };

    log::info!("Queued {} chord on {}", input.chord_name.to_lowercase(), root);

    Ok(format!(
        "Queued {} chord on {} {} (mode: {}). MIDI notes: {}",
        input.chord_name.to_lowercase(),
        root,
        placement,
        mode.as_str(),
        midi_list(&notes)
    ))
}

#[derive(Debug, Deserialize)]
pub struct EnqueueDeleteInput {
    pub notes: Vec<NoteRefInput>,
}

pub fn enqueue_delete(bridge: &Bridge, input: EnqueueDeleteInput) -> CommandResult<String> {
    let targets = bridge
        .queue
        .enqueue_delete(&input.notes)
        .map_err(|e| queue_error(e, "Error creating delete request"))?;

    let pitches: Vec<String> = targets.iter().map(|n| n.midi.to_string()).collect();
    Ok(format!(
        "Delete request for {} notes added to queue. MIDI notes: [{}]",
        targets.len(),
        pitches.join(", ")
    ))
}

pub fn clear_queue(bridge: &Bridge) -> CommandResult<String> {
    bridge
        .queue
        .clear()
        .map_err(|e| queue_error(e, "Error clearing queue"))?;

    log::info!("Request queue cleared");
    Ok("Queue cleared. All pending requests have been discarded.".to_string())
}

// ==================== STATE COMMANDS ====================

fn pretty(value: &impl Serialize) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|e| format!("Error: {}", e))
}

/// Exported state as pretty JSON, or an error payload
pub fn read_state(bridge: &Bridge) -> String {
    match state::read_state_value(&bridge.state_file) {
        Ok(value) => pretty(&value),
        Err(e) => pretty(&state::error_payload(&e, &bridge.state_file)),
    }
}

/// State summary as pretty JSON, or an error payload
pub fn analyze_state(bridge: &Bridge) -> String {
    match state::read_state(&bridge.state_file) {
        Ok(exported) => pretty(&state::analyze(&exported)),
        Err(e) => pretty(&state::error_payload(&e, &bridge.state_file)),
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct DescribeNotesInput {
    pub limit: Option<usize>,
}

pub fn describe_notes(bridge: &Bridge, input: DescribeNotesInput) -> String {
    match state::read_state(&bridge.state_file) {
        Ok(exported) => state::describe_notes(&exported, input.limit),
        Err(e) => pretty(&state::error_payload(&e, &bridge.state_file)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    fn bridge_in(temp_dir: &TempDir) -> Bridge {
        Bridge::new(
            temp_dir.path().join("mcp_request.json"),
            temp_dir.path().join("piano_roll_state.json"),
        )
    }

    #[test]
    fn test_enqueue_notes_outcome() {
        let temp_dir = TempDir::new().unwrap();
        let bridge = bridge_in(&temp_dir);

        let out = invoke(
            &bridge,
            "enqueue_notes",
            json!({"notes": [{"midi": 60, "duration": 1.0}, {"midi": 64, "duration": 0.5, "time": 1}]}),
        );
        assert_eq!(out, "Queued 2 notes (mode: add). MIDI notes: [60, 64]");
        assert_eq!(bridge.queue().load().len(), 1);
    }

    #[test]
    fn test_enqueue_notes_validation() {
        let temp_dir = TempDir::new().unwrap();
        let bridge = bridge_in(&temp_dir);

        let out = invoke(&bridge, "enqueue_notes", json!({"notes": []}));
        assert_eq!(out, "Error: notes list cannot be empty");

        let out = invoke(&bridge, "enqueue_notes", json!({"notes": [{"duration": 1.0}]}));
        assert_eq!(out, "Error: note 0 missing required 'midi' field");

        let out = invoke(
            &bridge,
            "enqueue_notes",
            json!({"notes": [{"midi": 60, "duration": 1.0}], "mode": "merge"}),
        );
        assert!(out.starts_with("Error: unknown mode 'merge'"));

        assert!(!bridge.queue().path().exists());
    }

    #[test]
    fn test_replace_mode_via_tool() {
        let temp_dir = TempDir::new().unwrap();
        let bridge = bridge_in(&temp_dir);

        invoke(&bridge, "enqueue_notes", json!({"notes": [{"midi": 60, "duration": 1}]}));
        let out = invoke(
            &bridge,
            "enqueue_notes",
            json!({"notes": [{"midi": 67, "duration": 2}], "mode": "replace"}),
        );
        assert!(out.contains("mode: replace"));

        let requests = bridge.queue().load();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0], json!({"action": "clear"}));
    }

    #[test]
    fn test_chord_tool() {
        let temp_dir = TempDir::new().unwrap();
        let bridge = bridge_in(&temp_dir);

        let out = invoke(
            &bridge,
            "enqueue_chord_from_name",
            json!({"chord_name": "MAJ7", "root_note": 60}),
        );
        assert_eq!(
            out,
            "Queued maj7 chord on C4 after the last note (mode: add). MIDI notes: [60, 64, 67, 71]"
        );

        let out = invoke(
            &bridge,
            "enqueue_chord_from_name",
            json!({"chord_name": "minor", "root_note": 57, "octave": 1, "time": 4}),
        );
        assert!(out.contains("on A4 at beat 4"));
    }

    #[test]
    fn test_chord_tool_float_root() {
        let temp_dir = TempDir::new().unwrap();
        let bridge = bridge_in(&temp_dir);

        let out = invoke(
            &bridge,
            "enqueue_chord_from_name",
            json!({"chord_name": "major", "root_note": 60.0}),
        );
        assert!(out.ends_with("MIDI notes: [60, 64, 67]"));

        let out = invoke(
            &bridge,
            "enqueue_chord_from_name",
            json!({"chord_name": "major", "root_note": 60.5}),
        );
        assert_eq!(out, "Error: chord root_note 60.5 must be a whole MIDI note number");
    }

    #[test]
    fn test_chord_octave_overflow() {
        let temp_dir = TempDir::new().unwrap();
        let bridge = bridge_in(&temp_dir);

        let out = invoke(
            &bridge,
            "enqueue_chord_from_name",
            json!({"chord_name": "major", "root_note": 60, "octave": 300000000}),
        );
        assert!(out.starts_with("Error: major chord on root 60"));
        assert!(out.ends_with("leaves the MIDI range 0-127"));
        assert!(!bridge.queue().path().exists());
    }

    #[test]
    fn test_unknown_chord_tool() {
        let temp_dir = TempDir::new().unwrap();
        let bridge = bridge_in(&temp_dir);

        let out = invoke(
            &bridge,
            "enqueue_chord_from_name",
            json!({"chord_name": "lydian", "root_note": 60}),
        );
        assert!(out.starts_with("Error: Unknown chord 'lydian'. Available: major, minor"));
        assert!(!bridge.queue().path().exists());
    }

    #[test]
    fn test_delete_and_clear_tools() {
        let temp_dir = TempDir::new().unwrap();
        let bridge = bridge_in(&temp_dir);

        let out = invoke(&bridge, "enqueue_delete", json!({"notes": [{"midi": 67, "time": 4}]}));
        assert_eq!(out, "Delete request for 1 notes added to queue. MIDI notes: [67]");

        let out = invoke(&bridge, "enqueue_delete", json!({"notes": [{"midi": 67}]}));
        assert_eq!(out, "Error: note 0 missing required 'time' field");

        let out = invoke(&bridge, "clear_queue", Value::Null);
        assert_eq!(out, "Queue cleared. All pending requests have been discarded.");
        assert_eq!(fs::read_to_string(bridge.queue().path()).unwrap(), "[]");
    }

    #[test]
    fn test_write_failure_is_reported() {
        let temp_dir = TempDir::new().unwrap();
        let bridge = Bridge::new(
            temp_dir.path().join("missing").join("mcp_request.json"),
            temp_dir.path().join("piano_roll_state.json"),
        );

        let out = invoke(&bridge, "enqueue_notes", json!({"notes": [{"midi": 60, "duration": 1}]}));
        assert!(out.starts_with("Error: Error sending notes: IO error"));

        let out = invoke(&bridge, "clear_queue", json!({}));
        assert!(out.starts_with("Error: Error clearing queue"));
    }

    #[test]
    fn test_state_tools_without_file() {
        let temp_dir = TempDir::new().unwrap();
        let bridge = bridge_in(&temp_dir);

        for tool in ["read_state", "analyze_state", "describe_notes"] {
            let out = invoke(&bridge, tool, json!({}));
            let payload: Value = serde_json::from_str(&out).unwrap();
            assert!(payload["error"].as_str().unwrap().contains("No piano roll state file"));
            assert!(payload["expected_location"].is_string());
        }
    }

    #[test]
    fn test_analyze_state_tool() {
        let temp_dir = TempDir::new().unwrap();
        let bridge = bridge_in(&temp_dir);
        fs::write(
            temp_dir.path().join("piano_roll_state.json"),
            r#"{"ppq": 480, "notes": [
                {"number": 60, "time": 0, "length": 480, "velocity": 0.8, "pan": 0.5, "color": 0},
                {"number": 72, "time": 1440, "length": 480, "velocity": 0.6, "pan": 0.5, "color": 1}
            ]}"#,
        )
        .unwrap();

        let summary: Value = serde_json::from_str(&invoke(&bridge, "analyze_state", json!({}))).unwrap();
        assert_eq!(summary["note_count"], 2);
        assert_eq!(summary["pitch_range"]["description"], "C4 to C5");
        assert_eq!(summary["time_span"]["length_bars"], 1.0);

        let raw: Value = serde_json::from_str(&invoke(&bridge, "read_state", json!({}))).unwrap();
        assert_eq!(raw["ppq"], 480);

        let text = invoke(&bridge, "describe_notes", json!({"limit": 1}));
        assert!(text.starts_with("2 notes (ppq 480)"));
        assert!(text.contains("... 1 more"));
    }

    #[test]
    fn test_bad_arguments_and_unknown_tool() {
        let temp_dir = TempDir::new().unwrap();
        let bridge = bridge_in(&temp_dir);

        let out = invoke(&bridge, "enqueue_notes", json!({"notes": "C major"}));
        assert!(out.starts_with("Error: invalid arguments"));

        let out = invoke(&bridge, "transpose", json!({}));
        assert_eq!(out, "Error: unknown tool 'transpose'");
    }

    #[test]
    fn test_list_tools() {
        let names: Vec<&str> = list_tools().iter().map(|t| t.name).collect();
        assert_eq!(
            names,
            vec![
                "enqueue_notes",
                "enqueue_chord_from_name",
                "enqueue_delete",
                "clear_queue",
                "read_state",
                "analyze_state",
                "describe_notes"
            ]
        );
    }
}
