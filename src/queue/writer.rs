// Request queue file operations
// Each operation reads the whole queue file, mutates it in memory and rewrites it

use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use super::chords::{chord_names, ChordQuality};
use super::models::{
    is_whole, Mode, Note, NoteInput, NoteRef, NoteRefInput, Request, DEFAULT_VELOCITY,
};

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Unknown chord '{0}'")]
    UnknownChord(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type QueueResult<T> = Result<T, QueueError>;

/// Handle to the shared request file
///
/// There is no locking: the host script drains the same file, and concurrent
/// writers resolve as last-write-wins.
#[derive(Debug, Clone)]
pub struct RequestQueue {
    path: PathBuf,
}

impl RequestQueue {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        RequestQueue { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current queue contents; a missing or malformed file reads as empty
    ///
    /// Records are kept as raw JSON so entries this crate does not model survive a rewrite.
    pub fn load(&self) -> Vec<Value> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(_) => return Vec::new(),
        };

        match serde_json::from_str::<Value>(&contents) {
            Ok(Value::Array(requests)) => requests,
            Ok(_) => {
                log::warn!("Request file {} is not a list, treating as empty", self.path.display());
                Vec::new()
            }
            Err(e) => {
                log::warn!("Request file {} is malformed ({}), treating as empty", self.path.display(), e);
                Vec::new()
            }
        }
    }

    /// True when the file parses as a non-empty list
    pub fn has_pending(&self) -> bool {
        !self.load().is_empty()
    }

    fn store(&self, requests: &[Value]) -> QueueResult<()> {
        let json = serde_json::to_string_pretty(requests)?;
        fs::write(&self.path, json)?;
        Ok(())
    }

    /// Append one request, resetting the queue to a single clear record in replace mode
    fn push(&self, request: &Request, mode: Mode) -> QueueResult<usize> {
        let mut requests = match mode {
            Mode::Replace => vec![serde_json::to_value(Request::Clear)?],
            Mode::Add => self.load(),
        };

        requests.push(serde_json::to_value(request)?);
        self.store(&requests)?;

        log::debug!(
            "Queued {} request ({} pending) in {}",
            request.action(),
            requests.len(),
            self.path.display()
        );

        Ok(requests.len())
    }

    /// Validate notes, fill defaults and queue an `add_notes` request
    pub fn enqueue_notes(&self, notes: &[NoteInput], mode: Mode) -> QueueResult<Vec<Note>> {
        if notes.is_empty() {
            return Err(QueueError::Validation("notes list cannot be empty".to_string()));
        }

        let prepared = notes
            .iter()
            .enumerate()
            .map(|(i, note)| note.prepare(i))
            .collect::<QueueResult<Vec<Note>>>()?;

        let request = Request::AddNotes {
            notes: prepared.clone(),
            mode,
        };
        self.push(&request, mode)?;

        Ok(prepared)
    }

    /// Build a chord from the interval table and queue an `add_chord` request
    ///
    /// `octave` shifts the root by whole octaves. A `time` of `None` leaves
    /// placement after the last existing note to the host script.
    pub fn enqueue_chord(
        &self,
        chord_name: &str,
        root_note: f64,
        octave: i32,
        duration: f64,
        time: Option<f64>,
        mode: Mode,
    ) -> QueueResult<Vec<Note>> {
        let quality = ChordQuality::from_name(chord_name)
            .ok_or_else(|| QueueError::UnknownChord(chord_name.to_string()))?;

        if !(duration.is_finite() && duration > 0.0) {
            return Err(QueueError::Validation(format!(
                "chord duration {} must be greater than 0",
                duration
            )));
        }
        if let Some(time) = time {
            if !(time.is_finite() && time >= 0.0) {
                return Err(QueueError::Validation(format!(
                    "chord time {} must be 0 or later",
                    time
                )));
            }
        }

        if !is_whole(root_note) || root_note.abs() > i32::MAX as f64 {
            return Err(QueueError::Validation(format!(
                "chord root_note {} must be a whole MIDI note number",
                root_note
            )));
        }
        let root = octave
            .checked_mul(12)
            .and_then(|shift| (root_note as i32).checked_add(shift))
            .ok_or_else(|| {
                QueueError::Validation(format!(
                    "{} chord on root {} shifted by {} octaves leaves the MIDI range 0-127",
                    quality.name(),
                    root_note,
                    octave
                ))
            })?;
        let pitches = quality.pitches(root).ok_or_else(|| {
            QueueError::Validation(format!(
                "{} chord on root {} leaves the MIDI range 0-127",
                quality.name(),
                root
            ))
        })?;

        // Chord tones share the chord's onset
        let notes: Vec<Note> = pitches
            .iter()
            .map(|&midi| Note {
                midi,
                duration,
                time: 0.0,
                velocity: DEFAULT_VELOCITY,
            })
            .collect();

        let request = Request::AddChord {
            chord_name: quality.name().to_string(),
            notes: notes.clone(),
            root_note: pitches[0],
            duration,
            time,
            mode,
        };
        self.push(&request, mode)?;

        Ok(notes)
    }

    /// Queue a `delete_notes` request naming notes by pitch and start time
    pub fn enqueue_delete(&self, notes: &[NoteRefInput]) -> QueueResult<Vec<NoteRef>> {
        if notes.is_empty() {
            return Err(QueueError::Validation("notes list cannot be empty".to_string()));
        }

        let targets = notes
            .iter()
            .enumerate()
            .map(|(i, note)| note.prepare(i))
            .collect::<QueueResult<Vec<NoteRef>>>()?;

        let request = Request::DeleteNotes {
            notes: targets.clone(),
        };
        self.push(&request, Mode::Add)?;

        Ok(targets)
    }

    /// Discard every pending request, whatever the file held before
    pub fn clear(&self) -> QueueResult<()> {
        fs::write(&self.path, "[]")?;
        Ok(())
    }
}

/// Message for an unknown chord that lists the accepted names
pub fn unknown_chord_message(name: &str) -> String {
    format!(
        "Unknown chord '{}'. Available: {}",
        name,
        chord_names().join(", ")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn queue_in(temp_dir: &TempDir) -> RequestQueue {
        RequestQueue::new(temp_dir.path().join("mcp_request.json"))
    }

    #[test]
    fn test_enqueue_notes_creates_file() {
        let temp_dir = TempDir::new().unwrap();
        let queue = queue_in(&temp_dir);

        let notes = queue
            .enqueue_notes(
                &[NoteInput::new(60, 1.0), NoteInput::new(64, 0.5).at(1.0).with_velocity(0.5)],
                Mode::Add,
            )
            .unwrap();
        assert_eq!(notes.len(), 2);

        let requests = queue.load();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0]["action"], "add_notes");
        assert_eq!(requests[0]["mode"], "add");
        assert_eq!(
            requests[0]["notes"],
            json!([
                {"midi": 60, "duration": 1.0, "time": 0.0, "velocity": 0.8},
                {"midi": 64, "duration": 0.5, "time": 1.0, "velocity": 0.5}
            ])
        );
    }

    #[test]
    fn test_add_mode_appends() {
        let temp_dir = TempDir::new().unwrap();
        let queue = queue_in(&temp_dir);

        queue.enqueue_notes(&[NoteInput::new(60, 1.0)], Mode::Add).unwrap();
        queue.enqueue_notes(&[NoteInput::new(62, 1.0)], Mode::Add).unwrap();

        let requests = queue.load();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[1]["notes"][0]["midi"], 62);
    }

    #[test]
    fn test_empty_notes_does_not_write() {
        let temp_dir = TempDir::new().unwrap();
        let queue = queue_in(&temp_dir);

        let err = queue.enqueue_notes(&[], Mode::Replace).unwrap_err();
        assert!(matches!(err, QueueError::Validation(_)));
        assert!(!queue.path().exists());
    }

    #[test]
    fn test_invalid_note_does_not_write() {
        let temp_dir = TempDir::new().unwrap();
        let queue = queue_in(&temp_dir);
        fs::write(queue.path(), "[{\"action\": \"clear\"}]").unwrap();

        let bad = NoteInput {
            midi: Some(60.0),
            ..Default::default()
        };
        assert!(queue.enqueue_notes(&[NoteInput::new(60, 1.0), bad], Mode::Add).is_err());
        assert_eq!(
            fs::read_to_string(queue.path()).unwrap(),
            "[{\"action\": \"clear\"}]"
        );
    }

    #[test]
    fn test_replace_mode_resets_queue() {
        let temp_dir = TempDir::new().unwrap();
        let queue = queue_in(&temp_dir);

        queue.enqueue_notes(&[NoteInput::new(60, 1.0)], Mode::Add).unwrap();
        queue.enqueue_delete(&[NoteRefInput::new(60, 0.0)]).unwrap();
        queue.enqueue_notes(&[NoteInput::new(72, 4.0)], Mode::Replace).unwrap();

        let requests = queue.load();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0], json!({"action": "clear"}));
        assert_eq!(requests[1]["action"], "add_notes");
        assert_eq!(requests[1]["mode"], "replace");
        assert_eq!(requests[1]["notes"][0]["midi"], 72);
    }

    #[test]
    fn test_malformed_file_treated_as_empty() {
        let temp_dir = TempDir::new().unwrap();
        let queue = queue_in(&temp_dir);
        fs::write(queue.path(), "{{ definitely not json").unwrap();

        assert!(queue.load().is_empty());
        queue.enqueue_notes(&[NoteInput::new(60, 1.0)], Mode::Add).unwrap();
        assert_eq!(queue.load().len(), 1);
    }

    #[test]
    fn test_unmodelled_records_survive() {
        let temp_dir = TempDir::new().unwrap();
        let queue = queue_in(&temp_dir);
        fs::write(queue.path(), r#"[{"action": "transpose", "semitones": 2}]"#).unwrap();

        queue.enqueue_notes(&[NoteInput::new(60, 1.0)], Mode::Add).unwrap();
        let requests = queue.load();
        assert_eq!(requests[0]["action"], "transpose");
        assert_eq!(requests[0]["semitones"], 2);
    }

    #[test]
    fn test_enqueue_chord_maj7() {
        let temp_dir = TempDir::new().unwrap();
        let queue = queue_in(&temp_dir);

        let notes = queue.enqueue_chord("Maj7", 60.0, 0, 2.0, Some(4.0), Mode::Add).unwrap();
        let pitches: Vec<u8> = notes.iter().map(|n| n.midi).collect();
        assert_eq!(pitches, vec![60, 64, 67, 71]);
        assert!(notes.iter().all(|n| n.time == 0.0 && n.duration == 2.0));

        let requests = queue.load();
        assert_eq!(requests[0]["action"], "add_chord");
        assert_eq!(requests[0]["chord_name"], "maj7");
        assert_eq!(requests[0]["root_note"], 60);
        assert_eq!(requests[0]["time"], 4.0);
    }

    #[test]
    fn test_chord_octave_shift_and_open_time() {
        let temp_dir = TempDir::new().unwrap();
        let queue = queue_in(&temp_dir);

        let notes = queue.enqueue_chord("minor", 57.0, -1, 1.0, None, Mode::Add).unwrap();
        let pitches: Vec<u8> = notes.iter().map(|n| n.midi).collect();
        assert_eq!(pitches, vec![45, 48, 52]);

        let requests = queue.load();
        assert!(requests[0]["time"].is_null());
        assert_eq!(requests[0]["root_note"], 45);
    }

    #[test]
    fn test_unknown_chord_leaves_file_untouched() {
        let temp_dir = TempDir::new().unwrap();
        let queue = queue_in(&temp_dir);
        queue.enqueue_notes(&[NoteInput::new(60, 1.0)], Mode::Add).unwrap();
        let before = fs::read_to_string(queue.path()).unwrap();

        let err = queue.enqueue_chord("lydian", 60.0, 0, 1.0, None, Mode::Replace).unwrap_err();
        assert!(matches!(err, QueueError::UnknownChord(ref name) if name == "lydian"));
        assert_eq!(fs::read_to_string(queue.path()).unwrap(), before);
    }

    #[test]
    fn test_chord_out_of_range() {
        let temp_dir = TempDir::new().unwrap();
        let queue = queue_in(&temp_dir);

        let err = queue.enqueue_chord("maj9", 120.0, 0, 1.0, None, Mode::Add).unwrap_err();
        assert!(matches!(err, QueueError::Validation(_)));
        assert!(!queue.path().exists());
    }

    #[test]
    fn test_chord_octave_overflow() {
        let temp_dir = TempDir::new().unwrap();
        let queue = queue_in(&temp_dir);

        let err = queue
            .enqueue_chord("major", 60.0, 300_000_000, 1.0, None, Mode::Add)
            .unwrap_err();
        assert!(matches!(err, QueueError::Validation(ref m) if m.contains("leaves the MIDI range")));

        let err = queue
            .enqueue_chord("major", 60.0, i32::MIN, 1.0, None, Mode::Add)
            .unwrap_err();
        assert!(matches!(err, QueueError::Validation(_)));

        // Large values that would wrap back into range are still rejected
        let err = queue
            .enqueue_chord("major", 60.0, 357_913_942, 1.0, None, Mode::Add)
            .unwrap_err();
        assert!(matches!(err, QueueError::Validation(_)));
        assert!(!queue.path().exists());
    }

    #[test]
    fn test_chord_root_as_float() {
        let temp_dir = TempDir::new().unwrap();
        let queue = queue_in(&temp_dir);

        let notes = queue.enqueue_chord("sus4", 62.0, 0, 1.0, None, Mode::Add).unwrap();
        let pitches: Vec<u8> = notes.iter().map(|n| n.midi).collect();
        assert_eq!(pitches, vec![62, 67, 69]);

        for root in [60.5, f64::NAN, f64::INFINITY, 3e10] {
            let err = queue
                .enqueue_chord("major", root, 0, 1.0, None, Mode::Add)
                .unwrap_err();
            assert!(matches!(err, QueueError::Validation(ref m) if m.contains("whole MIDI note")));
        }
        assert_eq!(queue.load().len(), 1);
    }

    #[test]
    fn test_enqueue_delete() {
        let temp_dir = TempDir::new().unwrap();
        let queue = queue_in(&temp_dir);

        queue
            .enqueue_delete(&[NoteRefInput::new(67, 4.0), NoteRefInput::new(72, 8.0)])
            .unwrap();

        let requests = queue.load();
        assert_eq!(
            requests[0],
            json!({
                "action": "delete_notes",
                "notes": [{"midi": 67, "time": 4.0}, {"midi": 72, "time": 8.0}]
            })
        );

        assert!(queue.enqueue_delete(&[]).is_err());
    }

    #[test]
    fn test_clear_overwrites_malformed_content() {
        let temp_dir = TempDir::new().unwrap();
        let queue = queue_in(&temp_dir);
        fs::write(queue.path(), "garbage").unwrap();

        queue.clear().unwrap();
        assert_eq!(fs::read_to_string(queue.path()).unwrap(), "[]");
        assert!(!queue.has_pending());
    }

    #[test]
    fn test_write_failure_is_io_error() {
        let temp_dir = TempDir::new().unwrap();
        let queue = RequestQueue::new(temp_dir.path().join("missing").join("mcp_request.json"));

        let err = queue.enqueue_notes(&[NoteInput::new(60, 1.0)], Mode::Add).unwrap_err();
        assert!(matches!(err, QueueError::Io(_)));
    }

    #[test]
    fn test_unknown_chord_message_lists_names() {
        let message = unknown_chord_message("lydian");
        assert!(message.starts_with("Unknown chord 'lydian'"));
        assert!(message.contains("maj7"));
        assert!(message.contains("min9"));
    }
}
