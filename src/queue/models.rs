// Request queue data models
// Records written to the shared request file and the tool inputs they are built from

use serde::{Deserialize, Serialize};

use super::QueueError;

/// Velocity applied when a note omits one
pub const DEFAULT_VELOCITY: f64 = 0.8;

/// Start time applied when a note omits one (quarter notes)
pub const DEFAULT_TIME: f64 = 0.0;

/// How a request relates to what is already queued
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Append to pending requests and existing notes
    #[default]
    Add,

    /// Discard pending requests and clear the piano roll first
    Replace,
}

impl Mode {
    pub fn from_string(s: &str) -> Result<Self, QueueError> {
        match s.trim().to_lowercase().as_str() {
            "add" => Ok(Mode::Add),
            "replace" => Ok(Mode::Replace),
            other => Err(QueueError::Validation(format!(
                "unknown mode '{}', expected 'add' or 'replace'",
                other
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Add => "add",
            Mode::Replace => "replace",
        }
    }
}

/// A fully specified note as the host script consumes it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    /// MIDI note number (0-127)
    pub midi: u8,

    /// Length in quarter notes
    pub duration: f64,

    /// Start offset in quarter notes
    pub time: f64,

    /// Velocity [0.0, 1.0]
    pub velocity: f64,
}

/// Identifies a note for deletion by pitch and start position
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoteRef {
    pub midi: u8,
    pub time: f64,
}

/// One record in the request queue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Request {
    AddNotes {
        notes: Vec<Note>,
        mode: Mode,
    },
    AddChord {
        chord_name: String,
        notes: Vec<Note>,
        root_note: u8,
        duration: f64,
        /// `None` asks the host script to place the chord after the last note
        time: Option<f64>,
        mode: Mode,
    },
    DeleteNotes {
        notes: Vec<NoteRef>,
    },
    Clear,
}

impl Request {
    pub fn action(&self) -> &'static str {
        match self {
            Request::AddNotes { .. } => "add_notes",
            Request::AddChord { .. } => "add_chord",
            Request::DeleteNotes { .. } => "delete_notes",
            Request::Clear => "clear",
        }
    }
}

/// Caller-supplied note; every field is optional so missing ones can be reported
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct NoteInput {
    pub midi: Option<f64>,
    pub duration: Option<f64>,
    pub time: Option<f64>,
    pub velocity: Option<f64>,
}

impl NoteInput {
    pub fn new(midi: u8, duration: f64) -> Self {
        NoteInput {
            midi: Some(midi as f64),
            duration: Some(duration),
            ..Default::default()
        }
    }

    pub fn at(mut self, time: f64) -> Self {
        self.time = Some(time);
        self
    }

    pub fn with_velocity(mut self, velocity: f64) -> Self {
        self.velocity = Some(velocity);
        self
    }

    /// Validate and fill defaults; `index` is only used in error messages
    pub fn prepare(&self, index: usize) -> Result<Note, QueueError> {
        let midi = self.midi.ok_or_else(|| missing_field(index, "midi"))?;
        let duration = self.duration.ok_or_else(|| missing_field(index, "duration"))?;
        let time = self.time.unwrap_or(DEFAULT_TIME);
        let velocity = self.velocity.unwrap_or(DEFAULT_VELOCITY);

        let midi = validate_midi(index, midi)?;

        if !(duration.is_finite() && duration > 0.0) {
            return Err(QueueError::Validation(format!(
                "note {} has invalid 'duration' {}, must be greater than 0",
                index, duration
            )));
        }
        validate_time(index, time)?;
        if !(0.0..=1.0).contains(&velocity) {
            return Err(QueueError::Validation(format!(
                "note {} has invalid 'velocity' {}, must be between 0 and 1",
                index, velocity
            )));
        }

        Ok(Note {
            midi,
            duration,
            time,
            velocity,
        })
    }
}

/// Caller-supplied deletion target
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct NoteRefInput {
    pub midi: Option<f64>,
    pub time: Option<f64>,
}

impl NoteRefInput {
    pub fn new(midi: u8, time: f64) -> Self {
        NoteRefInput {
            midi: Some(midi as f64),
            time: Some(time),
        }
    }

    pub fn prepare(&self, index: usize) -> Result<NoteRef, QueueError> {
        let midi = self.midi.ok_or_else(|| missing_field(index, "midi"))?;
        let time = self.time.ok_or_else(|| missing_field(index, "time"))?;

        Ok(NoteRef {
            midi: validate_midi(index, midi)?,
            time: validate_time(index, time)?,
        })
    }
}

fn missing_field(index: usize, field: &str) -> QueueError {
    QueueError::Validation(format!("note {} missing required '{}' field", index, field))
}

/// JSON numbers arrive as floats; pitch fields must still be whole numbers
pub(crate) fn is_whole(value: f64) -> bool {
    value.is_finite() && value.fract() == 0.0
}

fn validate_midi(index: usize, midi: f64) -> Result<u8, QueueError> {
    if !is_whole(midi) || !(0.0..=127.0).contains(&midi) {
        return Err(QueueError::Validation(format!(
            "note {} has invalid 'midi' {}, must be an integer 0-127",
            index, midi
        )));
    }
    Ok(midi as u8)
}

fn validate_time(index: usize, time: f64) -> Result<f64, QueueError> {
    if !(time.is_finite() && time >= 0.0) {
        return Err(QueueError::Validation(format!(
            "note {} has invalid 'time' {}, must be 0 or later",
            index, time
        )));
    }
    Ok(time)
}
