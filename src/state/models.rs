// Exported piano roll state
// Snapshot written by the host script; this crate only ever reads it

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StateNote {
    /// Key number; FL Studio's roll extends past 127
    pub number: i32,

    /// Start position in ticks
    pub time: f64,

    /// Length in ticks
    pub length: f64,

    /// Velocity [0.0, 1.0]
    pub velocity: f64,

    pub pan: f64,

    /// Color group index
    pub color: u32,
}

impl StateNote {
    /// End position in ticks
    pub fn end(&self) -> f64 {
        self.time + self.length
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportedState {
    pub notes: Vec<StateNote>,

    /// Pulses per quarter note; absent or 0 disables beat conversion
    pub ppq: Option<u32>,
}

impl ExportedState {
    /// PPQ usable as a divisor
    pub fn resolution(&self) -> Option<u32> {
        self.ppq.filter(|&ppq| ppq > 0)
    }
}
