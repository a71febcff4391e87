// State module
// Reads the host-exported piano roll snapshot and derives summaries from it

pub mod analysis;
pub mod models;
pub mod pitch;
pub mod reader;

pub use analysis::{analyze, describe_notes, PitchRange, StateSummary, TimeSpan, VelocityStats};
pub use models::{ExportedState, StateNote};
pub use pitch::{note_name, ticks_to_bars, ticks_to_beats};
pub use reader::{error_payload, read_state, read_state_value, StateError, StateResult};
