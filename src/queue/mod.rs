// Request queue module
// Validates note and chord input and appends action records to the shared request file

pub mod chords;
pub mod models;
pub mod writer;

pub use chords::{chord_names, ChordQuality};
pub use models::{Mode, Note, NoteInput, NoteRef, NoteRefInput, Request};
pub use writer::{unknown_chord_message, QueueError, QueueResult, RequestQueue};
