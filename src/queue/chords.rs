// Chord interval table
// Named chord qualities and the semitone offsets stacked on the root

use serde::{Deserialize, Serialize};

/// Supported chord qualities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChordQuality {
    Major,
    Minor,
    Dim,
    Aug,
    Maj7,
    Min7,
    Dom7,
    Sus2,
    Sus4,
    Maj9,
    Min9,
}

impl ChordQuality {
    pub const ALL: [ChordQuality; 11] = [
        ChordQuality::Major,
        ChordQuality::Minor,
        ChordQuality::Dim,
        ChordQuality::Aug,
        ChordQuality::Maj7,
        ChordQuality::Min7,
        ChordQuality::Dom7,
        ChordQuality::Sus2,
        ChordQuality::Sus4,
        ChordQuality::Maj9,
        ChordQuality::Min9,
    ];

    /// Case-insensitive lookup by table name
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim().to_lowercase();
        Self::ALL.into_iter().find(|q| q.name() == name)
    }

    pub fn name(&self) -> &'static str {
        match self {
            ChordQuality::Major => "major",
            ChordQuality::Minor => "minor",
            ChordQuality::Dim => "dim",
            ChordQuality::Aug => "aug",
            ChordQuality::Maj7 => "maj7",
            ChordQuality::Min7 => "min7",
            ChordQuality::Dom7 => "dom7",
            ChordQuality::Sus2 => "sus2",
            ChordQuality::Sus4 => "sus4",
            ChordQuality::Maj9 => "maj9",
            ChordQuality::Min9 => "min9",
        }
    }

    /// Semitones above the root
    pub fn intervals(&self) -> &'static [u8] {
        match self {
            ChordQuality::Major => &[0, 4, 7],
            ChordQuality::Minor => &[0, 3, 7],
            ChordQuality::Dim => &[0, 3, 6],
            ChordQuality::Aug => &[0, 4, 8],
            ChordQuality::Maj7 => &[0, 4, 7, 11],
            ChordQuality::Min7 => &[0, 3, 7, 10],
            ChordQuality::Dom7 => &[0, 4, 7, 10],
            ChordQuality::Sus2 => &[0, 2, 7],
            ChordQuality::Sus4 => &[0, 5, 7],
            ChordQuality::Maj9 => &[0, 4, 7, 11, 14],
            ChordQuality::Min9 => &[0, 3, 7, 10, 14],
        }
    }

    /// Pitches for a chord on `root`, or `None` if any would leave the MIDI range
    pub fn pitches(&self, root: i32) -> Option<Vec<u8>> {
        self.intervals()
            .iter()
            .map(|&i| u8::try_from(root + i as i32).ok().filter(|p| *p <= 127))
            .collect()
    }
}

/// Names accepted by the chord lookup, in table order
pub fn chord_names() -> Vec<&'static str> {
    ChordQuality::ALL.iter().map(|q| q.name()).collect()
}
