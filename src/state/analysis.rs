// State analysis
// Pitch range, timing span, velocity statistics and color counts for an exported snapshot

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Write;

use super::models::{ExportedState, StateNote};
use super::pitch::{bar_beat, note_name, ticks_to_bars, ticks_to_beats};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PitchRange {
    pub lowest: i32,
    pub highest: i32,
    pub lowest_name: String,
    pub highest_name: String,
    /// e.g. "C4 to C5"
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSpan {
    pub start_ticks: f64,
    /// Latest note end (start + length)
    pub end_ticks: f64,
    pub length_ticks: f64,
    pub start_beat: Option<f64>,
    pub end_beat: Option<f64>,
    pub length_beats: Option<f64>,
    pub length_bars: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VelocityStats {
    pub mean: f64,
    pub min: f64,
    pub max: f64,
}

/// Summary of an exported piano roll
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateSummary {
    pub note_count: usize,
    pub ppq: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pitch_range: Option<PitchRange>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_span: Option<TimeSpan>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub velocity: Option<VelocityStats>,
    /// Note count per color group
    pub colors: BTreeMap<u32, usize>,
}

/// Analyze an exported state snapshot
pub fn analyze(state: &ExportedState) -> StateSummary {
    let notes = &state.notes;

    let mut colors = BTreeMap::new();
    for note in notes {
        *colors.entry(note.color).or_insert(0) += 1;
    }

    StateSummary {
        note_count: notes.len(),
        ppq: state.ppq,
        pitch_range: pitch_range(notes),
        time_span: time_span(notes, state.resolution()),
        velocity: velocity_stats(notes),
        colors,
    }
}

fn pitch_range(notes: &[StateNote]) -> Option<PitchRange> {
    let lowest = notes.iter().map(|n| n.number).min()?;
    let highest = notes.iter().map(|n| n.number).max()?;

    let lowest_name = note_name(lowest);
    let highest_name = note_name(highest);
    let description = format!("{} to {}", lowest_name, highest_name);

    Some(PitchRange {
        lowest,
        highest,
        lowest_name,
        highest_name,
        description,
    })
}

fn time_span(notes: &[StateNote], ppq: Option<u32>) -> Option<TimeSpan> {
    if notes.is_empty() {
        return None;
    }

    let start_ticks = notes.iter().map(|n| n.time).fold(f64::INFINITY, f64::min);
    let end_ticks = notes.iter().map(StateNote::end).fold(f64::NEG_INFINITY, f64::max);
    let length_ticks = end_ticks - start_ticks;

    let beats = |ticks: f64| ppq.and_then(|ppq| ticks_to_beats(ticks, ppq));

    Some(TimeSpan {
        start_ticks,
        end_ticks,
        length_ticks,
        start_beat: beats(start_ticks),
        end_beat: beats(end_ticks),
        length_beats: beats(length_ticks),
        length_bars: ppq.and_then(|ppq| ticks_to_bars(length_ticks, ppq)),
    })
}

fn velocity_stats(notes: &[StateNote]) -> Option<VelocityStats> {
    if notes.is_empty() {
        return None;
    }

    let sum: f64 = notes.iter().map(|n| n.velocity).sum();
    Some(VelocityStats {
        mean: sum / notes.len() as f64,
        min: notes.iter().map(|n| n.velocity).fold(f64::INFINITY, f64::min),
        max: notes.iter().map(|n| n.velocity).fold(f64::NEG_INFINITY, f64::max),
    })
}

/// Human-readable listing of the notes, ordered by start then pitch
pub fn describe_notes(state: &ExportedState, limit: Option<usize>) -> String {
    let ppq = state.resolution();
    let mut notes: Vec<&StateNote> = state.notes.iter().collect();
    notes.sort_by(|a, b| a.time.total_cmp(&b.time).then(a.number.cmp(&b.number)));

    let mut out = String::new();
    match ppq {
        Some(ppq) => {
            let _ = writeln!(out, "{} notes (ppq {})", notes.len(), ppq);
        }
        None => {
            let _ = writeln!(out, "{} notes (no ppq, positions in ticks)", notes.len());
        }
    }

    let shown = limit.unwrap_or(notes.len()).min(notes.len());
    for note in &notes[..shown] {
        let name = note_name(note.number);
        let line = match ppq.and_then(|ppq| Some((bar_beat(note.time, ppq)?, ticks_to_beats(note.length, ppq)?))) {
            Some(((bar, beat), length)) => format!(
                "{} ({}) at bar {} beat {:.2}, {:.2} beats, velocity {:.2}",
                name, note.number, bar, beat, length, note.velocity
            ),
            None => format!(
                "{} ({}) at tick {}, {} ticks, velocity {:.2}",
                name, note.number, note.time, note.length, note.velocity
            ),
        };
        let _ = writeln!(out, "  {}", line);
    }

    if shown < notes.len() {
        let _ = writeln!(out, "  ... {} more", notes.len() - shown);
    }

    out
}
