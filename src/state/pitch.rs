// Pitch names and tick conversion
// Scientific pitch notation and tick-to-beat math driven by the exported PPQ

pub const NOTE_NAMES: [&str; 12] = ["C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B"];

/// Beats per bar used for bar conversion (4/4)
pub const BEATS_PER_BAR: f64 = 4.0;

/// Scientific pitch name, e.g. 60 -> "C4"
pub fn note_name(pitch: i32) -> String {
    let name = NOTE_NAMES[pitch.rem_euclid(12) as usize];
    let octave = pitch.div_euclid(12) - 1;
    format!("{}{}", name, octave)
}

/// Ticks to quarter-note beats; `None` when `ppq` is 0
pub fn ticks_to_beats(ticks: f64, ppq: u32) -> Option<f64> {
    if ppq == 0 {
        return None;
    }
    Some(ticks / ppq as f64)
}

/// Ticks to 4/4 bars; `None` when `ppq` is 0
pub fn ticks_to_bars(ticks: f64, ppq: u32) -> Option<f64> {
    ticks_to_beats(ticks, ppq).map(|beats| beats / BEATS_PER_BAR)
}

/// 1-based (bar, beat) of a tick position
pub fn bar_beat(ticks: f64, ppq: u32) -> Option<(u32, f64)> {
    let beats = ticks_to_beats(ticks, ppq)?;
    let bar = (beats / BEATS_PER_BAR).floor();
    let beat = beats - bar * BEATS_PER_BAR;
    Some((bar as u32 + 1, beat + 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_note_names() {
        assert_eq!(note_name(60), "C4");
        assert_eq!(note_name(72), "C5");
        assert_eq!(note_name(69), "A4");
        assert_eq!(note_name(61), "C#4");
        assert_eq!(note_name(0), "C-1");
        assert_eq!(note_name(127), "G9");
    }

    #[test]
    fn test_ticks_to_beats() {
        assert_eq!(ticks_to_beats(960.0, 480), Some(2.0));
        assert_eq!(ticks_to_bars(1920.0, 480), Some(1.0));
        assert_eq!(ticks_to_beats(960.0, 0), None);
        assert_eq!(ticks_to_bars(960.0, 0), None);
    }

    #[test]
    fn test_bar_beat() {
        assert_eq!(bar_beat(0.0, 96), Some((1, 1.0)));
        assert_eq!(bar_beat(96.0 * 5.0, 96), Some((2, 2.0)));
        assert_eq!(bar_beat(48.0, 96), Some((1, 1.5)));
        assert_eq!(bar_beat(48.0, 0), None);
    }
}
