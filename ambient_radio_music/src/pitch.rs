// Pitch mapping: semitone intervals <-> frequencies <-> screen positions.
//
// Equal temperament throughout: one semitone is a factor of 2^(1/12).
// Frequencies are always derived from the current base note (the "pitch"
// control) plus a scale interval, never stored independently of one, which
// is why `Note` carries its interval alongside its frequency.
//
// The position helpers serve the visualizer collaborator: a click's
// horizontal position snaps to a scale interval, and a generated note's
// frequency maps back to a horizontal position so chord members spread out
// on screen. Positions are fractions (0.0 = left edge, 1.0 = right edge);
// turning them into pixels is the visualizer's business.

/// Frequency of `semitones` above (or below, if negative) `root_hz`.
pub fn frequency_for_interval(root_hz: f64, semitones: i32) -> f64 {
    root_hz * 2f64.powf(semitones as f64 / 12.0)
}

/// How many Hz an interval of `semitones` spans above the root. Phrase
/// building uses it as the largest Hz distance a picked tone may have from
/// its anchor, whatever the anchor's own pitch.
pub fn interval_hz_span(root_hz: f64, semitones: i32) -> f64 {
    frequency_for_interval(root_hz, semitones) - root_hz
}

/// Scale interval under a horizontal position. `x_fraction` is clamped to
/// [0, 1]; the right edge maps to the highest interval.
pub fn interval_for_position(intervals: &[i32], x_fraction: f64) -> i32 {
    if intervals.is_empty() {
        return 0;
    }
    let x = x_fraction.clamp(0.0, 1.0);
    let index = ((x * intervals.len() as f64).floor() as usize).min(intervals.len() - 1);
    intervals[index]
}

/// Horizontal position (0..=1) for a frequency, relative to the highest
/// frequency the scale can produce from `root_hz`.
pub fn position_for_frequency(root_hz: f64, intervals: &[i32], frequency_hz: f64) -> f64 {
    let top = intervals.last().copied().unwrap_or(0);
    let top_hz = frequency_for_interval(root_hz, top);
    if top_hz <= 0.0 {
        return 0.0;
    }
    (frequency_hz / top_hz).clamp(0.0, 1.0)
}

/// Nearest MIDI key for a frequency (A4 = 440 Hz = key 69), clamped to the
/// MIDI range.
pub fn midi_key_for_frequency(frequency_hz: f64) -> u8 {
    if frequency_hz <= 0.0 {
        return 0;
    }
    let key = 69.0 + 12.0 * (frequency_hz / 440.0).log2();
    key.round().clamp(0.0, 127.0) as u8
}
