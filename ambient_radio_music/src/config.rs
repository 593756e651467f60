// Tunable composer parameters.
//
// Every weight, range and limit the engine uses lives in `ComposerConfig`,
// grouped like the sections of the engine: `NoteParams` for the note
// assembler, `PhraseParams` for chords/arpeggios/melodies, and
// `ScheduleParams` for the scheduler and short-term memory. Defaults give
// the radio its intended character; a JSON file can override any subset of
// fields (missing fields keep their defaults via `#[serde(default)]`).
//
// Percentages are 0–100, matching `RandomSource::maybe`. Durations are in
// seconds unless the field name says otherwise.

use crate::error::RadioError;
use crate::random::RandomSource;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// A `[low, high)` range to sample uniformly from.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Span {
    pub low: f64,
    pub high: f64,
}

impl Span {
    pub const fn new(low: f64, high: f64) -> Self {
        Span { low, high }
    }

    pub fn sample(&self, rng: &mut impl RandomSource) -> f64 {
        rng.range_f64(self.low, self.high)
    }

    fn check(&self, field: &str) -> Result<(), RadioError> {
        if !(self.low >= 0.0 && self.low <= self.high && self.high.is_finite()) {
            return Err(RadioError::InvalidConfig(format!(
                "{field}: expected 0 <= low <= high, got [{}, {})",
                self.low, self.high
            )));
        }
        Ok(())
    }
}

/// Note assembler parameters.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct NoteParams {
    /// Chance a generated note is a normal (short) note rather than a pad.
    pub normal_note_percent: f64,
    /// Normal-note attack/release before softness scaling.
    pub normal_attack: Span,
    /// Full softness multiplies normal attack/release by `1 + softness_attack_scale`.
    pub softness_attack_scale: f64,
    pub normal_sustain: Span,
    /// Fraction of master volume.
    pub normal_volume: Span,
    pub echo_percent: f64,
    pub echo_delay: Span,
    /// Volume lost per echo repeat; repeats stop once volume would fall below it.
    pub echo_volume_step: f64,
    pub piano_percent: f64,
    pub pad_duration: Span,
    /// Pad attack/release before softness scaling (`0.5 + softness`).
    pub pad_attack: Span,
    pub pad_sustain: Span,
    /// Fraction of master volume.
    pub pad_volume: Span,
    pub choir_percent: f64,
}

impl Default for NoteParams {
    fn default() -> Self {
        NoteParams {
            normal_note_percent: 82.0,
            normal_attack: Span::new(0.02, 0.25),
            softness_attack_scale: 4.0,
            normal_sustain: Span::new(0.4, 0.8),
            normal_volume: Span::new(0.25, 1.0),
            echo_percent: 50.0,
            echo_delay: Span::new(0.1, 1.5),
            echo_volume_step: 0.2,
            piano_percent: 30.0,
            pad_duration: Span::new(1.0, 10.0),
            pad_attack: Span::new(3.0, 10.0),
            pad_sustain: Span::new(0.8, 1.0),
            pad_volume: Span::new(0.15, 0.7),
            choir_percent: 50.0,
        }
    }
}

/// Phrase builder parameters. Tone counts are *additional* tones beyond the
/// seed note.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct PhraseParams {
    pub chord_min_tones: usize,
    pub chord_max_tones: usize,
    /// Chord and arpeggio tones stay within the Hz span of this many
    /// semitones above the root of the seed.
    pub chord_spread_semitones: i32,
    pub arpeggio_min_tones: usize,
    pub arpeggio_max_tones: usize,
    pub arpeggio_attack_factor: f64,
    pub arpeggio_release_factor: f64,
    pub melody_min_tones: usize,
    pub melody_max_tones: usize,
    /// Consecutive melody tones stay within the Hz span of this many
    /// semitones above the root of each other.
    pub melody_spread_semitones: i32,
    /// Chance a melody ends on an accompanying chord.
    pub melody_chord_percent: f64,
    /// Chance (when no chord was added) a melody ends on an arpeggio.
    pub melody_arpeggio_percent: f64,
    /// Random draws per tone before falling back to the nearest candidate.
    pub max_resample_attempts: usize,
}

impl Default for PhraseParams {
    fn default() -> Self {
        PhraseParams {
            chord_min_tones: 2,
            chord_max_tones: 4,
            chord_spread_semitones: 8,
            arpeggio_min_tones: 2,
            arpeggio_max_tones: 6,
            arpeggio_attack_factor: 0.25,
            arpeggio_release_factor: 0.5,
            melody_min_tones: 3,
            melody_max_tones: 7,
            melody_spread_semitones: 12,
            melody_chord_percent: 25.0,
            melody_arpeggio_percent: 15.0,
            max_resample_attempts: 50,
        }
    }
}

/// Scheduler and short-term memory parameters.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleParams {
    pub memory_capacity: usize,
    /// Chance to replay a remembered phrase when memory is non-empty.
    pub replay_percent: f64,
    /// Chance a replayed phrase is forgotten right after playing.
    pub forget_percent: f64,
    pub chord_percent: f64,
    pub arpeggio_percent: f64,
    pub single_percent: f64,
    /// Floor on the delay between autoplay cycles.
    pub min_cycle_delay_ms: u64,
    /// Floor on a clicked note's held duration.
    pub min_click_seconds: f64,
    /// Margin (fraction of the visualizer) kept free of autoplay notes.
    pub visual_gutter: f64,
}

impl Default for ScheduleParams {
    fn default() -> Self {
        ScheduleParams {
            memory_capacity: 5,
            replay_percent: 75.0,
            forget_percent: 66.0,
            chord_percent: 33.0,
            arpeggio_percent: 15.0,
            single_percent: 10.0,
            min_cycle_delay_ms: 250,
            min_click_seconds: 0.05,
            visual_gutter: 0.15,
        }
    }
}

/// All composer tunables.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ComposerConfig {
    pub notes: NoteParams,
    pub phrases: PhraseParams,
    pub schedule: ScheduleParams,
}

impl ComposerConfig {
    /// Load from a JSON file and validate.
    pub fn load(path: &Path) -> Result<Self, RadioError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self, RadioError> {
        let config: ComposerConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the engine cannot work with.
    pub fn validate(&self) -> Result<(), RadioError> {
        let n = &self.notes;
        let p = &self.phrases;
        let s = &self.schedule;

        for (field, pct) in [
            ("notes.normal_note_percent", n.normal_note_percent),
            ("notes.echo_percent", n.echo_percent),
            ("notes.piano_percent", n.piano_percent),
            ("notes.choir_percent", n.choir_percent),
            ("phrases.melody_chord_percent", p.melody_chord_percent),
            ("phrases.melody_arpeggio_percent", p.melody_arpeggio_percent),
            ("schedule.replay_percent", s.replay_percent),
            ("schedule.forget_percent", s.forget_percent),
            ("schedule.chord_percent", s.chord_percent),
            ("schedule.arpeggio_percent", s.arpeggio_percent),
            ("schedule.single_percent", s.single_percent),
        ] {
            if !(0.0..=100.0).contains(&pct) {
                return Err(RadioError::InvalidConfig(format!(
                    "{field} must be within 0..=100, got {pct}"
                )));
            }
        }

        n.normal_attack.check("notes.normal_attack")?;
        n.normal_sustain.check("notes.normal_sustain")?;
        n.normal_volume.check("notes.normal_volume")?;
        n.echo_delay.check("notes.echo_delay")?;
        n.pad_duration.check("notes.pad_duration")?;
        n.pad_attack.check("notes.pad_attack")?;
        n.pad_sustain.check("notes.pad_sustain")?;
        n.pad_volume.check("notes.pad_volume")?;
        if n.normal_sustain.high > 1.0 || n.pad_sustain.high > 1.0 {
            return Err(RadioError::InvalidConfig(
                "sustain fractions must not exceed 1".to_string(),
            ));
        }
        if n.normal_volume.high > 1.0 || n.pad_volume.high > 1.0 {
            return Err(RadioError::InvalidConfig(
                "note volumes are fractions of master volume and must not exceed 1".to_string(),
            ));
        }
        if n.pad_duration.low <= 0.0 {
            return Err(RadioError::InvalidConfig(
                "notes.pad_duration must be positive".to_string(),
            ));
        }
        if n.echo_volume_step <= 0.0 {
            return Err(RadioError::InvalidConfig(
                "notes.echo_volume_step must be positive".to_string(),
            ));
        }

        for (field, min, max) in [
            ("chord", p.chord_min_tones, p.chord_max_tones),
            ("arpeggio", p.arpeggio_min_tones, p.arpeggio_max_tones),
            ("melody", p.melody_min_tones, p.melody_max_tones),
        ] {
            if min == 0 || min > max {
                return Err(RadioError::InvalidConfig(format!(
                    "phrases.{field}: expected 1 <= min_tones <= max_tones, got {min}..={max}"
                )));
            }
        }
        if p.chord_spread_semitones <= 0 || p.melody_spread_semitones <= 0 {
            return Err(RadioError::InvalidConfig(
                "phrase spreads must be at least one semitone".to_string(),
            ));
        }
        if p.max_resample_attempts == 0 {
            return Err(RadioError::InvalidConfig(
                "phrases.max_resample_attempts must be at least 1".to_string(),
            ));
        }

        if s.memory_capacity == 0 {
            return Err(RadioError::InvalidConfig(
                "schedule.memory_capacity must be at least 1".to_string(),
            ));
        }
        if s.min_cycle_delay_ms == 0 {
            return Err(RadioError::InvalidConfig(
                "schedule.min_cycle_delay_ms must be positive".to_string(),
            ));
        }
        if s.min_click_seconds <= 0.0 {
            return Err(RadioError::InvalidConfig(
                "schedule.min_click_seconds must be positive".to_string(),
            ));
        }
        if !(0.0..0.5).contains(&s.visual_gutter) {
            return Err(RadioError::InvalidConfig(format!(
                "schedule.visual_gutter must be within 0..0.5, got {}",
                s.visual_gutter
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        ComposerConfig::default().validate().unwrap();
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config =
            ComposerConfig::from_json(r#"{ "schedule": { "replay_percent": 10 } }"#).unwrap();
        assert_eq!(config.schedule.replay_percent, 10.0);
        assert_eq!(config.schedule.memory_capacity, 5);
        assert_eq!(config.phrases.chord_spread_semitones, 8);
    }

    #[test]
    fn test_json_roundtrip() {
        let config = ComposerConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let back = ComposerConfig::from_json(&json).unwrap();
        assert_eq!(back.notes.echo_delay, config.notes.echo_delay);
        assert_eq!(back.phrases.max_resample_attempts, 50);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let bad_percent = r#"{ "schedule": { "forget_percent": 140 } }"#;
        assert!(matches!(
            ComposerConfig::from_json(bad_percent),
            Err(RadioError::InvalidConfig(_))
        ));

        let mut config = ComposerConfig::default();
        config.phrases.melody_min_tones = 9;
        assert!(config.validate().is_err());

        let mut config = ComposerConfig::default();
        config.schedule.memory_capacity = 0;
        assert!(config.validate().is_err());

        let mut config = ComposerConfig::default();
        config.notes.pad_attack = Span::new(5.0, 1.0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_malformed_json_is_json_error() {
        assert!(matches!(
            ComposerConfig::from_json("{ not json"),
            Err(RadioError::Json(_))
        ));
    }
}
