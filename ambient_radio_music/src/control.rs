// Control values: the knobs the listener (or the evolve loop) turns.
//
// Two layers:
// - `ControlSettings` is the mutable owner of raw slider/toggle values, each
//   clamped to its `ControlRange`. It belongs to the control-panel side of
//   the program (and to `evolve.rs`, which drifts it over time). The
//   composer never mutates it.
// - `ControlSnapshot` is an immutable, normalized copy taken once per cycle
//   and passed into the composer and note assembler. Everything random the
//   engine does is conditioned on a snapshot, never on ambient state.
//
// `NoteTimings` turns the tempo into the table of note lengths (whole down
// to thirty-second) that short notes, melody notes and inter-phrase rests
// are drawn from.
//
// Invariant kept here: at least one waveform toggle is always on. Turning
// off the last one is refused, mirroring the control panel's behavior.

use crate::random::RandomSource;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Oscillator or noise source a note is synthesized with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum WaveKind {
    Sine,
    Triangle,
    Sawtooth,
    Square,
    WhiteNoise,
    PinkNoise,
    BrownNoise,
}

impl WaveKind {
    pub const ALL: [WaveKind; 7] = [
        WaveKind::Sine,
        WaveKind::Triangle,
        WaveKind::Sawtooth,
        WaveKind::Square,
        WaveKind::WhiteNoise,
        WaveKind::PinkNoise,
        WaveKind::BrownNoise,
    ];

    /// Used when no waveform is enabled at all.
    pub const DEFAULT: WaveKind = WaveKind::Triangle;

    pub fn is_noise(self) -> bool {
        matches!(
            self,
            WaveKind::WhiteNoise | WaveKind::PinkNoise | WaveKind::BrownNoise
        )
    }

    pub fn name(self) -> &'static str {
        match self {
            WaveKind::Sine => "sine",
            WaveKind::Triangle => "triangle",
            WaveKind::Sawtooth => "sawtooth",
            WaveKind::Square => "square",
            WaveKind::WhiteNoise => "white noise",
            WaveKind::PinkNoise => "pink noise",
            WaveKind::BrownNoise => "brown noise",
        }
    }
}

/// Every control on the panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ControlKey {
    Autoplay,
    Evolve,
    Volume,
    Tempo,
    Pitch,
    Softness,
    Density,
    Mood,
    LfoRate,
    LfoDepth,
    Wave(WaveKind),
}

impl ControlKey {
    pub const ALL: [ControlKey; 17] = [
        ControlKey::Autoplay,
        ControlKey::Evolve,
        ControlKey::Volume,
        ControlKey::Tempo,
        ControlKey::Pitch,
        ControlKey::Softness,
        ControlKey::Density,
        ControlKey::Mood,
        ControlKey::LfoRate,
        ControlKey::LfoDepth,
        ControlKey::Wave(WaveKind::Sine),
        ControlKey::Wave(WaveKind::Triangle),
        ControlKey::Wave(WaveKind::Sawtooth),
        ControlKey::Wave(WaveKind::Square),
        ControlKey::Wave(WaveKind::WhiteNoise),
        ControlKey::Wave(WaveKind::PinkNoise),
        ControlKey::Wave(WaveKind::BrownNoise),
    ];

    /// On/off switches rather than sliders.
    pub fn is_toggle(self) -> bool {
        matches!(
            self,
            ControlKey::Autoplay | ControlKey::Evolve | ControlKey::Wave(_)
        )
    }
}

/// Inclusive bounds of a control, in slider units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ControlRange {
    pub min: f64,
    pub max: f64,
}

impl ControlRange {
    pub const fn new(min: f64, max: f64) -> Self {
        ControlRange { min, max }
    }

    pub fn span(&self) -> f64 {
        self.max - self.min
    }

    pub fn clamp(&self, value: f64) -> f64 {
        value.clamp(self.min, self.max)
    }
}

/// Raw control values, keyed by control. Owned by the control panel side.
#[derive(Debug, Clone)]
pub struct ControlSettings {
    values: BTreeMap<ControlKey, f64>,
    /// Number of scales the mood slider can select between.
    scale_count: usize,
}

impl ControlSettings {
    /// Deterministic defaults: autoplay and evolve on, triangle only, mid
    /// volume, no LFO.
    pub fn new(scale_count: usize) -> Self {
        let mut settings = ControlSettings {
            values: BTreeMap::new(),
            scale_count: scale_count.max(1),
        };
        for key in ControlKey::ALL {
            let value = match key {
                ControlKey::Autoplay | ControlKey::Evolve => 1.0,
                ControlKey::Volume => 50.0,
                ControlKey::Tempo => 72.0,
                ControlKey::Pitch => 280.0,
                ControlKey::Softness => 50.0,
                ControlKey::Density => 50.0,
                ControlKey::Mood => 0.0,
                ControlKey::LfoRate | ControlKey::LfoDepth => 0.0,
                ControlKey::Wave(WaveKind::Triangle) => 1.0,
                ControlKey::Wave(_) => 0.0,
            };
            settings.values.insert(key, value);
        }
        settings
    }

    /// Randomized start-up values: sliders anywhere in range, toggles on a
    /// coin flip, LFO off, volume centered, autoplay/evolve/triangle on.
    pub fn initial(scale_count: usize, rng: &mut impl RandomSource) -> Self {
        let mut settings = ControlSettings::new(scale_count);
        for key in ControlKey::ALL {
            let range = settings.range(key);
            let value = match key {
                ControlKey::Autoplay | ControlKey::Evolve => 1.0,
                ControlKey::Wave(WaveKind::Triangle) => 1.0,
                ControlKey::LfoRate | ControlKey::LfoDepth => 0.0,
                ControlKey::Volume => (range.min + range.max) / 2.0,
                k if k.is_toggle() => rng.either(50.0, 1.0, 0.0),
                _ => rng.range_f64(range.min, range.max).round(),
            };
            settings.values.insert(key, value);
        }
        settings
    }

    pub fn range(&self, key: ControlKey) -> ControlRange {
        match key {
            ControlKey::Autoplay | ControlKey::Evolve | ControlKey::Wave(_) => {
                ControlRange::new(0.0, 1.0)
            }
            ControlKey::Volume => ControlRange::new(0.0, 100.0),
            ControlKey::Tempo => ControlRange::new(40.0, 160.0),
            ControlKey::Pitch => ControlRange::new(110.0, 440.0),
            ControlKey::Softness | ControlKey::Density => ControlRange::new(0.0, 100.0),
            ControlKey::Mood => ControlRange::new(0.0, (self.scale_count - 1) as f64),
            ControlKey::LfoRate => ControlRange::new(0.0, 10.0),
            ControlKey::LfoDepth => ControlRange::new(0.0, 100.0),
        }
    }

    pub fn get(&self, key: ControlKey) -> f64 {
        self.values.get(&key).copied().unwrap_or(0.0)
    }

    pub fn is_on(&self, key: ControlKey) -> bool {
        self.get(key) >= 0.5
    }

    /// Set a control, clamped to its range. Toggles snap to 0 or 1, and the
    /// last enabled waveform cannot be switched off. Returns the value that
    /// was actually stored.
    pub fn set(&mut self, key: ControlKey, value: f64) -> f64 {
        let mut stored = self.range(key).clamp(value);
        if key.is_toggle() {
            stored = if stored >= 0.5 { 1.0 } else { 0.0 };
        }
        if let ControlKey::Wave(kind) = key {
            if stored == 0.0 && self.active_waves() == [kind] {
                stored = 1.0;
            }
        }
        self.values.insert(key, stored);
        stored
    }

    /// Enabled waveforms, in `WaveKind::ALL` order.
    pub fn active_waves(&self) -> Vec<WaveKind> {
        WaveKind::ALL
            .into_iter()
            .filter(|&w| self.is_on(ControlKey::Wave(w)))
            .collect()
    }

    /// Normalized, immutable view for one composer cycle.
    pub fn snapshot(&self) -> ControlSnapshot {
        ControlSnapshot {
            tempo_bpm: self.get(ControlKey::Tempo),
            master_volume: self.get(ControlKey::Volume) / 100.0,
            base_note_hz: self.get(ControlKey::Pitch),
            softness: self.get(ControlKey::Softness) / 100.0,
            density: self.get(ControlKey::Density) / 100.0,
            scale_index: self.get(ControlKey::Mood).round().max(0.0) as usize,
            active_waves: self.active_waves(),
            lfo_rate_hz: self.get(ControlKey::LfoRate),
            lfo_depth: self.get(ControlKey::LfoDepth) / 100.0,
        }
    }
}

/// Control values as the composer sees them for one cycle. Plain data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlSnapshot {
    pub tempo_bpm: f64,
    /// 0..=1, the loudest any note may be.
    pub master_volume: f64,
    /// Root of every scale interval, in Hz.
    pub base_note_hz: f64,
    /// 0..=1, scales attack/release.
    pub softness: f64,
    /// 0..=1, higher packs notes and phrases closer together.
    pub density: f64,
    pub scale_index: usize,
    pub active_waves: Vec<WaveKind>,
    pub lfo_rate_hz: f64,
    /// 0..=1.
    pub lfo_depth: f64,
}

impl ControlSnapshot {
    pub fn timings(&self) -> NoteTimings {
        NoteTimings::from_tempo(self.tempo_bpm)
    }

    /// Multiplier on inter-note and inter-phrase gaps: 1.5 at density 0,
    /// 0.5 at density 1.
    pub fn spacing_factor(&self) -> f64 {
        1.5 - self.density.clamp(0.0, 1.0)
    }
}

impl Default for ControlSnapshot {
    fn default() -> Self {
        ControlSettings::new(1).snapshot()
    }
}

/// Note lengths in seconds at a given tempo, longest first: whole, half,
/// quarter, eighth, sixteenth, thirty-second.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoteTimings {
    pub seconds: [f64; 6],
}

impl NoteTimings {
    pub fn from_tempo(tempo_bpm: f64) -> Self {
        let beat = 60.0 / tempo_bpm.max(1.0);
        NoteTimings {
            seconds: [
                beat * 4.0,
                beat * 2.0,
                beat,
                beat / 2.0,
                beat / 4.0,
                beat / 8.0,
            ],
        }
    }

    pub fn whole(&self) -> f64 {
        self.seconds[0]
    }

    /// Quarter, eighth or sixteenth.
    pub fn short_note(&self, rng: &mut impl RandomSource) -> f64 {
        self.seconds[2 + rng.index(3)]
    }

    /// Quarter or eighth.
    pub fn melody_note(&self, rng: &mut impl RandomSource) -> f64 {
        self.seconds[2 + rng.index(2)]
    }

    /// Rest before the next phrase: a whole note or two bars, evenly.
    pub fn rest_before_next_phrase(&self, rng: &mut impl RandomSource) -> f64 {
        rng.either(50.0, self.whole(), self.whole() * 2.0)
    }
}
