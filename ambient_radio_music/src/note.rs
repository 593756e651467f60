// Notes and the note assembler.
//
// A `Note` is a complete, declarative description of one sound: waveform,
// pitch, envelope, loudness and when to start it relative to the event
// that triggered it. The playback collaborator turns it into oscillators
// and a marker on screen; nothing in this crate synthesizes audio.
//
// Notes are plain values. Phrase members are built as clones of a seed and
// then retuned/retimed, so scheduling or decaying one member (echo repeats
// lower `volume`) can never affect a sibling.
//
// Two flavors come out of the assembler:
// - normal: short (a quarter, eighth or sixteenth at the current tempo),
//   softness-scaled attack/release, sometimes an echo, sometimes a piano hint;
// - pad: seconds long with slow swells, sometimes a choir hint.
// `assemble_note` picks between them with `NoteParams::normal_note_percent`.
//
// See also: phrase.rs, which grows a seed note into chords/arpeggios/melodies,
// and playback.rs, which expands echo trains.

use crate::config::NoteParams;
use crate::control::{ControlSnapshot, WaveKind};
use crate::pitch::frequency_for_interval;
use crate::random::RandomSource;
use serde::{Deserialize, Serialize};

/// Root used if a snapshot carries a non-positive base note.
pub const FALLBACK_BASE_NOTE_HZ: f64 = 280.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NoteKind {
    Normal,
    Pad,
}

/// Filter-preset hint for the synthesis side. Never interpreted here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InstrumentHint {
    Piano,
    Choir,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LfoShape {
    Sine,
    Square,
}

/// Vibrato suggestion derived from the LFO controls.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LfoHint {
    pub rate_hz: f64,
    /// 0..=1.
    pub depth: f64,
    pub shape: LfoShape,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub kind: NoteKind,
    pub wave: WaveKind,
    /// Semitones from the base note the frequency was derived from.
    pub interval: i32,
    pub frequency_hz: f64,
    /// Time from the end of the attack until the release begins.
    pub duration_seconds: f64,
    pub volume: f64,
    pub attack_seconds: f64,
    pub decay_seconds: f64,
    /// Sustain level as a fraction of `volume`.
    pub sustain_fraction: f64,
    pub release_seconds: f64,
    /// Offset from the triggering event.
    pub delay_seconds: f64,
    pub instrument: Option<InstrumentHint>,
    /// Gap between echo repeats, if this note echoes.
    pub echo_delay_seconds: Option<f64>,
    pub lfo: Option<LfoHint>,
}

impl Note {
    /// Copy of this note moved to another scale interval.
    pub fn retuned(&self, root_hz: f64, interval: i32) -> Note {
        Note {
            interval,
            frequency_hz: frequency_for_interval(root_hz, interval),
            ..self.clone()
        }
    }

    /// When this note stops holding, relative to the trigger.
    pub fn end_seconds(&self) -> f64 {
        self.delay_seconds + self.attack_seconds + self.duration_seconds
    }

    /// The note followed by its echo repeats. Each repeat starts one echo
    /// delay after the previous one and is `volume_step` quieter; repeats
    /// continue while the previous one was louder than `volume_step`.
    /// Repeats carry no echo of their own.
    pub fn echo_train(&self, volume_step: f64) -> Vec<Note> {
        let mut train = vec![self.clone()];
        let Some(gap) = self.echo_delay_seconds.filter(|&g| g > 0.0) else {
            return train;
        };
        if volume_step <= 0.0 {
            return train;
        }
        let mut volume = self.volume;
        let mut delay = self.delay_seconds;
        while volume > volume_step {
            volume -= volume_step;
            delay += gap;
            train.push(Note {
                volume,
                delay_seconds: delay,
                echo_delay_seconds: None,
                ..self.clone()
            });
        }
        train
    }
}

/// The base note from a snapshot, guarded against non-positive values.
pub fn root_hz(controls: &ControlSnapshot) -> f64 {
    if controls.base_note_hz > 0.0 {
        controls.base_note_hz
    } else {
        FALLBACK_BASE_NOTE_HZ
    }
}

/// Uniform pick from the enabled waveforms, `WaveKind::DEFAULT` if none are.
pub fn pick_wave(active: &[WaveKind], rng: &mut impl RandomSource) -> WaveKind {
    rng.pick(active).copied().unwrap_or(WaveKind::DEFAULT)
}

/// Uniform pick from a scale's intervals; the root if the scale is empty.
pub fn random_interval(intervals: &[i32], rng: &mut impl RandomSource) -> i32 {
    rng.pick(intervals).copied().unwrap_or(0)
}

fn lfo_hint(controls: &ControlSnapshot, rng: &mut impl RandomSource) -> Option<LfoHint> {
    if controls.lfo_rate_hz <= 0.0 || controls.lfo_depth <= 0.0 {
        return None;
    }
    Some(LfoHint {
        rate_hz: controls.lfo_rate_hz,
        depth: controls.lfo_depth.min(1.0),
        shape: rng.either(50.0, LfoShape::Sine, LfoShape::Square),
    })
}

/// Attack (and release) of a short note: a base sample stretched by the
/// softness control.
pub fn normal_attack_seconds(
    controls: &ControlSnapshot,
    params: &NoteParams,
    rng: &mut impl RandomSource,
) -> f64 {
    let softness = controls.softness.clamp(0.0, 1.0);
    params.normal_attack.sample(rng) * (1.0 + softness * params.softness_attack_scale)
}

/// A short note in the current scale.
pub fn assemble_normal_note(
    controls: &ControlSnapshot,
    intervals: &[i32],
    params: &NoteParams,
    rng: &mut impl RandomSource,
) -> Note {
    let root = root_hz(controls);
    let interval = random_interval(intervals, rng);
    let attack = normal_attack_seconds(controls, params, rng);
    let echo_delay = params.echo_delay.sample(rng);

    Note {
        kind: NoteKind::Normal,
        wave: pick_wave(&controls.active_waves, rng),
        interval,
        frequency_hz: frequency_for_interval(root, interval),
        duration_seconds: controls.timings().short_note(rng),
        volume: controls.master_volume.max(0.0) * params.normal_volume.sample(rng),
        attack_seconds: attack,
        decay_seconds: attack * 0.5,
        sustain_fraction: params.normal_sustain.sample(rng).clamp(0.0, 1.0),
        release_seconds: attack,
        delay_seconds: 0.0,
        instrument: rng.either(params.piano_percent, Some(InstrumentHint::Piano), None),
        echo_delay_seconds: rng.either(params.echo_percent, Some(echo_delay), None),
        lfo: lfo_hint(controls, rng),
    }
}

/// A long background note in the current scale.
pub fn assemble_pad_note(
    controls: &ControlSnapshot,
    intervals: &[i32],
    params: &NoteParams,
    rng: &mut impl RandomSource,
) -> Note {
    let root = root_hz(controls);
    let interval = random_interval(intervals, rng);
    let softness = controls.softness.clamp(0.0, 1.0);
    let attack = params.pad_attack.sample(rng) * (0.5 + softness);

    Note {
        kind: NoteKind::Pad,
        wave: pick_wave(&controls.active_waves, rng),
        interval,
        frequency_hz: frequency_for_interval(root, interval),
        duration_seconds: params.pad_duration.sample(rng),
        volume: controls.master_volume.max(0.0) * params.pad_volume.sample(rng),
        attack_seconds: attack,
        decay_seconds: attack * 0.25,
        sustain_fraction: params.pad_sustain.sample(rng).clamp(0.0, 1.0),
        release_seconds: attack,
        delay_seconds: 0.0,
        instrument: rng.either(params.choir_percent, Some(InstrumentHint::Choir), None),
        echo_delay_seconds: None,
        lfo: lfo_hint(controls, rng),
    }
}

/// A normal note most of the time, otherwise a pad.
pub fn assemble_note(
    controls: &ControlSnapshot,
    intervals: &[i32],
    params: &NoteParams,
    rng: &mut impl RandomSource,
) -> Note {
    if rng.maybe(params.normal_note_percent) {
        assemble_normal_note(controls, intervals, params, rng)
    } else {
        assemble_pad_note(controls, intervals, params, rng)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scale::ScaleTable;
    use ambient_radio_prng::RadioRng;

    fn snapshot() -> ControlSnapshot {
        ControlSnapshot {
            tempo_bpm: 90.0,
            master_volume: 0.6,
            base_note_hz: 220.0,
            softness: 0.5,
            density: 0.5,
            scale_index: 0,
            active_waves: vec![WaveKind::Sine, WaveKind::Square],
            lfo_rate_hz: 0.0,
            lfo_depth: 0.0,
        }
    }

    #[test]
    fn test_notes_respect_invariants() {
        let table = ScaleTable::standard();
        let params = NoteParams::default();
        let controls = snapshot();
        let mut rng = RadioRng::new(42);
        for _ in 0..500 {
            let note = assemble_note(&controls, table.intervals_for(0), &params, &mut rng);
            assert!(note.frequency_hz > 0.0);
            assert!(note.duration_seconds > 0.0);
            assert!((0.0..=controls.master_volume).contains(&note.volume));
            assert!((0.0..=1.0).contains(&note.sustain_fraction));
            assert!(controls.active_waves.contains(&note.wave));
            assert!(table.scale(0).contains(note.interval));
            assert_eq!(note.delay_seconds, 0.0);
        }
    }

    #[test]
    fn test_empty_wave_set_falls_back_to_default() {
        let controls = ControlSnapshot {
            active_waves: Vec::new(),
            ..snapshot()
        };
        let mut rng = RadioRng::new(9);
        let note = assemble_normal_note(&controls, &[0, 12], &NoteParams::default(), &mut rng);
        assert_eq!(note.wave, WaveKind::DEFAULT);
    }

    #[test]
    fn test_pads_are_longer_and_softer_edged() {
        let params = NoteParams::default();
        let controls = snapshot();
        let mut rng = RadioRng::new(3);
        for _ in 0..100 {
            let normal = assemble_normal_note(&controls, &[0, 7], &params, &mut rng);
            let pad = assemble_pad_note(&controls, &[0, 7], &params, &mut rng);
            assert!(pad.duration_seconds >= 1.0);
            assert!(normal.duration_seconds < 1.0);
            assert!(pad.attack_seconds > normal.attack_seconds);
            assert_eq!(pad.kind, NoteKind::Pad);
            assert!(pad.echo_delay_seconds.is_none());
            assert_ne!(pad.instrument, Some(InstrumentHint::Piano));
            assert_ne!(normal.instrument, Some(InstrumentHint::Choir));
        }
    }

    #[test]
    fn test_normal_notes_dominate() {
        let params = NoteParams::default();
        let controls = snapshot();
        let mut rng = RadioRng::new(77);
        let normals = (0..2000)
            .filter(|_| assemble_note(&controls, &[0, 5], &params, &mut rng).kind == NoteKind::Normal)
            .count();
        assert!((1500..1800).contains(&normals), "got {normals} normal notes");
    }

    #[test]
    fn test_lfo_hint_follows_controls() {
        let params = NoteParams::default();
        let mut rng = RadioRng::new(5);
        let off = assemble_normal_note(&snapshot(), &[0], &params, &mut rng);
        assert!(off.lfo.is_none());

        let controls = ControlSnapshot {
            lfo_rate_hz: 4.0,
            lfo_depth: 0.3,
            ..snapshot()
        };
        let on = assemble_pad_note(&controls, &[0], &params, &mut rng);
        let lfo = on.lfo.unwrap();
        assert_eq!(lfo.rate_hz, 4.0);
        assert_eq!(lfo.depth, 0.3);
    }

    #[test]
    fn test_echo_train_decays_to_floor() {
        let mut rng = RadioRng::new(1);
        let mut note = assemble_normal_note(&snapshot(), &[0], &NoteParams::default(), &mut rng);
        note.volume = 0.5;
        note.delay_seconds = 1.0;
        note.echo_delay_seconds = Some(0.25);

        let train = note.echo_train(0.2);
        assert_eq!(train.len(), 3);
        assert_eq!(train[0], note);
        assert!((train[1].volume - 0.3).abs() < 1e-9);
        assert!((train[2].volume - 0.1).abs() < 1e-9);
        assert!((train[2].delay_seconds - 1.5).abs() < 1e-9);
        assert!(train[1..].iter().all(|n| n.echo_delay_seconds.is_none()));
    }

    #[test]
    fn test_no_echo_means_single_note() {
        let mut rng = RadioRng::new(2);
        let pad = assemble_pad_note(&snapshot(), &[0], &NoteParams::default(), &mut rng);
        assert_eq!(pad.echo_train(0.2).len(), 1);
    }

    #[test]
    fn test_retuned_is_independent_copy() {
        let mut rng = RadioRng::new(4);
        let seed = assemble_normal_note(&snapshot(), &[0], &NoteParams::default(), &mut rng);
        let mut fifth = seed.retuned(220.0, 7);
        fifth.volume = 0.0;
        assert_eq!(fifth.interval, 7);
        assert!((fifth.frequency_hz - 329.63).abs() < 0.01);
        assert!(seed.volume > 0.0);
        assert_eq!(seed.interval, 0);
    }
}
