// Phrase builder: grows a seed note into a chord, an arpeggio or a melody.
//
// All three shapes pick extra tones from the active scale under two
// constraints, checked in Hz against an anchor tone:
// - chord / arpeggio: every tone is new to the phrase and lies within
//   `interval_hz_span(root, chord_spread_semitones)` of the seed;
// - melody: every tone differs from the one before it and lies within
//   `interval_hz_span(root, melody_spread_semitones)` of it (a bounded
//   random walk; tones further back are unconstrained).
// The span is measured upward from the root, so the same allowance covers
// more semitones above the root than below it.
//
// Candidate selection is rejection sampling with a cap: up to
// `max_resample_attempts` uniform draws, then the nearest eligible interval,
// and if nothing is eligible the phrase simply stops growing. Tone counts are
// drawn between the configured minimum and `min(max, shortest scale)` and
// clamped to what the active scale can supply.
//
// Timing: chord members share the seed's delay; arpeggio and melody members
// follow one another, each delayed by the previous member's duration times
// the density spacing factor. Arpeggio members are always plucked short
// notes, even when the seed is a pad. A melody may close on a chord or
// arpeggio built on its last tone.
//
// Every member is an independent `Note` (a clone of the seed, retuned and
// retimed), so playback can decay one member's volume without touching the
// others.

use crate::config::{NoteParams, PhraseParams};
use crate::control::ControlSnapshot;
use crate::note::{
    InstrumentHint, Note, NoteKind, normal_attack_seconds, random_interval, root_hz,
};
use crate::pitch::{frequency_for_interval, interval_hz_span};
use crate::random::RandomSource;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PhraseKind {
    Single,
    Chord,
    Arpeggio,
    Melody,
}

/// Notes generated together, in dispatch order. Delays never decrease.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Phrase {
    pub kind: PhraseKind,
    pub notes: Vec<Note>,
}

impl Phrase {
    pub fn single(note: Note) -> Self {
        Phrase {
            kind: PhraseKind::Single,
            notes: vec![note],
        }
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    /// Time from the trigger until the last member stops holding.
    pub fn span_seconds(&self) -> f64 {
        self.notes
            .iter()
            .map(Note::end_seconds)
            .fold(0.0, f64::max)
    }
}

/// Builds phrases against one control snapshot and one scale.
pub struct PhraseBuilder<'a> {
    params: &'a PhraseParams,
    note_params: &'a NoteParams,
    controls: &'a ControlSnapshot,
    intervals: &'a [i32],
    shortest_scale_length: usize,
}

impl<'a> PhraseBuilder<'a> {
    pub fn new(
        params: &'a PhraseParams,
        note_params: &'a NoteParams,
        controls: &'a ControlSnapshot,
        intervals: &'a [i32],
        shortest_scale_length: usize,
    ) -> Self {
        PhraseBuilder {
            params,
            note_params,
            controls,
            intervals,
            shortest_scale_length,
        }
    }

    /// Random tone count in `[min, min(max, shortest scale)]`.
    fn tone_count(&self, min: usize, max: usize, rng: &mut impl RandomSource) -> usize {
        let high = max.min(self.shortest_scale_length);
        rng.count_inclusive(min.min(high), high)
    }

    /// Pick an interval that `allowed` accepts and whose frequency is within
    /// the Hz span of `spread` semitones (from the root) of `anchor`'s. Falls
    /// back to the nearest such interval after the retry cap; `None` when no
    /// interval qualifies.
    fn choose_interval(
        &self,
        anchor: i32,
        spread: i32,
        allowed: impl Fn(i32) -> bool,
        rng: &mut impl RandomSource,
    ) -> Option<i32> {
        let root = root_hz(self.controls);
        let anchor_hz = frequency_for_interval(root, anchor);
        let span = interval_hz_span(root, spread);
        let distance = |c: i32| (frequency_for_interval(root, c) - anchor_hz).abs();
        let eligible = |c: i32| allowed(c) && distance(c) <= span;
        for _ in 0..self.params.max_resample_attempts {
            let candidate = random_interval(self.intervals, rng);
            if eligible(candidate) {
                return Some(candidate);
            }
        }
        let nearest = self
            .intervals
            .iter()
            .copied()
            .filter(|&c| eligible(c))
            .min_by(|&a, &b| distance(a).total_cmp(&distance(b)).then(a.cmp(&b)));
        log::trace!(
            "resample cap hit around interval {anchor} (span {span:.1} Hz), fallback {nearest:?}"
        );
        nearest
    }

    /// Chord with a random number of extra tones.
    pub fn chord(&self, seed: &Note, rng: &mut impl RandomSource) -> Phrase {
        let additional = self.tone_count(self.params.chord_min_tones, self.params.chord_max_tones, rng);
        self.chord_of(seed, additional, rng)
    }

    /// Chord with `additional` extra tones (fewer if the scale runs out).
    /// Members sound with the seed; pad chords swell a little slower.
    pub fn chord_of(&self, seed: &Note, additional: usize, rng: &mut impl RandomSource) -> Phrase {
        let additional = additional.min(self.intervals.len().saturating_sub(1));
        let root = root_hz(self.controls);
        let mut chosen = vec![seed.interval];
        let mut notes = vec![seed.clone()];

        for _ in 0..additional {
            let Some(interval) = self.choose_interval(
                seed.interval,
                self.params.chord_spread_semitones,
                |c| !chosen.contains(&c),
                rng,
            ) else {
                break;
            };
            chosen.push(interval);
            let mut tone = seed.retuned(root, interval);
            tone.echo_delay_seconds = None;
            if seed.kind == NoteKind::Pad {
                let soften = rng.range_f64(1.0, 1.5);
                tone.attack_seconds *= soften;
                tone.release_seconds *= soften;
            }
            notes.push(tone);
        }

        Phrase {
            kind: PhraseKind::Chord,
            notes,
        }
    }

    pub fn arpeggio(&self, seed: &Note, rng: &mut impl RandomSource) -> Phrase {
        let additional = self.tone_count(
            self.params.arpeggio_min_tones,
            self.params.arpeggio_max_tones,
            rng,
        );
        self.arpeggio_of(seed, additional, rng)
    }

    /// Turn `note` into an arpeggio member: a short note whose envelope is a
    /// fraction of a freshly drawn normal-note envelope.
    fn pluck(&self, note: &mut Note, rng: &mut impl RandomSource) {
        let attack = normal_attack_seconds(self.controls, self.note_params, rng);
        note.kind = NoteKind::Normal;
        if note.instrument == Some(InstrumentHint::Choir) {
            note.instrument = None;
        }
        note.duration_seconds = self.controls.timings().short_note(rng);
        note.attack_seconds = attack * self.params.arpeggio_attack_factor;
        note.release_seconds = attack * self.params.arpeggio_release_factor;
        note.decay_seconds = note.attack_seconds * 0.5;
    }

    /// Arpeggio with `additional` extra tones: chord tones played one after
    /// another with short, plucked envelopes.
    pub fn arpeggio_of(&self, seed: &Note, additional: usize, rng: &mut impl RandomSource) -> Phrase {
        let additional = additional.min(self.intervals.len().saturating_sub(1));
        let root = root_hz(self.controls);
        let spacing = self.controls.spacing_factor();

        let mut lead = seed.clone();
        self.pluck(&mut lead, rng);
        let mut chosen = vec![seed.interval];
        let mut delay = lead.delay_seconds;
        let mut previous_duration = lead.duration_seconds;
        let mut notes = vec![lead];

        for _ in 0..additional {
            let Some(interval) = self.choose_interval(
                seed.interval,
                self.params.chord_spread_semitones,
                |c| !chosen.contains(&c),
                rng,
            ) else {
                break;
            };
            chosen.push(interval);
            delay += previous_duration * spacing;
            let mut tone = seed.retuned(root, interval);
            self.pluck(&mut tone, rng);
            tone.delay_seconds = delay;
            tone.echo_delay_seconds = None;
            previous_duration = tone.duration_seconds;
            notes.push(tone);
        }

        Phrase {
            kind: PhraseKind::Arpeggio,
            notes,
        }
    }

    pub fn melody(&self, seed: &Note, rng: &mut impl RandomSource) -> Phrase {
        let additional = self.tone_count(
            self.params.melody_min_tones,
            self.params.melody_max_tones,
            rng,
        );
        self.melody_of(seed, additional, rng)
    }

    /// Melody of `additional` tones after the seed, possibly closed by a
    /// chord or arpeggio on the last tone.
    pub fn melody_of(&self, seed: &Note, additional: usize, rng: &mut impl RandomSource) -> Phrase {
        let mut notes = self.walk(seed, additional.min(self.intervals.len()), rng);

        if let Some(last) = notes.last().cloned() {
            let closing = if rng.maybe(self.params.melody_chord_percent) {
                Some(self.chord(&last, rng))
            } else if rng.maybe(self.params.melody_arpeggio_percent) {
                Some(self.arpeggio(&last, rng))
            } else {
                None
            };
            if let Some(closing) = closing {
                // The closing phrase's first note restates `last`.
                notes.extend(closing.notes.into_iter().skip(1));
            }
        }

        Phrase {
            kind: PhraseKind::Melody,
            notes,
        }
    }

    /// The melodic line itself: seed first, then `steps` constrained steps.
    fn walk(&self, seed: &Note, steps: usize, rng: &mut impl RandomSource) -> Vec<Note> {
        let root = root_hz(self.controls);
        let timings = self.controls.timings();
        let spacing = self.controls.spacing_factor();

        let mut lead = seed.clone();
        lead.duration_seconds = timings.melody_note(rng);
        let mut previous = lead.interval;
        let mut delay = lead.delay_seconds;
        let mut previous_duration = lead.duration_seconds;
        let mut notes = vec![lead];

        for _ in 0..steps {
            let Some(interval) = self.choose_interval(
                previous,
                self.params.melody_spread_semitones,
                |c| c != previous,
                rng,
            ) else {
                break;
            };
            delay += previous_duration * spacing;
            let mut tone = seed.retuned(root, interval);
            tone.duration_seconds = timings.melody_note(rng);
            tone.delay_seconds = delay;
            tone.echo_delay_seconds = None;
            previous = interval;
            previous_duration = tone.duration_seconds;
            notes.push(tone);
        }
        notes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::WaveKind;
    use crate::note::{assemble_normal_note, assemble_pad_note};
    use crate::scale::ScaleTable;
    use ambient_radio_prng::RadioRng;

    fn controls(base: f64) -> ControlSnapshot {
        ControlSnapshot {
            tempo_bpm: 100.0,
            master_volume: 0.8,
            base_note_hz: base,
            softness: 0.3,
            density: 0.5,
            scale_index: 0,
            active_waves: vec![WaveKind::Triangle],
            lfo_rate_hz: 0.0,
            lfo_depth: 0.0,
        }
    }

    fn seed_at(controls: &ControlSnapshot, interval: i32, rng: &mut RadioRng) -> Note {
        let note = assemble_normal_note(controls, &[0], &NoteParams::default(), rng);
        note.retuned(controls.base_note_hz, interval)
    }

    #[test]
    fn test_small_scale_chord_scenario() {
        // Root 440, scale {-12,-7,0,7,12}, 8-semitone spread (258.46 Hz):
        // the octave above (+440 Hz) is out of reach, everything else is in.
        let intervals = [-12, -7, 0, 7, 12];
        let ctl = controls(440.0);
        let params = PhraseParams::default();
        let notes = NoteParams::default();
        let builder = PhraseBuilder::new(&params, &notes, &ctl, &intervals, intervals.len());
        let span = interval_hz_span(440.0, params.chord_spread_semitones);
        assert!((span - 258.46).abs() < 0.01);
        for seed_value in 0..50 {
            let mut rng = RadioRng::new(seed_value);
            let seed = seed_at(&ctl, 0, &mut rng);
            let chord = builder.chord_of(&seed, 2, &mut rng);
            assert_eq!(chord.len(), 3);
            assert_eq!(chord.notes[0].interval, 0);
            for note in &chord.notes {
                assert_ne!(note.interval, 12);
                assert!((note.frequency_hz - 440.0).abs() <= span);
            }
            if let Some(low) = chord.notes.iter().find(|n| n.interval == -7) {
                assert!((low.frequency_hz - 293.66).abs() < 0.01);
            }
            if let Some(high) = chord.notes.iter().find(|n| n.interval == 7) {
                assert!((high.frequency_hz - 659.26).abs() < 0.01);
            }
        }
    }

    #[test]
    fn test_high_seed_chord_stays_within_root_span() {
        // Ambient scale, root 440, seed an octave up at 880 Hz. Within
        // 258.46 Hz of 880 only +10 (783.99) and +14 (987.77) qualify; +5 and
        // +17 are each about 293 Hz away.
        let table = ScaleTable::standard();
        let ambient = table.index_of("ambient").unwrap();
        let intervals = table.intervals_for(ambient);
        let ctl = controls(440.0);
        let params = PhraseParams::default();
        let notes = NoteParams::default();
        let builder =
            PhraseBuilder::new(&params, &notes, &ctl, intervals, table.shortest_scale_length());
        let span = interval_hz_span(440.0, params.chord_spread_semitones);
        for seed_value in 0..50 {
            let mut rng = RadioRng::new(seed_value);
            let seed = seed_at(&ctl, 12, &mut rng);
            assert!((seed.frequency_hz - 880.0).abs() < 1e-9);
            let chord = builder.chord_of(&seed, 4, &mut rng);
            for note in &chord.notes {
                assert!(
                    (note.frequency_hz - seed.frequency_hz).abs() <= span,
                    "interval {} at {:.2} Hz",
                    note.interval,
                    note.frequency_hz
                );
            }
            let mut got: Vec<i32> = chord.notes.iter().map(|n| n.interval).collect();
            got.sort_unstable();
            assert_eq!(got, vec![10, 12, 14]);
        }
    }

    #[test]
    fn test_chords_unique_within_spread_and_simultaneous() {
        let table = ScaleTable::standard();
        let params = PhraseParams::default();
        let notes = NoteParams::default();
        let ctl = controls(220.0);
        let bound = interval_hz_span(root_hz(&ctl), params.chord_spread_semitones);
        for scale in 0..table.scale_count() {
            let intervals = table.intervals_for(scale);
            let builder =
                PhraseBuilder::new(&params, &notes, &ctl, intervals, table.shortest_scale_length());
            let mut rng = RadioRng::new(scale as u64);
            for _ in 0..50 {
                let seed = assemble_normal_note(&ctl, intervals, &notes, &mut rng);
                let chord = builder.chord(&seed, &mut rng);
                for (i, a) in chord.notes.iter().enumerate() {
                    assert_eq!(a.delay_seconds, seed.delay_seconds);
                    assert!((a.frequency_hz - seed.frequency_hz).abs() <= bound + 1e-9);
                    for b in &chord.notes[i + 1..] {
                        assert_ne!(a.frequency_hz, b.frequency_hz);
                    }
                }
                assert!(chord.len() <= 1 + params.chord_max_tones);
            }
        }
    }

    #[test]
    fn test_chord_stops_when_scale_runs_out() {
        // Root 200 Hz, span 117.48 Hz: from the root only the octave below
        // (100 Hz away) is in reach, so four extra tones yield one.
        let intervals = [-24, -12, 0, 12, 24];
        let ctl = controls(200.0);
        let params = PhraseParams::default();
        let notes = NoteParams::default();
        let builder = PhraseBuilder::new(&params, &notes, &ctl, &intervals, intervals.len());
        let mut rng = RadioRng::new(8);
        let seed = seed_at(&ctl, 0, &mut rng);
        let chord = builder.chord_of(&seed, 4, &mut rng);
        let got: Vec<i32> = chord.notes.iter().map(|n| n.interval).collect();
        assert_eq!(got, vec![0, -12]);

        let two_tone = [0, 12];
        let builder = PhraseBuilder::new(&params, &notes, &ctl, &two_tone, two_tone.len());
        let chord = builder.chord_of(&seed, 4, &mut rng);
        assert_eq!(chord.len(), 1);
    }

    #[test]
    fn test_arpeggio_delays_strictly_increase() {
        let table = ScaleTable::standard();
        let params = PhraseParams::default();
        let notes = NoteParams::default();
        let ctl = controls(260.0);
        let intervals = table.intervals_for(1);
        let builder =
            PhraseBuilder::new(&params, &notes, &ctl, intervals, table.shortest_scale_length());
        let mut rng = RadioRng::new(21);
        for _ in 0..50 {
            let seed = assemble_normal_note(&ctl, intervals, &notes, &mut rng);
            let arp = builder.arpeggio(&seed, &mut rng);
            assert_eq!(arp.kind, PhraseKind::Arpeggio);
            assert!(arp.len() >= 2);
            for pair in arp.notes.windows(2) {
                assert!(pair[1].delay_seconds > pair[0].delay_seconds);
                assert_ne!(pair[0].interval, pair[1].interval);
            }
        }
    }

    #[test]
    fn test_pad_seeded_arpeggio_is_plucked() {
        let table = ScaleTable::standard();
        let params = PhraseParams::default();
        let notes = NoteParams::default();
        let ctl = controls(260.0);
        let intervals = table.intervals_for(0);
        let builder =
            PhraseBuilder::new(&params, &notes, &ctl, intervals, table.shortest_scale_length());
        let normal_max =
            notes.normal_attack.high * (1.0 + ctl.softness * notes.softness_attack_scale);
        let mut rng = RadioRng::new(17);
        for _ in 0..50 {
            let pad = assemble_pad_note(&ctl, intervals, &notes, &mut rng);
            assert!(pad.attack_seconds > normal_max);
            let arp = builder.arpeggio_of(&pad, 3, &mut rng);
            for member in &arp.notes {
                assert_eq!(member.kind, NoteKind::Normal);
                assert_ne!(member.instrument, Some(InstrumentHint::Choir));
                assert!(member.attack_seconds <= normal_max * params.arpeggio_attack_factor);
                assert!(member.release_seconds <= normal_max * params.arpeggio_release_factor);
                assert!(member.duration_seconds < pad.duration_seconds.max(1.0));
            }
        }
    }

    #[test]
    fn test_melody_walk_is_bounded_between_neighbors() {
        let table = ScaleTable::standard();
        let params = PhraseParams {
            melody_chord_percent: 0.0,
            melody_arpeggio_percent: 0.0,
            ..PhraseParams::default()
        };
        let notes = NoteParams::default();
        let ctl = controls(300.0);
        let bound = interval_hz_span(root_hz(&ctl), params.melody_spread_semitones);
        for scale in 0..table.scale_count() {
            let intervals = table.intervals_for(scale);
            let builder =
                PhraseBuilder::new(&params, &notes, &ctl, intervals, table.shortest_scale_length());
            let mut rng = RadioRng::new(100 + scale as u64);
            for _ in 0..30 {
                let seed = assemble_normal_note(&ctl, intervals, &notes, &mut rng);
                let melody = builder.melody(&seed, &mut rng);
                assert!(melody.len() >= 1 + params.melody_min_tones);
                for pair in melody.notes.windows(2) {
                    let (a, b) = (&pair[0], &pair[1]);
                    assert_ne!(a.frequency_hz, b.frequency_hz);
                    assert!((a.frequency_hz - b.frequency_hz).abs() <= bound + 1e-9);
                    assert!(b.delay_seconds > a.delay_seconds);
                }
            }
        }
    }

    #[test]
    fn test_melody_can_close_on_chord() {
        let params = PhraseParams {
            melody_chord_percent: 100.0,
            ..PhraseParams::default()
        };
        let notes = NoteParams::default();
        let table = ScaleTable::standard();
        let intervals = table.intervals_for(0);
        let ctl = controls(250.0);
        let builder =
            PhraseBuilder::new(&params, &notes, &ctl, intervals, table.shortest_scale_length());
        let mut rng = RadioRng::new(64);
        let seed = seed_at(&ctl, 0, &mut rng);
        let melody = builder.melody_of(&seed, 3, &mut rng);
        // Seed + 3 walk tones + at least two closing chord tones.
        assert!(melody.len() >= 6, "got {} notes", melody.len());
        let last_walk_delay = melody.notes[3].delay_seconds;
        for note in &melody.notes[4..] {
            assert_eq!(note.delay_seconds, last_walk_delay);
        }
        for pair in melody.notes.windows(2) {
            assert!(pair[1].delay_seconds >= pair[0].delay_seconds);
        }
    }

    #[test]
    fn test_members_are_independent_copies() {
        let table = ScaleTable::standard();
        let params = PhraseParams::default();
        let notes = NoteParams::default();
        let ctl = controls(330.0);
        let intervals = table.intervals_for(2);
        let builder =
            PhraseBuilder::new(&params, &notes, &ctl, intervals, table.shortest_scale_length());
        let mut rng = RadioRng::new(5);
        let seed = seed_at(&ctl, 0, &mut rng);
        let original = seed.clone();
        let mut chord = builder.chord_of(&seed, 2, &mut rng);
        assert_eq!(chord.len(), 3);
        chord.notes[1].volume = 0.0;
        assert_eq!(seed, original);
        assert!(chord.notes[0].volume > 0.0);
        assert!(chord.notes[2].volume > 0.0);
    }

    #[test]
    fn test_pad_chord_softens_members() {
        let intervals = [-7, -5, 0, 5, 7];
        let ctl = controls(220.0);
        let params = PhraseParams::default();
        let notes = NoteParams::default();
        let builder = PhraseBuilder::new(&params, &notes, &ctl, &intervals, intervals.len());
        let mut rng = RadioRng::new(12);
        let pad = assemble_pad_note(&ctl, &[0], &notes, &mut rng);
        let chord = builder.chord_of(&pad, 3, &mut rng);
        assert_eq!(chord.len(), 4);
        for member in &chord.notes[1..] {
            assert!(member.attack_seconds >= pad.attack_seconds);
            assert_eq!(member.duration_seconds, pad.duration_seconds);
        }
        assert_eq!(
            chord.notes[0].frequency_hz,
            frequency_for_interval(220.0, 0)
        );
    }

    #[test]
    fn test_span_covers_last_member() {
        let ctl = controls(220.0);
        let params = PhraseParams::default();
        let notes = NoteParams::default();
        let intervals = [-12, -7, -5, 0, 5, 7, 12];
        let builder = PhraseBuilder::new(&params, &notes, &ctl, &intervals, intervals.len());
        let mut rng = RadioRng::new(30);
        let seed = seed_at(&ctl, 0, &mut rng);
        let arp = builder.arpeggio_of(&seed, 3, &mut rng);
        let last = arp.notes.last().unwrap();
        assert!(arp.span_seconds() >= last.end_seconds());
    }
}
