// MIDI output from a recorded session.
//
// Converts the `RecordingPlayback` log into a Standard MIDI File so a
// headless run can be listened to. Track 0 carries the tempo; then one track
// per waveform that actually sounded, in `WaveKind::ALL` order. Tonal waves
// get their own channels (skipping 9); the three noise waves share the
// percussion channel 9, since a synth would render them as unpitched hiss.
//
// Timing: session milliseconds map to ticks through the given tempo. A note
// is held from its start until the end of its attack plus duration; the
// release tail is left to the instrument. Echo repeats are ordinary notes
// here. Velocity follows volume.
//
// Uses the `midly` crate. Output is SMF Format 1 (multi-track).

use crate::control::WaveKind;
use crate::error::RadioError;
use crate::pitch::midi_key_for_frequency;
use crate::playback::PlayedNote;
use midly::{
    Format, Header, MetaMessage, MidiMessage, Smf, Timing, Track, TrackEvent, TrackEventKind,
    num::{u4, u7, u15, u24, u28},
};
use std::path::Path;

/// Ticks per quarter note in MIDI output.
const TICKS_PER_QUARTER: u16 = 480;

const PERCUSSION_CHANNEL: u8 = 9;

/// General MIDI program for each tonal wave (0-based).
fn program_for(wave: WaveKind) -> u8 {
    match wave {
        WaveKind::Sine => 89,     // warm pad
        WaveKind::Triangle => 88, // new age pad
        WaveKind::Sawtooth => 81, // saw lead
        WaveKind::Square => 80,   // square lead
        WaveKind::WhiteNoise | WaveKind::PinkNoise | WaveKind::BrownNoise => 0,
    }
}

/// Write a recorded session to a MIDI file.
pub fn write_midi(log: &[PlayedNote], tempo_bpm: f64, path: &Path) -> Result<(), RadioError> {
    let smf = log_to_smf(log, tempo_bpm);
    let mut buf = Vec::new();
    smf.write_std(&mut buf)?;
    std::fs::write(path, &buf)?;
    Ok(())
}

fn ms_to_ticks(ms: f64, tempo_bpm: f64) -> u32 {
    let ticks_per_ms = tempo_bpm * TICKS_PER_QUARTER as f64 / 60_000.0;
    (ms.max(0.0) * ticks_per_ms).round() as u32
}

/// Convert a recorded session to an in-memory SMF.
pub fn log_to_smf(log: &[PlayedNote], tempo_bpm: f64) -> Smf<'static> {
    let tempo_bpm = tempo_bpm.max(1.0);
    let mut smf = Smf::new(Header::new(
        Format::Parallel,
        Timing::Metrical(u15::new(TICKS_PER_QUARTER)),
    ));

    // Track 0: tempo track
    let tempo_microseconds = (60_000_000.0 / tempo_bpm).round() as u32;
    smf.tracks.push(vec![
        TrackEvent {
            delta: u28::new(0),
            kind: TrackEventKind::Meta(MetaMessage::Tempo(u24::new(tempo_microseconds))),
        },
        TrackEvent {
            delta: u28::new(0),
            kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
        },
    ]);

    let mut next_tonal_channel: u8 = 0;
    for wave in WaveKind::ALL {
        let notes: Vec<&PlayedNote> = log.iter().filter(|p| p.note.wave == wave).collect();
        if notes.is_empty() {
            continue;
        }
        let channel = if wave.is_noise() {
            PERCUSSION_CHANNEL
        } else {
            let c = next_tonal_channel;
            next_tonal_channel += 1;
            if next_tonal_channel == PERCUSSION_CHANNEL {
                next_tonal_channel += 1;
            }
            c
        };
        smf.tracks.push(wave_track(wave, channel, &notes, tempo_bpm));
    }

    smf
}

fn wave_track(
    wave: WaveKind,
    channel: u8,
    notes: &[&PlayedNote],
    tempo_bpm: f64,
) -> Track<'static> {
    let channel = u4::new(channel);
    let mut track: Track<'static> = Vec::new();

    track.push(TrackEvent {
        delta: u28::new(0),
        kind: TrackEventKind::Meta(MetaMessage::TrackName(wave.name().as_bytes())),
    });
    if !wave.is_noise() {
        track.push(TrackEvent {
            delta: u28::new(0),
            kind: TrackEventKind::Midi {
                channel,
                message: MidiMessage::ProgramChange {
                    program: u7::new(program_for(wave)),
                },
            },
        });
    }

    // (tick, is_on, key, velocity); offs sort before ons at the same tick.
    let mut events: Vec<(u32, bool, u8, u8)> = Vec::with_capacity(notes.len() * 2);
    for played in notes {
        let note = &played.note;
        let key = midi_key_for_frequency(note.frequency_hz);
        let velocity = (note.volume * 127.0).round().clamp(1.0, 127.0) as u8;
        let held_ms = (note.attack_seconds + note.duration_seconds) * 1000.0;
        let on = ms_to_ticks(played.start_ms as f64, tempo_bpm);
        let off = on + ms_to_ticks(held_ms, tempo_bpm).max(1);
        events.push((on, true, key, velocity));
        events.push((off, false, key, 0));
    }
    events.sort_by_key(|&(tick, is_on, key, _)| (tick, is_on, key));

    let mut last_tick = 0;
    for (tick, is_on, key, velocity) in events {
        let message = if is_on {
            MidiMessage::NoteOn {
                key: u7::new(key),
                vel: u7::new(velocity),
            }
        } else {
            MidiMessage::NoteOff {
                key: u7::new(key),
                vel: u7::new(0),
            }
        };
        track.push(TrackEvent {
            delta: u28::new(tick - last_tick),
            kind: TrackEventKind::Midi { channel, message },
        });
        last_tick = tick;
    }

    track.push(TrackEvent {
        delta: u28::new(0),
        kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
    });
    track
}
