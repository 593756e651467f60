// Playback seam: where finished notes leave the engine.
//
// The composer hands every note, in construction order, to a `Playback`
// along with an optional on-screen position. What happens next (oscillators,
// filters, drawing a circle) is the collaborator's concern; the call is
// fire-and-forget.
//
// `RecordingPlayback` is the headless collaborator. It timestamps each note
// with the session clock plus the note's own delay and expands echo trains
// into their individual repeats, which is what a real audio graph would end
// up sounding. Its log feeds the MIDI and JSON renderers.

use crate::note::Note;
use serde::{Deserialize, Serialize};

/// Where to draw a note, as fractions of the visualizer (0..=1 each).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct VisualHint {
    pub x: f64,
    pub y: f64,
}

pub trait Playback {
    fn play(&mut self, note: &Note, hint: Option<VisualHint>);
}

/// One sounded note as recorded by `RecordingPlayback`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlayedNote {
    /// Session time the note starts sounding (trigger time plus its delay).
    pub start_ms: u64,
    /// 0 for the note itself, n for its n-th echo repeat.
    pub echo_index: usize,
    pub hint: Option<VisualHint>,
    pub note: Note,
}

/// Records everything it is asked to play.
#[derive(Clone, Debug)]
pub struct RecordingPlayback {
    now_ms: u64,
    echo_volume_step: f64,
    played: Vec<PlayedNote>,
    /// `play` calls received, before echo expansion.
    dispatched: usize,
}

impl RecordingPlayback {
    pub fn new(echo_volume_step: f64) -> Self {
        RecordingPlayback {
            now_ms: 0,
            echo_volume_step,
            played: Vec::new(),
            dispatched: 0,
        }
    }

    /// Session time that subsequent `play` calls are triggered at.
    pub fn set_now_ms(&mut self, now_ms: u64) {
        self.now_ms = now_ms;
    }

    pub fn played(&self) -> &[PlayedNote] {
        &self.played
    }

    pub fn dispatched(&self) -> usize {
        self.dispatched
    }

    /// Latest moment any recorded note is still sounding, in ms.
    pub fn end_ms(&self) -> u64 {
        self.played
            .iter()
            .map(|p| {
                let n = &p.note;
                let tail = n.attack_seconds + n.duration_seconds + n.release_seconds;
                p.start_ms + (tail * 1000.0).round() as u64
            })
            .max()
            .unwrap_or(0)
    }
}

impl Playback for RecordingPlayback {
    fn play(&mut self, note: &Note, hint: Option<VisualHint>) {
        self.dispatched += 1;
        for (echo_index, sounded) in note.echo_train(self.echo_volume_step).into_iter().enumerate() {
            let offset_ms = (sounded.delay_seconds.max(0.0) * 1000.0).round() as u64;
            self.played.push(PlayedNote {
                start_ms: self.now_ms + offset_ms,
                echo_index,
                hint,
                note: sounded,
            });
        }
    }
}
