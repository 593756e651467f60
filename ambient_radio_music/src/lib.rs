// Ambient Radio composer
//
// A generative ambient music engine: a never-ending stream of notes, chords,
// arpeggios and short melodies drawn from a chosen scale, shaped by a handful
// of listener controls (tempo, pitch, softness, density, mood, waveforms) and
// by a short-term memory that brings recent phrases back as motifs.
//
// The engine only decides *what* to play and *when*. Sound synthesis and
// drawing are collaborators behind the `Playback` trait; timers are behind
// `Clock`; all randomness goes through `RandomSource`.
//
// Architecture:
// - scale.rs: Named scale seeds expanded into symmetric interval sets
// - pitch.rs: Interval <-> frequency, screen position and MIDI key mapping
// - random.rs: RandomSource trait over the workspace PRNG
// - control.rs: Control settings (owned by the panel), per-cycle snapshots,
//   tempo-derived note timings
// - note.rs: Note value object and the normal/pad note assembler
// - phrase.rs: Chord, arpeggio and melody construction from a seed note
// - memory.rs: Bounded short-term memory of played phrases
// - clock.rs: Clock trait and a manually stepped virtual clock
// - playback.rs: Playback trait and a recording implementation
// - composer.rs: The autoplay state machine and click handling
// - evolve.rs: Slow random drift of the controls
// - session.rs: Headless driver tying composer, clock, controls and playback
// - config.rs: All composer tunables, loadable from JSON
// - midi.rs: MIDI file output from a recorded session
// - error.rs: Error type for config, scale and output failures
//
// Given a seed, a session is deterministic.

pub mod clock;
pub mod composer;
pub mod config;
pub mod control;
pub mod error;
pub mod evolve;
pub mod memory;
pub mod midi;
pub mod note;
pub mod phrase;
pub mod pitch;
pub mod playback;
pub mod random;
pub mod scale;
pub mod session;
