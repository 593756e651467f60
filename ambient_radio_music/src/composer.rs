// Composition scheduler: the radio's autoplay loop as an explicit state
// machine.
//
// States:
// - `Idle`: autoplay off, no timer armed.
// - `Playing`: a cycle is being generated right now (only observable from
//   inside a cycle; `start`/`on_timer` always leave it).
// - `Scheduled(handle)`: one timer armed for the next cycle. At most one
//   autoplay timer exists at any time, so `stop` only has to cancel it.
//
// A cycle either replays a phrase from short-term memory or builds a fresh
// one: replay (if memory has anything) first, then chord, arpeggio, single
// note, and a melody when every other roll fails. Fresh phrases are
// remembered; replayed ones are forgotten with some probability right after
// they play. The next cycle is armed after the phrase's own span plus a rest
// of one or two bars (scaled by density), never sooner than
// `min_cycle_delay_ms`.
//
// User clicks go through `generate_cycle` too but only ever produce one
// note: pitch snapped from the click's horizontal position, duration equal
// to how long the button was held. Clicks never touch memory or the state
// machine.
//
// Note-level delays are data on each `Note`; the composer never arms timers
// per note. Notes already handed to playback when autoplay stops are left to
// finish.
//
// See also: phrase.rs for phrase construction, memory.rs for the replay
// buffer, session.rs for a driver that owns the clock and controls.

use crate::clock::{Clock, TimerHandle};
use crate::config::ComposerConfig;
use crate::control::ControlSnapshot;
use crate::memory::ShortTermMemory;
use crate::note::{assemble_note, root_hz};
use crate::phrase::{Phrase, PhraseBuilder, PhraseKind};
use crate::pitch::{frequency_for_interval, interval_for_position, position_for_frequency};
use crate::playback::{Playback, VisualHint};
use crate::random::RandomSource;
use crate::scale::ScaleTable;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Scheduled(TimerHandle),
    Playing,
}

/// A click on the visualizer. Positions are fractions of its size.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClickTrigger {
    pub x: f64,
    pub y: f64,
    pub held_seconds: f64,
}

/// Which path a cycle took.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CycleOutcome {
    Click,
    Replayed { forgotten: bool },
    Fresh { remembered: bool },
}

/// Summary of one generated cycle.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CycleReport {
    pub outcome: CycleOutcome,
    pub phrase_kind: PhraseKind,
    pub notes: usize,
    pub span_seconds: f64,
    /// Delay until the next autoplay cycle. Zero for clicks.
    pub next_delay_ms: u64,
}

pub struct Composer<R: RandomSource> {
    rng: R,
    scales: ScaleTable,
    memory: ShortTermMemory,
    config: ComposerConfig,
    state: SchedulerState,
}

impl<R: RandomSource> Composer<R> {
    pub fn new(rng: R, scales: ScaleTable, config: ComposerConfig) -> Self {
        let memory = ShortTermMemory::new(config.schedule.memory_capacity);
        Composer {
            rng,
            scales,
            memory,
            config,
            state: SchedulerState::Idle,
        }
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state != SchedulerState::Idle
    }

    pub fn memory(&self) -> &ShortTermMemory {
        &self.memory
    }

    pub fn scales(&self) -> &ScaleTable {
        &self.scales
    }

    pub fn config(&self) -> &ComposerConfig {
        &self.config
    }

    pub fn rng_mut(&mut self) -> &mut R {
        &mut self.rng
    }

    /// Turn autoplay on: play one cycle now and arm the next. No-op if
    /// autoplay is already running.
    pub fn start(
        &mut self,
        controls: &ControlSnapshot,
        clock: &mut impl Clock,
        playback: &mut impl Playback,
    ) {
        if self.is_running() {
            log::debug!("start ignored, autoplay already running");
            return;
        }
        log::info!("autoplay started at {} ms", clock.now_ms());
        self.play_and_rearm(controls, clock, playback);
    }

    /// Turn autoplay off, cancelling the pending cycle. Returns whether a
    /// timer was cancelled.
    pub fn stop(&mut self, clock: &mut impl Clock) -> bool {
        let cancelled = match self.state {
            SchedulerState::Scheduled(handle) => clock.cancel(handle),
            SchedulerState::Idle | SchedulerState::Playing => false,
        };
        if self.state != SchedulerState::Idle {
            log::info!("autoplay stopped at {} ms", clock.now_ms());
        }
        self.state = SchedulerState::Idle;
        cancelled
    }

    /// A timer fired. Runs a cycle only if `handle` is the pending autoplay
    /// timer; anything else (stale or foreign) is ignored.
    pub fn on_timer(
        &mut self,
        handle: TimerHandle,
        controls: &ControlSnapshot,
        clock: &mut impl Clock,
        playback: &mut impl Playback,
    ) -> bool {
        if self.state != SchedulerState::Scheduled(handle) {
            log::trace!("ignoring timer {handle:?} in state {:?}", self.state);
            return false;
        }
        self.play_and_rearm(controls, clock, playback);
        true
    }

    fn play_and_rearm(
        &mut self,
        controls: &ControlSnapshot,
        clock: &mut impl Clock,
        playback: &mut impl Playback,
    ) {
        self.state = SchedulerState::Playing;
        let report = self.generate_cycle(None, controls, playback);
        let handle = clock.schedule(report.next_delay_ms);
        self.state = SchedulerState::Scheduled(handle);
        log::debug!(
            "next cycle in {} ms ({:?})",
            report.next_delay_ms,
            handle
        );
    }

    /// Generate one cycle. `None` is an autoplay tick, `Some` a user click.
    /// Does not arm any timer.
    pub fn generate_cycle(
        &mut self,
        trigger: Option<&ClickTrigger>,
        controls: &ControlSnapshot,
        playback: &mut impl Playback,
    ) -> CycleReport {
        match trigger {
            Some(click) => self.play_click(click, controls, playback),
            None => self.play_autoplay(controls, playback),
        }
    }

    fn play_click(
        &mut self,
        click: &ClickTrigger,
        controls: &ControlSnapshot,
        playback: &mut impl Playback,
    ) -> CycleReport {
        let intervals = self.scales.intervals_for(controls.scale_index);
        let mut note = assemble_note(controls, intervals, &self.config.notes, &mut self.rng);
        let interval = interval_for_position(intervals, click.x);
        note.interval = interval;
        note.frequency_hz = frequency_for_interval(root_hz(controls), interval);
        note.duration_seconds = click.held_seconds.max(self.config.schedule.min_click_seconds);

        let hint = VisualHint {
            x: click.x.clamp(0.0, 1.0),
            y: click.y.clamp(0.0, 1.0),
        };
        log::debug!(
            "click at x={:.2}: interval {interval}, {:.1} Hz, held {:.2} s",
            click.x,
            note.frequency_hz,
            note.duration_seconds
        );
        playback.play(&note, Some(hint));
        let span_seconds = note.end_seconds();
        CycleReport {
            outcome: CycleOutcome::Click,
            phrase_kind: PhraseKind::Single,
            notes: 1,
            span_seconds,
            next_delay_ms: 0,
        }
    }

    fn play_autoplay(
        &mut self,
        controls: &ControlSnapshot,
        playback: &mut impl Playback,
    ) -> CycleReport {
        let replayed = if !self.memory.is_empty()
            && self.rng.maybe(self.config.schedule.replay_percent)
        {
            self.replay_from_memory()
        } else {
            None
        };

        let (phrase, outcome) = match replayed {
            Some(replayed) => replayed,
            None => {
                let phrase = self.compose_fresh(controls);
                let remembered = self.memory.remember(phrase.clone());
                if !remembered {
                    log::debug!("memory full, {:?} phrase not remembered", phrase.kind);
                }
                (phrase, CycleOutcome::Fresh { remembered })
            }
        };

        self.dispatch(&phrase, controls, playback);

        let span_seconds = phrase.span_seconds();
        let rest = controls.timings().rest_before_next_phrase(&mut self.rng);
        let delay_seconds = span_seconds + rest * controls.spacing_factor();
        let next_delay_ms =
            ((delay_seconds * 1000.0).round() as u64).max(self.config.schedule.min_cycle_delay_ms);

        log::debug!(
            "cycle: {:?} {:?}, {} notes over {:.2} s, memory {}/{}",
            outcome,
            phrase.kind,
            phrase.len(),
            span_seconds,
            self.memory.len(),
            self.memory.capacity()
        );
        CycleReport {
            outcome,
            phrase_kind: phrase.kind,
            notes: phrase.len(),
            span_seconds,
            next_delay_ms,
        }
    }

    /// Replay a remembered phrase, maybe forgetting it afterwards. Callers
    /// check that memory is not empty first.
    fn replay_from_memory(&mut self) -> Option<(Phrase, CycleOutcome)> {
        debug_assert!(!self.memory.is_empty(), "replay from empty memory");
        let (index, phrase) = self.memory.recall(&mut self.rng)?;
        let phrase = phrase.clone();
        let forgotten = self.rng.maybe(self.config.schedule.forget_percent);
        if forgotten {
            self.memory.forget(index);
        }
        Some((phrase, CycleOutcome::Replayed { forgotten }))
    }

    fn compose_fresh(&mut self, controls: &ControlSnapshot) -> Phrase {
        let intervals = self.scales.intervals_for(controls.scale_index);
        let seed = assemble_note(controls, intervals, &self.config.notes, &mut self.rng);
        let builder = PhraseBuilder::new(
            &self.config.phrases,
            &self.config.notes,
            controls,
            intervals,
            self.scales.shortest_scale_length(),
        );
        let schedule = &self.config.schedule;
        let rng = &mut self.rng;
        if rng.maybe(schedule.chord_percent) {
            builder.chord(&seed, rng)
        } else if rng.maybe(schedule.arpeggio_percent) {
            builder.arpeggio(&seed, rng)
        } else if rng.maybe(schedule.single_percent) {
            Phrase::single(seed)
        } else {
            builder.melody(&seed, rng)
        }
    }

    /// Hand a phrase to playback in order. The first note lands at a random
    /// spot inside the gutter; later notes are placed by pitch at the same
    /// height.
    fn dispatch(&mut self, phrase: &Phrase, controls: &ControlSnapshot, playback: &mut impl Playback) {
        let gutter = self.config.schedule.visual_gutter;
        let y = self.rng.range_f64(gutter, 1.0 - gutter);
        let first_x = self.rng.range_f64(gutter, 1.0 - gutter);
        let intervals = self.scales.intervals_for(controls.scale_index);
        let root = root_hz(controls);
        for (i, note) in phrase.notes.iter().enumerate() {
            let x = if i == 0 {
                first_x
            } else {
                position_for_frequency(root, intervals, note.frequency_hz)
            };
            playback.play(note, Some(VisualHint { x, y }));
        }
    }
}
