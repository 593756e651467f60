// Headless session: wires the composer to a virtual clock, the control
// settings and a recording playback, and plays the role the page bootstrap
// plays in the browser radio.
//
// Two self-rearming loops share the clock:
// - autoplay, owned by the `Composer` (its single pending timer);
// - evolve, owned here: every 10 to 60 s one control drifts.
// `run_for` fires timers in due order and hands each handle to whichever
// loop armed it. Turning the autoplay or evolve toggle on/off through
// `set_control` starts/stops the matching loop, as the panel's switches do.
//
// The composer's randomness is shared with evolve, so a session is fully
// determined by its seed, its config and the calls made on it.

use crate::clock::{Clock, ManualClock, TimerHandle};
use crate::composer::{ClickTrigger, Composer, CycleReport};
use crate::config::ComposerConfig;
use crate::control::{ControlKey, ControlSettings};
use crate::evolve::{evolve_random_control, next_evolve_delay_ms};
use crate::playback::{PlayedNote, RecordingPlayback};
use crate::random::RandomSource;
use crate::scale::ScaleTable;

pub struct Session<R: RandomSource> {
    composer: Composer<R>,
    clock: ManualClock,
    controls: ControlSettings,
    playback: RecordingPlayback,
    evolve_timer: Option<TimerHandle>,
}

impl<R: RandomSource> Session<R> {
    pub fn new(
        rng: R,
        scales: ScaleTable,
        config: ComposerConfig,
        controls: ControlSettings,
    ) -> Self {
        let playback = RecordingPlayback::new(config.notes.echo_volume_step);
        Session {
            composer: Composer::new(rng, scales, config),
            clock: ManualClock::new(),
            controls,
            playback,
            evolve_timer: None,
        }
    }

    /// Start whichever loops the autoplay and evolve toggles ask for.
    pub fn start(&mut self) {
        if self.controls.is_on(ControlKey::Autoplay) {
            self.start_autoplay();
        }
        if self.controls.is_on(ControlKey::Evolve) {
            self.start_evolve();
        }
    }

    fn start_autoplay(&mut self) {
        self.playback.set_now_ms(self.clock.now_ms());
        let snapshot = self.controls.snapshot();
        self.composer
            .start(&snapshot, &mut self.clock, &mut self.playback);
    }

    fn start_evolve(&mut self) {
        if self.evolve_timer.is_some() {
            return;
        }
        let delay = next_evolve_delay_ms(self.composer.rng_mut());
        self.evolve_timer = Some(self.clock.schedule(delay));
        log::info!("evolve started, first drift in {delay} ms");
    }

    fn stop_evolve(&mut self) {
        if let Some(handle) = self.evolve_timer.take() {
            self.clock.cancel(handle);
            log::info!("evolve stopped at {} ms", self.clock.now_ms());
        }
    }

    /// Change a control the way the panel would. Returns the stored value.
    pub fn set_control(&mut self, key: ControlKey, value: f64) -> f64 {
        let stored = self.controls.set(key, value);
        self.apply_toggle(key);
        stored
    }

    /// Start or stop the loop a toggle governs, to match its current value.
    fn apply_toggle(&mut self, key: ControlKey) {
        match key {
            ControlKey::Autoplay => {
                if self.controls.is_on(key) {
                    self.start_autoplay();
                } else {
                    self.composer.stop(&mut self.clock);
                }
            }
            ControlKey::Evolve => {
                if self.controls.is_on(key) {
                    self.start_evolve();
                } else {
                    self.stop_evolve();
                }
            }
            _ => {}
        }
    }

    /// A click at the current time.
    pub fn click(&mut self, click: ClickTrigger) -> CycleReport {
        self.playback.set_now_ms(self.clock.now_ms());
        let snapshot = self.controls.snapshot();
        self.composer
            .generate_cycle(Some(&click), &snapshot, &mut self.playback)
    }

    /// Advance the clock by `seconds`, firing every timer that falls due.
    pub fn run_for(&mut self, seconds: f64) {
        let end_ms = self.clock.now_ms() + (seconds.max(0.0) * 1000.0).round() as u64;
        while let Some(handle) = self.clock.pop_due(end_ms) {
            self.playback.set_now_ms(self.clock.now_ms());
            if self.evolve_timer == Some(handle) {
                self.on_evolve();
            } else {
                let snapshot = self.controls.snapshot();
                self.composer
                    .on_timer(handle, &snapshot, &mut self.clock, &mut self.playback);
            }
        }
        self.clock.advance_to(end_ms);
    }

    fn on_evolve(&mut self) {
        let (key, _) = evolve_random_control(&mut self.controls, self.composer.rng_mut());
        // Evolve never drifts autoplay or evolve, but a toggle it does drift
        // still has to be honored.
        self.apply_toggle(key);
        let delay = next_evolve_delay_ms(self.composer.rng_mut());
        self.evolve_timer = Some(self.clock.schedule(delay));
    }

    pub fn now_ms(&self) -> u64 {
        self.clock.now_ms()
    }

    pub fn log(&self) -> &[PlayedNote] {
        self.playback.played()
    }

    pub fn playback(&self) -> &RecordingPlayback {
        &self.playback
    }

    pub fn controls(&self) -> &ControlSettings {
        &self.controls
    }

    pub fn composer(&self) -> &Composer<R> {
        &self.composer
    }

    pub fn is_evolving(&self) -> bool {
        self.evolve_timer.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::composer::CycleOutcome;
    use ambient_radio_prng::RadioRng;

    fn session(seed: u64) -> Session<RadioRng> {
        let scales = ScaleTable::standard();
        let controls = ControlSettings::new(scales.scale_count());
        Session::new(RadioRng::new(seed), scales, ComposerConfig::default(), controls)
    }

    #[test]
    fn test_autoplay_keeps_playing_over_time() {
        let mut s = session(1);
        s.start();
        assert!(s.composer().is_running());
        assert!(s.is_evolving());
        s.run_for(120.0);
        assert_eq!(s.now_ms(), 120_000);
        assert!(s.playback().dispatched() > 5);
        assert!(s.log().iter().any(|p| p.start_ms > 60_000));
    }

    #[test]
    fn test_turning_autoplay_off_stops_new_cycles() {
        let mut s = session(2);
        s.start();
        s.run_for(10.0);
        s.set_control(ControlKey::Autoplay, 0.0);
        assert!(!s.composer().is_running());
        let dispatched = s.playback().dispatched();
        s.run_for(300.0);
        assert_eq!(s.playback().dispatched(), dispatched);

        s.set_control(ControlKey::Autoplay, 1.0);
        assert!(s.playback().dispatched() > dispatched);
    }

    #[test]
    fn test_evolve_toggle_controls_drift() {
        let mut s = session(3);
        s.set_control(ControlKey::Evolve, 0.0);
        s.start();
        assert!(!s.is_evolving());
        let before = s.controls().clone();
        s.run_for(600.0);
        for key in ControlKey::ALL {
            assert_eq!(s.controls().get(key), before.get(key), "{key:?} drifted");
        }

        s.set_control(ControlKey::Evolve, 1.0);
        assert!(s.is_evolving());
        s.run_for(600.0);
        let drifted = ControlKey::ALL
            .into_iter()
            .any(|k| s.controls().get(k) != before.get(k));
        assert!(drifted);
    }

    #[test]
    fn test_click_plays_at_current_time() {
        let mut s = session(4);
        s.set_control(ControlKey::Autoplay, 0.0);
        s.run_for(3.5);
        let report = s.click(ClickTrigger {
            x: 0.5,
            y: 0.5,
            held_seconds: 1.5,
        });
        assert_eq!(report.outcome, CycleOutcome::Click);
        assert_eq!(s.log()[0].start_ms, 3_500);
        assert_eq!(s.log()[0].note.duration_seconds, 1.5);
    }

    #[test]
    fn test_same_seed_same_session() {
        let mut a = session(9);
        let mut b = session(9);
        a.start();
        b.start();
        a.run_for(90.0);
        b.run_for(90.0);
        assert_eq!(a.log(), b.log());
    }
}
