// Evolve: slow, random drift of the control panel so a long listening
// session keeps changing character without anyone touching it.
//
// Every 10 to 60 seconds one control moves. Sliders jump to a random value
// within a third of their full range of where they are now (rounded, clamped
// to the range); toggles land on a coin flip. Volume, autoplay and evolve
// itself are never drifted, so the radio cannot silence or switch itself
// off. Waveform toggles go through `ControlSettings::set`, which refuses to
// switch the last active waveform off.
//
// "Randomize" is the same drift applied once to every evolvable control.

use crate::control::{ControlKey, ControlSettings};
use crate::random::RandomSource;

/// Bounds of the pause between two drifts, in ms.
pub const EVOLVE_DELAY_RANGE_MS: (u64, u64) = (10_000, 60_000);

/// Whether the evolve loop may touch `key`.
pub fn is_evolvable(key: ControlKey) -> bool {
    !matches!(
        key,
        ControlKey::Volume | ControlKey::Autoplay | ControlKey::Evolve
    )
}

/// Every control the evolve loop may touch, in `ControlKey::ALL` order.
pub fn evolvable_controls() -> Vec<ControlKey> {
    ControlKey::ALL
        .into_iter()
        .filter(|&k| is_evolvable(k))
        .collect()
}

/// Drift one control. Returns the stored value, or `None` (and leaves
/// settings alone) if the control is not evolvable.
pub fn evolve_control(
    settings: &mut ControlSettings,
    key: ControlKey,
    rng: &mut impl RandomSource,
) -> Option<f64> {
    if !is_evolvable(key) {
        return None;
    }
    let old = settings.get(key);
    let value = if key.is_toggle() {
        rng.either(50.0, 1.0, 0.0)
    } else {
        let range = settings.range(key);
        let reach = range.span() / 3.0;
        let low = (old - reach).floor().max(range.min);
        let high = (old + reach).ceil().min(range.max);
        rng.range_f64(low, high).round()
    };
    let stored = settings.set(key, value);
    log::debug!("evolve {key:?}: {old} -> {stored}");
    Some(stored)
}

/// Drift a uniformly chosen evolvable control.
pub fn evolve_random_control(
    settings: &mut ControlSettings,
    rng: &mut impl RandomSource,
) -> (ControlKey, f64) {
    let keys = evolvable_controls();
    let key = keys[rng.index(keys.len())];
    let stored = evolve_control(settings, key, rng).unwrap_or_else(|| settings.get(key));
    (key, stored)
}

/// Drift every evolvable control once.
pub fn randomize_controls(settings: &mut ControlSettings, rng: &mut impl RandomSource) {
    for key in evolvable_controls() {
        evolve_control(settings, key, rng);
    }
}

pub fn next_evolve_delay_ms(rng: &mut impl RandomSource) -> u64 {
    let (low, high) = EVOLVE_DELAY_RANGE_MS;
    rng.range_f64(low as f64, high as f64).floor() as u64
}
