// The composer's view of randomness.
//
// Every random decision in the engine goes through `RandomSource`: uniform
// reals, uniform picks from a slice, and percentage "maybe" rolls (the unit
// all of the radio's weights are expressed in). `RadioRng` is the production
// implementation; tests substitute scripted sources to force a branch, e.g.
// "memory replay fires and the forget roll succeeds".

use ambient_radio_prng::RadioRng;

pub trait RandomSource {
    /// Uniform real in `[low, high)`. Returns `low` when the range is empty.
    fn range_f64(&mut self, low: f64, high: f64) -> f64;

    /// Uniform index in `[0, len)`. `len` must be non-zero.
    fn index(&mut self, len: usize) -> usize;

    /// `true` with the given percentage chance (0–100).
    fn maybe(&mut self, percent: f64) -> bool;

    /// Uniform pick from a slice, `None` when it is empty.
    fn pick<'a, T>(&mut self, items: &'a [T]) -> Option<&'a T> {
        if items.is_empty() {
            None
        } else {
            Some(&items[self.index(items.len())])
        }
    }

    /// Uniform count in `[low, high]`.
    fn count_inclusive(&mut self, low: usize, high: usize) -> usize {
        if high <= low {
            low
        } else {
            low + self.index(high - low + 1)
        }
    }

    /// `first` with the given percentage chance, otherwise `second`.
    fn either<T>(&mut self, percent: f64, first: T, second: T) -> T {
        if self.maybe(percent) { first } else { second }
    }
}

impl RandomSource for RadioRng {
    fn range_f64(&mut self, low: f64, high: f64) -> f64 {
        if high <= low {
            low
        } else {
            RadioRng::range_f64(self, low, high)
        }
    }

    fn index(&mut self, len: usize) -> usize {
        self.range_usize(0, len)
    }

    fn maybe(&mut self, percent: f64) -> bool {
        self.percent_chance(percent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pick_covers_all_items() {
        let mut rng = RadioRng::new(7);
        let items = ['a', 'b', 'c'];
        let mut seen = [false; 3];
        for _ in 0..200 {
            let c = *rng.pick(&items).unwrap();
            seen[(c as u8 - b'a') as usize] = true;
        }
        assert_eq!(seen, [true; 3]);
        let empty: [char; 0] = [];
        assert!(rng.pick(&empty).is_none());
    }

    #[test]
    fn test_count_inclusive_bounds() {
        let mut rng = RadioRng::new(11);
        for _ in 0..1000 {
            let n = rng.count_inclusive(2, 4);
            assert!((2..=4).contains(&n));
        }
        assert_eq!(rng.count_inclusive(5, 3), 5);
    }

    #[test]
    fn test_range_f64_empty_range() {
        let mut rng = RadioRng::new(1);
        assert_eq!(RandomSource::range_f64(&mut rng, 3.0, 1.0), 3.0);
    }
}
