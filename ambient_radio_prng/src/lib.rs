// Seedable pseudo-random number generator for Ambient Radio.
//
// xoshiro256++ (Blackman & Vigna, 2019) with SplitMix64 seeding. The radio
// is a toy, not a simulation, so bit-exact cross-platform output is not a
// hard requirement; what matters is that a session is *replayable*: the
// same seed, the same control values and the same clicks must produce the
// same notes. That is what makes the composer testable.
//
// `ambient_radio_music` never reaches for this type directly in its
// algorithms. It goes through its `RandomSource` trait (see
// `ambient_radio_music/src/random.rs`), which `RadioRng` implements, so tests
// can swap in scripted sources that force a particular branch.
//
// The integer core uses no floating point. Float helpers derive their value
// from the top mantissa-width bits of `next_u64`.

use serde::{Deserialize, Serialize};

/// Xoshiro256++ generator. Cheap to clone; a clone continues the same stream.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RadioRng {
    s: [u64; 4],
}

impl RadioRng {
    /// Create a generator from a `u64` seed.
    ///
    /// SplitMix64 expands the seed into the 256-bit state, so small or
    /// adjacent seeds still give unrelated streams.
    pub fn new(seed: u64) -> Self {
        let mut sm = seed;
        Self {
            s: [
                splitmix64(&mut sm),
                splitmix64(&mut sm),
                splitmix64(&mut sm),
                splitmix64(&mut sm),
            ],
        }
    }

    /// Seed from the wall clock. Only the CLI uses this, and only when no
    /// `--seed` was given.
    pub fn from_time() -> Self {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(0x5eed);
        Self::new(nanos)
    }

    /// Generate the next `u64` in the sequence.
    pub fn next_u64(&mut self) -> u64 {
        let result = (self.s[0].wrapping_add(self.s[3]))
            .rotate_left(23)
            .wrapping_add(self.s[0]);

        let t = self.s[1] << 17;

        self.s[2] ^= self.s[0];
        self.s[3] ^= self.s[1];
        self.s[1] ^= self.s[2];
        self.s[0] ^= self.s[3];

        self.s[2] ^= t;
        self.s[3] = self.s[3].rotate_left(45);

        result
    }

    /// Uniform `f64` in [0, 1), built from the upper 53 bits.
    pub fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Uniform `f64` in `[low, high)`.
    ///
    /// A degenerate range (`low == high`) returns `low`; the composer's
    /// control-derived ranges collapse that way at slider extremes.
    /// Panics if `low > high`.
    pub fn range_f64(&mut self, low: f64, high: f64) -> f64 {
        assert!(low <= high, "range_f64: low must not exceed high");
        low + self.next_f64() * (high - low)
    }

    /// Uniform integer in `[low, high)`, by rejection sampling.
    ///
    /// Panics if `low >= high`.
    pub fn range_u64(&mut self, low: u64, high: u64) -> u64 {
        assert!(low < high, "range_u64: low must be less than high");
        let range = high - low;
        if range.is_power_of_two() {
            return low + (self.next_u64() & (range - 1));
        }
        let threshold = range.wrapping_neg() % range;
        loop {
            let r = self.next_u64();
            if r >= threshold {
                return low + (r % range);
            }
        }
    }

    /// Uniform `usize` in `[low, high)`. Panics if `low >= high`.
    pub fn range_usize(&mut self, low: usize, high: usize) -> usize {
        self.range_u64(low as u64, high as u64) as usize
    }

    /// `true` with the given percentage chance (0–100), the unit the radio's
    /// weights are written in. `0` never fires, `100` always does.
    pub fn percent_chance(&mut self, percent: f64) -> bool {
        self.next_f64() * 100.0 < percent
    }
}

/// SplitMix64 step, used only to expand a seed into xoshiro state.
fn splitmix64(state: &mut u64) -> u64 {
    *state = state.wrapping_add(0x9e37_79b9_7f4a_7c15);
    let mut z = *state;
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}
