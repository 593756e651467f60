// Scale table: the catalog of named scales the composer draws pitches from.
//
// Each scale starts as a short seed list of ascending semitone intervals
// from the root (root included as 0, the octave excluded), the way a
// musician would write it down. Expansion turns a seed into the set the
// composer actually samples from: every interval `i` contributes `i`,
// `i + 12`, `-i` and `-i - 12`, and the two-octave boundary tones `±24` are
// always present. The result is sorted and deduplicated, so it spans four
// octaves around the root and is symmetric about zero.
//
// The table is built once at startup. Which scale is active is a control
// value (the "mood" slider), read through `ControlSnapshot::scale_index`.
// `shortest_scale_length` caps how many tones a chord, arpeggio or melody
// asks for, so a small scale is never asked for more distinct pitches than
// it has.
//
// Used by note.rs (random interval picks), phrase.rs (candidate tones) and
// composer.rs (table ownership).

use crate::error::RadioError;
use serde::{Deserialize, Serialize};

/// Boundary tone added to every expanded scale: two octaves from the root.
pub const BOUNDARY_INTERVAL: i32 = 24;

/// Built-in seed lists, root-relative, octave excluded.
const STANDARD_SEEDS: &[(&str, &[i32])] = &[
    ("major", &[0, 2, 4, 5, 7, 9, 11]),
    ("natural_minor", &[0, 2, 3, 5, 7, 8, 10]),
    ("harmonic_minor", &[0, 2, 3, 5, 7, 8, 11]),
    ("melodic_minor", &[0, 2, 3, 5, 7, 9, 11]),
    ("pentatonic", &[0, 3, 4, 7, 11]),
    ("dorian", &[0, 2, 3, 5, 7, 9, 10]),
    ("phrygian", &[0, 1, 3, 5, 7, 8, 10]),
    ("lydian", &[0, 2, 4, 6, 7, 9, 11]),
    ("mixolydian", &[0, 2, 4, 5, 7, 9, 10]),
    ("locrian", &[0, 1, 3, 5, 6, 8, 10]),
    ("jazz", &[0, 1, 2, 4, 5, 6, 8, 10]),
    ("ambient", &[0, 2, 5, 10]),
];

/// One named, fully expanded scale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scale {
    pub name: String,
    /// Sorted, unique semitone offsets from the root.
    pub intervals: Vec<i32>,
}

impl Scale {
    /// Expand a seed list into a full scale.
    pub fn from_seed(name: &str, seed: &[i32]) -> Result<Self, RadioError> {
        if seed.is_empty() {
            return Err(RadioError::InvalidScale {
                name: name.to_string(),
                reason: "seed list is empty".to_string(),
            });
        }
        if !seed.contains(&0) {
            return Err(RadioError::InvalidScale {
                name: name.to_string(),
                reason: "seed list must include the root (0)".to_string(),
            });
        }
        Ok(Scale {
            name: name.to_string(),
            intervals: expand_intervals(seed),
        })
    }

    pub fn len(&self) -> usize {
        self.intervals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    pub fn contains(&self, interval: i32) -> bool {
        self.intervals.binary_search(&interval).is_ok()
    }
}

/// Expand a seed list: octave-up, mirrored and mirrored-octave-down
/// counterparts of every interval, plus the `±24` boundary tones.
pub fn expand_intervals(seed: &[i32]) -> Vec<i32> {
    let mut out = Vec::with_capacity(seed.len() * 4 + 2);
    for &interval in seed {
        out.push(interval);
        out.push(interval + 12);
        out.push(-interval);
        out.push(-interval - 12);
    }
    out.push(-BOUNDARY_INTERVAL);
    out.push(BOUNDARY_INTERVAL);
    out.sort_unstable();
    out.dedup();
    out
}

/// The catalog of scales available to the mood control. Serializes as a
/// list of scales; deserializing checks the list like `from_seeds` does.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "Vec<Scale>", into = "Vec<Scale>")]
pub struct ScaleTable {
    scales: Vec<Scale>,
}

impl ScaleTable {
    /// The built-in catalog (major, the three minors, pentatonic, the modes,
    /// jazz and ambient).
    pub fn standard() -> Self {
        let scales = STANDARD_SEEDS
            .iter()
            .map(|(name, seed)| Scale {
                name: (*name).to_string(),
                intervals: expand_intervals(seed),
            })
            .collect();
        ScaleTable { scales }
    }

    /// Build a table from custom seed lists. Fails on an empty catalog or an
    /// invalid seed.
    pub fn from_seeds<S: AsRef<str>>(seeds: &[(S, Vec<i32>)]) -> Result<Self, RadioError> {
        let scales = seeds
            .iter()
            .map(|(name, seed)| Scale::from_seed(name.as_ref(), seed))
            .collect::<Result<Vec<_>, _>>()?;
        ScaleTable::try_from(scales)
    }

    pub fn scale_count(&self) -> usize {
        self.scales.len()
    }

    /// Scale at `index`. Wraps modulo the catalog size so a stale mood value
    /// still selects a scale.
    pub fn scale(&self, index: usize) -> &Scale {
        &self.scales[index % self.scales.len()]
    }

    pub fn intervals_for(&self, index: usize) -> &[i32] {
        &self.scale(index).intervals
    }

    /// Index of the scale called `name`, if any.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.scales.iter().position(|s| s.name == name)
    }

    /// Size of the smallest expanded scale in the table.
    pub fn shortest_scale_length(&self) -> usize {
        self.scales.iter().map(Scale::len).min().unwrap_or(0)
    }
}

impl TryFrom<Vec<Scale>> for ScaleTable {
    type Error = RadioError;

    /// Accepts already expanded scales: at least one, each strictly sorted
    /// and containing the root.
    fn try_from(scales: Vec<Scale>) -> Result<Self, RadioError> {
        if scales.is_empty() {
            return Err(RadioError::InvalidScale {
                name: String::new(),
                reason: "scale table needs at least one scale".to_string(),
            });
        }
        for scale in &scales {
            let sorted = scale.intervals.windows(2).all(|w| w[0] < w[1]);
            if !sorted || !scale.contains(0) {
                return Err(RadioError::InvalidScale {
                    name: scale.name.clone(),
                    reason: "intervals must be sorted, unique and include the root".to_string(),
                });
            }
        }
        Ok(ScaleTable { scales })
    }
}

impl From<ScaleTable> for Vec<Scale> {
    fn from(table: ScaleTable) -> Self {
        table.scales
    }
}

impl Default for ScaleTable {
    fn default() -> Self {
        Self::standard()
    }
}
