// Error type for the parts of the radio that touch the outside world.
//
// The composer itself has no failure outcomes: empty wave sets, oversized
// tone counts and unconvergent resampling all degrade to a fallback note
// (see `note.rs` and `phrase.rs`). Errors only arise at the edges: loading
// a config file, building a scale table from custom seeds, looking up a
// scale by name for the CLI, and writing MIDI/JSON output.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RadioError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("invalid scale '{name}': {reason}")]
    InvalidScale { name: String, reason: String },

    #[error("unknown scale '{0}'")]
    UnknownScale(String),
}
