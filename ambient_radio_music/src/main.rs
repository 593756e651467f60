// Ambient Radio: CLI entry point.
//
// Runs a headless radio session on a virtual clock and writes what it played
// to a MIDI file (and optionally a JSON note log). The pipeline: controls →
// session start → autoplay/evolve for N seconds → output.
//
// Usage:
//   cargo run -p ambient_radio_music --bin radio -- [output.mid] [--seconds N]
//     [--seed N] [--scale NAME] [--tempo BPM] [--config PATH] [--json PATH]
//     [--no-evolve]
//
// Set RUST_LOG=debug to watch the composer's decisions.

use ambient_radio_music::config::ComposerConfig;
use ambient_radio_music::control::{ControlKey, ControlSettings};
use ambient_radio_music::error::RadioError;
use ambient_radio_music::midi::write_midi;
use ambient_radio_music::phrase::PhraseKind;
use ambient_radio_music::scale::ScaleTable;
use ambient_radio_music::session::Session;
use ambient_radio_prng::RadioRng;
use std::path::Path;

fn main() {
    env_logger::init();
    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<(), RadioError> {
    let args: Vec<String> = std::env::args().collect();

    // Parse arguments
    let output_path = args
        .get(1)
        .filter(|s| !s.starts_with("--"))
        .map(|s| s.as_str())
        .unwrap_or("radio.mid");
    let seconds: f64 = parse_flag(&args, "--seconds").unwrap_or(180.0);
    let seed: Option<u64> = parse_flag(&args, "--seed");
    let scale_name: Option<String> = parse_flag(&args, "--scale");
    let tempo: Option<f64> = parse_flag(&args, "--tempo");
    let config_path: Option<String> = parse_flag(&args, "--config");
    let json_path: Option<String> = parse_flag(&args, "--json");
    let evolve = !args.iter().any(|a| a == "--no-evolve");

    let config = match &config_path {
        Some(path) => ComposerConfig::load(Path::new(path))?,
        None => ComposerConfig::default(),
    };
    let scales = ScaleTable::standard();
    let mut rng = match seed {
        Some(s) => RadioRng::new(s),
        None => RadioRng::from_time(),
    };

    let mut controls = ControlSettings::initial(scales.scale_count(), &mut rng);
    if let Some(name) = scale_name {
        let index = scales
            .index_of(&name)
            .ok_or_else(|| RadioError::UnknownScale(name.clone()))?;
        controls.set(ControlKey::Mood, index as f64);
    }
    if let Some(bpm) = tempo {
        controls.set(ControlKey::Tempo, bpm);
    }
    controls.set(ControlKey::Evolve, if evolve { 1.0 } else { 0.0 });
    let start = controls.snapshot();

    println!("=== Ambient Radio ===");
    println!("Output: {}", output_path);
    println!("Length: {:.0} s", seconds);
    println!(
        "Scale: {} ({} tones)",
        scales.scale(start.scale_index).name,
        scales.intervals_for(start.scale_index).len()
    );
    println!("Tempo: {:.0} BPM", start.tempo_bpm);
    println!("Base note: {:.1} Hz", start.base_note_hz);
    let waves: Vec<&str> = start.active_waves.iter().map(|w| w.name()).collect();
    println!("Waves: {}", waves.join(", "));
    println!("Evolve: {}", if evolve { "on" } else { "off" });
    if let Some(s) = seed {
        println!("Seed: {}", s);
    }
    if let Some(path) = &config_path {
        println!("Config: {}", path);
    }
    println!();

    println!("[1/2] Playing...");
    let mut session = Session::new(rng, scales, config, controls);
    session.start();
    session.run_for(seconds);

    let log = session.log();
    let echoes = log.iter().filter(|p| p.echo_index > 0).count();
    println!(
        "  {} notes dispatched, {} sounded ({} echo repeats)",
        session.playback().dispatched(),
        log.len(),
        echoes
    );
    let memory = session.composer().memory();
    println!(
        "  Memory at end: {}/{} phrases",
        memory.len(),
        memory.capacity()
    );
    for kind in [
        PhraseKind::Single,
        PhraseKind::Chord,
        PhraseKind::Arpeggio,
        PhraseKind::Melody,
    ] {
        let count = memory.iter().filter(|p| p.kind == kind).count();
        if count > 0 {
            println!("    {:?}: {}", kind, count);
        }
    }

    println!("[2/2] Writing output...");
    write_midi(log, start.tempo_bpm, Path::new(output_path))?;
    println!("  Wrote {}", output_path);
    if let Some(path) = &json_path {
        let file = std::fs::File::create(path)?;
        serde_json::to_writer_pretty(std::io::BufWriter::new(file), log)?;
        println!("  Wrote {}", path);
    }

    println!();
    println!("Play with: timidity {} (or any MIDI player)", output_path);
    Ok(())
}

fn parse_flag<T: std::str::FromStr>(args: &[String], flag: &str) -> Option<T> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .and_then(|v| v.parse().ok())
}
