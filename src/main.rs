// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use keyrec::session::Notification;
use keyrec::recording::export_wav;
use keyrec::store::fetch_recordings;
use keyrec::{
    EventLoop, JsonFileStore, PianoConfig, PianoHandle, RecordStore, Recording, SessionManager,
    TracingToneSource,
};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::sleep;
use tracing::{info, warn, Level};

/// Chords performed by `--demo`: (bindings, hold in ms)
const DEMO_PROGRESSION: [(&[&str], u64); 4] = [
    (&["A", "D", "G"], 400),
    (&["F", "H", "K"], 400),
    (&["G", "J", "S"], 400),
    (&["A", "D", "G"], 600),
];

fn print_usage() {
    println!("keyrec - Virtual piano recorder");
    println!();
    println!("Usage: keyrec [--config <file>] [--verbose] <COMMAND>");
    println!();
    println!("Commands:");
    println!("  --keys          Show the key map");
    println!("  --list          List saved recordings, most recent first");
    println!("  --play <ID>     Play a saved recording");
    println!("  --export <ID> <FILE>");
    println!("                  Render a saved recording to a WAV file");
    println!("  --demo          Record a short chord progression, save it and play it back");
    println!("  --help          Show this help message");
}

/// Parsed command line
struct Args {
    config: Option<PathBuf>,
    verbose: bool,
    command: Vec<String>,
}

fn parse_args() -> Result<Args> {
    let mut args = Args {
        config: None,
        verbose: false,
        command: Vec::new(),
    };

    let mut iter = env::args().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--config" => {
                let path = iter
                    .next()
                    .ok_or_else(|| anyhow!("--config requires a file path"))?;
                args.config = Some(PathBuf::from(path));
            }
            "--verbose" | "-v" => args.verbose = true,
            _ => args.command.push(arg),
        }
    }
    Ok(args)
}

fn init_logging(config: &PianoConfig, verbose: bool) {
    let level = if verbose {
        Level::DEBUG
    } else {
        config.tracing_level()
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .init();
}

fn print_keys(config: &PianoConfig) -> Result<()> {
    let keys = config.key_map()?;
    println!("{} keys:", keys.len());
    for key in keys.keys() {
        println!("  {}", key);
    }
    Ok(())
}

fn print_recording(recording: &Recording) {
    println!(
        "{}  {:<32} {:>6.2}s {:>5} frames  {}",
        recording.id,
        recording.label(),
        recording.duration_seconds,
        recording.frame_count(),
        recording.location
    );
}

fn list_recordings(config: &PianoConfig) {
    let store = JsonFileStore::new(&config.store.path);
    let recordings = fetch_recordings(&store);
    if recordings.is_empty() {
        println!("No recordings in {:?}", store.path());
        return;
    }
    for recording in &recordings {
        print_recording(recording);
    }
}

fn build_event_loop(
    config: &PianoConfig,
) -> Result<(EventLoop<TracingToneSource>, UnboundedReceiver<Notification>)> {
    let keymap = Arc::new(config.key_map()?);
    let manager = SessionManager::new(keymap, TracingToneSource::new())
        .with_cadence(config.capture.cadence_ms);
    let store: Box<dyn RecordStore> = Box::new(JsonFileStore::new(&config.store.path));
    Ok(EventLoop::new(manager, store, config.locator()))
}

/// Play `recording` and wait for the playback to finish
async fn play_and_wait(
    handle: &PianoHandle,
    notifications: &mut UnboundedReceiver<Notification>,
    recording: Recording,
) -> Result<()> {
    let label = recording.label().to_string();
    if !handle.play(recording).await {
        bail!("Playback of {} was rejected", label);
    }

    while let Some(notification) = notifications.recv().await {
        match notification {
            Notification::ActiveNotes(notes) => {
                let held: Vec<&str> = notes.iter().map(String::as_str).collect();
                println!("  [{}]", held.join(" "));
            }
            Notification::PlaybackFinished(report) => {
                info!(
                    frames = report.frames_played,
                    skipped = report.skipped_notes,
                    "playback complete"
                );
                return Ok(());
            }
            Notification::RecordingSaved(_) | Notification::SaveFailed(_) => {}
        }
    }
    bail!("Event loop stopped during playback")
}

async fn play_recording(config: &PianoConfig, id: &str) -> Result<()> {
    let store = JsonFileStore::new(&config.store.path);
    let recording = store
        .find(id)
        .with_context(|| format!("Failed to read recordings from {:?}", store.path()))?
        .ok_or_else(|| anyhow!("No recording with id {}", id))?;

    let (event_loop, mut notifications) = build_event_loop(config)?;
    let (handle, commands) = PianoHandle::channel();

    println!("Playing {}", recording.label());
    let script = async {
        let result = play_and_wait(&handle, &mut notifications, recording).await;
        handle.shutdown();
        result
    };

    let (_, result) = tokio::join!(event_loop.run(commands), script);
    result
}

fn export_recording(config: &PianoConfig, id: &str, path: &str) -> Result<()> {
    let store = JsonFileStore::new(&config.store.path);
    let recording = store
        .find(id)
        .with_context(|| format!("Failed to read recordings from {:?}", store.path()))?
        .ok_or_else(|| anyhow!("No recording with id {}", id))?;

    let summary = export_wav(&recording, &config.key_map()?, &config.export, path)
        .with_context(|| format!("Failed to export {} to {}", recording.label(), path))?;
    println!(
        "Wrote {} ({:.2}s, {} Hz) to {}",
        recording.label(),
        summary.duration_seconds,
        config.export.sample_rate,
        path
    );
    if summary.skipped_notes > 0 {
        warn!(skipped = summary.skipped_notes, "notes without a key were left out");
    }
    Ok(())
}

async fn perform_demo(config: &PianoConfig) -> Result<()> {
    let (event_loop, mut notifications) = build_event_loop(config)?;
    let (handle, commands) = PianoHandle::channel();

    let script = async {
        let result: Result<()> = async {
            if !handle.begin_recording().await {
                bail!("Recording could not start");
            }

            println!("Recording...");
            for (chord, hold_ms) in DEMO_PROGRESSION {
                for binding in chord {
                    handle.press(*binding);
                }
                sleep(Duration::from_millis(hold_ms)).await;
                for binding in chord {
                    handle.release(*binding);
                }
            }
            // Let the capture see the keys come up
            sleep(Duration::from_millis(config.capture.cadence_ms * 2)).await;

            let recording = match handle.end_recording().await {
                Some(recording) => recording,
                None => {
                    // Keep the take in hand even though the store refused it
                    let recording = handle
                        .take_unsaved()
                        .await
                        .ok_or_else(|| anyhow!("Nothing was recorded"))?;
                    warn!(id = %recording.id, "recording was not saved");
                    recording
                }
            };
            print_recording(&recording);

            println!("Playing back...");
            play_and_wait(&handle, &mut notifications, recording).await
        }
        .await;
        handle.shutdown();
        result
    };

    let (_, result) = tokio::join!(event_loop.run(commands), script);
    result
}

fn main() -> Result<()> {
    let args = parse_args()?;

    let config = match &args.config {
        Some(path) => PianoConfig::load(path)?,
        None => PianoConfig::default(),
    };
    init_logging(&config, args.verbose);

    let Some(command) = args.command.first() else {
        println!("keyrec - Virtual piano recorder");
        println!("Run with --help for usage information");
        return Ok(());
    };

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start runtime")?;

    match command.as_str() {
        "--keys" => print_keys(&config)?,
        "--list" => list_recordings(&config),
        "--play" => {
            let Some(id) = args.command.get(1) else {
                eprintln!("Error: --play requires a recording id");
                eprintln!("Use --list to see saved recordings");
                std::process::exit(1);
            };
            runtime.block_on(play_recording(&config, id))?;
        }
        "--export" => {
            let (Some(id), Some(path)) = (args.command.get(1), args.command.get(2)) else {
                eprintln!("Error: --export requires a recording id and an output file");
                eprintln!("Use --list to see saved recordings");
                std::process::exit(1);
            };
            export_recording(&config, id, path)?;
        }
        "--demo" => runtime.block_on(perform_demo(&config))?,
        "--help" | "-h" => print_usage(),
        other => {
            eprintln!("Unknown option: {}", other);
            print_usage();
            std::process::exit(1);
        }
    }

    Ok(())
}
