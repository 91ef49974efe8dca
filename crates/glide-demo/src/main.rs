//! Demo binary: one simulated writer and several replaying readers in a zone.
//!
//! Configuration is loaded from `config.ron` and can be overridden via CLI flags.
//! Run with `cargo run -p glide-demo` for the default scenario.
//! Run with `cargo run -p glide-demo -- --readers 4 --duration 30` to override it.

mod pointer;

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use glide_config::{CliArgs, Config};
use glide_history::Position;
use glide_playback::{ReplayDriver, ReplayHandle};
use glide_record::Recorder;
use glide_store::{CursorEntry, MemoryStore, PositionId, TimeSource, TokioClock};
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::info;

use crate::pointer::PointerPath;

/// One reader's replay of a peer cursor.
struct PeerReplay {
    reader: usize,
    peer: CursorEntry,
    handle: ReplayHandle<Position>,
}

async fn run(config: Config) {
    let clock: Arc<dyn TimeSource> = Arc::new(TokioClock::new());
    let store = Arc::new(MemoryStore::<Position>::new(
        Arc::clone(&clock),
        config.store.clone(),
    ));
    let zone = config.demo.zone.as_str();

    let writer = store.join_zone(zone).await;
    let mut readers = Vec::new();
    for _ in 0..config.demo.readers {
        readers.push(store.join_zone(zone).await);
    }

    let recorder = Recorder::spawn(
        Arc::clone(&store),
        Arc::clone(&clock),
        Some(writer.position_id),
        &config.knobs,
    );

    // Every reader replays every other cursor in the zone.
    let cursors = store.list_cursors(zone).await;
    let mut replays = Vec::new();
    for (reader, mine) in readers.iter().enumerate() {
        for peer in cursors.iter().filter(|c| c.cursor_id != mine.cursor_id) {
            let handle = ReplayDriver::spawn(
                Arc::clone(&store),
                peer.position_id,
                Arc::clone(&clock),
                config.knobs.clone(),
                config.replay.frame_interval(),
            );
            replays.push(PeerReplay {
                reader,
                peer: peer.clone(),
                handle,
            });
        }
    }
    info!(
        "Zone '{zone}': writer {:?}, {} readers, {} replays",
        writer.cursor_id,
        readers.len(),
        replays.len()
    );

    let started = Instant::now();
    let deadline = started + Duration::from_secs(config.demo.duration_secs);
    let mut path = PointerPath::new(42);
    let pointer_period = Duration::from_millis(config.demo.pointer_interval_ms.max(1));
    let mut pointer = time::interval(pointer_period);
    pointer.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut report = time::interval(Duration::from_secs(1));

    while Instant::now() < deadline {
        tokio::select! {
            _ = pointer.tick() => {
                let elapsed_ms = started.elapsed().as_millis() as u64;
                recorder.record(path.sample(elapsed_ms)).await;
            }
            _ = report.tick() => {
                report_frames(&replays, writer.position_id, recorder.current_position());
            }
        }
    }

    recorder.stop().await;
    for replay in replays {
        replay.handle.stop().await;
    }

    let stats = store.stats();
    info!(
        "Done: {} batches, {} with history, {:.2}KiB of history",
        stats.batches,
        stats.flushes,
        stats.history_bytes as f64 / 1024.0
    );
}

fn report_frames(replays: &[PeerReplay], writer: PositionId, local: Option<Position>) {
    if let Some(local) = local {
        info!("writer local ({:.1}, {:.1})", local.x, local.y);
    }
    for replay in replays.iter().filter(|r| r.peer.position_id == writer) {
        let frame = replay.handle.latest();
        if replay.handle.is_finished() {
            tracing::warn!(
                "reader {} replay of {:?} stopped",
                replay.reader,
                replay.peer.cursor_id
            );
            continue;
        }
        match frame.value {
            Some(value) => info!(
                "reader {} sees ({:.1}, {:.1}) buffer {:.0}ms skew {:.0}ms",
                replay.reader, value.x, value.y, frame.buffer_health, frame.clock_skew
            ),
            None => info!("reader {} waiting for first flush", replay.reader),
        }
    }
}

fn main() {
    let args = CliArgs::parse();

    // Resolve config directory
    let Some(config_dir) = args.config.clone().or_else(glide_config::default_config_dir) else {
        eprintln!("Failed to resolve config directory");
        return;
    };

    // Load or create config, then apply CLI overrides
    let mut config = Config::load_or_create(&config_dir).unwrap_or_else(|e| {
        eprintln!("Failed to load config: {e}, using defaults");
        Config::default()
    });
    config.apply_cli_overrides(&args);
    if let Err(e) = config.knobs.validate() {
        eprintln!("Invalid knobs after CLI overrides: {e}, using defaults");
        config.knobs = Default::default();
    }

    let log_dir = config_dir.join("logs");
    glide_log::init_logging(Some(&log_dir), cfg!(debug_assertions), Some(&config));

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            tracing::error!("Failed to start runtime: {e}");
            return;
        }
    };
    runtime.block_on(run(config));
}
