//! Writer and reader running against one in-memory store.

use std::sync::Arc;
use std::time::Duration;

use glide_config::{Knobs, StoreConfig};
use glide_history::Position;
use glide_playback::ReplayDriver;
use glide_record::Recorder;
use glide_store::{MemoryStore, TimeSource, TokioClock};
use tokio::time;

#[tokio::test(start_paused = true)]
async fn test_reader_replays_writer_motion_in_order() {
    let clock: Arc<dyn TimeSource> = Arc::new(TokioClock::starting_at(1_000_000));
    let store = Arc::new(MemoryStore::<Position>::new(
        Arc::clone(&clock),
        StoreConfig {
            enforce_version_order: true,
        },
    ));
    let knobs = Knobs::default();

    let writer_cursor = store.join_zone("lobby").await;
    let reader_cursor = store
        .list_cursors("lobby")
        .await
        .into_iter()
        .next()
        .unwrap();
    assert_eq!(reader_cursor, writer_cursor);

    let recorder = Recorder::spawn(
        Arc::clone(&store),
        Arc::clone(&clock),
        Some(writer_cursor.position_id),
        &knobs,
    );
    let replay = ReplayDriver::spawn(
        Arc::clone(&store),
        writer_cursor.position_id,
        Arc::clone(&clock),
        knobs.clone(),
        Duration::from_millis(16),
    );

    // Writer sweeps x from 0 to 100 over two seconds, then stays still.
    for step in 0..=100 {
        recorder.record(Position::new(step as f64, 50.0)).await;
        time::sleep(Duration::from_millis(20)).await;
    }

    let mut frames = replay.frames();
    let mut last_x = f64::MIN;
    let mut last_time = f64::MIN;
    let mut rendered = 0;
    let deadline = time::Instant::now() + Duration::from_secs(4);
    while time::Instant::now() < deadline {
        if frames.changed().await.is_err() {
            break;
        }
        let frame = frames.borrow_and_update().clone();
        let (Some(value), Some(replay_time)) = (frame.value, frame.replay_time) else {
            continue;
        };
        assert!(value.x >= last_x, "x went backwards: {last_x} -> {}", value.x);
        assert!(replay_time >= last_time, "replay time went backwards");
        assert!(frame.buffer_health <= knobs.max_server_buffer_age_hard);
        assert_eq!(value.y, 50.0);
        last_x = value.x;
        last_time = replay_time;
        rendered += 1;
    }

    assert!(rendered > 100, "only {rendered} frames rendered");
    assert_eq!(last_x, 100.0);
    assert!(!replay.is_finished());

    let stats = store.stats();
    assert!(stats.flushes >= 2);
    assert!(stats.history_bytes > 0);

    recorder.stop().await;
    replay.stop().await;
}
