#![allow(dead_code, unused_imports)]

use std::time::Duration;

use spawnpipe::exec::{StageBoard, StageStatus};

pub use spawnpipe_test_utils::builders;
pub use spawnpipe_test_utils::capture::{CaptureSink, CapturedSinks};
pub use spawnpipe_test_utils::recording_spawner::RecordingSpawner;
pub use spawnpipe_test_utils::{init_tracing, with_timeout};

/// Poll `board` until stage `index` has finished, or give up after `limit`.
pub async fn wait_for_stage_finish(
    board: &StageBoard,
    index: usize,
    limit: Duration,
) -> Option<StageStatus> {
    let deadline = tokio::time::Instant::now() + limit;
    loop {
        match board.get(index) {
            Some(status) if status.is_finished() => return Some(status),
            _ if tokio::time::Instant::now() >= deadline => return None,
            _ => tokio::time::sleep(Duration::from_millis(20)).await,
        }
    }
}
