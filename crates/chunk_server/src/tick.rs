//! The server's fixed-rate tick loop, decoupled from all network I/O.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use chunk_common::collaborators::Mesher;
use chunk_common::{MeshCache, TICK};
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Emit a stats line every `STATS_INTERVAL_TICKS` ticks.
const STATS_INTERVAL_TICKS: u64 = 5 * chunk_common::TICKS_PER_SECOND as u64;

/// Runs the tick loop until `cancel` fires. Uses an accumulator so ticks stay locked to
/// wall-clock time regardless of how long any individual iteration of the surrounding task
/// takes to get scheduled.
pub async fn run<M: Mesher>(cache: Arc<MeshCache<M>>, cancel: CancellationToken) {
    let tick_count = Arc::new(AtomicU64::new(0));
    let mut accumulator = std::time::Duration::ZERO;
    let mut last = Instant::now();

    loop {
        let now = Instant::now();
        accumulator += now.duration_since(last);
        last = now;

        while accumulator >= TICK {
            accumulator -= TICK;
            // Tick work is currently a no-op; this is the seat for future authoritative state.
            let count = tick_count.fetch_add(1, Ordering::Relaxed) + 1;
            if count % STATS_INTERVAL_TICKS == 0 {
                info!(tick_count = count, cache_size = cache.size(), "server stats");
            }
        }

        let remainder = TICK.saturating_sub(accumulator);
        tokio::select! {
            _ = cancel.cancelled() => {
                info!("tick loop stopping");
                return;
            }
            _ = tokio::time::sleep(remainder) => {}
        }
    }
}
