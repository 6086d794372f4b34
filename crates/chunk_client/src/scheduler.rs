//! The client's priority-driven chunk scheduler: decides what to request, in what order, and
//! when to drop chunks that have drifted out of range.

use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;

use chunk_common::collaborators::{MeshUploadSink, PlayerState};
use crossbeam_queue::SegQueue;
use dashmap::DashSet;
use rand::Rng;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use voxel_proto::{ChunkConfig, ChunkCoord};

use crate::connection::ClientConnection;

/// Auto-tuned concurrency and batching knobs, selected once at startup from `RENDER_DISTANCE`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AutoTune {
    /// Maximum concurrent `LoadChunkAsync`-equivalent tasks.
    pub max_concurrent_loads: usize,
    /// Chunks enqueued per scheduler update cycle, at most.
    pub chunks_per_update_batch: usize,
    /// Scheduler update-cycle rate, in Hz.
    pub updates_per_second: u32,
    /// Soft cap on `RequestQueue` depth before a cycle stops enqueueing.
    pub max_pending_uploads: usize,
}

/// Selects [`AutoTune`] settings for the given render distance.
pub fn auto_tune(render_distance: i32) -> AutoTune {
    if render_distance <= 4 {
        AutoTune {
            max_concurrent_loads: 4,
            chunks_per_update_batch: 32,
            updates_per_second: 10,
            max_pending_uploads: 16,
        }
    } else if render_distance <= 8 {
        AutoTune {
            max_concurrent_loads: 8,
            chunks_per_update_batch: 64,
            updates_per_second: 15,
            max_pending_uploads: 32,
        }
    } else if render_distance <= 16 {
        AutoTune {
            max_concurrent_loads: 16,
            chunks_per_update_batch: 128,
            updates_per_second: 20,
            max_pending_uploads: 64,
        }
    } else {
        AutoTune {
            max_concurrent_loads: 32,
            chunks_per_update_batch: 256,
            updates_per_second: 30,
            max_pending_uploads: 128,
        }
    }
}

/// How far a chunk's vertical center may be from the player's block-Y before it is skipped.
const MAX_VERTICAL_REACH_BLOCKS: f32 = 150.0;
/// Unload pass runs with roughly this probability per update cycle.
const UNLOAD_PASS_PROBABILITY: f64 = 0.1;
/// Unload pass drops at most this many chunks per cycle.
const MAX_UNLOADS_PER_CYCLE: usize = 4;

/// Owns the request queue, the requested/loaded key sets, and the auto-tuned batching knobs; one
/// instance drives both the update-cycle task and the loader task.
pub struct ChunkScheduler<P: PlayerState> {
    config: ChunkConfig,
    tuning: AutoTune,
    player: Arc<P>,
    connection: Arc<ClientConnection>,
    queue: SegQueue<ChunkCoord>,
    requested: DashSet<ChunkCoord>,
    loaded: DashSet<ChunkCoord>,
    queue_len: AtomicI32,
}

impl<P: PlayerState> ChunkScheduler<P> {
    /// Builds a scheduler auto-tuned to `config.render_distance`.
    pub fn new(config: ChunkConfig, player: Arc<P>, connection: Arc<ClientConnection>) -> Self {
        let tuning = auto_tune(config.render_distance);
        Self {
            config,
            tuning,
            player,
            connection,
            queue: SegQueue::new(),
            requested: DashSet::new(),
            loaded: DashSet::new(),
            queue_len: AtomicI32::new(0),
        }
    }

    /// The auto-tuned knobs this scheduler was built with.
    pub fn tuning(&self) -> AutoTune {
        self.tuning
    }

    /// Whether `coord` currently has a loaded mesh.
    pub fn is_loaded(&self, coord: ChunkCoord) -> bool {
        self.loaded.contains(&coord)
    }

    /// Whether `coord` is queued or in flight.
    pub fn is_requested(&self, coord: ChunkCoord) -> bool {
        self.requested.contains(&coord)
    }

    /// Current `RequestQueue` depth.
    pub fn queue_depth(&self) -> usize {
        self.queue_len.load(Ordering::Acquire).max(0) as usize
    }

    /// Runs the scheduler's update-cycle loop at `tuning.updates_per_second` Hz until cancelled.
    pub async fn run_update_loop(&self, cancel: CancellationToken) {
        let period = std::time::Duration::from_secs_f64(1.0 / self.tuning.updates_per_second as f64);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => return,
                _ = tokio::time::sleep(period) => self.run_update_cycle(),
            }
        }
    }

    /// One pass over the candidate shell around the player: enqueues new requests, then
    /// occasionally runs an unload pass.
    fn run_update_cycle(&self) {
        let player_pos = self.player.position();
        let player_chunk = ChunkCoord::containing(
            player_pos.x as i32,
            player_pos.y as i32,
            player_pos.z as i32,
            self.config.chunk_size,
            self.config.chunk_size_y,
        );
        let player_block_y = player_pos.y;
        let rd = self.config.render_distance;

        let mut candidates: Vec<(ChunkCoord, f32)> = Vec::new();
        for dx in -rd..=rd {
            for dz in -rd..=rd {
                if ((dx * dx + dz * dz) as f32).sqrt() > rd as f32 {
                    continue;
                }
                for dy in -2..=2 {
                    let coord = ChunkCoord::new(player_chunk.cx + dx, player_chunk.cy + dy, player_chunk.cz + dz);
                    let chunk_center_y = (coord.cy * self.config.chunk_size_y) as f32 + self.config.chunk_size_y as f32 / 2.0;
                    if (chunk_center_y - player_block_y).abs() > MAX_VERTICAL_REACH_BLOCKS {
                        continue;
                    }
                    if self.loaded.contains(&coord) || self.requested.contains(&coord) {
                        continue;
                    }

                    let mut priority = ((dx * dx + 4 * dy * dy + dz * dz) as f32).sqrt();
                    if dx.abs() <= 1 && dz.abs() <= 1 && dy <= 0 {
                        priority *= 0.01;
                    }
                    candidates.push((coord, priority));
                }
            }
        }

        candidates.sort_by(|a, b| a.1.total_cmp(&b.1));

        if self.queue_depth() <= self.tuning.max_pending_uploads {
            let take = candidates.len().min(self.tuning.chunks_per_update_batch);
            for (coord, _) in candidates.into_iter().take(take) {
                self.requested.insert(coord);
                self.queue.push(coord);
                self.queue_len.fetch_add(1, Ordering::AcqRel);
            }
        }

        if rand::thread_rng().gen_bool(UNLOAD_PASS_PROBABILITY) {
            self.run_unload_pass(player_chunk);
        }
    }

    fn run_unload_pass(&self, player_chunk: ChunkCoord) {
        let mut dropped = 0usize;
        let rd = self.config.render_distance;
        let victims: Vec<ChunkCoord> = self
            .loaded
            .iter()
            .filter(|coord| {
                let dx = coord.cx - player_chunk.cx;
                let dz = coord.cz - player_chunk.cz;
                let dy = coord.cy - player_chunk.cy;
                ((dx * dx + dz * dz) as f32).sqrt() > rd as f32 + 2.0 || dy.abs() > 3
            })
            .map(|r| *r)
            .take(MAX_UNLOADS_PER_CYCLE)
            .collect();

        for coord in victims {
            self.loaded.remove(&coord);
            self.requested.remove(&coord);
            dropped += 1;
        }
        if dropped > 0 {
            debug!(dropped, "unload pass dropped out-of-range chunks");
        }
    }

    fn pop_request(&self) -> Option<ChunkCoord> {
        let coord = self.queue.pop();
        if coord.is_some() {
            self.queue_len.fetch_sub(1, Ordering::AcqRel);
        }
        coord
    }
}

/// Runs the loader task: keeps up to `tuning.max_concurrent_loads` chunk requests in flight,
/// uploading successes and re-opening failures for a later scheduler cycle to retry.
pub async fn run_loader<P: PlayerState, S: MeshUploadSink>(
    scheduler: Arc<ChunkScheduler<P>>,
    upload_sink: Arc<S>,
    cancel: CancellationToken,
) {
    let mut in_flight = tokio::task::JoinSet::new();

    loop {
        while in_flight.len() < scheduler.tuning.max_concurrent_loads {
            let Some(coord) = scheduler.pop_request() else { break };
            let connection = scheduler.connection.clone();
            in_flight.spawn(async move {
                let result = connection.request_chunk(coord).await;
                (coord, result)
            });
        }

        tokio::select! {
            _ = cancel.cancelled() => {
                info!("loader task stopping");
                return;
            }
            joined = in_flight.join_next(), if !in_flight.is_empty() => {
                if let Some(Ok((coord, result))) = joined {
                    match result {
                        Ok(mesh) => {
                            scheduler.requested.remove(&coord);
                            scheduler.loaded.insert(coord);
                            upload_sink.enqueue_mesh_for_chunk(coord, mesh.render);
                        }
                        Err(e) => {
                            scheduler.requested.remove(&coord);
                            if e.is_fault() {
                                warn!(coord = %coord, error = %e, "chunk load failed, will retry");
                            }
                        }
                    }
                }
            }
            _ = tokio::time::sleep(std::time::Duration::from_millis(10)), if in_flight.is_empty() => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auto_tune_matches_render_distance_eight() {
        let t = auto_tune(8);
        assert_eq!(t.max_concurrent_loads, 8);
        assert_eq!(t.chunks_per_update_batch, 64);
        assert_eq!(t.updates_per_second, 15);
        assert_eq!(t.max_pending_uploads, 32);
    }

    #[test]
    fn auto_tune_boundaries() {
        assert_eq!(auto_tune(4).max_concurrent_loads, 4);
        assert_eq!(auto_tune(5).max_concurrent_loads, 8);
        assert_eq!(auto_tune(16).max_concurrent_loads, 16);
        assert_eq!(auto_tune(17).max_concurrent_loads, 32);
    }

    struct FixedPlayer {
        pos: glam::Vec3,
    }
    impl PlayerState for FixedPlayer {
        fn position(&self) -> glam::Vec3 {
            self.pos
        }
        fn forward(&self) -> glam::Vec3 {
            glam::Vec3::NEG_Z
        }
    }

    fn test_scheduler() -> ChunkScheduler<FixedPlayer> {
        let config = ChunkConfig {
            render_distance: 4,
            ..Default::default()
        };
        let player = Arc::new(FixedPlayer {
            pos: glam::Vec3::ZERO,
        });
        let connection = Arc::new(ClientConnection::new("127.0.0.1", 1));
        ChunkScheduler::new(config, player, connection)
    }

    #[test]
    fn update_cycle_enqueues_the_ground_column_with_lowest_priority() {
        let scheduler = test_scheduler();
        scheduler.run_update_cycle();
        assert!(scheduler.queue_depth() > 0);
        assert!(scheduler.is_requested(ChunkCoord::new(0, 0, 0)));
    }

    #[test]
    fn a_loaded_or_requested_chunk_is_not_enqueued_again() {
        let scheduler = test_scheduler();
        scheduler.requested.insert(ChunkCoord::new(0, 0, 0));
        scheduler.run_update_cycle();
        // still only inserted once: pop everything and make sure it appears at most once
        let mut seen = 0;
        while let Some(c) = scheduler.pop_request() {
            if c == ChunkCoord::new(0, 0, 0) {
                seen += 1;
            }
        }
        assert_eq!(seen, 0, "already-requested coord must not be re-enqueued");
    }

    #[test]
    fn unload_pass_drops_chunks_outside_the_shell() {
        let scheduler = test_scheduler();
        let far = ChunkCoord::new(100, 0, 100);
        scheduler.loaded.insert(far);
        scheduler.requested.insert(far);
        scheduler.run_unload_pass(ChunkCoord::new(0, 0, 0));
        assert!(!scheduler.is_loaded(far));
        assert!(!scheduler.is_requested(far));
    }
}
