//! A concurrent mesh cache with at-most-one-generation-per-key semantics and LRU-style
//! eviction under a size bound.
//!
//! The per-key generation lock is held across the (possibly slow, CPU-bound) mesher call, so
//! N concurrent callers for the same key observe exactly one invocation: the first caller to
//! acquire the lock generates and stores the mesh, every other caller blocks on the same lock
//! and then reads the freshly stored entry straight back out of the map.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use dashmap::DashMap;
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, info, instrument};
use voxel_proto::{ChunkCoord, GeneratedChunkMesh};

use crate::collaborators::Mesher;

/// A cached mesh pair plus the timestamp used to drive LRU eviction.
struct CachedMesh {
    data: Arc<GeneratedChunkMesh>,
    last_accessed: Instant,
}

/// Keyed store of generated meshes with single-flight generation and size-bounded eviction.
pub struct MeshCache<M: Mesher> {
    mesher: Arc<M>,
    entries: DashMap<ChunkCoord, CachedMesh>,
    gen_locks: DashMap<ChunkCoord, Arc<AsyncMutex<()>>>,
    size: AtomicUsize,
    max_cached_meshes: usize,
}

impl<M: Mesher> MeshCache<M> {
    /// Creates an empty cache that starts evicting once more than `max_cached_meshes` entries
    /// are live.
    pub fn new(mesher: M, max_cached_meshes: usize) -> Self {
        Self {
            mesher: Arc::new(mesher),
            entries: DashMap::new(),
            gen_locks: DashMap::new(),
            size: AtomicUsize::new(0),
            max_cached_meshes,
        }
    }

    /// Number of live entries. Kept in lock-step with the map by every insert/remove.
    pub fn size(&self) -> usize {
        self.size.load(Ordering::Acquire)
    }

    /// Returns the cached mesh for `coord`, generating it via the mesher on a miss. Concurrent
    /// callers racing on the same `coord` during a miss share a single mesher invocation.
    #[instrument(skip(self), fields(coord = %coord))]
    pub async fn get_or_generate(&self, coord: ChunkCoord) -> anyhow::Result<Arc<GeneratedChunkMesh>> {
        if let Some(data) = self.touch(coord) {
            return Ok(data);
        }

        let lock = self
            .gen_locks
            .entry(coord)
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone();
        let _guard = lock.lock().await;

        // Re-check: another caller may have generated and stored the mesh while we waited.
        if let Some(data) = self.touch(coord) {
            return Ok(data);
        }

        debug!("mesh cache miss, invoking mesher");
        let mesher = self.mesher.clone();
        let generated = tokio::task::spawn_blocking(move || mesher.generate(coord))
            .await
            .map_err(anyhow::Error::from)??;

        let data = Arc::new(generated);
        self.entries.insert(
            coord,
            CachedMesh {
                data: data.clone(),
                last_accessed: Instant::now(),
            },
        );
        self.size.fetch_add(1, Ordering::AcqRel);
        Ok(data)
        // `_guard` drops here, releasing the generation lock for any waiters that arrived since.
    }

    /// Bumps `lastAccessed` and returns the stored data on a hit; `None` on a miss.
    fn touch(&self, coord: ChunkCoord) -> Option<Arc<GeneratedChunkMesh>> {
        let mut entry = self.entries.get_mut(&coord)?;
        entry.last_accessed = Instant::now();
        Some(entry.data.clone())
    }

    /// Runs one cleanup pass: evicts the oldest entries down toward `max_cached_meshes` when
    /// over budget, then reaps any generation locks left over from a completed or failed
    /// generation that nothing is currently waiting on. Returns the number of entries evicted.
    #[instrument(skip(self))]
    pub fn cleanup(&self) -> usize {
        let size = self.size();
        let mut evicted = 0;
        if size > self.max_cached_meshes {
            let to_remove = (size / 4).min(size - self.max_cached_meshes + 200).min(size);

            let mut snapshot: Vec<(ChunkCoord, Instant)> = self
                .entries
                .iter()
                .map(|entry| (*entry.key(), entry.value().last_accessed))
                .collect();
            snapshot.sort_by_key(|&(_, last_accessed)| last_accessed);

            for (coord, _) in snapshot.into_iter().take(to_remove) {
                if self.entries.remove(&coord).is_some() {
                    self.size.fetch_sub(1, Ordering::AcqRel);
                    evicted += 1;
                }
                self.gen_locks.remove(&coord);
            }
            info!(evicted, remaining = self.size(), "mesh cache cleanup pass");
        }

        self.reap_orphaned_locks();
        evicted
    }

    /// Removes generation-lock map entries for keys with no cached data and no current waiter.
    /// This is the only place per-key locks are ever removed, matching the source's leak-prone
    /// pattern of creating a lock per key but never tearing it down on its own.
    fn reap_orphaned_locks(&self) {
        self.gen_locks
            .retain(|coord, lock| self.entries.contains_key(coord) || Arc::strong_count(lock) > 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;
    use std::time::Duration;

    struct CountingMesher {
        calls: AtomicU32,
        delay: Duration,
    }

    impl Mesher for CountingMesher {
        fn generate(&self, _coord: ChunkCoord) -> anyhow::Result<GeneratedChunkMesh> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            std::thread::sleep(self.delay);
            Ok(GeneratedChunkMesh::default())
        }
    }

    #[tokio::test]
    async fn concurrent_requests_for_the_same_key_invoke_mesher_once() {
        let cache = Arc::new(MeshCache::new(
            CountingMesher {
                calls: AtomicU32::new(0),
                delay: Duration::from_millis(20),
            },
            1000,
        ));
        let coord = ChunkCoord::new(5, 0, 5);

        let mut handles = Vec::new();
        for _ in 0..8 {
            let cache = cache.clone();
            handles.push(tokio::spawn(async move { cache.get_or_generate(coord).await.unwrap() }));
        }
        let results: Vec<_> = futures_join_all(handles).await;
        for r in &results {
            assert!(Arc::ptr_eq(r, &results[0]));
        }
        assert_eq!(cache.mesher.calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.size(), 1);
    }

    async fn futures_join_all<T>(handles: Vec<tokio::task::JoinHandle<T>>) -> Vec<T> {
        let mut out = Vec::with_capacity(handles.len());
        for h in handles {
            out.push(h.await.unwrap());
        }
        out
    }

    #[tokio::test]
    async fn cleanup_evicts_down_toward_the_cap_keeping_newest() {
        // Large enough that `to_remove = min(size/4, size-max+200)` is bounded by the `+200`
        // term, so a single cleanup pass reaches the cap.
        let max = 4_000usize;
        let cache = MeshCache::new(
            CountingMesher {
                calls: AtomicU32::new(0),
                delay: Duration::from_micros(1),
            },
            max,
        );
        for i in 0..(max as i32 + 1000) {
            cache.get_or_generate(ChunkCoord::new(i, 0, 0)).await.unwrap();
        }
        assert_eq!(cache.size(), max + 1000);

        cache.cleanup();
        assert!(cache.size() <= max);

        // the 1000 most-recently-inserted keys must have survived the pass
        for i in (max as i32 + 1)..(max as i32 + 1000) {
            assert!(cache.entries.contains_key(&ChunkCoord::new(i, 0, 0)));
        }
    }

    #[tokio::test]
    async fn a_failed_generation_is_not_cached_and_can_be_retried() {
        struct FlakyMesher {
            calls: AtomicU32,
        }
        impl Mesher for FlakyMesher {
            fn generate(&self, _coord: ChunkCoord) -> anyhow::Result<GeneratedChunkMesh> {
                let n = self.calls.fetch_add(1, Ordering::SeqCst);
                if n == 0 {
                    anyhow::bail!("mesher exploded");
                }
                Ok(GeneratedChunkMesh::default())
            }
        }

        let cache = MeshCache::new(FlakyMesher { calls: AtomicU32::new(0) }, 10);
        let coord = ChunkCoord::new(1, 1, 1);

        assert!(cache.get_or_generate(coord).await.is_err());
        assert_eq!(cache.size(), 0);

        assert!(cache.get_or_generate(coord).await.is_ok());
        assert_eq!(cache.size(), 1);
    }
}
