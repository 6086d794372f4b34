//! Runtime pieces shared between the chunk server and the chunk client: the mesh cache, the
//! connection-level error taxonomy, cancellation/channel aliases, and the trait seams that keep
//! this crate from ever needing to know about a real renderer or world generator.

#![warn(missing_docs)]

use std::time::Duration;

pub mod collaborators;
pub mod error;
pub mod mesh_cache;
pub mod prelude;

pub use collaborators::{ChunkMeshSource, DeterministicMesher, Mesher, MeshUploadSink, PlayerState, WorldGen};
pub use error::ConnectionError;
pub use mesh_cache::MeshCache;

/// Fixed simulation tick rate of the server's tick loop.
pub const TICKS_PER_SECOND: i32 = 60;
/// Wall-clock seconds per tick, as an `f64`.
pub const SECONDS_PER_TICK_F64: f64 = 1.0f64 / TICKS_PER_SECOND as f64;
/// Wall-clock microseconds per tick.
pub const MICROSECONDS_PER_TICK: i64 = 1_000_000i64 / TICKS_PER_SECOND as i64;
/// [`MICROSECONDS_PER_TICK`] as a [`Duration`], used directly by the tick accumulator.
pub const TICK: Duration = Duration::from_micros(MICROSECONDS_PER_TICK as u64);

// Ensure `MICROSECONDS_PER_TICK` is perfectly accurate.
static_assertions::const_assert_eq!(1_000_000i64 / MICROSECONDS_PER_TICK, TICKS_PER_SECOND as i64);

/// How often the mesh cache's cleanup pass runs.
pub const MESH_CACHE_CLEANUP_INTERVAL: Duration = Duration::from_secs(60);
