//! Process-wide configuration constants, immutable once loaded at startup.

use serde::{Deserialize, Serialize};
use smart_default::SmartDefault;

/// Default TCP port for the reliable chunk channel. The datagram channel binds `port + 1`.
pub const DEFAULT_SERVER_PORT: i32 = 42069;

/// Process-wide constants read once at startup and threaded through constructors as an
/// immutable value; nothing in this crate reads these out of global mutable state.
///
/// Only [`Self::server_port`], [`Self::chunk_size`], and [`Self::chunk_size_y`] need to match
/// between a client and the server it connects to; the rest may diverge per endpoint.
#[derive(Clone, Copy, Eq, PartialEq, Debug, Serialize, Deserialize, SmartDefault)]
#[serde(default)]
pub struct ChunkConfig {
    /// TCP port of the reliable chunk channel. The UDP datagram channel binds `server_port + 1`.
    #[default(DEFAULT_SERVER_PORT)]
    pub server_port: i32,
    /// Horizontal chunk extent, in blocks.
    #[default(32)]
    pub chunk_size: i32,
    /// Vertical chunk extent, in blocks.
    #[default(96)]
    pub chunk_size_y: i32,
    /// Horizontal view-shell radius, in chunks.
    #[default(8)]
    pub render_distance: i32,
    /// Radius, in chunks, over which simulation (as opposed to just rendering) stays active.
    #[default(6)]
    pub simulation_distance: i32,
    /// Generic step constant used by the external generator; opaque to this crate.
    #[default(1)]
    pub step: i32,
    /// Deterministic world seed, passed through to the external density generator.
    #[default(0)]
    pub world_seed: i32,
}

impl ChunkConfig {
    /// The UDP port the datagram channel binds, derived from [`Self::server_port`].
    pub fn datagram_port(&self) -> i32 {
        self.server_port + 1
    }

    /// Checks that this config agrees with `other` on every field that must match between
    /// a client and the server it talks to (`SERVER_PORT`, `CHUNK_SIZE`, `CHUNK_SIZE_Y`).
    pub fn compatible_with(&self, other: &ChunkConfig) -> bool {
        self.server_port == other.server_port
            && self.chunk_size == other.chunk_size
            && self.chunk_size_y == other.chunk_size_y
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn datagram_port_is_server_port_plus_one() {
        let cfg = ChunkConfig::default();
        assert_eq!(cfg.datagram_port(), cfg.server_port + 1);
    }

    #[test]
    fn compatibility_ignores_render_distance() {
        let a = ChunkConfig::default();
        let mut b = a;
        b.render_distance = 16;
        assert!(a.compatible_with(&b));
        b.chunk_size = 64;
        assert!(!a.compatible_with(&b));
    }
}
