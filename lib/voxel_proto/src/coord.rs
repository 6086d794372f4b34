//! The identity key for all chunk-scoped state: a triple of signed chunk-grid coordinates.

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

/// Coordinates of a chunk on the chunk grid, measured in chunk widths (not blocks).
///
/// Two coordinates are equal iff all three components match; ordering is a plain
/// lexicographic `(cx, cy, cz)` comparison, used only to get a deterministic iteration
/// order when snapshotting the mesh cache for eviction.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Default, Serialize, Deserialize)]
pub struct ChunkCoord {
    /// Chunk-grid X coordinate.
    pub cx: i32,
    /// Chunk-grid Y coordinate.
    pub cy: i32,
    /// Chunk-grid Z coordinate.
    pub cz: i32,
}

impl ChunkCoord {
    /// Constructs a new chunk coordinate.
    pub const fn new(cx: i32, cy: i32, cz: i32) -> Self {
        Self { cx, cy, cz }
    }

    /// Floor-divides a block-space position by the given chunk extents to find the
    /// containing chunk coordinate.
    pub fn containing(block_x: i32, block_y: i32, block_z: i32, chunk_size: i32, chunk_size_y: i32) -> Self {
        Self::new(
            block_x.div_euclid(chunk_size),
            block_y.div_euclid(chunk_size_y),
            block_z.div_euclid(chunk_size),
        )
    }

    /// Squared horizontal (X/Z) distance in chunks between two coordinates.
    pub fn horizontal_distance_sq(self, other: Self) -> i64 {
        let dx = i64::from(self.cx - other.cx);
        let dz = i64::from(self.cz - other.cz);
        dx * dx + dz * dz
    }
}

impl Display for ChunkCoord {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {}, {})", self.cx, self.cy, self.cz)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn containing_floors_toward_negative_infinity() {
        assert_eq!(ChunkCoord::containing(-1, 0, 0, 32, 96), ChunkCoord::new(-1, 0, 0));
        assert_eq!(ChunkCoord::containing(-32, 0, 0, 32, 96), ChunkCoord::new(-1, 0, 0));
        assert_eq!(ChunkCoord::containing(-33, 0, 0, 32, 96), ChunkCoord::new(-2, 0, 0));
        assert_eq!(ChunkCoord::containing(31, 95, 31, 32, 96), ChunkCoord::new(0, 0, 0));
    }

    #[test]
    fn equality_requires_all_three_components() {
        assert_ne!(ChunkCoord::new(1, 0, 0), ChunkCoord::new(0, 1, 0));
        assert_eq!(ChunkCoord::new(1, -2, 3), ChunkCoord::new(1, -2, 3));
    }
}
