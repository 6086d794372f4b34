//! In-memory representations of the two mesh kinds exchanged on the reliable channel.

use bytemuck::{Pod, Zeroable};
use glam::Vec3;

use crate::block::BlockType;

/// A single render-mesh vertex: position, normal, and a block-type tag.
///
/// Laid out as seven consecutive `f32`s to match the wire format exactly, so a `RenderMesh`'s
/// vertex buffer can be transmuted to/from a flat `&[f32]` via `bytemuck` without per-field copies.
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct Vertex {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub nx: f32,
    pub ny: f32,
    pub nz: f32,
    /// Semantically a [`BlockType`] index, stored as a float on the wire.
    pub block_type: f32,
}

static_assertions::const_assert_eq!(std::mem::size_of::<Vertex>(), Vertex::FLOATS * std::mem::size_of::<f32>());

impl Vertex {
    /// Number of `f32`s a single vertex occupies on the wire.
    pub const FLOATS: usize = 7;

    pub fn new(pos: Vec3, normal: Vec3, block_type: BlockType) -> Self {
        Self {
            x: pos.x,
            y: pos.y,
            z: pos.z,
            nx: normal.x,
            ny: normal.y,
            nz: normal.z,
            block_type: f32::from(block_type.index()),
        }
    }

    pub fn position(&self) -> Vec3 {
        Vec3::new(self.x, self.y, self.z)
    }

    pub fn normal(&self) -> Vec3 {
        Vec3::new(self.nx, self.ny, self.nz)
    }

    pub fn block_type(&self) -> BlockType {
        // Vertex block-type tags are always written from a valid BlockType; clamp defensively
        // against NaN/out-of-range floats arriving from an untrusted peer.
        let idx = self.block_type.round().clamp(0.0, 255.0) as u8;
        BlockType::from_index(idx)
    }
}

/// An ordered triangle list intended for GPU upload. Three consecutive vertices form one
/// triangle; a mesh with zero vertices is valid and represents an empty chunk.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RenderMesh {
    pub vertices: Vec<Vertex>,
}

impl RenderMesh {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn triangle_count(&self) -> usize {
        self.vertices.len() / 3
    }

    /// Flattens the vertex buffer into the raw little-endian-native `f32` layout used on the wire.
    pub fn as_flat_floats(&self) -> &[f32] {
        bytemuck::cast_slice(&self.vertices)
    }
}

/// An indexed vertex list for physics consumption: an unordered vertex list plus a flat
/// triangle-list index buffer (index triples).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CollisionMesh {
    pub vertices: Vec<Vec3>,
    pub indices: Vec<i32>,
}

impl CollisionMesh {
    pub fn empty() -> Self {
        Self::default()
    }
}

/// The two mesh outputs produced together by a single mesher invocation for one chunk.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GeneratedChunkMesh {
    pub render: RenderMesh,
    pub collision: CollisionMesh,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vertex_round_trips_block_type() {
        let v = Vertex::new(Vec3::ZERO, Vec3::Y, BlockType::Stone);
        assert_eq!(v.block_type(), BlockType::Stone);
    }

    #[test]
    fn flat_floats_layout_matches_seven_per_vertex() {
        let mesh = RenderMesh {
            vertices: vec![Vertex::new(Vec3::ZERO, Vec3::Y, BlockType::Grass); 3],
        };
        assert_eq!(mesh.as_flat_floats().len(), 3 * Vertex::FLOATS);
    }

    #[test]
    fn empty_mesh_has_zero_triangles() {
        assert_eq!(RenderMesh::empty().triangle_count(), 0);
    }
}
