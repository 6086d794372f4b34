//! Traits for the systems this crate treats as external collaborators: the density-based
//! generator, the marching-cubes mesher, the GPU renderer's upload/read-back queue, and the
//! player's position. None of their real implementations live here — only the narrow seam the
//! chunk-serving core actually calls through, plus deterministic stand-ins for tests and for
//! running the two binaries without a real renderer or world generator attached.

use glam::Vec3;
use voxel_proto::{ChunkCoord, GeneratedChunkMesh};

/// Produces a render mesh and a collision mesh for a chunk, given its density field.
/// Must be deterministic for a given chunk and iso-level so cache hits are safe to reuse.
pub trait Mesher: Send + Sync + 'static {
    /// Generates both mesh outputs for the given chunk. Called with the per-key generation
    /// lock held, so implementations may assume they are the only caller running for `coord`
    /// at any given time, but must not assume exclusivity across different coordinates.
    fn generate(&self, coord: ChunkCoord) -> anyhow::Result<GeneratedChunkMesh>;
}

/// The density field consulted by the mesher and mutated by block edits.
pub trait WorldGen: Send + Sync + 'static {
    /// Samples the signed density at a block-space point.
    fn sample_density(&self, x: f32, y: f32, z: f32) -> f32;
    /// Applies a smooth density removal centered at `(x, y, z)` with the given radius and
    /// strength, as triggered by a `BlockBreak` datagram.
    fn remove_block(&self, x: f32, y: f32, z: f32, radius: f32, strength: f32);
}

/// The client-side, one-way upload interface the renderer implements and the loader calls into.
/// Exists specifically so the client crate never needs a handle back to the game/renderer beyond
/// this trait object, breaking the cyclic game→client→renderer→game ownership the source exhibits.
pub trait MeshUploadSink: Send + Sync + 'static {
    /// Hands a freshly loaded render mesh to the renderer for GPU upload.
    fn enqueue_mesh_for_chunk(&self, coord: ChunkCoord, mesh: voxel_proto::RenderMesh);
}

/// Read-back of previously uploaded triangle data, used by the raycaster to avoid re-deriving
/// mesh geometry it has already received over the network.
pub trait ChunkMeshSource: Send + Sync + 'static {
    /// Returns the flat `(x,y,z,nx,ny,nz,blockType)` vertex buffer for a chunk, if loaded.
    fn get_mesh_data(&self, coord: ChunkCoord) -> Option<Vec<f32>>;
}

/// The position/orientation of the local player, as needed by mining and the scheduler.
pub trait PlayerState: Send + Sync + 'static {
    /// World-space eye position.
    fn position(&self) -> Vec3;
    /// Normalized view direction.
    fn forward(&self) -> Vec3;
}

/// A deterministic mesher used in tests and standalone runs: produces a single upward-facing
/// quad (two triangles) of Grass for every chunk so `getOrGenerate` has reproducible, non-empty
/// output without depending on a real density field or marching-cubes implementation.
#[derive(Default)]
pub struct DeterministicMesher;

impl Mesher for DeterministicMesher {
    fn generate(&self, coord: ChunkCoord) -> anyhow::Result<GeneratedChunkMesh> {
        use voxel_proto::{BlockType, CollisionMesh, RenderMesh, Vertex};

        let base = Vec3::new(coord.cx as f32, coord.cy as f32, coord.cz as f32);
        let normal = Vec3::Y;
        let corners = [
            base,
            base + Vec3::new(1.0, 0.0, 0.0),
            base + Vec3::new(1.0, 0.0, 1.0),
            base + Vec3::new(0.0, 0.0, 1.0),
        ];
        let tri = |a: usize, b: usize, c: usize| {
            [
                Vertex::new(corners[a], normal, BlockType::Grass),
                Vertex::new(corners[b], normal, BlockType::Grass),
                Vertex::new(corners[c], normal, BlockType::Grass),
            ]
        };
        let mut vertices = Vec::with_capacity(6);
        vertices.extend(tri(0, 1, 2));
        vertices.extend(tri(0, 2, 3));

        let collision = CollisionMesh {
            vertices: corners.to_vec(),
            indices: vec![0, 1, 2, 0, 2, 3],
        };
        Ok(GeneratedChunkMesh {
            render: RenderMesh { vertices },
            collision,
        })
    }
}
