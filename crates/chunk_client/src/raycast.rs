//! Voxel-grid raycasting (Amanatides-Woo DDA) plus Möller–Trumbore triangle intersection,
//! against the mesh data the renderer has already received over the network.

use chunk_common::collaborators::ChunkMeshSource;
use glam::Vec3;
use voxel_proto::ChunkCoord;

/// Hits closer than `eps` to the ray origin are rejected as self-intersection noise.
const EPS: f32 = 5e-4;
/// Two hits within this `t` distance of each other are treated as the same surface.
const DEDUP_EPSILON: f32 = 0.001;
/// Rejects near-parallel ray/triangle pairs in the Möller–Trumbore test.
const PARALLEL_EPS: f32 = 1e-7;

/// One accepted ray-triangle intersection.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RayHit {
    /// Distance from the ray origin, along the ray direction.
    pub t: f32,
    /// World-space intersection point.
    pub point: Vec3,
    /// The hit triangle's face normal.
    pub normal: Vec3,
}

/// Casts a ray from `start` toward `end`, stepping voxel-by-voxel and testing every triangle of
/// each visited chunk's mesh. Returns every accepted hit, sorted by `t`, with near-duplicate
/// hits (the same surface reached from adjacent voxels) collapsed to one.
pub fn raycast_all<S: ChunkMeshSource>(
    mesh_source: &S,
    start: Vec3,
    dir: Vec3,
    max_distance: f32,
    chunk_size: i32,
    chunk_size_y: i32,
) -> Vec<RayHit> {
    let dir = dir.normalize_or_zero();
    if dir == Vec3::ZERO {
        return Vec::new();
    }

    let mut hits = Vec::new();
    let mut visited_chunks = std::collections::HashSet::new();

    let step_bound = (max_distance / 0.5).ceil() as u32 + 8;

    let mut voxel = start.floor();
    let step = Vec3::new(dir.x.signum(), dir.y.signum(), dir.z.signum());

    let mut t_max = Vec3::new(
        next_boundary_t(start.x, dir.x, voxel.x),
        next_boundary_t(start.y, dir.y, voxel.y),
        next_boundary_t(start.z, dir.z, voxel.z),
    );
    let t_delta = Vec3::new(
        safe_div(1.0, dir.x.abs()),
        safe_div(1.0, dir.y.abs()),
        safe_div(1.0, dir.z.abs()),
    );

    for _ in 0..step_bound {
        let chunk = ChunkCoord::containing(voxel.x as i32, voxel.y as i32, voxel.z as i32, chunk_size, chunk_size_y);
        if visited_chunks.insert(chunk) {
            if let Some(flat) = mesh_source.get_mesh_data(chunk) {
                collect_triangle_hits(&flat, start, dir, max_distance, &mut hits);
            }
        }

        let axis = if t_max.x < t_max.y {
            if t_max.x < t_max.z {
                0
            } else {
                2
            }
        } else if t_max.y < t_max.z {
            1
        } else {
            2
        };

        let next_t = match axis {
            0 => t_max.x,
            1 => t_max.y,
            _ => t_max.z,
        };
        if next_t > max_distance {
            break;
        }

        match axis {
            0 => {
                voxel.x += step.x;
                t_max.x += t_delta.x;
            }
            1 => {
                voxel.y += step.y;
                t_max.y += t_delta.y;
            }
            _ => {
                voxel.z += step.z;
                t_max.z += t_delta.z;
            }
        }
    }

    hits.sort_by(|a, b| a.t.total_cmp(&b.t));
    hits.dedup_by(|a, b| (a.t - b.t).abs() < DEDUP_EPSILON);
    hits
}

/// Casts a ray and returns only the closest hit, if any.
pub fn raycast_first<S: ChunkMeshSource>(
    mesh_source: &S,
    start: Vec3,
    dir: Vec3,
    max_distance: f32,
    chunk_size: i32,
    chunk_size_y: i32,
) -> Option<RayHit> {
    raycast_all(mesh_source, start, dir, max_distance, chunk_size, chunk_size_y)
        .into_iter()
        .next()
}

fn next_boundary_t(origin: f32, dir: f32, voxel: f32) -> f32 {
    if dir > 0.0 {
        safe_div(voxel + 1.0 - origin, dir)
    } else if dir < 0.0 {
        safe_div(voxel - origin, dir)
    } else {
        f32::INFINITY
    }
}

fn safe_div(a: f32, b: f32) -> f32 {
    if b == 0.0 {
        f32::INFINITY
    } else {
        a / b
    }
}

fn collect_triangle_hits(flat: &[f32], origin: Vec3, dir: Vec3, max_distance: f32, hits: &mut Vec<RayHit>) {
    const STRIDE: usize = 7;
    let mut i = 0;
    while i + STRIDE * 3 <= flat.len() {
        let v0 = Vec3::new(flat[i], flat[i + 1], flat[i + 2]);
        let v1 = Vec3::new(flat[i + STRIDE], flat[i + STRIDE + 1], flat[i + STRIDE + 2]);
        let v2 = Vec3::new(flat[i + 2 * STRIDE], flat[i + 2 * STRIDE + 1], flat[i + 2 * STRIDE + 2]);
        if let Some((t, normal)) = moller_trumbore(origin, dir, v0, v1, v2) {
            if t > EPS && t <= max_distance {
                hits.push(RayHit {
                    t,
                    point: origin + dir * t,
                    normal,
                });
            }
        }
        i += STRIDE * 3;
    }
}

/// Branchless (aside from the parallel/behind-origin rejections) Möller–Trumbore ray-triangle
/// intersection. Returns the hit distance and the triangle's face normal.
fn moller_trumbore(origin: Vec3, dir: Vec3, v0: Vec3, v1: Vec3, v2: Vec3) -> Option<(f32, Vec3)> {
    let edge1 = v1 - v0;
    let edge2 = v2 - v0;
    let normal = edge1.cross(edge2).normalize_or_zero();

    let h = dir.cross(edge2);
    let a = edge1.dot(h);
    if a.abs() < PARALLEL_EPS {
        return None;
    }

    let f = 1.0 / a;
    let s = origin - v0;
    let u = f * s.dot(h);
    if !(0.0..=1.0).contains(&u) {
        return None;
    }

    let q = s.cross(edge1);
    let v = f * dir.dot(q);
    if v < 0.0 || u + v > 1.0 {
        return None;
    }

    let t = f * edge2.dot(q);
    Some((t, normal))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct FixedMeshSource {
        chunks: HashMap<ChunkCoord, Vec<f32>>,
    }
    impl ChunkMeshSource for FixedMeshSource {
        fn get_mesh_data(&self, coord: ChunkCoord) -> Option<Vec<f32>> {
            self.chunks.get(&coord).cloned()
        }
    }

    fn quad_at_y(y: f32) -> Vec<f32> {
        // Two triangles forming a unit quad in the XZ plane at block type 1 (Stone); the ray in
        // these tests travels along -Y so winding direction doesn't matter for hit detection.
        let v = |x: f32, z: f32| [x, y, z, 0.0, 1.0, 0.0, 1.0];
        [v(0.0, 0.0), v(1.0, 0.0), v(1.0, 1.0), v(0.0, 0.0), v(1.0, 1.0), v(0.0, 1.0)]
            .into_iter()
            .flatten()
            .collect()
    }

    #[test]
    fn straight_down_ray_hits_the_floor_quad() {
        let mut chunks = HashMap::new();
        chunks.insert(ChunkCoord::new(0, 0, 0), quad_at_y(0.0));
        let source = FixedMeshSource { chunks };

        let hit = raycast_first(&source, Vec3::new(0.5, 5.0, 0.5), Vec3::NEG_Y, 10.0, 32, 96);
        let hit = hit.expect("expected a hit on the floor quad");
        assert!((hit.t - 5.0).abs() < 1e-3);
        assert!((hit.point.y).abs() < 1e-3);
    }

    #[test]
    fn a_miss_returns_no_hits() {
        let source = FixedMeshSource { chunks: HashMap::new() };
        assert!(raycast_all(&source, Vec3::ZERO, Vec3::Y, 10.0, 32, 96).is_empty());
    }

    #[test]
    fn hits_are_sorted_and_deduplicated() {
        let mut chunks = HashMap::new();
        // Two coincident quads: a naive implementation would report both as distinct hits.
        let mut both = quad_at_y(2.0);
        both.extend(quad_at_y(2.0));
        chunks.insert(ChunkCoord::new(0, 0, 0), both);
        let source = FixedMeshSource { chunks };

        let hits = raycast_all(&source, Vec3::new(0.5, 5.0, 0.5), Vec3::NEG_Y, 10.0, 32, 96);
        assert_eq!(hits.len(), 1);
    }
}
