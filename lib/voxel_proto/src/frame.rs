//! Fixed-layout binary framing for the reliable (TCP) channel.
//!
//! Everything here is pure encode/decode over byte slices; the actual async reads and writes
//! live next to the sockets in the server and client crates, layered on top of these functions.

use crate::coord::ChunkCoord;
use crate::mesh::{CollisionMesh, RenderMesh, Vertex};

/// Exact byte length of a chunk request frame.
pub const REQUEST_FRAME_LEN: usize = 12;

/// Payload lengths outside this range are rejected as a framing error, fatal for the connection.
pub const MAX_PAYLOAD_LEN: i32 = 100_000_000;

/// Errors produced while decoding a frame. All are fatal for the connection they were read on;
/// the caller is expected to close the connection and let the peer reconnect.
#[derive(thiserror::Error, Debug, Copy, Clone, Eq, PartialEq)]
pub enum FrameError {
    /// A length prefix fell outside `[0, MAX_PAYLOAD_LEN]`.
    #[error("payload length {0} outside allowed range [0, {MAX_PAYLOAD_LEN}]")]
    LengthOutOfRange(i32),
    /// A payload's declared length did not match the trailing structured data it carries
    /// (for example a render payload whose `len` disagrees with `4 + vertexCount*7*4`).
    #[error("payload length {declared} does not match encoded contents (expected {expected})")]
    LengthMismatch { declared: i32, expected: i32 },
    /// The payload was shorter than required to decode its own header fields.
    #[error("payload truncated: needed at least {needed} bytes, got {got}")]
    Truncated { needed: usize, got: usize },
}

/// Encodes a chunk request: `cx:i32 | cy:i32 | cz:i32`, little-endian, no length prefix.
pub fn encode_request(coord: ChunkCoord) -> [u8; REQUEST_FRAME_LEN] {
    let mut buf = [0u8; REQUEST_FRAME_LEN];
    buf[0..4].copy_from_slice(&coord.cx.to_le_bytes());
    buf[4..8].copy_from_slice(&coord.cy.to_le_bytes());
    buf[8..12].copy_from_slice(&coord.cz.to_le_bytes());
    buf
}

/// Decodes a 12-byte chunk request frame.
pub fn decode_request(buf: &[u8; REQUEST_FRAME_LEN]) -> ChunkCoord {
    let cx = i32::from_le_bytes(buf[0..4].try_into().unwrap());
    let cy = i32::from_le_bytes(buf[4..8].try_into().unwrap());
    let cz = i32::from_le_bytes(buf[8..12].try_into().unwrap());
    ChunkCoord::new(cx, cy, cz)
}

/// Validates a length prefix read off the wire, before the caller reads that many payload bytes.
pub fn validate_len(len: i32) -> Result<usize, FrameError> {
    if len < 0 || len > MAX_PAYLOAD_LEN {
        return Err(FrameError::LengthOutOfRange(len));
    }
    Ok(len as usize)
}

/// Encodes the render payload's body (everything after the `len:i32` prefix):
/// `vertexCount:i32` followed by `vertexCount * 7` little-endian `f32`s.
pub fn encode_render_body(mesh: &RenderMesh) -> Vec<u8> {
    let vertex_count = mesh.vertices.len() as i32;
    let floats = mesh.as_flat_floats();
    let mut body = Vec::with_capacity(4 + floats.len() * 4);
    body.extend_from_slice(&vertex_count.to_le_bytes());
    for f in floats {
        body.extend_from_slice(&f.to_le_bytes());
    }
    body
}

/// Decodes a render payload body previously validated against `validate_len`.
pub fn decode_render_body(body: &[u8]) -> Result<RenderMesh, FrameError> {
    if body.len() < 4 {
        return Err(FrameError::Truncated {
            needed: 4,
            got: body.len(),
        });
    }
    let vertex_count = i32::from_le_bytes(body[0..4].try_into().unwrap());
    if vertex_count < 0 {
        return Err(FrameError::LengthOutOfRange(vertex_count));
    }
    let vertex_count = vertex_count as usize;
    let expected_len = 4 + vertex_count * Vertex::FLOATS * 4;
    if body.len() != expected_len {
        return Err(FrameError::LengthMismatch {
            declared: body.len() as i32,
            expected: expected_len as i32,
        });
    }
    let mut vertices = Vec::with_capacity(vertex_count);
    let mut cursor = 4usize;
    for _ in 0..vertex_count {
        let mut floats = [0f32; Vertex::FLOATS];
        for f in &mut floats {
            *f = f32::from_le_bytes(body[cursor..cursor + 4].try_into().unwrap());
            cursor += 4;
        }
        vertices.push(Vertex {
            x: floats[0],
            y: floats[1],
            z: floats[2],
            nx: floats[3],
            ny: floats[4],
            nz: floats[5],
            block_type: floats[6],
        });
    }
    Ok(RenderMesh { vertices })
}

/// Encodes the collision payload's body: `vertexCount:i32, indexCount:i32`, then `vertexCount`
/// `Vector3`s, then `indexCount` `int32`s.
pub fn encode_collision_body(mesh: &CollisionMesh) -> Vec<u8> {
    let vertex_count = mesh.vertices.len() as i32;
    let index_count = mesh.indices.len() as i32;
    let mut body = Vec::with_capacity(8 + mesh.vertices.len() * 12 + mesh.indices.len() * 4);
    body.extend_from_slice(&vertex_count.to_le_bytes());
    body.extend_from_slice(&index_count.to_le_bytes());
    for v in &mesh.vertices {
        body.extend_from_slice(&v.x.to_le_bytes());
        body.extend_from_slice(&v.y.to_le_bytes());
        body.extend_from_slice(&v.z.to_le_bytes());
    }
    for i in &mesh.indices {
        body.extend_from_slice(&i.to_le_bytes());
    }
    body
}

/// Decodes a collision payload body previously validated against `validate_len`.
pub fn decode_collision_body(body: &[u8]) -> Result<CollisionMesh, FrameError> {
    if body.len() < 8 {
        return Err(FrameError::Truncated {
            needed: 8,
            got: body.len(),
        });
    }
    let vertex_count = i32::from_le_bytes(body[0..4].try_into().unwrap());
    let index_count = i32::from_le_bytes(body[4..8].try_into().unwrap());
    if vertex_count < 0 {
        return Err(FrameError::LengthOutOfRange(vertex_count));
    }
    if index_count < 0 {
        return Err(FrameError::LengthOutOfRange(index_count));
    }
    let vertex_count = vertex_count as usize;
    let index_count = index_count as usize;
    let expected_len = 8 + vertex_count * 12 + index_count * 4;
    if body.len() != expected_len {
        return Err(FrameError::LengthMismatch {
            declared: body.len() as i32,
            expected: expected_len as i32,
        });
    }

    let mut cursor = 8usize;
    let mut vertices = Vec::with_capacity(vertex_count);
    for _ in 0..vertex_count {
        let x = f32::from_le_bytes(body[cursor..cursor + 4].try_into().unwrap());
        let y = f32::from_le_bytes(body[cursor + 4..cursor + 8].try_into().unwrap());
        let z = f32::from_le_bytes(body[cursor + 8..cursor + 12].try_into().unwrap());
        vertices.push(glam::Vec3::new(x, y, z));
        cursor += 12;
    }
    let mut indices = Vec::with_capacity(index_count);
    for _ in 0..index_count {
        indices.push(i32::from_le_bytes(body[cursor..cursor + 4].try_into().unwrap()));
        cursor += 4;
    }
    Ok(CollisionMesh { vertices, indices })
}
