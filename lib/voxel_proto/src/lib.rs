#![warn(missing_docs)]
#![allow(clippy::type_complexity)]

//! Wire types and binary framing shared between the chunk server and the chunk client.
//!
//! Everything in this crate is transport-agnostic: it encodes and decodes byte buffers, but
//! never touches a socket. The server and client crates own the async I/O and call into these
//! functions to turn bytes into domain values and back.

pub mod block;
pub mod config;
pub mod coord;
pub mod datagram;
pub mod frame;
pub mod mesh;

pub use block::BlockType;
pub use config::ChunkConfig;
pub use coord::ChunkCoord;
pub use datagram::Datagram;
pub use mesh::{CollisionMesh, GeneratedChunkMesh, RenderMesh, Vertex};
