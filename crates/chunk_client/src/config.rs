//! Client-side configuration: CLI flags, layered over [`ChunkConfig`]'s own defaults. The client
//! has no config file of its own; `render_distance` is the one knob players actually tune.

use clap::Parser;
use voxel_proto::ChunkConfig;

/// Command-line flags for the chunk streaming client.
#[derive(Parser, Debug)]
#[command(name = "chunk_client", about = "Chunk streaming client core")]
pub struct CliOptions {
    /// Host name or IP address of the chunk server.
    #[arg(long, env = "CHUNK_SERVER_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// TCP port of the chunk server's reliable channel; the datagram channel is one above it.
    #[arg(long, env = "CHUNK_SERVER_PORT")]
    pub port: Option<i32>,

    /// Horizontal view-shell radius, in chunks.
    #[arg(long, env = "RENDER_DISTANCE")]
    pub render_distance: Option<i32>,

    /// Horizontal chunk extent, in blocks; must match the server's.
    #[arg(long, env = "CHUNK_SIZE")]
    pub chunk_size: Option<i32>,

    /// Vertical chunk extent, in blocks; must match the server's.
    #[arg(long, env = "CHUNK_SIZE_Y")]
    pub chunk_size_y: Option<i32>,
}

/// Fully resolved client configuration.
pub struct ClientSettings {
    /// Host name or IP address of the chunk server.
    pub host: String,
    /// Wire-compatible chunk configuration, matched against the server's at connect time.
    pub chunk: ChunkConfig,
}

impl ClientSettings {
    /// Resolves settings from CLI options, falling back to [`ChunkConfig::default`] for anything
    /// not given on the command line.
    pub fn resolve(opts: &CliOptions) -> Self {
        let mut chunk = ChunkConfig::default();
        if let Some(v) = opts.port {
            chunk.server_port = v;
        }
        if let Some(v) = opts.render_distance {
            chunk.render_distance = v;
        }
        if let Some(v) = opts.chunk_size {
            chunk.chunk_size = v;
        }
        if let Some(v) = opts.chunk_size_y {
            chunk.chunk_size_y = v;
        }

        Self {
            host: opts.host.clone(),
            chunk,
        }
    }
}
