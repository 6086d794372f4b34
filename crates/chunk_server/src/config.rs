//! Server-side configuration: CLI flags layered over an optional TOML file, layered over
//! [`ChunkConfig`]'s own defaults.

use std::path::PathBuf;

use clap::Parser;
use serde::Deserialize;
use voxel_proto::ChunkConfig;

/// Command-line flags for the dedicated chunk server.
#[derive(Parser, Debug)]
#[command(name = "chunk_dedi_server", about = "Chunk-serving dedicated server")]
pub struct CliOptions {
    /// TOML file providing defaults; overridden by any flag or env var given alongside it.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Port to accept reliable (TCP) connections on; the datagram channel binds one above it.
    #[arg(long, env = "CHUNK_SERVER_PORT")]
    pub port: Option<i32>,

    /// Horizontal chunk extent, in blocks.
    #[arg(long, env = "CHUNK_SIZE")]
    pub chunk_size: Option<i32>,

    /// Vertical chunk extent, in blocks.
    #[arg(long, env = "CHUNK_SIZE_Y")]
    pub chunk_size_y: Option<i32>,

    /// World generation seed.
    #[arg(long, env = "WORLD_SEED")]
    pub world_seed: Option<i32>,

    /// Upper bound on live mesh cache entries before the cleanup pass starts trimming.
    #[arg(long, env = "MAX_CACHED_MESHES")]
    pub max_cached_meshes: Option<usize>,
}

/// The subset of `ChunkConfig` fields a TOML file may override, plus server-only knobs.
#[derive(Deserialize, Default)]
struct FileOverrides {
    server_port: Option<i32>,
    chunk_size: Option<i32>,
    chunk_size_y: Option<i32>,
    world_seed: Option<i32>,
    max_cached_meshes: Option<usize>,
}

/// Default cap on live mesh cache entries absent any override.
pub const DEFAULT_MAX_CACHED_MESHES: usize = 4_000;

/// Fully resolved server configuration: precedence is CLI flag/env var, then `--config` file,
/// then [`ChunkConfig::default`].
pub struct ServerSettings {
    /// Wire-compatible chunk configuration, as consulted by clients too.
    pub chunk: ChunkConfig,
    /// Server-only knob: how many mesh cache entries to keep before trimming.
    pub max_cached_meshes: usize,
}

impl ServerSettings {
    /// Resolves settings from CLI options, reading the `--config` TOML file if given.
    pub fn resolve(opts: &CliOptions) -> anyhow::Result<Self> {
        let file = match &opts.config {
            Some(path) => {
                let text = std::fs::read_to_string(path)
                    .map_err(|e| anyhow::anyhow!("reading config file {}: {e}", path.display()))?;
                toml::from_str(&text).map_err(|e| anyhow::anyhow!("parsing config file {}: {e}", path.display()))?
            }
            None => FileOverrides::default(),
        };

        let mut chunk = ChunkConfig::default();
        if let Some(v) = opts.port.or(file.server_port) {
            chunk.server_port = v;
        }
        if let Some(v) = opts.chunk_size.or(file.chunk_size) {
            chunk.chunk_size = v;
        }
        if let Some(v) = opts.chunk_size_y.or(file.chunk_size_y) {
            chunk.chunk_size_y = v;
        }
        if let Some(v) = opts.world_seed.or(file.world_seed) {
            chunk.world_seed = v;
        }

        let max_cached_meshes = opts
            .max_cached_meshes
            .or(file.max_cached_meshes)
            .unwrap_or(DEFAULT_MAX_CACHED_MESHES);

        Ok(Self { chunk, max_cached_meshes })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opts(port: Option<i32>) -> CliOptions {
        CliOptions {
            config: None,
            port,
            chunk_size: None,
            chunk_size_y: None,
            world_seed: None,
            max_cached_meshes: None,
        }
    }

    #[test]
    fn absent_flags_fall_back_to_chunk_config_defaults() {
        let settings = ServerSettings::resolve(&opts(None)).unwrap();
        assert_eq!(settings.chunk, ChunkConfig::default());
        assert_eq!(settings.max_cached_meshes, DEFAULT_MAX_CACHED_MESHES);
    }

    #[test]
    fn a_cli_flag_overrides_the_default() {
        let settings = ServerSettings::resolve(&opts(Some(9999))).unwrap();
        assert_eq!(settings.chunk.server_port, 9999);
    }
}
