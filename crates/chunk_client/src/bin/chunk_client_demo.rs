//! Standalone chunk client entry point: connects to a chunk server, runs the scheduler and
//! datagram loops, and logs mesh arrivals, with a fixed player position standing in for a real
//! renderer/camera until one is wired in.

use std::net::SocketAddr;
use std::sync::Arc;

use chunk_client::config::{CliOptions, ClientSettings};
use chunk_common::collaborators::{MeshUploadSink, PlayerState, WorldGen};
use clap::Parser;
use glam::Vec3;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use voxel_proto::ChunkCoord;

/// A fixed camera position standing in for a real player/renderer in this headless demo binary.
struct HeadlessPlayer {
    pos: Vec3,
}

impl PlayerState for HeadlessPlayer {
    fn position(&self) -> Vec3 {
        self.pos
    }
    fn forward(&self) -> Vec3 {
        Vec3::NEG_Z
    }
}

/// Logs every mesh the loader hands off instead of uploading it to a GPU.
struct LoggingUploadSink;

impl MeshUploadSink for LoggingUploadSink {
    fn enqueue_mesh_for_chunk(&self, coord: ChunkCoord, mesh: voxel_proto::RenderMesh) {
        info!(coord = %coord, vertices = mesh.vertices.len(), "mesh ready for upload");
    }
}

/// A flat, featureless density field; just enough to let `BlockBreak` datagrams be applied and
/// logged without a real world generator attached.
struct FlatWorld;

impl WorldGen for FlatWorld {
    fn sample_density(&self, _x: f32, y: f32, _z: f32) -> f32 {
        -y
    }
    fn remove_block(&self, x: f32, y: f32, z: f32, radius: f32, strength: f32) {
        info!(x, y, z, radius, strength, "block removed");
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let opts = CliOptions::parse();
    let settings = ClientSettings::resolve(&opts);
    let port = settings.chunk.server_port as u16;
    let datagram_addr: SocketAddr = format!("{}:{}", settings.host, settings.chunk.datagram_port()).parse()?;
    let host = settings.host.clone();
    let chunk = settings.chunk;

    let player = Arc::new(HeadlessPlayer { pos: Vec3::ZERO });
    let handles = Arc::new(chunk_client::connect(host, port, datagram_addr, chunk, player).await?);

    info!(
        host = %settings.host,
        port,
        render_distance = handles.scheduler.tuning().max_concurrent_loads,
        "chunk client starting"
    );

    let cancel = CancellationToken::new();
    let upload_sink = Arc::new(LoggingUploadSink);
    let world = Arc::new(FlatWorld);

    let run_task = tokio::spawn(chunk_client::run(handles, upload_sink, world, cancel.clone()));

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("interrupt signal received, shutting down");
            cancel.cancel();
        }
        _ = cancel.cancelled() => {}
    }

    if let Err(e) = run_task.await {
        warn!(error = %e, "client task panicked");
    }
    info!("chunk client stopped");
    Ok(())
}
