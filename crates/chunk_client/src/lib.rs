//! Chunk streaming client core: a persistent framed connection to a chunk server, a
//! priority-driven loading scheduler, a UDP side channel for player state and block edits, and
//! voxel-grid raycasting for mining — independent of any particular renderer or windowing layer.

#![warn(missing_docs)]

pub mod config;
pub mod connection;
pub mod datagram;
pub mod mining;
pub mod raycast;
pub mod scheduler;

pub use config::{CliOptions, ClientSettings};
pub use connection::ClientConnection;
pub use datagram::DatagramChannel;
pub use mining::{BlockMined, BlockPos, MiningInput, MiningState, TargetHit, MAX_REACH};
pub use raycast::{raycast_all, raycast_first, RayHit};
pub use scheduler::{auto_tune, run_loader, AutoTune, ChunkScheduler};

use std::net::SocketAddr;
use std::sync::Arc;

use chunk_common::collaborators::{MeshUploadSink, PlayerState, WorldGen};
use tokio_util::sync::CancellationToken;
use voxel_proto::ChunkConfig;

/// Everything needed to run the client's background tasks: the reliable connection, the
/// scheduler, and the datagram channel, bundled so a single [`run`] call wires them together.
pub struct ClientHandles<P: PlayerState> {
    /// The framed TCP connection to the chunk server.
    pub connection: Arc<ClientConnection>,
    /// The chunk request scheduler, auto-tuned to `config.render_distance`.
    pub scheduler: Arc<ChunkScheduler<P>>,
    /// The UDP side channel for keepalives, position acks, and block edits.
    pub datagram: Arc<DatagramChannel>,
}

/// Builds a [`ClientHandles`] bundle: dials no sockets eagerly beyond the UDP bind, since the TCP
/// connection dials lazily on first chunk request.
pub async fn connect<P: PlayerState>(
    host: impl Into<String>,
    port: u16,
    datagram_addr: SocketAddr,
    config: ChunkConfig,
    player: Arc<P>,
) -> std::io::Result<ClientHandles<P>> {
    let host = host.into();
    let connection = Arc::new(ClientConnection::new(host, port));
    let scheduler = Arc::new(ChunkScheduler::new(config, player, connection.clone()));
    let datagram = Arc::new(DatagramChannel::bind(datagram_addr).await?);
    Ok(ClientHandles {
        connection,
        scheduler,
        datagram,
    })
}

/// Runs the scheduler's update-cycle loop, the loader, and the datagram receive loop concurrently
/// until `cancel` fires. Intended to be spawned once at client startup alongside the renderer's
/// own frame loop (which drives mining separately via [`MiningState::update`]).
pub async fn run<P: PlayerState, S: MeshUploadSink, W: WorldGen>(
    handles: Arc<ClientHandles<P>>,
    upload_sink: Arc<S>,
    world: Arc<W>,
    cancel: CancellationToken,
) {
    let update_loop = handles.scheduler.run_update_loop(cancel.clone());
    let loader = run_loader(handles.scheduler.clone(), upload_sink, cancel.clone());
    let datagrams = handles.datagram.run_receive_loop(world, cancel);
    tokio::join!(update_loop, loader, datagrams);
}
