//! The client's UDP datagram channel: player-state broadcasts, keepalives, and block-edit
//! notifications, independent of the reliable request/response flow.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use chunk_common::collaborators::WorldGen;
use tokio::net::UdpSocket;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use voxel_proto::datagram::Datagram;

/// Density removal radius applied by an incoming `BlockBreak` datagram.
const BLOCK_BREAK_RADIUS: f32 = 1.5;
/// Density removal strength applied by an incoming `BlockBreak` datagram.
const BLOCK_BREAK_STRENGTH: f32 = 3.0;
/// Delay before scheduling a mesh regeneration after a block edit, to let density settle.
const REGEN_SETTLE_DELAY: Duration = Duration::from_millis(10);

/// A bound UDP socket plus the server's datagram endpoint, shared by the send side (fire and
/// forget) and the single owning receive loop.
pub struct DatagramChannel {
    socket: UdpSocket,
    server_addr: SocketAddr,
}

impl DatagramChannel {
    /// Binds an ephemeral local UDP socket and connects it to the server's datagram endpoint.
    pub async fn bind(server_addr: SocketAddr) -> std::io::Result<Self> {
        let socket = UdpSocket::bind("0.0.0.0:0").await?;
        Ok(Self { socket, server_addr })
    }

    /// Sends a datagram, fire-and-forget.
    pub async fn send(&self, datagram: &Datagram) -> std::io::Result<()> {
        self.socket.send_to(&datagram.encode(), self.server_addr).await?;
        Ok(())
    }

    /// Runs the receive loop until cancelled, dispatching each datagram by type and applying
    /// `BlockBreak` edits to `world`, with a regeneration hint scheduled after a short settle
    /// delay.
    pub async fn run_receive_loop<W: WorldGen>(&self, world: Arc<W>, cancel: CancellationToken) {
        let mut buf = [0u8; 64];
        loop {
            tokio::select! {
                _ = cancel.cancelled() => return,
                result = self.socket.recv_from(&mut buf) => {
                    match result {
                        Ok((n, from)) => self.dispatch(&buf[..n], from, &world).await,
                        Err(e) => warn!(error = %e, "datagram receive failed"),
                    }
                }
            }
        }
    }

    async fn dispatch<W: WorldGen>(&self, bytes: &[u8], from: SocketAddr, world: &Arc<W>) {
        let datagram = match Datagram::decode(bytes) {
            Ok(d) => d,
            Err(e) => {
                debug!(%from, error = %e, "dropping malformed datagram");
                return;
            }
        };

        match datagram {
            Datagram::KeepAlive => {
                if let Err(e) = self.socket.send_to(&Datagram::KeepAlive.encode(), from).await {
                    warn!(error = %e, "failed to echo keepalive");
                }
            }
            Datagram::BlockBreak { x, y, z } => {
                let world = world.clone();
                world.remove_block(x as f32, y as f32, z as f32, BLOCK_BREAK_RADIUS, BLOCK_BREAK_STRENGTH);
                tokio::spawn(async move {
                    tokio::time::sleep(REGEN_SETTLE_DELAY).await;
                    debug!(x, y, z, "block edit settled, mesh regeneration may now be requested");
                });
            }
            Datagram::EntityUpdate { player_id, .. } => {
                debug!(player_id, "entity update received");
            }
            Datagram::PositionAck { ack_seq, .. } => {
                debug!(ack_seq, "position ack received");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tokio::net::UdpSocket as TokioUdpSocket;

    struct RecordingWorld {
        removed: AtomicBool,
    }
    impl WorldGen for RecordingWorld {
        fn sample_density(&self, _x: f32, _y: f32, _z: f32) -> f32 {
            0.0
        }
        fn remove_block(&self, _x: f32, _y: f32, _z: f32, _radius: f32, _strength: f32) {
            self.removed.store(true, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn keep_alive_is_echoed_back() {
        let server = TokioUdpSocket::bind("127.0.0.1:0").await.unwrap();
        let server_addr = server.local_addr().unwrap();
        let channel = DatagramChannel::bind(server_addr).await.unwrap();
        let client_addr = channel.socket.local_addr().unwrap();

        channel.send(&Datagram::KeepAlive).await.unwrap();
        let mut buf = [0u8; 8];
        let (n, from) = server.recv_from(&mut buf).await.unwrap();
        assert_eq!(Datagram::decode(&buf[..n]).unwrap(), Datagram::KeepAlive);
        server.send_to(&buf[..n], from).await.unwrap();

        let world = Arc::new(RecordingWorld { removed: AtomicBool::new(false) });
        let cancel = CancellationToken::new();
        let recv_cancel = cancel.clone();
        let channel = Arc::new(channel);
        let recv_channel = channel.clone();
        let handle = tokio::spawn(async move { recv_channel.run_receive_loop(world, recv_cancel).await });

        // The original server socket should now receive the echoed keepalive reply.
        let mut echoed = [0u8; 8];
        tokio::time::timeout(Duration::from_secs(1), async {
            loop {
                channel.send(&Datagram::KeepAlive).await.unwrap();
                if let Ok(Ok((n, _))) = tokio::time::timeout(Duration::from_millis(50), server.recv_from(&mut echoed)).await {
                    if Datagram::decode(&echoed[..n]).unwrap() == Datagram::KeepAlive {
                        break;
                    }
                }
            }
        })
        .await
        .unwrap();

        cancel.cancel();
        let _ = handle.await;
        let _ = client_addr;
        let _ = Vec3::ZERO;
    }

    #[tokio::test]
    async fn block_break_mutates_world_gen() {
        let server = TokioUdpSocket::bind("127.0.0.1:0").await.unwrap();
        let server_addr = server.local_addr().unwrap();
        let channel = DatagramChannel::bind(server_addr).await.unwrap();
        let client_addr = channel.socket.local_addr().unwrap();

        let world = Arc::new(RecordingWorld { removed: AtomicBool::new(false) });
        let cancel = CancellationToken::new();
        let recv_cancel = cancel.clone();
        let loop_world = world.clone();
        let handle = tokio::spawn(async move { channel.run_receive_loop(loop_world, recv_cancel).await });

        server
            .send_to(&Datagram::BlockBreak { x: 1, y: 2, z: 3 }.encode(), client_addr)
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        cancel.cancel();
        let _ = handle.await;
        assert!(world.removed.load(Ordering::SeqCst));
    }
}
