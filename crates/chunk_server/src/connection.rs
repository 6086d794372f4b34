//! Per-client connection handling: one task per accepted socket, reading fixed-layout chunk
//! requests and writing back framed mesh responses.

use std::sync::Arc;

use chunk_common::collaborators::Mesher;
use chunk_common::{ConnectionError, MeshCache};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::Mutex as AsyncMutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use voxel_proto::frame::{self, REQUEST_FRAME_LEN};
use voxel_proto::ChunkCoord;

/// Handles one accepted connection until the peer disconnects, a framing error occurs, or
/// `cancel` fires. Spawns one worker task per request so a slow mesh generation never blocks
/// reading the next request off the same socket.
pub async fn handle<M: Mesher>(
    stream: TcpStream,
    cache: Arc<MeshCache<M>>,
    cancel: CancellationToken,
) -> Result<(), ConnectionError> {
    stream.set_nodelay(true)?;
    let peer = stream.peer_addr().ok();
    let (mut read_half, write_half) = stream.into_split();
    let write_half = Arc::new(AsyncMutex::new(write_half));

    let mut request_buf = [0u8; REQUEST_FRAME_LEN];
    let mut in_flight = tokio::task::JoinSet::new();

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                debug!(?peer, "connection handler cancelled");
                return Err(ConnectionError::Cancelled);
            }
            result = in_flight.join_next(), if !in_flight.is_empty() => {
                if let Some(Err(join_err)) = result {
                    warn!(?peer, error = %join_err, "mesh response task panicked");
                }
            }
            read_result = read_request(&mut read_half, &mut request_buf) => {
                let coord = read_result?;
                let cache = cache.clone();
                let write_half = write_half.clone();
                in_flight.spawn(async move {
                    if let Err(e) = generate_and_send(coord, cache, write_half).await {
                        if e.is_fault() {
                            warn!(?peer, coord = %coord, error = %e, "failed to serve chunk");
                        }
                    }
                });
            }
        }
    }
}

/// Reads exactly one 12-byte request frame, blocking on short reads until it is complete or the
/// stream closes.
async fn read_request(
    read_half: &mut tokio::net::tcp::OwnedReadHalf,
    buf: &mut [u8; REQUEST_FRAME_LEN],
) -> Result<ChunkCoord, ConnectionError> {
    let n = read_half.read_exact(buf).await;
    match n {
        Ok(_) => Ok(frame::decode_request(buf)),
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Err(ConnectionError::ClosedByPeer),
        Err(e) => Err(ConnectionError::Io(e)),
    }
}

/// Generates (or fetches) the mesh for `coord` and writes the render+collision response pair.
/// Holds the per-connection send mutex across both payloads so they are never interleaved with
/// another response on the same socket.
async fn generate_and_send<M: Mesher>(
    coord: ChunkCoord,
    cache: Arc<MeshCache<M>>,
    write_half: Arc<AsyncMutex<tokio::net::tcp::OwnedWriteHalf>>,
) -> Result<(), ConnectionError> {
    let mesh = cache
        .get_or_generate(coord)
        .await
        .map_err(ConnectionError::Generation)?;

    let render_body = frame::encode_render_body(&mesh.render);
    let collision_body = frame::encode_collision_body(&mesh.collision);

    let mut writer = write_half.lock().await;
    writer.write_all(&(render_body.len() as i32).to_le_bytes()).await?;
    writer.write_all(&render_body).await?;
    writer.write_all(&(collision_body.len() as i32).to_le_bytes()).await?;
    writer.write_all(&collision_body).await?;
    writer.flush().await?;
    info!(coord = %coord, "served chunk");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chunk_common::collaborators::DeterministicMesher;
    use chunk_common::MeshCache;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn cold_fetch_returns_a_render_then_collision_payload() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let cache = Arc::new(MeshCache::new(DeterministicMesher, 100));
        let cancel = CancellationToken::new();

        let server_cancel = cancel.clone();
        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let _ = handle(stream, cache, server_cancel).await;
        });

        let mut client = TcpStream::connect(addr).await.unwrap();
        client.write_all(&frame::encode_request(ChunkCoord::new(0, 0, 0))).await.unwrap();

        let mut len_buf = [0u8; 4];
        client.read_exact(&mut len_buf).await.unwrap();
        let render_len = i32::from_le_bytes(len_buf);
        assert!(render_len >= 4);
        let mut render_body = vec![0u8; render_len as usize];
        client.read_exact(&mut render_body).await.unwrap();
        let render = frame::decode_render_body(&render_body).unwrap();
        assert!(render.triangle_count() > 0);

        client.read_exact(&mut len_buf).await.unwrap();
        let collision_len = i32::from_le_bytes(len_buf);
        let mut collision_body = vec![0u8; collision_len as usize];
        client.read_exact(&mut collision_body).await.unwrap();
        frame::decode_collision_body(&collision_body).unwrap();

        cancel.cancel();
    }
}
