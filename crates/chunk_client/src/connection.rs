//! The client's reliable (TCP) connection: request/response framing plus reconnect-on-failure.

use chunk_common::ConnectionError;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::Mutex as AsyncMutex;
use tracing::{info, warn};
use voxel_proto::frame;
use voxel_proto::{ChunkCoord, GeneratedChunkMesh};

/// A persistent connection to the chunk server. A single mutex around the live socket both
/// serializes the `send(request) -> recv(render) -> recv(collision)` transaction and guarantees
/// at most one reconnect attempt is ever in flight.
pub struct ClientConnection {
    host: String,
    port: u16,
    stream: AsyncMutex<Option<TcpStream>>,
}

impl ClientConnection {
    /// Builds a connection that dials lazily on the first request.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            stream: AsyncMutex::new(None),
        }
    }

    /// Sends a chunk request and returns its decoded render and collision meshes. Reconnects
    /// once, transparently, if the live socket has gone bad.
    pub async fn request_chunk(&self, coord: ChunkCoord) -> Result<GeneratedChunkMesh, ConnectionError> {
        let mut guard = self.stream.lock().await;

        if guard.is_none() {
            *guard = Some(self.connect().await?);
        }

        match Self::exchange(guard.as_mut().expect("just populated"), coord).await {
            Ok(mesh) => Ok(mesh),
            Err(e) if !matches!(e, ConnectionError::Framing(_)) => {
                warn!(coord = %coord, error = %e, "reconnecting after a failed exchange");
                *guard = None;
                let stream = self.connect().await?;
                *guard = Some(stream);
                Self::exchange(guard.as_mut().expect("just populated"), coord).await
            }
            Err(e) => Err(e),
        }
    }

    async fn connect(&self) -> Result<TcpStream, ConnectionError> {
        let stream = TcpStream::connect((self.host.as_str(), self.port)).await?;
        stream.set_nodelay(true)?;
        info!(host = %self.host, port = self.port, "connected to chunk server");
        Ok(stream)
    }

    async fn exchange(stream: &mut TcpStream, coord: ChunkCoord) -> Result<GeneratedChunkMesh, ConnectionError> {
        stream.write_all(&frame::encode_request(coord)).await?;
        stream.flush().await?;

        let render_body = read_payload(stream).await?;
        let collision_body = read_payload(stream).await?;

        let render = frame::decode_render_body(&render_body)?;
        let collision = frame::decode_collision_body(&collision_body)?;
        Ok(GeneratedChunkMesh { render, collision })
    }
}

/// Reads one length-prefixed payload: a validated `len:i32` then exactly `len` bytes.
async fn read_payload(stream: &mut TcpStream) -> Result<Vec<u8>, ConnectionError> {
    let mut len_buf = [0u8; 4];
    match stream.read_exact(&mut len_buf).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Err(ConnectionError::ClosedByPeer),
        Err(e) => return Err(e.into()),
    }
    let len = frame::validate_len(i32::from_le_bytes(len_buf))?;
    let mut body = vec![0u8; len];
    stream.read_exact(&mut body).await?;
    Ok(body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chunk_common::collaborators::DeterministicMesher;
    use chunk_common::collaborators::Mesher;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn request_chunk_round_trips_against_a_fake_server() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut req_buf = [0u8; frame::REQUEST_FRAME_LEN];
            stream.read_exact(&mut req_buf).await.unwrap();
            let coord = frame::decode_request(&req_buf);
            let mesh = DeterministicMesher.generate(coord).unwrap();

            let render_body = frame::encode_render_body(&mesh.render);
            let collision_body = frame::encode_collision_body(&mesh.collision);
            stream.write_all(&(render_body.len() as i32).to_le_bytes()).await.unwrap();
            stream.write_all(&render_body).await.unwrap();
            stream.write_all(&(collision_body.len() as i32).to_le_bytes()).await.unwrap();
            stream.write_all(&collision_body).await.unwrap();
        });

        let conn = ClientConnection::new(addr.ip().to_string(), addr.port());
        let mesh = conn.request_chunk(ChunkCoord::new(2, 0, 2)).await.unwrap();
        assert!(mesh.render.triangle_count() > 0);
    }

    #[tokio::test]
    async fn a_dropped_connection_is_retried_once_against_a_fresh_accept() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            // First accept: close immediately without responding, simulating a dead peer.
            let (stream, _) = listener.accept().await.unwrap();
            drop(stream);

            // Second accept, after the client's automatic reconnect: serve the request properly.
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut req_buf = [0u8; frame::REQUEST_FRAME_LEN];
            stream.read_exact(&mut req_buf).await.unwrap();
            let coord = frame::decode_request(&req_buf);
            let mesh = DeterministicMesher.generate(coord).unwrap();

            let render_body = frame::encode_render_body(&mesh.render);
            let collision_body = frame::encode_collision_body(&mesh.collision);
            stream.write_all(&(render_body.len() as i32).to_le_bytes()).await.unwrap();
            stream.write_all(&render_body).await.unwrap();
            stream.write_all(&(collision_body.len() as i32).to_le_bytes()).await.unwrap();
            stream.write_all(&collision_body).await.unwrap();
        });

        let conn = ClientConnection::new(addr.ip().to_string(), addr.port());
        let mesh = conn.request_chunk(ChunkCoord::new(3, 0, 3)).await.unwrap();
        assert!(mesh.render.triangle_count() > 0);
    }
}
