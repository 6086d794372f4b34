//! Dedicated chunk-serving server: accepts reliable connections, generates and caches meshes,
//! and runs the fixed-rate tick loop alongside them.

#![warn(missing_docs)]

pub mod config;
pub mod connection;
pub mod tick;

use std::sync::Arc;

use chunk_common::collaborators::Mesher;
use chunk_common::MeshCache;
use config::ServerSettings;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Runs the server until `cancel` fires: the TCP accept loop, the tick loop, and the mesh
/// cache's periodic cleanup pass, all as sibling tasks under one cancellation token.
pub async fn run<M: Mesher>(settings: ServerSettings, mesher: M, cancel: CancellationToken) -> anyhow::Result<()> {
    let cache = Arc::new(MeshCache::new(mesher, settings.max_cached_meshes));

    let listener = TcpListener::bind(("0.0.0.0", settings.chunk.server_port as u16)).await?;
    info!(port = settings.chunk.server_port, "listening for chunk requests");

    let tick_task = tokio::spawn(tick::run(cache.clone(), cancel.clone()));
    let cleanup_task = tokio::spawn(run_cleanup_loop(cache.clone(), cancel.clone()));
    let accept_task = tokio::spawn(accept_loop(listener, cache, cancel.clone()));

    let _ = tokio::join!(tick_task, cleanup_task, accept_task);
    Ok(())
}

async fn accept_loop<M: Mesher>(listener: TcpListener, cache: Arc<MeshCache<M>>, cancel: CancellationToken) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                info!("no longer accepting new connections");
                return;
            }
            accepted = listener.accept() => {
                match accepted {
                    Ok((stream, peer)) => {
                        info!(%peer, "accepted connection");
                        let cache = cache.clone();
                        let cancel = cancel.clone();
                        tokio::spawn(async move {
                            if let Err(e) = connection::handle(stream, cache, cancel).await {
                                if e.is_fault() {
                                    warn!(%peer, error = %e, "connection ended with an error");
                                } else {
                                    info!(%peer, "connection closed");
                                }
                            }
                        });
                    }
                    Err(e) => warn!(error = %e, "failed to accept connection"),
                }
            }
        }
    }
}

async fn run_cleanup_loop<M: Mesher>(cache: Arc<MeshCache<M>>, cancel: CancellationToken) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = tokio::time::sleep(chunk_common::MESH_CACHE_CLEANUP_INTERVAL) => {
                let cache = cache.clone();
                let evicted = tokio::task::spawn_blocking(move || cache.cleanup()).await.unwrap_or(0);
                if evicted > 0 {
                    info!(evicted, "mesh cache cleanup pass evicted entries");
                }
            }
        }
    }
}
