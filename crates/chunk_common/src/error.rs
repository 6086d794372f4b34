//! The error taxonomy shared by the server's and client's connection-handling code.
//!
//! Connection loops match on [`ConnectionError`] to decide whether to log and keep going,
//! close just the one connection, or stay silent — peer misbehavior is always a typed error,
//! never a panic.

use voxel_proto::frame::FrameError;

/// Outcome of one connection-level operation (a read, a write, a request/response exchange).
#[derive(thiserror::Error, Debug)]
pub enum ConnectionError {
    /// The peer closed the stream cleanly (a zero-byte read). Not logged as a fault.
    #[error("closed by peer")]
    ClosedByPeer,
    /// A length prefix or payload violated the wire format. Fatal for the connection.
    #[error("framing error: {0}")]
    Framing(#[from] FrameError),
    /// A transient I/O failure (reset, timeout, broken pipe). Fatal for this connection, but
    /// meaningful to retry at a higher level (client reconnect, server just drops the client).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// Mesh generation failed for the requested chunk. Not cached; the requester is told, other
    /// concurrent waiters for the same key will retry generation themselves.
    #[error("mesh generation failed: {0}")]
    Generation(#[source] anyhow::Error),
    /// Shutdown was requested. Never logged as an error — purely a control-flow signal.
    #[error("cancelled")]
    Cancelled,
}

impl ConnectionError {
    /// Whether this outcome represents an actual fault worth a `warn`/`error` log line, as
    /// opposed to a routine disconnect or a cooperative cancellation.
    pub fn is_fault(&self) -> bool {
        !matches!(self, Self::ClosedByPeer | Self::Cancelled)
    }
}
