//! Error types for framecast.

use thiserror::Error;

use crate::protocol::DecodeError;

/// Main error type for all transport operations.
///
/// Transport-level failures (I/O, protocol violations) are fatal to their
/// connection and converge on the session's `stop()`. [`DecodeError`]s are
/// local to one packet and recoverable.
#[derive(Debug, Error)]
pub enum FramecastError {
    /// I/O error during socket operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed packet payload (recoverable; the packet is discarded).
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    /// Protocol violation (oversized frame, invalid header).
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The session's output queue is gone; the connection is stopping or
    /// stopped.
    #[error("connection closed")]
    ConnectionClosed,

    /// The session's output queue is full.
    #[error("output queue full")]
    QueueFull,

    /// Every candidate endpoint failed or timed out during connect.
    #[error("all candidate endpoints exhausted")]
    EndpointsExhausted,
}

/// Result type alias using FramecastError.
pub type Result<T> = std::result::Result<T, FramecastError>;
