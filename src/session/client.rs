//! Client-side connection actor.
//!
//! Adds two things over the server session: a connect phase with endpoint
//! failover, and heartbeat generation so the peer's input deadline never
//! expires while the application is idle.
//!
//! # Example
//!
//! ```ignore
//! use framecast::{ClientConnection, Dispatcher, SessionConfig};
//!
//! let connection = ClientConnection::connect(
//!     &candidates,
//!     Arc::new(Dispatcher::new()),
//!     SessionConfig::default(),
//! )
//! .await?;
//! connection.send_packet(&packet).await?;
//! ```

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpStream;
use tokio::time;

use crate::error::{FramecastError, Result};
use crate::protocol::Packet;

use super::deadline::Deadline;
use super::{io, spawn_deadline_supervisor, Dispatcher, SessionConfig, SessionHandle, SessionState};

/// An established client connection.
pub struct ClientConnection {
    handle: SessionHandle,
    peer: SocketAddr,
}

impl ClientConnection {
    /// Connect with failover across an ordered endpoint candidate list.
    ///
    /// Each candidate gets one attempt bounded by the connect timeout; on
    /// failure or expiry the next candidate is tried. When the list is
    /// exhausted this reports [`FramecastError::EndpointsExhausted`] — the
    /// transport performs no further automatic reconnect.
    pub async fn connect(
        endpoints: &[SocketAddr],
        dispatcher: Arc<Dispatcher>,
        config: SessionConfig,
    ) -> Result<Self> {
        let (stream, peer) = Self::connect_with_failover(endpoints, &config).await?;
        if let Err(e) = stream.set_nodelay(true) {
            tracing::debug!(error = %e, "could not disable Nagle");
        }

        let (handle, queue_rx, stop_rx) = SessionHandle::new(None, &config);
        let (reader, writer) = stream.into_split();

        let (input_deadline, input_watch) = Deadline::armed(config.input_timeout);
        let (output_deadline, output_watch) = Deadline::parked();
        spawn_deadline_supervisor(input_watch, stop_rx.clone(), handle.clone(), "input");
        spawn_deadline_supervisor(output_watch, stop_rx.clone(), handle.clone(), "output");

        let heartbeat = config.heartbeat_interval;
        tokio::spawn(io::read_loop(
            reader,
            handle.clone(),
            dispatcher,
            input_deadline,
            stop_rx.clone(),
            config.clone(),
        ));
        tokio::spawn(io::write_loop(
            writer,
            queue_rx,
            handle.clone(),
            output_deadline,
            stop_rx,
            config,
            Some(heartbeat),
        ));

        handle.mark_active();
        tracing::debug!(session = handle.id(), %peer, "client connection established");
        Ok(Self { handle, peer })
    }

    async fn connect_with_failover(
        endpoints: &[SocketAddr],
        config: &SessionConfig,
    ) -> Result<(TcpStream, SocketAddr)> {
        for addr in endpoints {
            match time::timeout(config.connect_timeout, TcpStream::connect(addr)).await {
                Ok(Ok(stream)) => return Ok((stream, *addr)),
                Ok(Err(e)) => {
                    tracing::warn!(endpoint = %addr, error = %e, "connect failed, trying next endpoint");
                }
                Err(_) => {
                    tracing::warn!(endpoint = %addr, "connect timed out, trying next endpoint");
                }
            }
        }
        Err(FramecastError::EndpointsExhausted)
    }

    /// The endpoint this connection was established against.
    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    /// Handle to the underlying session.
    pub fn handle(&self) -> &SessionHandle {
        &self.handle
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.handle.state()
    }

    /// Enqueue a packet for the peer.
    pub async fn send_packet(&self, packet: &Packet) -> Result<()> {
        self.handle.send_packet(packet).await
    }

    /// Stop the connection. Idempotent.
    pub fn stop(&self) {
        self.handle.stop();
    }

    /// Wait until the connection has stopped.
    pub async fn closed(&self) {
        self.handle.closed().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;
    use tokio::time::Duration;

    fn fast_config() -> SessionConfig {
        SessionConfig {
            connect_timeout: Duration::from_millis(500),
            ..SessionConfig::default()
        }
    }

    #[tokio::test]
    async fn test_empty_candidate_list_is_exhausted() {
        let result =
            ClientConnection::connect(&[], Arc::new(Dispatcher::new()), fast_config()).await;
        assert!(matches!(result, Err(FramecastError::EndpointsExhausted)));
    }

    #[tokio::test]
    async fn test_connect_to_listening_endpoint() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let accept = tokio::spawn(async move { listener.accept().await });

        let connection =
            ClientConnection::connect(&[addr], Arc::new(Dispatcher::new()), fast_config())
                .await
                .unwrap();

        assert_eq!(connection.state(), SessionState::Active);
        assert_eq!(connection.peer(), addr);
        accept.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_failover_to_second_candidate() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let good = listener.local_addr().unwrap();
        let bad: SocketAddr = "127.0.0.1:1".parse().unwrap();

        let accept = tokio::spawn(async move { listener.accept().await });

        let connection =
            ClientConnection::connect(&[bad, good], Arc::new(Dispatcher::new()), fast_config())
                .await
                .unwrap();

        assert_eq!(connection.peer(), good);
        accept.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_all_candidates_unreachable() {
        let bad1: SocketAddr = "127.0.0.1:1".parse().unwrap();
        let bad2: SocketAddr = "127.0.0.1:2".parse().unwrap();

        let result = ClientConnection::connect(
            &[bad1, bad2],
            Arc::new(Dispatcher::new()),
            fast_config(),
        )
        .await;

        assert!(matches!(result, Err(FramecastError::EndpointsExhausted)));
    }
}
