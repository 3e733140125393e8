//! Server-side session actor: one per accepted connection.
//!
//! The acceptor is an external collaborator; it owns the listener and calls
//! [`ServerSession::spawn`] per accepted socket:
//!
//! ```ignore
//! let listener = TcpListener::bind(addr).await?;
//! loop {
//!     let (stream, _peer) = listener.accept().await?;
//!     ServerSession::spawn(stream, channel.clone(), dispatcher.clone(), config.clone());
//! }
//! ```

use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncWrite};

use crate::channel::Channel;

use super::deadline::Deadline;
use super::{io, spawn_deadline_supervisor, Dispatcher, SessionConfig, SessionHandle};

/// The per-accepted-connection actor set.
pub struct ServerSession;

impl ServerSession {
    /// Start a session over an accepted stream.
    ///
    /// Joins the channel, then spawns the read task, the write task and the
    /// input/output deadline supervisors. The input deadline starts armed;
    /// the output deadline stays parked until a write begins. Expiry of
    /// either stops the session, as does any transport error.
    pub fn spawn<S>(
        stream: S,
        channel: Arc<Channel>,
        dispatcher: Arc<Dispatcher>,
        config: SessionConfig,
    ) -> SessionHandle
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (handle, queue_rx, stop_rx) = SessionHandle::new(Some(channel.clone()), &config);
        channel.join(handle.clone());
        tracing::debug!(session = handle.id(), "server session joined channel");

        let (reader, writer) = tokio::io::split(stream);

        let (input_deadline, input_watch) = Deadline::armed(config.input_timeout);
        let (output_deadline, output_watch) = Deadline::parked();
        spawn_deadline_supervisor(input_watch, stop_rx.clone(), handle.clone(), "input");
        spawn_deadline_supervisor(output_watch, stop_rx.clone(), handle.clone(), "output");

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
            None,
        ));

        handle.mark_active();
        handle
    }
}
