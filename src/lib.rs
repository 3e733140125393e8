//! # framecast
//!
//! Asynchronous length-prefixed packet transport over TCP, with a
//! fire-and-forget UDP broadcast path.
//!
//! ## Architecture
//!
//! - **Protocol**: `[Header][Payload]` frames; the 8-byte header carries the
//!   payload length and opcode, Big Endian. Payloads are built and consumed
//!   through [`Packet`]'s append/extract cursors.
//! - **Sessions**: every connection runs a read task, a write task and one
//!   deadline supervisor per liveness clock. Server sessions join a
//!   [`Channel`]; client connections add endpoint failover and heartbeats.
//! - **Dispatch**: decoded packets go to the application through a
//!   [`Dispatcher`] registry; unknown opcodes and malformed payloads are
//!   logged and skipped, never fatal.
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use framecast::{Channel, Dispatcher, ServerSession, SessionConfig};
//! use framecast::protocol::{opcode, Packet};
//!
//! let channel = Arc::new(Channel::new());
//! let dispatcher = Arc::new(Dispatcher::new().on(
//!     opcode::opcode_id(0),
//!     |mut packet: Packet, session| async move {
//!         let name = packet.read_string()?;
//!         let mut reply = Packet::new(opcode::opcode_id(1));
//!         reply.write_string(&name);
//!         session.send_packet(&reply).await
//!     },
//! ));
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:4000").await?;
//! loop {
//!     let (stream, _) = listener.accept().await?;
//!     ServerSession::spawn(stream, channel.clone(), dispatcher.clone(), SessionConfig::default());
//! }
//! ```

pub mod channel;
pub mod error;
pub mod protocol;
pub mod session;
pub mod udp;

pub use channel::Channel;
pub use error::{FramecastError, Result};
pub use protocol::{opcode, DecodeError, Header, Packet, HEADER_SIZE};
pub use session::{
    ClientConnection, Dispatcher, ServerSession, SessionConfig, SessionHandle, SessionId,
    SessionState,
};
pub use udp::UdpBroadcaster;
