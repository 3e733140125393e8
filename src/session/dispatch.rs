//! Opcode dispatch registry.
//!
//! Maps opcodes to boxed async handlers. Handlers receive the decoded
//! [`Packet`] and the session's [`SessionHandle`] so they can reply on the
//! same connection. Dispatch runs inline on the session's read task, so for
//! one connection handlers never execute concurrently and packets are
//! dispatched in arrival order.
//!
//! Unknown opcodes are never fatal: `dispatch` reports `Ok(false)` and the
//! caller logs and moves on.
//!
//! # Example
//!
//! ```
//! use framecast::protocol::{opcode, Packet};
//! use framecast::session::Dispatcher;
//!
//! let dispatcher = Dispatcher::new().on(opcode::opcode_id(0), |mut packet: Packet, session| async move {
//!     let name = packet.read_string()?;
//!     let mut reply = Packet::new(opcode::opcode_id(1));
//!     reply.write_string(&name);
//!     session.send_packet(&reply).await
//! });
//! # let _ = dispatcher;
//! ```

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;

use crate::error::Result;
use crate::protocol::Packet;

use super::SessionHandle;

/// Boxed future returned by handlers.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A packet handler bound to one opcode.
pub trait PacketHandler: Send + Sync + 'static {
    /// Handle one decoded packet for the owning session.
    fn call(&self, packet: Packet, session: SessionHandle) -> BoxFuture<'static, Result<()>>;
}

/// Adapter turning an async closure into a [`PacketHandler`].
struct FnHandler<F> {
    handler: F,
}

impl<F, Fut> PacketHandler for FnHandler<F>
where
    F: Fn(Packet, SessionHandle) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    fn call(&self, packet: Packet, session: SessionHandle) -> BoxFuture<'static, Result<()>> {
        Box::pin((self.handler)(packet, session))
    }
}

/// Registry mapping opcodes to handlers.
#[derive(Default)]
pub struct Dispatcher {
    handlers: HashMap<i32, Box<dyn PacketHandler>>,
}

impl Dispatcher {
    /// Create an empty dispatcher.
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Register an async closure, builder style. A later registration for
    /// the same opcode replaces the earlier one.
    pub fn on<F, Fut>(mut self, opcode: i32, handler: F) -> Self
    where
        F: Fn(Packet, SessionHandle) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        self.register(opcode, handler);
        self
    }

    /// Register an async closure for an opcode.
    pub fn register<F, Fut>(&mut self, opcode: i32, handler: F)
    where
        F: Fn(Packet, SessionHandle) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        self.register_handler(opcode, FnHandler { handler });
    }

    /// Register a pre-built handler for an opcode.
    pub fn register_handler<H: PacketHandler>(&mut self, opcode: i32, handler: H) {
        self.handlers.insert(opcode, Box::new(handler));
    }

    /// Check whether an opcode has a handler.
    pub fn has_handler(&self, opcode: i32) -> bool {
        self.handlers.contains_key(&opcode)
    }

    /// Dispatch a packet to its handler.
    ///
    /// Returns `Ok(true)` if a handler ran, `Ok(false)` if the opcode has no
    /// handler, or the handler's error.
    pub async fn dispatch(&self, packet: Packet, session: SessionHandle) -> Result<bool> {
        match self.handlers.get(&packet.opcode()) {
            Some(handler) => {
                handler.call(packet, session).await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
