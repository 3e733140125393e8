//! Per-connection session actors.
//!
//! Every connection — accepted ([`ServerSession`]) or initiated
//! ([`ClientConnection`]) — runs the same actor set: one read task, one
//! write task, and one deadline supervisor per liveness clock. All mutable
//! connection state (frame buffer, output queue, cursors) is owned by
//! exactly one task, and cross-task communication happens over channels, so
//! no per-connection locks exist.
//!
//! The output queue is a bounded `mpsc` channel; pushing a packet wakes the
//! write loop through the channel itself rather than through a timer forced
//! into the past.

mod deadline;
mod dispatch;
mod io;

pub mod client;
pub mod server;

use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};

use crate::channel::Channel;
use crate::error::{FramecastError, Result};
use crate::protocol::{Packet, DEFAULT_MAX_PAYLOAD_SIZE};

pub use client::ClientConnection;
pub use deadline::{Deadline, DeadlineWatch};
pub use dispatch::{BoxFuture, Dispatcher, PacketHandler};
pub(crate) use io::OutboundFrame;
pub use server::ServerSession;

/// Default input deadline: peer silent longer than this is dead.
pub const DEFAULT_INPUT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default output deadline: a single write stuck longer than this is dead.
pub const DEFAULT_OUTPUT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default per-endpoint connect timeout.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(60);

/// Default client heartbeat interval.
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(2);

/// Default output queue capacity in packets.
pub const DEFAULT_QUEUE_CAPACITY: usize = 256;

/// Timeout and sizing configuration for one session.
///
/// Values are configuration, not structure: the same actor set runs with
/// any of them.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Input deadline; re-armed on every successful read.
    pub input_timeout: Duration,
    /// Output deadline; armed at the start of every write.
    pub output_timeout: Duration,
    /// Per-endpoint connect timeout (client only).
    pub connect_timeout: Duration,
    /// Idle interval after which the client write loop synthesizes a
    /// heartbeat (client only).
    pub heartbeat_interval: Duration,
    /// Largest payload a peer may announce.
    pub max_payload_size: u32,
    /// Output queue capacity in packets.
    pub queue_capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            input_timeout: DEFAULT_INPUT_TIMEOUT,
            output_timeout: DEFAULT_OUTPUT_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
            max_payload_size: DEFAULT_MAX_PAYLOAD_SIZE,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

/// Unique id for one session, used in log lines and the channel registry.
pub type SessionId = u64;

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

/// Lifecycle of a session. Transitions are one-way; `Stopped` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum SessionState {
    /// Created, actors not yet running.
    Joining = 0,
    /// Actors running, frames flowing.
    Active = 1,
    /// Teardown in progress.
    Stopping = 2,
    /// Terminal. The stop signal has tripped; the I/O tasks abandon any
    /// in-flight write, exit and release the socket as they observe it.
    Stopped = 3,
}

impl SessionState {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => Self::Joining,
            1 => Self::Active,
            2 => Self::Stopping,
            _ => Self::Stopped,
        }
    }
}

struct Shared {
    id: SessionId,
    state: AtomicU8,
    stop: watch::Sender<bool>,
    channel: Option<Arc<Channel>>,
}

/// Cheap handle to a running session.
///
/// Clones share the same session. `send_packet` may be called from any
/// task; the packet lands on the session's own output queue and the write
/// loop wakes immediately.
#[derive(Clone)]
pub struct SessionHandle {
    shared: Arc<Shared>,
    queue: mpsc::Sender<OutboundFrame>,
}

impl SessionHandle {
    pub(crate) fn new(
        channel: Option<Arc<Channel>>,
        config: &SessionConfig,
    ) -> (
        Self,
        mpsc::Receiver<OutboundFrame>,
        watch::Receiver<bool>,
    ) {
        let (queue_tx, queue_rx) = mpsc::channel(config.queue_capacity);
        let (stop_tx, stop_rx) = watch::channel(false);
        let handle = Self {
            shared: Arc::new(Shared {
                id: NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed),
                state: AtomicU8::new(SessionState::Joining as u8),
                stop: stop_tx,
                channel,
            }),
            queue: queue_tx,
        };
        (handle, queue_rx, stop_rx)
    }

    /// This session's id.
    pub fn id(&self) -> SessionId {
        self.shared.id
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        SessionState::from_u8(self.shared.state.load(Ordering::Acquire))
    }

    pub(crate) fn is_stopping(&self) -> bool {
        self.state() >= SessionState::Stopping
    }

    pub(crate) fn mark_active(&self) {
        let _ = self.shared.state.compare_exchange(
            SessionState::Joining as u8,
            SessionState::Active as u8,
            Ordering::AcqRel,
            Ordering::Acquire,
        );
    }

    /// Enqueue a packet on this session's output queue.
    ///
    /// Waits for queue space; fails with [`FramecastError::ConnectionClosed`]
    /// once the session is stopping.
    pub async fn send_packet(&self, packet: &Packet) -> Result<()> {
        let frame = OutboundFrame::encode(packet);
        self.queue
            .send(frame)
            .await
            .map_err(|_| FramecastError::ConnectionClosed)
    }

    /// Enqueue a packet without waiting.
    pub fn try_send_packet(&self, packet: &Packet) -> Result<()> {
        self.try_send_frame(OutboundFrame::encode(packet))
    }

    pub(crate) fn try_send_frame(&self, frame: OutboundFrame) -> Result<()> {
        self.queue.try_send(frame).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => FramecastError::QueueFull,
            mpsc::error::TrySendError::Closed(_) => FramecastError::ConnectionClosed,
        })
    }

    /// Stop the session: leave the channel, signal both I/O tasks to exit
    /// (abandoning any in-flight write and closing the socket by drop),
    /// cancel all deadline supervisors and drop queued output.
    ///
    /// Safe to call any number of times from any task; only the first call
    /// acts. Read errors, write errors and deadline expiries all converge
    /// here.
    pub fn stop(&self) {
        let shared = &self.shared;
        let mut current = shared.state.load(Ordering::Acquire);
        loop {
            if current >= SessionState::Stopping as u8 {
                return;
            }
            match shared.state.compare_exchange(
                current,
                SessionState::Stopping as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => break,
                Err(actual) => current = actual,
            }
        }

        if let Some(channel) = &shared.channel {
            channel.leave(shared.id);
        }
        let _ = shared.stop.send(true);
        shared.state.store(SessionState::Stopped as u8, Ordering::Release);
        tracing::debug!(session = shared.id, "session stopped");
    }

    /// Wait until the session has stopped.
    pub async fn closed(&self) {
        let mut rx = self.shared.stop.subscribe();
        if *rx.borrow() {
            return;
        }
        let _ = rx.changed().await;
    }
}

impl std::fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionHandle")
            .field("id", &self.id())
            .field("state", &self.state())
            .finish()
    }
}

/// Spawn a supervisor task that stops the session when `watch` expires.
pub(crate) fn spawn_deadline_supervisor(
    watch: DeadlineWatch,
    stop: watch::Receiver<bool>,
    handle: SessionHandle,
    which: &'static str,
) {
    tokio::spawn(async move {
        if deadline::supervise(watch, stop).await {
            tracing::warn!(
                session = handle.id(),
                deadline = which,
                "deadline expired, stopping session"
            );
            handle.stop();
        }
    });
}
