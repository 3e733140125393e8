//! Broadcast channel: the synchronized registry of joined sessions.
//!
//! The channel is the only state shared across connections. It is guarded
//! by its own mutex, independent of any session's tasks, because join,
//! leave and broadcast can be invoked from any of them.
//!
//! A session that fails during its own write leaves the channel through its
//! `stop()`; the channel never observes per-session transport errors.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::protocol::Packet;
use crate::session::{OutboundFrame, SessionHandle, SessionId};

/// Registry of active sessions supporting join, leave and broadcast.
#[derive(Default)]
pub struct Channel {
    sessions: Mutex<HashMap<SessionId, SessionHandle>>,
}

impl Channel {
    /// Create an empty channel.
    pub fn new() -> Self {
        Self::default()
    }

    fn sessions(&self) -> MutexGuard<'_, HashMap<SessionId, SessionHandle>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add a session. Joining twice is a no-op.
    pub fn join(&self, session: SessionHandle) {
        self.sessions().entry(session.id()).or_insert(session);
    }

    /// Remove a session. Leaving twice (or without joining) is a no-op.
    pub fn leave(&self, id: SessionId) {
        self.sessions().remove(&id);
    }

    /// Check whether a session is currently joined.
    pub fn contains(&self, id: SessionId) -> bool {
        self.sessions().contains_key(&id)
    }

    /// Number of joined sessions.
    pub fn len(&self) -> usize {
        self.sessions().len()
    }

    /// Check whether no sessions are joined.
    pub fn is_empty(&self) -> bool {
        self.sessions().is_empty()
    }

    /// Enqueue a packet on every joined session's output queue.
    ///
    /// The packet is encoded once and the frame shared across sessions.
    /// Per-session delivery preserves broadcast order; ordering across
    /// sessions is unspecified. Returns the number of sessions the frame
    /// was enqueued for; a full or closed queue only skips that session.
    pub fn broadcast(&self, packet: &Packet) -> usize {
        let frame = OutboundFrame::encode(packet);
        let sessions = self.sessions();

        let mut delivered = 0;
        for (id, session) in sessions.iter() {
            match session.try_send_frame(frame.clone()) {
                Ok(()) => delivered += 1,
                Err(e) => {
                    tracing::debug!(session = id, error = %e, "broadcast skipped session");
                }
            }
        }
        delivered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::opcode;
    use crate::session::SessionConfig;
    use std::sync::Arc;

    fn test_session() -> (
        SessionHandle,
        tokio::sync::mpsc::Receiver<OutboundFrame>,
    ) {
        let (handle, rx, _stop) = SessionHandle::new(None, &SessionConfig::default());
        (handle, rx)
    }

    #[test]
    fn test_join_is_idempotent() {
        let channel = Channel::new();
        let (session, _rx) = test_session();

        channel.join(session.clone());
        channel.join(session.clone());

        assert_eq!(channel.len(), 1);
        assert!(channel.contains(session.id()));
    }

    #[test]
    fn test_leave_is_idempotent() {
        let channel = Channel::new();
        let (session, _rx) = test_session();
        let id = session.id();

        channel.join(session);
        channel.leave(id);
        channel.leave(id);

        assert!(channel.is_empty());
        assert!(!channel.contains(id));
    }

    #[tokio::test]
    async fn test_broadcast_fans_out_to_joined_sessions() {
        let channel = Channel::new();
        let (a, mut rx_a) = test_session();
        let (b, mut rx_b) = test_session();
        let (c, mut rx_c) = test_session();

        channel.join(a);
        channel.join(b.clone());
        channel.join(c);

        // B leaves before the broadcast.
        channel.leave(b.id());

        let mut packet = Packet::new(opcode::ENTITY_UPDATE);
        packet.write_u32(1);
        let delivered = channel.broadcast(&packet);

        assert_eq!(delivered, 2);
        assert!(rx_a.try_recv().is_ok());
        assert!(rx_c.try_recv().is_ok());
        assert!(rx_b.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_broadcast_preserves_per_session_order() {
        let channel = Channel::new();
        let (session, mut rx) = test_session();
        channel.join(session);

        for i in 0..5u32 {
            let mut packet = Packet::new(opcode::ENTITY_UPDATE);
            packet.write_u32(i);
            channel.broadcast(&packet);
        }

        for i in 0..5u32 {
            let frame = rx.recv().await.unwrap();
            assert_eq!(&frame.payload[..], &i.to_be_bytes());
        }
    }

    #[tokio::test]
    async fn test_broadcast_skips_full_queue() {
        let channel = Channel::new();
        let config = SessionConfig {
            queue_capacity: 1,
            ..SessionConfig::default()
        };
        let (small, _rx_small, _stop) = SessionHandle::new(None, &config);
        let (roomy, mut rx_roomy) = test_session();

        channel.join(small.clone());
        channel.join(roomy);

        small.try_send_packet(&Packet::new(0)).unwrap(); // fill the queue

        let delivered = channel.broadcast(&Packet::new(opcode::NOOP));
        assert_eq!(delivered, 1);
        assert!(rx_roomy.try_recv().is_ok());
        // The skipped session is still joined; its own stop removes it.
        assert!(channel.contains(small.id()));
    }

    #[test]
    fn test_broadcast_to_empty_channel() {
        let channel = Channel::new();
        assert_eq!(channel.broadcast(&Packet::new(0)), 0);
    }

    #[test]
    fn test_channel_is_shareable() {
        let channel = Arc::new(Channel::new());
        let clone = channel.clone();
        let (session, _rx) = test_session();

        clone.join(session.clone());
        assert!(channel.contains(session.id()));
    }
}
