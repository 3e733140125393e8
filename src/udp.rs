//! Fire-and-forget UDP broadcaster.
//!
//! Stateless: encodes a packet into one datagram and sends it to a fixed,
//! pre-connected destination. No queue, no retry, no deadline — best effort
//! by design, so send errors are logged and swallowed.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

use tokio::net::UdpSocket;

use crate::error::Result;
use crate::protocol::Packet;
use crate::session::OutboundFrame;

/// Sends packets as datagrams to one fixed destination.
pub struct UdpBroadcaster {
    socket: UdpSocket,
    dest: SocketAddr,
}

impl UdpBroadcaster {
    /// Bind an ephemeral socket and connect it to `dest`.
    ///
    /// Broadcast destinations are allowed.
    pub async fn bind(dest: SocketAddr) -> Result<Self> {
        let bind_addr = if dest.is_ipv4() {
            SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 0)
        } else {
            SocketAddr::new(IpAddr::V6(Ipv6Addr::UNSPECIFIED), 0)
        };
        let socket = UdpSocket::bind(bind_addr).await?;
        socket.set_broadcast(true)?;
        socket.connect(dest).await?;
        Ok(Self { socket, dest })
    }

    /// The fixed destination endpoint.
    pub fn dest(&self) -> SocketAddr {
        self.dest
    }

    /// Encode and send one packet. Errors are ignored at this layer.
    pub async fn send_packet(&self, packet: &Packet) {
        let datagram = OutboundFrame::encode(packet).to_bytes();
        if let Err(e) = self.socket.send(&datagram).await {
            tracing::debug!(dest = %self.dest, error = %e, "udp send failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{opcode, FrameBuffer, Header, HEADER_SIZE};
    use tokio::time::{timeout, Duration};

    #[tokio::test]
    async fn test_datagram_carries_one_complete_frame() {
        let receiver = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let dest = receiver.local_addr().unwrap();

        let broadcaster = UdpBroadcaster::bind(dest).await.unwrap();
        assert_eq!(broadcaster.dest(), dest);

        let mut packet = Packet::new(opcode::ENTITY_UPDATE);
        packet.write_string("tick");
        broadcaster.send_packet(&packet).await;

        let mut buf = vec![0u8; 1500];
        let n = timeout(Duration::from_secs(1), receiver.recv(&mut buf))
            .await
            .unwrap()
            .unwrap();

        let header = Header::decode(&buf[..n]).unwrap();
        assert_eq!(header.opcode, opcode::ENTITY_UPDATE);
        assert_eq!(header.payload_length as usize, n - HEADER_SIZE);

        let mut frames = FrameBuffer::new();
        let extracted = frames.push(&buf[..n]).unwrap();
        let mut decoded =
            Packet::decode(extracted[0].header, extracted[0].payload.clone()).unwrap();
        assert_eq!(decoded.read_string().unwrap(), "tick");
    }

    #[tokio::test]
    async fn test_send_to_unreceived_destination_does_not_error() {
        // Nothing listens on the destination; send must swallow the error.
        let dest: SocketAddr = "127.0.0.1:9".parse().unwrap();
        let broadcaster = UdpBroadcaster::bind(dest).await.unwrap();
        broadcaster.send_packet(&Packet::new(opcode::NOOP)).await;
    }
}
