//! The read and write loops shared by both session variants.
//!
//! Each loop runs on its own task and owns its half of the socket. Reads
//! are strictly sequential, writes drain the queue one frame at a time, and
//! nothing orders the two loops against each other. Every fatal condition
//! converges on [`SessionHandle::stop`]; errors observed after the stop
//! signal tripped are the cancellation itself and are not reported again.

use std::io::IoSlice;

use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::{mpsc, watch};
use tokio::time::{self, Duration};

use crate::protocol::{opcode, FrameBuffer, Packet, HEADER_SIZE};

use super::dispatch::Dispatcher;
use super::deadline::Deadline;
use super::{SessionConfig, SessionHandle};

/// Read buffer size for the socket.
const READ_CHUNK: usize = 64 * 1024;

/// A frame ready for the wire: pre-encoded header plus payload bytes.
///
/// Cloning is cheap; broadcast encodes a packet once and clones the frame
/// per receiving session.
#[derive(Debug, Clone)]
pub(crate) struct OutboundFrame {
    pub header: [u8; HEADER_SIZE],
    pub payload: Bytes,
}

impl OutboundFrame {
    /// Encode a packet into its wire frame.
    pub fn encode(packet: &Packet) -> Self {
        let (header, payload) = packet.encode();
        Self {
            header: header.encode(),
            payload,
        }
    }

    /// Total wire size of this frame.
    pub fn len(&self) -> usize {
        HEADER_SIZE + self.payload.len()
    }

    /// Flatten into one contiguous buffer (for datagram transports).
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.len());
        buf.extend_from_slice(&self.header);
        buf.extend_from_slice(&self.payload);
        buf
    }
}

/// Read frames off the socket and dispatch decoded packets.
///
/// Re-arms the input deadline on every successful read. Per-packet decode
/// failures are logged and skipped; transport errors, EOF and protocol
/// violations stop the session.
pub(crate) async fn read_loop<R>(
    mut reader: R,
    handle: SessionHandle,
    dispatcher: std::sync::Arc<Dispatcher>,
    input_deadline: Deadline,
    mut stop: watch::Receiver<bool>,
    config: SessionConfig,
) where
    R: AsyncRead + Unpin,
{
    let mut frames = FrameBuffer::with_max_payload(config.max_payload_size);
    let mut buf = vec![0u8; READ_CHUNK];

    loop {
        let n = tokio::select! {
            _ = stop.changed() => break,
            result = reader.read(&mut buf) => match result {
                Ok(0) => {
                    tracing::debug!(session = handle.id(), "peer closed connection");
                    handle.stop();
                    break;
                }
                Ok(n) => n,
                Err(e) => {
                    if !handle.is_stopping() {
                        tracing::warn!(session = handle.id(), error = %e, "read failed, stopping session");
                        handle.stop();
                    }
                    break;
                }
            },
        };

        input_deadline.arm(config.input_timeout);

        let extracted = match frames.push(&buf[..n]) {
            Ok(frames) => frames,
            Err(e) => {
                tracing::warn!(session = handle.id(), error = %e, "protocol violation, stopping session");
                handle.stop();
                break;
            }
        };

        for frame in extracted {
            let packet = match Packet::decode(frame.header, frame.payload) {
                Ok(packet) => packet,
                Err(e) => {
                    // Recoverable: drop the packet, keep the connection.
                    tracing::warn!(session = handle.id(), error = %e, "discarding malformed packet");
                    continue;
                }
            };
            handle_inbound(packet, &handle, &dispatcher).await;
        }
    }
}

async fn handle_inbound(packet: Packet, handle: &SessionHandle, dispatcher: &Dispatcher) {
    let opcode = packet.opcode();

    if opcode == opcode::HEARTBEAT {
        tracing::trace!(session = handle.id(), "heartbeat");
        return;
    }

    match dispatcher.dispatch(packet, handle.clone()).await {
        Ok(true) => {}
        Ok(false) => {
            if opcode == opcode::PING {
                if let Err(e) = handle.try_send_packet(&Packet::new(opcode::PONG)) {
                    tracing::debug!(session = handle.id(), error = %e, "could not answer ping");
                }
            } else {
                tracing::debug!(session = handle.id(), opcode, "no handler for opcode, ignoring");
            }
        }
        Err(e) => {
            tracing::error!(session = handle.id(), opcode, error = %e, "handler failed");
        }
    }
}

/// Drain the output queue onto the socket.
///
/// Arms the output deadline at the start of each write and parks it while
/// idle. Writes race the stop signal, so a write stuck on a peer that
/// stopped reading is abandoned mid-frame the moment the session stops
/// (deadline expiry included) and the write half is released. With
/// `heartbeat` set (client sessions), an empty queue synthesizes a
/// heartbeat packet after one interval of silence, so the wire is never
/// quiet longer than the heartbeat interval.
pub(crate) async fn write_loop<W>(
    mut writer: W,
    mut queue: mpsc::Receiver<OutboundFrame>,
    handle: SessionHandle,
    output_deadline: Deadline,
    mut stop: watch::Receiver<bool>,
    config: SessionConfig,
    heartbeat: Option<Duration>,
) where
    W: AsyncWrite + Unpin,
{
    loop {
        let frame = tokio::select! {
            _ = stop.changed() => break,
            frame = queue.recv() => match frame {
                Some(frame) => frame,
                None => break,
            },
            _ = idle_tick(heartbeat) => {
                tracing::trace!(session = handle.id(), "sending heartbeat");
                OutboundFrame::encode(&Packet::new(opcode::HEARTBEAT))
            }
        };

        output_deadline.arm(config.output_timeout);
        tokio::select! {
            _ = stop.changed() => {
                tracing::debug!(session = handle.id(), "abandoning in-flight write");
                break;
            }
            result = write_frame(&mut writer, &frame) => {
                if let Err(e) = result {
                    if !handle.is_stopping() {
                        tracing::warn!(session = handle.id(), error = %e, "write failed, stopping session");
                        handle.stop();
                    }
                    break;
                }
            }
        }
        output_deadline.park();
    }
}

async fn idle_tick(heartbeat: Option<Duration>) {
    match heartbeat {
        Some(interval) => time::sleep(interval).await,
        None => std::future::pending().await,
    }
}

/// Write one frame as a single vectored `[header, payload]` write,
/// continuing after partial writes.
pub(crate) async fn write_frame<W>(writer: &mut W, frame: &OutboundFrame) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let total = frame.len();
    let mut written = 0usize;

    while written < total {
        let mut slices = [IoSlice::new(&[]); 2];
        let count = remaining_slices(frame, written, &mut slices);

        let n = writer.write_vectored(&slices[..count]).await?;
        if n == 0 {
            return Err(std::io::Error::new(
                std::io::ErrorKind::WriteZero,
                "write_vectored returned 0",
            ));
        }
        written += n;
    }

    writer.flush().await
}

/// Build the slice list for the unwritten tail of a frame.
fn remaining_slices<'a>(
    frame: &'a OutboundFrame,
    skip: usize,
    out: &mut [IoSlice<'a>; 2],
) -> usize {
    let mut count = 0;
    if skip < HEADER_SIZE {
        out[count] = IoSlice::new(&frame.header[skip..]);
        count += 1;
        if !frame.payload.is_empty() {
            out[count] = IoSlice::new(&frame.payload);
            count += 1;
        }
    } else {
        let offset = skip - HEADER_SIZE;
        if offset < frame.payload.len() {
            out[count] = IoSlice::new(&frame.payload[offset..]);
            count += 1;
        }
    }
    count
}
