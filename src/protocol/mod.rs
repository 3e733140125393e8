//! Protocol layer: wire format, packet codec, frame assembly, opcode space.
//!
//! The wire carries `[Header][Payload]` repeated, where the 8-byte header
//! holds the payload length and the opcode, both Big Endian. See
//! [`wire_format`] for the exact layout, [`Packet`] for the cursor-based
//! payload codec, and [`opcode`] for the reserved opcode space.

mod frame_buffer;
mod packet;
mod wire_format;

pub mod opcode;

pub use frame_buffer::{Frame, FrameBuffer};
pub use packet::{DecodeError, Packet};
pub use wire_format::{Header, DEFAULT_MAX_PAYLOAD_SIZE, HEADER_SIZE};
